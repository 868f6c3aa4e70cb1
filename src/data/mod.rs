//! Filesystem-facing half of the core: classifying dataset paths,
//! scanning directory trees, validating a selection before a scan,
//! caching scan results, and decoding datasets into numeric series.

pub mod cache;
pub mod classify;
pub mod loader;
pub mod procpar;
pub mod scan;
pub mod validate;
