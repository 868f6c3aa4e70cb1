//! Numeric half of the core: the per-plot transform pipeline.

pub mod transform;
