//! Plot customization parameters: a declared schema of named optional
//! values, template import/export, and the color model.

pub mod colors;
pub mod schema;
pub mod template;

pub use schema::{ParamKind, ParamSpec, PlotParameters, PARAMS};
