//! Plot parameter schema and live value store.
//!
//! Every customization parameter is declared once, with its kind and
//! default, in [`PARAMS`]. Template import/export, typed reads and
//! (eventually) UI binding all dispatch on the declared kind; nothing
//! ever inspects a widget to find out what a value is.
//!
//! Values are stored as the raw strings a user would type. A blank
//! string means "unset, use the computed default", exactly like an
//! empty entry box.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::loader::XAxisUnit;
use crate::pipeline::transform::{PlotMode, TransformOptions};

/// What kind of value a parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Free text.
    Text,
    /// A float, or blank for unset.
    Numeric,
    /// One of a fixed set of options.
    Choice(&'static [&'static str]),
}

/// One declared parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub key: &'static str,
    pub kind: ParamKind,
    pub default: &'static str,
}

const FONTS: &[&str] = &["Arial", "Times New Roman", "Courier New"];
const ON_OFF: &[&str] = &["on", "off"];

/// The full parameter set, in export order.
pub const PARAMS: &[ParamSpec] = &[
    ParamSpec { key: "x_min", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "x_max", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "y_min", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "y_max", kind: ParamKind::Numeric, default: "" },
    ParamSpec {
        key: "x_axis_unit",
        kind: ParamKind::Choice(&["ppm", "Hz", "kHz"]),
        default: "ppm",
    },
    ParamSpec { key: "x_min_mask", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "x_max_mask", kind: ParamKind::Numeric, default: "" },
    ParamSpec {
        key: "mode",
        kind: ParamKind::Choice(&["stack", "overlay"]),
        default: "stack",
    },
    ParamSpec { key: "x_offset", kind: ParamKind::Numeric, default: "0" },
    ParamSpec { key: "y_offset", kind: ParamKind::Numeric, default: "0" },
    ParamSpec { key: "normalize", kind: ParamKind::Choice(ON_OFF), default: "on" },
    ParamSpec { key: "nucleus", kind: ParamKind::Text, default: "" },
    ParamSpec {
        key: "color_scheme",
        kind: ParamKind::Choice(&["default", "scheme1", "scheme2", "scheme3", "custom"]),
        default: "default",
    },
    ParamSpec { key: "custom_color", kind: ParamKind::Text, default: "" },
    ParamSpec { key: "axis_font_type", kind: ParamKind::Choice(FONTS), default: "Arial" },
    ParamSpec { key: "axis_font_size", kind: ParamKind::Numeric, default: "10" },
    ParamSpec { key: "label_font_type", kind: ParamKind::Choice(FONTS), default: "Arial" },
    ParamSpec { key: "label_font_size", kind: ParamKind::Numeric, default: "10" },
    ParamSpec { key: "line_thickness", kind: ParamKind::Numeric, default: "1.0" },
    ParamSpec { key: "scaling_factor", kind: ParamKind::Numeric, default: "1.0" },
    ParamSpec { key: "whitespace", kind: ParamKind::Numeric, default: "0.1" },
    ParamSpec { key: "major_tick_spacing", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "minor_tick_spacing", kind: ParamKind::Numeric, default: "" },
    ParamSpec { key: "major_tick_length", kind: ParamKind::Numeric, default: "4.0" },
    ParamSpec { key: "minor_tick_length", kind: ParamKind::Numeric, default: "2.0" },
    ParamSpec { key: "figure_width", kind: ParamKind::Numeric, default: "8" },
    ParamSpec { key: "figure_height", kind: ParamKind::Numeric, default: "6" },
];

/// Look up a parameter's declaration.
pub fn spec_for(key: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|s| s.key == key)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("unknown parameter: {0:?}")]
    UnknownKey(String),
    #[error("parameter {key} does not accept {value:?}; options are {options}")]
    InvalidChoice {
        key: String,
        value: String,
        options: String,
    },
    #[error("parameter {key} expects a number, got {value:?}")]
    NotNumeric { key: String, value: String },
}

/// The live parameter snapshot: populated with defaults at startup,
/// overwritten by template import, edited by the UI, read at plot
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotParameters {
    values: BTreeMap<String, String>,
}

impl Default for PlotParameters {
    fn default() -> Self {
        Self::new()
    }
}

impl PlotParameters {
    pub fn new() -> Self {
        let values = PARAMS
            .iter()
            .map(|s| (s.key.to_string(), s.default.to_string()))
            .collect();
        Self { values }
    }

    /// Raw value; `""` for keys outside the schema.
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn is_set(&self, key: &str) -> bool {
        !self.get(key).trim().is_empty()
    }

    /// Set a value after validating it against the declared kind.
    /// Blank always means "unset" and is accepted for any kind.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ParamError> {
        let spec = spec_for(key).ok_or_else(|| ParamError::UnknownKey(key.to_string()))?;
        let value = value.trim();
        if !value.is_empty() {
            match spec.kind {
                ParamKind::Text => {}
                ParamKind::Numeric => {
                    if value.parse::<f64>().is_err() {
                        return Err(ParamError::NotNumeric {
                            key: key.to_string(),
                            value: value.to_string(),
                        });
                    }
                }
                ParamKind::Choice(options) => {
                    if !options.contains(&value) {
                        return Err(ParamError::InvalidChoice {
                            key: key.to_string(),
                            value: value.to_string(),
                            options: options.join(" | "),
                        });
                    }
                }
            }
        }
        self.values.insert(spec.key.to_string(), value.to_string());
        Ok(())
    }

    /// Reset a single parameter to its declared default.
    pub fn reset(&mut self, key: &str) {
        if let Some(spec) = spec_for(key) {
            self.values.insert(spec.key.to_string(), spec.default.to_string());
        }
    }

    /// Parsed numeric value; `None` when blank or not a number.
    pub fn numeric(&self, key: &str) -> Option<f64> {
        let raw = self.get(key).trim();
        if raw.is_empty() {
            return None;
        }
        raw.parse().ok()
    }

    /// Parsed numeric value with a silent fallback. Blank and garbage
    /// both land on the fallback; an entry box half-typed over should
    /// never abort a plot.
    pub fn numeric_or(&self, key: &str, fallback: f64) -> f64 {
        self.numeric(key).unwrap_or(fallback)
    }

    pub fn unit(&self) -> XAxisUnit {
        self.get("x_axis_unit").parse().unwrap_or_default()
    }

    pub fn mode(&self) -> PlotMode {
        self.get("mode").parse().unwrap_or_default()
    }

    pub fn normalize(&self) -> bool {
        self.get("normalize") != "off"
    }

    /// Assemble the transform knobs for one plot pass.
    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            mask_low: self.numeric("x_min_mask"),
            mask_high: self.numeric("x_max_mask"),
            normalize: self.normalize(),
            scale: self.numeric_or("scaling_factor", 1.0),
            x_offset: self.numeric_or("x_offset", 0.0),
            y_offset: self.numeric_or("y_offset", 0.0),
            mode: self.mode(),
        }
    }
}
