//! Template import/export: a flat `key:value` snapshot of the whole
//! parameter set, one line per parameter.
//!
//! Import is forgiving by contract: unknown keys, lines without a
//! separator and values the schema rejects are each skipped with a
//! warning; a template never aborts halfway through.

use std::io;
use std::path::Path;

use super::schema::{PlotParameters, PARAMS};

/// What an import did. `applied + skipped` equals the number of
/// non-empty lines seen.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TemplateReport {
    pub applied: usize,
    pub skipped: usize,
}

/// Render the full parameter set in schema order.
pub fn export_template(params: &PlotParameters) -> String {
    let mut out = String::new();
    for spec in PARAMS {
        out.push_str(spec.key);
        out.push(':');
        out.push_str(params.get(spec.key));
        out.push('\n');
    }
    out
}

pub fn write_template(params: &PlotParameters, path: &Path) -> io::Result<()> {
    std::fs::write(path, export_template(params))
}

/// Apply template lines to a live parameter set.
pub fn parse_template(content: &str, params: &mut PlotParameters) -> TemplateReport {
    let mut report = TemplateReport::default();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            log::warn!("template line {}: no separator; skipped", lineno + 1);
            report.skipped += 1;
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            log::warn!("template line {}: empty key; skipped", lineno + 1);
            report.skipped += 1;
            continue;
        }
        match params.set(key, value) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                log::warn!("template line {}: {}; skipped", lineno + 1, e);
                report.skipped += 1;
            }
        }
    }

    report
}

pub fn read_template(path: &Path, params: &mut PlotParameters) -> io::Result<TemplateReport> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_template(&content, params))
}
