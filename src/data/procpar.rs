//! Bruker processed-parameter (`procs`) decoding.
//!
//! `procs` files use a JCAMP-DX–like record format, one parameter per
//! `##$NAME= value` line, occasionally with a parenthesized value that
//! spills across lines. Only a handful of records matter for axis
//! reconstruction and intensity decoding; the rest are carried in the
//! raw map and ignored.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use super::classify;

/// Parse `##$NAME= value` records into a raw string map.
///
/// A record stays open until the next `##` line, so array values that
/// spill across lines (`##$GPNAM= (0..31)` followed by the entries)
/// are folded into one string. Anything outside a record is ignored.
pub fn parse_procs(content: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut open: Option<(String, String)> = None;

    let flush = |open: &mut Option<(String, String)>, params: &mut HashMap<String, String>| {
        if let Some((key, value)) = open.take() {
            params.insert(key, value.trim().to_string());
        }
    };

    for line in content.lines() {
        if let Some(record) = line.strip_prefix("##$") {
            flush(&mut open, &mut params);
            if let Some((key, value)) = record.split_once('=') {
                open = Some((key.trim().to_string(), value.trim().to_string()));
            }
        } else if line.starts_with("##") {
            flush(&mut open, &mut params);
        } else if let Some((_, value)) = open.as_mut() {
            value.push(' ');
            value.push_str(line.trim());
        }
    }
    flush(&mut open, &mut params);

    params
}

/// Read and parse the `procs` file of a binary dataset directory.
pub fn read_procs(dataset_dir: &Path) -> io::Result<HashMap<String, String>> {
    let content = std::fs::read_to_string(dataset_dir.join(classify::PROC_PARAMS_FILENAME))?;
    Ok(parse_procs(&content))
}

pub fn get_f64(params: &HashMap<String, String>, key: &str) -> f64 {
    params
        .get(key)
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0)
}

pub fn get_i32(params: &HashMap<String, String>, key: &str) -> i32 {
    params
        .get(key)
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0)
}

/// The processing parameters the loader needs. Absent records default
/// to zero; the axis builder decides how far it can degrade from there.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcParams {
    /// Number of processed points (SI).
    pub si: usize,
    /// Intensity scaling exponent (NC_proc): stored values are scaled
    /// by 2^NC_proc.
    pub nc_proc: i32,
    /// Spectral width in Hz (SW_p).
    pub sw_hz: f64,
    /// Spectrometer frequency in MHz (SF).
    pub sf_mhz: f64,
    /// Chemical shift of the first data point in ppm (OFFSET).
    pub offset_ppm: f64,
    /// Byte order of the intensity payload (BYTORDP): 0 = little.
    pub bytordp: i32,
    /// Payload type (DTYPP): 0 = int32, 2 = float64.
    pub dtypp: i32,
}

pub fn extract_proc_params(params: &HashMap<String, String>) -> ProcParams {
    ProcParams {
        si: get_i32(params, "SI").max(0) as usize,
        nc_proc: get_i32(params, "NC_proc"),
        sw_hz: get_f64(params, "SW_p"),
        sf_mhz: get_f64(params, "SF"),
        offset_ppm: get_f64(params, "OFFSET"),
        bytordp: get_i32(params, "BYTORDP"),
        dtypp: get_i32(params, "DTYPP"),
    }
}
