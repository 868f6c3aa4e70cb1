//! Dataset path classification.
//!
//! A leaf dataset sits exactly four levels below a scan root:
//! `<sample>/<experiment#>/pdata/<process#>`. Two layouts are
//! recognized:
//!
//!   - ASCII export: the process directory holds the fixed
//!     `ascii-spec.txt` file written by TopSpin's text export.
//!   - Binary processed data: the process directory itself is the
//!     dataset, holding a `procs` parameter file and an intensity
//!     payload (`1r` for 1D; `2rr` marks 2D data, which the tree can
//!     show but the loader refuses).
//!
//! All functions here are total: malformed or too-short paths classify
//! as `false` / `"?"`, they never panic.

use std::path::Path;

/// Fixed filename of the flat ASCII spectrum export.
pub const ASCII_SPEC_FILENAME: &str = "ascii-spec.txt";

/// Processed-parameter file required inside a binary dataset directory.
pub const PROC_PARAMS_FILENAME: &str = "procs";

/// 1D processed intensity payload.
pub const INTENSITY_FILE_1D: &str = "1r";

/// 2D processed intensity payload. Recognized so the dataset shows up
/// in the tree, but not loadable as a 1D series.
pub const INTENSITY_FILE_2D: &str = "2rr";

/// Directory separating the experiment level from the process level.
pub const PDATA_DIR: &str = "pdata";

/// Placeholder id returned when a path component does not match the
/// expected layout.
pub const UNKNOWN_ID: &str = "?";

fn is_decimal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn path_parts(path: &Path) -> Vec<String> {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect()
}

/// True iff `path` names an ASCII export file in the expected layout:
/// final component is [`ASCII_SPEC_FILENAME`], component −3 is `pdata`
/// (case-insensitive), components −4 and −2 are plain decimal numbers.
///
/// Pure path logic, no filesystem access.
pub fn is_ascii_dataset(path: &Path) -> bool {
    let parts = path_parts(path);
    let n = parts.len();
    if n < 4 {
        return false;
    }
    parts[n - 1] == ASCII_SPEC_FILENAME
        && parts[n - 3].eq_ignore_ascii_case(PDATA_DIR)
        && is_decimal(&parts[n - 2])
        && is_decimal(&parts[n - 4])
}

/// True iff `dir` is a directory holding a `procs` parameter file and
/// an intensity payload (`1r` or `2rr`).
///
/// Content-based: this touches the filesystem, and any I/O failure
/// simply classifies as `false`.
pub fn is_binary_dataset(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    dir.join(PROC_PARAMS_FILENAME).is_file()
        && (dir.join(INTENSITY_FILE_1D).is_file() || dir.join(INTENSITY_FILE_2D).is_file())
}

/// True when the dataset directory carries only the unsupported 2D
/// payload (`2rr` without `1r`).
pub fn is_2d_only(dir: &Path) -> bool {
    dir.join(INTENSITY_FILE_2D).is_file() && !dir.join(INTENSITY_FILE_1D).is_file()
}

/// Extract `(experiment_id, process_id)` from a dataset path of either
/// variant. Components that do not match the expected layout come back
/// as [`UNKNOWN_ID`]; this never fails.
pub fn extract_ids(path: &Path) -> (String, String) {
    let mut parts = path_parts(path);
    if parts.last().map(String::as_str) == Some(ASCII_SPEC_FILENAME) {
        parts.pop();
    }
    // Expected tail after stripping the filename: <expt>/pdata/<proc>
    let n = parts.len();
    let pdata_ok = n >= 2 && parts[n - 2].eq_ignore_ascii_case(PDATA_DIR);

    let process = if pdata_ok && is_decimal(&parts[n - 1]) {
        parts[n - 1].clone()
    } else {
        UNKNOWN_ID.to_string()
    };
    let experiment = if pdata_ok && n >= 3 && is_decimal(&parts[n - 3]) {
        parts[n - 3].clone()
    } else {
        UNKNOWN_ID.to_string()
    };
    (experiment, process)
}
