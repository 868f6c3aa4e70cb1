//! Dataset loading: one spectrum in, one (x, y) series out.
//!
//! The ASCII variant is a comma-delimited table with a header line;
//! the binary variant is a Bruker processed-data directory whose axis
//! is rebuilt analytically from `procs` parameters. Both return the
//! same [`Series`], in the unit the caller asked for.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classify;
use super::procpar::{self, ProcParams};

/// Column of the y intensity in the ASCII table.
const ASCII_COL_INTENSITY: usize = 1;
/// Column of the x axis in Hz.
const ASCII_COL_HZ: usize = 2;
/// Column of the x axis in ppm.
const ASCII_COL_PPM: usize = 3;

/// Unit of the reconstructed x axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum XAxisUnit {
    #[default]
    Ppm,
    Hz,
    KHz,
}

impl fmt::Display for XAxisUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XAxisUnit::Ppm => write!(f, "ppm"),
            XAxisUnit::Hz => write!(f, "Hz"),
            XAxisUnit::KHz => write!(f, "kHz"),
        }
    }
}

impl FromStr for XAxisUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ppm" => Ok(XAxisUnit::Ppm),
            "Hz" => Ok(XAxisUnit::Hz),
            "kHz" => Ok(XAxisUnit::KHz),
            other => Err(format!("unknown x-axis unit: {:?}", other)),
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path}, line {line}: {detail}")]
    Parse {
        path: PathBuf,
        line: usize,
        detail: String,
    },
    #[error("{0} is not a recognizable dataset")]
    Unrecognized(PathBuf),
    #[error("{0} holds 2D processed data (2rr), which cannot be plotted as a line")]
    Unsupported(PathBuf),
    #[error("{0} contains no data points")]
    Empty(PathBuf),
}

/// One renderable line: paired x/y columns of equal length. Owned by
/// a single plot invocation; the pipeline consumes it by value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Largest y value; −∞ for an empty series.
    pub fn max_y(&self) -> f64 {
        self.y.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Load a single dataset as a series with its x axis in `unit`.
///
/// Dispatches on the path's layout: the fixed ASCII export filename,
/// or a binary processed-data directory.
pub fn load_series(path: &Path, unit: XAxisUnit) -> Result<Series, LoadError> {
    if classify::is_ascii_dataset(path) {
        load_ascii(path, unit)
    } else if path.is_dir() && classify::is_binary_dataset(path) {
        load_binary(path, unit)
    } else {
        Err(LoadError::Unrecognized(path.to_path_buf()))
    }
}

// ── ASCII export tables ───────────────────────────────────────────

fn load_ascii(path: &Path, unit: XAxisUnit) -> Result<Series, LoadError> {
    let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let x_col = match unit {
        XAxisUnit::Ppm => ASCII_COL_PPM,
        XAxisUnit::Hz | XAxisUnit::KHz => ASCII_COL_HZ,
    };

    let mut series = Series::default();
    // Line 1 is the column header written by the exporter.
    for (lineno, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() <= x_col.max(ASCII_COL_INTENSITY) {
            return Err(LoadError::Parse {
                path: path.to_path_buf(),
                line: lineno + 1,
                detail: format!("expected at least {} columns, found {}", x_col + 1, fields.len()),
            });
        }
        let parse = |col: usize| -> Result<f64, LoadError> {
            fields[col].trim().parse::<f64>().map_err(|_| LoadError::Parse {
                path: path.to_path_buf(),
                line: lineno + 1,
                detail: format!("column {} is not a number: {:?}", col, fields[col].trim()),
            })
        };
        let mut x = parse(x_col)?;
        if unit == XAxisUnit::KHz {
            x /= 1000.0;
        }
        series.x.push(x);
        series.y.push(parse(ASCII_COL_INTENSITY)?);
    }

    if series.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    Ok(series)
}

// ── Binary processed data ─────────────────────────────────────────

fn load_binary(dir: &Path, unit: XAxisUnit) -> Result<Series, LoadError> {
    let payload = dir.join(classify::INTENSITY_FILE_1D);
    if !payload.is_file() {
        if classify::is_2d_only(dir) {
            return Err(LoadError::Unsupported(dir.to_path_buf()));
        }
        return Err(LoadError::Unrecognized(dir.to_path_buf()));
    }

    let io_err = |source| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let params = procpar::extract_proc_params(&procpar::read_procs(dir).map_err(io_err)?);
    let raw = fs::read(&payload).map_err(io_err)?;

    let y = decode_intensities(&raw, &params);
    if y.is_empty() {
        return Err(LoadError::Empty(dir.to_path_buf()));
    }
    let x = build_axis(y.len(), &params, unit, dir);
    Ok(Series { x, y })
}

/// Decode the `1r` payload: int32 or float64 words in either byte
/// order, scaled by 2^NC_proc. SI caps the point count when set.
fn decode_intensities(raw: &[u8], params: &ProcParams) -> Vec<f64> {
    let scale = 2.0f64.powi(params.nc_proc);
    let little = params.bytordp == 0;

    let values: Vec<f64> = if params.dtypp == 0 {
        raw.chunks_exact(4)
            .map(|w| {
                let v = if little {
                    LittleEndian::read_i32(w)
                } else {
                    BigEndian::read_i32(w)
                };
                v as f64 * scale
            })
            .collect()
    } else {
        raw.chunks_exact(8)
            .map(|w| {
                let v = if little {
                    LittleEndian::read_f64(w)
                } else {
                    BigEndian::read_f64(w)
                };
                v * scale
            })
            .collect()
    };

    if params.si > 0 && params.si < values.len() {
        values[..params.si].to_vec()
    } else {
        values
    }
}

/// Rebuild the x axis analytically, descending from OFFSET.
///
/// Degradation is deliberate, not an error: without SF a ppm axis is
/// impossible, so a Hz axis is produced when SW_p is known; without
/// SW_p the axis falls back to plain point indices. Each fallback
/// logs one warning.
fn build_axis(n: usize, params: &ProcParams, unit: XAxisUnit, dir: &Path) -> Vec<f64> {
    if n < 2 || params.sw_hz <= 0.0 {
        if params.sw_hz <= 0.0 {
            log::warn!(
                "{}: no spectral width in procs; using point-index axis",
                dir.display()
            );
        }
        return (0..n).map(|i| i as f64).collect();
    }

    match unit {
        XAxisUnit::Ppm => {
            if params.sf_mhz > 0.0 {
                let step = (params.sw_hz / params.sf_mhz) / (n - 1) as f64;
                (0..n).map(|i| params.offset_ppm - i as f64 * step).collect()
            } else {
                log::warn!(
                    "{}: no spectrometer frequency in procs; falling back to a Hz axis",
                    dir.display()
                );
                hz_axis(n, params, dir)
            }
        }
        XAxisUnit::Hz => hz_axis(n, params, dir),
        XAxisUnit::KHz => hz_axis(n, params, dir).into_iter().map(|v| v / 1000.0).collect(),
    }
}

fn hz_axis(n: usize, params: &ProcParams, dir: &Path) -> Vec<f64> {
    let offset_hz = if params.sf_mhz > 0.0 {
        params.offset_ppm * params.sf_mhz
    } else {
        // No reference point available; anchor the axis at the
        // spectral width so it still spans [0, SW_p] descending.
        log::warn!(
            "{}: no spectrometer frequency in procs; Hz axis anchored at the spectral width",
            dir.display()
        );
        params.sw_hz
    };
    let step = params.sw_hz / (n - 1) as f64;
    (0..n).map(|i| offset_hz - i as f64 * step).collect()
}

// ── Batch loading ─────────────────────────────────────────────────

/// Outcome of loading an ordered workspace selection. `series` and
/// `sources` stay parallel and in workspace order; failures land in
/// `skipped` and never abort the batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub series: Vec<Series>,
    pub sources: Vec<PathBuf>,
    pub skipped: Vec<(PathBuf, LoadError)>,
}

pub fn load_batch(paths: &[PathBuf], unit: XAxisUnit) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for path in paths {
        match load_series(path, unit) {
            Ok(series) => {
                outcome.series.push(series);
                outcome.sources.push(path.clone());
            }
            Err(e) => {
                log::warn!("skipping dataset: {}", e);
                outcome.skipped.push((path.clone(), e));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testsupport::{temp_tree, write_file};

    const ASCII_TABLE: &str = "\
row,intensity,Hz,ppm\n\
0,10.0,4000.0,10.0\n\
1,20.0,2000.0,5.0\n\
2,5.0,0.0,0.0\n";

    fn ascii_dataset(root: &Path) -> PathBuf {
        let p = root.join("S/1/pdata/1/ascii-spec.txt");
        write_file(&p, ASCII_TABLE);
        p
    }

    fn binary_dataset(root: &Path, procs: &str, intensities: &[i32]) -> PathBuf {
        let dir = root.join("S/1/pdata/1");
        write_file(&dir.join("procs"), procs);
        let bytes: Vec<u8> = intensities.iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(dir.join("1r"), bytes).unwrap();
        dir
    }

    #[test]
    fn test_ascii_ppm_column() {
        let root = temp_tree("load-ppm");
        let p = ascii_dataset(&root);
        let s = load_series(&p, XAxisUnit::Ppm).unwrap();
        assert_eq!(s.x, vec![10.0, 5.0, 0.0]);
        assert_eq!(s.y, vec![10.0, 20.0, 5.0]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_ascii_hz_and_khz_columns() {
        let root = temp_tree("load-hz");
        let p = ascii_dataset(&root);
        let hz = load_series(&p, XAxisUnit::Hz).unwrap();
        assert_eq!(hz.x, vec![4000.0, 2000.0, 0.0]);

        let khz = load_series(&p, XAxisUnit::KHz).unwrap();
        assert_eq!(khz.x, vec![4.0, 2.0, 0.0]);
        assert_eq!(khz.y, hz.y);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_ascii_malformed_row_reports_line() {
        let root = temp_tree("load-bad");
        let p = root.join("S/1/pdata/1/ascii-spec.txt");
        write_file(&p, "h,h,h,h\n0,1.0,2.0,3.0\n0,not-a-number,2.0,3.0\n");
        match load_series(&p, XAxisUnit::Ppm) {
            Err(LoadError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_binary_axis_reconstruction() {
        let root = temp_tree("load-bin");
        // 5 points, SW 1000 Hz at SF 100 MHz → 10 ppm span, 2.5 ppm step
        let procs = "##$SI= 5\n##$NC_proc= 0\n##$SW_p= 1000.0\n##$SF= 100.0\n\
##$OFFSET= 10.0\n##$BYTORDP= 0\n##$DTYPP= 0\n";
        let dir = binary_dataset(&root, procs, &[1, 2, 3, 4, 5]);

        let s = load_series(&dir, XAxisUnit::Ppm).unwrap();
        assert_eq!(s.y, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        let expected = [10.0, 7.5, 5.0, 2.5, 0.0];
        for (got, want) in s.x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
        }

        // Hz axis: offset 10 ppm * 100 MHz = 1000 Hz, step 250 Hz
        let s = load_series(&dir, XAxisUnit::Hz).unwrap();
        let expected = [1000.0, 750.0, 500.0, 250.0, 0.0];
        for (got, want) in s.x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }

        // kHz is the same axis divided by 1000
        let s = load_series(&dir, XAxisUnit::KHz).unwrap();
        assert!((s.x[0] - 1.0).abs() < 1e-9);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_binary_nc_proc_scaling() {
        let root = temp_tree("load-scale");
        let procs = "##$SI= 2\n##$NC_proc= 2\n##$SW_p= 100.0\n##$SF= 100.0\n\
##$OFFSET= 1.0\n##$BYTORDP= 0\n##$DTYPP= 0\n";
        let dir = binary_dataset(&root, procs, &[3, -3]);
        let s = load_series(&dir, XAxisUnit::Ppm).unwrap();
        assert_eq!(s.y, vec![12.0, -12.0], "values scaled by 2^NC_proc");
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_binary_missing_sf_degrades_to_hz_axis() {
        let root = temp_tree("load-degrade");
        let procs = "##$SI= 3\n##$SW_p= 200.0\n##$OFFSET= 5.0\n##$BYTORDP= 0\n##$DTYPP= 0\n";
        let dir = binary_dataset(&root, procs, &[1, 2, 3]);
        let s = load_series(&dir, XAxisUnit::Ppm).unwrap();
        // Hz axis anchored at SW: 200 → 0 descending
        assert_eq!(s.x, vec![200.0, 100.0, 0.0]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_binary_missing_sw_degrades_to_index_axis() {
        let root = temp_tree("load-index");
        let procs = "##$SI= 3\n##$BYTORDP= 0\n##$DTYPP= 0\n";
        let dir = binary_dataset(&root, procs, &[7, 8, 9]);
        let s = load_series(&dir, XAxisUnit::Ppm).unwrap();
        assert_eq!(s.x, vec![0.0, 1.0, 2.0]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_2d_only_dataset_is_unsupported() {
        let root = temp_tree("load-2d");
        let dir = root.join("S/1/pdata/1");
        write_file(&dir.join("procs"), "##$SI= 4\n");
        write_file(&dir.join("2rr"), "");
        assert!(matches!(
            load_series(&dir, XAxisUnit::Ppm),
            Err(LoadError::Unsupported(_))
        ));
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_batch_skips_failures_and_keeps_order() {
        let root = temp_tree("load-batch");
        let good = ascii_dataset(&root);
        let missing = root.join("S/9/pdata/9/ascii-spec.txt");

        let outcome = load_batch(&[missing.clone(), good.clone()], XAxisUnit::Ppm);
        assert_eq!(outcome.series.len(), 1);
        assert_eq!(outcome.sources, vec![good]);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].0, missing);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_unit_parse_round_trip() {
        for unit in [XAxisUnit::Ppm, XAxisUnit::Hz, XAxisUnit::KHz] {
            assert_eq!(unit.to_string().parse::<XAxisUnit>().unwrap(), unit);
        }
        assert!("fathoms".parse::<XAxisUnit>().is_err());
    }
}
