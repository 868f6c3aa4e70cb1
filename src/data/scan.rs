//! Directory scanning: walk a chosen root and collect every leaf
//! dataset into a sample-keyed tree.
//!
//! A scan is a pure read of the filesystem. Anything that goes wrong
//! below the root (unreadable subdirectory, vanished entry) degrades
//! to a logged skip; only a root that cannot be opened at all is an
//! error.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::classify;

/// Which dataset layout a scan looks for. Also selects which of the
/// two cache stores the result is persisted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetKind {
    Ascii,
    Binary,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Ascii => write!(f, "ascii"),
            DatasetKind::Binary => write!(f, "binary"),
        }
    }
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("scan root {0} is not a directory")]
    NotADirectory(PathBuf),
    #[error("cannot read scan root {path}: {source}")]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One discovered dataset within a sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetEntry {
    /// Display label, `"Expt {experiment}, proc {process}"`.
    pub label: String,
    pub experiment: String,
    pub process: String,
    pub path: PathBuf,
}

/// Result of one scan: top-directory label → sample → ordered datasets.
///
/// Within each sample, entries are sorted ascending by numeric
/// `(experiment, process)`; ids that are not plain numbers sort last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root_label: String,
    pub samples: BTreeMap<String, Vec<DatasetEntry>>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dataset_count(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    /// Every dataset path, sample by sample, in display order.
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.samples
            .values()
            .flat_map(|entries| entries.iter().map(|e| e.path.clone()))
            .collect()
    }
}

/// Scans already imported this session, keyed by top-directory label.
/// Re-importing a known top directory replaces its samples; new top
/// directories append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanCollection {
    pub roots: Vec<ScanResult>,
}

impl ScanCollection {
    pub fn merge(&mut self, incoming: ScanResult) {
        match self
            .roots
            .iter_mut()
            .find(|r| r.root_label == incoming.root_label)
        {
            Some(existing) => {
                for (sample, entries) in incoming.samples {
                    existing.samples.insert(sample, entries);
                }
            }
            None => self.roots.push(incoming),
        }
    }

    pub fn remove_root(&mut self, label: &str) -> bool {
        let before = self.roots.len();
        self.roots.retain(|r| r.root_label != label);
        self.roots.len() != before
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}

// ── Walking ───────────────────────────────────────────────────────

fn hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// Sort key for experiment/process ids: plain numbers ascending,
/// everything else pushed past them with a sentinel. Never fails.
fn numeric_key(id: &str) -> u64 {
    id.parse::<u64>().unwrap_or(u64::MAX)
}

fn dataset_label(experiment: &str, process: &str) -> String {
    format!("Expt {}, proc {}", experiment, process)
}

/// Scan `root` for leaf datasets of the given kind.
///
/// The sample a dataset belongs to is the first path component below
/// `root`; samples without any accepted leaf are dropped. The result
/// is keyed by `basename(root)`. Deterministic: two scans of an
/// unchanged tree return identical results.
pub fn scan(root: &Path, kind: DatasetKind) -> Result<ScanResult, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut samples: BTreeMap<String, Vec<DatasetEntry>> = BTreeMap::new();
    let top = fs::read_dir(root).map_err(|source| ScanError::RootUnreadable {
        path: root.to_path_buf(),
        source,
    })?;

    for entry in top.flatten() {
        let sample_dir = entry.path();
        let sample = entry.file_name().to_string_lossy().into_owned();
        if hidden(&sample) || !sample_dir.is_dir() {
            continue;
        }
        let mut found = Vec::new();
        collect_leaves(&sample_dir, kind, &mut found);
        if found.is_empty() {
            continue;
        }
        found.sort_by_key(|e| (numeric_key(&e.experiment), numeric_key(&e.process)));
        samples.insert(sample, found);
    }

    let root_label = root
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.to_string_lossy().into_owned());

    let result = ScanResult { root_label, samples };
    log::info!(
        "{} scan of {}: {} dataset(s) in {} sample(s)",
        kind,
        root.display(),
        result.dataset_count(),
        result.samples.len()
    );
    Ok(result)
}

fn collect_leaves(dir: &Path, kind: DatasetKind, out: &mut Vec<DatasetEntry>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("skipping unreadable directory {}: {}", dir.display(), e);
            return;
        }
    };

    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if hidden(&name) {
            continue;
        }
        let path = entry.path();
        match kind {
            DatasetKind::Ascii => {
                if path.is_file() && classify::is_ascii_dataset(&path) {
                    out.push(entry_for(&path));
                } else if path.is_dir() {
                    collect_leaves(&path, kind, out);
                }
            }
            DatasetKind::Binary => {
                if path.is_dir() {
                    if classify::is_binary_dataset(&path) {
                        out.push(entry_for(&path));
                    } else {
                        collect_leaves(&path, kind, out);
                    }
                }
            }
        }
    }
}

fn entry_for(path: &Path) -> DatasetEntry {
    let (experiment, process) = classify::extract_ids(path);
    DatasetEntry {
        label: dataset_label(&experiment, &process),
        experiment,
        process,
        path: path.to_path_buf(),
    }
}

/// Rebuild a [`ScanResult`] from cached dataset paths without touching
/// the tree below `top_dir`. Paths that do not sit under `top_dir`
/// cannot be assigned a sample and are skipped with a warning.
pub fn from_cached_paths(top_dir: &Path, paths: &[PathBuf]) -> ScanResult {
    let mut samples: BTreeMap<String, Vec<DatasetEntry>> = BTreeMap::new();

    for path in paths {
        let rel = match path.strip_prefix(top_dir) {
            Ok(rel) => rel,
            Err(_) => {
                log::warn!(
                    "cached path {} is not under {}; skipped",
                    path.display(),
                    top_dir.display()
                );
                continue;
            }
        };
        let sample = match rel.components().next() {
            Some(c) => c.as_os_str().to_string_lossy().into_owned(),
            None => continue,
        };
        samples.entry(sample).or_default().push(entry_for(path));
    }

    for entries in samples.values_mut() {
        entries.sort_by_key(|e| (numeric_key(&e.experiment), numeric_key(&e.process)));
    }

    let root_label = top_dir
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| top_dir.to_string_lossy().into_owned());

    ScanResult { root_label, samples }
}
