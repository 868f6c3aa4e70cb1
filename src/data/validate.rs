//! Pre-scan structure validation.
//!
//! Before committing to a full walk, a bounded breadth-first probe
//! decides whether the user picked a directory at the right nesting
//! level. The visit and depth caps are the scan cost ceiling on
//! arbitrarily large or wrongly chosen trees; keep them conservative.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use thiserror::Error;

use super::classify;

/// Caps on the exploratory search.
#[derive(Debug, Clone, Copy)]
pub struct ValidateLimits {
    /// Relative depth (in directory components) at which a dataset's
    /// process directory is expected: `<sample>/<expt>/pdata/<proc>`.
    pub expected_depth: usize,
    /// Directory visits allowed before giving up.
    pub max_visits: usize,
    /// Levels below the selection the probe may descend.
    pub max_depth: usize,
}

impl Default for ValidateLimits {
    fn default() -> Self {
        Self {
            expected_depth: 4,
            max_visits: 256,
            max_depth: 8,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The selection sits inside an experiment tree.
    #[error("selection is too low: it contains a pdata folder; select the directory holding the samples instead")]
    TooLow,
    /// Leaves exist, but deeper than the expected level.
    #[error("selection is too high: a dataset was found {found} levels down instead of {expected}")]
    TooHigh { found: usize, expected: usize },
    /// Visit budget ran out before any verdict.
    #[error("selection is too high: nothing recognizable within the first {0} directories")]
    Ambiguous(usize),
    /// Bounded search exhausted without finding any dataset.
    #[error("no spectrum dataset layout detected under the selection")]
    NotDetected,
}

fn hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// True when `dir` is a dataset's process directory by either layout:
/// it holds the fixed ASCII export file, or the binary payload pair.
fn is_leaf(dir: &Path) -> bool {
    dir.join(classify::ASCII_SPEC_FILENAME).is_file() || classify::is_binary_dataset(dir)
}

/// Cheap structural check of a user-selected directory.
///
/// Returns `Ok(())` when the first dataset found sits exactly
/// `expected_depth` levels down; otherwise a [`LayoutError`] naming
/// the direction of the mistake. Runs in bounded time regardless of
/// the tree underneath.
pub fn quick_validate(selected: &Path, limits: ValidateLimits) -> Result<(), LayoutError> {
    // A direct pdata child means the user clicked into an experiment.
    if let Ok(entries) = fs::read_dir(selected) {
        for entry in entries.flatten() {
            if entry.file_name() == classify::PDATA_DIR && entry.path().is_dir() {
                return Err(LayoutError::TooLow);
            }
        }
    }

    let mut queue: VecDeque<(std::path::PathBuf, usize)> = VecDeque::new();
    queue.push_back((selected.to_path_buf(), 0));
    let mut visits = 0usize;

    while let Some((dir, depth)) = queue.pop_front() {
        visits += 1;
        if visits > limits.max_visits {
            log::warn!(
                "structure probe of {} gave up after {} directory visits",
                selected.display(),
                limits.max_visits
            );
            return Err(LayoutError::Ambiguous(limits.max_visits));
        }

        if depth > 0 && is_leaf(&dir) {
            if depth == limits.expected_depth {
                return Ok(());
            }
            if depth > limits.expected_depth {
                return Err(LayoutError::TooHigh {
                    found: depth,
                    expected: limits.expected_depth,
                });
            }
            // Shallower than expected: unusual, keep probing in case a
            // properly nested dataset exists alongside.
            continue;
        }

        if depth >= limits.max_depth {
            continue;
        }
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            if !hidden(&name) && path.is_dir() {
                queue.push_back((path, depth + 1));
            }
        }
    }

    Err(LayoutError::NotDetected)
}
