//! Flat-file scan cache.
//!
//! One store per dataset layout, so ASCII and binary scans never mix.
//! Each store is a sequence of blocks:
//!
//! ```text
//! TOP:/absolute/path/to/top-dir
//! /absolute/path/to/top-dir/SampleA/1/pdata/10/ascii-spec.txt
//! /absolute/path/to/top-dir/SampleA/2/pdata/10/ascii-spec.txt
//!
//! TOP:/another/top-dir
//! ...
//! ```
//!
//! Saving replaces exactly the block of the top directory being saved;
//! other blocks are carried over untouched. Loading is forgiving:
//! malformed lines are skipped with a warning, a missing or empty
//! store is simply `None`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::classify;
use super::scan::DatasetKind;

/// Header prefix opening a block.
const BLOCK_HEADER: &str = "TOP:";

/// Store filename for ASCII-mode scans.
pub const ASCII_STORE_FILENAME: &str = "ascii_scan_cache.txt";

/// Store filename for binary-mode scans.
pub const BINARY_STORE_FILENAME: &str = "binary_scan_cache.txt";

/// Store path for the given layout inside a cache directory.
pub fn store_path(cache_dir: &Path, kind: DatasetKind) -> PathBuf {
    match kind {
        DatasetKind::Ascii => cache_dir.join(ASCII_STORE_FILENAME),
        DatasetKind::Binary => cache_dir.join(BINARY_STORE_FILENAME),
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cannot write cache store {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Paths are re-validated before persisting; the caller's list is a
/// claim, not a fact.
fn still_valid(path: &Path, kind: DatasetKind) -> bool {
    match kind {
        DatasetKind::Ascii => classify::is_ascii_dataset(path) && path.is_file(),
        DatasetKind::Binary => classify::is_binary_dataset(path),
    }
}

/// Replace `top_dir`'s block in the store with the (re-validated,
/// lexicographically sorted) dataset paths. Blocks for other top
/// directories are preserved as loaded. Returns how many paths were
/// kept after validation.
///
/// The store is committed by writing a temp file and renaming it over
/// the old one, so concurrent saves for different top directories
/// never leave a half-written store behind.
pub fn save_cache(
    store: &Path,
    top_dir: &Path,
    paths: &[PathBuf],
    kind: DatasetKind,
) -> Result<usize, CacheError> {
    let mut kept: Vec<PathBuf> = paths
        .iter()
        .filter(|p| still_valid(p, kind))
        .cloned()
        .collect();
    kept.sort();
    kept.dedup();

    let dropped = paths.len() - kept.len();
    if dropped > 0 {
        log::warn!(
            "cache save for {}: {} stale or duplicate path(s) dropped",
            top_dir.display(),
            dropped
        );
    }

    let mut blocks = load_cache(store).unwrap_or_default();
    match blocks.iter_mut().find(|(top, _)| top == top_dir) {
        Some((_, existing)) => *existing = kept.clone(),
        None => blocks.push((top_dir.to_path_buf(), kept.clone())),
    }

    let mut out = String::new();
    for (top, block_paths) in &blocks {
        out.push_str(BLOCK_HEADER);
        out.push_str(&top.to_string_lossy());
        out.push('\n');
        for p in block_paths {
            out.push_str(&p.to_string_lossy());
            out.push('\n');
        }
        out.push('\n');
    }

    let write_err = |source| CacheError::Write {
        path: store.to_path_buf(),
        source,
    };
    if let Some(parent) = store.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }
    let tmp = store.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    fs::write(&tmp, &out).map_err(write_err)?;
    fs::rename(&tmp, store).map_err(write_err)?;

    log::info!(
        "cache store {} updated: {} path(s) for {}",
        store.display(),
        kept.len(),
        top_dir.display()
    );
    Ok(kept.len())
}

/// Read every block of a store, in file order. `None` when the store
/// does not exist or holds no blocks. Never an error: unparseable
/// lines are skipped and summarized in one warning.
pub fn load_cache(store: &Path) -> Option<Vec<(PathBuf, Vec<PathBuf>)>> {
    let content = fs::read_to_string(store).ok()?;

    let mut blocks: Vec<(PathBuf, Vec<PathBuf>)> = Vec::new();
    let mut current: Option<(PathBuf, Vec<PathBuf>)> = None;
    let mut orphaned = 0usize;

    for line in content.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(rest) = line.strip_prefix(BLOCK_HEADER) {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            if rest.is_empty() {
                orphaned += 1;
            } else {
                current = Some((PathBuf::from(rest), Vec::new()));
            }
        } else if line.trim().is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
        } else {
            match current.as_mut() {
                Some((_, paths)) => paths.push(PathBuf::from(line)),
                None => orphaned += 1,
            }
        }
    }
    if let Some(block) = current.take() {
        blocks.push(block);
    }

    if orphaned > 0 {
        log::warn!(
            "cache store {}: {} malformed line(s) skipped; the cache may need clearing",
            store.display(),
            orphaned
        );
    }

    if blocks.is_empty() {
        None
    } else {
        Some(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testsupport::{temp_tree, write_file};

    fn ascii_leaf(root: &Path, sample: &str, expt: &str, proc: &str) -> PathBuf {
        let p = root
            .join(sample)
            .join(expt)
            .join("pdata")
            .join(proc)
            .join("ascii-spec.txt");
        write_file(&p, "# header\n1,2,3,4\n");
        p
    }

    #[test]
    fn test_save_filters_and_load_round_trips() {
        let root = temp_tree("cache-rt");
        let store = root.join("store/ascii_scan_cache.txt");
        let top = root.join("run1");
        let good = ascii_leaf(&top, "S", "1", "1");
        let gone = top.join("S/9/pdata/9/ascii-spec.txt"); // never written

        let kept = save_cache(&store, &top, &[good.clone(), gone], DatasetKind::Ascii).unwrap();
        assert_eq!(kept, 1);

        let blocks = load_cache(&store).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].0, top);
        assert_eq!(blocks[0].1, vec![good]);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_save_replaces_block_without_touching_others() {
        let root = temp_tree("cache-replace");
        let store = root.join("ascii_scan_cache.txt");
        let top_a = root.join("runA");
        let top_b = root.join("runB");
        let a1 = ascii_leaf(&top_a, "S", "1", "1");
        let a2 = ascii_leaf(&top_a, "S", "2", "1");
        let b1 = ascii_leaf(&top_b, "T", "1", "1");

        save_cache(&store, &top_a, &[a1.clone(), a2.clone()], DatasetKind::Ascii).unwrap();
        save_cache(&store, &top_b, &[b1.clone()], DatasetKind::Ascii).unwrap();

        // second save for runA: replacement, not union
        save_cache(&store, &top_a, &[a2.clone()], DatasetKind::Ascii).unwrap();

        let blocks = load_cache(&store).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].0, top_a);
        assert_eq!(blocks[0].1, vec![a2], "a1 must not linger");
        assert_eq!(blocks[1].0, top_b);
        assert_eq!(blocks[1].1, vec![b1], "runB untouched");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_paths_are_written_sorted() {
        let root = temp_tree("cache-sort");
        let store = root.join("ascii_scan_cache.txt");
        let top = root.join("run");
        let z = ascii_leaf(&top, "Z", "1", "1");
        let a = ascii_leaf(&top, "A", "1", "1");

        save_cache(&store, &top, &[z.clone(), a.clone()], DatasetKind::Ascii).unwrap();
        let blocks = load_cache(&store).unwrap();
        assert_eq!(blocks[0].1, vec![a, z]);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_missing_or_empty_store_is_none() {
        let root = temp_tree("cache-none");
        assert!(load_cache(&root.join("nope.txt")).is_none());

        let empty = root.join("empty.txt");
        write_file(&empty, "");
        assert!(load_cache(&empty).is_none());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_malformed_lines_are_skipped_not_fatal() {
        let root = temp_tree("cache-mal");
        let store = root.join("store.txt");
        write_file(
            &store,
            "/orphan/path/before/any/header\nTOP:/data/run\n/data/run/S/1/pdata/1/ascii-spec.txt\nTOP:\n",
        );
        let blocks = load_cache(&store).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].0, PathBuf::from("/data/run"));
        assert_eq!(blocks[0].1.len(), 1);
        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_store_path_per_kind() {
        let dir = Path::new("/cache");
        assert_eq!(
            store_path(dir, DatasetKind::Ascii),
            Path::new("/cache/ascii_scan_cache.txt")
        );
        assert_eq!(
            store_path(dir, DatasetKind::Binary),
            Path::new("/cache/binary_scan_cache.txt")
        );
    }
}
