//! Background scan worker.
//!
//! A directory import can mean walking a large tree, so it runs on
//! its own thread while the interactive surface stays responsive.
//! The worker owns nothing shared: it validates, scans, and posts one
//! [`ScanOutcome`] back over a channel. The foreground owner polls
//! [`ScanJob::try_outcome`] and performs all mutation of its own maps
//! and view state. Results are marshaled, never shared.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use thiserror::Error;

use crate::data::scan::{self, DatasetKind, ScanError, ScanResult};
use crate::data::validate::{self, LayoutError, ValidateLimits};

/// Why an import produced no tree.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// Everything a finished import hands back to the foreground thread.
#[derive(Debug)]
pub struct ScanOutcome {
    pub root: PathBuf,
    pub kind: DatasetKind,
    pub result: Result<ScanResult, ImportError>,
}

/// Handle to one running import. Dropping it detaches the worker; an
/// unread outcome is discarded harmlessly.
pub struct ScanJob {
    pub job_id: String,
    receiver: Receiver<ScanOutcome>,
}

impl ScanJob {
    /// Non-blocking poll, for a UI tick. `None` while the walk is
    /// still running or after the outcome was already taken.
    pub fn try_outcome(&self) -> Option<ScanOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the import finishes. `None` only if the worker
    /// died without reporting.
    pub fn wait(self) -> Option<ScanOutcome> {
        self.receiver.recv().ok()
    }
}

/// Start an import of `root` on a worker thread.
///
/// The worker runs the bounded structure probe first; a structural
/// rejection comes back as the outcome without the tree ever being
/// walked in full.
pub fn spawn_scan(root: PathBuf, kind: DatasetKind, limits: ValidateLimits) -> ScanJob {
    let job_id = uuid::Uuid::new_v4().to_string();
    let (sender, receiver) = mpsc::channel();

    let id = job_id.clone();
    thread::spawn(move || {
        log::info!("[import {}] {} scan of {} started", id, kind, root.display());

        let result = validate::quick_validate(&root, limits)
            .map_err(ImportError::from)
            .and_then(|()| scan::scan(&root, kind).map_err(ImportError::from));

        match &result {
            Ok(tree) => log::info!(
                "[import {}] finished: {} dataset(s)",
                id,
                tree.dataset_count()
            ),
            Err(e) => log::warn!("[import {}] rejected: {}", id, e),
        }

        // The receiver may be gone if the user moved on; that is fine.
        let _ = sender.send(ScanOutcome { root, kind, result });
    });

    ScanJob { job_id, receiver }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testsupport::{temp_tree, write_file};

    #[test]
    fn test_worker_delivers_scan_result() {
        let root = temp_tree("worker-ok");
        write_file(
            &root.join("S/1/pdata/1/ascii-spec.txt"),
            "# header\n0,1.0,2.0,3.0\n",
        );

        let job = spawn_scan(root.clone(), DatasetKind::Ascii, ValidateLimits::default());
        let outcome = job.wait().expect("worker must report");
        assert_eq!(outcome.root, root);
        let tree = outcome.result.expect("valid layout scans cleanly");
        assert_eq!(tree.dataset_count(), 1);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_worker_reports_structural_rejection() {
        let root = temp_tree("worker-low");
        write_file(
            &root.join("pdata/1/ascii-spec.txt"),
            "# header\n0,1.0,2.0,3.0\n",
        );

        let job = spawn_scan(root.clone(), DatasetKind::Ascii, ValidateLimits::default());
        let outcome = job.wait().expect("worker must report");
        match outcome.result {
            Err(ImportError::Layout(LayoutError::TooLow)) => {}
            other => panic!("expected a too-low rejection, got {:?}", other),
        }

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_try_outcome_eventually_sees_result() {
        let root = temp_tree("worker-poll");
        write_file(
            &root.join("S/1/pdata/1/ascii-spec.txt"),
            "# header\n0,1.0,2.0,3.0\n",
        );

        let job = spawn_scan(root.clone(), DatasetKind::Ascii, ValidateLimits::default());
        let mut outcome = None;
        for _ in 0..500 {
            if let Some(o) = job.try_outcome() {
                outcome = Some(o);
                break;
            }
            thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(outcome.is_some(), "poll must observe the posted outcome");

        std::fs::remove_dir_all(&root).unwrap();
    }
}
