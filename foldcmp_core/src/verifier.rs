use crate::hasher::ContentHasher;
use crate::progress::ProgressSink;
use foldcmp_common::{
    AppConfig, ComparisonEvent, FoldCmpError, Mismatch, MismatchSet, RelativePath,
    UnreadablePolicy, Vfs,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

/// Progress counter and results, always updated together under one lock
struct VerifyState {
    completed: usize,
    mismatches: Vec<Mismatch>,
}

/// Digest-compares common files on a bounded worker pool
pub struct ParallelVerifier {
    workers: usize,
    policy: UnreadablePolicy,
    hasher: ContentHasher,
}

impl ParallelVerifier {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            policy: UnreadablePolicy::default(),
            hasher: ContentHasher::new(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.worker_count()).with_policy(config.unreadable_policy)
    }

    pub fn with_policy(mut self, policy: UnreadablePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Hash both sides of every common path and collect the mismatches.
    ///
    /// Each path is its own task on a pool of `workers` threads. Blocks until
    /// every task has finished. Mismatches come back in completion order.
    pub fn verify(
        &self,
        common: &[RelativePath],
        left: &dyn Vfs,
        right: &dyn Vfs,
        sink: &dyn ProgressSink,
        cancel: Option<&AtomicBool>,
    ) -> Result<MismatchSet, FoldCmpError> {
        if common.is_empty() {
            return Ok(MismatchSet::default());
        }

        let total = common.len();
        info!("Verifying {} common files with {} workers", total, self.workers);
        sink.on_event(&ComparisonEvent::VerifyStarted { total });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|index| format!("foldcmp-verify-{}", index))
            .build()
            .map_err(|e| FoldCmpError::Comparison(format!("Failed to start worker pool: {}", e)))?;

        let state = Mutex::new(VerifyState {
            completed: 0,
            mismatches: Vec::new(),
        });

        pool.scope(|scope| {
            for path in common {
                let state = &state;
                scope.spawn(move |_| {
                    if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                        return;
                    }

                    let left_digest = self.hasher.digest(left, path.as_path());
                    let right_digest = self.hasher.digest(right, path.as_path());
                    let mismatch = self.policy.is_mismatch(&left_digest, &right_digest);

                    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
                    if mismatch {
                        debug!("Content differs: {}", path);
                        guard.mismatches.push(Mismatch {
                            path: path.clone(),
                            left: left_digest,
                            right: right_digest,
                        });
                    }
                    guard.completed += 1;
                    sink.on_event(&ComparisonEvent::VerifyProgress {
                        completed: guard.completed,
                        total,
                    });
                });
            }
        });

        if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
            return Err(FoldCmpError::Cancelled);
        }

        let state = state.into_inner().unwrap_or_else(PoisonError::into_inner);
        info!(
            "Verification finished: {} of {} files differ",
            state.mismatches.len(),
            total
        );
        sink.on_event(&ComparisonEvent::VerifyFinished {
            mismatches: state.mismatches.len(),
        });

        Ok(MismatchSet(state.mismatches))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopSink;
    use crate::vfs::LocalVfs;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn rel(paths: &[&str]) -> Vec<RelativePath> {
        paths.iter().map(|p| RelativePath::new(p)).collect()
    }

    #[test]
    fn test_empty_common_set_dispatches_nothing() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        let events = Mutex::new(Vec::new());
        let sink = |event: &ComparisonEvent| events.lock().unwrap().push(event.clone());

        let result = ParallelVerifier::new(4)
            .verify(
                &[],
                &LocalVfs::new(left.path().to_path_buf()),
                &LocalVfs::new(right.path().to_path_buf()),
                &sink,
                None,
            )
            .unwrap();

        assert!(result.is_empty());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_detects_content_mismatch() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        write(left.path(), "a/x.txt", "same");
        write(right.path(), "a/x.txt", "same");
        write(left.path(), "a/y.txt", "left version");
        write(right.path(), "a/y.txt", "right version");

        let result = ParallelVerifier::new(2)
            .verify(
                &rel(&["a/x.txt", "a/y.txt"]),
                &LocalVfs::new(left.path().to_path_buf()),
                &LocalVfs::new(right.path().to_path_buf()),
                &NoopSink,
                None,
            )
            .unwrap();

        assert_eq!(result.sorted_paths(), rel(&["a/y.txt"]));
        let mismatch = result.iter().next().unwrap();
        assert!(!mismatch.involves_unreadable());
        assert_ne!(mismatch.left, mismatch.right);
    }

    #[test]
    fn test_progress_is_monotonic_and_complete() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        let names: Vec<String> = (0..64).map(|i| format!("dir{}/file{}.txt", i % 5, i)).collect();
        for (i, name) in names.iter().enumerate() {
            write(left.path(), name, &format!("content {}", i));
            let right_content = if i % 7 == 0 { format!("changed {}", i) } else { format!("content {}", i) };
            write(right.path(), name, &right_content);
        }
        let common: Vec<RelativePath> = names.iter().map(RelativePath::new).collect();

        let progress = Mutex::new(Vec::new());
        let sink = |event: &ComparisonEvent| {
            if let ComparisonEvent::VerifyProgress { completed, total } = event {
                progress.lock().unwrap().push((*completed, *total));
            }
        };

        let result = ParallelVerifier::new(8)
            .verify(
                &common,
                &LocalVfs::new(left.path().to_path_buf()),
                &LocalVfs::new(right.path().to_path_buf()),
                &sink,
                None,
            )
            .unwrap();

        assert_eq!(result.len(), (0..64).filter(|i| i % 7 == 0).count());

        let progress = progress.into_inner().unwrap();
        assert_eq!(progress.len(), 64);
        assert!(progress.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(progress.last(), Some(&(64, 64)));
    }

    #[test]
    fn test_unreadable_policy_applies() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        // Directories on both sides hash to the unreadable sentinel
        fs::create_dir(left.path().join("odd")).unwrap();
        fs::create_dir(right.path().join("odd")).unwrap();
        write(left.path(), "half.txt", "readable");
        fs::create_dir(right.path().join("half.txt")).unwrap();

        let left_vfs = LocalVfs::new(left.path().to_path_buf());
        let right_vfs = LocalVfs::new(right.path().to_path_buf());
        let common = rel(&["odd", "half.txt"]);

        let lenient = ParallelVerifier::new(2)
            .verify(&common, &left_vfs, &right_vfs, &NoopSink, None)
            .unwrap();
        assert_eq!(lenient.sorted_paths(), rel(&["half.txt"]));
        assert!(lenient.iter().all(|m| m.involves_unreadable()));

        let strict = ParallelVerifier::new(2)
            .with_policy(UnreadablePolicy::TreatAsMismatch)
            .verify(&common, &left_vfs, &right_vfs, &NoopSink, None)
            .unwrap();
        assert_eq!(strict.sorted_paths(), rel(&["half.txt", "odd"]));
    }

    #[test]
    fn test_cancelled_verification() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        write(left.path(), "a.txt", "a");
        write(right.path(), "a.txt", "b");

        let cancel = AtomicBool::new(true);
        let result = ParallelVerifier::new(2).verify(
            &rel(&["a.txt"]),
            &LocalVfs::new(left.path().to_path_buf()),
            &LocalVfs::new(right.path().to_path_buf()),
            &NoopSink,
            Some(&cancel),
        );

        assert!(matches!(result, Err(FoldCmpError::Cancelled)));
    }

    #[test]
    fn test_worker_count_from_config() {
        let mut config = AppConfig::default();
        config.workers = Some(3);
        assert_eq!(ParallelVerifier::from_config(&config).workers(), 3);
        assert_eq!(ParallelVerifier::new(0).workers(), 1);
    }
}
