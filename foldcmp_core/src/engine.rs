use crate::progress::{NoopSink, ProgressSink};
use crate::verifier::ParallelVerifier;
use crate::vfs::LocalVfs;
use crate::walker::{TreeDiffWalker, WalkOutcome};
use foldcmp_common::{
    AppConfig, ComparisonEvent, DiffReport, FoldCmpError, MismatchSet, RelativePath, Side, Vfs,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use tracing::info;

/// Structural result of comparing two roots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryDiff {
    pub report: DiffReport,
    /// Files present under both roots, gathered on the left-to-right pass only
    pub common_paths: Vec<RelativePath>,
}

/// Full result of a comparison run
#[derive(Debug, Clone)]
pub struct ComparisonOutcome {
    pub left_root: PathBuf,
    pub right_root: PathBuf,
    pub report: DiffReport,
    pub common_paths: Vec<RelativePath>,
    /// `None` when content verification was disabled
    pub mismatches: Option<MismatchSet>,
}

impl ComparisonOutcome {
    pub fn has_differences(&self) -> bool {
        !self.report.is_empty()
            || self
                .mismatches
                .as_ref()
                .map_or(false, |mismatches| !mismatches.is_empty())
    }

    pub fn root(&self, side: Side) -> &Path {
        match side {
            Side::Left => &self.left_root,
            Side::Right => &self.right_root,
        }
    }
}

/// Runs the two directional walk passes and the optional verification pass
pub struct DiffEngine {
    walker: TreeDiffWalker,
    verifier: ParallelVerifier,
    verify_content: bool,
    sink: Box<dyn ProgressSink>,
}

impl DiffEngine {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            walker: TreeDiffWalker::new(config),
            verifier: ParallelVerifier::from_config(config),
            verify_content: config.verify_content,
            sink: Box::new(NoopSink),
        }
    }

    pub fn with_content_verification(mut self, enabled: bool) -> Self {
        self.verify_content = enabled;
        self
    }

    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Compare the structure of two local roots.
    ///
    /// Both roots must exist and be directories; otherwise nothing is
    /// traversed and the precondition error is returned.
    pub fn compare(&self, root1: &Path, root2: &Path) -> Result<DirectoryDiff, FoldCmpError> {
        check_root(root1)?;
        check_root(root2)?;
        let left = LocalVfs::new(root1.to_path_buf());
        let right = LocalVfs::new(root2.to_path_buf());
        self.compare_vfs(&left, &right, None)
    }

    /// Left-to-right pass (collecting common files), then right-to-left
    pub fn compare_vfs(
        &self,
        left: &dyn Vfs,
        right: &dyn Vfs,
        cancel: Option<&AtomicBool>,
    ) -> Result<DirectoryDiff, FoldCmpError> {
        let forward = self.run_pass(left, right, Side::Right, true, cancel)?;
        let backward = self.run_pass(right, left, Side::Left, false, cancel)?;

        let report = DiffReport {
            missing_subtrees_on_left: backward.missing_subtrees,
            missing_files_on_left: backward.missing_files,
            missing_subtrees_on_right: forward.missing_subtrees,
            missing_files_on_right: forward.missing_files,
            kind_conflicts: forward.kind_conflicts,
        };

        Ok(DirectoryDiff {
            report,
            common_paths: forward.common_paths.unwrap_or_default(),
        })
    }

    fn run_pass(
        &self,
        source: &dyn Vfs,
        other: &dyn Vfs,
        missing_on: Side,
        collect_common: bool,
        cancel: Option<&AtomicBool>,
    ) -> Result<WalkOutcome, FoldCmpError> {
        info!(
            "Reading {} and collecting entries missing from {}",
            source.instance_id(),
            other.instance_id()
        );
        self.sink.on_event(&ComparisonEvent::PassStarted {
            source: source.instance_id().to_string(),
            other: other.instance_id().to_string(),
        });

        let outcome = self.walker.walk(source, other, collect_common, cancel)?;

        info!(
            "{} is missing {} entries ({} directories, {} files)",
            other.instance_id(),
            outcome.missing_count(),
            outcome.missing_subtrees.len(),
            outcome.missing_files.len()
        );
        self.sink.on_event(&ComparisonEvent::PassFinished {
            missing_on,
            subtrees: outcome.missing_subtrees.len(),
            files: outcome.missing_files.len(),
        });

        Ok(outcome)
    }

    /// Digest-verify the given common paths
    pub fn verify(
        &self,
        common_paths: &[RelativePath],
        left: &dyn Vfs,
        right: &dyn Vfs,
        cancel: Option<&AtomicBool>,
    ) -> Result<MismatchSet, FoldCmpError> {
        self.verifier
            .verify(common_paths, left, right, self.sink.as_ref(), cancel)
    }

    /// Structural comparison followed by verification when enabled
    pub fn run(&self, root1: &Path, root2: &Path) -> Result<ComparisonOutcome, FoldCmpError> {
        self.run_with_cancel(root1, root2, None)
    }

    pub fn run_with_cancel(
        &self,
        root1: &Path,
        root2: &Path,
        cancel: Option<&AtomicBool>,
    ) -> Result<ComparisonOutcome, FoldCmpError> {
        let left_root = check_root(root1)?;
        let right_root = check_root(root2)?;
        let left = LocalVfs::new(left_root.clone());
        let right = LocalVfs::new(right_root.clone());

        let diff = self.compare_vfs(&left, &right, cancel)?;

        let mismatches = if self.verify_content {
            Some(self.verify(&diff.common_paths, &left, &right, cancel)?)
        } else {
            info!("Content verification disabled");
            None
        };

        Ok(ComparisonOutcome {
            left_root,
            right_root,
            report: diff.report,
            common_paths: diff.common_paths,
            mismatches,
        })
    }
}

/// Precondition check for a comparison root, returning it lexically normalized
pub fn check_root(path: &Path) -> Result<PathBuf, FoldCmpError> {
    if !path.exists() {
        return Err(FoldCmpError::RootNotFound {
            path: path.to_path_buf(),
        });
    }
    if !path.is_dir() {
        return Err(FoldCmpError::RootNotADirectory {
            path: path.to_path_buf(),
        });
    }
    Ok(path.components().collect())
}
