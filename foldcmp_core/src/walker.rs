use foldcmp_common::{AppConfig, FileEntry, FoldCmpError, RelativePath, Vfs};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Result of one directional pass (source read against other)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOutcome {
    /// Directories under source whose counterpart is absent under other
    pub missing_subtrees: Vec<RelativePath>,
    /// Files under source whose counterpart is absent under other
    pub missing_files: Vec<RelativePath>,
    /// File on one side, directory on the other. Collected on the canonical pass only.
    pub kind_conflicts: Vec<RelativePath>,
    /// Files present on both sides, `Some` only when collection was requested
    pub common_paths: Option<Vec<RelativePath>>,
}

impl WalkOutcome {
    pub fn missing_count(&self) -> usize {
        self.missing_subtrees.len() + self.missing_files.len()
    }
}

/// One-way depth-first tree diff.
///
/// A directory that is absent on the other side is recorded once and never
/// descended, so output and traversal cost stay proportional to the entries
/// that exist on both sides plus the pruned tops.
pub struct TreeDiffWalker {
    /// When unset, a symlinked directory on the source side is skipped outright.
    /// Nothing beneath it is reported missing or collected as common, so its
    /// files go unverified even when the other root has a real directory there.
    follow_symlinks: bool,
    ignore: Option<Gitignore>,
}

impl TreeDiffWalker {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            follow_symlinks: config.follow_symlinks,
            ignore: Self::build_ignore(&config.ignore_patterns),
        }
    }

    /// Build a Gitignore from configured patterns
    fn build_ignore(patterns: &[String]) -> Option<Gitignore> {
        if patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new("");
        for pattern in patterns {
            if let Err(err) = builder.add_line(None, pattern) {
                warn!("Ignoring invalid pattern '{}': {}", pattern, err);
            }
        }

        match builder.build() {
            Ok(ignore) => {
                debug!("Built ignore matcher with {} patterns", patterns.len());
                Some(ignore)
            }
            Err(e) => {
                warn!("Failed to build ignore matcher: {}", e);
                None
            }
        }
    }

    /// Walk `source` from its root, probing `other` for every entry.
    ///
    /// Both roots must already be known to exist; failing to list the source
    /// root is the only traversal error returned.
    pub fn walk(
        &self,
        source: &dyn Vfs,
        other: &dyn Vfs,
        collect_common: bool,
        cancel: Option<&AtomicBool>,
    ) -> Result<WalkOutcome, FoldCmpError> {
        let mut outcome = WalkOutcome {
            common_paths: collect_common.then(Vec::new),
            ..Default::default()
        };

        let root_entries = source.read_dir(RelativePath::root().as_path())?;
        self.walk_entries(source, other, root_entries, &mut outcome, cancel)?;

        debug!(
            "Walk {} -> {}: {} missing subtrees, {} missing files",
            source.instance_id(),
            other.instance_id(),
            outcome.missing_subtrees.len(),
            outcome.missing_files.len()
        );
        Ok(outcome)
    }

    fn walk_entries(
        &self,
        source: &dyn Vfs,
        other: &dyn Vfs,
        entries: Vec<FileEntry>,
        outcome: &mut WalkOutcome,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), FoldCmpError> {
        if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
            return Err(FoldCmpError::Cancelled);
        }

        for entry in entries {
            let relative = RelativePath::from_path(&entry.path);
            if relative.is_root() || self.is_ignored(&relative, entry.is_dir) {
                continue;
            }

            if entry.is_dir {
                if entry.is_symlink && !self.follow_symlinks {
                    debug!("Skipping symlinked directory {}", relative);
                    continue;
                }
                self.visit_dir(source, other, relative, outcome, cancel)?;
            } else {
                self.visit_file(other, relative, outcome);
            }
        }

        Ok(())
    }

    fn visit_dir(
        &self,
        source: &dyn Vfs,
        other: &dyn Vfs,
        relative: RelativePath,
        outcome: &mut WalkOutcome,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), FoldCmpError> {
        let native = relative.as_path().to_path_buf();

        match other.metadata(&native) {
            Ok(meta) if meta.is_dir => {}
            Ok(_) => {
                if outcome.common_paths.is_some() {
                    outcome.kind_conflicts.push(relative);
                }
                return Ok(());
            }
            Err(_) => {
                debug!("Directory absent on other side: {}", relative);
                outcome.missing_subtrees.push(relative);
                return Ok(());
            }
        }

        match source.read_dir(&native) {
            Ok(children) => self.walk_entries(source, other, children, outcome, cancel),
            Err(e) => {
                // Vanished between listing and descent, or unreadable
                warn!("Cannot read directory {}: {}", relative, e);
                outcome.missing_subtrees.push(relative);
                Ok(())
            }
        }
    }

    fn visit_file(&self, other: &dyn Vfs, relative: RelativePath, outcome: &mut WalkOutcome) {
        match other.metadata(relative.as_path()) {
            Ok(meta) if meta.is_dir => {
                if outcome.common_paths.is_some() {
                    outcome.kind_conflicts.push(relative);
                }
            }
            Ok(_) => {
                if let Some(common) = outcome.common_paths.as_mut() {
                    common.push(relative);
                }
            }
            Err(_) => {
                debug!("File absent on other side: {}", relative);
                outcome.missing_files.push(relative);
            }
        }
    }

    fn is_ignored(&self, relative: &RelativePath, is_dir: bool) -> bool {
        match self.ignore {
            Some(ref ignore) => ignore.matched(relative.as_path(), is_dir).is_ignore(),
            None => false,
        }
    }
}
