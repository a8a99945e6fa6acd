use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// A path relative to a comparison root.
///
/// Keeps the native form used to reach the entry on disk next to a
/// `/`-separated display form. Names that are not valid UTF-8 are displayed
/// lossily but still resolve to the original bytes. The empty path denotes
/// the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct RelativePath {
    display: String,
    native: PathBuf,
}

impl RelativePath {
    /// The comparison root (empty relative path)
    pub fn root() -> Self {
        Self::default()
    }

    /// Normalize a textual path: `\` becomes `/`, empty and `.` segments are dropped
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path.as_ref().replace('\\', "/");
        let segments: Vec<&str> = normalized
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();
        Self {
            display: segments.join("/"),
            native: segments.iter().collect(),
        }
    }

    /// Build from a native relative path, keeping only its normal components
    pub fn from_path(path: &Path) -> Self {
        let mut native = PathBuf::new();
        let mut segments = Vec::new();
        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    native.push(name);
                    segments.push(name.to_string_lossy());
                }
                Component::ParentDir => {
                    native.push("..");
                    segments.push("..".into());
                }
                _ => {}
            }
        }
        Self {
            display: segments.join("/"),
            native,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn is_root(&self) -> bool {
        self.display.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.display.split('/').filter(|segment| !segment.is_empty())
    }

    /// Component-wise prefix test: `a/b/c` starts with `a/b`, `a/bc` does not
    pub fn starts_with(&self, ancestor: &RelativePath) -> bool {
        self.native.starts_with(&ancestor.native)
    }

    pub fn as_path(&self) -> &Path {
        &self.native
    }

}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display)
    }
}

impl From<&str> for RelativePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for RelativePath {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.display
    }
}

/// One of the two comparison roots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// root1
    Left,
    /// root2
    Right,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Directional result of the two walk passes.
///
/// The four `missing_*` lists are disjoint, and no entry has an ancestor in
/// `missing_subtrees_on_*`: a missing directory is reported once, never its
/// contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    /// Directories under the right root that are absent under the left root
    pub missing_subtrees_on_left: Vec<RelativePath>,
    /// Files under the right root that are absent under the left root
    pub missing_files_on_left: Vec<RelativePath>,
    /// Directories under the left root that are absent under the right root
    pub missing_subtrees_on_right: Vec<RelativePath>,
    /// Files under the left root that are absent under the right root
    pub missing_files_on_right: Vec<RelativePath>,
    /// Paths that are a file on one side and a directory on the other
    pub kind_conflicts: Vec<RelativePath>,
}

impl DiffReport {
    pub fn missing_subtrees_on(&self, side: Side) -> &[RelativePath] {
        match side {
            Side::Left => &self.missing_subtrees_on_left,
            Side::Right => &self.missing_subtrees_on_right,
        }
    }

    pub fn missing_files_on(&self, side: Side) -> &[RelativePath] {
        match side {
            Side::Left => &self.missing_files_on_left,
            Side::Right => &self.missing_files_on_right,
        }
    }

    pub fn missing_count(&self, side: Side) -> usize {
        self.missing_subtrees_on(side).len() + self.missing_files_on(side).len()
    }

    pub fn is_empty(&self) -> bool {
        self.missing_count(Side::Left) == 0
            && self.missing_count(Side::Right) == 0
            && self.kind_conflicts.is_empty()
    }
}

/// SHA-256 hash value (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl From<sha2::digest::Output<sha2::Sha256>> for Sha256Hash {
    fn from(output: sha2::digest::Output<sha2::Sha256>) -> Self {
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(output.as_slice());
        Self(bytes)
    }
}

/// Content digest of one side of a common path.
///
/// `Unreadable` is the sentinel for a path that is missing, not a regular
/// file, or failed while being read. Its hex form is the empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum ContentDigest {
    Sha256(Sha256Hash),
    Unreadable,
}

impl ContentDigest {
    pub fn is_unreadable(&self) -> bool {
        matches!(self, ContentDigest::Unreadable)
    }

    /// Lowercase hex digest, empty for the unreadable sentinel
    pub fn to_hex(&self) -> String {
        match self {
            ContentDigest::Sha256(hash) => hash.to_hex(),
            ContentDigest::Unreadable => String::new(),
        }
    }
}

impl From<ContentDigest> for String {
    fn from(digest: ContentDigest) -> Self {
        digest.to_hex()
    }
}

/// How two unreadable sides of a common path are judged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnreadablePolicy {
    /// Both sides unreadable compare equal
    #[default]
    TreatAsEqual,
    /// Both sides unreadable are reported as a mismatch
    TreatAsMismatch,
}

impl UnreadablePolicy {
    pub fn is_mismatch(&self, left: &ContentDigest, right: &ContentDigest) -> bool {
        match (left, right) {
            (ContentDigest::Unreadable, ContentDigest::Unreadable) => {
                *self == UnreadablePolicy::TreatAsMismatch
            }
            _ => left != right,
        }
    }
}

/// A common path whose two digests disagree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub path: RelativePath,
    pub left: ContentDigest,
    pub right: ContentDigest,
}

impl Mismatch {
    /// True when at least one side could not be hashed
    pub fn involves_unreadable(&self) -> bool {
        self.left.is_unreadable() || self.right.is_unreadable()
    }
}

/// Mismatching common paths, in completion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MismatchSet(pub Vec<Mismatch>);

impl MismatchSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mismatch> {
        self.0.iter()
    }

    /// Mismatching paths sorted lexicographically
    pub fn sorted_paths(&self) -> Vec<RelativePath> {
        let mut paths: Vec<RelativePath> = self.0.iter().map(|m| m.path.clone()).collect();
        paths.sort();
        paths
    }
}

/// Events emitted while a comparison runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonEvent {
    /// A walk pass started reading `source` and probing `other` (VFS instance ids)
    PassStarted { source: String, other: String },
    /// A walk pass finished; counts are entries missing on `missing_on`
    PassFinished {
        missing_on: Side,
        subtrees: usize,
        files: usize,
    },
    VerifyStarted { total: usize },
    VerifyProgress { completed: usize, total: usize },
    VerifyFinished { mismatches: usize },
}

/// Represents a directory entry listed by a VFS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    pub is_dir: bool,
    pub is_symlink: bool,
}

/// Metadata for a file or directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

fn default_true() -> bool {
    true
}

fn default_worker_multiplier() -> usize {
    2
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Ignore patterns (e.g., "*.o", "node_modules/")
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Whether to descend into symlinked directories.
    ///
    /// When false, a symlinked directory is skipped on the side where it is a
    /// link. Files beneath it are neither reported missing nor content-checked,
    /// even if the other root holds a real directory at the same path.
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Whether to run the digest verification pass over common files
    #[serde(default = "default_true")]
    pub verify_content: bool,

    /// How two unreadable sides of a common file are judged
    #[serde(default)]
    pub unreadable_policy: UnreadablePolicy,

    /// Worker pool size as a multiple of available cores
    #[serde(default = "default_worker_multiplier")]
    pub worker_multiplier: usize,

    /// Fixed worker pool size, overrides `worker_multiplier`
    #[serde(default)]
    pub workers: Option<usize>,

    /// Directory HTML reports are written to (temp files when unset)
    #[serde(default)]
    pub report_dir: Option<PathBuf>,

    /// Enable portable mode (config alongside binary)
    #[serde(default)]
    pub portable_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: Vec::new(),
            follow_symlinks: false,
            verify_content: true,
            unreadable_policy: UnreadablePolicy::default(),
            worker_multiplier: default_worker_multiplier(),
            workers: None,
            report_dir: None,
            portable_mode: false,
        }
    }
}

impl AppConfig {
    /// Verification pool size: explicit `workers`, else multiplier × available cores
    pub fn worker_count(&self) -> usize {
        if let Some(workers) = self.workers {
            return workers.max(1);
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        (cores * self.worker_multiplier).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_normalization() {
        assert_eq!(RelativePath::new("a\\b\\c.txt").as_str(), "a/b/c.txt");
        assert_eq!(RelativePath::new("./a//b/").as_str(), "a/b");
        assert!(RelativePath::new("").is_root());
        assert_eq!(RelativePath::from_path(Path::new("a/b/c.txt")).as_str(), "a/b/c.txt");
    }

    #[test]
    fn test_relative_path_prefix() {
        let dir = RelativePath::new("a/b");
        assert!(RelativePath::new("a/b/c").starts_with(&dir));
        assert!(dir.starts_with(&dir));
        assert!(!RelativePath::new("a/bc").starts_with(&dir));
        assert!(RelativePath::new("x").starts_with(&RelativePath::root()));
        assert_eq!(dir.as_path(), PathBuf::from("a").join("b"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_name_keeps_native_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"caf\xe9.txt");
        let native = Path::new("dir").join(name);
        let relative = RelativePath::from_path(&native);

        assert_eq!(relative.as_str(), "dir/caf\u{FFFD}.txt");
        assert_eq!(relative.as_path(), native.as_path());
        assert_ne!(relative, RelativePath::new("dir/caf\u{FFFD}.txt"));
    }

    #[test]
    fn test_relative_path_serializes_as_display_string() {
        let path = RelativePath::new("a\\b.txt");
        let text = toml::to_string(&std::collections::BTreeMap::from([("p", path.clone())])).unwrap();
        assert_eq!(text.trim(), "p = \"a/b.txt\"");

        let back: std::collections::BTreeMap<String, RelativePath> = toml::from_str(&text).unwrap();
        assert_eq!(back["p"], path);
    }

    #[test]
    fn test_unreadable_policy() {
        let hash = ContentDigest::Sha256(Sha256Hash([7; 32]));
        let other = ContentDigest::Sha256(Sha256Hash([8; 32]));
        let gone = ContentDigest::Unreadable;

        let equal = UnreadablePolicy::TreatAsEqual;
        assert!(!equal.is_mismatch(&gone, &gone));
        assert!(equal.is_mismatch(&hash, &gone));
        assert!(equal.is_mismatch(&gone, &hash));
        assert!(equal.is_mismatch(&hash, &other));
        assert!(!equal.is_mismatch(&hash, &hash));

        let strict = UnreadablePolicy::TreatAsMismatch;
        assert!(strict.is_mismatch(&gone, &gone));
        assert!(!strict.is_mismatch(&hash, &hash));
    }

    #[test]
    fn test_content_digest_hex() {
        assert_eq!(ContentDigest::Unreadable.to_hex(), "");
        let hex = ContentDigest::Sha256(Sha256Hash([0xab; 32])).to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c == 'a' || c == 'b'));
    }

    #[test]
    fn test_diff_report_counts() {
        let report = DiffReport {
            missing_subtrees_on_right: vec![RelativePath::new("b")],
            missing_files_on_right: vec![RelativePath::new("a/z.txt")],
            ..Default::default()
        };

        assert_eq!(report.missing_count(Side::Right), 2);
        assert_eq!(report.missing_count(Side::Left), 0);
        assert_eq!(report.missing_subtrees_on(Side::Right), &[RelativePath::new("b")]);
        assert!(!report.is_empty());
        assert!(DiffReport::default().is_empty());
    }

    #[test]
    fn test_config_defaults_from_empty_toml() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.verify_content);
        assert_eq!(config.worker_multiplier, 2);
        assert_eq!(config.unreadable_policy, UnreadablePolicy::TreatAsEqual);
        assert!(config.worker_count() >= 2);

        let config: AppConfig = toml::from_str("workers = 3\nunreadable_policy = \"treat_as_mismatch\"").unwrap();
        assert_eq!(config.worker_count(), 3);
        assert_eq!(config.unreadable_policy, UnreadablePolicy::TreatAsMismatch);
    }
}
