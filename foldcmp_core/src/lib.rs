pub mod vfs;
pub mod hasher;
pub mod walker;
pub mod progress;
pub mod verifier;
pub mod tree;
pub mod engine;
pub mod report;

pub use vfs::LocalVfs;
pub use hasher::ContentHasher;
pub use walker::{TreeDiffWalker, WalkOutcome};
pub use progress::{NoopSink, ProgressSink};
pub use verifier::ParallelVerifier;
pub use tree::{CompressedNode, CompressedRow, TreeNode};
pub use engine::{check_root, ComparisonOutcome, DiffEngine, DirectoryDiff};
pub use report::{HtmlReport, ReportSink, TextTreeReport};
