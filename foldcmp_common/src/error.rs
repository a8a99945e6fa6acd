use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoldCmpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("VFS error: {0}")]
    Vfs(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Comparison error: {0}")]
    Comparison(String),

    /// A comparison root does not exist; nothing has been traversed yet.
    #[error("Root does not exist: {}", path.display())]
    RootNotFound { path: PathBuf },

    #[error("Root is not a directory: {}", path.display())]
    RootNotADirectory { path: PathBuf },

    #[error("Comparison cancelled")]
    Cancelled,

    #[error("Report error: {0}")]
    Report(String),
}

impl FoldCmpError {
    /// True for errors raised by the root checks that run before any traversal
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FoldCmpError::RootNotFound { .. } | FoldCmpError::RootNotADirectory { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FoldCmpError>;

#[derive(Error, Debug)]
pub enum VfsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Not a file: {0}")]
    NotAFile(String),
}

impl From<VfsError> for FoldCmpError {
    fn from(err: VfsError) -> Self {
        FoldCmpError::Vfs(err.to_string())
    }
}
