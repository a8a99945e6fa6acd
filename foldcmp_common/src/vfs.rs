use crate::{FileEntry, FileMetadata, VfsError};
use std::io::Read;
use std::path::Path;

/// Read-only view of one comparison root.
///
/// Paths handed to a `Vfs` are relative to its root; the empty path is the
/// root itself. Implementations must be shareable across the verification
/// workers, hence `Send + Sync`.
pub trait Vfs: Send + Sync {
    /// Uniquely identifies the VFS instance (e.g., "local:/data/photos")
    fn instance_id(&self) -> &str;

    /// Returns the metadata for a specific path, following symlinks
    fn metadata(&self, path: &Path) -> Result<FileMetadata, VfsError>;

    /// Lists the contents of a directory
    fn read_dir(&self, path: &Path) -> Result<Vec<FileEntry>, VfsError>;

    /// Opens a regular file for reading
    fn open_file(&self, path: &Path) -> Result<Box<dyn Read + Send>, VfsError>;
}
