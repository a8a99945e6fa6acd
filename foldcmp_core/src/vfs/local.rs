use foldcmp_common::{FileEntry, FileMetadata, Vfs, VfsError};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Local filesystem VFS implementation (read-only)
pub struct LocalVfs {
    instance_id: String,
    root: PathBuf,
}

impl LocalVfs {
    pub fn new(root: PathBuf) -> Self {
        let instance_id = format!("local:{}", root.display());
        Self { instance_id, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Vfs for LocalVfs {
    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn metadata(&self, path: &Path) -> Result<FileMetadata, VfsError> {
        let full_path = self.root.join(path);
        let meta = fs::metadata(&full_path)?;

        Ok(FileMetadata {
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        })
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<FileEntry>, VfsError> {
        let full_path = self.root.join(path);

        if !full_path.is_dir() {
            return Err(VfsError::NotADirectory(full_path.display().to_string()));
        }

        let mut entries: Vec<FileEntry> = fs::read_dir(&full_path)?
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let file_type = entry.file_type().ok()?;
                let is_symlink = file_type.is_symlink();
                // Symlinks report their target's kind; a dangling link counts as a file
                let (is_dir, size) = if is_symlink {
                    match fs::metadata(entry.path()) {
                        Ok(meta) => (meta.is_dir(), meta.len()),
                        Err(_) => (false, 0),
                    }
                } else {
                    let meta = entry.metadata().ok()?;
                    (meta.is_dir(), meta.len())
                };
                let rel_path = entry.path().strip_prefix(&self.root).ok()?.to_path_buf();

                Some(FileEntry {
                    path: rel_path,
                    size,
                    is_dir,
                    is_symlink,
                })
            })
            .collect();

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }

    fn open_file(&self, path: &Path) -> Result<Box<dyn Read + Send>, VfsError> {
        let full_path = self.root.join(path);

        if !full_path.exists() {
            return Err(VfsError::NotFound(full_path.display().to_string()));
        }
        if !full_path.is_file() {
            return Err(VfsError::NotAFile(full_path.display().to_string()));
        }

        let file = fs::File::open(&full_path)?;
        Ok(Box::new(file))
    }
}
