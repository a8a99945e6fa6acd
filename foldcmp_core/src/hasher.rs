use foldcmp_common::{ContentDigest, Sha256Hash, Vfs};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read block size used while streaming file content into the hash
pub const BLOCK_SIZE: usize = 1024 * 1024;

/// Streams files through SHA-256.
///
/// Holds no mutable state, so one instance can be shared by every
/// verification worker.
#[derive(Debug, Clone, Copy)]
pub struct ContentHasher {
    block_size: usize,
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            block_size: BLOCK_SIZE,
        }
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    /// Digest of `path` under `vfs`.
    ///
    /// Missing paths, non-regular files and read failures all yield
    /// `ContentDigest::Unreadable` instead of an error.
    pub fn digest(&self, vfs: &dyn Vfs, path: &Path) -> ContentDigest {
        match vfs.metadata(path) {
            Ok(meta) if meta.is_file => {}
            Ok(_) => {
                debug!("Not a regular file, digest unavailable: {:?}", path);
                return ContentDigest::Unreadable;
            }
            Err(e) => {
                debug!("Cannot stat {:?}: {}", path, e);
                return ContentDigest::Unreadable;
            }
        }

        let reader = match vfs.open_file(path) {
            Ok(reader) => reader,
            Err(e) => {
                debug!("Cannot open {:?}: {}", path, e);
                return ContentDigest::Unreadable;
            }
        };

        match self.hash_reader(reader) {
            Ok(hash) => ContentDigest::Sha256(hash),
            Err(e) => {
                debug!("Read failed for {:?}: {}", path, e);
                ContentDigest::Unreadable
            }
        }
    }

    /// Digest of a file on the local filesystem
    pub fn digest_file(&self, path: &Path) -> ContentDigest {
        if !path.is_file() {
            return ContentDigest::Unreadable;
        }
        match std::fs::File::open(path) {
            Ok(file) => self
                .hash_reader(file)
                .map(ContentDigest::Sha256)
                .unwrap_or(ContentDigest::Unreadable),
            Err(e) => {
                debug!("Cannot open {:?}: {}", path, e);
                ContentDigest::Unreadable
            }
        }
    }

    pub fn hash_reader<R: Read>(&self, mut reader: R) -> std::io::Result<Sha256Hash> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0; self.block_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hasher.finalize().into())
    }
}
