use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};

/// Immutable handle to a file's bytes.
///
/// Cloning copies the handle, not the bytes. Nothing can change the data
/// behind a handle once it exists.
#[derive(Clone)]
pub enum ByteSource {
    /// Bytes held in memory (drag-and-drop payloads, tests).
    Memory(Arc<[u8]>),
    /// A file on local disk, read lazily.
    Path(PathBuf),
}

impl ByteSource {
    /// Opens the source for sequential reading.
    pub async fn open(&self) -> std::io::Result<Box<dyn AsyncRead + Send + Unpin>> {
        match self {
            Self::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
            Self::Path(path) => Ok(Box::new(tokio::fs::File::open(path).await?)),
        }
    }

    /// Reads the whole source into memory.
    pub async fn read_all(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Memory(bytes) => Ok(bytes.to_vec()),
            Self::Path(path) => tokio::fs::read(path).await,
        }
    }

    /// Reads up to `len` bytes from `reader`, returning how many were read.
    ///
    /// Used by backends that consume the source in fixed steps.
    pub async fn read_step(
        reader: &mut (dyn AsyncRead + Send + Unpin),
        len: u64,
        scratch: &mut Vec<u8>,
    ) -> std::io::Result<usize> {
        scratch.clear();
        reader.take(len).read_to_end(scratch).await
    }
}

impl fmt::Debug for ByteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
            Self::Path(path) => write!(f, "Path({})", path.display()),
        }
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Memory(bytes.into())
    }
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

/// A file as selected by the user, before validation.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub source: ByteSource,
}

impl RawFile {
    pub fn new(
        name: impl Into<String>,
        size: u64,
        mime_type: impl Into<String>,
        source: ByteSource,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            mime_type: mime_type.into(),
            source,
        }
    }

    /// An in-memory file whose size is the length of `bytes`.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes = bytes.into();
        let size = bytes.len() as u64;
        Self::new(name, size, mime_type, ByteSource::from(bytes))
    }

    /// A file with a declared size and no backing bytes.
    ///
    /// Handy when only the metadata matters, e.g. checking size limits
    /// without allocating 100 MiB.
    pub fn declared(name: impl Into<String>, size: u64, mime_type: impl Into<String>) -> Self {
        Self::new(name, size, mime_type, ByteSource::from(Vec::new()))
    }

    /// Builds a candidate from a file on disk, taking its name and size
    /// from the filesystem.
    pub async fn from_path(path: &Path, mime_type: impl Into<String>) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::new(
            name,
            metadata.len(),
            mime_type,
            ByteSource::Path(path.to_path_buf()),
        ))
    }
}
