//! Upload sources: positional readers for the parallel strategy and plain
//! async readers for streams.

use async_trait::async_trait;
use bytes::Bytes;
use std::{fs::File, io, path::Path, sync::Arc};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads at arbitrary offsets without disturbing concurrent reads.
///
/// The buffer is passed by value and handed back filled, so every worker keeps
/// its own allocation across parts.
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read up to `len` bytes starting at `offset`, stopping early only at EOF.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying read fails
    async fn read_at(&self, buf: Vec<u8>, offset: u64, len: u64) -> io::Result<Vec<u8>>;
}

/// Positional reads on a file, safe to share between workers.
#[derive(Debug, Clone)]
pub struct FileSource {
    file: Arc<File>,
}

impl FileSource {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be opened
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: Arc::new(File::open(path)?),
        })
    }

    /// # Errors
    ///
    /// Will return `Err` if the file metadata can not be read
    pub fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

#[async_trait]
impl ReadAt for FileSource {
    async fn read_at(&self, mut buf: Vec<u8>, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let file = Arc::clone(&self.file);

        tokio::task::spawn_blocking(move || {
            let len = usize::try_from(len)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

            buf.clear();
            buf.resize(len, 0);

            let mut filled = 0;
            while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
                let n = read_at_offset(&file, rest, offset + filled as u64)?;
                if n == 0 {
                    break;
                }
                filled += n;
            }

            buf.truncate(filled);

            Ok(buf)
        })
        .await
        .map_err(io::Error::other)?
    }
}

#[cfg(unix)]
fn read_at_offset(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::unix::fs::FileExt;

    loop {
        match file.read_at(buf, offset) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}

#[cfg(windows)]
fn read_at_offset(file: &File, buf: &mut [u8], offset: u64) -> io::Result<usize> {
    use std::os::windows::fs::FileExt;

    loop {
        match file.seek_read(buf, offset) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            result => return result,
        }
    }
}

#[async_trait]
impl ReadAt for Bytes {
    async fn read_at(&self, mut buf: Vec<u8>, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.len());
        let end = usize::try_from(offset.saturating_add(len))
            .unwrap_or(usize::MAX)
            .min(self.len());

        buf.clear();
        buf.extend_from_slice(self.slice(start..end).as_ref());

        Ok(buf)
    }
}

/// Where the object bytes come from.
pub enum Source {
    RandomAccess {
        reader: Arc<dyn ReadAt>,
        size: u64,
    },
    Stream {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        size: Option<u64>,
    },
}

impl Source {
    /// # Errors
    ///
    /// Will return `Err` if the file can not be opened
    pub fn file(path: &Path) -> io::Result<Self> {
        let file = FileSource::open(path)?;
        let size = file.size()?;

        Ok(Self::RandomAccess {
            reader: Arc::new(file),
            size,
        })
    }

    #[must_use]
    pub fn bytes(bytes: Bytes) -> Self {
        let size = bytes.len() as u64;

        Self::RandomAccess {
            reader: Arc::new(bytes),
            size,
        }
    }

    #[must_use]
    pub fn stream<R>(reader: R, size: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Stream {
            reader: Box::new(reader),
            size,
        }
    }

    /// Declared size, `None` when unknown.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        match self {
            Self::RandomAccess { size, .. } => Some(*size),
            Self::Stream { size, .. } => *size,
        }
    }

    #[must_use]
    pub const fn is_random_access(&self) -> bool {
        matches!(self, Self::RandomAccess { .. })
    }

    /// Sequential view of the source, random-access readers are read front to
    /// back.
    #[must_use]
    pub fn into_reader(self) -> SequentialReader {
        match self {
            Self::RandomAccess { reader, size } => SequentialReader::At {
                reader,
                offset: 0,
                size,
            },
            Self::Stream { reader, .. } => SequentialReader::Stream(reader),
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RandomAccess { size, .. } => f
                .debug_struct("RandomAccess")
                .field("size", size)
                .finish_non_exhaustive(),
            Self::Stream { size, .. } => f
                .debug_struct("Stream")
                .field("size", size)
                .finish_non_exhaustive(),
        }
    }
}

pub enum SequentialReader {
    At {
        reader: Arc<dyn ReadAt>,
        offset: u64,
        size: u64,
    },
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl SequentialReader {
    /// Fill `buf` with up to `len` bytes, fewer only at the end of the source.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the underlying read fails
    pub async fn read_full(&mut self, buf: Vec<u8>, len: u64) -> io::Result<Vec<u8>> {
        match self {
            Self::At {
                reader,
                offset,
                size,
            } => {
                let len = len.min(size.saturating_sub(*offset));
                let buf = reader.read_at(buf, *offset, len).await?;
                *offset += buf.len() as u64;
                Ok(buf)
            }

            Self::Stream(reader) => {
                let mut buf = buf;
                buf.clear();
                reader.take(len).read_to_end(&mut buf).await?;
                Ok(buf)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_file_source_read_at() {
        let mut tmp_file = NamedTempFile::new().unwrap();
        tmp_file.write_all(b"0123456789").unwrap();

        let file = FileSource::open(tmp_file.path()).unwrap();
        assert_eq!(file.size().unwrap(), 10);

        let buf = file.read_at(Vec::with_capacity(4), 3, 4).await.unwrap();
        assert_eq!(buf, b"3456");

        // short read at the end
        let buf = file.read_at(buf, 8, 4).await.unwrap();
        assert_eq!(buf, b"89");

        let buf = file.read_at(buf, 20, 4).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_bytes_read_at() {
        let bytes = Bytes::from_static(b"hello world");
        let buf = bytes.read_at(Vec::new(), 6, 5).await.unwrap();
        assert_eq!(buf, b"world");
        let buf = bytes.read_at(buf, 9, 100).await.unwrap();
        assert_eq!(buf, b"ld");
        let buf = bytes.read_at(buf, 100, 1).await.unwrap();
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn test_source_size() {
        let source = Source::bytes(Bytes::from_static(b"abc"));
        assert_eq!(source.size(), Some(3));
        assert!(source.is_random_access());

        let source = Source::stream(&b"abc"[..], None);
        assert_eq!(source.size(), None);
        assert!(!source.is_random_access());
    }

    #[tokio::test]
    async fn test_sequential_reader() {
        for source in [
            Source::bytes(Bytes::from_static(b"abcdefg")),
            Source::stream(&b"abcdefg"[..], Some(7)),
        ] {
            let mut reader = source.into_reader();
            let buf = reader.read_full(Vec::new(), 3).await.unwrap();
            assert_eq!(buf, b"abc");
            let buf = reader.read_full(buf, 3).await.unwrap();
            assert_eq!(buf, b"def");
            let buf = reader.read_full(buf, 3).await.unwrap();
            assert_eq!(buf, b"g");
            let buf = reader.read_full(buf, 3).await.unwrap();
            assert!(buf.is_empty());
        }
    }
}
