//! Upload sources and sequential payload readers.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::range::ByteRange;

/// Block size for whole-body reads; each block is one progress notification.
const READ_BLOCK: usize = 64 * 1024;

/// A named binary payload to upload, backed by a file or a memory buffer.
///
/// Immutable for the duration of an upload; the name doubles as the
/// remote display name and collision key.
#[derive(Debug, Clone)]
pub struct UploadSource {
    name: String,
    size: u64,
    body: SourceBody,
}

#[derive(Debug, Clone)]
enum SourceBody {
    File(PathBuf),
    Memory(Vec<u8>),
}

impl UploadSource {
    /// Creates a source backed by a file on disk.
    ///
    /// The size is taken from file metadata and the name from the final
    /// path component.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size: meta.len(),
            body: SourceBody::File(path.to_path_buf()),
        })
    }

    /// Creates an in-memory source.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            body: SourceBody::Memory(bytes),
        }
    }

    /// Overrides the remote display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Remote display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Opens a sequential reader over the payload.
    pub async fn open(&self) -> io::Result<SourceReader> {
        let body = match &self.body {
            SourceBody::File(path) => ReaderBody::File(fs::File::open(path).await?),
            SourceBody::Memory(bytes) => ReaderBody::Memory(bytes.clone()),
        };
        Ok(SourceReader {
            body,
            total: self.size,
            offset: 0,
        })
    }
}

/// Reads an upload payload front to back.
pub struct SourceReader {
    body: ReaderBody,
    total: u64,
    offset: u64,
}

enum ReaderBody {
    File(fs::File),
    Memory(Vec<u8>),
}

impl SourceReader {
    /// Reads exactly the bytes of `range`.
    ///
    /// Ranges must be requested in plan order; the reader never seeks.
    /// A source that turns out shorter than the plan fails with
    /// `UnexpectedEof`.
    pub async fn read_range(&mut self, range: ByteRange) -> io::Result<Vec<u8>> {
        debug_assert_eq!(range.min, self.offset, "ranges must be read in order");
        let len = range.size() as usize;

        let buf = match &mut self.body {
            ReaderBody::File(file) => {
                let mut buf = vec![0u8; len];
                file.read_exact(&mut buf).await?;
                buf
            }
            ReaderBody::Memory(bytes) => {
                let start = self.offset as usize;
                let end = start.checked_add(len).filter(|&e| e <= bytes.len()).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::UnexpectedEof, "source shorter than range plan")
                })?;
                bytes[start..end].to_vec()
            }
        };

        self.offset += len as u64;
        Ok(buf)
    }

    /// Buffers the whole payload, reporting `(loaded, total)` after each
    /// block read.
    pub async fn read_all(self, mut on_read: impl FnMut(u64, u64)) -> io::Result<Vec<u8>> {
        let total = self.total;
        match self.body {
            ReaderBody::Memory(bytes) => {
                on_read(bytes.len() as u64, total);
                Ok(bytes)
            }
            ReaderBody::File(mut file) => {
                let mut out = Vec::with_capacity(total as usize);
                let mut block = vec![0u8; READ_BLOCK];
                let mut loaded = 0u64;
                loop {
                    let n = file.read(&mut block).await?;
                    if n == 0 {
                        break;
                    }
                    out.extend_from_slice(&block[..n]);
                    loaded += n as u64;
                    on_read(loaded, total);
                }
                Ok(out)
            }
        }
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> u64 {
        self.total - self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::range_plan;

    #[tokio::test]
    async fn file_source_takes_name_and_size_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"0123456789").unwrap();

        let source = UploadSource::from_path(&path).await.unwrap();
        assert_eq!(source.name(), "payload.bin");
        assert_eq!(source.size(), 10);
    }

    #[tokio::test]
    async fn with_name_overrides_display_name() {
        let source = UploadSource::from_bytes("a.bin", vec![1, 2, 3]).with_name("b.bin");
        assert_eq!(source.name(), "b.bin");
        assert_eq!(source.size(), 3);
    }

    #[tokio::test]
    async fn read_range_walks_file_in_plan_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"AABBCCDDEE").unwrap();

        let source = UploadSource::from_path(&path).await.unwrap();
        let mut reader = source.open().await.unwrap();

        let plan = range_plan(10, 4);
        assert_eq!(reader.read_range(plan[0]).await.unwrap(), b"AABB");
        assert_eq!(reader.read_range(plan[1]).await.unwrap(), b"CCDD");
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read_range(plan[2]).await.unwrap(), b"EE");
        assert_eq!(reader.remaining(), 0);
    }

    #[tokio::test]
    async fn read_range_memory_source() {
        let source = UploadSource::from_bytes("m.bin", b"0123456789".to_vec());
        let mut reader = source.open().await.unwrap();

        let plan = range_plan(10, 6);
        assert_eq!(reader.read_range(plan[0]).await.unwrap(), b"012345");
        assert_eq!(reader.read_range(plan[1]).await.unwrap(), b"6789");
    }

    #[tokio::test]
    async fn read_all_reports_progress_per_block() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let data = vec![7u8; READ_BLOCK * 2 + 100];
        std::fs::write(&path, &data).unwrap();

        let source = UploadSource::from_path(&path).await.unwrap();
        let reader = source.open().await.unwrap();

        let mut seen = Vec::new();
        let out = reader
            .read_all(|loaded, total| seen.push((loaded, total)))
            .await
            .unwrap();

        assert_eq!(out, data);
        assert!(seen.len() >= 3);
        assert!(seen.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(seen.last().unwrap().0, data.len() as u64);
        assert!(seen.iter().all(|&(_, t)| t == data.len() as u64));
    }

    #[tokio::test]
    async fn read_all_memory_reports_once() {
        let source = UploadSource::from_bytes("m.bin", vec![1u8; 1024]);
        let reader = source.open().await.unwrap();

        let mut seen = Vec::new();
        let out = reader.read_all(|loaded, total| seen.push((loaded, total))).await.unwrap();

        assert_eq!(out.len(), 1024);
        assert_eq!(seen, vec![(1024, 1024)]);
    }
}
