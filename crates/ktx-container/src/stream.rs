//! Random-access byte streams.
//!
//! The container codec does all of its I/O through [`KtxStream`], a small
//! random-access trait with explicit positioning. Three backends ship with
//! the crate:
//!
//! - [`FileStream`]: buffered file on disk
//! - [`MemStream`]: growable in-memory buffer
//! - [`CustomStream`]: adapter over any `Read + Seek` type
//!
//! Callers with exotic I/O (mmap, sandboxed handles, network blobs)
//! implement [`KtxStream`] directly; the codec never assumes a concrete
//! backend.
//!
//! Positioning is strict: seeking past the end of the stream is
//! [`TextureError::SeekOutOfBounds`], not a silent EOF, because every
//! region offset in a well-formed container points inside the file.

use ktx_core::{TextureError, TextureResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Random-access byte stream used by the container codec.
pub trait KtxStream {
    /// Fills `buf` completely or fails with [`TextureError::UnexpectedEof`].
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> TextureResult<()>;

    /// Writes all of `buf` at the current position.
    fn write_all_bytes(&mut self, buf: &[u8]) -> TextureResult<()>;

    /// Current position from the start of the stream.
    fn position(&mut self) -> TextureResult<u64>;

    /// Moves to an absolute position. Positions beyond the end are an
    /// error for read-oriented streams.
    fn set_position(&mut self, offset: u64) -> TextureResult<()>;

    /// Total stream size in bytes.
    fn size(&mut self) -> TextureResult<u64>;

    /// Advances past `count` bytes without reading them.
    fn skip(&mut self, count: u64) -> TextureResult<()> {
        let position = self.position()?;
        self.set_position(position + count)
    }
}

/// Buffered read/write stream over a file on disk.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    size: u64,
}

impl FileStream {
    /// Opens an existing file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> TextureResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| TextureError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let size = file
            .metadata()
            .map_err(|source| TextureError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        Ok(Self { file, size })
    }

    /// Creates (or truncates) a file for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> TextureResult<Self> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|source| TextureError::OpenFailed {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self { file, size: 0 })
    }

    /// Wraps an already-open file handle.
    pub fn from_file(file: File) -> TextureResult<Self> {
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

impl KtxStream for FileStream {
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> TextureResult<()> {
        let offset = self.position()?;
        self.file.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TextureError::UnexpectedEof {
                    offset,
                    needed: buf.len() as u64,
                }
            } else {
                TextureError::Io(e)
            }
        })
    }

    fn write_all_bytes(&mut self, buf: &[u8]) -> TextureResult<()> {
        self.file.write_all(buf).map_err(TextureError::WriteFailed)?;
        let position = self.position()?;
        self.size = self.size.max(position);
        Ok(())
    }

    fn position(&mut self) -> TextureResult<u64> {
        Ok(self.file.stream_position()?)
    }

    fn set_position(&mut self, offset: u64) -> TextureResult<()> {
        if offset > self.size {
            return Err(TextureError::SeekOutOfBounds {
                offset,
                size: self.size,
            });
        }
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn size(&mut self) -> TextureResult<u64> {
        Ok(self.size)
    }
}

/// Growable in-memory stream.
///
/// Reading past the end or seeking beyond the current length is an error;
/// writing at the end grows the buffer.
#[derive(Debug, Default, Clone)]
pub struct MemStream {
    data: Vec<u8>,
    position: usize,
}

impl MemStream {
    /// Empty stream, ready for writing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream positioned at the start of `data`.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data, position: 0 }
    }

    /// Stream over a copy of `data`.
    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Consumes the stream and returns the underlying buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    /// Borrow of the underlying buffer.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl KtxStream for MemStream {
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> TextureResult<()> {
        let available = self.data.len() - self.position;
        if buf.len() > available {
            return Err(TextureError::UnexpectedEof {
                offset: self.position as u64,
                needed: (buf.len() - available) as u64,
            });
        }
        buf.copy_from_slice(&self.data[self.position..self.position + buf.len()]);
        self.position += buf.len();
        Ok(())
    }

    fn write_all_bytes(&mut self, buf: &[u8]) -> TextureResult<()> {
        let end = self.position + buf.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(())
    }

    fn position(&mut self) -> TextureResult<u64> {
        Ok(self.position as u64)
    }

    fn set_position(&mut self, offset: u64) -> TextureResult<()> {
        if offset > self.data.len() as u64 {
            return Err(TextureError::SeekOutOfBounds {
                offset,
                size: self.data.len() as u64,
            });
        }
        self.position = offset as usize;
        Ok(())
    }

    fn size(&mut self) -> TextureResult<u64> {
        Ok(self.data.len() as u64)
    }
}

/// Adapter turning any `Read + Seek` type into a [`KtxStream`].
///
/// Covers `std::io::Cursor`, buffered readers over pipes-with-seek, and
/// caller-supplied handles. Writing through the adapter requires the inner
/// type to also implement `Write`; the read-only blanket returns
/// [`TextureError::InvalidOperation`] from [`KtxStream::write_all_bytes`].
pub struct CustomStream<T> {
    inner: T,
    size: u64,
}

impl<T: Read + Seek> CustomStream<T> {
    /// Wraps `inner`, measuring its size with a seek to the end.
    pub fn new(mut inner: T) -> TextureResult<Self> {
        let position = inner.stream_position()?;
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(position))?;
        Ok(Self { inner, size })
    }

    /// Consumes the adapter and returns the inner value.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Seek> KtxStream for CustomStream<T> {
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> TextureResult<()> {
        let offset = self.inner.stream_position()?;
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                TextureError::UnexpectedEof {
                    offset,
                    needed: buf.len() as u64,
                }
            } else {
                TextureError::Io(e)
            }
        })
    }

    fn write_all_bytes(&mut self, _buf: &[u8]) -> TextureResult<()> {
        Err(TextureError::InvalidOperation(
            "custom stream adapter is read-only",
        ))
    }

    fn position(&mut self) -> TextureResult<u64> {
        Ok(self.inner.stream_position()?)
    }

    fn set_position(&mut self, offset: u64) -> TextureResult<()> {
        if offset > self.size {
            return Err(TextureError::SeekOutOfBounds {
                offset,
                size: self.size,
            });
        }
        self.inner.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    fn size(&mut self) -> TextureResult<u64> {
        Ok(self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    #[test]
    fn mem_stream_read_write() {
        let mut stream = MemStream::new();
        stream.write_all_bytes(b"hello world").unwrap();
        assert_eq!(stream.size().unwrap(), 11);

        stream.set_position(6).unwrap();
        let mut buf = [0u8; 5];
        stream.read_exact_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"world");
    }

    #[test]
    fn mem_stream_rejects_seek_past_end() {
        let mut stream = MemStream::from_slice(b"abc");
        let err = stream.set_position(4).unwrap_err();
        assert!(matches!(
            err,
            TextureError::SeekOutOfBounds { offset: 4, size: 3 }
        ));
    }

    #[test]
    fn mem_stream_short_read_reports_eof() {
        let mut stream = MemStream::from_slice(b"abc");
        let mut buf = [0u8; 8];
        let err = stream.read_exact_bytes(&mut buf).unwrap_err();
        assert!(matches!(
            err,
            TextureError::UnexpectedEof { offset: 0, needed: 5 }
        ));
    }

    #[test]
    fn skip_advances() {
        let mut stream = MemStream::from_slice(b"0123456789");
        stream.skip(4).unwrap();
        let mut buf = [0u8; 2];
        stream.read_exact_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"45");
    }

    #[test]
    fn custom_stream_over_cursor() {
        let mut stream = CustomStream::new(Cursor::new(b"payload".to_vec())).unwrap();
        assert_eq!(stream.size().unwrap(), 7);
        let mut buf = [0u8; 7];
        stream.read_exact_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"payload");
        assert!(matches!(
            stream.write_all_bytes(b"x").unwrap_err(),
            TextureError::InvalidOperation(_)
        ));
    }

    #[test]
    fn file_stream_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stream.bin");
        {
            let mut stream = FileStream::create(&path).unwrap();
            stream.write_all_bytes(b"ktx stream test").unwrap();
        }
        let mut stream = FileStream::open(&path).unwrap();
        assert_eq!(stream.size().unwrap(), 15);
        stream.set_position(4).unwrap();
        let mut buf = [0u8; 6];
        stream.read_exact_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"stream");

        assert!(matches!(
            stream.set_position(100).unwrap_err(),
            TextureError::SeekOutOfBounds { .. }
        ));
    }

    #[test]
    fn open_missing_file_reports_path() {
        let err = FileStream::open("/definitely/not/here.ktx2").unwrap_err();
        match err {
            TextureError::OpenFailed { path, .. } => {
                assert_eq!(path, Path::new("/definitely/not/here.ktx2"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // BufReader<File> works through the adapter, covering FILE-handle usage.
    #[test]
    fn custom_stream_over_buffered_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buffered.bin");
        std::fs::write(&path, b"buffered").unwrap();
        let reader = BufReader::new(File::open(&path).unwrap());
        let mut stream = CustomStream::new(reader).unwrap();
        let mut buf = [0u8; 8];
        stream.read_exact_bytes(&mut buf).unwrap();
        assert_eq!(&buf, b"buffered");
    }
}
