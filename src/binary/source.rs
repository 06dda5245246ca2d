//! A seekable, buffered cursor over a byte stream.
//!
//! Table parsers work on in-memory [ReadScope](super::read::ReadScope)s. The
//! [SourceCursor] is how those bytes get into memory: it pulls chunks from a [ByteSource],
//! refilling its window as reads cross chunk boundaries.

use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

use crate::error::ParseError;

/// Default size of the chunks read by [IoSource].
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Error reported by a [ByteSource].
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum SourceError {
    /// The stream ended before the requested data.
    Exhausted,
    /// A seek was made to a position that is not in the stream.
    BadSeek(usize),
    /// The underlying I/O failed.
    Io(io::ErrorKind),
}

/// The stream a [SourceCursor] reads from.
///
/// `open` is called once when the cursor is created and `close` once when it is dropped.
pub trait ByteSource {
    fn open(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Position the stream at `offset`, returning the number of bytes available from there if
    /// known (0 if not).
    fn seek(&mut self, offset: usize) -> Result<usize, SourceError>;

    /// Return the next chunk of the stream. An empty chunk signals the end of the stream.
    fn read(&mut self) -> Result<&[u8], SourceError>;

    fn close(&mut self) {}
}

/// A [ByteSource] over data that is already in memory.
///
/// Data is handed out `chunk_size` bytes at a time.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
    chunk_size: usize,
}

/// A [ByteSource] over anything that implements `Read + Seek`, such as a `File`.
pub struct IoSource<R: Read + Seek> {
    inner: R,
    buf: Vec<u8>,
}

/// Buffered big-endian reader over a [ByteSource].
pub struct SourceCursor<S: ByteSource> {
    source: S,
    window: Vec<u8>,
    // Absolute offset of window[0]
    window_start: usize,
    // Position within window
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource::with_chunk_size(data, data.len().max(1))
    }

    pub fn with_chunk_size(data: &'a [u8], chunk_size: usize) -> Self {
        SliceSource {
            data,
            pos: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl ByteSource for SliceSource<'_> {
    fn seek(&mut self, offset: usize) -> Result<usize, SourceError> {
        if offset > self.data.len() {
            return Err(SourceError::BadSeek(offset));
        }
        self.pos = offset;
        Ok(self.data.len() - offset)
    }

    fn read(&mut self) -> Result<&[u8], SourceError> {
        let end = self.data.len().min(self.pos + self.chunk_size);
        let chunk = &self.data[self.pos..end];
        self.pos = end;
        Ok(chunk)
    }
}

impl<R: Read + Seek> IoSource<R> {
    pub fn new(inner: R) -> Self {
        IoSource::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        IoSource {
            inner,
            buf: vec![0; chunk_size.max(1)],
        }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> ByteSource for IoSource<R> {
    fn seek(&mut self, offset: usize) -> Result<usize, SourceError> {
        let end = self.inner.seek(SeekFrom::End(0))?;
        let offset64 = u64::try_from(offset).map_err(|_| SourceError::BadSeek(offset))?;
        if offset64 > end {
            return Err(SourceError::BadSeek(offset));
        }
        self.inner.seek(SeekFrom::Start(offset64))?;
        Ok(usize::try_from(end - offset64).unwrap_or(usize::MAX))
    }

    fn read(&mut self) -> Result<&[u8], SourceError> {
        let len = loop {
            match self.inner.read(&mut self.buf) {
                Ok(len) => break len,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        };
        Ok(&self.buf[..len])
    }
}

impl<S: ByteSource> SourceCursor<S> {
    /// Open `source` and position the cursor at offset 0.
    pub fn new(mut source: S) -> Result<Self, SourceError> {
        source.open()?;
        let mut cursor = SourceCursor {
            source,
            window: Vec::new(),
            window_start: 0,
            pos: 0,
        };
        cursor.seek(0)?;
        Ok(cursor)
    }

    /// Absolute position of the cursor.
    pub fn tell(&self) -> usize {
        self.window_start + self.pos
    }

    /// Move to an absolute position, keeping the current window if it covers `offset`.
    pub fn seek(&mut self, offset: usize) -> Result<(), SourceError> {
        if offset >= self.window_start && offset <= self.window_start + self.window.len() {
            self.pos = offset - self.window_start;
            return Ok(());
        }
        self.source.seek(offset)?;
        self.window.clear();
        self.window_start = offset;
        self.pos = 0;
        Ok(())
    }

    // Ensure `len` bytes are available in the window from `pos`, pulling more chunks from the
    // source as needed.
    fn fill(&mut self, len: usize) -> Result<(), SourceError> {
        if self.window.len() - self.pos >= len {
            return Ok(());
        }
        // Drop consumed bytes so the window does not grow without bound.
        if self.pos > 0 {
            self.window.drain(..self.pos);
            self.window_start += self.pos;
            self.pos = 0;
        }
        while self.window.len() < len {
            let chunk = self.source.read()?;
            if chunk.is_empty() {
                return Err(SourceError::Exhausted);
            }
            self.window.extend_from_slice(chunk);
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8, SourceError> {
        self.fill(1)?;
        let value = self.window[self.pos];
        self.pos += 1;
        Ok(value)
    }

    pub fn read_u16be(&mut self) -> Result<u16, SourceError> {
        let bytes = self.read_array::<2>()?;
        Ok(u16::from_be_bytes(bytes))
    }

    pub fn read_u24be(&mut self) -> Result<u32, SourceError> {
        let [b0, b1, b2] = self.read_array::<3>()?;
        Ok(u32::from_be_bytes([0, b0, b1, b2]))
    }

    pub fn read_u32be(&mut self) -> Result<u32, SourceError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(bytes))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SourceError> {
        self.fill(N)?;
        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.window[self.pos..self.pos + N]);
        self.pos += N;
        Ok(bytes)
    }

    /// Read `len` bytes into a new buffer.
    pub fn read_bytes(&mut self, len: usize) -> Result<Box<[u8]>, SourceError> {
        self.fill(len)?;
        let bytes = Box::from(&self.window[self.pos..self.pos + len]);
        self.pos += len;
        Ok(bytes)
    }
}

impl<S: ByteSource> Drop for SourceCursor<S> {
    fn drop(&mut self) {
        self.source.close();
    }
}

impl From<io::Error> for SourceError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => SourceError::Exhausted,
            kind => SourceError::Io(kind),
        }
    }
}

impl From<SourceError> for ParseError {
    fn from(_error: SourceError) -> Self {
        ParseError::BadEof
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Exhausted => write!(f, "byte source ended unexpectedly"),
            SourceError::BadSeek(offset) => write!(f, "cannot seek to offset {}", offset),
            SourceError::Io(kind) => write!(f, "byte source I/O error: {:?}", kind),
        }
    }
}

impl std::error::Error for SourceError {}
