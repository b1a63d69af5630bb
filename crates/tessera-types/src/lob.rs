//! Large-object stream wrappers.
//!
//! `BlobStream` and `ClobStream` normalise the many shapes LOB data arrives
//! in (byte arrays, strings, live readers) behind a single `Read` surface.
//! Seekable sources are rewound to the start on construction so a consumer
//! always observes the full payload.

use std::io::{Cursor, Read, Seek, SeekFrom};

use bytes::Bytes;

/// A binary large-object stream.
pub struct BlobStream {
    inner: Box<dyn Read + Send>,
    len: Option<u64>,
}

impl BlobStream {
    /// Wrap an in-memory byte payload.
    #[must_use]
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        let len = bytes.len() as u64;
        Self {
            inner: Box::new(Cursor::new(bytes)),
            len: Some(len),
        }
    }

    /// Wrap a live seekable source, rewinding it to position zero first.
    ///
    /// # Errors
    ///
    /// Propagates the seek failure from the underlying source.
    pub fn from_seekable<R>(mut source: R) -> std::io::Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        source.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Box::new(source),
            len: None,
        })
    }

    /// The payload length, when known up front (in-memory sources).
    #[must_use]
    pub fn len_hint(&self) -> Option<u64> {
        self.len
    }

    /// Drain the stream into an owned buffer.
    ///
    /// # Errors
    ///
    /// Propagates read failures from the underlying source.
    pub fn read_to_bytes(mut self) -> std::io::Result<Bytes> {
        let mut buf = Vec::with_capacity(self.len.unwrap_or(0) as usize);
        self.inner.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

impl Read for BlobStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl std::fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStream").field("len", &self.len).finish()
    }
}

/// A character large-object stream. Content is UTF-8.
pub struct ClobStream {
    inner: Box<dyn Read + Send>,
    len: Option<u64>,
}

impl ClobStream {
    /// Wrap an in-memory string payload.
    #[must_use]
    pub fn from_string(text: impl Into<String>) -> Self {
        let bytes = Bytes::from(text.into().into_bytes());
        let len = bytes.len() as u64;
        Self {
            inner: Box::new(Cursor::new(bytes)),
            len: Some(len),
        }
    }

    /// Wrap a live seekable source, rewinding it to position zero first.
    ///
    /// # Errors
    ///
    /// Propagates the seek failure from the underlying source.
    pub fn from_seekable<R>(mut source: R) -> std::io::Result<Self>
    where
        R: Read + Seek + Send + 'static,
    {
        source.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner: Box::new(source),
            len: None,
        })
    }

    /// The byte length, when known up front (in-memory sources).
    #[must_use]
    pub fn len_hint(&self) -> Option<u64> {
        self.len
    }

    /// Drain the stream into an owned string.
    ///
    /// # Errors
    ///
    /// Propagates read failures and rejects non-UTF-8 content.
    pub fn read_to_string(mut self) -> std::io::Result<String> {
        let mut out = String::with_capacity(self.len.unwrap_or(0) as usize);
        self.inner.read_to_string(&mut out)?;
        Ok(out)
    }
}

impl Read for ClobStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl std::fmt::Debug for ClobStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClobStream").field("len", &self.len).finish()
    }
}
