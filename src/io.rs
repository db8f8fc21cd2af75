use bytes::{Buf, Bytes};
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::error::{ImageError, Result};
use crate::options::DecodeOptions;

pub const BYTE_ARRAY_ID: &str = "byte array";

/// Where an image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Path(PathBuf),
    /// `file://`, `http://` or `https://` URL.
    Url(String),
    Bytes(Bytes),
}

impl ImageSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        Self::Url(url.into())
    }

    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Self::Bytes(data.into())
    }

    /// Identifier used in error messages and logs.
    pub fn id(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Url(url) => url.clone(),
            Self::Bytes(_) => BYTE_ARRAY_ID.to_string(),
        }
    }

    /// Opens a fresh sequential stream over the source.
    ///
    /// The stream is owned by the caller and closed when dropped.
    pub fn open(&self, options: &DecodeOptions) -> Result<Box<dyn Read + Send>> {
        let opened: io::Result<Box<dyn Read + Send>> = match self {
            Self::Path(path) => open_file(path),
            Self::Bytes(data) => Ok(Box::new(data.clone().reader())),
            Self::Url(url) => open_url(url, options),
        };
        opened.map_err(|error| ImageError::SourceRead {
            source_id: self.id(),
            error,
        })
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(data: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(data))
    }
}

impl From<Bytes> for ImageSource {
    fn from(data: Bytes) -> Self {
        Self::Bytes(data)
    }
}

fn open_file(path: &Path) -> io::Result<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    Ok(Box::new(file))
}

fn open_url(url: &str, options: &DecodeOptions) -> io::Result<Box<dyn Read + Send>> {
    if let Some(rest) = url.strip_prefix("file://") {
        let path = rest.strip_prefix("localhost").unwrap_or(rest);
        return open_file(Path::new(path));
    }

    if url.starts_with("http://") || url.starts_with("https://") {
        return open_http(url, options);
    }

    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        format!("unsupported URL scheme in {url}"),
    ))
}

#[cfg(feature = "http")]
fn open_http(url: &str, options: &DecodeOptions) -> io::Result<Box<dyn Read + Send>> {
    let client = reqwest::blocking::Client::builder()
        .timeout(options.url_timeout)
        .build()
        .map_err(io::Error::other)?;
    let response = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .map_err(io::Error::other)?;
    Ok(Box::new(response))
}

#[cfg(not(feature = "http"))]
fn open_http(_url: &str, _options: &DecodeOptions) -> io::Result<Box<dyn Read + Send>> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "HTTP sources require the `http` feature",
    ))
}

/// Sequential reader for binary headers.
///
/// Tracks the absolute position, reads big and little endian integers and
/// turns a short read into [`ImageError::PrematureEndOfStream`] tagged with
/// the source id.
pub struct HeaderReader<R> {
    inner: BufReader<R>,
    position: u64,
    source_id: String,
}

impl<R: Read> HeaderReader<R> {
    pub fn new(inner: R, source_id: impl Into<String>) -> Self {
        Self {
            inner: BufReader::new(inner),
            position: 0,
            source_id: source_id.into(),
        }
    }

    #[inline]
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// True once no further byte can be read.
    pub fn is_eof(&mut self) -> Result<bool> {
        let filled = self.inner.fill_buf().map(|buf| buf.is_empty());
        filled.map_err(|e| self.io_error(e))
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        if let Err(e) = self.inner.read_exact(&mut buf) {
            return Err(self.io_error(e));
        }
        self.position += N as u64;
        Ok(buf)
    }

    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    #[inline]
    pub fn read_u16_be(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    #[inline]
    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn read_i16_le(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    #[inline]
    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    #[inline]
    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn read_i32_le(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    /// Reads exactly `len` bytes. The buffer grows with the data actually
    /// read, so a bogus length on a short stream never over-allocates.
    pub fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let read = (&mut self.inner).take(len as u64).read_to_end(&mut buf);
        match read {
            Ok(n) => {
                self.position += n as u64;
                if n < len {
                    return Err(self.premature_end());
                }
                Ok(buf)
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    /// Reads everything left in the stream.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        match self.inner.read_to_end(&mut buf) {
            Ok(n) => {
                self.position += n as u64;
                Ok(buf)
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub fn skip(&mut self, count: u64) -> Result<()> {
        let copied = io::copy(&mut (&mut self.inner).take(count), &mut io::sink());
        match copied {
            Ok(n) => {
                self.position += n;
                if n < count {
                    return Err(self.premature_end());
                }
                Ok(())
            }
            Err(e) => Err(self.io_error(e)),
        }
    }

    pub fn premature_end(&self) -> ImageError {
        ImageError::PrematureEndOfStream {
            source_id: self.source_id.clone(),
        }
    }

    pub fn malformed(&self, reason: impl Into<String>) -> ImageError {
        ImageError::MalformedHeader {
            source_id: self.source_id.clone(),
            reason: reason.into(),
        }
    }

    fn io_error(&self, error: io::Error) -> ImageError {
        ImageError::from_io(&self.source_id, error)
    }
}
