//! Decode options.

use std::time::Duration;

pub const DEFAULT_MAX_HEADER_BYTES: u64 = 16 * 1024 * 1024;
pub const DEFAULT_URL_TIMEOUT: Duration = Duration::from_secs(30);

/// Options applied to a single decode call.
#[derive(Debug, Clone)]
pub struct DecodeOptions {
    /// Keep embedded ICC profiles in the descriptor.
    pub extract_icc_profile: bool,
    /// Upper bound on bytes read from one source. Running past it reads as
    /// a premature end of stream.
    ///
    /// TIFF addresses its first IFD by offset and is buffered up to this
    /// limit, so a file that stores the IFD after its strip data needs a
    /// limit larger than the data in front of it. Values below the sniff
    /// window are raised to it.
    pub max_header_bytes: u64,
    /// Request timeout for HTTP(S) sources.
    pub url_timeout: Duration,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            extract_icc_profile: true,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            url_timeout: DEFAULT_URL_TIMEOUT,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops embedded ICC profiles instead of reassembling them.
    pub fn without_icc_profile(mut self) -> Self {
        self.extract_icc_profile = false;
        self
    }

    pub fn with_max_header_bytes(mut self, limit: u64) -> Self {
        self.max_header_bytes = limit;
        self
    }

    pub fn with_url_timeout(mut self, timeout: Duration) -> Self {
        self.url_timeout = timeout;
        self
    }
}
