use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("failed to fetch {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("fetching {url} failed with status {status}")]
    Status { url: String, status: u16 },

    #[error("expected image/gif from {url}, got {content_type}")]
    UnexpectedContentType { url: String, content_type: String },

    #[error("signature is invalid")]
    InvalidSignature,

    #[error("version {0} in the header is unsupported")]
    UnsupportedVersion(String),

    #[error("stream is corrupt: {0}")]
    CorruptStream(String),
}

impl DecodeError {
    /// The source could not be fetched at all, or answered with a non-OK status.
    pub fn is_network(&self) -> bool {
        matches!(self, DecodeError::Network { .. } | DecodeError::Status { .. })
    }

    /// The fetched content is not a GIF.
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            DecodeError::UnexpectedContentType { .. }
                | DecodeError::InvalidSignature
                | DecodeError::UnsupportedVersion(_)
        )
    }
}
