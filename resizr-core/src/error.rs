//! Error taxonomy for the resize service

/// Crate result type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error type
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Width or height did not parse as a non-negative integer
    #[error("invalid width or height provided: {0}")]
    Dimension(String),
    /// Fetch timeout, transport failure or non-200 upstream status
    #[error("error downloading image: {0}")]
    Upstream(String),
    /// Payload is not a recognized image
    #[error("invalid image: {0}")]
    Decode(String),
    /// The resize primitive failed or panicked
    #[error("resize failed: {0}")]
    Resize(String),
    /// Storage read/write failure inside a durable cache tier
    #[error("persistence error: {0}")]
    Persistence(String),
    /// Bind or accept failure of the listener
    #[error("listener error: {0}")]
    Listen(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl Error {
    /// Domain failures answered with 400 and the fallback image
    pub fn is_client_facing(&self) -> bool {
        matches!(
            self,
            Error::Dimension(_) | Error::Upstream(_) | Error::Decode(_) | Error::Resize(_)
        )
    }
}
