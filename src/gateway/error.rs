use thiserror::Error;

/// Failure taxonomy for the request pipeline. Every variant carries the
/// human-readable detail surfaced to the caller; `category` is the
/// machine-distinguishable label. The HTTP status mapping lives with the
/// transport layer, not here.
///
/// Cleanup failures are deliberately absent: scratch-file deletion errors
/// are logged and never replace the request outcome.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing required field or malformed request shape. No engine call is
    /// attempted.
    #[error("{0}")]
    Validation(String),
    /// Upload part whose declared content type is not an image type.
    #[error("{0}")]
    UnsupportedMedia(String),
    /// Base64 or image decoding failed.
    #[error("invalid image data: {0}")]
    Decode(String),
    /// The prediction engine call failed; the whole batch fails together.
    #[error("prediction engine error: {0}")]
    Engine(String),
    /// Unexpected fault (e.g. scratch storage unavailable).
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn category(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation",
            GatewayError::UnsupportedMedia(_) => "unsupported_media",
            GatewayError::Decode(_) => "decode",
            GatewayError::Engine(_) => "engine",
            GatewayError::Internal(_) => "internal",
        }
    }
}
