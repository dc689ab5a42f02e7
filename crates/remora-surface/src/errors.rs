//! Render surface error types.

use thiserror::Error;

/// Errors raised by a [`RenderSurface`](crate::RenderSurface) operation.
///
/// None of these are fatal: the capture loop skips the tick and the
/// dispatcher drops the command.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// Key input arrived while nothing on the page had focus.
    #[error("no focused element")]
    NoFocusedElement,

    /// No page or tab is available to act on.
    #[error("no target: {0}")]
    NoTarget(String),

    /// The engine rejected or failed a request.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The connection to the engine failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// A captured frame could not be encoded.
    #[error("encode failed: {0}")]
    Encode(String),

    /// The surface does not support the operation.
    #[error("unsupported: {0}")]
    Unavailable(&'static str),
}

impl SurfaceError {
    /// Whether the connection should be re-established before the next call.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<image::ImageError> for SurfaceError {
    fn from(err: image::ImageError) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<reqwest::Error> for SurfaceError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SurfaceError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(SurfaceError::NoFocusedElement.to_string(), "no focused element");
        assert_eq!(
            SurfaceError::Protocol("Page.navigate failed".into()).to_string(),
            "protocol error: Page.navigate failed"
        );
        assert_eq!(
            SurfaceError::Unavailable("pdf").to_string(),
            "unsupported: pdf"
        );
    }

    #[test]
    fn transport_classification() {
        assert!(SurfaceError::Transport("closed".into()).is_transport());
        assert!(!SurfaceError::NoFocusedElement.is_transport());
        assert!(!SurfaceError::Encode("bad".into()).is_transport());
    }
}
