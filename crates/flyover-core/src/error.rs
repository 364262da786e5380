//! Error taxonomy for the animation core.

use thiserror::Error;

/// Failures reported by a map renderer or marker collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendererError {
    /// The rendering surface has not finished loading.
    #[error("map renderer is not ready")]
    NotReady,
    /// Any other failure raised by the surface.
    #[error("map renderer failure: {0}")]
    Surface(String),
}

/// Errors surfaced by path construction, phase execution and flight sessions.
///
/// Cancellation is not an error; it is reported as
/// [`FlightOutcome::Cancelled`](crate::controller::FlightOutcome::Cancelled).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlightError {
    /// A caller-supplied value is out of range (fraction, duration, altitude...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Route geometry that cannot form a path.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// The renderer rejected a camera or marker update.
    #[error(transparent)]
    Renderer(#[from] RendererError),
    /// The session task stopped without reporting an outcome.
    #[error("flight session ended without reporting an outcome")]
    SessionAborted,
}

impl FlightError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn invalid_path(message: impl Into<String>) -> Self {
        Self::InvalidPath(message.into())
    }
}

pub type Result<T, E = FlightError> = std::result::Result<T, E>;
