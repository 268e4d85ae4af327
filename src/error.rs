//! Error types for registry operations.
//!
//! Unknown handles are never errors: `remove`, `update` and `get` report
//! them through `bool`/`Option` return values. The types here are reserved
//! for malformed input, an unresolvable surface, or a failing collaborator.

use thiserror::Error;

/// The surface could not be resolved when the registry was built.
///
/// Fatal: no registry exists after this error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Surface lookup key is empty")]
    EmptyKey,

    #[error("No surface registered under key {key:?}")]
    SurfaceNotFound { key: String },
}

/// Caller-supplied input failed validation. Fix the input and retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} must be a non-empty string")]
    EmptyContent { field: &'static str },
}

/// The renderer collaborator did not produce an artifact.
///
/// The registry state is untouched when this is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("QR encoding failed: {reason}")]
    Encode { reason: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Surface rejected the rendered node: {reason}")]
    Surface { reason: String },

    #[error("Renderer {renderer} failed: {reason}")]
    Backend { renderer: String, reason: String },
}

impl RenderError {
    /// Shorthand for a failure raised by a custom renderer.
    pub fn backend(renderer: impl Into<String>, reason: impl Into<String>) -> Self {
        RenderError::Backend {
            renderer: renderer.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a [`Surface`](crate::surface::Surface) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("Unknown mount {mount}")]
    UnknownMount { mount: u64 },
}

impl From<SurfaceError> for RenderError {
    fn from(err: SurfaceError) -> Self {
        RenderError::Surface {
            reason: err.to_string(),
        }
    }
}

/// A color string that is not `#rgb` or `#rrggbb` hex.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid color {value:?}: expected #rgb or #rrggbb")]
pub struct ParseColorError {
    pub value: String,
}

/// Master error type for registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Result type alias for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;
