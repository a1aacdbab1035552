//! Error types for nbsplice-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for nbsplice-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while executing embedded notebooks.
#[derive(Debug, Error)]
pub enum Error {
    /// Directive-level validation error (bad option, missing extension).
    ///
    /// Only the offending directive's output is replaced; the build goes on.
    #[error("directive error: {0}")]
    Directive(String),

    /// The notebook engine is not installed or could not be started.
    #[error("notebook engine unavailable: {0}")]
    EngineUnavailable(String),

    /// A cell raised during forced execution, or the engine itself failed.
    #[error("execution failed for {docname}: {message}")]
    Execution { docname: String, message: String },

    /// The engine produced an output list of an unexpected length or shape.
    #[error("unexpected output shape: {message}\n{rendering}")]
    UnexpectedOutputShape { message: String, rendering: String },

    /// The asset probe cell printed something that is not a valid payload.
    #[error("unexpected probe output ({reason}):\n{rendering}")]
    ProbeOutput { reason: String, rendering: String },

    /// A notebook document could not be read or has an invalid structure.
    #[error("invalid notebook: {0}")]
    Notebook(String),

    /// Failed to read a source document.
    #[error("failed to read {path}: {message}")]
    Read { path: PathBuf, message: String },

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error only invalidates the directive that raised it.
    pub fn is_directive_error(&self) -> bool {
        matches!(self, Error::Directive(_))
    }

    /// Format the error with a recovery hint, if one applies.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Error::EngineUnavailable(_) => {
                Some("install Jupyter (`pip install nbconvert ipykernel`) or pass --jupyter <path>")
            }
            Error::Execution { .. } => {
                Some("run the block in a regular notebook to see the full traceback")
            }
            Error::ProbeOutput { .. } => {
                Some("the plotting stack must be importable by the kernel (holoviews, panel, bokeh)")
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{}\n  hint: {}", self, hint),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_errors_are_recoverable() {
        assert!(Error::Directive("bad".into()).is_directive_error());
        assert!(!Error::Notebook("bad".into()).is_directive_error());
    }

    #[test]
    fn test_hint_only_when_known() {
        let err = Error::EngineUnavailable("jupyter not found in PATH".into());
        assert!(err.with_hint().contains("hint:"));

        let err = Error::Notebook("empty".into());
        assert_eq!(err.with_hint(), err.to_string());
    }
}
