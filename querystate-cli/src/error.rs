//! Error types for the CLI.

use std::path::PathBuf;

use querystate::{FormError, ManifestError};
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Main error type for CLI operations.
#[derive(Debug, Error)]
pub enum CliError {
    /// The form manifest could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The form manifest is invalid.
    #[error("Invalid form manifest: {0}")]
    Manifest(#[from] ManifestError),

    /// The command referenced a field the form does not declare.
    #[error("{0}")]
    Form(#[from] FormError),

    /// Output could not be serialized.
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors caused by the user's manifest or arguments rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Manifest(_) | Self::Form(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_classification() {
        let unknown = CliError::from(FormError::UnknownField("page".into()));
        assert!(unknown.is_validation());
        assert_eq!(unknown.to_string(), FormError::UnknownField("page".into()).to_string());

        let io = CliError::io(
            "form.toml",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert!(!io.is_validation());
        assert!(io.to_string().contains("form.toml"));
    }
}
