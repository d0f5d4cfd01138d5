use std::path::PathBuf;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the batch restoration runner.
///
/// Each variant carries the context of its domain (filesystem, image decoding, model
/// execution, option parsing) so callers can report a failure without parsing strings.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Option document error: {message}")]
    Options { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, RestoreError>;

impl RestoreError {
    /// Model error without an underlying library error, e.g. a missing tensor binding.
    pub fn model(operation: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Model {
            operation: operation.into(),
            source: message.into(),
        }
    }
}

/// Convert I/O errors to filesystem errors.
///
/// Code that knows the path and operation should construct `RestoreError::FileSystem`
/// directly; this is the fallback for bare `?` on I/O calls.
impl From<std::io::Error> for RestoreError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for RestoreError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for RestoreError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors come out of tensor reshaping around the forward pass, so they are
/// reported as model errors rather than a separate tensor category.
impl From<ndarray::ShapeError> for RestoreError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<serde_yaml::Error> for RestoreError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Options {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_message() {
        let err = RestoreError::model("binding resolution", "no output named `output`");
        assert_eq!(err.to_string(), "Model error: binding resolution failed");
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("no output named `output`"));
    }

    #[test]
    fn test_yaml_error_is_options_error() {
        let err: RestoreError = serde_yaml::from_str::<u32>("[").unwrap_err().into();
        assert!(matches!(err, RestoreError::Options { .. }));
        assert!(err.to_string().starts_with("Option document error: "));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: RestoreError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, RestoreError::FileSystem { .. }));
    }
}
