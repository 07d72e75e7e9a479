//! Manifest and invocation error types.

use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

use stratus_storage::StorageError;

pub type ManifestResult<T> = Result<T, ManifestError>;
pub type FunctionResult<T> = Result<T, FunctionError>;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no function manifest in {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid manifest {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The field is absent or has the wrong JSON type.
    #[error("binding `{binding}` is missing `{field}`")]
    MissingField {
        binding: String,
        field: &'static str,
    },

    #[error("binding `{binding}` declares unknown HTTP method `{method}`")]
    InvalidMethod { binding: String, method: String },

    #[error("binding `{binding}` has invalid direction `{direction}`")]
    InvalidDirection { binding: String, direction: String },

    #[error("invalid route `{route}`: {reason}")]
    InvalidRoute { route: String, reason: &'static str },
}

#[derive(Debug, Error)]
pub enum FunctionError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("no handler registered for function `{0}`")]
    MissingHandler(String),

    #[error("route {method} {route} is already registered by `{existing}`")]
    DuplicateRoute {
        route: String,
        method: String,
        existing: String,
    },

    #[error("route {route} collides with {existing_route} registered by `{existing}`")]
    ConflictingRoute {
        route: String,
        existing_route: String,
        existing: String,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("function `{function}` failed: {error:#}")]
    Handler {
        function: String,
        error: anyhow::Error,
    },

    #[error("redirect response has no Location header")]
    MissingLocation,
}

impl FunctionError {
    /// HTTP status reported when this error escapes an HTTP invocation.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            Self::Handler { error, .. } => match error.downcast_ref::<StorageError>() {
                Some(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn not_found() -> StorageError {
        StorageError::NotFound {
            container: "todo".to_string(),
            name: "a.txt".to_string(),
        }
    }

    #[test]
    fn missing_blob_maps_to_404() {
        assert_eq!(FunctionError::from(not_found()).status(), StatusCode::NOT_FOUND);

        let wrapped = FunctionError::Handler {
            function: "f".to_string(),
            error: anyhow::Error::new(not_found()),
        };
        assert_eq!(wrapped.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn handler_failure_maps_to_500() {
        let err = FunctionError::Handler {
            function: "f".to_string(),
            error: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "function `f` failed: boom");
        assert_eq!(
            FunctionError::MissingLocation.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
