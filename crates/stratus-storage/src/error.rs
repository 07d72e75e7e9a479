//! Error types for the blob store and tag queries.

use std::path::PathBuf;

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("blob not found: {container}/{name}")]
    NotFound { container: String, name: String },

    #[error("invalid blob path: {0}")]
    InvalidName(String),

    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("tag catalog error: {0}")]
    Catalog(String),

    #[error("invalid tag query: {0}")]
    Query(#[from] QueryError),
}

/// Errors raised while parsing a tag query expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("expression has no @container clause")]
    MissingContainer,

    #[error("expression has no tag clause")]
    MissingTag,

    #[error("more than one {0} clause")]
    DuplicateClause(&'static str),

    #[error("clause `{0}` has no comparison operator")]
    MalformedClause(String),

    #[error("value `{0}` is not single-quoted")]
    UnquotedValue(String),

    #[error("invalid tag name `{0}`")]
    InvalidTagName(String),

    #[error("@container only supports `=`")]
    ContainerOperator,
}
