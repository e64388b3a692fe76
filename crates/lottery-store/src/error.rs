//! The failure taxonomy the Store Abstraction exposes (§4.1, §7):
//! `NotFound`, `Conflict`, `PreconditionFailed`, `Aborted` (retryable),
//! `Unavailable` (retryable with backoff), `PermissionDenied`, `Internal`.
//!
//! [`lottery-engine`] classifies every store error it surfaces into this
//! taxonomy unmodified (§7 "Propagation policy") — since this crate *is*
//! the store, the classification already happened by construction: each
//! variant below corresponds 1:1 to a taxonomy class, and raw backend
//! failures (redb's `TransactionError`/`CommitError`/`StorageError`/
//! `TableError`) are folded into the class that best matches their retry
//! semantics at the point they're produced.

use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    #[snafu(display("{what} not found"))]
    NotFound {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("conflict: {what}"))]
    Conflict {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("precondition failed: {what}"))]
    PreconditionFailed {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Transient and retry-safe: the transaction itself could not be
    /// started or committed due to contention (§4.1(iii)).
    #[snafu(display("aborted: {what}"))]
    Aborted {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    /// Transient, retry with backoff: the backend was unreachable or
    /// overloaded.
    #[snafu(display("unavailable: {what}"))]
    Unavailable {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("permission denied: {what}"))]
    PermissionDenied {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("internal store error: {source}"))]
    Internal {
        source: lottery_util_error::BoxedError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Retryable classes per §4.1(iii)/§7: `Aborted` and `Unavailable`.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Aborted { .. } | StoreError::Unavailable { .. })
    }

    /// A programming-error-shaped internal failure (e.g. a batch that
    /// exceeds [`crate::batch::MAX_BATCH_OPS`]) that carries only a message,
    /// not a wrapped source error.
    pub fn internal_message(message: impl Into<String>) -> Self {
        StoreError::Internal {
            source: Box::new(std::io::Error::other(message.into())),
            location: Location::new(file!(), line!(), column!()),
        }
    }
}

macro_rules! impl_internal_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for StoreError {
                fn from(source: $source) -> Self {
                    StoreError::Internal {
                        source: Box::new(source),
                        location: snafu::Location::new(file!(), line!(), column!()),
                    }
                }
            }
        )*
    };
}

impl_internal_from!(
    redb::DatabaseError,
    redb::StorageError,
    redb::TableError,
    tokio::task::JoinError,
);

impl From<redb::TransactionError> for StoreError {
    fn from(source: redb::TransactionError) -> Self {
        StoreError::Aborted {
            what: source.to_string(),
            location: snafu::Location::new(file!(), line!(), column!()),
        }
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(source: redb::CommitError) -> Self {
        StoreError::Unavailable {
            what: source.to_string(),
            location: snafu::Location::new(file!(), line!(), column!()),
        }
    }
}
