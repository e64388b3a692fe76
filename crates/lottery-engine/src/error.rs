//! The engine-facing error taxonomy (§7): the same classification the
//! Store Abstraction exposes, with store errors folded in transparently
//! and a few engine-level variants for conditions the store never sees
//! (validation, role checks).

use lottery_core::event::EventValidationError;
use lottery_core::profile::RoleError;
use lottery_store::StoreError;
use snafu::{Location, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EngineError {
    #[snafu(transparent)]
    Store { source: StoreError },

    #[snafu(transparent)]
    Validation { source: EventValidationError },

    #[snafu(transparent)]
    Role { source: RoleError },

    #[snafu(display("{what} not found"))]
    NotFound {
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

    #[snafu(display("conflict: {what}"))]
    Conflict {
        what: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("internal engine error: {source}"))]
    Internal {
        source: lottery_util_error::BoxedError,
        #[snafu(implicit)]
        location: Location,
    },
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// Retryable classes per §7: only store-level `Aborted`/`Unavailable`
    /// propagate as retryable; every engine-level variant is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Store { source } if source.is_retryable())
    }
}
