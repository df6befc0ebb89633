use crate::deferred::DeferredId;

use thiserror::Error;

/// Failures originating from the engine itself.
///
/// Once a [`Deferred`](crate::Deferred) exists, every failure concerning it
/// is carried as a rejection reason. The reason type of a deferred must
/// therefore be able to absorb these errors through `From<DeferredError>`.
/// Only capability misuse, which happens before any deferred exists, and
/// queue exhaustion are returned directly to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeferredError {
    /// A deferred was resolved with itself.
    #[error("chaining cycle detected: deferred {0} was resolved with itself")]
    CyclicResolution(DeferredId),

    /// A capability executor received resolving functions more than once.
    #[error("deferred executor has already been invoked")]
    ExecutorAlreadyInvoked,

    /// A capability executor never received its resolve/reject pair.
    #[error("deferred capability is missing a resolve or reject function")]
    NonCallableCapability,

    /// The job queue did not go idle within the configured number of jobs.
    #[error("job queue did not go idle within {0} jobs")]
    JobLimitExceeded(usize),
}

impl From<DeferredError> for String {
    fn from(error: DeferredError) -> Self {
        error.to_string()
    }
}
