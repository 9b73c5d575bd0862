///! Error taxonomy of the tracking core
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Upstream catalog source unreachable, timed out or non-2xx. Retryable.
    #[error("upstream catalog unavailable: {0}")]
    UpstreamUnavailable(String),

    /// A single element record could not be parsed. Scoped to that record,
    /// never fatal to the batch.
    #[error("malformed element record: {0}")]
    MalformedRecord(String),

    /// Propagation or geodetic conversion failed for one entry. Scoped to
    /// that entry, never fatal to the batch.
    #[error("propagation failed for catalog id {0}")]
    PropagationFailure(u32),

    /// A selection or snapshot write failed. Logged by the caller; the
    /// request path degrades to recompute-per-request instead of crashing.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),

    /// No selection and no cached positions exist yet. Not an internal
    /// error: the caller should trigger a refresh first.
    #[error("no satellite selection available yet")]
    NotFound,
}
