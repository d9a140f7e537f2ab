use thiserror::Error;

use crate::persistence::error::PersistenceError;
use crate::receivers::error::ReceiverError;

/// Errors surfaced by pipeline stages.
///
/// Any error aborts the invocation before the notification log is updated, so
/// a later retry of the same batch goes through deduplication again.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The invocation was cancelled or timed out before completing.
    #[error("Pipeline aborted: {0}")]
    Aborted(String),

    /// Delivery to the receiver integration failed.
    #[error("Notification delivery failed: {0}")]
    SendFailed(#[from] ReceiverError),

    /// Reading or writing the notification log failed.
    #[error("Notification log access failed: {0}")]
    LogError(#[from] PersistenceError),
}
