use crate::receivers::{Notification, error::ReceiverError};

/// A delivery channel for rendered notifications.
///
/// Implementations are responsible for their own retry behavior; an `Err`
/// from [`notify`](Integration::notify) means delivery terminally failed for
/// this attempt and the caller must not mark the notification as sent.
#[async_trait::async_trait]
pub trait Integration: Send + Sync {
    /// Delivers a notification through this channel.
    async fn notify(&self, notification: &Notification) -> Result<(), ReceiverError>;
}
