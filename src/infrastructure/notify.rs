use crate::domain::notification::Notification;
use crate::domain::ports::NotificationSender;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Notification sender that writes every event to the structured log.
///
/// Used wherever no real delivery channel is wired up; the flat payload is
/// logged as JSON so operators can replay or inspect events.
#[derive(Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSender for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<()> {
        let payload = serde_json::to_string(&notification)?;
        info!(event = notification.event_name(), %payload, "notification dispatched");
        Ok(())
    }
}
