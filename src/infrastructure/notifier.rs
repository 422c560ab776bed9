use crate::domain::ports::{Notification, Notifier};
use crate::domain::session::UserId;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::info;

/// Notification sink that writes every message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, recipient: UserId, notification: Notification) -> Result<()> {
        let actions: Vec<&str> = notification
            .actions
            .iter()
            .map(|a| a.token.as_str())
            .collect();
        info!(recipient, ?actions, text = %notification.text, "notification");
        Ok(())
    }
}

/// Notification sink that keeps every message in memory.
///
/// Can be switched to fail every send, which the best-effort paths must
/// tolerate.
#[derive(Default)]
pub struct Outbox {
    sent: Mutex<Vec<(UserId, Notification)>>,
    failing: AtomicBool,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn all(&self) -> Vec<(UserId, Notification)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, recipient: UserId) -> Vec<Notification> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, n)| n.clone())
            .collect()
    }
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, recipient: UserId, notification: Notification) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ShopError::notifier(format!("recipient {recipient} unreachable")));
        }
        self.sent.lock().await.push((recipient, notification));
        Ok(())
    }
}
