//! Application layer containing the order/payment lifecycle orchestration.
//!
//! `FulfillmentEngine` drives buyer actions through the purchase state
//! machine; `ManualSettlement` carries the operator-side actions. Both
//! serialize work per key with async mutexes and treat the ledger as the
//! authority, with notifications strictly best-effort.

pub mod cooldown;
pub mod engine;
pub mod idempotency;
pub mod reply;
pub mod settlement;

use crate::domain::ports::{Notification, Notifier};
use crate::domain::session::UserId;
use tracing::warn;

/// Sends a notification, logging instead of propagating a failure.
///
/// Returns whether the sink accepted the message.
pub(crate) async fn notify_best_effort(
    notifier: &dyn Notifier,
    recipient: UserId,
    notification: Notification,
) -> bool {
    match notifier.send(recipient, notification).await {
        Ok(()) => true,
        Err(e) => {
            warn!(recipient, error = %e, "notification not delivered");
            false
        }
    }
}
