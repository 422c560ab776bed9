use super::idempotency::PRUNE_THRESHOLD;
use crate::domain::session::UserId;
use crate::error::{Result, ShopError};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Per-buyer action spacing.
///
/// A buyer may perform a rate-limited action once per `interval`. Every
/// permitted attempt restarts the window, whether or not the action it
/// guards goes on to succeed. Entries whose window has passed are dropped
/// once the table grows large.
pub struct Cooldown {
    interval: Duration,
    last_action: Mutex<HashMap<UserId, Instant>>,
}

impl Cooldown {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_action: Mutex::new(HashMap::new()),
        }
    }

    pub async fn try_acquire(&self, buyer: UserId) -> Result<()> {
        if self.interval.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let mut last_action = self.last_action.lock().await;
        if let Some(last) = last_action.get(&buyer) {
            let elapsed = now.duration_since(*last);
            if elapsed < self.interval {
                return Err(ShopError::RateLimited {
                    retry_after: self.interval - elapsed,
                });
            }
        }
        if last_action.len() >= PRUNE_THRESHOLD {
            let interval = self.interval;
            last_action.retain(|_, last| now.duration_since(*last) < interval);
        }
        last_action.insert(buyer, now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_action_inside_window_rejected() {
        let cooldown = Cooldown::new(Duration::from_secs(60));
        assert!(cooldown.try_acquire(1).await.is_ok());
        assert!(matches!(
            cooldown.try_acquire(1).await,
            Err(ShopError::RateLimited { .. })
        ));
        // other buyers are unaffected
        assert!(cooldown.try_acquire(2).await.is_ok());
    }

    #[tokio::test]
    async fn test_window_expires() {
        let cooldown = Cooldown::new(Duration::from_millis(20));
        assert!(cooldown.try_acquire(1).await.is_ok());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(cooldown.try_acquire(1).await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_entries_pruned() {
        let cooldown = Cooldown::new(Duration::from_millis(10));
        for buyer in 0..PRUNE_THRESHOLD as UserId {
            cooldown.try_acquire(buyer).await.unwrap();
        }
        assert_eq!(cooldown.last_action.lock().await.len(), PRUNE_THRESHOLD);

        tokio::time::sleep(Duration::from_millis(20)).await;
        cooldown.try_acquire(u64::MAX).await.unwrap();
        assert_eq!(cooldown.last_action.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_live_entries_survive_pruning() {
        let cooldown = Cooldown::new(Duration::from_secs(60));
        for buyer in 0..=PRUNE_THRESHOLD as UserId {
            cooldown.try_acquire(buyer).await.unwrap();
        }
        assert!(matches!(
            cooldown.try_acquire(0).await,
            Err(ShopError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_zero_interval_disables_limit() {
        let cooldown = Cooldown::new(Duration::ZERO);
        for _ in 0..5 {
            assert!(cooldown.try_acquire(1).await.is_ok());
        }
    }
}
