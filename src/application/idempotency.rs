//! Exactly-once bookkeeping for fulfillment.

use crate::domain::order::InvoiceRef;
use crate::domain::session::UserId;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Invoice references whose goods have already been handed over.
///
/// Lives for the process lifetime and is never persisted.
#[derive(Default, Clone)]
pub struct DeliveredSet {
    references: Arc<RwLock<HashSet<InvoiceRef>>>,
}

impl DeliveredSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, reference: InvoiceRef) -> bool {
        self.references.read().await.contains(&reference)
    }

    /// Returns `false` if the reference was already recorded.
    pub async fn record(&self, reference: InvoiceRef) -> bool {
        self.references.write().await.insert(reference)
    }

    pub async fn len(&self) -> usize {
        self.references.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.references.read().await.is_empty()
    }
}

/// One async mutex per key, created on first use.
///
/// Holding the guard serializes every critical section for that key while
/// other keys proceed in parallel. Idle entries are pruned as the map grows.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

pub(crate) const PRUNE_THRESHOLD: usize = 1024;

/// Buyer locks shared by every component that mutates a buyer's session.
pub type BuyerLocks = Arc<KeyedLocks<UserId>>;

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            if locks.len() >= PRUNE_THRESHOLD {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
