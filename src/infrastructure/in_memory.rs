use crate::domain::money::{Amount, Balance};
use crate::domain::order::{NewOrder, Order, SettlementMethod, SettlementStatus, TopUp};
use crate::domain::ports::{Ledger, SessionStore};
use crate::domain::session::{Session, UserId};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory store for purchase sessions.
///
/// Uses `Arc<RwLock<HashMap<UserId, Session>>>` for shared concurrent access.
/// Sessions hold no money, so losing them on restart is acceptable.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<UserId, Session>>>,
}

impl InMemorySessionStore {
    /// Creates a new, empty in-memory session store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, buyer: UserId) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&buyer).cloned())
    }

    async fn set(&self, buyer: UserId, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(buyer, session);
        Ok(())
    }

    async fn clear(&self, buyer: UserId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(&buyer);
        Ok(())
    }
}

#[derive(Default)]
struct LedgerState {
    orders: BTreeMap<u64, Order>,
    top_ups: BTreeMap<u64, TopUp>,
    balances: BTreeMap<UserId, Balance>,
    next_order_id: u64,
    next_top_up_id: u64,
}

impl LedgerState {
    fn settle_top_up(&mut self, id: u64, status: SettlementStatus) -> Result<TopUp> {
        let top_up = self
            .top_ups
            .get_mut(&id)
            .ok_or_else(|| ShopError::NotFound("Top-up".to_string()))?;
        if top_up.status.is_terminal() {
            return Err(ShopError::AlreadySettled {
                kind: "Top-up",
                id,
                status: top_up.status.to_string(),
            });
        }
        top_up.status = status;
        Ok(top_up.clone())
    }
}

/// In-memory ledger. A single mutex makes every status flip atomic.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let mut state = self.state.lock().await;
        state.next_order_id += 1;
        let order = Order::from_new(state.next_order_id, order, Utc::now());
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get_order(&self, id: u64) -> Result<Option<Order>> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn latest_pending_order(
        &self,
        buyer: UserId,
        method: SettlementMethod,
    ) -> Result<Option<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .rev()
            .find(|o| o.buyer == buyer && o.method == method && o.status == SettlementStatus::Pending)
            .cloned())
    }

    async fn settle_order(&self, id: u64, status: SettlementStatus) -> Result<Order> {
        let mut state = self.state.lock().await;
        let order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| ShopError::NotFound("Order".to_string()))?;
        if order.status.is_terminal() {
            return Err(ShopError::AlreadySettled {
                kind: "Order",
                id,
                status: order.status.to_string(),
            });
        }
        order.status = status;
        Ok(order.clone())
    }

    async fn orders_for(&self, buyer: UserId, limit: usize) -> Result<Vec<Order>> {
        let state = self.state.lock().await;
        Ok(state
            .orders
            .values()
            .rev()
            .filter(|o| o.buyer == buyer)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        Ok(self.state.lock().await.orders.values().cloned().collect())
    }

    async fn create_top_up(
        &self,
        buyer: UserId,
        amount: Amount,
        method: SettlementMethod,
    ) -> Result<TopUp> {
        let mut state = self.state.lock().await;
        state.next_top_up_id += 1;
        let top_up = TopUp {
            id: state.next_top_up_id,
            buyer,
            amount,
            method,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
        };
        state.top_ups.insert(top_up.id, top_up.clone());
        Ok(top_up)
    }

    async fn get_top_up(&self, id: u64) -> Result<Option<TopUp>> {
        Ok(self.state.lock().await.top_ups.get(&id).cloned())
    }

    async fn confirm_top_up(&self, id: u64) -> Result<TopUp> {
        let mut state = self.state.lock().await;
        let top_up = state.settle_top_up(id, SettlementStatus::Confirmed)?;
        *state.balances.entry(top_up.buyer).or_default() += Balance::from(top_up.amount);
        Ok(top_up)
    }

    async fn reject_top_up(&self, id: u64) -> Result<TopUp> {
        self.state
            .lock()
            .await
            .settle_top_up(id, SettlementStatus::Rejected)
    }

    async fn top_ups_for(&self, buyer: UserId, limit: usize) -> Result<Vec<TopUp>> {
        let state = self.state.lock().await;
        Ok(state
            .top_ups
            .values()
            .rev()
            .filter(|t| t.buyer == buyer)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn all_top_ups(&self) -> Result<Vec<TopUp>> {
        Ok(self.state.lock().await.top_ups.values().cloned().collect())
    }

    async fn balance(&self, buyer: UserId) -> Result<Balance> {
        let state = self.state.lock().await;
        Ok(state.balances.get(&buyer).copied().unwrap_or_default())
    }

    async fn debit(&self, buyer: UserId, amount: Amount) -> Result<bool> {
        let mut state = self.state.lock().await;
        let amount = Balance::from(amount);
        match state.balances.get_mut(&buyer) {
            Some(balance) if *balance >= amount => {
                *balance -= amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn all_balances(&self) -> Result<Vec<(UserId, Balance)>> {
        let state = self.state.lock().await;
        Ok(state.balances.iter().map(|(k, v)| (*k, *v)).collect())
    }
}
