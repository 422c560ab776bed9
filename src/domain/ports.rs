use super::action::ActionButton;
use super::money::{Amount, Balance};
use super::order::{
    BuyerStats, InvoiceRef, NewOrder, Order, SettlementMethod, SettlementStatus, TopUp,
};
use super::session::{Session, UserId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Keyed store of live purchase sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, buyer: UserId) -> Result<Option<Session>>;
    async fn set(&self, buyer: UserId, session: Session) -> Result<()>;
    async fn clear(&self, buyer: UserId) -> Result<()>;
}

/// Durable balances, orders and top-ups.
///
/// Status flips are compare-and-set: only a `Pending` row may move to a
/// terminal status, and exactly one caller wins that move.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order>;
    async fn get_order(&self, id: u64) -> Result<Option<Order>>;
    async fn latest_pending_order(
        &self,
        buyer: UserId,
        method: SettlementMethod,
    ) -> Result<Option<Order>>;
    /// Moves a pending order to `status`; `AlreadySettled` if it is terminal.
    async fn settle_order(&self, id: u64, status: SettlementStatus) -> Result<Order>;
    /// Newest first.
    async fn orders_for(&self, buyer: UserId, limit: usize) -> Result<Vec<Order>>;
    /// Ascending id order.
    async fn all_orders(&self) -> Result<Vec<Order>>;

    async fn create_top_up(
        &self,
        buyer: UserId,
        amount: Amount,
        method: SettlementMethod,
    ) -> Result<TopUp>;
    async fn get_top_up(&self, id: u64) -> Result<Option<TopUp>>;
    /// Flips a pending top-up to confirmed and credits the balance in one step.
    async fn confirm_top_up(&self, id: u64) -> Result<TopUp>;
    async fn reject_top_up(&self, id: u64) -> Result<TopUp>;
    /// Newest first.
    async fn top_ups_for(&self, buyer: UserId, limit: usize) -> Result<Vec<TopUp>>;
    async fn all_top_ups(&self) -> Result<Vec<TopUp>>;

    async fn balance(&self, buyer: UserId) -> Result<Balance>;
    /// Debits when funds suffice; returns whether the debit happened.
    async fn debit(&self, buyer: UserId, amount: Amount) -> Result<bool>;
    async fn all_balances(&self) -> Result<Vec<(UserId, Balance)>>;

    async fn stats(&self, buyer: UserId) -> Result<BuyerStats> {
        let orders = self.orders_for(buyer, usize::MAX).await?;
        let top_ups = self.top_ups_for(buyer, usize::MAX).await?;
        Ok(BuyerStats {
            orders_count: orders.len(),
            orders_total: orders.iter().fold(Balance::ZERO, |acc, o| acc + o.total),
            top_ups_count: top_ups.len(),
            top_ups_total: top_ups
                .iter()
                .fold(Balance::ZERO, |acc, t| acc + Balance::from(t.amount)),
            balance: self.balance(buyer).await?,
        })
    }
}

/// A checkout created by the invoice oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    pub reference: InvoiceRef,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceStatus {
    Paid,
    Unpaid,
    Unknown,
}

/// External payment service. Its answers are trusted as-is.
#[async_trait]
pub trait InvoiceOracle: Send + Sync {
    async fn create_invoice(&self, amount: Balance, description: &str) -> Result<Invoice>;
    /// `Ok(None)` when the oracle does not know the reference.
    async fn invoice_status(&self, reference: InvoiceRef) -> Result<Option<InvoiceStatus>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub actions: Vec<ActionButton>,
}

impl Notification {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(mut self, action: ActionButton) -> Self {
        self.actions.push(action);
        self
    }
}

/// Delivers messages to buyers and the operator. Best-effort, never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: UserId, notification: Notification) -> Result<()>;
}

pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type LedgerRef = Arc<dyn Ledger>;
pub type InvoiceOracleRef = Arc<dyn InvoiceOracle>;
pub type NotifierRef = Arc<dyn Notifier>;
