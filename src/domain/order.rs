use crate::domain::catalog::Selection;
use crate::domain::money::{Amount, Balance};
use crate::domain::session::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment reference issued by the invoice oracle. The unit of idempotency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceRef(pub u64);

impl fmt::Display for InvoiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementMethod {
    AutomatedInvoice,
    ManualWallet,
}

impl SettlementMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementMethod::AutomatedInvoice => "automated_invoice",
            SettlementMethod::ManualWallet => "manual_wallet",
        }
    }
}

impl fmt::Display for SettlementMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status shared by orders and top-ups: `Pending` moves once to a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl SettlementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementStatus::Pending => "pending",
            SettlementStatus::Confirmed => "confirmed",
            SettlementStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementStatus::Pending)
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order fields supplied by the engine; the ledger assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub buyer: UserId,
    pub item: Selection,
    pub quantity: u32,
    pub total: Balance,
    pub method: SettlementMethod,
    pub status: SettlementStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub buyer: UserId,
    pub item: Selection,
    pub quantity: u32,
    pub total: Balance,
    pub method: SettlementMethod,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: u64, new: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            buyer: new.buyer,
            item: new.item,
            quantity: new.quantity,
            total: new.total,
            method: new.method,
            status: new.status,
            created_at,
        }
    }

    /// `<category>-<variant>`, as shown in reports and histories.
    pub fn descriptor(&self) -> String {
        self.item.descriptor()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopUp {
    pub id: u64,
    pub buyer: UserId,
    pub amount: Amount,
    pub method: SettlementMethod,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

/// Aggregates shown on a buyer's profile.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BuyerStats {
    pub orders_count: usize,
    pub orders_total: Balance,
    pub top_ups_count: usize,
    pub top_ups_total: Balance,
    pub balance: Balance,
}

/// Renders a timestamp the way the ledger persists it.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
