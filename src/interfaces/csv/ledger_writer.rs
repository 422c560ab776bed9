use crate::domain::money::Balance;
use crate::domain::order::{Order, TopUp, format_timestamp};
use crate::domain::session::UserId;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct OrderRow {
    id: u64,
    buyer: UserId,
    item: String,
    quantity: u32,
    total: String,
    method: &'static str,
    status: &'static str,
    created_at: String,
}

#[derive(Serialize)]
struct TopUpRow {
    id: u64,
    buyer: UserId,
    amount: String,
    method: &'static str,
    status: &'static str,
    created_at: String,
}

#[derive(Serialize)]
struct BalanceRow {
    buyer: UserId,
    balance: String,
}

/// Writes ledger tables as CSV.
///
/// Money is rendered with exactly two decimals.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_orders(&mut self, orders: &[Order]) -> Result<()> {
        if orders.is_empty() {
            self.writer.write_record([
                "id", "buyer", "item", "quantity", "total", "method", "status", "created_at",
            ])?;
        }
        for order in orders {
            self.writer.serialize(OrderRow {
                id: order.id,
                buyer: order.buyer,
                item: order.descriptor(),
                quantity: order.quantity,
                total: order.total.to_string(),
                method: order.method.as_str(),
                status: order.status.as_str(),
                created_at: format_timestamp(&order.created_at),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_top_ups(&mut self, top_ups: &[TopUp]) -> Result<()> {
        if top_ups.is_empty() {
            self.writer
                .write_record(["id", "buyer", "amount", "method", "status", "created_at"])?;
        }
        for top_up in top_ups {
            self.writer.serialize(TopUpRow {
                id: top_up.id,
                buyer: top_up.buyer,
                amount: top_up.amount.to_string(),
                method: top_up.method.as_str(),
                status: top_up.status.as_str(),
                created_at: format_timestamp(&top_up.created_at),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }

    pub fn write_balances(&mut self, balances: &[(UserId, Balance)]) -> Result<()> {
        if balances.is_empty() {
            self.writer.write_record(["buyer", "balance"])?;
        }
        for (buyer, balance) in balances {
            self.writer.serialize(BalanceRow {
                buyer: *buyer,
                balance: balance.to_string(),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
