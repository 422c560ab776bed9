use crate::domain::catalog::Selection;
use crate::domain::money::Balance;
use crate::domain::order::{BuyerStats, InvoiceRef, Order, TopUp, format_timestamp};
use crate::domain::payload::FulfillmentPayload;
use std::fmt;

/// Successful outcome of a buyer action, rendered by the chat shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    ChooseVariant {
        category: String,
        variants: Vec<(String, Balance)>,
    },
    EnterQuantity {
        selection: Selection,
        unit_price: Balance,
        max: u32,
    },
    ChoosePaymentMethod {
        selection: Selection,
        quantity: u32,
        total: Balance,
    },
    Checkout {
        reference: InvoiceRef,
        checkout_url: String,
        total: Balance,
    },
    WalletInstructions {
        address: String,
    },
    AwaitingConfirmation {
        order_id: u64,
    },
    Delivered {
        order_id: u64,
        payload: FulfillmentPayload,
    },
    /// Goods for this reference were handed over earlier; nothing was done.
    AlreadyDelivered {
        reference: InvoiceRef,
    },
    PaymentPending {
        reference: InvoiceRef,
    },
    TopUpRequested {
        top_up_id: u64,
        address: String,
    },
    SupportForwarded,
    Restarted,
    Orders(Vec<Order>),
    TopUps(Vec<TopUp>),
    Profile {
        buyer: u64,
        stats: BuyerStats,
    },
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::ChooseVariant { category, variants } => {
                write!(f, "{category}: choose region:")?;
                for (variant, price) in variants {
                    write!(f, "\n- {variant} ({price})")?;
                }
                Ok(())
            }
            Reply::EnterQuantity {
                selection,
                unit_price,
                max,
            } => write!(
                f,
                "Product: {}\nSelected region: {}\nPrice per account: {unit_price}\n\nEnter quantity (max {max}):",
                selection.category, selection.variant
            ),
            Reply::ChoosePaymentMethod {
                selection,
                quantity,
                total,
            } => write!(
                f,
                "Summary:\nProduct: {}\nRegion: {}\nQuantity: {quantity}\nTotal: {total}\n\nChoose payment method:",
                selection.category, selection.variant
            ),
            Reply::Checkout { checkout_url, .. } => write!(
                f,
                "Please pay using the link below:\n{checkout_url}\n\nAfter payment press the 'Check payment' button."
            ),
            Reply::WalletInstructions { address } => write!(
                f,
                "Wallet address:\n{address}\n\nAfter payment, press 'I have paid'."
            ),
            Reply::AwaitingConfirmation { .. } => f.write_str("Waiting for payment confirmation."),
            Reply::Delivered { payload, .. } => {
                write!(f, "Payment received!\n\nHere are your accounts:\n\n{payload}")
            }
            Reply::AlreadyDelivered { .. } => {
                f.write_str("Accounts already issued for this invoice.")
            }
            Reply::PaymentPending { .. } => {
                f.write_str("Payment not found yet. Please try again later.")
            }
            Reply::TopUpRequested { top_up_id, address } => write!(
                f,
                "Top-up #{top_up_id}. Wallet address:\n{address}\n\nAfter payment, wait for confirmation."
            ),
            Reply::SupportForwarded => {
                f.write_str("Your message was forwarded to support. We will reply here.")
            }
            Reply::Restarted => f.write_str("Use the menu to start a new purchase."),
            Reply::Orders(orders) if orders.is_empty() => f.write_str("Orders history is empty."),
            Reply::Orders(orders) => {
                write!(f, "Orders history (last {}):", orders.len())?;
                for o in orders {
                    write!(
                        f,
                        "\n#{} - {} x{} - {} - {} - {} - {}",
                        o.id,
                        o.descriptor(),
                        o.quantity,
                        o.total,
                        o.method,
                        o.status,
                        format_timestamp(&o.created_at)
                    )?;
                }
                Ok(())
            }
            Reply::TopUps(top_ups) if top_ups.is_empty() => {
                f.write_str("Top-up history is empty.")
            }
            Reply::TopUps(top_ups) => {
                write!(f, "Top-ups (last {}):", top_ups.len())?;
                for t in top_ups {
                    write!(
                        f,
                        "\n#{} - {} - {} - {}",
                        t.id,
                        t.amount,
                        t.status,
                        format_timestamp(&t.created_at)
                    )?;
                }
                Ok(())
            }
            Reply::Profile { buyer, stats } => write!(
                f,
                "PROFILE\nID: {buyer}\nBalance: {}\nOrders: {} ({})\nTop-ups: {} ({})",
                stats.balance,
                stats.orders_count,
                stats.orders_total,
                stats.top_ups_count,
                stats.top_ups_total
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_summary_rendering() {
        let reply = Reply::ChoosePaymentMethod {
            selection: Selection::new("Shopify", "USA"),
            quantity: 3,
            total: Balance::new(dec!(30)),
        };
        let text = reply.to_string();
        assert!(text.contains("Quantity: 3"));
        assert!(text.contains("Total: 30.00"));
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(Reply::Orders(vec![]).to_string(), "Orders history is empty.");
    }
}
