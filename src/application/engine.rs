use super::cooldown::Cooldown;
use super::idempotency::{BuyerLocks, DeliveredSet, KeyedLocks};
use super::notify_best_effort;
use super::reply::Reply;
use crate::config::ShopConfig;
use crate::domain::action::{ActionButton, OperatorAction};
use crate::domain::input::{parse_amount, parse_quantity};
use crate::domain::order::{InvoiceRef, NewOrder, SettlementMethod, SettlementStatus};
use crate::domain::payload;
use crate::domain::ports::{
    InvoiceOracleRef, InvoiceStatus, LedgerRef, Notification, NotifierRef, SessionStoreRef,
};
use crate::domain::session::{Session, Stage, UserId};
use crate::error::{Result, ShopError, ValidationError};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of rows shown in profile histories.
pub const HISTORY_LIMIT: usize = 10;

/// Drives buyer actions through the purchase state machine.
///
/// Every buyer action runs under that buyer's lock, so two actions from the
/// same buyer never interleave. The automated payment check additionally
/// holds a lock on the invoice reference around the delivered check, the
/// ledger write and the delivered record, which makes fulfillment
/// exactly-once per reference even under duplicate concurrent triggers.
pub struct FulfillmentEngine {
    config: Arc<ShopConfig>,
    sessions: SessionStoreRef,
    ledger: LedgerRef,
    oracle: InvoiceOracleRef,
    notifier: NotifierRef,
    cooldown: Cooldown,
    delivered: DeliveredSet,
    buyer_locks: BuyerLocks,
    reference_locks: KeyedLocks<InvoiceRef>,
}

impl FulfillmentEngine {
    pub fn new(
        config: Arc<ShopConfig>,
        sessions: SessionStoreRef,
        ledger: LedgerRef,
        oracle: InvoiceOracleRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            cooldown: Cooldown::new(config.cooldown()),
            config,
            sessions,
            ledger,
            oracle,
            notifier,
            delivered: DeliveredSet::new(),
            buyer_locks: Arc::new(KeyedLocks::new()),
            reference_locks: KeyedLocks::new(),
        }
    }

    pub fn delivered(&self) -> &DeliveredSet {
        &self.delivered
    }

    /// The session store, for components that advance a buyer's session
    /// outside the buyer's own actions.
    pub fn sessions(&self) -> SessionStoreRef {
        self.sessions.clone()
    }

    /// Locks that serialize every change to a buyer's session.
    pub fn buyer_locks(&self) -> BuyerLocks {
        self.buyer_locks.clone()
    }

    pub async fn session(&self, buyer: UserId) -> Result<Option<Session>> {
        self.sessions.get(buyer).await
    }

    /// `idle → choosing_selection`. Replaces whatever session the buyer had.
    pub async fn start_purchase(&self, buyer: UserId, category: &str) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let variants = self.config.catalog.variants(category)?;
        self.sessions.set(buyer, Session::choosing(category)).await?;
        info!(buyer, category, "purchase started");
        Ok(Reply::ChooseVariant {
            category: category.to_string(),
            variants,
        })
    }

    /// `choosing_selection → choosing_quantity`.
    pub async fn choose_variant(&self, buyer: UserId, variant: &str) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let mut session = self.current(buyer).await?;
        session.expect_stage(&[Stage::ChoosingSelection])?;
        let category = session
            .category
            .clone()
            .ok_or(ValidationError::NoActiveOrder)?;

        let selection = self.config.catalog.select(&category, variant)?;
        let unit_price = self.config.catalog.unit_price(&selection)?;
        session.select(selection.clone())?;
        self.sessions.set(buyer, session).await?;

        debug!(buyer, item = %selection.descriptor(), "variant chosen");
        Ok(Reply::EnterQuantity {
            selection,
            unit_price,
            max: self.config.max_quantity,
        })
    }

    /// `choosing_quantity → awaiting_payment_method`. Rate-limited per buyer.
    pub async fn submit_quantity(&self, buyer: UserId, raw: &str) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let mut session = self.current(buyer).await?;
        session.expect_stage(&[Stage::ChoosingQuantity])?;
        self.cooldown.try_acquire(buyer).await?;

        let quantity = parse_quantity(raw, self.config.max_quantity)?;
        let selection = session
            .selection
            .clone()
            .ok_or(ValidationError::NoActiveOrder)?;
        let total = self.config.catalog.total(&selection, quantity)?;
        session.set_quantity(quantity)?;
        self.sessions.set(buyer, session).await?;

        debug!(buyer, quantity, %total, "quantity accepted");
        Ok(Reply::ChoosePaymentMethod {
            selection,
            quantity,
            total,
        })
    }

    /// `awaiting_payment_method → awaiting_automated_payment`.
    ///
    /// The session only changes once the oracle has returned an invoice. On
    /// oracle failure the operator receives the full context.
    pub async fn pay_automated(&self, buyer: UserId) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let mut session = self.current(buyer).await?;
        session.expect_stage(&[Stage::AwaitingPaymentMethod, Stage::AwaitingAutomatedPayment])?;
        let (selection, quantity) = session.checkout().map(|(s, q)| (s.clone(), q))?;
        let total = self.config.catalog.total(&selection, quantity)?;
        let description = format!("{} x{}", selection, quantity);

        let invoice = match self
            .bounded(self.oracle.create_invoice(total, &description))
            .await
        {
            Ok(invoice) => invoice,
            Err(e) => {
                warn!(buyer, item = %selection.descriptor(), quantity, %total, error = %e, "invoice creation failed");
                let alert = Notification::text(format!(
                    "Payment service error\n\nUser ID: {buyer}\nItem: {}\nQuantity: {quantity}\nTotal: {total} {}\n\nError: {e}",
                    selection.descriptor(),
                    self.config.asset
                ));
                notify_best_effort(self.notifier.as_ref(), self.config.operator_id, alert).await;
                return Err(e);
            }
        };

        session.await_invoice(invoice.reference)?;
        self.sessions.set(buyer, session).await?;
        info!(buyer, reference = %invoice.reference, %total, "invoice created");
        Ok(Reply::Checkout {
            reference: invoice.reference,
            checkout_url: invoice.checkout_url,
            total,
        })
    }

    /// `awaiting_automated_payment → fulfilled`, polled by the buyer.
    pub async fn check_payment(&self, buyer: UserId, reference: InvoiceRef) -> Result<Reply> {
        let _buyer_guard = self.buyer_locks.lock(&buyer).await;
        let _reference_guard = self.reference_locks.lock(&reference).await;

        if self.delivered.contains(reference).await {
            info!(buyer, %reference, "duplicate payment check ignored");
            return Ok(Reply::AlreadyDelivered { reference });
        }

        let mut session = self
            .sessions
            .get(buyer)
            .await?
            .filter(|s| s.open_invoice_refs.contains(&reference))
            .ok_or_else(|| ShopError::NotFound("Order".to_string()))?;

        let status = self
            .bounded(self.oracle.invoice_status(reference))
            .await?
            .ok_or_else(|| ShopError::NotFound("Invoice".to_string()))?;

        match status {
            InvoiceStatus::Paid => {}
            InvoiceStatus::Unpaid | InvoiceStatus::Unknown => {
                debug!(buyer, %reference, ?status, "invoice not paid yet");
                return Ok(Reply::PaymentPending { reference });
            }
        }

        let (selection, quantity) = session.checkout().map(|(s, q)| (s.clone(), q))?;
        let total = self.config.catalog.total(&selection, quantity)?;
        if !session.stage.is_terminal() {
            session.fulfill()?;
        }

        let payload = payload::generate(&selection.variant, quantity);
        let order = self
            .ledger
            .create_order(NewOrder {
                buyer,
                item: selection.clone(),
                quantity,
                total,
                method: SettlementMethod::AutomatedInvoice,
                status: SettlementStatus::Confirmed,
            })
            .await?;
        self.delivered.record(reference).await;
        self.sessions.set(buyer, session).await?;

        info!(buyer, %reference, order_id = order.id, %total, "order fulfilled");
        Ok(Reply::Delivered {
            order_id: order.id,
            payload,
        })
    }

    /// Shows the wallet address for manual settlement. No transition.
    pub async fn pay_manual(&self, buyer: UserId) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let session = self.current(buyer).await?;
        session.expect_stage(&[Stage::AwaitingPaymentMethod])?;
        Ok(Reply::WalletInstructions {
            address: self.config.wallet_address.clone(),
        })
    }

    /// `awaiting_payment_method → awaiting_manual_confirmation`.
    ///
    /// The buyer asserts the transfer was made. A pending manual order is
    /// written and the operator is asked to verify it. A buyer may hold at
    /// most one pending manual order.
    pub async fn confirm_manual_payment(&self, buyer: UserId) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        let mut session = self.current(buyer).await?;
        session.expect_stage(&[Stage::AwaitingPaymentMethod])?;
        let (selection, quantity) = session.checkout().map(|(s, q)| (s.clone(), q))?;
        let total = self.config.catalog.total(&selection, quantity)?;

        if let Some(pending) = self
            .ledger
            .latest_pending_order(buyer, SettlementMethod::ManualWallet)
            .await?
        {
            return Err(ValidationError::ManualOrderPending {
                order_id: pending.id,
            }
            .into());
        }
        session.await_manual_confirmation()?;

        let order = self
            .ledger
            .create_order(NewOrder {
                buyer,
                item: selection.clone(),
                quantity,
                total,
                method: SettlementMethod::ManualWallet,
                status: SettlementStatus::Pending,
            })
            .await?;
        self.sessions.set(buyer, session).await?;
        info!(buyer, order_id = order.id, %total, "manual order pending");

        let alert = Notification::text(format!(
            "Manual payment request\n\nUser ID: {buyer}\nOrder: #{}\nItem: {}\nQuantity: {quantity}\nTotal: {total} {}\n\nIssue after you see the payment.",
            order.id,
            selection.descriptor(),
            self.config.asset
        ))
        .with_action(ActionButton::new("Issue", OperatorAction::Issue { buyer }))
        .with_action(ActionButton::new("Reply", OperatorAction::Reply { buyer }));
        notify_best_effort(self.notifier.as_ref(), self.config.operator_id, alert).await;

        Ok(Reply::AwaitingConfirmation { order_id: order.id })
    }

    /// Any stage → idle.
    pub async fn restart(&self, buyer: UserId) -> Result<Reply> {
        let _guard = self.buyer_locks.lock(&buyer).await;
        self.sessions.clear(buyer).await?;
        debug!(buyer, "session reset");
        Ok(Reply::Restarted)
    }

    /// Records a pending top-up and asks the operator to verify it.
    pub async fn request_top_up(&self, buyer: UserId, raw_amount: &str) -> Result<Reply> {
        let amount = parse_amount(raw_amount)?;
        let top_up = self
            .ledger
            .create_top_up(buyer, amount, SettlementMethod::ManualWallet)
            .await?;
        info!(buyer, top_up_id = top_up.id, %amount, "top-up pending");

        let alert = Notification::text(format!(
            "Top-up request\n\nUser ID: {buyer}\nTop-up ID: {}\nAmount: {amount} {}\n\nConfirm after you see the payment.",
            top_up.id, self.config.asset
        ))
        .with_action(ActionButton::new(
            "Confirm top-up",
            OperatorAction::ConfirmTopUp {
                top_up: top_up.id,
                buyer,
            },
        ))
        .with_action(ActionButton::new(
            "Reject",
            OperatorAction::RejectTopUp {
                top_up: top_up.id,
                buyer,
            },
        ));
        notify_best_effort(self.notifier.as_ref(), self.config.operator_id, alert).await;

        Ok(Reply::TopUpRequested {
            top_up_id: top_up.id,
            address: self.config.wallet_address.clone(),
        })
    }

    /// Forwards a support message to the operator.
    pub async fn contact_support(&self, buyer: UserId, text: &str) -> Result<Reply> {
        let message = Notification::text(format!("Support request\n\nFrom: {buyer}\n\nMessage:\n{text}"))
            .with_action(ActionButton::new("Issue", OperatorAction::Issue { buyer }))
            .with_action(ActionButton::new("Reply", OperatorAction::Reply { buyer }));
        self.notifier
            .send(self.config.operator_id, message)
            .await?;
        Ok(Reply::SupportForwarded)
    }

    pub async fn order_history(&self, buyer: UserId) -> Result<Reply> {
        Ok(Reply::Orders(
            self.ledger.orders_for(buyer, HISTORY_LIMIT).await?,
        ))
    }

    pub async fn top_up_history(&self, buyer: UserId) -> Result<Reply> {
        Ok(Reply::TopUps(
            self.ledger.top_ups_for(buyer, HISTORY_LIMIT).await?,
        ))
    }

    pub async fn profile(&self, buyer: UserId) -> Result<Reply> {
        Ok(Reply::Profile {
            buyer,
            stats: self.ledger.stats(buyer).await?,
        })
    }

    async fn current(&self, buyer: UserId) -> Result<Session> {
        Ok(self
            .sessions
            .get(buyer)
            .await?
            .ok_or(ValidationError::NoActiveOrder)?)
    }

    /// Bounds an oracle call by the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        let timeout = self.config.oracle_timeout();
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| ShopError::oracle(format!("no answer within {timeout:?}")))?
    }
}
