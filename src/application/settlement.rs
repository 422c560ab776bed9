use super::idempotency::BuyerLocks;
use super::notify_best_effort;
use crate::config::ShopConfig;
use crate::domain::action::OperatorAction;
use crate::domain::money::Balance;
use crate::domain::order::{SettlementMethod, SettlementStatus};
use crate::domain::payload::{self, FulfillmentPayload};
use crate::domain::ports::{LedgerRef, Notification, NotifierRef, SessionStoreRef};
use crate::domain::session::{Stage, UserId};
use crate::error::{Result, ShopError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum OperatorOutcome {
    /// `notified` is false when the buyer could not be reached; the payload
    /// is returned so the operator can hand it over another way.
    Issued {
        order_id: u64,
        buyer: UserId,
        payload: FulfillmentPayload,
        notified: bool,
    },
    TopUpConfirmed {
        top_up_id: u64,
        buyer: UserId,
        balance: Balance,
        notified: bool,
    },
    TopUpRejected {
        top_up_id: u64,
        buyer: UserId,
        notified: bool,
    },
    AwaitingReplyText {
        buyer: UserId,
    },
    ReplySent {
        buyer: UserId,
        notified: bool,
    },
    ReplyCancelled,
}

/// Operator-side settlement of manual orders and top-ups.
///
/// Each action performs its ledger mutation first and notifies the buyer
/// afterwards. A failed notification is logged and reported in the outcome;
/// it never rolls the ledger back. Issuing takes the same buyer lock as the
/// engine, so it never interleaves with that buyer's own actions.
pub struct ManualSettlement {
    config: Arc<ShopConfig>,
    sessions: SessionStoreRef,
    buyer_locks: BuyerLocks,
    ledger: LedgerRef,
    notifier: NotifierRef,
    reply_targets: Mutex<HashMap<UserId, UserId>>,
}

impl ManualSettlement {
    pub fn new(
        config: Arc<ShopConfig>,
        sessions: SessionStoreRef,
        buyer_locks: BuyerLocks,
        ledger: LedgerRef,
        notifier: NotifierRef,
    ) -> Self {
        Self {
            config,
            sessions,
            buyer_locks,
            ledger,
            notifier,
            reply_targets: Mutex::new(HashMap::new()),
        }
    }

    fn authorize(&self, actor: UserId) -> Result<()> {
        if actor == self.config.operator_id {
            Ok(())
        } else {
            warn!(actor, "operator action refused");
            Err(ShopError::PermissionDenied { actor })
        }
    }

    /// Runs the action encoded in `token` on behalf of `actor`.
    pub async fn dispatch(&self, actor: UserId, token: &str) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        match token.parse::<OperatorAction>()? {
            OperatorAction::Issue { buyer } => self.issue(actor, buyer).await,
            OperatorAction::Reply { buyer } => self.begin_reply(actor, buyer).await,
            OperatorAction::ConfirmTopUp { top_up, buyer } => {
                self.confirm_top_up(actor, top_up, buyer).await
            }
            OperatorAction::RejectTopUp { top_up, buyer } => {
                self.reject_top_up(actor, top_up, buyer).await
            }
        }
    }

    /// `awaiting_manual_confirmation → fulfilled` for the buyer's pending
    /// manual order. The payload is built from the order row, not from the
    /// buyer's live session.
    pub async fn issue(&self, actor: UserId, buyer: UserId) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        let _guard = self.buyer_locks.lock(&buyer).await;
        let pending = self
            .ledger
            .latest_pending_order(buyer, SettlementMethod::ManualWallet)
            .await?
            .ok_or_else(|| ShopError::NotFound("Pending order".to_string()))?;

        let order = self
            .ledger
            .settle_order(pending.id, SettlementStatus::Confirmed)
            .await?;
        let payload = payload::generate(&order.item.variant, order.quantity);
        info!(buyer, order_id = order.id, "manual order issued");

        // the ledger is authoritative; a stale session is only logged
        if let Err(e) = self.fulfill_session(buyer).await {
            warn!(buyer, order_id = order.id, error = %e, "session not advanced after issue");
        }

        let notified = notify_best_effort(
            self.notifier.as_ref(),
            buyer,
            Notification::text(format!("Here are your accounts:\n\n{payload}")),
        )
        .await;

        Ok(OperatorOutcome::Issued {
            order_id: order.id,
            buyer,
            payload,
            notified,
        })
    }

    pub async fn confirm_top_up(
        &self,
        actor: UserId,
        top_up_id: u64,
        buyer: UserId,
    ) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        self.expect_top_up_owner(top_up_id, buyer).await?;

        let top_up = self.ledger.confirm_top_up(top_up_id).await?;
        let balance = self.ledger.balance(buyer).await?;
        info!(buyer, top_up_id, amount = %top_up.amount, %balance, "top-up confirmed");

        let notified = notify_best_effort(
            self.notifier.as_ref(),
            buyer,
            Notification::text("Top-up confirmed. Your balance has been updated."),
        )
        .await;

        Ok(OperatorOutcome::TopUpConfirmed {
            top_up_id,
            buyer,
            balance,
            notified,
        })
    }

    pub async fn reject_top_up(
        &self,
        actor: UserId,
        top_up_id: u64,
        buyer: UserId,
    ) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        self.expect_top_up_owner(top_up_id, buyer).await?;

        self.ledger.reject_top_up(top_up_id).await?;
        info!(buyer, top_up_id, "top-up rejected");

        let notified = notify_best_effort(
            self.notifier.as_ref(),
            buyer,
            Notification::text("Top-up rejected. If this is a mistake, contact support."),
        )
        .await;

        Ok(OperatorOutcome::TopUpRejected {
            top_up_id,
            buyer,
            notified,
        })
    }

    /// Puts the operator in reply mode; the next operator message goes to `buyer`.
    pub async fn begin_reply(&self, actor: UserId, buyer: UserId) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        self.reply_targets.lock().await.insert(actor, buyer);
        Ok(OperatorOutcome::AwaitingReplyText { buyer })
    }

    pub async fn cancel_reply(&self, actor: UserId) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        self.reply_targets.lock().await.remove(&actor);
        Ok(OperatorOutcome::ReplyCancelled)
    }

    /// Delivers `text` to the buyer chosen by `begin_reply` and leaves reply mode.
    pub async fn operator_message(&self, actor: UserId, text: &str) -> Result<OperatorOutcome> {
        self.authorize(actor)?;
        let buyer = self
            .reply_targets
            .lock()
            .await
            .remove(&actor)
            .ok_or_else(|| ShopError::NotFound("Reply target".to_string()))?;

        let notified = notify_best_effort(
            self.notifier.as_ref(),
            buyer,
            Notification::text(format!("Support reply from admin:\n\n{text}")),
        )
        .await;
        Ok(OperatorOutcome::ReplySent { buyer, notified })
    }

    /// Moves a session waiting on manual confirmation to `Fulfilled`.
    /// Sessions in any other stage were reset by the buyer and stay as they are.
    async fn fulfill_session(&self, buyer: UserId) -> Result<()> {
        match self.sessions.get(buyer).await? {
            Some(mut session) if session.stage == Stage::AwaitingManualConfirmation => {
                session.fulfill()?;
                self.sessions.set(buyer, session).await
            }
            _ => Ok(()),
        }
    }

    async fn expect_top_up_owner(&self, top_up_id: u64, buyer: UserId) -> Result<()> {
        match self.ledger.get_top_up(top_up_id).await? {
            Some(top_up) if top_up.buyer == buyer => Ok(()),
            _ => Err(ShopError::NotFound("Top-up".to_string())),
        }
    }
}
