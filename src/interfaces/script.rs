use super::csv::event_reader::{EventKind, ScriptEvent};
use crate::application::engine::FulfillmentEngine;
use crate::application::reply::Reply;
use crate::application::settlement::{ManualSettlement, OperatorOutcome};
use crate::domain::order::InvoiceRef;
use crate::domain::session::UserId;
use crate::error::{Result, ShopError, ValidationError};
use crate::infrastructure::simulated::SimulatedOracle;
use std::sync::Arc;
use tracing::{debug, info};

/// What applying one script event produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    Buyer(Reply),
    Operator(OperatorOutcome),
    /// `known` is false when the oracle never issued the reference.
    InvoiceSettled { reference: InvoiceRef, known: bool },
    OracleAvailability(bool),
}

/// Replays script events against the engine, the operator side and the
/// simulated payment service.
pub struct ScriptRunner {
    engine: FulfillmentEngine,
    settlement: ManualSettlement,
    oracle: Arc<SimulatedOracle>,
}

impl ScriptRunner {
    pub fn new(
        engine: FulfillmentEngine,
        settlement: ManualSettlement,
        oracle: Arc<SimulatedOracle>,
    ) -> Self {
        Self {
            engine,
            settlement,
            oracle,
        }
    }

    pub async fn apply(&self, event: ScriptEvent) -> Result<ScriptOutcome> {
        let ScriptEvent { actor, action, arg } = event;
        let arg = arg.as_deref();
        let engine = &self.engine;

        let outcome = match action {
            EventKind::Buy => ScriptOutcome::Buyer(engine.start_purchase(actor, required(arg)?).await?),
            EventKind::Variant => ScriptOutcome::Buyer(engine.choose_variant(actor, required(arg)?).await?),
            EventKind::Quantity => ScriptOutcome::Buyer(engine.submit_quantity(actor, required(arg)?).await?),
            EventKind::PayAutomated => ScriptOutcome::Buyer(engine.pay_automated(actor).await?),
            EventKind::PayManual => ScriptOutcome::Buyer(engine.pay_manual(actor).await?),
            EventKind::ConfirmManual => ScriptOutcome::Buyer(engine.confirm_manual_payment(actor).await?),
            EventKind::Check => {
                let reference = match arg {
                    Some(raw) => parse_reference(raw)?,
                    None => self.newest_open_reference(actor).await?,
                };
                ScriptOutcome::Buyer(engine.check_payment(actor, reference).await?)
            }
            EventKind::Restart => ScriptOutcome::Buyer(engine.restart(actor).await?),
            EventKind::TopUp => ScriptOutcome::Buyer(engine.request_top_up(actor, required(arg)?).await?),
            EventKind::Support => ScriptOutcome::Buyer(engine.contact_support(actor, required(arg)?).await?),
            EventKind::Orders => ScriptOutcome::Buyer(engine.order_history(actor).await?),
            EventKind::TopUps => ScriptOutcome::Buyer(engine.top_up_history(actor).await?),
            EventKind::Profile => ScriptOutcome::Buyer(engine.profile(actor).await?),
            EventKind::Operator => {
                ScriptOutcome::Operator(self.settlement.dispatch(actor, required(arg)?).await?)
            }
            EventKind::OperatorMessage => ScriptOutcome::Operator(
                self.settlement
                    .operator_message(actor, required(arg)?)
                    .await?,
            ),
            EventKind::CancelReply => ScriptOutcome::Operator(self.settlement.cancel_reply(actor).await?),
            EventKind::SettleInvoice => {
                let reference = parse_reference(required(arg)?)?;
                let known = self.oracle.mark_paid(reference).await;
                ScriptOutcome::InvoiceSettled { reference, known }
            }
            EventKind::OracleDown => {
                self.oracle.set_available(false);
                ScriptOutcome::OracleAvailability(false)
            }
            EventKind::OracleUp => {
                self.oracle.set_available(true);
                ScriptOutcome::OracleAvailability(true)
            }
        };

        if let ScriptOutcome::Buyer(reply) = &outcome {
            debug!(actor, reply = %reply, "buyer reply");
        }
        info!(actor, ?action, "event applied");
        Ok(outcome)
    }

    async fn newest_open_reference(&self, buyer: UserId) -> Result<InvoiceRef> {
        self.engine
            .session(buyer)
            .await?
            .and_then(|s| s.open_invoice_refs.iter().max().copied())
            .ok_or_else(|| ShopError::NotFound("Order".to_string()))
    }
}

fn required(arg: Option<&str>) -> Result<&str> {
    arg.ok_or_else(|| ValidationError::InvalidToken("missing argument".to_string()).into())
}

fn parse_reference(raw: &str) -> Result<InvoiceRef> {
    raw.parse()
        .map(InvoiceRef)
        .map_err(|_| ValidationError::InvalidToken(raw.to_string()).into())
}
