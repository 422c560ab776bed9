use crate::domain::catalog::Selection;
use crate::domain::order::InvoiceRef;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type UserId = u64;

/// Where a buyer is in the purchase flow.
///
/// Stages only move forward; the one way back is an explicit reset to
/// `Idle`. The manual branch sits beside the automated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    ChoosingSelection,
    ChoosingQuantity,
    AwaitingPaymentMethod,
    AwaitingAutomatedPayment,
    AwaitingManualConfirmation,
    Fulfilled,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::ChoosingSelection => "choosing_selection",
            Stage::ChoosingQuantity => "choosing_quantity",
            Stage::AwaitingPaymentMethod => "awaiting_payment_method",
            Stage::AwaitingAutomatedPayment => "awaiting_automated_payment",
            Stage::AwaitingManualConfirmation => "awaiting_manual_confirmation",
            Stage::Fulfilled => "fulfilled",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Stage::Idle => 0,
            Stage::ChoosingSelection => 1,
            Stage::ChoosingQuantity => 2,
            Stage::AwaitingPaymentMethod => 3,
            Stage::AwaitingAutomatedPayment | Stage::AwaitingManualConfirmation => 4,
            Stage::Fulfilled => 5,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Fulfilled)
    }
}

/// Per-buyer purchase session. Holds no money, so it may be replaced at any time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Session {
    pub stage: Stage,
    pub category: Option<String>,
    pub selection: Option<Selection>,
    pub quantity: Option<u32>,
    pub open_invoice_refs: HashSet<InvoiceRef>,
}

impl Session {
    /// A fresh session for a buyer who asked to purchase `category`.
    pub fn choosing(category: impl Into<String>) -> Self {
        Self {
            stage: Stage::ChoosingSelection,
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Fails with `WrongStage` unless the session is in one of `allowed`.
    pub fn expect_stage(&self, allowed: &[Stage]) -> Result<(), ValidationError> {
        if allowed.contains(&self.stage) {
            Ok(())
        } else {
            Err(ValidationError::WrongStage {
                stage: self.stage.name(),
            })
        }
    }

    fn advance(&mut self, next: Stage) -> Result<(), ValidationError> {
        if next.rank() < self.stage.rank() || self.stage.is_terminal() {
            return Err(ValidationError::WrongStage {
                stage: self.stage.name(),
            });
        }
        self.stage = next;
        Ok(())
    }

    pub fn select(&mut self, selection: Selection) -> Result<(), ValidationError> {
        self.expect_stage(&[Stage::ChoosingSelection])?;
        self.advance(Stage::ChoosingQuantity)?;
        self.selection = Some(selection);
        self.quantity = None;
        Ok(())
    }

    /// Records the quantity. Only legal once a selection exists.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), ValidationError> {
        self.expect_stage(&[Stage::ChoosingQuantity])?;
        if self.selection.is_none() {
            return Err(ValidationError::NoActiveOrder);
        }
        self.advance(Stage::AwaitingPaymentMethod)?;
        self.quantity = Some(quantity);
        Ok(())
    }

    pub fn await_invoice(&mut self, reference: InvoiceRef) -> Result<(), ValidationError> {
        self.expect_stage(&[Stage::AwaitingPaymentMethod, Stage::AwaitingAutomatedPayment])?;
        self.advance(Stage::AwaitingAutomatedPayment)?;
        self.open_invoice_refs.insert(reference);
        Ok(())
    }

    pub fn await_manual_confirmation(&mut self) -> Result<(), ValidationError> {
        self.expect_stage(&[Stage::AwaitingPaymentMethod])?;
        self.advance(Stage::AwaitingManualConfirmation)
    }

    pub fn fulfill(&mut self) -> Result<(), ValidationError> {
        self.expect_stage(&[
            Stage::AwaitingAutomatedPayment,
            Stage::AwaitingManualConfirmation,
        ])?;
        self.advance(Stage::Fulfilled)
    }

    /// The selection and quantity of a session that has reached checkout.
    pub fn checkout(&self) -> Result<(&Selection, u32), ValidationError> {
        match (&self.selection, self.quantity) {
            (Some(selection), Some(quantity)) => Ok((selection, quantity)),
            _ => Err(ValidationError::NoActiveOrder),
        }
    }
}
