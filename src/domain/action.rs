//! Operator action tokens.
//!
//! Each token embeds the identifiers it acts on, e.g. `topup_confirm_12_42`
//! confirms top-up 12 for buyer 42. Tokens are attached to operator
//! notifications and come back verbatim when the operator acts.

use crate::domain::session::UserId;
use crate::error::ValidationError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorAction {
    Issue { buyer: UserId },
    Reply { buyer: UserId },
    ConfirmTopUp { top_up: u64, buyer: UserId },
    RejectTopUp { top_up: u64, buyer: UserId },
}

impl fmt::Display for OperatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorAction::Issue { buyer } => write!(f, "issue_{buyer}"),
            OperatorAction::Reply { buyer } => write!(f, "reply_{buyer}"),
            OperatorAction::ConfirmTopUp { top_up, buyer } => {
                write!(f, "topup_confirm_{top_up}_{buyer}")
            }
            OperatorAction::RejectTopUp { top_up, buyer } => {
                write!(f, "topup_reject_{top_up}_{buyer}")
            }
        }
    }
}

impl FromStr for OperatorAction {
    type Err = ValidationError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidToken(token.to_string());
        let number = |s: &str| s.parse::<u64>().map_err(|_| invalid());
        let pair = |s: &str| -> Result<(u64, u64), ValidationError> {
            let (id, buyer) = s.split_once('_').ok_or_else(invalid)?;
            Ok((number(id)?, number(buyer)?))
        };

        if let Some(rest) = token.strip_prefix("topup_confirm_") {
            let (top_up, buyer) = pair(rest)?;
            Ok(OperatorAction::ConfirmTopUp { top_up, buyer })
        } else if let Some(rest) = token.strip_prefix("topup_reject_") {
            let (top_up, buyer) = pair(rest)?;
            Ok(OperatorAction::RejectTopUp { top_up, buyer })
        } else if let Some(rest) = token.strip_prefix("issue_") {
            Ok(OperatorAction::Issue {
                buyer: number(rest)?,
            })
        } else if let Some(rest) = token.strip_prefix("reply_") {
            Ok(OperatorAction::Reply {
                buyer: number(rest)?,
            })
        } else {
            Err(invalid())
        }
    }
}

/// A labelled action attached to a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub token: String,
}

impl ActionButton {
    pub fn new(label: impl Into<String>, action: OperatorAction) -> Self {
        Self {
            label: label.into(),
            token: action.to_string(),
        }
    }
}
