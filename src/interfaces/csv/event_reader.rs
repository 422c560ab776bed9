use crate::domain::session::UserId;
use crate::error::{Result, ShopError};
use serde::Deserialize;
use std::io::Read;

/// Kind of a scripted event. Buyer actions, operator actions and oracle
/// switches share one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Buy,
    Variant,
    Quantity,
    PayAutomated,
    PayManual,
    ConfirmManual,
    Check,
    Restart,
    TopUp,
    Support,
    Orders,
    TopUps,
    Profile,
    Operator,
    OperatorMessage,
    CancelReply,
    SettleInvoice,
    OracleDown,
    OracleUp,
}

/// One row of a script: `actor, action, arg`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScriptEvent {
    pub actor: UserId,
    pub action: EventKind,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub arg: Option<String>,
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Reads script events from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// so the `arg` column may be left off entirely.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily deserializes events; a malformed row yields an error and the
    /// stream continues.
    pub fn events(self) -> impl Iterator<Item = Result<ScriptEvent>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(ShopError::from))
    }
}
