use std::time::Duration;
use thiserror::Error;

/// Rejections of buyer or operator input.
///
/// Every variant carries its own message so the buyer can tell, for example,
/// a fractional quantity apart from a non-positive one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Quantity must be a number.")]
    NotANumber,
    #[error("Quantity must be a whole number.")]
    NotAWholeNumber,
    #[error("Quantity must be greater than 0.")]
    NonPositiveQuantity,
    #[error("Quantity must be between 1 and {max}.")]
    ExceedsMaximum { max: u32 },
    #[error("Amount must be a number.")]
    InvalidAmount,
    #[error("Amount must be greater than 0.")]
    NonPositiveAmount,
    #[error("Unknown category: {0}")]
    UnknownCategory(String),
    #[error("{variant} is not offered for {category}.")]
    UnknownVariant { category: String, variant: String },
    #[error("No price configured for {0}.")]
    Unpriced(String),
    #[error("Price for {0} must be greater than 0.")]
    NonPositivePrice(String),
    #[error("No active order. Start again with /start.")]
    NoActiveOrder,
    #[error("This action is not available right now ({stage}).")]
    WrongStage { stage: &'static str },
    #[error("Order #{order_id} is still waiting for confirmation.")]
    ManualOrderPending { order_id: u64 },
    #[error("Invalid action token: {0}")]
    InvalidToken(String),
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Rate limited, retry in {}s", .retry_after.as_secs().max(1))]
    RateLimited { retry_after: Duration },
    #[error("{service} error: {detail}")]
    ExternalService {
        service: &'static str,
        detail: String,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("User {actor} is not allowed to perform operator actions")]
    PermissionDenied { actor: u64 },
    #[error("{kind} #{id} is already {status}")]
    AlreadySettled {
        kind: &'static str,
        id: u64,
        status: String,
    },
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
}

pub const ORACLE_SERVICE: &str = "Invoice oracle";
pub const NOTIFIER_SERVICE: &str = "Notification sink";

impl ShopError {
    pub fn oracle(detail: impl ToString) -> Self {
        Self::ExternalService {
            service: ORACLE_SERVICE,
            detail: detail.to_string(),
        }
    }

    pub fn notifier(detail: impl ToString) -> Self {
        Self::ExternalService {
            service: NOTIFIER_SERVICE,
            detail: detail.to_string(),
        }
    }

    /// Text that is safe to show the buyer.
    ///
    /// External failures collapse into a generic sentence; the detail is only
    /// for logs and the operator.
    pub fn buyer_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::RateLimited { .. } => "Please wait a few seconds before retrying.".to_string(),
            Self::ExternalService { service, .. } if *service == ORACLE_SERVICE => {
                "Payment service error. Please try again later.".to_string()
            }
            Self::ExternalService { .. } => {
                "Message could not be delivered. Please try again later.".to_string()
            }
            Self::NotFound(what) => format!("{what} not found."),
            Self::PermissionDenied { .. } => "No permission.".to_string(),
            Self::AlreadySettled { kind, status, .. } => format!("{kind} is already {status}."),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;
