use crate::domain::money::Balance;
use crate::domain::order::InvoiceRef;
use crate::domain::ports::{Invoice, InvoiceOracle, InvoiceStatus};
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedInvoice {
    pub amount: Balance,
    pub description: String,
    pub status: InvoiceStatus,
}

/// Scriptable stand-in for the payment service.
///
/// Invoices start unpaid; `mark_paid` settles them. The oracle can be made
/// unavailable or slow to exercise the engine's failure paths.
pub struct SimulatedOracle {
    base_url: String,
    next_reference: AtomicU64,
    available: AtomicBool,
    latency: RwLock<Duration>,
    invoices: RwLock<HashMap<InvoiceRef, SimulatedInvoice>>,
}

impl Default for SimulatedOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedOracle {
    pub fn new() -> Self {
        Self::with_base_url("https://pay.example/invoice")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            next_reference: AtomicU64::new(1),
            available: AtomicBool::new(true),
            latency: RwLock::new(Duration::ZERO),
            invoices: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Returns `false` if the reference was never issued.
    pub async fn mark_paid(&self, reference: InvoiceRef) -> bool {
        self.set_status(reference, InvoiceStatus::Paid).await
    }

    pub async fn set_status(&self, reference: InvoiceRef, status: InvoiceStatus) -> bool {
        match self.invoices.write().await.get_mut(&reference) {
            Some(invoice) => {
                invoice.status = status;
                true
            }
            None => false,
        }
    }

    pub async fn invoice(&self, reference: InvoiceRef) -> Option<SimulatedInvoice> {
        self.invoices.read().await.get(&reference).cloned()
    }

    async fn respond(&self) -> Result<()> {
        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ShopError::oracle("service unavailable"))
        }
    }
}

#[async_trait]
impl InvoiceOracle for SimulatedOracle {
    async fn create_invoice(&self, amount: Balance, description: &str) -> Result<Invoice> {
        self.respond().await?;
        let reference = InvoiceRef(self.next_reference.fetch_add(1, Ordering::SeqCst));
        self.invoices.write().await.insert(
            reference,
            SimulatedInvoice {
                amount,
                description: description.to_string(),
                status: InvoiceStatus::Unpaid,
            },
        );
        Ok(Invoice {
            reference,
            checkout_url: format!("{}/{}", self.base_url, reference),
        })
    }

    async fn invoice_status(&self, reference: InvoiceRef) -> Result<Option<InvoiceStatus>> {
        self.respond().await?;
        Ok(self.invoice(reference).await.map(|i| i.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let oracle = SimulatedOracle::new();
        let invoice = oracle
            .create_invoice(Balance::new(dec!(30)), "Shopify USA x3")
            .await
            .unwrap();
        assert_eq!(invoice.reference, InvoiceRef(1));
        assert_eq!(invoice.checkout_url, "https://pay.example/invoice/1");
        assert_eq!(
            oracle.invoice_status(invoice.reference).await.unwrap(),
            Some(InvoiceStatus::Unpaid)
        );

        assert!(oracle.mark_paid(invoice.reference).await);
        assert_eq!(
            oracle.invoice_status(invoice.reference).await.unwrap(),
            Some(InvoiceStatus::Paid)
        );
        assert_eq!(oracle.invoice_status(InvoiceRef(99)).await.unwrap(), None);
        assert!(!oracle.mark_paid(InvoiceRef(99)).await);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let oracle = SimulatedOracle::new();
        oracle.set_available(false);
        assert!(matches!(
            oracle.create_invoice(Balance::new(dec!(1)), "x").await,
            Err(ShopError::ExternalService { .. })
        ));
    }
}
