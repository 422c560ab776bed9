use crate::domain::money::{Amount, Balance};
use crate::domain::order::{NewOrder, Order, SettlementMethod, SettlementStatus, TopUp};
use crate::domain::ports::Ledger;
use crate::domain::session::UserId;
use crate::error::{Result, ShopError};
use async_trait::async_trait;
use chrono::Utc;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for buyer balances.
pub const CF_BALANCES: &str = "balances";
/// Column Family for orders, keyed by order id.
pub const CF_ORDERS: &str = "orders";
/// Column Family for top-ups, keyed by top-up id.
pub const CF_TOP_UPS: &str = "topups";
/// Column Family for id counters.
pub const CF_META: &str = "meta";

const NEXT_ORDER_ID: &[u8] = b"next_order_id";
const NEXT_TOP_UP_ID: &[u8] = b"next_top_up_id";

/// A persistent ledger implementation using RocksDB.
///
/// Values are JSON and keys are big-endian ids, so iteration order is id
/// order. Every read-modify-write goes through `write_lock`, which makes
/// status flips compare-and-set and id allocation gap-free. Confirming a
/// top-up writes the status and the credited balance in one `WriteBatch`.
///
/// `Clone` shares the underlying `Arc<DB>` and the write lock.
#[derive(Clone)]
pub struct RocksDbLedger {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbLedger {
    /// Opens or creates a RocksDB instance at `path` with all column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_BALANCES, CF_ORDERS, CF_TOP_UPS, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| ShopError::Storage(format!("column family {name} not found")))
    }

    fn read<T: DeserializeOwned>(&self, cf: &str, id: u64) -> Result<Option<T>> {
        match self.db.get_cf(self.cf(cf)?, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf: &str, id: u64, value: &T) -> Result<()> {
        self.db
            .put_cf(self.cf(cf)?, id.to_be_bytes(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf: &str, mode: IteratorMode) -> Result<Vec<T>> {
        self.db
            .iterator_cf(self.cf(cf)?, mode)
            .map(|item| -> Result<T> {
                let (_, value) = item?;
                Ok(serde_json::from_slice(&value)?)
            })
            .collect()
    }

    /// Bumps and returns a counter. Caller holds `write_lock`.
    fn next_id(&self, key: &[u8]) -> Result<u64> {
        let meta = self.cf(CF_META)?;
        let current = match self.db.get_cf(meta, key)? {
            Some(bytes) => {
                let raw = <[u8; 8]>::try_from(bytes.as_slice()).map_err(|_| {
                    ShopError::Storage(format!("corrupt counter {}", String::from_utf8_lossy(key)))
                })?;
                u64::from_be_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.db.put_cf(meta, key, next.to_be_bytes())?;
        Ok(next)
    }

    /// Loads a pending top-up for a status flip. Caller holds `write_lock`.
    fn pending_top_up(&self, id: u64) -> Result<TopUp> {
        let top_up: TopUp = self
            .read(CF_TOP_UPS, id)?
            .ok_or_else(|| ShopError::NotFound("Top-up".to_string()))?;
        if top_up.status.is_terminal() {
            return Err(ShopError::AlreadySettled {
                kind: "Top-up",
                id,
                status: top_up.status.to_string(),
            });
        }
        Ok(top_up)
    }
}

#[async_trait]
impl Ledger for RocksDbLedger {
    async fn create_order(&self, order: NewOrder) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let id = self.next_id(NEXT_ORDER_ID)?;
        let order = Order::from_new(id, order, Utc::now());
        self.write(CF_ORDERS, id, &order)?;
        Ok(order)
    }

    async fn get_order(&self, id: u64) -> Result<Option<Order>> {
        self.read(CF_ORDERS, id)
    }

    async fn latest_pending_order(
        &self,
        buyer: UserId,
        method: SettlementMethod,
    ) -> Result<Option<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS, IteratorMode::End)?;
        Ok(orders.into_iter().find(|o| {
            o.buyer == buyer && o.method == method && o.status == SettlementStatus::Pending
        }))
    }

    async fn settle_order(&self, id: u64, status: SettlementStatus) -> Result<Order> {
        let _guard = self.write_lock.lock().await;
        let mut order: Order = self
            .read(CF_ORDERS, id)?
            .ok_or_else(|| ShopError::NotFound("Order".to_string()))?;
        if order.status.is_terminal() {
            return Err(ShopError::AlreadySettled {
                kind: "Order",
                id,
                status: order.status.to_string(),
            });
        }
        order.status = status;
        self.write(CF_ORDERS, id, &order)?;
        Ok(order)
    }

    async fn orders_for(&self, buyer: UserId, limit: usize) -> Result<Vec<Order>> {
        let orders: Vec<Order> = self.scan(CF_ORDERS, IteratorMode::End)?;
        Ok(orders
            .into_iter()
            .filter(|o| o.buyer == buyer)
            .take(limit)
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>> {
        self.scan(CF_ORDERS, IteratorMode::Start)
    }

    async fn create_top_up(
        &self,
        buyer: UserId,
        amount: Amount,
        method: SettlementMethod,
    ) -> Result<TopUp> {
        let _guard = self.write_lock.lock().await;
        let top_up = TopUp {
            id: self.next_id(NEXT_TOP_UP_ID)?,
            buyer,
            amount,
            method,
            status: SettlementStatus::Pending,
            created_at: Utc::now(),
        };
        self.write(CF_TOP_UPS, top_up.id, &top_up)?;
        Ok(top_up)
    }

    async fn get_top_up(&self, id: u64) -> Result<Option<TopUp>> {
        self.read(CF_TOP_UPS, id)
    }

    async fn confirm_top_up(&self, id: u64) -> Result<TopUp> {
        let _guard = self.write_lock.lock().await;
        let mut top_up = self.pending_top_up(id)?;
        top_up.status = SettlementStatus::Confirmed;

        let balance: Balance = self.read(CF_BALANCES, top_up.buyer)?.unwrap_or_default();
        let balance = balance + Balance::from(top_up.amount);

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_TOP_UPS)?, id.to_be_bytes(), serde_json::to_vec(&top_up)?);
        batch.put_cf(
            self.cf(CF_BALANCES)?,
            top_up.buyer.to_be_bytes(),
            serde_json::to_vec(&balance)?,
        );
        self.db.write(&batch)?;
        Ok(top_up)
    }

    async fn reject_top_up(&self, id: u64) -> Result<TopUp> {
        let _guard = self.write_lock.lock().await;
        let mut top_up = self.pending_top_up(id)?;
        top_up.status = SettlementStatus::Rejected;
        self.write(CF_TOP_UPS, id, &top_up)?;
        Ok(top_up)
    }

    async fn top_ups_for(&self, buyer: UserId, limit: usize) -> Result<Vec<TopUp>> {
        let top_ups: Vec<TopUp> = self.scan(CF_TOP_UPS, IteratorMode::End)?;
        Ok(top_ups
            .into_iter()
            .filter(|t| t.buyer == buyer)
            .take(limit)
            .collect())
    }

    async fn all_top_ups(&self) -> Result<Vec<TopUp>> {
        self.scan(CF_TOP_UPS, IteratorMode::Start)
    }

    async fn balance(&self, buyer: UserId) -> Result<Balance> {
        Ok(self.read(CF_BALANCES, buyer)?.unwrap_or_default())
    }

    async fn debit(&self, buyer: UserId, amount: Amount) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let amount = Balance::from(amount);
        match self.read::<Balance>(CF_BALANCES, buyer)? {
            Some(balance) if balance >= amount => {
                self.write(CF_BALANCES, buyer, &(balance - amount))?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn all_balances(&self) -> Result<Vec<(UserId, Balance)>> {
        self.db
            .iterator_cf(self.cf(CF_BALANCES)?, IteratorMode::Start)
            .map(|item| -> Result<(UserId, Balance)> {
                let (key, value) = item?;
                let raw = <[u8; 8]>::try_from(&key[..])
                    .map_err(|_| ShopError::Storage("corrupt balance key".to_string()))?;
                Ok((u64::from_be_bytes(raw), serde_json::from_slice(&value)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::Selection;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    fn manual_order(buyer: UserId) -> NewOrder {
        NewOrder {
            buyer,
            item: Selection::new("Amazon", "USA"),
            quantity: 2,
            total: Balance::new(dec!(30)),
            method: SettlementMethod::ManualWallet,
            status: SettlementStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).expect("Failed to open RocksDB");

        for name in [CF_BALANCES, CF_ORDERS, CF_TOP_UPS, CF_META] {
            assert!(ledger.db.cf_handle(name).is_some());
        }
    }

    #[tokio::test]
    async fn test_rocksdb_orders() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).unwrap();

        let first = ledger.create_order(manual_order(1)).await.unwrap();
        let second = ledger.create_order(manual_order(1)).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));

        let pending = ledger
            .latest_pending_order(1, SettlementMethod::ManualWallet)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.id, 2);

        ledger
            .settle_order(2, SettlementStatus::Confirmed)
            .await
            .unwrap();
        assert!(matches!(
            ledger.settle_order(2, SettlementStatus::Rejected).await,
            Err(ShopError::AlreadySettled { .. })
        ));
        assert_eq!(ledger.orders_for(1, 10).await.unwrap()[0].id, 2);
        assert_eq!(ledger.all_orders().await.unwrap()[0].id, 1);
    }

    #[tokio::test]
    async fn test_rocksdb_top_ups_and_balances() {
        let dir = tempdir().unwrap();
        let ledger = RocksDbLedger::open(dir.path()).unwrap();

        let top_up = ledger
            .create_top_up(9, Amount::new(dec!(15.50)).unwrap(), SettlementMethod::ManualWallet)
            .await
            .unwrap();
        ledger.confirm_top_up(top_up.id).await.unwrap();
        assert!(ledger.confirm_top_up(top_up.id).await.is_err());
        assert_eq!(ledger.balance(9).await.unwrap(), Balance::new(dec!(15.50)));

        assert!(ledger.debit(9, Amount::new(dec!(5.50)).unwrap()).await.unwrap());
        assert!(!ledger.debit(9, Amount::new(dec!(100)).unwrap()).await.unwrap());
        assert_eq!(
            ledger.all_balances().await.unwrap(),
            vec![(9, Balance::new(dec!(10)))]
        );
    }

    #[tokio::test]
    async fn test_rocksdb_reopen_keeps_counters() {
        let dir = tempdir().unwrap();
        {
            let ledger = RocksDbLedger::open(dir.path()).unwrap();
            ledger.create_order(manual_order(1)).await.unwrap();
        }
        let ledger = RocksDbLedger::open(dir.path()).unwrap();
        let order = ledger.create_order(manual_order(1)).await.unwrap();
        assert_eq!(order.id, 2);
        assert_eq!(ledger.all_orders().await.unwrap().len(), 2);
    }
}
