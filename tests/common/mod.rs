#![allow(dead_code)]

use orderflow::application::engine::FulfillmentEngine;
use orderflow::application::settlement::ManualSettlement;
use orderflow::config::ShopConfig;
use orderflow::infrastructure::in_memory::{InMemoryLedger, InMemorySessionStore};
use orderflow::infrastructure::notifier::Outbox;
use orderflow::infrastructure::simulated::SimulatedOracle;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const OPERATOR: u64 = 1;

/// Engine, operator side and their collaborators wired over in-memory adapters.
pub struct Shop {
    pub engine: Arc<FulfillmentEngine>,
    pub settlement: Arc<ManualSettlement>,
    pub ledger: Arc<InMemoryLedger>,
    pub oracle: Arc<SimulatedOracle>,
    pub outbox: Arc<Outbox>,
}

pub fn shop() -> Shop {
    shop_with(ShopConfig {
        operator_id: OPERATOR,
        cooldown_secs: 0,
        ..ShopConfig::default()
    })
}

pub fn shop_with(config: ShopConfig) -> Shop {
    let config = Arc::new(config);
    let ledger = Arc::new(InMemoryLedger::new());
    let oracle = Arc::new(SimulatedOracle::new());
    let outbox = Arc::new(Outbox::new());
    let engine = FulfillmentEngine::new(
        config.clone(),
        Arc::new(InMemorySessionStore::new()),
        ledger.clone(),
        oracle.clone(),
        outbox.clone(),
    );
    let settlement = ManualSettlement::new(
        config,
        engine.sessions(),
        engine.buyer_locks(),
        ledger.clone(),
        outbox.clone(),
    );
    Shop {
        engine: Arc::new(engine),
        settlement: Arc::new(settlement),
        ledger,
        oracle,
        outbox,
    }
}

/// Writes a script with one automated purchase per buyer, each paid and checked.
pub fn generate_script(path: &Path, buyers: u64) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);
    wtr.write_record(["actor", "action", "arg"])?;

    for buyer in 1..=buyers {
        let id = buyer.to_string();
        wtr.write_record([id.as_str(), "buy", "Shopify"])?;
        wtr.write_record([id.as_str(), "variant", "NETHERLANDS"])?;
        wtr.write_record([id.as_str(), "quantity", "1"])?;
        wtr.write_record([id.as_str(), "pay_automated", ""])?;
        // invoice references are issued in buyer order
        wtr.write_record(["0", "settle_invoice", id.as_str()])?;
        wtr.write_record([id.as_str(), "check", ""])?;
    }

    wtr.flush()?;
    Ok(())
}
