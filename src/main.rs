use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use orderflow::application::engine::FulfillmentEngine;
use orderflow::application::settlement::ManualSettlement;
use orderflow::config::ShopConfig;
use orderflow::domain::ports::LedgerRef;
use orderflow::infrastructure::in_memory::{InMemoryLedger, InMemorySessionStore};
use orderflow::infrastructure::notifier::LogNotifier;
use orderflow::infrastructure::simulated::SimulatedOracle;
use orderflow::interfaces::csv::event_reader::EventReader;
use orderflow::interfaces::csv::ledger_writer::LedgerWriter;
use orderflow::interfaces::script::ScriptRunner;
use orderflow::telemetry;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Report {
    Orders,
    Topups,
    Balances,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input script CSV file (actor, action, arg)
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JSON config file (optional)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the operator identity from the config
    #[arg(long)]
    operator_id: Option<u64>,

    /// Overrides the quantity cooldown from the config
    #[arg(long)]
    cooldown_secs: Option<u64>,

    /// Ledger table printed to stdout after the script ran
    #[arg(long, value_enum, default_value_t = Report::Orders)]
    report: Report,
}

fn open_ledger(db_path: Option<PathBuf>) -> Result<LedgerRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let ledger = orderflow::infrastructure::rocksdb::RocksDbLedger::open(path)
                .into_diagnostic()?;
            Ok(Arc::new(ledger))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryLedger::new()))
        }
        None => Ok(Arc::new(InMemoryLedger::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init();

    let mut config = match &cli.config {
        Some(path) => ShopConfig::load(path).into_diagnostic()?,
        None => ShopConfig::default(),
    };
    if let Some(operator_id) = cli.operator_id {
        config.operator_id = operator_id;
    }
    if let Some(cooldown_secs) = cli.cooldown_secs {
        config.cooldown_secs = cooldown_secs;
    }
    let config = Arc::new(config);

    let ledger = open_ledger(cli.db_path)?;
    let oracle = Arc::new(SimulatedOracle::new());
    let notifier = Arc::new(LogNotifier);

    let engine = FulfillmentEngine::new(
        config.clone(),
        Arc::new(InMemorySessionStore::new()),
        ledger.clone(),
        oracle.clone(),
        notifier.clone(),
    );
    let settlement = ManualSettlement::new(
        config,
        engine.sessions(),
        engine.buyer_locks(),
        ledger.clone(),
        notifier,
    );
    let runner = ScriptRunner::new(engine, settlement, oracle);

    // Replay the script
    let file = File::open(cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for event_result in reader.events() {
        match event_result {
            Ok(event) => {
                if let Err(e) = runner.apply(event).await {
                    eprintln!("Error processing event: {}", e);
                }
            }
            Err(e) => {
                eprintln!("Error reading event: {}", e);
            }
        }
    }

    // Output the requested ledger table
    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    match cli.report {
        Report::Orders => writer.write_orders(&ledger.all_orders().await.into_diagnostic()?),
        Report::Topups => writer.write_top_ups(&ledger.all_top_ups().await.into_diagnostic()?),
        Report::Balances => writer.write_balances(&ledger.all_balances().await.into_diagnostic()?),
    }
    .into_diagnostic()?;

    Ok(())
}
