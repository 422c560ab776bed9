pub mod event_reader;
pub mod ledger_writer;
