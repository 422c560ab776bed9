//! Outer surfaces: CSV scripts in, ledger reports out.

pub mod csv;
pub mod script;
