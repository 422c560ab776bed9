//! Domain layer: value types, the purchase session state machine and the
//! ports the application layer talks to.

pub mod action;
pub mod catalog;
pub mod input;
pub mod money;
pub mod order;
pub mod payload;
pub mod ports;
pub mod session;
