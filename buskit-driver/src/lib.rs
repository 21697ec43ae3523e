//! Buskit driver interface
//!
//! The crate provides the contracts between peripheral drivers and the buskit
//! transaction engines. Limited scope facilitates compatibility across versions.
//! Driver crates should depend on this crate. Buskit users should depend on the
//! `buskit` crate instead.
//!
//! Two independent contracts are defined:
//!
//! * [`backend::Backend`] is the capability table an I2C driver implements.
//!   A single operation is mandatory: [`backend::Backend::sync_exec`], which
//!   runs an ordered [`task::Task`] list as one atomic bus transaction.
//!   Every other master-mode operation carries a generic fallback written purely
//!   in terms of `sync_exec`, so a minimal backend is fully functional; a driver
//!   overrides an operation only when the peripheral has a faster native path.
//! * [`transport::Transport`] is the transfer-submission primitive a USB host
//!   stack provides. Class state machines (e.g. mass storage bulk-only
//!   transport) build each stage as one submitted transfer and are driven by the
//!   host loop feeding completion statuses back.
//!
//! Slave-mode bus events are delivered through [`slave::SlaveHandler`]
//! (7-bit addressing) and [`slave::SlaveHandler10`] (10-bit addressing).
//! How a handler is attached is backend-native; typical adapters take the
//! handler at construction.

#![no_std]

pub mod backend;
pub mod slave;
pub mod task;
pub mod transport;

pub mod time {
    pub use embassy_time::Duration;
}
