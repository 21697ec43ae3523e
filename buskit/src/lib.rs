//! # Buskit
//!
//! This library provides two bus protocol engines for no_std environments:
//!
//! * an I2C frontend that turns high-level transfer requests into ordered task lists and
//!   hands them to a pluggable [`Backend`](i2c::Backend), with a generic fallback for every
//!   operation a backend does not accelerate, and
//! * a USB Mass Storage Bulk-Only Transport state machine ([`msc::Bbb`]) that sequences the
//!   CBW, data, and CSW stages of a SCSI command over a caller-supplied [`Transport`](transport::Transport).
//!
//! Both engines use caller-provided buffers and require no dynamic memory allocation.
//!
//! ## Architecture
//!
//! ```text
//!  application
//!      │
//!      ▼
//!  ┌──────────┐   task lists    ┌─────────┐
//!  │ Frontend ├────────────────►│ Backend │──► I2C peripheral driver
//!  └──────────┘                 └─────────┘
//!
//!  application
//!      │
//!      ▼
//!  ┌─────┐   bulk transfers    ┌───────────┐
//!  │ Bbb ├────────────────────►│ Transport │──► USB host driver
//!  └─────┘                     └───────────┘
//! ```
//!
//! Components:
//! * _Frontend_ validates task lists, expands convenience operations (register reads,
//!   10-bit addressing, bus scans) into tasks, and delegates to the backend.
//! * _Backend_ is the driver contract: one mandatory synchronous executor plus provided
//!   defaults for everything else. Hardware drivers override only what they accelerate.
//! * _Bbb_ owns the command block wrapper and status buffers for one SCSI command and
//!   reports exactly one terminal status per command.
//! * _Transport_ is the host-controller contract: bulk transfer submission and control
//!   requests on the default pipe.
//!
//! ## Concurrency model
//!
//! Neither engine spawns tasks or holds locks. The frontend borrows its backend for the
//! duration of each call; drivers decide their own synchronization. `Bbb` is a plain state
//! machine driven by transfer-completion callbacks from the transport.
//!
//! ## Limitations
//!
//! * Slave (target) mode is defined by the [`i2c::slave`] contracts but no generic
//!   implementation exists; it is inherently hardware-driven.
//! * Only bulk and control endpoints are modeled; the MSC engine needs nothing else.
#![no_std]

pub use buskit_core as core;
pub use buskit_driver::{time, transport};

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod i2c;
pub mod msc;
