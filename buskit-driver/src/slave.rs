//! Slave-mode bus event contracts
//!
//! A backend reports two events per transfer phase: `begin` on START or
//! RESTART, where the application hands over the buffer to use, and `end` on
//! STOP or RESTART, reporting what actually happened. The event carries the
//! address that was matched on the bus, which on multi-address-capable hardware
//! may be a secondary address rather than the one the application configured
//! (or [`Addr7::GENERAL_CALL`] when general call is enabled).
//!
//! 7-bit and 10-bit addressing use distinct handler types. The wire framing is
//! not symmetric: during 10-bit addressing a direction-changing RESTART is part
//! of address resolution, not a data-phase boundary, so the two payloads must
//! not be conflated.

use buskit_core::{Addr10, Addr7, Direction};

/// Bus event delivered to a 7-bit slave handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveEvent {
    /// Address actually matched on the bus
    pub addr: Addr7,
    /// Direction from the master's perspective: `Write` means the handler
    /// buffer receives data, `Read` means it supplies data
    pub direction: Direction,
    /// The phase was opened/closed by a RESTART rather than START/STOP.
    /// Applications that do not care treat begin/end as start/stop.
    pub restart: bool,
}

/// Application callbacks for a 7-bit slave address
pub trait SlaveHandler {
    /// START or RESTART matched one of the configured addresses.
    ///
    /// Returns the buffer for the upcoming phase: received bytes land here for
    /// a master write, transmitted bytes are taken from here for a master read.
    fn begin(&mut self, event: SlaveEvent) -> &mut [u8];

    /// STOP or RESTART closed the phase after `count` transferred bytes.
    fn end(&mut self, event: SlaveEvent, count: usize);
}

/// Bus event delivered to a 10-bit slave handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlaveEvent10 {
    /// Address actually matched on the bus
    pub addr: Addr10,
    pub direction: Direction,
    pub restart: bool,
}

/// Application callbacks for a 10-bit slave address
///
/// Kept separate from [`SlaveHandler`]: the address-resolution RESTART of the
/// 10-bit sequence never reaches the handler as a phase boundary.
pub trait SlaveHandler10 {
    fn begin(&mut self, event: SlaveEvent10) -> &mut [u8];
    fn end(&mut self, event: SlaveEvent10, count: usize);
}
