//! Core data types for the buskit bus transaction engines
//!
//! This crate provides the shared status and addressing vocabulary used by the
//! other buskit crates. Buskit users should not depend on this crate directly.
//! Use the `buskit::core` reexport instead.
#![no_std]

#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Requested operation is not provided by this backend.
///
/// Only optional backend capabilities without a generic fallback (speed,
/// clock stretching, slave visibility and addressing) can report this.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Unsupported;

/// 7-bit I2C slave address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Addr7(u8);

impl Addr7 {
    pub const MAX: Addr7 = Addr7(0x7F);

    /// The general-call address. Delivered to slave callbacks when a master
    /// addresses every device on the bus.
    pub const GENERAL_CALL: Addr7 = Addr7(0x00);

    pub const fn new(value: u8) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn from_truncating(value: u8) -> Self {
        Self(value & 0x7F)
    }

    pub const fn into_u8(self) -> u8 {
        self.0
    }
}

impl From<Addr7> for u8 {
    fn from(value: Addr7) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Addr7 {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// 10-bit I2C slave address
///
/// On the wire a 10-bit address is carried as a reserved 7-bit pattern plus one
/// extra data byte; see [`Addr10::encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Addr10(u16);

impl Addr10 {
    pub const MAX: Addr10 = Addr10(0x3FF);

    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn from_truncating(value: u16) -> Self {
        Self(value & 0x3FF)
    }

    pub const fn into_u16(self) -> u16 {
        self.0
    }

    /// Splits the address into the extended-addressing wire form.
    ///
    /// The returned 7-bit address carries the reserved `11110` pattern with the
    /// top two address bits; the returned byte carries the low eight bits and is
    /// transmitted as the first data byte of the transaction.
    pub const fn encode(self) -> (Addr7, u8) {
        let high = (0b11110 << 2) | ((self.0 >> 8) & 0b11) as u8;
        (Addr7(high), (self.0 & 0xFF) as u8)
    }
}

impl From<Addr10> for u16 {
    fn from(value: Addr10) -> Self {
        value.into_u16()
    }
}

impl TryFrom<u16> for Addr10 {
    type Error = InvalidValue;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// I2C bus speed grade
///
/// The least speed grade supported by a peripheral is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    /// 100 kbit/s
    #[default]
    Standard,
    /// 400 kbit/s
    Fast,
    /// 1 Mbit/s
    FastPlus,
    /// 3.4 Mbit/s
    HighSpeed,
    /// 5 Mbit/s, unidirectional
    UltraFast,
}

/// Transfer direction of a single bus segment, from the master's perspective
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Write,
    Read,
}

/// Failure category of an I2C task-list execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskError {
    /// No ACK for the slave address
    NoSlave,
    /// Premature end of transfer (NACK or bus error mid-task)
    PrematureEnd,
    /// Malformed task list
    InvalidTask,
}

/// Outcome of a single USB host transfer, as reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferStatus {
    Success,
    /// The device ended an IN transfer early. Only the MSC Data-In stage
    /// treats this as end-of-data; everywhere else it is a failure.
    ShortPacket,
    /// The endpoint answered with STALL
    Stall,
    /// The stage timeout elapsed
    Timeout,
    /// Protocol-level inconsistency on an otherwise successful transfer
    Io,
    /// The request was rejected before any bus activity
    Invalid,
}
