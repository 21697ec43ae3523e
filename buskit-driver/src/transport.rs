//! USB host transfer submission contract
//!
//! The transport owns endpoint and URB management; class drivers describe one
//! transfer at a time and are driven by the host loop feeding each completion
//! status back into their state machine. A transfer's buffer must stay valid
//! until its completion has been reported.

use buskit_core::Direction;

use crate::time::Duration;

/// Endpoint transfer type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EpType {
    Control,
    Bulk,
}

/// Direction bit of an endpoint address (set = IN)
pub const EP_DIR_IN: u8 = 0x80;

/// Per-transfer behavior flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferFlags {
    None,
    /// Terminate the transfer with a zero-length packet when the payload is a
    /// multiple of the endpoint size
    ZeroPacket,
    /// Report a device-side short packet as a distinct status instead of
    /// success
    NoShortPacket,
}

/// Transfer payload, fixing the bus direction
#[derive(Debug)]
pub enum Payload<'b> {
    /// Host-to-device data
    Out(&'b [u8]),
    /// Device-to-host buffer
    In(&'b mut [u8]),
}

impl<'b> Payload<'b> {
    pub fn direction(&self) -> Direction {
        match self {
            Payload::Out(_) => Direction::Write,
            Payload::In(_) => Direction::Read,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Payload::Out(data) => data.len(),
            Payload::In(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One transfer to submit
#[derive(Debug)]
pub struct Transfer<'b> {
    pub ep_type: EpType,
    /// Endpoint address; bit 7 ([`EP_DIR_IN`]) selects IN
    pub ep_addr: u8,
    /// Endpoint maximum packet size
    pub ep_size: u16,
    pub payload: Payload<'b>,
    pub flags: TransferFlags,
    /// Polling interval; zero for bulk endpoints
    pub interval: u8,
    /// Applied while this transfer is outstanding
    pub timeout: Duration,
}

/// Standard request-type bits of a SETUP packet
pub mod request_type {
    pub const IN: u8 = 0x80;
    pub const CLASS: u8 = 0x20;
    pub const INTERFACE: u8 = 0x01;
}

/// SETUP packet of an EP0 control request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SetupRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub length: u16,
}

/// Transfer submission primitive of a USB host stack
pub trait Transport {
    /// Submits a transfer. Completion is asynchronous; the host loop reports
    /// the resulting status to whoever drives the class state machine.
    fn submit(&mut self, transfer: Transfer<'_>);

    /// Submits a one-shot control request on the default endpoint.
    fn control(&mut self, setup: SetupRequest, payload: Payload<'_>);
}
