//! USB Mass Storage Class, Bulk-Only Transport
//!
//! Wire structures ([`Cbw`], [`Csw`]), builders for the common SCSI commands,
//! and the [`Bbb`] pipeline that runs one command through its CBW, data and
//! CSW stages. The two class control requests ([`reset`], [`get_max_lun`])
//! live outside the pipeline.
//!
//! The tag is caller-managed: every builder increments it, and the CSW stage
//! later validates the device's echo against it.

use buskit_driver::transport::{request_type, Payload, SetupRequest, Transport};

mod bbb;

pub use bbb::{Bbb, Endpoint, Endpoints, Stage, Timeouts};

pub const CBW_SIGNATURE: u32 = 0x4342_5355;
pub const CSW_SIGNATURE: u32 = 0x5342_5355;

const REQ_BULK_ONLY_RESET: u8 = 0xFF;
const REQ_GET_MAX_LUN: u8 = 0xFE;

/// Direction bit of the CBW flags byte (set = data-in)
pub const CBW_FLAGS_DATA_IN: u8 = 1 << 7;

/// SCSI opcodes used by the builders
pub mod scsi {
    pub const TEST_UNIT_READY: u8 = 0x00;
    pub const REQUEST_SENSE: u8 = 0x03;
    pub const INQUIRY: u8 = 0x12;
    pub const READ_CAPACITY: u8 = 0x25;
    pub const READ_10: u8 = 0x28;
    pub const WRITE_10: u8 = 0x2A;
}

/// CSW command status values
pub mod csw_status {
    pub const PASSED: u8 = 0x00;
    pub const FAILED: u8 = 0x01;
    pub const PHASE_ERROR: u8 = 0x02;
}

/// Command Block Wrapper
///
/// 31-byte little-endian wire structure framing one SCSI command. Reuse the
/// same value across commands so the tag keeps incrementing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cbw {
    pub signature: u32,
    /// Echoed by the device in the CSW; incremented by every builder
    pub tag: u32,
    pub data_transfer_length: u32,
    /// Bit 7 set = data-in
    pub flags: u8,
    pub lun: u8,
    pub cb_length: u8,
    /// Command block, opcode first, zero-padded
    pub cb: [u8; 16],
}

impl Default for Cbw {
    fn default() -> Self {
        Self {
            signature: CBW_SIGNATURE,
            tag: 0,
            data_transfer_length: 0,
            flags: 0,
            lun: 0,
            cb_length: 0,
            cb: [0; 16],
        }
    }
}

impl Cbw {
    pub const SIZE: usize = 31;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.signature.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.tag.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.data_transfer_length.to_le_bytes());
        bytes[12] = self.flags;
        bytes[13] = self.lun;
        bytes[14] = self.cb_length;
        bytes[15..31].copy_from_slice(&self.cb);
        bytes
    }

    // Common prologue of every builder: next tag, LUN 0, zero-padded command
    // block.
    fn prepare(&mut self, data_transfer_length: u32, flags: u8, cb: &[u8]) {
        self.signature = CBW_SIGNATURE;
        self.tag = self.tag.wrapping_add(1);
        self.data_transfer_length = data_transfer_length;
        self.flags = flags;
        self.lun = 0;
        self.cb_length = cb.len() as u8;
        self.cb = [0; 16];
        self.cb[..cb.len()].copy_from_slice(cb);
    }

    /// Prepares a READ(10) command.
    ///
    /// Transfers `lba_count * block_size` bytes device-to-host starting at
    /// logical block `lba_start`.
    pub fn prepare_read10(&mut self, lba_start: u32, lba_count: u16, block_size: u16) {
        let lba = lba_start.to_be_bytes();
        let count = lba_count.to_be_bytes();
        self.prepare(
            u32::from(lba_count) * u32::from(block_size),
            CBW_FLAGS_DATA_IN,
            &[
                scsi::READ_10,
                0x00,
                lba[0],
                lba[1],
                lba[2],
                lba[3],
                0x00,
                count[0],
                count[1],
                0x00,
            ],
        );
    }

    /// Prepares a WRITE(10) command. Same shape as READ(10), host-to-device.
    pub fn prepare_write10(&mut self, lba_start: u32, lba_count: u16, block_size: u16) {
        let lba = lba_start.to_be_bytes();
        let count = lba_count.to_be_bytes();
        self.prepare(
            u32::from(lba_count) * u32::from(block_size),
            0,
            &[
                scsi::WRITE_10,
                0x00,
                lba[0],
                lba[1],
                lba[2],
                lba[3],
                0x00,
                count[0],
                count[1],
                0x00,
            ],
        );
    }

    /// Prepares a TEST UNIT READY command. No data stage.
    pub fn prepare_test_unit_ready(&mut self) {
        self.prepare(0, 0, &[scsi::TEST_UNIT_READY, 0, 0, 0, 0, 0]);
    }

    /// Prepares a READ CAPACITY command.
    pub fn prepare_read_capacity(&mut self) {
        self.prepare(
            6,
            CBW_FLAGS_DATA_IN,
            &[scsi::READ_CAPACITY, 0, 0, 0, 0, 0, 0, 0, 0, 0],
        );
    }

    /// Prepares a standard INQUIRY command, allocation length 36.
    pub fn prepare_inquiry(&mut self) {
        self.prepare(36, CBW_FLAGS_DATA_IN, &[scsi::INQUIRY, 0, 0, 0, 36, 0]);
    }

    /// Prepares a REQUEST SENSE command, allocation length 18.
    pub fn prepare_request_sense(&mut self) {
        self.prepare(18, CBW_FLAGS_DATA_IN, &[scsi::REQUEST_SENSE, 0, 0, 0, 18, 0]);
    }
}

/// Command Status Wrapper
///
/// 13-byte device reply closing every command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Csw {
    pub signature: u32,
    pub tag: u32,
    /// Bytes of the expected data stage the device did not process
    pub data_residue: u32,
    /// One of [`csw_status`]
    pub status: u8,
}

impl Csw {
    pub const SIZE: usize = 13;

    pub fn from_bytes(bytes: &[u8; Self::SIZE]) -> Self {
        let word = |range: core::ops::Range<usize>| {
            let mut le = [0u8; 4];
            le.copy_from_slice(&bytes[range]);
            u32::from_le_bytes(le)
        };
        Self {
            signature: word(0..4),
            tag: word(4..8),
            data_residue: word(8..12),
            status: bytes[12],
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.signature.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.tag.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.data_residue.to_le_bytes());
        bytes[12] = self.status;
        bytes
    }
}

/// Issues a Bulk-Only Mass Storage Reset for `interface`.
///
/// Resets the class protocol without changing the device's endpoint toggles or
/// configuration.
pub fn reset<T: Transport>(transport: &mut T, interface: u16) {
    transport.control(
        SetupRequest {
            request_type: request_type::CLASS | request_type::INTERFACE,
            request: REQ_BULK_ONLY_RESET,
            value: 0,
            index: interface,
            length: 0,
        },
        Payload::Out(&[]),
    );
}

/// Requests the highest LUN of `interface` into `max_lun`.
///
/// Devices report 0 for a single logical unit.
pub fn get_max_lun<T: Transport>(transport: &mut T, interface: u16, max_lun: &mut [u8; 1]) {
    transport.control(
        SetupRequest {
            request_type: request_type::IN | request_type::CLASS | request_type::INTERFACE,
            request: REQ_GET_MAX_LUN,
            value: 0,
            index: interface,
            length: 1,
        },
        Payload::In(max_lun),
    );
}
