//! Bulk-Only Transport pipeline
//!
//! One [`Bbb`] value runs one SCSI command: CBW out, optional data stage, CSW
//! in. The caller submits nothing directly; it drives [`Bbb::advance`] with
//! each transfer-completion status and [`Bbb`] either issues exactly one new
//! submission or yields the terminal status, exactly once per command.

use buskit_core::TransferStatus;
use buskit_driver::time::Duration;
use buskit_driver::transport::{EpType, Payload, Transfer, TransferFlags, Transport, EP_DIR_IN};

use super::{Cbw, Csw, CBW_FLAGS_DATA_IN, CBW_SIGNATURE, CSW_SIGNATURE};

/// Bulk endpoint address and maximum packet size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Endpoint {
    pub addr: u8,
    pub size: u16,
}

/// The bulk endpoint pair of an MSC interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Endpoints {
    pub bulk_in: Endpoint,
    pub bulk_out: Endpoint,
}

/// Per-stage transfer timeouts
///
/// Each applies only while its stage's transfer is outstanding. Data reads
/// usually warrant the longest value; spinning media can take seconds to wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    pub cbw: Duration,
    pub data_out: Duration,
    pub csw: Duration,
    pub data_in: Duration,
}

/// Pipeline stage, named after the transfer currently outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    Cbw,
    DataIn,
    DataOut,
    Csw,
    Done,
}

/// Bulk-Only Transport state machine for one command
///
/// Prepare the CBW through [`cbw_mut`](Self::cbw_mut), call
/// [`start`](Self::start), then feed every completion status into
/// [`advance`](Self::advance) until it returns `Some(status)`. The value may
/// then be reused for the next command; the tag keeps counting.
pub struct Bbb<'d> {
    cbw: Cbw,
    cbw_bytes: [u8; Cbw::SIZE],
    csw_bytes: [u8; Csw::SIZE],
    /// Sent after the CBW or received before the CSW
    data: &'d mut [u8],
    ep: Endpoints,
    timeouts: Timeouts,
    stage: Stage,
}

impl<'d> Bbb<'d> {
    pub fn new(data: &'d mut [u8], ep: Endpoints, timeouts: Timeouts) -> Self {
        Self {
            cbw: Cbw::default(),
            cbw_bytes: [0; Cbw::SIZE],
            csw_bytes: [0; Csw::SIZE],
            data,
            ep,
            timeouts,
            stage: Stage::Done,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn cbw(&self) -> &Cbw {
        &self.cbw
    }

    /// The CBW to prepare before [`start`](Self::start). Not to be touched
    /// while a command is in flight.
    pub fn cbw_mut(&mut self) -> &mut Cbw {
        &mut self.cbw
    }

    /// The CSW of the last completed command.
    ///
    /// Meaningful only after [`advance`](Self::advance) returned
    /// `Some(TransferStatus::Success)`.
    pub fn csw(&self) -> Csw {
        Csw::from_bytes(&self.csw_bytes)
    }

    pub fn data(&self) -> &[u8] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    /// Begins the command currently held in the CBW.
    ///
    /// Validates the CBW before any bus activity: a bad signature or a data
    /// length exceeding the buffer terminates immediately with
    /// [`TransferStatus::Invalid`] and submits nothing. Otherwise submits the
    /// CBW and returns `None`; the outcome arrives through
    /// [`advance`](Self::advance).
    pub fn start<T: Transport>(&mut self, transport: &mut T) -> Option<TransferStatus> {
        if self.cbw.signature != CBW_SIGNATURE {
            warn!("bbb: invalid cbw signature {:#x}", self.cbw.signature);
            return Some(self.finish(TransferStatus::Invalid));
        }
        if self.cbw.data_transfer_length as usize > self.data.len() {
            warn!(
                "bbb: data stage of {} bytes exceeds {}-byte buffer",
                self.cbw.data_transfer_length,
                self.data.len()
            );
            return Some(self.finish(TransferStatus::Invalid));
        }

        self.cbw_bytes = self.cbw.to_bytes();
        self.stage = Stage::Cbw;
        transport.submit(Transfer {
            ep_type: EpType::Bulk,
            ep_addr: self.ep.bulk_out.addr & !EP_DIR_IN,
            ep_size: self.ep.bulk_out.size,
            payload: Payload::Out(&self.cbw_bytes),
            flags: TransferFlags::ZeroPacket,
            interval: 0,
            timeout: self.timeouts.cbw,
        });
        None
    }

    /// Feeds one transfer-completion status into the pipeline.
    ///
    /// Returns `Some(status)` exactly once per command, when it terminates;
    /// `None` while another transfer is outstanding or after termination. A
    /// data-in short packet is the normal early end of a read and proceeds to
    /// the CSW stage; every other non-success status aborts with that status.
    pub fn advance<T: Transport>(
        &mut self,
        transport: &mut T,
        status: TransferStatus,
    ) -> Option<TransferStatus> {
        match self.stage {
            Stage::Cbw => {
                if status != TransferStatus::Success {
                    return Some(self.finish(status));
                }
                let len = self.cbw.data_transfer_length as usize;
                if len == 0 {
                    self.submit_csw(transport);
                } else if self.cbw.flags & CBW_FLAGS_DATA_IN != 0 {
                    self.stage = Stage::DataIn;
                    transport.submit(Transfer {
                        ep_type: EpType::Bulk,
                        ep_addr: self.ep.bulk_in.addr | EP_DIR_IN,
                        ep_size: self.ep.bulk_in.size,
                        payload: Payload::In(&mut self.data[..len]),
                        flags: TransferFlags::NoShortPacket,
                        interval: 0,
                        timeout: self.timeouts.data_in,
                    });
                } else {
                    self.stage = Stage::DataOut;
                    transport.submit(Transfer {
                        ep_type: EpType::Bulk,
                        ep_addr: self.ep.bulk_out.addr & !EP_DIR_IN,
                        ep_size: self.ep.bulk_out.size,
                        payload: Payload::Out(&self.data[..len]),
                        flags: TransferFlags::None,
                        interval: 0,
                        timeout: self.timeouts.data_out,
                    });
                }
                None
            }
            Stage::DataIn => match status {
                // A device sending less than requested ends the read early;
                // the CSW residue reports the shortfall.
                TransferStatus::Success | TransferStatus::ShortPacket => {
                    self.submit_csw(transport);
                    None
                }
                _ => Some(self.finish(status)),
            },
            Stage::DataOut => match status {
                TransferStatus::Success => {
                    self.submit_csw(transport);
                    None
                }
                _ => Some(self.finish(status)),
            },
            Stage::Csw => {
                if status != TransferStatus::Success {
                    return Some(self.finish(status));
                }
                let csw = Csw::from_bytes(&self.csw_bytes);
                if csw.signature != CSW_SIGNATURE {
                    warn!("bbb: invalid csw signature {:#x}", csw.signature);
                    return Some(self.finish(TransferStatus::Io));
                }
                if csw.tag != self.cbw.tag {
                    warn!("bbb: csw tag {} does not echo cbw tag {}", csw.tag, self.cbw.tag);
                    return Some(self.finish(TransferStatus::Io));
                }
                Some(self.finish(TransferStatus::Success))
            }
            Stage::Done => None,
        }
    }

    fn submit_csw<T: Transport>(&mut self, transport: &mut T) {
        self.stage = Stage::Csw;
        transport.submit(Transfer {
            ep_type: EpType::Bulk,
            ep_addr: self.ep.bulk_in.addr | EP_DIR_IN,
            ep_size: self.ep.bulk_in.size,
            payload: Payload::In(&mut self.csw_bytes),
            flags: TransferFlags::ZeroPacket,
            interval: 0,
            timeout: self.timeouts.csw,
        });
    }

    fn finish(&mut self, status: TransferStatus) -> TransferStatus {
        self.stage = Stage::Done;
        status
    }
}
