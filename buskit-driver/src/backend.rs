//! I2C backend capability table
//!
//! [`Backend::sync_exec`] is the only mandatory operation. Every other
//! master-mode operation has a provided implementation built purely on top of
//! it; a driver overrides one only when the peripheral offers a faster native
//! path.
//! Configuration and slave-mode entries have no generic meaning and default to
//! [`Unsupported`].
//!
//! Serialization is the backend's responsibility: concurrent `sync_exec` calls
//! against the same backend are not permitted.

use core::sync::atomic::{AtomicU32, Ordering};

use buskit_core::{Addr10, Addr7, Speed, TaskError, Unsupported};

use crate::task::{ExecResult, Task};

/// Identifier of a queued asynchronous transaction
///
/// Issued on enqueue, dead once the completion callback has fired or a
/// cancellation succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(u64);

impl TaskId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

/// Completion notification of an asynchronous transaction
///
/// Delivered exactly once per [`Backend::async_exec`] call, on whatever
/// execution context the backend services the bus from. Read buffers are
/// already filled when the notification fires; the failure detail mirrors the
/// synchronous contract.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Completion {
    pub id: TaskId,
    pub result: ExecResult,
}

/// Completion callback of an asynchronous transaction
///
/// May run in an interrupt-like context: must not block, must be fast.
pub type TaskCallback = fn(Completion);

/// Byte counts of a combined write-then-read that did not run to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteReadFailure {
    pub error: TaskError,
    /// Bytes of the write phase actually sent
    pub written: usize,
    /// Bytes of the read phase actually received
    pub read: usize,
}

// Fallback async_exec completes before returning, so ids only need to be
// unique among outstanding tasks; a wrapping 32-bit counter is plenty.
fn next_fallback_id() -> TaskId {
    static NEXT: AtomicU32 = AtomicU32::new(0);
    TaskId::from_raw(NEXT.fetch_add(1, Ordering::Relaxed) as u64)
}

/// I2C driver capability table
///
/// Implementations provide interior mutability where the peripheral needs
/// state; the engines only ever hold a shared reference.
pub trait Backend {
    /// Executes `tasks` as one atomic bus transaction, blocking until the whole
    /// list completed or one task failed. No further task runs after a failure.
    ///
    /// This operation is mandatory; everything else is derived from it.
    fn sync_exec(&self, tasks: &mut [Task<'_>]) -> ExecResult;

    /// Reads `data.len()` bytes from the slave at `addr`.
    ///
    /// Returns the number of bytes actually transferred, which is the failed
    /// task's partial count when the transaction did not complete.
    fn read(&self, addr: Addr7, data: &mut [u8]) -> usize {
        let requested = data.len();
        let mut tasks = [Task::read(addr, data).last()];
        match self.sync_exec(&mut tasks) {
            Ok(()) => requested,
            Err(failure) => failure.transferred,
        }
    }

    /// Writes `data` to the slave at `addr`.
    ///
    /// Returns the number of bytes actually transferred.
    fn write(&self, addr: Addr7, data: &[u8]) -> usize {
        let requested = data.len();
        let mut tasks = [Task::write(addr, data).last()];
        match self.sync_exec(&mut tasks) {
            Ok(()) => requested,
            Err(failure) => failure.transferred,
        }
    }

    /// Writes `write_data`, then reads into `read_data` after a RESTART.
    ///
    /// On failure the counts report how far each phase got: an untouched phase
    /// reports zero (read) or its full length (write already fully sent).
    fn write_read(
        &self,
        addr: Addr7,
        write_data: &[u8],
        read_data: &mut [u8],
    ) -> Result<(), WriteReadFailure> {
        let written = write_data.len();
        let mut tasks = [
            Task::write(addr, write_data),
            Task::read(addr, read_data).last(),
        ];
        self.sync_exec(&mut tasks).map_err(|failure| match failure.task_index {
            0 => WriteReadFailure {
                error: failure.error,
                written: failure.transferred,
                read: 0,
            },
            _ => WriteReadFailure {
                error: failure.error,
                written,
                read: failure.transferred,
            },
        })
    }

    /// Checks whether a slave acknowledges `addr`.
    ///
    /// Presence is inferred from the address ACK alone; no data moves.
    fn detect(&self, addr: Addr7) -> bool {
        let mut empty: [u8; 0] = [];
        let mut tasks = [Task::read(addr, &mut empty).last()];
        self.sync_exec(&mut tasks).is_ok()
    }

    /// Reads from a 10-bit addressed slave.
    ///
    /// The low address byte goes out as a preliminary write; the RESTART before
    /// the read completes the extended-addressing sequence.
    fn read10(&self, addr10: Addr10, data: &mut [u8]) -> usize {
        let requested = data.len();
        let (addr, low) = addr10.encode();
        match self.write_read(addr, &[low], data) {
            Ok(()) => requested,
            Err(failure) => failure.read,
        }
    }

    /// Writes to a 10-bit addressed slave.
    ///
    /// The low address byte and the payload are two same-direction tasks, which
    /// the bus sees as a single continued write.
    fn write10(&self, addr10: Addr10, data: &[u8]) -> usize {
        let (addr, low) = addr10.encode();
        let low = [low];
        let mut tasks = [Task::write(addr, &low), Task::write(addr, data).last()];
        match self.sync_exec(&mut tasks) {
            Ok(()) => data.len(),
            Err(failure) if failure.task_index == 1 => failure.transferred,
            Err(_) => 0,
        }
    }

    /// Write-then-read against a 10-bit addressed slave.
    ///
    /// Three-task chain: low address byte, payload, RESTART plus read. An
    /// address-byte failure reports zero for both phases.
    fn write_read10(
        &self,
        addr10: Addr10,
        write_data: &[u8],
        read_data: &mut [u8],
    ) -> Result<(), WriteReadFailure> {
        let written = write_data.len();
        let (addr, low) = addr10.encode();
        let low = [low];
        let mut tasks = [
            Task::write(addr, &low),
            Task::write(addr, write_data),
            Task::read(addr, read_data).last(),
        ];
        self.sync_exec(&mut tasks).map_err(|failure| match failure.task_index {
            0 => WriteReadFailure {
                error: failure.error,
                written: 0,
                read: 0,
            },
            1 => WriteReadFailure {
                error: failure.error,
                written: failure.transferred,
                read: 0,
            },
            _ => WriteReadFailure {
                error: failure.error,
                written,
                read: failure.transferred,
            },
        })
    }

    /// Checks whether a 10-bit addressed slave acknowledges.
    ///
    /// Sends the low address byte as a one-byte write; both address phases must
    /// be acknowledged for the task to succeed.
    fn detect10(&self, addr10: Addr10) -> bool {
        let (addr, low) = addr10.encode();
        let low = [low];
        let mut tasks = [Task::write(addr, &low).last()];
        self.sync_exec(&mut tasks).is_ok()
    }

    /// Queues `tasks` for background execution and returns immediately.
    ///
    /// `callback` fires exactly once with the outcome. The fallback has no
    /// queue: it executes synchronously and fires the callback before
    /// returning, which keeps the contract observable for `sync_exec`-only
    /// backends.
    fn async_exec(&self, tasks: &mut [Task<'_>], callback: TaskCallback) -> TaskId {
        let result = self.sync_exec(tasks);
        let id = next_fallback_id();
        callback(Completion { id, result });
        id
    }

    /// Requests cancellation of a still-pending transaction.
    ///
    /// Advisory and idempotent: cancelling an unknown, already-completed or
    /// already-cancelled id does nothing, and a cancel racing a completion must
    /// never produce a second callback. The fallback is a no-op because the
    /// fallback `async_exec` has already completed any id it issued.
    fn async_cancel(&self, _id: TaskId) {}

    fn set_speed(&self, _speed: Speed) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    fn set_clock_stretching(&self, _allow: bool) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    /// Makes the slave interface (in)visible on the bus.
    fn set_visible(&self, _visible: bool) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    /// Enables reception of general-call transfers in slave mode.
    fn set_gencall(&self, _enable: bool) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    fn set_address(&self, _addr: Addr7) -> Result<(), Unsupported> {
        Err(Unsupported)
    }

    fn set_address10(&self, _addr10: Addr10) -> Result<(), Unsupported> {
        Err(Unsupported)
    }
}
