//! I2C transaction engine
//!
//! Master-mode transfers are lists of [`Task`] segments executed atomically by
//! a [`Backend`]. The [`Frontend`] is the application-facing handle: it is
//! bound to one backend at construction and delegates every operation,
//! inheriting the backend's generic fallbacks for anything the driver does not
//! override.
//!
//! ```
//! use buskit::i2c::Frontend;
//! use buskit_mock::MockBackend;
//!
//! let backend = MockBackend::new();
//! let bus = Frontend::new(&backend);
//!
//! let addr = buskit::core::Addr7::new(0x48).unwrap();
//! let mut temp = [0u8; 2];
//! assert!(bus.write_read(addr, &[0x00], &mut temp).is_ok());
//! ```

pub use buskit_driver::backend::{
    Backend, Completion, TaskCallback, TaskId, WriteReadFailure,
};
pub use buskit_driver::slave;
pub use buskit_driver::task::{validate, ExecResult, Segment, Task, TaskFailure};

use buskit_core::{Addr10, Addr7, Speed, Unsupported};

/// Application-facing handle for one I2C bus
///
/// The backend binding is fixed at construction. The frontend holds a shared
/// reference only; backends provide their own interior mutability and outlive
/// every frontend bound to them.
#[derive(Clone, Copy)]
pub struct Frontend<'b> {
    backend: &'b dyn Backend,
}

impl<'b> Frontend<'b> {
    pub fn new(backend: &'b dyn Backend) -> Self {
        Self { backend }
    }

    /// Executes a task list as one atomic bus transaction.
    ///
    /// Call [`validate`] first when the list comes from untrusted input;
    /// backends are entitled to reject malformed lists with
    /// [`TaskError::InvalidTask`](buskit_core::TaskError::InvalidTask).
    pub fn sync_exec(&self, tasks: &mut [Task<'_>]) -> ExecResult {
        self.backend.sync_exec(tasks)
    }

    /// Reads `data.len()` bytes from the slave at `addr`.
    ///
    /// Returns the best-effort byte count, never an error code.
    pub fn read(&self, addr: Addr7, data: &mut [u8]) -> usize {
        self.backend.read(addr, data)
    }

    /// Writes `data` to the slave at `addr`.
    pub fn write(&self, addr: Addr7, data: &[u8]) -> usize {
        self.backend.write(addr, data)
    }

    /// Writes `write_data`, then reads into `read_data` after a RESTART.
    ///
    /// The usual register-read shape. On failure the counts in
    /// [`WriteReadFailure`] tell how far each phase got.
    pub fn write_read(
        &self,
        addr: Addr7,
        write_data: &[u8],
        read_data: &mut [u8],
    ) -> Result<(), WriteReadFailure> {
        self.backend.write_read(addr, write_data, read_data)
    }

    /// Checks whether a slave acknowledges `addr`. Useful for bus scans.
    pub fn detect(&self, addr: Addr7) -> bool {
        self.backend.detect(addr)
    }

    /// Reads from a 10-bit addressed slave.
    pub fn read10(&self, addr10: Addr10, data: &mut [u8]) -> usize {
        self.backend.read10(addr10, data)
    }

    /// Writes to a 10-bit addressed slave.
    pub fn write10(&self, addr10: Addr10, data: &[u8]) -> usize {
        self.backend.write10(addr10, data)
    }

    /// Write-then-read against a 10-bit addressed slave.
    pub fn write_read10(
        &self,
        addr10: Addr10,
        write_data: &[u8],
        read_data: &mut [u8],
    ) -> Result<(), WriteReadFailure> {
        self.backend.write_read10(addr10, write_data, read_data)
    }

    /// Checks whether a 10-bit addressed slave acknowledges.
    pub fn detect10(&self, addr10: Addr10) -> bool {
        self.backend.detect10(addr10)
    }

    /// Queues a task list for background execution.
    ///
    /// `callback` fires exactly once, possibly before this returns when the
    /// backend has no queue of its own. It may run in an interrupt-like
    /// context.
    pub fn async_exec(&self, tasks: &mut [Task<'_>], callback: TaskCallback) -> TaskId {
        self.backend.async_exec(tasks, callback)
    }

    /// Requests cancellation of a still-pending transaction.
    ///
    /// Safe against completed, cancelled or unknown ids.
    pub fn async_cancel(&self, id: TaskId) {
        self.backend.async_cancel(id)
    }

    pub fn set_speed(&self, speed: Speed) -> Result<(), Unsupported> {
        self.backend.set_speed(speed)
    }

    pub fn set_clock_stretching(&self, allow: bool) -> Result<(), Unsupported> {
        self.backend.set_clock_stretching(allow)
    }

    /// Makes the slave interface (in)visible on the bus.
    pub fn set_visible(&self, visible: bool) -> Result<(), Unsupported> {
        self.backend.set_visible(visible)
    }

    /// Enables reception of general-call transfers in slave mode.
    pub fn set_gencall(&self, enable: bool) -> Result<(), Unsupported> {
        self.backend.set_gencall(enable)
    }

    pub fn set_address(&self, addr: Addr7) -> Result<(), Unsupported> {
        self.backend.set_address(addr)
    }

    pub fn set_address10(&self, addr10: Addr10) -> Result<(), Unsupported> {
        self.backend.set_address10(addr10)
    }

    /// Scans `addrs` and reports acknowledging slaves through `found`.
    ///
    /// Reserved addresses are not skipped; pass the range you mean to probe.
    pub fn scan(&self, addrs: impl IntoIterator<Item = Addr7>, mut found: impl FnMut(Addr7)) {
        for addr in addrs {
            if self.detect(addr) {
                trace!("scan: ack at {:?}", addr);
                found(addr);
            }
        }
    }
}
