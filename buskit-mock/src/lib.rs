//! Host-side mocks for bus engine tests
//!
//! [`MockBackend`] simulates an I2C peripheral driver: it records every task
//! it is asked to execute, serves scripted outcomes and read data, and can
//! hold asynchronous completions so tests control when callbacks fire. It
//! also dispatches master-initiated transfers to slave handlers, including
//! secondary-address and general-call matching.
//!
//! [`MockTransport`] records USB transfer submissions and control requests
//! and fills IN payloads from scripted data.

use core::cell::RefCell;
use std::collections::VecDeque;

use buskit_core::{Addr10, Addr7, Direction, Speed, Unsupported};
use buskit_driver::backend::{Backend, Completion, TaskCallback, TaskId};
use buskit_driver::slave::{SlaveEvent, SlaveEvent10, SlaveHandler, SlaveHandler10};
use buskit_driver::task::{validate, ExecResult, Segment, Task};
use buskit_driver::transport::{Payload, SetupRequest, Transfer, Transport};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// One executed task, as seen by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub addr: Addr7,
    pub direction: Direction,
    /// Requested segment length
    pub len: usize,
    pub last: bool,
    /// Bytes actually sent; empty for reads, partial on a failed write
    pub written: Vec<u8>,
}

#[derive(Default)]
struct State {
    transactions: Vec<Transaction>,
    read_data: VecDeque<u8>,
    outcomes: VecDeque<ExecResult>,
    hold_async: bool,
    pending: Vec<(TaskId, ExecResult, TaskCallback)>,
    next_id: u64,
    speed: Option<Speed>,
    clock_stretching: Option<bool>,
    visible: bool,
    gencall: bool,
    address: Option<Addr7>,
    secondary: Vec<Addr7>,
    address10: Option<Addr10>,
}

/// Scriptable I2C backend
///
/// By default every transaction succeeds and read buffers are filled with
/// zeroes. Tests script failures with [`expect`](Self::expect), read payloads
/// with [`set_read_data`](Self::set_read_data), and inspect the recorded
/// [`Transaction`] list afterwards.
pub struct MockBackend {
    state: Mutex<CriticalSectionRawMutex, RefCell<State>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(State::default())),
        }
    }

    /// Scripts the outcome of the next unscripted `sync_exec` call.
    ///
    /// Outcomes queue up in call order; once drained, execution succeeds
    /// again.
    pub fn expect(&self, outcome: ExecResult) {
        self.state
            .lock(|state| state.borrow_mut().outcomes.push_back(outcome));
    }

    /// Appends bytes served to subsequent read segments, in bus order.
    pub fn set_read_data(&self, data: &[u8]) {
        self.state
            .lock(|state| state.borrow_mut().read_data.extend(data.iter().copied()));
    }

    /// All tasks executed so far, in execution order.
    pub fn transactions(&self) -> Vec<Transaction> {
        self.state.lock(|state| state.borrow().transactions.clone())
    }

    pub fn clear_transactions(&self) {
        self.state
            .lock(|state| state.borrow_mut().transactions.clear());
    }

    /// Defers async completions until [`fire_pending`](Self::fire_pending).
    pub fn hold_async(&self, hold: bool) {
        self.state.lock(|state| state.borrow_mut().hold_async = hold);
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock(|state| state.borrow().pending.len())
    }

    /// Fires all held completion callbacks, in enqueue order.
    ///
    /// Callbacks run outside the state lock, so they may call back into the
    /// mock.
    pub fn fire_pending(&self) {
        let pending = self
            .state
            .lock(|state| core::mem::take(&mut state.borrow_mut().pending));
        for (id, result, callback) in pending {
            callback(Completion { id, result });
        }
    }

    /// Adds a secondary slave address that [`slave_write`](Self::slave_write)
    /// and friends will match.
    pub fn add_secondary_address(&self, addr: Addr7) {
        self.state
            .lock(|state| state.borrow_mut().secondary.push(addr));
    }

    fn execute(&self, tasks: &mut [Task<'_>]) -> ExecResult {
        validate(tasks)?;
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let outcome = state.outcomes.pop_front().unwrap_or(Ok(()));

            for (index, task) in tasks.iter_mut().enumerate() {
                // Tasks after the failing one never reach the bus.
                let executed = match outcome {
                    Ok(()) => Some(task.segment.len()),
                    Err(failure) if index < failure.task_index => Some(task.segment.len()),
                    Err(failure) if index == failure.task_index => Some(failure.transferred),
                    Err(_) => None,
                };
                let Some(executed) = executed else { break };

                let written = match &mut task.segment {
                    Segment::Write(data) => data[..executed].to_vec(),
                    Segment::Read(data) => {
                        for byte in data[..executed].iter_mut() {
                            *byte = state.read_data.pop_front().unwrap_or(0);
                        }
                        Vec::new()
                    }
                };
                state.transactions.push(Transaction {
                    addr: task.addr,
                    direction: task.segment.direction(),
                    len: task.segment.len(),
                    last: task.last,
                    written,
                });
            }
            outcome
        })
    }

    fn matched_slave_addr(&self, addr: Addr7) -> Option<Addr7> {
        self.state.lock(|state| {
            let state = state.borrow();
            if !state.visible {
                return None;
            }
            let matched = state.address == Some(addr)
                || state.secondary.contains(&addr)
                || (state.gencall && addr == Addr7::GENERAL_CALL);
            matched.then_some(addr)
        })
    }

    /// Simulates a master write to a slave handler.
    ///
    /// Returns the number of bytes the handler accepted, or `None` when the
    /// slave interface is invisible or `addr` matches no configured address.
    /// The event carries the address matched on the bus, general call
    /// included.
    pub fn slave_write(
        &self,
        addr: Addr7,
        data: &[u8],
        handler: &mut dyn SlaveHandler,
    ) -> Option<usize> {
        let matched = self.matched_slave_addr(addr)?;
        let event = SlaveEvent {
            addr: matched,
            direction: Direction::Write,
            restart: false,
        };
        let buffer = handler.begin(event);
        let count = data.len().min(buffer.len());
        buffer[..count].copy_from_slice(&data[..count]);
        handler.end(event, count);
        Some(count)
    }

    /// Simulates a master read from a slave handler.
    pub fn slave_read(
        &self,
        addr: Addr7,
        data: &mut [u8],
        handler: &mut dyn SlaveHandler,
    ) -> Option<usize> {
        let matched = self.matched_slave_addr(addr)?;
        let event = SlaveEvent {
            addr: matched,
            direction: Direction::Read,
            restart: false,
        };
        let buffer = handler.begin(event);
        let count = data.len().min(buffer.len());
        data[..count].copy_from_slice(&buffer[..count]);
        handler.end(event, count);
        Some(count)
    }

    /// Simulates a master write-then-read, the two phases joined by a
    /// RESTART.
    pub fn slave_write_read(
        &self,
        addr: Addr7,
        write_data: &[u8],
        read_data: &mut [u8],
        handler: &mut dyn SlaveHandler,
    ) -> Option<(usize, usize)> {
        let matched = self.matched_slave_addr(addr)?;

        let begin_write = SlaveEvent {
            addr: matched,
            direction: Direction::Write,
            restart: false,
        };
        let buffer = handler.begin(begin_write);
        let written = write_data.len().min(buffer.len());
        buffer[..written].copy_from_slice(&write_data[..written]);
        handler.end(
            SlaveEvent {
                restart: true,
                ..begin_write
            },
            written,
        );

        let begin_read = SlaveEvent {
            addr: matched,
            direction: Direction::Read,
            restart: true,
        };
        let buffer = handler.begin(begin_read);
        let read = read_data.len().min(buffer.len());
        read_data[..read].copy_from_slice(&buffer[..read]);
        handler.end(
            SlaveEvent {
                restart: false,
                ..begin_read
            },
            read,
        );

        Some((written, read))
    }

    /// Simulates a master write to a 10-bit addressed slave handler.
    pub fn slave_write10(
        &self,
        addr10: Addr10,
        data: &[u8],
        handler: &mut dyn SlaveHandler10,
    ) -> Option<usize> {
        let matched = self.state.lock(|state| {
            let state = state.borrow();
            (state.visible && state.address10 == Some(addr10)).then_some(addr10)
        })?;
        let event = SlaveEvent10 {
            addr: matched,
            direction: Direction::Write,
            restart: false,
        };
        let buffer = handler.begin(event);
        let count = data.len().min(buffer.len());
        buffer[..count].copy_from_slice(&data[..count]);
        handler.end(event, count);
        Some(count)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MockBackend {
    fn sync_exec(&self, tasks: &mut [Task<'_>]) -> ExecResult {
        self.execute(tasks)
    }

    fn async_exec(&self, tasks: &mut [Task<'_>], callback: TaskCallback) -> TaskId {
        // Buffers are only borrowed for this call, so data moves eagerly;
        // holding defers the callback, not the bus traffic.
        let result = self.execute(tasks);
        let (id, fire) = self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let id = TaskId::from_raw(state.next_id);
            state.next_id += 1;
            if state.hold_async {
                state.pending.push((id, result, callback));
                (id, false)
            } else {
                (id, true)
            }
        });
        // Outside the lock, so the callback may call back into the mock.
        if fire {
            callback(Completion { id, result });
        }
        id
    }

    fn async_cancel(&self, id: TaskId) {
        self.state.lock(|state| {
            state
                .borrow_mut()
                .pending
                .retain(|(pending_id, _, _)| *pending_id != id);
        });
    }

    fn set_speed(&self, speed: Speed) -> Result<(), Unsupported> {
        self.state.lock(|state| state.borrow_mut().speed = Some(speed));
        Ok(())
    }

    fn set_clock_stretching(&self, allow: bool) -> Result<(), Unsupported> {
        self.state
            .lock(|state| state.borrow_mut().clock_stretching = Some(allow));
        Ok(())
    }

    fn set_visible(&self, visible: bool) -> Result<(), Unsupported> {
        self.state.lock(|state| state.borrow_mut().visible = visible);
        Ok(())
    }

    fn set_gencall(&self, enable: bool) -> Result<(), Unsupported> {
        self.state.lock(|state| state.borrow_mut().gencall = enable);
        Ok(())
    }

    fn set_address(&self, addr: Addr7) -> Result<(), Unsupported> {
        self.state
            .lock(|state| state.borrow_mut().address = Some(addr));
        Ok(())
    }

    fn set_address10(&self, addr10: Addr10) -> Result<(), Unsupported> {
        self.state
            .lock(|state| state.borrow_mut().address10 = Some(addr10));
        Ok(())
    }
}

/// One recorded transfer submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub ep_addr: u8,
    pub ep_size: u16,
    pub direction: Direction,
    pub len: usize,
    pub flags: buskit_driver::transport::TransferFlags,
    /// Payload of an OUT submission; empty for IN
    pub out_data: Vec<u8>,
}

/// One recorded control request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRecord {
    pub setup: SetupRequest,
    pub direction: Direction,
    pub len: usize,
}

/// Recording USB transport
///
/// IN payloads (bulk and control alike) are filled from the scripted
/// [`in_data`](Self::push_in_data) queue, one entry per transfer.
#[derive(Default)]
pub struct MockTransport {
    pub submissions: Vec<Submission>,
    pub controls: Vec<ControlRecord>,
    in_data: VecDeque<Vec<u8>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the device data of the next IN transfer.
    pub fn push_in_data(&mut self, data: &[u8]) {
        self.in_data.push_back(data.to_vec());
    }

    fn fill_in(in_data: &mut VecDeque<Vec<u8>>, buffer: &mut [u8]) {
        if let Some(data) = in_data.pop_front() {
            let count = data.len().min(buffer.len());
            buffer[..count].copy_from_slice(&data[..count]);
        }
    }
}

impl Transport for MockTransport {
    fn submit(&mut self, transfer: Transfer<'_>) {
        let out_data = match &transfer.payload {
            Payload::Out(data) => data.to_vec(),
            Payload::In(_) => Vec::new(),
        };
        self.submissions.push(Submission {
            ep_addr: transfer.ep_addr,
            ep_size: transfer.ep_size,
            direction: transfer.payload.direction(),
            len: transfer.payload.len(),
            flags: transfer.flags,
            out_data,
        });
        if let Payload::In(buffer) = transfer.payload {
            Self::fill_in(&mut self.in_data, buffer);
        }
    }

    fn control(&mut self, setup: SetupRequest, payload: Payload<'_>) {
        self.controls.push(ControlRecord {
            setup,
            direction: payload.direction(),
            len: payload.len(),
        });
        if let Payload::In(buffer) = payload {
            Self::fill_in(&mut self.in_data, buffer);
        }
    }
}
