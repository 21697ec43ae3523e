use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use buskit::core::{Addr10, Addr7, Direction, Speed, TaskError, Unsupported};
use buskit::i2c::{
    Backend, Completion, ExecResult, Frontend, Task, TaskFailure, WriteReadFailure,
};
use buskit::i2c::slave::{SlaveEvent, SlaveHandler, SlaveHandler10, SlaveEvent10};
use buskit_mock::MockBackend;

const ADDR: Addr7 = Addr7::new(0x48).unwrap();

fn failure(error: TaskError, task_index: usize, transferred: usize) -> ExecResult {
    Err(TaskFailure {
        error,
        task_index,
        transferred,
    })
}

#[test]
fn test_read_builds_single_last_task() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let mut data = [0u8; 4];
    assert_eq!(bus.read(ADDR, &mut data), 4);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].addr, ADDR);
    assert_eq!(transactions[0].direction, Direction::Read);
    assert_eq!(transactions[0].len, 4);
    assert!(transactions[0].last);
}

#[test]
fn test_write_builds_single_last_task() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    assert_eq!(bus.write(ADDR, &[0x01, 0x02, 0x03]), 3);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].direction, Direction::Write);
    assert!(transactions[0].last);
    assert_eq!(transactions[0].written, vec![0x01, 0x02, 0x03]);
}

#[test]
fn test_read_returns_partial_count_on_failure() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    backend.expect(failure(TaskError::PrematureEnd, 0, 2));
    let mut data = [0u8; 8];
    assert_eq!(bus.read(ADDR, &mut data), 2);
}

#[test]
fn test_read_fills_scripted_data() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    backend.set_read_data(&[0xAA, 0xBB]);
    let mut data = [0u8; 2];
    bus.read(ADDR, &mut data);
    assert_eq!(data, [0xAA, 0xBB]);
}

#[test]
fn test_write_read_emits_restart_pair() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    backend.set_read_data(&[0x11, 0x22]);
    let mut data = [0u8; 2];
    assert_eq!(bus.write_read(ADDR, &[0x05], &mut data), Ok(()));
    assert_eq!(data, [0x11, 0x22]);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].direction, Direction::Write);
    assert_eq!(transactions[0].written, vec![0x05]);
    assert!(!transactions[0].last);
    assert_eq!(transactions[1].direction, Direction::Read);
    assert!(transactions[1].last);
}

#[test]
fn test_write_read_failure_in_read_phase() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    backend.expect(failure(TaskError::PrematureEnd, 1, 3));
    let mut data = [0u8; 8];
    assert_eq!(
        bus.write_read(ADDR, &[0x05, 0x06], &mut data),
        Err(WriteReadFailure {
            error: TaskError::PrematureEnd,
            written: 2,
            read: 3,
        })
    );
}

#[test]
fn test_write_read_failure_in_write_phase() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    backend.expect(failure(TaskError::NoSlave, 0, 1));
    let mut data = [0u8; 8];
    assert_eq!(
        bus.write_read(ADDR, &[0x05, 0x06], &mut data),
        Err(WriteReadFailure {
            error: TaskError::NoSlave,
            written: 1,
            read: 0,
        })
    );
}

#[test]
fn test_detect_is_zero_length_read() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    assert!(bus.detect(ADDR));
    backend.expect(failure(TaskError::NoSlave, 0, 0));
    assert!(!bus.detect(ADDR));

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].direction, Direction::Read);
    assert_eq!(transactions[0].len, 0);
}

fn assert_addr10_encoding(addr10: Addr10, expected_addr7: u8, expected_low: u8) {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let mut data = [0u8; 1];
    bus.read10(addr10, &mut data);

    let transactions = backend.transactions();
    assert_eq!(transactions[0].addr.into_u8(), expected_addr7);
    assert_eq!(transactions[0].written, vec![expected_low]);
}

#[test]
fn test_addr10_encoding_boundaries() {
    assert_addr10_encoding(Addr10::new(0x000).unwrap(), 0b1111000, 0x00);
    assert_addr10_encoding(Addr10::new(0x3FF).unwrap(), 0b1111011, 0xFF);
    assert_addr10_encoding(Addr10::new(0x1A5).unwrap(), 0b1111001, 0xA5);
}

#[test]
fn test_read10_is_write_then_read() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let addr10 = Addr10::new(0x2C8).unwrap();
    backend.set_read_data(&[0x42]);
    let mut data = [0u8; 1];
    assert_eq!(bus.read10(addr10, &mut data), 1);
    assert_eq!(data, [0x42]);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].direction, Direction::Write);
    assert_eq!(transactions[0].written, vec![0xC8]);
    assert_eq!(transactions[1].direction, Direction::Read);
    assert_eq!(transactions[1].addr, transactions[0].addr);
    assert!(transactions[1].last);
}

#[test]
fn test_write10_is_continued_write() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let addr10 = Addr10::new(0x123).unwrap();
    assert_eq!(bus.write10(addr10, &[0xDE, 0xAD]), 2);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].direction, Direction::Write);
    assert_eq!(transactions[0].written, vec![0x23]);
    assert!(!transactions[0].last);
    assert_eq!(transactions[1].direction, Direction::Write);
    assert_eq!(transactions[1].written, vec![0xDE, 0xAD]);
    assert!(transactions[1].last);
}

#[test]
fn test_write10_failure_dispatch() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let addr10 = Addr10::new(0x123).unwrap();

    backend.expect(failure(TaskError::NoSlave, 0, 0));
    assert_eq!(bus.write10(addr10, &[0xDE, 0xAD]), 0);

    backend.expect(failure(TaskError::PrematureEnd, 1, 1));
    assert_eq!(bus.write10(addr10, &[0xDE, 0xAD]), 1);
}

#[test]
fn test_write_read10_chain() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let addr10 = Addr10::new(0x345).unwrap();

    backend.set_read_data(&[0x99]);
    let mut data = [0u8; 1];
    assert_eq!(bus.write_read10(addr10, &[0x10], &mut data), Ok(()));
    assert_eq!(data, [0x99]);

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 3);
    assert_eq!(transactions[0].written, vec![0x45]);
    assert_eq!(transactions[1].written, vec![0x10]);
    assert_eq!(transactions[2].direction, Direction::Read);
    assert!(transactions[2].last);
}

#[test]
fn test_write_read10_failure_dispatch() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let addr10 = Addr10::new(0x345).unwrap();
    let mut data = [0u8; 4];

    backend.expect(failure(TaskError::NoSlave, 0, 0));
    assert_eq!(
        bus.write_read10(addr10, &[0x10, 0x20], &mut data),
        Err(WriteReadFailure {
            error: TaskError::NoSlave,
            written: 0,
            read: 0,
        })
    );

    backend.expect(failure(TaskError::PrematureEnd, 1, 1));
    assert_eq!(
        bus.write_read10(addr10, &[0x10, 0x20], &mut data),
        Err(WriteReadFailure {
            error: TaskError::PrematureEnd,
            written: 1,
            read: 0,
        })
    );

    backend.expect(failure(TaskError::PrematureEnd, 2, 3));
    assert_eq!(
        bus.write_read10(addr10, &[0x10, 0x20], &mut data),
        Err(WriteReadFailure {
            error: TaskError::PrematureEnd,
            written: 2,
            read: 3,
        })
    );
}

#[test]
fn test_detect10_sends_low_address_byte() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    assert!(bus.detect10(Addr10::new(0x07).unwrap()));

    let transactions = backend.transactions();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].addr.into_u8(), 0b1111000);
    assert_eq!(transactions[0].written, vec![0x07]);
    assert!(transactions[0].last);
}

#[test]
fn test_sync_exec_rejects_malformed_list() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let outcome = bus.sync_exec(&mut []);
    assert_eq!(outcome.unwrap_err().error, TaskError::InvalidTask);

    let mut tasks = [Task::write(ADDR, &[0x01])];
    let outcome = bus.sync_exec(&mut tasks);
    assert_eq!(outcome.unwrap_err().error, TaskError::InvalidTask);
    assert!(backend.transactions().is_empty());
}

#[test]
fn test_async_exec_completes_once() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    static LAST_ID: AtomicU64 = AtomicU64::new(u64::MAX);

    fn on_complete(completion: Completion) {
        CALLS.fetch_add(1, Ordering::SeqCst);
        LAST_ID.store(completion.id.into_raw(), Ordering::SeqCst);
        assert_eq!(completion.result, Ok(()));
    }

    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    let mut tasks = [Task::write(ADDR, &[0x01]).last()];
    let id = bus.async_exec(&mut tasks, on_complete);

    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    assert_eq!(LAST_ID.load(Ordering::SeqCst), id.into_raw());
}

#[test]
fn test_async_cancel_is_idempotent() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn on_complete(_completion: Completion) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    backend.hold_async(true);

    let mut tasks = [Task::write(ADDR, &[0x01]).last()];
    let id = bus.async_exec(&mut tasks, on_complete);
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(backend.pending_count(), 1);

    bus.async_cancel(id);
    bus.async_cancel(id);
    assert_eq!(backend.pending_count(), 0);

    backend.fire_pending();
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

#[test]
fn test_async_cancel_after_completion_is_noop() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn on_complete(_completion: Completion) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    backend.hold_async(true);

    let mut tasks = [Task::write(ADDR, &[0x01]).last()];
    let id = bus.async_exec(&mut tasks, on_complete);
    backend.fire_pending();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    bus.async_cancel(id);
    backend.fire_pending();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn test_scan_reports_acknowledging_slaves() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    // 0x10 present, 0x11 absent, 0x12 present.
    backend.expect(Ok(()));
    backend.expect(failure(TaskError::NoSlave, 0, 0));
    backend.expect(Ok(()));

    let mut found = Vec::new();
    let addrs = (0x10..=0x12).map(|raw| Addr7::new(raw).unwrap());
    bus.scan(addrs, |addr| found.push(addr.into_u8()));
    assert_eq!(found, vec![0x10, 0x12]);
}

// A backend providing nothing but the mandatory executor still gets the full
// operation surface.
struct MinimalBackend;

impl Backend for MinimalBackend {
    fn sync_exec(&self, _tasks: &mut [Task<'_>]) -> ExecResult {
        Ok(())
    }
}

#[test]
fn test_minimal_backend_is_fully_functional() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);

    fn on_complete(completion: Completion) {
        CALLS.fetch_add(1, Ordering::SeqCst);
        assert_eq!(completion.result, Ok(()));
    }

    let backend = MinimalBackend;
    let bus = Frontend::new(&backend);

    let mut data = [0u8; 4];
    assert_eq!(bus.read(ADDR, &mut data), 4);
    assert_eq!(bus.write(ADDR, &[0x01]), 1);
    assert!(bus.detect(ADDR));
    assert_eq!(bus.write_read(ADDR, &[0x02], &mut data), Ok(()));

    let mut tasks = [Task::write(ADDR, &[0x03]).last()];
    let id = bus.async_exec(&mut tasks, on_complete);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
    bus.async_cancel(id);
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);

    assert_eq!(bus.set_speed(Speed::Fast), Err(Unsupported));
    assert_eq!(bus.set_clock_stretching(true), Err(Unsupported));
    assert_eq!(bus.set_visible(true), Err(Unsupported));
    assert_eq!(bus.set_gencall(true), Err(Unsupported));
    assert_eq!(bus.set_address(ADDR), Err(Unsupported));
    assert_eq!(bus.set_address10(Addr10::new(0x123).unwrap()), Err(Unsupported));
}

struct EchoSlave {
    buffer: [u8; 8],
    events: Vec<(SlaveEvent, Option<usize>)>,
}

impl EchoSlave {
    fn new() -> Self {
        Self {
            buffer: [0; 8],
            events: Vec::new(),
        }
    }
}

impl SlaveHandler for EchoSlave {
    fn begin(&mut self, event: SlaveEvent) -> &mut [u8] {
        self.events.push((event, None));
        &mut self.buffer
    }

    fn end(&mut self, event: SlaveEvent, count: usize) {
        self.events.push((event, Some(count)));
    }
}

#[test]
fn test_slave_write_delivers_matched_address() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let secondary = Addr7::new(0x49).unwrap();

    bus.set_address(ADDR).unwrap();
    backend.add_secondary_address(secondary);
    bus.set_visible(true).unwrap();

    let mut slave = EchoSlave::new();
    assert_eq!(backend.slave_write(secondary, &[0x07, 0x08], &mut slave), Some(2));
    assert_eq!(&slave.buffer[..2], &[0x07, 0x08]);

    // The event reports the secondary address, not the configured primary.
    assert_eq!(slave.events.len(), 2);
    assert_eq!(slave.events[0].0.addr, secondary);
    assert_eq!(slave.events[0].0.direction, Direction::Write);
    assert_eq!(slave.events[1].1, Some(2));
}

#[test]
fn test_slave_invisible_or_unmatched_ignored() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let mut slave = EchoSlave::new();

    bus.set_address(ADDR).unwrap();
    assert_eq!(backend.slave_write(ADDR, &[0x01], &mut slave), None);

    bus.set_visible(true).unwrap();
    let other = Addr7::new(0x50).unwrap();
    assert_eq!(backend.slave_write(other, &[0x01], &mut slave), None);
    assert!(slave.events.is_empty());
}

#[test]
fn test_slave_general_call() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let mut slave = EchoSlave::new();

    bus.set_address(ADDR).unwrap();
    bus.set_visible(true).unwrap();
    assert_eq!(backend.slave_write(Addr7::GENERAL_CALL, &[0x06], &mut slave), None);

    bus.set_gencall(true).unwrap();
    assert_eq!(backend.slave_write(Addr7::GENERAL_CALL, &[0x06], &mut slave), Some(1));
    assert_eq!(slave.events[0].0.addr, Addr7::GENERAL_CALL);
}

#[test]
fn test_slave_write_read_restart_framing() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);

    bus.set_address(ADDR).unwrap();
    bus.set_visible(true).unwrap();

    let mut slave = EchoSlave::new();
    slave.buffer = [0xA0, 0xA1, 0xA2, 0xA3, 0, 0, 0, 0];
    let mut read_data = [0u8; 2];
    assert_eq!(
        backend.slave_write_read(ADDR, &[0x30], &mut read_data, &mut slave),
        Some((1, 2))
    );
    assert_eq!(read_data, [0x30, 0xA1]);

    // Write phase closed by RESTART, read phase opened by it.
    assert_eq!(slave.events.len(), 4);
    assert!(!slave.events[0].0.restart);
    assert!(slave.events[1].0.restart);
    assert_eq!(slave.events[1].0.direction, Direction::Write);
    assert!(slave.events[2].0.restart);
    assert_eq!(slave.events[2].0.direction, Direction::Read);
    assert!(!slave.events[3].0.restart);
}

struct EchoSlave10 {
    buffer: [u8; 4],
    events: Vec<(SlaveEvent10, Option<usize>)>,
}

impl SlaveHandler10 for EchoSlave10 {
    fn begin(&mut self, event: SlaveEvent10) -> &mut [u8] {
        self.events.push((event, None));
        &mut self.buffer
    }

    fn end(&mut self, event: SlaveEvent10, count: usize) {
        self.events.push((event, Some(count)));
    }
}

#[test]
fn test_slave_write10() {
    let backend = MockBackend::new();
    let bus = Frontend::new(&backend);
    let addr10 = Addr10::new(0x2F0).unwrap();

    bus.set_address10(addr10).unwrap();
    bus.set_visible(true).unwrap();

    let mut slave = EchoSlave10 {
        buffer: [0; 4],
        events: Vec::new(),
    };
    assert_eq!(backend.slave_write10(addr10, &[0x55], &mut slave), Some(1));
    assert_eq!(slave.buffer[0], 0x55);
    assert_eq!(slave.events[0].0.addr, addr10);

    let other = Addr10::new(0x2F1).unwrap();
    assert_eq!(backend.slave_write10(other, &[0x55], &mut slave), None);
}
