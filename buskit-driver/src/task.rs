//! Master-mode transaction primitives
//!
//! A transaction is an ordered, non-empty slice of [`Task`]s whose final element
//! carries the `last` marker. The backend executes the whole slice as one bus
//! operation: the address phase is emitted at the start of the transaction and
//! again at every direction change (a RESTART, never STOP+START). A boundary
//! between two same-direction tasks is a plain continuation, so splitting a
//! buffer across tasks produces byte-identical bus traffic.

use buskit_core::{Addr7, Direction, TaskError};

/// Data carried by one task, fixing its direction
#[derive(Debug)]
pub enum Segment<'b> {
    /// Bytes transmitted to the slave
    Write(&'b [u8]),
    /// Buffer filled from the slave
    Read(&'b mut [u8]),
}

impl<'b> Segment<'b> {
    pub fn direction(&self) -> Direction {
        match self {
            Segment::Write(_) => Direction::Write,
            Segment::Read(_) => Direction::Read,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Segment::Write(data) => data.len(),
            Segment::Read(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single directional segment of a master-mode transaction
#[derive(Debug)]
pub struct Task<'b> {
    pub addr: Addr7,
    pub segment: Segment<'b>,
    /// Marks the final task of the transaction
    pub last: bool,
}

impl<'b> Task<'b> {
    pub fn write(addr: Addr7, data: &'b [u8]) -> Self {
        Self {
            addr,
            segment: Segment::Write(data),
            last: false,
        }
    }

    pub fn read(addr: Addr7, data: &'b mut [u8]) -> Self {
        Self {
            addr,
            segment: Segment::Read(data),
            last: false,
        }
    }

    /// Marks this task as the final one of its transaction.
    pub fn last(mut self) -> Self {
        self.last = true;
        self
    }
}

/// Failure detail of a task-list execution
///
/// Produced only when a transaction did not run to completion; a successful
/// execution carries no failure detail by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskFailure {
    pub error: TaskError,
    /// 0-based index of the first task that did not complete
    pub task_index: usize,
    /// Bytes of that task actually on the bus before the failure
    pub transferred: usize,
}

pub type ExecResult = Result<(), TaskFailure>;

/// Checks the structural invariants of a task list.
///
/// A valid list is non-empty and exactly its final element carries the `last`
/// marker. Backends should run this before touching the bus; the generic layer
/// always produces valid lists.
pub fn validate(tasks: &[Task<'_>]) -> ExecResult {
    let invalid = |task_index| {
        Err(TaskFailure {
            error: TaskError::InvalidTask,
            task_index,
            transferred: 0,
        })
    };

    match tasks.split_last() {
        None => invalid(0),
        Some((final_task, _)) if !final_task.last => invalid(tasks.len() - 1),
        Some(_) => match tasks.iter().position(|task| task.last) {
            Some(index) if index + 1 != tasks.len() => invalid(index),
            _ => Ok(()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: Addr7 = Addr7::new(0x2A).unwrap();

    #[test]
    fn test_validate_empty() {
        assert_eq!(
            validate(&[]),
            Err(TaskFailure {
                error: TaskError::InvalidTask,
                task_index: 0,
                transferred: 0,
            })
        );
    }

    #[test]
    fn test_validate_missing_last() {
        let tasks = [Task::write(ADDR, &[0x01])];
        assert_eq!(
            validate(&tasks).unwrap_err().error,
            TaskError::InvalidTask
        );
    }

    #[test]
    fn test_validate_early_last() {
        let mut buf = [0u8; 2];
        let tasks = [
            Task::write(ADDR, &[0x01]).last(),
            Task::read(ADDR, &mut buf).last(),
        ];
        let failure = validate(&tasks).unwrap_err();
        assert_eq!(failure.error, TaskError::InvalidTask);
        assert_eq!(failure.task_index, 0);
    }

    #[test]
    fn test_validate_ok() {
        let mut buf = [0u8; 2];
        let tasks = [
            Task::write(ADDR, &[0x01]),
            Task::read(ADDR, &mut buf).last(),
        ];
        assert_eq!(validate(&tasks), Ok(()));
    }
}
