use std::{fmt, io};

use disk::DiskError;
use frame_table::Pid;
use memory::MemoryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerError {
    DuplicateProcess(Pid),
    UnknownProcess(Pid),
    /// No free swap block is left for a new page.
    StorageExhausted,
    /// Fatal for the faulting process: the access has no valid target.
    InvalidAddress { pid: Pid, addr: usize },
    InvalidRange { pid: Pid, addr: usize, len: usize },
    Disk(DiskError),
    Memory(MemoryError),
    Output(io::ErrorKind),
}

impl fmt::Display for PagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PagerError::DuplicateProcess(pid) => write!(f, "process {} is already registered", pid),
            PagerError::UnknownProcess(pid) => write!(f, "process {} is not registered", pid),
            PagerError::StorageExhausted => write!(f, "no free block on the swap device"),
            PagerError::InvalidAddress { pid, addr } => {
                write!(f, "process {} has no access to address {:#x}", pid, addr)
            }
            PagerError::InvalidRange { pid, addr, len } => write!(
                f,
                "range {:#x}..{:#x} is not resident in process {}",
                addr,
                addr.saturating_add(*len),
                pid
            ),
            PagerError::Disk(err) => write!(f, "swap device error: {}", err),
            PagerError::Memory(err) => write!(f, "frame access failed: {}", err),
            PagerError::Output(kind) => write!(f, "could not write dump: {}", kind),
        }
    }
}

impl std::error::Error for PagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PagerError::Disk(err) => Some(err),
            PagerError::Memory(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DiskError> for PagerError {
    fn from(err: DiskError) -> Self {
        PagerError::Disk(err)
    }
}

impl From<MemoryError> for PagerError {
    fn from(err: MemoryError) -> Self {
        PagerError::Memory(err)
    }
}

impl From<io::Error> for PagerError {
    fn from(err: io::Error) -> Self {
        PagerError::Output(err.kind())
    }
}
