use std::{
    io::Write,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use frame_table::Pid;

use crate::{error::PagerError, mmu::Mmu, pager::Pager, store::BackingStore};

/// A pager shared between the threads servicing monitored processes.
///
/// Every operation runs under one lock, so faults from different processes
/// are serialized against each other and against lifecycle calls.
pub struct SharedPager<M, S, const PAGE_SIZE: usize> {
    inner: Arc<Mutex<Pager<M, S, PAGE_SIZE>>>,
}

impl<M, S, const PAGE_SIZE: usize> Clone for SharedPager<M, S, PAGE_SIZE> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: Mmu, S: BackingStore, const PAGE_SIZE: usize> SharedPager<M, S, PAGE_SIZE> {
    pub fn new(pager: Pager<M, S, PAGE_SIZE>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(pager)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, Pager<M, S, PAGE_SIZE>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register_process(&self, pid: Pid) -> Result<(), PagerError> {
        self.lock().register_process(pid)
    }

    pub fn extend(&self, pid: Pid) -> Result<usize, PagerError> {
        self.lock().extend(pid)
    }

    pub fn handle_fault(&self, pid: Pid, addr: usize) -> Result<(), PagerError> {
        self.lock().handle_fault(pid, addr)
    }

    pub fn destroy_process(&self, pid: Pid) {
        self.lock().destroy_process(pid)
    }

    pub fn read_range<W: Write>(
        &self,
        pid: Pid,
        addr: usize,
        len: usize,
        out: &mut W,
    ) -> Result<(), PagerError> {
        self.lock().read_range(pid, addr, len, out)
    }
}
