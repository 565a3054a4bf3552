use std::collections::BTreeMap;

use disk_manager::DiskAddress;
use frame_table::{Owner, Pid};

use crate::error::PagerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    OnDiskOnly,
    ResidentReadOnly,
    ResidentReadWrite,
}

/// One page of a process address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub vaddr: usize,
    pub block: Option<DiskAddress>,
    /// The block holds the page contents; otherwise the page reads as zeros.
    pub on_disk: bool,
    pub frame: Option<usize>,
}

impl Page {
    fn new(vaddr: usize, block: DiskAddress) -> Self {
        Page {
            vaddr,
            block: Some(block),
            on_disk: false,
            frame: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pid: Pid,
    pages: Vec<Page>,
}

impl Process {
    fn new(pid: Pid) -> Self {
        Process {
            pid,
            pages: Vec::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.pages.get(index)
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Index of the page whose `[vaddr, vaddr + page_size)` contains `addr`.
    pub fn page_index(&self, addr: usize, base: usize, page_size: usize) -> Option<usize> {
        let index = addr.checked_sub(base)? / page_size;
        (index < self.pages.len()).then_some(index)
    }

    /// Appends a page backed by `block`, returning its address.
    pub(crate) fn push(&mut self, base: usize, page_size: usize, block: DiskAddress) -> usize {
        let vaddr = base + self.pages.len() * page_size;
        self.pages.push(Page::new(vaddr, block));
        vaddr
    }
}

/// Live processes keyed by pid.
#[derive(Debug, Clone, Default)]
pub struct ProcessTable {
    procs: BTreeMap<Pid, Process>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }

    pub fn register(&mut self, pid: Pid) -> Result<(), PagerError> {
        if self.procs.contains_key(&pid) {
            return Err(PagerError::DuplicateProcess(pid));
        }
        self.procs.insert(pid, Process::new(pid));
        Ok(())
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(&pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.procs.get_mut(&pid)
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        self.procs.remove(&pid)
    }

    pub fn page(&self, owner: Owner) -> Option<&Page> {
        self.procs.get(&owner.pid)?.page(owner.page)
    }

    pub fn page_mut(&mut self, owner: Owner) -> Option<&mut Page> {
        self.procs.get_mut(&owner.pid)?.page_mut(owner.page)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.procs.values()
    }
}
