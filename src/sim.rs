//! A software MMU over [`PhysicalMemory`], standing in for the trap and
//! mapping machinery of a real system.

use std::collections::BTreeMap;

use frame_table::{Pid, Protection};
use log::{trace, warn};
use memory::{MemoryError, PhysicalMemory};

use crate::{error::PagerError, mmu::Mmu, pager::Pager, store::BackingStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    pub frame: usize,
    pub prot: Protection,
}

/// An access the current mappings do not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessFault {
    pub pid: Pid,
    pub addr: usize,
    pub write: bool,
}

pub struct SimulatedMmu<const PAGE_SIZE: usize> {
    memory: PhysicalMemory<PAGE_SIZE>,
    mappings: BTreeMap<(Pid, usize), Mapping>,
}

impl<const PAGE_SIZE: usize> SimulatedMmu<PAGE_SIZE> {
    pub fn new(frames: usize) -> Self {
        Self {
            memory: PhysicalMemory::new(frames),
            mappings: BTreeMap::new(),
        }
    }

    fn page_of(addr: usize) -> usize {
        addr - addr % PAGE_SIZE
    }

    pub fn mapping(&self, pid: Pid, addr: usize) -> Option<Mapping> {
        self.mappings.get(&(pid, Self::page_of(addr))).copied()
    }

    pub fn mapped_pages(&self, pid: Pid) -> usize {
        self.mappings.keys().filter(|(owner, _)| *owner == pid).count()
    }

    pub fn memory(&self) -> &PhysicalMemory<PAGE_SIZE> {
        &self.memory
    }

    /// Splits `[addr, addr + len)` into `(page, offset, chunk)` pieces.
    /// A range running past the end of the address space faults at `addr`.
    fn chunks(
        pid: Pid,
        addr: usize,
        len: usize,
        write: bool,
    ) -> Result<impl Iterator<Item = (usize, usize, usize)>, AccessFault> {
        let end = addr
            .checked_add(len)
            .ok_or(AccessFault { pid, addr, write })?;
        let mut cursor = addr;
        Ok(std::iter::from_fn(move || {
            if cursor >= end {
                return None;
            }
            let page = Self::page_of(cursor);
            let offset = cursor - page;
            let chunk = (PAGE_SIZE - offset).min(end - cursor);
            cursor += chunk;
            Some((page, offset, chunk))
        }))
    }

    /// Resolves every piece of the range to `(frame, offset, chunk)`, stopping
    /// at the first page whose mapping does not allow the access.
    fn resolve(
        &self,
        pid: Pid,
        addr: usize,
        len: usize,
        write: bool,
    ) -> Result<Vec<(usize, usize, usize)>, AccessFault> {
        let mut pieces = Vec::new();
        for (page, offset, chunk) in Self::chunks(pid, addr, len, write)? {
            let allowed = |m: &&Mapping| {
                if write {
                    m.prot.is_writable()
                } else {
                    m.prot.is_readable()
                }
            };
            match self.mappings.get(&(pid, page)).filter(allowed) {
                Some(mapping) => pieces.push((mapping.frame, offset, chunk)),
                None => {
                    return Err(AccessFault {
                        pid,
                        addr: page + offset,
                        write,
                    })
                }
            }
        }
        Ok(pieces)
    }

    /// Reads process memory, faulting on the first byte not readable.
    pub fn load(&self, pid: Pid, addr: usize, len: usize) -> Result<Vec<u8>, AccessFault> {
        let pieces = self.resolve(pid, addr, len, false)?;
        let mut bytes = vec![0; len];
        let mut filled = 0;
        for (frame, offset, chunk) in pieces {
            self.memory
                .read(frame, offset, &mut bytes[filled..filled + chunk])
                .map_err(|_| AccessFault {
                    pid,
                    addr: addr + filled,
                    write: false,
                })?;
            filled += chunk;
        }
        Ok(bytes)
    }

    /// Writes process memory. Nothing is written unless every byte is writable.
    pub fn store(&mut self, pid: Pid, addr: usize, data: &[u8]) -> Result<(), AccessFault> {
        let pieces = self.resolve(pid, addr, data.len(), true)?;
        let mut written = 0;
        for (frame, offset, chunk) in pieces {
            self.memory
                .write(frame, offset, &data[written..written + chunk])
                .map_err(|_| AccessFault {
                    pid,
                    addr: addr + written,
                    write: true,
                })?;
            written += chunk;
        }
        Ok(())
    }
}

impl<const PAGE_SIZE: usize> Mmu for SimulatedMmu<PAGE_SIZE> {
    fn frame_count(&self) -> usize {
        self.memory.frames()
    }

    fn zero_fill(&mut self, frame: usize) -> Result<(), MemoryError> {
        self.memory.zero_frame(frame)
    }

    fn map_resident(&mut self, pid: Pid, vaddr: usize, frame: usize, prot: Protection) {
        trace!("map {}:{:#x} -> frame[{}] {:?}", pid, vaddr, frame, prot);
        self.mappings
            .insert((pid, Self::page_of(vaddr)), Mapping { frame, prot });
    }

    fn change_protection(&mut self, pid: Pid, vaddr: usize, prot: Protection) {
        match self.mappings.get_mut(&(pid, Self::page_of(vaddr))) {
            Some(mapping) => {
                trace!("protect {}:{:#x} {:?}", pid, vaddr, prot);
                mapping.prot = prot;
            }
            None => warn!("protect of unmapped page {}:{:#x}", pid, vaddr),
        }
    }

    fn unmap(&mut self, pid: Pid, vaddr: usize) {
        trace!("unmap {}:{:#x}", pid, vaddr);
        self.mappings.remove(&(pid, Self::page_of(vaddr)));
    }

    fn read_frame(&self, frame: usize, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        self.memory.read(frame, offset, buf)
    }

    fn write_frame(&mut self, frame: usize, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        self.memory.write(frame, offset, data)
    }
}

/// Upper bound on faults serviced for one simulated access.
fn fault_budget<const PAGE_SIZE: usize>(len: usize) -> usize {
    2 * (len / PAGE_SIZE + 2)
}

impl<S: BackingStore, const PAGE_SIZE: usize> Pager<SimulatedMmu<PAGE_SIZE>, S, PAGE_SIZE> {
    /// Reads memory as process `pid` would, servicing each fault it traps.
    pub fn read_user(&mut self, pid: Pid, addr: usize, len: usize) -> Result<Vec<u8>, PagerError> {
        let mut budget = fault_budget::<PAGE_SIZE>(len);
        loop {
            match self.mmu().load(pid, addr, len) {
                Ok(bytes) => return Ok(bytes),
                Err(fault) if budget > 0 => {
                    budget -= 1;
                    self.handle_fault(pid, fault.addr)?;
                }
                Err(fault) => {
                    return Err(PagerError::InvalidAddress {
                        pid,
                        addr: fault.addr,
                    })
                }
            }
        }
    }

    /// Writes memory as process `pid` would, servicing each fault it traps.
    pub fn write_user(&mut self, pid: Pid, addr: usize, data: &[u8]) -> Result<(), PagerError> {
        let mut budget = fault_budget::<PAGE_SIZE>(data.len());
        loop {
            match self.mmu_mut().store(pid, addr, data) {
                Ok(()) => return Ok(()),
                Err(fault) if budget > 0 => {
                    budget -= 1;
                    self.handle_fault(pid, fault.addr)?;
                }
                Err(fault) => {
                    return Err(PagerError::InvalidAddress {
                        pid,
                        addr: fault.addr,
                    })
                }
            }
        }
    }
}
