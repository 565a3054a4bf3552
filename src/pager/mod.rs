mod inspect;

use std::collections::BTreeSet;

use disk_manager::FreeSpaceManager;
use frame_table::{Clock, Frame, FrameTable, Owner, Pid, Protection};
use log::{debug, info, warn};

use crate::{
    config::{PagerConfig, DEFAULT_PAGE_SIZE},
    error::PagerError,
    mmu::Mmu,
    process::{PageState, Process, ProcessTable},
    store::BackingStore,
};

// Algorithm for servicing a fault:
// - Page not resident: take a frame (evicting if none is free), fill it from
//   its block or with zeros, map it read-only
// - Page resident read-only: the process wants to write, grant read-write
// - Page resident read-write: nothing left to grant, the access is invalid

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PagerStats {
    /// Faults serviced. Rejected faults are not counted.
    pub faults: u64,
    pub first_touches: u64,
    pub upgrades: u64,
    pub evictions: u64,
    pub write_backs: u64,
    pub zero_fills: u64,
    pub block_reads: u64,
}

pub struct Pager<M, S, const PAGE_SIZE: usize = DEFAULT_PAGE_SIZE> {
    config: PagerConfig,
    frames: FrameTable,
    clock: Clock,
    blocks: FreeSpaceManager,
    procs: ProcessTable,
    mmu: M,
    store: S,
    stats: PagerStats,
}

impl<M: Mmu, S: BackingStore, const PAGE_SIZE: usize> Pager<M, S, PAGE_SIZE> {
    pub fn init(config: PagerConfig, mmu: M, store: S) -> Self {
        assert!(PAGE_SIZE > 0, "Page size must be positive");
        assert!(config.frames > 0, "Pager needs at least one frame");
        assert!(config.blocks > 0, "Pager needs at least one block");
        assert_eq!(config.base_addr % PAGE_SIZE, 0, "Base address must be page aligned");
        assert!(
            mmu.frame_count() >= config.frames,
            "MMU has {} frames, {} configured",
            mmu.frame_count(),
            config.frames
        );
        assert!(
            store.block_count() >= config.blocks,
            "Swap device has {} blocks, {} configured",
            store.block_count(),
            config.blocks
        );
        info!(
            "Pager initialized with {} frames and {} blocks of {} bytes",
            config.frames, config.blocks, PAGE_SIZE
        );
        Pager {
            config,
            frames: FrameTable::init(config.frames),
            clock: Clock::new(),
            blocks: FreeSpaceManager::init(config.blocks),
            procs: ProcessTable::new(),
            mmu,
            store,
            stats: PagerStats::default(),
        }
    }

    pub fn register_process(&mut self, pid: Pid) -> Result<(), PagerError> {
        self.procs.register(pid).map_err(|err| {
            warn!("Rejected registration: {}", err);
            err
        })?;
        info!("Registered process {}", pid);
        Ok(())
    }

    /// Grows the address space of `pid` by one page and returns its address.
    pub fn extend(&mut self, pid: Pid) -> Result<usize, PagerError> {
        let process = self
            .procs
            .get_mut(pid)
            .ok_or(PagerError::UnknownProcess(pid))?;
        let block = self.blocks.allocate().map_err(|_| {
            warn!("Process {} cannot grow: swap device is full", pid);
            PagerError::StorageExhausted
        })?;
        let vaddr = process.push(self.config.base_addr, PAGE_SIZE, block);
        debug!("Process {} extended with page {:#x} on block[{}]", pid, vaddr, block);
        Ok(vaddr)
    }

    /// Services a fault of `pid` at `addr`. Only serviced faults are counted.
    pub fn handle_fault(&mut self, pid: Pid, addr: usize) -> Result<(), PagerError> {
        let invalid = PagerError::InvalidAddress { pid, addr };
        let process = self.procs.get(pid).ok_or(PagerError::UnknownProcess(pid))?;
        let index = match process.page_index(addr, self.config.base_addr, PAGE_SIZE) {
            Some(index) => index,
            None => {
                warn!("Process {} faulted outside its pages at {:#x}", pid, addr);
                return Err(invalid);
            }
        };
        let resident = process.pages()[index].frame;

        match resident {
            None => self.load_page(Owner { pid, page: index })?,
            Some(frame) => match self.frames.get(frame).map(|f| f.prot) {
                // Write on a read-only page: permission upgrade, no I/O.
                Some(Protection::Read) => self.upgrade_page(Owner { pid, page: index }, frame),
                _ => {
                    warn!("Process {} faulted on writable page {:#x}", pid, addr);
                    return Err(invalid);
                }
            },
        }
        self.stats.faults += 1;
        Ok(())
    }

    fn load_page(&mut self, owner: Owner) -> Result<(), PagerError> {
        let frame = self.acquire_frame()?;
        let page = self
            .procs
            .page_mut(owner)
            .ok_or(PagerError::UnknownProcess(owner.pid))?;
        match (page.block, page.on_disk) {
            (Some(block), true) => {
                let mut buf = vec![0; PAGE_SIZE];
                self.store.read_block(block, &mut buf)?;
                self.mmu.write_frame(frame, 0, &buf)?;
                self.stats.block_reads += 1;
            }
            _ => {
                self.mmu.zero_fill(frame)?;
                self.stats.zero_fills += 1;
            }
        }
        self.frames.claim(frame, owner);
        page.frame = Some(frame);
        let vaddr = page.vaddr;
        self.mmu.map_resident(owner.pid, vaddr, frame, Protection::Read);
        self.stats.first_touches += 1;
        debug!("Page {:#x} of process {} loaded into frame[{}]", vaddr, owner.pid, frame);
        Ok(())
    }

    fn upgrade_page(&mut self, owner: Owner, frame: usize) {
        self.frames.upgrade(frame);
        if let Some(page) = self.procs.page(owner) {
            self.mmu
                .change_protection(owner.pid, page.vaddr, Protection::ReadWrite);
            debug!("Page {:#x} of process {} is now writable", page.vaddr, owner.pid);
        }
        self.stats.upgrades += 1;
    }

    /// Returns an unowned frame, evicting the clock's victim when none is free.
    pub(crate) fn acquire_frame(&mut self) -> Result<usize, PagerError> {
        if let Some(frame) = self.frames.first_free() {
            return Ok(frame);
        }
        let victim = self.clock.select_victim(&mut self.frames);
        self.evict(victim)?;
        Ok(victim)
    }

    fn evict(&mut self, victim: usize) -> Result<(), PagerError> {
        let Some(frame) = self.frames.get(victim).copied() else {
            return Ok(());
        };
        let Some(owner) = frame.owner else {
            return Ok(());
        };
        let Some(page) = self.procs.page_mut(owner) else {
            warn!("frame[{}] owned by missing page {:?}, reclaiming", victim, owner);
            self.frames.release(victim);
            return Ok(());
        };

        if frame.dirty {
            let block = match page.block {
                Some(block) => block,
                None => {
                    let block = self
                        .blocks
                        .allocate()
                        .map_err(|_| PagerError::StorageExhausted)?;
                    page.block = Some(block);
                    block
                }
            };
            let mut buf = vec![0; PAGE_SIZE];
            self.mmu.read_frame(victim, 0, &mut buf)?;
            self.store.write_block(block, &buf)?;
            page.on_disk = true;
            self.stats.write_backs += 1;
            debug!("frame[{}] written back to block[{}]", victim, block);
        }

        page.frame = None;
        let vaddr = page.vaddr;
        self.mmu.unmap(owner.pid, vaddr);
        self.frames.release(victim);
        self.stats.evictions += 1;
        debug!("Evicted page {:#x} of process {} from frame[{}]", vaddr, owner.pid, victim);
        Ok(())
    }

    /// Releases every frame and block of `pid`. Unknown pids are ignored.
    ///
    /// Resident pages are unmapped before their frames return to the pool.
    /// Dirty contents are dropped.
    pub fn destroy_process(&mut self, pid: Pid) {
        let Some(process) = self.procs.remove(pid) else {
            debug!("Destroy of unknown process {} ignored", pid);
            return;
        };
        for page in process.pages() {
            if let Some(frame) = page.frame {
                self.mmu.unmap(pid, page.vaddr);
                self.frames.release(frame);
            }
            if let Some(block) = page.block {
                if let Err(err) = self.blocks.deallocate(block) {
                    warn!("Process {} page {:#x}: {}", pid, page.vaddr, err);
                }
            }
        }
        info!("Destroyed process {} ({} pages)", pid, process.len());
    }

    pub fn config(&self) -> &PagerConfig {
        &self.config
    }

    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    pub fn free_frames(&self) -> usize {
        self.frames.free_frames()
    }

    pub fn free_blocks(&self) -> usize {
        self.blocks.free_blocks()
    }

    pub fn frame(&self, frame: usize) -> Option<&Frame> {
        self.frames.get(frame)
    }

    pub fn clock_hand(&self) -> usize {
        self.clock.hand()
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.procs.get(pid)
    }

    pub fn page_count(&self, pid: Pid) -> Option<usize> {
        self.procs.get(pid).map(Process::len)
    }

    pub fn page_state(&self, pid: Pid, addr: usize) -> Result<PageState, PagerError> {
        let process = self.procs.get(pid).ok_or(PagerError::UnknownProcess(pid))?;
        let index = process
            .page_index(addr, self.config.base_addr, PAGE_SIZE)
            .ok_or(PagerError::InvalidAddress { pid, addr })?;
        let state = match process.pages()[index].frame {
            None => PageState::OnDiskOnly,
            Some(frame) => match self.frames.get(frame).map(|f| f.prot) {
                Some(Protection::ReadWrite) => PageState::ResidentReadWrite,
                _ => PageState::ResidentReadOnly,
            },
        };
        Ok(state)
    }

    pub fn mmu(&self) -> &M {
        &self.mmu
    }

    pub fn mmu_mut(&mut self) -> &mut M {
        &mut self.mmu
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Verifies the frame <-> page back references and block ownership.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (index, frame) in self.frames.iter() {
            match frame.owner {
                Some(owner) => {
                    let page = self
                        .procs
                        .page(owner)
                        .ok_or_else(|| format!("frame[{}] owned by missing page {:?}", index, owner))?;
                    if page.frame != Some(index) {
                        return Err(format!(
                            "frame[{}] owned by {:?} but the page points to {:?}",
                            index, owner, page.frame
                        ));
                    }
                    if !frame.prot.is_readable() {
                        return Err(format!("frame[{}] is owned but unmapped", index));
                    }
                }
                None => {
                    if frame.dirty || frame.second_chance || frame.prot != Protection::None {
                        return Err(format!("free frame[{}] carries state {:?}", index, frame));
                    }
                }
            }
        }

        let mut blocks = BTreeSet::new();
        for process in self.procs.iter() {
            for (index, page) in process.pages().iter().enumerate() {
                if let Some(frame) = page.frame {
                    let owner = self.frames.get(frame).and_then(|f| f.owner);
                    if owner != Some(Owner { pid: process.pid(), page: index }) {
                        return Err(format!(
                            "page {:#x} of process {} points to frame[{}] owned by {:?}",
                            page.vaddr,
                            process.pid(),
                            frame,
                            owner
                        ));
                    }
                }
                if let Some(block) = page.block {
                    if !blocks.insert(block) {
                        return Err(format!("block[{}] backs more than one page", block));
                    }
                    if !self.blocks.is_allocated(block) {
                        return Err(format!("block[{}] is in use but marked free", block));
                    }
                }
            }
        }
        let allocated = self.blocks.capacity() - self.blocks.free_blocks();
        if allocated != blocks.len() {
            return Err(format!(
                "{} blocks allocated but {} referenced",
                allocated,
                blocks.len()
            ));
        }
        Ok(())
    }
}
