use frame_table::{Pid, Protection};
use memory::MemoryError;

/// The mapping hardware (or its stand-in) the pager drives.
///
/// Mapping calls are made only after the pager's own tables are updated.
pub trait Mmu {
    fn frame_count(&self) -> usize;

    fn zero_fill(&mut self, frame: usize) -> Result<(), MemoryError>;

    /// Maps the page at `vaddr` of `pid` onto `frame`, replacing any previous mapping.
    fn map_resident(&mut self, pid: Pid, vaddr: usize, frame: usize, prot: Protection);

    fn change_protection(&mut self, pid: Pid, vaddr: usize, prot: Protection);

    fn unmap(&mut self, pid: Pid, vaddr: usize);

    fn read_frame(&self, frame: usize, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError>;

    fn write_frame(&mut self, frame: usize, offset: usize, data: &[u8]) -> Result<(), MemoryError>;
}
