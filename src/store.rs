use disk::{Disk, DiskError};

/// Swap device holding the contents of pages that are not resident.
pub trait BackingStore {
    fn block_count(&self) -> usize;

    fn read_block(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskError>;

    fn write_block(&mut self, block: usize, data: &[u8]) -> Result<(), DiskError>;
}

impl<const BLOCKSIZE: usize> BackingStore for Disk<BLOCKSIZE> {
    fn block_count(&self) -> usize {
        self.blocks()
    }

    fn read_block(&self, block: usize, buf: &mut [u8]) -> Result<(), DiskError> {
        Disk::read_block(self, block, buf)
    }

    fn write_block(&mut self, block: usize, data: &[u8]) -> Result<(), DiskError> {
        Disk::write_block(self, block, data)
    }
}
