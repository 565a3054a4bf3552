pub mod bitmap;

use std::fmt;

use log::{debug, warn};

use self::bitmap::Bitmap;

pub type DiskAddress = usize;

/// This struct is responsible for managing the free blocks of the swap device.
/// It is implemented as a bitmap, where each bit represents a block on the disk.
#[derive(Debug, Clone)]
pub struct FreeSpaceManager {
    bitmap: Bitmap,
    free: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeSpaceManagerError {
    DiskFull,
    OutOfRange(DiskAddress),
    NotAllocated(DiskAddress),
}

impl fmt::Display for FreeSpaceManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreeSpaceManagerError::DiskFull => write!(f, "no free block left"),
            FreeSpaceManagerError::OutOfRange(block) => write!(f, "block {} out of range", block),
            FreeSpaceManagerError::NotAllocated(block) => write!(f, "block {} is not allocated", block),
        }
    }
}

impl std::error::Error for FreeSpaceManagerError {}

impl FreeSpaceManager {
    pub fn init(blocks: usize) -> FreeSpaceManager {
        assert!(blocks > 0, "Swap device must hold at least one block");
        FreeSpaceManager {
            bitmap: Bitmap::new(blocks),
            free: blocks,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bitmap.len()
    }

    pub fn free_blocks(&self) -> usize {
        self.free
    }

    pub fn is_allocated(&self, block: DiskAddress) -> bool {
        self.bitmap.is_set(block)
    }

    /// Hands out the lowest-numbered free block.
    pub fn allocate(&mut self) -> Result<DiskAddress, FreeSpaceManagerError> {
        match self.bitmap.allocate() {
            Some(block) => {
                self.free -= 1;
                debug!("Allocated block[{}], {} left", block, self.free);
                Ok(block)
            }
            None => {
                warn!("No free block left");
                Err(FreeSpaceManagerError::DiskFull)
            }
        }
    }

    pub fn deallocate(&mut self, block: DiskAddress) -> Result<(), FreeSpaceManagerError> {
        if block >= self.capacity() {
            return Err(FreeSpaceManagerError::OutOfRange(block));
        }
        if !self.bitmap.is_set(block) {
            return Err(FreeSpaceManagerError::NotAllocated(block));
        }
        self.bitmap.deallocate(block);
        self.free += 1;
        debug!("Released block[{}], {} left", block, self.free);
        Ok(())
    }
}
