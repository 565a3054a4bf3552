use std::fmt;

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    OverCapacity,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OverCapacity => write!(f, "access beyond physical memory"),
        }
    }
}

impl std::error::Error for MemoryError {}

/// Physical memory carved into `FRAME_SIZE`-byte frames.
#[derive(Clone)]
pub struct PhysicalMemory<const FRAME_SIZE: usize> {
    frames: usize,
    buffer: Box<[u8]>,
}

impl<const FRAME_SIZE: usize> PhysicalMemory<FRAME_SIZE> {
    pub fn new(frames: usize) -> Self {
        assert!(FRAME_SIZE > 0, "Frame size must be positive");
        assert!(frames > 0, "Memory must hold at least one frame");
        Self {
            frames,
            buffer: vec![0; frames * FRAME_SIZE].into_boxed_slice(),
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Physical address of the first byte of `frame`.
    #[inline]
    pub fn frame_to_address(frame: usize) -> usize {
        frame * FRAME_SIZE
    }

    fn check_range(&self, frame: usize, offset: usize, len: usize) -> Result<usize, MemoryError> {
        let end = offset.checked_add(len).ok_or(MemoryError::OverCapacity)?;
        if frame >= self.frames || end > FRAME_SIZE {
            return Err(MemoryError::OverCapacity);
        }
        Ok(Self::frame_to_address(frame) + offset)
    }

    pub fn zero_frame(&mut self, frame: usize) -> Result<(), MemoryError> {
        let start = self.check_range(frame, 0, FRAME_SIZE)?;
        trace!("Zeroing frame[{}]", frame);
        self.buffer[start..start + FRAME_SIZE].fill(0);
        Ok(())
    }

    pub fn frame(&self, frame: usize) -> Result<&[u8], MemoryError> {
        let start = self.check_range(frame, 0, FRAME_SIZE)?;
        Ok(&self.buffer[start..start + FRAME_SIZE])
    }

    /// Copies `buf.len()` bytes starting at `offset` inside `frame`.
    pub fn read(&self, frame: usize, offset: usize, buf: &mut [u8]) -> Result<(), MemoryError> {
        let start = self.check_range(frame, offset, buf.len())?;
        buf.copy_from_slice(&self.buffer[start..start + buf.len()]);
        Ok(())
    }

    pub fn write(&mut self, frame: usize, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let start = self.check_range(frame, offset, data.len())?;
        self.buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }
}
