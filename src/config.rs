/// Lowest virtual address handed out to a monitored process.
pub const UVM_BASE_ADDR: usize = 0x6000_0000;

pub const DEFAULT_PAGE_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagerConfig {
    /// Physical frames available for user pages.
    pub frames: usize,
    /// Blocks on the swap device.
    pub blocks: usize,
    pub base_addr: usize,
}

impl PagerConfig {
    pub fn new(frames: usize, blocks: usize) -> Self {
        Self {
            frames,
            blocks,
            base_addr: UVM_BASE_ADDR,
        }
    }

    pub fn with_base_addr(mut self, base_addr: usize) -> Self {
        self.base_addr = base_addr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PagerConfig::new(4, 16);
        assert_eq!(config.frames, 4);
        assert_eq!(config.blocks, 16);
        assert_eq!(config.base_addr, UVM_BASE_ADDR);
        assert_eq!(config.with_base_addr(0x1000).base_addr, 0x1000);
    }
}
