/// Process identifier as handed to us by the lifecycle notifier.
pub type Pid = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protection {
    #[default]
    None,
    Read,
    ReadWrite,
}

impl Protection {
    pub fn is_readable(&self) -> bool {
        !matches!(self, Protection::None)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Protection::ReadWrite)
    }
}

/// The page a frame currently backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub pid: Pid,
    pub page: usize,
}

/// One slot of physical memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Frame {
    pub owner: Option<Owner>,
    pub prot: Protection,
    pub dirty: bool,
    pub second_chance: bool,
}

impl Frame {
    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub(crate) fn clear(&mut self) {
        *self = Frame::default();
    }
}
