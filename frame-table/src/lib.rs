mod clock;
mod frame;

use log::trace;

pub use clock::Clock;
pub use frame::{Frame, Owner, Pid, Protection};

/// This table maps each physical frame to the page that currently owns it.
/// Each entry represents a map from frame ---> (process, page)
#[derive(Debug, Clone)]
pub struct FrameTable {
    frames: Vec<Frame>,
}

impl FrameTable {
    pub fn init(frames: usize) -> Self {
        assert!(frames > 0, "Frame table must hold at least one frame");
        Self {
            frames: vec![Frame::default(); frames],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn get(&self, frame: usize) -> Option<&Frame> {
        self.frames.get(frame)
    }

    pub fn free_frames(&self) -> usize {
        self.frames.iter().filter(|f| f.is_free()).count()
    }

    /// Lowest-numbered unowned frame, if any.
    pub fn first_free(&self) -> Option<usize> {
        self.frames.iter().position(Frame::is_free)
    }

    /// Hands `frame` to `owner` as a freshly loaded, read-only page.
    pub fn claim(&mut self, frame: usize, owner: Owner) {
        trace!("frame[{}] claimed by {:?}", frame, owner);
        self.frames[frame] = Frame {
            owner: Some(owner),
            prot: Protection::Read,
            dirty: false,
            second_chance: true,
        };
    }

    /// Write access granted: the contents can no longer be assumed clean.
    pub fn upgrade(&mut self, frame: usize) {
        trace!("frame[{}] upgraded to read-write", frame);
        let entry = &mut self.frames[frame];
        entry.prot = Protection::ReadWrite;
        entry.dirty = true;
        entry.second_chance = true;
    }

    pub fn release(&mut self, frame: usize) -> Option<Owner> {
        let entry = self.frames.get_mut(frame)?;
        let owner = entry.owner;
        entry.clear();
        trace!("frame[{}] released", frame);
        owner
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Frame)> {
        self.frames.iter().enumerate()
    }

    pub(crate) fn frames_mut(&mut self) -> &mut [Frame] {
        &mut self.frames
    }
}
