use log::debug;

use crate::FrameTable;

/// Second-chance replacement: a hand sweeping the frame table in a circle.
///
/// A frame whose bit is set is spared once and has the bit cleared; the first
/// frame found with the bit clear is the victim. Since a full turn clears every
/// bit, a selection never visits more than twice the number of frames.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    hand: usize,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hand(&self) -> usize {
        self.hand
    }

    /// Picks the next victim and leaves the hand just past it.
    pub fn select_victim(&mut self, table: &mut FrameTable) -> usize {
        let frames = table.frames_mut();
        let len = frames.len();
        let mut spared = 0;
        loop {
            let index = self.hand % len;
            self.hand = (index + 1) % len;
            let frame = &mut frames[index];
            if frame.second_chance {
                frame.second_chance = false;
                spared += 1;
            } else {
                debug!("Clock picked frame[{}] after sparing {}", index, spared);
                return index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Owner;

    fn full_table(frames: usize) -> FrameTable {
        let mut table = FrameTable::init(frames);
        for i in 0..frames {
            table.claim(i, Owner { pid: 1, page: i });
        }
        table
    }

    #[test]
    fn test_all_referenced_picks_hand_on_second_pass() {
        let mut table = full_table(2);
        let mut clock = Clock::new();
        assert_eq!(clock.select_victim(&mut table), 0);
        assert!(!table.get(0).unwrap().second_chance);
        assert!(!table.get(1).unwrap().second_chance);
        assert_eq!(clock.hand(), 1);
    }

    #[test]
    fn test_unreferenced_frame_is_taken_first() {
        let mut table = full_table(4);
        table.frames_mut()[2].second_chance = false;
        let mut clock = Clock::new();
        assert_eq!(clock.select_victim(&mut table), 2);
        assert!(!table.get(0).unwrap().second_chance);
        assert!(!table.get(1).unwrap().second_chance);
        assert!(table.get(3).unwrap().second_chance);
        assert_eq!(clock.hand(), 3);
    }

    #[test]
    fn test_hand_persists_and_wraps() {
        let mut table = full_table(3);
        let mut clock = Clock::new();
        assert_eq!(clock.select_victim(&mut table), 0);
        // Bits are now all clear, so the sweep continues from the hand.
        assert_eq!(clock.select_victim(&mut table), 1);
        assert_eq!(clock.select_victim(&mut table), 2);
        assert_eq!(clock.hand(), 0);
        table.upgrade(0);
        assert_eq!(clock.select_victim(&mut table), 1);
        assert!(!table.get(0).unwrap().second_chance);
    }

    #[test]
    fn test_single_frame() {
        let mut table = full_table(1);
        let mut clock = Clock::new();
        assert_eq!(clock.select_victim(&mut table), 0);
        assert_eq!(clock.hand(), 0);
    }
}
