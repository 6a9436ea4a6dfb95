//! Sprite slot bookkeeping for the shared vertex buffer and the per-frame
//! model buffers.

use std::collections::VecDeque;

use hashbrown::HashMap;
use monkey_gpu::deferred::is_retired;

use crate::sprite::SpriteId;

/// Assigns each live sprite a stable slot.
///
/// A slot owns 4 vertices at `slot * 4` and one model matrix at
/// `slot * stride`. Released slots are reused only once no frame in
/// flight can still read them.
#[derive(Debug)]
pub struct SlotAllocator {
    slots: HashMap<SpriteId, u32>,
    released: VecDeque<(u32, u64)>,
    next: u32,
    frames_in_flight: usize,
}

impl SlotAllocator {
    pub fn new(frames_in_flight: usize) -> Self {
        Self {
            slots: HashMap::new(),
            released: VecDeque::new(),
            next: 0,
            frames_in_flight,
        }
    }

    pub fn get(&self, sprite: SpriteId) -> Option<u32> {
        self.slots.get(&sprite).copied()
    }

    /// Slot of `sprite`, and whether it was newly assigned this call.
    pub fn acquire(&mut self, sprite: SpriteId, frame_number: u64) -> (u32, bool) {
        if let Some(&slot) = self.slots.get(&sprite) {
            return (slot, false);
        }
        let reusable = self
            .released
            .front()
            .is_some_and(|&(_, freed)| is_retired(freed, frame_number, self.frames_in_flight));
        let recycled = if reusable {
            self.released.pop_front().map(|(slot, _)| slot)
        } else {
            None
        };
        let slot = recycled.unwrap_or_else(|| {
            self.next += 1;
            self.next - 1
        });
        self.slots.insert(sprite, slot);
        (slot, true)
    }

    /// Release the slots of every sprite not in `alive`.
    pub fn retain(&mut self, alive: impl Fn(SpriteId) -> bool, frame_number: u64) -> usize {
        let before = self.slots.len();
        let released = &mut self.released;
        self.slots.retain(|&id, &mut slot| {
            let keep = alive(id);
            if !keep {
                released.push_back((slot, frame_number));
            }
            keep
        });
        before - self.slots.len()
    }

    /// One past the highest slot ever handed out.
    pub fn high_water(&self) -> u32 {
        self.next
    }

    pub fn live(&self) -> usize {
        self.slots.len()
    }
}

/// What one frame's model buffer currently holds, per slot.
///
/// Lets the renderer write only the matrices that changed since the frame
/// slot was last used.
#[derive(Debug, Default)]
pub struct ModelStaging {
    written: Vec<Option<(SpriteId, u64)>>,
}

impl ModelStaging {
    /// Returns `true` (and records the write) when `slot` does not already
    /// hold this version of the sprite's model.
    pub fn needs_write(&mut self, slot: u32, sprite: SpriteId, version: u64) -> bool {
        let index = slot as usize;
        if index >= self.written.len() {
            self.written.resize(index + 1, None);
        }
        let entry = Some((sprite, version));
        if self.written[index] == entry {
            return false;
        }
        self.written[index] = entry;
        true
    }

    /// Forget everything, e.g. after the backing buffer was replaced.
    pub fn invalidate(&mut self) {
        self.written.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sprite::Sprite;
    use crate::texture::TextureId;
    use monkey_core::Rect;

    fn ids(n: usize) -> Vec<SpriteId> {
        (0..n)
            .map(|_| {
                Sprite::single(Rect::new(0.0, 0.0, 1.0, 1.0), TextureId::from_index(0))
                    .unwrap()
                    .id()
            })
            .collect()
    }

    #[test]
    fn slots_are_stable_and_dense() {
        let ids = ids(3);
        let mut slots = SlotAllocator::new(2);
        assert_eq!(slots.acquire(ids[0], 1), (0, true));
        assert_eq!(slots.acquire(ids[1], 1), (1, true));
        assert_eq!(slots.acquire(ids[0], 2), (0, false));
        assert_eq!(slots.acquire(ids[2], 2), (2, true));
        assert_eq!(slots.high_water(), 3);
        assert_eq!(slots.live(), 3);
    }

    #[test]
    fn released_slot_waits_for_retirement() {
        let ids = ids(4);
        let mut slots = SlotAllocator::new(2);
        slots.acquire(ids[0], 1);
        slots.acquire(ids[1], 1);

        let gone = ids[0];
        assert_eq!(slots.retain(|id| id != gone, 5), 1);
        assert_eq!(slots.get(gone), None);

        // Frames 5..=7 may still read slot 0
        assert_eq!(slots.acquire(ids[2], 6), (2, true));
        assert_eq!(slots.acquire(ids[3], 8), (0, true));
    }

    #[test]
    fn model_writes_only_on_change() {
        let ids = ids(2);
        let mut staging = ModelStaging::default();
        assert!(staging.needs_write(3, ids[0], 0));
        assert!(!staging.needs_write(3, ids[0], 0));
        assert!(staging.needs_write(3, ids[0], 1));
        // A reused slot with a different sprite is always rewritten
        assert!(staging.needs_write(3, ids[1], 1));

        staging.invalidate();
        assert!(staging.needs_write(3, ids[1], 1));
    }
}
