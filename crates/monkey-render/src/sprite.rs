//! The sprite component.

use std::sync::atomic::{AtomicU64, Ordering};

use glam::Mat4;
use monkey_core::Rect;

use crate::error::{RenderError, Result};
use crate::texture::TextureId;

static NEXT_SPRITE_ID: AtomicU64 = AtomicU64::new(0);

/// Unique, increasing sprite identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(u64);

impl SpriteId {
    fn next() -> Self {
        Self(NEXT_SPRITE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// A textured quad with one or more animation frames.
///
/// The quad is sized by `rect` half extents. Its placement comes from the
/// model matrix, which the renderer copies from the entity's transform.
#[derive(Debug, Clone)]
pub struct Sprite {
    id: SpriteId,
    rect: Rect,
    frames: Vec<TextureId>,
    frame: usize,
    model: Mat4,
    version: u64,
}

impl Sprite {
    pub fn new(rect: Rect, frames: Vec<TextureId>) -> Result<Self> {
        let rect = rect.validated()?;
        if frames.is_empty() {
            return Err(RenderError::NoFrames);
        }
        Ok(Self {
            id: SpriteId::next(),
            rect,
            frames,
            frame: 0,
            model: Mat4::from_translation(rect.pos.extend(0.0)),
            version: 0,
        })
    }

    pub fn single(rect: Rect, texture: TextureId) -> Result<Self> {
        Self::new(rect, vec![texture])
    }

    pub fn id(&self) -> SpriteId {
        self.id
    }

    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    pub fn frames(&self) -> &[TextureId] {
        &self.frames
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Texture of the current frame.
    pub fn texture(&self) -> TextureId {
        self.frames[self.frame]
    }

    /// Jump to a frame, clamped to the last one.
    pub fn set_frame(&mut self, frame: usize) {
        self.frame = frame.min(self.frames.len() - 1);
    }

    /// Step one frame through the inclusive range `first..=last`.
    ///
    /// Runs forward when `first <= last` and backward otherwise, wrapping
    /// back to `first` after `last`. A current frame outside the range
    /// jumps to `first`.
    pub fn advance_frame(&mut self, first: usize, last: usize) {
        let max = self.frames.len() - 1;
        let (first, last) = (first.min(max), last.min(max));
        let (lo, hi) = (first.min(last), first.max(last));

        self.frame = if !(lo..=hi).contains(&self.frame) || self.frame == last {
            first
        } else if first <= last {
            self.frame + 1
        } else {
            self.frame - 1
        };
    }

    pub fn model(&self) -> Mat4 {
        self.model
    }

    /// Bumped each time the model matrix actually changes.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Returns `true` if the matrix differed and the sprite is now dirty.
    pub fn set_model(&mut self, model: Mat4) -> bool {
        if model == self.model {
            return false;
        }
        self.model = model;
        self.version += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(n: u32) -> Vec<TextureId> {
        (0..n).map(TextureId::from_index).collect()
    }

    fn sprite(n: u32) -> Sprite {
        Sprite::new(Rect::new(0.0, 0.0, 30.0, 40.0), frames(n)).unwrap()
    }

    #[test]
    fn ids_increase() {
        let a = sprite(1);
        let b = sprite(1);
        assert!(b.id() > a.id());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            Sprite::new(Rect::new(0.0, 0.0, 1.0, 1.0), Vec::new()),
            Err(RenderError::NoFrames)
        ));
        assert!(matches!(
            Sprite::new(Rect::new(0.0, 0.0, 0.0, 1.0), frames(1)),
            Err(RenderError::Core(_))
        ));
    }

    #[test]
    fn forward_animation_wraps() {
        let mut s = sprite(16);
        s.advance_frame(0, 7);
        assert_eq!(s.frame(), 1);
        s.set_frame(7);
        s.advance_frame(0, 7);
        assert_eq!(s.frame(), 0);
    }

    #[test]
    fn backward_animation_and_outside_range() {
        let mut s = sprite(16);
        // Frame 0 is outside 8..=15, so it jumps to the start
        s.advance_frame(15, 8);
        assert_eq!(s.frame(), 15);
        s.advance_frame(15, 8);
        assert_eq!(s.frame(), 14);
        s.set_frame(8);
        s.advance_frame(15, 8);
        assert_eq!(s.frame(), 15);
    }

    #[test]
    fn range_clamped_to_frames() {
        let mut s = sprite(3);
        s.advance_frame(0, 10);
        s.advance_frame(0, 10);
        s.advance_frame(0, 10);
        assert_eq!(s.frame(), 0);
        assert_eq!(s.texture(), s.frames()[0]);
    }

    #[test]
    fn model_dirty_only_on_change() {
        let mut s = sprite(1);
        let v = s.version();
        assert!(!s.set_model(s.model()));
        assert_eq!(s.version(), v);

        assert!(s.set_model(Mat4::from_rotation_z(0.5)));
        assert_eq!(s.version(), v + 1);
    }
}
