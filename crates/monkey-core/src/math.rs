//! Math utilities and helpers.

use std::ops::Mul;

use glam::Vec2;

/// Number of screen pixels that make up one physics meter.
pub const PIXELS_PER_METER: f32 = 32.0;

/// Convert a pixel distance to meters.
#[inline]
pub fn px_to_m(px: f32) -> f32 {
    px / PIXELS_PER_METER
}

/// Convert a meter distance to pixels.
#[inline]
pub fn m_to_px(m: f32) -> f32 {
    m * PIXELS_PER_METER
}

/// Convert a pixel-space point to physics space.
#[inline]
pub fn to_meters(px: Vec2) -> Vec2 {
    px / PIXELS_PER_METER
}

/// Convert a physics-space point to pixel space.
#[inline]
pub fn to_pixels(m: Vec2) -> Vec2 {
    m * PIXELS_PER_METER
}

/// Round `size` up to the next multiple of `alignment`.
///
/// `alignment` must be zero or a power of two (Vulkan guarantees this for
/// `minUniformBufferOffsetAlignment`). Zero leaves the size untouched.
#[inline]
pub const fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        size
    } else {
        (size + alignment - 1) & !(alignment - 1)
    }
}

/// Axis-aligned rectangle in pixel space.
///
/// `pos` is the center and `size` holds the half extents, so a rect of
/// size `(30, 40)` covers 60x80 pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    /// Center of the rectangle
    pub pos: Vec2,
    /// Half width and half height
    pub size: Vec2,
}

impl Rect {
    /// Create a rect from its center and half extents.
    #[inline]
    pub const fn new(x: f32, y: f32, half_w: f32, half_h: f32) -> Self {
        Self {
            pos: Vec2::new(x, y),
            size: Vec2::new(half_w, half_h),
        }
    }

    /// A rect is drawable only if both half extents are positive.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.size.x > 0.0 && self.size.y > 0.0
    }

    /// Validate the rect, returning it unchanged when drawable.
    pub fn validated(self) -> crate::Result<Self> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(crate::Error::InvalidRect {
                x: self.pos.x,
                y: self.pos.y,
                w: self.size.x,
                h: self.size.y,
            })
        }
    }

    /// Bottom-left corner
    #[inline]
    pub fn min(&self) -> Vec2 {
        self.pos - self.size
    }

    /// Top-right corner
    #[inline]
    pub fn max(&self) -> Vec2 {
        self.pos + self.size
    }

    /// Check if a point lies inside the rect (edges inclusive).
    #[inline]
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Convert the center to physics space.
    #[inline]
    pub fn pos_meters(&self) -> Vec2 {
        to_meters(self.pos)
    }
}

impl Mul<f32> for Rect {
    type Output = Self;

    fn mul(self, scale: f32) -> Self {
        Self {
            pos: self.pos * scale,
            size: self.size * scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rect_validity() {
        assert!(Rect::new(0.0, 0.0, 30.0, 40.0).is_valid());
        assert!(!Rect::new(10.0, 10.0, 0.0, 40.0).is_valid());
        assert!(!Rect::new(10.0, 10.0, 5.0, -1.0).is_valid());
        assert!(!Rect::default().is_valid());
        assert!(Rect::default().validated().is_err());
    }

    #[test]
    fn rect_scale_and_bounds() {
        let rect = Rect::new(0.0, 850.0, 850.0, 5.0) * 2.0;
        assert_eq!(rect.pos, Vec2::new(0.0, 1700.0));
        assert_eq!(rect.size, Vec2::new(1700.0, 10.0));
        assert_eq!(rect.min(), Vec2::new(-1700.0, 1690.0));
        assert_eq!(rect.max(), Vec2::new(1700.0, 1710.0));
        assert!(rect.contains(Vec2::new(1700.0, 1700.0)));
        assert!(!rect.contains(Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn pixel_meter_conversion() {
        assert_relative_eq!(px_to_m(32.0), 1.0);
        assert_relative_eq!(m_to_px(2.5), 80.0);
        let p = Vec2::new(-800.0, 320.0);
        assert_eq!(to_pixels(to_meters(p)), p);
        assert_relative_eq!(Rect::new(64.0, -16.0, 1.0, 1.0).pos_meters().x, 2.0);
    }

    #[test]
    fn alignment() {
        assert_eq!(align_up(64, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(64, 0), 64);
        assert_eq!(align_up(0, 64), 0);
    }
}
