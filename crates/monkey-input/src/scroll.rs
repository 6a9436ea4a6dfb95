use glam::Vec2;
use winit::event::MouseScrollDelta;

/// Pixels of touchpad scrolling counted as one wheel line.
const PIXELS_PER_LINE: f64 = 100.0;

/// Wheel movement accumulated over one frame, in lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScrollState {
    delta: Vec2,
}

impl ScrollState {
    pub fn process(&mut self, delta: MouseScrollDelta) {
        self.delta += match delta {
            MouseScrollDelta::LineDelta(x, y) => Vec2::new(x, y),
            MouseScrollDelta::PixelDelta(pos) => Vec2::new(
                (pos.x / PIXELS_PER_LINE) as f32,
                (pos.y / PIXELS_PER_LINE) as f32,
            ),
        };
    }

    /// Horizontal and vertical lines scrolled this frame.
    #[must_use]
    pub const fn delta(&self) -> Vec2 {
        self.delta
    }

    pub fn end_frame(&mut self) {
        self.delta = Vec2::ZERO;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn lines_and_pixels_accumulate() {
        let mut scroll = ScrollState::default();
        scroll.process(MouseScrollDelta::LineDelta(0.0, 1.0));
        scroll.process(MouseScrollDelta::PixelDelta(PhysicalPosition::new(50.0, 250.0)));
        assert_eq!(scroll.delta(), Vec2::new(0.5, 3.5));

        scroll.end_frame();
        assert_eq!(scroll.delta(), Vec2::ZERO);
    }
}
