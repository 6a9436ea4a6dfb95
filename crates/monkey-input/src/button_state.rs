//! Per-frame state of a single key.

use winit::event::ElementState;

/// Where a key is in its press/release cycle.
///
/// ```text
/// Released ─press─> JustPressed ─end_frame─> Pressed
///     ^                                         │
///     └──end_frame── JustReleased <──release────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    JustPressed,
    Pressed,
    JustReleased,
    #[default]
    Released,
}

impl ButtonState {
    #[inline]
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    #[inline]
    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    #[inline]
    #[must_use]
    pub const fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }

    /// Apply a press or release. Pressing a held key or releasing a released
    /// one leaves the state alone.
    #[inline]
    pub fn apply(&mut self, element: ElementState) {
        match (element, self.is_pressed()) {
            (ElementState::Pressed, false) => *self = Self::JustPressed,
            (ElementState::Released, true) => *self = Self::JustReleased,
            _ => {}
        }
    }

    /// Settle the transient states once the frame has been processed.
    #[inline]
    pub fn end_frame(&mut self) {
        *self = match *self {
            Self::JustPressed => Self::Pressed,
            Self::JustReleased => Self::Released,
            settled => settled,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_cycle() {
        let mut state = ButtonState::default();
        assert!(!state.is_pressed());

        state.apply(ElementState::Pressed);
        assert!(state.is_just_pressed());

        state.end_frame();
        assert_eq!(state, ButtonState::Pressed);

        state.apply(ElementState::Released);
        assert!(state.is_just_released());
        assert!(!state.is_pressed());

        state.end_frame();
        assert_eq!(state, ButtonState::Released);
    }

    #[test]
    fn redundant_events_ignored() {
        let mut state = ButtonState::Pressed;
        state.apply(ElementState::Pressed);
        assert_eq!(state, ButtonState::Pressed);

        let mut state = ButtonState::Released;
        state.apply(ElementState::Released);
        assert_eq!(state, ButtonState::Released);
    }

    #[test]
    fn press_and_release_in_one_frame() {
        let mut state = ButtonState::Released;
        state.apply(ElementState::Pressed);
        state.apply(ElementState::Released);
        assert!(state.is_just_released());
        state.end_frame();
        assert_eq!(state, ButtonState::Released);
    }
}
