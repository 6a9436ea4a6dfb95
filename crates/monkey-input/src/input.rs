use glam::Vec2;
use winit::event::WindowEvent;
use winit::keyboard::KeyCode;

use crate::bindings::Bindings;
use crate::keyboard::KeyboardState;
use crate::modifiers::Modifiers;
use crate::scroll::ScrollState;

/// Keyboard and scroll state fed from window events.
///
/// Feed every window event to [`process_window_event`](Self::process_window_event),
/// query during update, then call [`end_frame`](Self::end_frame).
#[derive(Debug, Default)]
pub struct InputManager {
    keyboard: KeyboardState,
    scroll: ScrollState,
}

impl InputManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn keyboard(&self) -> &KeyboardState {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    /// Returns `true` if the event was an input event.
    pub fn process_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                self.keyboard.process_key_event(event);
                true
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                self.keyboard.set_modifiers(Modifiers::from(modifiers.state()));
                true
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.scroll.process(*delta);
                true
            }
            WindowEvent::Focused(false) => {
                tracing::debug!("Focus lost, releasing all keys");
                self.keyboard.clear();
                false
            }
            _ => false,
        }
    }

    pub fn end_frame(&mut self) {
        self.keyboard.end_frame();
        self.scroll.end_frame();
    }

    #[must_use]
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keyboard.is_pressed(key)
    }

    #[must_use]
    pub fn is_key_just_released(&self, key: KeyCode) -> bool {
        self.keyboard.is_just_released(key)
    }

    /// Scroll wheel lines this frame.
    #[must_use]
    pub const fn scroll_delta(&self) -> Vec2 {
        self.scroll.delta()
    }

    #[must_use]
    pub fn held<A: Copy + Eq + std::hash::Hash>(&self, bindings: &Bindings<A>, action: A) -> bool {
        bindings.held(action, &self.keyboard)
    }

    #[must_use]
    pub fn triggered<A: Copy + Eq + std::hash::Hash>(
        &self,
        bindings: &Bindings<A>,
        action: A,
    ) -> bool {
        bindings.triggered(action, &self.keyboard)
    }

    #[must_use]
    pub fn released<A: Copy + Eq + std::hash::Hash>(
        &self,
        bindings: &Bindings<A>,
        action: A,
    ) -> bool {
        bindings.released(action, &self.keyboard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::{DeviceId, ElementState, MouseScrollDelta, TouchPhase};

    #[test]
    fn scroll_event_is_consumed() {
        let mut input = InputManager::new();
        let event = WindowEvent::MouseWheel {
            device_id: unsafe { DeviceId::dummy() },
            delta: MouseScrollDelta::LineDelta(0.0, -2.0),
            phase: TouchPhase::Moved,
        };
        assert!(input.process_window_event(&event));
        assert_eq!(input.scroll_delta(), Vec2::new(0.0, -2.0));

        input.end_frame();
        assert_eq!(input.scroll_delta(), Vec2::ZERO);
    }

    #[test]
    fn focus_loss_releases_keys() {
        let mut input = InputManager::new();
        input
            .keyboard_mut()
            .process_key(KeyCode::KeyP, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyP));

        assert!(!input.process_window_event(&WindowEvent::Focused(false)));
        assert!(!input.is_key_pressed(KeyCode::KeyP));
    }

    #[test]
    fn bindings_through_manager() {
        let bindings = Bindings::new().with(1u8, KeyCode::Escape);
        let mut input = InputManager::new();
        input
            .keyboard_mut()
            .process_key(KeyCode::Escape, ElementState::Pressed);
        input.end_frame();
        assert!(input.held(&bindings, 1));
        input
            .keyboard_mut()
            .process_key(KeyCode::Escape, ElementState::Released);
        assert!(input.released(&bindings, 1));
        assert!(input.is_key_just_released(KeyCode::Escape));
    }
}
