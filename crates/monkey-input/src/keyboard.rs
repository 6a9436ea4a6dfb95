//! Keyboard state tracking.

use hashbrown::{HashMap, HashSet};
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::button_state::ButtonState;
use crate::modifiers::Modifiers;

/// Key states plus every key that received a press event this frame,
/// OS repeats included.
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
    pressed_this_frame: HashSet<KeyCode>,
    modifiers: Modifiers,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a winit key event. Keys without a physical key code are ignored.
    pub fn process_key_event(&mut self, event: &KeyEvent) {
        let PhysicalKey::Code(key) = event.physical_key else {
            return;
        };
        self.process_key(key, event.state);
    }

    /// Record a press or release of `key`. OS repeats arrive as presses.
    pub fn process_key(&mut self, key: KeyCode, element: ElementState) {
        if element == ElementState::Pressed {
            self.pressed_this_frame.insert(key);
        }
        self.keys.entry(key).or_default().apply(element);
    }

    pub fn set_modifiers(&mut self, modifiers: Modifiers) {
        self.modifiers = modifiers;
    }

    #[must_use]
    pub const fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    #[must_use]
    pub fn state(&self, key: KeyCode) -> ButtonState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.state(key).is_pressed()
    }

    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.state(key).is_just_pressed()
    }

    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.state(key).is_just_released()
    }

    /// `true` if the key got any press event this frame, including a repeat
    /// or a press that was released again before the frame ended.
    #[must_use]
    pub fn was_triggered(&self, key: KeyCode) -> bool {
        self.pressed_this_frame.contains(&key)
    }

    pub fn end_frame(&mut self) {
        self.keys.values_mut().for_each(ButtonState::end_frame);
        self.pressed_this_frame.clear();
    }

    /// Forget everything, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
        self.pressed_this_frame.clear();
        self.modifiers = Modifiers::empty();
    }
}
