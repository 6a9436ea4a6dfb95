//! Typed action bindings.

use std::hash::Hash;

use hashbrown::HashMap;
use winit::keyboard::KeyCode;

use crate::keyboard::KeyboardState;
use crate::modifiers::Modifiers;

/// A key plus the modifiers that must be held with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyChord {
    #[must_use]
    pub const fn new(key: KeyCode, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    fn modifiers_held(&self, keyboard: &KeyboardState) -> bool {
        keyboard.modifiers().satisfies(self.modifiers)
    }
}

impl From<KeyCode> for KeyChord {
    fn from(key: KeyCode) -> Self {
        Self::new(key, Modifiers::empty())
    }
}

/// Maps a game's action type to one or more key chords.
///
/// `A` is usually a small fieldless enum owned by the game.
#[derive(Debug, Clone)]
pub struct Bindings<A> {
    actions: HashMap<A, Vec<KeyChord>>,
}

impl<A> Default for Bindings<A> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }
}

impl<A: Copy + Eq + Hash> Bindings<A> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`bind`](Self::bind).
    #[must_use]
    pub fn with(mut self, action: A, chord: impl Into<KeyChord>) -> Self {
        self.bind(action, chord);
        self
    }

    /// Add a chord to an action. Binding the same chord twice is a no-op.
    pub fn bind(&mut self, action: A, chord: impl Into<KeyChord>) {
        let chord = chord.into();
        let chords = self.actions.entry(action).or_default();
        if !chords.contains(&chord) {
            chords.push(chord);
        }
    }

    pub fn unbind(&mut self, action: A, chord: impl Into<KeyChord>) {
        let chord = chord.into();
        if let Some(chords) = self.actions.get_mut(&action) {
            chords.retain(|c| *c != chord);
        }
    }

    #[must_use]
    pub fn chords(&self, action: A) -> &[KeyChord] {
        self.actions.get(&action).map_or(&[], Vec::as_slice)
    }

    fn any(&self, action: A, keyboard: &KeyboardState, test: impl Fn(KeyCode) -> bool) -> bool {
        self.chords(action)
            .iter()
            .any(|chord| chord.modifiers_held(keyboard) && test(chord.key))
    }

    /// Any chord of the action is held down.
    #[must_use]
    pub fn held(&self, action: A, keyboard: &KeyboardState) -> bool {
        self.any(action, keyboard, |key| keyboard.is_pressed(key))
    }

    /// Any chord of the action got a press or auto-repeat this frame, even if
    /// the key was released again before the frame ended.
    #[must_use]
    pub fn triggered(&self, action: A, keyboard: &KeyboardState) -> bool {
        self.any(action, keyboard, |key| keyboard.was_triggered(key))
    }

    /// Any key of the action was released this frame.
    #[must_use]
    pub fn released(&self, action: A, keyboard: &KeyboardState) -> bool {
        self.chords(action)
            .iter()
            .any(|chord| keyboard.is_just_released(chord.key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Control {
        Left,
        FpsUp,
        Save,
    }

    fn bindings() -> Bindings<Control> {
        Bindings::new()
            .with(Control::Left, KeyCode::KeyA)
            .with(Control::Left, KeyCode::ArrowLeft)
            .with(Control::FpsUp, KeyCode::NumpadAdd)
            .with(
                Control::Save,
                KeyChord::new(KeyCode::KeyS, Modifiers::CTRL),
            )
    }

    #[test]
    fn held_through_any_chord() {
        let bindings = bindings();
        let mut keyboard = KeyboardState::new();
        assert!(!bindings.held(Control::Left, &keyboard));

        keyboard.process_key(KeyCode::ArrowLeft, ElementState::Pressed);
        assert!(bindings.held(Control::Left, &keyboard));
        assert_eq!(bindings.chords(Control::Left).len(), 2);
    }

    #[test]
    fn triggered_on_repeat() {
        let bindings = bindings();
        let mut keyboard = KeyboardState::new();
        keyboard.process_key(KeyCode::NumpadAdd, ElementState::Pressed);
        assert!(bindings.triggered(Control::FpsUp, &keyboard));

        keyboard.end_frame();
        assert!(!bindings.triggered(Control::FpsUp, &keyboard));

        keyboard.process_key(KeyCode::NumpadAdd, ElementState::Pressed);
        assert!(bindings.triggered(Control::FpsUp, &keyboard));
    }

    #[test]
    fn modifiers_required() {
        let bindings = bindings();
        let mut keyboard = KeyboardState::new();
        keyboard.process_key(KeyCode::KeyS, ElementState::Pressed);
        assert!(!bindings.held(Control::Save, &keyboard));

        keyboard.set_modifiers(Modifiers::CTRL);
        assert!(bindings.held(Control::Save, &keyboard));
    }

    #[test]
    fn rebinding() {
        let mut bindings = bindings();
        bindings.bind(Control::Left, KeyCode::KeyA);
        assert_eq!(bindings.chords(Control::Left).len(), 2);

        bindings.unbind(Control::Left, KeyCode::KeyA);
        assert_eq!(
            bindings.chords(Control::Left),
            &[KeyChord::from(KeyCode::ArrowLeft)]
        );
    }
}
