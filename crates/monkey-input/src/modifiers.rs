use bitflags::bitflags;
use winit::keyboard::ModifiersState;

bitflags! {
    /// Held modifier keys.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 1;
        const CTRL  = 1 << 1;
        const ALT   = 1 << 2;
        const SUPER = 1 << 3;
    }
}

impl Modifiers {
    /// `true` when every modifier in `required` is held.
    #[inline]
    #[must_use]
    pub const fn satisfies(self, required: Self) -> bool {
        self.contains(required)
    }
}

impl From<ModifiersState> for Modifiers {
    fn from(state: ModifiersState) -> Self {
        [
            (state.shift_key(), Self::SHIFT),
            (state.control_key(), Self::CTRL),
            (state.alt_key(), Self::ALT),
            (state.super_key(), Self::SUPER),
        ]
        .into_iter()
        .filter(|(held, _)| *held)
        .fold(Self::empty(), |acc, (_, flag)| acc | flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_winit_state() {
        let mods = Modifiers::from(ModifiersState::SHIFT | ModifiersState::ALT);
        assert_eq!(mods, Modifiers::SHIFT | Modifiers::ALT);
        assert_eq!(Modifiers::from(ModifiersState::empty()), Modifiers::empty());
    }

    #[test]
    fn satisfies_subset() {
        let held = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(held.satisfies(Modifiers::CTRL));
        assert!(held.satisfies(Modifiers::empty()));
        assert!(!held.satisfies(Modifiers::CTRL | Modifiers::ALT));
    }
}
