//! Input handling for the monkey sprite engine.
//!
//! [`InputManager`] consumes winit window events and keeps per-frame key and
//! scroll state. Games describe their controls as a [`Bindings`] map from
//! their own action enum to key chords:
//!
//! ```ignore
//! #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
//! enum Control { Left, Right, Pause }
//!
//! let bindings = Bindings::new()
//!     .with(Control::Left, KeyCode::KeyA)
//!     .with(Control::Right, KeyCode::KeyD)
//!     .with(Control::Pause, KeyCode::KeyP);
//!
//! // In update
//! if input.held(&bindings, Control::Left) {
//!     // ...
//! }
//!
//! // After update
//! input.end_frame();
//! ```

mod bindings;
mod button_state;
mod input;
mod keyboard;
mod modifiers;
mod scroll;

pub use bindings::{Bindings, KeyChord};
pub use button_state::ButtonState;
pub use input::InputManager;
pub use keyboard::KeyboardState;
pub use modifiers::Modifiers;
pub use scroll::ScrollState;

pub use winit::event::{ElementState, WindowEvent};
pub use winit::keyboard::KeyCode;
