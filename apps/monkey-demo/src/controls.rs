//! Key bindings and the small pure rules behind them.

use glam::Vec2;
use monkey_app::GameClock;
use monkey_input::{Bindings, KeyCode};

/// FPS cap change per numpad press.
pub const MAX_FPS_STEP: u32 = 30;
/// Player impulse per second of held key.
pub const MOVE_IMPULSE: f32 = 100.0;
/// Light radius change per second of held key.
pub const RADIUS_SPEED: f32 = 150.0;
/// Seconds between player animation frames.
pub const ANIMATION_INTERVAL: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    AmbientOn,
    AmbientOff,
    Spin,
    LightGrow,
    LightShrink,
    Pause,
    Exit,
    FpsUp,
    FpsDown,
}

pub fn default_bindings() -> Bindings<Action> {
    Bindings::new()
        .with(Action::MoveLeft, KeyCode::KeyA)
        .with(Action::MoveRight, KeyCode::KeyD)
        .with(Action::MoveUp, KeyCode::KeyW)
        .with(Action::MoveDown, KeyCode::KeyS)
        .with(Action::AmbientOn, KeyCode::PageUp)
        .with(Action::AmbientOff, KeyCode::PageDown)
        .with(Action::Spin, KeyCode::Space)
        .with(Action::LightGrow, KeyCode::ArrowRight)
        .with(Action::LightShrink, KeyCode::ArrowLeft)
        .with(Action::Pause, KeyCode::KeyP)
        .with(Action::Exit, KeyCode::Escape)
        .with(Action::FpsUp, KeyCode::NumpadAdd)
        .with(Action::FpsDown, KeyCode::NumpadSubtract)
}

/// FPS cap after one step up or down; lowering never goes below 0 (unlimited).
pub fn step_max_fps(current: u32, up: bool) -> u32 {
    if up {
        current.saturating_add(MAX_FPS_STEP)
    } else {
        current.saturating_sub(MAX_FPS_STEP)
    }
}

/// The game is paused exactly while the pause key is held.
pub fn hold_to_pause(clock: &mut GameClock, held: bool) {
    if held {
        clock.pause();
    } else {
        clock.resume();
    }
}

/// Light radius after growing by `delta`, floored at zero.
pub fn adjust_radius(radius: f32, delta: f32) -> f32 {
    (radius + delta).max(0.0)
}

/// Zoom change for a wheel delta in lines; scrolling up zooms in.
pub fn scroll_zoom(scroll: Vec2) -> f32 {
    -scroll.y / 20.0
}

/// Position in meters of the wandering light at time `t`.
pub fn light_anchor(t: f32) -> Vec2 {
    Vec2::new(t.cos() * 5.0, -(t.sin() * 5.0).abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use monkey_input::{ElementState, KeyboardState};

    #[test]
    fn fps_cap_steps_by_thirty() {
        assert_eq!(step_max_fps(0, true), 30);
        assert_eq!(step_max_fps(60, false), 30);
        assert_eq!(step_max_fps(20, false), 0);
        assert_eq!(step_max_fps(0, false), 0);
    }

    #[test]
    fn pause_applies_to_the_frame_it_is_pressed() {
        let bindings = default_bindings();
        let mut keyboard = KeyboardState::default();
        let mut clock = GameClock::default();

        keyboard.process_key(KeyCode::KeyP, ElementState::Pressed);
        hold_to_pause(&mut clock, bindings.held(Action::Pause, &keyboard));
        assert_relative_eq!(clock.scale(0.016), 0.0);

        keyboard.end_frame();
        keyboard.process_key(KeyCode::KeyP, ElementState::Released);
        hold_to_pause(&mut clock, bindings.held(Action::Pause, &keyboard));
        assert_relative_eq!(clock.scale(0.016), 0.016);
    }

    #[test]
    fn pause_key_does_not_undo_exit() {
        let mut clock = GameClock::default();
        clock.request_exit();
        hold_to_pause(&mut clock, false);
        assert!(!clock.is_paused());
        assert_relative_eq!(clock.scale(0.016), 0.0);
    }

    #[test]
    fn radius_floors_at_zero() {
        assert_relative_eq!(adjust_radius(100.0, 2.5), 102.5);
        assert_relative_eq!(adjust_radius(1.0, -2.5), 0.0);
    }

    #[test]
    fn wheel_up_zooms_in() {
        assert_relative_eq!(scroll_zoom(Vec2::new(0.0, 2.0)), -0.1);
    }

    #[test]
    fn light_anchor_stays_below_origin() {
        for i in 0..100 {
            let p = light_anchor(i as f32 * 0.1);
            assert!(p.y <= 0.0);
            assert!(p.length() <= 5.0 + 1e-4);
        }
        assert_relative_eq!(light_anchor(0.0), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn fps_keys_fire_on_repeat() {
        let bindings = default_bindings();
        let mut keyboard = KeyboardState::default();
        keyboard.process_key(KeyCode::NumpadAdd, ElementState::Pressed);
        assert!(bindings.triggered(Action::FpsUp, &keyboard));

        keyboard.end_frame();
        assert!(!bindings.triggered(Action::FpsUp, &keyboard));
        assert!(bindings.held(Action::FpsUp, &keyboard));

        keyboard.process_key(KeyCode::NumpadAdd, ElementState::Pressed);
        assert!(bindings.triggered(Action::FpsUp, &keyboard));
    }

    #[test]
    fn quick_fps_tap_is_not_lost() {
        let bindings = default_bindings();
        let mut keyboard = KeyboardState::default();
        keyboard.process_key(KeyCode::NumpadSubtract, ElementState::Pressed);
        keyboard.process_key(KeyCode::NumpadSubtract, ElementState::Released);
        assert!(bindings.triggered(Action::FpsDown, &keyboard));
        assert!(!bindings.held(Action::FpsDown, &keyboard));
    }

    #[test]
    fn escape_exits_on_release() {
        let bindings = default_bindings();
        let mut keyboard = KeyboardState::default();
        keyboard.process_key(KeyCode::Escape, ElementState::Pressed);
        assert!(!bindings.released(Action::Exit, &keyboard));
        keyboard.end_frame();
        keyboard.process_key(KeyCode::Escape, ElementState::Released);
        assert!(bindings.released(Action::Exit, &keyboard));
    }
}
