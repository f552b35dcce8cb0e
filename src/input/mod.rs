//! Input snapshot.
//!
//! A flat, copyable view of the controls the simulation reads each tick,
//! maintained from window events. The mouse delta accumulates across the
//! frame's events and is cleared by the environment at the end of its
//! update; `attack` is an edge, cleared the same way.

use macroquad::input::{KeyCode, MouseButton};
use macroquad::math::Vec2;

use crate::window::WindowEvent;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputState {
    /// Mouse movement accumulated since the last update.
    pub mouse_delta: Vec2,

    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    pub ascend: bool,
    pub descend: bool,

    /// Primary-button press edge.
    pub attack: bool,
}

impl InputState {
    /// Fold one window event into the snapshot.
    pub fn apply(&mut self, event: &WindowEvent) {
        match *event {
            WindowEvent::Key { key, pressed } => match key {
                KeyCode::W | KeyCode::Up => self.forward = pressed,
                KeyCode::S | KeyCode::Down => self.back = pressed,
                KeyCode::A | KeyCode::Left => self.left = pressed,
                KeyCode::D | KeyCode::Right => self.right = pressed,
                KeyCode::Space => self.ascend = pressed,
                KeyCode::LeftShift => self.descend = pressed,
                _ => {}
            },
            WindowEvent::MouseMotion { dx, dy, .. } => {
                self.mouse_delta += Vec2::new(dx, dy);
            }
            WindowEvent::MouseButton {
                button: MouseButton::Left,
                pressed: true,
            } => self.attack = true,
            _ => {}
        }
    }

    /// Clear the per-frame accumulators. Called at the end of every
    /// environment update.
    pub fn end_frame(&mut self) {
        self.mouse_delta = Vec2::ZERO;
        self.attack = false;
    }
}
