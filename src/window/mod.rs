//! Window layer.
//!
//! The backend owns the actual OS window and GL context; this wrapper gives
//! the rest of the engine a small surface: size, mouse grab, a should-close
//! flag, frame begin/commit, and a per-frame event list produced by diffing
//! the backend's polled input state. Events are handed to whoever runs the
//! loop; nothing here holds callbacks or back-pointers.

use macroquad::color::Color;
use macroquad::input::{
    get_keys_pressed, get_keys_released, is_mouse_button_pressed, is_mouse_button_released,
    mouse_position, mouse_wheel, set_cursor_grab, show_mouse, KeyCode, MouseButton,
};
use macroquad::window::{clear_background, next_frame, screen_height, screen_width};

/// One input or window event, delivered in poll order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowEvent {
    Key { key: KeyCode, pressed: bool },
    MouseMotion { x: f32, y: f32, dx: f32, dy: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    Scroll { dx: f32, dy: f32 },
    Resize { width: f32, height: f32 },
}

pub struct Window {
    should_close: bool,
    last_mouse: (f32, f32),
    last_size: (f32, f32),
}

impl Window {
    /// Wrap the already-created backend window.
    pub fn new() -> Self {
        Self {
            should_close: false,
            last_mouse: mouse_position(),
            last_size: (screen_width(), screen_height()),
        }
    }

    /// False once a close has been requested; checked once per loop
    /// iteration.
    pub fn is_open(&self) -> bool {
        !self.should_close
    }

    pub fn request_close(&mut self) {
        self.should_close = true;
    }

    /// Current surface size in points.
    pub fn size(&self) -> (f32, f32) {
        (screen_width(), screen_height())
    }

    /// Capture (or release) the cursor for mouse-look.
    pub fn grab_mouse(&mut self, grabbed: bool) {
        set_cursor_grab(grabbed);
        show_mouse(!grabbed);
    }

    /// Diff the backend input state into an ordered event list. Call once
    /// per frame, before the simulation update.
    pub fn poll_events(&mut self) -> Vec<WindowEvent> {
        let mut events = Vec::new();

        for key in get_keys_pressed() {
            events.push(WindowEvent::Key { key, pressed: true });
        }
        for key in get_keys_released() {
            events.push(WindowEvent::Key {
                key,
                pressed: false,
            });
        }

        let (x, y) = mouse_position();
        let (dx, dy) = (x - self.last_mouse.0, y - self.last_mouse.1);
        if dx != 0.0 || dy != 0.0 {
            events.push(WindowEvent::MouseMotion { x, y, dx, dy });
            self.last_mouse = (x, y);
        }

        for button in [MouseButton::Left, MouseButton::Right, MouseButton::Middle] {
            if is_mouse_button_pressed(button) {
                events.push(WindowEvent::MouseButton {
                    button,
                    pressed: true,
                });
            }
            if is_mouse_button_released(button) {
                events.push(WindowEvent::MouseButton {
                    button,
                    pressed: false,
                });
            }
        }

        let (scroll_x, scroll_y) = mouse_wheel();
        if scroll_x != 0.0 || scroll_y != 0.0 {
            events.push(WindowEvent::Scroll {
                dx: scroll_x,
                dy: scroll_y,
            });
        }

        let size = (screen_width(), screen_height());
        if size != self.last_size {
            events.push(WindowEvent::Resize {
                width: size.0,
                height: size.1,
            });
            self.last_size = size;
        }

        events
    }

    /// Clear the frame buffer at the top of a frame.
    pub fn begin_frame(&self, clear: Color) {
        clear_background(clear);
    }

    /// Present the frame and yield to the backend's event pump.
    pub async fn commit(&self) {
        next_frame().await;
    }
}
