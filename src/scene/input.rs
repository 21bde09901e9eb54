//! Host input events and their translation into the engine's portable event
//! model.

use crate::engine::events::{KeyMod, Modifiers, MouseButton, PortableEvent};
use crate::engine::keymap::{translate_key, Key};
use crate::render::Viewport;

/// Position in logical pixels, relative to the item's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Button as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    /// No button, e.g. for hover moves.
    None,
    Left,
    Middle,
    Right,
    Back,
    Forward,
    Other(u16),
}

impl PointerButton {
    /// The engine only knows left, middle and right.
    pub fn to_mouse_button(self) -> Option<MouseButton> {
        match self {
            PointerButton::Left => Some(MouseButton::Left),
            PointerButton::Middle => Some(MouseButton::Middle),
            PointerButton::Right => Some(MouseButton::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub position: Point,
    pub button: PointerButton,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, button: PointerButton) -> Self {
        Self {
            position: Point::new(x, y),
            button,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    /// Scroll distance in pixels.
    pub pixel_delta: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Turns host events into [`PortableEvent`]s. Keeps the last delivered motion
/// position so motion events can carry a delta.
#[derive(Debug, Default)]
pub struct InputTranslator {
    last_motion: Point,
}

impl InputTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resize(viewport: Viewport) -> PortableEvent {
        let (scaled_width, scaled_height) = viewport.scaled_size();
        PortableEvent::WindowResize {
            width: viewport.width,
            height: viewport.height,
            scaled_width,
            scaled_height,
        }
    }

    /// `None` for buttons the engine does not know.
    pub fn button_down(&self, event: &PointerEvent) -> Option<PortableEvent> {
        let button = event.button.to_mouse_button()?;
        Some(PortableEvent::MouseButtonDown {
            button: button.index(),
            x: event.position.x,
            y: event.position.y,
        })
    }

    /// `None` for buttons the engine does not know.
    pub fn button_up(&self, event: &PointerEvent) -> Option<PortableEvent> {
        let button = event.button.to_mouse_button()?;
        Some(PortableEvent::MouseButtonUp {
            button: button.index(),
            x: event.position.x,
            y: event.position.y,
        })
    }

    /// Motion relative to the last committed position. Call
    /// [`InputTranslator::commit_motion`] once the event has been delivered.
    pub fn motion(&self, position: Point) -> PortableEvent {
        PortableEvent::MouseMotion {
            x: position.x,
            y: position.y,
            dx: position.x - self.last_motion.x,
            dy: position.y - self.last_motion.y,
        }
    }

    pub fn commit_motion(&mut self, position: Point) {
        self.last_motion = position;
    }

    pub fn wheel(&self, event: &WheelEvent) -> PortableEvent {
        PortableEvent::Wheel {
            x: event.position.x,
            y: event.position.y,
            delta_x: event.pixel_delta.x,
            delta_y: event.pixel_delta.y,
        }
    }

    pub fn key_down(&self, event: &KeyEvent) -> PortableEvent {
        PortableEvent::KeyDown {
            modifiers: KeyMod::from(event.modifiers),
            key: translate_key(&event.key),
        }
    }

    pub fn key_up(&self, event: &KeyEvent) -> PortableEvent {
        PortableEvent::KeyUp {
            modifiers: KeyMod::from(event.modifiers),
            key: translate_key(&event.key),
        }
    }
}
