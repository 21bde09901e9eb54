//! Event types exchanged with the embedded engine and the host.
//!
//! # Main Types
//!
//! - [`MouseButton`]: Mouse buttons the engine understands (left, middle, right).
//! - [`Modifiers`]: Host keyboard modifiers (Shift, Control, Alt, Meta).
//! - [`KeyMod`]: The engine's modifier bitmask, derived from [`Modifiers`].
//! - [`PortableEvent`]: Input handed to an engine instance.
//! - [`EmbedEvent`]: Informational events broadcast to the host.

use crate::engine::keymap::KeyCode;
use crate::render::Viewport;
use crate::worker::WorkerId;
use bitflags::bitflags;

/// Represents a mouse button that can be pressed or released
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    /// Left mouse button pressed (or depressed)
    Left,
    /// Middle mouse button pressed (or depressed)
    Middle,
    /// Right mouse button pressed (or depressed)
    Right,
}

impl MouseButton {
    /// 1-based button index used by the engine.
    pub fn index(self) -> u8 {
        match self {
            MouseButton::Left => 1,
            MouseButton::Middle => 2,
            MouseButton::Right => 3,
        }
    }
}

bitflags! {
    /// Keyboard modifiers as reported by the host.
    pub struct Modifiers: u8 {
        const SHIFT   = 0b0001;
        const CONTROL = 0b0010;
        const ALT     = 0b0100;
        const META    = 0b1000;
    }
}

bitflags! {
    /// Modifier bitmask in the engine's portable event model. Each modifier
    /// sets both its left and right bit.
    pub struct KeyMod: u16 {
        const SHIFT = 0x0003;
        const CTRL  = 0x00c0;
        const ALT   = 0x0300;
        const GUI   = 0x0c00;
    }
}

impl From<Modifiers> for KeyMod {
    fn from(m: Modifiers) -> Self {
        let mut out = KeyMod::empty();
        out.set(KeyMod::SHIFT, m.contains(Modifiers::SHIFT));
        out.set(KeyMod::CTRL, m.contains(Modifiers::CONTROL));
        out.set(KeyMod::ALT, m.contains(Modifiers::ALT));
        out.set(KeyMod::GUI, m.contains(Modifiers::META));
        out
    }
}

/// Input in the engine's portable event model.
///
/// Positions are in logical pixels relative to the item's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum PortableEvent {
    /// The item was resized. `scaled_*` is the size in device pixels.
    WindowResize {
        width: u32,
        height: u32,
        scaled_width: u32,
        scaled_height: u32,
    },
    MouseButtonDown { button: u8, x: f32, y: f32 },
    MouseButtonUp { button: u8, x: f32, y: f32 },
    /// Pointer moved. `dx`/`dy` are relative to the previous motion event.
    MouseMotion { x: f32, y: f32, dx: f32, dy: f32 },
    Wheel { x: f32, y: f32, delta_x: f32, delta_y: f32 },
    KeyDown { modifiers: KeyMod, key: KeyCode },
    KeyUp { modifiers: KeyMod, key: KeyCode },
}

impl PortableEvent {
    /// Short name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PortableEvent::WindowResize { .. } => "window-resize",
            PortableEvent::MouseButtonDown { .. } => "mouse-button-down",
            PortableEvent::MouseButtonUp { .. } => "mouse-button-up",
            PortableEvent::MouseMotion { .. } => "mouse-motion",
            PortableEvent::Wheel { .. } => "wheel",
            PortableEvent::KeyDown { .. } => "key-down",
            PortableEvent::KeyUp { .. } => "key-up",
        }
    }
}

/// Events broadcast by the engine to the host. Informational only.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedEvent {
    /// A render worker thread has started.
    WorkerStarted { worker_id: WorkerId },
    /// A new engine instance was constructed.
    InstanceCreated {
        worker_id: WorkerId,
        source: String,
        viewport: Viewport,
    },
    /// The engine instance finished loading its source.
    LoadFinished {
        worker_id: WorkerId,
        source: String,
        success: bool,
    },
    /// A frame snapshot has been handed to the texture node.
    FrameProduced {
        worker_id: WorkerId,
        frame_id: u64,
        width: u32,
        height: u32,
    },
    /// The worker released its GPU resources and stopped.
    WorkerTerminated { worker_id: WorkerId },
}

impl EmbedEvent {
    pub fn worker_id(&self) -> WorkerId {
        match self {
            EmbedEvent::WorkerStarted { worker_id }
            | EmbedEvent::InstanceCreated { worker_id, .. }
            | EmbedEvent::LoadFinished { worker_id, .. }
            | EmbedEvent::FrameProduced { worker_id, .. }
            | EmbedEvent::WorkerTerminated { worker_id } => *worker_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_indices_are_one_based() {
        assert_eq!(MouseButton::Left.index(), 1);
        assert_eq!(MouseButton::Middle.index(), 2);
        assert_eq!(MouseButton::Right.index(), 3);
    }

    #[test]
    fn host_modifiers_map_to_key_mod() {
        assert_eq!(KeyMod::from(Modifiers::empty()), KeyMod::empty());
        assert_eq!(KeyMod::from(Modifiers::SHIFT).bits(), 0x0003);
        assert_eq!(KeyMod::from(Modifiers::CONTROL | Modifiers::ALT).bits(), 0x03c0);
        assert_eq!(KeyMod::from(Modifiers::all()).bits(), 0x0fc3);
    }

    #[test]
    fn events_carry_their_worker() {
        let id = WorkerId::new();
        let ev = EmbedEvent::FrameProduced {
            worker_id: id,
            frame_id: 1,
            width: 2,
            height: 2,
        };
        assert_eq!(ev.worker_id(), id);
        assert_eq!(
            PortableEvent::Wheel { x: 0.0, y: 0.0, delta_x: 0.0, delta_y: 1.0 }.kind(),
            "wheel"
        );
    }
}
