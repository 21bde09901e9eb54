use crate::engine::EmbedError;
use crate::render::backend::HostContext;
use crate::scene::input::{KeyEvent, PointerEvent, WheelEvent};
use crate::scene::TextureNode;
use std::sync::Arc;

/// Asks the host to schedule a scene-graph update. May be called from any
/// thread.
pub trait RedrawSink: Send + Sync {
    fn request_redraw(&self);
}

/// The window a scene item is attached to.
pub trait HostWindow {
    /// The host's GPU context, current on the calling thread. `None` while the
    /// window has no context yet.
    fn current_context(&mut self) -> Option<&mut dyn HostContext>;

    fn redraw_sink(&self) -> Arc<dyn RedrawSink>;

    fn device_pixel_ratio(&self) -> f64 {
        1.0
    }
}

/// What a host GUI needs from an embeddable surface. Every call happens on the
/// GUI thread.
pub trait RenderableSurface {
    /// Called at the scene graph's pre-render point. The first call creates
    /// the render context and starts rendering; later calls swap in the latest
    /// frame.
    fn update_paint_node(&mut self, window: &mut dyn HostWindow) -> Result<Arc<TextureNode>, EmbedError>;

    /// Host layout changed the item's size, in logical pixels.
    fn geometry_changed(&mut self, width: f64, height: f64);

    fn mouse_press(&mut self, event: &PointerEvent);

    fn mouse_release(&mut self, event: &PointerEvent);

    fn mouse_move(&mut self, event: &PointerEvent);

    /// Pointer moved over the item without a pressed button.
    fn hover_move(&mut self, event: &PointerEvent);

    fn wheel(&mut self, event: &WheelEvent);

    fn key_press(&mut self, event: &KeyEvent);

    fn key_release(&mut self, event: &KeyEvent);
}
