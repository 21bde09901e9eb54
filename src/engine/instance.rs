//! Contract of the embedded rendering engine.
//!
//! The engine itself is an external collaborator. A render worker only ever
//! talks to it through [`EngineInstance`], and creates new instances through an
//! [`InstanceFactory`] supplied by the host.

use crate::engine::events::PortableEvent;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Opaque path or identifier of the content an engine instance loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SourceDescriptor(String);

impl SourceDescriptor {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceDescriptor {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SourceDescriptor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Handle to the engine's application-facing API.
pub type SdkHandle = Arc<dyn Any + Send + Sync>;

/// Callback installed into an engine instance: `(event_type, target_id, target_path)`.
pub type InstanceListener = Box<dyn Fn(&str, &str, &str) + Send + Sync>;

/// Host-facing listener: `(sdk, event_type, target_id, target_path)`.
pub type EventListener = Arc<dyn Fn(SdkHandle, &str, &str, &str) + Send + Sync>;

/// One engine instance, bound to one source and one viewport.
///
/// All calls happen on the render worker thread or under the worker's shared
/// lock, never concurrently.
pub trait EngineInstance: Send {
    /// Size the instance. `width`/`height` are logical pixels.
    fn init(&mut self, width: u32, height: u32, dpi: f64);

    /// Load content. Returns `false` when the source cannot be loaded; the
    /// instance stays usable but renders nothing.
    fn load(&mut self, source: &SourceDescriptor) -> bool;

    /// Draw into the currently bound render target.
    fn paint(&mut self, force_full_redraw: bool);

    /// Pump the engine's internal event queue.
    fn dispatch(&mut self);

    fn on_event(&mut self, event: &PortableEvent);

    fn set_event_listener(&mut self, listener: Option<InstanceListener>);

    fn sdk(&self) -> SdkHandle;

    /// ARGB colour painted behind the content.
    fn set_background_color(&mut self, argb: u32);

    /// Id of the framebuffer the instance draws into.
    fn set_render_target_id(&mut self, id: u32);
}

/// Creates engine instances for a render worker.
pub trait InstanceFactory: Send + Sync {
    fn create(&self) -> Box<dyn EngineInstance>;
}

impl<F> InstanceFactory for F
where
    F: Fn() -> Box<dyn EngineInstance> + Send + Sync,
{
    fn create(&self) -> Box<dyn EngineInstance> {
        self()
    }
}

/// Install `listener` into `instance`, wrapping it so every callback also
/// receives the instance's SDK handle. `None` clears any listener.
pub(crate) fn bind_listener(instance: &mut dyn EngineInstance, listener: Option<&EventListener>) {
    match listener {
        Some(listener) => {
            let listener = listener.clone();
            let sdk = instance.sdk();
            instance.set_event_listener(Some(Box::new(move |event_type, target_id, target_path| {
                listener(sdk.clone(), event_type, target_id, target_path)
            })));
        }
        None => instance.set_event_listener(None),
    }
}
