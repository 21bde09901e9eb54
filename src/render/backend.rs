use crate::render::{FrameImage, Viewport};
use std::any::Any;

/// Size of a surface in pixels. It's a simple struct to hold width and height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl From<Viewport> for SurfaceSize {
    fn from(vp: Viewport) -> Self {
        Self {
            width: vp.width,
            height: vp.height,
        }
    }
}

/// The host's own GPU context, as seen during the lazy bootstrap of a worker.
///
/// Calls occur on the GUI/scene-graph thread only.
pub trait HostContext {
    /// Detach the context from the calling thread.
    fn done_current(&mut self);

    /// Re-attach the context to the calling thread.
    fn make_current(&mut self) -> anyhow::Result<()>;

    /// Type-erased access so a backend can reach its native handle.
    fn as_any(&self) -> &dyn Any;
}

/// A worker-owned GPU context plus its offscreen surface.
///
/// Created on the GUI thread, then moved to and used exclusively by one
/// render worker thread.
pub trait GpuContext: Send {
    fn make_current(&mut self) -> anyhow::Result<()>;

    fn done_current(&mut self);

    /// Allocate a new offscreen render target. The context must be current.
    fn create_framebuffer(&mut self, size: SurfaceSize) -> anyhow::Result<Box<dyn FrameBuffer>>;

    /// Push all queued commands to the device before a snapshot is taken.
    fn flush(&mut self);

    /// Destroy the offscreen surface. Called once, last, during shutdown.
    fn release(&mut self) {}
}

/// Offscreen render target. Recreated, never resized in place.
pub trait FrameBuffer: Send {
    /// Identity handed to the engine instance as its render target.
    fn id(&self) -> u32;

    fn size(&self) -> SurfaceSize;

    fn bind(&mut self);

    fn unbind(&mut self);

    /// Read the current contents back into an immutable snapshot.
    fn to_image(&mut self, frame_id: u64) -> anyhow::Result<FrameImage>;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Core backend interface. Produces worker contexts that share resources with
/// a host context.
pub trait RenderBackend: Send + Sync {
    /// Name of the backend, used in logs.
    fn name(&self) -> &str;

    /// Create a context for a render worker that shares with `host`.
    ///
    /// Some drivers require the host context to be detached while sharing is
    /// set up; callers do that before invoking this.
    fn create_shared_context(&self, host: &mut dyn HostContext) -> anyhow::Result<Box<dyn GpuContext>>;
}
