use crate::render::backend::{FrameBuffer, GpuContext, HostContext, RenderBackend, SurfaceSize};
use crate::render::{FrameImage, PixelFormat};
use anyhow::{anyhow, Result};
use std::any::Any;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_SURFACE_ID: AtomicU32 = AtomicU32::new(1);

/// Cairo backend. Every framebuffer is an ARGB32 image surface that an engine
/// instance can draw into through [`CairoFrameBuffer::context`].
pub struct CairoBackend;

impl CairoBackend {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CairoBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBackend for CairoBackend {
    fn name(&self) -> &str {
        "CairoBackend"
    }

    /// Cairo image surfaces need no device context, so any host context is
    /// accepted and nothing is actually shared.
    fn create_shared_context(&self, _host: &mut dyn HostContext) -> Result<Box<dyn GpuContext>> {
        Ok(Box::new(CairoContext { current: false }))
    }
}

pub struct CairoContext {
    current: bool,
}

impl GpuContext for CairoContext {
    fn make_current(&mut self) -> Result<()> {
        self.current = true;
        Ok(())
    }

    fn done_current(&mut self) {
        self.current = false;
    }

    fn create_framebuffer(&mut self, size: SurfaceSize) -> Result<Box<dyn FrameBuffer>> {
        if !self.current {
            return Err(anyhow!("framebuffer requested without a current context"));
        }
        Ok(Box::new(CairoFrameBuffer::new(size)?))
    }

    fn flush(&mut self) {}
}

pub struct CairoFrameBuffer {
    id: u32,
    surface: cairo::ImageSurface,
    size: SurfaceSize,
}

// SAFETY: the surface is created on the worker thread's behalf and only ever
// touched by the single worker that owns this framebuffer.
unsafe impl Send for CairoFrameBuffer {}

impl CairoFrameBuffer {
    fn new(size: SurfaceSize) -> Result<Self> {
        let width = i32::try_from(size.width).map_err(|_| anyhow!("surface width {} out of range", size.width))?;
        let height = i32::try_from(size.height).map_err(|_| anyhow!("surface height {} out of range", size.height))?;
        let surface = cairo::ImageSurface::create(cairo::Format::ARgb32, width, height)?;
        Ok(Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            surface,
            size,
        })
    }

    /// Drawing context for the engine instance. Must not outlive the
    /// framebuffer.
    #[inline]
    pub fn context(&self) -> Result<cairo::Context> {
        Ok(cairo::Context::new(&self.surface)?)
    }
}

impl FrameBuffer for CairoFrameBuffer {
    fn id(&self) -> u32 {
        self.id
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn bind(&mut self) {}

    fn unbind(&mut self) {
        self.surface.flush();
    }

    fn to_image(&mut self, frame_id: u64) -> Result<FrameImage> {
        self.surface.flush();
        let stride = self.surface.stride() as u32;

        let mut pixels = Vec::new();
        self.surface
            .with_data(|data| pixels.extend_from_slice(data))
            .map_err(|e| anyhow!("cannot read cairo surface: {e}"))?;

        FrameImage::from_raw(
            pixels,
            self.size.width,
            self.size.height,
            stride,
            PixelFormat::PreMulArgb32,
            frame_id,
        )
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
