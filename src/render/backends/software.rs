use crate::render::backend::{FrameBuffer, GpuContext, HostContext, RenderBackend, SurfaceSize};
use crate::render::{FrameImage, PixelFormat};
use anyhow::{anyhow, Result};
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

static NEXT_FRAMEBUFFER_ID: AtomicU32 = AtomicU32::new(1);

/// Largest framebuffer edge, in pixels. Matches the texture limit of common
/// GPUs.
pub const MAX_FRAMEBUFFER_DIMENSION: u32 = 16384;

/// Resource counters shared by every context and framebuffer a
/// [`SoftwareBackend`] hands out.
#[derive(Default, Debug)]
pub struct SoftwareStats {
    pub contexts_created: AtomicUsize,
    pub contexts_released: AtomicUsize,
    pub framebuffers_created: AtomicUsize,
    pub framebuffers_dropped: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl SoftwareStats {
    /// Framebuffers currently alive.
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers_created.load(Ordering::SeqCst) - self.framebuffers_dropped.load(Ordering::SeqCst)
    }

    /// Contexts handed out and not yet released.
    pub fn live_contexts(&self) -> usize {
        self.contexts_created.load(Ordering::SeqCst) - self.contexts_released.load(Ordering::SeqCst)
    }
}

/// CPU backend. Framebuffers are plain RGBA byte buffers, which makes it
/// suitable for headless hosts and tests.
pub struct SoftwareBackend {
    stats: Arc<SoftwareStats>,
}

impl SoftwareBackend {
    pub fn new() -> Result<Self> {
        Ok(Self {
            stats: Arc::new(SoftwareStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<SoftwareStats> {
        self.stats.clone()
    }
}

impl RenderBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "SoftwareBackend"
    }

    fn create_shared_context(&self, host: &mut dyn HostContext) -> Result<Box<dyn GpuContext>> {
        let host = host
            .as_any()
            .downcast_ref::<SoftwareHostContext>()
            .ok_or_else(|| anyhow!("SoftwareBackend used with non-software host context"))?;

        if host.is_current() {
            return Err(anyhow!("host context must be released before sharing"));
        }
        if host.refuse_sharing {
            return Err(anyhow!("host context refused resource sharing"));
        }

        self.stats.contexts_created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SoftwareContext {
            stats: self.stats.clone(),
            current: false,
            released: false,
        }))
    }
}

/// Host-side context for the software backend. Only tracks whether it is
/// current on the calling thread.
#[derive(Debug, Default)]
pub struct SoftwareHostContext {
    current: AtomicBool,
    /// Makes [`RenderBackend::create_shared_context`] fail, for hosts that
    /// cannot share resources.
    pub refuse_sharing: bool,
}

impl SoftwareHostContext {
    pub fn new() -> Self {
        Self {
            current: AtomicBool::new(true),
            refuse_sharing: false,
        }
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst)
    }
}

impl HostContext for SoftwareHostContext {
    fn done_current(&mut self) {
        self.current.store(false, Ordering::SeqCst);
    }

    fn make_current(&mut self) -> Result<()> {
        self.current.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub struct SoftwareContext {
    stats: Arc<SoftwareStats>,
    current: bool,
    released: bool,
}

impl GpuContext for SoftwareContext {
    fn make_current(&mut self) -> Result<()> {
        if self.released {
            return Err(anyhow!("context already released"));
        }
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
        Ok(Box::new(SoftwareFrameBuffer::new(size, self.stats.clone())?))
    }

    fn flush(&mut self) {
        self.stats.flushes.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.current = false;
            self.stats.contexts_released.fetch_add(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SoftwareContext {
    fn drop(&mut self) {
        self.release();
    }
}

pub struct SoftwareFrameBuffer {
    id: u32,
    size: SurfaceSize,
    pixels: Vec<u8>,
    bound: bool,
    stats: Arc<SoftwareStats>,
}

impl SoftwareFrameBuffer {
    fn new(size: SurfaceSize, stats: Arc<SoftwareStats>) -> Result<Self> {
        if size.width == 0 || size.height == 0 {
            return Err(anyhow!("framebuffer size must be non-zero: {}x{}", size.width, size.height));
        }
        if size.width > MAX_FRAMEBUFFER_DIMENSION || size.height > MAX_FRAMEBUFFER_DIMENSION {
            return Err(anyhow!(
                "framebuffer {}x{} exceeds the {MAX_FRAMEBUFFER_DIMENSION} pixel limit",
                size.width,
                size.height
            ));
        }
        let len = (size.width as usize)
            .checked_mul(size.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| anyhow!("framebuffer {}x{} is too large", size.width, size.height))?;

        stats.framebuffers_created.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            id: NEXT_FRAMEBUFFER_ID.fetch_add(1, Ordering::Relaxed),
            size,
            pixels: vec![0u8; len],
            bound: false,
            stats,
        })
    }

    /// Fill the whole buffer with a single RGBA colour.
    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.pixels.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
}

impl FrameBuffer for SoftwareFrameBuffer {
    fn id(&self) -> u32 {
        self.id
    }

    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn bind(&mut self) {
        self.bound = true;
    }

    fn unbind(&mut self) {
        self.bound = false;
    }

    fn to_image(&mut self, frame_id: u64) -> Result<FrameImage> {
        if self.bound {
            return Err(anyhow!("framebuffer {} read back while still bound", self.id));
        }
        FrameImage::from_raw(
            self.pixels.clone(),
            self.size.width,
            self.size.height,
            self.size.width * 4,
            PixelFormat::Rgba8,
            frame_id,
        )
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for SoftwareFrameBuffer {
    fn drop(&mut self) {
        self.stats.framebuffers_dropped.fetch_add(1, Ordering::SeqCst);
    }
}
