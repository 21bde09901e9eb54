use anyhow::{anyhow, Result};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Straight RGBA, 8 bits per channel.
    Rgba8,
    /// Cairo-style premultiplied ARGB in native endianness.
    PreMulArgb32,
}

/// Immutable CPU-side snapshot of one rendered framebuffer.
///
/// Cloning is cheap: the pixels are shared, never copied, so a snapshot can be
/// handed from the render worker to the scene graph without further
/// synchronisation.
#[derive(Clone)]
pub struct FrameImage {
    inner: Arc<FrameData>,
}

struct FrameData {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    stride: u32,
    format: PixelFormat,
    frame_id: u64,
}

impl FrameImage {
    /// Wrap a pixel buffer. Fails when the buffer is shorter than
    /// `height * stride` bytes or the stride cannot hold a row.
    pub fn from_raw(
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
        frame_id: u64,
    ) -> Result<Self> {
        if (stride as u64) < (width as u64) * 4 {
            return Err(anyhow!("stride {stride} too small for width {width}"));
        }
        let needed = (height as usize)
            .checked_mul(stride as usize)
            .ok_or_else(|| anyhow!("image size overflows: {height} rows of {stride} bytes"))?;
        if pixels.len() < needed {
            return Err(anyhow!(
                "pixel buffer too small for image dimensions: {} < {needed}",
                pixels.len()
            ));
        }

        Ok(Self::new(pixels, width, height, stride, format, frame_id))
    }

    /// Fully transparent RGBA image, used as the placeholder texture before
    /// the first frame arrives.
    pub fn blank(width: u32, height: u32) -> Self {
        let stride = width * 4;
        Self::new(
            vec![0u8; (stride * height) as usize],
            width,
            height,
            stride,
            PixelFormat::Rgba8,
            0,
        )
    }

    fn new(pixels: Vec<u8>, width: u32, height: u32, stride: u32, format: PixelFormat, frame_id: u64) -> Self {
        Self {
            inner: Arc::new(FrameData {
                pixels,
                width,
                height,
                stride,
                format,
                frame_id,
            }),
        }
    }

    pub fn width(&self) -> u32 {
        self.inner.width
    }

    pub fn height(&self) -> u32 {
        self.inner.height
    }

    pub fn stride(&self) -> u32 {
        self.inner.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.inner.format
    }

    /// Sequence number assigned by the producing worker. `0` for placeholders.
    pub fn frame_id(&self) -> u64 {
        self.inner.frame_id
    }

    pub fn pixels(&self) -> &[u8] {
        &self.inner.pixels
    }
}

impl std::fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameImage")
            .field("frame_id", &self.inner.frame_id)
            .field("width", &self.inner.width)
            .field("height", &self.inner.height)
            .field("len", &self.inner.pixels.len())
            .finish()
    }
}
