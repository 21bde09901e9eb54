//! Viewport definition for rendering.
//!
//! A [`Viewport`] describes the logical size of the offscreen render target an
//! engine instance draws into, together with the pixel density of the host
//! window it is eventually composited into.
//!
//! A viewport is considered *valid* when both dimensions are at least `1`.
//! Degenerate viewports (zero width or height) are never applied to a render
//! worker; they are silently ignored.
//!
//! # Examples
//!
//! ```
//! use engine_host::render::Viewport;
//!
//! let vp = Viewport::new(800, 600, 2.0);
//! assert!(vp.is_valid());
//! assert_eq!(vp.scaled_size(), (1600, 1200));
//! ```
//!
//! Host layouts produce fractional sizes; [`Viewport::from_logical`] rounds
//! them to whole pixels. The result may be degenerate:
//! ```
//! use engine_host::render::Viewport;
//!
//! let vp = Viewport::from_logical(0.4, 599.6, 1.0);
//! assert_eq!((vp.width, vp.height), (0, 600));
//! assert!(!vp.is_valid());
//! ```

/// Represents the viewport for rendering.
#[derive(Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Width in logical pixels.
    pub width: u32,

    /// Height in logical pixels.
    pub height: u32,

    /// Device pixel ratio of the host window.
    pub dpi: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            dpi: 1.0,
        }
    }
}

impl std::fmt::Debug for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Viewport {{ width: {}, height: {}, dpi: {} }}",
            self.width, self.height, self.dpi
        )
    }
}

impl Viewport {
    /// Creates a new [`Viewport`] with the given size and pixel density.
    pub fn new(width: u32, height: u32, dpi: f64) -> Self {
        Self { width, height, dpi }
    }

    /// Builds a viewport from a host layout size, rounding to whole pixels.
    /// Negative and non-finite sizes become `0`.
    pub fn from_logical(width: f64, height: f64, dpi: f64) -> Self {
        let px = |v: f64| if v.is_finite() && v > 0.0 { v.round() as u32 } else { 0 };
        Self::new(px(width), px(height), dpi)
    }

    /// Returns true when both dimensions are at least one pixel.
    pub fn is_valid(&self) -> bool {
        self.width >= 1 && self.height >= 1
    }

    /// Returns a copy with a different pixel density.
    pub fn with_dpi(self, dpi: f64) -> Self {
        Self { dpi, ..self }
    }

    /// Size in device pixels (`logical * dpi`, rounded).
    pub fn scaled_size(&self) -> (u32, u32) {
        (
            (self.width as f64 * self.dpi).round() as u32,
            (self.height as f64 * self.dpi).round() as u32,
        )
    }
}
