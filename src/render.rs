pub mod backend;

/// Backends that provide worker GPU contexts and offscreen framebuffers.
pub mod backends {
    /// Cairo image-surface backend
    #[cfg(feature = "backend_cairo")]
    pub mod cairo;
    pub mod software;
}

mod frame;
mod viewport;

pub use frame::{FrameImage, PixelFormat};
pub use viewport::Viewport;
