use crate::render::FrameImage;
use crate::scene::host::RedrawSink;
use crate::worker::{FrameSink, RenderTrigger};
use log::trace;
use std::sync::{Arc, Mutex, MutexGuard};

struct Slots {
    /// Latest delivered frame, not yet shown.
    pending: Option<FrameImage>,
    displayed: FrameImage,
    dirty: bool,
    swaps: u64,
    dropped: u64,
}

/// Hands frames from a render worker to the scene graph.
///
/// Holds at most one pending frame: a frame delivered before the previous one
/// was consumed replaces it. Consuming a frame in [`TextureNode::prepare`] is
/// what lets the worker render the next one.
pub struct TextureNode {
    slots: Mutex<Slots>,
    redraw: Arc<dyn RedrawSink>,
    trigger: RenderTrigger,
}

impl TextureNode {
    pub fn new(redraw: Arc<dyn RedrawSink>, trigger: RenderTrigger) -> Self {
        Self {
            slots: Mutex::new(Slots {
                pending: None,
                displayed: FrameImage::blank(1, 1),
                dirty: false,
                swaps: 0,
                dropped: 0,
            }),
            redraw,
            trigger,
        }
    }

    fn slots(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Swap the pending frame in, if any, and ask the worker for the next
    /// one. Returns whether a new frame is now displayed.
    pub fn prepare(&self) -> bool {
        let swapped = {
            let mut slots = self.slots();
            match slots.pending.take() {
                Some(image) => {
                    slots.displayed = image;
                    slots.dirty = true;
                    slots.swaps += 1;
                    true
                }
                None => false,
            }
        };

        if swapped {
            self.trigger.request_render();
        }
        swapped
    }

    /// The frame currently shown. A 1x1 transparent image until the first
    /// frame arrives.
    pub fn displayed(&self) -> FrameImage {
        self.slots().displayed.clone()
    }

    /// Returns and clears the dirty mark set by [`TextureNode::prepare`].
    pub fn take_dirty(&self) -> bool {
        std::mem::take(&mut self.slots().dirty)
    }

    pub fn has_pending(&self) -> bool {
        self.slots().pending.is_some()
    }

    pub fn pending_frame_id(&self) -> Option<u64> {
        self.slots().pending.as_ref().map(|p| p.frame_id())
    }

    pub fn swaps(&self) -> u64 {
        self.slots().swaps
    }

    /// Frames overwritten before they were displayed.
    pub fn dropped_frames(&self) -> u64 {
        self.slots().dropped
    }
}

impl FrameSink for TextureNode {
    fn deliver(&self, image: FrameImage) {
        {
            let mut slots = self.slots();
            if let Some(stale) = slots.pending.replace(image) {
                trace!("texture node: frame {} dropped before display", stale.frame_id());
                slots.dropped += 1;
            }
        }
        self.redraw.request_redraw();
    }
}
