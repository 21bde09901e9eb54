//! Render workers.
//!
//! A [`RenderWorker`] is a dedicated thread that owns a GPU context, an
//! offscreen framebuffer and the engine instance drawing into it. Everything
//! it shares with the GUI thread lives in one [`WorkerState`] behind a single
//! mutex.

mod render_worker;
mod state;

pub use render_worker::{FrameSink, RenderTrigger, RenderWorker};
pub use state::{CycleAction, ResetFlags, WorkerPhase, WorkerState, WorkerStats};
pub(crate) use state::{lock as state_lock, SharedState};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A unique identifier for a render worker, represented as a UUID.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(Uuid);

impl WorkerId {
    /// Create a new unique `WorkerId` using a random UUID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
