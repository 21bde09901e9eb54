use crate::engine::instance::{EngineInstance, EventListener, SourceDescriptor};
use crate::engine::ResizePolicy;
use crate::render::backend::FrameBuffer;
use crate::render::Viewport;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle of a render worker.
///
/// `ShuttingDown` and `Terminated` are final: no setter moves a worker out of
/// them again.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    /// No engine instance has been built yet.
    #[default]
    Uninitialized,
    /// An engine instance exists and matches the requested source and viewport.
    Ready,
    /// Source or viewport changed since the last render cycle.
    PendingReset,
    /// Shutdown was requested; the next cycle stops the worker.
    ShuttingDown,
    /// All GPU resources have been released.
    Terminated,
}

impl WorkerPhase {
    pub fn is_stopping(self) -> bool {
        matches!(self, WorkerPhase::ShuttingDown | WorkerPhase::Terminated)
    }
}

/// Pending requests, coalesced between two render cycles.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetFlags {
    pub needs_container_reset: bool,
    pub size_changed: bool,
}

/// What the next render cycle has to do before painting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleAction {
    /// Destroy the framebuffer and engine instance, then construct new ones.
    Rebuild,
    /// Allocate a new framebuffer and bind it into the existing instance.
    Rebind,
    /// Nothing changed, paint only.
    Paint,
    /// Leave the run loop.
    Stop,
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerStats {
    /// Engine instances constructed.
    pub constructions: u64,
    /// Framebuffers rebound into a live instance.
    pub rebinds: u64,
    /// Render cycles that painted a frame.
    pub cycles: u64,
    /// Frames handed to the frame sink.
    pub frames: u64,
    pub failed_loads: u64,
    /// Render cycles that ended without a frame because a framebuffer could
    /// not be allocated or read back.
    pub failed_cycles: u64,
}

/// Everything a render worker shares with the GUI thread.
#[derive(Default)]
pub struct WorkerState {
    pub(crate) phase: WorkerPhase,
    pub(crate) flags: ResetFlags,
    pub(crate) source: SourceDescriptor,
    pub(crate) viewport: Viewport,
    pub(crate) instance: Option<Box<dyn EngineInstance>>,
    pub(crate) framebuffer: Option<Box<dyn FrameBuffer>>,
    pub(crate) listener: Option<EventListener>,
    pub(crate) stats: WorkerStats,
    /// The last cycle delivered no frame, so no consumer will ask for the
    /// next one. The next source or viewport request has to wake the worker.
    pub(crate) idle: bool,
}

pub(crate) type SharedState = Arc<Mutex<WorkerState>>;

/// Lock the shared state. A poisoned lock is recovered: the state only holds
/// flags and owned handles, which stay consistent after a panicking holder.
pub(crate) fn lock(state: &Mutex<WorkerState>) -> MutexGuard<'_, WorkerState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl WorkerState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    pub fn flags(&self) -> ResetFlags {
        self.flags
    }

    pub fn source(&self) -> &SourceDescriptor {
        &self.source
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn has_instance(&self) -> bool {
        self.instance.is_some()
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats
    }

    /// Store a new source. Takes effect on the next render cycle.
    pub fn set_source(&mut self, source: SourceDescriptor) {
        if self.phase.is_stopping() {
            return;
        }
        self.source = source;
        self.flags.needs_container_reset = true;
        self.mark_pending();
    }

    /// Store a new viewport. Equal and degenerate viewports are ignored.
    /// Returns whether the viewport was accepted.
    pub fn set_viewport(&mut self, viewport: Viewport) -> bool {
        if self.phase.is_stopping() || !viewport.is_valid() || viewport == self.viewport {
            return false;
        }
        self.viewport = viewport;
        self.flags.size_changed = true;
        if self.instance.is_none() {
            self.flags.needs_container_reset = true;
        }
        self.mark_pending();
        true
    }

    fn mark_pending(&mut self) {
        if self.phase == WorkerPhase::Ready {
            self.phase = WorkerPhase::PendingReset;
        }
    }

    /// The single transition function, consulted at the top of every render
    /// cycle.
    pub fn next_action(&self, policy: ResizePolicy) -> CycleAction {
        if self.phase.is_stopping() {
            return CycleAction::Stop;
        }
        if self.framebuffer.is_none() || self.instance.is_none() || self.flags.needs_container_reset {
            return CycleAction::Rebuild;
        }
        if self.flags.size_changed {
            return match policy {
                ResizePolicy::Rebuild => CycleAction::Rebuild,
                ResizePolicy::Rebind => CycleAction::Rebind,
            };
        }
        CycleAction::Paint
    }

    /// Record that `action` has been carried out.
    pub(crate) fn complete(&mut self, action: CycleAction) {
        match action {
            CycleAction::Rebuild => {
                self.flags = ResetFlags::default();
                self.stats.constructions += 1;
            }
            CycleAction::Rebind => {
                self.flags.size_changed = false;
                self.stats.rebinds += 1;
            }
            CycleAction::Paint | CycleAction::Stop => {}
        }
        if !self.phase.is_stopping() {
            self.phase = WorkerPhase::Ready;
        }
    }

    /// Record that `action` could not be carried out. Its request is dropped
    /// rather than retried every cycle.
    pub(crate) fn abandon(&mut self, action: CycleAction) {
        match action {
            CycleAction::Rebuild => self.flags = ResetFlags::default(),
            CycleAction::Rebind => self.flags.size_changed = false,
            CycleAction::Paint | CycleAction::Stop => {}
        }
        self.stats.failed_cycles += 1;
        if !self.phase.is_stopping() {
            self.phase = if self.instance.is_some() {
                WorkerPhase::Ready
            } else {
                WorkerPhase::Uninitialized
            };
        }
    }

    /// Clear the idle mark. Returns whether the worker has to be woken.
    pub(crate) fn take_idle(&mut self) -> bool {
        std::mem::take(&mut self.idle)
    }

    /// Drop the engine instance and framebuffer in that order.
    pub(crate) fn release_resources(&mut self) {
        self.instance = None;
        self.framebuffer = None;
    }
}
