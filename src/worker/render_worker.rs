use crate::engine::events::EmbedEvent;
use crate::engine::instance::{bind_listener, EngineInstance, EventListener, InstanceFactory, SourceDescriptor};
use crate::engine::{EmbedConfig, EmbedError};
use crate::render::backend::{FrameBuffer, GpuContext, SurfaceSize};
use crate::render::{FrameImage, Viewport};
use crate::worker::state::{lock, CycleAction, SharedState, WorkerPhase, WorkerState, WorkerStats};
use crate::worker::WorkerId;
use anyhow::anyhow;
use log::{debug, error, info, trace, warn};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};

/// Receives every frame a render worker produces.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, image: FrameImage);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerCommand {
    /// Run one render cycle.
    RenderNext,
    /// Leave the run loop and release all GPU resources.
    Shutdown,
}

/// Lets the consumer of a frame ask for the next one.
#[derive(Clone)]
pub struct RenderTrigger {
    worker_id: WorkerId,
    tx: mpsc::Sender<WorkerCommand>,
}

impl RenderTrigger {
    /// Request one render cycle. Returns false when the worker is gone.
    pub fn request_render(&self) -> bool {
        match self.tx.try_send(WorkerCommand::RenderNext) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("render worker {}: command queue full, render request dropped", self.worker_id);
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Commands waiting in the worker's queue.
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// A dedicated render thread plus the state it shares with the GUI thread.
///
/// The thread is spawned by [`RenderWorker::start`]. Until then the worker
/// only collects source and viewport requests.
pub struct RenderWorker {
    id: WorkerId,
    config: Arc<EmbedConfig>,
    factory: Arc<dyn InstanceFactory>,
    state: SharedState,
    cmd_tx: mpsc::Sender<WorkerCommand>,
    /// Taken by the render thread on start.
    cmd_rx: Mutex<Option<mpsc::Receiver<WorkerCommand>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
    event_tx: broadcast::Sender<EmbedEvent>,
}

impl RenderWorker {
    pub fn new(
        config: Arc<EmbedConfig>,
        factory: Arc<dyn InstanceFactory>,
        event_tx: broadcast::Sender<EmbedEvent>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_capacity);
        let viewport = Viewport::default().with_dpi(config.default_dpi);

        Self {
            id: WorkerId::new(),
            config,
            factory,
            state: Arc::new(Mutex::new(WorkerState::new(viewport))),
            cmd_tx,
            cmd_rx: Mutex::new(Some(cmd_rx)),
            thread: Mutex::new(None),
            event_tx,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    pub fn phase(&self) -> WorkerPhase {
        lock(&self.state).phase
    }

    pub fn stats(&self) -> WorkerStats {
        lock(&self.state).stats
    }

    pub fn viewport(&self) -> Viewport {
        lock(&self.state).viewport
    }

    pub fn is_started(&self) -> bool {
        self.cmd_rx.lock().unwrap_or_else(|p| p.into_inner()).is_none()
    }

    pub(crate) fn shared_state(&self) -> &SharedState {
        &self.state
    }

    /// Run `f` against the current engine instance while holding the shared
    /// lock. Returns `None` when no instance exists yet.
    pub fn with_instance<R>(&self, f: impl FnOnce(&mut dyn EngineInstance) -> R) -> Option<R> {
        let mut state = lock(&self.state);
        state.instance.as_mut().map(|instance| f(instance.as_mut()))
    }

    /// Request a new source. Applied by the next render cycle.
    pub fn set_source(&self, source: SourceDescriptor) {
        debug!("render worker {}: source set to '{}'", self.id, source);
        let wake = {
            let mut state = lock(&self.state);
            state.set_source(source);
            state.take_idle()
        };
        if wake {
            self.trigger().request_render();
        }
    }

    /// Request a new viewport. Equal and degenerate viewports are ignored.
    pub fn set_viewport(&self, viewport: Viewport) -> bool {
        let (accepted, wake) = {
            let mut state = lock(&self.state);
            let accepted = state.set_viewport(viewport);
            (accepted, accepted && state.take_idle())
        };
        if accepted {
            debug!("render worker {}: viewport set to {:?}", self.id, viewport);
        }
        if wake {
            self.trigger().request_render();
        }
        accepted
    }

    /// Store the listener and install it into the current instance, if any.
    /// Every instance built later receives it as well.
    pub fn set_event_listener(&self, listener: Option<EventListener>) {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        state.listener = listener;
        if let Some(instance) = state.instance.as_mut() {
            bind_listener(instance.as_mut(), state.listener.as_ref());
        }
    }

    pub fn trigger(&self) -> RenderTrigger {
        RenderTrigger {
            worker_id: self.id,
            tx: self.cmd_tx.clone(),
        }
    }

    /// Spawn the render thread with a context created for it, and run the
    /// first render cycle.
    pub fn start(&self, context: Box<dyn GpuContext>, sink: Arc<dyn FrameSink>) -> Result<(), EmbedError> {
        let mut thread = self.thread.lock().unwrap_or_else(|p| p.into_inner());
        if self.phase().is_stopping() {
            return Err(EmbedError::WorkerTerminated(self.id));
        }

        let cmd_rx = self
            .cmd_rx
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
            .ok_or(EmbedError::WorkerAlreadyStarted(self.id))?;

        let render_loop = RenderLoop {
            id: self.id,
            config: self.config.clone(),
            factory: self.factory.clone(),
            state: self.state.clone(),
            context,
            sink,
            event_tx: self.event_tx.clone(),
            frame_id: 0,
        };

        let handle = std::thread::Builder::new()
            .name(format!("render-worker-{}", self.id))
            .spawn(move || render_loop.run(cmd_rx))
            .map_err(|e| EmbedError::Spawn(e.to_string()))?;
        *thread = Some(handle);

        info!("render worker {}: started", self.id);
        self.trigger().request_render();
        Ok(())
    }

    /// Stop the worker and release its engine instance, framebuffer and GPU
    /// context, in that order. Blocks until the render thread has finished.
    ///
    /// Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        let mut thread = self.thread.lock().unwrap_or_else(|p| p.into_inner());
        {
            let mut state = lock(&self.state);
            if state.phase.is_stopping() {
                return;
            }
            state.phase = WorkerPhase::ShuttingDown;
        }
        info!("render worker {}: shutting down", self.id);

        let Some(handle) = thread.take() else {
            // Never started: no thread holds a context, release on this one.
            self.finish_on_caller();
            return;
        };

        if handle.thread().id() == std::thread::current().id() {
            warn!("render worker {}: shutdown requested from its own thread", self.id);
            return;
        }

        self.send_shutdown();
        if handle.join().is_err() {
            error!("render worker {}: render thread panicked", self.id);
            self.finish_on_caller();
        }
    }

    fn send_shutdown(&self) {
        loop {
            match self.cmd_tx.try_send(WorkerCommand::Shutdown) {
                Ok(()) | Err(TrySendError::Closed(_)) => break,
                // The worker is draining render requests; the stop flag is
                // already set so it leaves the loop on the next one.
                Err(TrySendError::Full(_)) => std::thread::yield_now(),
            }
        }
    }

    fn finish_on_caller(&self) {
        let mut state = lock(&self.state);
        state.release_resources();
        state.phase = WorkerPhase::Terminated;
        drop(state);

        let _ = self.event_tx.send(EmbedEvent::WorkerTerminated { worker_id: self.id });
    }
}

impl Drop for RenderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the render thread itself.
struct RenderLoop {
    id: WorkerId,
    config: Arc<EmbedConfig>,
    factory: Arc<dyn InstanceFactory>,
    state: SharedState,
    context: Box<dyn GpuContext>,
    sink: Arc<dyn FrameSink>,
    event_tx: broadcast::Sender<EmbedEvent>,
    frame_id: u64,
}

impl RenderLoop {
    fn run(mut self, mut cmd_rx: mpsc::Receiver<WorkerCommand>) {
        let _ = self.event_tx.send(EmbedEvent::WorkerStarted { worker_id: self.id });

        while let Some(cmd) = cmd_rx.blocking_recv() {
            match cmd {
                WorkerCommand::Shutdown => break,
                WorkerCommand::RenderNext => {
                    if !self.render_next() {
                        break;
                    }
                    std::thread::sleep(self.config.frame_interval);
                }
            }
        }

        drop(cmd_rx);
        self.teardown();
    }

    /// One render cycle. Returns false once the worker has to stop.
    fn render_next(&mut self) -> bool {
        let shared = self.state.clone();
        let image = {
            let mut guard = lock(&shared);
            let state = &mut *guard;

            let action = state.next_action(self.config.resize_policy);
            if action == CycleAction::Stop {
                return false;
            }

            if let Err(e) = self.context.make_current() {
                panic!("render worker {}: cannot make GPU context current: {e}", self.id);
            }

            let prepared = match action {
                CycleAction::Rebuild => self.rebuild(state),
                CycleAction::Rebind => self.rebind(state),
                CycleAction::Paint | CycleAction::Stop => Ok(()),
            };
            let mut forced = action != CycleAction::Paint;
            match prepared {
                Ok(()) => state.complete(action),
                Err(e) => {
                    error!("render worker {}: {action:?} failed: {e:#}", self.id);
                    state.abandon(action);
                    forced = false;
                }
            }

            let (Some(instance), Some(framebuffer)) = (state.instance.as_mut(), state.framebuffer.as_mut()) else {
                warn!("render worker {}: nothing to paint, waiting for a new request", self.id);
                state.idle = true;
                return true;
            };

            framebuffer.bind();
            instance.paint(forced);
            self.context.flush();
            framebuffer.unbind();

            self.frame_id += 1;
            let image = match framebuffer.to_image(self.frame_id) {
                Ok(image) => image,
                Err(e) => {
                    error!("render worker {}: cannot read back framebuffer: {e:#}", self.id);
                    state.abandon(CycleAction::Paint);
                    state.idle = true;
                    return true;
                }
            };

            state.stats.cycles += 1;
            state.stats.frames += 1;
            image
        };

        trace!("render worker {}: frame {} ready", self.id, image.frame_id());
        let produced = EmbedEvent::FrameProduced {
            worker_id: self.id,
            frame_id: image.frame_id(),
            width: image.width(),
            height: image.height(),
        };
        self.sink.deliver(image);
        let _ = self.event_tx.send(produced);
        true
    }

    /// Allocate a framebuffer for `viewport`, refusing one of any other size.
    fn allocate_framebuffer(&mut self, viewport: Viewport) -> anyhow::Result<Box<dyn FrameBuffer>> {
        let wanted = SurfaceSize::from(viewport);
        let framebuffer = self.context.create_framebuffer(wanted)?;
        let actual = framebuffer.size();
        if actual != wanted {
            return Err(anyhow!(
                "backend allocated {}x{} instead of {}x{}",
                actual.width,
                actual.height,
                wanted.width,
                wanted.height
            ));
        }
        Ok(framebuffer)
    }

    fn rebuild(&mut self, state: &mut WorkerState) -> anyhow::Result<()> {
        state.release_resources();

        let viewport = state.viewport;
        let framebuffer = self.allocate_framebuffer(viewport)?;

        let mut instance = self.factory.create();
        instance.init(viewport.width, viewport.height, viewport.dpi);
        instance.set_render_target_id(framebuffer.id());
        instance.set_background_color(self.config.background_color);
        bind_listener(instance.as_mut(), state.listener.as_ref());

        info!(
            "render worker {}: engine instance created for '{}' at {:?}",
            self.id, state.source, viewport
        );
        let _ = self.event_tx.send(EmbedEvent::InstanceCreated {
            worker_id: self.id,
            source: state.source.to_string(),
            viewport,
        });

        if state.source.is_empty() {
            debug!("render worker {}: no source set, nothing to load", self.id);
        } else {
            let success = instance.load(&state.source);
            if !success {
                warn!("render worker {}: failed to load '{}'", self.id, state.source);
                state.stats.failed_loads += 1;
            }
            let _ = self.event_tx.send(EmbedEvent::LoadFinished {
                worker_id: self.id,
                source: state.source.to_string(),
                success,
            });
        }

        state.framebuffer = Some(framebuffer);
        state.instance = Some(instance);
        Ok(())
    }

    /// On failure the previous framebuffer stays bound to the instance.
    fn rebind(&mut self, state: &mut WorkerState) -> anyhow::Result<()> {
        let viewport = state.viewport;
        let framebuffer = self.allocate_framebuffer(viewport)?;

        if let Some(instance) = state.instance.as_mut() {
            instance.set_render_target_id(framebuffer.id());
        }
        debug!("render worker {}: framebuffer {} rebound at {:?}", self.id, framebuffer.id(), viewport);
        state.framebuffer = Some(framebuffer);
        Ok(())
    }

    fn teardown(mut self) {
        let mut state = lock(&self.state);
        state.phase = WorkerPhase::ShuttingDown;

        state.instance = None;
        if let Err(e) = self.context.make_current() {
            warn!("render worker {}: cannot make GPU context current for teardown: {e}", self.id);
        }
        state.framebuffer = None;
        self.context.done_current();
        self.context.release();

        state.phase = WorkerPhase::Terminated;
        drop(state);

        info!("render worker {}: terminated", self.id);
        let _ = self.event_tx.send(EmbedEvent::WorkerTerminated { worker_id: self.id });
    }
}
