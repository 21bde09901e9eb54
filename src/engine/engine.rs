use crate::engine::config::validate;
use crate::engine::events::EmbedEvent;
use crate::engine::instance::InstanceFactory;
use crate::engine::registry::WorkerRegistry;
use crate::engine::DEFAULT_EVENT_CAPACITY;
use crate::render::backend::RenderBackend;
use crate::scene::{DispatchTimer, SceneItem};
use crate::worker::RenderWorker;
use crate::{EmbedConfig, EmbedError};
use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Runtime;
use tokio::sync::broadcast;

/// Owning context for embedded engine content.
///
/// Every [`SceneItem`] and its render worker is created here, and the engine
/// keeps them in a registry so that [`EmbedEngine::shutdown`] (or dropping the
/// engine) tears all of them down in creation order.
pub struct EmbedEngine {
    /// Configuration shared by every item.
    config: Arc<EmbedConfig>,
    /// Active render backend.
    backend: Arc<dyn RenderBackend>,
    /// Creates engine instances for the render workers.
    factory: Arc<dyn InstanceFactory>,
    /// Runs the dispatch timers.
    runtime: Option<Runtime>,
    registry: Arc<Mutex<WorkerRegistry>>,
    /// Event sender
    event_tx: broadcast::Sender<EmbedEvent>,
    shut_down: AtomicBool,
}

impl EmbedEngine {
    /// Create a new engine.
    ///
    /// If `config` is `None`, [`EmbedConfig::default`] is used.
    ///
    /// ```no_run
    /// # use engine_host as eh;
    /// # fn factory() -> Box<dyn eh::engine::instance::EngineInstance> { unimplemented!() }
    /// let backend = eh::render::backends::software::SoftwareBackend::new().unwrap();
    /// let engine = eh::EmbedEngine::new(None, Box::new(backend), std::sync::Arc::new(factory)).unwrap();
    /// ```
    pub fn new(
        config: Option<EmbedConfig>,
        backend: Box<dyn RenderBackend>,
        factory: Arc<dyn InstanceFactory>,
    ) -> Result<Self, EmbedError> {
        let config = config.unwrap_or_default();
        validate(&config)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("embed-dispatch")
            .enable_time()
            .build()
            .map_err(|e| EmbedError::Runtime(e.to_string()))?;

        // Broadcast event bus. Subscribe to receive worker and frame events.
        let (event_tx, _first_rx) = broadcast::channel::<EmbedEvent>(DEFAULT_EVENT_CAPACITY);

        info!("embed engine: using {} backend", backend.name());

        Ok(Self {
            registry: Arc::new(Mutex::new(WorkerRegistry::new(config.max_workers))),
            config: Arc::new(config),
            backend: Arc::from(backend),
            factory,
            runtime: Some(runtime),
            event_tx,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &EmbedConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Receive informational events from every worker of this engine.
    pub fn subscribe_events(&self) -> broadcast::Receiver<EmbedEvent> {
        self.event_tx.subscribe()
    }

    pub fn worker_count(&self) -> usize {
        self.registry.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Create a scene item with its own render worker and dispatch timer.
    /// The GPU context is only created on the item's first paint-node update.
    pub fn create_item(&self) -> Result<SceneItem, EmbedError> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(EmbedError::EngineShutdown);
        }

        let worker = Arc::new(RenderWorker::new(
            self.config.clone(),
            self.factory.clone(),
            self.event_tx.clone(),
        ));
        let dispatch = self.runtime.as_ref().map(|rt| {
            DispatchTimer::spawn(
                rt.handle(),
                self.config.dispatch_interval,
                worker.shared_state().clone(),
            )
        });

        self.registry
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .register(worker.clone(), dispatch.as_ref().map(DispatchTimer::cancel_token))?;

        Ok(SceneItem::new(worker, self.backend.clone(), self.registry.clone(), dispatch))
    }

    /// Stop every item's dispatch timer and shut every registered worker down,
    /// in creation order, blocking until each has released its GPU resources.
    /// Calling this again is a no-op.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        // Take the workers out first so no lock is held while joining.
        let workers = self.registry.lock().unwrap_or_else(|p| p.into_inner()).drain();
        info!("embed engine: shutting down {} worker(s)", workers.len());

        for worker in workers {
            worker.shutdown();
        }
    }
}

impl Drop for EmbedEngine {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
