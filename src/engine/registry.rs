use crate::worker::{RenderWorker, WorkerId};
use crate::EmbedError;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

struct Registered {
    worker: Arc<RenderWorker>,
    /// Cancels the item's dispatch timer.
    dispatch: Option<CancellationToken>,
}

/// Render workers owned by one engine, kept in creation order so teardown is
/// deterministic.
pub struct WorkerRegistry {
    order: Vec<WorkerId>,
    workers: HashMap<WorkerId, Registered>,
    limit: usize,
}

impl WorkerRegistry {
    pub fn new(limit: usize) -> Self {
        Self {
            order: Vec::new(),
            workers: HashMap::new(),
            limit,
        }
    }

    pub fn register(
        &mut self,
        worker: Arc<RenderWorker>,
        dispatch: Option<CancellationToken>,
    ) -> Result<WorkerId, EmbedError> {
        if self.workers.len() >= self.limit {
            return Err(EmbedError::WorkerLimitExceeded);
        }

        let id = worker.id();
        self.order.push(id);
        self.workers.insert(id, Registered { worker, dispatch });
        debug!("registry: worker {id} registered ({} total)", self.workers.len());
        Ok(id)
    }

    /// Forget a worker. Its owner is responsible for shutting it down.
    pub fn remove(&mut self, id: WorkerId) -> Option<Arc<RenderWorker>> {
        let entry = self.workers.remove(&id)?;
        self.order.retain(|w| *w != id);
        Some(entry.worker)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Take every worker out of the registry, in registration order, and
    /// cancel their dispatch timers.
    pub fn drain(&mut self) -> Vec<Arc<RenderWorker>> {
        let order = std::mem::take(&mut self.order);
        order
            .into_iter()
            .filter_map(|id| self.workers.remove(&id))
            .map(|entry| {
                if let Some(dispatch) = entry.dispatch {
                    dispatch.cancel();
                }
                entry.worker
            })
            .collect()
    }
}
