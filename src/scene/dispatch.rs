use crate::worker::state_lock;
use crate::worker::SharedState;
use log::trace;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Pump the engine instance's internal event queue once, if an instance
/// exists.
pub(crate) fn pump(state: &SharedState) -> bool {
    let mut state = state_lock(state);
    match state.instance.as_mut() {
        Some(instance) => {
            instance.dispatch();
            true
        }
        None => false,
    }
}

/// Periodically pumps an engine instance's event queue on a tokio runtime.
pub struct DispatchTimer {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DispatchTimer {
    pub(crate) fn spawn(runtime: &Handle, period: Duration, state: SharedState) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if !pump(&state) {
                            trace!("dispatch timer: no engine instance yet");
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            task: Some(task),
        }
    }

    /// Token that stops this timer when cancelled.
    pub(crate) fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop ticking. The task leaves its loop at the next await point.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.task.take();
    }
}

impl Drop for DispatchTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::instance::InstanceFactory;
    use crate::engine::testing::{Journal, RecordingFactory};
    use crate::worker::WorkerState;
    use std::sync::{Arc, Mutex};

    #[test]
    fn pump_without_instance_is_noop() {
        let state: SharedState = Arc::new(Mutex::new(WorkerState::default()));
        assert!(!pump(&state));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timer_dispatches_until_stopped() {
        let journal = Journal::new();
        let mut ws = WorkerState::default();
        ws.instance = Some(RecordingFactory::new(journal.clone()).create());
        let state: SharedState = Arc::new(Mutex::new(ws));

        let mut timer = DispatchTimer::spawn(&Handle::current(), Duration::from_millis(2), state.clone());
        assert!(timer.is_running());
        tokio::time::sleep(Duration::from_millis(50)).await;
        timer.stop();
        assert!(!timer.is_running());

        let seen = journal.dispatches();
        assert!(seen > 0, "timer never dispatched");
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(journal.dispatches() <= seen + 1);
    }
}
