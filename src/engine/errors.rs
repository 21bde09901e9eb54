use crate::engine::config::ConfigError;
use crate::worker::WorkerId;

#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("Render worker {0} has already been started")]
    WorkerAlreadyStarted(WorkerId),

    #[error("Render worker {0} has been terminated")]
    WorkerTerminated(WorkerId),

    #[error("Render worker limit exceeded")]
    WorkerLimitExceeded,

    #[error("Host window has no current GPU context")]
    NoHostContext,

    #[error("GPU context error: {0}")]
    Context(String),

    #[error("Render backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cannot spawn render thread: {0}")]
    Spawn(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Engine has been shut down")]
    EngineShutdown,
}
