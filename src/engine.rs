mod config;
#[allow(clippy::module_inception)]
mod engine;
mod errors;
pub mod events;
pub mod instance;
pub mod keymap;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, EmbedConfig, EmbedConfigBuilder, ResizePolicy};
pub use engine::EmbedEngine;
pub use errors::EmbedError;
pub use registry::WorkerRegistry;

/// Capacity of the broadcast channel carrying [`events::EmbedEvent`]s.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;
