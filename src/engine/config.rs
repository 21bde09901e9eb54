//! Embedding configuration.
//!
//! [`EmbedConfig`] controls the pacing and limits of every render worker and
//! scene item created by one [`EmbedEngine`](crate::EmbedEngine). Defaults are
//! available through [`Default`], custom values through the validating
//! [`EmbedConfig::builder()`], and hosts that keep their settings on disk can
//! read them as JSON.
//!
//! # Examples
//!
//! ```rust
//! use engine_host::engine::EmbedConfig;
//! let cfg = EmbedConfig::default();
//! assert_eq!(cfg.frame_interval.as_millis(), 16);
//! ```
//!
//! ```rust
//! use engine_host::engine::{EmbedConfig, ResizePolicy};
//! use std::time::Duration;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = EmbedConfig::builder()
//!     .frame_interval(Duration::from_millis(8))
//!     .resize_policy(ResizePolicy::Rebind)
//!     .default_dpi(2.0)
//!     .build()?; // returns Result<EmbedConfig, ConfigError>
//! # Ok(()) }
//! ```
//!
//! ```rust
//! use engine_host::engine::EmbedConfig;
//! let cfg = EmbedConfig::from_json_str(r#"{ "frame_interval_ms": 33, "max_workers": 4 }"#).unwrap();
//! assert_eq!(cfg.max_workers, 4);
//! assert_eq!(cfg.dispatch_interval.as_millis(), 16);
//! ```
//!
//! # Fields (summary)
//! - `frame_interval`: pacing sleep after each render cycle (default: 16 ms).
//! - `dispatch_interval`: period of the engine event-queue pump (default: 16 ms).
//! - `default_dpi`: pixel density used until the host window reports one (default: 1.0).
//! - `background_color`: ARGB colour set on every new engine instance (default: transparent).
//! - `resize_policy`: how a size change is applied to a live engine instance.
//! - `command_capacity`: capacity of each worker's command channel (default: 16).
//! - `max_workers`: how many render workers one engine may own (default: 64).

use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
const DEFAULT_DISPATCH_INTERVAL: Duration = Duration::from_millis(16);

/// How a render worker applies a size change when an engine instance already
/// exists for the current source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Destroy and reconstruct the engine instance for the new size.
    #[default]
    Rebuild,
    /// Allocate a new framebuffer and hand its id to the existing instance.
    Rebind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    #[serde(rename = "frame_interval_ms", with = "millis")]
    pub frame_interval: Duration,
    #[serde(rename = "dispatch_interval_ms", with = "millis")]
    pub dispatch_interval: Duration,
    pub default_dpi: f64,
    pub background_color: u32,
    pub resize_policy: ResizePolicy,
    pub command_capacity: usize,
    pub max_workers: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            dispatch_interval: DEFAULT_DISPATCH_INTERVAL,
            default_dpi: 1.0,
            background_color: 0,
            resize_policy: ResizePolicy::Rebuild,
            command_capacity: 16,
            max_workers: 64,
        }
    }
}

impl EmbedConfig {
    pub fn builder() -> EmbedConfigBuilder {
        EmbedConfigBuilder::default()
    }

    /// Parse and validate a JSON document. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: EmbedConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&cfg)?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Builder for [`EmbedConfig`].
#[derive(Debug, Clone, Default)]
pub struct EmbedConfigBuilder {
    inner: EmbedConfig,
}

impl EmbedConfigBuilder {
    #[inline]
    fn map(mut self, f: impl FnOnce(&mut EmbedConfig)) -> Self {
        f(&mut self.inner);
        self
    }

    pub fn frame_interval(self, d: Duration) -> Self { self.map(|c| c.frame_interval = d) }
    pub fn dispatch_interval(self, d: Duration) -> Self { self.map(|c| c.dispatch_interval = d) }
    pub fn default_dpi(self, dpi: f64) -> Self { self.map(|c| c.default_dpi = dpi) }
    pub fn background_color(self, argb: u32) -> Self { self.map(|c| c.background_color = argb) }
    pub fn resize_policy(self, policy: ResizePolicy) -> Self { self.map(|c| c.resize_policy = policy) }
    pub fn command_capacity(self, n: usize) -> Self { self.map(|c| c.command_capacity = n) }
    pub fn max_workers(self, n: usize) -> Self { self.map(|c| c.max_workers = n) }

    pub fn build(self) -> Result<EmbedConfig, ConfigError> {
        validate(&self.inner)?;
        Ok(self.inner)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroFrameInterval,
    ZeroDispatchInterval,
    InvalidDpi(f64),
    ZeroCapacity,
    ZeroWorkers,
    Parse(String),
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroFrameInterval =>
                write!(f, "frame_interval must be greater than zero"),
            ConfigError::ZeroDispatchInterval =>
                write!(f, "dispatch_interval must be greater than zero"),
            ConfigError::InvalidDpi(dpi) =>
                write!(f, "default_dpi {dpi} must be a positive finite number"),
            ConfigError::ZeroCapacity =>
                write!(f, "command_capacity must be at least 1"),
            ConfigError::ZeroWorkers =>
                write!(f, "max_workers must be at least 1"),
            ConfigError::Parse(msg) =>
                write!(f, "invalid configuration document: {msg}"),
            ConfigError::Io(msg) =>
                write!(f, "cannot read configuration: {msg}"),
        }
    }
}
impl std::error::Error for ConfigError {}

pub(crate) fn validate(c: &EmbedConfig) -> Result<(), ConfigError> {
    if c.frame_interval.is_zero() {
        return Err(ConfigError::ZeroFrameInterval);
    }
    if c.dispatch_interval.is_zero() {
        return Err(ConfigError::ZeroDispatchInterval);
    }
    if !c.default_dpi.is_finite() || c.default_dpi <= 0.0 {
        return Err(ConfigError::InvalidDpi(c.default_dpi));
    }
    if c.command_capacity == 0 {
        return Err(ConfigError::ZeroCapacity);
    }
    if c.max_workers == 0 {
        return Err(ConfigError::ZeroWorkers);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builder_rejects_invalid_values() {
        assert_eq!(
            EmbedConfig::builder().frame_interval(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroFrameInterval
        );
        assert_eq!(
            EmbedConfig::builder().dispatch_interval(Duration::ZERO).build().unwrap_err(),
            ConfigError::ZeroDispatchInterval
        );
        assert!(matches!(
            EmbedConfig::builder().default_dpi(f64::NAN).build(),
            Err(ConfigError::InvalidDpi(_))
        ));
        assert_eq!(
            EmbedConfig::builder().default_dpi(-1.0).build().unwrap_err(),
            ConfigError::InvalidDpi(-1.0)
        );
        assert_eq!(EmbedConfig::builder().command_capacity(0).build().unwrap_err(), ConfigError::ZeroCapacity);
        assert_eq!(EmbedConfig::builder().max_workers(0).build().unwrap_err(), ConfigError::ZeroWorkers);
    }

    #[test]
    fn builder_keeps_defaults_for_untouched_fields() {
        let cfg = EmbedConfig::builder()
            .background_color(0xff00_00ff)
            .resize_policy(ResizePolicy::Rebind)
            .build()
            .unwrap();
        assert_eq!(cfg.background_color, 0xff00_00ff);
        assert_eq!(cfg.resize_policy, ResizePolicy::Rebind);
        assert_eq!(cfg.frame_interval, DEFAULT_FRAME_INTERVAL);
        assert_eq!(cfg.command_capacity, 16);
    }

    #[test]
    fn json_is_parsed_and_validated() {
        let cfg = EmbedConfig::from_json_str(
            r#"{ "dispatch_interval_ms": 10, "resize_policy": "rebind", "default_dpi": 1.5 }"#,
        )
        .unwrap();
        assert_eq!(cfg.dispatch_interval, Duration::from_millis(10));
        assert_eq!(cfg.resize_policy, ResizePolicy::Rebind);
        assert_eq!(cfg.default_dpi, 1.5);

        assert_eq!(
            EmbedConfig::from_json_str(r#"{ "frame_interval_ms": 0 }"#).unwrap_err(),
            ConfigError::ZeroFrameInterval
        );
        assert!(matches!(EmbedConfig::from_json_str("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn json_file_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "max_workers": 2 }}"#).unwrap();

        let cfg = EmbedConfig::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.max_workers, 2);

        let missing = file.path().with_extension("missing");
        assert!(matches!(EmbedConfig::from_json_file(missing), Err(ConfigError::Io(_))));
    }
}
