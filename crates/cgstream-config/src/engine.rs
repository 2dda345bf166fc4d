//! Engine settings file.
//!
//! ```toml
//! [scheduler]
//! mode = "async"
//! iterations = 100
//!
//! [events]
//! queue_capacity = 20
//! default_ttl_ms = 50
//! worker_thread = true
//!
//! [logging]
//! filter = "info,cgstream_core=debug"
//! ```
//!
//! Every section and key is optional.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use cgstream_core::EventOutput;
use cgstream_core::event::Event;
use cgstream_core::queue::{EventQueue, MY_QUEUE_MAX_ELEMS};
use cgstream_core::scheduler::ScheduleMode;
use cgstream_registry::GraphDescription;

use crate::error::ConfigError;
use crate::validation::{ValidationError, ValidationResult};

/// Scheduling mode as written in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerMode {
    /// Every scheduled node runs unconditionally.
    Sync,
    /// Nodes that cannot run are skipped.
    Async,
}

impl From<SchedulerMode> for ScheduleMode {
    fn from(mode: SchedulerMode) -> Self {
        match mode {
            SchedulerMode::Sync => ScheduleMode::Sync,
            SchedulerMode::Async => ScheduleMode::Async,
        }
    }
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Overrides the mode stored in the graph description.
    pub mode: Option<SchedulerMode>,
    /// Iteration limit, unbounded when absent.
    pub iterations: Option<u32>,
}

/// `[events]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Messages held per priority class.
    pub queue_capacity: usize,
    /// Time-to-live given to events that have none.
    pub default_ttl_ms: Option<u64>,
    /// Dispatch events on a dedicated thread instead of between iterations.
    pub worker_thread: bool,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            queue_capacity: MY_QUEUE_MAX_ELEMS,
            default_ttl_ms: None,
            worker_thread: true,
        }
    }
}

impl EventConfig {
    /// Default time-to-live as a duration.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_ms.map(Duration::from_millis)
    }

    /// Gives `event` the default time-to-live unless it already has one.
    pub fn apply_ttl(&self, event: Event) -> Event {
        match (event.ttl, self.default_ttl()) {
            (None, Some(ttl)) => event.ttl(ttl),
            _ => event,
        }
    }

    /// Creates a queue sized from this section.
    pub fn event_queue(&self) -> EventQueue {
        EventQueue::with_capacity(self.queue_capacity)
    }

    /// Creates an event output feeding `queue` that stamps the default
    /// time-to-live on what it queues.
    pub fn event_output(&self, queue: Arc<EventQueue>) -> EventOutput {
        EventOutput::with_queue(queue).with_default_ttl(self.default_ttl())
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Runtime settings of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler settings.
    pub scheduler: SchedulerConfig,
    /// Event queue settings.
    pub events: EventConfig,
    /// Log filter.
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "engine configuration loaded");
        Ok(config)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check value ranges.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.events.queue_capacity == 0 {
            return Err(ValidationError::InvalidSetting {
                key: "events.queue_capacity".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ValidationError::InvalidSetting {
                key: "logging.filter".into(),
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Scheduling mode for `desc`, the configured override winning.
    pub fn schedule_mode(&self, desc: &GraphDescription) -> ScheduleMode {
        match self.scheduler.mode {
            Some(mode) => mode.into(),
            None if desc.async_mode => ScheduleMode::Async,
            None => ScheduleMode::Sync,
        }
    }
}
