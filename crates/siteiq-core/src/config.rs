//! Orchestrator configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SiteIqError};

/// Default admission capacity
pub const DEFAULT_MAX_CONCURRENT_QUERIES: usize = 10;

/// Default per-call collaborator timeout
pub const DEFAULT_LAYER_TIMEOUT: Duration = Duration::from_secs(10);

/// Main orchestrator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Maximum number of queries processed at once
    pub max_concurrent_queries: usize,

    /// Upper bound for any single collaborator call, in milliseconds
    pub layer_timeout_ms: u64,

    /// Health registry settings
    pub health: HealthSettings,

    /// Fan-out limits and alert thresholds
    pub dispatch: DispatchSettings,

    /// Event bus settings
    pub events: EventSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: DEFAULT_MAX_CONCURRENT_QUERIES,
            layer_timeout_ms: DEFAULT_LAYER_TIMEOUT.as_millis() as u64,
            health: HealthSettings::default(),
            dispatch: DispatchSettings::default(),
            events: EventSettings::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set admission capacity
    pub fn with_max_concurrent_queries(mut self, max: usize) -> Self {
        self.max_concurrent_queries = max;
        self
    }

    /// Set the per-call timeout
    pub fn with_layer_timeout(mut self, timeout: Duration) -> Self {
        self.layer_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_health(mut self, health: HealthSettings) -> Self {
        self.health = health;
        self
    }

    pub fn with_dispatch(mut self, dispatch: DispatchSettings) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.events.channel_capacity = capacity;
        self
    }

    pub fn layer_timeout(&self) -> Duration {
        Duration::from_millis(self.layer_timeout_ms)
    }

    /// Load configuration from a file; `.toml` is parsed as TOML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration as pretty JSON
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the orchestrator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_queries == 0 {
            return Err(SiteIqError::InvalidConfig(
                "max_concurrent_queries must be at least 1".to_string(),
            ));
        }
        if self.layer_timeout_ms == 0 {
            return Err(SiteIqError::InvalidConfig(
                "layer_timeout_ms must be positive".to_string(),
            ));
        }
        if self.health.window == 0 {
            return Err(SiteIqError::InvalidConfig(
                "health.window must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.health.error_rate_threshold) {
            return Err(SiteIqError::InvalidConfig(
                "health.error_rate_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(SiteIqError::InvalidConfig(
                "events.channel_capacity must be at least 1".to_string(),
            ));
        }
        self.dispatch.validate()
    }
}

/// Health registry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSettings {
    /// Number of recent calls the error rate is computed over
    pub window: usize,

    /// A layer is unhealthy once its recent error rate reaches this
    pub error_rate_threshold: f64,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            window: 20,
            error_rate_threshold: 0.5,
        }
    }
}

/// Fan-out limits and alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Entities searched for a question
    pub max_entities: usize,

    /// Keywords searched for a search
    pub max_keywords: usize,

    /// `limit` passed to node searches
    pub graph_search_limit: usize,

    pub subgraph_depth: usize,

    pub subgraph_limit: usize,

    /// Default safety/quality trend window
    pub trend_window_days: u32,

    /// Project health below this raises a `High` alert
    pub health_alert_threshold: f64,

    /// Project health below this raises a `Critical` alert
    pub critical_health_threshold: f64,

    /// Risks at or above this probability raise a `High` alert
    pub risk_alert_probability: f64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            max_entities: 5,
            max_keywords: 5,
            graph_search_limit: 10,
            subgraph_depth: 1,
            subgraph_limit: 25,
            trend_window_days: 30,
            health_alert_threshold: 0.6,
            critical_health_threshold: 0.4,
            risk_alert_probability: 0.7,
        }
    }
}

impl DispatchSettings {
    fn validate(&self) -> Result<()> {
        if self.critical_health_threshold > self.health_alert_threshold {
            return Err(SiteIqError::InvalidConfig(
                "dispatch.critical_health_threshold must not exceed health_alert_threshold"
                    .to_string(),
            ));
        }
        for (name, value) in [
            ("health_alert_threshold", self.health_alert_threshold),
            ("critical_health_threshold", self.critical_health_threshold),
            ("risk_alert_probability", self.risk_alert_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SiteIqError::InvalidConfig(format!(
                    "dispatch.{} must be within [0, 1]",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// Event bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Buffered events per subscriber before new ones are dropped
    pub channel_capacity: usize,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}
