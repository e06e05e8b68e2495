//! Per-collaborator health tracking
//!
//! One record per [`Layer`], registered up front and mutated in place after
//! every logical collaborator call that returned. A layer turns unhealthy
//! once its error rate over the last `window` calls reaches the configured
//! threshold, and recovers as successes push failures out of the window.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::collaborators::Layer;
use crate::config::HealthSettings;
use crate::types::{now, Timestamp};

/// Health of one collaborator as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub layer_name: Layer,
    pub healthy: bool,
    #[serde(with = "crate::types::duration_millis")]
    pub last_latency: Duration,
    pub request_count: u64,
    pub error_count: u64,
    /// `None` until the first call returns
    pub last_activity: Option<Timestamp>,
    recent_error_rate: f64,
}

impl HealthRecord {
    fn new(layer: Layer) -> Self {
        Self {
            layer_name: layer,
            healthy: true,
            last_latency: Duration::ZERO,
            request_count: 0,
            error_count: 0,
            last_activity: None,
            recent_error_rate: 0.0,
        }
    }

    /// Error rate over the recent window
    pub fn error_rate(&self) -> f64 {
        self.recent_error_rate
    }
}

#[derive(Debug)]
struct LayerHealth {
    record: HealthRecord,
    /// `true` marks a failed call
    window: VecDeque<bool>,
}

/// Concurrent table of [`HealthRecord`]s keyed by layer
#[derive(Debug)]
pub struct HealthRegistry {
    layers: DashMap<Layer, LayerHealth>,
    settings: HealthSettings,
}

impl HealthRegistry {
    pub fn new(settings: HealthSettings) -> Self {
        let layers = DashMap::new();
        for layer in Layer::ALL {
            layers.insert(
                layer,
                LayerHealth {
                    record: HealthRecord::new(layer),
                    window: VecDeque::with_capacity(settings.window),
                },
            );
        }
        Self { layers, settings }
    }

    /// Record one returned call
    pub fn record(&self, layer: Layer, success: bool, latency: Duration) {
        let window_size = self.settings.window.max(1);
        let threshold = self.settings.error_rate_threshold;

        let mut entry = self.layers.entry(layer).or_insert_with(|| LayerHealth {
            record: HealthRecord::new(layer),
            window: VecDeque::with_capacity(window_size),
        });
        let health = entry.value_mut();

        health.window.push_back(!success);
        while health.window.len() > window_size {
            health.window.pop_front();
        }
        let failures = health.window.iter().filter(|failed| **failed).count();
        let rate = failures as f64 / health.window.len() as f64;

        let record = &mut health.record;
        let was_healthy = record.healthy;
        record.request_count += 1;
        if !success {
            record.error_count += 1;
        }
        record.last_latency = latency;
        record.last_activity = Some(now());
        record.recent_error_rate = rate;
        record.healthy = rate < threshold;

        if was_healthy && !record.healthy {
            tracing::warn!(layer = %layer, error_rate = rate, "collaborator marked unhealthy");
        } else if !was_healthy && record.healthy {
            tracing::info!(layer = %layer, error_rate = rate, "collaborator recovered");
        }
    }

    pub fn get(&self, layer: Layer) -> Option<HealthRecord> {
        self.layers.get(&layer).map(|entry| entry.record.clone())
    }

    /// All records in layer order
    pub fn snapshot(&self) -> Vec<HealthRecord> {
        let mut records: Vec<HealthRecord> =
            self.layers.iter().map(|entry| entry.record.clone()).collect();
        records.sort_by_key(|record| record.layer_name);
        records
    }

    /// `true` when every collaborator is healthy
    pub fn is_healthy(&self) -> bool {
        self.layers.iter().all(|entry| entry.record.healthy)
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new(HealthSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(window: usize, threshold: f64) -> HealthRegistry {
        HealthRegistry::new(HealthSettings {
            window,
            error_rate_threshold: threshold,
        })
    }

    #[test]
    fn test_all_layers_registered() {
        let registry = HealthRegistry::default();
        let records = registry.snapshot();
        assert_eq!(records.len(), Layer::ALL.len());
        assert!(records.iter().all(|r| r.healthy && r.last_activity.is_none()));
        assert!(registry.is_healthy());
    }

    #[test]
    fn test_counts_and_latency() {
        let registry = HealthRegistry::default();
        registry.record(Layer::KnowledgeGraph, true, Duration::from_millis(12));
        registry.record(Layer::KnowledgeGraph, false, Duration::from_millis(40));

        let record = registry.get(Layer::KnowledgeGraph).unwrap();
        assert_eq!(record.request_count, 2);
        assert_eq!(record.error_count, 1);
        assert_eq!(record.last_latency, Duration::from_millis(40));
        assert!(record.last_activity.is_some());
        assert_eq!(record.error_rate(), 0.5);
    }

    #[test]
    fn test_unhealthy_then_recovers() {
        let registry = registry(4, 0.5);
        registry.record(Layer::Predictive, false, Duration::ZERO);
        assert!(!registry.get(Layer::Predictive).unwrap().healthy);
        assert!(!registry.is_healthy());

        for _ in 0..4 {
            registry.record(Layer::Predictive, true, Duration::ZERO);
        }
        let record = registry.get(Layer::Predictive).unwrap();
        assert!(record.healthy);
        assert_eq!(record.error_rate(), 0.0);
        assert_eq!(record.error_count, 1);
        assert!(registry.is_healthy());
    }

    #[test]
    fn test_other_layers_untouched() {
        let registry = HealthRegistry::default();
        registry.record(Layer::Semantic, false, Duration::ZERO);
        let context = registry.get(Layer::Context).unwrap();
        assert_eq!(context.request_count, 0);
        assert!(context.healthy);
    }
}
