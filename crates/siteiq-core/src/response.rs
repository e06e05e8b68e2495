//! Response model: result items, per-layer raw results and the composite
//! [`Response`] returned to callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::collaborators::Layer;
use crate::query::Intent;

/// Alert / issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Broad grouping of an insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    General,
    Safety,
    Quality,
    Schedule,
    Knowledge,
    Health,
    Correlation,
    Trend,
}

/// Well-known insight kinds
pub mod insight_kind {
    pub const KNOWLEDGE_MATCH: &str = "knowledge_match";
    pub const GRAPH_NEIGHBORHOOD: &str = "graph_neighborhood";
    pub const PROJECT_HEALTH: &str = "project_health";
    pub const SAFETY_TREND: &str = "safety_trend";
    pub const QUALITY_TREND: &str = "quality_trend";
    pub const CORRELATION: &str = "correlation";
    pub const TREND_ALERT: &str = "trend_alert";
    pub const ESCALATION: &str = "escalation";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightResult {
    pub kind: String,
    pub category: InsightCategory,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub relevance: f64,
    /// Collaborator that produced it; `None` for synthesized insights
    pub source: Option<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Severity,
    pub confidence: f64,
    pub source: Option<Layer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    ScheduleDelay,
    Risk,
    NextAction,
}

/// Direction a predicted quantity is heading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionTrend {
    OnTrack,
    AtRisk,
    Delayed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub kind: PredictionKind,
    pub subject: String,
    pub description: String,
    pub probability: f64,
    pub confidence: f64,
    pub trend: PredictionTrend,
    pub source: Option<Layer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertResult {
    pub severity: Severity,
    pub title: String,
    pub message: String,
    pub source: Option<Layer>,
}

/// Items contributed by one successful collaborator call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerFragment {
    pub insights: Vec<InsightResult>,
    pub recommendations: Vec<RecommendationResult>,
    pub predictions: Vec<PredictionResult>,
    pub alerts: Vec<AlertResult>,
}

impl LayerFragment {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
            && self.recommendations.is_empty()
            && self.predictions.is_empty()
            && self.alerts.is_empty()
    }
}

/// A collaborator call that did not produce a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerFailure {
    pub collaborator: Layer,
    /// Operation that failed, e.g. `search_nodes`
    pub operation: String,
    pub error: String,
}

/// Outcome of exactly one logical collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum RawLayerResult {
    Payload {
        layer: Layer,
        fragment: LayerFragment,
    },
    Failure(LayerFailure),
}

impl RawLayerResult {
    pub fn payload(layer: Layer, fragment: LayerFragment) -> Self {
        RawLayerResult::Payload { layer, fragment }
    }

    pub fn layer(&self) -> Layer {
        match self {
            RawLayerResult::Payload { layer, .. } => *layer,
            RawLayerResult::Failure(failure) => failure.collaborator,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RawLayerResult::Failure(_))
    }
}

/// Terminal status of a processed query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Composite answer to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub query_id: Uuid,
    pub success: bool,
    pub status: QueryStatus,
    pub intent: Option<Intent>,
    pub summary: String,
    pub insights: Vec<InsightResult>,
    pub recommendations: Vec<RecommendationResult>,
    pub predictions: Vec<PredictionResult>,
    pub alerts: Vec<AlertResult>,
    pub confidence: f64,
    #[serde(with = "crate::types::duration_millis")]
    pub processing_time: Duration,
    pub layers_used: BTreeSet<Layer>,
    pub layer_failures: Vec<LayerFailure>,
    pub follow_up: Option<String>,
    pub error: Option<String>,
}

impl Response {
    /// Response for a query that never produced content
    pub(crate) fn unsuccessful(
        query_id: Uuid,
        status: QueryStatus,
        summary: impl Into<String>,
        error: Option<String>,
        processing_time: Duration,
    ) -> Self {
        Self {
            query_id,
            success: false,
            status,
            intent: None,
            summary: summary.into(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            predictions: Vec::new(),
            alerts: Vec::new(),
            confidence: 0.0,
            processing_time,
            layers_used: BTreeSet::new(),
            layer_failures: Vec::new(),
            follow_up: None,
            error,
        }
    }

    pub fn uses_layer(&self, layer: Layer) -> bool {
        self.layers_used.contains(&layer)
    }
}

