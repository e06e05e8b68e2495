//! Collaborator boundary
//!
//! The orchestrator talks to five independent subsystems through the traits
//! in this module. Production backends (ML models, OCR, statistical
//! forecasting) and deterministic fakes implement the same traits; the
//! orchestrator depends on nothing else.
//!
//! ```text
//!                 ┌────────────────────────────┐
//!                 │  IntelligenceOrchestrator  │
//!                 └─────────────┬──────────────┘
//!        ┌──────────┬───────────┼────────────┬────────────────┐
//!        v          v           v            v                v
//!    semantic    context    predictive  safety_quality  knowledge_graph
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::SiteIqError;

pub mod context;
pub mod graph;
pub mod predictive;
pub mod safety;
pub mod semantic;
pub mod snapshot;

pub use context::{
    Anomaly, ContextCollaborator, HealthIssue, HealthTrend, PredictedAction, ProjectContext,
    ProjectHealth, Recommendation, UserContext,
};
pub use graph::{Edge, KnowledgeGraphCollaborator, Node, Subgraph};
pub use predictive::{PredictiveCollaborator, RiskPrediction, SchedulePrediction};
pub use safety::{
    HazardDetection, QualityTrendAnalysis, SafetyQualityCollaborator, SafetyTrendAnalysis,
    TrendDirection,
};
pub use semantic::{DetectedIntent, Entity, SemanticAnalysis, SemanticCollaborator, Sentiment};
pub use snapshot::{ProjectSnapshot, SnapshotBackend};

/// Stable name of a collaborator, as reported in responses and health records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layer {
    Semantic,
    Context,
    Predictive,
    SafetyQuality,
    KnowledgeGraph,
}

impl Layer {
    pub const ALL: [Layer; 5] = [
        Layer::Semantic,
        Layer::Context,
        Layer::Predictive,
        Layer::SafetyQuality,
        Layer::KnowledgeGraph,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Semantic => "semantic",
            Layer::Context => "context",
            Layer::Predictive => "predictive",
            Layer::SafetyQuality => "safety_quality",
            Layer::KnowledgeGraph => "knowledge_graph",
        }
    }

    /// Semantic analysis and context retrieval run for every query
    pub fn is_mandatory(self) -> bool {
        matches!(self, Layer::Semantic | Layer::Context)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = SiteIqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Layer::ALL
            .into_iter()
            .find(|layer| layer.as_str() == s.trim())
            .ok_or_else(|| SiteIqError::InvalidQuery(format!("unknown layer '{}'", s)))
    }
}

/// The full set of collaborators handed to the orchestrator
#[derive(Clone)]
pub struct Collaborators {
    pub context: Arc<dyn ContextCollaborator>,
    pub semantic: Arc<dyn SemanticCollaborator>,
    pub predictive: Arc<dyn PredictiveCollaborator>,
    pub safety: Arc<dyn SafetyQualityCollaborator>,
    pub graph: Arc<dyn KnowledgeGraphCollaborator>,
}

impl Collaborators {
    pub fn new(
        context: Arc<dyn ContextCollaborator>,
        semantic: Arc<dyn SemanticCollaborator>,
        predictive: Arc<dyn PredictiveCollaborator>,
        safety: Arc<dyn SafetyQualityCollaborator>,
        graph: Arc<dyn KnowledgeGraphCollaborator>,
    ) -> Self {
        Self {
            context,
            semantic,
            predictive,
            safety,
            graph,
        }
    }

    /// Use one backend that implements every collaborator trait
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ContextCollaborator
            + SemanticCollaborator
            + PredictiveCollaborator
            + SafetyQualityCollaborator
            + KnowledgeGraphCollaborator
            + 'static,
    {
        Self {
            context: backend.clone(),
            semantic: backend.clone(),
            predictive: backend.clone(),
            safety: backend.clone(),
            graph: backend,
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators")
            .field("layers", &Layer::ALL)
            .finish()
    }
}
