//! Context collaborator: user state, project state and project-level signals

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::response::Severity;
use crate::types::{Timestamp, ValueMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: String,
    pub display_name: String,
    pub role: String,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub recent_queries: Vec<String>,
    #[serde(default)]
    pub preferences: ValueMap,
}

/// Direction of the project's overall health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub category: String,
    pub description: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectHealth {
    /// Overall score in [0, 1]
    pub score: f64,
    pub trend: HealthTrend,
    #[serde(default)]
    pub issues: Vec<HealthIssue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectContext {
    pub project_id: String,
    pub name: String,
    pub phase: String,
    pub health: ProjectHealth,
    #[serde(default)]
    pub active_activities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub category: String,
    pub priority: Severity,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedAction {
    pub action: String,
    pub probability: f64,
    #[serde(default)]
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    pub detected_at: Timestamp,
}

/// User and project state
#[async_trait]
pub trait ContextCollaborator: Send + Sync {
    async fn get_user_context(&self, user_id: &str) -> Result<UserContext, CollaboratorError>;

    async fn get_project_context(&self, project_id: &str)
        -> Result<ProjectContext, CollaboratorError>;

    async fn get_contextual_recommendations(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<Recommendation>, CollaboratorError>;

    async fn predict_next_actions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PredictedAction>, CollaboratorError>;

    async fn detect_anomalies(&self, project_id: &str) -> Result<Vec<Anomaly>, CollaboratorError>;
}
