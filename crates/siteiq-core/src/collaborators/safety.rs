//! Safety and quality collaborator

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::response::Severity;
use crate::types::Timestamp;

/// Direction of an incident/defect rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Stable,
    Worsening,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyTrendAnalysis {
    pub incident_count: u32,
    pub near_miss_count: u32,
    pub trend: TrendDirection,
    pub confidence: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTrendAnalysis {
    pub defect_count: u32,
    pub rework_rate: f64,
    pub trend: TrendDirection,
    pub confidence: f64,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardDetection {
    pub hazard_type: String,
    pub description: String,
    pub severity: Severity,
    pub confidence: f64,
    #[serde(default)]
    pub location: Option<String>,
}

#[async_trait]
pub trait SafetyQualityCollaborator: Send + Sync {
    async fn analyze_safety_trends(
        &self,
        project_id: &str,
        since: Timestamp,
    ) -> Result<SafetyTrendAnalysis, CollaboratorError>;

    async fn analyze_quality_trends(
        &self,
        project_id: &str,
        since: Timestamp,
    ) -> Result<QualityTrendAnalysis, CollaboratorError>;

    async fn detect_hazards_from_text(
        &self,
        project_id: &str,
        text: &str,
    ) -> Result<Vec<HazardDetection>, CollaboratorError>;
}
