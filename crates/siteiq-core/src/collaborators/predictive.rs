//! Predictive collaborator: schedule delay and risk forecasting

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::response::PredictionTrend;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulePrediction {
    pub activity: String,
    pub predicted_delay_days: f64,
    /// Probability that the delay materialises
    pub probability: f64,
    pub confidence: f64,
    pub trend: PredictionTrend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub category: String,
    pub description: String,
    pub probability: f64,
    /// Impact in [0, 1]
    pub impact: f64,
    pub confidence: f64,
}

impl RiskPrediction {
    pub fn exposure(&self) -> f64 {
        self.probability * self.impact
    }
}

#[async_trait]
pub trait PredictiveCollaborator: Send + Sync {
    async fn predict_schedule(
        &self,
        project_id: &str,
        activities: &[String],
    ) -> Result<Vec<SchedulePrediction>, CollaboratorError>;

    async fn predict_risks(&self, project_id: &str)
        -> Result<Vec<RiskPrediction>, CollaboratorError>;
}
