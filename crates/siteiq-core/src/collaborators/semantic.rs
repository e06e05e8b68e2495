//! Semantic collaborator: entity, intent and keyword extraction from text

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    pub kind: String,
    pub confidence: f64,
}

/// Intent label as detected by the semantic collaborator (free-form)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    pub label: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
    /// -1 (negative) .. 1 (positive)
    pub polarity: f64,
    /// 0 (routine) .. 1 (urgent)
    pub urgency: f64,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            polarity: 0.0,
            urgency: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticAnalysis {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub intents: Vec<DetectedIntent>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub sentiment: Sentiment,
}

impl SemanticAnalysis {
    /// Highest-confidence intent; the first one wins a tie
    pub fn primary_intent(&self) -> Option<&DetectedIntent> {
        self.intents.iter().fold(None, |best, candidate| match best {
            Some(current) if current.confidence >= candidate.confidence => Some(current),
            _ => Some(candidate),
        })
    }

    /// Entities ordered by confidence, highest first, truncated to `limit`
    pub fn top_entities(&self, limit: usize) -> Vec<&Entity> {
        let mut entities: Vec<&Entity> = self.entities.iter().collect();
        entities.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        entities.truncate(limit);
        entities
    }
}

#[async_trait]
pub trait SemanticCollaborator: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<SemanticAnalysis, CollaboratorError>;
}
