//! Queries, intents and the per-query lifecycle
//!
//! A [`Query`] is built by the caller and handed to the orchestrator, which
//! owns it until a response is produced. [`QueryState`] tracks where a query
//! is in its lifecycle; transitions are one-directional and checked against
//! a fixed table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

use crate::collaborators::Layer;
use crate::error::{Result, SiteIqError};
use crate::types::{Value, ValueMap};

/// Default per-query response budget
pub const DEFAULT_MAX_RESPONSE_TIME: Duration = Duration::from_secs(30);

/// Classified purpose of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Command,
    Analysis,
    Prediction,
    Recommendation,
    Alert,
    Search,
    Comparison,
}

impl Intent {
    /// All intents, in declaration order
    pub const ALL: [Intent; 8] = [
        Intent::Question,
        Intent::Command,
        Intent::Analysis,
        Intent::Prediction,
        Intent::Recommendation,
        Intent::Alert,
        Intent::Search,
        Intent::Comparison,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::Question => "question",
            Intent::Command => "command",
            Intent::Analysis => "analysis",
            Intent::Prediction => "prediction",
            Intent::Recommendation => "recommendation",
            Intent::Alert => "alert",
            Intent::Search => "search",
            Intent::Comparison => "comparison",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Intent {
    type Err = SiteIqError;

    fn from_str(s: &str) -> Result<Self> {
        Intent::ALL
            .into_iter()
            .find(|intent| intent.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SiteIqError::InvalidQuery(format!("unknown intent '{}'", s)))
    }
}

/// Caller-assigned urgency of a query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A free-form question about a construction project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Unique query identifier
    pub id: Uuid,

    /// Requesting user
    pub user_id: String,

    /// Project the query is about
    pub project_id: String,

    /// Raw query text
    pub text: String,

    /// Intent chosen by the caller, overrides classification
    #[serde(default)]
    pub explicit_intent: Option<Intent>,

    /// Typed parameters (`since_days`, `activities`, ...)
    #[serde(default)]
    pub parameters: ValueMap,

    /// Layers the caller expects to contribute
    #[serde(default)]
    pub required_layers: BTreeSet<String>,

    /// Hard deadline for the whole query, measured from submission
    #[serde(default = "default_max_response_time", with = "crate::types::duration_millis")]
    pub max_response_time: Duration,

    /// Caller-assigned priority
    #[serde(default)]
    pub priority: Priority,
}

fn default_max_response_time() -> Duration {
    DEFAULT_MAX_RESPONSE_TIME
}

impl Query {
    /// Start building a query
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// Look up a parameter by name
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    /// Reject queries that cannot be processed
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(SiteIqError::InvalidQuery("user_id is empty".to_string()));
        }
        if self.project_id.trim().is_empty() {
            return Err(SiteIqError::InvalidQuery("project_id is empty".to_string()));
        }
        if self.text.trim().is_empty() {
            return Err(SiteIqError::InvalidQuery("text is empty".to_string()));
        }
        if self.max_response_time.is_zero() {
            return Err(SiteIqError::InvalidQuery(
                "max_response_time must be positive".to_string(),
            ));
        }
        if let Some(unknown) = self
            .required_layers
            .iter()
            .find(|name| Layer::from_str(name).is_err())
        {
            return Err(SiteIqError::InvalidQuery(format!(
                "unknown required layer '{}'",
                unknown
            )));
        }
        Ok(())
    }
}

/// Builder for [`Query`]
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    id: Option<Uuid>,
    user_id: String,
    project_id: String,
    text: String,
    explicit_intent: Option<Intent>,
    parameters: ValueMap,
    required_layers: BTreeSet<String>,
    max_response_time: Option<Duration>,
    priority: Priority,
}

impl QueryBuilder {
    pub fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = project_id.into();
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn intent(mut self, intent: Intent) -> Self {
        self.explicit_intent = Some(intent);
        self
    }

    pub fn parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn require_layer(mut self, layer: impl Into<String>) -> Self {
        self.required_layers.insert(layer.into());
        self
    }

    pub fn max_response_time(mut self, budget: Duration) -> Self {
        self.max_response_time = Some(budget);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Build the query. Validation happens at submission, not here.
    pub fn build(self) -> Query {
        Query {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: self.user_id,
            project_id: self.project_id,
            text: self.text,
            explicit_intent: self.explicit_intent,
            parameters: self.parameters,
            required_layers: self.required_layers,
            max_response_time: self.max_response_time.unwrap_or(DEFAULT_MAX_RESPONSE_TIME),
            priority: self.priority,
        }
    }
}

/// Lifecycle state of a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryState {
    Submitted,
    AdmissionPending,
    MandatoryAnalysis,
    IntentDispatch,
    Synthesizing,
    Assembling,
    Completed,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn can_transition_to(self, next: QueryState) -> bool {
        use QueryState::*;
        match (self, next) {
            (Submitted, AdmissionPending) | (Submitted, Failed) => true,
            (AdmissionPending, MandatoryAnalysis)
            | (AdmissionPending, Failed)
            | (AdmissionPending, Cancelled) => true,
            (MandatoryAnalysis, IntentDispatch)
            | (MandatoryAnalysis, Failed)
            | (MandatoryAnalysis, Cancelled) => true,
            (IntentDispatch, Synthesizing)
            | (IntentDispatch, Failed)
            | (IntentDispatch, Cancelled) => true,
            (Synthesizing, Assembling) => true,
            (Assembling, Completed) | (Assembling, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            QueryState::Completed | QueryState::Failed | QueryState::Cancelled
        )
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Tracks one query through its states, refusing illegal moves
#[derive(Debug, Clone)]
pub struct QueryLifecycle {
    query_id: Uuid,
    state: QueryState,
}

impl QueryLifecycle {
    pub fn new(query_id: Uuid) -> Self {
        Self {
            query_id,
            state: QueryState::Submitted,
        }
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn advance(&mut self, next: QueryState) -> Result<QueryState> {
        if !self.state.can_transition_to(next) {
            return Err(SiteIqError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(query_id = %self.query_id, from = %self.state, to = %next, "query state");
        self.state = next;
        Ok(next)
    }
}
