//! Deterministic collaborators backed by a project snapshot
//!
//! [`SnapshotBackend`] serves every collaborator trait from a
//! [`ProjectSnapshot`]: a serialised dataset of users, projects, forecasts,
//! safety records and a knowledge graph. Same snapshot and same input always
//! give the same output, so the backend doubles as a fixed test fake.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

use super::context::{
    Anomaly, ContextCollaborator, HealthIssue, HealthTrend, PredictedAction, ProjectContext,
    ProjectHealth, Recommendation, UserContext,
};
use super::graph::{Edge, KnowledgeGraphCollaborator, Node, Subgraph};
use super::predictive::{PredictiveCollaborator, RiskPrediction, SchedulePrediction};
use super::safety::{
    HazardDetection, QualityTrendAnalysis, SafetyQualityCollaborator, SafetyTrendAnalysis,
    TrendDirection,
};
use super::semantic::{DetectedIntent, Entity, SemanticAnalysis, SemanticCollaborator, Sentiment};
use crate::error::{CollaboratorError, Result};
use crate::response::{PredictionTrend, Severity};
use crate::types::{now, Timestamp, Value, ValueMap};

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "with", "what", "how", "why", "when", "who", "which",
    "does", "this", "that", "there", "our", "near", "from", "into", "about", "any", "all",
    "can", "has", "have", "will", "should", "is", "of", "to", "in", "on", "at", "a", "an",
];

const QUESTION_OPENERS: &[&str] = &[
    "what", "how", "why", "when", "who", "which", "is", "are", "does", "do", "can",
];

const URGENT_TERMS: &[&str] = &["urgent", "immediately", "asap", "emergency", "critical", "now"];

const NEGATIVE_TERMS: &[&str] = &[
    "delay", "delayed", "failure", "incident", "injury", "defect", "clash", "problem", "risk",
    "collapse",
];

/// A term the semantic analyzer recognises as an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyTerm {
    pub term: String,
    pub kind: String,
}

/// Keyword rule used for hazard detection from free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardRule {
    pub keyword: String,
    pub hazard_type: String,
    pub severity: Severity,
    pub confidence: f64,
}

/// Serialised project dataset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    #[serde(default)]
    pub users: Vec<UserContext>,
    #[serde(default)]
    pub projects: Vec<ProjectContext>,
    /// Keyed by project id
    #[serde(default)]
    pub recommendations: BTreeMap<String, Vec<Recommendation>>,
    /// Keyed by user id
    #[serde(default)]
    pub next_actions: BTreeMap<String, Vec<PredictedAction>>,
    #[serde(default)]
    pub anomalies: BTreeMap<String, Vec<Anomaly>>,
    #[serde(default)]
    pub schedule: BTreeMap<String, Vec<SchedulePrediction>>,
    #[serde(default)]
    pub risks: BTreeMap<String, Vec<RiskPrediction>>,
    #[serde(default)]
    pub safety: BTreeMap<String, SafetyTrendAnalysis>,
    #[serde(default)]
    pub quality: BTreeMap<String, QualityTrendAnalysis>,
    #[serde(default)]
    pub hazard_rules: Vec<HazardRule>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyTerm>,
    #[serde(default)]
    pub graph: Subgraph,
}

impl ProjectSnapshot {
    /// Load a snapshot; `.toml` files are parsed as TOML, anything else as JSON
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let snapshot = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        Ok(snapshot)
    }

    /// Built-in demo dataset: one hospital project mid-structure
    pub fn demo() -> Self {
        let project = "P1".to_string();
        let user = "u-1".to_string();

        let mut recommendations = BTreeMap::new();
        recommendations.insert(
            project.clone(),
            vec![
                Recommendation {
                    title: "Resequence east wing pours".to_string(),
                    description: "Pour level 2 slab before MEP rough-in to recover float"
                        .to_string(),
                    category: "schedule".to_string(),
                    priority: Severity::High,
                    confidence: 0.78,
                },
                Recommendation {
                    title: "Add fall-protection toolbox talk".to_string(),
                    description: "Near misses at the east wing scaffold rose this month"
                        .to_string(),
                    category: "safety".to_string(),
                    priority: Severity::Medium,
                    confidence: 0.72,
                },
            ],
        );

        let mut next_actions = BTreeMap::new();
        next_actions.insert(
            user.clone(),
            vec![
                PredictedAction {
                    action: "Review RFI backlog".to_string(),
                    probability: 0.64,
                    rationale: "Opened 3 RFIs this week".to_string(),
                },
                PredictedAction {
                    action: "Approve concrete submittal".to_string(),
                    probability: 0.52,
                    rationale: String::new(),
                },
            ],
        );

        let mut anomalies = BTreeMap::new();
        anomalies.insert(
            project.clone(),
            vec![Anomaly {
                kind: "cost".to_string(),
                description: "Rebar cost 18% above trailing average".to_string(),
                severity: Severity::Medium,
                confidence: 0.7,
                detected_at: now(),
            }],
        );

        let mut schedule = BTreeMap::new();
        schedule.insert(
            project.clone(),
            vec![
                SchedulePrediction {
                    activity: "Foundation".to_string(),
                    predicted_delay_days: 6.0,
                    probability: 0.68,
                    confidence: 0.74,
                    trend: PredictionTrend::AtRisk,
                },
                SchedulePrediction {
                    activity: "Framing".to_string(),
                    predicted_delay_days: 0.0,
                    probability: 0.2,
                    confidence: 0.81,
                    trend: PredictionTrend::OnTrack,
                },
                SchedulePrediction {
                    activity: "MEP rough-in".to_string(),
                    predicted_delay_days: 11.0,
                    probability: 0.55,
                    confidence: 0.62,
                    trend: PredictionTrend::Delayed,
                },
            ],
        );

        let mut risks = BTreeMap::new();
        risks.insert(
            project.clone(),
            vec![
                RiskPrediction {
                    category: "weather".to_string(),
                    description: "Forecast rain during foundation pours".to_string(),
                    probability: 0.74,
                    impact: 0.6,
                    confidence: 0.7,
                },
                RiskPrediction {
                    category: "supply".to_string(),
                    description: "Curtain wall lead time slipping".to_string(),
                    probability: 0.41,
                    impact: 0.8,
                    confidence: 0.66,
                },
            ],
        );

        let mut safety = BTreeMap::new();
        safety.insert(
            project.clone(),
            SafetyTrendAnalysis {
                incident_count: 2,
                near_miss_count: 9,
                trend: TrendDirection::Worsening,
                confidence: 0.77,
                summary: "Near misses up 40% over the window, concentrated at scaffolds"
                    .to_string(),
            },
        );

        let mut quality = BTreeMap::new();
        quality.insert(
            project.clone(),
            QualityTrendAnalysis {
                defect_count: 14,
                rework_rate: 0.06,
                trend: TrendDirection::Stable,
                confidence: 0.71,
                summary: "Defect rate flat; most open items are finish punch-list".to_string(),
            },
        );

        let node = |id: &str, node_type: &str, label: &str| Node {
            id: id.to_string(),
            node_type: node_type.to_string(),
            label: label.to_string(),
            properties: ValueMap::new(),
        };
        let edge = |from: &str, to: &str, relation: &str| Edge {
            from: from.to_string(),
            to: to.to_string(),
            relation: relation.to_string(),
        };

        let mut clash = node("n-clash-17", "clash", "Duct/beam clash near east wing grid E4");
        clash
            .properties
            .insert("status".to_string(), Value::from("open"));

        Self {
            users: vec![UserContext {
                user_id: user,
                display_name: "Dana Reyes".to_string(),
                role: "project_manager".to_string(),
                expertise: vec!["concrete".to_string(), "scheduling".to_string()],
                recent_queries: Vec::new(),
                preferences: ValueMap::new(),
            }],
            projects: vec![ProjectContext {
                project_id: project,
                name: "Riverside Medical Center".to_string(),
                phase: "structure".to_string(),
                health: ProjectHealth {
                    score: 0.58,
                    trend: HealthTrend::Declining,
                    issues: vec![
                        HealthIssue {
                            category: "schedule".to_string(),
                            description: "Foundation pours 6 days behind baseline".to_string(),
                            severity: Severity::High,
                        },
                        HealthIssue {
                            category: "coordination".to_string(),
                            description: "Open MEP clashes in east wing".to_string(),
                            severity: Severity::Medium,
                        },
                    ],
                },
                active_activities: vec![
                    "Foundation".to_string(),
                    "Framing".to_string(),
                    "MEP rough-in".to_string(),
                ],
            }],
            recommendations,
            next_actions,
            anomalies,
            schedule,
            risks,
            safety,
            quality,
            hazard_rules: default_hazard_rules(),
            vocabulary: vec![
                VocabularyTerm {
                    term: "foundation".to_string(),
                    kind: "element".to_string(),
                },
                VocabularyTerm {
                    term: "east wing".to_string(),
                    kind: "zone".to_string(),
                },
                VocabularyTerm {
                    term: "clash".to_string(),
                    kind: "issue".to_string(),
                },
                VocabularyTerm {
                    term: "scaffold".to_string(),
                    kind: "equipment".to_string(),
                },
            ],
            graph: Subgraph {
                nodes: vec![
                    node("n-east-wing", "zone", "East wing"),
                    node("n-foundation", "element", "Foundation"),
                    node("n-slab-l2", "element", "Level 2 slab"),
                    clash,
                    node("n-rfi-42", "rfi", "RFI 42: east wing duct routing"),
                ],
                edges: vec![
                    edge("n-foundation", "n-east-wing", "located_in"),
                    edge("n-slab-l2", "n-east-wing", "located_in"),
                    edge("n-clash-17", "n-east-wing", "located_in"),
                    edge("n-rfi-42", "n-clash-17", "addresses"),
                ],
            },
        }
    }
}

fn default_hazard_rules() -> Vec<HazardRule> {
    let rule = |keyword: &str, hazard_type: &str, severity: Severity, confidence: f64| HazardRule {
        keyword: keyword.to_string(),
        hazard_type: hazard_type.to_string(),
        severity,
        confidence,
    };
    vec![
        rule("scaffold", "fall_from_height", Severity::High, 0.8),
        rule("ladder", "fall_from_height", Severity::Medium, 0.7),
        rule("trench", "cave_in", Severity::High, 0.82),
        rule("excavation", "cave_in", Severity::High, 0.75),
        rule("crane", "struck_by", Severity::High, 0.78),
        rule("live wire", "electrical", Severity::Critical, 0.85),
        rule("electrical", "electrical", Severity::Medium, 0.6),
    ]
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Snapshot-backed implementation of every collaborator trait
#[derive(Debug, Clone)]
pub struct SnapshotBackend {
    snapshot: ProjectSnapshot,
}

impl SnapshotBackend {
    pub fn new(snapshot: ProjectSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &ProjectSnapshot {
        &self.snapshot
    }

    fn project(&self, project_id: &str) -> std::result::Result<&ProjectContext, CollaboratorError> {
        self.snapshot
            .projects
            .iter()
            .find(|p| p.project_id == project_id)
            .ok_or_else(|| CollaboratorError::NotFound(format!("project {}", project_id)))
    }

    fn extract_entities(&self, lowered: &str) -> Vec<Entity> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();

        for term in &self.snapshot.vocabulary {
            let needle = term.term.to_lowercase();
            if lowered.contains(&needle) && seen.insert(needle.clone()) {
                let confidence = if needle.contains(' ') { 0.9 } else { 0.8 };
                entities.push(Entity {
                    text: term.term.clone(),
                    kind: term.kind.clone(),
                    confidence,
                });
            }
        }

        for node in &self.snapshot.graph.nodes {
            let needle = node.label.to_lowercase();
            if lowered.contains(&needle) && seen.insert(needle) {
                entities.push(Entity {
                    text: node.label.clone(),
                    kind: node.node_type.clone(),
                    confidence: 0.85,
                });
            }
        }

        entities
    }
}

impl Default for SnapshotBackend {
    fn default() -> Self {
        Self::new(ProjectSnapshot::demo())
    }
}

#[async_trait]
impl ContextCollaborator for SnapshotBackend {
    async fn get_user_context(&self, user_id: &str) -> std::result::Result<UserContext, CollaboratorError> {
        self.snapshot
            .users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("user {}", user_id)))
    }

    async fn get_project_context(
        &self,
        project_id: &str,
    ) -> std::result::Result<ProjectContext, CollaboratorError> {
        self.project(project_id).cloned()
    }

    async fn get_contextual_recommendations(
        &self,
        _user_id: &str,
        project_id: &str,
    ) -> std::result::Result<Vec<Recommendation>, CollaboratorError> {
        Ok(self
            .snapshot
            .recommendations
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn predict_next_actions(
        &self,
        user_id: &str,
    ) -> std::result::Result<Vec<PredictedAction>, CollaboratorError> {
        Ok(self
            .snapshot
            .next_actions
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn detect_anomalies(&self, project_id: &str) -> std::result::Result<Vec<Anomaly>, CollaboratorError> {
        Ok(self
            .snapshot
            .anomalies
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl SemanticCollaborator for SnapshotBackend {
    async fn analyze(&self, text: &str) -> std::result::Result<SemanticAnalysis, CollaboratorError> {
        let lowered = text.to_lowercase();
        let tokens = tokenize(text);

        let mut seen = HashSet::new();
        let keywords: Vec<String> = tokens
            .iter()
            .filter(|t| t.len() >= 3 && !STOPWORDS.contains(&t.as_str()))
            .filter(|t| seen.insert(t.to_string()))
            .cloned()
            .collect();

        let mut intents = Vec::new();
        let opens_as_question = tokens
            .first()
            .map(|t| QUESTION_OPENERS.contains(&t.as_str()))
            .unwrap_or(false);
        if opens_as_question || text.trim_end().ends_with('?') {
            intents.push(DetectedIntent {
                label: "query".to_string(),
                confidence: 0.7,
            });
        }
        if tokens.iter().any(|t| t.starts_with("analy")) {
            intents.push(DetectedIntent {
                label: "analyze".to_string(),
                confidence: 0.75,
            });
        }
        if tokens.iter().any(|t| t == "predict" || t == "forecast") {
            intents.push(DetectedIntent {
                label: "predict".to_string(),
                confidence: 0.8,
            });
        }

        let urgent = tokens.iter().filter(|t| URGENT_TERMS.contains(&t.as_str())).count();
        let negative = tokens.iter().filter(|t| NEGATIVE_TERMS.contains(&t.as_str())).count();
        let sentiment = Sentiment {
            polarity: (-0.2 * negative as f64).max(-1.0),
            urgency: if urgent == 0 {
                0.1
            } else {
                (0.3 + 0.35 * urgent as f64).min(1.0)
            },
        };

        Ok(SemanticAnalysis {
            entities: self.extract_entities(&lowered),
            intents,
            keywords,
            sentiment,
        })
    }
}

#[async_trait]
impl PredictiveCollaborator for SnapshotBackend {
    async fn predict_schedule(
        &self,
        project_id: &str,
        activities: &[String],
    ) -> std::result::Result<Vec<SchedulePrediction>, CollaboratorError> {
        let predictions = self
            .snapshot
            .schedule
            .get(project_id)
            .cloned()
            .unwrap_or_default();
        if activities.is_empty() {
            return Ok(predictions);
        }
        let wanted: Vec<String> = activities.iter().map(|a| a.to_lowercase()).collect();
        Ok(predictions
            .into_iter()
            .filter(|p| wanted.contains(&p.activity.to_lowercase()))
            .collect())
    }

    async fn predict_risks(
        &self,
        project_id: &str,
    ) -> std::result::Result<Vec<RiskPrediction>, CollaboratorError> {
        Ok(self.snapshot.risks.get(project_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl SafetyQualityCollaborator for SnapshotBackend {
    async fn analyze_safety_trends(
        &self,
        project_id: &str,
        _since: Timestamp,
    ) -> std::result::Result<SafetyTrendAnalysis, CollaboratorError> {
        self.snapshot
            .safety
            .get(project_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("safety records for {}", project_id)))
    }

    async fn analyze_quality_trends(
        &self,
        project_id: &str,
        _since: Timestamp,
    ) -> std::result::Result<QualityTrendAnalysis, CollaboratorError> {
        self.snapshot
            .quality
            .get(project_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(format!("quality records for {}", project_id)))
    }

    async fn detect_hazards_from_text(
        &self,
        project_id: &str,
        text: &str,
    ) -> std::result::Result<Vec<HazardDetection>, CollaboratorError> {
        let lowered = text.to_lowercase();
        let location = self
            .extract_entities(&lowered)
            .into_iter()
            .find(|e| e.kind == "zone")
            .map(|e| e.text);

        Ok(self
            .snapshot
            .hazard_rules
            .iter()
            .filter(|rule| lowered.contains(&rule.keyword.to_lowercase()))
            .map(|rule| HazardDetection {
                hazard_type: rule.hazard_type.clone(),
                description: format!(
                    "'{}' mentioned in a query about project {}",
                    rule.keyword, project_id
                ),
                severity: rule.severity,
                confidence: rule.confidence,
                location: location.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl KnowledgeGraphCollaborator for SnapshotBackend {
    async fn search_nodes(
        &self,
        node_type: Option<&str>,
        label_contains: Option<&str>,
        limit: usize,
    ) -> std::result::Result<Vec<Node>, CollaboratorError> {
        let needle = label_contains.map(str::to_lowercase);
        Ok(self
            .snapshot
            .graph
            .nodes
            .iter()
            .filter(|n| node_type.map_or(true, |t| n.node_type.eq_ignore_ascii_case(t)))
            .filter(|n| {
                needle
                    .as_deref()
                    .map_or(true, |needle| n.label.to_lowercase().contains(needle))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_connected_subgraph(
        &self,
        node_id: &str,
        depth: usize,
        limit: usize,
    ) -> std::result::Result<Subgraph, CollaboratorError> {
        let graph = &self.snapshot.graph;
        if !graph.nodes.iter().any(|n| n.id == node_id) {
            return Err(CollaboratorError::NotFound(format!("node {}", node_id)));
        }

        // Breadth-first over undirected edges
        let mut visited: Vec<String> = vec![node_id.to_string()];
        let mut queue = VecDeque::from([(node_id.to_string(), 0usize)]);
        while let Some((current, distance)) = queue.pop_front() {
            if distance >= depth {
                continue;
            }
            for edge in &graph.edges {
                let next = if edge.from == current {
                    &edge.to
                } else if edge.to == current {
                    &edge.from
                } else {
                    continue;
                };
                if visited.len() >= limit {
                    break;
                }
                if !visited.contains(next) {
                    visited.push(next.clone());
                    queue.push_back((next.clone(), distance + 1));
                }
            }
        }

        let nodes: Vec<Node> = visited
            .iter()
            .filter_map(|id| graph.nodes.iter().find(|n| &n.id == id).cloned())
            .collect();
        let edges: Vec<Edge> = graph
            .edges
            .iter()
            .filter(|e| visited.contains(&e.from) && visited.contains(&e.to))
            .cloned()
            .collect();

        Ok(Subgraph { nodes, edges })
    }
}
