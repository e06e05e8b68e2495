//! Dispatch router
//!
//! Runs the two mandatory collaborator calls, then the intent-specific
//! fan-out. Every logical collaborator call goes through [`DispatchRouter::call`],
//! which bounds it by the query deadline, the per-call timeout and the
//! query's cancellation token, records health for calls that returned, and
//! turns a collaborator error into a [`LayerFailure`] instead of aborting
//! sibling calls.

use futures::future::{join_all, BoxFuture, FutureExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::collaborators::{
    Collaborators, HazardDetection, Layer, Node, PredictedAction, ProjectContext,
    QualityTrendAnalysis, Recommendation, RiskPrediction, SafetyTrendAnalysis,
    SchedulePrediction, SemanticAnalysis, Subgraph, TrendDirection, UserContext,
};
use crate::config::DispatchSettings;
use crate::error::{CollaboratorError, Result, SiteIqError};
use crate::events::{EventBus, OrchestratorEvent};
use crate::health::HealthRegistry;
use crate::query::{Intent, Query};
use crate::response::{
    insight_kind, AlertResult, InsightCategory, InsightResult, LayerFailure, LayerFragment,
    PredictionKind, PredictionResult, PredictionTrend, RawLayerResult, RecommendationResult,
    Severity,
};
use crate::types::{now, Timestamp};

/// How one wrapped collaborator call ended
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome<T> {
    Ok(T),
    /// The collaborator returned an error or overran the per-call timeout
    Failed(LayerFailure),
    /// The query deadline passed first
    DeadlineExceeded,
    Cancelled,
}

impl<T> CallOutcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U> {
        match self {
            CallOutcome::Ok(value) => CallOutcome::Ok(f(value)),
            CallOutcome::Failed(failure) => CallOutcome::Failed(failure),
            CallOutcome::DeadlineExceeded => CallOutcome::DeadlineExceeded,
            CallOutcome::Cancelled => CallOutcome::Cancelled,
        }
    }
}

/// Per-query bounds shared by every call the query makes
#[derive(Debug, Clone, Copy)]
pub struct CallContext<'a> {
    pub query: &'a Query,
    pub deadline: Instant,
    pub cancel: &'a CancellationToken,
}

impl CallContext<'_> {
    fn timeout_error(&self) -> SiteIqError {
        SiteIqError::Timeout {
            query_id: self.query.id,
            budget: self.query.max_response_time,
        }
    }
}

/// Result of the mandatory phase
#[derive(Debug, Clone, Default)]
pub struct MandatoryOutcome {
    pub semantic: Option<SemanticAnalysis>,
    pub user: Option<UserContext>,
    pub project: Option<ProjectContext>,
    pub results: Vec<RawLayerResult>,
}

type Step = (Layer, CallOutcome<LayerFragment>);

/// Routes a query to its collaborators
pub struct DispatchRouter {
    collaborators: Collaborators,
    health: Arc<HealthRegistry>,
    events: Arc<EventBus>,
    settings: DispatchSettings,
    layer_timeout: Duration,
}

impl std::fmt::Debug for DispatchRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchRouter")
            .field("settings", &self.settings)
            .field("layer_timeout", &self.layer_timeout)
            .finish()
    }
}

impl DispatchRouter {
    pub fn new(
        collaborators: Collaborators,
        health: Arc<HealthRegistry>,
        events: Arc<EventBus>,
        settings: DispatchSettings,
        layer_timeout: Duration,
    ) -> Self {
        Self {
            collaborators,
            health,
            events,
            settings,
            layer_timeout,
        }
    }

    /// Run one logical collaborator call under the query's bounds
    pub async fn call<T, F>(
        &self,
        ctx: &CallContext<'_>,
        layer: Layer,
        operation: &'static str,
        fut: F,
    ) -> CallOutcome<T>
    where
        F: Future<Output = std::result::Result<T, CollaboratorError>>,
    {
        let started = Instant::now();

        let returned = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => return CallOutcome::Cancelled,
            _ = tokio::time::sleep_until(ctx.deadline) => return CallOutcome::DeadlineExceeded,
            result = tokio::time::timeout(self.layer_timeout, fut) => result,
        };

        let latency = started.elapsed();
        let error = match returned {
            Ok(Ok(value)) => {
                self.health.record(layer, true, latency);
                tracing::debug!(layer = %layer, operation, latency_ms = latency.as_millis() as u64, "collaborator call ok");
                return CallOutcome::Ok(value);
            }
            Ok(Err(error)) => error,
            Err(_) => CollaboratorError::Timeout(self.layer_timeout),
        };

        self.health.record(layer, false, latency);
        tracing::warn!(layer = %layer, operation, error = %error, "collaborator call failed");

        let failure = LayerFailure {
            collaborator: layer,
            operation: operation.to_string(),
            error: error.to_string(),
        };
        self.events.publish(OrchestratorEvent::LayerFailed {
            query_id: ctx.query.id,
            failure: failure.clone(),
        });
        CallOutcome::Failed(failure)
    }

    /// Semantic analysis and context retrieval, concurrently
    pub async fn run_mandatory(&self, ctx: &CallContext<'_>) -> Result<MandatoryOutcome> {
        let query = ctx.query;
        let context = &self.collaborators.context;

        let semantic_call = self.call(
            ctx,
            Layer::Semantic,
            "analyze",
            self.collaborators.semantic.analyze(&query.text),
        );
        let context_call = self.call(ctx, Layer::Context, "get_context", async {
            tokio::try_join!(
                context.get_user_context(&query.user_id),
                context.get_project_context(&query.project_id)
            )
        });

        let (semantic, context) = tokio::join!(semantic_call, context_call);

        let mut outcome = MandatoryOutcome::default();
        let semantic_failure = match semantic {
            CallOutcome::Ok(analysis) => {
                outcome.semantic = Some(analysis);
                outcome
                    .results
                    .push(RawLayerResult::payload(Layer::Semantic, LayerFragment::default()));
                None
            }
            CallOutcome::Failed(failure) => {
                outcome.results.push(RawLayerResult::Failure(failure.clone()));
                Some(failure)
            }
            CallOutcome::Cancelled => return Err(SiteIqError::Cancelled(query.id)),
            CallOutcome::DeadlineExceeded => return Err(ctx.timeout_error()),
        };
        let context_failure = match context {
            CallOutcome::Ok((user, project)) => {
                outcome.user = Some(user);
                outcome.project = Some(project);
                outcome
                    .results
                    .push(RawLayerResult::payload(Layer::Context, LayerFragment::default()));
                None
            }
            CallOutcome::Failed(failure) => {
                outcome.results.push(RawLayerResult::Failure(failure.clone()));
                Some(failure)
            }
            CallOutcome::Cancelled => return Err(SiteIqError::Cancelled(query.id)),
            CallOutcome::DeadlineExceeded => return Err(ctx.timeout_error()),
        };

        if let (Some(semantic), Some(context)) = (semantic_failure, context_failure) {
            return Err(SiteIqError::CriticalLayerFailure {
                semantic: semantic.error,
                context: context.error,
            });
        }
        Ok(outcome)
    }

    /// Intent-specific fan-out; waits for every call
    pub async fn dispatch(
        &self,
        ctx: &CallContext<'_>,
        intent: Intent,
        mandatory: &MandatoryOutcome,
    ) -> Result<Vec<RawLayerResult>> {
        let tasks = match intent {
            Intent::Question => self.question_tasks(ctx, mandatory),
            Intent::Command | Intent::Comparison => {
                tracing::info!(intent = %intent, "no specialised handler, routing as question");
                self.question_tasks(ctx, mandatory)
            }
            Intent::Analysis => self.analysis_tasks(ctx),
            Intent::Prediction => self.prediction_tasks(ctx, mandatory),
            Intent::Recommendation => self.recommendation_tasks(ctx),
            Intent::Alert => self.alert_tasks(ctx),
            Intent::Search => self.search_tasks(ctx, mandatory),
        };
        tracing::debug!(intent = %intent, calls = tasks.len(), "dispatching");

        let steps: Vec<Step> = join_all(tasks).await.into_iter().flatten().collect();

        let mut results = Vec::with_capacity(steps.len() + 1);
        if let Some(project) = &mandatory.project {
            let derived = self.context_fragment(intent, project);
            if !derived.is_empty() {
                results.push(RawLayerResult::payload(Layer::Context, derived));
            }
        }

        for (layer, outcome) in steps {
            match outcome {
                CallOutcome::Ok(fragment) => {
                    if layer == Layer::SafetyQuality {
                        for alert in &fragment.alerts {
                            self.events.publish(OrchestratorEvent::HazardDetected {
                                query_id: ctx.query.id,
                                project_id: ctx.query.project_id.clone(),
                                alert: alert.clone(),
                            });
                        }
                    }
                    results.push(RawLayerResult::payload(layer, fragment));
                }
                CallOutcome::Failed(failure) => results.push(RawLayerResult::Failure(failure)),
                CallOutcome::Cancelled => return Err(SiteIqError::Cancelled(ctx.query.id)),
                CallOutcome::DeadlineExceeded => return Err(ctx.timeout_error()),
            }
        }
        Ok(results)
    }

    /// One call whose success is turned into a fragment by `map`
    fn task<'a, T, F, M>(
        &'a self,
        ctx: &'a CallContext<'a>,
        layer: Layer,
        operation: &'static str,
        fut: F,
        map: M,
    ) -> BoxFuture<'a, Vec<Step>>
    where
        T: Send + 'a,
        F: Future<Output = std::result::Result<T, CollaboratorError>> + Send + 'a,
        M: FnOnce(T) -> LayerFragment + Send + 'a,
    {
        async move {
            let outcome = self.call(ctx, layer, operation, fut).await.map(map);
            vec![(layer, outcome)]
        }
        .boxed()
    }

    fn question_tasks<'a>(
        &'a self,
        ctx: &'a CallContext<'a>,
        mandatory: &'a MandatoryOutcome,
    ) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let Some(semantic) = &mandatory.semantic else {
            return Vec::new();
        };
        let graph = &self.collaborators.graph;

        semantic
            .top_entities(self.settings.max_entities)
            .into_iter()
            .map(move |entity| {
                self.task(
                    ctx,
                    Layer::KnowledgeGraph,
                    "search_nodes",
                    graph.search_nodes(None, Some(&entity.text), self.settings.graph_search_limit),
                    move |nodes: Vec<Node>| knowledge_fragment(&entity.text, entity.confidence, &nodes),
                )
            })
            .collect()
    }

    fn analysis_tasks<'a>(&'a self, ctx: &'a CallContext<'a>) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let safety = &self.collaborators.safety;
        let project_id = ctx.query.project_id.as_str();
        let since = self.trend_start(ctx.query);

        vec![
            self.task(
                ctx,
                Layer::SafetyQuality,
                "analyze_safety_trends",
                safety.analyze_safety_trends(project_id, since),
                safety_fragment,
            ),
            self.task(
                ctx,
                Layer::SafetyQuality,
                "analyze_quality_trends",
                safety.analyze_quality_trends(project_id, since),
                quality_fragment,
            ),
        ]
    }

    fn prediction_tasks<'a>(
        &'a self,
        ctx: &'a CallContext<'a>,
        mandatory: &'a MandatoryOutcome,
    ) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let predictive = &self.collaborators.predictive;
        let project_id = ctx.query.project_id.as_str();

        let requested = ctx
            .query
            .parameter("activities")
            .map(|value| value.string_list())
            .unwrap_or_default();
        let activities = if requested.is_empty() {
            mandatory
                .project
                .as_ref()
                .map(|project| project.active_activities.clone())
                .unwrap_or_default()
        } else {
            requested
        };
        let risk_threshold = self.settings.risk_alert_probability;

        vec![
            self.task(
                ctx,
                Layer::Predictive,
                "predict_schedule",
                async move { predictive.predict_schedule(project_id, &activities).await },
                schedule_fragment,
            ),
            self.task(
                ctx,
                Layer::Predictive,
                "predict_risks",
                predictive.predict_risks(project_id),
                move |risks: Vec<RiskPrediction>| risk_fragment(&risks, risk_threshold),
            ),
        ]
    }

    fn recommendation_tasks<'a>(
        &'a self,
        ctx: &'a CallContext<'a>,
    ) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let context = &self.collaborators.context;
        let query = ctx.query;

        vec![
            self.task(
                ctx,
                Layer::Context,
                "get_contextual_recommendations",
                context.get_contextual_recommendations(&query.user_id, &query.project_id),
                recommendations_fragment,
            ),
            self.task(
                ctx,
                Layer::Context,
                "predict_next_actions",
                context.predict_next_actions(&query.user_id),
                next_actions_fragment,
            ),
        ]
    }

    fn alert_tasks<'a>(&'a self, ctx: &'a CallContext<'a>) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let query = ctx.query;

        vec![
            self.task(
                ctx,
                Layer::Context,
                "detect_anomalies",
                self.collaborators.context.detect_anomalies(&query.project_id),
                |anomalies: Vec<crate::collaborators::Anomaly>| LayerFragment {
                    alerts: anomalies
                        .into_iter()
                        .map(|anomaly| AlertResult {
                            severity: anomaly.severity,
                            title: format!("Anomaly: {}", anomaly.kind),
                            message: anomaly.description,
                            source: Some(Layer::Context),
                        })
                        .collect(),
                    ..Default::default()
                },
            ),
            self.task(
                ctx,
                Layer::SafetyQuality,
                "detect_hazards_from_text",
                self.collaborators
                    .safety
                    .detect_hazards_from_text(&query.project_id, &query.text),
                hazards_fragment,
            ),
        ]
    }

    fn search_tasks<'a>(
        &'a self,
        ctx: &'a CallContext<'a>,
        mandatory: &'a MandatoryOutcome,
    ) -> Vec<BoxFuture<'a, Vec<Step>>> {
        let Some(semantic) = &mandatory.semantic else {
            return Vec::new();
        };

        semantic
            .keywords
            .iter()
            .take(self.settings.max_keywords)
            .map(move |keyword| self.keyword_search(ctx, keyword))
            .collect()
    }

    /// Node search for one keyword, then the 1-hop neighbourhood of the best hit
    fn keyword_search<'a>(
        &'a self,
        ctx: &'a CallContext<'a>,
        keyword: &'a str,
    ) -> BoxFuture<'a, Vec<Step>> {
        let graph = &self.collaborators.graph;
        let settings = &self.settings;

        async move {
            let search = self
                .call(
                    ctx,
                    Layer::KnowledgeGraph,
                    "search_nodes",
                    graph.search_nodes(None, Some(keyword), settings.graph_search_limit),
                )
                .await;
            let hits = match search {
                CallOutcome::Ok(hits) => hits,
                other => return vec![(Layer::KnowledgeGraph, other.map(|_| LayerFragment::default()))],
            };

            let mut steps = vec![(Layer::KnowledgeGraph, CallOutcome::Ok(LayerFragment::default()))];
            if let Some(hit) = hits.first() {
                let neighbourhood = self
                    .call(
                        ctx,
                        Layer::KnowledgeGraph,
                        "get_connected_subgraph",
                        graph.get_connected_subgraph(
                            &hit.id,
                            settings.subgraph_depth,
                            settings.subgraph_limit,
                        ),
                    )
                    .await
                    .map(|subgraph| neighbourhood_fragment(keyword, hit, &subgraph));
                steps.push((Layer::KnowledgeGraph, neighbourhood));
            }
            steps
        }
        .boxed()
    }

    /// Items derived from the already-fetched project context, no call needed
    fn context_fragment(&self, intent: Intent, project: &ProjectContext) -> LayerFragment {
        let health = &project.health;
        match intent {
            Intent::Analysis => LayerFragment {
                insights: vec![InsightResult {
                    kind: insight_kind::PROJECT_HEALTH.to_string(),
                    category: InsightCategory::Health,
                    title: format!("{} health at {:.0}%", project.name, health.score * 100.0),
                    description: format!(
                        "Health trend {:?} with {} open issue(s) during {}",
                        health.trend,
                        health.issues.len(),
                        project.phase
                    ),
                    confidence: 0.9,
                    relevance: 0.8,
                    source: Some(Layer::Context),
                }],
                ..Default::default()
            },
            Intent::Recommendation => LayerFragment {
                recommendations: health
                    .issues
                    .iter()
                    .map(|issue| RecommendationResult {
                        title: format!("Address {} issue", issue.category),
                        description: issue.description.clone(),
                        category: issue.category.clone(),
                        priority: issue.severity,
                        confidence: 0.7,
                        source: Some(Layer::Context),
                    })
                    .collect(),
                ..Default::default()
            },
            Intent::Alert => {
                let severity = if health.score < self.settings.critical_health_threshold {
                    Some(Severity::Critical)
                } else if health.score < self.settings.health_alert_threshold {
                    Some(Severity::High)
                } else {
                    None
                };
                LayerFragment {
                    alerts: severity
                        .map(|severity| AlertResult {
                            severity,
                            title: "Project health below threshold".to_string(),
                            message: format!(
                                "{} health score is {:.0}%",
                                project.name,
                                health.score * 100.0
                            ),
                            source: Some(Layer::Context),
                        })
                        .into_iter()
                        .collect(),
                    ..Default::default()
                }
            }
            _ => LayerFragment::default(),
        }
    }

    /// Start of the trend window; `since_days` outside chrono's range falls back to the configured window
    fn trend_start(&self, query: &Query) -> Timestamp {
        let window_start = |days: i64| {
            chrono::Duration::try_days(days).and_then(|span| now().checked_sub_signed(span))
        };

        let requested = query
            .parameter("since_days")
            .and_then(|value| value.as_f64())
            .filter(|days| days.is_finite() && *days >= 0.0);
        if let Some(days) = requested {
            match window_start(days as i64) {
                Some(start) => return start,
                None => tracing::warn!(
                    since_days = days,
                    "since_days out of range, using the configured trend window"
                ),
            }
        }

        window_start(i64::from(self.settings.trend_window_days)).unwrap_or(Timestamp::MIN_UTC)
    }
}

fn knowledge_fragment(entity: &str, confidence: f64, nodes: &[Node]) -> LayerFragment {
    if nodes.is_empty() {
        return LayerFragment::default();
    }
    let labels: Vec<&str> = nodes.iter().map(|node| node.label.as_str()).collect();
    LayerFragment {
        insights: vec![InsightResult {
            kind: insight_kind::KNOWLEDGE_MATCH.to_string(),
            category: InsightCategory::Knowledge,
            title: format!("{} record(s) related to '{}'", nodes.len(), entity),
            description: labels.join("; "),
            confidence,
            relevance: 0.7,
            source: Some(Layer::KnowledgeGraph),
        }],
        ..Default::default()
    }
}

fn neighbourhood_fragment(keyword: &str, hit: &Node, subgraph: &Subgraph) -> LayerFragment {
    let neighbours: Vec<&str> = subgraph
        .neighbors(&hit.id)
        .map(|node| node.label.as_str())
        .collect();
    let description = if neighbours.is_empty() {
        format!("{} ({}) has no connected records", hit.label, hit.node_type)
    } else {
        format!(
            "{} ({}) connects to: {}",
            hit.label,
            hit.node_type,
            neighbours.join("; ")
        )
    };
    LayerFragment {
        insights: vec![InsightResult {
            kind: insight_kind::GRAPH_NEIGHBORHOOD.to_string(),
            category: InsightCategory::Knowledge,
            title: format!("'{}' matches {}", keyword, hit.label),
            description,
            confidence: 0.8,
            relevance: 0.75,
            source: Some(Layer::KnowledgeGraph),
        }],
        ..Default::default()
    }
}

fn worsening_recommendation(area: &str, summary: &str, confidence: f64) -> RecommendationResult {
    RecommendationResult {
        title: format!("Investigate worsening {} trend", area),
        description: summary.to_string(),
        category: area.to_string(),
        priority: Severity::High,
        confidence,
        source: Some(Layer::SafetyQuality),
    }
}

fn safety_fragment(analysis: SafetyTrendAnalysis) -> LayerFragment {
    let mut fragment = LayerFragment {
        insights: vec![InsightResult {
            kind: insight_kind::SAFETY_TREND.to_string(),
            category: InsightCategory::Safety,
            title: format!(
                "Safety trend {:?}: {} incident(s), {} near miss(es)",
                analysis.trend, analysis.incident_count, analysis.near_miss_count
            ),
            description: analysis.summary.clone(),
            confidence: analysis.confidence,
            relevance: 0.85,
            source: Some(Layer::SafetyQuality),
        }],
        ..Default::default()
    };
    if analysis.trend == TrendDirection::Worsening {
        fragment.recommendations.push(worsening_recommendation(
            "safety",
            &analysis.summary,
            analysis.confidence,
        ));
    }
    fragment
}

fn quality_fragment(analysis: QualityTrendAnalysis) -> LayerFragment {
    let mut fragment = LayerFragment {
        insights: vec![InsightResult {
            kind: insight_kind::QUALITY_TREND.to_string(),
            category: InsightCategory::Quality,
            title: format!(
                "Quality trend {:?}: {} defect(s), {:.0}% rework",
                analysis.trend,
                analysis.defect_count,
                analysis.rework_rate * 100.0
            ),
            description: analysis.summary.clone(),
            confidence: analysis.confidence,
            relevance: 0.8,
            source: Some(Layer::SafetyQuality),
        }],
        ..Default::default()
    };
    if analysis.trend == TrendDirection::Worsening {
        fragment.recommendations.push(worsening_recommendation(
            "quality",
            &analysis.summary,
            analysis.confidence,
        ));
    }
    fragment
}

fn schedule_fragment(predictions: Vec<SchedulePrediction>) -> LayerFragment {
    LayerFragment {
        predictions: predictions
            .into_iter()
            .map(|prediction| PredictionResult {
                kind: PredictionKind::ScheduleDelay,
                description: format!(
                    "{} predicted {:.0} day(s) late",
                    prediction.activity, prediction.predicted_delay_days
                ),
                subject: prediction.activity,
                probability: prediction.probability,
                confidence: prediction.confidence,
                trend: prediction.trend,
                source: Some(Layer::Predictive),
            })
            .collect(),
        ..Default::default()
    }
}

fn risk_fragment(risks: &[RiskPrediction], alert_probability: f64) -> LayerFragment {
    let mut fragment = LayerFragment::default();
    for risk in risks {
        let trend = if risk.probability >= 0.5 {
            PredictionTrend::AtRisk
        } else {
            PredictionTrend::OnTrack
        };
        fragment.predictions.push(PredictionResult {
            kind: PredictionKind::Risk,
            subject: risk.category.clone(),
            description: risk.description.clone(),
            probability: risk.probability,
            confidence: risk.confidence,
            trend,
            source: Some(Layer::Predictive),
        });
        if risk.probability >= alert_probability {
            fragment.alerts.push(AlertResult {
                severity: Severity::High,
                title: format!("High {} risk", risk.category),
                message: format!(
                    "{} ({:.0}% likely, exposure {:.2})",
                    risk.description,
                    risk.probability * 100.0,
                    risk.exposure()
                ),
                source: Some(Layer::Predictive),
            });
        }
    }
    fragment
}

fn recommendations_fragment(recommendations: Vec<Recommendation>) -> LayerFragment {
    LayerFragment {
        recommendations: recommendations
            .into_iter()
            .map(|rec| RecommendationResult {
                title: rec.title,
                description: rec.description,
                category: rec.category,
                priority: rec.priority,
                confidence: rec.confidence,
                source: Some(Layer::Context),
            })
            .collect(),
        ..Default::default()
    }
}

fn next_actions_fragment(actions: Vec<PredictedAction>) -> LayerFragment {
    LayerFragment {
        predictions: actions
            .into_iter()
            .map(|action| PredictionResult {
                kind: PredictionKind::NextAction,
                description: if action.rationale.is_empty() {
                    format!("Likely next step: {}", action.action)
                } else {
                    action.rationale
                },
                subject: action.action,
                probability: action.probability,
                confidence: action.probability,
                trend: PredictionTrend::OnTrack,
                source: Some(Layer::Context),
            })
            .collect(),
        ..Default::default()
    }
}

fn hazards_fragment(hazards: Vec<HazardDetection>) -> LayerFragment {
    LayerFragment {
        alerts: hazards
            .into_iter()
            .map(|hazard| AlertResult {
                severity: hazard.severity,
                title: format!("Hazard: {}", hazard.hazard_type.replace('_', " ")),
                message: match hazard.location {
                    Some(location) => format!("{} ({})", hazard.description, location),
                    None => hazard.description,
                },
                source: Some(Layer::SafetyQuality),
            })
            .collect(),
        ..Default::default()
    }
}
