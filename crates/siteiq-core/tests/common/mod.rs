//! Shared fakes for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use siteiq_core::collaborators::{
    Anomaly, ContextCollaborator, HazardDetection, KnowledgeGraphCollaborator, Node,
    PredictedAction, PredictiveCollaborator, ProjectContext, QualityTrendAnalysis, Recommendation,
    RiskPrediction, SafetyQualityCollaborator, SafetyTrendAnalysis, SchedulePrediction,
    SemanticAnalysis, SemanticCollaborator, Subgraph, UserContext,
};
use siteiq_core::{
    CollaboratorError, Collaborators, IntelligenceOrchestrator, Layer, OrchestratorConfig,
    ProjectSnapshot, Query, SnapshotBackend, Timestamp,
};

/// How a faked layer misbehaves
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FakeMode {
    Fail,
    /// Block until [`FakeBackend::release`] is called
    Hang,
    Delay(Duration),
}

/// Snapshot-backed collaborators with per-layer and per-operation fault injection
#[derive(Debug)]
pub struct FakeBackend {
    inner: SnapshotBackend,
    modes: DashMap<Layer, FakeMode>,
    operation_modes: DashMap<&'static str, FakeMode>,
    /// Last `since` passed to each trend operation
    trend_since: DashMap<&'static str, Timestamp>,
    gate: Semaphore,
    semantic_in_flight: AtomicUsize,
    semantic_peak: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::with_snapshot(ProjectSnapshot::demo())
    }

    pub fn with_snapshot(snapshot: ProjectSnapshot) -> Self {
        Self {
            inner: SnapshotBackend::new(snapshot),
            modes: DashMap::new(),
            operation_modes: DashMap::new(),
            trend_since: DashMap::new(),
            gate: Semaphore::new(0),
            semantic_in_flight: AtomicUsize::new(0),
            semantic_peak: AtomicUsize::new(0),
        }
    }

    pub fn set_mode(&self, layer: Layer, mode: FakeMode) {
        self.modes.insert(layer, mode);
    }

    pub fn clear_mode(&self, layer: Layer) {
        self.modes.remove(&layer);
    }

    /// Fault a single operation; takes precedence over the layer mode
    pub fn set_operation_mode(&self, operation: &'static str, mode: FakeMode) {
        self.operation_modes.insert(operation, mode);
    }

    pub fn trend_since(&self, operation: &str) -> Option<Timestamp> {
        self.trend_since.get(operation).map(|entry| *entry.value())
    }

    /// Unblock every current and future `Hang` call
    pub fn release(&self) {
        self.gate.add_permits(1_000_000);
    }

    /// Highest number of concurrent semantic calls seen
    pub fn semantic_peak(&self) -> usize {
        self.semantic_peak.load(Ordering::SeqCst)
    }

    async fn enter(&self, layer: Layer, operation: &str) -> Result<(), CollaboratorError> {
        let mode = self
            .operation_modes
            .get(operation)
            .map(|entry| *entry.value())
            .or_else(|| self.modes.get(&layer).map(|entry| *entry.value()));
        match mode {
            None => Ok(()),
            Some(FakeMode::Fail) => Err(CollaboratorError::Unavailable(format!(
                "{}::{} offline",
                layer, operation
            ))),
            Some(FakeMode::Hang) => {
                let _permit = self
                    .gate
                    .acquire()
                    .await
                    .map_err(|_| CollaboratorError::Internal("gate closed".to_string()))?;
                Ok(())
            }
            Some(FakeMode::Delay(delay)) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl ContextCollaborator for FakeBackend {
    async fn get_user_context(&self, user_id: &str) -> Result<UserContext, CollaboratorError> {
        self.enter(Layer::Context, "get_user_context").await?;
        self.inner.get_user_context(user_id).await
    }

    async fn get_project_context(
        &self,
        project_id: &str,
    ) -> Result<ProjectContext, CollaboratorError> {
        self.enter(Layer::Context, "get_project_context").await?;
        self.inner.get_project_context(project_id).await
    }

    async fn get_contextual_recommendations(
        &self,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<Recommendation>, CollaboratorError> {
        self.enter(Layer::Context, "get_contextual_recommendations").await?;
        self.inner
            .get_contextual_recommendations(user_id, project_id)
            .await
    }

    async fn predict_next_actions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PredictedAction>, CollaboratorError> {
        self.enter(Layer::Context, "predict_next_actions").await?;
        self.inner.predict_next_actions(user_id).await
    }

    async fn detect_anomalies(&self, project_id: &str) -> Result<Vec<Anomaly>, CollaboratorError> {
        self.enter(Layer::Context, "detect_anomalies").await?;
        self.inner.detect_anomalies(project_id).await
    }
}

#[async_trait]
impl SemanticCollaborator for FakeBackend {
    async fn analyze(&self, text: &str) -> Result<SemanticAnalysis, CollaboratorError> {
        let now = self.semantic_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.semantic_peak.fetch_max(now, Ordering::SeqCst);

        let result = match self.enter(Layer::Semantic, "analyze").await {
            Ok(()) => self.inner.analyze(text).await,
            Err(err) => Err(err),
        };

        self.semantic_in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl PredictiveCollaborator for FakeBackend {
    async fn predict_schedule(
        &self,
        project_id: &str,
        activities: &[String],
    ) -> Result<Vec<SchedulePrediction>, CollaboratorError> {
        self.enter(Layer::Predictive, "predict_schedule").await?;
        self.inner.predict_schedule(project_id, activities).await
    }

    async fn predict_risks(&self, project_id: &str) -> Result<Vec<RiskPrediction>, CollaboratorError> {
        self.enter(Layer::Predictive, "predict_risks").await?;
        self.inner.predict_risks(project_id).await
    }
}

#[async_trait]
impl SafetyQualityCollaborator for FakeBackend {
    async fn analyze_safety_trends(
        &self,
        project_id: &str,
        since: Timestamp,
    ) -> Result<SafetyTrendAnalysis, CollaboratorError> {
        self.enter(Layer::SafetyQuality, "analyze_safety_trends").await?;
        self.trend_since.insert("analyze_safety_trends", since);
        self.inner.analyze_safety_trends(project_id, since).await
    }

    async fn analyze_quality_trends(
        &self,
        project_id: &str,
        since: Timestamp,
    ) -> Result<QualityTrendAnalysis, CollaboratorError> {
        self.enter(Layer::SafetyQuality, "analyze_quality_trends").await?;
        self.trend_since.insert("analyze_quality_trends", since);
        self.inner.analyze_quality_trends(project_id, since).await
    }

    async fn detect_hazards_from_text(
        &self,
        project_id: &str,
        text: &str,
    ) -> Result<Vec<HazardDetection>, CollaboratorError> {
        self.enter(Layer::SafetyQuality, "detect_hazards_from_text").await?;
        self.inner.detect_hazards_from_text(project_id, text).await
    }
}

#[async_trait]
impl KnowledgeGraphCollaborator for FakeBackend {
    async fn search_nodes(
        &self,
        node_type: Option<&str>,
        label_contains: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Node>, CollaboratorError> {
        self.enter(Layer::KnowledgeGraph, "search_nodes").await?;
        self.inner.search_nodes(node_type, label_contains, limit).await
    }

    async fn get_connected_subgraph(
        &self,
        node_id: &str,
        depth: usize,
        limit: usize,
    ) -> Result<Subgraph, CollaboratorError> {
        self.enter(Layer::KnowledgeGraph, "get_connected_subgraph").await?;
        self.inner.get_connected_subgraph(node_id, depth, limit).await
    }
}

pub fn orchestrator_with(
    backend: Arc<FakeBackend>,
    config: OrchestratorConfig,
) -> IntelligenceOrchestrator {
    IntelligenceOrchestrator::new(Collaborators::from_backend(backend), config)
        .expect("valid test config")
}

pub fn query(text: &str) -> Query {
    Query::builder().user("u-1").project("P1").text(text).build()
}

/// Poll `condition` every few milliseconds until it holds or `limit` passes
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
