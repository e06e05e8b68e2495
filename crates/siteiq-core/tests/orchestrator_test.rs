//! End-to-end orchestrator tests against the snapshot backend with fault injection

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use common::{orchestrator_with, query, wait_until, FakeBackend, FakeMode};
use siteiq_core::assembly::{
    ResponseAssembler, CRITICAL_FOLLOW_UP, PRIORITIZE_FOLLOW_UP, RISK_FOLLOW_UP,
};
use siteiq_core::response::{insight_kind, LayerFragment, PredictionKind, RawLayerResult};
use siteiq_core::{
    AlertResult, CancellationToken, Intent, Layer, OrchestratorConfig, OrchestratorEvent,
    ProjectSnapshot, QueryStatus, RecommendationResult, Severity,
};

fn setup() -> (Arc<FakeBackend>, siteiq_core::IntelligenceOrchestrator) {
    let backend = Arc::new(FakeBackend::new());
    let orchestrator = orchestrator_with(Arc::clone(&backend), OrchestratorConfig::default());
    (backend, orchestrator)
}

#[tokio::test]
async fn test_prediction_scenario() {
    let (_, orchestrator) = setup();

    let response = orchestrator
        .process_query(query("predict schedule delay for foundation"))
        .await;

    assert!(response.success);
    assert_eq!(response.intent, Some(Intent::Prediction));
    assert!(!response.predictions.is_empty());
    let expected: BTreeSet<Layer> = [Layer::Semantic, Layer::Context, Layer::Predictive]
        .into_iter()
        .collect();
    assert_eq!(response.layers_used, expected);

    // weather risk at 74% crosses the 70% alert threshold
    assert!(response
        .alerts
        .iter()
        .any(|alert| alert.severity == Severity::High && alert.title.contains("weather")));
    assert_eq!(response.follow_up.as_deref(), Some(RISK_FOLLOW_UP));
    assert!((0.0..=1.0).contains(&response.confidence));
}

#[tokio::test]
async fn test_search_scenario() {
    let (_, orchestrator) = setup();

    let response = orchestrator
        .process_query(query("find clash near east wing"))
        .await;

    assert!(response.success);
    assert_eq!(response.intent, Some(Intent::Search));
    assert!(response.uses_layer(Layer::KnowledgeGraph));
    assert!(response
        .insights
        .iter()
        .any(|insight| insight.kind == insight_kind::GRAPH_NEIGHBORHOOD));
}

#[tokio::test]
async fn test_graph_failure_during_question_is_degraded() {
    let (backend, orchestrator) = setup();
    backend.set_mode(Layer::KnowledgeGraph, FakeMode::Fail);

    let response = orchestrator
        .process_query(query("what is happening in the east wing"))
        .await;

    assert!(response.success);
    assert_eq!(response.status, QueryStatus::Completed);
    assert_eq!(response.intent, Some(Intent::Question));
    assert!(!response.uses_layer(Layer::KnowledgeGraph));
    assert!(response
        .insights
        .iter()
        .all(|insight| insight.source != Some(Layer::KnowledgeGraph)));

    let graph_failures = response
        .layer_failures
        .iter()
        .filter(|failure| failure.collaborator == Layer::KnowledgeGraph)
        .count();
    assert!(graph_failures >= 1);

    let record = orchestrator
        .health_status()
        .into_iter()
        .find(|record| record.layer_name == Layer::KnowledgeGraph)
        .unwrap();
    assert_eq!(record.error_count as usize, graph_failures);
    assert!(!orchestrator.is_healthy());
}

#[tokio::test]
async fn test_declining_health_trend_alert() {
    let (_, orchestrator) = setup();

    let mut q = query("how are we doing");
    q.explicit_intent = Some(Intent::Analysis);
    let response = orchestrator.process_query(q).await;

    let trend = response
        .insights
        .iter()
        .find(|insight| insight.kind == insight_kind::TREND_ALERT)
        .expect("trend_alert insight");
    assert_eq!(trend.confidence, 0.85);
    assert!(response
        .insights
        .iter()
        .any(|insight| insight.kind == insight_kind::PROJECT_HEALTH && insight.confidence == 0.9));
    // worsening safety trend yields a recommendation
    assert!(!response.recommendations.is_empty());
}

#[test]
fn test_critical_alert_beats_recommendation_count() {
    let fragment = LayerFragment {
        recommendations: (0..5)
            .map(|i| RecommendationResult {
                title: format!("rec {}", i),
                description: String::new(),
                category: "schedule".to_string(),
                priority: Severity::Medium,
                confidence: 0.7,
                source: Some(Layer::Context),
            })
            .collect(),
        alerts: vec![AlertResult {
            severity: Severity::Critical,
            title: "Slab failure".to_string(),
            message: String::new(),
            source: Some(Layer::Context),
        }],
        ..Default::default()
    };

    let response = ResponseAssembler::new().assemble(
        &query("anything critical"),
        Intent::Alert,
        vec![RawLayerResult::payload(Layer::Context, fragment)],
        Vec::new(),
        Duration::from_millis(1),
    );
    assert_eq!(response.follow_up.as_deref(), Some(CRITICAL_FOLLOW_UP));
}

#[tokio::test]
async fn test_recommendation_intent() {
    let (_, orchestrator) = setup();

    let response = orchestrator
        .process_query(query("recommend next steps for the crew"))
        .await;

    assert_eq!(response.intent, Some(Intent::Recommendation));
    // two contextual recommendations plus two health issues
    assert_eq!(response.recommendations.len(), 4);
    assert_eq!(response.follow_up.as_deref(), Some(PRIORITIZE_FOLLOW_UP));
    assert!(response
        .predictions
        .iter()
        .all(|prediction| prediction.kind == PredictionKind::NextAction));
    assert_eq!(response.predictions.len(), 2);
}

#[tokio::test]
async fn test_alert_intent_publishes_hazards_and_escalates() {
    let (_, orchestrator) = setup();
    let mut events = orchestrator.subscribe();

    let mut q = query("urgent: loose scaffold near east wing, fix immediately");
    q.explicit_intent = Some(Intent::Alert);
    let query_id = q.id;
    let response = orchestrator.process_query(q).await;

    assert!(response.success);
    assert!(response.uses_layer(Layer::SafetyQuality));
    assert!(response
        .alerts
        .iter()
        .any(|alert| alert.title.contains("fall from height")));
    // demo project health 58% is under the 60% alert line
    assert!(response
        .alerts
        .iter()
        .any(|alert| alert.severity == Severity::High && alert.source == Some(Layer::Context)));
    assert!(response
        .insights
        .iter()
        .any(|insight| insight.kind == insight_kind::ESCALATION));

    let events = events.drain();
    assert!(events
        .iter()
        .all(|event| event.query_id() == query_id));
    assert!(events
        .iter()
        .any(|event| matches!(event, OrchestratorEvent::HazardDetected { .. })));
    assert!(matches!(
        events.first(),
        Some(OrchestratorEvent::QueryAdmitted { .. })
    ));
    assert!(matches!(
        events.last(),
        Some(OrchestratorEvent::QueryFinished {
            status: QueryStatus::Completed,
            ..
        })
    ));
}

#[tokio::test]
async fn test_both_mandatory_failures_are_critical() {
    let (backend, orchestrator) = setup();
    backend.set_mode(Layer::Semantic, FakeMode::Fail);
    backend.set_mode(Layer::Context, FakeMode::Fail);

    let response = orchestrator
        .process_query(query("predict schedule delay for foundation"))
        .await;

    assert!(!response.success);
    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.error.unwrap().contains("Critical layers failed"));
    assert_eq!(response.confidence, 0.0);
    assert_eq!(orchestrator.available_permits(), 10);
}

#[tokio::test]
async fn test_single_mandatory_failure_is_degraded() {
    let (backend, orchestrator) = setup();
    backend.set_mode(Layer::Semantic, FakeMode::Fail);

    let response = orchestrator
        .process_query(query("predict schedule delay for foundation"))
        .await;

    assert!(response.success);
    // falls back to the keyword table
    assert_eq!(response.intent, Some(Intent::Prediction));
    assert!(!response.uses_layer(Layer::Semantic));
    assert!(response.uses_layer(Layer::Context));
    assert!(response.uses_layer(Layer::Predictive));
    assert_eq!(response.layer_failures.len(), 1);
    assert_eq!(response.layer_failures[0].collaborator, Layer::Semantic);
}

#[tokio::test]
async fn test_layers_used_excludes_failed_layers() {
    for failing in [Layer::Predictive, Layer::SafetyQuality, Layer::KnowledgeGraph] {
        let (backend, orchestrator) = setup();
        backend.set_mode(failing, FakeMode::Fail);

        for intent in Intent::ALL {
            let mut q = query("loose scaffold near east wing, predict the clash");
            q.explicit_intent = Some(intent);
            let response = orchestrator.process_query(q).await;

            assert!(response.success, "{:?} with {:?} failing", intent, failing);
            assert!(!response.uses_layer(failing));

            let failed: BTreeSet<Layer> = response
                .layer_failures
                .iter()
                .map(|failure| failure.collaborator)
                .collect();
            assert!(response.layers_used.is_disjoint(&failed));
        }
    }
}

#[tokio::test]
async fn test_missing_required_layer_adds_alert() {
    let (backend, orchestrator) = setup();
    backend.set_mode(Layer::KnowledgeGraph, FakeMode::Fail);

    let mut q = query("what is happening in the east wing");
    q.required_layers.insert("knowledge_graph".to_string());
    let response = orchestrator.process_query(q).await;

    assert!(response.success);
    assert!(response.alerts.iter().any(|alert| alert.severity == Severity::Medium
        && alert.title.contains("knowledge_graph")));
}

#[tokio::test]
async fn test_unknown_required_layer_rejected() {
    let (_, orchestrator) = setup();

    let mut q = query("what is happening");
    q.required_layers.insert("vision".to_string());
    let response = orchestrator.process_query(q).await;

    assert!(!response.success);
    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.error.unwrap().contains("vision"));
}

#[tokio::test]
async fn test_layer_timeout_is_degraded_failure() {
    let backend = Arc::new(FakeBackend::new());
    let orchestrator = orchestrator_with(
        Arc::clone(&backend),
        OrchestratorConfig::new().with_layer_timeout(Duration::from_millis(50)),
    );
    backend.set_mode(Layer::KnowledgeGraph, FakeMode::Hang);

    let response = orchestrator
        .process_query(query("what is happening in the east wing"))
        .await;

    assert!(response.success);
    assert!(!response.uses_layer(Layer::KnowledgeGraph));
    assert!(response
        .layer_failures
        .iter()
        .any(|failure| failure.collaborator == Layer::KnowledgeGraph
            && failure.error.contains("timed out")));

    let record = orchestrator
        .health_status()
        .into_iter()
        .find(|record| record.layer_name == Layer::KnowledgeGraph)
        .unwrap();
    assert_eq!(record.request_count, record.error_count);
    assert!(record.request_count >= 1);
}

#[tokio::test]
async fn test_deadline_fails_query_without_recording_health() {
    let (backend, orchestrator) = setup();
    backend.set_mode(Layer::Semantic, FakeMode::Hang);
    backend.set_mode(Layer::Context, FakeMode::Hang);

    let q = siteiq_core::Query::builder()
        .user("u-1")
        .project("P1")
        .text("predict schedule delay for foundation")
        .max_response_time(Duration::from_millis(100))
        .build();
    let response = orchestrator.process_query(q).await;

    assert!(!response.success);
    assert_eq!(response.status, QueryStatus::Failed);
    assert!(response.error.unwrap().contains("response budget"));
    assert!(response.processing_time >= Duration::from_millis(100));
    assert_eq!(orchestrator.available_permits(), 10);
    assert!(orchestrator
        .health_status()
        .iter()
        .all(|record| record.request_count == 0));
}

#[tokio::test]
async fn test_admission_cancellation_n_plus_k() {
    const N: usize = 2;
    const K: usize = 3;

    let backend = Arc::new(FakeBackend::new());
    let orchestrator = Arc::new(orchestrator_with(
        Arc::clone(&backend),
        OrchestratorConfig::new().with_max_concurrent_queries(N),
    ));
    backend.set_mode(Layer::Semantic, FakeMode::Hang);

    let admitted: Vec<_> = (0..N)
        .map(|_| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .process_query(query("predict schedule delay for foundation"))
                    .await
            })
        })
        .collect();

    assert!(wait_until(Duration::from_secs(2), || orchestrator.active_queries().len() == N).await);
    assert_eq!(orchestrator.available_permits(), 0);

    let tokens: Vec<CancellationToken> = (0..K).map(|_| CancellationToken::new()).collect();
    let waiting: Vec<_> = tokens
        .iter()
        .map(|token| {
            let orchestrator = Arc::clone(&orchestrator);
            let token = token.clone();
            tokio::spawn(async move {
                orchestrator
                    .process_query_with_cancellation(query("find clash"), token)
                    .await
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.active_queries().len(), N);
    for token in &tokens {
        token.cancel();
    }
    for handle in waiting {
        let response = handle.await.unwrap();
        assert_eq!(response.status, QueryStatus::Cancelled);
        assert!(!response.success);
    }

    backend.release();
    for handle in admitted {
        let response = handle.await.unwrap();
        assert_eq!(response.status, QueryStatus::Completed);
        assert!(response.success);
    }

    assert!(backend.semantic_peak() <= N);
    assert_eq!(orchestrator.available_permits(), N);
    assert!(orchestrator.active_queries().is_empty());
}

#[tokio::test]
async fn test_cancel_in_flight_query() {
    let backend = Arc::new(FakeBackend::new());
    let orchestrator = Arc::new(orchestrator_with(
        Arc::clone(&backend),
        OrchestratorConfig::default(),
    ));
    backend.set_mode(Layer::Semantic, FakeMode::Hang);

    let q = query("predict schedule delay for foundation");
    let query_id = q.id;
    let handle = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move { orchestrator.process_query(q).await })
    };

    assert!(wait_until(Duration::from_secs(2), || !orchestrator.active_queries().is_empty()).await);
    let active = orchestrator.active_queries();
    assert_eq!(active[0].query_id, query_id);

    assert!(orchestrator.cancel_query(query_id));
    let response = handle.await.unwrap();
    assert_eq!(response.status, QueryStatus::Cancelled);

    assert!(orchestrator.active_queries().is_empty());
    assert!(!orchestrator.cancel_query(query_id));
    assert_eq!(orchestrator.available_permits(), 10);
}

#[tokio::test]
async fn test_activities_parameter_narrows_schedule() {
    let (_, orchestrator) = setup();

    let q = siteiq_core::Query::builder()
        .user("u-1")
        .project("P1")
        .text("predict schedule delay")
        .parameter("activities", vec!["Framing"])
        .build();
    let response = orchestrator.process_query(q).await;

    assert!(response.success);
    let subjects: Vec<&str> = response
        .predictions
        .iter()
        .filter(|prediction| prediction.kind == PredictionKind::ScheduleDelay)
        .map(|prediction| prediction.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["Framing"]);
}

#[tokio::test]
async fn test_since_days_sets_trend_window() {
    let days_ago = |since: siteiq_core::Timestamp| (chrono::Utc::now() - since).num_days();

    for (since_days, expected) in [(7.0, 7), (1.0e9, 30)] {
        let (backend, orchestrator) = setup();
        let q = siteiq_core::Query::builder()
            .user("u-1")
            .project("P1")
            .text("safety trend")
            .intent(Intent::Analysis)
            .parameter("since_days", since_days)
            .build();
        let response = orchestrator.process_query(q).await;

        assert!(response.success, "since_days = {}", since_days);
        assert!(response.uses_layer(Layer::SafetyQuality));
        for operation in ["analyze_safety_trends", "analyze_quality_trends"] {
            let since = backend.trend_since(operation).expect("trend call recorded");
            assert_eq!(days_ago(since), expected, "{} since_days = {}", operation, since_days);
        }
    }
}

#[tokio::test]
async fn test_subgraph_failure_keeps_search_hits() {
    let (backend, orchestrator) = setup();
    backend.set_operation_mode("get_connected_subgraph", FakeMode::Fail);

    let response = orchestrator
        .process_query(query("find clash near east wing"))
        .await;

    assert!(response.success);
    assert_eq!(response.intent, Some(Intent::Search));
    // search_nodes still answered
    assert!(response.uses_layer(Layer::KnowledgeGraph));
    assert!(!response.layer_failures.is_empty());
    assert!(response.layer_failures.iter().all(|failure| {
        failure.collaborator == Layer::KnowledgeGraph
            && failure.operation == "get_connected_subgraph"
    }));
    assert!(response
        .insights
        .iter()
        .all(|insight| insight.kind != insight_kind::GRAPH_NEIGHBORHOOD));
}

#[tokio::test]
async fn test_critical_health_alert_end_to_end() {
    let mut snapshot = ProjectSnapshot::demo();
    snapshot.projects[0].health.score = 0.3;
    let backend = Arc::new(FakeBackend::with_snapshot(snapshot));
    let orchestrator = orchestrator_with(Arc::clone(&backend), OrchestratorConfig::default());

    let mut q = query("exposed live wire by the east wing stair");
    q.explicit_intent = Some(Intent::Alert);
    let response = orchestrator.process_query(q).await;

    assert!(response.success);
    assert!(response.alerts.iter().any(|alert| alert.severity == Severity::Critical
        && alert.source == Some(Layer::Context)));
    assert!(response.alerts.iter().any(|alert| alert.severity == Severity::Critical
        && alert.source == Some(Layer::SafetyQuality)));
    assert_eq!(response.follow_up.as_deref(), Some(CRITICAL_FOLLOW_UP));
}
