//! Intelligence orchestrator
//!
//! Single entry point for project queries. Each query passes through:
//!
//! ```text
//! Query
//!   │
//!   v
//! ┌──────────────────┐   deadline / cancel
//! │  Admission gate  │ ───────────────────────> Failed / Cancelled
//! └──────────────────┘
//!   │
//!   v
//! ┌──────────────────────────────────────┐
//! │  Mandatory: semantic ║ context       │ ──both fail──> Failed
//! └──────────────────────────────────────┘
//!   │  classify intent
//!   v
//! ┌──────────────────────────────────────┐
//! │  Intent fan-out (join_all)           │
//! └──────────────────────────────────────┘
//!   │
//!   v
//! Synthesis ──> Assembly ──> Response
//! ```
//!
//! [`IntelligenceOrchestrator::process_query`] always returns a [`Response`];
//! failures are reported through its `status`, `success` and `error` fields.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::admission::{ActiveQuerySnapshot, AdmissionGate};
use crate::assembly::ResponseAssembler;
use crate::classifier::classify;
use crate::collaborators::Collaborators;
use crate::config::OrchestratorConfig;
use crate::dispatch::{CallContext, DispatchRouter};
use crate::error::{Result, SiteIqError};
use crate::events::{EventBus, EventSubscription, OrchestratorEvent};
use crate::health::{HealthRecord, HealthRegistry};
use crate::query::{Query, QueryLifecycle, QueryState};
use crate::response::{LayerFragment, QueryStatus, RawLayerResult, Response};
use crate::synthesis::{CompositeSynthesizer, SynthesisInput, SynthesisRule};

/// Longest deadline ever armed; larger budgets mean "no deadline"
const MAX_DEADLINE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Coordinates collaborators to answer project queries
#[derive(Debug)]
pub struct IntelligenceOrchestrator {
    config: OrchestratorConfig,
    gate: AdmissionGate,
    router: DispatchRouter,
    synthesizer: CompositeSynthesizer,
    assembler: ResponseAssembler,
    health: Arc<HealthRegistry>,
    events: Arc<EventBus>,
}

impl IntelligenceOrchestrator {
    /// Create an orchestrator; fails if the configuration does not validate
    pub fn new(collaborators: Collaborators, config: OrchestratorConfig) -> Result<Self> {
        config.validate()?;

        let health = Arc::new(HealthRegistry::new(config.health.clone()));
        let events = Arc::new(EventBus::new(config.events.channel_capacity));
        let router = DispatchRouter::new(
            collaborators,
            Arc::clone(&health),
            Arc::clone(&events),
            config.dispatch.clone(),
            config.layer_timeout(),
        );

        tracing::info!(
            max_concurrent_queries = config.max_concurrent_queries,
            layer_timeout_ms = config.layer_timeout_ms,
            "orchestrator ready"
        );

        Ok(Self {
            gate: AdmissionGate::new(config.max_concurrent_queries),
            router,
            synthesizer: CompositeSynthesizer::default(),
            assembler: ResponseAssembler::new(),
            health,
            events,
            config,
        })
    }

    /// Append a synthesis rule after the built-in ones
    pub fn with_synthesis_rule(mut self, rule: impl SynthesisRule + 'static) -> Self {
        self.synthesizer.add_rule(rule);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Process a query to completion
    pub async fn process_query(&self, query: Query) -> Response {
        self.process_query_with_cancellation(query, CancellationToken::new())
            .await
    }

    /// Process a query that the caller may cancel through `cancel`
    pub async fn process_query_with_cancellation(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> Response {
        let started = Instant::now();
        let span = tracing::info_span!(
            "query",
            query_id = %query.id,
            project = %query.project_id,
            priority = %query.priority,
        );

        let response = self.run(&query, &cancel, started).instrument(span).await;

        self.events.publish(OrchestratorEvent::QueryFinished {
            query_id: response.query_id,
            status: response.status,
            processing_time: response.processing_time,
        });
        response
    }

    async fn run(&self, query: &Query, cancel: &CancellationToken, started: Instant) -> Response {
        let mut lifecycle = QueryLifecycle::new(query.id);

        let result = match query.validate() {
            Ok(()) => self.execute(query, cancel, &mut lifecycle, started).await,
            Err(err) => Err(err),
        };

        match result {
            Ok(response) => {
                tracing::info!(
                    intent = ?response.intent,
                    confidence = response.confidence,
                    failures = response.layer_failures.len(),
                    elapsed_ms = response.processing_time.as_millis() as u64,
                    "query completed"
                );
                response
            }
            Err(err) => {
                let (state, status) = match err {
                    SiteIqError::Cancelled(_) => (QueryState::Cancelled, QueryStatus::Cancelled),
                    _ => (QueryState::Failed, QueryStatus::Failed),
                };
                if let Err(transition) = lifecycle.advance(state) {
                    tracing::error!(error = %transition, "query ended in an unexpected state");
                }
                match status {
                    QueryStatus::Cancelled => tracing::info!("query cancelled"),
                    _ => tracing::warn!(kind = err.kind(), error = %err, "query failed"),
                }

                let summary = match status {
                    QueryStatus::Cancelled => "Query cancelled.".to_string(),
                    _ => format!("Query failed: {}", err),
                };
                Response::unsuccessful(
                    query.id,
                    status,
                    summary,
                    Some(err.to_string()),
                    started.elapsed(),
                )
            }
        }
    }

    async fn execute(
        &self,
        query: &Query,
        cancel: &CancellationToken,
        lifecycle: &mut QueryLifecycle,
        started: Instant,
    ) -> Result<Response> {
        let deadline = started + query.max_response_time.min(MAX_DEADLINE);

        lifecycle.advance(QueryState::AdmissionPending)?;
        let _permit = self
            .gate
            .acquire(query.id, query.priority, deadline, cancel)
            .await?;
        let registration = self.gate.register(query, cancel.clone());

        self.events.publish(OrchestratorEvent::QueryAdmitted {
            query_id: query.id,
            priority: query.priority,
        });
        tracing::info!(
            waited_ms = started.elapsed().as_millis() as u64,
            "query admitted"
        );

        let ctx = CallContext {
            query,
            deadline,
            cancel,
        };

        registration.set_state(lifecycle.advance(QueryState::MandatoryAnalysis)?);
        let mut mandatory = self.router.run_mandatory(&ctx).await?;

        let intent = classify(query, mandatory.semantic.as_ref());
        tracing::debug!(intent = %intent, "classified");

        registration.set_state(lifecycle.advance(QueryState::IntentDispatch)?);
        let mut results = std::mem::take(&mut mandatory.results);
        results.extend(self.router.dispatch(&ctx, intent, &mandatory).await?);
        tracing::debug!(
            results = results.len(),
            failures = results.iter().filter(|result| result.is_failure()).count(),
            "dispatch finished"
        );

        registration.set_state(lifecycle.advance(QueryState::Synthesizing)?);
        let collected = merged_fragment(&results);
        let synthesized = self.synthesizer.synthesize(&SynthesisInput {
            insights: &collected.insights,
            predictions: &collected.predictions,
            alerts: &collected.alerts,
            project: mandatory.project.as_ref(),
            semantic: mandatory.semantic.as_ref(),
        });
        for insight in &synthesized {
            self.events.publish(OrchestratorEvent::InsightGenerated {
                query_id: query.id,
                insight: insight.clone(),
            });
        }

        registration.set_state(lifecycle.advance(QueryState::Assembling)?);
        let response =
            self.assembler
                .assemble(query, intent, results, synthesized, started.elapsed());
        lifecycle.advance(QueryState::Completed)?;

        Ok(response)
    }

    /// Health of every collaborator, in layer order
    pub fn health_status(&self) -> Vec<HealthRecord> {
        self.health.snapshot()
    }

    /// `true` when every collaborator is healthy
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    pub fn active_queries(&self) -> Vec<ActiveQuerySnapshot> {
        self.gate.active_queries()
    }

    /// Cancel an admitted query; `false` if it is not in flight
    pub fn cancel_query(&self, query_id: Uuid) -> bool {
        let found = self.gate.cancel(query_id);
        if found {
            tracing::info!(query_id = %query_id, "cancellation requested");
        }
        found
    }

    pub fn subscribe(&self) -> EventSubscription {
        self.events.subscribe()
    }

    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Most queries processed at once
    pub fn capacity(&self) -> usize {
        self.gate.capacity()
    }

    /// Events lost to full subscriber buffers
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped_events()
    }
}

fn merged_fragment(results: &[RawLayerResult]) -> LayerFragment {
    let mut merged = LayerFragment::default();
    for result in results {
        if let RawLayerResult::Payload { fragment, .. } = result {
            merged.insights.extend(fragment.insights.iter().cloned());
            merged.recommendations.extend(fragment.recommendations.iter().cloned());
            merged.predictions.extend(fragment.predictions.iter().cloned());
            merged.alerts.extend(fragment.alerts.iter().cloned());
        }
    }
    merged
}
