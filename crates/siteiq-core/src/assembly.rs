//! Response assembly: merge raw results, score, summarise, suggest a follow-up

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use crate::collaborators::Layer;
use crate::query::{Intent, Query};
use crate::response::{
    AlertResult, InsightResult, PredictionResult, PredictionTrend, QueryStatus, RawLayerResult,
    RecommendationResult, Response, Severity,
};

pub const CRITICAL_FOLLOW_UP: &str =
    "Critical issues were detected. Would you like me to create action items for them?";
pub const PRIORITIZE_FOLLOW_UP: &str =
    "Would you like me to prioritize these recommendations?";
pub const RISK_FOLLOW_UP: &str = "Would you like a detailed risk analysis for the at-risk items?";

/// Confidence reported when there is nothing to score
pub const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Mean of the per-category mean confidences over non-empty categories
pub fn aggregate_confidence(
    insights: &[InsightResult],
    recommendations: &[RecommendationResult],
    predictions: &[PredictionResult],
) -> f64 {
    fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
        let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
        (count > 0).then(|| sum / count as f64)
    }

    let category_means: Vec<f64> = [
        mean(insights.iter().map(|i| i.confidence)),
        mean(recommendations.iter().map(|r| r.confidence)),
        mean(predictions.iter().map(|p| p.confidence)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let confidence = mean(category_means.into_iter()).unwrap_or(NEUTRAL_CONFIDENCE);
    if confidence.is_nan() {
        return 0.0;
    }
    confidence.clamp(0.0, 1.0)
}

fn count_phrase(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("1 {}", singular)
    } else {
        format!("{} {}", count, plural)
    }
}

/// One-line human summary of what was found
pub fn summarize(
    insights: usize,
    recommendations: usize,
    predictions: usize,
    alerts: usize,
    confidence: f64,
) -> String {
    let parts: Vec<String> = [
        (insights, "insight", "insights"),
        (recommendations, "recommendation", "recommendations"),
        (predictions, "prediction", "predictions"),
        (alerts, "alert", "alerts"),
    ]
    .into_iter()
    .filter(|(count, _, _)| *count > 0)
    .map(|(count, singular, plural)| count_phrase(count, singular, plural))
    .collect();

    if parts.is_empty() {
        return "No significant findings.".to_string();
    }
    format!(
        "Analysis complete: {} (confidence: {:.0}%)",
        parts.join(", "),
        confidence * 100.0
    )
}

/// First matching rule wins
pub fn follow_up(
    alerts: &[AlertResult],
    recommendations: &[RecommendationResult],
    predictions: &[PredictionResult],
) -> Option<String> {
    if alerts.iter().any(|alert| alert.severity == Severity::Critical) {
        Some(CRITICAL_FOLLOW_UP.to_string())
    } else if recommendations.len() > 3 {
        Some(PRIORITIZE_FOLLOW_UP.to_string())
    } else if predictions
        .iter()
        .any(|prediction| prediction.trend == PredictionTrend::AtRisk)
    {
        Some(RISK_FOLLOW_UP.to_string())
    } else {
        None
    }
}

/// Builds the final [`Response`] for a query that made it through dispatch
#[derive(Debug, Default)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(
        &self,
        query: &Query,
        intent: Intent,
        results: Vec<RawLayerResult>,
        synthesized: Vec<InsightResult>,
        processing_time: Duration,
    ) -> Response {
        let mut insights = Vec::new();
        let mut recommendations = Vec::new();
        let mut predictions = Vec::new();
        let mut alerts = Vec::new();
        let mut layers_used = BTreeSet::new();
        let mut layer_failures = Vec::new();

        for result in results {
            match result {
                RawLayerResult::Payload { layer, fragment } => {
                    layers_used.insert(layer);
                    insights.extend(fragment.insights);
                    recommendations.extend(fragment.recommendations);
                    predictions.extend(fragment.predictions);
                    alerts.extend(fragment.alerts);
                }
                RawLayerResult::Failure(failure) => layer_failures.push(failure),
            }
        }
        insights.extend(synthesized);

        for name in &query.required_layers {
            let satisfied = Layer::from_str(name)
                .map(|layer| layers_used.contains(&layer))
                .unwrap_or(false);
            if !satisfied {
                tracing::warn!(query_id = %query.id, layer = %name, "required layer did not contribute");
                alerts.push(AlertResult {
                    severity: Severity::Medium,
                    title: format!("Required layer unavailable: {}", name),
                    message: format!(
                        "The {} layer was required but returned no results for this query",
                        name
                    ),
                    source: None,
                });
            }
        }

        let confidence = aggregate_confidence(&insights, &recommendations, &predictions);
        let summary = summarize(
            insights.len(),
            recommendations.len(),
            predictions.len(),
            alerts.len(),
            confidence,
        );
        let follow_up = follow_up(&alerts, &recommendations, &predictions);

        Response {
            query_id: query.id,
            success: true,
            status: QueryStatus::Completed,
            intent: Some(intent),
            summary,
            insights,
            recommendations,
            predictions,
            alerts,
            confidence,
            processing_time,
            layers_used,
            layer_failures,
            follow_up,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{InsightCategory, LayerFailure, LayerFragment, PredictionKind};

    fn insight(confidence: f64) -> InsightResult {
        InsightResult {
            kind: "k".to_string(),
            category: InsightCategory::General,
            title: String::new(),
            description: String::new(),
            confidence,
            relevance: 0.5,
            source: None,
        }
    }

    fn recommendation(confidence: f64) -> RecommendationResult {
        RecommendationResult {
            title: String::new(),
            description: String::new(),
            category: "schedule".to_string(),
            priority: Severity::Medium,
            confidence,
            source: None,
        }
    }

    fn prediction(trend: PredictionTrend) -> PredictionResult {
        PredictionResult {
            kind: PredictionKind::Risk,
            subject: String::new(),
            description: String::new(),
            probability: 0.5,
            confidence: 0.6,
            trend,
            source: None,
        }
    }

    fn alert(severity: Severity) -> AlertResult {
        AlertResult {
            severity,
            title: String::new(),
            message: String::new(),
            source: None,
        }
    }

    #[test]
    fn test_confidence_mean_of_category_means() {
        let insights = [insight(1.0), insight(0.5)];
        let recommendations = [recommendation(0.25)];
        let confidence = aggregate_confidence(&insights, &recommendations, &[]);
        assert!((confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_neutral_when_empty() {
        assert_eq!(aggregate_confidence(&[], &[], &[]), 0.5);
    }

    #[test]
    fn test_summary_wording() {
        assert_eq!(
            summarize(3, 2, 0, 0, 0.82),
            "Analysis complete: 3 insights, 2 recommendations (confidence: 82%)"
        );
        assert_eq!(
            summarize(1, 0, 1, 1, 0.5),
            "Analysis complete: 1 insight, 1 prediction, 1 alert (confidence: 50%)"
        );
        assert_eq!(summarize(0, 0, 0, 0, 0.5), "No significant findings.");
    }

    #[test]
    fn test_follow_up_precedence() {
        let recommendations: Vec<_> = (0..5).map(|_| recommendation(0.7)).collect();
        let at_risk = [prediction(PredictionTrend::AtRisk)];

        assert_eq!(
            follow_up(&[alert(Severity::Critical)], &recommendations, &at_risk).as_deref(),
            Some(CRITICAL_FOLLOW_UP)
        );
        assert_eq!(
            follow_up(&[alert(Severity::High)], &recommendations, &at_risk).as_deref(),
            Some(PRIORITIZE_FOLLOW_UP)
        );
        assert_eq!(
            follow_up(&[], &recommendations[..3], &at_risk).as_deref(),
            Some(RISK_FOLLOW_UP)
        );
        assert_eq!(follow_up(&[], &[], &[prediction(PredictionTrend::Delayed)]), None);
    }

    #[test]
    fn test_assemble_layers_and_required() {
        let query = Query::builder()
            .user("u")
            .project("P1")
            .text("find clash")
            .require_layer("knowledge_graph")
            .require_layer("context")
            .build();

        let results = vec![
            RawLayerResult::payload(Layer::Context, LayerFragment::default()),
            RawLayerResult::Failure(LayerFailure {
                collaborator: Layer::KnowledgeGraph,
                operation: "search_nodes".to_string(),
                error: "down".to_string(),
            }),
        ];

        let response = ResponseAssembler::new().assemble(
            &query,
            Intent::Search,
            results,
            Vec::new(),
            Duration::from_millis(3),
        );

        assert!(response.success);
        assert!(response.uses_layer(Layer::Context));
        assert!(!response.uses_layer(Layer::KnowledgeGraph));
        assert_eq!(response.layer_failures.len(), 1);
        assert_eq!(response.alerts.len(), 1);
        assert_eq!(response.alerts[0].severity, Severity::Medium);
        assert_eq!(response.summary, "Analysis complete: 1 alert (confidence: 50%)");
    }
}
