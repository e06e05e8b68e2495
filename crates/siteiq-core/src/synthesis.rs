//! Composite synthesis
//!
//! Rules look only at results already collected for the query and derive
//! extra insights from them. They never call a collaborator.

use crate::collaborators::{HealthTrend, ProjectContext, SemanticAnalysis};
use crate::response::{
    insight_kind, AlertResult, InsightCategory, InsightResult, PredictionKind, PredictionResult,
    Severity,
};

/// Urgency at which a severe hazard escalates
pub const ESCALATION_URGENCY: f64 = 0.8;

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub insights: &'a [InsightResult],
    pub predictions: &'a [PredictionResult],
    pub alerts: &'a [AlertResult],
    pub project: Option<&'a ProjectContext>,
    pub semantic: Option<&'a SemanticAnalysis>,
}

/// A guard over collected results plus the insight it yields
pub trait SynthesisRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &SynthesisInput<'_>) -> Option<InsightResult>;
}

/// Safety findings alongside a schedule forecast
#[derive(Debug, Default)]
pub struct SafetyScheduleCorrelation;

impl SynthesisRule for SafetyScheduleCorrelation {
    fn name(&self) -> &'static str {
        "safety_schedule_correlation"
    }

    fn apply(&self, input: &SynthesisInput<'_>) -> Option<InsightResult> {
        let has_safety = input
            .insights
            .iter()
            .any(|insight| insight.category == InsightCategory::Safety);
        let has_schedule = input
            .predictions
            .iter()
            .any(|prediction| prediction.kind == PredictionKind::ScheduleDelay);
        if !(has_safety && has_schedule) {
            return None;
        }

        Some(InsightResult {
            kind: insight_kind::CORRELATION.to_string(),
            category: InsightCategory::Correlation,
            title: "Safety findings may affect the schedule".to_string(),
            description: "Safety issues were found alongside forecast schedule impacts; \
                          corrective work can extend the affected activities"
                .to_string(),
            confidence: 0.75,
            relevance: 0.8,
            source: None,
        })
    }
}

#[derive(Debug, Default)]
pub struct DecliningHealthTrend;

impl SynthesisRule for DecliningHealthTrend {
    fn name(&self) -> &'static str {
        "declining_health_trend"
    }

    fn apply(&self, input: &SynthesisInput<'_>) -> Option<InsightResult> {
        let project = input.project?;
        if project.health.trend != HealthTrend::Declining {
            return None;
        }

        Some(InsightResult {
            kind: insight_kind::TREND_ALERT.to_string(),
            category: InsightCategory::Trend,
            title: format!("{} health is declining", project.name),
            description: format!(
                "Health score {:.0}% and falling",
                project.health.score * 100.0
            ),
            confidence: 0.85,
            relevance: 0.95,
            source: None,
        })
    }
}

/// Urgent wording combined with a severe hazard
#[derive(Debug, Default)]
pub struct UrgentHazardEscalation;

impl SynthesisRule for UrgentHazardEscalation {
    fn name(&self) -> &'static str {
        "urgent_hazard_escalation"
    }

    fn apply(&self, input: &SynthesisInput<'_>) -> Option<InsightResult> {
        let urgency = input.semantic?.sentiment.urgency;
        if urgency < ESCALATION_URGENCY {
            return None;
        }
        let hazard = input.alerts.iter().find(|alert| {
            alert.severity >= Severity::High
                && alert.source == Some(crate::collaborators::Layer::SafetyQuality)
        })?;

        Some(InsightResult {
            kind: insight_kind::ESCALATION.to_string(),
            category: InsightCategory::Safety,
            title: "Escalate: urgent report of a severe hazard".to_string(),
            description: format!("{}: {}", hazard.title, hazard.message),
            confidence: 0.8,
            relevance: 1.0,
            source: None,
        })
    }
}

/// Ordered list of [`SynthesisRule`]s
pub struct CompositeSynthesizer {
    rules: Vec<Box<dyn SynthesisRule>>,
}

impl std::fmt::Debug for CompositeSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|rule| rule.name()).collect();
        f.debug_struct("CompositeSynthesizer")
            .field("rules", &names)
            .finish()
    }
}

impl CompositeSynthesizer {
    /// Synthesizer with no rules
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, rule: impl SynthesisRule + 'static) -> Self {
        self.add_rule(rule);
        self
    }

    pub fn add_rule(&mut self, rule: impl SynthesisRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Derived insights, in rule order
    pub fn synthesize(&self, input: &SynthesisInput<'_>) -> Vec<InsightResult> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let insight = rule.apply(input);
                if insight.is_some() {
                    tracing::debug!(rule = rule.name(), "synthesis rule fired");
                }
                insight
            })
            .collect()
    }
}

impl Default for CompositeSynthesizer {
    fn default() -> Self {
        Self::empty()
            .with_rule(SafetyScheduleCorrelation)
            .with_rule(DecliningHealthTrend)
            .with_rule(UrgentHazardEscalation)
    }
}
