//! Intent classification
//!
//! Resolution order, first match wins: the caller's explicit intent, the
//! semantic collaborator's primary label, the keyword table, then
//! [`Intent::Question`].

use crate::collaborators::SemanticAnalysis;
use crate::query::{Intent, Query};

/// Ordered keyword rules; rows are tried top to bottom and a keyword matches any word it starts
pub const KEYWORD_RULES: &[(Intent, &[&str])] = &[
    (Intent::Prediction, &["predict", "forecast", "will"]),
    (Intent::Recommendation, &["recommend", "suggest", "should"]),
    (Intent::Alert, &["alert", "warning", "risk"]),
    (Intent::Search, &["find", "search", "where"]),
    (Intent::Analysis, &["analyze", "compare", "evaluate"]),
];

/// Map a semantic intent label onto an [`Intent`]
pub fn intent_for_label(label: &str) -> Option<Intent> {
    match label.to_ascii_lowercase().as_str() {
        "query" => Some(Intent::Question),
        "analyze" => Some(Intent::Analysis),
        "predict" => Some(Intent::Prediction),
        _ => None,
    }
}

/// Classify a query, using semantic hints when the mandatory analysis succeeded
pub fn classify(query: &Query, hints: Option<&SemanticAnalysis>) -> Intent {
    if let Some(intent) = query.explicit_intent {
        return intent;
    }

    if let Some(intent) = hints
        .and_then(SemanticAnalysis::primary_intent)
        .and_then(|detected| intent_for_label(&detected.label))
    {
        return intent;
    }

    classify_text(&query.text)
}

/// Keyword-table classification of raw text, defaulting to `Question`
pub fn classify_text(text: &str) -> Intent {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    KEYWORD_RULES
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|k| words.iter().any(|w| w.starts_with(k)))
        })
        .map(|(intent, _)| *intent)
        .unwrap_or(Intent::Question)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::DetectedIntent;

    fn query(text: &str) -> Query {
        Query::builder().user("u").project("P1").text(text).build()
    }

    fn hints(label: &str) -> SemanticAnalysis {
        SemanticAnalysis {
            intents: vec![DetectedIntent {
                label: label.to_string(),
                confidence: 0.9,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_keyword_rows() {
        assert_eq!(classify_text("predict schedule delay for foundation"), Intent::Prediction);
        assert_eq!(classify_text("find clash near east wing"), Intent::Search);
        assert_eq!(classify_text("Any WARNING signs on site?"), Intent::Alert);
        assert_eq!(classify_text("please evaluate the pour"), Intent::Analysis);
        assert_eq!(classify_text("what is our crew size"), Intent::Question);
    }

    #[test]
    fn test_row_order_decides_ties() {
        // "should" (Recommendation) and "risk" (Alert): Recommendation is the earlier row
        assert_eq!(classify_text("what risk should we watch"), Intent::Recommendation);
        // "will" puts Prediction ahead of Search
        assert_eq!(classify_text("where will the crane go"), Intent::Prediction);
    }

    #[test]
    fn test_inflected_keywords() {
        assert_eq!(classify_text("What are the risks?"), Intent::Alert);
        assert_eq!(classify_text("any warnings on level 3"), Intent::Alert);
        assert_eq!(classify_text("forecasts for the east wing"), Intent::Prediction);
        assert_eq!(classify_text("recommendations for the pour"), Intent::Recommendation);
        assert_eq!(classify_text("searching the RFI log"), Intent::Search);
    }

    #[test]
    fn test_keyword_must_start_a_word() {
        assert_eq!(classify_text("unforecastable weather"), Intent::Question);
        assert_eq!(classify_text("a high-risk lift"), Intent::Alert);
        assert_eq!(classify_text("the crew is unsearchable"), Intent::Question);
    }

    #[test]
    fn test_explicit_intent_wins() {
        let mut q = query("predict the delay");
        q.explicit_intent = Some(Intent::Comparison);
        assert_eq!(classify(&q, Some(&hints("analyze"))), Intent::Comparison);
    }

    #[test]
    fn test_semantic_label_beats_keywords() {
        let q = query("find the defect log");
        assert_eq!(classify(&q, Some(&hints("analyze"))), Intent::Analysis);
        assert_eq!(classify(&q, Some(&hints("unknown"))), Intent::Search);
        assert_eq!(classify(&q, None), Intent::Search);
    }
}
