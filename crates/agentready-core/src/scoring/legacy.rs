//! Flat, integer-scored result shape for older consumers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::assessment::AiAssessment;
use crate::input::InputType;
use crate::report::{AssessmentResult, Priority, Severity};
use crate::score::ConfidenceLevel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAssessmentResult {
    pub id: String,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub url: String,
    pub timestamp: String,
    pub overall_score: i64,
    /// Keyed by camelCase category name
    pub category_scores: BTreeMap<String, i64>,
    /// 0–100
    pub confidence: i64,
    pub confidence_level: ConfidenceLevel,
    pub findings: Vec<LegacyFinding>,
    pub recommendations: Vec<LegacyRecommendation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<AiAssessment>,
    pub fallback_used: bool,
    pub analysis_time_ms: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyFinding {
    pub category: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecommendation {
    pub category: String,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub timeline: String,
}

/// Nearest integer; non-finite input becomes 0
pub fn round_score(value: f64) -> i64 {
    if value.is_finite() {
        value.round() as i64
    } else {
        0
    }
}

pub fn convert_to_legacy_format(result: &AssessmentResult) -> LegacyAssessmentResult {
    let scores = &result.scores;

    LegacyAssessmentResult {
        id: result.id.to_string(),
        input_type: result.input_type,
        url: result.url.clone(),
        timestamp: result.timestamp.to_rfc3339(),
        overall_score: round_score(scores.overall.value),
        category_scores: scores
            .categories
            .iter()
            .map(|(category, score)| (category.key().to_string(), round_score(score.value)))
            .collect(),
        confidence: round_score(scores.confidence.overall.as_percent()),
        confidence_level: scores.confidence.level,
        findings: result
            .findings
            .iter()
            .map(|f| LegacyFinding {
                category: f.category.key().to_string(),
                severity: f.severity,
                title: f.title.clone(),
                description: f.description.clone(),
            })
            .collect(),
        recommendations: result
            .recommendations
            .iter()
            .map(|r| LegacyRecommendation {
                category: r.category.key().to_string(),
                priority: r.priority,
                title: r.title.clone(),
                description: r.description.clone(),
                timeline: r.timeline.clone(),
            })
            .collect(),
        ai_assessment: result.ai_assessment.clone(),
        fallback_used: result.metadata.fallback_used,
        analysis_time_ms: result.metadata.analysis_time_ms,
        errors: result
            .metadata
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect(),
        warnings: result.metadata.warnings.clone(),
    }
}

impl From<&AssessmentResult> for LegacyAssessmentResult {
    fn from(result: &AssessmentResult) -> Self {
        convert_to_legacy_format(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{AssessmentScores, ResultMetadata};
    use crate::score::{Category, CategoryScores, Confidence, ConfidenceScores, Score};
    use crate::types::AnalysisData;
    use chrono::Utc;
    use uuid::Uuid;

    fn result_with(categories: CategoryScores, overall: Score) -> AssessmentResult {
        AssessmentResult {
            id: Uuid::new_v4(),
            input_type: InputType::Website,
            url: "https://example.com".to_string(),
            timestamp: Utc::now(),
            scores: AssessmentScores {
                overall,
                categories,
                confidence: ConfidenceScores::zero(),
            },
            analysis: AnalysisData::default(),
            ai_assessment: None,
            findings: Vec::new(),
            recommendations: Vec::new(),
            metadata: ResultMetadata::default(),
        }
    }

    #[test]
    fn test_round_score() {
        assert_eq!(round_score(82.5), 83);
        assert_eq!(round_score(82.49), 82);
        assert_eq!(round_score(f64::NAN), 0);
        assert_eq!(round_score(f64::INFINITY), 0);
    }

    #[test]
    fn test_every_category_is_rounded() {
        let mut categories = CategoryScores::zeroed(true);
        categories.set(Category::Documentation, Score::percent(81.6, Confidence::FULL));
        categories.set(Category::MachineReadableContent, Score::percent(12.4, Confidence::FULL));

        let legacy = convert_to_legacy_format(&result_with(
            categories,
            Score::percent(47.5, Confidence::FULL),
        ));

        assert_eq!(legacy.overall_score, 48);
        assert_eq!(legacy.category_scores.len(), 11);
        assert_eq!(legacy.category_scores["documentation"], 82);
        assert_eq!(legacy.category_scores["machineReadableContent"], 12);
        assert_eq!(legacy.confidence, 0);
    }

    #[test]
    fn test_conversion_tolerates_non_finite_values() {
        let mut overall = Score::zero();
        overall.value = f64::NAN;
        let mut categories = CategoryScores::default();
        categories.documentation.value = f64::NEG_INFINITY;

        let legacy = LegacyAssessmentResult::from(&result_with(categories, overall));
        assert_eq!(legacy.overall_score, 0);
        assert_eq!(legacy.category_scores["documentation"], 0);

        let json = serde_json::to_value(&legacy).unwrap();
        assert_eq!(json["overallScore"], 0);
        assert_eq!(json["type"], "website");
    }
}
