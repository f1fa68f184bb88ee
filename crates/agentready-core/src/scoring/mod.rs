//! Scoring engine
//!
//! Runs the orchestrator under a deadline, turns its output into weighted
//! category scores with confidence, and substitutes a zero-score fallback
//! result when the pipeline fails and fallback is enabled.

pub mod categories;
pub mod confidence;
pub mod findings;
pub mod legacy;

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{AssessError, ErrorKind, Result};
use crate::input::{AssessmentInput, InputType};
use crate::orchestrator::{Orchestrator, UnifiedResult};
use crate::registry::PluginRegistry;
use crate::report::{AssessmentResult, AssessmentScores, ErrorRecord, ResultMetadata};
use crate::score::{Category, CategoryScores, ConfidenceScores, Score};
use crate::types::AnalysisData;

pub use legacy::{LegacyAssessmentResult, convert_to_legacy_format};

pub struct ScoringEngine {
    registry: Arc<PluginRegistry>,
    config: EngineConfig,
}

impl ScoringEngine {
    /// Validate `config`, build a registry with its retry and cache settings
    /// and let `register` populate it.
    pub fn new<F>(config: EngineConfig, register: F) -> Result<Self>
    where
        F: FnOnce(&mut PluginRegistry) -> Result<()>,
    {
        config.validate()?;
        let mut registry = PluginRegistry::new(config.registry_config());
        register(&mut registry)?;
        Ok(Self {
            registry: Arc::new(registry),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn assess(&self, input: &AssessmentInput) -> Result<AssessmentResult> {
        self.assess_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// Assess `input`; cancelling `cancel` aborts the run with
    /// [`AssessError::Cancelled`], which is never replaced by a fallback.
    pub async fn assess_with_cancel(
        &self,
        input: &AssessmentInput,
        cancel: &CancellationToken,
    ) -> Result<AssessmentResult> {
        input.validate()?;
        let started = Instant::now();

        let run_token = cancel.child_token();
        let orchestrator = Orchestrator::new(self.registry.clone())
            .with_ai_assessment(self.config.enable_ai_assessment);

        let outcome =
            match tokio::time::timeout(self.config.timeout, orchestrator.run(input, &run_token))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    run_token.cancel();
                    Err(AssessError::Timeout(format!(
                        "assessment did not finish within {} ms",
                        self.config.timeout.as_millis()
                    )))
                }
            };

        match outcome {
            Ok(unified) => Ok(self.score(input, unified, started)),
            Err(err) => {
                let kind = err.root_cause().kind();
                if matches!(kind, ErrorKind::Validation | ErrorKind::Cancelled)
                    || !self.config.fallback_to_static
                {
                    return Err(err);
                }
                warn!(url = %input.url, error = %err, "assessment failed, returning fallback result");
                Ok(fallback_result(input, &err, started.elapsed().as_millis() as u64))
            }
        }
    }

    fn score(&self, input: &AssessmentInput, unified: UnifiedResult, started: Instant) -> AssessmentResult {
        let data = unified.analysis_data();
        let ai = unified.ai_assessment.as_ref();

        let base = categories::base_category_scores(&data);
        let ai_scores = ai.map(categories::ai_category_scores).unwrap_or_default();
        let combined = categories::combine(&base, &ai_scores);

        let confidence =
            confidence::confidence_scores(&data, ai, &self.config.confidence_thresholds);

        let mut category_scores = CategoryScores::default();
        let website = input.input_type == InputType::Website;
        for category in Category::CANONICAL
            .into_iter()
            .chain(Category::WEBSITE_ONLY.into_iter().filter(|_| website))
        {
            let value = combined.get(&category).copied().unwrap_or(0.0);
            category_scores.set(category, Score::percent(value, confidence.overall));
        }

        let overall = Score::percent(
            categories::overall_score(&category_scores, &self.config.category_weights),
            confidence.overall,
        );
        let collected = findings::collect(&data, ai);

        info!(
            url = %input.url,
            overall = overall.value,
            confidence = confidence.overall.value(),
            pipeline_score = unified.overall_score,
            findings = collected.findings.len(),
            "assessment scored"
        );

        AssessmentResult {
            id: unified.id,
            input_type: input.input_type,
            url: input.url.clone(),
            timestamp: unified.timestamp,
            scores: AssessmentScores {
                overall,
                categories: category_scores,
                confidence,
            },
            analysis: data,
            ai_assessment: unified.ai_assessment,
            findings: collected.findings,
            recommendations: collected.recommendations,
            metadata: ResultMetadata {
                analysis_time_ms: started.elapsed().as_millis() as u64,
                retry_count: unified.retry_count,
                fallback_used: false,
                errors: Vec::new(),
                warnings: unified.warnings,
            },
        }
    }
}

/// Zero-score result describing `err`
pub fn fallback_result(
    input: &AssessmentInput,
    err: &AssessError,
    analysis_time_ms: u64,
) -> AssessmentResult {
    let retry_count = match err {
        AssessError::AnalysisFailed { attempts, .. }
        | AssessError::AssessmentFailed { attempts, .. } => attempts.saturating_sub(1),
        _ => 0,
    };

    AssessmentResult {
        id: Uuid::new_v4(),
        input_type: input.input_type,
        url: input.url.clone(),
        timestamp: Utc::now(),
        scores: AssessmentScores {
            overall: Score::zero(),
            categories: CategoryScores::zeroed(input.input_type == InputType::Website),
            confidence: ConfidenceScores::zero(),
        },
        analysis: AnalysisData::default(),
        ai_assessment: None,
        findings: vec![findings::failure_finding(&err.to_string())],
        recommendations: vec![findings::retry_recommendation()],
        metadata: ResultMetadata {
            analysis_time_ms,
            retry_count,
            fallback_used: true,
            errors: vec![ErrorRecord::from_error(err)],
            warnings: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::FindingCategory;

    #[test]
    fn test_fallback_result_shape() {
        let input = AssessmentInput::new(InputType::Website, "https://example.com").unwrap();
        let err = AssessError::AnalysisFailed {
            analyzer: "website-analyzer".to_string(),
            attempts: 3,
            last: Box::new(AssessError::Network("connection refused".into())),
        };

        let result = fallback_result(&input, &err, 12);
        assert!(result.metadata.fallback_used);
        assert_eq!(result.metadata.retry_count, 2);
        assert_eq!(result.metadata.errors.len(), 1);
        assert_eq!(result.metadata.errors[0].code, "ANALYSIS_FAILED");
        assert_eq!(result.scores.overall.value, 0.0);
        assert_eq!(result.scores.categories.iter().count(), 11);
        assert!(result.scores.categories.iter().all(|(_, s)| s.value == 0.0 && s.max_value == 100.0));
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].category, FindingCategory::System);
        assert_eq!(result.recommendations.len(), 1);
    }

    #[test]
    fn test_fallback_for_repository_has_canonical_categories_only() {
        let input = AssessmentInput::new(InputType::Repository, "https://github.com/a/b").unwrap();
        let result = fallback_result(&input, &AssessError::Timeout("slow".into()), 0);
        assert_eq!(result.scores.categories.iter().count(), 6);
        assert_eq!(result.metadata.retry_count, 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = EngineConfig {
            max_retries: 0,
            ..Default::default()
        };
        let mut registered = false;
        let result = ScoringEngine::new(config, |_| {
            registered = true;
            Ok(())
        });
        assert!(result.is_err());
        assert!(!registered);
    }
}
