//! Capability traits implemented by analyzers and AI assessors
//!
//! Plugins report failures through `anyhow`; the registry converts them with
//! [`AssessError::from_plugin`](crate::error::AssessError::from_plugin), so a
//! plugin that returns a typed `AssessError` keeps its kind.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assessment::{AiAssessment, Insights};
use crate::input::AssessmentInput;
use crate::types::{AnalysisResult, PluginInfo};

/// Outcome of checking an analyzer's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Plugin-defined quality score, 0–100
    pub score: f64,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            score: 100.0,
        }
    }

    pub fn invalid(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
            score: 0.0,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }
}

/// A static analyzer for one [`PluginType`](crate::types::PluginType)
#[async_trait]
pub trait AnalyzerPlugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    fn can_handle(&self, input: &AssessmentInput) -> bool;

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult>;

    /// Default check: the payload matches the analyzer's own type
    fn validate(&self, result: &AnalysisResult) -> ValidationReport {
        let expected = self.info().plugin_type;
        if result.plugin_type() == expected {
            ValidationReport::valid()
        } else {
            ValidationReport::invalid(vec![format!(
                "expected a {expected} payload, got {}",
                result.plugin_type()
            )])
        }
    }
}

/// An assessor that turns an analysis into an [`AiAssessment`]
#[async_trait]
pub trait AiAssessorPlugin: Send + Sync {
    fn info(&self) -> PluginInfo;

    fn can_handle(&self, analysis: &AnalysisResult) -> bool;

    async fn assess(&self, analysis: &AnalysisResult) -> anyhow::Result<AiAssessment>;

    fn generate_insights(&self, assessment: &AiAssessment) -> Insights {
        Insights::from_assessment(assessment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnalysisPayload, FileSizeAnalysis, PluginType, WebsiteAnalysis};
    use std::time::Instant;

    struct WebsiteOnly;

    #[async_trait]
    impl AnalyzerPlugin for WebsiteOnly {
        fn info(&self) -> PluginInfo {
            PluginInfo::new(PluginType::Website, "website-only", "0.1.0")
        }

        fn can_handle(&self, _input: &AssessmentInput) -> bool {
            true
        }

        async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
            Ok(AnalysisResult::new(
                AnalysisPayload::Website(WebsiteAnalysis {
                    url: input.url.clone(),
                    ..Default::default()
                }),
                &self.info(),
                Instant::now(),
            ))
        }
    }

    #[test]
    fn test_default_validate_checks_payload_type() {
        let plugin = WebsiteOnly;
        let info = plugin.info();

        let good = AnalysisResult::new(
            AnalysisPayload::Website(WebsiteAnalysis::default()),
            &info,
            Instant::now(),
        );
        assert!(plugin.validate(&good).is_valid);

        let bad = AnalysisResult::new(
            AnalysisPayload::FileSize(FileSizeAnalysis::default()),
            &info,
            Instant::now(),
        );
        let report = plugin.validate(&bad);
        assert!(!report.is_valid);
        assert!(report.errors[0].contains("file-size"));
    }
}
