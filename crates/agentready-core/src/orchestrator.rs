//! End-to-end pipeline for one input
//!
//! Static analysis, then the AI assessment, then the best-effort secondary
//! analysis for the input type, unified into a [`UnifiedResult`]. Steps run
//! strictly in sequence; the registry handles caching and retries.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::assessment::{AiAssessment, Insights};
use crate::error::{AssessError, Result};
use crate::input::{AssessmentInput, InputType};
use crate::registry::PluginRegistry;
use crate::types::{
    AnalysisData, AnalysisPayload, AnalysisResult, BusinessTypeAnalysis, FileSizeAnalysis,
    PluginType,
};

/// Most findings or recommendations carried by a unified result
pub const MAX_MERGED_ITEMS: usize = 10;

const AI_WEIGHT: f64 = 0.7;
const BUSINESS_TYPE_WEIGHT: f64 = 0.2;
const FILE_SIZE_WEIGHT: f64 = 0.1;

/// Everything one pipeline run produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedResult {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// 0–100
    pub overall_score: f64,
    /// Output of the primary analyzer
    pub primary: AnalysisResult,
    pub ai_assessment: Option<AiAssessment>,
    pub insights: Option<Insights>,
    pub business_type_analysis: Option<BusinessTypeAnalysis>,
    pub file_size_analysis: Option<FileSizeAnalysis>,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
    /// Secondary steps that failed and were skipped
    pub warnings: Vec<String>,
    /// Attempts beyond the first, summed over every step
    pub retry_count: u32,
}

impl UnifiedResult {
    /// Canonical view of every successful analysis
    pub fn analysis_data(&self) -> AnalysisData {
        let mut data = AnalysisData::default();
        data.absorb(self.primary.payload.clone());
        if let Some(business) = &self.business_type_analysis {
            data.absorb(AnalysisPayload::BusinessType(business.clone()));
        }
        if let Some(file_size) = &self.file_size_analysis {
            data.absorb(AnalysisPayload::FileSize(file_size.clone()));
        }
        data
    }
}

pub struct Orchestrator {
    registry: Arc<PluginRegistry>,
    ai_enabled: bool,
}

impl Orchestrator {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            ai_enabled: true,
        }
    }

    pub fn with_ai_assessment(mut self, enabled: bool) -> Self {
        self.ai_enabled = enabled;
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub async fn run(
        &self,
        input: &AssessmentInput,
        cancel: &CancellationToken,
    ) -> Result<UnifiedResult> {
        let primary = self.registry.execute_analysis(input, cancel).await?;
        let mut retry_count = primary.retries();
        let primary = primary.value;

        let (ai_assessment, insights) = if self.ai_enabled {
            let executed = self.registry.execute_ai_assessment(&primary, cancel).await?;
            retry_count += executed.retries();
            let insights = self
                .registry
                .resolve_ai_assessor(primary.plugin_type())
                .map(|assessor| assessor.generate_insights(&executed.value));
            (Some(executed.value), insights)
        } else {
            (None, None)
        };

        let mut warnings = Vec::new();
        let mut business_type_analysis = None;
        let mut file_size_analysis = None;

        let secondary_type = match input.input_type {
            InputType::Website => PluginType::BusinessType,
            InputType::Repository => PluginType::FileSize,
        };
        match self
            .registry
            .execute_analysis_as(secondary_type, input, cancel)
            .await
        {
            Ok(executed) => {
                retry_count += executed.retries();
                match executed.value.payload {
                    AnalysisPayload::BusinessType(data) => business_type_analysis = Some(data),
                    AnalysisPayload::FileSize(data) => file_size_analysis = Some(data),
                    other => warnings.push(format!(
                        "{secondary_type} analysis returned a {} payload",
                        other.plugin_type()
                    )),
                }
            }
            Err(AssessError::Cancelled) => return Err(AssessError::Cancelled),
            Err(err) => {
                warn!(url = %input.url, plugin_type = %secondary_type, error = %err, "secondary analysis skipped");
                warnings.push(format!("{secondary_type} analysis unavailable: {err}"));
            }
        }

        let overall_score = unified_overall_score(
            ai_assessment.as_ref(),
            business_type_analysis.as_ref(),
            file_size_analysis.as_ref(),
        );

        let empty = Vec::new();
        let (insight_findings, insight_recommendations) = insights
            .as_ref()
            .map(|i| (&i.key_findings, &i.recommendations))
            .unwrap_or((&empty, &empty));

        let findings = merge_unique(
            [
                insight_findings,
                business_type_analysis.as_ref().map_or(&empty, |b| &b.findings),
                file_size_analysis.as_ref().map_or(&empty, |f| &f.findings),
            ],
            MAX_MERGED_ITEMS,
        );
        let recommendations = merge_unique(
            [
                insight_recommendations,
                business_type_analysis
                    .as_ref()
                    .map_or(&empty, |b| &b.recommendations),
                file_size_analysis
                    .as_ref()
                    .map_or(&empty, |f| &f.recommendations),
            ],
            MAX_MERGED_ITEMS,
        );

        info!(
            url = %input.url,
            input_type = %input.input_type,
            overall_score,
            retry_count,
            warnings = warnings.len(),
            "pipeline finished"
        );

        Ok(UnifiedResult {
            id: Uuid::new_v4(),
            input_type: input.input_type,
            url: input.url.clone(),
            timestamp: Utc::now(),
            overall_score,
            primary,
            ai_assessment,
            insights,
            business_type_analysis,
            file_size_analysis,
            findings,
            recommendations,
            warnings,
            retry_count,
        })
    }
}

/// Weighted blend of the available sources, renormalized over the weights
/// that apply; zero when nothing succeeded.
pub fn unified_overall_score(
    ai: Option<&AiAssessment>,
    business: Option<&BusinessTypeAnalysis>,
    file_size: Option<&FileSizeAnalysis>,
) -> f64 {
    let terms = [
        ai.map(|a| (a.category_average(), AI_WEIGHT)),
        business.map(|b| (b.overall_score, BUSINESS_TYPE_WEIGHT)),
        file_size.map(|f| (f.agent_compatibility.overall, FILE_SIZE_WEIGHT)),
    ];

    let (sum, weights) = terms
        .into_iter()
        .flatten()
        .filter(|(score, _)| score.is_finite())
        .fold((0.0, 0.0), |(sum, weights), (score, weight): (f64, f64)| {
            (sum + score.clamp(0.0, 100.0) * weight, weights + weight)
        });

    if weights > 0.0 { sum / weights } else { 0.0 }
}

/// Concatenate in order, dropping exact duplicates and blank entries
pub fn merge_unique<'a, I>(sources: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a Vec<String>>,
{
    let mut seen: HashSet<&str> = HashSet::new();
    let mut merged = Vec::new();
    for item in sources.into_iter().flatten() {
        if merged.len() >= limit {
            break;
        }
        if item.trim().is_empty() || !seen.insert(item.as_str()) {
            continue;
        }
        merged.push(item.clone());
    }
    merged
}
