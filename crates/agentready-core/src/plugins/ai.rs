//! Language-model backed assessor for every analysis type

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use super::llm::{LlmProvider, LlmRequest, extract_json_from_text};
use crate::assessment::{AiAssessment, AiDimension, METRIC_MAX};
use crate::error::{AssessError, Result};
use crate::plugin::AiAssessorPlugin;
use crate::types::{AnalysisPayload, AnalysisResult, PluginInfo, PluginType};

/// Characters of serialized analysis included in the prompt
const MAX_ANALYSIS_CHARS: usize = 12_000;

const SYSTEM_PROMPT: &str = "You evaluate how ready a software repository or website is \
to be used by autonomous AI agents. You answer with a single JSON object and nothing else.";

pub struct UnifiedAiAssessor {
    provider: Arc<dyn LlmProvider>,
    temperature: f32,
    max_tokens: u32,
}

impl UnifiedAiAssessor {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            temperature: 0.2,
            max_tokens: 2_000,
        }
    }

    /// The request sent for `analysis`
    pub fn build_request(&self, analysis: &AnalysisResult) -> Result<LlmRequest> {
        let subject = match &analysis.payload {
            AnalysisPayload::Repository(repo) => format!("GitHub repository {}/{}", repo.owner, repo.name),
            AnalysisPayload::Website(site) => format!("website {}", site.url),
            AnalysisPayload::BusinessType(b) => format!("{} website", b.business_type.label()),
            AnalysisPayload::FileSize(_) => "repository file layout".to_string(),
        };
        let mut payload = serde_json::to_string_pretty(&analysis.payload)?;
        if payload.len() > MAX_ANALYSIS_CHARS {
            let cut = (0..=MAX_ANALYSIS_CHARS)
                .rev()
                .find(|i| payload.is_char_boundary(*i))
                .unwrap_or(0);
            payload.truncate(cut);
            payload.push_str("\n... (truncated)");
        }

        let mut prompt = format!(
            "Assess the {subject} from the static analysis below.\n\n\
             Analysis:\n{payload}\n\n\
             Return JSON with boolean fields instructionClarity, workflowAutomation, \
             contextEfficiency, riskCompliance and overallSuccess, a string field reason, \
             and an object detailedAnalysis with one entry per dimension. Each entry holds \
             the metrics listed below scored 0 to {METRIC_MAX}, a findings array, a \
             recommendations array and a confidence from 0 to 100.\n"
        );
        for dimension in AiDimension::ALL {
            let _ = writeln!(prompt, "- {}: {}", dimension.key(), dimension.metric_names().join(", "));
        }

        Ok(LlmRequest {
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_prompt: prompt,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        })
    }
}

/// Parse and range-check a model reply
pub fn parse_assessment(reply: &str) -> Result<AiAssessment> {
    let json = extract_json_from_text(reply)
        .ok_or_else(|| AssessError::InvalidResult("model reply contains no JSON object".to_string()))?;
    let assessment: AiAssessment = serde_json::from_str(json)
        .map_err(|e| AssessError::InvalidResult(format!("model reply does not match the schema: {e}")))?;
    assessment.check_ranges().map_err(AssessError::InvalidResult)?;
    Ok(assessment)
}

#[async_trait]
impl AiAssessorPlugin for UnifiedAiAssessor {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::Unified, "unified-ai-assessor", env!("CARGO_PKG_VERSION"))
    }

    fn can_handle(&self, _analysis: &AnalysisResult) -> bool {
        true
    }

    async fn assess(&self, analysis: &AnalysisResult) -> anyhow::Result<AiAssessment> {
        let request = self.build_request(analysis)?;
        let response = self.provider.complete(request).await?;
        debug!(
            model = %response.model,
            tokens = response.total_tokens,
            analysis = %analysis.plugin_type(),
            "received AI assessment"
        );
        Ok(parse_assessment(&response.content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plugins::llm::LlmResponse;
    use crate::types::RepositoryAnalysis;
    use std::sync::Mutex;
    use std::time::Instant;

    struct ScriptedProvider {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
            self.prompts.lock().unwrap().push(request.user_prompt);
            Ok(LlmResponse {
                content: self.reply.clone(),
                model: "scripted".to_string(),
                total_tokens: 0,
            })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn sub(metric: f64) -> String {
        format!(
            r#"{{"a": {metric}, "b": {metric}, "findings": ["f"], "recommendations": ["r"], "confidence": 80}}"#
        )
    }

    fn reply(metric: f64) -> String {
        format!(
            "```json\n{{\"instructionClarity\": true, \"workflowAutomation\": false, \
             \"contextEfficiency\": true, \"riskCompliance\": false, \"overallSuccess\": true, \
             \"reason\": \"ok\", \"detailedAnalysis\": {{\"instructionClarity\": {s}, \
             \"workflowAutomation\": {s}, \"contextEfficiency\": {s}, \"riskCompliance\": {s}}}}}\n```",
            s = sub(metric)
        )
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult::new(
            AnalysisPayload::Repository(RepositoryAnalysis {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
                ..Default::default()
            }),
            &PluginInfo::new(PluginType::Repository, "repository-analyzer", "1.0.0"),
            Instant::now(),
        )
    }

    fn assessor(reply: String) -> (UnifiedAiAssessor, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider {
            reply,
            prompts: Mutex::new(Vec::new()),
        });
        (UnifiedAiAssessor::new(provider.clone()), provider)
    }

    #[tokio::test]
    async fn test_assess_parses_fenced_reply() {
        let (assessor, provider) = assessor(reply(10.0));
        let assessment = assessor.assess(&analysis()).await.unwrap();

        assert!(assessment.instruction_clarity);
        let detail = assessment.detailed_analysis.as_ref().unwrap();
        assert_eq!(detail.instruction_clarity.score(), Some(50.0));
        assert!((detail.confidence().as_percent() - 80.0).abs() < 1e-9);

        let prompts = provider.prompts.lock().unwrap();
        assert!(prompts[0].contains("GitHub repository acme/widgets"));
        assert!(prompts[0].contains("stepByStepQuality"));
    }

    #[tokio::test]
    async fn test_out_of_range_metric_is_invalid() {
        let (assessor, _) = assessor(reply(25.0));
        let err = assessor.assess(&analysis()).await.unwrap_err();
        assert_eq!(AssessError::from_plugin(err).kind(), ErrorKind::InvalidResult);
    }

    #[test]
    fn test_reply_without_json() {
        let err = parse_assessment("I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResult);

        let err = parse_assessment(r#"{"reason": "missing flags"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidResult);
    }

    #[test]
    fn test_insights_from_reply() {
        let (assessor, _) = assessor(String::new());
        let assessment = parse_assessment(&reply(18.0)).unwrap();
        let insights = assessor.generate_insights(&assessment);
        assert!(!insights.key_findings.is_empty());
        assert!(!insights.recommendations.is_empty());
    }
}
