//! In-memory plugins and fixtures shared by the integration tests

#![allow(dead_code)]

use agentready_core::assessment::{AiDimension, DetailedAnalysis, SubAnalysis};
use agentready_core::types::{
    AgentCompatibility, BusinessType, BusinessTypeAnalysis, FileSizeAnalysis, RepositoryAnalysis,
    WebsiteAnalysis,
};
use agentready_core::{
    AiAssessment, AiAssessorPlugin, AnalysisPayload, AnalysisResult, AnalyzerPlugin, AssessError,
    AssessmentInput, Confidence, EngineConfig, PluginInfo, PluginRegistry, PluginType,
    ScoringEngine,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Analyzer returning a fixed payload, optionally failing or slow
pub struct MockAnalyzer {
    info: PluginInfo,
    payload: AnalysisPayload,
    calls: Arc<AtomicUsize>,
    /// Calls that fail before the first success
    failures: usize,
    error: Option<AssessError>,
    delay: Option<Duration>,
}

impl MockAnalyzer {
    pub fn new(name: &str, payload: AnalysisPayload) -> Self {
        Self {
            info: PluginInfo::new(payload.plugin_type(), name, "0.1.0"),
            payload,
            calls: Arc::new(AtomicUsize::new(0)),
            failures: 0,
            error: None,
            delay: None,
        }
    }

    /// Fail every call with `error`
    pub fn failing(mut self, error: AssessError) -> Self {
        self.failures = usize::MAX;
        self.error = Some(error);
        self
    }

    /// Fail the first `count` calls with a network error
    pub fn flaky(mut self, count: usize) -> Self {
        self.failures = count;
        self.error = Some(AssessError::Network("connection reset".to_string()));
        self
    }

    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl AnalyzerPlugin for MockAnalyzer {
    fn info(&self) -> PluginInfo {
        self.info.clone()
    }

    fn can_handle(&self, _input: &AssessmentInput) -> bool {
        true
    }

    async fn analyze(&self, _input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures
            && let Some(error) = &self.error
        {
            return Err(error.clone().into());
        }
        Ok(AnalysisResult::new(self.payload.clone(), &self.info, Instant::now()))
    }
}

/// Unified assessor returning a fixed assessment, optionally failing
pub struct MockAssessor {
    assessment: AiAssessment,
    calls: Arc<AtomicUsize>,
    error: Option<AssessError>,
}

impl MockAssessor {
    pub fn new(assessment: AiAssessment) -> Self {
        Self {
            assessment,
            calls: Arc::new(AtomicUsize::new(0)),
            error: None,
        }
    }

    pub fn failing(error: AssessError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(assessment(10.0))
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl AiAssessorPlugin for MockAssessor {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::Unified, "mock-assessor", "0.1.0")
    }

    fn can_handle(&self, _analysis: &AnalysisResult) -> bool {
        true
    }

    async fn assess(&self, _analysis: &AnalysisResult) -> anyhow::Result<AiAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(error) => Err(error.clone().into()),
            None => Ok(self.assessment.clone()),
        }
    }
}

pub fn calls(counter: &Arc<AtomicUsize>) -> usize {
    counter.load(Ordering::SeqCst)
}

/// Assessment whose every metric equals `metric` (0–20)
pub fn assessment(metric: f64) -> AiAssessment {
    let sub = |dimension: AiDimension| SubAnalysis {
        metrics: dimension
            .metric_names()
            .iter()
            .map(|name| (name.to_string(), metric))
            .collect(),
        findings: vec![format!("{} finding", dimension.key())],
        recommendations: vec![format!("{} recommendation", dimension.key())],
        confidence: Confidence::from_fraction(0.8),
    };
    AiAssessment {
        instruction_clarity: true,
        workflow_automation: true,
        context_efficiency: true,
        risk_compliance: true,
        overall_success: true,
        reason: "fixture".to_string(),
        detailed_analysis: Some(DetailedAnalysis {
            instruction_clarity: sub(AiDimension::InstructionClarity),
            workflow_automation: sub(AiDimension::WorkflowAutomation),
            context_efficiency: sub(AiDimension::ContextEfficiency),
            risk_compliance: sub(AiDimension::RiskCompliance),
        }),
    }
}

/// README, CONTRIBUTING, AGENTS and LICENSE present; nothing else
pub fn documented_repository() -> AnalysisPayload {
    AnalysisPayload::Repository(RepositoryAnalysis {
        owner: "acme".to_string(),
        name: "widgets".to_string(),
        default_branch: "main".to_string(),
        has_readme: true,
        has_contributing: true,
        has_agents: true,
        has_license: true,
        instruction_files: vec!["AGENTS.md".to_string()],
        ..Default::default()
    })
}

pub fn website() -> AnalysisPayload {
    AnalysisPayload::Website(WebsiteAnalysis {
        url: "https://shop.example".to_string(),
        status_code: 200,
        is_https: true,
        title: Some("Shop".to_string()),
        word_count: 500,
        ..Default::default()
    })
}

pub fn business(score: f64, findings: Vec<String>) -> AnalysisPayload {
    AnalysisPayload::BusinessType(BusinessTypeAnalysis {
        business_type: BusinessType::Ecommerce,
        confidence: Confidence::from_fraction(0.7),
        matched_keywords: vec!["cart".to_string()],
        agentic_flows: Vec::new(),
        overall_score: score,
        findings,
        recommendations: vec!["Add product markup".to_string()],
    })
}

pub fn file_size(overall: f64) -> AnalysisPayload {
    AnalysisPayload::FileSize(FileSizeAnalysis {
        total_files: 10,
        agent_compatibility: AgentCompatibility {
            overall,
            ..Default::default()
        },
        findings: vec!["1 file(s) are between 100 KB and 1 MB".to_string()],
        ..Default::default()
    })
}

/// Defaults with millisecond retry delays
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry_delay: Duration::from_millis(1),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

pub fn engine<F>(config: EngineConfig, register: F) -> ScoringEngine
where
    F: FnOnce(&mut PluginRegistry) -> agentready_core::Result<()>,
{
    ScoringEngine::new(config, register).unwrap()
}

pub fn repository_input() -> AssessmentInput {
    AssessmentInput::new(agentready_core::InputType::Repository, "https://github.com/acme/widgets").unwrap()
}

pub fn website_input() -> AssessmentInput {
    AssessmentInput::new(agentready_core::InputType::Website, "https://shop.example").unwrap()
}
