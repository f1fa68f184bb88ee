//! Final assessment result and its findings, recommendations and error records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::assessment::AiAssessment;
use crate::error::AssessError;
use crate::input::InputType;
use crate::score::{Category, CategoryScores, Confidence, ConfidenceScores, Score};
use crate::types::AnalysisData;

/// Area a finding or recommendation belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FindingCategory {
    Documentation,
    InstructionClarity,
    WorkflowAutomation,
    RiskCompliance,
    IntegrationStructure,
    FileSizeOptimization,
    InformationArchitecture,
    MachineReadableContent,
    ConversationalQueryReadiness,
    ActionOrientedFunctionality,
    PersonalizationContextAwareness,
    BusinessType,
    FileSize,
    System,
}

impl From<Category> for FindingCategory {
    fn from(category: Category) -> Self {
        match category {
            Category::Documentation => FindingCategory::Documentation,
            Category::InstructionClarity => FindingCategory::InstructionClarity,
            Category::WorkflowAutomation => FindingCategory::WorkflowAutomation,
            Category::RiskCompliance => FindingCategory::RiskCompliance,
            Category::IntegrationStructure => FindingCategory::IntegrationStructure,
            Category::FileSizeOptimization => FindingCategory::FileSizeOptimization,
            Category::InformationArchitecture => FindingCategory::InformationArchitecture,
            Category::MachineReadableContent => FindingCategory::MachineReadableContent,
            Category::ConversationalQueryReadiness => {
                FindingCategory::ConversationalQueryReadiness
            }
            Category::ActionOrientedFunctionality => FindingCategory::ActionOrientedFunctionality,
            Category::PersonalizationContextAwareness => {
                FindingCategory::PersonalizationContextAwareness
            }
        }
    }
}

impl FindingCategory {
    pub fn key(self) -> &'static str {
        match self {
            FindingCategory::BusinessType => "businessType",
            FindingCategory::FileSize => "fileSize",
            FindingCategory::System => "system",
            FindingCategory::Documentation => Category::Documentation.key(),
            FindingCategory::InstructionClarity => Category::InstructionClarity.key(),
            FindingCategory::WorkflowAutomation => Category::WorkflowAutomation.key(),
            FindingCategory::RiskCompliance => Category::RiskCompliance.key(),
            FindingCategory::IntegrationStructure => Category::IntegrationStructure.key(),
            FindingCategory::FileSizeOptimization => Category::FileSizeOptimization.key(),
            FindingCategory::InformationArchitecture => Category::InformationArchitecture.key(),
            FindingCategory::MachineReadableContent => Category::MachineReadableContent.key(),
            FindingCategory::ConversationalQueryReadiness => {
                Category::ConversationalQueryReadiness.key()
            }
            FindingCategory::ActionOrientedFunctionality => {
                Category::ActionOrientedFunctionality.key()
            }
            FindingCategory::PersonalizationContextAwareness => {
                Category::PersonalizationContextAwareness.key()
            }
        }
    }
}

/// Ordered most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

/// Ordered most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

impl Effort {
    /// Rough calendar estimate shown next to a recommendation
    pub fn timeline(self) -> &'static str {
        match self {
            Effort::Low => "1-2 days",
            Effort::Medium => "1-2 weeks",
            Effort::High => "1-2 months",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: String,
    pub category: FindingCategory,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: Vec<String>,
    pub impact: String,
    pub confidence: Confidence,
}

impl Finding {
    pub fn new(
        category: FindingCategory,
        severity: Severity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let description = description.into();
        Self {
            id: stable_id(category.key(), &title, &description),
            category,
            severity,
            title,
            description,
            evidence: Vec::new(),
            impact: String::new(),
            confidence: Confidence::FULL,
        }
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub category: FindingCategory,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub impact: String,
    pub effort: Effort,
    pub timeline: String,
}

impl Recommendation {
    pub fn new(
        category: FindingCategory,
        priority: Priority,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let title = title.into();
        let description = description.into();
        Self {
            id: stable_id(category.key(), &title, &description),
            category,
            priority,
            title,
            description,
            impact: String::new(),
            effort: Effort::Medium,
            timeline: Effort::Medium.timeline().to_string(),
        }
    }

    pub fn with_impact(mut self, impact: impl Into<String>) -> Self {
        self.impact = impact.into();
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = effort;
        self.timeline = effort.timeline().to_string();
        self
    }
}

/// `<category>-<8 hex>` derived from the content, so identical items share an id
fn stable_id(prefix: &str, title: &str, description: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update([0u8]);
    hasher.update(description.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{hex}")
}

/// A failure recorded in the result metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    pub category: String,
    pub timestamp: DateTime<Utc>,
    pub recoverable: bool,
}

impl ErrorRecord {
    pub fn from_error(err: &AssessError) -> Self {
        let kind = err.kind();
        Self {
            code: kind.code().to_string(),
            message: err.to_string(),
            category: kind.category().to_string(),
            timestamp: Utc::now(),
            recoverable: err.is_retryable(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScores {
    pub overall: Score,
    pub categories: CategoryScores,
    pub confidence: ConfidenceScores,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    pub analysis_time_ms: u64,
    pub retry_count: u32,
    pub fallback_used: bool,
    pub errors: Vec<ErrorRecord>,
    pub warnings: Vec<String>,
}

/// Complete outcome of one assessment, built once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub scores: AssessmentScores,
    pub analysis: AnalysisData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<AiAssessment>,
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
    pub metadata: ResultMetadata,
}
