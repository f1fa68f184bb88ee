//! Scores, categories and the canonical confidence scale

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ConfidenceThresholds;

/// A confidence value on the canonical fraction scale `[0.0, 1.0]`
///
/// Values arriving on a 0–100 scale (AI sub-analyses) are converted with
/// [`Confidence::from_percent`] at the point they enter the model, so every
/// layer above the wire format compares like with like.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0.0);
    pub const FULL: Confidence = Confidence(1.0);

    /// Build from a fraction, clamping to `[0, 1]`; non-finite input becomes zero
    pub fn from_fraction(value: f64) -> Self {
        if value.is_finite() {
            Confidence(value.clamp(0.0, 1.0))
        } else {
            Confidence::ZERO
        }
    }

    /// Build from a 0–100 percentage
    pub fn from_percent(value: f64) -> Self {
        Self::from_fraction(value / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }

    /// Arithmetic mean, `None` for an empty input
    pub fn mean<I: IntoIterator<Item = Confidence>>(values: I) -> Option<Confidence> {
        let (sum, count) = values
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), c| (sum + c.0, count + 1));
        (count > 0).then(|| Confidence::from_fraction(sum / count as f64))
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Confidence::from_fraction(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// Serde adapter for confidences carried on the 0–100 wire scale
pub mod percent {
    use super::Confidence;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Confidence, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_percent())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Confidence, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Ok(Confidence::from_percent(raw))
    }
}

/// Qualitative confidence band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    pub fn classify(confidence: Confidence, thresholds: &ConfidenceThresholds) -> Self {
        if confidence.value() >= thresholds.high {
            ConfidenceLevel::High
        } else if confidence.value() >= thresholds.medium {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Named score categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Category {
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
}

impl Category {
    /// The six categories that carry weight in the overall score
    pub const CANONICAL: [Category; 6] = [
        Category::Documentation,
        Category::InstructionClarity,
        Category::WorkflowAutomation,
        Category::RiskCompliance,
        Category::IntegrationStructure,
        Category::FileSizeOptimization,
    ];

    /// Categories only reported for website inputs
    pub const WEBSITE_ONLY: [Category; 5] = [
        Category::InformationArchitecture,
        Category::MachineReadableContent,
        Category::ConversationalQueryReadiness,
        Category::ActionOrientedFunctionality,
        Category::PersonalizationContextAwareness,
    ];

    /// camelCase key, matching the serialized form
    pub fn key(self) -> &'static str {
        match self {
            Category::Documentation => "documentation",
            Category::InstructionClarity => "instructionClarity",
            Category::WorkflowAutomation => "workflowAutomation",
            Category::RiskCompliance => "riskCompliance",
            Category::IntegrationStructure => "integrationStructure",
            Category::FileSizeOptimization => "fileSizeOptimization",
            Category::InformationArchitecture => "informationArchitecture",
            Category::MachineReadableContent => "machineReadableContent",
            Category::ConversationalQueryReadiness => "conversationalQueryReadiness",
            Category::ActionOrientedFunctionality => "actionOrientedFunctionality",
            Category::PersonalizationContextAwareness => "personalizationContextAwareness",
        }
    }

    /// Human readable label
    pub fn label(self) -> &'static str {
        match self {
            Category::Documentation => "Documentation",
            Category::InstructionClarity => "Instruction Clarity",
            Category::WorkflowAutomation => "Workflow Automation",
            Category::RiskCompliance => "Risk & Compliance",
            Category::IntegrationStructure => "Integration Structure",
            Category::FileSizeOptimization => "File Size Optimization",
            Category::InformationArchitecture => "Information Architecture",
            Category::MachineReadableContent => "Machine-Readable Content",
            Category::ConversationalQueryReadiness => "Conversational Query Readiness",
            Category::ActionOrientedFunctionality => "Action-Oriented Functionality",
            Category::PersonalizationContextAwareness => "Personalization & Context Awareness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A bounded score: `0 <= value <= max_value`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    pub value: f64,
    pub max_value: f64,
    pub percentage: f64,
    pub confidence: Confidence,
}

impl Score {
    pub const MAX: f64 = 100.0;

    pub fn new(value: f64, max_value: f64, confidence: Confidence) -> Self {
        let max_value = if max_value.is_finite() && max_value > 0.0 {
            max_value
        } else {
            Self::MAX
        };
        let value = if value.is_finite() {
            value.clamp(0.0, max_value)
        } else {
            0.0
        };
        Self {
            value,
            max_value,
            percentage: value / max_value * 100.0,
            confidence,
        }
    }

    /// Score on the standard 0–100 range
    pub fn percent(value: f64, confidence: Confidence) -> Self {
        Self::new(value, Self::MAX, confidence)
    }

    pub fn zero() -> Self {
        Self::percent(0.0, Confidence::ZERO)
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-category scores of one assessment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScores {
    pub documentation: Score,
    pub instruction_clarity: Score,
    pub workflow_automation: Score,
    pub risk_compliance: Score,
    pub integration_structure: Score,
    pub file_size_optimization: Score,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information_architecture: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_readable_content: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversational_query_readiness: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_oriented_functionality: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization_context_awareness: Option<Score>,
}

impl CategoryScores {
    /// All categories at `0/100`; website-only categories present when requested
    pub fn zeroed(include_website: bool) -> Self {
        let mut scores = Self::default();
        if include_website {
            for category in Category::WEBSITE_ONLY {
                scores.set(category, Score::zero());
            }
        }
        scores
    }

    pub fn get(&self, category: Category) -> Option<&Score> {
        match category {
            Category::Documentation => Some(&self.documentation),
            Category::InstructionClarity => Some(&self.instruction_clarity),
            Category::WorkflowAutomation => Some(&self.workflow_automation),
            Category::RiskCompliance => Some(&self.risk_compliance),
            Category::IntegrationStructure => Some(&self.integration_structure),
            Category::FileSizeOptimization => Some(&self.file_size_optimization),
            Category::InformationArchitecture => self.information_architecture.as_ref(),
            Category::MachineReadableContent => self.machine_readable_content.as_ref(),
            Category::ConversationalQueryReadiness => self.conversational_query_readiness.as_ref(),
            Category::ActionOrientedFunctionality => self.action_oriented_functionality.as_ref(),
            Category::PersonalizationContextAwareness => {
                self.personalization_context_awareness.as_ref()
            }
        }
    }

    pub fn set(&mut self, category: Category, score: Score) {
        match category {
            Category::Documentation => self.documentation = score,
            Category::InstructionClarity => self.instruction_clarity = score,
            Category::WorkflowAutomation => self.workflow_automation = score,
            Category::RiskCompliance => self.risk_compliance = score,
            Category::IntegrationStructure => self.integration_structure = score,
            Category::FileSizeOptimization => self.file_size_optimization = score,
            Category::InformationArchitecture => self.information_architecture = Some(score),
            Category::MachineReadableContent => self.machine_readable_content = Some(score),
            Category::ConversationalQueryReadiness => {
                self.conversational_query_readiness = Some(score)
            }
            Category::ActionOrientedFunctionality => {
                self.action_oriented_functionality = Some(score)
            }
            Category::PersonalizationContextAwareness => {
                self.personalization_context_awareness = Some(score)
            }
        }
    }

    /// Present categories, canonical ones first
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Score)> + '_ {
        Category::CANONICAL
            .into_iter()
            .chain(Category::WEBSITE_ONLY)
            .filter_map(move |category| self.get(category).map(|score| (category, score)))
    }
}

/// Confidence of each scoring source plus the combined value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceScores {
    pub overall: Confidence,
    pub static_analysis: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_assessment: Option<Confidence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type_analysis: Option<Confidence>,
    pub level: ConfidenceLevel,
}

impl ConfidenceScores {
    pub fn zero() -> Self {
        Self {
            overall: Confidence::ZERO,
            static_analysis: Confidence::ZERO,
            ai_assessment: None,
            business_type_analysis: None,
            level: ConfidenceLevel::Low,
        }
    }
}
