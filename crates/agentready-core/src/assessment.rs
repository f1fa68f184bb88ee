//! AI assessment model
//!
//! The wire format mirrors what the assessor asks the language model to
//! return: four capability flags, a verdict, and an optional detailed
//! breakdown whose metrics are scored 0–20 and whose confidence arrives on a
//! 0–100 scale.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::score::{Category, Confidence, percent};

/// Upper bound of a single detailed metric
pub const METRIC_MAX: f64 = 20.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiAssessment {
    pub instruction_clarity: bool,
    pub workflow_automation: bool,
    pub context_efficiency: bool,
    pub risk_compliance: bool,
    pub overall_success: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_analysis: Option<DetailedAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalysis {
    pub instruction_clarity: SubAnalysis,
    pub workflow_automation: SubAnalysis,
    pub context_efficiency: SubAnalysis,
    pub risk_compliance: SubAnalysis,
}

/// One dimension of the detailed analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnalysis {
    /// Named 0–20 metrics
    #[serde(flatten)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(with = "percent")]
    pub confidence: Confidence,
}

impl SubAnalysis {
    /// Mean metric rescaled to 0–100, `None` without metrics
    pub fn score(&self) -> Option<f64> {
        if self.metrics.is_empty() {
            return None;
        }
        let mean = self.metrics.values().sum::<f64>() / self.metrics.len() as f64;
        Some((mean * 100.0 / METRIC_MAX).clamp(0.0, 100.0))
    }
}

/// The four assessed dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AiDimension {
    InstructionClarity,
    WorkflowAutomation,
    ContextEfficiency,
    RiskCompliance,
}

impl AiDimension {
    pub const ALL: [AiDimension; 4] = [
        AiDimension::InstructionClarity,
        AiDimension::WorkflowAutomation,
        AiDimension::ContextEfficiency,
        AiDimension::RiskCompliance,
    ];

    /// Score category this dimension feeds
    pub fn category(self) -> Category {
        match self {
            AiDimension::InstructionClarity => Category::InstructionClarity,
            AiDimension::WorkflowAutomation => Category::WorkflowAutomation,
            AiDimension::ContextEfficiency => Category::Documentation,
            AiDimension::RiskCompliance => Category::RiskCompliance,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            AiDimension::InstructionClarity => "instructionClarity",
            AiDimension::WorkflowAutomation => "workflowAutomation",
            AiDimension::ContextEfficiency => "contextEfficiency",
            AiDimension::RiskCompliance => "riskCompliance",
        }
    }

    /// Metric names the assessor asks for
    pub fn metric_names(self) -> &'static [&'static str] {
        match self {
            AiDimension::InstructionClarity => &[
                "stepByStepQuality",
                "commandClarity",
                "environmentSetup",
                "errorHandling",
                "dependencySpecification",
            ],
            AiDimension::WorkflowAutomation => &[
                "ciCdIntegration",
                "automatedTesting",
                "buildScripts",
                "deploymentAutomation",
                "monitoringLogging",
            ],
            AiDimension::ContextEfficiency => &[
                "instructionFileOptimization",
                "codeDocumentation",
                "navigationStructure",
                "contextWindowUsage",
                "informationDensity",
            ],
            AiDimension::RiskCompliance => &[
                "securityNotices",
                "dangerousOperations",
                "safetyGuidelines",
                "permissionRequirements",
                "validationSteps",
            ],
        }
    }
}

impl DetailedAnalysis {
    pub fn get(&self, dimension: AiDimension) -> &SubAnalysis {
        match dimension {
            AiDimension::InstructionClarity => &self.instruction_clarity,
            AiDimension::WorkflowAutomation => &self.workflow_automation,
            AiDimension::ContextEfficiency => &self.context_efficiency,
            AiDimension::RiskCompliance => &self.risk_compliance,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (AiDimension, &SubAnalysis)> + '_ {
        AiDimension::ALL.into_iter().map(move |d| (d, self.get(d)))
    }

    /// Mean of the four sub-analysis confidences
    pub fn confidence(&self) -> Confidence {
        Confidence::mean(self.iter().map(|(_, sub)| sub.confidence)).unwrap_or(Confidence::ZERO)
    }
}

impl AiAssessment {
    fn flags(&self) -> [bool; 4] {
        [
            self.instruction_clarity,
            self.workflow_automation,
            self.context_efficiency,
            self.risk_compliance,
        ]
    }

    /// Average of the per-dimension scores (0–100). Without a detailed
    /// analysis the share of passed capability flags stands in.
    pub fn category_average(&self) -> f64 {
        let detailed = self
            .detailed_analysis
            .as_ref()
            .map(|d| d.iter().filter_map(|(_, sub)| sub.score()).collect::<Vec<_>>())
            .unwrap_or_default();

        if detailed.is_empty() {
            let passed = self.flags().iter().filter(|f| **f).count();
            passed as f64 / 4.0 * 100.0
        } else {
            detailed.iter().sum::<f64>() / detailed.len() as f64
        }
    }

    /// Every metric finite and within `0..=20`
    pub fn check_ranges(&self) -> Result<(), String> {
        let Some(detail) = &self.detailed_analysis else {
            return Ok(());
        };
        for (dimension, sub) in detail.iter() {
            for (name, value) in &sub.metrics {
                if !value.is_finite() || !(0.0..=METRIC_MAX).contains(value) {
                    return Err(format!(
                        "{}.{} = {} is outside 0..={}",
                        dimension.key(),
                        name,
                        value,
                        METRIC_MAX
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Severity of the risk an assessment implies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Condensed takeaways of an assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
    pub confidence: Confidence,
    pub risk_level: RiskLevel,
}

impl Insights {
    /// Derive insights from the assessment content alone
    pub fn from_assessment(assessment: &AiAssessment) -> Self {
        let (key_findings, recommendations, confidence) = match &assessment.detailed_analysis {
            Some(detail) => (
                detail.iter().flat_map(|(_, s)| s.findings.iter().cloned()).collect(),
                detail
                    .iter()
                    .flat_map(|(_, s)| s.recommendations.iter().cloned())
                    .collect(),
                detail.confidence(),
            ),
            None => (
                vec![assessment.reason.clone()],
                Vec::new(),
                Confidence::from_fraction(0.5),
            ),
        };

        let average = assessment.category_average();
        let risk_level = if average >= 70.0 {
            RiskLevel::Low
        } else if average >= 40.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        };

        Self {
            key_findings: key_findings.into_iter().filter(|f: &String| !f.trim().is_empty()).collect(),
            recommendations,
            confidence,
            risk_level,
        }
    }
}
