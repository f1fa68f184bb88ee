//! Engine and registry configuration
//!
//! Every field has a default so a partial TOML file (or none at all) is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{AssessError, Result};
use crate::score::Category;

/// Configuration of the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the AI assessor after static analysis
    pub enable_ai_assessment: bool,

    /// Total attempts per analyzer/assessor invocation
    pub max_retries: u32,

    /// Base delay between attempts, multiplied by the attempt number
    #[serde(with = "millis")]
    pub retry_delay: Duration,

    /// Substitute a zero-score result instead of returning the error
    pub fallback_to_static: bool,

    /// Deadline for one complete assessment
    #[serde(with = "millis")]
    pub timeout: Duration,

    /// How long cached analysis and assessment results stay valid
    #[serde(with = "millis")]
    pub cache_ttl: Duration,

    /// Maximum number of cached results per operation kind
    pub cache_capacity: u64,

    pub category_weights: CategoryWeights,

    pub confidence_thresholds: ConfidenceThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_ai_assessment: true,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            fallback_to_static: true,
            timeout: Duration::from_secs(120),
            cache_ttl: Duration::from_secs(15 * 60),
            cache_capacity: 1_000,
            category_weights: CategoryWeights::default(),
            confidence_thresholds: ConfidenceThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(source)
            .map_err(|e| AssessError::Validation(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| {
            AssessError::Validation(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(AssessError::Validation(
                "max_retries must be at least 1".to_string(),
            ));
        }

        if Category::CANONICAL
            .iter()
            .any(|c| !self.category_weights.weight(*c).is_finite())
        {
            return Err(AssessError::Validation(
                "category weights must be finite numbers".to_string(),
            ));
        }

        let total = self.category_weights.total();
        if (total - 1.0).abs() > 0.01 {
            return Err(AssessError::Validation(format!(
                "category weights must sum to 1.0, got {total:.3}"
            )));
        }

        if Category::CANONICAL
            .iter()
            .any(|c| self.category_weights.weight(*c) < 0.0)
        {
            return Err(AssessError::Validation(
                "category weights must not be negative".to_string(),
            ));
        }

        let t = &self.confidence_thresholds;
        if !(0.0..=1.0).contains(&t.medium) || !(0.0..=1.0).contains(&t.high) || t.medium > t.high
        {
            return Err(AssessError::Validation(
                "confidence thresholds must satisfy 0 <= medium <= high <= 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Registry settings derived from this configuration
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
            cache_ttl: self.cache_ttl,
            cache_capacity: self.cache_capacity,
        }
    }
}

/// Retry and cache settings of the plugin registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryConfig {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub cache_ttl: Duration,
    pub cache_capacity: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        EngineConfig::default().registry_config()
    }
}

/// Weights of the six canonical categories in the overall score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CategoryWeights {
    pub documentation: f64,
    pub instruction_clarity: f64,
    pub workflow_automation: f64,
    pub risk_compliance: f64,
    pub integration_structure: f64,
    pub file_size_optimization: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            documentation: 0.20,
            instruction_clarity: 0.20,
            workflow_automation: 0.20,
            risk_compliance: 0.15,
            integration_structure: 0.15,
            file_size_optimization: 0.10,
        }
    }
}

impl CategoryWeights {
    /// Weight of a category; website-only categories weigh nothing
    pub fn weight(&self, category: Category) -> f64 {
        match category {
            Category::Documentation => self.documentation,
            Category::InstructionClarity => self.instruction_clarity,
            Category::WorkflowAutomation => self.workflow_automation,
            Category::RiskCompliance => self.risk_compliance,
            Category::IntegrationStructure => self.integration_structure,
            Category::FileSizeOptimization => self.file_size_optimization,
            _ => 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        Category::CANONICAL.iter().map(|c| self.weight(*c)).sum()
    }
}

/// Boundaries of the high/medium confidence bands (fractions)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.5,
        }
    }
}

/// Durations are written as milliseconds in configuration files
mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.category_weights.total() - 1.0).abs() < 1e-9);
        assert_eq!(config.category_weights.weight(Category::MachineReadableContent), 0.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            enable_ai_assessment = false
            retry_delay = 250

            [confidence_thresholds]
            high = 0.9
            "#,
        )
        .unwrap();

        assert!(!config.enable_ai_assessment);
        assert_eq!(config.retry_delay, Duration::from_millis(250));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.confidence_thresholds.high, 0.9);
        assert_eq!(config.confidence_thresholds.medium, 0.5);
    }

    #[test]
    fn test_rejects_unbalanced_weights() {
        let err = EngineConfig::from_toml_str(
            r#"
            [category_weights]
            documentation = 0.9
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_rejects_non_finite_weights() {
        let err = EngineConfig::from_toml_str("[category_weights]\ndocumentation = nan").unwrap_err();
        assert!(err.to_string().contains("finite"));

        let mut config = EngineConfig::default();
        config.category_weights.risk_compliance = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let config = EngineConfig {
            max_retries: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
