//! # agentready-core
//!
//! Core library for assessing how ready a GitHub repository or a website is
//! to be used by autonomous AI agents.
//!
//! This library provides:
//! - A plugin registry with result caching and retry with backoff
//! - An orchestrator combining primary, secondary and AI analyses
//! - A scoring engine producing weighted category scores with confidence,
//!   a zero-score fallback and a legacy result shape
//! - Shipped plugins for GitHub repositories, websites, business types,
//!   file sizes and an OpenAI-compatible language model
//!
//! ## Example
//!
//! ```no_run
//! use agentready_core::{AssessmentInput, EngineConfig, ScoringEngine};
//! use agentready_core::plugins::{PluginSettings, register_defaults};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = EngineConfig {
//!     enable_ai_assessment: false,
//!     ..Default::default()
//! };
//! let settings = PluginSettings::default();
//! let engine = ScoringEngine::new(config, |registry| register_defaults(registry, &settings))?;
//! let input = AssessmentInput::infer("https://github.com/rust-lang/cargo")?;
//! let result = engine.assess(&input).await?;
//! println!("overall {:.0}", result.scores.overall.value);
//! # Ok(())
//! # }
//! ```

pub mod assessment;
pub mod cache;
pub mod config;
pub mod error;
pub mod input;
pub mod orchestrator;
pub mod plugin;
pub mod plugins;
pub mod registry;
pub mod report;
pub mod retry;
pub mod score;
pub mod scoring;
pub mod types;

// Re-export commonly used types
pub use assessment::{AiAssessment, Insights};
pub use config::{CategoryWeights, ConfidenceThresholds, EngineConfig, RegistryConfig};
pub use error::{AssessError, ErrorKind, Result};
pub use input::{AssessmentInput, InputType};
pub use orchestrator::{Orchestrator, UnifiedResult};
pub use plugin::{AiAssessorPlugin, AnalyzerPlugin, ValidationReport};
pub use registry::{PluginRegistry, RegistryStats};
pub use report::{AssessmentResult, Finding, Recommendation};
pub use score::{Category, Confidence, Score};
pub use scoring::{LegacyAssessmentResult, ScoringEngine, convert_to_legacy_format};
pub use types::{AnalysisPayload, AnalysisResult, PluginInfo, PluginType};

pub use tokio_util::sync::CancellationToken;
