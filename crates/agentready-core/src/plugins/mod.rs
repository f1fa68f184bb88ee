//! Shipped analyzer and assessor plugins
//!
//! [`register_defaults`] wires the GitHub, website, business-type, file-size
//! and (when an API key is configured) AI plugins into a registry.

pub mod ai;
pub mod business;
pub mod github;
pub mod html;
pub mod llm;
pub mod repository;
pub mod robots;
pub mod website;

#[cfg(test)]
pub(crate) mod test_server;

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::registry::PluginRegistry;
use crate::scoring::ScoringEngine;

pub use ai::UnifiedAiAssessor;
pub use business::BusinessTypeAnalyzer;
pub use github::GitHubClient;
pub use llm::{LlmProvider, OpenAiCompatibleProvider};
pub use repository::{FileSizeAnalyzer, RepositoryAnalyzer};
pub use website::{PageFetcher, WebsiteAnalyzer};

/// Credentials and limits of the shipped plugins
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub github_token: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    /// Per-request timeout of every HTTP collaborator
    pub http_timeout: Duration,
    /// Largest page body the website analyzers download
    pub max_page_bytes: usize,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            github_token: None,
            llm_api_key: None,
            llm_base_url: llm::DEFAULT_BASE_URL.to_string(),
            llm_model: llm::DEFAULT_MODEL.to_string(),
            http_timeout: Duration::from_secs(30),
            max_page_bytes: 5 * 1024 * 1024,
        }
    }
}

impl PluginSettings {
    /// An LLM key is configured, so the AI assessor will be registered
    pub fn has_llm(&self) -> bool {
        self.llm_api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

/// Register every shipped plugin. The AI assessor is skipped without an LLM
/// API key; callers should then disable AI assessment.
pub fn register_defaults(registry: &mut PluginRegistry, settings: &PluginSettings) -> Result<()> {
    let github = Arc::new(GitHubClient::new(
        settings.github_token.as_deref(),
        settings.http_timeout,
    )?);
    let fetcher = Arc::new(PageFetcher::new(settings.http_timeout, settings.max_page_bytes)?);

    registry.register_analyzer(RepositoryAnalyzer::new(github.clone()))?;
    registry.register_analyzer(FileSizeAnalyzer::new(github))?;
    registry.register_analyzer(WebsiteAnalyzer::new(fetcher.clone()))?;
    registry.register_analyzer(BusinessTypeAnalyzer::new(fetcher))?;

    if let Some(api_key) = settings.llm_api_key.as_deref().filter(|_| settings.has_llm()) {
        let provider = OpenAiCompatibleProvider::new(
            &settings.llm_base_url,
            api_key,
            &settings.llm_model,
            settings.http_timeout,
        )?;
        registry.register_ai_assessor(UnifiedAiAssessor::new(Arc::new(provider)))?;
        info!(model = %settings.llm_model, "AI assessor registered");
    }
    Ok(())
}

/// Engine over a registry holding every shipped plugin. AI assessment is
/// switched off when no LLM key is configured.
pub fn default_engine(mut config: EngineConfig, settings: &PluginSettings) -> Result<ScoringEngine> {
    if config.enable_ai_assessment && !settings.has_llm() {
        warn!("no LLM API key configured, scoring from static analysis only");
        config.enable_ai_assessment = false;
    }
    ScoringEngine::new(config, |registry| register_defaults(registry, settings))
}
