//! Argument handling and report rendering for the `agentready` binary

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::Duration;

use agentready_core::plugins::{PluginSettings, default_engine, llm};
use agentready_core::{
    AssessmentInput, AssessmentResult, EngineConfig, InputType, ScoringEngine,
    convert_to_legacy_format,
};
use anyhow::{Context, Result};
use clap::Parser;

pub const APP_NAME: &str = "agentready";

#[derive(Debug, Parser)]
#[command(
    name = APP_NAME,
    version,
    about = "Assess how ready a GitHub repository or website is for AI agents"
)]
pub struct Cli {
    /// Repository or website URL
    pub url: String,

    /// Input type; inferred from the URL when omitted
    #[arg(long = "type", value_name = "TYPE")]
    pub input_type: Option<InputType>,

    /// Skip the AI assessment and score from static analysis only
    #[arg(long)]
    pub no_ai: bool,

    /// Fail instead of reporting a zero-score fallback result
    #[arg(long)]
    pub no_fallback: bool,

    /// Print the legacy result shape (implies --json)
    #[arg(long)]
    pub legacy: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,

    /// TOML engine configuration
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deadline for the whole assessment
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,

    #[arg(long, env = "AGENTREADY_LLM_BASE_URL", default_value = llm::DEFAULT_BASE_URL)]
    pub llm_base_url: String,

    #[arg(long, env = "AGENTREADY_LLM_MODEL", default_value = llm::DEFAULT_MODEL)]
    pub llm_model: String,

    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,
}

impl Cli {
    pub fn input(&self) -> Result<AssessmentInput> {
        let input = match self.input_type {
            Some(input_type) => AssessmentInput::new(input_type, &self.url)?,
            None => AssessmentInput::infer(&self.url)?,
        };
        Ok(input)
    }

    /// Configuration file (or defaults) with the command-line overrides applied
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::load(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => EngineConfig::default(),
        };
        if self.no_ai {
            config.enable_ai_assessment = false;
        }
        if self.no_fallback {
            config.fallback_to_static = false;
        }
        if let Some(secs) = self.timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn plugin_settings(&self) -> PluginSettings {
        PluginSettings {
            github_token: self.github_token.clone(),
            llm_api_key: self.llm_api_key.clone(),
            llm_base_url: self.llm_base_url.clone(),
            llm_model: self.llm_model.clone(),
            ..Default::default()
        }
    }

    /// Engine with every shipped plugin registered
    pub fn build_engine(&self) -> Result<ScoringEngine> {
        let engine = default_engine(self.engine_config()?, &self.plugin_settings())
            .context("failed to set up the assessment engine")?;
        Ok(engine)
    }

    /// Rendered output for `result` in the requested format
    pub fn render(&self, result: &AssessmentResult) -> Result<String> {
        if self.legacy {
            return Ok(serde_json::to_string_pretty(&convert_to_legacy_format(result))?);
        }
        if self.json {
            return Ok(serde_json::to_string_pretty(result)?);
        }
        Ok(render_report(result))
    }
}

const DIVIDER: &str = "─────────────────────────────────────────────────────────────";
const LABEL_WIDTH: usize = 36;

fn push_section_header(buf: &mut String, icon: &str, title: &str) {
    let _ = writeln!(buf, "{DIVIDER}");
    let _ = writeln!(buf, "{icon} {title}");
    let _ = writeln!(buf, "{DIVIDER}");
}

fn push_key_value(buf: &mut String, label: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    let _ = writeln!(buf, "• {:<width$} : {}", label, value, width = LABEL_WIDTH);
}

/// Human readable report
pub fn render_report(result: &AssessmentResult) -> String {
    let mut buf = String::new();
    let confidence = &result.scores.confidence;

    push_section_header(&mut buf, "🤖", &format!("Agent Readiness: {}", result.url));
    push_key_value(&mut buf, "Type", result.input_type.as_str());
    push_key_value(
        &mut buf,
        "Overall",
        &format!("{:.0}/100", result.scores.overall.value),
    );
    push_key_value(
        &mut buf,
        "Confidence",
        &format!(
            "{:.0}% ({})",
            confidence.overall.as_percent(),
            serde_label(&confidence.level)
        ),
    );
    push_key_value(
        &mut buf,
        "Analysis Time",
        &format!("{} ms", result.metadata.analysis_time_ms),
    );
    if result.metadata.fallback_used {
        push_key_value(&mut buf, "Fallback", "yes, scores are zero");
    }
    let _ = writeln!(buf);

    push_section_header(&mut buf, "📊", "Categories");
    for (category, score) in result.scores.categories.iter() {
        push_key_value(&mut buf, category.label(), &format!("{:.0}", score.value));
    }
    let _ = writeln!(buf);

    if !result.findings.is_empty() {
        push_section_header(&mut buf, "🔍", "Findings");
        for finding in &result.findings {
            let _ = writeln!(
                buf,
                "• [{}] {}: {}",
                serde_label(&finding.severity),
                finding.title,
                finding.description
            );
        }
        let _ = writeln!(buf);
    }

    if !result.recommendations.is_empty() {
        push_section_header(&mut buf, "💡", "Recommendations");
        for rec in &result.recommendations {
            let _ = writeln!(
                buf,
                "• [{}] {} ({})",
                serde_label(&rec.priority),
                rec.title,
                rec.timeline
            );
            if !rec.description.is_empty() {
                let _ = writeln!(buf, "  {}", rec.description);
            }
        }
        let _ = writeln!(buf);
    }

    let notes: Vec<String> = result
        .metadata
        .errors
        .iter()
        .map(|e| format!("{}: {}", e.code, e.message))
        .chain(result.metadata.warnings.iter().cloned())
        .collect();
    if !notes.is_empty() {
        push_section_header(&mut buf, "⚠️", "Warnings");
        for note in notes {
            let _ = writeln!(buf, "• {note}");
        }
    }

    buf
}

/// Lowercase serialized name of a unit enum
fn serde_label<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
