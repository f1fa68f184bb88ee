//! Plugin identity and analysis payloads shared across the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::score::Confidence;

/// Domain a plugin is registered for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginType {
    Repository,
    Website,
    BusinessType,
    FileSize,
    /// Assessors that accept every analysis type
    Unified,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::Repository => "repository",
            PluginType::Website => "website",
            PluginType::BusinessType => "business-type",
            PluginType::FileSize => "file-size",
            PluginType::Unified => "unified",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginInfo {
    pub plugin_type: PluginType,
    pub name: String,
    pub version: String,
}

impl PluginInfo {
    pub fn new(plugin_type: PluginType, name: &str, version: &str) -> Self {
        Self {
            plugin_type,
            name: name.to_string(),
            version: version.to_string(),
        }
    }
}

/// Output of one analyzer run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(flatten)]
    pub payload: AnalysisPayload,
    pub metadata: AnalysisMetadata,
}

/// Provenance of an [`AnalysisResult`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub analyzer: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl AnalysisResult {
    /// Wrap a payload produced by `info`'s plugin, timing from `started`
    pub fn new(payload: AnalysisPayload, info: &PluginInfo, started: Instant) -> Self {
        Self {
            payload,
            metadata: AnalysisMetadata {
                analyzer: info.name.clone(),
                version: info.version.clone(),
                timestamp: Utc::now(),
                duration_ms: started.elapsed().as_millis() as u64,
            },
        }
    }

    pub fn plugin_type(&self) -> PluginType {
        self.payload.plugin_type()
    }
}

/// Analyzer output, tagged by domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum AnalysisPayload {
    Repository(RepositoryAnalysis),
    Website(WebsiteAnalysis),
    BusinessType(BusinessTypeAnalysis),
    FileSize(FileSizeAnalysis),
}

impl AnalysisPayload {
    pub fn plugin_type(&self) -> PluginType {
        match self {
            AnalysisPayload::Repository(_) => PluginType::Repository,
            AnalysisPayload::Website(_) => PluginType::Website,
            AnalysisPayload::BusinessType(_) => PluginType::BusinessType,
            AnalysisPayload::FileSize(_) => PluginType::FileSize,
        }
    }
}

/// Canonical, normalized view of every analysis that succeeded in one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<RepositoryAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<WebsiteAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<BusinessTypeAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<FileSizeAnalysis>,
}

impl AnalysisData {
    /// Slot a payload into its field, replacing any previous value
    pub fn absorb(&mut self, payload: AnalysisPayload) {
        match payload {
            AnalysisPayload::Repository(data) => self.repository = Some(data),
            AnalysisPayload::Website(data) => self.website = Some(data),
            AnalysisPayload::BusinessType(data) => self.business_type = Some(data),
            AnalysisPayload::FileSize(data) => self.file_size = Some(data),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repository.is_none()
            && self.website.is_none()
            && self.business_type.is_none()
            && self.file_size.is_none()
    }
}

/// A file path with its size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub path: String,
    pub size_bytes: u64,
}

/// Static analysis of a source repository
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryAnalysis {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub primary_language: Option<String>,
    pub languages: Vec<String>,

    pub file_count: usize,
    pub total_size_bytes: u64,

    pub has_readme: bool,
    pub has_contributing: bool,
    pub has_agents: bool,
    pub has_license: bool,
    pub has_security_policy: bool,
    pub has_code_of_conduct: bool,
    pub has_dependency_automation: bool,
    pub has_package_manifest: bool,
    pub has_docs_directory: bool,
    pub has_tests: bool,
    pub has_workflows: bool,

    pub workflow_files: Vec<String>,
    pub manifest_files: Vec<String>,
    /// Agent instruction files (AGENTS.md, CLAUDE.md, .cursorrules, ...)
    pub instruction_files: Vec<String>,
    pub large_files: Vec<FileEntry>,

    /// The tree listing was cut short by the host
    pub truncated: bool,
}

/// Static analysis of a web page and its site-level files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteAnalysis {
    pub url: String,
    pub status_code: u16,
    pub is_https: bool,
    pub page_bytes: usize,

    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub language: Option<String>,
    pub has_viewport: bool,
    pub hreflang_count: usize,

    pub headings: HeadingSummary,
    pub landmarks: LandmarkSummary,

    pub form_count: usize,
    pub total_inputs: usize,
    pub labeled_inputs: usize,
    pub button_count: usize,
    pub has_search: bool,

    pub structured_data: StructuredDataSummary,
    pub word_count: usize,

    pub has_robots_txt: bool,
    /// AI crawlers fully blocked by robots.txt
    pub blocked_ai_crawlers: Vec<String>,
    pub has_sitemap: bool,
    pub has_llms_txt: bool,

    /// Leading visible text, used for prompts and classification
    pub text_excerpt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingSummary {
    pub h1_count: usize,
    /// Counts of h1..h6
    pub distribution: Vec<usize>,
    pub proper_hierarchy: bool,
}

impl HeadingSummary {
    pub fn has_single_h1(&self) -> bool {
        self.h1_count == 1
    }

    /// Headings below h1
    pub fn subheading_count(&self) -> usize {
        self.distribution.iter().skip(1).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LandmarkSummary {
    pub has_main: bool,
    pub has_navigation: bool,
    pub has_header: bool,
    pub has_footer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredDataSummary {
    pub block_count: usize,
    pub types: Vec<String>,
    /// FAQPage or QAPage markup present
    pub has_faq: bool,
}

/// Business classification of a website
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusinessType {
    Ecommerce,
    Saas,
    Hospitality,
    Healthcare,
    Finance,
    Education,
    Media,
    ProfessionalServices,
    Travel,
    RealEstate,
    General,
}

impl BusinessType {
    pub fn label(self) -> &'static str {
        match self {
            BusinessType::Ecommerce => "E-commerce",
            BusinessType::Saas => "SaaS",
            BusinessType::Hospitality => "Hospitality",
            BusinessType::Healthcare => "Healthcare",
            BusinessType::Finance => "Finance",
            BusinessType::Education => "Education",
            BusinessType::Media => "Media & Publishing",
            BusinessType::ProfessionalServices => "Professional Services",
            BusinessType::Travel => "Travel",
            BusinessType::RealEstate => "Real Estate",
            BusinessType::General => "General",
        }
    }
}

/// One task an agent would perform on behalf of a visitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgenticFlow {
    pub name: String,
    /// 0–100
    pub score: f64,
    pub present_signals: Vec<String>,
    pub missing_signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessTypeAnalysis {
    pub business_type: BusinessType,
    pub confidence: Confidence,
    pub matched_keywords: Vec<String>,
    pub agentic_flows: Vec<AgenticFlow>,
    /// 0–100, mean of the flow scores
    pub overall_score: f64,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

/// How well a repository's files fit into an agent's context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCompatibility {
    pub context_fit: f64,
    pub instruction_files: f64,
    pub repository_size: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeBuckets {
    /// Under 10 KiB
    pub small: usize,
    /// 10–100 KiB
    pub medium: usize,
    /// 100 KiB – 1 MiB
    pub large: usize,
    /// Over 1 MiB
    pub oversized: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSizeAnalysis {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub buckets: SizeBuckets,
    pub largest_files: Vec<FileEntry>,
    pub instruction_files: Vec<FileEntry>,
    pub agent_compatibility: AgentCompatibility,
    pub findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_with_type_tag() {
        let info = PluginInfo::new(PluginType::Repository, "repository-analyzer", "1.0.0");
        let result = AnalysisResult::new(
            AnalysisPayload::Repository(RepositoryAnalysis {
                owner: "acme".to_string(),
                name: "widgets".to_string(),
                has_readme: true,
                ..Default::default()
            }),
            &info,
            Instant::now(),
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "repository");
        assert_eq!(json["data"]["hasReadme"], true);
        assert_eq!(json["metadata"]["analyzer"], "repository-analyzer");
        assert_eq!(result.plugin_type(), PluginType::Repository);
    }

    #[test]
    fn test_analysis_data_absorb() {
        let mut data = AnalysisData::default();
        assert!(data.is_empty());

        data.absorb(AnalysisPayload::FileSize(FileSizeAnalysis::default()));
        assert!(data.file_size.is_some());
        assert!(data.repository.is_none());
        assert!(!data.is_empty());
    }

    #[test]
    fn test_heading_summary() {
        let headings = HeadingSummary {
            h1_count: 1,
            distribution: vec![1, 3, 2, 0, 0, 0],
            proper_hierarchy: true,
        };
        assert!(headings.has_single_h1());
        assert_eq!(headings.subheading_count(), 5);
    }
}
