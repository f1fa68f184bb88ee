//! Repository structure and file size analyzers over a GitHub tree listing

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use super::github::{GitHubClient, RepoSnapshot};
use crate::input::{AssessmentInput, InputType, parse_github_repository};
use crate::plugin::{AnalyzerPlugin, ValidationReport};
use crate::types::{
    AgentCompatibility, AnalysisPayload, AnalysisResult, FileEntry, FileSizeAnalysis, PluginInfo,
    PluginType, RepositoryAnalysis, SizeBuckets,
};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Files at or above this size are listed as large
const LARGE_FILE_BYTES: u64 = 100 * KIB;
/// Instruction files above this size are likely truncated by agents
const INSTRUCTION_LIMIT_BYTES: u64 = 50 * KIB;
const LARGEST_FILES: usize = 10;

const INSTRUCTION_FILE_NAMES: &[&str] = &[
    "agents.md",
    "claude.md",
    "gemini.md",
    ".cursorrules",
    ".windsurfrules",
    ".clinerules",
    "copilot-instructions.md",
];

const MANIFEST_FILE_NAMES: &[&str] = &[
    "cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "requirements.txt",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
    "gemfile",
    "composer.json",
    "mix.exs",
    "package.swift",
];

const TEST_DIRECTORIES: &[&str] = &["test", "tests", "__tests__", "spec", "specs"];

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_root(path: &str) -> bool {
    !path.contains('/')
}

/// Root, `.github/` or `docs/`, where community files are looked up
fn is_community_location(path: &str) -> bool {
    is_root(path)
        || path.strip_prefix(".github/").is_some_and(is_root)
        || path.strip_prefix("docs/").is_some_and(is_root)
}

fn is_instruction_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    INSTRUCTION_FILE_NAMES.contains(&file_name(&lower)) || lower.starts_with(".cursor/rules/")
}

fn is_workflow_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    (lower.starts_with(".github/workflows/") && (lower.ends_with(".yml") || lower.ends_with(".yaml")))
        || lower == ".gitlab-ci.yml"
        || lower == ".circleci/config.yml"
}

fn is_manifest(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let name = file_name(&lower);
    MANIFEST_FILE_NAMES.contains(&name) || name.ends_with(".csproj")
}

fn is_test_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    let mut segments = lower.split('/').collect::<Vec<_>>();
    let name = segments.pop().unwrap_or_default();
    segments.iter().any(|s| TEST_DIRECTORIES.contains(s))
        || name.starts_with("test_")
        || name.contains("_test.")
        || name.contains(".test.")
        || name.contains(".spec.")
}

fn community_file(files: &[FileEntry], prefixes: &[&str]) -> bool {
    files.iter().any(|f| {
        let lower = f.path.to_ascii_lowercase();
        is_community_location(&lower) && prefixes.iter().any(|p| file_name(&lower).starts_with(p))
    })
}

pub fn analyze_repository(snapshot: &RepoSnapshot) -> RepositoryAnalysis {
    let files = &snapshot.files;
    let paths = || files.iter().map(|f| f.path.as_str());

    let instruction_files: Vec<String> =
        paths().filter(|p| is_instruction_file(p)).map(str::to_string).collect();
    let workflow_files: Vec<String> =
        paths().filter(|p| is_workflow_file(p)).map(str::to_string).collect();
    let manifest_files: Vec<String> = paths().filter(|p| is_manifest(p)).map(str::to_string).collect();

    let mut large_files: Vec<FileEntry> = files
        .iter()
        .filter(|f| f.size_bytes >= LARGE_FILE_BYTES)
        .cloned()
        .collect();
    large_files.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes));

    let has_docs_directory = snapshot
        .directories
        .iter()
        .any(|d| matches!(d.to_ascii_lowercase().as_str(), "docs" | "doc" | "documentation"));
    let has_tests = snapshot
        .directories
        .iter()
        .any(|d| TEST_DIRECTORIES.contains(&file_name(&d.to_ascii_lowercase())))
        || paths().any(is_test_path);
    let has_dependency_automation = paths().any(|p| {
        let lower = p.to_ascii_lowercase();
        matches!(
            lower.as_str(),
            ".github/dependabot.yml" | ".github/dependabot.yaml" | "renovate.json" | "renovate.json5" | ".github/renovate.json"
        )
    });

    RepositoryAnalysis {
        owner: snapshot.owner.clone(),
        name: snapshot.name.clone(),
        default_branch: snapshot.default_branch.clone(),
        primary_language: snapshot.primary_language.clone(),
        languages: snapshot.languages.clone(),
        file_count: files.len(),
        total_size_bytes: files.iter().map(|f| f.size_bytes).sum(),
        has_readme: files
            .iter()
            .any(|f| is_root(&f.path) && f.path.to_ascii_lowercase().starts_with("readme")),
        has_contributing: community_file(files, &["contributing"]),
        has_agents: !instruction_files.is_empty(),
        has_license: files.iter().any(|f| {
            let lower = f.path.to_ascii_lowercase();
            is_root(&lower) && ["license", "licence", "copying"].iter().any(|p| lower.starts_with(p))
        }),
        has_security_policy: community_file(files, &["security.md"]),
        has_code_of_conduct: community_file(files, &["code_of_conduct"]),
        has_dependency_automation,
        has_package_manifest: !manifest_files.is_empty(),
        has_docs_directory,
        has_tests,
        has_workflows: !workflow_files.is_empty(),
        workflow_files,
        manifest_files,
        instruction_files,
        large_files,
        truncated: snapshot.truncated,
    }
}

fn repository_size_score(total_bytes: u64) -> f64 {
    match total_bytes {
        b if b <= 10 * MIB => 100.0,
        b if b <= 50 * MIB => 75.0,
        b if b <= 200 * MIB => 50.0,
        b if b <= 1024 * MIB => 25.0,
        _ => 10.0,
    }
}

fn kib(bytes: u64) -> u64 {
    bytes.div_ceil(KIB)
}

pub fn analyze_file_sizes(snapshot: &RepoSnapshot) -> FileSizeAnalysis {
    let files = &snapshot.files;
    let mut buckets = SizeBuckets::default();
    for file in files {
        match file.size_bytes {
            s if s < 10 * KIB => buckets.small += 1,
            s if s < LARGE_FILE_BYTES => buckets.medium += 1,
            s if s <= MIB => buckets.large += 1,
            _ => buckets.oversized += 1,
        }
    }
    let total_size_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();

    let mut largest_files = files.clone();
    largest_files.sort_by(|a, b| b.size_bytes.cmp(&a.size_bytes).then_with(|| a.path.cmp(&b.path)));
    largest_files.truncate(LARGEST_FILES);

    let instruction_files: Vec<FileEntry> = files
        .iter()
        .filter(|f| is_instruction_file(&f.path))
        .cloned()
        .collect();
    let oversized_instructions: Vec<&FileEntry> = instruction_files
        .iter()
        .filter(|f| f.size_bytes > INSTRUCTION_LIMIT_BYTES)
        .collect();

    let context_fit = if files.is_empty() {
        0.0
    } else {
        (buckets.small + buckets.medium) as f64 / files.len() as f64 * 100.0
    };
    let instruction_score = if instruction_files.is_empty() {
        0.0
    } else {
        (instruction_files.len() - oversized_instructions.len()) as f64 / instruction_files.len() as f64
            * 100.0
    };
    let repository_size = repository_size_score(total_size_bytes);
    let agent_compatibility = AgentCompatibility {
        context_fit,
        instruction_files: instruction_score,
        repository_size,
        overall: 0.5 * context_fit + 0.3 * instruction_score + 0.2 * repository_size,
    };

    let mut findings = Vec::new();
    let mut recommendations = Vec::new();
    if buckets.oversized > 0 {
        findings.push(format!(
            "{} file(s) exceed 1 MB and will not fit in an agent's context window",
            buckets.oversized
        ));
        recommendations
            .push("Move generated or binary assets out of the repository or into Git LFS".to_string());
    }
    if buckets.large > 0 {
        findings.push(format!("{} file(s) are between 100 KB and 1 MB", buckets.large));
        recommendations.push("Split large source files into smaller, focused modules".to_string());
    }
    if instruction_files.is_empty() {
        findings.push("No agent instruction files found".to_string());
        recommendations
            .push("Add an AGENTS.md describing how to build, test and change the project".to_string());
    }
    for file in &oversized_instructions {
        findings.push(format!(
            "Instruction file {} is {} KB; agents may truncate it",
            file.path,
            kib(file.size_bytes)
        ));
    }
    if !oversized_instructions.is_empty() {
        recommendations.push("Keep instruction files under 50 KB".to_string());
    }
    if snapshot.truncated {
        findings.push("The file listing was truncated; sizes cover part of the repository".to_string());
    }

    FileSizeAnalysis {
        total_files: files.len(),
        total_size_bytes,
        buckets,
        largest_files,
        instruction_files,
        agent_compatibility,
        findings,
        recommendations,
    }
}

/// Static structure of a GitHub repository
pub struct RepositoryAnalyzer {
    github: Arc<GitHubClient>,
}

impl RepositoryAnalyzer {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl AnalyzerPlugin for RepositoryAnalyzer {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::Repository, "repository-analyzer", env!("CARGO_PKG_VERSION"))
    }

    fn can_handle(&self, input: &AssessmentInput) -> bool {
        input.input_type == InputType::Repository && parse_github_repository(&input.url).is_ok()
    }

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        let started = Instant::now();
        let (owner, name) = parse_github_repository(&input.url)?;
        let snapshot = self.github.snapshot(&owner, &name).await?;
        Ok(AnalysisResult::new(
            AnalysisPayload::Repository(analyze_repository(&snapshot)),
            &self.info(),
            started,
        ))
    }

    fn validate(&self, result: &AnalysisResult) -> ValidationReport {
        let AnalysisPayload::Repository(repo) = &result.payload else {
            return ValidationReport::invalid(vec![format!(
                "expected a repository payload, got {}",
                result.plugin_type()
            )]);
        };
        if repo.owner.is_empty() || repo.name.is_empty() {
            return ValidationReport::invalid(vec!["repository identity is missing".to_string()]);
        }
        if repo.truncated {
            return ValidationReport::valid()
                .with_warning("repository tree was truncated by the GitHub API");
        }
        ValidationReport::valid()
    }
}

/// Context-window fit of a repository's files
pub struct FileSizeAnalyzer {
    github: Arc<GitHubClient>,
}

impl FileSizeAnalyzer {
    pub fn new(github: Arc<GitHubClient>) -> Self {
        Self { github }
    }
}

#[async_trait]
impl AnalyzerPlugin for FileSizeAnalyzer {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::FileSize, "file-size-analyzer", env!("CARGO_PKG_VERSION"))
    }

    fn can_handle(&self, input: &AssessmentInput) -> bool {
        input.input_type == InputType::Repository
    }

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        let started = Instant::now();
        let (owner, name) = parse_github_repository(&input.url)?;
        let snapshot = self.github.snapshot(&owner, &name).await?;
        Ok(AnalysisResult::new(
            AnalysisPayload::FileSize(analyze_file_sizes(&snapshot)),
            &self.info(),
            started,
        ))
    }
}
