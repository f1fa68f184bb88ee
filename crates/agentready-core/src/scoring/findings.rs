//! Structured findings and recommendations
//!
//! Three sources feed the lists: deterministic rules over the static
//! analysis, the text of the AI sub-analyses, and the text produced by the
//! secondary analyzers, in that order of precedence. An item whose text was
//! already produced by an earlier source is dropped; the rest are ordered
//! most severe (or most urgent) first and capped at [`MAX_MERGED_ITEMS`].

use std::collections::HashSet;

use crate::assessment::AiAssessment;
use crate::orchestrator::MAX_MERGED_ITEMS;
use crate::report::{Effort, Finding, FindingCategory, Priority, Recommendation, Severity};
use crate::score::{Category, Confidence};
use crate::types::{AnalysisData, RepositoryAnalysis, WebsiteAnalysis};

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Default)]
pub struct Collected {
    pub findings: Vec<Finding>,
    pub recommendations: Vec<Recommendation>,
}

impl Collected {
    fn finding(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    fn recommend(&mut self, recommendation: Recommendation) {
        self.recommendations.push(recommendation);
    }

    /// Keep the first item per description, sort by severity/priority, cap
    fn finish(mut self) -> Self {
        let mut seen = HashSet::new();
        self.findings.retain(|f| seen.insert(f.description.clone()));
        self.findings.sort_by_key(|f| f.severity);
        self.findings.truncate(MAX_MERGED_ITEMS);

        let mut seen = HashSet::new();
        self.recommendations
            .retain(|r| seen.insert(r.description.clone()));
        self.recommendations.sort_by_key(|r| r.priority);
        self.recommendations.truncate(MAX_MERGED_ITEMS);

        self
    }
}

pub fn collect(data: &AnalysisData, assessment: Option<&AiAssessment>) -> Collected {
    let mut out = Collected::default();

    if let Some(repo) = &data.repository {
        repository_rules(repo, &mut out);
    }
    if let Some(site) = &data.website {
        website_rules(site, &mut out);
    }
    if let Some(assessment) = assessment {
        ai_items(assessment, &mut out);
    }
    if let Some(business) = &data.business_type {
        let confidence = business.confidence;
        let label = format!("{} agentic flows", business.business_type.label());
        for text in &business.findings {
            out.finding(
                Finding::new(FindingCategory::BusinessType, Severity::Medium, &label, text)
                    .with_confidence(confidence),
            );
        }
        for text in &business.recommendations {
            out.recommend(Recommendation::new(
                FindingCategory::BusinessType,
                Priority::Medium,
                &label,
                text,
            ));
        }
    }
    if let Some(file_size) = &data.file_size {
        for text in &file_size.findings {
            out.finding(Finding::new(
                FindingCategory::FileSize,
                Severity::Low,
                "Context size",
                text,
            ));
        }
        for text in &file_size.recommendations {
            out.recommend(
                Recommendation::new(FindingCategory::FileSize, Priority::Low, "Context size", text)
                    .with_effort(Effort::Low),
            );
        }
    }

    out.finish()
}

fn repository_rules(repo: &RepositoryAnalysis, out: &mut Collected) {
    let repo_name = format!("{}/{}", repo.owner, repo.name);

    if !repo.has_readme {
        out.finding(
            Finding::new(
                Category::Documentation.into(),
                Severity::High,
                "Missing README",
                "The repository has no README, so agents start without an overview of the project.",
            )
            .with_evidence(repo_name.clone())
            .with_impact("Agents must infer purpose and setup from source code alone."),
        );
        out.recommend(
            Recommendation::new(
                Category::Documentation.into(),
                Priority::High,
                "Add a README",
                "Describe the project purpose, setup steps and common commands in README.md.",
            )
            .with_effort(Effort::Low)
            .with_impact("Gives agents and contributors a single entry point."),
        );
    }

    if repo.has_agents {
        out.finding(
            Finding::new(
                Category::InstructionClarity.into(),
                Severity::Info,
                "Agent instructions present",
                "Dedicated instruction files guide AI agents working in this repository.",
            )
            .with_evidence(repo.instruction_files.join(", ")),
        );
    } else {
        out.finding(
            Finding::new(
                Category::InstructionClarity.into(),
                Severity::Medium,
                "No agent instruction file",
                "No AGENTS.md or equivalent instruction file was found.",
            )
            .with_impact("Agents cannot discover project conventions or safe workflows."),
        );
        out.recommend(
            Recommendation::new(
                Category::InstructionClarity.into(),
                Priority::High,
                "Add AGENTS.md",
                "Document build, test and lint commands plus project conventions in an AGENTS.md file.",
            )
            .with_effort(Effort::Low),
        );
    }

    if !repo.has_contributing {
        out.finding(Finding::new(
            Category::Documentation.into(),
            Severity::Low,
            "Missing contribution guide",
            "No CONTRIBUTING file describes how changes are proposed and reviewed.",
        ));
        out.recommend(
            Recommendation::new(
                Category::Documentation.into(),
                Priority::Medium,
                "Add a contribution guide",
                "Explain branching, review and testing expectations in CONTRIBUTING.md.",
            )
            .with_effort(Effort::Low),
        );
    }

    if !repo.has_license {
        out.finding(Finding::new(
            Category::RiskCompliance.into(),
            Severity::Medium,
            "No license",
            "The repository does not declare a license.",
        ));
        out.recommend(
            Recommendation::new(
                Category::RiskCompliance.into(),
                Priority::Medium,
                "Declare a license",
                "Add a LICENSE file so usage terms are explicit.",
            )
            .with_effort(Effort::Low),
        );
    }

    if !repo.has_security_policy {
        out.finding(Finding::new(
            Category::RiskCompliance.into(),
            Severity::Low,
            "No security policy",
            "No SECURITY.md explains how vulnerabilities are reported.",
        ));
    }

    if !repo.has_workflows {
        out.finding(Finding::new(
            Category::WorkflowAutomation.into(),
            Severity::Medium,
            "No CI workflows",
            "No workflow definitions were found under .github/workflows.",
        ));
        out.recommend(Recommendation::new(
            Category::WorkflowAutomation.into(),
            Priority::High,
            "Automate builds and tests",
            "Add a CI workflow that builds the project and runs its tests on every change.",
        ));
    }

    if !repo.has_tests {
        out.finding(Finding::new(
            Category::WorkflowAutomation.into(),
            Severity::Medium,
            "No tests detected",
            "No test directories or test files were found.",
        ));
        out.recommend(
            Recommendation::new(
                Category::IntegrationStructure.into(),
                Priority::Medium,
                "Add automated tests",
                "Tests let agents verify their changes before proposing them.",
            )
            .with_effort(Effort::High),
        );
    }

    let oversized: Vec<_> = repo
        .large_files
        .iter()
        .filter(|f| f.size_bytes > MIB)
        .collect();
    if !oversized.is_empty() {
        let mut finding = Finding::new(
            Category::FileSizeOptimization.into(),
            Severity::Medium,
            "Files over 1 MiB",
            format!(
                "{} file(s) exceed 1 MiB and will not fit in an agent's context.",
                oversized.len()
            ),
        );
        for file in oversized.iter().take(5) {
            finding = finding.with_evidence(format!("{} ({} bytes)", file.path, file.size_bytes));
        }
        out.finding(finding);
    }

    if repo.truncated {
        out.finding(Finding::new(
            FindingCategory::System,
            Severity::Info,
            "Partial file listing",
            "The repository tree was truncated by the host; file statistics are incomplete.",
        ));
    }
}

fn website_rules(site: &WebsiteAnalysis, out: &mut Collected) {
    if !site.is_https {
        out.finding(
            Finding::new(
                Category::RiskCompliance.into(),
                Severity::Critical,
                "Page served without HTTPS",
                "The page is served over plain HTTP.",
            )
            .with_evidence(site.url.clone()),
        );
        out.recommend(Recommendation::new(
            Category::RiskCompliance.into(),
            Priority::High,
            "Serve the site over HTTPS",
            "Redirect all HTTP traffic to HTTPS.",
        ));
    }

    if !site.blocked_ai_crawlers.is_empty() {
        let mut finding = Finding::new(
            Category::RiskCompliance.into(),
            Severity::High,
            "AI crawlers blocked",
            "robots.txt disallows one or more AI crawlers for the whole site.",
        );
        for agent in &site.blocked_ai_crawlers {
            finding = finding.with_evidence(agent.clone());
        }
        out.finding(finding);
        out.recommend(
            Recommendation::new(
                Category::RiskCompliance.into(),
                Priority::Medium,
                "Review AI crawler rules",
                "Allow the AI crawlers you want to surface your content, or document why they are blocked.",
            )
            .with_effort(Effort::Low),
        );
    }

    if site.title.is_none() {
        out.finding(Finding::new(
            Category::Documentation.into(),
            Severity::High,
            "Missing page title",
            "The page has no <title> element.",
        ));
    }

    if site.meta_description.is_none() {
        out.finding(Finding::new(
            Category::Documentation.into(),
            Severity::Medium,
            "Missing meta description",
            "No meta description summarizes the page for agents and search engines.",
        ));
        out.recommend(
            Recommendation::new(
                Category::Documentation.into(),
                Priority::Medium,
                "Add a meta description",
                "Summarize the page purpose in one or two sentences.",
            )
            .with_effort(Effort::Low),
        );
    }

    if site.structured_data.block_count == 0 {
        out.finding(Finding::new(
            Category::MachineReadableContent.into(),
            Severity::Medium,
            "No structured data",
            "The page carries no JSON-LD structured data.",
        ));
        out.recommend(Recommendation::new(
            Category::MachineReadableContent.into(),
            Priority::High,
            "Add JSON-LD structured data",
            "Describe the organization, products or articles with schema.org JSON-LD.",
        ));
    }

    if !site.has_llms_txt {
        out.finding(Finding::new(
            Category::MachineReadableContent.into(),
            Severity::Low,
            "No llms.txt",
            "The site does not publish /llms.txt for language models.",
        ));
        out.recommend(
            Recommendation::new(
                Category::MachineReadableContent.into(),
                Priority::Low,
                "Publish llms.txt",
                "Provide a curated Markdown overview of the site at /llms.txt.",
            )
            .with_effort(Effort::Low),
        );
    }

    if !site.headings.has_single_h1() {
        out.finding(
            Finding::new(
                Category::InstructionClarity.into(),
                Severity::Medium,
                "Heading structure",
                "Pages should have exactly one h1 heading.",
            )
            .with_evidence(format!("{} h1 element(s)", site.headings.h1_count)),
        );
    }

    if !site.has_robots_txt {
        out.finding(Finding::new(
            Category::RiskCompliance.into(),
            Severity::Low,
            "No robots.txt",
            "The site does not publish crawler rules.",
        ));
    }

    if !site.has_sitemap {
        out.finding(Finding::new(
            Category::InformationArchitecture.into(),
            Severity::Low,
            "No sitemap",
            "No sitemap.xml lists the site's pages.",
        ));
    }

    if site.total_inputs > site.labeled_inputs {
        out.finding(
            Finding::new(
                Category::ActionOrientedFunctionality.into(),
                Severity::Medium,
                "Unlabeled form inputs",
                "Form inputs without labels are hard for agents to fill in correctly.",
            )
            .with_evidence(format!(
                "{} of {} inputs labeled",
                site.labeled_inputs, site.total_inputs
            )),
        );
    }

    if site.language.is_none() {
        out.finding(Finding::new(
            Category::PersonalizationContextAwareness.into(),
            Severity::Low,
            "No document language",
            "The <html> element has no lang attribute.",
        ));
    }

    if site.page_bytes as u64 >= MIB {
        out.finding(Finding::new(
            Category::FileSizeOptimization.into(),
            Severity::Medium,
            "Large page",
            format!("The HTML document is {} bytes.", site.page_bytes),
        ));
    }
}

fn ai_items(assessment: &AiAssessment, out: &mut Collected) {
    let Some(detail) = &assessment.detailed_analysis else {
        return;
    };

    for (dimension, sub) in detail.iter() {
        let category: FindingCategory = dimension.category().into();
        let score = sub.score().unwrap_or(0.0);
        let (severity, priority) = if score < 40.0 {
            (Severity::High, Priority::High)
        } else if score < 70.0 {
            (Severity::Medium, Priority::Medium)
        } else {
            (Severity::Low, Priority::Low)
        };
        let title = format!("{} (AI review)", dimension.category().label());

        for text in sub.findings.iter().filter(|t| !t.trim().is_empty()) {
            out.finding(
                Finding::new(category, severity, &title, text)
                    .with_confidence(sub.confidence)
                    .with_evidence(format!("{} score {score:.0}/100", dimension.key())),
            );
        }
        for text in sub.recommendations.iter().filter(|t| !t.trim().is_empty()) {
            out.recommend(Recommendation::new(category, priority, &title, text));
        }
    }
}

/// The single finding of a fallback result
pub fn failure_finding(message: &str) -> Finding {
    Finding::new(
        FindingCategory::System,
        Severity::High,
        "Assessment incomplete",
        format!("The assessment could not be completed: {message}"),
    )
    .with_confidence(Confidence::ZERO)
    .with_impact("Scores are placeholders and do not reflect the target.")
}

/// The single recommendation of a fallback result
pub fn retry_recommendation() -> Recommendation {
    Recommendation::new(
        FindingCategory::System,
        Priority::High,
        "Retry the assessment",
        "Check that the target is reachable and public, then run the assessment again.",
    )
    .with_effort(Effort::Low)
}
