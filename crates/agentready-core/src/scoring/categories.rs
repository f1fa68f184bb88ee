//! Per-category scores from static signals and the AI assessment

use std::collections::BTreeMap;

use crate::assessment::AiAssessment;
use crate::config::CategoryWeights;
use crate::score::{Category, CategoryScores};
use crate::types::{AnalysisData, RepositoryAnalysis, WebsiteAnalysis};

/// Category values on the 0–100 scale
pub type CategoryValues = BTreeMap<Category, f64>;

const STATIC_WEIGHT: f64 = 0.7;
const AI_WEIGHT: f64 = 0.3;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Points for every condition that holds, capped at 100
fn points(parts: &[(bool, f64)]) -> f64 {
    parts
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, points)| points)
        .sum::<f64>()
        .min(100.0)
}

/// Base scores from whichever primary analysis is present
pub fn base_category_scores(data: &AnalysisData) -> CategoryValues {
    if let Some(repo) = &data.repository {
        repository_scores(repo)
    } else if let Some(site) = &data.website {
        website_scores(site)
    } else {
        CategoryValues::new()
    }
}

pub fn repository_scores(repo: &RepositoryAnalysis) -> CategoryValues {
    let mut scores = CategoryValues::new();

    scores.insert(
        Category::Documentation,
        points(&[
            (repo.has_readme, 25.0),
            (repo.has_contributing, 25.0),
            (repo.has_agents, 30.0),
            (repo.has_license, 20.0),
        ]),
    );
    scores.insert(
        Category::InstructionClarity,
        points(&[
            (repo.has_readme, 40.0),
            (repo.has_agents, 40.0),
            (repo.has_contributing, 20.0),
        ]),
    );
    scores.insert(
        Category::WorkflowAutomation,
        points(&[
            (repo.has_workflows, 50.0),
            (repo.workflow_files.len() >= 2, 20.0),
            (repo.has_tests, 30.0),
        ]),
    );
    scores.insert(
        Category::RiskCompliance,
        points(&[
            (repo.has_license, 40.0),
            (repo.has_security_policy, 30.0),
            (repo.has_code_of_conduct, 15.0),
            (repo.has_dependency_automation, 15.0),
        ]),
    );
    scores.insert(
        Category::IntegrationStructure,
        points(&[
            (repo.has_package_manifest, 30.0),
            (repo.has_tests, 30.0),
            (repo.has_docs_directory, 20.0),
            (repo.has_workflows, 20.0),
        ]),
    );
    scores.insert(Category::FileSizeOptimization, repository_file_size_score(repo));

    scores
}

fn repository_file_size_score(repo: &RepositoryAnalysis) -> f64 {
    if repo.file_count == 0 {
        return 0.0;
    }
    let oversized = repo.large_files.iter().filter(|f| f.size_bytes > MIB).count();
    let large = repo
        .large_files
        .iter()
        .filter(|f| f.size_bytes >= 100 * KIB && f.size_bytes <= MIB)
        .count();
    (100.0 - 15.0 * oversized as f64 - 5.0 * large as f64).max(0.0)
}

pub fn website_scores(site: &WebsiteAnalysis) -> CategoryValues {
    let has_structured_data = site.structured_data.block_count > 0;
    let has_meta_description = site.meta_description.is_some();
    let has_lang = site.language.is_some();
    let has_forms = site.form_count > 0;
    let labeled_share = if site.total_inputs > 0 {
        site.labeled_inputs as f64 / site.total_inputs as f64
    } else {
        0.0
    };

    let mut scores = CategoryValues::new();

    scores.insert(
        Category::Documentation,
        points(&[
            (site.title.is_some(), 15.0),
            (has_meta_description, 25.0),
            (has_structured_data, 30.0),
            (site.has_llms_txt, 30.0),
        ]),
    );
    scores.insert(
        Category::InstructionClarity,
        points(&[
            (site.headings.has_single_h1(), 30.0),
            (site.headings.proper_hierarchy, 30.0),
            (has_meta_description, 20.0),
            (has_lang, 20.0),
        ]),
    );
    scores.insert(
        Category::WorkflowAutomation,
        points(&[
            (has_forms, 30.0),
            (site.has_search, 30.0),
            (site.has_sitemap, 40.0),
        ]),
    );
    scores.insert(
        Category::RiskCompliance,
        points(&[
            (site.has_robots_txt, 40.0),
            (site.blocked_ai_crawlers.is_empty(), 30.0),
            (site.is_https, 30.0),
        ]),
    );
    scores.insert(
        Category::IntegrationStructure,
        points(&[
            (site.landmarks.has_main, 30.0),
            (site.landmarks.has_navigation, 30.0),
            (has_structured_data, 40.0),
        ]),
    );

    let page_bytes = site.page_bytes as u64;
    let page_size_score = if page_bytes < 100 * KIB {
        100.0
    } else if page_bytes < 500 * KIB {
        70.0
    } else if page_bytes < MIB {
        40.0
    } else {
        10.0
    };
    scores.insert(Category::FileSizeOptimization, page_size_score);

    scores.insert(
        Category::InformationArchitecture,
        points(&[
            (site.landmarks.has_navigation, 30.0),
            (site.headings.proper_hierarchy, 25.0),
            (site.has_sitemap, 25.0),
            (site.landmarks.has_header && site.landmarks.has_footer, 20.0),
        ]),
    );
    scores.insert(
        Category::MachineReadableContent,
        points(&[
            (has_structured_data, 40.0),
            (site.has_llms_txt, 30.0),
            (site.has_sitemap, 15.0),
            (labeled_share >= 0.8, 15.0),
        ]),
    );
    scores.insert(
        Category::ConversationalQueryReadiness,
        points(&[
            (site.structured_data.has_faq, 40.0),
            (site.word_count >= 300, 30.0),
            (site.headings.subheading_count() >= 3, 30.0),
        ]),
    );
    scores.insert(
        Category::ActionOrientedFunctionality,
        points(&[
            (has_forms, 35.0),
            (site.has_search, 35.0),
            (site.button_count >= 3, 30.0),
        ]),
    );
    scores.insert(
        Category::PersonalizationContextAwareness,
        points(&[
            (has_lang, 40.0),
            (site.hreflang_count > 0, 30.0),
            (site.has_viewport, 30.0),
        ]),
    );

    scores
}

/// Category scores from the detailed AI sub-analyses
pub fn ai_category_scores(assessment: &AiAssessment) -> CategoryValues {
    assessment
        .detailed_analysis
        .iter()
        .flat_map(|detail| detail.iter())
        .filter_map(|(dimension, sub)| sub.score().map(|score| (dimension.category(), score)))
        .collect()
}

/// `0.7 × base + 0.3 × ai` where both exist, otherwise whichever exists
pub fn combine(base: &CategoryValues, ai: &CategoryValues) -> CategoryValues {
    base.keys()
        .chain(ai.keys())
        .map(|category| {
            let value = match (base.get(category), ai.get(category)) {
                (Some(b), Some(a)) => STATIC_WEIGHT * b + AI_WEIGHT * a,
                (Some(b), None) => *b,
                (None, Some(a)) => *a,
                (None, None) => 0.0,
            };
            (*category, value)
        })
        .collect()
}

/// Weight-normalized average of the canonical categories
pub fn overall_score(categories: &CategoryScores, weights: &CategoryWeights) -> f64 {
    let (sum, total) = Category::CANONICAL
        .iter()
        .filter_map(|category| {
            categories
                .get(*category)
                .map(|score| (score.value, weights.weight(*category)))
        })
        .fold((0.0, 0.0), |(sum, total), (value, weight)| {
            (sum + value * weight, total + weight)
        });

    if total > 0.0 {
        (sum / total).clamp(0.0, 100.0)
    } else {
        0.0
    }
}
