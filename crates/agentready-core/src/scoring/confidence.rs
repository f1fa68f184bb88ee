//! Multi-source confidence

use crate::assessment::AiAssessment;
use crate::config::ConfidenceThresholds;
use crate::score::{Confidence, ConfidenceLevel, ConfidenceScores};
use crate::types::{AnalysisData, RepositoryAnalysis, WebsiteAnalysis};

const STATIC_BASELINE: f64 = 0.5;

/// Confidence used for an assessment without a detailed breakdown
const AI_WITHOUT_DETAIL: f64 = 0.5;

fn accumulate(parts: &[(bool, f64)]) -> Confidence {
    let total = parts
        .iter()
        .filter(|(present, _)| *present)
        .fold(STATIC_BASELINE, |acc, (_, increment)| acc + increment);
    Confidence::from_fraction(total.min(1.0))
}

pub fn repository_confidence(repo: &RepositoryAnalysis) -> Confidence {
    accumulate(&[
        (repo.file_count > 0, 0.1),
        (repo.has_readme, 0.1),
        (repo.has_agents, 0.1),
        (repo.has_workflows, 0.1),
        (repo.has_contributing, 0.05),
        (repo.has_license, 0.05),
    ])
}

pub fn website_confidence(site: &WebsiteAnalysis) -> Confidence {
    accumulate(&[
        (site.page_bytes > 0, 0.1),
        (site.structured_data.block_count > 0, 0.1),
        (site.has_robots_txt, 0.1),
        (site.has_sitemap, 0.1),
        (site.title.is_some(), 0.05),
        (site.meta_description.is_some(), 0.05),
    ])
}

/// Baseline plus increments for the signals the primary analysis found
pub fn static_confidence(data: &AnalysisData) -> Confidence {
    if let Some(repo) = &data.repository {
        repository_confidence(repo)
    } else if let Some(site) = &data.website {
        website_confidence(site)
    } else {
        Confidence::from_fraction(STATIC_BASELINE)
    }
}

pub fn ai_confidence(assessment: &AiAssessment) -> Confidence {
    assessment
        .detailed_analysis
        .as_ref()
        .map(|detail| detail.confidence())
        .unwrap_or(Confidence::from_fraction(AI_WITHOUT_DETAIL))
}

/// Combine the available sources; overall is their mean
pub fn confidence_scores(
    data: &AnalysisData,
    assessment: Option<&AiAssessment>,
    thresholds: &ConfidenceThresholds,
) -> ConfidenceScores {
    let static_analysis = static_confidence(data);
    let ai_assessment = assessment.map(ai_confidence);
    let business_type_analysis = data.business_type.as_ref().map(|b| b.confidence);

    let overall = Confidence::mean(
        [Some(static_analysis), ai_assessment, business_type_analysis]
            .into_iter()
            .flatten(),
    )
    .unwrap_or(static_analysis);

    ConfidenceScores {
        overall,
        static_analysis,
        ai_assessment,
        business_type_analysis,
        level: ConfidenceLevel::classify(overall, thresholds),
    }
}
