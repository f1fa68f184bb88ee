//! Business-type classification and agentic flow scoring

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use super::html;
use super::website::PageFetcher;
use crate::input::{AssessmentInput, InputType};
use crate::plugin::AnalyzerPlugin;
use crate::score::Confidence;
use crate::types::{
    AgenticFlow, AnalysisPayload, AnalysisResult, BusinessType, BusinessTypeAnalysis, PluginInfo,
    PluginType, WebsiteAnalysis,
};

/// Observable evidence that an agent could complete a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Search,
    Forms,
    LabeledForms,
    Navigation,
    Sitemap,
    StructuredData,
    Faq,
    LlmsTxt,
    Buttons,
    SchemaType(&'static str),
    Keyword(&'static str),
}

impl Signal {
    fn label(self) -> String {
        match self {
            Signal::Search => "site search".to_string(),
            Signal::Forms => "forms".to_string(),
            Signal::LabeledForms => "labeled form fields".to_string(),
            Signal::Navigation => "navigation landmark".to_string(),
            Signal::Sitemap => "sitemap".to_string(),
            Signal::StructuredData => "structured data".to_string(),
            Signal::Faq => "FAQ markup".to_string(),
            Signal::LlmsTxt => "llms.txt".to_string(),
            Signal::Buttons => "clear calls to action".to_string(),
            Signal::SchemaType(t) => format!("{t} markup"),
            Signal::Keyword(k) => format!("'{k}' content"),
        }
    }

    fn present(self, page: &WebsiteAnalysis, text: &str) -> bool {
        match self {
            Signal::Search => page.has_search,
            Signal::Forms => page.form_count > 0,
            Signal::LabeledForms => {
                page.total_inputs > 0 && page.labeled_inputs * 5 >= page.total_inputs * 4
            }
            Signal::Navigation => page.landmarks.has_navigation,
            Signal::Sitemap => page.has_sitemap,
            Signal::StructuredData => page.structured_data.block_count > 0,
            Signal::Faq => page.structured_data.has_faq,
            Signal::LlmsTxt => page.has_llms_txt,
            Signal::Buttons => page.button_count >= 3,
            Signal::SchemaType(t) => page.structured_data.types.iter().any(|found| found == t),
            Signal::Keyword(k) => text.contains(k),
        }
    }

    fn recommendation(self) -> String {
        match self {
            Signal::Search => "Expose a site search form agents can submit".to_string(),
            Signal::Forms | Signal::LabeledForms => {
                "Provide labeled HTML forms for key tasks instead of script-only widgets".to_string()
            }
            Signal::Navigation => "Wrap primary navigation in a <nav> landmark".to_string(),
            Signal::Sitemap => "Publish a sitemap.xml listing every public page".to_string(),
            Signal::StructuredData => "Describe key entities with schema.org JSON-LD".to_string(),
            Signal::Faq => "Mark up frequently asked questions with FAQPage JSON-LD".to_string(),
            Signal::LlmsTxt => "Publish an llms.txt summary for language models".to_string(),
            Signal::Buttons => "Use descriptive buttons for primary actions".to_string(),
            Signal::SchemaType(t) => format!("Add {t} structured data"),
            Signal::Keyword(k) => format!("Make the '{k}' path visible in page content"),
        }
    }
}

struct FlowSpec {
    name: &'static str,
    signals: &'static [Signal],
}

const GENERAL_FLOWS: &[FlowSpec] = &[
    FlowSpec {
        name: "Find information",
        signals: &[Signal::Search, Signal::Navigation, Signal::Sitemap, Signal::StructuredData],
    },
    FlowSpec {
        name: "Contact the business",
        signals: &[Signal::Forms, Signal::LabeledForms, Signal::Keyword("contact")],
    },
];

fn type_flows(business_type: BusinessType) -> &'static [FlowSpec] {
    match business_type {
        BusinessType::Ecommerce => &[
            FlowSpec {
                name: "Discover products",
                signals: &[Signal::Search, Signal::SchemaType("Product"), Signal::Navigation],
            },
            FlowSpec {
                name: "Complete a purchase",
                signals: &[Signal::Keyword("cart"), Signal::Keyword("checkout"), Signal::SchemaType("Offer"), Signal::Buttons],
            },
        ],
        BusinessType::Saas => &[
            FlowSpec {
                name: "Compare plans",
                signals: &[Signal::Keyword("pricing"), Signal::Faq, Signal::StructuredData],
            },
            FlowSpec {
                name: "Sign up",
                signals: &[Signal::Keyword("sign up"), Signal::Forms, Signal::LabeledForms],
            },
            FlowSpec {
                name: "Integrate",
                signals: &[Signal::Keyword("api"), Signal::Keyword("docs"), Signal::LlmsTxt],
            },
        ],
        BusinessType::Hospitality => &[FlowSpec {
            name: "Make a reservation",
            signals: &[Signal::Keyword("book"), Signal::Forms, Signal::LabeledForms, Signal::SchemaType("Hotel")],
        }],
        BusinessType::Healthcare => &[FlowSpec {
            name: "Book an appointment",
            signals: &[Signal::Keyword("appointment"), Signal::Forms, Signal::LabeledForms, Signal::Search],
        }],
        BusinessType::Finance => &[FlowSpec {
            name: "Open an account",
            signals: &[Signal::Keyword("apply"), Signal::Forms, Signal::LabeledForms, Signal::Faq],
        }],
        BusinessType::Education => &[FlowSpec {
            name: "Enroll in a course",
            signals: &[Signal::SchemaType("Course"), Signal::Keyword("enroll"), Signal::Search, Signal::Forms],
        }],
        BusinessType::Media => &[FlowSpec {
            name: "Find and read articles",
            signals: &[Signal::Search, Signal::SchemaType("Article"), Signal::Sitemap, Signal::Keyword("subscribe")],
        }],
        BusinessType::ProfessionalServices => &[FlowSpec {
            name: "Request a quote",
            signals: &[Signal::Keyword("quote"), Signal::Forms, Signal::LabeledForms, Signal::Faq],
        }],
        BusinessType::Travel => &[FlowSpec {
            name: "Search and book a trip",
            signals: &[Signal::Search, Signal::Keyword("book"), Signal::Forms, Signal::Buttons],
        }],
        BusinessType::RealEstate => &[FlowSpec {
            name: "Search listings",
            signals: &[Signal::Search, Signal::Keyword("listing"), Signal::Forms, Signal::StructuredData],
        }],
        BusinessType::General => &[],
    }
}

static CLASSIFIERS: Lazy<Vec<(BusinessType, Regex)>> = Lazy::new(|| {
    [
        (BusinessType::Ecommerce, r"shop|cart|checkout|add to bag|free shipping|buy now|in stock|sale"),
        (BusinessType::Saas, r"pricing|free trial|sign up|dashboard|api|integrations|per seat|saas"),
        (BusinessType::Hospitality, r"hotel|restaurant|reservation|menu|rooms|check-in|guests|dining"),
        (BusinessType::Healthcare, r"patient|clinic|doctor|appointment|health|medical|treatment|insurance accepted"),
        (BusinessType::Finance, r"bank|loan|mortgage|credit card|invest|interest rate|savings|insurance"),
        (BusinessType::Education, r"course|student|enroll|curriculum|university|school|learning|tuition"),
        (BusinessType::Media, r"news|article|editorial|subscribe|podcast|episode|breaking|opinion"),
        (BusinessType::ProfessionalServices, r"consulting|agency|our services|case studies|clients|law firm|accounting|get a quote"),
        (BusinessType::Travel, r"flights|destination|itinerary|travel|tour|vacation|booking|cruise"),
        (BusinessType::RealEstate, r"real estate|property|listing|for sale|for rent|bedrooms|agent|mortgage calculator"),
    ]
    .into_iter()
    .map(|(business_type, words)| {
        let pattern = format!(r"(?i)\b(?:{words})\b");
        (business_type, Regex::new(&pattern).expect("invalid classifier regex"))
    })
    .collect()
});

/// Classify page text and score the flows an agent would run for that type
pub fn classify(page: &WebsiteAnalysis, text: &str) -> BusinessTypeAnalysis {
    let lower = text.to_lowercase();

    let mut best: Option<(BusinessType, usize, BTreeSet<String>)> = None;
    for (business_type, regex) in CLASSIFIERS.iter() {
        let matches: Vec<String> = regex.find_iter(&lower).map(|m| m.as_str().to_string()).collect();
        if matches.is_empty() {
            continue;
        }
        let hits = matches.len();
        if best.as_ref().is_none_or(|(_, best_hits, _)| hits > *best_hits) {
            best = Some((*business_type, hits, matches.into_iter().collect()));
        }
    }

    let (business_type, matched_keywords) = match best {
        Some((business_type, _, distinct)) => (business_type, distinct.into_iter().collect::<Vec<_>>()),
        None => (BusinessType::General, Vec::new()),
    };
    let confidence = if matched_keywords.is_empty() {
        Confidence::from_fraction(0.3)
    } else {
        Confidence::from_fraction((0.4 + 0.1 * matched_keywords.len() as f64).min(0.95))
    };

    let agentic_flows: Vec<AgenticFlow> = GENERAL_FLOWS
        .iter()
        .chain(type_flows(business_type))
        .map(|spec| score_flow(spec, page, &lower))
        .collect();

    let overall_score = if agentic_flows.is_empty() {
        0.0
    } else {
        agentic_flows.iter().map(|f| f.score).sum::<f64>() / agentic_flows.len() as f64
    };

    let mut findings = vec![format!(
        "Classified as {} ({:.0}% confidence)",
        business_type.label(),
        confidence.as_percent()
    )];
    let mut recommendations = Vec::new();
    for (flow, spec) in agentic_flows
        .iter()
        .zip(GENERAL_FLOWS.iter().chain(type_flows(business_type)))
    {
        if flow.score >= 50.0 {
            continue;
        }
        findings.push(format!(
            "Agents would struggle to {}: missing {}",
            flow.name.to_lowercase(),
            flow.missing_signals.join(", ")
        ));
        for signal in spec.signals.iter().filter(|s| !s.present(page, &lower)) {
            let recommendation = signal.recommendation();
            if !recommendations.contains(&recommendation) {
                recommendations.push(recommendation);
            }
        }
    }

    BusinessTypeAnalysis {
        business_type,
        confidence,
        matched_keywords,
        agentic_flows,
        overall_score,
        findings,
        recommendations,
    }
}

fn score_flow(spec: &FlowSpec, page: &WebsiteAnalysis, text: &str) -> AgenticFlow {
    let (present, missing): (Vec<Signal>, Vec<Signal>) =
        spec.signals.iter().copied().partition(|s| s.present(page, text));
    AgenticFlow {
        name: spec.name.to_string(),
        score: present.len() as f64 / spec.signals.len().max(1) as f64 * 100.0,
        present_signals: present.into_iter().map(Signal::label).collect(),
        missing_signals: missing.into_iter().map(Signal::label).collect(),
    }
}

/// Classifies websites from their page content
pub struct BusinessTypeAnalyzer {
    fetcher: Arc<PageFetcher>,
}

impl BusinessTypeAnalyzer {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl AnalyzerPlugin for BusinessTypeAnalyzer {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::BusinessType, "business-type-analyzer", env!("CARGO_PKG_VERSION"))
    }

    fn can_handle(&self, input: &AssessmentInput) -> bool {
        input.input_type == InputType::Website
    }

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        let started = Instant::now();
        let page = self.fetcher.fetch_page(&input.url).await?;
        let mut facts = html::extract_page(&page.body);
        let site = self.fetcher.probe_site(&page.url).await;
        facts.has_sitemap = site.has_sitemap;
        facts.has_llms_txt = site.has_llms_txt;

        let text = html::visible_text(&page.body);
        let analysis = classify(&facts, &text);
        Ok(AnalysisResult::new(
            AnalysisPayload::BusinessType(analysis),
            &self.info(),
            started,
        ))
    }
}
