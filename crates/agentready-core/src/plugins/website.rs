//! Website fetching and static analysis

use async_trait::async_trait;
use moka::future::Cache;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::html;
use super::robots::parse_robots_txt;
use crate::error::{AssessError, Result};
use crate::input::{AssessmentInput, InputType, normalize_origin};
use crate::plugin::{AnalyzerPlugin, ValidationReport};
use crate::types::{AnalysisPayload, AnalysisResult, PluginInfo, PluginType};

/// How long a fetched page is shared between analyzers of one run
const PAGE_TTL: Duration = Duration::from_secs(60);

/// A downloaded HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Site-level files next to the page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SiteProbe {
    pub has_robots_txt: bool,
    pub blocked_ai_crawlers: Vec<String>,
    pub has_sitemap: bool,
    pub has_llms_txt: bool,
}

/// HTTP client with a body size limit and a short-lived page cache
pub struct PageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
    pages: Cache<String, Arc<FetchedPage>>,
}

impl PageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agentready/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AssessError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            max_bytes,
            pages: Cache::builder().time_to_live(PAGE_TTL).max_capacity(64).build(),
        })
    }

    /// Fetch `url`, failing on non-success statuses and oversized bodies
    pub async fn fetch_page(&self, url: &str) -> Result<Arc<FetchedPage>> {
        self.pages
            .try_get_with(url.to_string(), async {
                let response = self.client.get(url).send().await?.error_for_status()?;
                let final_url = response.url().to_string();
                let status = response.status().as_u16();
                let body = self.read_capped(response, url).await?;
                debug!(url, bytes = body.len(), "fetched page");
                Ok::<_, AssessError>(Arc::new(FetchedPage {
                    url: final_url,
                    status,
                    body: String::from_utf8_lossy(&body).into_owned(),
                }))
            })
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    /// Body of `url` when it answers 2xx; any failure reads as absent
    pub async fn fetch_optional(&self, url: &str) -> Option<String> {
        let response = self.client.get(url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body = self.read_capped(response, url).await.ok()?;
        Some(String::from_utf8_lossy(&body).into_owned())
    }

    /// Probe robots.txt, sitemap.xml and llms.txt at the origin of `page_url`
    pub async fn probe_site(&self, page_url: &str) -> SiteProbe {
        let origin = normalize_origin(page_url);
        let robots_url = format!("{origin}/robots.txt");
        let sitemap_url = format!("{origin}/sitemap.xml");
        let llms_url = format!("{origin}/llms.txt");
        let (robots, sitemap, llms) = tokio::join!(
            self.fetch_optional(&robots_url),
            self.fetch_optional(&sitemap_url),
            self.fetch_optional(&llms_url),
        );

        let mut probe = SiteProbe::default();
        if let Some(content) = robots {
            let robots = parse_robots_txt(&content);
            probe.has_robots_txt = true;
            probe.blocked_ai_crawlers = robots.blocked_ai_crawlers();
            probe.has_sitemap = !robots.sitemaps.is_empty();
        }
        probe.has_sitemap |= sitemap.is_some_and(|body| is_sitemap(&body));
        probe.has_llms_txt = llms.is_some_and(|body| is_plain_text(&body));
        probe
    }

    async fn read_capped(&self, mut response: reqwest::Response, url: &str) -> Result<Vec<u8>> {
        if let Some(length) = response.content_length()
            && length > self.max_bytes as u64
        {
            return Err(self.too_large(url));
        }
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(self.too_large(url));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn too_large(&self, url: &str) -> AssessError {
        AssessError::TooLarge(format!("{url} exceeds {} bytes", self.max_bytes))
    }
}

fn is_sitemap(body: &str) -> bool {
    body.contains("<urlset") || body.contains("<sitemapindex")
}

/// Servers that answer every path with their HTML shell do not count
fn is_plain_text(body: &str) -> bool {
    let trimmed = body.trim_start();
    !trimmed.is_empty() && !trimmed.starts_with('<')
}

/// Analyzes a single web page and its site-level files
pub struct WebsiteAnalyzer {
    fetcher: Arc<PageFetcher>,
}

impl WebsiteAnalyzer {
    pub fn new(fetcher: Arc<PageFetcher>) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl AnalyzerPlugin for WebsiteAnalyzer {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::Website, "website-analyzer", env!("CARGO_PKG_VERSION"))
    }

    fn can_handle(&self, input: &AssessmentInput) -> bool {
        input.input_type == InputType::Website
    }

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        let started = Instant::now();
        let page = self.fetcher.fetch_page(&input.url).await?;
        let site = self.fetcher.probe_site(&page.url).await;

        let mut analysis = html::extract_page(&page.body);
        analysis.url = page.url.clone();
        analysis.status_code = page.status;
        analysis.is_https = page.url.starts_with("https://");
        analysis.has_robots_txt = site.has_robots_txt;
        analysis.blocked_ai_crawlers = site.blocked_ai_crawlers;
        analysis.has_sitemap = site.has_sitemap;
        analysis.has_llms_txt = site.has_llms_txt;

        Ok(AnalysisResult::new(
            AnalysisPayload::Website(analysis),
            &self.info(),
            started,
        ))
    }

    fn validate(&self, result: &AnalysisResult) -> ValidationReport {
        let AnalysisPayload::Website(page) = &result.payload else {
            return ValidationReport::invalid(vec![format!(
                "expected a website payload, got {}",
                result.plugin_type()
            )]);
        };
        if page.url.is_empty() {
            return ValidationReport::invalid(vec!["page URL is missing".to_string()]);
        }
        if page.word_count == 0 {
            return ValidationReport::valid().with_warning("page has no visible text");
        }
        ValidationReport::valid()
    }
}
