//! Plugin registry with cached, retried execution
//!
//! Plugins are keyed by `(plugin type, name)` and kept in registration order,
//! so a lookup by type alone returns the first plugin registered for it.
//! Registration happens once at startup through `&mut self`; afterwards the
//! registry is shared behind an `Arc`.
//!
//! Concurrent requests for the same work share one run. When that run is
//! cancelled by its own caller, the other waiters retry under their tokens.

use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::assessment::AiAssessment;
use crate::cache::{ResultCache, cache_key};
use crate::config::RegistryConfig;
use crate::error::{AssessError, Result};
use crate::input::AssessmentInput;
use crate::plugin::{AiAssessorPlugin, AnalyzerPlugin};
use crate::retry::{RetryError, RetryPolicy, retry_with_backoff};
use crate::types::{AnalysisResult, PluginType};

/// A value produced by the registry with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Executed<T> {
    pub value: T,
    /// Attempts spent in this call; zero when served from cache
    pub attempts: u32,
    pub cached: bool,
}

impl<T> Executed<T> {
    /// Attempts beyond the first
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub analyzer_count: usize,
    pub assessor_count: usize,
    pub analyzers: Vec<String>,
    pub assessors: Vec<String>,
    pub cache_entries: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
}

pub struct PluginRegistry {
    policy: RetryPolicy,
    analyzers: Vec<Arc<dyn AnalyzerPlugin>>,
    assessors: Vec<Arc<dyn AiAssessorPlugin>>,
    analysis_cache: ResultCache<AnalysisResult>,
    assessment_cache: ResultCache<AiAssessment>,
}

impl PluginRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            policy: RetryPolicy::new(config.max_retries, config.retry_delay),
            analyzers: Vec::new(),
            assessors: Vec::new(),
            analysis_cache: ResultCache::new(config.cache_ttl, config.cache_capacity),
            assessment_cache: ResultCache::new(config.cache_ttl, config.cache_capacity),
        }
    }

    pub fn register_analyzer<P: AnalyzerPlugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_analyzer_arc(Arc::new(plugin))
    }

    pub fn register_analyzer_arc(&mut self, plugin: Arc<dyn AnalyzerPlugin>) -> Result<()> {
        let info = plugin.info();
        if self.get_analyzer(info.plugin_type, Some(&info.name)).is_some() {
            return Err(AssessError::DuplicateRegistration {
                plugin_type: info.plugin_type,
                name: info.name,
            });
        }
        debug!(plugin_type = %info.plugin_type, name = %info.name, version = %info.version, "registered analyzer");
        self.analyzers.push(plugin);
        Ok(())
    }

    pub fn register_ai_assessor<P: AiAssessorPlugin + 'static>(&mut self, plugin: P) -> Result<()> {
        self.register_ai_assessor_arc(Arc::new(plugin))
    }

    pub fn register_ai_assessor_arc(&mut self, plugin: Arc<dyn AiAssessorPlugin>) -> Result<()> {
        let info = plugin.info();
        if self.get_ai_assessor(info.plugin_type, Some(&info.name)).is_some() {
            return Err(AssessError::DuplicateRegistration {
                plugin_type: info.plugin_type,
                name: info.name,
            });
        }
        debug!(plugin_type = %info.plugin_type, name = %info.name, version = %info.version, "registered AI assessor");
        self.assessors.push(plugin);
        Ok(())
    }

    /// Exact lookup by name, or the first analyzer registered for the type
    pub fn get_analyzer(
        &self,
        plugin_type: PluginType,
        name: Option<&str>,
    ) -> Option<Arc<dyn AnalyzerPlugin>> {
        self.analyzers
            .iter()
            .find(|p| {
                let info = p.info();
                info.plugin_type == plugin_type && name.is_none_or(|n| info.name == n)
            })
            .cloned()
    }

    pub fn get_ai_assessor(
        &self,
        plugin_type: PluginType,
        name: Option<&str>,
    ) -> Option<Arc<dyn AiAssessorPlugin>> {
        self.assessors
            .iter()
            .find(|p| {
                let info = p.info();
                info.plugin_type == plugin_type && name.is_none_or(|n| info.name == n)
            })
            .cloned()
    }

    /// Assessor for an analysis type, falling back to the unified assessor
    pub fn resolve_ai_assessor(&self, plugin_type: PluginType) -> Option<Arc<dyn AiAssessorPlugin>> {
        self.get_ai_assessor(plugin_type, None)
            .or_else(|| self.get_ai_assessor(PluginType::Unified, None))
    }

    /// Primary analysis with the analyzer matching the input type
    pub async fn execute_analysis(
        &self,
        input: &AssessmentInput,
        cancel: &CancellationToken,
    ) -> Result<Executed<AnalysisResult>> {
        self.execute_analysis_as(input.input_type.plugin_type(), input, cancel)
            .await
    }

    /// Analysis with an explicitly chosen analyzer type
    pub async fn execute_analysis_as(
        &self,
        plugin_type: PluginType,
        input: &AssessmentInput,
        cancel: &CancellationToken,
    ) -> Result<Executed<AnalysisResult>> {
        let analyzer = self
            .get_analyzer(plugin_type, None)
            .ok_or(AssessError::NoPlugin(plugin_type))?;
        let name = analyzer.info().name;

        if !analyzer.can_handle(input) {
            return Err(AssessError::CannotHandle {
                name,
                target: input.url.clone(),
            });
        }

        let key = cache_key("analysis", plugin_type, input)?;
        let mut attempts = 0;

        let lookup = loop {
            let mut ran = false;
            let shared = self
                .analysis_cache
                .get_or_try_insert(key.clone(), async {
                    ran = true;
                    let outcome = retry_with_backoff(&self.policy, cancel, &name, |_| {
                        let analyzer = analyzer.clone();
                        async move {
                            let result = analyzer
                                .analyze(input)
                                .await
                                .map_err(AssessError::from_plugin)?;
                            let report = analyzer.validate(&result);
                            if report.is_valid {
                                Ok(result)
                            } else {
                                Err(AssessError::InvalidResult(report.errors.join("; ")))
                            }
                        }
                    })
                    .await;

                    match outcome {
                        Ok(done) => {
                            attempts = done.attempts;
                            Ok(done.value)
                        }
                        Err(RetryError { attempts: spent, last }) => {
                            attempts = spent;
                            Err(exhausted(last, |last| AssessError::AnalysisFailed {
                                analyzer: name.clone(),
                                attempts: spent,
                                last,
                            }))
                        }
                    }
                })
                .await;

            match shared {
                Err(AssessError::Cancelled) if !ran && !cancel.is_cancelled() => {
                    debug!(analyzer = %name, "shared analysis was cancelled by another caller, retrying");
                }
                other => break other?,
            }
        };

        if lookup.hit {
            debug!(plugin_type = %plugin_type, analyzer = %name, stored_at = %lookup.stored_at, "analysis served from cache");
        } else {
            info!(plugin_type = %plugin_type, analyzer = %name, attempts, "analysis completed");
        }

        Ok(Executed {
            value: lookup.value,
            attempts: if lookup.hit { 0 } else { attempts },
            cached: lookup.hit,
        })
    }

    /// AI assessment of an analysis result
    pub async fn execute_ai_assessment(
        &self,
        analysis: &AnalysisResult,
        cancel: &CancellationToken,
    ) -> Result<Executed<AiAssessment>> {
        let plugin_type = analysis.plugin_type();
        let assessor = self
            .resolve_ai_assessor(plugin_type)
            .ok_or(AssessError::NoPlugin(PluginType::Unified))?;
        let name = assessor.info().name;

        if !assessor.can_handle(analysis) {
            return Err(AssessError::CannotHandle {
                name,
                target: format!("{plugin_type} analysis"),
            });
        }

        let key = cache_key("ai-assessment", plugin_type, &analysis.payload)?;
        let mut attempts = 0;

        let lookup = loop {
            let mut ran = false;
            let shared = self
                .assessment_cache
                .get_or_try_insert(key.clone(), async {
                    ran = true;
                    let outcome = retry_with_backoff(&self.policy, cancel, &name, |_| {
                        let assessor = assessor.clone();
                        async move {
                            assessor
                                .assess(analysis)
                                .await
                                .map_err(AssessError::from_plugin)
                        }
                    })
                    .await;

                    match outcome {
                        Ok(done) => {
                            attempts = done.attempts;
                            Ok(done.value)
                        }
                        Err(RetryError { attempts: spent, last }) => {
                            attempts = spent;
                            Err(exhausted(last, |last| AssessError::AssessmentFailed {
                                assessor: name.clone(),
                                attempts: spent,
                                last,
                            }))
                        }
                    }
                })
                .await;

            match shared {
                Err(AssessError::Cancelled) if !ran && !cancel.is_cancelled() => {
                    debug!(assessor = %name, "shared AI assessment was cancelled by another caller, retrying");
                }
                other => break other?,
            }
        };

        if lookup.hit {
            debug!(plugin_type = %plugin_type, assessor = %name, "AI assessment served from cache");
        } else {
            info!(plugin_type = %plugin_type, assessor = %name, attempts, "AI assessment completed");
        }

        Ok(Executed {
            value: lookup.value,
            attempts: if lookup.hit { 0 } else { attempts },
            cached: lookup.hit,
        })
    }

    pub async fn clear_cache(&self) {
        self.analysis_cache.clear().await;
        self.assessment_cache.clear().await;
        debug!("registry caches cleared");
    }

    pub async fn stats(&self) -> RegistryStats {
        RegistryStats {
            analyzer_count: self.analyzers.len(),
            assessor_count: self.assessors.len(),
            analyzers: self.analyzers.iter().map(|p| p.info().name).collect(),
            assessors: self.assessors.iter().map(|p| p.info().name).collect(),
            cache_entries: self.analysis_cache.entry_count().await
                + self.assessment_cache.entry_count().await,
            cache_hits: self.analysis_cache.hits() + self.assessment_cache.hits(),
            cache_misses: self.analysis_cache.misses() + self.assessment_cache.misses(),
        }
    }
}

/// Cancellation surfaces as itself; anything else is wrapped with the attempt count
fn exhausted(last: AssessError, wrap: impl FnOnce(Box<AssessError>) -> AssessError) -> AssessError {
    match last {
        AssessError::Cancelled => AssessError::Cancelled,
        other => wrap(Box::new(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputType;
    use crate::plugin::ValidationReport;
    use crate::types::{AnalysisPayload, PluginInfo, WebsiteAnalysis};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{Duration, Instant};

    struct StubAnalyzer {
        name: &'static str,
        calls: Arc<AtomicU32>,
        fail_first: u32,
        valid: bool,
        delay: Option<Duration>,
    }

    impl StubAnalyzer {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                calls: Arc::new(AtomicU32::new(0)),
                fail_first: 0,
                valid: true,
                delay: None,
            }
        }
    }

    #[async_trait]
    impl AnalyzerPlugin for StubAnalyzer {
        fn info(&self) -> PluginInfo {
            PluginInfo::new(PluginType::Website, self.name, "1.0.0")
        }

        fn can_handle(&self, input: &AssessmentInput) -> bool {
            input.input_type == InputType::Website
        }

        async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if call <= self.fail_first {
                anyhow::bail!("transient failure {call}");
            }
            Ok(AnalysisResult::new(
                AnalysisPayload::Website(WebsiteAnalysis {
                    url: input.url.clone(),
                    ..Default::default()
                }),
                &self.info(),
                Instant::now(),
            ))
        }

        fn validate(&self, _result: &AnalysisResult) -> ValidationReport {
            if self.valid {
                ValidationReport::valid()
            } else {
                ValidationReport::invalid(vec!["missing title".to_string()])
            }
        }
    }

    fn config() -> RegistryConfig {
        RegistryConfig {
            max_retries: 3,
            retry_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn website() -> AssessmentInput {
        AssessmentInput::new(InputType::Website, "https://example.com").unwrap()
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = PluginRegistry::new(config());
        let first = StubAnalyzer::new("site");
        let first_calls = first.calls.clone();
        registry.register_analyzer(first).unwrap();

        let err = registry.register_analyzer(StubAnalyzer::new("site")).unwrap_err();
        assert!(matches!(err, AssessError::DuplicateRegistration { .. }));

        registry.register_analyzer(StubAnalyzer::new("other")).unwrap();
        assert_eq!(registry.analyzers.len(), 2);

        let found = registry.get_analyzer(PluginType::Website, None).unwrap();
        assert_eq!(found.info().name, "site");
        assert!(registry.get_analyzer(PluginType::Website, Some("other")).is_some());
        assert!(registry.get_analyzer(PluginType::Repository, None).is_none());
        assert_eq!(first_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_plugin() {
        let registry = PluginRegistry::new(config());
        let err = registry
            .execute_analysis(&website(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssessError::NoPlugin(PluginType::Website)));
    }

    #[tokio::test]
    async fn test_cannot_handle() {
        let mut registry = PluginRegistry::new(config());
        registry.register_analyzer(StubAnalyzer::new("site")).unwrap();

        let repo = AssessmentInput::new(InputType::Repository, "https://github.com/a/b").unwrap();
        let err = registry
            .execute_analysis_as(PluginType::Website, &repo, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AssessError::CannotHandle { .. }));
    }

    #[tokio::test]
    async fn test_retries_then_caches() {
        let mut registry = PluginRegistry::new(config());
        let mut analyzer = StubAnalyzer::new("site");
        analyzer.fail_first = 2;
        let calls = analyzer.calls.clone();
        registry.register_analyzer(analyzer).unwrap();

        let cancel = CancellationToken::new();
        let first = registry.execute_analysis(&website(), &cancel).await.unwrap();
        assert_eq!(first.attempts, 3);
        assert_eq!(first.retries(), 2);
        assert!(!first.cached);

        let second = registry.execute_analysis(&website(), &cancel).await.unwrap();
        assert!(second.cached);
        assert_eq!(second.attempts, 0);
        assert_eq!(second.value, first.value);
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        let stats = registry.stats().await;
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(stats.cache_misses, 1);
        assert_eq!(stats.cache_entries, 1);
        assert_eq!(stats.analyzers, vec!["site".to_string()]);

        registry.clear_cache().await;
        registry.execute_analysis(&website(), &cancel).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalid_result_counts_as_failed_attempt() {
        let mut registry = PluginRegistry::new(config());
        let mut analyzer = StubAnalyzer::new("site");
        analyzer.valid = false;
        let calls = analyzer.calls.clone();
        registry.register_analyzer(analyzer).unwrap();

        let err = registry
            .execute_analysis(&website(), &CancellationToken::new())
            .await
            .unwrap_err();

        match &err {
            AssessError::AnalysisFailed { analyzer, attempts, last } => {
                assert_eq!(analyzer, "site");
                assert_eq!(*attempts, 3);
                assert!(matches!(**last, AssessError::InvalidResult(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(registry.stats().await.cache_entries, 0);
    }

    #[tokio::test]
    async fn test_cancellation_is_not_wrapped() {
        let mut registry = PluginRegistry::new(config());
        registry.register_analyzer(StubAnalyzer::new("site")).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = registry.execute_analysis(&website(), &cancel).await.unwrap_err();
        assert!(matches!(err, AssessError::Cancelled));
    }

    #[tokio::test]
    async fn test_waiter_outlives_cancelled_shared_run() {
        let mut registry = PluginRegistry::new(config());
        let mut analyzer = StubAnalyzer::new("site");
        analyzer.delay = Some(Duration::from_millis(100));
        let calls = analyzer.calls.clone();
        registry.register_analyzer(analyzer).unwrap();
        let registry = Arc::new(registry);

        let first_cancel = CancellationToken::new();
        let first = {
            let registry = registry.clone();
            let cancel = first_cancel.clone();
            tokio::spawn(async move { registry.execute_analysis(&website(), &cancel).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .execute_analysis(&website(), &CancellationToken::new())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        first_cancel.cancel();

        let first = first.await.unwrap();
        assert!(matches!(first, Err(AssessError::Cancelled)));

        let second = second.await.unwrap().unwrap();
        assert!(!second.cached);
        assert_eq!(second.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
