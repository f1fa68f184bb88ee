use agentready_core::types::WebsiteAnalysis;
use agentready_core::{
    AnalysisPayload, AnalysisResult, AnalyzerPlugin, AssessError, AssessmentInput, EngineConfig,
    PluginInfo, PluginType, ScoringEngine,
};
use agentready_server::{AppState, router};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::time::Instant;
use tower::ServiceExt;

struct StaticSite {
    error: Option<AssessError>,
}

#[async_trait]
impl AnalyzerPlugin for StaticSite {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(PluginType::Website, "static-site", "0.1.0")
    }

    fn can_handle(&self, _input: &AssessmentInput) -> bool {
        true
    }

    async fn analyze(&self, input: &AssessmentInput) -> anyhow::Result<AnalysisResult> {
        if let Some(err) = &self.error {
            return Err(err.clone().into());
        }
        let payload = AnalysisPayload::Website(WebsiteAnalysis {
            url: input.url.clone(),
            status_code: 200,
            is_https: true,
            title: Some("Example".to_string()),
            meta_description: Some("An example site".to_string()),
            word_count: 120,
            ..Default::default()
        });
        Ok(AnalysisResult::new(payload, &self.info(), Instant::now()))
    }
}

fn app(error: Option<AssessError>, fallback: bool) -> axum::Router {
    let config = EngineConfig {
        enable_ai_assessment: false,
        fallback_to_static: fallback,
        retry_delay: std::time::Duration::from_millis(1),
        ..Default::default()
    };
    let engine =
        ScoringEngine::new(config, |registry| registry.register_analyzer(StaticSite { error }))
            .unwrap();
    router(AppState::new(engine))
}

async fn post(app: axum::Router, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/assess")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let response = app(None, true)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_assess_website() {
    let (status, body) = post(
        app(None, true),
        r#"{"inputUrl": "https://example.com", "inputType": "website"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "website");
    assert_eq!(body["url"], "https://example.com");
    assert_eq!(body["metadata"]["fallbackUsed"], false);
    assert!(body["scores"]["overall"]["value"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_assess_legacy_shape() {
    let (status, body) = post(
        app(None, true),
        r#"{"inputUrl": "https://example.com", "legacy": true}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["overallScore"].is_i64());
    assert!(body["categoryScores"]["documentation"].is_i64());
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let (status, body) = post(
        app(None, true),
        r#"{"inputUrl": "ftp://example.com", "inputType": "website"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION_ERROR");

    let (status, body) = post(app(None, true), r#"{"url": "https://example.com"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_failure_status_without_fallback() {
    let (status, body) = post(
        app(Some(AssessError::NotFound("https://example.com".into())), false),
        r#"{"inputUrl": "https://example.com"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_failure_falls_back_with_ok_status() {
    let (status, body) = post(
        app(Some(AssessError::Network("connection reset".into())), true),
        r#"{"inputUrl": "https://example.com"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["metadata"]["fallbackUsed"], true);
    assert_eq!(body["scores"]["overall"]["value"], 0.0);
}
