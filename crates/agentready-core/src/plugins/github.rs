//! Minimal GitHub REST client: repository metadata, languages and the
//! recursive tree of the default branch.

use moka::future::Cache;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{AssessError, Result};
use crate::types::FileEntry;

pub const GITHUB_API: &str = "https://api.github.com";

/// Everything the repository analyzers need, fetched once per run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoSnapshot {
    pub owner: String,
    pub name: String,
    pub default_branch: String,
    pub primary_language: Option<String>,
    /// Sorted by bytes of code, largest first
    pub languages: Vec<String>,
    /// Blobs only
    pub files: Vec<FileEntry>,
    /// Directory paths
    pub directories: Vec<String>,
    pub truncated: bool,
}

#[derive(Deserialize)]
struct RepoMetadata {
    default_branch: String,
    language: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    size: Option<u64>,
}

pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    snapshots: Cache<(String, String), Arc<RepoSnapshot>>,
}

impl GitHubClient {
    pub fn new(token: Option<&str>, timeout: Duration) -> Result<Self> {
        Self::with_api_base(GITHUB_API, token, timeout)
    }

    /// Client against another API root (GitHub Enterprise, tests)
    pub fn with_api_base(api_base: &str, token: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static("2022-11-28"));
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| AssessError::Validation("GitHub token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("agentready/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .map_err(|e| AssessError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            snapshots: Cache::builder()
                .time_to_live(Duration::from_secs(60))
                .max_capacity(32)
                .build(),
        })
    }

    /// Metadata, languages and tree of `owner/name`, shared between callers
    /// for a short while
    pub async fn snapshot(&self, owner: &str, name: &str) -> Result<Arc<RepoSnapshot>> {
        self.snapshots
            .try_get_with((owner.to_string(), name.to_string()), async {
                self.fetch_snapshot(owner, name).await.map(Arc::new)
            })
            .await
            .map_err(Arc::unwrap_or_clone)
    }

    async fn fetch_snapshot(&self, owner: &str, name: &str) -> Result<RepoSnapshot> {
        let repo_path = format!("/repos/{owner}/{name}");
        let metadata: RepoMetadata = self.get_json(&repo_path).await?;

        let tree_path = format!("{repo_path}/git/trees/{}?recursive=1", metadata.default_branch);
        let languages_path = format!("{repo_path}/languages");
        let (tree, languages) = tokio::join!(
            self.get_json::<TreeResponse>(&tree_path),
            self.get_json::<HashMap<String, u64>>(&languages_path),
        );
        let tree = tree?;
        // language statistics are optional
        let mut languages: Vec<(String, u64)> = languages.unwrap_or_default().into_iter().collect();
        languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let mut files = Vec::new();
        let mut directories = Vec::new();
        for item in tree.tree {
            match item.kind.as_str() {
                "blob" => files.push(FileEntry {
                    path: item.path,
                    size_bytes: item.size.unwrap_or(0),
                }),
                "tree" => directories.push(item.path),
                _ => {}
            }
        }
        debug!(owner, name, files = files.len(), truncated = tree.truncated, "fetched repository tree");

        Ok(RepoSnapshot {
            owner: owner.to_string(),
            name: name.to_string(),
            default_branch: metadata.default_branch,
            primary_language: metadata.language,
            languages: languages.into_iter().map(|(language, _)| language).collect(),
            files,
            directories,
            truncated: tree.truncated,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.api_base, path);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response.headers(), path));
        }
        Ok(response.json::<T>().await?)
    }
}

fn status_error(status: StatusCode, headers: &HeaderMap, path: &str) -> AssessError {
    let exhausted = headers
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0")
        || headers.contains_key("retry-after");

    match status {
        StatusCode::NOT_FOUND => {
            AssessError::NotFound(format!("{path} (repository missing or private)"))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            AssessError::RateLimited(format!("GitHub API rate limit reached for {path}"))
        }
        StatusCode::FORBIDDEN if exhausted => {
            AssessError::RateLimited(format!("GitHub API rate limit reached for {path}"))
        }
        _ => AssessError::Network(format!("GitHub API returned {status} for {path}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::plugins::test_server::{Canned, TestServer};

    fn client(server: &TestServer) -> GitHubClient {
        GitHubClient::with_api_base(&server.base_url, Some("secret"), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot() {
        let server = TestServer::start(vec![
            (
                "/repos/acme/widgets",
                Canned::ok("application/json", r#"{"default_branch":"main","language":"Rust"}"#),
            ),
            (
                "/repos/acme/widgets/git/trees/main",
                Canned::ok(
                    "application/json",
                    r#"{"tree":[
                        {"path":"README.md","type":"blob","size":1200},
                        {"path":"src","type":"tree"},
                        {"path":"src/main.rs","type":"blob","size":300}
                    ],"truncated":true}"#,
                ),
            ),
            (
                "/repos/acme/widgets/languages",
                Canned::ok("application/json", r#"{"Shell":10,"Rust":9000}"#),
            ),
        ])
        .await;

        let snapshot = client(&server).snapshot("acme", "widgets").await.unwrap();
        assert_eq!(snapshot.default_branch, "main");
        assert_eq!(snapshot.primary_language.as_deref(), Some("Rust"));
        assert_eq!(snapshot.languages, vec!["Rust", "Shell"]);
        assert_eq!(snapshot.files.len(), 2);
        assert_eq!(snapshot.directories, vec!["src"]);
        assert!(snapshot.truncated);

        let requests = server.requests.lock().unwrap();
        assert!(requests[0].to_ascii_lowercase().contains("authorization: bearer secret"));
    }

    #[tokio::test]
    async fn test_missing_repository() {
        let server = TestServer::start(vec![]).await;
        let err = client(&server).snapshot("acme", "gone").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_status_error_mapping() {
        let mut headers = HeaderMap::new();
        let err = status_error(StatusCode::FORBIDDEN, &headers, "/repos/a/b");
        assert_eq!(err.kind(), ErrorKind::Network);

        headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
        let err = status_error(StatusCode::FORBIDDEN, &headers, "/repos/a/b");
        assert_eq!(err.kind(), ErrorKind::RateLimited);

        let err = status_error(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), "/repos/a/b");
        assert_eq!(err.kind(), ErrorKind::RateLimited);
    }
}
