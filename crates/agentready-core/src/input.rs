//! Assessment input and URL validation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{AssessError, Result};
use crate::types::PluginType;

/// What kind of target is being assessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Repository,
    Website,
}

impl InputType {
    /// Analyzer type responsible for the primary static analysis
    pub fn plugin_type(self) -> PluginType {
        match self {
            InputType::Repository => PluginType::Repository,
            InputType::Website => PluginType::Website,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputType::Repository => "repository",
            InputType::Website => "website",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputType {
    type Err = AssessError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "repository" | "repo" => Ok(InputType::Repository),
            "website" | "site" => Ok(InputType::Website),
            other => Err(AssessError::Validation(format!(
                "unknown input type '{other}', expected 'repository' or 'website'"
            ))),
        }
    }
}

/// One assessment request. Built through [`AssessmentInput::new`], which
/// validates and normalizes the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentInput {
    #[serde(rename = "type")]
    pub input_type: InputType,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, serde_json::Value>,
}

impl AssessmentInput {
    pub fn new(input_type: InputType, url: &str) -> Result<Self> {
        let input = Self {
            input_type,
            url: normalize_input_url(input_type, url),
            options: BTreeMap::new(),
        };
        input.validate()?;
        Ok(input)
    }

    /// Infer the input type from the URL: GitHub repository URLs are
    /// repositories, everything else is a website.
    pub fn infer(url: &str) -> Result<Self> {
        let parsed = parse_http_url(url)?;
        let input_type = if is_github_host(&parsed) && parse_github_repository(url).is_ok() {
            InputType::Repository
        } else {
            InputType::Website
        };
        Self::new(input_type, url)
    }

    pub fn with_option(mut self, key: &str, value: serde_json::Value) -> Self {
        self.options.insert(key.to_string(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        match self.input_type {
            InputType::Website => parse_http_url(&self.url).map(|_| ()),
            InputType::Repository => parse_github_repository(&self.url).map(|_| ()),
        }
    }
}

fn normalize_input_url(input_type: InputType, url: &str) -> String {
    let trimmed = url.trim();
    match input_type {
        InputType::Repository => trimmed
            .trim_end_matches('/')
            .trim_end_matches(".git")
            .to_string(),
        InputType::Website => trimmed.to_string(),
    }
}

fn parse_http_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(AssessError::Validation("URL is required".to_string()));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| AssessError::Validation(format!("invalid URL '{trimmed}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(AssessError::Validation(format!(
            "unsupported URL scheme '{}', only http and https are allowed",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(AssessError::Validation(format!("URL '{trimmed}' has no host")));
    }
    Ok(parsed)
}

fn is_github_host(url: &Url) -> bool {
    matches!(url.host_str(), Some("github.com" | "www.github.com"))
}

/// Split a `https://github.com/<owner>/<repo>` URL into owner and repository
pub fn parse_github_repository(input: &str) -> Result<(String, String)> {
    let parsed = parse_http_url(input)?;
    if !is_github_host(&parsed) {
        return Err(AssessError::Validation(format!(
            "repository URL must point to github.com, got '{}'",
            parsed.host_str().unwrap_or_default()
        )));
    }

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [owner, repo, ..] => {
            let repo = repo.trim_end_matches(".git");
            if repo.is_empty() {
                return Err(AssessError::Validation(
                    "repository name is empty".to_string(),
                ));
            }
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(AssessError::Validation(format!(
            "repository URL must look like https://github.com/<owner>/<repo>, got '{input}'"
        ))),
    }
}

/// Normalize a URL to its origin (scheme + host + optional port).
///
/// Falls back to trimming trailing slashes if the input cannot be parsed.
pub fn normalize_origin(input: &str) -> String {
    match Url::parse(input) {
        Ok(parsed) => parsed
            .origin()
            .ascii_serialization()
            .trim_end_matches('/')
            .to_string(),
        Err(_) => input.trim_end_matches('/').to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_standard_url() {
        let url = "https://example.com/path/page?query=true";
        assert_eq!(normalize_origin(url), "https://example.com");
    }

    #[test]
    fn keeps_port_information() {
        assert_eq!(normalize_origin("https://example.com:8443/path"), "https://example.com:8443");
    }

    #[test]
    fn test_parse_github_repository() {
        let (owner, repo) = parse_github_repository("https://github.com/rust-lang/cargo").unwrap();
        assert_eq!((owner.as_str(), repo.as_str()), ("rust-lang", "cargo"));

        let (_, repo) = parse_github_repository("https://github.com/rust-lang/cargo.git").unwrap();
        assert_eq!(repo, "cargo");

        let (_, repo) =
            parse_github_repository("https://github.com/rust-lang/cargo/tree/master/src").unwrap();
        assert_eq!(repo, "cargo");

        assert!(parse_github_repository("https://github.com/rust-lang").is_err());
        assert!(parse_github_repository("https://gitlab.com/a/b").is_err());
    }

    #[test]
    fn test_new_validates_and_normalizes() {
        let input =
            AssessmentInput::new(InputType::Repository, " https://github.com/a/b.git/ ").unwrap();
        assert_eq!(input.url, "https://github.com/a/b");

        let err = AssessmentInput::new(InputType::Website, "ftp://example.com").unwrap_err();
        assert_eq!(err.http_status(), 400);

        assert!(AssessmentInput::new(InputType::Website, "").is_err());
        assert!(AssessmentInput::new(InputType::Website, "not a url").is_err());
    }

    #[test]
    fn test_infer_input_type() {
        let repo = AssessmentInput::infer("https://github.com/owner/project").unwrap();
        assert_eq!(repo.input_type, InputType::Repository);

        let site = AssessmentInput::infer("https://example.com/shop").unwrap();
        assert_eq!(site.input_type, InputType::Website);

        let profile = AssessmentInput::infer("https://github.com/owner").unwrap();
        assert_eq!(profile.input_type, InputType::Website);
    }

    #[test]
    fn test_input_type_from_str() {
        assert_eq!("Repository".parse::<InputType>().unwrap(), InputType::Repository);
        assert_eq!("website".parse::<InputType>().unwrap(), InputType::Website);
        assert!("pdf".parse::<InputType>().is_err());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let input = AssessmentInput::new(InputType::Website, "https://example.com")
            .unwrap()
            .with_option("depth", serde_json::json!(1));
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["type"], "website");
        assert_eq!(json["options"]["depth"], 1);
    }
}
