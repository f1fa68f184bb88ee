//! robots.txt parsing with a focus on AI crawler access

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// User agents of AI crawlers and assistants
pub const AI_CRAWLERS: &[&str] = &[
    "GPTBot",          // OpenAI training crawler
    "ChatGPT-User",    // ChatGPT browsing
    "OAI-SearchBot",   // ChatGPT search
    "ClaudeBot",       // Anthropic crawler
    "Claude-Web",      // Claude browsing
    "anthropic-ai",    // Anthropic general
    "Google-Extended", // Gemini training opt-out token
    "PerplexityBot",   // Perplexity
    "CCBot",           // Common Crawl
    "Applebot-Extended",
];

/// Rules of one user-agent group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRules {
    pub disallow: Vec<String>,
    pub allow: Vec<String>,
    pub crawl_delay: Option<u32>,
}

impl AgentRules {
    /// `Disallow: /` without an allow exception
    pub fn blocks_all(&self) -> bool {
        self.disallow.iter().any(|p| p == "/") && self.allow.is_empty()
    }

    fn access(&self) -> AccessLevel {
        if self.blocks_all() {
            AccessLevel::Blocked
        } else if self.disallow.is_empty() {
            AccessLevel::Allowed
        } else {
            AccessLevel::Partial
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Allowed,
    /// Some paths disallowed
    Partial,
    Blocked,
    /// No group applies
    Default,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RobotsTxt {
    /// Keyed by lowercase user agent
    pub groups: HashMap<String, AgentRules>,
    pub sitemaps: Vec<String>,
}

impl RobotsTxt {
    /// Rules that apply to `agent`: its own group, else the `*` group
    pub fn rules_for(&self, agent: &str) -> Option<&AgentRules> {
        self.groups
            .get(&agent.to_ascii_lowercase())
            .or_else(|| self.groups.get("*"))
    }

    pub fn access_for(&self, agent: &str) -> AccessLevel {
        self.rules_for(agent)
            .map_or(AccessLevel::Default, AgentRules::access)
    }

    /// Known AI crawlers that may not fetch anything
    pub fn blocked_ai_crawlers(&self) -> Vec<String> {
        AI_CRAWLERS
            .iter()
            .filter(|agent| self.access_for(agent) == AccessLevel::Blocked)
            .map(|agent| agent.to_string())
            .collect()
    }

    /// Longest matching rule wins; allow wins ties
    pub fn is_path_allowed(&self, agent: &str, path: &str) -> bool {
        let Some(rules) = self.rules_for(agent) else {
            return true;
        };
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path.starts_with(p.as_str()))
                .map(String::len)
                .max()
        };
        match (longest(&rules.allow), longest(&rules.disallow)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }
}

/// Parse robots.txt content. Consecutive `User-agent` lines share one group.
pub fn parse_robots_txt(content: &str) -> RobotsTxt {
    let mut robots = RobotsTxt::default();
    let mut current_agents: Vec<String> = Vec::new();
    let mut current = AgentRules::default();
    let mut in_rules = false;

    for raw in content.lines() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        let Some((directive, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();

        match directive.trim().to_ascii_lowercase().as_str() {
            "user-agent" => {
                if in_rules {
                    flush_group(&mut robots, &mut current_agents, &mut current);
                    in_rules = false;
                }
                current_agents.push(value.to_ascii_lowercase());
            }
            "disallow" => {
                in_rules = true;
                if !value.is_empty() {
                    current.disallow.push(value.to_string());
                }
            }
            "allow" => {
                in_rules = true;
                if !value.is_empty() {
                    current.allow.push(value.to_string());
                }
            }
            "crawl-delay" => {
                in_rules = true;
                current.crawl_delay = value.parse::<f64>().ok().map(|d| d.ceil() as u32);
            }
            "sitemap" if !value.is_empty() => robots.sitemaps.push(value.to_string()),
            _ => {}
        }
    }
    flush_group(&mut robots, &mut current_agents, &mut current);

    robots
}

fn flush_group(robots: &mut RobotsTxt, agents: &mut Vec<String>, rules: &mut AgentRules) {
    let rules = std::mem::take(rules);
    for agent in agents.drain(..) {
        let entry = robots.groups.entry(agent).or_default();
        entry.disallow.extend(rules.disallow.iter().cloned());
        entry.allow.extend(rules.allow.iter().cloned());
        if rules.crawl_delay.is_some() {
            entry.crawl_delay = rules.crawl_delay;
        }
    }
}
