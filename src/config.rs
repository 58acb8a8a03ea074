use std::collections::HashMap;

use anyhow::{Context, Result};

/// Environment variables that must be present before anything else runs.
const REQUIRED_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OWNER",
    "REPO_NAME",
    "PR_NUMBER",
    "GITHUB_TOKEN",
];

/// Process-scoped configuration, read once at startup.
///
/// `base_ref`/`head_ref` are optional here because the skip-list bypass is
/// checked before they are needed; [`Config::refs`] enforces their presence
/// at the point the diff is computed.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: String,
    /// Repository owner (provided separately by the workflow, alongside the
    /// full name).
    pub owner: String,
    /// Repository full name in `owner/repo` format.
    pub repo_name: String,
    pub pr_number: u64,
    pub github_token: String,
    pub base_ref: Option<String>,
    pub head_ref: Option<String>,
    pub pr_author: Option<String>,
    pub skipped_users: Vec<String>,
}

impl Config {
    /// Builds configuration from a snapshot of the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Builds configuration from an explicit variable map, failing if any
    /// required variable is missing or empty.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_VARS
            .iter()
            .filter(|name| vars.get(**name).is_none_or(|v| v.is_empty()))
            .copied()
            .collect();

        if !missing.is_empty() {
            anyhow::bail!(
                "Missing required environment variables: {}",
                missing.join(", ")
            );
        }

        let pr_number: u64 = vars["PR_NUMBER"]
            .parse()
            .with_context(|| format!("PR_NUMBER is not a number: '{}'", vars["PR_NUMBER"]))?;

        let skipped_users = vars
            .get("SKIPPED_USERS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|user| !user.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let optional = |name: &str| vars.get(name).filter(|v| !v.is_empty()).cloned();

        Ok(Config {
            openai_api_key: vars["OPENAI_API_KEY"].clone(),
            owner: vars["OWNER"].clone(),
            repo_name: vars["REPO_NAME"].clone(),
            pr_number,
            github_token: vars["GITHUB_TOKEN"].clone(),
            base_ref: optional("BASE_SHA"),
            head_ref: optional("HEAD_SHA"),
            pr_author: optional("PR_AUTHOR"),
            skipped_users,
        })
    }

    /// True when the PR author is on the skip-list, meaning review is
    /// bypassed entirely.
    pub fn author_is_skipped(&self) -> bool {
        self.pr_author
            .as_deref()
            .is_some_and(|author| self.skipped_users.iter().any(|user| user == author))
    }

    /// Returns the base and head revision identifiers, which become required
    /// once the run proceeds past the skip-list check.
    pub fn refs(&self) -> Result<(&str, &str)> {
        match (self.base_ref.as_deref(), self.head_ref.as_deref()) {
            (Some(base), Some(head)) => Ok((base, head)),
            _ => anyhow::bail!("BASE_SHA or HEAD_SHA is not set. Cannot proceed with the review."),
        }
    }
}
