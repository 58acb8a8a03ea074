use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{error, info};

use crate::review::ReviewMode;

const API_VERSION: &str = "2022-11-28";

/// Destination for the formatted review comment. Seam for capturing the body
/// in tests instead of talking to GitHub.
#[async_trait]
pub trait CommentSink {
    async fn post_comment(&self, body: &str) -> Result<()>;
}

/// Posts comments through the GitHub REST API.
pub struct GitHubApi {
    client: reqwest::Client,
    token: String,
    /// Repository full name in `owner/repo` format.
    repo_name: String,
    pr_number: u64,
    mode: ReviewMode,
}

#[derive(Debug, Serialize)]
struct CreateCommentRequest {
    body: String,
}

impl GitHubApi {
    pub fn new(token: String, repo_name: String, pr_number: u64, mode: ReviewMode) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(concat!("emojigate/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            token,
            repo_name,
            pr_number,
            mode,
        }
    }

    /// The two historical variants posted to different endpoints: review
    /// comments on the pull itself versus plain issue comments.
    fn comment_url(&self) -> String {
        let resource = match self.mode {
            ReviewMode::FreeText => "pulls",
            ReviewMode::Structured => "issues",
        };
        format!(
            "https://api.github.com/repos/{}/{}/{}/comments",
            self.repo_name, resource, self.pr_number
        )
    }
}

#[async_trait]
impl CommentSink for GitHubApi {
    async fn post_comment(&self, body: &str) -> Result<()> {
        let url = self.comment_url();
        info!(
            "Posting review comment to PR #{} in {}",
            self.pr_number, self.repo_name
        );

        let request_body = CreateCommentRequest {
            body: body.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("X-GitHub-Api-Version", API_VERSION)
            .json(&request_body)
            .send()
            .await
            .context("Failed to send comment request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .context("Failed to read error response body")?;
            error!("GitHub API error: {} - {}", status, error_text);
            return Err(anyhow!("GitHub API error: {} - {}", status, error_text));
        }

        Ok(())
    }
}
