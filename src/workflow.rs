use anyhow::Result;
use tracing::{info, warn};

use crate::{
    config::Config,
    diff::{DiffSource, truncate_diff},
    github::CommentSink,
    review::{LlmFailurePolicy, ReviewBackend, ReviewMode, format_comment},
};

/// How a single run ended. Every variant maps to exactly one exit code.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The PR author is on the skip-list; review bypassed.
    SkippedAuthor,
    /// The diff was empty or whitespace-only; nothing to review.
    NoChanges,
    /// Structured-mode soft failure: the model call failed and the PR is
    /// waved through without a comment.
    ReviewUnavailable,
    /// A verdict was produced and posted.
    Reviewed { passed: bool },
}

impl Outcome {
    /// Exit code consumed by the calling automation system: 0 for
    /// pass/skip/no-changes, 1 for a failing verdict.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::SkippedAuthor | Outcome::NoChanges | Outcome::ReviewUnavailable => 0,
            Outcome::Reviewed { passed } => {
                if *passed {
                    0
                } else {
                    1
                }
            }
        }
    }
}

/// Runs the review pipeline end to end: skip check, diff, model call,
/// comment, verdict. Strictly sequential; the comment is posted before the
/// exit code is decided, from the same verdict value.
pub async fn run_review<D, R, C>(
    config: &Config,
    mode: ReviewMode,
    diff_source: &D,
    backend: &R,
    sink: &C,
) -> Result<Outcome>
where
    D: DiffSource + Sync,
    R: ReviewBackend + Sync,
    C: CommentSink + Sync,
{
    if config.author_is_skipped() {
        info!(
            "Skipping review for user: {}",
            config.pr_author.as_deref().unwrap_or_default()
        );
        return Ok(Outcome::SkippedAuthor);
    }

    let (base_ref, head_ref) = config.refs()?;

    let diff = diff_source.fetch(base_ref, head_ref)?;
    if diff.trim().is_empty() {
        info!("No changes detected in the PR.");
        return Ok(Outcome::NoChanges);
    }

    let diff = truncate_diff(&diff);

    let verdict = match backend.request_review(mode, diff).await {
        Ok(verdict) => verdict,
        Err(err) => match mode.llm_failure_policy() {
            LlmFailurePolicy::Fatal => {
                return Err(err.context("Error communicating with the review model"));
            }
            LlmFailurePolicy::PassThrough => {
                warn!("Review model unavailable, letting the PR through: {err:#}");
                return Ok(Outcome::ReviewUnavailable);
            }
        },
    };

    let body = format_comment(mode, &verdict);
    sink.post_comment(&body).await?;

    if verdict.passed {
        info!("PR passed the review!");
    } else {
        info!("PR failed the review. Please address the issues.");
    }

    Ok(Outcome::Reviewed {
        passed: verdict.passed,
    })
}
