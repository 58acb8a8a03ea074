//! Emojigate: a CI gate that reviews pull request diffs for cheerfulness.
//!
//! Provides a linear review pipeline: load configuration from the
//! environment, compute the PR diff via git, ask a language model whether the
//! changes are cheerful and sufficiently emoji-laden, post the verdict as a
//! PR comment, and report it through the process exit code.

pub mod config;
pub mod diff;
pub mod github;
pub mod openai;
pub mod review;
pub mod workflow;

pub use config::Config;
pub use diff::{DIFF_CHAR_LIMIT, DiffSource, GitCli, truncate_diff};
pub use github::{CommentSink, GitHubApi};
pub use openai::OpenAiClient;
pub use review::{LlmFailurePolicy, ReviewBackend, ReviewMode, Verdict};
pub use workflow::{Outcome, run_review};
