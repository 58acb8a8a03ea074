use anyhow::Result;
use async_trait::async_trait;
use clap::ValueEnum;

/// Outcome of the review, immutable once constructed. The same value drives
/// both the posted comment and the process exit code, so the two can never
/// disagree.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub message: String,
    pub improvements: Option<String>,
}

/// How the model's answer is requested and parsed, selected once at startup.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum ReviewMode {
    /// Free text beginning with a literal `PASS: ` or `FAIL: ` marker.
    FreeText,
    /// Schema-constrained response with explicit passed/review/improvements
    /// fields.
    Structured,
}

/// What a failed model call means for the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LlmFailurePolicy {
    /// The run fails and the PR stays blocked.
    Fatal,
    /// The run succeeds without a verdict; the PR is waved through.
    PassThrough,
}

impl ReviewMode {
    /// The two historical variants of this tool disagreed on what a model
    /// failure means: the free-text one blocked the PR, the structured one
    /// waved it through. Kept per mode rather than unified.
    pub fn llm_failure_policy(&self) -> LlmFailurePolicy {
        match self {
            ReviewMode::FreeText => LlmFailurePolicy::Fatal,
            ReviewMode::Structured => LlmFailurePolicy::PassThrough,
        }
    }
}

pub const SYSTEM_PROMPT: &str = "You are a cheerful code reviewer who loves emoji-filled code.";

/// Builds the user prompt embedding the review policy and the (already
/// truncated) diff text.
pub fn build_prompt(diff: &str) -> String {
    format!(
        "You are a cheerful code reviewer who loves emoji-filled code. Review the following \
         code diff and determine if it's cheerful and contains sufficient emojis.\n\
         \n\
         Criteria:\n\
         - At least one emoji for every five added lines of code.\n\
         - Emojis must be contextually relevant to the code they annotate.\n\
         - Comments and messages should carry a cheerful tone.\n\
         - Ignore removed lines; only added lines count.\n\
         \n\
         Respond with:\n\
         - PASS: if the code meets the criteria.\n\
         - FAIL: if the code lacks cheerfulness or emojis.\n\
         \n\
         Provide a brief explanation.\n\
         \n\
         Code Diff:\n\
         {diff}\n"
    )
}

const PASS_MARKER: &str = "pass: ";
const FAIL_MARKER: &str = "fail: ";

/// Derives a verdict from a free-text response by its leading `PASS: ` or
/// `FAIL: ` marker (case-insensitive). The marker is stripped from the
/// displayed message; a response with neither marker is a failed verdict
/// carrying the raw text.
pub fn parse_prefixed_verdict(response: &str) -> Verdict {
    let prefix: String = response.chars().take(6).collect::<String>().to_lowercase();
    let passed = prefix == PASS_MARKER;
    let message = if passed || prefix == FAIL_MARKER {
        response[6..].to_string()
    } else {
        response.to_string()
    };

    Verdict {
        passed,
        message,
        improvements: None,
    }
}

/// Formats the markdown comment body for a verdict. The two modes kept their
/// historical formats: a plain result suffix line versus an emoji status
/// header with a dedicated improvements section.
pub fn format_comment(mode: ReviewMode, verdict: &Verdict) -> String {
    match mode {
        ReviewMode::FreeText => format!(
            "## Your ✨Review✨\n\n{}\n\n---\n\n### LLM Review Result: {}",
            verdict.message,
            if verdict.passed { "PASS" } else { "FAIL" }
        ),
        ReviewMode::Structured => {
            let header = if verdict.passed {
                "## ✅ Cheerfulness review passed"
            } else {
                "## ❌ Cheerfulness review failed"
            };
            let mut body = format!("{header}\n\n{}", verdict.message);
            if let Some(improvements) = &verdict.improvements {
                body.push_str(&format!("\n\n### 💡 Suggested improvements\n\n{improvements}"));
            }
            body
        }
    }
}

/// Language-model backend that turns a diff into a verdict. Seam for
/// substituting canned verdicts in tests.
#[async_trait]
pub trait ReviewBackend {
    async fn request_review(&self, mode: ReviewMode, diff: &str) -> Result<Verdict>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_prefix_yields_passed_verdict_with_stripped_message() {
        let verdict = parse_prefixed_verdict("PASS: nice job");
        assert!(verdict.passed);
        assert_eq!(verdict.message, "nice job");
    }

    #[test]
    fn fail_prefix_yields_failed_verdict_with_stripped_message() {
        let verdict = parse_prefixed_verdict("FAIL: add emojis");
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "add emojis");
    }

    #[test]
    fn marker_match_is_case_insensitive() {
        assert!(parse_prefixed_verdict("pass: ok").passed);
        assert!(parse_prefixed_verdict("Pass: ok").passed);
        assert!(!parse_prefixed_verdict("fAIL: no").passed);
    }

    #[test]
    fn unmarked_response_fails_and_keeps_the_raw_text() {
        let verdict = parse_prefixed_verdict("I can't review this.");
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "I can't review this.");
    }

    #[test]
    fn short_response_fails_without_panicking() {
        let verdict = parse_prefixed_verdict("ok");
        assert!(!verdict.passed);
        assert_eq!(verdict.message, "ok");
    }

    #[test]
    fn free_text_comment_carries_result_suffix() {
        let verdict = Verdict {
            passed: true,
            message: "nice job".to_string(),
            improvements: None,
        };
        let body = format_comment(ReviewMode::FreeText, &verdict);
        assert!(body.starts_with("## Your ✨Review✨"));
        assert!(body.contains("nice job"));
        assert!(body.ends_with("### LLM Review Result: PASS"));
    }

    #[test]
    fn free_text_comment_reports_fail() {
        let verdict = Verdict {
            passed: false,
            message: "add emojis".to_string(),
            improvements: None,
        };
        let body = format_comment(ReviewMode::FreeText, &verdict);
        assert!(body.ends_with("### LLM Review Result: FAIL"));
    }

    #[test]
    fn structured_comment_without_improvements_omits_the_section() {
        let verdict = Verdict {
            passed: true,
            message: "Great job!".to_string(),
            improvements: None,
        };
        let body = format_comment(ReviewMode::Structured, &verdict);
        assert!(body.starts_with("## ✅"));
        assert!(body.contains("Great job!"));
        assert!(!body.contains("Suggested improvements"));
    }

    #[test]
    fn structured_comment_with_improvements_includes_the_section() {
        let verdict = Verdict {
            passed: false,
            message: "Needs more sparkle.".to_string(),
            improvements: Some("add 🎉".to_string()),
        };
        let body = format_comment(ReviewMode::Structured, &verdict);
        assert!(body.starts_with("## ❌"));
        assert!(body.contains("### 💡 Suggested improvements"));
        assert!(body.contains("add 🎉"));
    }

    #[test]
    fn failure_policy_differs_by_mode() {
        assert_eq!(
            ReviewMode::FreeText.llm_failure_policy(),
            LlmFailurePolicy::Fatal
        );
        assert_eq!(
            ReviewMode::Structured.llm_failure_policy(),
            LlmFailurePolicy::PassThrough
        );
    }

    #[test]
    fn prompt_embeds_the_diff_and_the_markers() {
        let prompt = build_prompt("+let x = 1; // 🎈");
        assert!(prompt.contains("+let x = 1; // 🎈"));
        assert!(prompt.contains("PASS:"));
        assert!(prompt.contains("FAIL:"));
    }
}
