use std::process::Command;

use anyhow::{Context, Result};
use tracing::warn;

/// Hard cap on the diff text sent for review, in characters. Longer diffs are
/// flatly truncated; a known precision/cost trade-off.
pub const DIFF_CHAR_LIMIT: usize = 4000;

/// Source of the textual diff between two revisions. Seam for substituting a
/// canned diff in tests.
pub trait DiffSource {
    fn fetch(&self, base_ref: &str, head_ref: &str) -> Result<String>;
}

/// Computes diffs by shelling out to the `git` CLI.
pub struct GitCli;

impl GitCli {
    fn git_diff(args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("diff")
            .args(args)
            .output()
            .context("Failed to run git diff")?;

        if !output.status.success() {
            anyhow::bail!(
                "git diff exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        String::from_utf8(output.stdout).context("git diff produced non-UTF-8 output")
    }
}

impl DiffSource for GitCli {
    fn fetch(&self, base_ref: &str, head_ref: &str) -> Result<String> {
        // Best effort: make sure the default branch exists locally. Shallow
        // Actions checkouts often lack it, and the diff fallback below covers
        // the case where this fails.
        if let Err(err) = Command::new("git")
            .args(["fetch", "origin", "main"])
            .output()
        {
            warn!("git fetch origin main failed: {err}");
        }

        match Self::git_diff(&[base_ref, head_ref]) {
            Ok(diff) => Ok(diff),
            Err(err) => {
                // Degraded fallback for environments where the revision refs
                // aren't resolvable.
                warn!("git diff {base_ref} {head_ref} failed ({err}), retrying without refs");
                Self::git_diff(&[]).context("Fallback git diff failed")
            }
        }
    }
}

/// Caps the diff to [`DIFF_CHAR_LIMIT`] characters by hard truncation, with
/// no awareness of hunk or line boundaries.
pub fn truncate_diff(diff: &str) -> &str {
    match diff.char_indices().nth(DIFF_CHAR_LIMIT) {
        Some((byte_offset, _)) => &diff[..byte_offset],
        None => diff,
    }
}
