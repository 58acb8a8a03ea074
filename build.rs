//! Build script for emojigate - generates version information.
//!
//! Embeds `git describe` output (falling back to a timestamped
//! pseudo-version when no tags exist or git is unavailable) so that
//! `emojigate --version` identifies the exact build running in CI.

use std::{env, process::Command};

use chrono::Utc;

fn main() {
    ["src", "build.rs", "Cargo.toml", "Cargo.lock"]
        .iter()
        .for_each(|path| println!("cargo:rerun-if-changed={path}"));

    let build_info = generate_human_readable_version();
    println!("cargo:rustc-env=BUILD_INFO_HUMAN={build_info}");
}

/// Executes a git command and returns the trimmed stdout as a String.
fn git_command(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Returns a Git version string, or a pseudo-version when no tags exist.
fn get_git_version() -> String {
    git_command(&["describe", "--tags", "--always", "--dirty"])
        .filter(|desc| desc.contains('v') || desc.contains("-g"))
        .unwrap_or_else(generate_pseudo_version)
}

/// Generates a pseudo-version: v{version}-<timestamp>-<commit>.
fn generate_pseudo_version() -> String {
    let commit_hash =
        git_command(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let version = env!("CARGO_PKG_VERSION");

    format!("v{version}-{timestamp}-{commit_hash}")
}

/// Generates human-readable version info.
fn generate_human_readable_version() -> String {
    format!("{} ({})", env!("CARGO_PKG_VERSION"), get_git_version())
}
