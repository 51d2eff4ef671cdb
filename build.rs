//! Build script stamping the version and git SHA into the crate.
//!
//! Environment variables (set by CI or fall back to defaults):
//! - DASHBOARD_VERSION: Version string (defaults to CARGO_PKG_VERSION)
//! - DASHBOARD_GIT_SHA: Git commit SHA (defaults to GITHUB_SHA, then git rev-parse)

use std::process::Command;

fn main() {
    let version = std::env::var("DASHBOARD_VERSION").unwrap_or_else(|_| {
        std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "unknown".into())
    });
    println!("cargo:rustc-env=DASHBOARD_VERSION={}", version);

    let git_sha = std::env::var("DASHBOARD_GIT_SHA")
        .or_else(|_| {
            std::env::var("GITHUB_SHA").map(|s| s.get(..7).unwrap_or(&s).to_string())
        })
        .unwrap_or_else(|_| git_rev_parse());
    println!("cargo:rustc-env=DASHBOARD_GIT_SHA={}", git_sha);

    println!("cargo:rerun-if-env-changed=DASHBOARD_VERSION");
    println!("cargo:rerun-if-env-changed=DASHBOARD_GIT_SHA");
    println!("cargo:rerun-if-env-changed=GITHUB_SHA");
}

fn git_rev_parse() -> String {
    Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".into())
}
