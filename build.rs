//! Build script for prnotify: embeds a human-readable version string.
//!
//! The string is `<CARGO_PKG_VERSION> (<git version>) <rustc --version>`.
//! The git version is `git describe --tags --always --dirty` when a tag is
//! reachable, otherwise a pseudo-version of the form
//! `v<CARGO_PKG_VERSION>-<YYYYmmddHHMMSS>-<12-char commit>[+dirty]`. Clean
//! trees use the commit timestamp so the same commit always yields the same
//! version; dirty trees and trees without git use the build time.

use std::{env, process::Command};

use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

fn main() {
    for path in ["src", "build.rs", "Cargo.toml", "Cargo.lock"] {
        println!("cargo:rerun-if-changed={path}");
    }

    println!("cargo:rustc-env=BUILD_INFO_HUMAN={}", version_line());
}

fn run(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn git(args: &[&str]) -> Option<String> {
    run("git", args)
}

// `cargo install --git` drops .cargo-ok into the checkout; it is not a
// source change.
fn tree_is_dirty() -> Option<bool> {
    git(&["status", "--porcelain"]).map(|status| {
        status
            .lines()
            .filter_map(|line| line.get(3..))
            .any(|path| path != ".cargo-ok")
    })
}

fn commit_time() -> Option<DateTime<Utc>> {
    git(&["log", "-1", "--format=%ct"])
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}

fn pseudo_version() -> String {
    let commit = git(&["rev-parse", "--short=12", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let dirty = tree_is_dirty();

    let stamp = match dirty {
        Some(false) => commit_time().unwrap_or_else(Utc::now),
        _ => Utc::now(),
    }
    .format(TIMESTAMP_FORMAT);

    let suffix = if dirty == Some(true) { "+dirty" } else { "" };

    format!(
        "v{}-{stamp}-{commit}{suffix}",
        env::var("CARGO_PKG_VERSION").unwrap_or_default()
    )
}

fn git_version() -> String {
    match git(&["describe", "--tags", "--always", "--dirty"]) {
        // A bare hash means no tag is reachable.
        Some(desc) if desc.contains('v') || desc.contains("-g") => desc,
        _ => pseudo_version(),
    }
}

fn version_line() -> String {
    [
        env::var("CARGO_PKG_VERSION").ok(),
        Some(format!("({})", git_version())),
        run("rustc", &["--version"]),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ")
}
