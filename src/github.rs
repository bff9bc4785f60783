use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::TimeDelta;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::types::{PullRequestNotice, PullRequestSource, Repo, TimeWindow, iso_seconds};

/// Fields requested from `gh pr list --json`.
const JSON_FIELDS: &str = "author,title,url";

#[derive(Debug, Deserialize)]
struct GhPullRequest {
    author: GhAuthor,
    title: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    login: String,
}

#[derive(Debug, Default)]
pub struct SearchQueryBuilder {
    terms: Vec<String>,
}

impl SearchQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to pull requests created in `window`.
    ///
    /// GitHub's `a..b` range includes both ends, so the upper bound is the
    /// last whole second before the window's end. An empty window renders
    /// an inverted range, which matches nothing.
    pub fn created_in(&mut self, window: &TimeWindow) -> &mut Self {
        let last = window.end() - TimeDelta::seconds(1);
        self.terms.push(format!(
            "created:{}..{}",
            iso_seconds(window.start()),
            iso_seconds(last)
        ));
        self
    }

    pub fn no_label(&mut self, label: &str) -> &mut Self {
        self.terms.push(format!("-label:{}", label));
        self
    }

    pub fn build(&self) -> String {
        self.terms.join(" ")
    }
}

/// Builds the GitHub search filter for pull requests created in `window`
/// without `exclude_label`.
pub fn search_filter(window: &TimeWindow, exclude_label: &str) -> String {
    let mut query = SearchQueryBuilder::new();
    query.created_in(window);
    if !exclude_label.is_empty() {
        query.no_label(exclude_label);
    }
    query.build()
}

/// Lists pull requests by shelling out to the GitHub CLI.
///
/// Authentication is whatever `gh` is already logged in with.
#[derive(Debug, Clone)]
pub struct GhCli {
    program: PathBuf,
}

impl GhCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to `gh` for one repository and window.
    pub fn list_args(repo: &Repo, window: &TimeWindow, exclude_label: &str) -> Vec<String> {
        vec![
            "pr".to_string(),
            "--repo".to_string(),
            repo.to_string(),
            "list".to_string(),
            "--search".to_string(),
            search_filter(window, exclude_label),
            "--json".to_string(),
            JSON_FIELDS.to_string(),
        ]
    }
}

/// Decodes `gh pr list --json author,title,url` output into notices for
/// `repo`, preserving order.
pub fn parse_pr_list(repo: &Repo, stdout: &[u8]) -> Result<Vec<PullRequestNotice>> {
    let prs: Vec<GhPullRequest> = serde_json::from_slice(stdout)
        .with_context(|| format!("Failed to parse gh output for {repo}"))?;

    Ok(prs
        .into_iter()
        .map(|pr| PullRequestNotice {
            repo: repo.name().to_string(),
            author: pr.author.login,
            title: pr.title,
            url: pr.url,
        })
        .collect())
}

#[async_trait]
impl PullRequestSource for GhCli {
    async fn list_pull_requests(
        &self,
        repo: &Repo,
        window: &TimeWindow,
        exclude_label: &str,
    ) -> Result<Vec<PullRequestNotice>> {
        let args = Self::list_args(repo, window, exclude_label);
        debug!(program = %self.program.display(), ?args, "running gh");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .with_context(|| format!("Failed to run '{}'", self.program.display()))?;

        if !output.status.success() {
            anyhow::bail!(
                "gh pr list for {} failed ({}): {}",
                repo,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        parse_pr_list(repo, &output.stdout)
    }
}
