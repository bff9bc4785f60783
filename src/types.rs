use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

/// Reasons a repository identifier can be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoError {
    EmptyOwner,
    EmptyName,
    InvalidFormat(String),
}

impl std::fmt::Display for RepoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoError::EmptyOwner => write!(f, "repository owner must not be empty"),
            RepoError::EmptyName => write!(f, "repository name must not be empty"),
            RepoError::InvalidFormat(s) => {
                write!(f, "repository must be in format 'owner/repo', got: '{s}'")
            }
        }
    }
}

impl std::error::Error for RepoError {}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into().trim().to_string();
        let name = name.into().trim().to_string();

        if owner.is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.is_empty() {
            return Err(RepoError::EmptyName);
        }
        if owner.contains('/') || name.contains('/') {
            return Err(RepoError::InvalidFormat(format!("{owner}/{name}")));
        }

        Ok(Self { owner, name })
    }

    /// Parses an `owner/name` string.
    pub fn parse(s: &str) -> Result<Self, RepoError> {
        match s.split_once('/') {
            Some((owner, name)) if !name.contains('/') => Self::new(owner, name),
            _ => Err(RepoError::InvalidFormat(s.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Display for Repo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A newly created pull request, reduced to what a notification needs.
///
/// `repo` holds the repository name without its owner, which is how the
/// notification text refers to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestNotice {
    pub repo: String,
    pub author: String,
    pub title: String,
    pub url: String,
}

/// Half-open creation-time interval `[start, end)` in UTC.
///
/// Both bounds are truncated to whole seconds so that the rendered end of
/// one window and the rendered start of the next are the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: start.trunc_subsecs(0),
            end: end.trunc_subsecs(0),
        }
    }

    /// Computes the window for a cycle starting at `now`.
    ///
    /// With no previous window the start reaches back one `interval`;
    /// otherwise it continues from where the previous window ended. Fails
    /// when reaching back would leave chrono's representable range.
    pub fn following(
        previous_end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        interval: TimeDelta,
    ) -> anyhow::Result<Self> {
        let start = match previous_end {
            Some(end) => end,
            None => now.checked_sub_signed(interval).with_context(|| {
                format!(
                    "Polling interval of {}s reaches back before the earliest representable time",
                    interval.num_seconds()
                )
            })?,
        };
        Ok(Self::new(start, now))
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

/// Renders a timestamp as ISO-8601 with second precision, e.g.
/// `2024-01-15T10:00:00Z`.
pub fn iso_seconds(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Source of newly created pull requests.
#[async_trait]
pub trait PullRequestSource {
    /// Lists pull requests in `repo` created within `window` that do not
    /// carry `exclude_label`, in the order the service returns them.
    async fn list_pull_requests(
        &self,
        repo: &Repo,
        window: &TimeWindow,
        exclude_label: &str,
    ) -> anyhow::Result<Vec<PullRequestNotice>>;
}

/// Sink that announces pull requests to a fixed destination.
#[async_trait]
pub trait Notifier {
    async fn notify(&self, notice: &PullRequestNotice) -> anyhow::Result<()>;
}

/// What a single polling cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub repos_scanned: usize,
    pub notifications_sent: usize,
}
