use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_humanize::{Accuracy, HumanTime, Tense};
use tracing::info;

use crate::types::{CycleReport, Notifier, PullRequestSource, Repo, TimeWindow, iso_seconds};

/// Drives polling cycles: lists new pull requests per repository and
/// notifies each one.
///
/// The end of the last processed window is held here, so consecutive
/// cycles cover contiguous windows. It is not persisted; a fresh poller
/// starts one interval back from its first cycle.
pub struct Poller<S, N> {
    source: S,
    notifier: N,
    repos: Vec<Repo>,
    exclude_label: String,
    interval: Duration,
    last_window_end: Option<DateTime<Utc>>,
}

impl<S, N> Poller<S, N>
where
    S: PullRequestSource + Sync,
    N: Notifier + Sync,
{
    pub fn new(
        source: S,
        notifier: N,
        repos: Vec<Repo>,
        exclude_label: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            notifier,
            repos,
            exclude_label: exclude_label.into(),
            interval,
            last_window_end: None,
        }
    }

    pub fn last_window_end(&self) -> Option<DateTime<Utc>> {
        self.last_window_end
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn interval_delta(&self) -> Result<TimeDelta> {
        TimeDelta::from_std(self.interval).context("Polling interval is too large")
    }

    /// Runs one cycle for a cycle start of `now`.
    ///
    /// The window end is recorded before any repository is queried, so the
    /// next cycle continues from `now` even though this one may fail part
    /// way through. Any listing or delivery error aborts the cycle;
    /// repositories after the failing one are not processed.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let window = TimeWindow::following(self.last_window_end, now, self.interval_delta()?)?;
        self.last_window_end = Some(window.end());

        info!("All datetimes are in UTC");
        info!("Cycle started at {}", iso_seconds(now));
        info!(
            "Searching for PRs created between {} and {}",
            iso_seconds(window.start()),
            iso_seconds(window.end())
        );

        let mut report = CycleReport {
            started_at: now,
            window,
            repos_scanned: 0,
            notifications_sent: 0,
        };

        for repo in &self.repos {
            info!("Processing repo {}", repo);
            let notices = self
                .source
                .list_pull_requests(repo, &window, &self.exclude_label)
                .await
                .with_context(|| format!("Failed to list pull requests for {repo}"))?;
            report.repos_scanned += 1;

            if notices.is_empty() {
                info!("No PRs found");
                continue;
            }

            for notice in &notices {
                info!("Sending Slack notification for PR {}", notice.url);
                self.notifier.notify(notice).await?;
                report.notifications_sent += 1;
            }
        }

        Ok(report)
    }

    /// Polls forever, sleeping for the interval between cycles.
    ///
    /// Only returns when a cycle fails.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            self.run_cycle(Utc::now()).await?;
            info!("Sleeping for {}", describe_interval(self.interval));
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// Renders an interval as English text, e.g. "5 minutes".
pub fn describe_interval(interval: Duration) -> String {
    match TimeDelta::from_std(interval) {
        Ok(delta) => HumanTime::from(delta).to_text_en(Accuracy::Precise, Tense::Present),
        Err(_) => format!("{} seconds", interval.as_secs()),
    }
}
