//! prnotify: announces newly created GitHub pull requests in Slack.
//!
//! Polls a fixed list of repositories on an interval, lists the pull
//! requests created since the previous poll through the GitHub CLI, and
//! posts one Slack message per pull request. Every cycle runs strictly in
//! sequence and any failure is fatal.

pub mod cli;
pub mod config;
pub mod github;
pub mod poll;
pub mod slack;
pub mod types;

pub use cli::parse_args;
pub use config::{Config, ensure_state_dir, state_dir_from_env};
pub use github::{GhCli, search_filter};
pub use poll::Poller;
pub use slack::{SlackNotifier, format_message};
pub use types::{
    CycleReport, Notifier, PullRequestNotice, PullRequestSource, Repo, RepoError, TimeWindow,
};
