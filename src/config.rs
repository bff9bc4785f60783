//! Startup configuration read from the environment.
//!
//! `SLACK_CHANNEL` and `SLACK_TOKEN` are required. Everything else has a
//! default matching the repositories this tool was first deployed against.
//! The state directory is resolved separately so it can be created before
//! the required variables are checked.

use std::path::PathBuf;

use anyhow::{Context, Result};
use url::Url;

use crate::{slack::DEFAULT_SLACK_API_URL, types::Repo};

pub const DEFAULT_OWNER: &str = "ChargePoint";
pub const DEFAULT_EXCLUDE_LABEL: &str = "dependencies";
pub const DEFAULT_STATE_DIR: &str = ".seen";
pub const DEFAULT_GH_PATH: &str = "gh";

/// Repositories watched when `PRNOTIFY_REPOS` is not set, in polling order.
pub const DEFAULT_REPOS: &[&str] = &[
    "fleet-platform",
    "fleet-alerts",
    "fleet-charging",
    "fleet-optimizer",
    "fleet-meter",
    "es-config",
    "energy-cost",
    "energy-management",
    "telematics",
    "cppyutils",
    "es-infrastructure",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub slack_channel: String,
    pub slack_token: String,
    pub slack_api_url: Url,
    pub repos: Vec<Repo>,
    pub exclude_label: String,
    pub gh_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).with_context(|| format!("Missing required environment variable {key}"))
        };

        let slack_channel = require("SLACK_CHANNEL")?;
        let slack_token = require("SLACK_TOKEN")?;

        let slack_api_url = get("SLACK_API_URL").unwrap_or_else(|| DEFAULT_SLACK_API_URL.into());
        let slack_api_url = Url::parse(&slack_api_url)
            .with_context(|| format!("Invalid SLACK_API_URL: '{slack_api_url}'"))?;

        let owner = get("PRNOTIFY_OWNER").unwrap_or_else(|| DEFAULT_OWNER.into());
        let repos = match get("PRNOTIFY_REPOS") {
            Some(list) => parse_repo_list(&owner, &list)?,
            None => parse_repo_list(&owner, &DEFAULT_REPOS.join(","))?,
        };

        Ok(Self {
            slack_channel,
            slack_token,
            slack_api_url,
            repos,
            exclude_label: get("PRNOTIFY_EXCLUDE_LABEL")
                .unwrap_or_else(|| DEFAULT_EXCLUDE_LABEL.into()),
            gh_path: get("GH_PATH").unwrap_or_else(|| DEFAULT_GH_PATH.into()).into(),
        })
    }
}

/// Parses a comma-separated list of repository names under `owner`.
/// Entries may also be given as full `owner/name`.
fn parse_repo_list(owner: &str, list: &str) -> Result<Vec<Repo>> {
    let repos = list
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let repo = if entry.contains('/') {
                Repo::parse(entry)
            } else {
                Repo::new(owner, entry)
            };
            repo.with_context(|| format!("Invalid repository '{entry}' in PRNOTIFY_REPOS"))
        })
        .collect::<Result<Vec<_>>>()?;

    if repos.is_empty() {
        anyhow::bail!("No repositories configured");
    }

    Ok(repos)
}

pub fn state_dir_from_env() -> PathBuf {
    state_dir_from_lookup(|key| std::env::var(key).ok())
}

/// Resolves `PRNOTIFY_STATE_DIR`, falling back to `.seen`.
pub fn state_dir_from_lookup<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    lookup("PRNOTIFY_STATE_DIR")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_STATE_DIR.into())
        .into()
}

/// Creates the state directory if it does not exist yet.
pub fn ensure_state_dir(dir: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create state directory '{}'", dir.display()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![("SLACK_CHANNEL", "C0123"), ("SLACK_TOKEN", "xoxb-test")]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&required())).unwrap();

        assert_eq!(config.slack_channel, "C0123");
        assert_eq!(config.slack_token, "xoxb-test");
        assert_eq!(config.slack_api_url.as_str(), DEFAULT_SLACK_API_URL);
        assert_eq!(config.exclude_label, "dependencies");
        assert_eq!(config.gh_path, PathBuf::from("gh"));
        assert_eq!(config.repos.len(), DEFAULT_REPOS.len());
        assert_eq!(config.repos[0].to_string(), "ChargePoint/fleet-platform");
        assert_eq!(
            config.repos.last().unwrap().to_string(),
            "ChargePoint/es-infrastructure"
        );
    }

    #[test]
    fn test_missing_channel_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SLACK_TOKEN", "xoxb-test")])).unwrap_err();
        assert!(err.to_string().contains("SLACK_CHANNEL"));
    }

    #[test]
    fn test_empty_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SLACK_CHANNEL", "C0123"), ("SLACK_TOKEN", "  ")]))
            .unwrap_err();
        assert!(err.to_string().contains("SLACK_TOKEN"));
    }

    #[test]
    fn test_overrides() {
        let mut vars = required();
        vars.extend([
            ("PRNOTIFY_OWNER", "acme"),
            ("PRNOTIFY_REPOS", "web-app, tools/cli-utils ,"),
            ("PRNOTIFY_EXCLUDE_LABEL", "skip-notify"),
            ("SLACK_API_URL", "http://localhost:9999/api/chat.postMessage"),
            ("GH_PATH", "/usr/local/bin/gh"),
        ]);
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        let repos: Vec<String> = config.repos.iter().map(Repo::to_string).collect();
        assert_eq!(repos, vec!["acme/web-app", "tools/cli-utils"]);
        assert_eq!(config.exclude_label, "skip-notify");
        assert_eq!(config.gh_path, PathBuf::from("/usr/local/bin/gh"));
        assert_eq!(config.slack_api_url.port(), Some(9999));
    }

    #[test]
    fn test_invalid_repo_entry() {
        let mut vars = required();
        vars.push(("PRNOTIFY_REPOS", "a/b/c"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("a/b/c"));
    }

    #[test]
    fn test_blank_repo_list_falls_back_to_defaults() {
        let mut vars = required();
        vars.push(("PRNOTIFY_REPOS", " "));
        let config = Config::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.repos.len(), DEFAULT_REPOS.len());
    }

    #[test]
    fn test_only_separators_is_an_error() {
        let mut vars = required();
        vars.push(("PRNOTIFY_REPOS", ",,"));
        let err = Config::from_lookup(lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("No repositories"));
    }

    #[test]
    fn test_invalid_slack_url() {
        let mut vars = required();
        vars.push(("SLACK_API_URL", "not a url"));
        assert!(Config::from_lookup(lookup(&vars)).is_err());
    }

    #[test]
    fn test_state_dir_resolves_without_slack_settings() {
        assert_eq!(state_dir_from_lookup(lookup(&[])), PathBuf::from(".seen"));
        assert_eq!(
            state_dir_from_lookup(lookup(&[("PRNOTIFY_STATE_DIR", "/tmp/prnotify")])),
            PathBuf::from("/tmp/prnotify")
        );
        assert_eq!(
            state_dir_from_lookup(lookup(&[("PRNOTIFY_STATE_DIR", " ")])),
            PathBuf::from(".seen")
        );
    }

    #[test]
    fn test_ensure_state_dir_creates_and_tolerates_existing() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".seen");

        ensure_state_dir(&dir).unwrap();
        assert!(dir.is_dir());
        ensure_state_dir(&dir).unwrap();
    }
}
