use std::time::Duration;

use anyhow::Result;
use clap::Parser;

const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

#[derive(Parser, Debug)]
#[command(
    name = "prnotify",
    about = "Poll GitHub repositories for newly created pull requests and announce each one in Slack",
    after_help = "Requires SLACK_CHANNEL and SLACK_TOKEN in the environment. \
                  Optional: PRNOTIFY_OWNER, PRNOTIFY_REPOS, PRNOTIFY_EXCLUDE_LABEL, \
                  PRNOTIFY_STATE_DIR, SLACK_API_URL, GH_PATH."
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// Seconds to sleep between polling cycles; also how far back the first
    /// cycle looks
    #[arg(value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,
}

/// Parses command-line arguments into the polling interval.
pub fn parse_args<I, T>(args: I) -> Result<Duration>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = CliArgs::try_parse_from(args)?;
    Ok(Duration::from_secs(cli.interval))
}
