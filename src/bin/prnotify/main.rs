use prnotify::{
    Config, GhCli, Poller, SlackNotifier, ensure_state_dir, parse_args, state_dir_from_env,
};
use tracing::info;

fn handle_clap_help_version(clap_err: &clap::Error) -> ! {
    use clap::error::ErrorKind;
    match clap_err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            print!("{clap_err}");
            std::process::exit(0);
        }
        _ => {
            eprint!("{clap_err}");
            std::process::exit(2);
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let interval = match parse_args(std::env::args_os()) {
        Ok(interval) => interval,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                handle_clap_help_version(clap_err);
            } else {
                return Err(err);
            }
        }
    };

    ensure_state_dir(&state_dir_from_env())?;
    let config = Config::from_env()?;

    info!(
        repos = config.repos.len(),
        channel = %config.slack_channel,
        "watching for new pull requests"
    );

    let notifier = SlackNotifier::new(
        config.slack_api_url,
        config.slack_channel,
        config.slack_token,
    );
    let mut poller = Poller::new(
        GhCli::new(config.gh_path),
        notifier,
        config.repos,
        config.exclude_label,
        interval,
    );

    poller.run().await
}
