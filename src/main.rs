use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use devscout::cli::{Cli, Command};
use devscout::config::DevscoutConfig;
use devscout::files;
use devscout::github::{GithubClient, SearchOptions, UserRecord, search_developers};
use devscout::ui::{self, SearchProgress};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        ui::print_error(&err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DevscoutConfig::load()?;
    let credentials = cli.credentials(&config.token);
    debug!(%credentials, "resolved credential scheme");
    let client = Arc::new(GithubClient::with_base_url(
        credentials,
        config.api_root.clone(),
    ));

    client.verify_credentials().await?;

    match cli.command {
        Command::Run { input, output } => {
            run_search(client, &config, &input, output.as_deref()).await
        }
        Command::Limits => show_limits(client).await,
    }
}

async fn run_search(
    client: Arc<GithubClient>,
    config: &DevscoutConfig,
    input: &Path,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let keys = files::read_search_keys(input)?;
    let total = keys.len();
    let progress = SearchProgress::start(total);

    // Ctrl-C stops dequeuing; in-flight requests finish and partial results
    // are still written.
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight requests");
            interrupt.cancel();
        }
    });

    let options = SearchOptions {
        backoff_floor: Duration::from_millis(config.backoff_floor_ms),
        cancel,
    };
    let results = search_developers(client, keys, options).await;
    progress.finish(results.len(), total);

    let mut resolved: Vec<(u64, UserRecord)> = results.into_iter().collect();
    resolved.sort_by_key(|(id, _)| *id);
    let records: Vec<UserRecord> = resolved.into_iter().map(|(_, record)| record).collect();

    match output {
        Some(path) => {
            files::write_records(&records, path)?;
            println!("Wrote {} records to {}", records.len(), path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&records)?),
    }
    Ok(())
}

async fn show_limits(client: Arc<GithubClient>) -> anyhow::Result<()> {
    let snapshot = client.rate_limits().await?;
    ui::print_limits(&snapshot);
    Ok(())
}
