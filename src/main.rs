use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;

use newswire::config::Config;
use newswire::feed::{Crawler, HttpFetcher};
use newswire::server::{self, AppState};
use newswire::service::IngestService;
use newswire::social::{HttpPoster, SocialService};
use newswire::storage::Store;
use newswire::worker;

#[derive(Parser, Debug)]
#[command(name = "newswire", about = "Aggregates syndication feeds and serves them")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, value_name = "FILE", default_value = "newswire.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP listing API
    Serve,
    /// Start the periodic crawl worker
    Crawl {
        /// Run a single crawl cycle and exit
        #[arg(long)]
        once: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    match cli.command {
        Command::Serve => serve(config).await,
        Command::Crawl { once } => crawl(config, once).await,
    }
}

async fn connect_store(config: &Config) -> Result<Store> {
    let store = Store::connect(&config.database_url)
        .await
        .context("connecting to postgres")?;
    store.migrate().await.context("migrating schema")?;
    Ok(store)
}

fn build_ingest(config: &Config, store: Store) -> IngestService {
    let fetcher = Arc::new(HttpFetcher::new(reqwest::Client::new()));
    let crawler = Crawler::new(fetcher, config.sources.clone());
    IngestService::new(Arc::new(store), crawler)
}

async fn serve(mut config: Config) -> Result<()> {
    config.validate()?;

    let store = connect_store(&config).await?;
    let ingest = Arc::new(build_ingest(&config, store));

    let social = config.social.take().map(|social_config| {
        let poster = HttpPoster::new(
            reqwest::Client::new(),
            social_config.endpoint,
            social_config.token,
        );
        Arc::new(SocialService::new(Arc::new(poster)))
    });

    let state = Arc::new(AppState { ingest, social });
    let app = server::router(state);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn crawl(config: Config, once: bool) -> Result<()> {
    config.validate_for_crawl()?;

    let store = connect_store(&config).await?;
    let service = Arc::new(build_ingest(&config, store));

    if once {
        let summary = service.run_crawl_cycle().await?;
        tracing::info!(feeds = summary.feeds, articles = summary.articles, "crawl cycle complete");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    worker::run(
        service,
        Duration::from_secs(config.crawl_interval_secs),
        shutdown_rx,
    )
    .await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
