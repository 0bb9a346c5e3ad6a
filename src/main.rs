//! Binary entrypoint for the Carzona showcase site.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::signal;
use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use carzona::catalog;
use carzona::config::Configuration;
use carzona::events::{AccentChanged, SelectCar, ShowcaseState};
use carzona::suggest::{HttpSuggestionProvider, SuggestionPipeline};
use carzona::tasks::showcase;
use carzona::web::{self, AppState};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "carzona", about = "Marketing showcase site for the Carzona car brand")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("carzona={}", level).parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = Configuration::from_yaml_file(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?
        .validated()
        .context("validating configuration")?;

    let (catalog, images) = catalog::load_catalog_file(&cfg.catalog_path)
        .with_context(|| format!("loading catalog from {}", cfg.catalog_path.display()))?;
    info!(cars = catalog.len(), images = images.len(), "catalog loaded");
    info!(
        swap = %humantime::format_duration(cfg.showcase.swap_delay),
        settle = %humantime::format_duration(cfg.showcase.settle_delay),
        "showcase timing"
    );

    let catalog = Arc::new(catalog);
    let images = Arc::new(images);
    let cancel = CancellationToken::new();

    let (select_tx, select_rx) = mpsc::channel::<SelectCar>(16);
    let (accent_tx, mut accent_rx) = mpsc::channel::<AccentChanged>(16);
    let (state_tx, state_rx) = watch::channel(ShowcaseState::initial());
    let initial_accent = catalog
        .get(0)
        .map(|car| car.accent_color.clone())
        .unwrap_or_default();
    let (accent_watch_tx, accent_watch_rx) = watch::channel(initial_accent);

    let sequencer = tokio::spawn(showcase::run(
        catalog.clone(),
        select_rx,
        accent_tx,
        state_tx,
        cfg.showcase.clone(),
        cancel.clone(),
    ));

    // Page theming follows accent changes as soon as a selection is accepted,
    // ahead of the visual swap.
    let theming_cancel = cancel.clone();
    let theming = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = theming_cancel.cancelled() => break,
                maybe_ev = accent_rx.recv() => match maybe_ev {
                    Some(AccentChanged { accent_color, .. }) => {
                        let _ = accent_watch_tx.send(accent_color);
                    }
                    None => break,
                }
            }
        }
    });

    let provider =
        HttpSuggestionProvider::new(cfg.suggestions.clone()).context("building suggestion client")?;
    let pipeline = Arc::new(Mutex::new(SuggestionPipeline::new(Box::new(provider))));

    let state = AppState::new(
        catalog,
        images,
        select_tx,
        state_rx,
        accent_watch_rx,
        pipeline,
    );

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    web::serve(state, &cfg.web, cancel.clone()).await?;

    cancel.cancel();
    let _ = sequencer.await;
    let _ = theming.await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut term) = signal(SignalKind::terminate()) {
            term.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
