//! `run` command handler
//!
//! Loads settings, wires input, events and metrics, and plays one game.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::args::RunArgs;
use crate::config::{ConfigLoader, LoadResult, LoaderOptions};
use crate::error::PhaseLoopError;
use crate::observability::events::{EventEmitter, StopReason};
use crate::observability::init_metrics;
use crate::session::{Autoplay, Session, SessionOptions, spawn_reader};

/// Queued key presses between frames.
const INPUT_BUFFER: usize = 64;

/// Play one game.
///
/// Prints the run summary to stdout when the session stops.
///
/// # Errors
///
/// Returns a config error if the settings cannot be loaded, an I/O error
/// if the events file cannot be opened, or `Interrupted` if a shutdown
/// signal stopped the game before it ended.
pub async fn run(args: &RunArgs, cancel: CancellationToken) -> Result<(), PhaseLoopError> {
    if let Some(port) = args.metrics_port {
        init_metrics(Some(port))?;
        tracing::info!(port, "Prometheus metrics endpoint started");
    }

    let loader = ConfigLoader::new(LoaderOptions::default());
    let load_result: LoadResult = if let Some(ref path) = args.config {
        tracing::info!(config = %path.display(), "loading configuration");
        loader.load(path)?
    } else {
        tracing::debug!("no configuration file, using defaults");
        loader.defaults()?
    };

    for warning in &load_result.warnings {
        tracing::warn!(
            location = warning.location.as_deref().unwrap_or("<unknown>"),
            "{}",
            warning.message
        );
    }

    let mut settings = load_result.settings;
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }

    let event_emitter = if let Some(ref path) = args.events_file {
        EventEmitter::from_file(path)?
    } else {
        EventEmitter::stderr()
    };

    let input = if args.no_input {
        None
    } else {
        let (tx, rx) = mpsc::channel(INPUT_BUFFER);
        spawn_reader(tokio::io::stdin(), tx);
        Some(rx)
    };

    let session = Session::new(SessionOptions {
        settings,
        event_emitter,
        autoplay: args.autoplay.map(Autoplay::new),
        input,
        branches: None,
        cancel,
    });
    let report = session.run().await;

    println!("{}", report.summary);

    match report.reason {
        StopReason::GameOver => Ok(()),
        StopReason::Interrupted => Err(PhaseLoopError::Interrupted),
    }
}
