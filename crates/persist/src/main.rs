use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Parser;
use persist_fetch::{Engine, ReqwestClient, control};
use tracing_subscriber::EnvFilter;

use crate::cli::App;
use crate::config::Config;
use crate::ui::DownloadTracker;

mod cli;
mod config;
mod interact;
mod naming;
mod ui;

#[tokio::main]
async fn main() -> Result<()> {
    let app = App::parse();
    init_logging(&app);
    run(app).await
}

fn init_logging(app: &App) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(app.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(app: App) -> Result<()> {
    let config = Config::discover(app.config.as_deref())?;
    let url = match &app.url {
        Some(url) => url.trim().to_string(),
        None => interact::prompt_url()?,
    };
    let destination = destination(&app, &config, &url, Local::now());

    let tracker = DownloadTracker::new(app.quiet);
    let options = config.fetch_options(&app).on_progress(tracker.callback());
    let client = ReqwestClient::new(&options)?;
    let engine = Engine::new(client, options)?;

    let (handle, signal) = control();
    let keys = tokio::spawn(interact::watch_keys(handle, tracker.clone()));
    let result = engine
        .download_with_control(&url, &destination, signal)
        .await;
    keys.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            tracker.abandon();
            return Err(err).with_context(|| format!("failed to download {url}"));
        }
    };
    tracker.finish();

    println!("download successful after {} retries", outcome.reconnects);
    println!("downloaded to path:\n{}", outcome.path.display());
    Ok(())
}

/// `--output`, else a name derived from the URL inside `-o`, the configured
/// target directory, or the current directory.
fn destination(app: &App, config: &Config, url: &str, now: DateTime<Local>) -> PathBuf {
    if let Some(output) = &app.output {
        return output.clone();
    }
    let dir = app
        .dir
        .as_deref()
        .or(config.target_dir.as_deref())
        .unwrap_or(Path::new("."));
    dir.join(naming::file_name_for(url, now))
}
