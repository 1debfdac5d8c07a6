use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Clone, Debug, Parser)]
#[command(
    name = "persist",
    version = env!("CARGO_PKG_VERSION"),
    about = "Download one large file over an unreliable connection",
    long_about = "Download one large file over an unreliable connection.\n\n\
        Dropped connections are resumed from the last byte on disk. Press \
        Ctrl-C to pause, Enter to resume, and Ctrl-C again while paused to \
        stop and keep the partial file."
)]
pub struct App {
    /// URL to download. Prompted for when omitted.
    pub url: Option<String>,

    /// Directory to save into; the file name comes from the URL.
    #[arg(short = 'o', long = "dir", value_name = "DIR", conflicts_with = "output")]
    pub dir: Option<PathBuf>,

    /// Exact path to save to.
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Configuration file. Defaults to ~/.config/persist/config.toml when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Proxy for both http and https traffic.
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Longest silence tolerated on an open connection.
    #[arg(long, value_name = "SECS")]
    pub read_timeout: Option<u64>,

    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<usize>,

    /// Hide the progress bar.
    #[arg(short, long)]
    pub quiet: bool,

    /// More log output; repeat for more.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl App {
    /// Default log directive for the requested verbosity.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
