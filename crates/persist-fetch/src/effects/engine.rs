use std::path::{Path, PathBuf};
use std::time::Instant;

use persist_fs::{StagingFile, StagingOptions};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::acquire::Stop;
use super::control::ControlSignal;
use super::http::HttpClient;
use super::transfer::TransferLoop;
use crate::data::{DownloadOutcome, FetchOptions, FetchPhase, TransferSession};
use crate::error::{FetchError, Result};

/// Downloads one URL at a time into a local file, surviving any number of
/// dropped connections.
///
/// # Examples
///
/// ```no_run
/// use persist_fetch::{Engine, FetchOptions, ReqwestClient};
///
/// # async fn run() -> persist_fetch::Result<()> {
/// let options = FetchOptions::default();
/// let engine = Engine::new(ReqwestClient::new(&options)?, options)?;
/// let outcome = engine
///     .download("https://example.com/big.iso", "downloads/big.iso")
///     .await?;
/// println!("{} bytes, {} reconnects", outcome.bytes, outcome.reconnects);
/// # Ok(())
/// # }
/// ```
pub struct Engine<C: HttpClient> {
    client:  C,
    options: FetchOptions,
}

impl<C: HttpClient> Engine<C> {
    /// Create an engine, rejecting options the transfer loop cannot honour.
    pub fn new(client: C, options: FetchOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions { &self.options }

    pub fn client(&self) -> &C { &self.client }

    /// Download `url` to `destination` with no way to pause or cancel.
    pub async fn download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<DownloadOutcome> {
        self.download_with_control(url, destination, ControlSignal::none())
            .await
    }

    /// Download `url` to `destination`, obeying `signal`.
    ///
    /// The destination is only written once every byte has arrived. On cancel
    /// the staging file is kept and its path returned in
    /// [`FetchError::Cancelled`]; on any other failure it is kept if it holds
    /// data and removed if it is empty.
    pub async fn download_with_control(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
        mut signal: ControlSignal,
    ) -> Result<DownloadOutcome> {
        let destination = destination.as_ref();
        let url = url.trim();
        if url.is_empty() {
            return Err(FetchError::InvalidUrl("URL is empty".into()));
        }
        if destination.is_dir() {
            return Err(FetchError::DestinationIsDirectory(destination.to_path_buf()));
        }

        let started = Instant::now();
        let mut staging = StagingFile::create(destination, self.staging_options()).await?;
        let mut rng = match self.options.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        tracing::debug!(
            url,
            destination = %destination.display(),
            staging = %staging.path().display(),
            "starting download"
        );

        let session = TransferSession::new(url);
        let outcome = TransferLoop::new(
            &self.client,
            &self.options,
            &mut staging,
            &mut signal,
            &mut rng,
            session,
        )
        .run()
        .await;

        let session = match outcome {
            Ok(session) => session,
            Err((stop, session)) => return Err(self.stopped(stop, &session, staging).await),
        };

        self.options
            .report(session.progress(FetchPhase::Committing));
        let path = staging.publish().await?;
        self.options
            .report(session.progress(FetchPhase::Completed));

        let counters = *session.counters();
        tracing::info!(
            url,
            path = %path.display(),
            bytes = session.bytes_written(),
            reconnects = counters.reconnects,
            passive_naps = counters.passive_naps,
            "download complete"
        );

        Ok(DownloadOutcome {
            path,
            bytes: session.bytes_written(),
            reconnects: counters.reconnects,
            passive_naps: counters.passive_naps,
            pauses: counters.pauses,
            elapsed: started.elapsed(),
        })
    }

    fn staging_options(&self) -> StagingOptions {
        let options = StagingOptions::new().sync(self.options.sync_on_publish);
        match &self.options.staging_dir {
            Some(dir) => options.staging_dir(dir.clone()),
            None => options,
        }
    }

    async fn stopped(
        &self,
        stop: Stop,
        session: &TransferSession,
        staging: StagingFile,
    ) -> FetchError {
        match stop {
            Stop::Cancelled => {
                let bytes_written = session.bytes_written();
                tracing::info!(url = session.source_url(), bytes_written, "download cancelled");
                match keep(staging).await {
                    Ok(staging) => FetchError::Cancelled {
                        staging,
                        bytes_written,
                    },
                    Err(err) => err,
                }
            }
            Stop::Fatal(err) => {
                tracing::error!(url = session.source_url(), error = %err, "download failed");
                if staging.is_empty() {
                    let path = staging.path().to_path_buf();
                    if let Err(e) = staging.discard().await {
                        tracing::warn!(staging = %path.display(), error = %e, "failed to remove staging file");
                    }
                } else {
                    match keep(staging).await {
                        Ok(path) => tracing::info!(staging = %path.display(), "partial data kept"),
                        Err(e) => tracing::warn!(error = %e, "failed to keep staging file"),
                    }
                }
                err
            }
        }
    }
}

async fn keep(staging: StagingFile) -> Result<PathBuf> { Ok(staging.abandon().await?) }
