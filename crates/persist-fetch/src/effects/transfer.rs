use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use persist_fs::StagingFile;
use rand::rngs::StdRng;

use super::acquire::{Acquired, Acquirer, Stop, pause};
use super::control::{ControlSignal, ControlState, Wake};
use super::http::HttpClient;
use super::reader::ChunkReader;
use crate::core;
use crate::data::{FetchOptions, FetchPhase, TransferSession};
use crate::error::TransportError;

/// Why a live stream was given up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadFailure {
    /// The body ended, or yielded nothing, before the expected size was reached.
    EmptyRead,
    /// The transport broke off mid-body.
    Stream(TransportError),
    /// A resumed request was answered with a retryable status.
    Status(u16),
}

impl fmt::Display for ReadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFailure::EmptyRead => write!(f, "read returned no data before the end"),
            ReadFailure::Stream(err) => write!(f, "{err}"),
            ReadFailure::Status(status) => write!(f, "server answered HTTP {status}"),
        }
    }
}

/// States of a transfer session.
///
/// ```text
/// Connecting -> Streaming -> { Streaming | CheckpointNap | ReadFailure | Paused }
///            -> Reconnecting -> Connecting -> ... -> Done
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferState {
    Connecting,
    Streaming,
    /// Voluntarily dropping a healthy connection for the given rest.
    CheckpointNap(Duration),
    ReadFailure(ReadFailure),
    Paused,
    Reconnecting,
    Done,
}

enum Event {
    Chunk(Result<Option<Bytes>, TransportError>),
    Control(ControlState),
}

/// Drives one session from its first connection to the last byte.
pub(crate) struct TransferLoop<'a, C: HttpClient> {
    acquirer: Acquirer<'a, C>,
    options:  &'a FetchOptions,
    staging:  &'a mut StagingFile,
    signal:   &'a mut ControlSignal,
    rng:      &'a mut StdRng,
    session:  TransferSession,
    reader:   Option<ChunkReader>,
}

impl<'a, C: HttpClient> TransferLoop<'a, C> {
    pub(crate) fn new(
        client: &'a C,
        options: &'a FetchOptions,
        staging: &'a mut StagingFile,
        signal: &'a mut ControlSignal,
        rng: &'a mut StdRng,
        session: TransferSession,
    ) -> Self {
        Self {
            acquirer: Acquirer::new(client, options),
            options,
            staging,
            signal,
            rng,
            session,
            reader: None,
        }
    }

    /// Run until the staging file holds every byte, or a terminal stop.
    ///
    /// On [`Stop`] the session is handed back alongside so the caller can
    /// report how far it got.
    pub(crate) async fn run(mut self) -> Result<TransferSession, (Stop, TransferSession)> {
        let mut state = TransferState::Connecting;
        loop {
            tracing::trace!(?state, bytes = self.session.bytes_written(), "transfer state");
            let next = match state {
                TransferState::Connecting => self.connect().await,
                TransferState::Streaming => self.stream().await,
                TransferState::CheckpointNap(rest) => self.checkpoint_nap(rest).await,
                TransferState::ReadFailure(cause) => self.read_failure(cause).await,
                TransferState::Paused => self.pause().await,
                TransferState::Reconnecting => Ok(TransferState::Connecting),
                TransferState::Done => break,
            };
            state = match next {
                Ok(next) => next,
                Err(stop) => {
                    self.reader = None;
                    return Err((stop, self.session));
                }
            };
        }

        if let Err(e) = self.staging.sync().await {
            return Err((Stop::Fatal(e.into()), self.session));
        }
        Ok(self.session)
    }

    async fn connect(&mut self) -> Result<TransferState, Stop> {
        self.reader = None;
        let first = self.session.expected_total_bytes().is_none();

        match self
            .acquirer
            .acquire(&mut self.session, self.rng, self.signal)
            .await?
        {
            Acquired::Live(reader) => {
                self.session.start_connection();
                self.reader = Some(reader);

                if first {
                    self.check_space()?;
                    tracing::info!(
                        url = self.session.source_url(),
                        total = self.session.expected_total_bytes(),
                        "download started"
                    );
                }

                if self.session.is_complete() {
                    Ok(TransferState::Done)
                } else {
                    self.options
                        .report(self.session.progress(FetchPhase::Downloading));
                    Ok(TransferState::Streaming)
                }
            }
            Acquired::Rejected(status) => Ok(TransferState::ReadFailure(ReadFailure::Status(status))),
        }
    }

    async fn stream(&mut self) -> Result<TransferState, Stop> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(TransferState::Connecting);
        };

        let event = tokio::select! {
            biased;
            state = self.signal.changed() => Event::Control(state),
            chunk = reader.next_chunk(self.options.chunk_size) => Event::Chunk(chunk),
        };

        match event {
            Event::Control(ControlState::Cancelled) => Err(Stop::Cancelled),
            Event::Control(ControlState::Paused) => Ok(TransferState::Paused),
            Event::Control(ControlState::Running) => Ok(TransferState::Streaming),
            Event::Chunk(Err(err)) => Ok(TransferState::ReadFailure(ReadFailure::Stream(err))),
            Event::Chunk(Ok(None)) => Ok(TransferState::ReadFailure(ReadFailure::EmptyRead)),
            Event::Chunk(Ok(Some(chunk))) if chunk.is_empty() => {
                Ok(TransferState::ReadFailure(ReadFailure::EmptyRead))
            }
            Event::Chunk(Ok(Some(chunk))) => self.write(chunk).await,
        }
    }

    async fn write(&mut self, mut chunk: Bytes) -> Result<TransferState, Stop> {
        let remaining = self.session.remaining().unwrap_or(u64::MAX);
        if chunk.len() as u64 > remaining {
            tracing::warn!(
                extra = chunk.len() as u64 - remaining,
                "server sent more than it declared, truncating"
            );
            chunk.truncate(remaining as usize);
        }

        self.staging
            .append(&chunk)
            .await
            .map_err(|e| Stop::Fatal(e.into()))?;
        self.session.advance(chunk.len() as u64);
        self.options
            .report(self.session.progress(FetchPhase::Downloading));

        if self.session.is_complete() {
            return Ok(TransferState::Done);
        }
        match core::passive_nap(&self.options.naps, self.session.since_checkpoint(), self.rng) {
            Some(rest) => Ok(TransferState::CheckpointNap(rest)),
            None => Ok(TransferState::Streaming),
        }
    }

    async fn checkpoint_nap(&mut self, rest: Duration) -> Result<TransferState, Stop> {
        self.reader = None;
        self.session.counters.passive_naps += 1;
        tracing::debug!(
            carried = self.session.since_checkpoint(),
            rest_ms = rest.as_millis() as u64,
            "checkpoint reached, taking a nap"
        );
        self.nap(rest).await
    }

    async fn read_failure(&mut self, cause: ReadFailure) -> Result<TransferState, Stop> {
        self.reader = None;
        self.session.counters.reconnects += 1;
        let reconnects = self.session.counters.reconnects;
        let rest = core::reconnect_nap(&self.options.naps, reconnects, self.rng);
        tracing::warn!(
            url = self.session.source_url(),
            offset = self.session.bytes_written(),
            reconnects,
            rest_ms = rest.as_millis() as u64,
            cause = %cause,
            "connection lost, reconnecting"
        );
        self.nap(rest).await
    }

    async fn pause(&mut self) -> Result<TransferState, Stop> {
        self.reader = None;
        pause(&mut self.session, self.signal, self.options).await?;
        Ok(TransferState::Reconnecting)
    }

    async fn nap(&mut self, rest: Duration) -> Result<TransferState, Stop> {
        self.options.report(self.session.progress(FetchPhase::Napping));
        match self.signal.sleep(rest).await {
            Wake::Elapsed => Ok(TransferState::Reconnecting),
            Wake::Paused => Ok(TransferState::Paused),
            Wake::Cancelled => Err(Stop::Cancelled),
        }
    }

    fn check_space(&self) -> Result<(), Stop> {
        if !self.options.check_space {
            return Ok(());
        }
        let (Some(needed), Some(dir)) = (self.session.remaining(), self.staging.path().parent()) else {
            return Ok(());
        };
        persist_fs::ensure_space(dir, needed).map_err(|e| Stop::Fatal(e.into()))
    }
}
