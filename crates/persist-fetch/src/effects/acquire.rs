use rand::rngs::StdRng;

use super::control::{ControlSignal, ControlState, Wake};
use super::http::{Connection, HttpClient};
use super::reader::ChunkReader;
use crate::core::{self, ResponseHead};
use crate::data::{FetchOptions, FetchPhase, TransferSession};
use crate::error::FetchError;

/// Why a session stopped before completing.
#[derive(Debug)]
pub(crate) enum Stop {
    Cancelled,
    Fatal(FetchError),
}

impl From<FetchError> for Stop {
    fn from(err: FetchError) -> Self { Stop::Fatal(err) }
}

/// Result of one acquisition.
pub(crate) enum Acquired {
    /// A live body positioned at the session's resume offset.
    Live(ChunkReader),
    /// A resumed request answered with a status worth retrying later.
    Rejected(u16),
}

/// Opens connections for a session, retrying network failures forever.
pub(crate) struct Acquirer<'a, C: HttpClient> {
    client:  &'a C,
    options: &'a FetchOptions,
}

impl<'a, C: HttpClient> Acquirer<'a, C> {
    pub(crate) fn new(client: &'a C, options: &'a FetchOptions) -> Self { Self { client, options } }

    /// Open a stream starting at `session.bytes_written()`.
    ///
    /// Connect failures and timeouts back off and retry without limit. A
    /// non-2xx answer to the first request is fatal; on a resumed request
    /// only 408, 429 and 5xx are handed back as [`Acquired::Rejected`].
    pub(crate) async fn acquire(
        &self,
        session: &mut TransferSession,
        rng: &mut StdRng,
        signal: &mut ControlSignal,
    ) -> Result<Acquired, Stop> {
        let offset = session.bytes_written();
        let mut headers: Vec<(String, String)> = self.options.headers.to_vec();
        if let Some(from) = session.resume_offset() {
            headers.push(("Range".to_string(), core::range_header(from)));
        }

        loop {
            self.options.report(session.progress(FetchPhase::Connecting));

            let opened = tokio::select! {
                opened = self.client.open(session.source_url(), &headers) => Some(opened),
                state = signal.changed() => match state {
                    ControlState::Cancelled => return Err(Stop::Cancelled),
                    ControlState::Paused => None,
                    ControlState::Running => continue,
                },
            };

            let opened = match opened {
                Some(opened) => opened,
                None => {
                    pause(session, signal, self.options).await?;
                    continue;
                }
            };

            match opened {
                Ok(connection) => {
                    session.counters.connect_failures = 0;
                    return self.accept(session, offset, connection);
                }
                Err(err) if err.is_transient() => {
                    session.counters.connect_failures += 1;
                    let failures = session.counters.connect_failures;
                    let delay = core::connect_retry_delay(&self.options.naps, failures, rng);
                    tracing::warn!(
                        url = session.source_url(),
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "connection failed, retrying"
                    );
                    match signal.sleep(delay).await {
                        Wake::Elapsed => {}
                        Wake::Paused => pause(session, signal, self.options).await?,
                        Wake::Cancelled => return Err(Stop::Cancelled),
                    }
                }
                Err(source) => {
                    return Err(Stop::Fatal(FetchError::Request {
                        url: session.source_url().to_string(),
                        source,
                    }));
                }
            }
        }
    }

    fn accept(
        &self,
        session: &mut TransferSession,
        offset: u64,
        connection: Connection,
    ) -> Result<Acquired, Stop> {
        let status = connection.status;
        if !connection.is_success() {
            let resumed = session.expected_total_bytes().is_some();
            if resumed && is_retryable_status(status) {
                tracing::warn!(url = session.source_url(), status, offset, "resume request refused");
                return Ok(Acquired::Rejected(status));
            }
            return Err(Stop::Fatal(FetchError::HttpStatus {
                status,
                url: session.source_url().to_string(),
            }));
        }

        let placement = core::reconcile(
            session.source_url(),
            offset,
            session.expected_total_bytes(),
            ResponseHead {
                status,
                content_length: connection.content_length,
                content_range: connection.content_range.as_deref(),
            },
        )?;
        session.record_total(placement.total)?;

        if placement.skip > 0 {
            tracing::debug!(skip = placement.skip, status, "discarding bytes already on disk");
        }
        tracing::debug!(
            url = session.source_url(),
            offset,
            total = placement.total,
            status,
            "connection established"
        );

        Ok(Acquired::Live(ChunkReader::new(connection.body, placement.skip)))
    }
}

fn is_retryable_status(status: u16) -> bool { matches!(status, 408 | 429 | 500..=599) }

/// Hold the session until resumed. Counts as a pause, never as a failure.
pub(crate) async fn pause(
    session: &mut TransferSession,
    signal: &mut ControlSignal,
    options: &FetchOptions,
) -> Result<(), Stop> {
    session.counters.pauses += 1;
    options.report(session.progress(FetchPhase::Paused));
    tracing::info!(bytes = session.bytes_written(), "paused");

    match signal.wait_while_paused().await {
        ControlState::Cancelled => Err(Stop::Cancelled),
        _ => {
            tracing::info!(bytes = session.bytes_written(), "resumed");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{status}");
        }
        for status in [400, 401, 403, 404, 410, 416] {
            assert!(!is_retryable_status(status), "{status}");
        }
    }
}
