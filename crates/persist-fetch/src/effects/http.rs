use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::error::TransportError;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// Body of a live response.
pub type BodyStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// One open HTTP response: its head and a body still being received.
///
/// Dropping a `Connection` closes it.
pub struct Connection {
    pub status:         u16,
    /// Declared `Content-Length`, which for a partial response is the size of
    /// the range, not of the resource.
    pub content_length: Option<u64>,
    /// Raw `Content-Range` header value, if any.
    pub content_range:  Option<String>,
    pub body:           BodyStream,
}

impl Connection {
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range", &self.content_range)
            .field("body", &"{ ... }")
            .finish()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations apply their own timeouts and proxies, and must classify
/// failures so the engine can tell a dead network ([`TransportErrorKind::Connect`],
/// [`TransportErrorKind::Timeout`]) from a request that can never succeed
/// ([`TransportErrorKind::Request`]). Non-2xx responses are returned as
/// connections, not errors.
///
/// [`TransportErrorKind::Connect`]: crate::TransportErrorKind::Connect
/// [`TransportErrorKind::Timeout`]: crate::TransportErrorKind::Timeout
/// [`TransportErrorKind::Request`]: crate::TransportErrorKind::Request
///
/// # Implementations
///
/// - [`ReqwestClient`]: production implementation using `reqwest`
/// - scripted servers in the integration tests
pub trait HttpClient: Send + Sync {
    /// Send a streaming GET with the given extra headers.
    fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<Connection, TransportError>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use futures_util::StreamExt;
    use reqwest::header;

    use super::*;
    use crate::data::{FetchOptions, ProxyOptions};
    use crate::error::FetchError;

    /// Production HTTP client implementation using reqwest.
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client: reqwest::Client,
    }

    impl ReqwestClient {
        /// Build a client honouring the timeouts and proxies in `options`.
        pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
            let mut builder = reqwest::Client::builder()
                .connect_timeout(options.timeouts.connect)
                .read_timeout(options.timeouts.read);

            builder = apply_proxies(builder, &options.proxy)?;

            let client = builder
                .build()
                .map_err(|e| FetchError::ClientBuild(e.to_string()))?;
            Ok(Self { client })
        }
    }

    fn apply_proxies(
        mut builder: reqwest::ClientBuilder,
        proxy: &ProxyOptions,
    ) -> Result<reqwest::ClientBuilder, FetchError> {
        let build_err = |e: reqwest::Error| FetchError::ClientBuild(format!("invalid proxy: {e}"));

        if let Some(http) = &proxy.http {
            builder = builder.proxy(reqwest::Proxy::http(http).map_err(build_err)?);
        }
        if let Some(https) = &proxy.https {
            builder = builder.proxy(reqwest::Proxy::https(https).map_err(build_err)?);
        }
        Ok(builder)
    }

    fn classify(err: reqwest::Error) -> TransportError {
        let message = err.to_string();
        if err.is_builder() {
            TransportError::request(message)
        } else if err.is_timeout() {
            TransportError::timeout(message)
        } else if err.is_body() || err.is_decode() {
            TransportError::body(message)
        } else {
            TransportError::connect(message)
        }
    }

    impl HttpClient for ReqwestClient {
        async fn open(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<Connection, TransportError> {
            let mut request = self.client.get(url);

            for (key, value) in headers {
                request = request.header(key, value);
            }

            let response = request.send().await.map_err(classify)?;

            let content_length = response
                .headers()
                .get(header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok());
            let content_range = response
                .headers()
                .get(header::CONTENT_RANGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let status = response.status().as_u16();

            let body = response.bytes_stream().map(|chunk| {
                chunk.map_err(|e| {
                    let err = classify(e);
                    // Anything that breaks a started body is a body failure
                    // unless reqwest already called it a timeout.
                    match err.kind {
                        crate::TransportErrorKind::Timeout => err,
                        _ => TransportError::body(err.message),
                    }
                })
            });

            Ok(Connection {
                status,
                content_length,
                content_range,
                body: Box::pin(body),
            })
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
