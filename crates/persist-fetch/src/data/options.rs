use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::progress::Progress;
use crate::error::{FetchError, Result};

/// One kibibyte.
pub const KIB: u64 = 1024;
/// One gibibyte.
pub const GIB: u64 = 1024 * 1024 * 1024;

/// Per-operation transport timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Time allowed to establish a connection.
    ///
    /// Default: 30s
    pub connect: Duration,

    /// Time allowed between two successful reads of the response body.
    ///
    /// Default: 5s
    pub read: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            read: Duration::from_secs(5),
        }
    }
}

/// Proxies used for outgoing requests, keyed by the target URL scheme.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyOptions {
    /// Proxy for `http://` targets.
    pub http: Option<String>,
    /// Proxy for `https://` targets.
    pub https: Option<String>,
}

impl ProxyOptions {
    /// Route every scheme through the same proxy.
    pub fn all(proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        Self {
            http: Some(proxy.clone()),
            https: Some(proxy),
        }
    }

    pub fn is_empty(&self) -> bool { self.http.is_none() && self.https.is_none() }
}

/// When and how long the transfer rests between connections.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NapOptions {
    /// Bytes a single connection may carry before passive naps become eligible.
    ///
    /// Default: 3 GiB
    pub checkpoint_bytes: u64,

    /// Chance, checked after every chunk past the checkpoint, of taking a passive nap.
    ///
    /// Default: 0.25
    pub passive_nap_chance: f64,

    /// Length of a passive nap.
    ///
    /// Default: 20s
    pub passive_nap_time: Duration,

    /// Rest after a failed read, and after every third consecutive connect failure.
    ///
    /// Default: 15s
    pub reconnect_nap_time: Duration,

    /// Chance of a random nap once the session has seen more than
    /// [`NapOptions::random_nap_after`] reconnects.
    ///
    /// Default: 0.25
    pub random_nap_chance: f64,

    /// Length of a random nap.
    ///
    /// Default: 15s
    pub random_nap_time: Duration,

    /// Reconnects tolerated before random naps become eligible.
    ///
    /// Default: 3
    pub random_nap_after: u32,

    /// Every n-th consecutive connect failure waits [`NapOptions::reconnect_nap_time`].
    ///
    /// Default: 3
    pub connect_nap_every: u32,
}

impl Default for NapOptions {
    fn default() -> Self {
        Self {
            checkpoint_bytes: 3 * GIB,
            passive_nap_chance: 0.25,
            passive_nap_time: Duration::from_secs(20),
            reconnect_nap_time: Duration::from_secs(15),
            random_nap_chance: 0.25,
            random_nap_time: Duration::from_secs(15),
            random_nap_after: 3,
            connect_nap_every: 3,
        }
    }
}

impl NapOptions {
    /// Naps that never trigger and reconnects that do not wait.
    ///
    /// Connect failures still back off through [`crate::cooldown`].
    pub fn disabled() -> Self {
        Self {
            passive_nap_chance: 0.0,
            passive_nap_time: Duration::ZERO,
            reconnect_nap_time: Duration::ZERO,
            random_nap_chance: 0.0,
            random_nap_time: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Configuration of a download engine.
///
/// # Examples
///
/// ```
/// use persist_fetch::{FetchOptions, NapOptions};
/// use std::time::Duration;
///
/// let options = FetchOptions::default()
///     .connect_timeout(Duration::from_secs(10))
///     .chunk_size(64 * 1024)
///     .naps(NapOptions { checkpoint_bytes: 1 << 30, ..NapOptions::default() })
///     .header("Authorization", "Bearer token");
/// ```
#[derive(Clone)]
pub struct FetchOptions {
    /// Transport timeouts.
    pub timeouts: Timeouts,

    /// Optional proxies.
    pub proxy: ProxyOptions,

    /// Upper bound on the bytes taken from the stream per loop iteration.
    ///
    /// Default: 10 KiB
    pub chunk_size: usize,

    /// Nap policy.
    pub naps: NapOptions,

    /// Extra request headers, sent with every connection.
    ///
    /// Default: empty
    pub headers: Arc<[(String, String)]>,

    /// Directory holding the staging file.
    ///
    /// Default: the destination's parent directory
    pub staging_dir: Option<PathBuf>,

    /// Flush the staging file to disk before publishing.
    ///
    /// Default: true
    pub sync_on_publish: bool,

    /// Refuse to start when the declared size does not fit on disk.
    ///
    /// Default: true
    pub check_space: bool,

    /// Seed for the nap and backoff random source.
    ///
    /// `None` seeds from the operating system once per session.
    pub rng_seed: Option<u64>,

    /// Progress callback, invoked on phase changes and after every chunk.
    ///
    /// Default: None
    pub on_progress: Option<Arc<dyn Fn(&Progress) + Send + Sync>>,
}

impl fmt::Debug for FetchOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchOptions")
            .field("timeouts", &self.timeouts)
            .field("proxy", &self.proxy)
            .field("chunk_size", &self.chunk_size)
            .field("naps", &self.naps)
            .field("headers", &self.headers)
            .field("staging_dir", &self.staging_dir)
            .field("sync_on_publish", &self.sync_on_publish)
            .field("check_space", &self.check_space)
            .field("rng_seed", &self.rng_seed)
            .field("on_progress", &"{ ... }")
            .finish()
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            proxy: ProxyOptions::default(),
            chunk_size: (10 * KIB) as usize,
            naps: NapOptions::default(),
            headers: Arc::new([]),
            staging_dir: None,
            sync_on_publish: true,
            check_space: true,
            rng_seed: None,
            on_progress: None,
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect = timeout;
        self
    }

    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.read = timeout;
        self
    }

    #[must_use]
    pub fn proxy(mut self, proxy: ProxyOptions) -> Self {
        self.proxy = proxy;
        self
    }

    #[must_use]
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn naps(mut self, naps: NapOptions) -> Self {
        self.naps = naps;
        self
    }

    /// Add a single request header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = Arc::from(headers);
        self
    }

    /// Replace all request headers.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Arc::from(headers);
        self
    }

    #[must_use]
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn sync_on_publish(mut self, sync: bool) -> Self {
        self.sync_on_publish = sync;
        self
    }

    #[must_use]
    pub fn check_space(mut self, check: bool) -> Self {
        self.check_space = check;
        self
    }

    #[must_use]
    pub fn rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Set the progress callback.
    ///
    /// # Examples
    ///
    /// ```
    /// use persist_fetch::{FetchOptions, FetchPhase, Progress};
    /// use std::sync::Arc;
    ///
    /// let options = FetchOptions::default().on_progress(Arc::new(|progress: &Progress| {
    ///     if progress.phase == FetchPhase::Downloading {
    ///         if let Some(pct) = progress.percentage() {
    ///             println!("{pct:.1}% [{}]", progress.reconnects);
    ///         }
    ///     }
    /// }));
    /// ```
    #[must_use]
    pub fn on_progress(mut self, on_progress: Arc<dyn Fn(&Progress) + Send + Sync>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    /// Reject settings the transfer loop cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(FetchError::InvalidConfig("chunk_size must be positive".into()));
        }
        for (name, chance) in [
            ("passive_nap_chance", self.naps.passive_nap_chance),
            ("random_nap_chance", self.naps.random_nap_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(FetchError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {chance}"
                )));
            }
        }
        if self.naps.connect_nap_every == 0 {
            return Err(FetchError::InvalidConfig("connect_nap_every must be positive".into()));
        }
        Ok(())
    }

    pub(crate) fn report(&self, progress: Progress) {
        if let Some(ref callback) = self.on_progress {
            callback(&progress);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_defaults() {
        let options = FetchOptions::default();
        assert_eq!(options.timeouts.connect, Duration::from_secs(30));
        assert_eq!(options.timeouts.read, Duration::from_secs(5));
        assert_eq!(options.chunk_size, 10 * 1024);
        assert_eq!(options.naps.checkpoint_bytes, 3 * 1024 * 1024 * 1024);
        assert_eq!(options.naps.passive_nap_chance, 0.25);
        assert_eq!(options.naps.passive_nap_time, Duration::from_secs(20));
        assert_eq!(options.naps.reconnect_nap_time, Duration::from_secs(15));
        assert_eq!(options.naps.random_nap_chance, 0.25);
        assert_eq!(options.naps.random_nap_time, Duration::from_secs(15));
        assert!(options.proxy.is_empty());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_header_appends() {
        let options = FetchOptions::default()
            .header("Authorization", "Bearer token")
            .header("User-Agent", "persist");
        assert_eq!(options.headers.len(), 2);
        assert_eq!(options.headers[1].0, "User-Agent");
    }

    #[test]
    fn test_validate_rejects_zero_chunk() {
        let err = FetchOptions::default().chunk_size(0).validate().unwrap_err();
        assert!(matches!(err, FetchError::InvalidConfig(_)));
    }

    #[test]
    fn test_validate_rejects_bad_probability() {
        let naps = NapOptions {
            random_nap_chance: 1.5,
            ..NapOptions::default()
        };
        assert!(FetchOptions::default().naps(naps).validate().is_err());

        let naps = NapOptions {
            passive_nap_chance: f64::NAN,
            ..NapOptions::default()
        };
        assert!(FetchOptions::default().naps(naps).validate().is_err());
    }

    #[test]
    fn test_proxy_all() {
        let proxy = ProxyOptions::all("http://127.0.0.1:3128");
        assert_eq!(proxy.http, proxy.https);
        assert!(!proxy.is_empty());
    }
}
