use std::time::Duration;

use rand::Rng;

use super::backoff::cooldown;
use crate::data::NapOptions;

/// Wait after the `consecutive_failures`-th failed connection attempt in a row.
///
/// Every `connect_nap_every`-th failure rests for the full reconnect nap;
/// the others follow [`cooldown`].
pub fn connect_retry_delay<R: Rng + ?Sized>(
    naps: &NapOptions,
    consecutive_failures: u32,
    rng: &mut R,
) -> Duration {
    let every = naps.connect_nap_every.max(1);
    if consecutive_failures > 0 && consecutive_failures % every == 0 {
        naps.reconnect_nap_time
    } else {
        cooldown(consecutive_failures, rng)
    }
}

/// Decide whether to drop a healthy connection and rest.
///
/// Only connections that carried more than `checkpoint_bytes` are eligible;
/// each call past that point is one Bernoulli trial.
pub fn passive_nap<R: Rng + ?Sized>(
    naps: &NapOptions,
    since_checkpoint: u64,
    rng: &mut R,
) -> Option<Duration> {
    if since_checkpoint <= naps.checkpoint_bytes {
        return None;
    }
    chance(naps.passive_nap_chance, rng).then_some(naps.passive_nap_time)
}

/// Wait before reconnecting after the `reconnects`-th failed read.
pub fn reconnect_nap<R: Rng + ?Sized>(naps: &NapOptions, reconnects: u32, rng: &mut R) -> Duration {
    if reconnects > naps.random_nap_after && chance(naps.random_nap_chance, rng) {
        naps.random_nap_time
    } else {
        naps.reconnect_nap_time
    }
}

fn chance<R: Rng + ?Sized>(p: f64, rng: &mut R) -> bool {
    p > 0.0 && rng.random_bool(p.min(1.0))
}
