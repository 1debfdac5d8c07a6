use std::time::Duration;

use rand::Rng;

/// Wait before the next attempt, given how many attempts already failed.
///
/// | attempt | wait                          |
/// |---------|-------------------------------|
/// | 0       | 100 ms                        |
/// | 1, 2    | 1 s                           |
/// | 3+      | uniform in `[3 s, 6 s)`       |
///
/// `rng` should live as long as the session; it is never reseeded here.
///
/// # Examples
///
/// ```
/// use persist_fetch::cooldown;
/// use std::time::Duration;
///
/// let mut rng = rand::rng();
/// assert_eq!(cooldown(0, &mut rng), Duration::from_millis(100));
/// assert_eq!(cooldown(2, &mut rng), Duration::from_secs(1));
/// assert!(cooldown(7, &mut rng) >= Duration::from_secs(3));
/// ```
pub fn cooldown<R: Rng + ?Sized>(attempt: u32, rng: &mut R) -> Duration {
    match attempt {
        0 => Duration::from_millis(100),
        1 | 2 => Duration::from_secs(1),
        _ => Duration::from_nanos(rng.random_range(3_000_000_000..6_000_000_000)),
    }
}
