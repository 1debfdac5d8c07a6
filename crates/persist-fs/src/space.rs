use std::path::Path;

use crate::{Error, Result};

/// Bytes an unprivileged writer may still use on the filesystem holding `dir`.
///
/// Returns `None` when the platform cannot tell.
#[cfg(unix)]
pub fn usable_space(dir: &Path) -> Option<u64> {
    let stats = nix::sys::statvfs::statvfs(dir).ok()?;
    #[allow(clippy::unnecessary_cast)]
    let usable = stats.blocks_available() as u64 * stats.fragment_size() as u64;
    Some(usable)
}

#[cfg(not(unix))]
pub fn usable_space(_dir: &Path) -> Option<u64> { None }

/// Fails with [`Error::InsufficientSpace`] when `needed` bytes cannot fit in `dir`.
pub fn ensure_space(dir: &Path, needed: u64) -> Result<()> {
    match usable_space(dir) {
        Some(available) if needed > available => Err(Error::InsufficientSpace {
            path: dir.to_path_buf(),
            needed,
            available,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_small_file_fits() {
        let dir = tempdir().unwrap();
        assert!(ensure_space(dir.path(), 1).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn test_absurd_size_rejected() {
        let dir = tempdir().unwrap();
        let err = ensure_space(dir.path(), u64::MAX).unwrap_err();
        assert!(matches!(err, Error::InsufficientSpace { needed: u64::MAX, .. }));
    }
}
