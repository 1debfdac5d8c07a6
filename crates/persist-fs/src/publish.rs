use std::io;
use std::path::Path;

use crate::staging::parent_dir;
use crate::{Error, Result, StagingOptions};

/// Rename `from` onto `to`, replacing any existing file.
///
/// Renames refused with a sharing violation (an antivirus or indexer holding
/// the file open on Windows) are retried with a doubling delay. When `from`
/// lives on another filesystem the bytes are first copied into a sibling of
/// `to` and that sibling is renamed, so `to` still changes in one step.
pub async fn publish(from: &Path, to: &Path, options: &StagingOptions) -> Result<()> {
    let mut delay = options.get_retry_delay();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match tokio::fs::rename(from, to).await {
            Ok(()) => break,
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
                copy_then_rename(from, to).await?;
                break;
            }
            Err(e) if is_transient(&e) && attempt < options.get_retry_count() => {
                tracing::debug!(attempt, error = %e, "rename refused, retrying");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(source) => {
                return Err(Error::Publish {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    source,
                });
            }
        }
    }

    sync_dir(parent_dir(to)).await;
    Ok(())
}

async fn copy_then_rename(from: &Path, to: &Path) -> Result<()> {
    let publish_err = |source| Error::Publish {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let sibling = tempfile::Builder::new()
        .prefix(".persist.")
        .suffix(".part")
        .tempfile_in(parent_dir(to))
        .and_then(|named| named.into_temp_path().keep().map_err(|e| e.error))
        .map_err(publish_err)?;

    let copied = async {
        tokio::fs::copy(from, &sibling).await?;
        tokio::fs::File::open(&sibling).await?.sync_all().await?;
        tokio::fs::rename(&sibling, to).await
    }
    .await;

    if let Err(source) = copied {
        if let Err(e) = tokio::fs::remove_file(&sibling).await {
            tracing::warn!(path = %sibling.display(), error = %e, "failed to remove partial copy");
        }
        return Err(publish_err(source));
    }

    if let Err(e) = tokio::fs::remove_file(from).await {
        tracing::warn!(path = %from.display(), error = %e, "failed to remove staging file after copy");
    }
    Ok(())
}

fn is_transient(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::PermissionDenied | io::ErrorKind::ResourceBusy)
}

#[cfg(unix)]
async fn sync_dir(dir: &Path) {
    match tokio::fs::File::open(dir).await {
        Ok(handle) => {
            if let Err(e) = handle.sync_all().await {
                tracing::debug!(dir = %dir.display(), error = %e, "directory sync failed");
            }
        }
        Err(e) => tracing::debug!(dir = %dir.display(), error = %e, "directory open failed"),
    }
}

#[cfg(not(unix))]
async fn sync_dir(_dir: &Path) {}
