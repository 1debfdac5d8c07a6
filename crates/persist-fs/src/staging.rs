use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

const STAGING_SUFFIX: &str = ".part";

#[derive(Clone, Debug)]
pub struct StagingOptions {
    staging_dir:   Option<PathBuf>,
    sync:          bool,
    retry_count:   u32,
    retry_delay:   Duration,
}

impl Default for StagingOptions {
    fn default() -> Self { Self::new() }
}

impl StagingOptions {
    pub fn new() -> Self {
        Self {
            staging_dir: None,
            sync:        true,
            retry_count: 5,
            retry_delay: Duration::from_millis(100),
        }
    }

    /// Directory the staging file is created in.
    ///
    /// Defaults to the destination's parent so publishing is a plain rename.
    pub fn staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Flush file contents to disk before publishing.
    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    /// Attempts made when the rename is refused by a transient sharing violation.
    pub fn retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count.max(1);
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn get_retry_count(&self) -> u32 { self.retry_count }

    pub fn get_retry_delay(&self) -> Duration { self.retry_delay }
}

/// A file accumulating downloaded bytes next to, but never at, its destination.
///
/// The file is only ever appended to. It becomes visible at the destination
/// through [`StagingFile::publish`]; dropping it or calling
/// [`StagingFile::abandon`] leaves it on disk for manual recovery.
#[derive(Debug)]
pub struct StagingFile {
    file:        File,
    path:        PathBuf,
    destination: PathBuf,
    len:         u64,
    options:     StagingOptions,
}

impl StagingFile {
    /// Create an empty staging file for `destination`.
    pub async fn create(destination: impl AsRef<Path>, options: StagingOptions) -> Result<Self> {
        let destination = destination.as_ref().to_path_buf();
        let file_name = destination
            .file_name()
            .ok_or_else(|| Error::NoFileName {
                path: destination.clone(),
            })?
            .to_string_lossy()
            .into_owned();

        let dir = match &options.staging_dir {
            Some(dir) => dir.clone(),
            None => parent_dir(&destination).to_path_buf(),
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| Error::Create {
                path: dir.clone(),
                source,
            })?;

        let prefix = format!(".{file_name}.");
        let (std_file, path) = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(STAGING_SUFFIX)
            .tempfile_in(&dir)
            .and_then(|named| named.keep().map_err(|e| e.error))
            .map_err(|source| Error::Create {
                path: dir.clone(),
                source,
            })?;

        tracing::debug!(staging = %path.display(), destination = %destination.display(), "created staging file");

        Ok(Self {
            file: File::from_std(std_file),
            path,
            destination,
            len: 0,
            options,
        })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn destination(&self) -> &Path { &self.destination }

    /// Bytes appended so far.
    pub fn len(&self) -> u64 { self.len }

    pub fn is_empty(&self) -> bool { self.len == 0 }

    pub async fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.file
            .write_all(bytes)
            .await
            .map_err(|source| Error::Write {
                path: self.path.clone(),
                source,
            })?;
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Push buffered bytes to the OS and, if configured, to the disk.
    pub async fn sync(&mut self) -> Result<()> {
        self.file.flush().await.map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;
        if self.options.sync {
            self.file.sync_data().await.map_err(|source| Error::Sync {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// Atomically move the finished file to its destination.
    ///
    /// Readers of the destination path observe either the previous state or
    /// the complete file, never a prefix of it.
    pub async fn publish(mut self) -> Result<PathBuf> {
        self.sync().await?;
        let Self {
            file,
            path,
            destination,
            options,
            ..
        } = self;
        drop(file);

        crate::publish(&path, &destination, &options).await?;
        tracing::debug!(destination = %destination.display(), "published staging file");
        Ok(destination)
    }

    /// Flush and keep the staging file where it is, returning its path.
    pub async fn abandon(mut self) -> Result<PathBuf> {
        self.file.flush().await.map_err(|source| Error::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(self.path)
    }

    /// Remove the staging file.
    pub async fn discard(self) -> Result<()> {
        let Self { file, path, .. } = self;
        drop(file);
        tokio::fs::remove_file(&path)
            .await
            .map_err(|source| Error::Write { path, source })
    }
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_staging_file_lives_beside_destination() -> Result<()> {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("archive.iso");
        let staging = StagingFile::create(&destination, StagingOptions::new()).await?;

        assert_eq!(staging.path().parent(), Some(dir.path()));
        assert_eq!(staging.destination(), destination);
        let name = staging.path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".archive.iso."));
        assert!(name.ends_with(".part"));
        assert!(!destination.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_append_tracks_length() -> Result<()> {
        let dir = tempdir().unwrap();
        let mut staging =
            StagingFile::create(dir.path().join("out.bin"), StagingOptions::new()).await?;
        assert!(staging.is_empty());

        staging.append(b"hello ").await?;
        staging.append(b"world").await?;
        staging.sync().await?;

        assert_eq!(staging.len(), 11);
        assert_eq!(std::fs::read(staging.path()).unwrap(), b"hello world");
        Ok(())
    }

    #[tokio::test]
    async fn test_custom_staging_dir_is_created() -> Result<()> {
        let dir = tempdir().unwrap();
        let staging_dir = dir.path().join("nested").join("staging");
        let options = StagingOptions::new().staging_dir(&staging_dir);
        let staging = StagingFile::create(dir.path().join("out.bin"), options).await?;

        assert!(staging_dir.is_dir());
        assert_eq!(staging.path().parent(), Some(staging_dir.as_path()));
        Ok(())
    }

    #[tokio::test]
    async fn test_abandon_keeps_bytes_on_disk() -> Result<()> {
        let dir = tempdir().unwrap();
        let destination = dir.path().join("out.bin");
        let mut staging = StagingFile::create(&destination, StagingOptions::new()).await?;
        staging.append(b"partial").await?;

        let kept = staging.abandon().await?;

        assert_eq!(std::fs::read(&kept).unwrap(), b"partial");
        assert!(!destination.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_discard_removes_file() -> Result<()> {
        let dir = tempdir().unwrap();
        let staging = StagingFile::create(dir.path().join("out.bin"), StagingOptions::new()).await?;
        let path = staging.path().to_path_buf();

        staging.discard().await?;

        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("file.bin")), Path::new("."));
        assert_eq!(parent_dir(Path::new("/tmp/file.bin")), Path::new("/tmp"));
    }
}
