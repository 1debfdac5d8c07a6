use persist_fs::{Result, StagingFile, StagingOptions, ensure_space};
use tempfile::tempdir;

#[tokio::test]
async fn test_publish_makes_complete_file_visible() -> Result<()> {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("image.bin");

    let mut staging = StagingFile::create(&destination, StagingOptions::new()).await?;
    for chunk in [b"abc".as_slice(), b"def", b"ghi"] {
        staging.append(chunk).await?;
        assert!(!destination.exists());
    }
    let staged_at = staging.path().to_path_buf();

    let published = staging.publish().await?;

    assert_eq!(published, destination);
    assert_eq!(std::fs::read(&destination).unwrap(), b"abcdefghi");
    assert!(!staged_at.exists());
    Ok(())
}

#[tokio::test]
async fn test_publish_from_separate_staging_dir() -> Result<()> {
    let dir = tempdir().unwrap();
    let staging_dir = tempdir().unwrap();
    let destination = dir.path().join("image.bin");

    let options = StagingOptions::new().staging_dir(staging_dir.path()).sync(false);
    let mut staging = StagingFile::create(&destination, options).await?;
    staging.append(b"payload").await?;
    staging.publish().await?;

    assert_eq!(std::fs::read(&destination).unwrap(), b"payload");
    assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_two_sessions_get_distinct_staging_files() -> Result<()> {
    let dir = tempdir().unwrap();
    let destination = dir.path().join("same.bin");

    let first = StagingFile::create(&destination, StagingOptions::new()).await?;
    let second = StagingFile::create(&destination, StagingOptions::new()).await?;

    assert_ne!(first.path(), second.path());
    Ok(())
}

#[test]
fn test_ensure_space_for_empty_file() {
    let dir = tempdir().unwrap();
    assert!(ensure_space(dir.path(), 0).is_ok());
}
