use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to create staging file in {}", path.display())]
    Create {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to sync {}", path.display())]
    Sync {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to publish {} to {}", from.display(), to.display())]
    Publish {
        from:   PathBuf,
        to:     PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not enough disk space in {}: need {needed} bytes, {available} usable", path.display())]
    InsufficientSpace {
        path:      PathBuf,
        needed:    u64,
        available: u64,
    },

    #[error("destination {} has no file name", path.display())]
    NoFileName { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
