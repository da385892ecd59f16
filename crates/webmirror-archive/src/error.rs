use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nothing to archive: '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("failed to add '{path}' to archive: {source}")]
    Zip {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    #[error("filesystem operation failed: {source}")]
    Fs { source: webmirror_fs::Error },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<webmirror_fs::Error> for Error {
    fn from(e: webmirror_fs::Error) -> Self {
        Self::Fs { source: e }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
