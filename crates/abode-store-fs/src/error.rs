//! Error type for `abode-store-fs`.

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] abode_core::Error),

  #[error("cannot create directory {path:?}: {source}")]
  Directory {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("snapshot I/O failed at {path:?}: {source}")]
  Snapshot {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("snapshot {path:?} is corrupt: {source}")]
  Corrupt {
    path:   PathBuf,
    #[source]
    source: abode_core::Error,
  },

  #[error("upload I/O failed at {path:?}: {source}")]
  Upload {
    path:   PathBuf,
    #[source]
    source: io::Error,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
