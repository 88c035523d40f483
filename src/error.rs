use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataError>;

/// Failures raised while configuring or loading a frame dataset.
///
/// Running out of batches is not represented here: an exhausted
/// [`SequenceBatcher`](crate::iterator::SequenceBatcher) returns `None`.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no frame files found in {dir}")]
    EmptyDataset { dir: PathBuf },

    #[error("{frames} frames cannot hold a sequence of length {seq_length}")]
    InsufficientFrames { frames: usize, seq_length: usize },

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

impl DataError {
    pub fn config(msg: impl Into<String>) -> Self {
        DataError::Configuration(msg.into())
    }
}
