use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// Which part of the frame directory a loader reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    /// Everything except the held-out final frame group.
    Train,
    /// All frames, so the held-out frame can be predicted.
    Test,
}

impl Split {
    pub fn admits(&self, file_name: &str, held_out_prefix: &str) -> bool {
        match self {
            Split::Train => !file_name.starts_with(held_out_prefix),
            Split::Test => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
        }
    }
}

impl FromStr for Split {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            other => Err(DataError::config(format!("unexpected split: {other}"))),
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
