pub mod batcher;
pub mod config;
pub mod dataset;
pub mod error;
pub mod frames;
pub mod grid;
pub mod iterator;
pub mod provider;
pub mod resize;
pub mod split;

pub use config::{DataConfig, InputDataType};
pub use error::{DataError, Result};
pub use frames::{FrameCollection, FrameLoader, StartOffsets};
pub use iterator::{BatchTensor, CursorState, SequenceBatcher};
pub use provider::DataProvider;
pub use split::Split;
