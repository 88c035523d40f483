use std::sync::Arc;

use crate::config::DataConfig;
use crate::error::Result;
use crate::frames::{FrameCollection, FrameLoader, StartOffsets};
use crate::iterator::SequenceBatcher;
use crate::split::Split;

/// Builds train and test cursors from one [`DataConfig`].
#[derive(Clone, Debug)]
pub struct DataProvider {
    config: DataConfig,
    loader: FrameLoader,
}

impl DataProvider {
    pub fn new(config: DataConfig) -> Result<Self> {
        config.validate()?;
        let loader = FrameLoader::new(&config);
        Ok(Self { config, loader })
    }

    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    /// Loads `mode` ("train" or "test") from the first configured path.
    pub fn load_data(&self, mode: &str) -> Result<(FrameCollection, StartOffsets)> {
        let split: Split = mode.parse()?;
        self.loader.load(self.config.data_path()?, split)
    }

    pub fn handle(&self, split: Split) -> Result<SequenceBatcher> {
        let (frames, offsets) = self.loader.load(self.config.data_path()?, split)?;
        SequenceBatcher::new(Arc::new(frames), offsets, &self.config)
    }

    pub fn train_handle(&self) -> Result<SequenceBatcher> {
        self.handle(Split::Train)
    }

    pub fn test_handle(&self) -> Result<SequenceBatcher> {
        self.handle(Split::Test)
    }
}
