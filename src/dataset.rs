use std::sync::Arc;

use burn::data::dataset::Dataset;

use crate::frames::FrameCollection;

/// One sequence window: `seq_length` frames of `width x width`, flattened
/// frame-major with a trailing single channel.
#[derive(Clone, Debug)]
pub struct SequenceItem {
    pub offset: usize,
    pub pixels: Vec<f32>,
}

/// Random access to sequence windows; index `i` is the window starting at frame `i`.
#[derive(Clone, Debug)]
pub struct SequenceDataset {
    frames: Arc<FrameCollection>,
    seq_length: usize,
}

impl SequenceDataset {
    pub fn new(frames: Arc<FrameCollection>, seq_length: usize) -> Self {
        Self { frames, seq_length }
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    pub fn width(&self) -> usize {
        self.frames.width()
    }

    /// The window starting at frame `offset`, or `None` if it would overrun.
    pub fn window(&self, offset: usize) -> Option<SequenceItem> {
        if offset + self.seq_length > self.frames.len() {
            return None;
        }
        let pixels = self
            .frames
            .sequence(offset, self.seq_length)
            .iter()
            .copied()
            .collect();
        Some(SequenceItem { offset, pixels })
    }
}

impl Dataset<SequenceItem> for SequenceDataset {
    fn get(&self, index: usize) -> Option<SequenceItem> {
        self.window(index)
    }

    fn len(&self) -> usize {
        (self.frames.len() + 1).saturating_sub(self.seq_length)
    }
}
