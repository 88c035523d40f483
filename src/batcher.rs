use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::dataset::SequenceItem;

/// Stacks sequence windows into a `(batch, seq_length, width, width, 1)` tensor.
#[derive(Clone, Debug)]
pub struct FrameSequenceBatcher<B: Backend> {
    device: B::Device,
    seq_length: usize,
    width: usize,
}

#[derive(Clone, Debug)]
pub struct FrameSequenceBatch<B: Backend> {
    pub sequences: Tensor<B, 5>,
    /// Start offset of each sequence, in batch order.
    pub offsets: Vec<usize>,
}

impl<B: Backend> FrameSequenceBatcher<B> {
    pub fn new(device: B::Device, seq_length: usize, width: usize) -> Self {
        Self {
            device,
            seq_length,
            width,
        }
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }
}

impl<B: Backend> Batcher<SequenceItem, FrameSequenceBatch<B>> for FrameSequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceItem>) -> FrameSequenceBatch<B> {
        let shape = Shape::new([1, self.seq_length, self.width, self.width, 1]);

        let offsets = items.iter().map(|item| item.offset).collect();
        let sequences = items
            .into_iter()
            .map(|item| Data::new(item.pixels, shape.clone()))
            .map(|data| Tensor::<B, 5>::from_data(data.convert(), &self.device))
            .collect();

        let sequences = Tensor::cat(sequences, 0);

        FrameSequenceBatch { sequences, offsets }
    }
}
