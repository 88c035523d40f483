use std::sync::Arc;

use burn::data::dataloader::batcher::Batcher;
use burn::prelude::*;
use ndarray::{s, Array5};
use rand::Rng;
use serde::Serialize;

use crate::batcher::{FrameSequenceBatch, FrameSequenceBatcher};
use crate::config::{DataConfig, InputDataType};
use crate::dataset::SequenceDataset;
use crate::error::Result;
use crate::frames::{FrameCollection, StartOffsets};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorState {
    Uninitialized,
    Ready,
    Exhausted,
}

/// A dense `(minibatch, seq_length, width, width, 1)` batch in the
/// configured element precision.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchTensor {
    Float32(Array5<f32>),
    Float64(Array5<f64>),
}

impl BatchTensor {
    pub fn shape(&self) -> [usize; 5] {
        let dim = match self {
            BatchTensor::Float32(a) => a.dim(),
            BatchTensor::Float64(a) => a.dim(),
        };
        [dim.0, dim.1, dim.2, dim.3, dim.4]
    }

    pub fn data_type(&self) -> InputDataType {
        match self {
            BatchTensor::Float32(_) => InputDataType::Float32,
            BatchTensor::Float64(_) => InputDataType::Float64,
        }
    }

    pub fn to_f32(&self) -> Array5<f32> {
        match self {
            BatchTensor::Float32(a) => a.clone(),
            BatchTensor::Float64(a) => a.mapv(|v| v as f32),
        }
    }

    pub fn into_tensor<B: Backend>(self, device: &B::Device) -> Tensor<B, 5> {
        let shape = Shape::new(self.shape());
        match self {
            BatchTensor::Float32(a) => {
                Tensor::from_data(Data::new(a.into_raw_vec(), shape).convert(), device)
            }
            BatchTensor::Float64(a) => {
                Tensor::from_data(Data::new(a.into_raw_vec(), shape).convert(), device)
            }
        }
    }
}

/// Snapshot of a cursor for diagnostics.
#[derive(Clone, Debug, Serialize)]
pub struct HandleStats {
    pub name: String,
    pub state: CursorState,
    pub current_position: usize,
    pub minibatch_size: usize,
    pub total: usize,
    pub seq_length: usize,
    pub input_data_type: &'static str,
}

/// Serves shuffled minibatches of sequence windows, one epoch per `begin`.
///
/// Drive it as `begin`, then `fetch` / `advance` while `has_more`. Once fewer
/// than a full minibatch of offsets remains the cursor is exhausted and the
/// tail of the epoch is dropped; `fetch` then returns `None` until the next
/// `begin`.
pub struct SequenceBatcher {
    name: String,
    dataset: SequenceDataset,
    frames: Arc<FrameCollection>,
    offsets: StartOffsets,
    minibatch_size: usize,
    seq_length: usize,
    input_data_type: InputDataType,
    state: CursorState,
    current_position: usize,
    current_batch_offsets: Vec<usize>,
}

impl SequenceBatcher {
    pub fn new(
        frames: Arc<FrameCollection>,
        offsets: StartOffsets,
        config: &DataConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: config.name.clone(),
            dataset: SequenceDataset::new(frames.clone(), config.seq_length),
            frames,
            offsets,
            minibatch_size: config.minibatch_size,
            seq_length: config.seq_length,
            input_data_type: config.input_data_type,
            state: CursorState::Uninitialized,
            current_position: 0,
            current_batch_offsets: Vec::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn total(&self) -> usize {
        self.offsets.len()
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn current_position(&self) -> usize {
        self.current_position
    }

    /// Offsets of the batch `fetch` would serve. Stale once exhausted.
    pub fn current_batch_offsets(&self) -> &[usize] {
        &self.current_batch_offsets
    }

    pub fn frames(&self) -> &Arc<FrameCollection> {
        &self.frames
    }

    pub fn begin(&mut self, shuffle: bool) {
        self.begin_with_rng(shuffle, &mut rand::thread_rng());
    }

    pub fn begin_with_rng<R: Rng + ?Sized>(&mut self, shuffle: bool, rng: &mut R) {
        tracing::info!("Initialization for read data: {}", self.name);
        if shuffle {
            self.offsets.shuffle(rng);
        }
        self.current_position = 0;
        let end = self.minibatch_size.min(self.total());
        self.current_batch_offsets = self.offsets.as_slice()[..end].to_vec();
        self.state = if self.no_batch_left() {
            CursorState::Exhausted
        } else {
            CursorState::Ready
        };
    }

    pub fn has_more(&self) -> bool {
        self.state == CursorState::Ready
    }

    pub fn advance(&mut self) {
        if self.state == CursorState::Uninitialized {
            tracing::warn!("advance() on {} before begin(); ignoring", self.name);
            return;
        }
        self.current_position += self.minibatch_size;
        if self.no_batch_left() {
            // the previous batch stays in place but is no longer served
            self.state = CursorState::Exhausted;
            return;
        }
        let end = self.current_position + self.minibatch_size;
        self.current_batch_offsets = self.offsets.as_slice()[self.current_position..end].to_vec();
        self.state = CursorState::Ready;
    }

    /// Copies the current batch out of the frame collection.
    pub fn fetch(&self) -> Option<BatchTensor> {
        if !self.has_more() {
            self.log_exhausted();
            return None;
        }

        let mut batch = Array5::<f32>::zeros((
            self.minibatch_size,
            self.seq_length,
            self.frames.width(),
            self.frames.width(),
            1,
        ));
        for (i, &offset) in self.current_batch_offsets.iter().enumerate() {
            batch
                .slice_mut(s![i, .., .., .., ..])
                .assign(&self.frames.sequence(offset, self.seq_length));
        }

        Some(match self.input_data_type {
            InputDataType::Float32 => BatchTensor::Float32(batch),
            InputDataType::Float64 => BatchTensor::Float64(batch.mapv(f64::from)),
        })
    }

    /// Like [`fetch`](Self::fetch), but assembled on a burn device.
    pub fn fetch_with<B: Backend>(
        &self,
        batcher: &FrameSequenceBatcher<B>,
    ) -> Option<FrameSequenceBatch<B>> {
        if !self.has_more() {
            self.log_exhausted();
            return None;
        }
        let items = self
            .current_batch_offsets
            .iter()
            .map(|&offset| self.dataset.window(offset))
            .collect::<Option<Vec<_>>>()?;
        Some(batcher.batch(items))
    }

    /// A burn batcher shaped for this cursor's sequences.
    pub fn batcher<B: Backend>(&self, device: B::Device) -> FrameSequenceBatcher<B> {
        FrameSequenceBatcher::new(device, self.seq_length, self.frames.width())
    }

    pub fn stats(&self) -> HandleStats {
        HandleStats {
            name: self.name.clone(),
            state: self.state,
            current_position: self.current_position,
            minibatch_size: self.minibatch_size,
            total: self.total(),
            seq_length: self.seq_length,
            input_data_type: self.input_data_type.as_str(),
        }
    }

    pub fn print_stat(&self) {
        tracing::info!("Iterator Name: {}", self.name);
        tracing::info!("    current_position: {}", self.current_position);
        tracing::info!("    Minibatch Size: {}", self.minibatch_size);
        tracing::info!("    total Size: {}", self.total());
        tracing::info!("    current_input_length: {}", self.seq_length);
        tracing::info!("    Input Data Type: {}", self.input_data_type.as_str());
    }

    fn no_batch_left(&self) -> bool {
        self.current_position + self.minibatch_size >= self.total()
    }

    fn log_exhausted(&self) {
        tracing::error!(
            "There is no batch left in {}. Call begin() to rescan from the start",
            self.name
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use burn::backend::NdArray;
    use ndarray::Array4;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::error::DataError;

    fn config(seq_length: usize, minibatch_size: usize) -> DataConfig {
        DataConfig::new(vec!["unused".into()], 2, seq_length, minibatch_size, "cursor".into())
    }

    /// Frame `f` is filled with `f / count`, so every value lies in [0, 1)
    /// and identifies its frame.
    fn cursor(frame_count: usize, config: &DataConfig) -> SequenceBatcher {
        let data = Array4::from_shape_fn((frame_count, 2, 2, 1), |(f, _, _, _)| {
            f as f32 / frame_count as f32
        });
        let frames = Arc::new(FrameCollection::new(data));
        let offsets = StartOffsets::new(frame_count, config.seq_length).unwrap();
        SequenceBatcher::new(frames, offsets, config).unwrap()
    }

    #[test]
    fn unshuffled_epoch_drops_the_tail() {
        // 12 frames, length 3 -> 10 offsets
        let mut cursor = cursor(12, &config(3, 4));
        assert_eq!(cursor.total(), 10);

        cursor.begin(false);
        assert!(cursor.has_more());
        assert_eq!(cursor.current_batch_offsets(), &[0, 1, 2, 3]);
        assert!(cursor.fetch().is_some());

        cursor.advance();
        assert!(cursor.has_more());
        assert_eq!(cursor.current_batch_offsets(), &[4, 5, 6, 7]);

        cursor.advance();
        assert!(!cursor.has_more());
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert!(cursor.fetch().is_none());
    }

    #[test]
    fn fetch_before_begin_is_empty() {
        let mut cursor = cursor(6, &config(2, 2));
        assert_eq!(cursor.state(), CursorState::Uninitialized);
        assert!(!cursor.has_more());
        assert!(cursor.fetch().is_none());

        cursor.advance();
        assert_eq!(cursor.current_position(), 0);
        assert_eq!(cursor.state(), CursorState::Uninitialized);
    }

    #[test]
    fn begin_recovers_from_exhaustion() {
        let mut cursor = cursor(5, &config(2, 2));
        cursor.begin(false);
        while cursor.has_more() {
            cursor.advance();
        }
        assert!(cursor.fetch().is_none());

        cursor.begin(false);
        assert_eq!(cursor.current_position(), 0);
        assert_eq!(cursor.current_batch_offsets(), &[0, 1]);
        assert!(cursor.fetch().is_some());
    }

    #[test]
    fn single_offset_never_serves() {
        let mut cursor = cursor(10, &config(10, 1));
        cursor.begin(false);
        assert_eq!(cursor.total(), 1);
        assert!(!cursor.has_more());
        assert!(cursor.fetch().is_none());
    }

    #[test]
    fn begin_exposes_first_window_even_when_exhausted() {
        // 3 offsets, minibatch 3
        let mut cursor = cursor(4, &config(2, 3));
        cursor.begin_with_rng(true, &mut StdRng::seed_from_u64(3));
        assert_eq!(cursor.state(), CursorState::Exhausted);
        assert_eq!(cursor.current_position(), 0);
        let mut offsets = cursor.current_batch_offsets().to_vec();
        offsets.sort_unstable();
        assert_eq!(offsets, vec![0, 1, 2]);
        assert!(cursor.fetch().is_none());
    }

    #[test]
    fn begin_replaces_previous_epoch_batch() {
        // 4 offsets, minibatch 4: never Ready, but begin still resets the window
        let mut cursor = cursor(5, &config(2, 4));
        cursor.begin(false);
        assert_eq!(cursor.current_batch_offsets(), &[0, 1, 2, 3]);

        // 6 offsets, minibatch 2
        let mut cursor = self::cursor(7, &config(2, 2));
        cursor.begin(false);
        cursor.advance();
        assert_eq!(cursor.current_batch_offsets(), &[2, 3]);
        cursor.advance();
        // stale after exhausting advance
        assert_eq!(cursor.current_batch_offsets(), &[2, 3]);
        cursor.begin(false);
        assert_eq!(cursor.current_batch_offsets(), &[0, 1]);
    }

    #[test]
    fn zero_minibatch_is_rejected() {
        let config = config(2, 0);
        let frames = Arc::new(FrameCollection::new(Array4::zeros((4, 2, 2, 1))));
        let offsets = StartOffsets::new(4, 2).unwrap();
        assert!(matches!(
            SequenceBatcher::new(frames, offsets, &config),
            Err(DataError::Configuration(_))
        ));
    }

    #[test]
    fn batch_holds_consecutive_frames() {
        let mut cursor = cursor(8, &config(3, 2));
        cursor.begin(false);
        cursor.advance();

        let batch = cursor.fetch().unwrap();
        assert_eq!(batch.shape(), [2, 3, 2, 2, 1]);
        let batch = batch.to_f32();
        for (slot, &offset) in cursor.current_batch_offsets().iter().enumerate() {
            for step in 0..3 {
                let expected = (offset + step) as f32 / 8.0;
                let frame = batch.slice(s![slot, step, .., .., ..]);
                assert!(frame.iter().all(|&v| v == expected));
            }
        }
        assert!(batch.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn unshuffled_begin_is_idempotent() {
        let mut cursor = cursor(9, &config(3, 2));
        cursor.begin(false);
        let first = cursor.fetch().unwrap();
        cursor.begin(false);
        assert_eq!(cursor.fetch().unwrap(), first);
    }

    #[test]
    fn shuffle_permutes_offsets() {
        let mut cursor = cursor(23, &config(4, 5));
        let mut rng = StdRng::seed_from_u64(7);

        let mut seen = Vec::new();
        cursor.begin_with_rng(true, &mut rng);
        while cursor.has_more() {
            seen.extend_from_slice(cursor.current_batch_offsets());
            assert_eq!(cursor.fetch().unwrap().shape(), [5, 4, 2, 2, 1]);
            cursor.advance();
        }
        // 20 offsets, minibatch 5: the final full window is dropped
        assert_eq!(seen.len(), 15);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 15);
        assert!(seen.iter().all(|&o| o < 20));
    }

    #[test]
    fn float64_batches_keep_values() {
        let config = config(2, 2).with_input_data_type(InputDataType::Float64);
        let mut cursor = cursor(4, &config);
        cursor.begin(false);
        match cursor.fetch().unwrap() {
            BatchTensor::Float64(batch) => {
                assert_eq!(batch.dim(), (2, 2, 2, 2, 1));
                assert_eq!(batch[[1, 1, 0, 0, 0]], 0.5);
            }
            other => panic!("unexpected precision {:?}", other.data_type()),
        }
    }

    #[test]
    fn burn_batch_matches_ndarray_batch() {
        let mut cursor = cursor(10, &config(3, 3));
        cursor.begin_with_rng(true, &mut StdRng::seed_from_u64(1));

        let batcher = cursor.batcher::<NdArray>(Default::default());
        let burn_batch = cursor.fetch_with(&batcher).unwrap();
        assert_eq!(burn_batch.offsets, cursor.current_batch_offsets());
        assert_eq!(burn_batch.sequences.dims(), [3, 3, 2, 2, 1]);

        let expected = cursor.fetch().unwrap().into_tensor::<NdArray>(&Default::default());
        assert_eq!(
            burn_batch.sequences.into_data().value,
            expected.into_data().value
        );

        while cursor.has_more() {
            cursor.advance();
        }
        assert!(cursor.fetch_with(&batcher).is_none());
    }

    #[test]
    fn stats_report_cursor() {
        let mut cursor = cursor(10, &config(3, 3));
        cursor.begin(false);
        cursor.advance();
        cursor.print_stat();
        let stats = cursor.stats();
        assert_eq!(stats.current_position, 3);
        assert_eq!(stats.total, 8);
        assert_eq!(stats.input_data_type, "float32");
        assert_eq!(stats.state, CursorState::Ready);
    }
}
