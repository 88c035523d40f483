use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2, Array4, ArrayView4, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::DataConfig;
use crate::error::{DataError, Result};
use crate::resize::{normalize, resize_area};
use crate::split::Split;

/// Chronologically ordered frames, stored as `(frames, width, width, 1)`.
#[derive(Clone, Debug)]
pub struct FrameCollection {
    data: Array4<f32>,
}

impl FrameCollection {
    pub fn new(data: Array4<f32>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    pub fn data(&self) -> &Array4<f32> {
        &self.data
    }

    /// The `seq_length` consecutive frames starting at `offset`.
    ///
    /// Panics if the window runs past the last frame.
    pub fn sequence(&self, offset: usize, seq_length: usize) -> ArrayView4<'_, f32> {
        self.data.slice(s![offset..offset + seq_length, .., .., ..])
    }
}

/// Every index a full sequence can start from, in serving order.
///
/// Built once; afterwards it can only be reordered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartOffsets {
    offsets: Vec<usize>,
}

impl StartOffsets {
    pub fn new(frame_count: usize, seq_length: usize) -> Result<Self> {
        if seq_length == 0 || frame_count < seq_length {
            return Err(DataError::InsufficientFrames {
                frames: frame_count,
                seq_length,
            });
        }
        Ok(Self {
            offsets: (0..=frame_count - seq_length).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.offsets.shuffle(rng);
    }
}

/// Reads a directory of frame files into a [`FrameCollection`].
#[derive(Clone, Debug)]
pub struct FrameLoader {
    image_width: usize,
    seq_length: usize,
    held_out_prefix: String,
    extensions: Vec<String>,
}

impl FrameLoader {
    pub fn new(config: &DataConfig) -> Self {
        Self {
            image_width: config.image_width,
            seq_length: config.seq_length,
            held_out_prefix: config.held_out_prefix.clone(),
            extensions: config.extensions.clone(),
        }
    }

    /// Loads every frame of `split` from `dir` and the start offsets over them.
    pub fn load(&self, dir: impl AsRef<Path>, split: Split) -> Result<(FrameCollection, StartOffsets)> {
        let dir = dir.as_ref();
        tracing::info!("Begin loading frames from {} ({} split)", dir.display(), split);

        let files = self.frame_files(dir, split)?;
        if files.is_empty() {
            return Err(DataError::EmptyDataset {
                dir: dir.to_path_buf(),
            });
        }
        tracing::info!(
            "Loading {} frames for {} set, resizing to {}x{}",
            files.len(),
            split,
            self.image_width,
            self.image_width
        );

        let width = self.image_width;
        let mut data = Array4::<f32>::zeros((files.len(), width, width, 1));
        for (i, path) in files.iter().enumerate() {
            let raw = decode_luma(path)?;
            let (normalized, min, max) = normalize(&raw);
            if i == 0 {
                let (h, w) = raw.dim();
                tracing::info!(
                    "Original image size: {w}x{h}, value range [{min:.2}, {max:.2}]"
                );
            }
            let resized = resize_area(&normalized, width, width);
            data.slice_mut(s![i, .., .., 0]).assign(&resized);
            tracing::debug!("Loaded frame {}: {}", i, path.display());
        }

        let frames = FrameCollection::new(data);
        let offsets = StartOffsets::new(frames.len(), self.seq_length)?;
        tracing::info!(
            "Loaded {} frames, {} sequences of length {}",
            frames.len(),
            offsets.len(),
            self.seq_length
        );
        Ok((frames, offsets))
    }

    /// Eligible files for `split`, sorted lexicographically by name.
    fn frame_files(&self, dir: &Path, split: Split) -> Result<Vec<PathBuf>> {
        let io_err = |source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.has_frame_extension(&path) && split.admits(name, &self.held_out_prefix) {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    fn has_frame_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(false, |ext| self.extensions.iter().any(|known| known == ext))
    }
}

/// Decodes one file to a single intensity channel as `(height, width)`.
fn decode_luma(path: &Path) -> Result<Array2<f32>> {
    let img = image::open(path)
        .map_err(|source| DataError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma8();
    let (w, h) = img.dimensions();
    Ok(Array2::from_shape_fn((h as usize, w as usize), |(r, c)| {
        f32::from(img.get_pixel(c as u32, r as u32)[0])
    }))
}
