use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops, Rgb, RgbImage};
use serde::Serialize;
use thiserror::Error;

/// Gap in pixels between neighbouring images and between the two rows.
pub const SPACING: u32 = 5;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("no ground truth images found in {0}")]
    NoGroundTruth(PathBuf),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image error for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct GridSummary {
    pub columns: Vec<u32>,
    pub bottom_labels: Vec<String>,
    pub width: u32,
    pub height: u32,
}

/// Parses `GT12.png` style names into their numeric index.
fn indexed(name: &str, prefix: &str) -> Option<u32> {
    if name.len() < prefix.len() + 4
        || !name.is_char_boundary(prefix.len())
        || !name.is_char_boundary(name.len() - 4)
    {
        return None;
    }
    let (head, rest) = name.split_at(prefix.len());
    let (num, ext) = rest.split_at(rest.len() - 4);
    if !head.eq_ignore_ascii_case(prefix) || !ext.eq_ignore_ascii_case(".png") {
        return None;
    }
    num.parse().ok()
}

fn open_rgb(path: &Path) -> Result<RgbImage, GridError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|source| GridError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// Lays ground truth (`GT<n>.png`) over predictions (`PD<n>.png`) in a
/// two-row grid and writes it to `output_path`.
///
/// The top row holds every ground truth image in index order. The bottom row
/// uses the prediction for an index where one exists, the ground truth
/// otherwise. All images are assumed to share the first one's size.
pub fn create_comparison_grid(
    input_dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<GridSummary, GridError> {
    let input_dir = input_dir.as_ref();
    let output_path = output_path.as_ref();
    tracing::info!("Loading images from {}", input_dir.display());

    let io_err = |source| GridError::Io {
        path: input_dir.to_path_buf(),
        source,
    };
    let mut gt_files = BTreeMap::new();
    let mut pd_files = BTreeMap::new();
    for entry in fs::read_dir(input_dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some(idx) = indexed(name, "GT") {
            gt_files.insert(idx, path);
        } else if let Some(idx) = indexed(name, "PD") {
            pd_files.insert(idx, path);
        }
    }

    if gt_files.is_empty() {
        return Err(GridError::NoGroundTruth(input_dir.to_path_buf()));
    }
    let columns: Vec<u32> = gt_files.keys().copied().collect();
    tracing::info!("Found {} ground truth images: {:?}", columns.len(), columns);
    tracing::info!(
        "Found {} prediction images: {:?}",
        pd_files.len(),
        pd_files.keys().collect::<Vec<_>>()
    );

    let top_row = gt_files
        .values()
        .map(|path| open_rgb(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut bottom_row = Vec::with_capacity(columns.len());
    let mut bottom_labels = Vec::with_capacity(columns.len());
    for (&idx, gt_path) in &gt_files {
        match pd_files.get(&idx) {
            Some(pd_path) => {
                bottom_row.push(open_rgb(pd_path)?);
                bottom_labels.push(format!("PD{idx}"));
            }
            None => {
                bottom_row.push(open_rgb(gt_path)?);
                bottom_labels.push(format!("GT{idx}"));
            }
        }
    }
    tracing::info!("Bottom row composition: {}", bottom_labels.join(", "));

    let (img_w, img_h) = top_row[0].dimensions();
    let n = columns.len() as u32;
    let width = img_w * n + SPACING * (n - 1);
    let height = img_h * 2 + SPACING;

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    for (i, img) in top_row.iter().enumerate() {
        let x = i as i64 * (img_w + SPACING) as i64;
        imageops::replace(&mut canvas, img, x, 0);
    }
    for (i, img) in bottom_row.iter().enumerate() {
        let x = i as i64 * (img_w + SPACING) as i64;
        imageops::replace(&mut canvas, img, x, (img_h + SPACING) as i64);
    }

    canvas.save(output_path).map_err(|source| GridError::Image {
        path: output_path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        "Comparison grid saved to {} ({}x{})",
        output_path.display(),
        width,
        height
    );

    Ok(GridSummary {
        columns,
        bottom_labels,
        width,
        height,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    fn solid(dir: &Path, name: &str, value: u8) {
        RgbImage::from_pixel(4, 3, Rgb([value; 3]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn parses_indexed_names() {
        assert_eq!(indexed("GT12.png", "GT"), Some(12));
        assert_eq!(indexed("gt3.PNG", "GT"), Some(3));
        assert_eq!(indexed("GTx.png", "GT"), None);
        assert_eq!(indexed("PD1.png", "GT"), None);
        assert_eq!(indexed("GT1.jpg", "GT"), None);
        assert_eq!(indexed("GT", "GT"), None);
    }

    #[test]
    fn predictions_replace_bottom_row() {
        let dir = TempDir::new().unwrap();
        for i in 1..=3 {
            solid(dir.path(), &format!("GT{i}.png"), 10);
        }
        solid(dir.path(), "PD3.png", 200);
        solid(dir.path(), "notes.png", 0);
        let out = dir.path().join("comparison.png");

        let summary = create_comparison_grid(dir.path(), &out).unwrap();
        assert_eq!(summary.columns, vec![1, 2, 3]);
        assert_eq!(summary.bottom_labels, vec!["GT1", "GT2", "PD3"]);
        assert_eq!((summary.width, summary.height), (4 * 3 + 5 * 2, 3 * 2 + 5));

        let grid = image::open(&out).unwrap().to_rgb8();
        assert_eq!(grid.dimensions(), (22, 11));
        // top-left GT, spacing stays white, bottom-right PD
        assert_eq!(grid.get_pixel(0, 0), &Rgb([10; 3]));
        assert_eq!(grid.get_pixel(4, 0), &Rgb([255; 3]));
        assert_eq!(grid.get_pixel(0, 3), &Rgb([255; 3]));
        assert_eq!(grid.get_pixel(18, 8), &Rgb([200; 3]));
        assert_eq!(grid.get_pixel(9, 8), &Rgb([10; 3]));
    }

    #[test]
    fn missing_ground_truth_fails() {
        let dir = TempDir::new().unwrap();
        solid(dir.path(), "PD1.png", 200);
        let out = dir.path().join("comparison.png");
        assert!(matches!(
            create_comparison_grid(dir.path(), out),
            Err(GridError::NoGroundTruth(_))
        ));
    }
}
