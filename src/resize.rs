use ndarray::{Array2, Axis};

/// Rescales `frame` linearly onto [0, 1].
///
/// A constant frame has no range to stretch and is returned unchanged.
/// Returns the original `(min, max)` alongside the result.
pub fn normalize(frame: &Array2<f32>) -> (Array2<f32>, f32, f32) {
    let (min, max) = value_range(frame);
    if max > min {
        let span = max - min;
        (frame.mapv(|v| (v - min) / span), min, max)
    } else {
        (frame.clone(), min, max)
    }
}

pub fn value_range(frame: &Array2<f32>) -> (f32, f32) {
    frame
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}

/// Area-averaging resize to `height x width`.
///
/// Every output pixel covers a rectangle of the source grid and takes the
/// mean of the source pixels under it, weighted by overlap.
pub fn resize_area(frame: &Array2<f32>, height: usize, width: usize) -> Array2<f32> {
    let (src_h, src_w) = frame.dim();
    if (src_h, src_w) == (height, width) {
        return frame.clone();
    }

    let col_weights = area_weights(src_w, width);
    let row_weights = area_weights(src_h, height);

    // Columns first: (src_h, src_w) -> (src_h, width).
    let mut narrow = Array2::<f32>::zeros((src_h, width));
    for (src_row, mut dst_row) in frame.axis_iter(Axis(0)).zip(narrow.axis_iter_mut(Axis(0))) {
        for (dst, taps) in dst_row.iter_mut().zip(&col_weights) {
            *dst = taps.iter().map(|&(i, w)| src_row[i] * w).sum();
        }
    }

    let mut out = Array2::<f32>::zeros((height, width));
    for (mut dst_row, taps) in out.axis_iter_mut(Axis(0)).zip(&row_weights) {
        for &(i, w) in taps {
            dst_row.scaled_add(w, &narrow.row(i));
        }
    }
    out
}

/// For each destination index, the source indices it covers and their weights.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|s| {
                    let overlap = end.min((s + 1) as f64) - start.max(s as f64);
                    (overlap > 1e-9).then(|| (s, (overlap / (end - start)) as f32))
                })
                .collect()
        })
        .collect()
}
