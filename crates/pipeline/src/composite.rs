//! Temporal composites
//!
//! Per-pixel reductions across an entire frame sequence. These are the
//! two synchronization points of the pipeline: the median composite
//! feeding the edge fit, and the mean composite feeding classification.
//! A pixel with zero valid observations across the sequence stays NaN.

use crate::maybe_rayon::*;
use ndarray::Array2;
use tvdi_core::raster::Raster;
use tvdi_core::{Error, Result};

/// Per-pixel temporal median of a frame sequence.
///
/// NaN observations are skipped; for an even count the middle two values
/// are averaged.
pub fn median_composite(frames: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let (rows, cols) = check_frames(frames)?;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let mut values: Vec<f64> = frames
                    .iter()
                    .map(|f| unsafe { f.get_unchecked(row, col) })
                    .filter(|v| !v.is_nan())
                    .collect();

                if values.is_empty() {
                    continue;
                }

                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let n = values.len();
                row_data[col] = if n % 2 == 0 {
                    (values[n / 2 - 1] + values[n / 2]) / 2.0
                } else {
                    values[n / 2]
                };
            }
            row_data
        })
        .collect();

    build_output(frames[0], rows, cols, data)
}

/// Per-pixel temporal mean of a frame sequence, skipping NaN observations
pub fn mean_composite(frames: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let (rows, cols) = check_frames(frames)?;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let mut sum = 0.0;
                let mut count = 0usize;
                for f in frames {
                    let v = unsafe { f.get_unchecked(row, col) };
                    if !v.is_nan() {
                        sum += v;
                        count += 1;
                    }
                }
                if count > 0 {
                    row_data[col] = sum / count as f64;
                }
            }
            row_data
        })
        .collect();

    build_output(frames[0], rows, cols, data)
}

fn check_frames(frames: &[&Raster<f64>]) -> Result<(usize, usize)> {
    let first = frames.first().ok_or(Error::EmptySeries)?;
    let (rows, cols) = first.shape();
    for f in &frames[1..] {
        if f.shape() != (rows, cols) {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: f.rows(),
                ac: f.cols(),
            });
        }
    }
    Ok((rows, cols))
}

fn build_output(
    reference: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = reference.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
