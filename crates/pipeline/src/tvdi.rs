//! TVDI computation
//!
//! Applies the fitted edge model to every joined frame:
//!
//! ```text
//! dry_edge_lst = ndvi * slope + intercept
//! tvdi = (lst - wet_edge) / (dry_edge_lst - wet_edge)   clamped to [0, 1]
//! ```
//!
//! Degenerate-denominator rule: when `dry_edge_lst <= wet_edge` the pixel
//! saturates before the division — 0 if the LST sits at or below the wet
//! edge, 1 otherwise. No non-finite value ever reaches the output.

use crate::edges::EdgeModel;
use crate::join::JoinedFrame;
use crate::maybe_rayon::*;
use ndarray::Array2;
use tvdi_core::raster::Raster;
use tvdi_core::series::{RasterSeries, TimedRaster};
use tvdi_core::{Error, Result};

/// Compute the TVDI raster for one joined frame
pub fn compute_tvdi_frame(
    lst: &Raster<f64>,
    ndvi: &Raster<f64>,
    model: &EdgeModel,
) -> Result<Raster<f64>> {
    let (rows, cols) = lst.shape();
    if ndvi.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: ndvi.rows(),
            ac: ndvi.cols(),
        });
    }

    let wet = model.wet_edge;
    let slope = model.dry_edge_slope;
    let intercept = model.dry_edge_intercept;

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let l = unsafe { lst.get_unchecked(row, col) };
                let n = unsafe { ndvi.get_unchecked(row, col) };

                if l.is_nan() || n.is_nan() {
                    continue;
                }

                let dry = n * slope + intercept;
                let denom = dry - wet;

                row_data[col] = if denom <= 0.0 {
                    // Dry edge at or below the wet edge: saturate
                    if l <= wet {
                        0.0
                    } else {
                        1.0
                    }
                } else {
                    ((l - wet) / denom).clamp(0.0, 1.0)
                };
            }
            row_data
        })
        .collect();

    let mut output = lst.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;

    Ok(output)
}

/// Compute the TVDI series for a joined series, preserving timestamps
pub fn compute_tvdi(joined: &[JoinedFrame], model: &EdgeModel) -> Result<RasterSeries> {
    let frames = joined
        .iter()
        .map(|j| {
            Ok(TimedRaster::new(
                j.timestamp,
                compute_tvdi_frame(&j.lst, &j.ndvi, model)?,
            ))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(RasterSeries::from_frames(frames))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model(wet: f64, slope: f64, intercept: f64) -> EdgeModel {
        EdgeModel {
            wet_edge: wet,
            dry_edge_slope: slope,
            dry_edge_intercept: intercept,
            is_fallback: false,
        }
    }

    #[test]
    fn test_known_value() {
        // dry = 0.5 * -10 + 45 = 40; tvdi = (20 - 10) / (40 - 10) = 1/3
        let lst = Raster::filled(2, 2, 20.0);
        let ndvi = Raster::filled(2, 2, 0.5);

        let tvdi = compute_tvdi_frame(&lst, &ndvi, &model(10.0, -10.0, 45.0)).unwrap();
        assert_relative_eq!(tvdi.get(1, 1).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_clamped_to_unit_interval() {
        // Hotter than the dry edge clamps to 1, colder than the wet edge to 0
        let lst = Raster::from_vec(vec![80.0, -5.0], 1, 2).unwrap();
        let ndvi = Raster::filled(1, 2, 0.5);

        let tvdi = compute_tvdi_frame(&lst, &ndvi, &model(10.0, -10.0, 45.0)).unwrap();
        assert_eq!(tvdi.get(0, 0).unwrap(), 1.0);
        assert_eq!(tvdi.get(0, 1).unwrap(), 0.0);
    }

    #[test]
    fn test_degenerate_dry_equals_wet() {
        // dry = 40, wet = 40: denominator zero, pixel must still be finite
        let lst = Raster::from_vec(vec![40.0, 41.0, 39.0], 1, 3).unwrap();
        let ndvi = Raster::filled(1, 3, 0.5);

        let tvdi = compute_tvdi_frame(&lst, &ndvi, &model(40.0, -10.0, 45.0)).unwrap();
        assert_eq!(tvdi.get(0, 0).unwrap(), 0.0); // lst == wet
        assert_eq!(tvdi.get(0, 1).unwrap(), 1.0); // lst above wet
        assert_eq!(tvdi.get(0, 2).unwrap(), 0.0); // lst below wet
    }

    #[test]
    fn test_randomized_clamp_invariant() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let lst_v: f64 = rng.random_range(-60.0..80.0);
            let ndvi_v: f64 = rng.random_range(-1.0..1.0);
            let wet: f64 = rng.random_range(-20.0..40.0);
            let slope: f64 = rng.random_range(-30.0..5.0);
            let intercept: f64 = rng.random_range(0.0..60.0);

            let lst = Raster::filled(1, 1, lst_v);
            let ndvi = Raster::filled(1, 1, ndvi_v);
            let tvdi = compute_tvdi_frame(&lst, &ndvi, &model(wet, slope, intercept)).unwrap();

            let v = tvdi.get(0, 0).unwrap();
            assert!((0.0..=1.0).contains(&v), "tvdi {v} out of range");
        }
    }

    #[test]
    fn test_masked_pixels_stay_masked() {
        let lst = Raster::from_vec(vec![20.0, f64::NAN], 1, 2).unwrap();
        let ndvi = Raster::from_vec(vec![f64::NAN, 0.5], 1, 2).unwrap();

        let tvdi = compute_tvdi_frame(&lst, &ndvi, &model(10.0, -10.0, 45.0)).unwrap();
        assert!(tvdi.get(0, 0).unwrap().is_nan());
        assert!(tvdi.get(0, 1).unwrap().is_nan());
    }

    #[test]
    fn test_series_preserves_timestamps() {
        use chrono::{TimeZone, Utc};
        let t0 = Utc.with_ymd_and_hms(2023, 4, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2023, 4, 9, 0, 0, 0).unwrap();
        let joined: Vec<JoinedFrame> = [t0, t1]
            .iter()
            .map(|&timestamp| JoinedFrame {
                timestamp,
                lst: Raster::filled(2, 2, 20.0),
                ndvi: Raster::filled(2, 2, 0.5),
            })
            .collect();

        let series = compute_tvdi(&joined, &model(10.0, -10.0, 45.0)).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.start(), Some(t0));
        assert_eq!(series.end(), Some(t1));
    }
}
