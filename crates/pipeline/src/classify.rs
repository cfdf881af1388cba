//! Drought classification
//!
//! The TVDI series is reduced to its per-pixel temporal mean, then
//! bucketed into five ordinal classes with closed upper bounds:
//! mean <= 0.2 -> 1, <= 0.4 -> 2, <= 0.6 -> 3, <= 0.8 -> 4, else 5.
//! Pixels with no valid observation across the whole series stay
//! unclassified (nodata 0).

use crate::composite::mean_composite;
use crate::maybe_rayon::*;
use ndarray::Array2;
use tvdi_core::raster::Raster;
use tvdi_core::series::RasterSeries;
use tvdi_core::Result;

/// Nodata value of the class raster (unclassified)
pub const CLASS_NODATA: u8 = 0;

/// Human-readable label for a drought class
pub fn class_label(class: u8) -> &'static str {
    match class {
        1 => "Very Wet (0-0.2)",
        2 => "Wet (0.2-0.4)",
        3 => "Normal (0.4-0.6)",
        4 => "Dry (0.6-0.8)",
        5 => "Very Dry (0.8-1)",
        _ => "Unclassified",
    }
}

/// Map a mean TVDI value to its drought class (closed upper bounds)
pub fn drought_class(mean_tvdi: f64) -> u8 {
    if mean_tvdi <= 0.2 {
        1
    } else if mean_tvdi <= 0.4 {
        2
    } else if mean_tvdi <= 0.6 {
        3
    } else if mean_tvdi <= 0.8 {
        4
    } else {
        5
    }
}

/// Classify a mean-TVDI raster into the five drought classes
pub fn classify_mean_tvdi(mean_tvdi: &Raster<f64>) -> Result<Raster<u8>> {
    let (rows, cols) = mean_tvdi.shape();

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![CLASS_NODATA; cols];
            for col in 0..cols {
                let v = unsafe { mean_tvdi.get_unchecked(row, col) };
                if !v.is_nan() {
                    row_data[col] = drought_class(v);
                }
            }
            row_data
        })
        .collect();

    let mut output = mean_tvdi.with_same_meta::<u8>(rows, cols);
    output.set_nodata(Some(CLASS_NODATA));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), data)
        .map_err(|e| tvdi_core::Error::Other(e.to_string()))?;

    Ok(output)
}

/// Temporal mean of a TVDI series followed by classification
pub fn classify(tvdi_series: &RasterSeries) -> Result<Raster<u8>> {
    let frames: Vec<&Raster<f64>> = tvdi_series.iter().map(|f| &f.raster).collect();
    let mean = mean_composite(&frames)?;
    classify_mean_tvdi(&mean)
}
