//! Product decoding and quality masking
//!
//! Converts raw satellite product frames (integer digital numbers plus a
//! per-pixel quality band) into cleaned physical-unit frames. Pixels that
//! fail the quality test, or whose quality code is itself missing, come
//! out as NaN; nothing here is an error path.

use crate::maybe_rayon::*;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use tvdi_core::raster::{Raster, RasterElement};
use tvdi_core::series::{RasterSeries, TimedRaster};
use tvdi_core::{Error, Result};

/// Scale factor applied to LST digital numbers (product convention)
pub const LST_SCALE: f64 = 0.02;
/// Kelvin to Celsius offset
pub const KELVIN_OFFSET: f64 = 273.15;
/// Divisor mapping integer NDVI digital numbers to [-1, 1]
pub const NDVI_SCALE: f64 = 10_000.0;
/// Highest quality code still accepted ("good" and "other" quality)
pub const MAX_ACCEPTED_QUALITY: u8 = 1;

/// A raw product frame: one value band and one quality band on the same grid
#[derive(Debug, Clone)]
pub struct RawFrame<T: RasterElement> {
    pub timestamp: DateTime<Utc>,
    pub values: Raster<T>,
    pub quality: Raster<u8>,
}

impl<T: RasterElement> RawFrame<T> {
    pub fn new(timestamp: DateTime<Utc>, values: Raster<T>, quality: Raster<u8>) -> Self {
        Self {
            timestamp,
            values,
            quality,
        }
    }
}

/// Decode one LST frame.
///
/// The low two bits of the quality code are the confidence level; the two
/// lowest of its four levels are accepted. Accepted digital numbers are
/// rescaled to degrees Celsius (`dn * 0.02 - 273.15`), everything else
/// becomes NaN.
pub fn clean_lst_frame(dn: &Raster<u16>, qc: &Raster<u8>) -> Result<Raster<f64>> {
    check_dimensions(dn, qc)?;

    let (rows, cols) = dn.shape();
    let nodata_dn = dn.nodata();
    let nodata_qc = qc.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { dn.get_unchecked(row, col) };
                let q = unsafe { qc.get_unchecked(row, col) };

                if v.is_nodata(nodata_dn) || q.is_nodata(nodata_qc) {
                    continue;
                }
                if (q & 0b11) > MAX_ACCEPTED_QUALITY {
                    continue;
                }

                row_data[col] = f64::from(v) * LST_SCALE - KELVIN_OFFSET;
            }
            row_data
        })
        .collect();

    build_output(dn, rows, cols, data)
}

/// Decode one NDVI frame.
///
/// The vegetation product carries a direct ordinal summary QA band rather
/// than a bit-packed code; values with QA <= 1 are accepted and rescaled
/// by 1/10000 into the conventional [-1, 1] range.
pub fn clean_ndvi_frame(dn: &Raster<i16>, qa: &Raster<u8>) -> Result<Raster<f64>> {
    check_dimensions(dn, qa)?;

    let (rows, cols) = dn.shape();
    let nodata_dn = dn.nodata();
    let nodata_qa = qa.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let v = unsafe { dn.get_unchecked(row, col) };
                let q = unsafe { qa.get_unchecked(row, col) };

                if v.is_nodata(nodata_dn) || q.is_nodata(nodata_qa) {
                    continue;
                }
                if q > MAX_ACCEPTED_QUALITY {
                    continue;
                }

                row_data[col] = f64::from(v) / NDVI_SCALE;
            }
            row_data
        })
        .collect();

    build_output(dn, rows, cols, data)
}

/// Decode a sequence of raw LST frames into a cleaned, time-sorted series
pub fn clean_lst_series(frames: &[RawFrame<u16>]) -> Result<RasterSeries> {
    let cleaned = frames
        .iter()
        .map(|f| Ok(TimedRaster::new(f.timestamp, clean_lst_frame(&f.values, &f.quality)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(RasterSeries::from_frames(cleaned))
}

/// Decode a sequence of raw NDVI frames into a cleaned, time-sorted series
pub fn clean_ndvi_series(frames: &[RawFrame<i16>]) -> Result<RasterSeries> {
    let cleaned = frames
        .iter()
        .map(|f| Ok(TimedRaster::new(f.timestamp, clean_ndvi_frame(&f.values, &f.quality)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(RasterSeries::from_frames(cleaned))
}

fn check_dimensions<A: RasterElement, B: RasterElement>(
    values: &Raster<A>,
    quality: &Raster<B>,
) -> Result<()> {
    let (rows_v, cols_v) = values.shape();
    let (rows_q, cols_q) = quality.shape();
    if rows_v != rows_q || cols_v != cols_q {
        return Err(Error::SizeMismatch {
            er: rows_v,
            ec: cols_v,
            ar: rows_q,
            ac: cols_q,
        });
    }
    Ok(())
}

fn build_output<T: RasterElement>(
    reference: &Raster<T>,
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
