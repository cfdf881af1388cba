//! End-to-end pipeline orchestration
//!
//! Wires the stages together for one analysis run: quality filtering,
//! temporal join, edge fitting, TVDI computation and classification.
//! The edge model is fitted once per run and shared read-only; region
//! aggregation is invoked separately on the outputs as the UI demands.

use crate::classify::classify_mean_tvdi;
use crate::composite::mean_composite;
use crate::edges::{fit_edge_model, EdgeFitParams, EdgeModel};
use crate::join::{default_join_tolerance, join_series};
use crate::quality::{clean_lst_series, clean_ndvi_series, RawFrame};
use crate::tvdi::compute_tvdi;
use chrono::{DateTime, Duration, Utc};
use tracing::info;
use tvdi_core::raster::Raster;
use tvdi_core::region::Region;
use tvdi_core::series::RasterSeries;
use tvdi_core::{Error, Result};

/// Parameters for one analysis run
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Start of the analysis range (inclusive)
    pub start: DateTime<Utc>,
    /// End of the analysis range (exclusive)
    pub end: DateTime<Utc>,
    /// Temporal join tolerance
    pub join_tolerance: Duration,
    /// Edge-model fitting parameters
    pub edge_fit: EdgeFitParams,
}

impl PipelineParams {
    /// Create parameters with defaults for everything but the date range.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` if `end <= start` — the one hard precondition
    /// of the pipeline, checked before any work is done.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        let params = Self {
            start,
            end,
            join_tolerance: default_join_tolerance(),
            edge_fit: EdgeFitParams::default(),
        };
        params.validate()?;
        Ok(params)
    }

    /// Re-check the date range (useful after literal struct construction)
    pub fn validate(&self) -> Result<()> {
        if self.end <= self.start {
            return Err(Error::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }
}

/// Everything one run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// The fitted edge model (check `is_fallback` for degraded fits)
    pub model: EdgeModel,
    /// Per-timestep TVDI frames in [0, 1]
    pub tvdi: RasterSeries,
    /// Per-pixel temporal mean of the TVDI series
    pub mean_tvdi: Raster<f64>,
    /// Five-class drought classification (nodata 0)
    pub classes: Raster<u8>,
}

/// The TVDI analysis pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: PipelineParams,
}

impl Pipeline {
    /// Create a pipeline, validating the parameters up front
    pub fn new(params: PipelineParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Pipeline parameters
    pub fn params(&self) -> &PipelineParams {
        &self.params
    }

    /// Run the full pipeline on raw product frames.
    ///
    /// Stages: clean both products, restrict to the analysis range, join
    /// by nearest timestamp, fit the edge model over `region`, compute
    /// the TVDI series, reduce to the temporal mean and classify.
    pub fn run(
        &self,
        lst_frames: &[RawFrame<u16>],
        ndvi_frames: &[RawFrame<i16>],
        region: &Region,
    ) -> Result<PipelineOutput> {
        self.params.validate()?;

        let lst = clean_lst_series(lst_frames)?
            .filter_range(self.params.start, self.params.end);
        let ndvi = clean_ndvi_series(ndvi_frames)?
            .filter_range(self.params.start, self.params.end);
        if lst.is_empty() || ndvi.is_empty() {
            return Err(Error::EmptySeries);
        }
        info!(lst_frames = lst.len(), ndvi_frames = ndvi.len(), "cleaned input series");

        let joined = join_series(&lst, &ndvi, self.params.join_tolerance);
        if joined.is_empty() {
            return Err(Error::EmptySeries);
        }
        info!(pairs = joined.len(), "temporal join complete");

        let model = fit_edge_model(&joined, region, &self.params.edge_fit)?;
        info!(
            wet_edge = model.wet_edge,
            dry_edge_slope = model.dry_edge_slope,
            dry_edge_intercept = model.dry_edge_intercept,
            is_fallback = model.is_fallback,
            "edge model fitted"
        );

        let tvdi = compute_tvdi(&joined, &model)?;
        let frames: Vec<&Raster<f64>> = tvdi.iter().map(|f| &f.raster).collect();
        let mean_tvdi = mean_composite(&frames)?;
        let classes = classify_mean_tvdi(&mean_tvdi)?;

        Ok(PipelineOutput {
            model,
            tvdi,
            mean_tvdi,
            classes,
        })
    }
}
