//! # TVDI Pipeline
//!
//! The Temperature-Vegetation Dryness Index computation pipeline.
//!
//! Stages, in data-flow order:
//!
//! - **quality**: decode raw product frames, mask low-confidence pixels
//! - **join**: pair LST and NDVI frames by nearest timestamp
//! - **composite**: per-pixel temporal median and mean reductions
//! - **edges**: fit the wet edge (percentile) and dry edge (regression)
//! - **tvdi**: per-frame TVDI rasters in [0, 1]
//! - **classify**: temporal mean bucketed into five drought classes
//! - **aggregate**: region means, monthly frames, district statistics
//! - **pipeline**: end-to-end orchestration with validated parameters

pub mod aggregate;
pub mod classify;
pub mod composite;
pub mod edges;
pub mod join;
mod maybe_rayon;
pub mod pipeline;
pub mod quality;
pub mod tvdi;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregate::{
        district_stats, monthly_mean, region_mean, region_series, RegionStat,
    };
    pub use crate::classify::{classify, classify_mean_tvdi, class_label};
    pub use crate::composite::{mean_composite, median_composite};
    pub use crate::edges::{fit_edge_model, EdgeFitParams, EdgeModel};
    pub use crate::join::{join_series, JoinedFrame};
    pub use crate::pipeline::{Pipeline, PipelineOutput, PipelineParams};
    pub use crate::quality::{
        clean_lst_frame, clean_lst_series, clean_ndvi_frame, clean_ndvi_series, RawFrame,
    };
    pub use crate::tvdi::{compute_tvdi, compute_tvdi_frame};
    pub use tvdi_core::prelude::*;
}
