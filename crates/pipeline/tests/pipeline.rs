//! End-to-end pipeline tests on synthetic scenes

use approx::assert_relative_eq;
use chrono::{DateTime, Duration, TimeZone, Utc};
use tvdi_pipeline::prelude::*;

fn date(day_offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap() + Duration::days(day_offset)
}

/// Encode degrees Celsius as an LST digital number
fn lst_dn(celsius: f64) -> u16 {
    ((celsius + 273.15) / 0.02).round() as u16
}

/// Encode an NDVI value as a digital number
fn ndvi_dn(ndvi: f64) -> i16 {
    (ndvi * 10_000.0).round() as i16
}

/// A year of raw frames over a `rows` x `cols` grid.
///
/// NDVI is a fixed spatial gradient; LST sits exactly on the line
/// `45 - 10 * ndvi`, so the fitted dry edge is known in advance.
fn gradient_scene(
    rows: usize,
    cols: usize,
    n_frames: usize,
) -> (Vec<RawFrame<u16>>, Vec<RawFrame<i16>>) {
    let mut lst_frames = Vec::new();
    let mut ndvi_frames = Vec::new();

    for i in 0..n_frames {
        let mut lst = Raster::new(rows, cols);
        let mut ndvi = Raster::new(rows, cols);
        for row in 0..rows {
            for col in 0..cols {
                let v = 0.1 + 0.8 * (row * cols + col) as f64 / (rows * cols) as f64;
                ndvi.set(row, col, ndvi_dn(v)).unwrap();
                lst.set(row, col, lst_dn(45.0 - 10.0 * v)).unwrap();
            }
        }
        let good: Raster<u8> = Raster::filled(rows, cols, 0);
        // NDVI observed one day after LST, inside the join tolerance
        lst_frames.push(RawFrame::new(date(i as i64 * 12), lst, good.clone()));
        ndvi_frames.push(RawFrame::new(date(i as i64 * 12 + 1), ndvi, good));
    }

    (lst_frames, ndvi_frames)
}

fn year_params() -> PipelineParams {
    PipelineParams::new(date(0), date(365)).unwrap()
}

fn whole_grid(rows: usize, cols: usize) -> Region {
    Region::rect("All Districts", 0.0, -(rows as f64), cols as f64, 0.0)
}

#[test]
fn constant_scene_yields_known_class() {
    // 30 frames, LST 20 C and NDVI 0.5 everywhere; with wet edge 10 and
    // dry edge 45 - 10 * ndvi the TVDI is (20-10)/(40-10) = 1/3 per frame
    let model = EdgeModel {
        wet_edge: 10.0,
        dry_edge_slope: -10.0,
        dry_edge_intercept: 45.0,
        is_fallback: false,
    };

    let joined: Vec<JoinedFrame> = (0..30)
        .map(|i| JoinedFrame {
            timestamp: date(i * 12),
            lst: Raster::filled(6, 6, 20.0),
            ndvi: Raster::filled(6, 6, 0.5),
        })
        .collect();

    let tvdi = compute_tvdi(&joined, &model).unwrap();
    assert_eq!(tvdi.len(), 30);
    for frame in tvdi.iter() {
        assert_relative_eq!(frame.raster.get(3, 3).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
    }

    let classes = classify(&tvdi).unwrap();
    for row in 0..6 {
        for col in 0..6 {
            assert_eq!(classes.get(row, col).unwrap(), 2);
        }
    }
}

#[test]
fn full_run_from_raw_frames() {
    let (lst_frames, ndvi_frames) = gradient_scene(10, 10, 30);
    let region = whole_grid(10, 10);
    let pipeline = Pipeline::new(year_params()).unwrap();

    let output = pipeline.run(&lst_frames, &ndvi_frames, &region).unwrap();

    assert!(!output.model.is_fallback);
    assert_relative_eq!(output.model.dry_edge_slope, -10.0, epsilon = 0.05);
    assert_relative_eq!(output.model.dry_edge_intercept, 45.0, epsilon = 0.05);
    assert_eq!(output.tvdi.len(), 30);

    // Clamp invariant holds over the whole output series
    for frame in output.tvdi.iter() {
        let stats = frame.raster.statistics();
        assert!(stats.min.unwrap() >= 0.0);
        assert!(stats.max.unwrap() <= 1.0);
    }

    // Every pixel with data got a class
    let stats = output.classes.statistics();
    assert_eq!(stats.nodata_count, 0);
}

#[test]
fn rerun_with_fixed_seed_is_byte_identical() {
    let (lst_frames, ndvi_frames) = gradient_scene(10, 10, 10);
    let region = whole_grid(10, 10);

    let run = || {
        let mut params = year_params();
        params.edge_fit.sample_size = 40; // force subsampling
        Pipeline::new(params)
            .unwrap()
            .run(&lst_frames, &ndvi_frames, &region)
            .unwrap()
    };

    let a = run();
    let b = run();

    assert_eq!(a.model, b.model);
    assert_eq!(a.classes.data(), b.classes.data());
    assert_eq!(a.mean_tvdi.data(), b.mean_tvdi.data());
}

#[test]
fn degraded_fit_still_classifies() {
    // Spatially constant NDVI: the regression is degenerate, the run
    // must complete on fallback parameters and say so on the model
    let n_frames = 8;
    let mut lst_frames = Vec::new();
    let mut ndvi_frames = Vec::new();
    for i in 0..n_frames {
        let good: Raster<u8> = Raster::filled(4, 4, 0);
        lst_frames.push(RawFrame::new(
            date(i * 12),
            Raster::<u16>::filled(4, 4, lst_dn(25.0)),
            good.clone(),
        ));
        ndvi_frames.push(RawFrame::new(
            date(i * 12),
            Raster::<i16>::filled(4, 4, ndvi_dn(0.4)),
            good,
        ));
    }

    let region = whole_grid(4, 4);
    let output = Pipeline::new(year_params())
        .unwrap()
        .run(&lst_frames, &ndvi_frames, &region)
        .unwrap();

    assert!(output.model.is_fallback);
    assert_eq!(output.model.dry_edge_slope, -10.0);
    assert_eq!(output.model.dry_edge_intercept, 45.0);
    let stats = output.classes.statistics();
    assert_eq!(stats.nodata_count, 0);
}

#[test]
fn aggregation_over_outputs() {
    let (lst_frames, ndvi_frames) = gradient_scene(10, 10, 12);
    let region = whole_grid(10, 10);
    let output = Pipeline::new(year_params())
        .unwrap()
        .run(&lst_frames, &ndvi_frames, &region)
        .unwrap();

    // National mean TVDI is a valid scalar
    let national = region_mean(&output.mean_tvdi, &region).unwrap();
    assert!((0.0..=1.0).contains(&national));

    // Time-series chart data: one point per joined frame
    let series = region_series(&output.tvdi, &region);
    assert_eq!(series.len(), output.tvdi.len());
    assert!(series.iter().all(|(_, v)| v.is_some()));

    // Month with frames vs month without
    assert!(monthly_mean(&output.tvdi, 1).is_some());
    assert!(monthly_mean(&output.tvdi, 12).is_none());

    // District table: two halves plus a region outside the grid
    let districts = vec![
        Region::rect("West", 0.0, -10.0, 5.0, 0.0),
        Region::rect("East", 5.0, -10.0, 10.0, 0.0),
        Region::rect("Offshore", 100.0, 100.0, 101.0, 101.0),
    ];
    let stats = district_stats(&output.classes, &districts);
    assert_eq!(stats.len(), 3);
    assert!(stats[0].class.is_some());
    assert!(stats[1].class.is_some());
    assert!(stats[2].class.is_none());
    assert!(stats[2].area_km2 > 0.0);
}
