// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The unit pipeline and its parallel orchestration.
//!
//! One (antenna, scan, ddi) unit runs gridding, inversion, registration,
//! fitting and screw resolution as a sequential chain over data nothing
//! else can touch; the only shared state is the immutable panel layout.
//! [`process_units`] fans that chain out over an explicitly sized rayon
//! pool and merges whatever comes back by unit key, so the aggregate never
//! depends on completion order and one unit's failure never disturbs its
//! siblings.

mod error;

pub use error::{PipelineError, UnitError};

use std::collections::BTreeMap;
use std::thread;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use itertools::Itertools;
use log::{debug, info, warn};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::aperture::{invert, ApertureImage, InversionParams};
use crate::constants::FOUR_PI;
use crate::context::{HologSample, ScanContext, UnitKey};
use crate::geometry::{register_panels, PanelGeometryProvider, PanelLayout, RegistrationParams};
use crate::grid::{grid_samples, GridParams};
use crate::math::{cexp, weighted_rms};
use crate::screws::{resolve_screws, ScrewAdjustment};
use crate::surface::{fit_panel, FitParams, PanelFitResult};
use crate::PROGRESS_BARS;

/// Everything needed to process one independent unit: its metadata and its
/// calibrated samples. Units share no state with each other.
#[derive(Debug, Clone)]
pub struct ProcessingUnit {
    pub context: ScanContext,
    pub samples: Vec<HologSample>,
}

/// Configuration for the whole pipeline. Everything is explicit, including
/// the worker-thread count, so two pipelines with different configurations
/// can run in one process without treading on each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    pub grid: GridParams,
    pub inversion: InversionParams,
    pub registration: RegistrationParams,
    pub fit: FitParams,

    /// Worker threads for the unit fan-out. `None` lets rayon pick one per
    /// core.
    pub num_threads: Option<usize>,
}

impl PipelineParams {
    pub fn new(grid: GridParams) -> PipelineParams {
        PipelineParams {
            grid,
            inversion: InversionParams::default(),
            registration: RegistrationParams::default(),
            fit: FitParams::default(),
            num_threads: None,
        }
    }
}

/// Antenna surface quality figures for one unit, before and after the
/// fitted corrections are (notionally) applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceStats {
    /// RMS surface deviation over the illuminated mask \[metres\].
    pub rms_before: f64,

    /// RMS of the post-correction residuals over the same mask \[metres\].
    pub rms_after: f64,

    /// Forward gain implied by the measured phases \[dB\].
    pub gain_before_db: f64,

    /// Forward gain after the fitted corrections \[dB\].
    pub gain_after_db: f64,

    /// Gain of a perfect surface with the same illuminated area \[dB\].
    pub theoretical_gain_db: f64,

    /// The number of pixels in the illuminated mask.
    pub num_pixels: usize,
}

/// Everything one successful unit produces.
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub key: UnitKey,

    /// The reconstructed aperture image, kept for independent inspection.
    pub image: ApertureImage,

    /// The illuminated/usable pixel mask the fits were drawn from.
    pub mask: Array2<bool>,

    /// One fit per layout panel, in panel-index order. Flagged fits are
    /// present but invalid.
    pub fits: Vec<PanelFitResult>,

    /// Screw adjustments for every panel, flattened in panel-index order.
    pub screws: Vec<ScrewAdjustment>,

    /// The correction surface \[metres\]: what the fits would subtract at
    /// each fitted pixel. NaN where no valid fit applies.
    pub corrections: Array2<f64>,

    /// The deviation map after subtracting the fitted corrections
    /// \[metres\].
    pub residual: Array2<f64>,

    pub stats: SurfaceStats,
}

/// The final aggregate over all scheduled units.
#[derive(Debug)]
pub struct SurfaceReport {
    /// Successful units, keyed by unit. BTreeMap so iteration order is the
    /// key order, not completion order.
    pub results: BTreeMap<UnitKey, UnitResult>,

    /// Units that failed outright, with their causes. Disjoint from
    /// `results`: "no result" here is distinct from "unit succeeded but a
    /// panel's fit is invalid".
    pub failures: BTreeMap<UnitKey, UnitError>,
}

impl SurfaceReport {
    /// A specific panel's fit, if its unit succeeded.
    pub fn fit(&self, key: &UnitKey, i_panel: usize) -> Option<&PanelFitResult> {
        self.results.get(key).and_then(|r| r.fits.get(i_panel))
    }

    /// All fits across all successful units, keyed by (unit, panel).
    pub fn iter_fits(&self) -> impl Iterator<Item = (&UnitKey, &PanelFitResult)> {
        self.results
            .values()
            .flat_map(|r| r.fits.iter().map(move |f| (&r.key, f)))
    }
}

/// Run the full chain for one unit against its antenna's layout.
pub fn process_unit(
    unit: &ProcessingUnit,
    layout: &PanelLayout,
    params: &PipelineParams,
) -> Result<UnitResult, UnitError> {
    let key = unit.context.key();
    let wavelength = unit.context.wavelength();

    let grid = grid_samples(&unit.samples, &params.grid)?;
    let image = invert(&grid, layout.optics, wavelength, &params.inversion);
    let registration = register_panels(layout, &image, &grid, &params.registration)?;

    let fits: Vec<PanelFitResult> = registration
        .panel_samples
        .iter()
        .map(|ps| fit_panel(ps, &layout.panels[ps.i_panel].label, &params.fit))
        .collect();
    let num_flagged = fits.iter().filter(|f| !f.is_valid()).count();
    if num_flagged > 0 {
        debug!("{key}: {num_flagged}/{} panel fits flagged invalid", fits.len());
    }

    let screws: Vec<ScrewAdjustment> = fits
        .iter()
        .flat_map(|fit| resolve_screws(&layout.panels[fit.i_panel], fit))
        .collect();

    // Apply the fitted corrections to get the post-adjustment surface.
    let mut corrections = Array2::from_elem(image.deviation.dim(), f64::NAN);
    let mut residual = image.deviation.clone();
    for (ps, fit) in registration.panel_samples.iter().zip(&fits) {
        if !fit.is_valid() {
            continue;
        }
        for s in &ps.samples {
            if let Some(v) = fit.evaluate(s.x, s.y) {
                corrections[(s.ix, s.iy)] = -v;
                residual[(s.ix, s.iy)] -= v;
            }
        }
    }

    let stats = surface_stats(&image, &registration.mask, &residual);

    Ok(UnitResult {
        key,
        image,
        mask: registration.mask,
        fits,
        screws,
        corrections,
        residual,
        stats,
    })
}

/// Process many units concurrently and aggregate their outputs.
///
/// Each unit is an isolated chain; the pool and channel only move whole
/// units around, so no synchronisation exists inside the pipeline itself. A
/// failed unit is recorded and skipped, never fatal to its siblings.
pub fn process_units(
    units: Vec<ProcessingUnit>,
    provider: &dyn PanelGeometryProvider,
    params: &PipelineParams,
) -> Result<SurfaceReport, PipelineError> {
    if units.is_empty() {
        return Err(PipelineError::NoUnits);
    }
    if let Some(dup) = units.iter().map(|u| u.context.key()).duplicates().next() {
        return Err(PipelineError::DuplicateUnit(dup));
    }

    info!("Processing {} holography units", units.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.num_threads.unwrap_or(0))
        .thread_name(|i| format!("holopanel-worker-{i}"))
        .build()?;

    let progress = ProgressBar::with_draw_target(
        Some(units.len() as u64),
        if PROGRESS_BARS.load() {
            ProgressDrawTarget::stdout()
        } else {
            ProgressDrawTarget::hidden()
        },
    )
    .with_style(
        ProgressStyle::default_bar()
            .template("{msg}: [{wide_bar:.blue}] {pos:3}/{len:3} ({elapsed_precise}<{eta_precise})")
            .unwrap()
            .progress_chars("=> "),
    )
    .with_position(0)
    .with_message("Fitting panels");

    let (tx, rx) = crossbeam_channel::unbounded();
    let report = thread::scope(|s| {
        // Collector thread: merge results as workers finish, in any order.
        let collector = s.spawn(move || {
            let mut results = BTreeMap::new();
            let mut failures = BTreeMap::new();
            for (key, result) in rx {
                match result {
                    Ok(unit_result) => {
                        results.insert(key, unit_result);
                    }
                    Err(e) => {
                        warn!("unit {key} failed: {e}");
                        failures.insert(key, e);
                    }
                }
            }
            SurfaceReport { results, failures }
        });

        pool.install(|| {
            units.into_par_iter().for_each_with(tx, |tx, unit| {
                let key = unit.context.key();
                let result = provider
                    .layout(&unit.context.antenna)
                    .map_err(UnitError::from)
                    .and_then(|layout| process_unit(&unit, &layout, params));
                progress.inc(1);
                // The collector outlives every worker, so sends cannot fail.
                let _ = tx.send((key, result));
            });
        });

        collector
            .join()
            .expect("the collector thread does not panic")
    });
    progress.finish_and_clear();

    info!(
        "{} units succeeded, {} failed",
        report.results.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Surface RMS and implied forward gains over the illuminated mask,
/// following the usual aperture-efficiency bookkeeping: a perfect surface of
/// illuminated area A has gain 4πA/λ², and phase errors scale it by
/// |Σ e^{iφ}| / N.
fn surface_stats(image: &ApertureImage, mask: &Array2<bool>, residual: &Array2<f64>) -> SurfaceStats {
    let num_pixels = mask.iter().filter(|&&m| m).count();
    let rms_before = weighted_rms(
        image
            .deviation
            .iter()
            .zip(mask.iter())
            .map(|(&d, &m)| (d, if m { 1.0 } else { 0.0 })),
    );
    let rms_after = weighted_rms(
        residual
            .iter()
            .zip(mask.iter())
            .map(|(&d, &m)| (d, if m { 1.0 } else { 0.0 })),
    );

    let area = num_pixels as f64 * image.pixel_size * image.pixel_size;
    let theoretical = FOUR_PI * area / (image.wavelength * image.wavelength);

    let coherent_sum = |phases: &mut dyn Iterator<Item = f64>| {
        phases.fold(crate::c64::default(), |acc, p| acc + cexp(p)).norm()
    };

    let mut before_phases = image
        .phase
        .iter()
        .zip(mask.iter())
        .filter(|(_, &m)| m)
        .map(|(&p, _)| p);
    let gain_before = theoretical * coherent_sum(&mut before_phases) / num_pixels as f64;

    // Residual deviations back to phase for the post-correction gain.
    let n = image.size();
    let mut after_phases = (0..n)
        .flat_map(|i| (0..n).map(move |j| (i, j)))
        .filter(|&(i, j)| mask[(i, j)])
        .map(|(i, j)| {
            let r = image.x_axis[i].hypot(image.y_axis[j]);
            residual[(i, j)] / image.optics.phase_to_deviation_factor(r, image.wavelength)
        });
    let gain_after = theoretical * coherent_sum(&mut after_phases) / num_pixels as f64;

    SurfaceStats {
        rms_before,
        rms_after,
        gain_before_db: to_db(gain_before),
        gain_after_db: to_db(gain_after),
        theoretical_gain_db: to_db(theoretical),
        num_pixels,
    }
}

fn to_db(gain: f64) -> f64 {
    10.0 * gain.log10()
}
