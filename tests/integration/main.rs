// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
//!
//! Everything here runs on a synthetic four-panel dish whose "measured"
//! visibilities are generated by forward-transforming a known aperture
//! pattern, so every stage of the pipeline has an exact answer to hit.

mod corrections;
mod orchestration;

use std::sync::Arc;

use holopanel::constants::{FOUR_PI, TAU, VEL_C};
use holopanel::{
    c64, GridParams, HologSample, InversionParams, Optics, Panel, PanelLayout, PhaseReference,
    PipelineParams, ProcessingUnit, ScanContext, Screw, Vec1, Window,
};
use ndarray::Array2;

/// The observing wavelength [m]; about 4.3 GHz.
const LAMBDA: f64 = 0.07;

/// Route pipeline log output through the test harness; set RUST_LOG to see
/// it.
fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Image/grid size and the aperture pixel size [m] it implies.
const N: usize = 32;
const PIXEL: f64 = 0.35;

/// A flat 10 m test dish split into four square quadrant panels, each with
/// four corner screws, around a 0.6 m central blockage.
fn quadrant_layout() -> Arc<PanelLayout> {
    let quadrant = |sx: f64, sy: f64| {
        let (x0, x1) = (sx * 0.45, sx * 5.25);
        let (y0, y1) = (sy * 0.45, sy * 5.25);
        vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]
    };
    let screws = || -> Vec<Screw> {
        ["il", "ir", "ol", "or"]
            .iter()
            .zip([(-2.0, -2.0), (2.0, -2.0), (-2.0, 2.0), (2.0, 2.0)])
            .map(|(label, (x, y))| Screw {
                label: label.to_string(),
                x,
                y,
            })
            .collect()
    };
    let panels = vec![
        Panel::new("q1".to_string(), 0, quadrant(1.0, 1.0), screws()),
        Panel::new("q2".to_string(), 0, quadrant(-1.0, 1.0), screws()),
        Panel::new("q3".to_string(), 0, quadrant(-1.0, -1.0), screws()),
        Panel::new("q4".to_string(), 0, quadrant(1.0, -1.0), screws()),
    ];
    Arc::new(PanelLayout {
        telescope: "quad".to_string(),
        diameter: 10.0,
        inner_radius: 0.6,
        outer_radius: 5.0,
        optics: Optics::Flat,
        panels: Vec1::try_from_vec(panels).unwrap(),
    })
}

fn grid_params() -> GridParams {
    GridParams::new(N, 1.0 / (2.0 * PIXEL))
}

/// Pipeline configuration for exact synthetic round trips: no taper, no
/// phase re-referencing.
fn pipeline_params() -> PipelineParams {
    PipelineParams {
        inversion: InversionParams {
            window: Window::None,
            phase_reference: PhaseReference::None,
        },
        num_threads: Some(2),
        ..PipelineParams::new(grid_params())
    }
}

fn scan_context(antenna: &str, scan: u32) -> ScanContext {
    ScanContext {
        antenna: antenna.to_string(),
        scan,
        ddi: 0,
        frequency: VEL_C / LAMBDA,
        pointing: Some((0.0, std::f64::consts::FRAC_PI_2)),
    }
}

/// Build the unit an ideal holography measurement of this dish would
/// deliver, given each panel's surface deviation [m]. The illuminated
/// annulus has unit amplitude; each panel's pixels carry the phase its
/// deviation implies under flat optics.
fn synthetic_unit(
    antenna: &str,
    scan: u32,
    layout: &PanelLayout,
    panel_deviations: &[f64],
) -> ProcessingUnit {
    assert_eq!(panel_deviations.len(), layout.panels.len());
    let h = (N / 2) as isize;

    let pattern = Array2::from_shape_fn((N, N), |(i, j)| {
        let x = (i as isize - h) as f64 * PIXEL;
        let y = (j as isize - h) as f64 * PIXEL;
        let r = x.hypot(y);
        if r < layout.inner_radius || r > layout.outer_radius {
            return c64::default();
        }
        let phase = layout
            .panels
            .iter()
            .position(|p| p.contains(x, y))
            .map_or(0.0, |i_panel| {
                panel_deviations[i_panel] * FOUR_PI / LAMBDA
            });
        c64::new(phase.cos(), phase.sin())
    });

    // Forward transform onto exact cell centres.
    let params = grid_params();
    let cell = params.cell();
    let mut samples = Vec::with_capacity(N * N);
    for ku in 0..N as isize {
        for kv in 0..N as isize {
            let mut vis = c64::default();
            for ((pu, pv), a) in pattern.indexed_iter() {
                let arg = -TAU
                    * ((ku - h) * (pu as isize - h) + (kv - h) * (pv as isize - h)) as f64
                    / N as f64;
                vis += a * c64::new(arg.cos(), arg.sin());
            }
            samples.push(HologSample::new(
                (ku - h) as f64 * cell,
                (kv - h) as f64 * cell,
                vis,
                1.0,
            ));
        }
    }

    ProcessingUnit {
        context: scan_context(antenna, scan),
        samples,
    }
}

/// A unit too sparse to grid; its coverage check must fail.
fn sparse_unit(antenna: &str, scan: u32) -> ProcessingUnit {
    ProcessingUnit {
        context: scan_context(antenna, scan),
        samples: vec![HologSample::new(0.0, 0.0, c64::new(1.0, 0.0), 1.0)],
    }
}
