// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! End-to-end panel-correction scenarios on the synthetic dish.

use approx::assert_abs_diff_eq;
use holopanel::process_units;

use super::*;

#[test]
fn a_perfectly_aligned_dish_needs_no_adjustments() {
    init_logging();
    let layout = quadrant_layout();
    let unit = synthetic_unit("ea01", 1, &layout, &[0.0; 4]);
    let key = unit.context.key();
    let report = process_units(vec![unit], &layout, &pipeline_params()).unwrap();

    assert!(report.failures.is_empty());
    let result = &report.results[&key];
    assert_eq!(result.fits.len(), 4);
    for fit in &result.fits {
        assert!(fit.is_valid(), "panel {} unexpectedly flagged", fit.label);
        // Piston and both tilts are zero for an aligned dish.
        assert_abs_diff_eq!(fit.params[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.params[1], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.params[2], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(fit.residual_rms, 0.0, epsilon = 1e-9);
    }
    assert_eq!(result.screws.len(), 16);
    for screw in &result.screws {
        assert_abs_diff_eq!(screw.adjustment.unwrap(), 0.0, epsilon = 1e-9);
    }

    // A perfect surface: no RMS, no gain lost to phase errors.
    assert_abs_diff_eq!(result.stats.rms_before, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
        result.stats.gain_before_db,
        result.stats.theoretical_gain_db,
        epsilon = 1e-9
    );
}

#[test]
fn a_single_panel_piston_lands_on_exactly_its_screws() {
    let layout = quadrant_layout();
    // Panel q3 sits 2 mm proud of the ideal surface.
    let offset = 2.0e-3;
    let unit = synthetic_unit("ea01", 1, &layout, &[0.0, 0.0, offset, 0.0]);
    let key = unit.context.key();
    let report = process_units(vec![unit], &layout, &pipeline_params()).unwrap();

    let result = &report.results[&key];
    for fit in &result.fits {
        assert!(fit.is_valid());
        let expected = if fit.i_panel == 2 { offset } else { 0.0 };
        assert_abs_diff_eq!(fit.params[0], expected, epsilon = 1e-8);
        assert_abs_diff_eq!(fit.params[1], 0.0, epsilon = 1e-8);
        assert_abs_diff_eq!(fit.params[2], 0.0, epsilon = 1e-8);
    }

    // The correction is -2 mm on the offset panel's screws, 0 elsewhere.
    for screw in &result.screws {
        let expected = if screw.i_panel == 2 { -offset } else { 0.0 };
        assert_abs_diff_eq!(screw.adjustment.unwrap(), expected, epsilon = 1e-8);
    }

    // Fitting the offset out improves the surface and the gain.
    assert!(result.stats.rms_before > 5.0e-4);
    assert!(result.stats.rms_after < 1.0e-8);
    assert!(result.stats.gain_after_db > result.stats.gain_before_db);
    assert_abs_diff_eq!(
        result.stats.gain_after_db,
        result.stats.theoretical_gain_db,
        epsilon = 1e-6
    );

    // The residual map really is the deviation minus the corrections.
    let corrected_pixels = result
        .corrections
        .iter()
        .zip(result.residual.iter())
        .zip(result.image.deviation.iter())
        .filter(|((c, _), _)| c.is_finite());
    let mut seen = 0;
    for ((c, r), d) in corrected_pixels {
        assert_abs_diff_eq!(d + c, *r, epsilon = 1e-12);
        seen += 1;
    }
    assert!(seen > 100);
}

#[test]
fn the_reconstructed_aperture_matches_the_synthetic_dish() {
    let layout = quadrant_layout();
    let unit = synthetic_unit("ea01", 1, &layout, &[0.0; 4]);
    let key = unit.context.key();
    let report = process_units(vec![unit], &layout, &pipeline_params()).unwrap();
    let image = &report.results[&key].image;

    assert_eq!(image.size(), N);
    assert_abs_diff_eq!(image.pixel_size, PIXEL, epsilon = 1e-12);

    // Unit illumination over the annulus, darkness outside it.
    for i in 0..N {
        for j in 0..N {
            let r = image.x_axis[i].hypot(image.y_axis[j]);
            if r >= layout.inner_radius + PIXEL && r <= layout.outer_radius - PIXEL {
                assert_abs_diff_eq!(image.amplitude[(i, j)], 1.0, epsilon = 1e-9);
            }
            if r > layout.outer_radius + PIXEL {
                assert_abs_diff_eq!(image.amplitude[(i, j)], 0.0, epsilon = 1e-9);
            }
        }
    }
}
