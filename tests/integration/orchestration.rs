// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Multi-unit orchestration on the synthetic dish: failures stay contained
//! and aggregation is independent of scheduling.

use approx::assert_abs_diff_eq;
use holopanel::pipeline::UnitError;
use holopanel::process_units;

use super::*;

#[test]
fn a_failed_unit_is_recorded_and_its_siblings_survive() {
    init_logging();
    let layout = quadrant_layout();
    let units = vec![
        synthetic_unit("ea01", 1, &layout, &[0.0; 4]),
        synthetic_unit("ea02", 1, &layout, &[0.0, 1.0e-3, 0.0, 0.0]),
        sparse_unit("ea03", 1),
        synthetic_unit("ea04", 1, &layout, &[0.0; 4]),
    ];
    let report = process_units(units, &layout, &pipeline_params()).unwrap();

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.failures.len(), 1);

    let failed_key = scan_context("ea03", 1).key();
    assert!(matches!(
        report.failures.get(&failed_key),
        Some(UnitError::Grid(_))
    ));
    assert!(!report.results.contains_key(&failed_key));

    // The sibling with a real offset still got its fit.
    let offset_key = scan_context("ea02", 1).key();
    let fit = report.fit(&offset_key, 1).unwrap();
    assert!(fit.is_valid());
    assert_abs_diff_eq!(fit.params[0], 1.0e-3, epsilon = 1e-8);
}

#[test]
fn aggregation_does_not_depend_on_scheduling_order() {
    let layout = quadrant_layout();
    let make_units = || {
        vec![
            synthetic_unit("ea01", 1, &layout, &[0.0, 0.0, 2.0e-3, 0.0]),
            synthetic_unit("ea01", 2, &layout, &[0.0; 4]),
            sparse_unit("ea02", 1),
            synthetic_unit("ea03", 1, &layout, &[5.0e-4, 0.0, 0.0, 0.0]),
        ]
    };

    let serial = PipelineParams {
        num_threads: Some(1),
        ..pipeline_params()
    };
    let parallel = PipelineParams {
        num_threads: Some(4),
        ..pipeline_params()
    };
    let report_a = process_units(make_units(), &layout, &serial).unwrap();
    let report_b = process_units(make_units(), &layout, &parallel).unwrap();

    let keys_a: Vec<_> = report_a.results.keys().cloned().collect();
    let keys_b: Vec<_> = report_b.results.keys().cloned().collect();
    assert_eq!(keys_a, keys_b);
    assert_eq!(
        report_a.failures.keys().collect::<Vec<_>>(),
        report_b.failures.keys().collect::<Vec<_>>()
    );

    // Same screw adjustments unit for unit, whatever the thread count.
    for key in &keys_a {
        let screws_a = &report_a.results[key].screws;
        let screws_b = &report_b.results[key].screws;
        assert_eq!(screws_a.len(), screws_b.len());
        for (a, b) in screws_a.iter().zip(screws_b.iter()) {
            assert_eq!(a.screw_label, b.screw_label);
            match (a.adjustment, b.adjustment) {
                (Some(x), Some(y)) => assert_abs_diff_eq!(x, y, epsilon = 1e-12),
                (None, None) => (),
                _ => panic!("screw validity differs between runs"),
            }
        }
    }
}
