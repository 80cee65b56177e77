// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Weighted least-squares fitting of deformation models to panel surface
//! samples.
//!
//! A bad panel is never fatal: panels with too few samples or a degenerate
//! sample distribution come back flagged invalid and the rest of the unit
//! carries on.


use log::debug;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::geometry::PanelSamples;
use crate::math::weighted_rms;

/// The default bound on the normal-matrix condition number; beyond it a fit
/// is declared ill-conditioned.
pub const DEFAULT_MAX_CONDITION: f64 = 1e8;

/// The deformation model fitted to each panel's displacement samples.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum SurfaceModel {
    /// Piston only: the panel is shifted along its normal.
    Mean,

    /// Piston plus two tilts; a rigid panel on adjusters.
    #[default]
    Rigid,

    /// Rigid terms plus three curvature terms (x², xy, y²), for panels that
    /// can be warped.
    Paraboloid,
}

impl SurfaceModel {
    /// The number of free parameters.
    pub fn num_params(self) -> usize {
        match self {
            SurfaceModel::Mean => 1,
            SurfaceModel::Rigid => 3,
            SurfaceModel::Paraboloid => 6,
        }
    }

    /// The basis terms at a panel-local position, in parameter order:
    /// 1, x, y, x², xy, y².
    fn basis(self, x: f64, y: f64) -> [f64; 6] {
        [1.0, x, y, x * x, x * y, y * y]
    }

    /// The model surface at a panel-local position.
    pub fn evaluate(self, params: &[f64], x: f64, y: f64) -> f64 {
        let basis = self.basis(x, y);
        params
            .iter()
            .zip(basis.iter())
            .map(|(p, b)| p * b)
            .sum()
    }
}

/// Fitting configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub model: SurfaceModel,

    /// Panels with fewer valid samples than this (or than the model's
    /// parameter count) are flagged, not fitted.
    pub min_samples: usize,

    /// Condition-number bound on the fit's normal matrix.
    pub max_condition: f64,
}

impl Default for FitParams {
    fn default() -> FitParams {
        FitParams {
            model: SurfaceModel::default(),
            min_samples: 12,
            max_condition: DEFAULT_MAX_CONDITION,
        }
    }
}

/// Why a fit is not usable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FitFlag {
    Good,

    /// Fewer samples than the model needs (or than configured).
    InsufficientSamples,

    /// The normal matrix is rank deficient or numerically singular, e.g.
    /// every sample on one line under a tilt model.
    IllConditioned { condition: f64 },
}

/// The fit for one panel of one unit. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelFitResult {
    /// Index into the layout's panel list.
    pub i_panel: usize,

    /// The panel's designation, as reported to the maintenance crew.
    pub label: String,

    pub model: SurfaceModel,

    /// Fitted coefficients in basis order; empty when the fit is flagged.
    pub params: Vec<f64>,

    /// Weighted RMS of the post-fit residuals \[metres\]; NaN when flagged.
    pub residual_rms: f64,

    /// The number of samples that constrained the fit.
    pub num_samples: usize,

    pub flag: FitFlag,
}

impl PanelFitResult {
    pub fn is_valid(&self) -> bool {
        matches!(self.flag, FitFlag::Good)
    }

    /// The fitted surface at a panel-local position; `None` when the fit is
    /// flagged, so nothing downstream ever extrapolates an unreliable fit.
    pub fn evaluate(&self, x: f64, y: f64) -> Option<f64> {
        self.is_valid()
            .then(|| self.model.evaluate(&self.params, x, y))
    }

    fn flagged(i_panel: usize, label: &str, model: SurfaceModel, n: usize, flag: FitFlag) -> PanelFitResult {
        PanelFitResult {
            i_panel,
            label: label.to_string(),
            model,
            params: vec![],
            residual_rms: f64::NAN,
            num_samples: n,
            flag,
        }
    }
}

/// Fit the configured model to one panel's samples by weighted least
/// squares: minimise Σ wᵢ (dᵢ − m(xᵢ, yᵢ))².
///
/// The normal equations AᵀWA x = AᵀW d are assembled directly (the systems
/// are tiny) and solved through an SVD, whose singular values also supply
/// the condition-number check.
pub fn fit_panel(panel_samples: &PanelSamples, label: &str, params: &FitParams) -> PanelFitResult {
    let model = params.model;
    let n_par = model.num_params();
    let samples = &panel_samples.samples;
    let n = samples.len();

    if n < n_par.max(params.min_samples) {
        debug!(
            "panel {}: {} samples cannot constrain {} ({} parameters)",
            label, n, model, n_par
        );
        return PanelFitResult::flagged(
            panel_samples.i_panel,
            label,
            model,
            n,
            FitFlag::InsufficientSamples,
        );
    }

    let mut normal = DMatrix::<f64>::zeros(n_par, n_par);
    let mut rhs = DVector::<f64>::zeros(n_par);
    for s in samples {
        let basis = model.basis(s.x, s.y);
        for i in 0..n_par {
            for j in 0..n_par {
                normal[(i, j)] += s.weight * basis[i] * basis[j];
            }
            rhs[i] += s.weight * basis[i] * s.deviation;
        }
    }

    let svd = normal.svd(true, true);
    let sv_max = svd.singular_values.max();
    let sv_min = svd.singular_values.min();
    let condition = sv_max / sv_min;
    if !(sv_min > 0.0) || !condition.is_finite() || condition > params.max_condition {
        debug!("panel {}: ill-conditioned fit (condition {:.3e})", label, condition);
        return PanelFitResult::flagged(
            panel_samples.i_panel,
            label,
            model,
            n,
            FitFlag::IllConditioned { condition },
        );
    }

    let solution = match svd.solve(&rhs, 0.0) {
        Ok(s) => s,
        // Unreachable with both U and V computed, but don't panic over a
        // panel either way.
        Err(_) => {
            return PanelFitResult::flagged(
                panel_samples.i_panel,
                label,
                model,
                n,
                FitFlag::IllConditioned { condition },
            )
        }
    };
    let fitted: Vec<f64> = solution.iter().cloned().collect();

    let residual_rms = weighted_rms(samples.iter().map(|s| {
        let r = s.deviation - model.evaluate(&fitted, s.x, s.y);
        (r, s.weight)
    }));

    PanelFitResult {
        i_panel: panel_samples.i_panel,
        label: label.to_string(),
        model,
        params: fitted,
        residual_rms,
        num_samples: n,
        flag: FitFlag::Good,
    }
}
