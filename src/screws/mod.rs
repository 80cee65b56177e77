// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of fitted panel surfaces into physical screw adjustments.


use serde::{Deserialize, Serialize};

use crate::geometry::Panel;
use crate::surface::PanelFitResult;

/// The adjustment for one screw of one panel. Terminal output, consumed by
/// external reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrewAdjustment {
    /// Index into the layout's panel list.
    pub i_panel: usize,

    /// The panel's designation.
    pub panel_label: String,

    /// The screw's name within its panel, e.g. "ol".
    pub screw_label: String,

    /// Screw position in the panel-local frame \[metres\].
    pub x: f64,
    pub y: f64,

    /// Signed displacement to apply \[metres\]; positive moves the surface
    /// outward along the panel normal. `None` when the panel's fit was
    /// flagged; no number is ever derived from an unreliable fit.
    pub adjustment: Option<f64>,
}

/// Resolve one panel's fit into adjustments for each of its screws.
///
/// The fitted surface is the panel's current error, so the correction is its
/// negation evaluated at the screw: a panel sitting 2 mm proud comes back as
/// -2 mm on every screw.
pub fn resolve_screws(panel: &Panel, fit: &PanelFitResult) -> Vec<ScrewAdjustment> {
    panel
        .screws
        .iter()
        .map(|screw| ScrewAdjustment {
            i_panel: fit.i_panel,
            panel_label: fit.label.clone(),
            screw_label: screw.label.clone(),
            x: screw.x,
            y: screw.y,
            adjustment: fit.evaluate(screw.x, screw.y).map(|v| -v),
        })
        .collect()
}
