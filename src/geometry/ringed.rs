// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ringed dish layouts: concentric rings of annular-sector panels, the shape
//! of most big single dishes. A [`RingedLayoutSpec`] turns a ring table into
//! a full [`PanelLayout`], discretising each sector into a polygon and
//! placing a corner screw near each of the four panel corners.

use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use vec1::Vec1;

use super::{GeometryError, Optics, Panel, PanelLayout, Screw};
use crate::constants::TAU;

/// How panels are numbered on the dish; designs disagree, and the labels
/// must match what the maintenance crew reads off the back of the dish.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum PanelNumbering {
    /// "ring-panel", panels counted clockwise from the top. VLA style.
    RingClockwiseTop,

    /// "sector-ring panel-in-sector", sectors counted counterclockwise from
    /// the right. ALMA style.
    SectorCounterclockwiseRight,
}

/// A ring table describing a ringed dish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingedLayoutSpec {
    pub telescope: String,

    /// Dish diameter \[metres\].
    pub diameter: f64,

    /// Central blockage radius \[metres\].
    pub inner_radius: f64,

    /// Outer radius of the panelled surface \[metres\].
    pub outer_radius: f64,

    pub optics: Optics,

    /// Ring boundary radii, innermost first; one more entry than
    /// `panels_per_ring` \[metres\].
    pub ring_boundaries: Vec<f64>,

    /// Number of panels in each ring.
    pub panels_per_ring: Vec<usize>,

    pub numbering: PanelNumbering,

    /// How far each corner screw sits in from its panel corner \[metres\].
    pub screw_offset: f64,

    /// Points used to discretise each arc edge of a sector polygon.
    pub arc_points: usize,
}

impl RingedLayoutSpec {
    pub fn build(&self) -> Result<Arc<PanelLayout>, GeometryError> {
        if self.ring_boundaries.len() != self.panels_per_ring.len() + 1 {
            return Err(GeometryError::RingSpec {
                boundaries: self.ring_boundaries.len(),
                counts: self.panels_per_ring.len(),
            });
        }
        if self.panels_per_ring.is_empty() || self.panels_per_ring.iter().any(|&n| n == 0) {
            return Err(GeometryError::EmptyRings);
        }
        if self.ring_boundaries.windows(2).any(|w| w[1] <= w[0]) {
            return Err(GeometryError::BadBoundaries);
        }

        let mut panels = vec![];
        for (ring, &count) in self.panels_per_ring.iter().enumerate() {
            let r_in = self.ring_boundaries[ring];
            let r_out = self.ring_boundaries[ring + 1];
            let sector = TAU / count as f64;
            for i_panel in 0..count {
                let theta0 = i_panel as f64 * sector;
                let theta1 = theta0 + sector;
                panels.push(Panel::new(
                    self.label(ring, i_panel),
                    ring,
                    sector_polygon(r_in, r_out, theta0, theta1, self.arc_points),
                    corner_screws(r_in, r_out, theta0, theta1, self.screw_offset),
                ));
            }
        }
        // Screw positions were computed in aperture-plane coordinates; shift
        // them into each panel's local frame.
        for panel in &mut panels {
            for screw in &mut panel.screws {
                screw.x -= panel.centre[0];
                screw.y -= panel.centre[1];
            }
        }

        Ok(Arc::new(PanelLayout {
            telescope: self.telescope.clone(),
            diameter: self.diameter,
            inner_radius: self.inner_radius,
            outer_radius: self.outer_radius,
            optics: self.optics,
            panels: Vec1::try_from_vec(panels).expect("at least one ring with panels exists"),
        }))
    }

    fn label(&self, ring: usize, i_panel: usize) -> String {
        match self.numbering {
            PanelNumbering::RingClockwiseTop => format!("{}-{}", ring + 1, i_panel + 1),
            PanelNumbering::SectorCounterclockwiseRight => {
                let n_sectors = self.panels_per_ring[0];
                let angle = TAU / self.panels_per_ring[ring] as f64;
                let sector_angle = TAU / n_sectors as f64;
                let theta = TAU - (i_panel as f64 + 0.5) * angle;
                let mut sector = ((theta / sector_angle + 1.0 + n_sectors as f64 / 4.0)
                    % n_sectors as f64) as usize;
                if sector == 0 {
                    sector = n_sectors;
                }
                let per_sector = self.panels_per_ring[ring] as f64 / n_sectors as f64;
                let j_panel = (per_sector - (i_panel as f64 % per_sector)) as usize;
                format!("{}-{}{}", sector, ring + 1, j_panel)
            }
        }
    }
}

/// An annular sector discretised into a closed polygon: inner arc outward,
/// outer arc back.
fn sector_polygon(
    r_in: f64,
    r_out: f64,
    theta0: f64,
    theta1: f64,
    arc_points: usize,
) -> Vec<[f64; 2]> {
    let steps = arc_points.max(1);
    let mut vertices = Vec::with_capacity(2 * (steps + 1));
    for k in 0..=steps {
        let theta = theta0 + (theta1 - theta0) * k as f64 / steps as f64;
        vertices.push([r_in * theta.cos(), r_in * theta.sin()]);
    }
    for k in (0..=steps).rev() {
        let theta = theta0 + (theta1 - theta0) * k as f64 / steps as f64;
        vertices.push([r_out * theta.cos(), r_out * theta.sin()]);
    }
    vertices
}

/// The four corner screws of an annular-sector panel, inset by `offset` from
/// the panel edges, in aperture-plane coordinates.
fn corner_screws(r_in: f64, r_out: f64, theta0: f64, theta1: f64, offset: f64) -> Vec<Screw> {
    let radial = |r: f64, theta: f64| [r * theta.cos(), r * theta.sin()];
    let r_lo = r_in + offset;
    let r_hi = r_out - offset;
    let a_lo = offset / r_lo;
    let a_hi = offset / r_hi;
    [
        ("il", radial(r_lo, theta0 + a_lo)),
        ("ir", radial(r_lo, theta1 - a_lo)),
        ("ol", radial(r_hi, theta0 + a_hi)),
        ("or", radial(r_hi, theta1 - a_hi)),
    ]
    .into_iter()
    .map(|(label, [x, y])| Screw {
        label: label.to_string(),
        x,
        y,
    })
    .collect()
}

lazy_static! {
    /// A nominal 25 m VLA-style dish: six rings, Cassegrain optics,
    /// ring-clockwise-top numbering.
    pub static ref VLA: Arc<PanelLayout> = RingedLayoutSpec {
        telescope: "VLA".to_string(),
        diameter: 25.0,
        inner_radius: 1.983,
        outer_radius: 12.5,
        optics: Optics::Cassegrain { effective_focal_length: 8.8 },
        ring_boundaries: vec![1.983, 3.683, 5.563, 7.391, 9.144, 10.87, 12.5],
        panels_per_ring: vec![12, 16, 24, 40, 40, 68],
        numbering: PanelNumbering::RingClockwiseTop,
        screw_offset: 0.0635,
        arc_points: 8,
    }
    .build()
    .expect("the built-in VLA layout is valid");

    /// A nominal 12 m ALMA-style dish: five rings, Cassegrain optics,
    /// sector numbering.
    pub static ref ALMA: Arc<PanelLayout> = RingedLayoutSpec {
        telescope: "ALMA".to_string(),
        diameter: 12.0,
        inner_radius: 0.375,
        outer_radius: 6.0,
        optics: Optics::Cassegrain { effective_focal_length: 4.8 },
        ring_boundaries: vec![0.375, 1.62, 2.88, 4.18, 5.33, 6.0],
        panels_per_ring: vec![12, 24, 24, 48, 48],
        numbering: PanelNumbering::SectorCounterclockwiseRight,
        screw_offset: 0.02,
        arc_points: 8,
    }
    .build()
    .expect("the built-in ALMA layout is valid");
}
