// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Physical panel layouts of reflector antennas and their registration onto
aperture images.

A [`PanelLayout`] is static reference data: panel polygons, screw positions
and the optical prescription for one antenna design. Layouts are immutable
and shared by reference across every unit that processes an antenna of that
design, so registration is a pure function of its inputs.

Telescope-specific variation lives behind [`PanelGeometryProvider`]; a new
dish design is supported by implementing the trait, not by teaching the
pipeline about it.
 */

mod error;
pub mod ringed;

pub use error::GeometryError;

use std::collections::HashMap;
use std::sync::Arc;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use crate::aperture::ApertureImage;
use crate::constants::{DEFAULT_AMPLITUDE_CUTOFF, FOUR_PI, TAU};
use crate::grid::ApertureGrid;

/// The optical prescription used to convert aperture phase into a physical
/// deviation along the local surface normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Optics {
    /// Treat the surface as flat: deviation = phase · λ / 4π everywhere.
    /// Adequate for shallow dishes or quick looks.
    Flat,

    /// A prime-focus paraboloid with the given focal length \[metres\].
    PrimeFocus { focal_length: f64 },

    /// A Cassegrain system, characterised by the effective focal length of
    /// the primary \[metres\]. The deviation formula matches the prime-focus
    /// one; the sub-reflector only changes which focal length applies.
    Cassegrain { effective_focal_length: f64 },
}

impl Optics {
    /// The factor converting phase \[radians\] to outward surface deviation
    /// \[metres\] at `radius` metres from the aperture centre.
    ///
    /// For a paraboloid the path-length change of a reflection at radius r is
    /// shortened by the surface slope, giving
    /// `λ/2π · sqrt(r² + 4f²) / 4f`; on axis this reduces to the familiar
    /// λ/4π.
    pub fn phase_to_deviation_factor(self, radius: f64, wavelength: f64) -> f64 {
        match self {
            Optics::Flat => wavelength / FOUR_PI,
            Optics::PrimeFocus { focal_length: f }
            | Optics::Cassegrain {
                effective_focal_length: f,
            } => (wavelength / TAU) * (radius * radius + 4.0 * f * f).sqrt() / (4.0 * f),
        }
    }
}

/// One adjuster screw, positioned in its panel's local frame (metres from the
/// panel centroid).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screw {
    /// A short name, e.g. "il" for the inner-left screw of a ringed panel.
    pub label: String,
    pub x: f64,
    pub y: f64,
}

/// One physical panel of a reflector: a polygon in aperture-plane
/// coordinates plus its adjuster screws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    /// Panel designation as a maintenance crew knows it, e.g. "3-12".
    pub label: String,

    /// The ring the panel belongs to, 0 innermost. Purely informational for
    /// polygon layouts.
    pub ring: usize,

    /// Polygon vertices in aperture-plane coordinates \[metres\]. Implicitly
    /// closed.
    pub vertices: Vec<[f64; 2]>,

    /// The panel-local frame origin (the polygon centroid) in aperture-plane
    /// coordinates \[metres\].
    pub centre: [f64; 2],

    /// Adjuster screws, in the panel-local frame.
    pub screws: Vec<Screw>,
}

impl Panel {
    /// Build a panel from its polygon, computing the local frame origin.
    /// `screws` are given in the local frame.
    pub fn new(label: String, ring: usize, vertices: Vec<[f64; 2]>, screws: Vec<Screw>) -> Panel {
        let centre = polygon_centroid(&vertices);
        Panel {
            label,
            ring,
            vertices,
            centre,
            screws,
        }
    }

    /// Even-odd point-in-polygon test in aperture-plane coordinates.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        let v = &self.vertices;
        let mut inside = false;
        let mut j = v.len() - 1;
        for i in 0..v.len() {
            let (xi, yi) = (v[i][0], v[i][1]);
            let (xj, yj) = (v[j][0], v[j][1]);
            if (yi > y) != (yj > y) {
                let x_cross = xi + (y - yi) * (xj - xi) / (yj - yi);
                if x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// The area centroid of a simple polygon, falling back to the vertex mean
/// for degenerate (zero-area) inputs.
fn polygon_centroid(vertices: &[[f64; 2]]) -> [f64; 2] {
    let n = vertices.len();
    let (mut area2, mut cx, mut cy) = (0.0, 0.0, 0.0);
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = vertices[i][0] * vertices[j][1] - vertices[j][0] * vertices[i][1];
        area2 += cross;
        cx += (vertices[i][0] + vertices[j][0]) * cross;
        cy += (vertices[i][1] + vertices[j][1]) * cross;
    }
    if area2.abs() < f64::EPSILON {
        let (mut mx, mut my) = (0.0, 0.0);
        for v in vertices {
            mx += v[0];
            my += v[1];
        }
        return [mx / n as f64, my / n as f64];
    }
    [cx / (3.0 * area2), cy / (3.0 * area2)]
}

/// The static panel geometry of one antenna design.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelLayout {
    /// Telescope/design name, e.g. "VLA".
    pub telescope: String,

    /// Dish diameter \[metres\].
    pub diameter: f64,

    /// Radius of the central blockage (receiver/sub-reflector hole)
    /// \[metres\]. Pixels inside it never constrain a panel.
    pub inner_radius: f64,

    /// Outer radius of the panelled surface \[metres\].
    pub outer_radius: f64,

    pub optics: Optics,

    /// At least one panel. Panel index in this list is the identity used
    /// throughout fitting and reporting.
    pub panels: Vec1<Panel>,
}

/// The geometry-database contract: hand back the (immutable, shared) panel
/// layout for a named antenna.
pub trait PanelGeometryProvider: Send + Sync {
    fn layout(&self, antenna: &str) -> Result<Arc<PanelLayout>, GeometryError>;
}

/// The simplest provider: every antenna in the array shares one design.
impl PanelGeometryProvider for Arc<PanelLayout> {
    fn layout(&self, _antenna: &str) -> Result<Arc<PanelLayout>, GeometryError> {
        Ok(Arc::clone(self))
    }
}

/// A provider mapping antenna names to layouts, with an optional fallback
/// design for antennas not named explicitly.
#[derive(Default)]
pub struct LayoutCatalogue {
    layouts: HashMap<String, Arc<PanelLayout>>,
    fallback: Option<Arc<PanelLayout>>,
}

impl LayoutCatalogue {
    pub fn new() -> LayoutCatalogue {
        LayoutCatalogue::default()
    }

    pub fn insert(&mut self, antenna: &str, layout: Arc<PanelLayout>) {
        self.layouts.insert(antenna.to_string(), layout);
    }

    pub fn with_fallback(mut self, layout: Arc<PanelLayout>) -> LayoutCatalogue {
        self.fallback = Some(layout);
        self
    }
}

impl PanelGeometryProvider for LayoutCatalogue {
    fn layout(&self, antenna: &str) -> Result<Arc<PanelLayout>, GeometryError> {
        self.layouts
            .get(antenna)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| GeometryError::UnknownAntenna {
                antenna: antenna.to_string(),
            })
    }
}

/// How each masked pixel is weighted in its panel's fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitWeighting {
    /// All masked pixels count equally.
    Uniform,

    /// The accumulated gridding weight at the pixel's index, a proxy for its
    /// signal-to-noise.
    #[default]
    GridWeight,

    /// The square of the pixel's illumination amplitude relative to the
    /// peak.
    Amplitude,
}

/// Registration configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegistrationParams {
    /// Pixels dimmer than this fraction of the peak illumination amplitude
    /// are masked out.
    pub amplitude_cutoff: f64,

    /// Pixels whose accumulated gridding weight is below this are masked
    /// out. Zero still excludes unobserved cells.
    pub min_weight: f64,

    pub weighting: FitWeighting,
}

impl Default for RegistrationParams {
    fn default() -> RegistrationParams {
        RegistrationParams {
            amplitude_cutoff: DEFAULT_AMPLITUDE_CUTOFF,
            min_weight: 0.0,
            weighting: FitWeighting::default(),
        }
    }
}

/// One usable aperture pixel, expressed in its panel's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSample {
    /// Image pixel indices the sample came from.
    pub ix: usize,
    pub iy: usize,

    /// Position in the panel-local frame \[metres\].
    pub x: f64,
    pub y: f64,

    /// Outward surface deviation \[metres\].
    pub deviation: f64,

    /// Fit weight per the configured [`FitWeighting`].
    pub weight: f64,
}

/// The usable aperture pixels enclosed by one panel's polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelSamples {
    /// Index into [`PanelLayout::panels`].
    pub i_panel: usize,
    pub samples: Vec<SurfaceSample>,
}

/// The outcome of registering a layout onto an aperture image.
#[derive(Debug, Clone)]
pub struct Registration {
    /// True where a pixel is illuminated, inside the panelled annulus, and
    /// carries weight; the pixels that are allowed to constrain panels and
    /// surface statistics.
    pub mask: Array2<bool>,

    /// Per-panel samples, in panel-index order. Panels enclosing no usable
    /// pixel get an empty sample list (the fitter flags them, it is not an
    /// error here).
    pub panel_samples: Vec<PanelSamples>,
}

/// Register a panel layout onto an aperture image.
///
/// A pixel on a boundary shared by several panels is assigned to the
/// lowest-indexed one, so no pixel ever constrains two panels.
pub fn register_panels(
    layout: &PanelLayout,
    image: &ApertureImage,
    grid: &ApertureGrid,
    params: &RegistrationParams,
) -> Result<Registration, GeometryError> {
    let half_extent = image.half_extent();
    // A hair of tolerance so an image sized exactly to the dish registers.
    if half_extent * (1.0 + 1e-9) < layout.outer_radius {
        return Err(GeometryError::Mismatch {
            extent: half_extent,
            required: layout.outer_radius,
        });
    }

    let n = image.size();
    let peak = image.amplitude.iter().cloned().fold(0.0, f64::max);
    let cut = params.amplitude_cutoff * peak;

    let mut mask = Array2::from_elem((n, n), false);
    let mut panel_samples: Vec<PanelSamples> = (0..layout.panels.len())
        .map(|i_panel| PanelSamples {
            i_panel,
            samples: vec![],
        })
        .collect();

    for ix in 0..n {
        let x = image.x_axis[ix];
        for iy in 0..n {
            let y = image.y_axis[iy];
            let r = x.hypot(y);
            let amplitude = image.amplitude[(ix, iy)];
            let deviation = image.deviation[(ix, iy)];
            let cell_weight = grid.weight[(ix, iy)];
            let usable = amplitude >= cut
                && r >= layout.inner_radius
                && r <= layout.outer_radius
                && cell_weight > 0.0
                && cell_weight >= params.min_weight
                && deviation.is_finite();
            if !usable {
                continue;
            }
            mask[(ix, iy)] = true;

            // Lowest-indexed containing panel wins; a pixel belongs to at
            // most one panel.
            if let Some(panel) = layout.panels.iter().position(|p| p.contains(x, y)) {
                let weight = match params.weighting {
                    FitWeighting::Uniform => 1.0,
                    FitWeighting::GridWeight => grid.weight[(ix, iy)],
                    FitWeighting::Amplitude => {
                        let a = amplitude / peak;
                        a * a
                    }
                };
                let centre = layout.panels[panel].centre;
                panel_samples[panel].samples.push(SurfaceSample {
                    ix,
                    iy,
                    x: x - centre[0],
                    y: y - centre[1],
                    deviation,
                    weight,
                });
            }
        }
    }

    Ok(Registration {
        mask,
        panel_samples,
    })
}
