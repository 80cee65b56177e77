// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Inversion of a gridded holography measurement into a complex
//! aperture-plane image.
//!
//! The grid is weight-normalised per cell (unfilled cells stay at the neutral
//! zero and are never part of a normalisation), apodised, and put through an
//! inverse 2-D FFT with centred conventions, so the aperture centre lands on
//! pixel (n/2, n/2). Phases are then re-referenced, wrapped into (-π, π] and
//! converted to physical surface deviations using the telescope optics.


use ndarray::{Array2, Zip};
use num_traits::Zero;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::c64;
use crate::constants::PI;
use crate::geometry::Optics;
use crate::grid::{ApertureGrid, GridKernel};
use crate::math::wrap_phase;

/// Apodisation applied to the grid before inversion, to suppress ringing off
/// the grid edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Window {
    /// No taper. Sharpest aperture resolution, worst ringing.
    None,

    /// A raised-cosine taper going to zero at the grid edge.
    #[default]
    Hann,

    /// A parabolic taper; gentler than Hann.
    Welch,
}

impl Window {
    /// The taper value for index `i` of an `n`-cell axis whose centre is
    /// `n / 2`.
    fn value(self, i: usize, n: usize) -> f64 {
        let x = (i as f64 - (n / 2) as f64) / (n / 2) as f64;
        match self {
            Window::None => 1.0,
            Window::Hann => 0.5 * (1.0 + (PI * x).cos()),
            Window::Welch => 1.0 - x * x,
        }
    }
}

/// The pixel against which all aperture phases are referenced before
/// wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseReference {
    /// The aperture-centre pixel (n/2, n/2).
    #[default]
    Centre,

    /// An explicit pixel. Must lie on the image.
    Pixel(usize, usize),

    /// Leave phases as the transform produced them.
    None,
}

/// Inversion configuration for one unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InversionParams {
    pub window: Window,
    pub phase_reference: PhaseReference,
}

/// A complex aperture-plane image with its phases also expressed as physical
/// surface deviations.
///
/// The pixel grid matches the originating [`ApertureGrid`] exactly: `n`
/// pixels per side, pixel `(i, j)` sitting at physical position
/// `(x_axis[i], y_axis[j])` metres from the aperture centre. Positive
/// deviation means the surface sits outward of the ideal paraboloid, along
/// the local normal.
#[derive(Debug, Clone)]
pub struct ApertureImage {
    /// Illumination amplitude per pixel.
    pub amplitude: Array2<f64>,

    /// Phase per pixel, referenced per the [`PhaseReference`] used and
    /// wrapped into (-π, π] \[radians\].
    pub phase: Array2<f64>,

    /// Physical surface deviation per pixel \[metres\], positive outward.
    pub deviation: Array2<f64>,

    /// Pixel centre positions along the first array axis \[metres\].
    pub x_axis: Vec<f64>,

    /// Pixel centre positions along the second array axis \[metres\].
    pub y_axis: Vec<f64>,

    /// Physical size of a pixel \[metres\].
    pub pixel_size: f64,

    /// The observing wavelength the phases were measured at \[metres\].
    pub wavelength: f64,

    /// The optics used to convert phase to deviation.
    pub optics: Optics,
}

impl ApertureImage {
    /// The number of pixels along each image side.
    pub fn size(&self) -> usize {
        self.x_axis.len()
    }

    /// Half the physical extent of the image \[metres\]. The image spans
    /// (-half_extent, half_extent) on both axes.
    pub fn half_extent(&self) -> f64 {
        (self.size() / 2) as f64 * self.pixel_size
    }
}

/// Invert one unit's grid into an aperture image. Deterministic; the grid is
/// not modified.
pub fn invert(
    grid: &ApertureGrid,
    optics: Optics,
    wavelength: f64,
    params: &InversionParams,
) -> ApertureImage {
    assert!(wavelength > 0.0, "wavelength must be positive");
    let n = grid.params.size;

    // Weight normalisation. Unfilled cells hold no information; they stay at
    // zero rather than being divided.
    let mut plane = Array2::<c64>::zeros((n, n));
    Zip::from(&mut plane)
        .and(&grid.vis)
        .and(&grid.weight)
        .par_for_each(|p, &v, &w| {
            if w > 0.0 {
                *p = v / w;
            }
        });

    // Apodisation.
    if params.window != Window::None {
        for ((i, j), p) in plane.indexed_iter_mut() {
            *p *= params.window.value(i, n) * params.window.value(j, n);
        }
    }

    let mut plane = ifft2_centred(plane);

    // Un-gridding correction: a convolving deposition kernel tapers the
    // aperture by its own transform, which is undone here.
    if let GridKernel::Gaussian { sigma, .. } = grid.params.kernel {
        let pixel = grid.params.aperture_pixel();
        let sigma_uv = sigma * grid.params.cell();
        let gamma = 2.0 * PI * PI * sigma_uv * sigma_uv;
        for ((i, j), p) in plane.indexed_iter_mut() {
            let x = (i as f64 - (n / 2) as f64) * pixel;
            let y = (j as f64 - (n / 2) as f64) * pixel;
            let c = (-gamma * (x * x + y * y)).exp();
            *p /= c.max(1e-6);
        }
    }

    let amplitude = plane.mapv(|z| z.norm());

    let reference = match params.phase_reference {
        PhaseReference::Centre => plane[(n / 2, n / 2)].arg(),
        PhaseReference::Pixel(i, j) => {
            assert!(i < n && j < n, "phase-reference pixel must lie on the image");
            plane[(i, j)].arg()
        }
        PhaseReference::None => 0.0,
    };
    let phase = plane.mapv(|z| wrap_phase(z.arg() - reference));

    let pixel_size = grid.params.aperture_pixel();
    let axis: Vec<f64> = (0..n)
        .map(|i| (i as f64 - (n / 2) as f64) * pixel_size)
        .collect();

    let mut deviation = Array2::zeros((n, n));
    for ((i, j), d) in deviation.indexed_iter_mut() {
        let r = axis[i].hypot(axis[j]);
        *d = phase[(i, j)] * optics.phase_to_deviation_factor(r, wavelength);
    }

    ApertureImage {
        amplitude,
        phase,
        deviation,
        x_axis: axis.clone(),
        y_axis: axis,
        pixel_size,
        wavelength,
        optics,
    }
}

/// An inverse 2-D FFT with centred conventions on both planes: input index
/// n/2 is zero spatial frequency, output index n/2 is the aperture centre.
/// The result carries the conventional 1/n² inverse normalisation.
fn ifft2_centred(mut a: Array2<c64>) -> Array2<c64> {
    let n = a.nrows();
    fft_shift(&mut a);

    let fft = FftPlanner::new().plan_fft_inverse(n);
    let mut scratch = vec![c64::zero(); fft.get_inplace_scratch_len()];
    for mut row in a.rows_mut() {
        let row = row
            .as_slice_mut()
            .expect("rows of a standard-layout array are contiguous");
        fft.process_with_scratch(row, &mut scratch);
    }
    let mut column = vec![c64::zero(); n];
    for j in 0..n {
        for i in 0..n {
            column[i] = a[(i, j)];
        }
        fft.process_with_scratch(&mut column, &mut scratch);
        for i in 0..n {
            a[(i, j)] = column[i];
        }
    }

    fft_shift(&mut a);
    let norm = (n * n) as f64;
    a.mapv_inplace(|z| z / norm);
    a
}

/// Swap quadrants so that index n/2 maps to index 0 and vice versa. For the
/// even sizes the grid enforces, this is its own inverse.
fn fft_shift(a: &mut Array2<c64>) {
    let (n0, n1) = a.dim();
    let (h0, h1) = (n0 / 2, n1 / 2);
    for i in 0..h0 {
        for j in 0..n1 {
            a.swap((i, j), (i + h0, (j + h1) % n1));
        }
    }
}
