// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Accumulation of calibrated holography samples onto a regular
//! spatial-frequency grid.
//!
//! Accumulation is a plain weighted sum per cell, so it is commutative;
//! partial grids accumulated from disjoint sample sets can be merged and the
//! result does not depend on sample order. [`grid_samples_partitioned`]
//! exploits this to accumulate in parallel.

mod error;

pub use error::GridError;

use log::{debug, trace};
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::c64;
use crate::constants::DEFAULT_MIN_COVERAGE;
use crate::context::HologSample;

/// How a sample is deposited onto the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GridKernel {
    /// The whole sample lands in its nearest cell.
    Nearest,

    /// The sample is spread over neighbouring cells with a truncated-Gaussian
    /// convolution kernel. The aperture image must then be divided by the
    /// kernel's transform; [`crate::aperture::invert`] does this
    /// automatically.
    Gaussian {
        /// Kernel support half-width \[cells\]. The kernel covers
        /// (2 * half_width + 1)² cells.
        half_width: usize,

        /// Kernel standard deviation \[cells\].
        sigma: f64,
    },
}

impl Default for GridKernel {
    fn default() -> GridKernel {
        GridKernel::Nearest
    }
}

/// Gridding configuration for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridParams {
    /// The number of cells along each grid side. Must be even so that the
    /// zero-spatial-frequency cell sits at index `size / 2`.
    pub size: usize,

    /// Samples span u, v in (-max_uv, max_uv) \[1/metres\]; anything outside
    /// is dropped (and counted). The cell size is `2 * max_uv / size`.
    pub max_uv: f64,

    /// The deposition kernel.
    pub kernel: GridKernel,

    /// The minimum fraction of cells that must receive at least one sample.
    /// An inversion of a sparser grid rings too much to be trusted.
    pub min_coverage: f64,
}

impl GridParams {
    pub fn new(size: usize, max_uv: f64) -> GridParams {
        GridParams {
            size,
            max_uv,
            kernel: GridKernel::default(),
            min_coverage: DEFAULT_MIN_COVERAGE,
        }
    }

    /// The grid cell size \[1/metres\].
    pub fn cell(&self) -> f64 {
        2.0 * self.max_uv / self.size as f64
    }

    /// The physical size of an aperture-image pixel after inversion
    /// \[metres\].
    pub fn aperture_pixel(&self) -> f64 {
        1.0 / (self.size as f64 * self.cell())
    }

    fn validate(&self) -> Result<(), GridError> {
        if self.size < 4 || self.size % 2 != 0 {
            return Err(GridError::BadSize { size: self.size });
        }
        if !(self.max_uv > 0.0) {
            return Err(GridError::BadExtent { max_uv: self.max_uv });
        }
        Ok(())
    }
}

/// Weighted sums of visibilities on a regular spatial-frequency grid, for one
/// (antenna, scan, ddi) unit.
///
/// `vis` holds Σ w·V and `weight` holds Σ w per cell. Cells with zero weight
/// received no samples; they are *unfilled*, which is not the same thing as
/// holding a zero visibility.
#[derive(Debug, Clone)]
pub struct ApertureGrid {
    pub params: GridParams,

    /// Per-cell Σ weight · visibility.
    pub vis: Array2<c64>,

    /// Per-cell Σ weight. Never negative.
    pub weight: Array2<f64>,

    /// The number of samples deposited.
    pub num_samples: usize,

    /// The number of samples dropped for falling outside the grid extent or
    /// carrying a non-positive weight.
    pub num_rejected: usize,
}

impl ApertureGrid {
    fn empty(params: GridParams) -> ApertureGrid {
        let n = params.size;
        ApertureGrid {
            params,
            vis: Array2::zeros((n, n)),
            weight: Array2::zeros((n, n)),
            num_samples: 0,
            num_rejected: 0,
        }
    }

    /// Deposit one sample. Out-of-extent samples and non-positive weights are
    /// rejected, not errors; a handful of stragglers outside the requested
    /// extent is normal for real pointings.
    fn accumulate(&mut self, sample: &HologSample) {
        if !(sample.weight > 0.0) {
            self.num_rejected += 1;
            return;
        }
        let n = self.params.size as isize;
        let cell = self.params.cell();
        let iu = (sample.u / cell).round() as isize + n / 2;
        let iv = (sample.v / cell).round() as isize + n / 2;

        match self.params.kernel {
            GridKernel::Nearest => {
                if iu < 0 || iu >= n || iv < 0 || iv >= n {
                    self.num_rejected += 1;
                    return;
                }
                let (iu, iv) = (iu as usize, iv as usize);
                self.vis[(iu, iv)] += sample.vis * sample.weight;
                self.weight[(iu, iv)] += sample.weight;
            }

            GridKernel::Gaussian { half_width, sigma } => {
                let hw = half_width as isize;
                if iu + hw < 0 || iu - hw >= n || iv + hw < 0 || iv - hw >= n {
                    self.num_rejected += 1;
                    return;
                }
                // Distances are measured from the sample's true u,v, not the
                // centre of its nearest cell.
                let (fu, fv) = (sample.u / cell, sample.v / cell);
                for du in -hw..=hw {
                    for dv in -hw..=hw {
                        let (ju, jv) = (iu + du, iv + dv);
                        if ju < 0 || ju >= n || jv < 0 || jv >= n {
                            continue;
                        }
                        let ru = (ju - n / 2) as f64 - fu;
                        let rv = (jv - n / 2) as f64 - fv;
                        let k = (-(ru * ru + rv * rv) / (2.0 * sigma * sigma)).exp();
                        let (ju, jv) = (ju as usize, jv as usize);
                        self.vis[(ju, jv)] += sample.vis * (sample.weight * k);
                        self.weight[(ju, jv)] += sample.weight * k;
                    }
                }
            }
        }
        self.num_samples += 1;
    }

    /// Merge another partial grid into this one. Both must have been
    /// accumulated with identical parameters.
    pub fn merge(&mut self, other: &ApertureGrid) {
        assert_eq!(
            self.params, other.params,
            "cannot merge grids accumulated with different parameters"
        );
        self.vis += &other.vis;
        self.weight += &other.weight;
        self.num_samples += other.num_samples;
        self.num_rejected += other.num_rejected;
    }

    /// The number of cells that received at least one sample.
    pub fn filled_cells(&self) -> usize {
        self.weight.iter().filter(|&&w| w > 0.0).count()
    }

    /// The fraction of cells that received at least one sample.
    pub fn coverage(&self) -> f64 {
        self.filled_cells() as f64 / (self.params.size * self.params.size) as f64
    }

    fn check_coverage(&self) -> Result<(), GridError> {
        let coverage = self.coverage();
        if coverage < self.params.min_coverage {
            return Err(GridError::InsufficientData {
                coverage,
                min_coverage: self.params.min_coverage,
            });
        }
        Ok(())
    }
}

/// Grid all of a unit's samples.
///
/// The accumulation is a commutative sum, so permuting `samples` changes the
/// result only at the floating-point rounding level.
pub fn grid_samples(samples: &[HologSample], params: &GridParams) -> Result<ApertureGrid, GridError> {
    params.validate()?;
    let mut grid = ApertureGrid::empty(params.clone());
    for sample in samples {
        grid.accumulate(sample);
    }
    finish(grid)
}

/// Grid all of a unit's samples, accumulating partial grids in parallel and
/// merging them. Produces the same grid as [`grid_samples`] up to
/// floating-point rounding.
pub fn grid_samples_partitioned(
    samples: &[HologSample],
    params: &GridParams,
) -> Result<ApertureGrid, GridError> {
    params.validate()?;
    let grid = samples
        .par_chunks(4096.max(samples.len() / 64 + 1))
        .fold(
            || ApertureGrid::empty(params.clone()),
            |mut grid, chunk| {
                for sample in chunk {
                    grid.accumulate(sample);
                }
                grid
            },
        )
        .reduce(
            || ApertureGrid::empty(params.clone()),
            |mut a, b| {
                a.merge(&b);
                a
            },
        );
    finish(grid)
}

fn finish(grid: ApertureGrid) -> Result<ApertureGrid, GridError> {
    if grid.num_rejected > 0 {
        debug!(
            "{} of {} samples fell outside the grid or had non-positive weight",
            grid.num_rejected,
            grid.num_samples + grid.num_rejected
        );
    }
    trace!(
        "gridded {} samples into {} of {} cells",
        grid.num_samples,
        grid.filled_cells(),
        grid.params.size * grid.params.size
    );
    grid.check_coverage()?;
    Ok(grid)
}
