// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

All constants *must* be double precision. `holopanel` should do as many
calculations as possible in double precision before converting to a lower
precision, if it is ever required.
 */

pub use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Speed of light \[metres/second\].
pub const VEL_C: f64 = 299_792_458.0;

/// 4π, the phase-to-deviation denominator for an on-axis reflection.
pub const FOUR_PI: f64 = 4.0 * PI;

/// The default fraction of the peak aperture amplitude below which pixels are
/// considered too poorly illuminated to constrain a panel fit.
pub const DEFAULT_AMPLITUDE_CUTOFF: f64 = 0.2;

/// The default minimum fraction of spatial-frequency cells that must receive
/// at least one sample for an aperture inversion to be trusted.
pub const DEFAULT_MIN_COVERAGE: f64 = 0.5;
