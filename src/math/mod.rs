// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


use crate::c64;
use crate::constants::{PI, TAU};

/// Complex exponential. The argument is assumed to be purely imaginary.
///
/// This function doesn't actually use complex numbers; it just returns the
/// real and imag components from Euler's formula (i.e. e^{ix} = cos{x} + i
/// sin{x}).
#[inline]
pub(crate) fn cexp(x: f64) -> c64 {
    let (im, re) = x.sin_cos();
    c64::new(re, im)
}

/// Wrap a phase into (-π, π].
#[inline]
pub(crate) fn wrap_phase(x: f64) -> f64 {
    let mut w = x % TAU;
    if w > PI {
        w -= TAU;
    } else if w <= -PI {
        w += TAU;
    }
    w
}

/// The weighted root-mean-square of `values`. Zero- and negative-weight
/// entries contribute nothing. Returns NaN when no weight survives.
pub(crate) fn weighted_rms<I>(values: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (mut sum, mut wsum) = (0.0, 0.0);
    for (v, w) in values {
        if w > 0.0 {
            sum += w * v * v;
            wsum += w;
        }
    }
    (sum / wsum).sqrt()
}
