// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error(
        "The aperture image half-extent ({extent:.3} m) does not cover the telescope's \
         outer ring radius ({required:.3} m); re-grid with a finer spatial-frequency cell"
    )]
    Mismatch { extent: f64, required: f64 },

    #[error("No panel layout is available for antenna {antenna}")]
    UnknownAntenna { antenna: String },

    #[error(
        "A ringed layout needs one more ring boundary than panel counts; got {boundaries} \
         boundaries for {counts} rings"
    )]
    RingSpec { boundaries: usize, counts: usize },

    #[error("A ringed layout needs at least one ring with at least one panel")]
    EmptyRings,

    #[error("Ring boundaries must increase monotonically outward")]
    BadBoundaries,
}
