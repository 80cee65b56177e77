// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Grid size {size} is not an even number of at least 4 cells")]
    BadSize { size: usize },

    #[error("Grid spatial-frequency extent must be positive, got {max_uv}")]
    BadExtent { max_uv: f64 },

    #[error(
        "Only {coverage:.3} of grid cells received samples (minimum {min_coverage:.3}); \
         an aperture inversion from so sparse a grid is unreliable"
    )]
    InsufficientData { coverage: f64, min_coverage: f64 },
}
