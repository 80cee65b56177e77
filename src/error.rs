// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all holopanel-related errors. This should be the *only*
//! error enum that is publicly visible.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HolopanelError {
    #[error("{0}")]
    Grid(#[from] crate::grid::GridError),

    #[error("{0}")]
    Geometry(#[from] crate::geometry::GeometryError),

    #[error("{0}")]
    Unit(#[from] crate::pipeline::UnitError),

    #[error("{0}")]
    Pipeline(#[from] crate::pipeline::PipelineError),
}
