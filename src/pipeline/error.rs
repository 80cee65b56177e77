// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::context::UnitKey;
use crate::geometry::GeometryError;
use crate::grid::GridError;

/// Why one unit failed. Unit-fatal only to that unit; siblings keep going.
#[derive(Error, Debug)]
pub enum UnitError {
    #[error("{0}")]
    Grid(#[from] GridError),

    #[error("{0}")]
    Geometry(#[from] GeometryError),
}

/// Why the orchestrator refused to run at all.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No units were supplied")]
    NoUnits,

    #[error("Unit {0} was supplied more than once")]
    DuplicateUnit(UnitKey),

    #[error("{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
