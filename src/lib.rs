// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Aperture holography panel-adjustment software for radio telescope reflectors.

Calibrated holography visibilities go in; reconstructed aperture images and
per-panel screw adjustments come out. The pipeline for one
(antenna, scan, ddi) unit is: grid the visibilities, invert the grid into an
aperture image, register the telescope's panel layout onto that image, fit
each panel's surface, and resolve the fits into screw adjustments. Units are
processed independently and in parallel; see [`pipeline::process_units`].
 */

pub mod aperture;
pub mod constants;
pub mod context;
mod error;
pub mod geometry;
pub mod grid;
pub(crate) mod math;
pub mod pipeline;
pub mod screws;
pub mod surface;

// Re-exports.
pub use aperture::{invert, ApertureImage, InversionParams, PhaseReference, Window};
pub use context::{HologSample, ScanContext, UnitKey};
pub use error::HolopanelError;
pub use geometry::{
    register_panels, Optics, Panel, PanelGeometryProvider, PanelLayout, RegistrationParams, Screw,
};
pub use grid::{grid_samples, ApertureGrid, GridKernel, GridParams};
pub use pipeline::{
    process_unit, process_units, PipelineParams, ProcessingUnit, SurfaceReport, UnitResult,
};
pub use screws::ScrewAdjustment;
pub use surface::{fit_panel, FitFlag, FitParams, PanelFitResult, SurfaceModel};

// External re-exports.
pub use vec1::Vec1;

use crossbeam_utils::atomic::AtomicCell;

/// A shorthand for a double-precision complex number.
#[allow(non_camel_case_types)]
pub type c64 = num_complex::Complex<f64>;

/// Are progress bars being drawn? This should only be enabled by a front end
/// driving the library interactively.
pub static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);
