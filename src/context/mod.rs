// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Metadata on a holography observation.

An external collaborator is responsible for ingesting and calibrating the
measurement set; what arrives here is a finite bag of calibrated
[`HologSample`]s plus a [`ScanContext`] describing where they came from.
 */

use serde::{Deserialize, Serialize};

use crate::c64;
use crate::constants::VEL_C;

/// The identity of one independent unit of work: one antenna, one scan, one
/// data-description (spectral window). Everything a unit produces is keyed by
/// this.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitKey {
    /// Antenna name, e.g. "ea25".
    pub antenna: String,

    /// Scan number within the observation.
    pub scan: u32,

    /// Data-description (spectral window) index.
    pub ddi: u32,
}

impl std::fmt::Display for UnitKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} scan {} ddi {}", self.antenna, self.scan, self.ddi)
    }
}

/// Per-unit observation metadata supplied by the ingestion collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanContext {
    /// Antenna name, e.g. "ea25".
    pub antenna: String,

    /// Scan number within the observation.
    pub scan: u32,

    /// Data-description (spectral window) index.
    pub ddi: u32,

    /// The observing frequency \[Hz\]. Holographies are single channel; an
    /// averaged band is represented by its centroid frequency.
    pub frequency: f64,

    /// The nominal pointing during the scan (azimuth, elevation) \[radians\],
    /// if the ingestion collaborator supplied one.
    pub pointing: Option<(f64, f64)>,
}

impl ScanContext {
    /// The observing wavelength \[metres\].
    pub fn wavelength(&self) -> f64 {
        VEL_C / self.frequency
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            antenna: self.antenna.clone(),
            scan: self.scan,
            ddi: self.ddi,
        }
    }
}

/// One calibrated holography visibility. Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HologSample {
    /// u spatial-frequency coordinate \[1/metres\].
    pub u: f64,

    /// v spatial-frequency coordinate \[1/metres\].
    pub v: f64,

    /// The calibrated complex visibility.
    pub vis: c64,

    /// Statistical weight (1/σ²-style; bigger is better). Non-positive
    /// weights are ignored during gridding.
    pub weight: f64,
}

impl HologSample {
    pub fn new(u: f64, v: f64, vis: c64, weight: f64) -> HologSample {
        HologSample { u, v, vis, weight }
    }
}
