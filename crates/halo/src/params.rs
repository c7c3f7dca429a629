//! Tunable parameters for the center finders and the SOD profiler.
//!
//! These are the in-memory form of the configuration scalars an external
//! driver parses from its config file; they are passed explicitly into each
//! component rather than held as global state.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants;

/// Parameters for [`crate::CenterFinder`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CenterParams {
    /// FOF linking length (Mpc/h): the "friend" distance threshold.
    pub bb: f32,
    /// Below this particle count the exact N^2 methods run; at or above it
    /// the grid-accelerated variants run. Never changes the answer.
    pub exact_threshold: usize,
    /// Cells per linking length for the chained most-connected search
    /// (cell size = bb / chain_factor).
    pub chain_factor: u32,
    /// Linking lengths per cell for the adaptive most-bound search
    /// (cell size = bb * distance_factor).
    pub distance_factor: f32,
    /// Boundary margin for the adaptive most-bound search, as a fraction
    /// of the cell size.
    pub margin_factor: f32,
}

impl CenterParams {
    /// Parameters for the given linking length, defaults elsewhere.
    pub fn new(bb: f32) -> Self {
        Self {
            bb,
            ..Self::default()
        }
    }
}

impl Default for CenterParams {
    fn default() -> Self {
        Self {
            bb: 0.2,
            exact_threshold: constants::CENTER_EXACT_THRESHOLD,
            chain_factor: constants::CHAIN_FACTOR,
            distance_factor: constants::DISTANCE_FACTOR,
            margin_factor: constants::MARGIN_FACTOR,
        }
    }
}

/// Parameters for [`crate::SodProfiler`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SodParams {
    /// Critical density (M_sun/h per (Mpc/h)^3).
    pub rho_c: f32,
    /// Mass scale for the initial radius estimate:
    /// `initRadius = (haloMass / mass_scale)^(1/3)`.
    pub mass_scale: f32,
    /// Target overdensity ratio defining the SOD boundary.
    pub density_ratio: f32,
    /// Number of logarithmic profile bins (an extra bin 0 absorbs
    /// everything inside the minimum radius).
    pub bins: usize,
    /// `minRadius = min_factor * smoothing_length`.
    pub min_factor: f32,
    /// `maxRadius = max_factor * initRadius`.
    pub max_factor: f32,
    /// Force smoothing length of the simulation (Mpc/h).
    pub smoothing_length: f32,
    /// Lower corner of the locally valid (non-ghost) domain.
    pub domain_min: Vec3,
    /// Upper corner of the locally valid (non-ghost) domain.
    pub domain_max: Vec3,
}

impl SodParams {
    /// Parameters for a local domain spanning `[0, box_size]` per axis,
    /// defaults elsewhere.
    pub fn for_box(box_size: f32, smoothing_length: f32) -> Self {
        Self {
            smoothing_length,
            domain_min: Vec3::ZERO,
            domain_max: Vec3::splat(box_size),
            ..Self::default()
        }
    }
}

impl Default for SodParams {
    fn default() -> Self {
        Self {
            rho_c: constants::RHO_C,
            mass_scale: constants::SOD_MASS,
            density_ratio: constants::DENSITY_RATIO,
            bins: constants::NUM_SOD_BINS,
            min_factor: constants::MIN_RADIUS_FACTOR,
            max_factor: constants::MAX_RADIUS_FACTOR,
            smoothing_length: 0.1,
            domain_min: Vec3::ZERO,
            domain_max: Vec3::splat(64.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_params_defaults() {
        let p = CenterParams::new(0.168);
        assert_eq!(p.bb, 0.168);
        assert_eq!(p.chain_factor, 2);
        assert!(p.exact_threshold > 0);
    }

    #[test]
    fn test_sod_params_for_box() {
        let p = SodParams::for_box(128.0, 0.05);
        assert_eq!(p.domain_max, Vec3::splat(128.0));
        assert_eq!(p.smoothing_length, 0.05);
        assert_eq!(p.density_ratio, 200.0);
    }
}
