//! Physical and algorithmic defaults for halo finding.
//!
//! ## Unit Conventions
//!
//! Positions and lengths are comoving Mpc/h, masses are M_sun/h, velocities
//! are km/s. The critical density below is expressed in those units so that
//! SOD density ratios are dimensionless.

/// Critical density of the universe, M_sun/h per (Mpc/h)^3.
pub const RHO_C: f32 = 2.775_366_27e11;

/// Mass scale used for the initial SOD radius estimate (M_sun/h).
/// `initRadius = (haloMass / SOD_MASS)^(1/3)`.
pub const SOD_MASS: f32 = 1.0e14;

/// Default target overdensity ratio (the "200" in M200/R200).
pub const DENSITY_RATIO: f32 = 200.0;

/// Default number of logarithmic SOD profile bins (bin 0 is extra and
/// absorbs everything inside the minimum radius).
pub const NUM_SOD_BINS: usize = 20;

/// Default minimum-radius scale: `minRadius = MIN_RADIUS_FACTOR * smoothing_length`.
pub const MIN_RADIUS_FACTOR: f32 = 1.0;

/// Default maximum-radius scale: `maxRadius = MAX_RADIUS_FACTOR * initRadius`.
pub const MAX_RADIUS_FACTOR: f32 = 2.0;

/// Particle count at or above which the center finders switch from the
/// exact N^2 methods to their grid-accelerated variants.
pub const CENTER_EXACT_THRESHOLD: usize = 2048;

/// Cells per linking length for the chained most-connected search
/// (cell size = bb / CHAIN_FACTOR).
pub const CHAIN_FACTOR: u32 = 2;

/// Linking lengths per cell for the adaptive most-bound search
/// (cell size = bb * DISTANCE_FACTOR).
pub const DISTANCE_FACTOR: f32 = 5.0;

/// Boundary margin for the adaptive most-bound search, as a fraction of
/// the cell size.
pub const MARGIN_FACTOR: f32 = 0.25;
