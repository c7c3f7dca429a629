//! Halo center finding and spherical-overdensity profiling for cosmological
//! N-body particle data.
//!
//! Given per-process particle arrays (produced by an external distribution /
//! ghost-exchange stage) and per-halo membership lists (produced by an
//! external friends-of-friends detector), this crate provides:
//!
//! - [`BucketGrid`]: a uniform 3D bucket grid with intrusive particle
//!   chains, the spatial index behind everything else;
//! - [`CenterFinder`]: the most-connected-particle and most-bound-particle
//!   center candidates, each with an exact O(N^2) method and a
//!   grid-accelerated method that must agree with it;
//! - [`SodProfiler`]: the spherical-overdensity radius, radial profile, and
//!   bulk properties of a halo around its FOF center.
//!
//! All components borrow the particle arrays and never mutate them; the
//! owner of the buffers must outlive every grid, finder, and profiler built
//! over them. Each component is single-threaded; independent halos can be
//! processed concurrently (see [`find_centers`]).
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use halo::{CenterFinder, CenterParams, ParticleBuffer};
//!
//! let mut halo_particles = ParticleBuffer::new();
//! halo_particles.push(Vec3::ZERO, Vec3::ZERO, 1.0, 0);
//! halo_particles.push(Vec3::new(0.1, 0.0, 0.0), Vec3::ZERO, 1.0, 1);
//!
//! let finder = CenterFinder::new(halo_particles.view(), CenterParams::new(0.2));
//! let mcp = finder.most_connected();
//! assert_eq!(mcp.index, 0);
//! assert_eq!(mcp.friend_count, 1);
//! ```

pub mod center;
pub mod constants;
pub mod driver;
pub mod grid;
pub mod params;
pub mod particle;
pub mod sod;

pub use center::{BoundCenter, CenterFinder, ConnectedCenter};
pub use driver::{find_centers, HaloCenter};
pub use glam::Vec3;
pub use grid::{BucketGrid, NO_PARTICLE};
pub use params::{CenterParams, SodParams};
pub use particle::{ParticleBuffer, ParticleSet};
pub use sod::{FofHalo, SodBin, SodHalo, SodProfiler};
