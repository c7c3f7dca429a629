//! Spherical-overdensity (SOD) halo profiling.
//!
//! Around a FOF-derived halo center, accumulates a logarithmically binned
//! radial mass profile from a domain-wide bucket grid, finds the radius at
//! which the enclosed density drops below a target multiple of the critical
//! density (interpolated exactly, particle by particle, inside the critical
//! bin), gathers the enclosed particle set, and reduces its bulk properties.
//!
//! "No SOD halo at the requested density ratio" is a normal outcome:
//! characteristic radius 0, zero gathered particles.

use glam::{DVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::grid::BucketGrid;
use crate::params::SodParams;
use crate::particle::ParticleSet;

const FOUR_THIRDS_PI: f64 = 4.0 / 3.0 * std::f64::consts::PI;

/// FOF-derived halo summary driving one SOD computation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FofHalo {
    /// Halo center (typically the most-bound or most-connected particle).
    pub center: Vec3,
    /// Mean velocity of the FOF membership.
    pub mean_velocity: Vec3,
    /// FOF particle count.
    pub count: usize,
    /// Summed FOF mass (M_sun/h).
    pub mass: f32,
}

/// One radial profile bin. Bin 0 absorbs everything inside the minimum
/// radius; bins 1..=N split `[minRadius, maxRadius]` logarithmically.
#[derive(Clone, Debug, Default)]
pub struct SodBin {
    /// Particles binned here.
    pub count: u32,
    /// Summed mass.
    pub mass: f64,
    /// Summed radial distance from the halo center.
    pub radius_sum: f64,
    /// Summed radial velocity relative to the halo mean velocity.
    pub radial_velocity_sum: f64,
    /// (distance, domain-local particle index) pairs, for exact
    /// interpolation inside the critical bin.
    members: Vec<(f32, usize)>,
}

impl SodBin {
    /// Mean radial distance of the bin's particles (0 for an empty bin).
    pub fn average_radius(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.radius_sum / self.count as f64
        }
    }

    /// Mean radial velocity of the bin's particles (0 for an empty bin).
    pub fn average_radial_velocity(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.radial_velocity_sum / self.count as f64
        }
    }
}

/// Result of one SOD computation.
#[derive(Clone, Debug, Default)]
pub struct SodHalo {
    /// Characteristic (overdensity) radius; 0 when no valid SOD radius
    /// exists at the requested density ratio.
    pub radius: f32,
    /// Number of gathered SOD particles; 0 when no valid radius exists.
    pub count: usize,
    /// Unweighted mean position of the gathered set.
    pub average_location: Vec3,
    /// Mass-weighted mean position of the gathered set.
    pub center_of_mass: Vec3,
    /// Mean velocity of the gathered set.
    pub mean_velocity: Vec3,
    /// Summed mass of the gathered set.
    pub total_mass: f64,
    /// `sqrt(avg(|v|^2) - |mean_v|^2) / 3` over the gathered set.
    pub velocity_dispersion: f32,
    /// True when the maximum search radius was clamped to the locally valid
    /// domain edge (the ghost zone may be undersized for this halo).
    pub max_radius_clamped: bool,
    /// The radial profile, including bins beyond the critical one.
    pub bins: Vec<SodBin>,
    /// Index of the bin where the density ratio crossed the target, if any.
    pub critical_bin: Option<usize>,
    /// Cumulative density ratio per bin (empty bins carry the running
    /// value forward).
    pub density_ratios: Vec<f64>,
    /// Gathered (distance, domain-local index) pairs.
    members: Vec<(f32, usize)>,
}

impl SodHalo {
    /// Gathered (distance, domain-local particle index) pairs.
    pub fn members(&self) -> &[(f32, usize)] {
        &self.members
    }

    /// Copy position/velocity/mass/tag/radius and the domain-local index of
    /// every gathered particle into caller-supplied arrays. Pure data
    /// movement; every output slice must have length [`Self::count`].
    #[allow(clippy::too_many_arguments)]
    pub fn extract(
        &self,
        particles: ParticleSet<'_>,
        positions: &mut [Vec3],
        velocities: &mut [Vec3],
        masses: &mut [f32],
        tags: &mut [i64],
        radii: &mut [f32],
        indices: &mut [usize],
    ) {
        assert_eq!(positions.len(), self.count, "position output length mismatch");
        assert_eq!(velocities.len(), self.count, "velocity output length mismatch");
        assert_eq!(masses.len(), self.count, "mass output length mismatch");
        assert_eq!(tags.len(), self.count, "tag output length mismatch");
        assert_eq!(radii.len(), self.count, "radius output length mismatch");
        assert_eq!(indices.len(), self.count, "index output length mismatch");

        for (out, &(r, p)) in self.members.iter().enumerate() {
            positions[out] = particles.positions[p];
            velocities[out] = particles.velocities[p];
            masses[out] = particles.masses[p];
            tags[out] = particles.tags[p];
            radii[out] = r;
            indices[out] = p;
        }
    }
}

/// SOD profiler over a domain-wide bucket grid.
///
/// The grid must have been built over `particles`; both are only read, so
/// one profiler (or many, across threads) can serve every halo of the local
/// domain.
pub struct SodProfiler<'a> {
    grid: &'a BucketGrid,
    particles: ParticleSet<'a>,
    params: SodParams,
}

impl<'a> SodProfiler<'a> {
    /// Create a profiler. `grid` must index exactly `particles`.
    pub fn new(grid: &'a BucketGrid, particles: ParticleSet<'a>, params: SodParams) -> Self {
        assert_eq!(
            grid.particle_count(),
            particles.len(),
            "grid was built over a different particle set"
        );
        Self {
            grid,
            particles,
            params,
        }
    }

    /// Compute the SOD profile, characteristic radius, and bulk properties
    /// for one halo.
    pub fn profile(&self, halo: &FofHalo) -> SodHalo {
        let p = &self.params;

        let init_radius = (halo.mass / p.mass_scale).cbrt();
        let min_radius = p.min_factor * p.smoothing_length;
        let mut max_radius = p.max_factor * init_radius;

        // Clamp the search radius to the locally valid (non-ghost) region;
        // past it the particle data is incomplete.
        let edge = (halo.center - p.domain_min).min(p.domain_max - halo.center);
        let nearest_edge = edge.min_element();
        let mut clamped = false;
        if max_radius > nearest_edge {
            log::warn!(
                "SOD max radius {} clamped to domain edge {} (center {:?}); ghost zone may be undersized",
                max_radius,
                nearest_edge,
                halo.center
            );
            max_radius = nearest_edge;
            clamped = true;
        }
        if max_radius <= min_radius {
            // Nothing to bin; report the no-halo outcome.
            return SodHalo {
                max_radius_clamped: clamped,
                ..SodHalo::default()
            };
        }

        let bins = self.bin_particles(halo, min_radius, max_radius);
        self.characterize(bins, clamped)
    }

    /// Scan the grid window around the center and fill the radial bins.
    fn bin_particles(&self, halo: &FofHalo, min_radius: f32, max_radius: f32) -> Vec<SodBin> {
        let p = &self.params;
        let delta = (max_radius / min_radius).log10() / p.bins as f32;
        let mut bins = vec![SodBin::default(); p.bins + 1];

        let [(x0, x1), (y0, y1), (z0, z1)] = self.grid.window(halo.center, max_radius);
        for k in z0..=z1 {
            for j in y0..=y1 {
                for i in x0..=x1 {
                    for q in self.grid.chain(i, j, k) {
                        let offset = self.particles.positions[q] - halo.center;
                        let dist = offset.length();
                        if dist > max_radius {
                            continue;
                        }

                        let b = if dist <= min_radius {
                            0
                        } else {
                            (((dist / min_radius).log10() / delta).floor() as usize + 1)
                                .min(p.bins)
                        };

                        let radial_velocity = if dist > 0.0 {
                            (self.particles.velocities[q] - halo.mean_velocity)
                                .dot(offset / dist)
                        } else {
                            0.0
                        };

                        let bin = &mut bins[b];
                        bin.count += 1;
                        bin.mass += self.particles.masses[q] as f64;
                        bin.radius_sum += dist as f64;
                        bin.radial_velocity_sum += radial_velocity as f64;
                        bin.members.push((dist, q));
                    }
                }
            }
        }

        bins
    }

    /// Find the critical bin, interpolate the characteristic radius inside
    /// it particle by particle, gather the SOD membership, and reduce its
    /// bulk properties.
    fn characterize(&self, mut bins: Vec<SodBin>, clamped: bool) -> SodHalo {
        let p = &self.params;
        let rho_c = p.rho_c as f64;
        let target = p.density_ratio as f64;

        // Outward cumulative density scan. The critical bin is the first
        // non-empty bin whose cumulative density ratio falls below the
        // target after an earlier non-empty bin was at or above it.
        let mut density_ratios = vec![0.0f64; bins.len()];
        let mut cum_mass = 0.0f64;
        let mut running_ratio = 0.0f64;
        let mut seen_above = false;
        let mut critical: Option<(usize, f64)> = None;
        for (b, bin) in bins.iter().enumerate() {
            if bin.count == 0 {
                density_ratios[b] = running_ratio;
                continue;
            }
            let volume = FOUR_THIRDS_PI * bin.average_radius().powi(3);
            let ratio = (cum_mass + bin.mass) / volume / rho_c;
            density_ratios[b] = ratio;
            running_ratio = ratio;
            if ratio >= target {
                seen_above = true;
            } else if seen_above && critical.is_none() {
                critical = Some((b, cum_mass));
            }
            cum_mass += bin.mass;
        }

        let Some((critical_bin, mass_below)) = critical else {
            // No above-to-below transition: no SOD halo at this ratio.
            return SodHalo {
                bins,
                density_ratios,
                max_radius_clamped: clamped,
                ..SodHalo::default()
            };
        };

        // Exact per-particle interpolation inside the critical bin.
        let mut boundary_list = std::mem::take(&mut bins[critical_bin].members);
        boundary_list.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut cum = mass_below;
        let mut boundary = boundary_list.len() - 1;
        for (i, &(dist, q)) in boundary_list.iter().enumerate() {
            cum += self.particles.masses[q] as f64;
            let ratio = cum / (FOUR_THIRDS_PI * (dist as f64).powi(3)) / rho_c;
            if ratio < target {
                boundary = i;
                break;
            }
        }
        let radius = boundary_list[boundary].0;
        bins[critical_bin].members = boundary_list;

        // Gather: all bins strictly below the critical one, plus the sorted
        // critical-bin prefix up to and including the boundary particle.
        let mut members: Vec<(f32, usize)> = Vec::new();
        for bin in bins.iter().take(critical_bin) {
            members.extend_from_slice(&bin.members);
        }
        members.extend_from_slice(&bins[critical_bin].members[..=boundary]);

        let mut halo_out = self.reduce(&members);
        halo_out.radius = radius;
        halo_out.bins = bins;
        halo_out.critical_bin = Some(critical_bin);
        halo_out.density_ratios = density_ratios;
        halo_out.max_radius_clamped = clamped;
        halo_out.members = members;
        halo_out
    }

    /// Bulk properties of a gathered particle set.
    fn reduce(&self, members: &[(f32, usize)]) -> SodHalo {
        let n = members.len() as f64;
        let mut pos_sum = DVec3::ZERO;
        let mut weighted_pos_sum = DVec3::ZERO;
        let mut vel_sum = DVec3::ZERO;
        let mut mass_sum = 0.0f64;
        let mut speed_sq_sum = 0.0f64;

        for &(_, q) in members {
            let pos = self.particles.positions[q].as_dvec3();
            let vel = self.particles.velocities[q].as_dvec3();
            let mass = self.particles.masses[q] as f64;
            pos_sum += pos;
            weighted_pos_sum += pos * mass;
            vel_sum += vel;
            mass_sum += mass;
            speed_sq_sum += vel.length_squared();
        }

        let mean_velocity = vel_sum / n;
        let dispersion =
            ((speed_sq_sum / n - mean_velocity.length_squared()).max(0.0)).sqrt() / 3.0;

        SodHalo {
            count: members.len(),
            average_location: (pos_sum / n).as_vec3(),
            center_of_mass: (weighted_pos_sum / mass_sum).as_vec3(),
            mean_velocity: mean_velocity.as_vec3(),
            total_mass: mass_sum,
            velocity_dispersion: dispersion as f32,
            ..SodHalo::default()
        }
    }
}
