//! Most-bound-particle search: exact all-pairs potentials and the adaptive
//! multi-resolution estimate-then-refine variant.
//!
//! The potential of particle p is the sum over every other particle q of
//! `-mass[q] / dist(p, q)` (no gravitational constant; zero-distance pairs
//! contribute nothing). Potentials accumulate in `f64` so that the refine
//! step's subtract-estimate/add-exact updates cannot flip the arg-min.
//!
//! The adaptive variant meshes the halo, computes in-cell contributions
//! exactly everywhere, seeds the rest with point-mass estimates placed at
//! the nearest point of each source cell's box (a distance underestimate,
//! so every estimate is a lower bound on the true potential), and then
//! refines the current minimum one ring of cells at a time until it is
//! exact out to the full mesh and still the minimum. At that point no other
//! particle's true potential can undercut it.

use glam::Vec3;

use super::{min_potential_winner, BoundCenter};
use crate::grid::BucketGrid;
use crate::params::CenterParams;
use crate::particle::ParticleSet;

/// One pairwise potential term. Both variants must build their sums from
/// this function so they agree up to summation order.
#[inline]
fn pair_term(a: Vec3, b: Vec3, mass: f32) -> f64 {
    let r = a.distance(b);
    if r > 0.0 {
        -(mass as f64) / r as f64
    } else {
        0.0
    }
}

/// Exact O(N^2) potential accumulation over all unordered pairs.
pub(super) fn most_bound_exact(particles: ParticleSet<'_>) -> BoundCenter {
    let pos = particles.positions;
    let mass = particles.masses;
    let mut potential = vec![0.0f64; pos.len()];

    for p in 0..pos.len() {
        for q in (p + 1)..pos.len() {
            potential[p] += pair_term(pos[p], pos[q], mass[q]);
            potential[q] += pair_term(pos[q], pos[p], mass[p]);
        }
    }

    min_potential_winner(&potential)
}

/// Mesh-side state for the adaptive search.
struct RefineMesh<'a> {
    grid: BucketGrid,
    /// Particle indices per cell, flat cell indexing.
    members: Vec<Vec<usize>>,
    /// Summed mass per cell.
    cell_mass: Vec<f64>,
    /// Whether the cell lies in the exact center band on all three axes.
    center_region: Vec<bool>,
    /// Margin around a source cell's box for the perimeter neighbor split.
    margin: f32,
    particles: ParticleSet<'a>,
}

impl<'a> RefineMesh<'a> {
    fn build(particles: ParticleSet<'a>, params: &CenterParams) -> Self {
        let cell_size = params.bb * params.distance_factor;
        let grid = super::connected::halo_grid(particles, cell_size);
        let [nx, ny, nz] = grid.dims();
        let n_cells = nx * ny * nz;

        let mut members = vec![Vec::new(); n_cells];
        let mut cell_mass = vec![0.0f64; n_cells];
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let c = grid.cell_index(i, j, k);
                    for p in grid.chain(i, j, k) {
                        members[c].push(p);
                        cell_mass[c] += particles.masses[p] as f64;
                    }
                }
            }
        }

        // Center band: roughly 2/7 of the mesh extent per axis, centered.
        let band = |dim: usize| -> (usize, usize) {
            let width = (2 * dim / 7).max(1).min(dim);
            let lo = (dim - width) / 2;
            (lo, lo + width - 1)
        };
        let (bx, by, bz) = (band(nx), band(ny), band(nz));
        let mut center_region = vec![false; n_cells];
        for k in bz.0..=bz.1 {
            for j in by.0..=by.1 {
                for i in bx.0..=bx.1 {
                    center_region[grid.cell_index(i, j, k)] = true;
                }
            }
        }

        Self {
            grid,
            members,
            cell_mass,
            center_region,
            margin: params.margin_factor * cell_size,
            particles,
        }
    }

    /// Exact contribution to the particle at `pos` from every particle in
    /// cell `c` (self-pairs drop out via the zero-distance rule).
    fn exact_from_cell(&self, pos: Vec3, c: usize) -> f64 {
        let mut sum = 0.0;
        for &q in &self.members[c] {
            sum += pair_term(pos, self.particles.positions[q], self.particles.masses[q]);
        }
        sum
    }

    /// The source cell's box expanded by the boundary margin.
    fn margin_box(&self, ci: usize, cj: usize, ck: usize) -> (Vec3, Vec3) {
        let (lo, hi) = self.grid.cell_bounds(ci, cj, ck);
        (lo - Vec3::splat(self.margin), hi + Vec3::splat(self.margin))
    }

    /// Perimeter split of neighbor cell `c` against a margin box: exact sum
    /// over the neighbor's particles inside the box, plus the leftover mass
    /// and count outside it.
    fn split_neighbor(&self, pos: Vec3, mbox: (Vec3, Vec3), c: usize) -> (f64, f64) {
        let mut inside_exact = 0.0;
        let mut leftover_mass = 0.0f64;
        for &q in &self.members[c] {
            let qp = self.particles.positions[q];
            if in_box(qp, mbox) {
                inside_exact += pair_term(pos, qp, self.particles.masses[q]);
            } else {
                leftover_mass += self.particles.masses[q] as f64;
            }
        }
        (inside_exact, leftover_mass)
    }

    /// Point-mass estimate for the leftover of a perimeter neighbor split:
    /// the leftover mass placed at the nearest point of the margin box's
    /// surface to the source particle (which sits inside the box).
    fn leftover_estimate(&self, pos: Vec3, mbox: (Vec3, Vec3), leftover_mass: f64) -> f64 {
        if leftover_mass <= 0.0 {
            return 0.0;
        }
        let surface = nearest_surface_point(pos, mbox.0, mbox.1);
        -leftover_mass / pos.distance(surface).max(f32::MIN_POSITIVE) as f64
    }

    /// Exact sum over the neighbor's particles outside the margin box (the
    /// refinement replacement for [`Self::leftover_estimate`]).
    fn leftover_exact(&self, pos: Vec3, mbox: (Vec3, Vec3), c: usize) -> f64 {
        let mut sum = 0.0;
        for &q in &self.members[c] {
            let qp = self.particles.positions[q];
            if !in_box(qp, mbox) {
                sum += pair_term(pos, qp, self.particles.masses[q]);
            }
        }
        sum
    }

    /// Whole-cell point-mass estimate: the cell's total mass at the nearest
    /// point of the cell's box to the source particle. Only valid for cells
    /// that do not contain the particle (Chebyshev distance >= 2 here, so
    /// the distance is at least one cell).
    fn far_estimate(&self, pos: Vec3, ci: usize, cj: usize, ck: usize) -> f64 {
        let c = self.grid.cell_index(ci, cj, ck);
        if self.cell_mass[c] <= 0.0 {
            return 0.0;
        }
        let (lo, hi) = self.grid.cell_bounds(ci, cj, ck);
        let nearest = pos.clamp(lo, hi);
        -self.cell_mass[c] / pos.distance(nearest) as f64
    }

    /// Visit every in-range cell at exactly Chebyshev distance `r` from
    /// (ci, cj, ck).
    fn for_ring(&self, ci: usize, cj: usize, ck: usize, r: isize, mut f: impl FnMut(usize, usize, usize)) {
        let [nx, ny, nz] = self.grid.dims();
        for dk in -r..=r {
            for dj in -r..=r {
                for di in -r..=r {
                    if di.abs().max(dj.abs()).max(dk.abs()) != r {
                        continue;
                    }
                    let ni = ci as isize + di;
                    let nj = cj as isize + dj;
                    let nk = ck as isize + dk;
                    if ni < 0
                        || nj < 0
                        || nk < 0
                        || ni >= nx as isize
                        || nj >= ny as isize
                        || nk >= nz as isize
                    {
                        continue;
                    }
                    f(ni as usize, nj as usize, nk as usize);
                }
            }
        }
    }
}

#[inline]
fn in_box(p: Vec3, (lo, hi): (Vec3, Vec3)) -> bool {
    p.x >= lo.x && p.y >= lo.y && p.z >= lo.z && p.x <= hi.x && p.y <= hi.y && p.z <= hi.z
}

/// Nearest point on the surface of box [lo, hi] to an interior point:
/// project onto the closest face.
fn nearest_surface_point(p: Vec3, lo: Vec3, hi: Vec3) -> Vec3 {
    let mut best_axis = 0;
    let mut best_dist = f32::MAX;
    let mut best_coord = 0.0;
    for axis in 0..3 {
        let (pa, la, ha) = (p[axis], lo[axis], hi[axis]);
        if pa - la < best_dist {
            best_dist = pa - la;
            best_axis = axis;
            best_coord = la;
        }
        if ha - pa < best_dist {
            best_dist = ha - pa;
            best_axis = axis;
            best_coord = ha;
        }
    }
    let mut out = p;
    out[best_axis] = best_coord;
    out
}

/// Adaptive multi-resolution most-bound search.
pub(super) fn most_bound_refined(particles: ParticleSet<'_>, params: &CenterParams) -> BoundCenter {
    let mesh = RefineMesh::build(particles, params);
    let n = particles.len();
    let [nx, ny, nz] = mesh.grid.dims();

    let mut potential = vec![0.0f64; n];
    // Rings already exact per particle: 1 for center-region seeds, 0 for
    // perimeter seeds (their first ring is only partially exact).
    let mut level = vec![0isize; n];
    let mut coords = vec![[0usize; 3]; n];

    // In-cell exact pairwise contributions, all cells.
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let c = mesh.grid.cell_index(i, j, k);
                let cell = &mesh.members[c];
                for a in 0..cell.len() {
                    coords[cell[a]] = [i, j, k];
                    for b in (a + 1)..cell.len() {
                        let (p, q) = (cell[a], cell[b]);
                        potential[p] +=
                            pair_term(particles.positions[p], particles.positions[q], particles.masses[q]);
                        potential[q] +=
                            pair_term(particles.positions[q], particles.positions[p], particles.masses[p]);
                    }
                }
            }
        }
    }

    // Seed every particle's out-of-cell potential.
    for p in 0..n {
        let pos = particles.positions[p];
        let [ci, cj, ck] = coords[p];
        let in_center = mesh.center_region[mesh.grid.cell_index(ci, cj, ck)];
        let mbox = mesh.margin_box(ci, cj, ck);

        // Immediate neighbors: exact for center-region cells, margin split
        // plus leftover estimate for perimeter cells.
        mesh.for_ring(ci, cj, ck, 1, |ni, nj, nk| {
            let c = mesh.grid.cell_index(ni, nj, nk);
            if in_center {
                potential[p] += mesh.exact_from_cell(pos, c);
            } else {
                let (inside_exact, leftover_mass) = mesh.split_neighbor(pos, mbox, c);
                potential[p] += inside_exact + mesh.leftover_estimate(pos, mbox, leftover_mass);
            }
        });
        if in_center {
            level[p] = 1;
        }

        // Everything further: whole-cell point-mass estimates.
        let max_ring = required_radius(ci, cj, ck, [nx, ny, nz]);
        for r in 2..=max_ring {
            mesh.for_ring(ci, cj, ck, r, |ni, nj, nk| {
                potential[p] += mesh.far_estimate(pos, ni, nj, nk);
            });
        }
    }

    // Refine the running minimum ring by ring until it is exact out to its
    // full required radius and still the minimum.
    loop {
        let winner = min_potential_winner(&potential);
        let p = winner.index;
        let [ci, cj, ck] = coords[p];
        let required = required_radius(ci, cj, ck, [nx, ny, nz]);
        if level[p] >= required {
            return winner;
        }

        let pos = particles.positions[p];
        let r = level[p] + 1;
        if r == 1 {
            // Perimeter seed: swap the leftover estimates of the first ring
            // for exact sums (the margin-box part is already exact).
            let mbox = mesh.margin_box(ci, cj, ck);
            mesh.for_ring(ci, cj, ck, 1, |ni, nj, nk| {
                let c = mesh.grid.cell_index(ni, nj, nk);
                let (_, leftover_mass) = mesh.split_neighbor(pos, mbox, c);
                potential[p] -= mesh.leftover_estimate(pos, mbox, leftover_mass);
                potential[p] += mesh.leftover_exact(pos, mbox, c);
            });
        } else {
            mesh.for_ring(ci, cj, ck, r, |ni, nj, nk| {
                let c = mesh.grid.cell_index(ni, nj, nk);
                potential[p] -= mesh.far_estimate(pos, ni, nj, nk);
                potential[p] += mesh.exact_from_cell(pos, c);
            });
        }
        level[p] = r;
    }
}

/// Largest Chebyshev distance from cell (ci, cj, ck) to any cell of the
/// mesh: the refinement radius that makes a particle's potential exact.
fn required_radius(ci: usize, cj: usize, ck: usize, dims: [usize; 3]) -> isize {
    let per_axis = |c: usize, dim: usize| c.max(dim - 1 - c) as isize;
    per_axis(ci, dims[0])
        .max(per_axis(cj, dims[1]))
        .max(per_axis(ck, dims[2]))
}
