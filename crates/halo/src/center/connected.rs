//! Most-connected-particle search: exact all-pairs and chained-grid variants.

use glam::Vec3;

use super::{max_count_winner, ConnectedCenter};
use crate::grid::BucketGrid;
use crate::params::CenterParams;
use crate::particle::ParticleSet;

/// Friend test: per-axis separation strictly under the linking length on
/// every axis, and Euclidean distance strictly under it too. Both variants
/// must run this identical test.
#[inline]
fn is_friend(a: Vec3, b: Vec3, bb: f32, bb_sq: f32) -> bool {
    let d = (a - b).abs();
    d.x < bb && d.y < bb && d.z < bb && d.length_squared() < bb_sq
}

/// Exact O(N^2) friend counting over all unordered pairs.
pub(super) fn most_connected_exact(particles: ParticleSet<'_>, bb: f32) -> ConnectedCenter {
    let pos = particles.positions;
    let bb_sq = bb * bb;
    let mut counts = vec![0u32; pos.len()];

    for p in 0..pos.len() {
        for q in (p + 1)..pos.len() {
            if is_friend(pos[p], pos[q], bb, bb_sq) {
                counts[p] += 1;
                counts[q] += 1;
            }
        }
    }

    max_count_winner(&counts)
}

/// Grid-accelerated friend counting.
///
/// Builds a bucket grid with cell size `bb / chain_factor` over the halo's
/// tight bounding box and slides a window over cell pairs: each cell is
/// paired with itself and with every cell at per-axis offset within
/// `chain_factor` in the strict lexicographic forward half-space, so each
/// unordered cell pair is visited exactly once. Particles further than
/// `chain_factor` cells apart on any axis cannot be friends, so no pair is
/// missed, and no pair is tested twice.
pub(super) fn most_connected_chained(
    particles: ParticleSet<'_>,
    params: &CenterParams,
) -> ConnectedCenter {
    let pos = particles.positions;
    let bb = params.bb;
    let bb_sq = bb * bb;
    let cell_size = bb / params.chain_factor as f32;
    let grid = halo_grid(particles, cell_size);

    let w = params.chain_factor as isize;
    let [nx, ny, nz] = grid.dims();
    let mut counts = vec![0u32; pos.len()];
    let mut cell_members: Vec<usize> = Vec::new();

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                cell_members.clear();
                cell_members.extend(grid.chain(i, j, k));
                if cell_members.is_empty() {
                    continue;
                }

                // Unordered pairs inside the cell.
                for a in 0..cell_members.len() {
                    for b in (a + 1)..cell_members.len() {
                        let (p, q) = (cell_members[a], cell_members[b]);
                        if is_friend(pos[p], pos[q], bb, bb_sq) {
                            counts[p] += 1;
                            counts[q] += 1;
                        }
                    }
                }

                // Forward half-space window: dk > 0, or dk = 0 and dj > 0,
                // or dk = dj = 0 and di > 0.
                for dk in 0..=w {
                    for dj in -w..=w {
                        for di in -w..=w {
                            if dk == 0 && (dj < 0 || (dj == 0 && di <= 0)) {
                                continue;
                            }
                            let ni = i as isize + di;
                            let nj = j as isize + dj;
                            let nk = k as isize + dk;
                            if ni < 0
                                || nj < 0
                                || ni >= nx as isize
                                || nj >= ny as isize
                                || nk >= nz as isize
                            {
                                continue;
                            }
                            for q in grid.chain(ni as usize, nj as usize, nk as usize) {
                                for &p in &cell_members {
                                    if is_friend(pos[p], pos[q], bb, bb_sq) {
                                        counts[p] += 1;
                                        counts[q] += 1;
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    max_count_winner(&counts)
}

/// Bucket grid over a halo subset's tight bounding box. The upper bound is
/// padded by half a cell so a point set that is flat on some axis still
/// yields a valid box.
pub(super) fn halo_grid(particles: ParticleSet<'_>, cell_size: f32) -> BucketGrid {
    let mut lo = particles.positions[0];
    let mut hi = particles.positions[0];
    for &p in &particles.positions[1..] {
        lo = lo.min(p);
        hi = hi.max(p);
    }
    BucketGrid::from_bounds(particles, lo, hi + Vec3::splat(0.5 * cell_size), cell_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleBuffer;

    fn halo_of(points: &[Vec3]) -> ParticleBuffer {
        let mut buf = ParticleBuffer::new();
        for (i, &p) in points.iter().enumerate() {
            buf.push(p, Vec3::ZERO, 1.0, i as i64);
        }
        buf
    }

    #[test]
    fn test_two_particle_scenario() {
        // Two particles 0.1 apart with bb = 0.2: one friend each, tie
        // resolved to index 0, in both variants.
        let buf = halo_of(&[Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0)]);
        let params = CenterParams::new(0.2);

        let exact = most_connected_exact(buf.view(), params.bb);
        assert_eq!(exact.index, 0);
        assert_eq!(exact.friend_count, 1);

        let chained = most_connected_chained(buf.view(), &params);
        assert_eq!(chained, exact);
    }

    #[test]
    fn test_axis_box_pass_but_distance_fail() {
        // Inside the per-axis box on every axis but outside the sphere:
        // not friends.
        let d = 0.19;
        let buf = halo_of(&[Vec3::ZERO, Vec3::new(d, d, d)]);
        let exact = most_connected_exact(buf.view(), 0.2);
        assert_eq!(exact.friend_count, 0);
    }

    #[test]
    fn test_chained_matches_exact_on_grid_of_points() {
        // Regular lattice with one denser clump; spans many cells.
        let mut points = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                for k in 0..6 {
                    points.push(Vec3::new(i as f32, j as f32, k as f32) * 0.11);
                }
            }
        }
        points.push(Vec3::new(0.3, 0.3, 0.3));
        points.push(Vec3::new(0.31, 0.3, 0.3));

        let buf = halo_of(&points);
        let params = CenterParams::new(0.2);
        let exact = most_connected_exact(buf.view(), params.bb);
        let chained = most_connected_chained(buf.view(), &params);
        assert_eq!(chained, exact);
        assert!(exact.friend_count > 0);
    }
}
