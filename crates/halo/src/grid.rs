//! Uniform bucket grid with intrusive particle chains.
//!
//! Partitions a 3D point set into `dims[0] * dims[1] * dims[2]` cubic cells.
//! Each cell stores the index of one "head" particle; a `next` array of the
//! same length as the particle set links the rest of the cell's particles
//! together. Insertion prepends at the head, so traversing a chain yields
//! particles in reverse insertion order. Built once, queried read-only,
//! rebuilt (not mutated) if the point set changes.

use glam::Vec3;

use crate::particle::ParticleSet;

/// Sentinel marking the end of a cell chain / an empty cell.
pub const NO_PARTICLE: usize = usize::MAX;

/// Uniform 3D bucket grid over a particle set.
pub struct BucketGrid {
    /// Cell counts per axis.
    dims: [usize; 3],
    /// Lower spatial bound per axis.
    min: Vec3,
    /// Upper spatial bound per axis.
    max: Vec3,
    /// Edge length of the cubic cells.
    cell_size: f32,
    /// Head particle per cell (flat (i,j,k) indexing), or `NO_PARTICLE`.
    heads: Vec<usize>,
    /// Next particle in the cell chain per particle, or `NO_PARTICLE`.
    next: Vec<usize>,
    /// Occupancy per cell.
    counts: Vec<u32>,
}

impl BucketGrid {
    /// Build over the ghost-padded local domain `[-overlap, box_size + overlap]`
    /// on every axis.
    pub fn from_domain(
        particles: ParticleSet<'_>,
        box_size: f32,
        overlap: f32,
        cell_size: f32,
    ) -> Self {
        let min = Vec3::splat(-overlap);
        let max = Vec3::splat(box_size + overlap);
        Self::from_bounds(particles, min, max, cell_size)
    }

    /// Build over an explicit axis-aligned bounding box (single-halo indexing).
    ///
    /// Preconditions: `cell_size > 0` and `min < max` on every axis; callers
    /// must guard against degenerate inputs.
    pub fn from_bounds(particles: ParticleSet<'_>, min: Vec3, max: Vec3, cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell_size must be positive, got {}", cell_size);
        assert!(
            min.x < max.x && min.y < max.y && min.z < max.z,
            "degenerate bounding box: min {:?}, max {:?}",
            min,
            max
        );

        let dims = [
            ((max.x - min.x) / cell_size).floor() as usize + 1,
            ((max.y - min.y) / cell_size).floor() as usize + 1,
            ((max.z - min.z) / cell_size).floor() as usize + 1,
        ];

        let mut grid = Self {
            dims,
            min,
            max,
            cell_size,
            heads: vec![NO_PARTICLE; dims[0] * dims[1] * dims[2]],
            next: vec![NO_PARTICLE; particles.len()],
            counts: vec![0; dims[0] * dims[1] * dims[2]],
        };

        for (p, &pos) in particles.positions.iter().enumerate() {
            let (i, j, k) = grid.cell_of(pos);
            let cell = grid.cell_index(i, j, k);
            grid.next[p] = grid.heads[cell];
            grid.heads[cell] = p;
            grid.counts[cell] += 1;
        }

        grid
    }

    /// Cell counts per axis.
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Lower spatial bound.
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Upper spatial bound.
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Edge length of the cubic cells.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Number of particles the grid was built over.
    pub fn particle_count(&self) -> usize {
        self.next.len()
    }

    /// Flat index of cell (i, j, k).
    #[inline]
    pub fn cell_index(&self, i: usize, j: usize, k: usize) -> usize {
        debug_assert!(i < self.dims[0] && j < self.dims[1] && k < self.dims[2]);
        i + self.dims[0] * (j + self.dims[1] * k)
    }

    /// Cell containing the given position, clamped into range per axis
    /// (positions exactly on the upper bound land in the last cell).
    #[inline]
    pub fn cell_of(&self, pos: Vec3) -> (usize, usize, usize) {
        let rel = (pos - self.min) / self.cell_size;
        (
            (rel.x.floor() as usize).min(self.dims[0] - 1),
            (rel.y.floor() as usize).min(self.dims[1] - 1),
            (rel.z.floor() as usize).min(self.dims[2] - 1),
        )
    }

    /// Head particle of cell (i, j, k), or [`NO_PARTICLE`].
    #[inline]
    pub fn head(&self, i: usize, j: usize, k: usize) -> usize {
        self.heads[self.cell_index(i, j, k)]
    }

    /// Next particle in the same cell chain, or [`NO_PARTICLE`].
    #[inline]
    pub fn next(&self, particle: usize) -> usize {
        self.next[particle]
    }

    /// Occupancy of cell (i, j, k).
    #[inline]
    pub fn count(&self, i: usize, j: usize, k: usize) -> u32 {
        self.counts[self.cell_index(i, j, k)]
    }

    /// Spatial bounds of cell (i, j, k).
    pub fn cell_bounds(&self, i: usize, j: usize, k: usize) -> (Vec3, Vec3) {
        let lo = self.min
            + Vec3::new(
                i as f32 * self.cell_size,
                j as f32 * self.cell_size,
                k as f32 * self.cell_size,
            );
        (lo, lo + Vec3::splat(self.cell_size))
    }

    /// Iterate the particle indices chained into cell (i, j, k), in reverse
    /// insertion order.
    pub fn chain(&self, i: usize, j: usize, k: usize) -> ChainIter<'_> {
        ChainIter {
            grid: self,
            current: self.head(i, j, k),
        }
    }

    /// Inclusive cell index range per axis covering a sphere of `radius`
    /// around `center`, clamped to the mesh.
    pub fn window(&self, center: Vec3, radius: f32) -> [(usize, usize); 3] {
        let lo = center - Vec3::splat(radius);
        let hi = center + Vec3::splat(radius);
        let (lx, ly, lz) = self.cell_of(lo.max(self.min));
        let (hx, hy, hz) = self.cell_of(hi.min(self.max));
        [(lx, hx), (ly, hy), (lz, hz)]
    }
}

/// Iterator over one cell's particle chain.
pub struct ChainIter<'a> {
    grid: &'a BucketGrid,
    current: usize,
}

impl Iterator for ChainIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.current == NO_PARTICLE {
            return None;
        }
        let p = self.current;
        self.current = self.grid.next[p];
        Some(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleBuffer;

    fn buffer_of(points: &[Vec3]) -> ParticleBuffer {
        let mut buf = ParticleBuffer::new();
        for (i, &p) in points.iter().enumerate() {
            buf.push(p, Vec3::ZERO, 1.0, i as i64);
        }
        buf
    }

    #[test]
    fn test_dims_from_bounds() {
        let buf = buffer_of(&[Vec3::splat(0.5)]);
        let grid = BucketGrid::from_bounds(buf.view(), Vec3::ZERO, Vec3::splat(1.0), 0.25);
        // floor(1.0 / 0.25) + 1 = 5 cells per axis
        assert_eq!(grid.dims(), [5, 5, 5]);
        assert_eq!(grid.cell_size(), 0.25);
    }

    #[test]
    fn test_every_particle_in_exactly_one_chain() {
        let points: Vec<Vec3> = (0..64)
            .map(|i| {
                Vec3::new(
                    (i % 4) as f32 * 0.3 + 0.05,
                    ((i / 4) % 4) as f32 * 0.3 + 0.05,
                    (i / 16) as f32 * 0.3 + 0.05,
                )
            })
            .collect();
        let buf = buffer_of(&points);
        let grid = BucketGrid::from_bounds(buf.view(), Vec3::ZERO, Vec3::splat(1.2), 0.3);

        let mut seen = vec![false; points.len()];
        let [nx, ny, nz] = grid.dims();
        let mut total = 0u32;
        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let mut chain_len = 0u32;
                    for p in grid.chain(i, j, k) {
                        assert!(!seen[p], "particle {} appears in more than one chain", p);
                        seen[p] = true;
                        chain_len += 1;
                    }
                    assert_eq!(chain_len, grid.count(i, j, k));
                    total += chain_len;
                }
            }
        }
        assert_eq!(total as usize, points.len());
        assert!(seen.iter().all(|&s| s), "some particle missing from all chains");
    }

    #[test]
    fn test_chain_is_reverse_insertion_order() {
        // Three particles in the same cell: chain must read 2, 1, 0.
        let buf = buffer_of(&[Vec3::splat(0.1), Vec3::splat(0.12), Vec3::splat(0.14)]);
        let grid = BucketGrid::from_bounds(buf.view(), Vec3::ZERO, Vec3::splat(1.0), 1.0);
        let order: Vec<usize> = grid.chain(0, 0, 0).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_upper_bound_particle_clamped_into_last_cell() {
        let buf = buffer_of(&[Vec3::splat(1.0)]);
        let grid = BucketGrid::from_bounds(buf.view(), Vec3::ZERO, Vec3::splat(1.0), 0.25);
        let (i, j, k) = grid.cell_of(Vec3::splat(1.0));
        assert_eq!((i, j, k), (4, 4, 4));
        assert_eq!(grid.count(i, j, k), 1);
    }

    #[test]
    fn test_domain_constructor_pads_by_overlap() {
        let buf = buffer_of(&[Vec3::splat(-0.5), Vec3::splat(32.0)]);
        let grid = BucketGrid::from_domain(buf.view(), 32.0, 1.0, 1.0);
        assert_eq!(grid.min(), Vec3::splat(-1.0));
        assert_eq!(grid.max(), Vec3::splat(33.0));
        assert_eq!(grid.particle_count(), 2);
    }

    #[test]
    fn test_window_clamps_to_mesh() {
        let buf = buffer_of(&[Vec3::splat(0.5)]);
        let grid = BucketGrid::from_bounds(buf.view(), Vec3::ZERO, Vec3::splat(10.0), 1.0);
        let w = grid.window(Vec3::splat(0.5), 100.0);
        for (lo, hi) in w {
            assert_eq!(lo, 0);
            assert_eq!(hi, grid.dims()[0] - 1);
        }
    }
}
