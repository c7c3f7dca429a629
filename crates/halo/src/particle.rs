//! Particle storage views for halo finding.
//!
//! Particle data is owned by an external stage (the distributed loader /
//! ghost exchange); this crate only borrows it. `ParticleSet` is that
//! borrowed view. The single sanctioned copy is halo-subset extraction via
//! [`ParticleSet::select`], which produces an owned [`ParticleBuffer`].

use glam::Vec3;

/// Borrowed structure-of-arrays view over one set of particles.
///
/// All slices are indexed consistently `0..len`. The owner of the underlying
/// buffers must outlive every grid, finder, or profiler built over this view.
#[derive(Clone, Copy)]
pub struct ParticleSet<'a> {
    /// Comoving positions (Mpc/h).
    pub positions: &'a [Vec3],
    /// Peculiar velocities (km/s).
    pub velocities: &'a [Vec3],
    /// Particle masses (M_sun/h).
    pub masses: &'a [f32],
    /// Simulation-global particle tags.
    pub tags: &'a [i64],
}

impl<'a> ParticleSet<'a> {
    /// Create a view over parallel arrays. All slices must have equal length.
    pub fn new(
        positions: &'a [Vec3],
        velocities: &'a [Vec3],
        masses: &'a [f32],
        tags: &'a [i64],
    ) -> Self {
        assert_eq!(positions.len(), velocities.len(), "velocity array length mismatch");
        assert_eq!(positions.len(), masses.len(), "mass array length mismatch");
        assert_eq!(positions.len(), tags.len(), "tag array length mismatch");
        Self {
            positions,
            velocities,
            masses,
            tags,
        }
    }

    /// Number of particles in the view.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Copy the given particles (typically one halo's FOF membership) into
    /// an owned buffer.
    pub fn select(&self, indices: &[usize]) -> ParticleBuffer {
        let mut buf = ParticleBuffer::with_capacity(indices.len());
        for &i in indices {
            buf.push(self.positions[i], self.velocities[i], self.masses[i], self.tags[i]);
        }
        buf
    }
}

/// Owned structure-of-arrays particle storage.
///
/// Used for extracted halo subsets and for building synthetic particle sets
/// in tests and examples.
#[derive(Clone, Debug, Default)]
pub struct ParticleBuffer {
    pub positions: Vec<Vec3>,
    pub velocities: Vec<Vec3>,
    pub masses: Vec<f32>,
    pub tags: Vec<i64>,
}

impl ParticleBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            velocities: Vec::with_capacity(capacity),
            masses: Vec::with_capacity(capacity),
            tags: Vec::with_capacity(capacity),
        }
    }

    /// Append one particle.
    pub fn push(&mut self, position: Vec3, velocity: Vec3, mass: f32, tag: i64) {
        self.positions.push(position);
        self.velocities.push(velocity);
        self.masses.push(mass);
        self.tags.push(tag);
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Re-borrow as a [`ParticleSet`] view.
    pub fn view(&self) -> ParticleSet<'_> {
        ParticleSet {
            positions: &self.positions,
            velocities: &self.velocities,
            masses: &self.masses,
            tags: &self.tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_roundtrip() {
        let mut buf = ParticleBuffer::new();
        buf.push(Vec3::new(1.0, 2.0, 3.0), Vec3::X, 0.5, 42);
        buf.push(Vec3::ZERO, Vec3::ZERO, 1.5, 7);

        let view = buf.view();
        assert_eq!(view.len(), 2);
        assert_eq!(view.positions[0], Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(view.tags[1], 7);
    }

    #[test]
    fn test_select_copies_in_order() {
        let mut buf = ParticleBuffer::new();
        for i in 0..5 {
            buf.push(Vec3::splat(i as f32), Vec3::ZERO, 1.0, i as i64);
        }

        let subset = buf.view().select(&[4, 1, 2]);
        assert_eq!(subset.len(), 3);
        assert_eq!(subset.tags, vec![4, 1, 2]);
        assert_eq!(subset.positions[0], Vec3::splat(4.0));
    }
}
