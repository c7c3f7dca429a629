//! Halo center candidates: most-connected and most-bound particle searches.
//!
//! Each search comes in two variants that must agree: an exact O(N^2) method
//! and a grid-accelerated one. The exact method is the ground truth; the
//! accelerated one is selected purely by particle count and must never
//! change the answer.

mod bound;
mod connected;

use serde::{Deserialize, Serialize};

use crate::params::CenterParams;
use crate::particle::ParticleSet;

/// Result of a most-connected-particle search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectedCenter {
    /// Index into the supplied halo subset.
    pub index: usize,
    /// Number of particles within the linking length of the winner.
    pub friend_count: u32,
}

/// Result of a most-bound-particle search.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundCenter {
    /// Index into the supplied halo subset.
    pub index: usize,
    /// Accumulated -mass/distance potential of the winner.
    pub potential: f64,
}

/// Center-candidate searches over one halo's particle subset.
///
/// Borrows the subset; the owner of the particle buffers must outlive the
/// finder. Callers must supply a non-empty subset.
pub struct CenterFinder<'a> {
    particles: ParticleSet<'a>,
    params: CenterParams,
}

impl<'a> CenterFinder<'a> {
    /// Create a finder over one halo's particles.
    pub fn new(particles: ParticleSet<'a>, params: CenterParams) -> Self {
        Self { particles, params }
    }

    /// Most-connected particle: the one with the most neighbors within the
    /// linking length. Ties break to the lowest index.
    ///
    /// Dispatches to the chained variant above the exact threshold.
    pub fn most_connected(&self) -> ConnectedCenter {
        if self.particles.len() < self.params.exact_threshold {
            self.most_connected_exact()
        } else {
            self.most_connected_chained()
        }
    }

    /// Exact all-pairs most-connected search.
    pub fn most_connected_exact(&self) -> ConnectedCenter {
        connected::most_connected_exact(self.particles, self.params.bb)
    }

    /// Grid-accelerated most-connected search. Produces bit-identical
    /// friend counts to the exact method.
    pub fn most_connected_chained(&self) -> ConnectedCenter {
        connected::most_connected_chained(self.particles, &self.params)
    }

    /// Most-bound particle: the one with the minimum -mass/distance
    /// potential. Ties break to the lowest index.
    ///
    /// Dispatches to the adaptive-refine variant above the exact threshold.
    pub fn most_bound(&self) -> BoundCenter {
        if self.particles.len() < self.params.exact_threshold {
            self.most_bound_exact()
        } else {
            self.most_bound_refined()
        }
    }

    /// Exact all-pairs potential accumulation.
    pub fn most_bound_exact(&self) -> BoundCenter {
        bound::most_bound_exact(self.particles)
    }

    /// Adaptive multi-resolution potential estimation with incremental
    /// refinement. Agrees with the exact method on the winning particle;
    /// the potential matches within floating-point summation order.
    pub fn most_bound_refined(&self) -> BoundCenter {
        bound::most_bound_refined(self.particles, &self.params)
    }
}

/// Winner of a friend-count scan: strictly greatest count, first occurrence
/// in ascending index order.
pub(crate) fn max_count_winner(counts: &[u32]) -> ConnectedCenter {
    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }
    ConnectedCenter {
        index: best,
        friend_count: counts[best],
    }
}

/// Winner of a potential scan: strictly smallest potential, first occurrence
/// in ascending index order.
pub(crate) fn min_potential_winner(potentials: &[f64]) -> BoundCenter {
    let mut best = 0;
    for (i, &p) in potentials.iter().enumerate() {
        if p < potentials[best] {
            best = i;
        }
    }
    BoundCenter {
        index: best,
        potential: potentials[best],
    }
}
