//! Batch helper running the center searches over many halos.
//!
//! The core components are single-threaded; independent halos are
//! embarrassingly parallel as long as each gets its own subset buffers, so
//! this helper fans out across halos with rayon. It is a convenience for
//! drivers, not a replacement for the external pipeline stage.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::center::{BoundCenter, CenterFinder, ConnectedCenter};
use crate::params::CenterParams;
use crate::particle::ParticleSet;

/// Center candidates for one halo, resolved back to the domain arrays.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HaloCenter {
    /// Position of the halo in the membership list passed in.
    pub halo: usize,
    /// Most-connected-particle result (index local to the halo subset).
    pub mcp: ConnectedCenter,
    /// Most-bound-particle result (index local to the halo subset).
    pub mbp: BoundCenter,
    /// Domain-local index of the most-connected particle.
    pub mcp_domain_index: usize,
    /// Domain-local index of the most-bound particle.
    pub mbp_domain_index: usize,
    /// Tag of the most-connected particle.
    pub mcp_tag: i64,
    /// Tag of the most-bound particle.
    pub mbp_tag: i64,
}

/// Run both center searches for every halo membership list.
///
/// Each halo's subset is extracted into its own buffer, so the shared
/// domain arrays are only read. Memberships must be non-empty.
pub fn find_centers(
    particles: ParticleSet<'_>,
    memberships: &[Vec<usize>],
    params: &CenterParams,
) -> Vec<HaloCenter> {
    let centers: Vec<HaloCenter> = memberships
        .par_iter()
        .enumerate()
        .map(|(halo, members)| {
            let subset = particles.select(members);
            let finder = CenterFinder::new(subset.view(), *params);
            let mcp = finder.most_connected();
            let mbp = finder.most_bound();
            log::debug!(
                "halo {}: {} particles, mcp index {} ({} friends), mbp index {} (potential {:.4})",
                halo,
                members.len(),
                mcp.index,
                mcp.friend_count,
                mbp.index,
                mbp.potential
            );
            HaloCenter {
                halo,
                mcp,
                mbp,
                mcp_domain_index: members[mcp.index],
                mbp_domain_index: members[mbp.index],
                mcp_tag: subset.tags[mcp.index],
                mbp_tag: subset.tags[mbp.index],
            }
        })
        .collect();

    log::debug!("found centers for {} halos", centers.len());
    centers
}
