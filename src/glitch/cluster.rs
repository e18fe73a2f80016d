//! Single-link spatial clustering of contribution nodes

use super::node::ContributionNode;

/// Link distance for clustering, in canvas units
pub const CLUSTER_DISTANCE: f64 = 60.0;

/// Smallest cluster that can spawn an emergent entity
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Partition `nodes` into single-link clusters.
///
/// Two nodes share a cluster when a chain of nodes, each closer than
/// `max_distance` to the next, connects them. Clusters are returned in
/// order of their first member; members keep input order.
pub fn single_link<'a>(nodes: &[&'a ContributionNode], max_distance: f64) -> Vec<Vec<&'a ContributionNode>> {
    let mut remaining: Vec<&ContributionNode> = nodes.to_vec();
    let mut clusters = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.remove(0);
        let mut cluster = vec![seed];

        // Grow until a full pass adds nothing
        loop {
            let before = cluster.len();
            let mut i = 0;
            while i < remaining.len() {
                let candidate = remaining[i];
                let close = cluster
                    .iter()
                    .any(|member| member.position.distance(candidate.position) < max_distance);
                if close {
                    cluster.push(remaining.remove(i));
                } else {
                    i += 1;
                }
            }
            if cluster.len() == before {
                break;
            }
        }

        cluster.sort_by_key(|n| nodes.iter().position(|m| std::ptr::eq(*m, *n)));
        clusters.push(cluster);
    }

    clusters
}

/// Mean intensity of a cluster; 0.0 when empty
pub fn mean_intensity(cluster: &[&ContributionNode]) -> f64 {
    if cluster.is_empty() {
        return 0.0;
    }
    cluster.iter().map(|n| n.intensity).sum::<f64>() / cluster.len() as f64
}
