//! Greedy bipartite assignment shared by the score-based strategies.
//!
//! Edges are accepted in descending score order whenever both endpoints are
//! still free. This approximates a maximum-weight matching in
//! O(n·m log(n·m)) and is fully deterministic: ties keep the
//! (local, remote) enumeration order because the sort is stable.

use tracing::debug;

use crate::models::Link;

/// Candidate pairing between `local[local]` and `remote[remote]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub local: usize,
    pub remote: usize,
    pub score: f64,
}

/// Score every (local, remote) combination, keeping only those the scorer
/// accepts. Enumeration is local-major, which fixes the tie order.
pub fn collect_edges<F>(local_len: usize, remote_len: usize, mut score: F) -> Vec<Edge>
where
    F: FnMut(usize, usize) -> Option<f64>,
{
    let mut edges = Vec::new();
    for local in 0..local_len {
        for remote in 0..remote_len {
            if let Some(score) = score(local, remote) {
                edges.push(Edge {
                    local,
                    remote,
                    score,
                });
            }
        }
    }
    edges
}

/// Greedily assign edges and append leftovers.
///
/// Output order: accepted pairs sorted by remote index, then unconsumed
/// remote elements, then unconsumed local elements.
pub(crate) fn assign(local_len: usize, remote_len: usize, mut edges: Vec<Edge>) -> Vec<Link> {
    let edge_count = edges.len();
    edges.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut local_used = vec![false; local_len];
    let mut remote_used = vec![false; remote_len];
    let mut matched: Vec<Link> = Vec::new();

    for edge in edges {
        if local_used[edge.local] || remote_used[edge.remote] {
            continue;
        }
        local_used[edge.local] = true;
        remote_used[edge.remote] = true;
        matched.push(Link::both(edge.local, edge.remote));
    }

    matched.sort_by_key(|link| link.remote);
    let matched_count = matched.len();

    let mut links = matched;
    links.extend(
        remote_used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(idx, _)| Link::remote(idx)),
    );
    links.extend(
        local_used
            .iter()
            .enumerate()
            .filter(|(_, used)| !**used)
            .map(|(idx, _)| Link::local(idx)),
    );

    debug!(
        edges = edge_count,
        matched = matched_count,
        unmatched_local = local_len - matched_count,
        unmatched_remote = remote_len - matched_count,
        "greedy assignment"
    );

    links
}
