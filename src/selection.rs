// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Greedy per-edge connection selection.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::candidates::ConnectionCandidate;
use crate::peaks::PeakId;
use crate::topology::Edge;

/// An accepted limb between two peaks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// Joint type of `peak_a`.
    pub joint_a: usize,
    /// Joint type of `peak_b`.
    pub joint_b: usize,
    /// Score inherited from the candidate.
    pub score: f32,
    /// First endpoint.
    pub peak_a: PeakId,
    /// Second endpoint.
    pub peak_b: PeakId,
}

/// Accept candidates in order, skipping any that reuse a peak on this edge.
///
/// `candidates` must already be in selection order (see
/// [`sort_candidates`](crate::candidates::sort_candidates)). Peak ids share one
/// space across joint types, so a single set covers both endpoints.
///
/// This is a greedy approximation of bipartite matching, chosen for speed; it
/// is not guaranteed to maximize the summed score.
#[must_use]
pub fn select_connections(edge: &Edge, candidates: &[ConnectionCandidate]) -> Vec<Connection> {
    let mut used: HashSet<PeakId> = HashSet::with_capacity(candidates.len() * 2);
    let mut accepted = Vec::new();

    for candidate in candidates {
        if used.contains(&candidate.peak_a) || used.contains(&candidate.peak_b) {
            continue;
        }
        used.insert(candidate.peak_a);
        used.insert(candidate.peak_b);
        accepted.push(Connection {
            joint_a: edge.joint_a,
            joint_b: edge.joint_b,
            score: candidate.score,
            peak_a: candidate.peak_a,
            peak_b: candidate.peak_b,
        });
    }

    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::sort_candidates;

    fn candidate(a: u32, b: u32, score: f32) -> ConnectionCandidate {
        ConnectionCandidate {
            peak_a: PeakId(a),
            peak_b: PeakId(b),
            score,
            tiebreak: 0.0,
        }
    }

    fn accepted_pairs(connections: &[Connection]) -> Vec<(u32, u32)> {
        connections.iter().map(|c| (c.peak_a.0, c.peak_b.0)).collect()
    }

    #[test]
    fn test_greedy_selection_example() {
        let edge = Edge::real(0, 1, 0, 1);
        let base = [
            candidate(10, 20, 0.99),
            candidate(11, 20, 0.5),
            candidate(12, 21, 0.1),
            candidate(10, 21, 0.3),
        ];

        // Every rotation of the input yields the same accepted set.
        for shift in 0..base.len() {
            let mut candidates = base.to_vec();
            candidates.rotate_left(shift);
            sort_candidates(&mut candidates);
            let accepted = select_connections(&edge, &candidates);
            assert_eq!(accepted_pairs(&accepted), vec![(10, 20), (12, 21)]);
            assert!((accepted[0].score - 0.99).abs() < f32::EPSILON);
            assert!((accepted[1].score - 0.1).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn test_connections_tagged_with_edge_joints() {
        let edge = Edge::real(3, 4, 0, 1);
        let accepted = select_connections(&edge, &[candidate(1, 2, 0.5)]);
        assert_eq!((accepted[0].joint_a, accepted[0].joint_b), (3, 4));
    }

    #[test]
    fn test_empty_candidates() {
        let edge = Edge::real(0, 1, 0, 1);
        assert!(select_connections(&edge, &[]).is_empty());
    }

    #[test]
    fn test_each_peak_used_once() {
        let edge = Edge::real(0, 1, 0, 1);
        let mut candidates = vec![
            candidate(1, 5, 0.9),
            candidate(2, 5, 0.8),
            candidate(1, 6, 0.7),
            candidate(2, 6, 0.6),
            candidate(3, 7, 0.1),
        ];
        sort_candidates(&mut candidates);
        let accepted = select_connections(&edge, &candidates);
        assert_eq!(accepted_pairs(&accepted), vec![(1, 5), (2, 6), (3, 7)]);
    }
}
