// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Connection candidate generation.
//!
//! Real edges are scored pairing by pairing through an [`AffinityScorer`].
//! Virtual edges have no field measurement: a virtual candidate exists when
//! the accepted connections of the real edges on the virtual edge's
//! dependency path chain one endpoint peak to the other, and it inherits the
//! weakest link's score.
//!
//! Both kinds come out in the same deterministic order: descending score,
//! then ascending peak distance, then generation order.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::affinity::AffinityScorer;
use crate::error::{PoseError, Result};
use crate::peaks::{Peak, PeakId, PeakStore};
use crate::selection::Connection;
use crate::topology::{Edge, SkeletonLayout};

/// A scored, not yet accepted pairing of two peaks on one edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionCandidate {
    /// Peak of the edge's first joint type.
    pub peak_a: PeakId,
    /// Peak of the edge's second joint type.
    pub peak_b: PeakId,
    /// Connection score, higher is better.
    pub score: f32,
    /// Secondary key, lower is better: Euclidean distance between the peaks.
    pub tiebreak: f32,
}

impl ConnectionCandidate {
    /// Order used for selection: descending score, ascending tiebreak.
    #[must_use]
    pub fn priority_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.tiebreak.total_cmp(&other.tiebreak))
    }
}

/// Sort candidates into selection order.
///
/// The sort is stable, so equal score and tiebreak keep generation order.
pub fn sort_candidates(candidates: &mut [ConnectionCandidate]) {
    candidates.sort_by(ConnectionCandidate::priority_cmp);
}

fn peak(store: &PeakStore, id: PeakId) -> Result<&Peak> {
    store.get(id).ok_or(PoseError::UnknownPeak(id))
}

/// Score every pairing of a real edge's endpoint peaks.
///
/// # Errors
///
/// Returns [`PoseError::UnknownPeak`] if the store's joint index is inconsistent.
pub fn real_edge_candidates<S>(
    edge: &Edge,
    store: &PeakStore,
    scorer: &S,
) -> Result<Vec<ConnectionCandidate>>
where
    S: AffinityScorer + ?Sized,
{
    let ids_a = store.peaks_of(edge.joint_a);
    let ids_b = store.peaks_of(edge.joint_b);
    let mut candidates = Vec::with_capacity(ids_a.len() * ids_b.len());

    for &id_a in ids_a {
        let a = peak(store, id_a)?;
        for &id_b in ids_b {
            let b = peak(store, id_b)?;
            if let Some(score) = scorer.score(edge, a, b) {
                candidates.push(ConnectionCandidate {
                    peak_a: id_a,
                    peak_b: id_b,
                    score,
                    tiebreak: a.distance(b),
                });
            }
        }
    }

    sort_candidates(&mut candidates);
    Ok(candidates)
}

/// Derive a virtual edge's candidates from already accepted real connections.
///
/// `accepted[e]` holds the accepted connections of edge `e`; every edge on
/// the dependency path must already be present.
///
/// # Errors
///
/// Returns [`PoseError::ProcessingOrder`] if a dependency edge has not been
/// resolved yet.
pub fn virtual_edge_candidates(
    layout: &SkeletonLayout,
    edge_index: usize,
    store: &PeakStore,
    accepted: &[Vec<Connection>],
) -> Result<Vec<ConnectionCandidate>> {
    let Some(edge) = layout.edge(edge_index) else {
        return Err(PoseError::ProcessingOrder {
            got: edge_index,
            expected: layout.edge_count(),
        });
    };

    // Per path step: entry peak -> (exit peak, score).
    let mut links: Vec<HashMap<PeakId, (PeakId, f32)>> = Vec::new();
    for step in layout.dependencies(edge_index) {
        let resolved = accepted.get(step.edge).filter(|_| step.edge < edge_index);
        let Some(connections) = resolved else {
            return Err(PoseError::ProcessingOrder {
                got: edge_index,
                expected: accepted.len(),
            });
        };
        links.push(
            connections
                .iter()
                .map(|c| {
                    if step.forward {
                        (c.peak_a, (c.peak_b, c.score))
                    } else {
                        (c.peak_b, (c.peak_a, c.score))
                    }
                })
                .collect(),
        );
    }

    let mut candidates = Vec::new();
    for &id_a in store.peaks_of(edge.joint_a) {
        let mut current = id_a;
        let mut weakest = f32::INFINITY;
        let mut reached = true;
        for link in &links {
            match link.get(&current) {
                Some(&(next, score)) => {
                    current = next;
                    weakest = weakest.min(score);
                }
                None => {
                    reached = false;
                    break;
                }
            }
        }
        if !reached || links.is_empty() {
            continue;
        }
        let a = peak(store, id_a)?;
        let b = peak(store, current)?;
        if b.joint != edge.joint_b {
            continue;
        }
        candidates.push(ConnectionCandidate {
            peak_a: id_a,
            peak_b: current,
            score: weakest,
            tiebreak: a.distance(b),
        });
    }

    sort_candidates(&mut candidates);
    Ok(candidates)
}

/// Generate the sorted candidates for one edge, real or virtual.
///
/// # Errors
///
/// See [`real_edge_candidates`] and [`virtual_edge_candidates`].
pub fn edge_candidates<S>(
    layout: &SkeletonLayout,
    edge_index: usize,
    store: &PeakStore,
    scorer: &S,
    accepted: &[Vec<Connection>],
) -> Result<Vec<ConnectionCandidate>>
where
    S: AffinityScorer + ?Sized,
{
    if layout.is_virtual(edge_index) {
        return virtual_edge_candidates(layout, edge_index, store, accepted);
    }
    let edge = layout.edge(edge_index).ok_or(PoseError::ProcessingOrder {
        got: edge_index,
        expected: layout.edge_count(),
    })?;
    real_edge_candidates(edge, store, scorer)
}
