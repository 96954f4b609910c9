// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Incremental assembly of partial skeletons from accepted connections.
//!
//! Edges are fed strictly in layout order. For each connection the assembler
//! looks for live instances already holding either endpoint and then extends,
//! merges or seeds an instance:
//!
//! - one instance holds an endpoint and the other slot is empty: extend it;
//! - two instances hold one endpoint each: merge them, unless they both fill
//!   some joint, in which case the higher-scoring instance survives unchanged
//!   (the older one on a tie) and the other is dropped with a
//!   [`AssemblyAnomaly::MergeCollision`];
//! - no instance holds either endpoint: seed a new instance, real edges only.
//!
//! Because a peak only ever enters an instance that did not hold a peak of
//! that joint, and merges never duplicate slots, each peak belongs to at most
//! one live instance.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};
use crate::peaks::PeakId;
use crate::selection::Connection;
use crate::topology::SkeletonLayout;

/// Identifier of a partial skeleton, unique within one assembly pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An in-progress skeleton referencing peaks by id.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSkeleton {
    id: InstanceId,
    slots: Vec<Option<PeakId>>,
    score: f32,
    filled: usize,
}

impl PartialSkeleton {
    /// Build an instance from explicit slots; the filled count is derived.
    #[must_use]
    pub fn from_slots(id: InstanceId, slots: Vec<Option<PeakId>>, score: f32) -> Self {
        let filled = slots.iter().filter(|s| s.is_some()).count();
        Self {
            id,
            slots,
            score,
            filled,
        }
    }

    fn seeded(id: InstanceId, joint_count: usize, c: &Connection) -> Self {
        let mut slots = vec![None; joint_count];
        slots[c.joint_a] = Some(c.peak_a);
        slots[c.joint_b] = Some(c.peak_b);
        Self {
            id,
            slots,
            score: c.score,
            filled: 2,
        }
    }

    /// Instance id.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Peak held for a joint type, if any.
    #[must_use]
    pub fn slot(&self, joint: usize) -> Option<PeakId> {
        self.slots.get(joint).copied().flatten()
    }

    /// All slots, indexed by joint type.
    #[must_use]
    pub fn slots(&self) -> &[Option<PeakId>] {
        &self.slots
    }

    /// Accumulated connection score.
    #[must_use]
    pub const fn score(&self) -> f32 {
        self.score
    }

    /// Number of filled slots.
    #[must_use]
    pub const fn filled_count(&self) -> usize {
        self.filled
    }

    fn touches(&self, c: &Connection) -> bool {
        self.slot(c.joint_a) == Some(c.peak_a) || self.slot(c.joint_b) == Some(c.peak_b)
    }

    fn first_collision(&self, other: &Self) -> Option<usize> {
        self.slots
            .iter()
            .zip(&other.slots)
            .position(|(a, b)| a.is_some() && b.is_some())
    }

    fn absorb(&mut self, other: Self, c: &Connection) {
        for (slot, theirs) in self.slots.iter_mut().zip(other.slots) {
            if slot.is_none() {
                *slot = theirs;
            }
        }
        self.filled += other.filled;
        self.score += other.score + c.score;
    }
}

/// Non-fatal irregularities observed during assembly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AssemblyAnomaly {
    /// Two instances joined by a connection both filled the same joint.
    MergeCollision {
        /// Edge whose connection triggered the merge.
        edge: usize,
        /// First joint filled by both instances.
        joint: usize,
        /// Instance kept unchanged.
        kept: InstanceId,
        /// Instance discarded.
        discarded: InstanceId,
    },
}

impl fmt::Display for AssemblyAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MergeCollision {
                edge,
                joint,
                kept,
                discarded,
            } => write!(
                f,
                "merge collision on joint {joint} (edge {edge}): kept {kept}, discarded {discarded}"
            ),
        }
    }
}

/// Output of one assembly pass.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    /// Surviving instances in creation order.
    pub partials: Vec<PartialSkeleton>,
    /// Anomalies in the order they occurred.
    pub anomalies: Vec<AssemblyAnomaly>,
}

/// Single-frame assembler; create one per frame.
#[derive(Debug)]
pub struct HumanAssembler<'a> {
    layout: &'a SkeletonLayout,
    next_edge: usize,
    next_id: u32,
    instances: Vec<PartialSkeleton>,
    anomalies: Vec<AssemblyAnomaly>,
}

impl<'a> HumanAssembler<'a> {
    /// Start an empty assembly over `layout`.
    #[must_use]
    pub const fn new(layout: &'a SkeletonLayout) -> Self {
        Self {
            layout,
            next_edge: 0,
            next_id: 0,
            instances: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// Index of the edge the assembler expects next.
    #[must_use]
    pub const fn next_edge(&self) -> usize {
        self.next_edge
    }

    /// Live instances so far.
    #[must_use]
    pub fn instances(&self) -> &[PartialSkeleton] {
        &self.instances
    }

    /// Fold one edge's accepted connections into the live instances.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ProcessingOrder`] if `edge_index` is not the next
    /// edge in layout order, and [`PoseError::ConnectionMismatch`] if a
    /// connection's joint types differ from the edge's. Both are internal
    /// contract violations; the instance set is left untouched.
    pub fn apply(&mut self, edge_index: usize, connections: &[Connection]) -> Result<()> {
        let expected = self.next_edge;
        let edge = self
            .layout
            .edge(edge_index)
            .filter(|_| edge_index == expected)
            .ok_or(PoseError::ProcessingOrder {
                got: edge_index,
                expected,
            })?;

        if let Some(c) = connections
            .iter()
            .find(|c| (c.joint_a, c.joint_b) != edge.endpoints())
        {
            return Err(PoseError::ConnectionMismatch {
                edge: edge_index,
                joint_a: c.joint_a,
                joint_b: c.joint_b,
            });
        }

        let seeds = !self.layout.is_virtual(edge_index);
        for c in connections {
            self.fold(edge_index, c, seeds);
        }
        self.next_edge += 1;

        tracing::trace!(
            edge = edge_index,
            connections = connections.len(),
            instances = self.instances.len(),
            "assembled edge"
        );
        Ok(())
    }

    fn fold(&mut self, edge_index: usize, c: &Connection, seeds: bool) {
        let touched: Vec<usize> = self
            .instances
            .iter()
            .enumerate()
            .filter(|(_, h)| h.touches(c))
            .map(|(i, _)| i)
            .collect();

        match (touched.first().copied(), touched.get(1).copied()) {
            (Some(i), None) => {
                let human = &mut self.instances[i];
                let fill = if human.slot(c.joint_a) == Some(c.peak_a) {
                    (c.joint_b, c.peak_b)
                } else {
                    (c.joint_a, c.peak_a)
                };
                if human.slots[fill.0].is_none() {
                    human.slots[fill.0] = Some(fill.1);
                    human.filled += 1;
                    human.score += c.score;
                }
            }
            (Some(older), Some(younger)) => self.merge(edge_index, c, older, younger),
            (None, _) if seeds => {
                let id = InstanceId(self.next_id);
                self.next_id += 1;
                self.instances
                    .push(PartialSkeleton::seeded(id, self.layout.joint_count(), c));
            }
            (None, _) => {}
        }
    }

    fn merge(&mut self, edge_index: usize, c: &Connection, older: usize, younger: usize) {
        match self.instances[older].first_collision(&self.instances[younger]) {
            None => {
                let absorbed = self.instances.remove(younger);
                self.instances[older].absorb(absorbed, c);
            }
            Some(joint) => {
                let (kept, discarded) =
                    if self.instances[younger].score > self.instances[older].score {
                        (younger, older)
                    } else {
                        (older, younger)
                    };
                let anomaly = AssemblyAnomaly::MergeCollision {
                    edge: edge_index,
                    joint,
                    kept: self.instances[kept].id,
                    discarded: self.instances[discarded].id,
                };
                tracing::debug!(%anomaly, "resolved merge collision");
                self.anomalies.push(anomaly);
                self.instances.remove(discarded);
            }
        }
    }

    /// Finish the pass and hand out the surviving instances.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::ProcessingOrder`] if some edges were never applied.
    pub fn finish(self) -> Result<Assembly> {
        if self.next_edge != self.layout.edge_count() {
            return Err(PoseError::ProcessingOrder {
                got: self.layout.edge_count(),
                expected: self.next_edge,
            });
        }
        Ok(Assembly {
            partials: self.instances,
            anomalies: self.anomalies,
        })
    }
}
