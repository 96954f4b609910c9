// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton topology: joints, edges and the validated layout that drives assembly.
//!
//! A [`SkeletonLayout`] is built once at startup. Every component downstream
//! (peak store, candidate generator, assembler, materializer, renderer) sizes
//! its per-joint containers from [`SkeletonLayout::joint_count`] instead of a
//! compile-time constant, so an alternative topology only needs a new edge
//! table.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use crate::error::{PoseError, Result};

/// Number of joints in the COCO body layout.
pub const COCO_N_PARTS: usize = 18;

/// Number of edges in the COCO body layout.
pub const COCO_N_PAIRS: usize = 19;

/// The 18 COCO body parts, in heatmap channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum CocoPart {
    /// Nose.
    Nose = 0,
    /// Neck (midpoint between the shoulders).
    Neck = 1,
    /// Right shoulder.
    RShoulder = 2,
    /// Right elbow.
    RElbow = 3,
    /// Right wrist.
    RWrist = 4,
    /// Left shoulder.
    LShoulder = 5,
    /// Left elbow.
    LElbow = 6,
    /// Left wrist.
    LWrist = 7,
    /// Right hip.
    RHip = 8,
    /// Right knee.
    RKnee = 9,
    /// Right ankle.
    RAnkle = 10,
    /// Left hip.
    LHip = 11,
    /// Left knee.
    LKnee = 12,
    /// Left ankle.
    LAnkle = 13,
    /// Right eye.
    REye = 14,
    /// Left eye.
    LEye = 15,
    /// Right ear.
    REar = 16,
    /// Left ear.
    LEar = 17,
}

impl CocoPart {
    /// All parts in index order.
    pub const ALL: [Self; COCO_N_PARTS] = [
        Self::Nose,
        Self::Neck,
        Self::RShoulder,
        Self::RElbow,
        Self::RWrist,
        Self::LShoulder,
        Self::LElbow,
        Self::LWrist,
        Self::RHip,
        Self::RKnee,
        Self::RAnkle,
        Self::LHip,
        Self::LKnee,
        Self::LAnkle,
        Self::REye,
        Self::LEye,
        Self::REar,
        Self::LEar,
    ];

    /// Look up a part by joint index.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Joint index of this part.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name of this part.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::Neck => "neck",
            Self::RShoulder => "right_shoulder",
            Self::RElbow => "right_elbow",
            Self::RWrist => "right_wrist",
            Self::LShoulder => "left_shoulder",
            Self::LElbow => "left_elbow",
            Self::LWrist => "left_wrist",
            Self::RHip => "right_hip",
            Self::RKnee => "right_knee",
            Self::RAnkle => "right_ankle",
            Self::LHip => "left_hip",
            Self::LKnee => "left_knee",
            Self::LAnkle => "left_ankle",
            Self::REye => "right_eye",
            Self::LEye => "left_eye",
            Self::REar => "right_ear",
            Self::LEar => "left_ear",
        }
    }
}

impl fmt::Display for CocoPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CocoPart {
    type Err = PoseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|part| part.as_str() == s.to_lowercase())
            .ok_or_else(|| PoseError::Topology(format!("unknown COCO part '{s}'")))
    }
}

/// COCO edge table as `(joint_a, joint_b, paf_channels)`.
///
/// The ordering is also the assembly order: each limb hangs off a joint that
/// an earlier edge already reached, starting from the neck. The last two
/// entries (shoulder to ear) are virtual.
const COCO_EDGES: [(CocoPart, CocoPart, Option<(usize, usize)>); COCO_N_PAIRS] = [
    (CocoPart::Neck, CocoPart::RShoulder, Some((12, 13))),
    (CocoPart::Neck, CocoPart::LShoulder, Some((20, 21))),
    (CocoPart::RShoulder, CocoPart::RElbow, Some((14, 15))),
    (CocoPart::RElbow, CocoPart::RWrist, Some((16, 17))),
    (CocoPart::LShoulder, CocoPart::LElbow, Some((22, 23))),
    (CocoPart::LElbow, CocoPart::LWrist, Some((24, 25))),
    (CocoPart::Neck, CocoPart::RHip, Some((0, 1))),
    (CocoPart::RHip, CocoPart::RKnee, Some((2, 3))),
    (CocoPart::RKnee, CocoPart::RAnkle, Some((4, 5))),
    (CocoPart::Neck, CocoPart::LHip, Some((6, 7))),
    (CocoPart::LHip, CocoPart::LKnee, Some((8, 9))),
    (CocoPart::LKnee, CocoPart::LAnkle, Some((10, 11))),
    (CocoPart::Neck, CocoPart::Nose, Some((28, 29))),
    (CocoPart::Nose, CocoPart::REye, Some((30, 31))),
    (CocoPart::REye, CocoPart::REar, Some((34, 35))),
    (CocoPart::Nose, CocoPart::LEye, Some((32, 33))),
    (CocoPart::LEye, CocoPart::LEar, Some((36, 37))),
    (CocoPart::RShoulder, CocoPart::REar, None),
    (CocoPart::LShoulder, CocoPart::LEar, None),
];

/// Index of the first virtual edge in the COCO table.
const COCO_FIRST_VIRTUAL: usize = 17;

/// Number of affinity channels the COCO network emits (x and y per edge).
pub const COCO_PAF_CHANNELS: usize = 2 * COCO_N_PAIRS;

/// One joint-to-joint connection of the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// First endpoint joint type.
    pub joint_a: usize,
    /// Second endpoint joint type.
    pub joint_b: usize,
    /// Affinity channel offsets `(x, y)` scoring this edge, `None` for virtual edges.
    pub paf_channels: Option<(usize, usize)>,
}

impl Edge {
    /// Create a real edge scored by the given affinity channels.
    #[must_use]
    pub const fn real(joint_a: usize, joint_b: usize, channel_x: usize, channel_y: usize) -> Self {
        Self {
            joint_a,
            joint_b,
            paf_channels: Some((channel_x, channel_y)),
        }
    }

    /// Create a virtual edge with no field measurement.
    #[must_use]
    pub const fn virtual_edge(joint_a: usize, joint_b: usize) -> Self {
        Self {
            joint_a,
            joint_b,
            paf_channels: None,
        }
    }

    /// Endpoint joint types `(a, b)`.
    #[must_use]
    pub const fn endpoints(&self) -> (usize, usize) {
        (self.joint_a, self.joint_b)
    }
}

/// One step of a virtual edge's dependency path.
///
/// `forward` means the walk enters the real edge at its `joint_a` end and
/// leaves at `joint_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathStep {
    /// Real edge index.
    pub edge: usize,
    /// Walk direction along the edge.
    pub forward: bool,
}

/// Validated skeleton layout: joint count, names, edge list and virtual split.
#[derive(Debug, Clone)]
pub struct SkeletonLayout {
    joint_names: Vec<String>,
    edges: Vec<Edge>,
    first_virtual: usize,
    dependencies: Vec<Vec<PathStep>>,
}

impl SkeletonLayout {
    /// Build and validate a layout.
    ///
    /// Edges at index `first_virtual` and above are virtual. Edge order is the
    /// assembly order.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Topology`] if an endpoint is out of range, an edge
    /// is a self loop, channel offsets disagree with the real/virtual split, a
    /// channel is used twice, or a virtual edge is not reachable through real
    /// edges.
    pub fn new(joint_names: Vec<String>, edges: Vec<Edge>, first_virtual: usize) -> Result<Self> {
        let joint_count = joint_names.len();
        if joint_count == 0 {
            return Err(PoseError::Topology("layout has no joints".to_string()));
        }
        if edges.is_empty() {
            return Err(PoseError::Topology("layout has no edges".to_string()));
        }
        if first_virtual > edges.len() {
            return Err(PoseError::Topology(format!(
                "first virtual edge {first_virtual} beyond edge count {}",
                edges.len()
            )));
        }

        let mut used_channels = Vec::new();
        for (index, edge) in edges.iter().enumerate() {
            if edge.joint_a >= joint_count || edge.joint_b >= joint_count {
                return Err(PoseError::Topology(format!(
                    "edge {index} ({}, {}) references a joint outside [0, {joint_count})",
                    edge.joint_a, edge.joint_b
                )));
            }
            if edge.joint_a == edge.joint_b {
                return Err(PoseError::Topology(format!(
                    "edge {index} is a self loop on joint {}",
                    edge.joint_a
                )));
            }
            match (index < first_virtual, edge.paf_channels) {
                (true, Some((cx, cy))) => {
                    for channel in [cx, cy] {
                        if used_channels.contains(&channel) {
                            return Err(PoseError::Topology(format!(
                                "affinity channel {channel} used twice (edge {index})"
                            )));
                        }
                        used_channels.push(channel);
                    }
                }
                (true, None) => {
                    return Err(PoseError::Topology(format!(
                        "real edge {index} has no affinity channels"
                    )));
                }
                (false, Some(_)) => {
                    return Err(PoseError::Topology(format!(
                        "virtual edge {index} must not carry affinity channels"
                    )));
                }
                (false, None) => {}
            }
        }

        let mut dependencies = vec![Vec::new(); edges.len()];
        for index in first_virtual..edges.len() {
            let edge = edges[index];
            dependencies[index] =
                shortest_real_path(joint_count, &edges[..first_virtual], edge.joint_a, edge.joint_b)
                    .ok_or_else(|| {
                        PoseError::Topology(format!(
                            "virtual edge {index} ({}, {}) is not connected through real edges",
                            edge.joint_a, edge.joint_b
                        ))
                    })?;
        }

        Ok(Self {
            joint_names,
            edges,
            first_virtual,
            dependencies,
        })
    }

    /// The 18-joint / 19-edge COCO body layout.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in table is malformed, which is a startup-fatal
    /// configuration error.
    pub fn coco() -> Result<Self> {
        let names = CocoPart::ALL.iter().map(|p| p.as_str().to_string()).collect();
        let edges = COCO_EDGES
            .iter()
            .map(|&(a, b, channels)| Edge {
                joint_a: a.index(),
                joint_b: b.index(),
                paf_channels: channels,
            })
            .collect();
        let layout = Self::new(names, edges, COCO_FIRST_VIRTUAL)?;
        if layout.edge_count() != COCO_N_PAIRS || layout.joint_count() != COCO_N_PARTS {
            return Err(PoseError::Topology(format!(
                "COCO layout must have {COCO_N_PARTS} joints and {COCO_N_PAIRS} edges"
            )));
        }
        Ok(layout)
    }

    /// Number of joint types.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joint_names.len()
    }

    /// Number of edges, real and virtual.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// All edges in assembly order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edge by index.
    #[must_use]
    pub fn edge(&self, index: usize) -> Option<&Edge> {
        self.edges.get(index)
    }

    /// Endpoint joint types of an edge.
    #[must_use]
    pub fn endpoints(&self, index: usize) -> Option<(usize, usize)> {
        self.edges.get(index).map(Edge::endpoints)
    }

    /// Whether the edge has no direct field measurement.
    ///
    /// For the COCO layout this is exactly `index > 16`.
    #[must_use]
    pub const fn is_virtual(&self, index: usize) -> bool {
        index >= self.first_virtual
    }

    /// Index of the first virtual edge (equals `edge_count` when there are none).
    #[must_use]
    pub const fn first_virtual(&self) -> usize {
        self.first_virtual
    }

    /// Real-edge path a virtual edge's score is derived from; empty for real edges.
    #[must_use]
    pub fn dependencies(&self, index: usize) -> &[PathStep] {
        self.dependencies.get(index).map_or(&[], Vec::as_slice)
    }

    /// Name of a joint type.
    #[must_use]
    pub fn joint_name(&self, joint: usize) -> Option<&str> {
        self.joint_names.get(joint).map(String::as_str)
    }

    /// Highest affinity channel any real edge reads, plus one.
    #[must_use]
    pub fn required_paf_channels(&self) -> usize {
        self.edges
            .iter()
            .filter_map(|e| e.paf_channels)
            .map(|(cx, cy)| cx.max(cy) + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Breadth-first search over real edges; neighbours are visited in edge order
/// so the returned path is reproducible.
fn shortest_real_path(
    joint_count: usize,
    real_edges: &[Edge],
    from: usize,
    to: usize,
) -> Option<Vec<PathStep>> {
    let mut came_from: Vec<Option<(usize, PathStep)>> = vec![None; joint_count];
    let mut visited = vec![false; joint_count];
    let mut queue = VecDeque::from([from]);
    visited[from] = true;

    while let Some(joint) = queue.pop_front() {
        if joint == to {
            break;
        }
        for (index, edge) in real_edges.iter().enumerate() {
            let (next, forward) = if edge.joint_a == joint {
                (edge.joint_b, true)
            } else if edge.joint_b == joint {
                (edge.joint_a, false)
            } else {
                continue;
            };
            if !visited[next] {
                visited[next] = true;
                came_from[next] = Some((joint, PathStep { edge: index, forward }));
                queue.push_back(next);
            }
        }
    }

    if !visited[to] {
        return None;
    }

    let mut path = Vec::new();
    let mut joint = to;
    while let Some((prev, step)) = came_from[joint] {
        path.push(step);
        joint = prev;
    }
    path.reverse();
    Some(path)
}
