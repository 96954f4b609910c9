// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame pose parsing.
//!
//! [`PafParser`] drives the full pass for one frame: for each edge in layout
//! order it generates sorted candidates, greedily selects connections and
//! folds them into the assembler; the surviving instances are then
//! materialized into [`Skeleton`]s.
//!
//! A parser holds only the immutable layout and configuration, so a single
//! instance can serve many threads, each parsing its own frame.

use std::time::Instant;

use crate::affinity::{AffinityField, AffinityScorer, LineIntegralScorer};
use crate::assembly::{AssemblyAnomaly, HumanAssembler};
use crate::candidates::edge_candidates;
use crate::config::AssemblyConfig;
use crate::error::Result;
use crate::materialize::{Materializer, Skeleton};
use crate::peaks::PeakStore;
use crate::selection::{Connection, select_connections};
use crate::topology::SkeletonLayout;

/// Wall-clock timing of one parse, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
    /// Candidate generation and selection across all edges.
    pub connect: f64,
    /// Folding connections into partial skeletons.
    pub assemble: f64,
    /// Filtering and resolving partial skeletons.
    pub materialize: f64,
}

impl Speed {
    /// Total parse time in milliseconds.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.connect + self.assemble + self.materialize
    }
}

/// Result of parsing one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Materialized skeletons in creation order of their instances.
    pub skeletons: Vec<Skeleton>,
    /// Non-fatal irregularities observed while assembling.
    pub anomalies: Vec<AssemblyAnomaly>,
    /// Accepted connections per edge, indexed like the layout's edges.
    pub connections: Vec<Vec<Connection>>,
    /// Stage timings.
    pub speed: Speed,
}

/// Multi-person pose parser over a fixed layout.
///
/// # Example
///
/// ```rust
/// use pose_paf::{AssemblyConfig, Edge, PafParser, Peak, PeakStore, SkeletonLayout};
///
/// let layout = SkeletonLayout::coco().unwrap();
/// let parser = PafParser::new(layout, AssemblyConfig::default()).unwrap();
///
/// let mut store = PeakStore::new(parser.layout().joint_count());
/// store.add(1, 50.0, 40.0, 0.9).unwrap();
/// store.add(2, 40.0, 40.0, 0.9).unwrap();
/// store.add(3, 40.0, 60.0, 0.9).unwrap();
///
/// let scorer = |_: &Edge, _: &Peak, _: &Peak| Some(1.0);
/// let frame = parser.parse(&store, &scorer).unwrap();
/// assert_eq!(frame.skeletons.len(), 1);
/// assert_eq!(frame.skeletons[0].present_count(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct PafParser {
    layout: SkeletonLayout,
    config: AssemblyConfig,
}

impl PafParser {
    /// Create a parser.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Config`](crate::PoseError::Config) if the
    /// configuration fails validation.
    pub fn new(layout: SkeletonLayout, config: AssemblyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { layout, config })
    }

    /// Create a parser for the COCO-18 layout.
    ///
    /// # Errors
    ///
    /// See [`PafParser::new`].
    pub fn coco(config: AssemblyConfig) -> Result<Self> {
        Self::new(SkeletonLayout::coco()?, config)
    }

    /// The layout this parser assembles.
    #[must_use]
    pub const fn layout(&self) -> &SkeletonLayout {
        &self.layout
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &AssemblyConfig {
        &self.config
    }

    /// Parse one frame's peaks using an arbitrary affinity scorer.
    ///
    /// The output is a pure function of the store contents, the scorer and
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Propagates internal contract violations
    /// ([`PoseError::ProcessingOrder`](crate::PoseError::ProcessingOrder),
    /// [`PoseError::ConnectionMismatch`](crate::PoseError::ConnectionMismatch))
    /// and [`PoseError::UnknownPeak`](crate::PoseError::UnknownPeak) for a store
    /// whose indices are inconsistent.
    pub fn parse<S>(&self, store: &PeakStore, scorer: &S) -> Result<Frame>
    where
        S: AffinityScorer + ?Sized,
    {
        let mut speed = Speed::default();
        let mut assembler = HumanAssembler::new(&self.layout);
        let mut connections: Vec<Vec<Connection>> = Vec::with_capacity(self.layout.edge_count());

        for (index, edge) in self.layout.edges().iter().enumerate() {
            let start = Instant::now();
            let candidates = edge_candidates(&self.layout, index, store, scorer, &connections)?;
            let accepted = select_connections(edge, &candidates);
            speed.connect += start.elapsed().as_secs_f64() * 1000.0;

            let start = Instant::now();
            assembler.apply(index, &accepted)?;
            speed.assemble += start.elapsed().as_secs_f64() * 1000.0;

            tracing::trace!(
                edge = index,
                candidates = candidates.len(),
                accepted = accepted.len(),
                "selected connections"
            );
            connections.push(accepted);
        }

        let assembly = assembler.finish()?;
        let start = Instant::now();
        let skeletons = Materializer::new(&self.config).materialize(&assembly.partials, store)?;
        speed.materialize = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            peaks = store.len(),
            instances = assembly.partials.len(),
            skeletons = skeletons.len(),
            anomalies = assembly.anomalies.len(),
            ms = speed.total(),
            "parsed frame"
        );

        Ok(Frame {
            skeletons,
            anomalies: assembly.anomalies,
            connections,
            speed,
        })
    }

    /// Parse one frame scoring real edges with the line integral over `field`.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FieldShape`](crate::PoseError::FieldShape) if the
    /// field lacks channels the layout reads, plus everything
    /// [`PafParser::parse`] returns.
    pub fn parse_field(&self, store: &PeakStore, field: &AffinityField) -> Result<Frame> {
        field.check_layout(&self.layout)?;
        let scorer = LineIntegralScorer::new(field, &self.config);
        self.parse(store, &scorer)
    }
}
