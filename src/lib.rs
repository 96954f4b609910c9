// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Pose PAF
//!
//! Multi-person pose assembly from joint peaks and part affinity fields,
//! written in Rust.
//!
//! A bottom-up pose network emits one confidence heatmap per joint type and a
//! two-channel affinity field per limb. This library turns those outputs into
//! a list of person skeletons: peaks are scored pairwise along each limb,
//! accepted greedily, and folded into per-person instances edge by edge.
//!
//! ## Features
//!
//! - **Deterministic** - Same peaks, field and configuration always give the same skeletons
//! - **Pluggable scoring** - Any [`AffinityScorer`] (including closures) can score limbs
//! - **Custom layouts** - COCO-18 built in, any tree-plus-virtual-edge [`SkeletonLayout`] accepted
//! - **Thread friendly** - A [`PafParser`] is `Send + Sync`; each thread parses its own frame
//! - **Annotation** - Draw skeletons onto images with the `annotate` feature
//!
//! ## Quick Start (Library)
//!
//! ```rust
//! use pose_paf::{AffinityField, AssemblyConfig, PafParser, find_peaks};
//! use ndarray::Array3;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let parser = PafParser::coco(AssemblyConfig::default())?;
//!
//!     // Network outputs: 19 heatmap channels (18 joints + background), 38 PAF channels.
//!     let heatmap = Array3::<f32>::zeros((19, 46, 46));
//!     let field = AffinityField::new(Array3::zeros((38, 46, 46)))?;
//!
//!     let store = find_peaks(heatmap.view(), parser.layout().joint_count(), 0.05)?;
//!     let frame = parser.parse_field(&store, &field)?;
//!     for skeleton in &frame.skeletons {
//!         println!("{skeleton}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Assemble poses from a JSON dump of network outputs
//! pose-paf assemble --input frame.json
//!
//! # Draw the result on the source image
//! pose-paf assemble --input frame.json --image person.jpg --save
//!
//! # Write skeletons as JSON
//! pose-paf assemble --input frame.json --json skeletons.json --min-joints 4
//! ```
//!
//! ## Custom Configuration
//!
//! ```rust
//! use pose_paf::{AssemblyConfig, ScoreNormalization};
//!
//! let config = AssemblyConfig::new()
//!     .with_min_joints(4)                               // Drop sparse instances
//!     .with_min_score(0.3)                              // Drop weak instances
//!     .with_normalization(ScoreNormalization::PerJoint) // Mean score per joint
//!     .with_paf_samples(10);                            // Line-integral samples
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`topology`] | [`SkeletonLayout`], [`Edge`] and the COCO-18 tables |
//! | [`peaks`] | [`PeakStore`] and heatmap peak extraction |
//! | [`affinity`] | [`AffinityField`], [`AffinityScorer`], [`LineIntegralScorer`] |
//! | [`candidates`] | Candidate generation for real and virtual edges |
//! | [`selection`] | Greedy per-edge [`Connection`] selection |
//! | [`assembly`] | [`HumanAssembler`] and [`PartialSkeleton`] |
//! | [`materialize`] | Final [`Skeleton`] output |
//! | [`parser`] | [`PafParser`] driving a full frame |
//! | [`config`] | [`AssemblyConfig`] |
//! | [`error`] | Error types ([`PoseError`], [`Result`]) |
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Skeleton drawing and image saving (default) |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod affinity;
#[cfg(feature = "annotate")]
pub mod annotate;
pub mod assembly;
pub mod candidates;
pub mod cli;
pub mod config;
pub mod error;
pub mod materialize;
pub mod parser;
pub mod peaks;
pub mod selection;
pub mod topology;
pub mod visualizer;

// Re-export main types for convenience
pub use affinity::{AffinityField, AffinityScorer, LineIntegralScorer};
pub use assembly::{Assembly, AssemblyAnomaly, HumanAssembler, InstanceId, PartialSkeleton};
pub use candidates::ConnectionCandidate;
pub use config::{AssemblyConfig, ScoreNormalization};
pub use error::{PoseError, Result};
pub use materialize::{Joint, Materializer, Skeleton};
pub use parser::{Frame, PafParser, Speed};
pub use peaks::{Peak, PeakId, PeakStore, find_peaks};
pub use selection::Connection;
pub use topology::{CocoPart, Edge, SkeletonLayout};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "pose-paf");
    }
}
