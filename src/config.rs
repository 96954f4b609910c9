// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Assembly configuration.
//!
//! This module defines the [`AssemblyConfig`] struct, which controls the
//! affinity line-integral thresholds, heatmap peak extraction and the
//! filtering applied when partial skeletons are materialized.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};

/// How a skeleton's aggregate score is derived from its accumulated connection scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Raw sum of accepted connection scores.
    #[default]
    Sum,
    /// Sum divided by the number of filled joints.
    PerJoint,
}

impl fmt::Display for ScoreNormalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum => write!(f, "sum"),
            Self::PerJoint => write!(f, "per_joint"),
        }
    }
}

impl FromStr for ScoreNormalization {
    type Err = PoseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "per_joint" | "per-joint" | "mean" => Ok(Self::PerJoint),
            other => Err(PoseError::Config(format!(
                "unknown score normalization '{other}' (expected sum or per_joint)"
            ))),
        }
    }
}

/// Configuration for pose assembly.
///
/// It uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_paf::{AssemblyConfig, ScoreNormalization};
///
/// let config = AssemblyConfig::new()
///     .with_min_joints(4)
///     .with_normalization(ScoreNormalization::PerJoint)
///     .with_paf_samples(10);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Minimum number of filled joints for a partial skeleton to be materialized.
    pub min_joints: usize,
    /// Minimum aggregate score (after normalization) of a materialized skeleton.
    pub min_score: f32,
    /// Aggregate score policy.
    pub normalization: ScoreNormalization,
    /// Number of points sampled along a limb for the affinity line integral.
    pub paf_samples: usize,
    /// Projection above which a sample counts as supporting the limb.
    pub paf_vector_threshold: f32,
    /// Fraction of samples that must support the limb (0.0 to 1.0).
    pub paf_inlier_ratio: f32,
    /// Heatmap value a local maximum must exceed to become a peak.
    pub peak_threshold: f32,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            min_joints: 3,
            min_score: 0.0,
            normalization: ScoreNormalization::Sum,
            paf_samples: 10,
            paf_vector_threshold: 0.05,
            paf_inlier_ratio: 0.8,
            peak_threshold: 0.05,
        }
    }
}

impl AssemblyConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`AssemblyConfig::validate`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the minimum joint count for materialization.
    #[must_use]
    pub const fn with_min_joints(mut self, min_joints: usize) -> Self {
        self.min_joints = min_joints;
        self
    }

    /// Set the minimum aggregate score for materialization.
    #[must_use]
    pub const fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Set the aggregate score policy.
    #[must_use]
    pub const fn with_normalization(mut self, normalization: ScoreNormalization) -> Self {
        self.normalization = normalization;
        self
    }

    /// Set the number of line-integral samples.
    #[must_use]
    pub const fn with_paf_samples(mut self, samples: usize) -> Self {
        self.paf_samples = samples;
        self
    }

    /// Set the per-sample projection threshold.
    #[must_use]
    pub const fn with_paf_vector_threshold(mut self, threshold: f32) -> Self {
        self.paf_vector_threshold = threshold;
        self
    }

    /// Set the required fraction of supporting samples.
    #[must_use]
    pub const fn with_paf_inlier_ratio(mut self, ratio: f32) -> Self {
        self.paf_inlier_ratio = ratio;
        self
    }

    /// Set the heatmap peak threshold.
    #[must_use]
    pub const fn with_peak_threshold(mut self, threshold: f32) -> Self {
        self.peak_threshold = threshold;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.min_joints == 0 {
            return Err(PoseError::Config("min_joints must be at least 1".to_string()));
        }
        if self.paf_samples < 2 {
            return Err(PoseError::Config("paf_samples must be at least 2".to_string()));
        }
        if !(0.0..=1.0).contains(&self.paf_inlier_ratio) {
            return Err(PoseError::Config(format!(
                "paf_inlier_ratio must be within [0, 1], got {}",
                self.paf_inlier_ratio
            )));
        }
        for (name, value) in [
            ("min_score", self.min_score),
            ("paf_vector_threshold", self.paf_vector_threshold),
            ("peak_threshold", self.peak_threshold),
        ] {
            if !value.is_finite() {
                return Err(PoseError::Config(format!("{name} must be finite")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = AssemblyConfig::default();
        assert_eq!(config.min_joints, 3);
        assert_eq!(config.paf_samples, 10);
        assert_eq!(config.normalization, ScoreNormalization::Sum);
        assert!((config.paf_inlier_ratio - 0.8).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AssemblyConfig::new()
            .with_min_joints(5)
            .with_min_score(0.4)
            .with_normalization(ScoreNormalization::PerJoint)
            .with_paf_samples(20)
            .with_paf_vector_threshold(0.1)
            .with_paf_inlier_ratio(0.5)
            .with_peak_threshold(0.2);

        assert_eq!(config.min_joints, 5);
        assert!((config.min_score - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.normalization, ScoreNormalization::PerJoint);
        assert_eq!(config.paf_samples, 20);
        assert!((config.paf_vector_threshold - 0.1).abs() < f32::EPSILON);
        assert!((config.paf_inlier_ratio - 0.5).abs() < f32::EPSILON);
        assert!((config.peak_threshold - 0.2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        assert!(AssemblyConfig::new().with_min_joints(0).validate().is_err());
        assert!(AssemblyConfig::new().with_paf_samples(1).validate().is_err());
        assert!(AssemblyConfig::new().with_paf_inlier_ratio(1.5).validate().is_err());
        assert!(AssemblyConfig::new().with_min_score(f32::NAN).validate().is_err());
    }

    #[test]
    fn test_config_partial_json() {
        let config: AssemblyConfig =
            serde_json::from_str(r#"{"min_joints": 4, "normalization": "per_joint"}"#).unwrap();
        assert_eq!(config.min_joints, 4);
        assert_eq!(config.normalization, ScoreNormalization::PerJoint);
        assert_eq!(config.paf_samples, 10);
    }

    #[test]
    fn test_normalization_parse() {
        assert_eq!("sum".parse::<ScoreNormalization>().unwrap(), ScoreNormalization::Sum);
        assert_eq!("Mean".parse::<ScoreNormalization>().unwrap(), ScoreNormalization::PerJoint);
        assert!("median".parse::<ScoreNormalization>().is_err());
        assert_eq!(ScoreNormalization::PerJoint.to_string(), "per_joint");
    }
}
