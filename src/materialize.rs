// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Turning partial skeletons into finalized, renderable skeletons.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assembly::PartialSkeleton;
use crate::config::{AssemblyConfig, ScoreNormalization};
use crate::error::{PoseError, Result};
use crate::peaks::PeakStore;

/// One joint of a finalized skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Joint {
    /// Whether this joint was detected.
    pub present: bool,
    /// X coordinate, zero when absent.
    pub x: f32,
    /// Y coordinate, zero when absent.
    pub y: f32,
    /// Peak confidence, zero when absent.
    pub score: f32,
}

/// A finalized human instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    /// Joints indexed by joint type.
    pub joints: Vec<Joint>,
    /// Aggregate score under the configured normalization.
    pub score: f32,
}

impl Skeleton {
    /// Joint by type, if the index is in range.
    #[must_use]
    pub fn joint(&self, joint: usize) -> Option<&Joint> {
        self.joints.get(joint)
    }

    /// Number of present joints.
    #[must_use]
    pub fn present_count(&self) -> usize {
        self.joints.iter().filter(|j| j.present).count()
    }

    /// Copy with present coordinates multiplied by `(sx, sy)`.
    ///
    /// Used to map heatmap-space skeletons onto the source image.
    #[must_use]
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        let joints = self
            .joints
            .iter()
            .map(|j| {
                if j.present {
                    Joint {
                        x: j.x * sx,
                        y: j.y * sy,
                        ..*j
                    }
                } else {
                    *j
                }
            })
            .collect();
        Self {
            joints,
            score: self.score,
        }
    }
}

impl fmt::Display for Skeleton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, j) in self.joints.iter().enumerate().filter(|(_, j)| j.present) {
            write!(f, "BodyPart:{i}-({:.2}, {:.2}) score={:.2} ", j.x, j.y, j.score)?;
        }
        write!(f, "score={:.2}", self.score)
    }
}

/// Filters partial skeletons and resolves their peak references.
#[derive(Debug, Clone, Copy)]
pub struct Materializer {
    min_joints: usize,
    min_score: f32,
    normalization: ScoreNormalization,
}

impl Materializer {
    /// Create a materializer from the relevant config fields.
    #[must_use]
    pub const fn new(config: &AssemblyConfig) -> Self {
        Self {
            min_joints: config.min_joints,
            min_score: config.min_score,
            normalization: config.normalization,
        }
    }

    /// Materialize every partial skeleton that passes the thresholds, keeping order.
    ///
    /// Instances with fewer than `min_joints` filled slots, or whose normalized
    /// score is below `min_score`, are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::UnknownPeak`] if a slot references a peak the store
    /// does not hold.
    pub fn materialize(&self, partials: &[PartialSkeleton], store: &PeakStore) -> Result<Vec<Skeleton>> {
        let mut skeletons = Vec::with_capacity(partials.len());
        for partial in partials {
            if partial.filled_count() < self.min_joints {
                continue;
            }
            let skeleton = self.build(partial, store)?;
            if skeleton.score < self.min_score {
                continue;
            }
            skeletons.push(skeleton);
        }
        Ok(skeletons)
    }

    fn build(&self, partial: &PartialSkeleton, store: &PeakStore) -> Result<Skeleton> {
        let joints = partial
            .slots()
            .iter()
            .map(|slot| match slot {
                Some(id) => {
                    let peak = store.get(*id).ok_or(PoseError::UnknownPeak(*id))?;
                    Ok(Joint {
                        present: true,
                        x: peak.x,
                        y: peak.y,
                        score: peak.score,
                    })
                }
                None => Ok(Joint::default()),
            })
            .collect::<Result<Vec<_>>>()?;

        #[allow(clippy::cast_precision_loss)]
        let score = match self.normalization {
            ScoreNormalization::Sum => partial.score(),
            ScoreNormalization::PerJoint => partial.score() / partial.filled_count().max(1) as f32,
        };

        Ok(Skeleton { joints, score })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembly::InstanceId;
    use crate::peaks::PeakId;

    fn full_store(joint_count: usize) -> (PeakStore, Vec<Option<PeakId>>) {
        let mut store = PeakStore::new(joint_count);
        let mut slots = Vec::new();
        for j in 0..joint_count {
            #[allow(clippy::cast_precision_loss)]
            let v = j as f32;
            slots.push(Some(store.add(j, v * 2.0, v * 3.0, 0.5 + v / 100.0).unwrap()));
        }
        (store, slots)
    }

    #[test]
    fn test_full_partial_materializes_exactly() {
        let (store, slots) = full_store(18);
        let partial = PartialSkeleton::from_slots(InstanceId(0), slots, 4.5);
        assert_eq!(partial.filled_count(), 18);

        let skeletons = Materializer::new(&AssemblyConfig::default())
            .materialize(&[partial], &store)
            .unwrap();
        assert_eq!(skeletons.len(), 1);
        let skeleton = &skeletons[0];
        assert_eq!(skeleton.present_count(), 18);
        for (j, joint) in skeleton.joints.iter().enumerate() {
            let peak = store.get(store.peaks_of(j)[0]).unwrap();
            assert!(joint.present);
            assert_eq!((joint.x, joint.y, joint.score), (peak.x, peak.y, peak.score));
        }
        assert!((skeleton.score - 4.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_below_threshold_dropped() {
        let (store, mut slots) = full_store(18);
        for slot in slots.iter_mut().skip(1) {
            *slot = None;
        }
        let partial = PartialSkeleton::from_slots(InstanceId(0), slots, 1.0);
        assert_eq!(partial.filled_count(), 1);

        let config = AssemblyConfig::default().with_min_joints(3);
        let skeletons = Materializer::new(&config).materialize(&[partial], &store).unwrap();
        assert!(skeletons.is_empty());
    }

    #[test]
    fn test_absent_joints_zeroed() {
        let (store, mut slots) = full_store(4);
        slots[2] = None;
        let partial = PartialSkeleton::from_slots(InstanceId(3), slots, 0.9);
        let skeletons = Materializer::new(&AssemblyConfig::default())
            .materialize(&[partial], &store)
            .unwrap();
        assert_eq!(skeletons[0].joint(2), Some(&Joint::default()));
        assert_eq!(skeletons[0].present_count(), 3);
    }

    #[test]
    fn test_per_joint_normalization_and_min_score() {
        let (store, slots) = full_store(4);
        let partial = PartialSkeleton::from_slots(InstanceId(0), slots, 2.0);

        let config = AssemblyConfig::default().with_normalization(ScoreNormalization::PerJoint);
        let skeletons = Materializer::new(&config)
            .materialize(std::slice::from_ref(&partial), &store)
            .unwrap();
        assert!((skeletons[0].score - 0.5).abs() < f32::EPSILON);

        let config = config.with_min_score(0.6);
        assert!(Materializer::new(&config)
            .materialize(&[partial], &store)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_peak_is_error() {
        let store = PeakStore::new(3);
        let partial = PartialSkeleton::from_slots(
            InstanceId(0),
            vec![Some(PeakId(0)), Some(PeakId(1)), Some(PeakId(2))],
            1.0,
        );
        let err = Materializer::new(&AssemblyConfig::default())
            .materialize(&[partial], &store)
            .unwrap_err();
        assert!(matches!(err, PoseError::UnknownPeak(PeakId(0))));
    }

    #[test]
    fn test_scaled_and_display() {
        let (store, slots) = full_store(3);
        let partial = PartialSkeleton::from_slots(InstanceId(0), slots, 1.0);
        let skeleton = Materializer::new(&AssemblyConfig::default())
            .materialize(&[partial], &store)
            .unwrap()
            .remove(0);
        let scaled = skeleton.scaled(2.0, 0.5);
        assert_eq!((scaled.joints[1].x, scaled.joints[1].y), (4.0, 1.5));
        assert!(skeleton.to_string().ends_with("score=1.00"));
        assert!(skeleton.to_string().starts_with("BodyPart:0-(0.00, 0.00)"));
    }
}
