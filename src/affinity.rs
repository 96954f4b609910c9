// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Affinity field access and candidate scoring.
//!
//! Scoring a pairing of two peaks is a seam: the assembly core only needs an
//! [`AffinityScorer`]. [`LineIntegralScorer`] is the standard part-affinity
//! line integral over an [`AffinityField`]; closures work too, which is what
//! the tests use to inject exact scores.

use ndarray::{Array3, ArrayView3};

use crate::config::AssemblyConfig;
use crate::error::{PoseError, Result};
use crate::peaks::Peak;
use crate::topology::{Edge, SkeletonLayout};

/// Scores the pairing of two peaks along a real edge.
///
/// Returning `None` withholds the pairing: it never becomes a candidate.
pub trait AffinityScorer {
    /// Score `a` (of `edge.joint_a`) against `b` (of `edge.joint_b`).
    fn score(&self, edge: &Edge, a: &Peak, b: &Peak) -> Option<f32>;
}

impl<F> AffinityScorer for F
where
    F: Fn(&Edge, &Peak, &Peak) -> Option<f32>,
{
    fn score(&self, edge: &Edge, a: &Peak, b: &Peak) -> Option<f32> {
        self(edge, a, b)
    }
}

/// A `(channels, height, width)` part-affinity tensor.
#[derive(Debug, Clone)]
pub struct AffinityField {
    data: Array3<f32>,
}

impl AffinityField {
    /// Wrap a tensor.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FieldShape`] if any dimension is zero.
    pub fn new(data: Array3<f32>) -> Result<Self> {
        let (c, h, w) = data.dim();
        if c == 0 || h == 0 || w == 0 {
            return Err(PoseError::FieldShape(format!(
                "affinity field must be non-empty, got ({c}, {h}, {w})"
            )));
        }
        Ok(Self { data })
    }

    /// Build from a flat buffer in `(channels, height, width)` order.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FieldShape`] if the buffer length does not match.
    pub fn from_shape_vec(shape: (usize, usize, usize), data: Vec<f32>) -> Result<Self> {
        let array = Array3::from_shape_vec(shape, data)
            .map_err(|e| PoseError::FieldShape(format!("affinity buffer: {e}")))?;
        Self::new(array)
    }

    /// Number of channels.
    #[must_use]
    pub fn channels(&self) -> usize {
        self.data.dim().0
    }

    /// Field height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    /// Field width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    /// Borrow the raw tensor.
    #[must_use]
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// Check that every affinity channel the layout reads exists.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FieldShape`] when channels are missing.
    pub fn check_layout(&self, layout: &SkeletonLayout) -> Result<()> {
        let required = layout.required_paf_channels();
        if self.channels() < required {
            return Err(PoseError::FieldShape(format!(
                "affinity field has {} channels, layout reads {required}",
                self.channels()
            )));
        }
        Ok(())
    }

    /// Sample `(channel_x, channel_y)` at the nearest pixel, clamped to the field.
    #[must_use]
    pub fn vector_at(&self, channels: (usize, usize), x: f32, y: f32) -> (f32, f32) {
        let (_, h, w) = self.data.dim();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let (px, py) = (
            x.round().clamp(0.0, (w - 1) as f32) as usize,
            y.round().clamp(0.0, (h - 1) as f32) as usize,
        );
        (self.data[[channels.0, py, px]], self.data[[channels.1, py, px]])
    }
}

/// Mean projection of the affinity vectors onto the limb direction.
///
/// `samples` points are taken evenly along the segment from `a` to `b`. A
/// pairing is kept when at least `inlier_ratio` of them project above
/// `vector_threshold` and the final score is positive. The score is the mean
/// projection plus a length prior that penalizes limbs longer than half the
/// field height.
#[derive(Debug, Clone, Copy)]
pub struct LineIntegralScorer<'a> {
    field: &'a AffinityField,
    samples: usize,
    vector_threshold: f32,
    inlier_ratio: f32,
}

impl<'a> LineIntegralScorer<'a> {
    /// Create a scorer over `field` with the thresholds from `config`.
    #[must_use]
    pub const fn new(field: &'a AffinityField, config: &AssemblyConfig) -> Self {
        Self {
            field,
            samples: config.paf_samples,
            vector_threshold: config.paf_vector_threshold,
            inlier_ratio: config.paf_inlier_ratio,
        }
    }
}

impl AffinityScorer for LineIntegralScorer<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn score(&self, edge: &Edge, a: &Peak, b: &Peak) -> Option<f32> {
        let channels = edge.paf_channels?;
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let norm = dx.hypot(dy);
        if norm < 1e-6 {
            return None;
        }
        let (vx, vy) = (dx / norm, dy / norm);

        let steps = self.samples.max(2);
        let mut sum = 0.0;
        let mut inliers = 0usize;
        for i in 0..steps {
            let t = i as f32 / (steps - 1) as f32;
            let (fx, fy) = self.field.vector_at(channels, dx.mul_add(t, a.x), dy.mul_add(t, a.y));
            let projection = fx.mul_add(vx, fy * vy);
            if projection > self.vector_threshold {
                inliers += 1;
            }
            sum += projection;
        }

        let length_prior = (0.5 * self.field.height() as f32 / norm - 1.0).min(0.0);
        let score = sum / steps as f32 + length_prior;
        let enough = inliers as f32 >= self.inlier_ratio * steps as f32;
        (enough && score > 0.0).then_some(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peaks::PeakId;

    fn peak(id: u32, joint: usize, x: f32, y: f32) -> Peak {
        Peak {
            id: PeakId(id),
            joint,
            x,
            y,
            score: 1.0,
        }
    }

    /// Field whose channels (0, 1) point along +x everywhere.
    fn horizontal_field() -> AffinityField {
        let mut data = Array3::<f32>::zeros((2, 20, 20));
        data.index_axis_mut(ndarray::Axis(0), 0).fill(1.0);
        AffinityField::new(data).unwrap()
    }

    #[test]
    fn test_field_shape_checks() {
        assert!(AffinityField::new(Array3::zeros((0, 4, 4))).is_err());
        assert!(AffinityField::from_shape_vec((2, 2, 2), vec![0.0; 7]).is_err());

        let field = AffinityField::from_shape_vec((2, 2, 2), vec![0.0; 8]).unwrap();
        let layout = SkeletonLayout::coco().unwrap();
        assert!(matches!(field.check_layout(&layout), Err(PoseError::FieldShape(_))));
    }

    #[test]
    fn test_vector_at_clamps() {
        let field = horizontal_field();
        assert_eq!(field.vector_at((0, 1), -5.0, 100.0), (1.0, 0.0));
    }

    #[test]
    fn test_aligned_limb_scores_high() {
        let field = horizontal_field();
        let config = AssemblyConfig::default();
        let scorer = LineIntegralScorer::new(&field, &config);
        let edge = Edge::real(0, 1, 0, 1);

        let score = scorer.score(&edge, &peak(0, 0, 2.0, 5.0), &peak(1, 1, 8.0, 5.0));
        assert!((score.unwrap() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_opposed_limb_withheld() {
        let field = horizontal_field();
        let config = AssemblyConfig::default();
        let scorer = LineIntegralScorer::new(&field, &config);
        let edge = Edge::real(0, 1, 0, 1);

        // Pointing against the field.
        assert!(scorer.score(&edge, &peak(0, 0, 8.0, 5.0), &peak(1, 1, 2.0, 5.0)).is_none());
        // Perpendicular to the field.
        assert!(scorer.score(&edge, &peak(0, 0, 5.0, 2.0), &peak(1, 1, 5.0, 8.0)).is_none());
        // Coincident peaks.
        assert!(scorer.score(&edge, &peak(0, 0, 5.0, 5.0), &peak(1, 1, 5.0, 5.0)).is_none());
    }

    #[test]
    fn test_virtual_edge_not_scored() {
        let field = horizontal_field();
        let config = AssemblyConfig::default();
        let scorer = LineIntegralScorer::new(&field, &config);
        let edge = Edge::virtual_edge(0, 1);
        assert!(scorer.score(&edge, &peak(0, 0, 2.0, 5.0), &peak(1, 1, 8.0, 5.0)).is_none());
    }

    #[test]
    fn test_long_limb_penalized() {
        let field = horizontal_field();
        let config = AssemblyConfig::default();
        let scorer = LineIntegralScorer::new(&field, &config);
        let edge = Edge::real(0, 1, 0, 1);

        // Length 18 on a 20-pixel-high field: prior = 10 / 18 - 1.
        let score = scorer
            .score(&edge, &peak(0, 0, 1.0, 5.0), &peak(1, 1, 19.0, 5.0))
            .unwrap();
        assert!((score - 10.0 / 18.0).abs() < 1e-5);
    }

    #[test]
    fn test_closure_scorer() {
        let scorer = |_: &Edge, a: &Peak, b: &Peak| Some(a.score * b.score);
        let edge = Edge::real(0, 1, 0, 1);
        assert_eq!(scorer.score(&edge, &peak(0, 0, 0.0, 0.0), &peak(1, 1, 1.0, 1.0)), Some(1.0));
    }
}
