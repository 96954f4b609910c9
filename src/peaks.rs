// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Per-frame storage of detected joints ("peaks").
//!
//! Every peak of a frame lives in one id space shared by all joint types, so
//! later stages compare peaks by plain id equality instead of
//! `(joint_type, index)` pairs.

use std::fmt;

use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};

/// Frame-local peak identifier, strictly increasing in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeakId(pub u32);

impl fmt::Display for PeakId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A local-maximum joint detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Store-assigned identifier.
    pub id: PeakId,
    /// Joint type index.
    pub joint: usize,
    /// X coordinate in the caller's frame (field pixels for the line-integral scorer).
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Detection confidence.
    pub score: f32,
}

impl Peak {
    /// Euclidean distance to another peak.
    #[must_use]
    pub fn distance(&self, other: &Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// All peaks of one frame, indexed by id and by joint type.
///
/// Reset with [`PeakStore::clear`] between frames; never share one across frames.
#[derive(Debug, Clone)]
pub struct PeakStore {
    peaks: Vec<Peak>,
    by_joint: Vec<Vec<PeakId>>,
}

impl PeakStore {
    /// Create an empty store for `joint_count` joint types.
    #[must_use]
    pub fn new(joint_count: usize) -> Self {
        Self {
            peaks: Vec::new(),
            by_joint: vec![Vec::new(); joint_count],
        }
    }

    /// Insert a peak and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::UnknownJoint`] if `joint` is outside the store's range.
    pub fn add(&mut self, joint: usize, x: f32, y: f32, score: f32) -> Result<PeakId> {
        let joint_count = self.by_joint.len();
        let slot = self
            .by_joint
            .get_mut(joint)
            .ok_or(PoseError::UnknownJoint { joint, joint_count })?;
        let id = PeakId(u32::try_from(self.peaks.len()).map_err(|_| {
            PoseError::Config("peak store exceeded u32::MAX entries".to_string())
        })?);
        self.peaks.push(Peak {
            id,
            joint,
            x,
            y,
            score,
        });
        slot.push(id);
        Ok(id)
    }

    /// Look up a peak by id.
    #[must_use]
    pub fn get(&self, id: PeakId) -> Option<&Peak> {
        self.peaks.get(id.0 as usize)
    }

    /// Ids of every peak of one joint type, in insertion order.
    #[must_use]
    pub fn peaks_of(&self, joint: usize) -> &[PeakId] {
        self.by_joint.get(joint).map_or(&[], Vec::as_slice)
    }

    /// Number of joint types the store was built for.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.by_joint.len()
    }

    /// Total number of peaks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    /// Whether the store holds no peaks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Iterate over all peaks in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.iter()
    }

    /// Drop every peak; the next id handed out is `0` again.
    pub fn clear(&mut self) {
        self.peaks.clear();
        for ids in &mut self.by_joint {
            ids.clear();
        }
    }
}

/// Extract peaks from a `(channels, height, width)` heatmap tensor.
///
/// Only the first `joint_count` channels are read, so a trailing background
/// channel is ignored. A pixel is a peak when it exceeds `threshold` and is
/// the maximum of its 3x3 neighbourhood; on plateaus the first pixel in
/// row-major order wins. Peaks are inserted channel by channel in row-major
/// order, which keeps ids reproducible.
///
/// # Errors
///
/// Returns [`PoseError::FieldShape`] if the tensor has fewer channels than
/// `joint_count`.
pub fn find_peaks(heatmap: ArrayView3<'_, f32>, joint_count: usize, threshold: f32) -> Result<PeakStore> {
    let (channels, height, width) = heatmap.dim();
    if channels < joint_count {
        return Err(PoseError::FieldShape(format!(
            "heatmap has {channels} channels, layout needs {joint_count}"
        )));
    }

    let mut store = PeakStore::new(joint_count);
    for joint in 0..joint_count {
        let map = heatmap.index_axis(ndarray::Axis(0), joint);
        for y in 0..height {
            for x in 0..width {
                let value = map[[y, x]];
                if value.is_nan() || value <= threshold {
                    continue;
                }
                if is_local_max(&map, y, x, value) {
                    #[allow(clippy::cast_precision_loss)]
                    let (px, py) = (x as f32, y as f32);
                    store.add(joint, px, py, value)?;
                }
            }
        }
    }

    tracing::trace!(peaks = store.len(), "extracted heatmap peaks");
    Ok(store)
}

fn is_local_max(map: &ndarray::ArrayView2<'_, f32>, y: usize, x: usize, value: f32) -> bool {
    let (height, width) = map.dim();
    for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
        for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
            if (ny, nx) == (y, x) {
                continue;
            }
            let other = map[[ny, nx]];
            // Earlier neighbours win ties, later ones must be strictly smaller.
            let earlier = (ny, nx) < (y, x);
            if other > value || (earlier && (other - value).abs() < f32::EPSILON) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_ids_are_global_and_increasing() {
        let mut store = PeakStore::new(3);
        let a = store.add(2, 1.0, 1.0, 0.9).unwrap();
        let b = store.add(0, 2.0, 2.0, 0.8).unwrap();
        let c = store.add(2, 3.0, 3.0, 0.7).unwrap();
        assert!(a < b && b < c);
        assert_eq!(store.peaks_of(2), &[a, c]);
        assert_eq!(store.peaks_of(0), &[b]);
        assert!(store.peaks_of(1).is_empty());
        assert_eq!(store.get(b).unwrap().joint, 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_unknown_joint_rejected() {
        let mut store = PeakStore::new(2);
        let err = store.add(5, 0.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, PoseError::UnknownJoint { joint: 5, joint_count: 2 }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_clear_resets_ids() {
        let mut store = PeakStore::new(1);
        store.add(0, 0.0, 0.0, 1.0).unwrap();
        store.add(0, 1.0, 0.0, 1.0).unwrap();
        store.clear();
        assert!(store.is_empty());
        assert!(store.peaks_of(0).is_empty());
        assert_eq!(store.add(0, 0.0, 0.0, 1.0).unwrap(), PeakId(0));
        assert!(store.get(PeakId(1)).is_none());
    }

    #[test]
    fn test_find_peaks_local_maxima() {
        let mut heatmap = Array3::<f32>::zeros((3, 5, 5));
        heatmap[[0, 1, 1]] = 0.9;
        heatmap[[0, 1, 2]] = 0.5; // neighbour of a stronger peak
        heatmap[[0, 3, 3]] = 0.6;
        heatmap[[1, 2, 2]] = 0.02; // below threshold
        heatmap[[2, 4, 4]] = 1.0; // background channel, ignored

        let store = find_peaks(heatmap.view(), 2, 0.05).unwrap();
        assert_eq!(store.len(), 2);
        let first = store.get(PeakId(0)).unwrap();
        assert_eq!((first.joint, first.x, first.y), (0, 1.0, 1.0));
        let second = store.get(PeakId(1)).unwrap();
        assert_eq!((second.x, second.y), (3.0, 3.0));
        assert!(store.peaks_of(1).is_empty());
    }

    #[test]
    fn test_find_peaks_plateau_single_peak() {
        let mut heatmap = Array3::<f32>::zeros((1, 3, 4));
        heatmap[[0, 1, 1]] = 0.7;
        heatmap[[0, 1, 2]] = 0.7;
        let store = find_peaks(heatmap.view(), 1, 0.1).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(PeakId(0)).unwrap().x, 1.0);
    }

    #[test]
    fn test_find_peaks_too_few_channels() {
        let heatmap = Array3::<f32>::zeros((2, 4, 4));
        assert!(matches!(
            find_peaks(heatmap.view(), 18, 0.1),
            Err(PoseError::FieldShape(_))
        ));
    }
}
