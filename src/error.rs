// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the pose assembly library.

use thiserror::Error;

use crate::peaks::PeakId;

/// Result type alias for pose assembly operations.
pub type Result<T> = std::result::Result<T, PoseError>;

/// Main error type for the pose assembly library.
///
/// `Topology` and `Config` are startup errors. `ProcessingOrder` and
/// `ConnectionMismatch` signal a broken internal contract: the frame pipeline
/// never produces them, so seeing one means a caller drove the low-level
/// components out of order.
#[derive(Debug, Error)]
pub enum PoseError {
    /// Skeleton layout failed validation.
    #[error("Topology error: {0}")]
    Topology(String),
    /// Invalid configuration provided.
    #[error("Config error: {0}")]
    Config(String),
    /// Joint index outside the layout.
    #[error("Unknown joint type {joint} (layout has {joint_count} joints)")]
    UnknownJoint {
        /// Offending joint index.
        joint: usize,
        /// Number of joints in the layout.
        joint_count: usize,
    },
    /// Peak id not present in the store.
    #[error("Unknown peak id {0}")]
    UnknownPeak(PeakId),
    /// Affinity field or heatmap tensor has an unusable shape.
    #[error("Field shape error: {0}")]
    FieldShape(String),
    /// Edges were assembled out of layout order.
    #[error("Processing order violated: got edge {got}, expected edge {expected}")]
    ProcessingOrder {
        /// Edge that was handed in.
        got: usize,
        /// Edge the assembler was waiting for.
        expected: usize,
    },
    /// A connection does not belong to the edge it was applied on.
    #[error("Connection ({joint_a}, {joint_b}) does not match edge {edge}")]
    ConnectionMismatch {
        /// Edge index.
        edge: usize,
        /// First joint type of the connection.
        joint_a: usize,
        /// Second joint type of the connection.
        joint_b: usize,
    },
    /// Wrapped `std::io::Error`.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON input.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// Error loading or saving images.
    #[error("Image error: {0}")]
    Image(String),
}

#[cfg(feature = "annotate")]
impl From<image::ImageError> for PoseError {
    fn from(err: image::ImageError) -> Self {
        Self::Image(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoseError::Topology("test".to_string());
        assert_eq!(err.to_string(), "Topology error: test");

        let err = PoseError::ProcessingOrder {
            got: 17,
            expected: 3,
        };
        assert_eq!(
            err.to_string(),
            "Processing order violated: got edge 17, expected edge 3"
        );

        let err = PoseError::UnknownPeak(PeakId(42));
        assert_eq!(err.to_string(), "Unknown peak id 42");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error as _;

        let err: PoseError = std::io::Error::other("disk").into();
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("IO error"));
    }
}
