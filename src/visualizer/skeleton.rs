// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use super::color::Color;

/// Limb color indices into `POSE_COLORS`, one per COCO-18 edge in layout order.
/// Mapping: right arm=orange, left arm=blue, legs=pink, head=green, virtual ear links=red
pub const LIMB_COLOR_INDICES: [usize; 19] = [
    0, 9, 1, 2, // neck-shoulders, right arm
    8, 5, // left arm
    7, 6, 4, // right leg
    12, 11, 10, // left leg
    16, 15, 14, 15, 14, // head
    18, 18, // virtual shoulder-ear
];

/// Joint color indices into `POSE_COLORS`, one per COCO-18 joint.
pub const JOINT_COLOR_INDICES: [usize; 18] = [
    16, 19, 0, 1, 2, 9, 8, 5, 7, 6, 4, 12, 11, 10, 15, 15, 14, 14,
];

/// Color of limb `edge`, wrapping for layouts with more edges than the table.
#[must_use]
pub fn limb_color(edge: usize) -> Color {
    Color::from_pose_index(LIMB_COLOR_INDICES[edge % LIMB_COLOR_INDICES.len()])
}

/// Color of joint `joint`, wrapping for layouts with more joints than the table.
#[must_use]
pub fn joint_color(joint: usize) -> Color {
    Color::from_pose_index(JOINT_COLOR_INDICES[joint % JOINT_COLOR_INDICES.len()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{COCO_N_PAIRS, COCO_N_PARTS};

    #[test]
    fn test_tables_cover_coco() {
        assert_eq!(LIMB_COLOR_INDICES.len(), COCO_N_PAIRS);
        assert_eq!(JOINT_COLOR_INDICES.len(), COCO_N_PARTS);
    }

    #[test]
    fn test_colors_wrap() {
        assert_eq!(limb_color(0), limb_color(19));
        assert_eq!(joint_color(0), Color(0, 255, 0));
    }
}
