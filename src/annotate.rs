// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

use crate::error::Result;
use crate::materialize::Skeleton;
use crate::topology::SkeletonLayout;
use crate::visualizer::Color;
use crate::visualizer::skeleton::{joint_color, limb_color};

/// Limb thickness in pixels, drawn as parallel one-pixel segments.
const LIMB_THICKNESS: i32 = 3;

/// Find the next available run directory (assemble, assemble2, assemble3, etc.)
#[must_use]
pub fn find_next_run_dir(base: &str, prefix: &str) -> String {
    let base_path = Path::new(base);

    let first = base_path.join(prefix);
    if !first.exists() {
        return first.to_string_lossy().to_string();
    }

    (2..)
        .map(|i| base_path.join(format!("{prefix}{i}")))
        .find(|p| !p.exists())
        .unwrap_or(first)
        .to_string_lossy()
        .to_string()
}

/// Load an image from disk.
///
/// # Errors
///
/// Returns [`PoseError::Image`](crate::PoseError::Image) if the file cannot be decoded.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage> {
    Ok(image::open(path)?)
}

/// Joint radius scaled to the image, as for keypoints in pose plots.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn joint_radius(image: &RgbImage) -> i32 {
    let (w, h) = image.dimensions();
    ((w.max(h) as f32 / 200.0).round() as i32).clamp(2, 8)
}

/// Draw one skeleton in place.
///
/// Present joints become filled circles; every edge whose endpoints are both
/// present becomes a line. A skeleton without present joints leaves the
/// image untouched.
pub fn draw_skeleton(image: &mut RgbImage, skeleton: &Skeleton, layout: &SkeletonLayout) {
    draw_skeleton_with_accent(image, skeleton, layout, Color::from_index(0));
}

/// Like [`draw_skeleton`], ringing each joint with `accent` to tell instances apart.
pub fn draw_skeleton_with_accent(
    image: &mut RgbImage,
    skeleton: &Skeleton,
    layout: &SkeletonLayout,
    accent: Color,
) {
    if skeleton.present_count() == 0 {
        return;
    }

    for (index, edge) in layout.edges().iter().enumerate() {
        let (Some(a), Some(b)) = (skeleton.joint(edge.joint_a), skeleton.joint(edge.joint_b)) else {
            continue;
        };
        if !(a.present && b.present) {
            continue;
        }
        let color: Rgb<u8> = limb_color(index).into();
        #[allow(clippy::cast_precision_loss)]
        for t in 0..LIMB_THICKNESS {
            let offset = (t - LIMB_THICKNESS / 2) as f32;
            draw_line_segment_mut(image, (a.x + offset, a.y), (b.x + offset, b.y), color);
            draw_line_segment_mut(image, (a.x, a.y + offset), (b.x, b.y + offset), color);
        }
    }

    let radius = joint_radius(image);
    for (index, joint) in skeleton.joints.iter().enumerate() {
        if !joint.present {
            continue;
        }
        #[allow(clippy::cast_possible_truncation)]
        let center = (joint.x.round() as i32, joint.y.round() as i32);
        draw_filled_circle_mut(image, center, radius, Rgb::from(accent));
        draw_filled_circle_mut(image, center, (radius - 1).max(1), joint_color(index).into());
    }
}

/// Annotate a copy of `image` with every skeleton.
#[must_use]
pub fn annotate_image(image: &DynamicImage, skeletons: &[Skeleton], layout: &SkeletonLayout) -> DynamicImage {
    let mut img = image.to_rgb8();
    for (index, skeleton) in skeletons.iter().enumerate() {
        draw_skeleton_with_accent(&mut img, skeleton, layout, Color::from_index(index));
    }
    DynamicImage::ImageRgb8(img)
}
