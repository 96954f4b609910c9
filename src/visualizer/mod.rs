// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colors and limb styling for drawing skeletons.

/// Color definitions and palettes.
pub mod color;

/// Limb and joint color assignments.
pub mod skeleton;

pub use color::Color;
