// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::fs;
use std::path::Path;
use std::process;

use ndarray::Array3;
use serde::{Deserialize, Serialize};

#[cfg(feature = "annotate")]
use crate::annotate::{annotate_image, find_next_run_dir, load_image};

use crate::cli::args::AssembleArgs;
use crate::cli::logging::set_verbose;
use crate::{
    AffinityField, AssemblyAnomaly, AssemblyConfig, Frame, PafParser, PeakStore, PoseError,
    Result, Skeleton, SkeletonLayout, VERSION, find_peaks,
};
use crate::{error, section, success, verbose, warn};

/// One peak as written in a frame file.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PeakRecord {
    /// Joint type index.
    pub joint: usize,
    /// X coordinate in field pixels.
    pub x: f32,
    /// Y coordinate in field pixels.
    pub y: f32,
    /// Peak confidence.
    pub score: f32,
}

/// A `(channels, height, width)` tensor as written in a frame file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TensorRecord {
    /// Tensor shape.
    pub shape: [usize; 3],
    /// Row-major values.
    pub data: Vec<f32>,
}

impl TensorRecord {
    /// Convert into an owned array.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::FieldShape`] if `data` does not match `shape`.
    pub fn into_array(self) -> Result<Array3<f32>> {
        let shape = self.shape;
        let [c, h, w] = shape;
        Array3::from_shape_vec((c, h, w), self.data)
            .map_err(|e| PoseError::FieldShape(format!("tensor {shape:?}: {e}")))
    }
}

/// One frame of network output: peaks or a heatmap, plus the affinity field.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FrameFile {
    /// Pre-extracted peaks; takes precedence over `heatmap`.
    #[serde(default)]
    pub peaks: Option<Vec<PeakRecord>>,
    /// Joint heatmaps, optionally with a trailing background channel.
    #[serde(default)]
    pub heatmap: Option<TensorRecord>,
    /// Part affinity field.
    pub paf: TensorRecord,
}

impl FrameFile {
    /// Read a frame file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Build the frame's peak store.
    ///
    /// # Errors
    ///
    /// Returns [`PoseError::Config`] if the frame has neither peaks nor a
    /// heatmap, [`PoseError::FieldShape`] if the heatmap grid differs from the
    /// affinity field's, and propagates store and heatmap errors.
    pub fn peak_store(&self, layout: &SkeletonLayout, config: &AssemblyConfig) -> Result<PeakStore> {
        if let Some(peaks) = &self.peaks {
            let mut store = PeakStore::new(layout.joint_count());
            for p in peaks {
                store.add(p.joint, p.x, p.y, p.score)?;
            }
            return Ok(store);
        }
        match &self.heatmap {
            Some(heatmap) => {
                // Peaks are scored against the affinity field in its own pixels.
                if heatmap.shape[1..] != self.paf.shape[1..] {
                    return Err(PoseError::FieldShape(format!(
                        "heatmap grid {:?} does not match affinity grid {:?}",
                        &heatmap.shape[1..],
                        &self.paf.shape[1..]
                    )));
                }
                let array = heatmap.clone().into_array()?;
                find_peaks(array.view(), layout.joint_count(), config.peak_threshold)
            }
            None => Err(PoseError::Config(
                "frame has neither 'peaks' nor 'heatmap'".to_string(),
            )),
        }
    }
}

/// JSON report written with `--json`.
#[derive(Debug, Serialize)]
struct Report<'a> {
    skeletons: &'a [Skeleton],
    anomalies: &'a [AssemblyAnomaly],
}

/// Resolve the effective configuration: file first, then flag overrides.
fn build_config(args: &AssembleArgs) -> Result<AssemblyConfig> {
    let mut config = match &args.config {
        Some(path) => AssemblyConfig::from_json_file(path)?,
        None => AssemblyConfig::new(),
    };
    if let Some(min_joints) = args.min_joints {
        config = config.with_min_joints(min_joints);
    }
    if let Some(min_score) = args.min_score {
        config = config.with_min_score(min_score);
    }
    if let Some(normalization) = &args.normalization {
        config = config.with_normalization(normalization.parse()?);
    }
    config.validate()?;
    Ok(config)
}

/// Format a one-line summary (e.g., "2 persons, 2 collisions").
fn format_summary(frame: &Frame) -> String {
    let count = frame.skeletons.len();
    let mut summary = match count {
        0 => "(no persons)".to_string(),
        1 => "1 person".to_string(),
        n => format!("{n} persons"),
    };
    match frame.anomalies.len() {
        0 => {}
        1 => summary.push_str(", 1 collision"),
        n => summary.push_str(&format!(", {n} collisions")),
    }
    summary
}

/// Run pose assembly on one frame file.
pub fn run_assemble(args: &AssembleArgs) {
    set_verbose(args.verbose);
    if let Err(e) = assemble(args) {
        error!("{e}");
        process::exit(1);
    }
}

fn assemble(args: &AssembleArgs) -> Result<()> {
    let config = build_config(args)?;
    let parser = PafParser::coco(config)?;

    println!("Pose PAF {VERSION} 🚀 Rust CPU");
    verbose!(
        "COCO-18 summary: {} joints, {} edges ({} virtual), min_joints={}, normalization={}",
        parser.layout().joint_count(),
        parser.layout().edge_count(),
        parser.layout().edge_count() - parser.layout().first_virtual(),
        parser.config().min_joints,
        parser.config().normalization
    );
    verbose!("");

    let frame_file = FrameFile::from_json_file(&args.input)?;
    let store = frame_file.peak_store(parser.layout(), parser.config())?;
    let field = AffinityField::new(frame_file.paf.into_array()?)?;
    let frame = parser.parse_field(&store, &field)?;

    verbose!(
        "{}: {}x{} {} peaks, {}, {:.1}ms",
        args.input,
        field.width(),
        field.height(),
        store.len(),
        format_summary(&frame),
        frame.speed.total()
    );
    for anomaly in &frame.anomalies {
        warn!("{anomaly}");
    }

    section!("Skeletons");
    for (i, skeleton) in frame.skeletons.iter().enumerate() {
        verbose!("{i}: {skeleton}");
    }

    if let Some(path) = &args.json {
        let report = Report {
            skeletons: &frame.skeletons,
            anomalies: &frame.anomalies,
        };
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        success!("Skeletons written to {path}");
    }

    #[cfg(feature = "annotate")]
    if args.save {
        save_annotated(args, &parser, &field, &frame)?;
    }

    #[cfg(not(feature = "annotate"))]
    if args.save {
        warn!(
            "--save requires the 'annotate' feature. Compile with --features annotate to enable saving."
        );
    }

    verbose!(
        "Speed: {:.1}ms connect, {:.1}ms assemble, {:.1}ms materialize",
        frame.speed.connect,
        frame.speed.assemble,
        frame.speed.materialize
    );
    Ok(())
}

#[cfg(feature = "annotate")]
#[allow(clippy::cast_precision_loss)]
fn save_annotated(
    args: &AssembleArgs,
    parser: &PafParser,
    field: &AffinityField,
    frame: &Frame,
) -> Result<()> {
    let Some(image_path) = &args.image else {
        warn!("--save needs --image to draw on, skipping.");
        return Ok(());
    };
    let image = load_image(image_path)?;

    // Peaks live in field pixels; stretch them onto the image.
    let sx = image.width() as f32 / field.width() as f32;
    let sy = image.height() as f32 / field.height() as f32;
    let scaled: Vec<Skeleton> = frame.skeletons.iter().map(|s| s.scaled(sx, sy)).collect();
    let annotated = annotate_image(&image, &scaled, parser.layout());

    let dir = find_next_run_dir("runs/pose", "assemble");
    fs::create_dir_all(&dir)?;
    let file_name = Path::new(image_path)
        .file_name()
        .map_or_else(|| "result.jpg".into(), |n| n.to_string_lossy().to_string());
    let out = Path::new(&dir).join(file_name);
    annotated.save(&out)?;
    verbose!("Results saved to {dir}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: &str) -> AssembleArgs {
        AssembleArgs {
            input: input.to_string(),
            image: None,
            save: false,
            json: None,
            config: None,
            min_joints: None,
            min_score: None,
            normalization: None,
            verbose: false,
        }
    }

    #[test]
    fn test_build_config_overrides() {
        let mut a = args("frame.json");
        a.min_joints = Some(5);
        a.normalization = Some("per_joint".to_string());
        let config = build_config(&a).unwrap();
        assert_eq!(config.min_joints, 5);
        assert_eq!(config.normalization, crate::ScoreNormalization::PerJoint);

        a.normalization = Some("median".to_string());
        assert!(build_config(&a).is_err());
    }

    #[test]
    fn test_frame_file_peaks() {
        let json = r#"{
            "peaks": [{"joint": 1, "x": 4.0, "y": 4.0, "score": 0.9}],
            "paf": {"shape": [38, 2, 2], "data": []}
        }"#;
        let frame: FrameFile = serde_json::from_str(json).unwrap();
        let layout = SkeletonLayout::coco().unwrap();
        let store = frame.peak_store(&layout, &AssemblyConfig::default()).unwrap();
        assert_eq!(store.len(), 1);
        assert!(frame.paf.into_array().is_err());
    }

    #[test]
    fn test_frame_file_requires_peaks_or_heatmap() {
        let json = r#"{"paf": {"shape": [1, 1, 1], "data": [0.0]}}"#;
        let frame: FrameFile = serde_json::from_str(json).unwrap();
        let layout = SkeletonLayout::coco().unwrap();
        assert!(matches!(
            frame.peak_store(&layout, &AssemblyConfig::default()),
            Err(PoseError::Config(_))
        ));
    }

    #[test]
    fn test_frame_file_heatmap_grid_must_match_paf() {
        let layout = SkeletonLayout::coco().unwrap();
        let tensor = |shape: [usize; 3]| TensorRecord {
            shape,
            data: vec![0.0; shape.iter().product()],
        };
        let mut frame = FrameFile {
            peaks: None,
            heatmap: Some(tensor([19, 8, 8])),
            paf: tensor([38, 32, 32]),
        };
        assert!(matches!(
            frame.peak_store(&layout, &AssemblyConfig::default()),
            Err(PoseError::FieldShape(_))
        ));

        frame.heatmap = Some(tensor([19, 32, 32]));
        let store = frame.peak_store(&layout, &AssemblyConfig::default()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_assemble_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("frame.json");
        let output = dir.path().join("out.json");
        let frame = FrameFile {
            peaks: Some(Vec::new()),
            heatmap: None,
            paf: TensorRecord {
                shape: [38, 4, 4],
                data: vec![0.0; 38 * 16],
            },
        };
        fs::write(&input, serde_json::to_string(&frame).unwrap()).unwrap();

        let mut a = args(input.to_str().unwrap());
        a.json = Some(output.to_string_lossy().to_string());
        assemble(&a).unwrap();

        let report: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["skeletons"].as_array().map(Vec::len), Some(0));
    }
}
