// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use clap::{Args, Parser, Subcommand};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Assemble Options:
    --input, -i <INPUT>          JSON frame with peaks or heatmap plus affinity field
    --image <IMAGE>              Source image to draw skeletons on
    --save                       Save the annotated image to runs/pose/assemble
    --json <JSON>                Write skeletons as JSON to this path
    --config <CONFIG>            JSON file with assembly settings
    --min-joints <N>             Minimum joints per skeleton [default: 3]
    --min-score <SCORE>          Minimum skeleton score [default: 0.0]
    --normalization <MODE>       Skeleton score policy: sum or per_joint [default: sum]
    --verbose                    Show verbose output

Examples:
    pose-paf assemble --input frame.json
    pose-paf assemble -i frame.json --image person.jpg --save
    pose-paf assemble -i frame.json --json skeletons.json --min-joints 4
    pose-paf assemble -i frame.json --config assembly.json --normalization per_joint"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assemble skeletons from one frame of peaks and affinity fields
    Assemble(AssembleArgs),
}

/// Arguments for the assemble command.
#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// JSON frame with peaks or heatmap plus affinity field
    #[arg(short, long)]
    pub input: String,

    /// Source image to draw skeletons on
    #[arg(long)]
    pub image: Option<String>,

    /// Save the annotated image to runs/pose/assemble
    #[arg(long, default_value_t = false)]
    pub save: bool,

    /// Write skeletons as JSON to this path
    #[arg(long)]
    pub json: Option<String>,

    /// JSON file with assembly settings
    #[arg(long)]
    pub config: Option<String>,

    /// Minimum joints per skeleton (overrides --config)
    #[arg(long)]
    pub min_joints: Option<usize>,

    /// Minimum skeleton score (overrides --config)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Skeleton score policy: sum or `per_joint` (overrides --config)
    #[arg(long)]
    pub normalization: Option<String>,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_assemble_args_defaults() {
        let args = Cli::parse_from(["app", "assemble", "--input", "frame.json"]);
        match args.command {
            Commands::Assemble(assemble_args) => {
                assert_eq!(assemble_args.input, "frame.json");
                assert!(assemble_args.image.is_none());
                assert!(!assemble_args.save);
                assert!(assemble_args.min_joints.is_none());
                assert!(assemble_args.verbose);
            }
        }
    }

    #[test]
    fn test_assemble_args_custom() {
        let args = Cli::parse_from([
            "app",
            "assemble",
            "-i",
            "frame.json",
            "--image",
            "person.jpg",
            "--save",
            "--min-joints",
            "5",
            "--normalization",
            "per_joint",
            "--verbose",
            "false",
        ]);
        match args.command {
            Commands::Assemble(assemble_args) => {
                assert_eq!(assemble_args.image, Some("person.jpg".to_string()));
                assert!(assemble_args.save);
                assert_eq!(assemble_args.min_joints, Some(5));
                assert_eq!(assemble_args.normalization.as_deref(), Some("per_joint"));
                assert!(!assemble_args.verbose);
            }
        }
    }
}
