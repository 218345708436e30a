use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu",
    version,
    about = "vscreen CLI - Virtual screening of ligand libraries: rule filters, shape and interaction similarity, and AutoDock Vina scoring and docking.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of worker threads.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a screening pipeline over one or more ligand files.
    Screen(ScreenArgs),
    /// Print a table of molecular descriptors for every molecule in a file.
    Describe(DescribeArgs),
}

/// Arguments for the `screen` subcommand.
///
/// Stages run in a fixed order: filters, similarity, docking, scoring.
#[derive(Args, Debug, Default)]
pub struct ScreenArgs {
    // --- Input / Output ---
    /// Ligand files to screen, read in the given order.
    #[arg(required = true, num_args = 1.., value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Format of the input files (sdf, mol2, pdb, pdbqt). Guessed from the extension if omitted.
    #[arg(short = 'i', long, value_name = "FORMAT")]
    pub input_format: Option<String>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path for the output structure file.
    #[arg(short = 'O', long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Format of the output file. Guessed from the extension if omitted.
    #[arg(short = 'o', long, value_name = "FORMAT")]
    pub output_format: Option<String>,

    /// Also write titles and annotations of the surviving molecules as CSV.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    // --- Filtering ---
    /// Filter to apply: 'ro5', 'ro3', 'pains' or descriptor clauses such as 'mw < 400; hbd <= 3'.
    /// Can be used multiple times; replaces the filters of the config file.
    #[arg(long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Number of rule violations tolerated by the filters given on the command line.
    #[arg(long, value_name = "INT")]
    pub soft_fail: Option<usize>,

    // --- Similarity ---
    /// Similarity method: usr, usr_cat, electroshape, ifp or sifp.
    #[arg(long, value_name = "METHOD")]
    pub similarity: Option<String>,

    /// File with the query molecules for the similarity search.
    #[arg(long, value_name = "PATH")]
    pub query: Option<PathBuf>,

    /// Minimum similarity to keep a molecule.
    #[arg(long, value_name = "FLOAT")]
    pub cutoff: Option<f64>,

    // --- Docking and Scoring ---
    /// Dock every ligand with the given engine (autodock_vina).
    #[arg(long, value_name = "ENGINE")]
    pub dock: Option<String>,

    /// Score every ligand with the given function (autodock_vina).
    #[arg(long, value_name = "FUNCTION")]
    pub score: Option<String>,

    /// Receptor structure for docking, scoring and interaction fingerprints.
    #[arg(long, value_name = "PATH")]
    pub receptor: Option<PathBuf>,

    /// Center the docking box on the first molecule of this file.
    #[arg(long, value_name = "PATH", conflicts_with = "center")]
    pub auto_ligand: Option<PathBuf>,

    /// Docking box center.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_triple)]
    pub center: Option<[f64; 3]>,

    /// Docking box edge lengths in Angstroms.
    #[arg(long, value_name = "X,Y,Z", value_parser = parse_triple)]
    pub size: Option<[f64; 3]>,

    #[arg(long, value_name = "INT")]
    pub exhaustiveness: Option<u32>,

    #[arg(long, value_name = "INT")]
    pub num_modes: Option<u32>,

    /// Maximum energy difference between the best and the worst pose, in kcal/mol.
    #[arg(long, value_name = "FLOAT")]
    pub energy_range: Option<f64>,

    #[arg(long, value_name = "INT")]
    pub seed: Option<i64>,

    /// Path to the AutoDock Vina executable. Defaults to $VINA, then 'vina' on PATH.
    #[arg(long, value_name = "PATH")]
    pub vina: Option<PathBuf>,

    /// Set a specific configuration value, overriding both the config file and the flags above.
    /// Can be used multiple times. Example: -S docking.exhaustiveness=16
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `describe` subcommand.
#[derive(Args, Debug)]
pub struct DescribeArgs {
    /// Structure file to describe.
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Format of the input file. Guessed from the extension if omitted.
    #[arg(short = 'i', long, value_name = "FORMAT")]
    pub input_format: Option<String>,
}

/// Parses `X,Y,Z` into three floats.
pub fn parse_triple(s: &str) -> std::result::Result<[f64; 3], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in '{s}': {e}"))?;
    <[f64; 3]>::try_from(values).map_err(|v| format!("expected 3 values, got {}", v.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triples_parse_with_spaces() {
        assert_eq!(parse_triple("1.5, -2,3").unwrap(), [1.5, -2.0, 3.0]);
        assert!(parse_triple("1,2").is_err());
        assert!(parse_triple("1,2,x").is_err());
    }

    #[test]
    fn screen_arguments_parse() {
        let cli = Cli::parse_from([
            "vscreen",
            "-vv",
            "screen",
            "a.sdf",
            "b.sdf",
            "-O",
            "hits.sdf",
            "--filter",
            "ro5",
            "--filter",
            "pains",
            "--soft-fail",
            "1",
            "--center",
            "1,2,3",
            "-S",
            "docking.seed=7",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Screen(args) = cli.command else {
            panic!("expected the screen subcommand");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.filters, vec!["ro5", "pains"]);
        assert_eq!(args.soft_fail, Some(1));
        assert_eq!(args.center, Some([1.0, 2.0, 3.0]));
        assert_eq!(args.set_values, vec!["docking.seed=7"]);
    }

    #[test]
    fn center_and_auto_ligand_conflict() {
        let result = Cli::try_parse_from([
            "vscreen",
            "screen",
            "a.sdf",
            "--center",
            "0,0,0",
            "--auto-ligand",
            "xtal.sdf",
        ]);
        assert!(result.is_err());
    }
}
