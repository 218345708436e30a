use std::path::PathBuf;
use vscreen::core::io::format::Format;
use vscreen::engine::config::ScreeningConfig;
use vscreen::engine::similarity::SimilarityMethod;

#[derive(Debug, Clone, PartialEq)]
pub struct InputSource {
    pub path: PathBuf,
    pub format: Format,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterStep {
    pub expression: String,
    pub soft_fail: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityStep {
    pub method: SimilarityMethod,
    pub query: PathBuf,
    pub cutoff: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoxCenter {
    Point([f64; 3]),
    /// Centroid of the first molecule in the file.
    AutoLigand(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockingStep {
    pub engine: String,
    pub center: BoxCenter,
    pub size: [f64; 3],
    pub exhaustiveness: u32,
    pub num_modes: u32,
    pub energy_range: f64,
    pub seed: Option<i64>,
}

/// Where screened molecules are written; a run always has at least one destination.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputTarget {
    /// A structure file, optionally with an annotation table next to it.
    Structures {
        path: PathBuf,
        format: Format,
        csv: Option<PathBuf>,
    },
    /// Only the annotation table.
    Table(PathBuf),
}

/// A fully resolved `screen` run.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    pub inputs: Vec<InputSource>,
    pub output: OutputTarget,
    pub screening: ScreeningConfig,
    pub receptor: Option<PathBuf>,
    pub filters: Vec<FilterStep>,
    pub similarity: Option<SimilarityStep>,
    pub docking: Option<DockingStep>,
    pub scoring: Option<String>,
}
