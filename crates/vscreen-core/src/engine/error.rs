use thiserror::Error;

use super::config::ConfigError;
use super::filters::FilterError;
use super::vina::VinaError;
use crate::core::io::format::FormatError;
use crate::core::models::molecule::MoleculeError;

#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("Similarity method '{0}' is not supported (expected usr, usr_cat, electroshape, ifp or sifp)")]
    UnknownSimilarityMethod(String),

    #[error("Scoring function '{0}' is not supported (expected autodock_vina)")]
    UnknownScoringFunction(String),

    #[error("Docking engine '{0}' is not supported (expected autodock_vina)")]
    UnknownDockingEngine(String),

    #[error("Similarity method '{method}' requires a protein")]
    MissingProtein { method: String },

    #[error("No query molecule given for similarity method '{method}'")]
    EmptyQuery { method: String },

    #[error("Invalid filter: {source}")]
    Filter {
        #[from]
        source: FilterError,
    },

    #[error("Configuration error: {source}")]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Structure file error: {source}")]
    Format {
        #[from]
        source: FormatError,
    },

    #[error("Invalid molecule '{title}': {source}")]
    Structure { title: String, source: MoleculeError },

    #[error("AutoDock Vina failed for '{title}': {source}")]
    Vina { title: String, source: VinaError },

    #[error("Vina setup failed: {source}")]
    VinaSetup {
        #[from]
        source: VinaError,
    },

    #[error("CSV output error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to start the worker pool: {0}")]
    ThreadPool(String),
}
