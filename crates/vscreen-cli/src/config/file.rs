use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FilePipelineConfig {
    pub n_cpu: Option<i32>,
    pub chunk_size: Option<usize>,
    pub input_format: Option<String>,
    pub output_format: Option<String>,
    pub receptor: Option<PathBuf>,
    pub score: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileVinaConfig {
    pub executable: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDockingConfig {
    pub engine: Option<String>,
    pub center: Option<[f64; 3]>,
    pub auto_ligand: Option<PathBuf>,
    pub size: Option<[f64; 3]>,
    pub exhaustiveness: Option<u32>,
    pub num_modes: Option<u32>,
    pub energy_range: Option<f64>,
    pub seed: Option<i64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileSimilarityConfig {
    pub method: Option<String>,
    pub query: Option<PathBuf>,
    pub cutoff: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileFilterConfig {
    pub expression: String,
    #[serde(default)]
    pub soft_fail: usize,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub pipeline: Option<FilePipelineConfig>,
    pub vina: Option<FileVinaConfig>,
    pub docking: Option<FileDockingConfig>,
    pub similarity: Option<FileSimilarityConfig>,
    #[serde(default)]
    pub filter: Vec<FileFilterConfig>,
}

impl FileConfig {
    /// Reads a configuration file; relative paths inside it are taken from the file's directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        if let Some(base) = path.parent() {
            config.rebase_paths(base);
        }
        Ok(config)
    }

    fn rebase_paths(&mut self, base: &Path) {
        let rebase = |p: &mut Option<PathBuf>| {
            if let Some(path) = p.as_mut() {
                if path.is_relative() {
                    *path = base.join(&*path);
                }
            }
        };
        if let Some(pipeline) = self.pipeline.as_mut() {
            rebase(&mut pipeline.receptor);
        }
        if let Some(docking) = self.docking.as_mut() {
            rebase(&mut docking.auto_ligand);
        }
        if let Some(similarity) = self.similarity.as_mut() {
            rebase(&mut similarity.query);
        }
    }
}
