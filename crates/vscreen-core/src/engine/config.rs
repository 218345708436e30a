use crate::core::models::molecule::Molecule;
use nalgebra::{Point3, Vector3};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_BOX_SIZE: f64 = 20.0;
pub const DEFAULT_EXHAUSTIVENESS: u32 = 8;
pub const DEFAULT_NUM_MODES: u32 = 9;
pub const DEFAULT_ENERGY_RANGE: f64 = 3.0;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Resolves an `n_cpu` request to a thread count; `-1` and `0` mean every logical core.
pub fn resolve_threads(n_cpu: i32) -> usize {
    if n_cpu > 0 {
        n_cpu as usize
    } else {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningConfig {
    pub threads: usize,
    pub chunk_size: usize,
    pub vina_executable: Option<PathBuf>,
}

#[derive(Default)]
pub struct ScreeningConfigBuilder {
    n_cpu: Option<i32>,
    chunk_size: Option<usize>,
    vina_executable: Option<PathBuf>,
}

impl ScreeningConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_cpu(mut self, n_cpu: i32) -> Self {
        self.n_cpu = Some(n_cpu);
        self
    }
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }
    pub fn vina_executable(mut self, path: PathBuf) -> Self {
        self.vina_executable = Some(path);
        self
    }

    pub fn build(self) -> Result<ScreeningConfig, ConfigError> {
        let n_cpu = self.n_cpu.ok_or(ConfigError::MissingParameter("n_cpu"))?;
        if n_cpu < -1 {
            return Err(ConfigError::InvalidParameter {
                name: "n_cpu",
                reason: format!("{n_cpu} is below -1"),
            });
        }
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(ScreeningConfig {
            threads: resolve_threads(n_cpu),
            chunk_size,
            vina_executable: self.vina_executable,
        })
    }
}

/// Search box and sampling settings for a docking run.
#[derive(Debug, Clone, PartialEq)]
pub struct DockingParams {
    pub center: Point3<f64>,
    pub size: Vector3<f64>,
    pub exhaustiveness: u32,
    pub num_modes: u32,
    pub energy_range: f64,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone)]
enum CenterSource {
    Point(Point3<f64>),
    /// Centroid of a reference ligand; `None` when the ligand has no atoms.
    Ligand(Option<Point3<f64>>),
}

#[derive(Default)]
pub struct DockingParamsBuilder {
    center: Option<CenterSource>,
    size: Option<Vector3<f64>>,
    exhaustiveness: Option<u32>,
    num_modes: Option<u32>,
    energy_range: Option<f64>,
    seed: Option<i64>,
}

impl DockingParamsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn center(mut self, center: Point3<f64>) -> Self {
        self.center = Some(CenterSource::Point(center));
        self
    }
    /// Centres the box on the centroid of a reference ligand.
    pub fn auto_ligand(mut self, ligand: &Molecule) -> Self {
        self.center = Some(CenterSource::Ligand(ligand.centroid()));
        self
    }
    pub fn size(mut self, x: f64, y: f64, z: f64) -> Self {
        self.size = Some(Vector3::new(x, y, z));
        self
    }
    pub fn exhaustiveness(mut self, exhaustiveness: u32) -> Self {
        self.exhaustiveness = Some(exhaustiveness);
        self
    }
    pub fn num_modes(mut self, n: u32) -> Self {
        self.num_modes = Some(n);
        self
    }
    pub fn energy_range(mut self, range: f64) -> Self {
        self.energy_range = Some(range);
        self
    }
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<DockingParams, ConfigError> {
        let center = match self
            .center
            .ok_or(ConfigError::MissingParameter("center or auto_ligand"))?
        {
            CenterSource::Point(p) => p,
            CenterSource::Ligand(centroid) => centroid.ok_or(ConfigError::InvalidParameter {
                name: "auto_ligand",
                reason: "reference ligand has no atoms".to_string(),
            })?,
        };
        let size = self.size.unwrap_or_else(|| Vector3::repeat(DEFAULT_BOX_SIZE));
        if size.iter().any(|&s| !(s > 0.0)) {
            return Err(ConfigError::InvalidParameter {
                name: "size",
                reason: "box edges must be positive".to_string(),
            });
        }
        let exhaustiveness = self.exhaustiveness.unwrap_or(DEFAULT_EXHAUSTIVENESS);
        let num_modes = self.num_modes.unwrap_or(DEFAULT_NUM_MODES);
        for (name, value) in [("exhaustiveness", exhaustiveness), ("num_modes", num_modes)] {
            if value == 0 {
                return Err(ConfigError::InvalidParameter {
                    name,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        let energy_range = self.energy_range.unwrap_or(DEFAULT_ENERGY_RANGE);
        if !(energy_range > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "energy_range",
                reason: "must be positive".to_string(),
            });
        }
        Ok(DockingParams {
            center,
            size,
            exhaustiveness,
            num_modes,
            energy_range,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;

    #[test]
    fn screening_config_requires_n_cpu() {
        let result = ScreeningConfigBuilder::new().build();
        assert_eq!(result, Err(ConfigError::MissingParameter("n_cpu")));
    }

    #[test]
    fn screening_config_resolves_all_cores() {
        let config = ScreeningConfigBuilder::new().n_cpu(-1).build().unwrap();
        assert!(config.threads >= 1);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        let config = ScreeningConfigBuilder::new().n_cpu(3).chunk_size(7).build().unwrap();
        assert_eq!(config.threads, 3);
        assert_eq!(config.chunk_size, 7);
    }

    #[test]
    fn screening_config_rejects_bad_values() {
        assert!(matches!(
            ScreeningConfigBuilder::new().n_cpu(-4).build(),
            Err(ConfigError::InvalidParameter { name: "n_cpu", .. })
        ));
        assert!(matches!(
            ScreeningConfigBuilder::new().n_cpu(1).chunk_size(0).build(),
            Err(ConfigError::InvalidParameter { name: "chunk_size", .. })
        ));
    }

    #[test]
    fn docking_params_default_to_a_twenty_angstrom_box() {
        let params = DockingParamsBuilder::new()
            .center(Point3::new(1.0, 2.0, 3.0))
            .build()
            .unwrap();
        assert_eq!(params.size, Vector3::new(20.0, 20.0, 20.0));
        assert_eq!(params.exhaustiveness, 8);
        assert_eq!(params.num_modes, 9);
        assert_eq!(params.energy_range, 3.0);
        assert_eq!(params.seed, None);
    }

    #[test]
    fn auto_ligand_centres_the_box_on_its_centroid() {
        let mut ligand = Molecule::new("ref");
        ligand.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        ligand.add_atom(Atom::new(Element::C, Point3::new(2.0, 4.0, 6.0)));
        let params = DockingParamsBuilder::new()
            .auto_ligand(&ligand)
            .size(10.0, 12.0, 14.0)
            .exhaustiveness(1)
            .num_modes(9)
            .energy_range(5.0)
            .seed(0)
            .build()
            .unwrap();
        assert_eq!(params.center, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(params.size, Vector3::new(10.0, 12.0, 14.0));
        assert_eq!(params.seed, Some(0));
    }

    #[test]
    fn docking_params_validation() {
        assert_eq!(
            DockingParamsBuilder::new().build(),
            Err(ConfigError::MissingParameter("center or auto_ligand"))
        );
        assert!(matches!(
            DockingParamsBuilder::new().auto_ligand(&Molecule::new("empty")).build(),
            Err(ConfigError::InvalidParameter { name: "auto_ligand", .. })
        ));
        assert!(matches!(
            DockingParamsBuilder::new().center(Point3::origin()).size(20.0, 0.0, 20.0).build(),
            Err(ConfigError::InvalidParameter { name: "size", .. })
        ));
        assert!(matches!(
            DockingParamsBuilder::new().center(Point3::origin()).num_modes(0).build(),
            Err(ConfigError::InvalidParameter { name: "num_modes", .. })
        ));
    }
}
