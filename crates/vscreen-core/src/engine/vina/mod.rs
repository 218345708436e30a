//! Driver for the AutoDock Vina executable.
//!
//! The receptor is converted to PDBQT once, into a temporary directory that
//! lives as long as the driver. Every scoring or docking call writes its own
//! ligand file next to it, runs one Vina process with `--cpu 1` and reads
//! the results back; parallelism comes from running many calls at once.

mod output;

pub use output::{format_value, parse_score_output};

use super::config::DockingParams;
use crate::core::io::pdbqt::{PdbqtError, PdbqtFile};
use crate::core::io::traits::MolecularFile;
use crate::core::models::molecule::{Molecule, MoleculeError};
use itertools::Itertools;
use nalgebra::{Point3, Vector3};
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, trace};

/// Environment variable consulted for the executable when none is configured.
pub const VINA_ENV: &str = "VINA";
const DEFAULT_EXECUTABLE: &str = "vina";
const SCORE_BOX_SIZE: f64 = 20.0;
const VINA_KEYS: [&str; 3] = ["vina_affinity", "vina_rmsd_lb", "vina_rmsd_ub"];

#[derive(Debug, Error)]
pub enum VinaError {
    #[error("Failed to run '{executable}': {source}")]
    Spawn {
        executable: PathBuf,
        source: io::Error,
    },
    #[error("Vina exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("Unexpected Vina output: {reason}")]
    Output { reason: String },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("PDBQT error: {0}")]
    Pdbqt(#[from] PdbqtError),
    #[error("Cannot apply docked pose: {0}")]
    Pose(#[from] MoleculeError),
}

/// Picks the executable: the configured path, then `$VINA`, then `vina` on `PATH`.
pub fn resolve_executable(configured: Option<&Path>) -> PathBuf {
    configured
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(VINA_ENV).filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXECUTABLE))
}

fn box_args(center: &Point3<f64>, size: &Vector3<f64>) -> Vec<OsString> {
    let mut args = Vec::with_capacity(12);
    for (axis, c, s) in [("x", center.x, size.x), ("y", center.y, size.y), ("z", center.z, size.z)] {
        args.push(format!("--center_{axis}").into());
        args.push(format!("{c:.3}").into());
        args.push(format!("--size_{axis}").into());
        args.push(format!("{s:.3}").into());
    }
    args
}

#[derive(Debug)]
pub struct Vina {
    executable: PathBuf,
    workdir: TempDir,
    receptor: PathBuf,
}

impl Vina {
    /// Prepares the receptor PDBQT for a protein.
    pub fn new(protein: &Molecule, executable: Option<&Path>) -> Result<Self, VinaError> {
        let executable = resolve_executable(executable);
        let workdir = tempfile::Builder::new().prefix("vscreen-vina-").tempdir()?;
        let receptor = workdir.path().join("receptor.pdbqt");
        let mut writer = BufWriter::new(File::create(&receptor)?);
        PdbqtFile::write_receptor(protein, &mut writer)?;
        writer.flush()?;
        debug!(
            executable = %executable.display(),
            receptor = %receptor.display(),
            atoms = protein.atom_count(),
            "Prepared Vina receptor"
        );
        Ok(Self {
            executable,
            workdir,
            receptor,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn receptor(&self) -> &Path {
        &self.receptor
    }

    /// Writes a ligand PDBQT into the work directory; returns the file and the serial-to-atom map.
    fn write_ligand(&self, ligand: &Molecule) -> Result<(tempfile::TempPath, Vec<usize>), VinaError> {
        let file = tempfile::Builder::new()
            .prefix("ligand-")
            .suffix(".pdbqt")
            .tempfile_in(self.workdir.path())?;
        let (file, path) = file.into_parts();
        let mut writer = BufWriter::new(file);
        let order = PdbqtFile::write_ligand(ligand, &mut writer)?;
        writer.flush()?;
        Ok((path, order))
    }

    fn run(&self, args: &[OsString]) -> Result<String, VinaError> {
        trace!(
            executable = %self.executable.display(),
            args = %args.iter().map(|a| a.to_string_lossy()).join(" "),
            "Running Vina"
        );
        let output = Command::new(&self.executable)
            .args(args)
            .output()
            .map_err(|source| VinaError::Spawn {
                executable: self.executable.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(VinaError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Scores a ligand in place and returns it with the `vina_*` terms added.
    pub fn score(&self, mut ligand: Molecule) -> Result<Molecule, VinaError> {
        let (path, _) = self.write_ligand(&ligand)?;
        let center = ligand.centroid().unwrap_or_else(Point3::origin);
        let mut args: Vec<OsString> = vec![
            "--score_only".into(),
            "--receptor".into(),
            self.receptor.clone().into(),
            "--ligand".into(),
            path.to_path_buf().into(),
            "--cpu".into(),
            "1".into(),
        ];
        args.extend(box_args(&center, &Vector3::repeat(SCORE_BOX_SIZE)));
        let stdout = self.run(&args)?;
        let terms = parse_score_output(&stdout).ok_or_else(|| VinaError::Output {
            reason: "no 'Affinity:' line in --score_only output".to_string(),
        })?;
        ligand.data_mut().extend(terms);
        Ok(ligand)
    }

    /// Docks a ligand and returns one copy of it per pose, best pose first.
    pub fn dock(&self, ligand: &Molecule, params: &DockingParams) -> Result<Vec<Molecule>, VinaError> {
        let (path, order) = self.write_ligand(ligand)?;
        let out = tempfile::Builder::new()
            .prefix("poses-")
            .suffix(".pdbqt")
            .tempfile_in(self.workdir.path())?
            .into_temp_path();
        let mut args: Vec<OsString> = vec![
            "--receptor".into(),
            self.receptor.clone().into(),
            "--ligand".into(),
            path.to_path_buf().into(),
            "--out".into(),
            out.to_path_buf().into(),
            "--cpu".into(),
            "1".into(),
            "--exhaustiveness".into(),
            params.exhaustiveness.to_string().into(),
            "--num_modes".into(),
            params.num_modes.to_string().into(),
            "--energy_range".into(),
            params.energy_range.to_string().into(),
        ];
        if let Some(seed) = params.seed {
            args.push("--seed".into());
            args.push(seed.to_string().into());
        }
        args.extend(box_args(&params.center, &params.size));
        self.run(&args)?;

        let file = File::open(&out).map_err(|e| VinaError::Output {
            reason: format!("cannot open docking output '{}': {e}", out.display()),
        })?;
        let poses = PdbqtFile::read_from(BufReader::new(file))?;
        if poses.is_empty() {
            return Err(VinaError::Output {
                reason: "docking output contains no poses".to_string(),
            });
        }
        debug!(ligand = ligand.title(), poses = poses.len(), "Docked ligand");
        poses
            .iter()
            .map(|pose| apply_pose(ligand, pose, &order))
            .collect()
    }
}

/// Copies docked coordinates onto the input ligand.
///
/// `order[k - 1]` is the ligand atom written with PDBQT serial `k`; the pose
/// annotations `vina_affinity`, `vina_rmsd_lb` and `vina_rmsd_ub` are added.
pub fn apply_pose(ligand: &Molecule, pose: &Molecule, order: &[usize]) -> Result<Molecule, VinaError> {
    if pose.atom_count() != order.len() {
        return Err(VinaError::Output {
            reason: format!(
                "pose has {} atoms, {} were written",
                pose.atom_count(),
                order.len()
            ),
        });
    }
    let mut positions = ligand.positions();
    for atom in pose.atoms() {
        let index = atom
            .serial
            .checked_sub(1)
            .and_then(|k| order.get(k))
            .copied()
            .ok_or_else(|| VinaError::Output {
                reason: format!("pose atom serial {} was never written", atom.serial),
            })?;
        positions[index] = atom.position;
    }
    let mut posed = ligand.clone();
    posed.set_positions(&positions)?;
    for key in VINA_KEYS {
        if let Some(value) = pose.data().get(key) {
            posed.data_mut().insert(key.to_string(), value.clone());
        }
    }
    Ok(posed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;

    fn ligand() -> Molecule {
        let mut mol = Molecule::new("lig");
        mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::O, Point3::new(1.4, 0.0, 0.0)));
        mol.add_bond(0, 1, BondOrder::Single).unwrap();
        mol.perceive();
        mol
    }

    #[test]
    fn configured_executable_wins() {
        let path = resolve_executable(Some(Path::new("/opt/vina/bin/vina")));
        assert_eq!(path, PathBuf::from("/opt/vina/bin/vina"));
    }

    #[test]
    fn box_arguments_cover_three_axes() {
        let args = box_args(&Point3::new(1.0, -2.5, 3.0), &Vector3::new(20.0, 18.0, 16.0));
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(
            args,
            [
                "--center_x", "1.000", "--size_x", "20.000", "--center_y", "-2.500", "--size_y",
                "18.000", "--center_z", "3.000", "--size_z", "16.000"
            ]
        );
    }

    #[test]
    fn pose_coordinates_follow_written_serials() {
        let ligand = ligand();
        // Written in reverse: serial 1 is atom 1, serial 2 is atom 0.
        let order = vec![1, 0];
        let mut pose = Molecule::new("pose");
        let mut o = Atom::new(Element::O, Point3::new(5.0, 5.0, 5.0));
        o.serial = 1;
        let mut c = Atom::new(Element::C, Point3::new(6.4, 5.0, 5.0));
        c.serial = 2;
        pose.add_atom(o);
        pose.add_atom(c);
        pose.data_mut().insert("vina_affinity".into(), "-5.2".into());

        let posed = apply_pose(&ligand, &pose, &order).unwrap();
        assert_eq!(posed.atoms()[0].position, Point3::new(6.4, 5.0, 5.0));
        assert_eq!(posed.atoms()[1].position, Point3::new(5.0, 5.0, 5.0));
        assert_eq!(posed.data()["vina_affinity"], "-5.2");
        assert_eq!(posed.bonds().len(), 1);
        assert_eq!(posed.title(), "lig");
    }

    #[test]
    fn pose_with_unknown_serial_is_rejected() {
        let ligand = ligand();
        let mut pose = Molecule::new("pose");
        let mut atom = Atom::new(Element::C, Point3::origin());
        atom.serial = 7;
        pose.add_atom(atom);
        pose.add_atom(Atom::new(Element::O, Point3::origin()));
        assert!(matches!(
            apply_pose(&ligand, &pose, &[0, 1]),
            Err(VinaError::Output { .. })
        ));
        assert!(matches!(
            apply_pose(&ligand, &Molecule::new("empty"), &[0, 1]),
            Err(VinaError::Output { .. })
        ));
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let protein = Molecule::new("receptor");
        let vina = Vina::new(&protein, Some(Path::new("/nonexistent/vina"))).unwrap();
        assert!(vina.receptor().exists());
        let err = vina.score(ligand()).unwrap_err();
        assert!(matches!(err, VinaError::Spawn { .. }));
        assert!(err.to_string().contains("/nonexistent/vina"));
    }
}
