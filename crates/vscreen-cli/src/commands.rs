pub mod describe;
pub mod screen;

use crate::error::{CliError, Result};
use std::path::Path;
use vscreen::core::io::format::Format;
use vscreen::core::models::molecule::Molecule;

/// Reads every molecule of a structure file, guessing the format from its extension.
pub fn read_molecules(path: &Path) -> Result<Vec<Molecule>> {
    let format = Format::from_path(path).ok_or_else(|| {
        CliError::Argument(format!("cannot guess the format of '{}'", path.display()))
    })?;
    format.read_all(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })
}

/// Reads the first molecule of a structure file.
pub fn read_first(path: &Path) -> Result<Molecule> {
    read_molecules(path)?.into_iter().next().ok_or_else(|| CliError::FileParsing {
        path: path.to_path_buf(),
        source: anyhow::anyhow!("the file contains no molecules"),
    })
}
