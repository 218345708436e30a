use super::mol2::{Mol2Error, Mol2File};
use super::pdb::{PdbError, PdbFile};
use super::pdbqt::{PdbqtError, PdbqtFile};
use super::sdf::{SdfError, SdfFile};
use super::traits::{LineReader, MolecularFile};
use crate::core::models::molecule::Molecule;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Structure file formats understood by the readers and writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Sdf,
    Mol2,
    Pdb,
    Pdbqt,
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Unknown molecular file format: '{0}'")]
    UnknownFormat(String),
    #[error("Cannot open '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("SDF: {0}")]
    Sdf(#[from] SdfError),
    #[error("MOL2: {0}")]
    Mol2(#[from] Mol2Error),
    #[error("PDB: {0}")]
    Pdb(#[from] PdbError),
    #[error("PDBQT: {0}")]
    Pdbqt(#[from] PdbqtError),
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "sdf" | "sd" | "mol" => Ok(Self::Sdf),
            "mol2" => Ok(Self::Mol2),
            "pdb" | "ent" => Ok(Self::Pdb),
            "pdbqt" => Ok(Self::Pdbqt),
            _ => Err(FormatError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sdf => "sdf",
            Self::Mol2 => "mol2",
            Self::Pdb => "pdb",
            Self::Pdbqt => "pdbqt",
        })
    }
}

impl Format {
    /// Guesses the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }

    /// Opens a file for streaming; molecules are parsed and perceived one at a time.
    pub fn open(self, path: &Path) -> Result<MoleculeReader<BufReader<File>>, FormatError> {
        let file = File::open(path).map_err(|source| FormatError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(MoleculeReader::new(self, BufReader::new(file)))
    }

    /// Reads and perceives every molecule in a file.
    pub fn read_all(self, path: &Path) -> Result<Vec<Molecule>, FormatError> {
        self.open(path)?.collect()
    }

    /// Writes one molecule record in this format.
    pub fn write(self, molecule: &Molecule, writer: &mut impl Write) -> Result<(), FormatError> {
        match self {
            Self::Sdf => SdfFile::write_to(molecule, writer)?,
            Self::Mol2 => Mol2File::write_to(molecule, writer)?,
            Self::Pdb => PdbFile::write_to(molecule, writer)?,
            Self::Pdbqt => PdbqtFile::write_to(molecule, writer)?,
        }
        Ok(())
    }
}

/// Lazy iterator over the molecules of a structure file.
///
/// A malformed SDF record is reported and skipped; the other formats have
/// no reliable record boundary, so the stream ends after their first error.
pub struct MoleculeReader<R> {
    format: Format,
    reader: LineReader<R>,
    finished: bool,
}

impl<R: BufRead> MoleculeReader<R> {
    pub fn new(format: Format, reader: R) -> Self {
        Self {
            format,
            reader: LineReader::new(reader),
            finished: false,
        }
    }

    fn read_raw(&mut self) -> Result<Option<Molecule>, FormatError> {
        let molecule = match self.format {
            Format::Sdf => SdfFile::read_next(&mut self.reader)?,
            Format::Mol2 => Mol2File::read_next(&mut self.reader)?,
            Format::Pdb => PdbFile::read_next(&mut self.reader)?,
            Format::Pdbqt => PdbqtFile::read_next(&mut self.reader)?,
        };
        Ok(molecule)
    }
}

impl<R: BufRead> Iterator for MoleculeReader<R> {
    type Item = Result<Molecule, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.read_raw() {
            Ok(Some(mut molecule)) => {
                molecule.perceive();
                Some(Ok(molecule))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                let recoverable = matches!(
                    err,
                    FormatError::Sdf(SdfError::Parse { .. } | SdfError::Structure { .. })
                );
                if !recoverable {
                    self.finished = true;
                }
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    const METHANE_SDF: &str = "\
methane


  1  0  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
M  END
$$$$
";

    #[test]
    fn parses_names_and_extensions() {
        assert_eq!("SDF".parse::<Format>().unwrap(), Format::Sdf);
        assert_eq!(".mol2".parse::<Format>().unwrap(), Format::Mol2);
        assert_eq!(
            Format::from_path(Path::new("/data/rec.pdbqt")),
            Some(Format::Pdbqt)
        );
        assert_eq!(Format::from_path(Path::new("ligands.smi")), None);
        assert!(matches!(
            "xyz".parse::<Format>(),
            Err(FormatError::UnknownFormat(name)) if name == "xyz"
        ));
    }

    #[test]
    fn reader_perceives_molecules_lazily() {
        let text = format!("{METHANE_SDF}{METHANE_SDF}");
        let mut reader = MoleculeReader::new(Format::Sdf, Cursor::new(text));
        let first = reader.next().unwrap().unwrap();
        assert_eq!(first.atoms()[0].implicit_hydrogens, 4);
        assert!(reader.next().unwrap().is_ok());
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn reader_skips_bad_sdf_record_and_continues() {
        let broken = METHANE_SDF.replace("    0.0000    0.0000    0.0000 C", "    0.0000    zzzzzz    0.0000 C");
        let text = format!("{broken}{METHANE_SDF}");
        let results: Vec<_> = MoleculeReader::new(Format::Sdf, Cursor::new(text)).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[test]
    fn open_reports_missing_file_with_path() {
        let err = Format::Sdf.open(Path::new("/nonexistent/ligands.sdf")).err().unwrap();
        assert!(matches!(err, FormatError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent/ligands.sdf"));
    }

    #[test]
    fn written_molecules_read_back_in_every_format() {
        let dir = tempdir().unwrap();
        let molecule = MoleculeReader::new(Format::Sdf, Cursor::new(METHANE_SDF))
            .next()
            .unwrap()
            .unwrap();
        for format in [Format::Sdf, Format::Mol2, Format::Pdb, Format::Pdbqt] {
            let path = dir.path().join(format!("out.{format}"));
            let mut file = fs::File::create(&path).unwrap();
            format.write(&molecule, &mut file).unwrap();
            drop(file);
            let reread = format.read_all(&path).unwrap();
            assert_eq!(reread.len(), 1, "{format}");
            assert_eq!(reread[0].atoms().len(), 1, "{format}");
        }
    }
}
