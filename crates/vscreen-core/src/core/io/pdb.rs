use crate::core::io::traits::{LineReader, MolecularFile};
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::perception::bonds;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: PdbParseErrorKind,
    },
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Line is too short for ATOM/HETATM record (must be at least 54 chars)")]
    LineTooShort,
    #[error("Cannot determine element for atom '{0}'")]
    UnknownElement(String),
}

pub(crate) fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

/// One ATOM/HETATM line, shared by the PDB and PDBQT readers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AtomRecord {
    pub serial: usize,
    pub name: String,
    pub alt_loc: char,
    pub res_name: String,
    pub chain: char,
    pub res_seq: isize,
    pub insertion: char,
    pub position: Point3<f64>,
}

impl AtomRecord {
    pub(crate) fn parse(line: &str, line_num: usize) -> Result<Self, PdbError> {
        if line.len() < 54 {
            return Err(PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::LineTooShort,
            });
        }
        let float = |start: usize, end: usize| {
            let value = slice_and_trim(line, start, end);
            value.parse::<f64>().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidFloat {
                    columns: format!("{}-{}", start + 1, end),
                    value: value.into(),
                },
            })
        };
        let serial_str = slice_and_trim(line, 6, 11);
        // Serial fields overflow into hex or stars in very large files; fall back to 0.
        let serial = serial_str.parse::<usize>().unwrap_or(0);
        let res_seq_str = slice_and_trim(line, 22, 26);
        let res_seq = if res_seq_str.is_empty() {
            0
        } else {
            res_seq_str.parse::<isize>().map_err(|_| PdbError::Parse {
                line: line_num,
                kind: PdbParseErrorKind::InvalidInt {
                    columns: "23-26".into(),
                    value: res_seq_str.into(),
                },
            })?
        };
        let column = |i: usize| line.get(i..).and_then(|s| s.chars().next()).unwrap_or(' ');
        Ok(Self {
            serial,
            name: slice_and_trim(line, 12, 16).to_string(),
            alt_loc: column(16),
            res_name: slice_and_trim(line, 17, 21).to_string(),
            chain: column(21),
            res_seq,
            insertion: column(26),
            position: Point3::new(float(30, 38)?, float(38, 46)?, float(46, 54)?),
        })
    }

    /// Infers the element from the atom name when the element column is empty.
    pub(crate) fn element_from_name(&self, raw_line: &str) -> Option<Element> {
        let name = self.name.trim_start_matches(|c: char| c.is_ascii_digit());
        let letters: String = name.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
        // Two-letter elements are left-justified in column 13 (e.g. "FE  ", "CL1 ").
        let starts_in_column_13 = raw_line.get(12..13).is_some_and(|c| c != " ");
        if starts_in_column_13 && letters.len() >= 2 && !self.res_name_is_amino_acid() {
            if let Some(element) = Element::from_symbol_lenient(&letters[..2]) {
                return Some(element);
            }
        }
        letters
            .get(..1)
            .and_then(Element::from_symbol_lenient)
            .or_else(|| match letters.chars().next() {
                Some('D') => Some(Element::H),
                _ => None,
            })
    }

    fn res_name_is_amino_acid(&self) -> bool {
        crate::core::models::residue::Residue::new(&self.res_name, 0, ' ').is_amino_acid()
    }
}

/// Tracks residues while atoms stream in, starting a new residue whenever the identifier changes.
#[derive(Default)]
pub(crate) struct ResidueTracker {
    current: Option<(String, char, isize, char)>,
    index: usize,
}

impl ResidueTracker {
    pub(crate) fn residue_for(&mut self, molecule: &mut Molecule, record: &AtomRecord) -> usize {
        let key = (
            record.res_name.clone(),
            record.chain,
            record.res_seq,
            record.insertion,
        );
        if self.current.as_ref() != Some(&key) {
            self.index = molecule.add_residue(&record.res_name, record.res_seq, record.chain);
            self.current = Some(key);
        }
        self.index
    }
}

/// Keeps only the first alternate location of each atom.
pub(crate) fn is_primary_location(alt_loc: char) -> bool {
    matches!(alt_loc, ' ' | 'A' | '1')
}

/// Finishes a molecule read from a PDB-like format: CONECT bonds, distance bonds and the protein flag.
pub(crate) fn finish_structure(
    molecule: &mut Molecule,
    conect: &[(usize, usize)],
    serials: &HashMap<usize, usize>,
) {
    for &(a, b) in conect {
        if let (Some(&i), Some(&j)) = (serials.get(&a), serials.get(&b)) {
            let _ = molecule.add_bond(i, j, BondOrder::Single);
        }
    }
    bonds::connect_by_distance(molecule);
    molecule.protein = molecule.residues.iter().any(|r| r.is_amino_acid());
}

/// Protein Data Bank files. Each MODEL block is a separate molecule.
pub struct PdbFile;

impl MolecularFile for PdbFile {
    type Error = PdbError;

    fn read_next<R: BufRead>(reader: &mut LineReader<R>) -> Result<Option<Molecule>, Self::Error> {
        let mut molecule = Molecule::new("");
        let mut tracker = ResidueTracker::default();
        let mut serials: HashMap<usize, usize> = HashMap::new();
        let mut conect: Vec<(usize, usize)> = Vec::new();
        let mut saw_content = false;

        while let Some(line) = reader.next_line()? {
            let line_num = reader.line_number();
            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "HEADER" | "COMPND" | "TITLE" if molecule.title().is_empty() => {
                    let text = slice_and_trim(&line, 10, 80);
                    let text = text.strip_prefix("MOLECULE:").map_or(text, str::trim);
                    molecule.set_title(text);
                }
                "ATOM" | "HETATM" => {
                    saw_content = true;
                    let record = AtomRecord::parse(&line, line_num)?;
                    if !is_primary_location(record.alt_loc) {
                        continue;
                    }
                    let element_col = slice_and_trim(&line, 76, 78);
                    let element = Element::from_symbol_lenient(element_col)
                        .or_else(|| record.element_from_name(&line))
                        .ok_or_else(|| PdbError::Parse {
                            line: line_num,
                            kind: PdbParseErrorKind::UnknownElement(record.name.clone()),
                        })?;
                    let charge_col = slice_and_trim(&line, 78, 80);
                    let formal_charge = match charge_col.as_bytes() {
                        [d, b'+'] if d.is_ascii_digit() => (d - b'0') as i8,
                        [d, b'-'] if d.is_ascii_digit() => -((d - b'0') as i8),
                        _ => 0,
                    };
                    let residue = tracker.residue_for(&mut molecule, &record);
                    let mut atom = Atom::new(element, record.position)
                        .with_name(&record.name)
                        .with_charge(formal_charge);
                    atom.serial = record.serial;
                    atom.residue = Some(residue);
                    let index = molecule.add_atom(atom);
                    serials.insert(record.serial, index);
                }
                "CONECT" => {
                    let fields: Vec<usize> = [(6, 11), (11, 16), (16, 21), (21, 26), (26, 31)]
                        .iter()
                        .filter_map(|&(s, e)| slice_and_trim(&line, s, e).parse().ok())
                        .collect();
                    if let Some((&origin, partners)) = fields.split_first() {
                        conect.extend(partners.iter().map(|&p| (origin, p)));
                    }
                }
                "MODEL" => {
                    if saw_content {
                        break;
                    }
                }
                "ENDMDL" => {
                    if saw_content {
                        // CONECT records after the last model still belong to it.
                        while let Some(peek) = reader.peek_line()? {
                            if !peek.starts_with("CONECT") {
                                break;
                            }
                            if let Some(next) = reader.next_line()? {
                                let fields: Vec<usize> = next[6..]
                                    .split_whitespace()
                                    .filter_map(|f| f.parse().ok())
                                    .collect();
                                if let Some((&origin, partners)) = fields.split_first() {
                                    conect.extend(partners.iter().map(|&p| (origin, p)));
                                }
                            }
                        }
                        break;
                    }
                }
                "END" => {
                    if saw_content {
                        break;
                    }
                }
                _ => {}
            }
        }

        if !saw_content {
            return Ok(None);
        }
        finish_structure(&mut molecule, &conect, &serials);
        Ok(Some(molecule))
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        if !molecule.title().is_empty() {
            writeln!(writer, "COMPND    {}", molecule.title())?;
        }
        for (i, atom) in molecule.atoms().iter().enumerate() {
            let residue = atom.residue.map(|r| &molecule.residues()[r]);
            let record = match residue {
                Some(r) if r.is_amino_acid() => "ATOM",
                _ => "HETATM",
            };
            let charge = match atom.formal_charge {
                0 => String::new(),
                c if c > 0 => format!("{c}+"),
                c => format!("{}-", -c),
            };
            writeln!(
                writer,
                "{:<6}{:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}          {:>2}{:<2}",
                record,
                (i + 1) % 100_000,
                format_atom_name(&atom.name, atom.element),
                residue.map_or("UNL", |r| r.name.as_str()),
                residue.map_or('A', |r| r.chain),
                residue.map_or(1, |r| r.number),
                atom.position.x,
                atom.position.y,
                atom.position.z,
                1.0,
                0.0,
                atom.element.symbol().to_uppercase(),
                charge
            )?;
        }
        for (i, _) in molecule.atoms().iter().enumerate() {
            let partners: Vec<usize> = molecule.neighbors(i).map(|n| n + 1).collect();
            for chunk in partners.chunks(4) {
                write!(writer, "CONECT{:>5}", i + 1)?;
                for p in chunk {
                    write!(writer, "{p:>5}")?;
                }
                writeln!(writer)?;
            }
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}

/// Pads an atom name to the four-character PDB field; one-letter elements start in column 14.
pub(crate) fn format_atom_name(name: &str, element: Element) -> String {
    let name: String = name.chars().take(4).collect();
    if name.len() < 4 && element.symbol().len() == 1 {
        format!(" {name:<3}")
    } else {
        format!("{name:<4}")
    }
}
