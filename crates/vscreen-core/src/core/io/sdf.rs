use crate::core::io::traits::{LineReader, MolecularFile};
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdfError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: SdfParseErrorKind,
    },
    #[error("Invalid structure in record '{title}': {source}")]
    Structure {
        title: String,
        source: MoleculeError,
    },
}

#[derive(Debug, Error)]
pub enum SdfParseErrorKind {
    #[error("Unexpected end of file inside a record")]
    UnexpectedEof,
    #[error("Invalid counts line")]
    InvalidCountsLine,
    #[error("Only V2000 connection tables are supported")]
    UnsupportedVersion,
    #[error("Invalid float format in {field} (value: '{value}')")]
    InvalidFloat { field: &'static str, value: String },
    #[error("Invalid integer format in {field} (value: '{value}')")]
    InvalidInt { field: &'static str, value: String },
    #[error("Unknown element symbol '{0}'")]
    UnknownElement(String),
    #[error("Unsupported bond type {0}")]
    UnsupportedBondType(u8),
    #[error("Bond references atom {index}, but the record has {atoms} atoms")]
    BondAtomOutOfRange { index: usize, atoms: usize },
}

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len())).unwrap_or("").trim()
}

fn parse_error(line: usize, kind: SdfParseErrorKind) -> SdfError {
    SdfError::Parse { line, kind }
}

/// Maps the atom-block charge code of a V2000 atom line to a formal charge.
fn charge_from_code(code: i32) -> i8 {
    match code {
        1 => 3,
        2 => 2,
        3 => 1,
        5 => -1,
        6 => -2,
        7 => -3,
        _ => 0,
    }
}

/// MDL SD files (V2000 connection tables with data items).
pub struct SdfFile;

impl SdfFile {
    fn next_required<R: BufRead>(reader: &mut LineReader<R>) -> Result<String, SdfError> {
        reader
            .next_line()?
            .ok_or_else(|| parse_error(reader.line_number() + 1, SdfParseErrorKind::UnexpectedEof))
    }

    fn parse_counts(line: &str, line_num: usize) -> Result<(usize, usize), SdfError> {
        if line.contains("V3000") {
            return Err(parse_error(line_num, SdfParseErrorKind::UnsupportedVersion));
        }
        let fixed = (
            slice_and_trim(line, 0, 3).parse::<usize>(),
            slice_and_trim(line, 3, 6).parse::<usize>(),
        );
        if let (Ok(atoms), Ok(bonds)) = fixed {
            return Ok((atoms, bonds));
        }
        let mut fields = line.split_whitespace();
        match (
            fields.next().and_then(|f| f.parse().ok()),
            fields.next().and_then(|f| f.parse().ok()),
        ) {
            (Some(atoms), Some(bonds)) => Ok((atoms, bonds)),
            _ => Err(parse_error(line_num, SdfParseErrorKind::InvalidCountsLine)),
        }
    }

    fn parse_atom(line: &str, line_num: usize) -> Result<Atom, SdfError> {
        let float = |field: &'static str, value: &str| {
            value.parse::<f64>().map_err(|_| {
                parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidFloat {
                        field,
                        value: value.to_string(),
                    },
                )
            })
        };
        // Fixed columns first; fall back to whitespace-separated fields for sloppy writers.
        let (x, y, z, symbol, charge_code) = if line.len() >= 34 {
            (
                slice_and_trim(line, 0, 10),
                slice_and_trim(line, 10, 20),
                slice_and_trim(line, 20, 30),
                slice_and_trim(line, 31, 34),
                slice_and_trim(line, 36, 39),
            )
        } else {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return Err(parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidFloat {
                        field: "atom coordinates",
                        value: line.to_string(),
                    },
                ));
            }
            (fields[0], fields[1], fields[2], fields[3], "")
        };
        let position = Point3::new(float("x", x)?, float("y", y)?, float("z", z)?);
        let element = match symbol {
            "D" | "T" => Element::H,
            "A" | "Q" | "*" | "L" | "R#" => Element::DUMMY,
            other => other.parse::<Element>().map_err(|_| {
                parse_error(line_num, SdfParseErrorKind::UnknownElement(other.to_string()))
            })?,
        };
        let charge_code: i32 = if charge_code.is_empty() {
            0
        } else {
            charge_code.parse().map_err(|_| {
                parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidInt {
                        field: "charge",
                        value: charge_code.to_string(),
                    },
                )
            })?
        };
        Ok(Atom::new(element, position).with_charge(charge_from_code(charge_code)))
    }

    fn parse_bond(line: &str, line_num: usize) -> Result<(usize, usize, BondOrder), SdfError> {
        let int = |field: &'static str, value: &str| {
            value.parse::<usize>().map_err(|_| {
                parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidInt {
                        field,
                        value: value.to_string(),
                    },
                )
            })
        };
        let (a, b, t) = if line.len() >= 9 {
            (
                slice_and_trim(line, 0, 3),
                slice_and_trim(line, 3, 6),
                slice_and_trim(line, 6, 9),
            )
        } else {
            let fields: Vec<&str> = line.split_whitespace().collect();
            (
                fields.first().copied().unwrap_or(""),
                fields.get(1).copied().unwrap_or(""),
                fields.get(2).copied().unwrap_or(""),
            )
        };
        let atom1 = int("first bond atom", a)?;
        let atom2 = int("second bond atom", b)?;
        let order = match int("bond type", t)? {
            1 => BondOrder::Single,
            2 => BondOrder::Double,
            3 => BondOrder::Triple,
            4 => BondOrder::Aromatic,
            // Query bond types ("single or double" etc.) degrade to single bonds.
            5..=8 => BondOrder::Single,
            other => {
                return Err(parse_error(
                    line_num,
                    SdfParseErrorKind::UnsupportedBondType(other as u8),
                ));
            }
        };
        Ok((atom1, atom2, order))
    }

    fn parse_charge_property(
        molecule: &mut Molecule,
        line: &str,
        line_num: usize,
    ) -> Result<(), SdfError> {
        let fields: Vec<&str> = line.split_whitespace().skip(3).collect();
        for pair in fields.chunks(2) {
            let [index, charge] = pair else { break };
            let index: usize = index.parse().map_err(|_| {
                parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidInt {
                        field: "M  CHG atom",
                        value: index.to_string(),
                    },
                )
            })?;
            let charge: i8 = charge.parse().map_err(|_| {
                parse_error(
                    line_num,
                    SdfParseErrorKind::InvalidInt {
                        field: "M  CHG charge",
                        value: charge.to_string(),
                    },
                )
            })?;
            if let Some(atom) = index.checked_sub(1).and_then(|i| molecule.atoms.get_mut(i)) {
                atom.formal_charge = charge;
            }
        }
        Ok(())
    }

    fn read_record<R: BufRead>(
        reader: &mut LineReader<R>,
        title: &str,
    ) -> Result<Molecule, SdfError> {
        Self::next_required(reader)?;
        Self::next_required(reader)?;
        let counts = Self::next_required(reader)?;
        let (atom_count, bond_count) = Self::parse_counts(&counts, reader.line_number())?;

        let mut molecule = Molecule::new(title.trim());
        for _ in 0..atom_count {
            let line = Self::next_required(reader)?;
            let atom = Self::parse_atom(&line, reader.line_number())?;
            molecule.add_atom(atom);
        }
        for _ in 0..bond_count {
            let line = Self::next_required(reader)?;
            let line_num = reader.line_number();
            let (a, b, order) = Self::parse_bond(&line, line_num)?;
            let position = |index: usize| {
                index
                    .checked_sub(1)
                    .filter(|&i| i < atom_count)
                    .ok_or_else(|| {
                        parse_error(
                            line_num,
                            SdfParseErrorKind::BondAtomOutOfRange {
                                index,
                                atoms: atom_count,
                            },
                        )
                    })
            };
            molecule
                .add_bond(position(a)?, position(b)?, order)
                .map_err(|source| SdfError::Structure {
                    title: molecule.title.clone(),
                    source,
                })?;
        }

        let mut charges_reset = false;
        loop {
            let line = Self::next_required(reader)?;
            let trimmed = line.trim_end();
            if trimmed == "M  END" || trimmed == "$$$$" {
                if trimmed == "$$$$" {
                    return Ok(molecule);
                }
                break;
            }
            if trimmed.starts_with("M  CHG") {
                if !charges_reset {
                    molecule.atoms.iter_mut().for_each(|a| a.formal_charge = 0);
                    charges_reset = true;
                }
                Self::parse_charge_property(&mut molecule, trimmed, reader.line_number())?;
            }
        }

        Self::read_data_items(reader, &mut molecule)?;
        Ok(molecule)
    }

    fn read_data_items<R: BufRead>(
        reader: &mut LineReader<R>,
        molecule: &mut Molecule,
    ) -> Result<(), SdfError> {
        let mut current: Option<(String, Vec<String>)> = None;
        while let Some(line) = reader.next_line()? {
            if line.trim_end() == "$$$$" {
                break;
            }
            if line.starts_with('>') {
                if let Some((key, values)) = current.take() {
                    molecule.data.insert(key, values.join("\n"));
                }
                let key = match (line.find('<'), line.rfind('>')) {
                    (Some(start), Some(end)) if end > start => line[start + 1..end].to_string(),
                    _ => line[1..].trim().to_string(),
                };
                current = Some((key, Vec::new()));
                continue;
            }
            match current.as_mut() {
                Some((_, values)) if !line.trim().is_empty() => values.push(line),
                Some(_) => {
                    if let Some((key, values)) = current.take() {
                        molecule.data.insert(key, values.join("\n"));
                    }
                }
                None => {}
            }
        }
        if let Some((key, values)) = current {
            molecule.data.insert(key, values.join("\n"));
        }
        Ok(())
    }
}

impl MolecularFile for SdfFile {
    type Error = SdfError;

    fn read_next<R: BufRead>(reader: &mut LineReader<R>) -> Result<Option<Molecule>, Self::Error> {
        // Titles may be blank, so only a blank tail that runs out of lines ends the stream.
        let Some(title) = reader.next_line()? else {
            return Ok(None);
        };
        match Self::read_record(reader, &title) {
            Ok(molecule) => Ok(Some(molecule)),
            Err(SdfError::Parse {
                kind: SdfParseErrorKind::UnexpectedEof,
                ..
            }) if title.trim().is_empty() => Ok(None),
            Err(err @ SdfError::Io(_)) => Err(err),
            Err(err) => {
                // Leave the reader at the next record so a stream can continue.
                reader.skip_past("$$$$")?;
                Err(err)
            }
        }
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{}", molecule.title())?;
        writeln!(writer, "  vscreen          3D")?;
        writeln!(writer)?;
        writeln!(
            writer,
            "{:>3}{:>3}  0  0  0  0  0  0  0  0999 V2000",
            molecule.atoms().len(),
            molecule.bonds().len()
        )?;
        for atom in molecule.atoms() {
            writeln!(
                writer,
                "{:>10.4}{:>10.4}{:>10.4} {:<3} 0  0  0  0  0  0  0  0  0  0  0  0",
                atom.position.x,
                atom.position.y,
                atom.position.z,
                atom.element.symbol()
            )?;
        }
        for bond in molecule.bonds() {
            writeln!(
                writer,
                "{:>3}{:>3}{:>3}  0",
                bond.atom1 + 1,
                bond.atom2 + 1,
                bond.order as u8
            )?;
        }
        let charged: Vec<(usize, i8)> = molecule
            .atoms()
            .iter()
            .enumerate()
            .filter(|(_, a)| a.formal_charge != 0)
            .map(|(i, a)| (i + 1, a.formal_charge))
            .collect();
        for chunk in charged.chunks(8) {
            write!(writer, "M  CHG{:>3}", chunk.len())?;
            for (index, charge) in chunk {
                write!(writer, " {index:>3} {charge:>3}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "M  END")?;
        for (key, value) in molecule.data() {
            writeln!(writer, ">  <{key}>")?;
            writeln!(writer, "{value}")?;
            writeln!(writer)?;
        }
        writeln!(writer, "$$$$")?;
        Ok(())
    }
}
