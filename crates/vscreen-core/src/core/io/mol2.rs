use crate::core::io::traits::{LineReader, MolecularFile};
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::{Molecule, MoleculeError};
use crate::core::models::topology::BondOrder;
use nalgebra::Point3;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Mol2Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse {
        line: usize,
        kind: Mol2ParseErrorKind,
    },
    #[error("Invalid structure in record '{title}': {source}")]
    Structure {
        title: String,
        source: MoleculeError,
    },
}

#[derive(Debug, Error)]
pub enum Mol2ParseErrorKind {
    #[error("Expected @<TRIPOS>MOLECULE, found '{0}'")]
    MissingMoleculeRecord(String),
    #[error("ATOM record needs at least 6 fields")]
    ShortAtomRecord,
    #[error("BOND record needs at least 4 fields")]
    ShortBondRecord,
    #[error("Invalid number '{0}'")]
    InvalidNumber(String),
    #[error("Unknown atom type '{0}'")]
    UnknownAtomType(String),
    #[error("Unknown bond type '{0}'")]
    UnknownBondType(String),
    #[error("Bond references undeclared atom id {0}")]
    UndeclaredAtom(usize),
}

const MOLECULE_RECORD: &str = "@<TRIPOS>MOLECULE";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Molecule,
    Atom,
    Bond,
    Other,
}

/// Splits a Sybyl atom type such as `C.ar` or `N.4` into element and hybridization tag.
fn parse_sybyl_type(sybyl: &str) -> Option<(Element, &str)> {
    let (symbol, tag) = sybyl.split_once('.').unwrap_or((sybyl, ""));
    let element = match symbol {
        "LP" | "Du" | "Any" | "Hal" | "Het" | "Hev" => Element::DUMMY,
        other => Element::from_symbol_lenient(other)?,
    };
    Some((element, tag))
}

fn sybyl_type(molecule: &Molecule, index: usize) -> String {
    let atom = &molecule.atoms()[index];
    let symbol = atom.element.symbol();
    let max_order = molecule
        .bonds_of(index)
        .iter()
        .map(|&(_, b)| molecule.bonds()[b].order)
        .max_by_key(|o| *o as u8);
    let tag = match atom.element {
        e if e == Element::C => {
            if atom.aromatic {
                "ar"
            } else {
                match max_order {
                    Some(BondOrder::Triple) => "1",
                    Some(BondOrder::Double) => "2",
                    Some(BondOrder::Aromatic) => "ar",
                    _ => "3",
                }
            }
        }
        e if e == Element::N => {
            if atom.aromatic {
                "ar"
            } else if atom.formal_charge > 0 && molecule.degree(index) + atom.implicit_hydrogens as usize == 4 {
                "4"
            } else {
                match max_order {
                    Some(BondOrder::Triple) => "1",
                    Some(BondOrder::Double) => "2",
                    _ => "3",
                }
            }
        }
        e if e == Element::O => match max_order {
            Some(BondOrder::Double) => "2",
            _ => "3",
        },
        e if e == Element::S => match max_order {
            Some(BondOrder::Double) => "2",
            _ => "3",
        },
        _ => "",
    };
    if tag.is_empty() {
        symbol.to_string()
    } else {
        format!("{symbol}.{tag}")
    }
}

/// Tripos MOL2 files.
pub struct Mol2File;

impl Mol2File {
    fn parse_number<T: std::str::FromStr>(value: &str, line: usize) -> Result<T, Mol2Error> {
        value.parse().map_err(|_| Mol2Error::Parse {
            line,
            kind: Mol2ParseErrorKind::InvalidNumber(value.to_string()),
        })
    }

    fn split_substructure(name: &str) -> (&str, isize) {
        let digits_at = name
            .char_indices()
            .find(|(i, c)| *i > 0 && (c.is_ascii_digit() || *c == '-'))
            .map(|(i, _)| i)
            .unwrap_or(name.len());
        let (res_name, number) = name.split_at(digits_at);
        (res_name, number.parse().unwrap_or(0))
    }
}

impl MolecularFile for Mol2File {
    type Error = Mol2Error;

    fn read_next<R: BufRead>(reader: &mut LineReader<R>) -> Result<Option<Molecule>, Self::Error> {
        // Anything before the first molecule record (comments, headers) is ignored.
        loop {
            match reader.peek_line()? {
                None => return Ok(None),
                Some(line) if line.trim() == MOLECULE_RECORD => break,
                Some(_) => {
                    reader.next_line()?;
                }
            }
        }
        reader.next_line()?;

        let mut molecule = Molecule::new("");
        let mut section = Section::Molecule;
        let mut header_line = 0usize;
        let mut id_to_index: HashMap<usize, usize> = HashMap::new();
        let mut substructures: HashMap<String, usize> = HashMap::new();
        let mut has_charges = false;

        while let Some(next) = reader.peek_line()? {
            if next.trim() == MOLECULE_RECORD {
                break;
            }
            let Some(line) = reader.next_line()? else { break };
            let line_num = reader.line_number();
            let trimmed = line.trim();
            if trimmed.starts_with("@<TRIPOS>") {
                section = match trimmed {
                    "@<TRIPOS>ATOM" => Section::Atom,
                    "@<TRIPOS>BOND" => Section::Bond,
                    _ => Section::Other,
                };
                continue;
            }
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match section {
                Section::Molecule => {
                    header_line += 1;
                    match header_line {
                        1 => molecule.set_title(trimmed),
                        3 => molecule.set_protein(trimmed.eq_ignore_ascii_case("PROTEIN")),
                        4 => has_charges = !trimmed.eq_ignore_ascii_case("NO_CHARGES"),
                        _ => {}
                    }
                }
                Section::Atom => {
                    let fields: Vec<&str> = trimmed.split_whitespace().collect();
                    if fields.len() < 6 {
                        return Err(Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::ShortAtomRecord,
                        });
                    }
                    let id: usize = Self::parse_number(fields[0], line_num)?;
                    let position = Point3::new(
                        Self::parse_number(fields[2], line_num)?,
                        Self::parse_number(fields[3], line_num)?,
                        Self::parse_number(fields[4], line_num)?,
                    );
                    let (element, tag) = parse_sybyl_type(fields[5]).ok_or_else(|| {
                        Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::UnknownAtomType(fields[5].to_string()),
                        }
                    })?;
                    let mut atom = Atom::new(element, position).with_name(fields[1]);
                    atom.serial = id;
                    atom.aromatic = tag == "ar";
                    if element == Element::N && tag == "4" {
                        atom.formal_charge = 1;
                    }
                    if let Some(charge) = fields.get(8) {
                        atom.partial_charge = Self::parse_number(charge, line_num)?;
                    }
                    if let Some(subst) = fields.get(7) {
                        let residue = match substructures.get(*subst) {
                            Some(&r) => r,
                            None => {
                                let (name, number) = Self::split_substructure(subst);
                                let r = molecule.add_residue(name, number, ' ');
                                substructures.insert(subst.to_string(), r);
                                r
                            }
                        };
                        atom.residue = Some(residue);
                    }
                    let index = molecule.add_atom(atom);
                    id_to_index.insert(id, index);
                }
                Section::Bond => {
                    let fields: Vec<&str> = trimmed.split_whitespace().collect();
                    if fields.len() < 4 {
                        return Err(Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::ShortBondRecord,
                        });
                    }
                    let mut endpoints = [0usize; 2];
                    for (slot, field) in endpoints.iter_mut().zip(&fields[1..3]) {
                        let id: usize = Self::parse_number(field, line_num)?;
                        *slot = *id_to_index.get(&id).ok_or(Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::UndeclaredAtom(id),
                        })?;
                    }
                    let order = match fields[3] {
                        "du" | "un" | "nc" => BondOrder::Single,
                        other => other.parse::<BondOrder>().map_err(|_| Mol2Error::Parse {
                            line: line_num,
                            kind: Mol2ParseErrorKind::UnknownBondType(other.to_string()),
                        })?,
                    };
                    molecule
                        .add_bond(endpoints[0], endpoints[1], order)
                        .map_err(|source| Mol2Error::Structure {
                            title: molecule.title().to_string(),
                            source,
                        })?;
                }
                Section::Other => {}
            }
        }
        molecule.charges_from_file = has_charges;
        Ok(Some(molecule))
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "{MOLECULE_RECORD}")?;
        writeln!(writer, "{}", molecule.title())?;
        writeln!(
            writer,
            "{:>5} {:>5} {:>5}",
            molecule.atoms().len(),
            molecule.bonds().len(),
            molecule.residues().len().max(1)
        )?;
        writeln!(
            writer,
            "{}",
            if molecule.is_protein() { "PROTEIN" } else { "SMALL" }
        )?;
        writeln!(writer, "GASTEIGER")?;
        writeln!(writer)?;
        writeln!(writer, "@<TRIPOS>ATOM")?;
        for (i, atom) in molecule.atoms().iter().enumerate() {
            let (subst_id, subst_name) = match atom.residue.map(|r| &molecule.residues()[r]) {
                Some(res) => (
                    atom.residue.map_or(1, |r| r + 1),
                    format!("{}{}", res.name, res.number),
                ),
                None => (1, "UNL1".to_string()),
            };
            writeln!(
                writer,
                "{:>7} {:<8} {:>10.4} {:>10.4} {:>10.4} {:<6} {:>4} {:<8} {:>9.4}",
                i + 1,
                atom.name,
                atom.position.x,
                atom.position.y,
                atom.position.z,
                sybyl_type(molecule, i),
                subst_id,
                subst_name,
                atom.partial_charge
            )?;
        }
        writeln!(writer, "@<TRIPOS>BOND")?;
        for (i, bond) in molecule.bonds().iter().enumerate() {
            let kind = match bond.order {
                BondOrder::Single => "1",
                BondOrder::Double => "2",
                BondOrder::Triple => "3",
                BondOrder::Aromatic => "ar",
            };
            writeln!(
                writer,
                "{:>6} {:>5} {:>5} {}",
                i + 1,
                bond.atom1 + 1,
                bond.atom2 + 1,
                kind
            )?;
        }
        Ok(())
    }
}
