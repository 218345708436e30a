use crate::core::descriptors;
use crate::core::io::pdb::{
    self, AtomRecord, PdbError, ResidueTracker, format_atom_name, is_primary_location,
    slice_and_trim,
};
use crate::core::io::traits::{LineReader, MolecularFile};
use crate::core::models::atom::Atom;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use std::collections::{HashMap, HashSet};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbqtError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Record(#[from] PdbError),
    #[error("Parse error on line {line}: unknown AutoDock atom type '{atom_type}'")]
    UnknownAtomType { line: usize, atom_type: String },
    #[error("Parse error on line {line}: invalid partial charge '{value}'")]
    InvalidCharge { line: usize, value: String },
}

/// Maps an AutoDock 4 atom type to its element and aromatic flag.
fn element_from_ad_type(ad_type: &str) -> Option<(Element, bool)> {
    let element = match ad_type {
        "A" => return Some((Element::C, true)),
        "C" | "CG0" | "CG1" | "CG2" | "CG3" | "G0" | "G1" | "G2" | "G3" => Element::C,
        "N" | "NA" | "NS" => Element::N,
        "OA" | "OS" | "O" => Element::O,
        "SA" | "S" => Element::S,
        "H" | "HD" | "HS" => Element::H,
        "W" => Element::O,
        other => Element::from_symbol_lenient(other)?,
    };
    Some((element, false))
}

/// AutoDock 4 atom type of an atom, derived from its perceived features.
pub fn autodock_type(molecule: &Molecule, index: usize) -> String {
    let atom = &molecule.atoms()[index];
    match atom.element.atomic_number() {
        1 => {
            let polar = molecule
                .neighbors(index)
                .any(|n| matches!(molecule.atoms()[n].element.atomic_number(), 7 | 8 | 16));
            if polar { "HD" } else { "H" }.to_string()
        }
        6 => if atom.aromatic { "A" } else { "C" }.to_string(),
        7 => if atom.features.acceptor { "NA" } else { "N" }.to_string(),
        8 => "OA".to_string(),
        16 => if atom.features.acceptor { "SA" } else { "S" }.to_string(),
        _ => atom.element.symbol().to_string(),
    }
}

/// Writes one PDBQT atom line; `serial` is the 1-based output serial.
fn write_atom_line(
    writer: &mut impl Write,
    molecule: &Molecule,
    index: usize,
    serial: usize,
) -> io::Result<()> {
    let atom = &molecule.atoms()[index];
    let residue = atom.residue.map(|r| &molecule.residues()[r]);
    let record = match residue {
        Some(r) if r.is_amino_acid() => "ATOM",
        _ => "HETATM",
    };
    let name = if atom.name.is_empty() {
        atom.element.symbol().to_string()
    } else {
        atom.name.clone()
    };
    writeln!(
        writer,
        "{:<6}{:>5} {:<4} {:>3} {}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}    {:>+6.3} {:<2}",
        record,
        serial % 100_000,
        format_atom_name(&name, atom.element),
        residue.map_or("UNL", |r| r.name.as_str()),
        residue.map_or(' ', |r| r.chain),
        residue.map_or(1, |r| r.number),
        atom.position.x,
        atom.position.y,
        atom.position.z,
        1.0,
        0.0,
        atom.partial_charge,
        autodock_type(molecule, index)
    )
}

/// AutoDock PDBQT files.
///
/// Reading yields one molecule per MODEL block; `REMARK VINA RESULT` lines
/// become the `vina_affinity`, `vina_rmsd_lb` and `vina_rmsd_ub` annotations.
/// Writing produces a rigid receptor for proteins and a ligand with a
/// torsion tree otherwise.
pub struct PdbqtFile;

impl PdbqtFile {
    /// Writes a rigid receptor: every atom in input order, no torsion tree.
    pub fn write_receptor(molecule: &Molecule, writer: &mut impl Write) -> Result<(), PdbqtError> {
        for index in 0..molecule.atoms().len() {
            write_atom_line(writer, molecule, index, index + 1)?;
        }
        writeln!(writer, "TER")?;
        Ok(())
    }

    /// Writes a flexible ligand and returns the atom index written at each serial.
    ///
    /// Rigid fragments are found by cutting rotatable bonds; the largest
    /// fragment becomes the ROOT and the others hang off it as nested
    /// BRANCH blocks. The returned vector maps output serial `k` (1-based)
    /// to atom index `order[k - 1]`, which is how docked coordinates are
    /// mapped back onto the input topology.
    pub fn write_ligand(
        molecule: &Molecule,
        writer: &mut impl Write,
    ) -> Result<Vec<usize>, PdbqtError> {
        let rotatable: HashSet<usize> = descriptors::rotatable_bonds(molecule).into_iter().collect();
        let fragments = rigid_fragments(molecule, &rotatable);
        let n = molecule.atoms().len();
        let mut fragment_of = vec![0usize; n];
        for (f, atoms) in fragments.iter().enumerate() {
            for &a in atoms {
                fragment_of[a] = f;
            }
        }
        let root = (0..fragments.len())
            .max_by_key(|&f| {
                let heavy = fragments[f]
                    .iter()
                    .filter(|&&a| !molecule.atoms()[a].is_hydrogen())
                    .count();
                (heavy, std::cmp::Reverse(f))
            })
            .unwrap_or(0);

        let mut order: Vec<usize> = Vec::with_capacity(n);
        let mut serial_of = vec![0usize; n];
        let mut visited = vec![false; fragments.len()];
        let mut torsions = 0;

        writeln!(writer, "REMARK  Name = {}", molecule.title())?;
        writeln!(writer, "ROOT")?;
        visited[root] = true;
        for &a in &fragments[root] {
            order.push(a);
            serial_of[a] = order.len();
            write_atom_line(writer, molecule, a, order.len())?;
        }
        // Disconnected components cannot be reached through branches; keep them rigid in ROOT.
        let reachable = reachable_fragments(molecule, &fragment_of, root);
        for (f, atoms) in fragments.iter().enumerate() {
            if !reachable.contains(&f) {
                visited[f] = true;
                for &a in atoms {
                    order.push(a);
                    serial_of[a] = order.len();
                    write_atom_line(writer, molecule, a, order.len())?;
                }
            }
        }
        writeln!(writer, "ENDROOT")?;

        let context = TreeContext {
            molecule,
            fragments: &fragments,
            fragment_of: &fragment_of,
            rotatable: &rotatable,
        };
        write_branches(
            writer,
            &context,
            root,
            &mut visited,
            &mut order,
            &mut serial_of,
            &mut torsions,
        )?;
        writeln!(writer, "TORSDOF {torsions}")?;
        Ok(order)
    }
}

struct TreeContext<'a> {
    molecule: &'a Molecule,
    fragments: &'a [Vec<usize>],
    fragment_of: &'a [usize],
    rotatable: &'a HashSet<usize>,
}

fn write_branches(
    writer: &mut impl Write,
    context: &TreeContext<'_>,
    fragment: usize,
    visited: &mut [bool],
    order: &mut Vec<usize>,
    serial_of: &mut [usize],
    torsions: &mut usize,
) -> Result<(), PdbqtError> {
    let molecule = context.molecule;
    let exits: Vec<(usize, usize)> = context.fragments[fragment]
        .iter()
        .flat_map(|&a| {
            molecule
                .bonds_of(a)
                .iter()
                .filter(|&&(_, b)| context.rotatable.contains(&b))
                .map(move |&(n, _)| (a, n))
        })
        .collect();
    for (parent_atom, child_atom) in exits {
        let child = context.fragment_of[child_atom];
        if visited[child] {
            continue;
        }
        visited[child] = true;
        *torsions += 1;
        // The child atom is written first so the branch bond starts at the first child serial.
        let mut atoms = context.fragments[child].clone();
        if let Some(pos) = atoms.iter().position(|&a| a == child_atom) {
            atoms.swap(0, pos);
        }
        let child_serial = order.len() + 1;
        writeln!(writer, "BRANCH {:>3} {:>3}", serial_of[parent_atom], child_serial)?;
        for a in atoms {
            order.push(a);
            serial_of[a] = order.len();
            write_atom_line(writer, molecule, a, order.len())?;
        }
        write_branches(writer, context, child, visited, order, serial_of, torsions)?;
        writeln!(writer, "ENDBRANCH {:>3} {:>3}", serial_of[parent_atom], child_serial)?;
    }
    Ok(())
}

fn rigid_fragments(molecule: &Molecule, rotatable: &HashSet<usize>) -> Vec<Vec<usize>> {
    let n = molecule.atoms().len();
    let mut assigned = vec![false; n];
    let mut fragments = Vec::new();
    for start in 0..n {
        if assigned[start] {
            continue;
        }
        let mut fragment = vec![start];
        assigned[start] = true;
        let mut cursor = 0;
        while cursor < fragment.len() {
            let atom = fragment[cursor];
            cursor += 1;
            for &(next, bond) in molecule.bonds_of(atom) {
                if !assigned[next] && !rotatable.contains(&bond) {
                    assigned[next] = true;
                    fragment.push(next);
                }
            }
        }
        fragment.sort_unstable();
        fragments.push(fragment);
    }
    fragments
}

fn reachable_fragments(molecule: &Molecule, fragment_of: &[usize], root: usize) -> HashSet<usize> {
    let mut seen = HashSet::from([root]);
    let mut stack: Vec<usize> = (0..fragment_of.len()).filter(|&a| fragment_of[a] == root).collect();
    let mut atom_seen = vec![false; fragment_of.len()];
    for &a in &stack {
        atom_seen[a] = true;
    }
    while let Some(atom) = stack.pop() {
        for next in molecule.neighbors(atom) {
            if !atom_seen[next] {
                atom_seen[next] = true;
                seen.insert(fragment_of[next]);
                stack.push(next);
            }
        }
    }
    seen
}

impl MolecularFile for PdbqtFile {
    type Error = PdbqtError;

    fn read_next<R: BufRead>(reader: &mut LineReader<R>) -> Result<Option<Molecule>, Self::Error> {
        let mut molecule = Molecule::new("");
        let mut tracker = ResidueTracker::default();
        let mut serials: HashMap<usize, usize> = HashMap::new();
        let mut saw_content = false;

        while let Some(line) = reader.next_line()? {
            let line_num = reader.line_number();
            let record_type = slice_and_trim(&line, 0, 6);
            match record_type {
                "ATOM" | "HETATM" => {
                    saw_content = true;
                    let record = AtomRecord::parse(&line, line_num)?;
                    if !is_primary_location(record.alt_loc) {
                        continue;
                    }
                    let ad_type = slice_and_trim(&line, 77, 79);
                    let (element, aromatic) = element_from_ad_type(ad_type)
                        .or_else(|| record.element_from_name(&line).map(|e| (e, false)))
                        .ok_or_else(|| PdbqtError::UnknownAtomType {
                            line: line_num,
                            atom_type: ad_type.to_string(),
                        })?;
                    let charge_str = slice_and_trim(&line, 70, 76);
                    let partial_charge = if charge_str.is_empty() {
                        0.0
                    } else {
                        charge_str
                            .parse::<f64>()
                            .map_err(|_| PdbqtError::InvalidCharge {
                                line: line_num,
                                value: charge_str.to_string(),
                            })?
                    };
                    let residue = tracker.residue_for(&mut molecule, &record);
                    let mut atom = Atom::new(element, record.position).with_name(&record.name);
                    atom.serial = record.serial;
                    atom.aromatic = aromatic;
                    atom.partial_charge = partial_charge;
                    atom.residue = Some(residue);
                    let index = molecule.add_atom(atom);
                    serials.insert(record.serial, index);
                }
                "REMARK" => {
                    if let Some(rest) = line.trim().strip_prefix("REMARK VINA RESULT:") {
                        let values: Vec<&str> = rest.split_whitespace().collect();
                        for (key, value) in ["vina_affinity", "vina_rmsd_lb", "vina_rmsd_ub"]
                            .iter()
                            .zip(values)
                        {
                            molecule.data.insert(key.to_string(), value.to_string());
                        }
                    } else if let Some(name) = line.trim().strip_prefix("REMARK  Name = ") {
                        molecule.set_title(name.trim());
                    }
                }
                "MODEL" => {
                    if saw_content {
                        break;
                    }
                }
                "ENDMDL" | "END" => {
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
        molecule.charges_from_file = true;
        pdb::finish_structure(&mut molecule, &[], &serials);
        Ok(Some(molecule))
    }

    fn write_to(molecule: &Molecule, writer: &mut impl Write) -> Result<(), Self::Error> {
        if molecule.is_protein() {
            Self::write_receptor(molecule, writer)
        } else {
            Self::write_ligand(molecule, writer).map(|_| ())
        }
    }
}
