use super::templates::{self, ACCEPTOR, DONOR, NEGATIVE, POSITIVE};
use crate::core::models::atom::AtomFeatures;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;

fn is_element(molecule: &Molecule, atom: usize, element: Element) -> bool {
    molecule.atoms[atom].element == element
}

fn is_terminal_oxygen(molecule: &Molecule, atom: usize) -> bool {
    is_element(molecule, atom, Element::O) && molecule.heavy_degree(atom) == 1
}

/// Amide and sulfonamide nitrogens: bonded to a carbon (or sulfur) carrying a double-bonded oxygen.
fn is_amide_nitrogen(molecule: &Molecule, atom: usize) -> bool {
    molecule.neighbors(atom).any(|n| {
        let carbonyl_like = is_element(molecule, n, Element::C) || is_element(molecule, n, Element::S);
        carbonyl_like
            && molecule.bonds_of(n).iter().any(|&(o, b)| {
                is_element(molecule, o, Element::O) && molecule.bonds[b].order == BondOrder::Double
            })
    })
}

/// Oxygen of a carboxylate, sulfonate or phosphate group.
fn is_acid_oxygen(molecule: &Molecule, atom: usize) -> bool {
    if !is_terminal_oxygen(molecule, atom) {
        return false;
    }
    molecule.neighbors(atom).any(|center| {
        let terminal_oxygens = molecule
            .neighbors(center)
            .filter(|&n| is_terminal_oxygen(molecule, n))
            .count();
        match molecule.atoms[center].element.atomic_number() {
            6 => terminal_oxygens == 2,
            15 | 16 => terminal_oxygens >= 3,
            _ => false,
        }
    })
}

/// Positively charged nitrogen of a nitro or N-oxide group, which is not a cation site.
fn is_zwitterion_nitrogen(molecule: &Molecule, atom: usize) -> bool {
    molecule
        .neighbors(atom)
        .any(|n| is_element(molecule, n, Element::O) && molecule.atoms[n].formal_charge < 0)
}

fn small_molecule_features(molecule: &Molecule, atom: usize) -> AtomFeatures {
    let data = &molecule.atoms[atom];
    let element = data.element;
    let hydrogens = molecule.hydrogen_count(atom);
    let connections = molecule.degree(atom) + data.implicit_hydrogens as usize;
    let mut features = AtomFeatures::default();

    match element.atomic_number() {
        7 => {
            features.donor = hydrogens > 0;
            features.acceptor = data.formal_charge <= 0
                && connections < 4
                && !is_amide_nitrogen(molecule, atom)
                && !(data.aromatic && hydrogens > 0);
        }
        8 => {
            features.donor = hydrogens > 0;
            features.acceptor = data.formal_charge <= 0;
        }
        9 => features.acceptor = true,
        6 => {
            features.hydrophobe = molecule
                .neighbors(atom)
                .filter(|&n| !molecule.atoms[n].is_hydrogen())
                .all(|n| is_element(molecule, n, Element::C));
        }
        _ => {}
    }
    features.negative = data.formal_charge < 0 || is_acid_oxygen(molecule, atom);
    features.positive = data.formal_charge > 0 && !is_zwitterion_nitrogen(molecule, atom);
    features
}

/// Assigns pharmacophoric features to every atom.
///
/// Atoms belonging to standard residues or water take their polar flags from
/// residue templates, so a protein without hydrogens still has donors and
/// charged groups. All other atoms are typed from their element, charge and
/// neighbourhood.
pub fn assign_features(molecule: &mut Molecule) {
    let mut assigned = Vec::with_capacity(molecule.atoms.len());
    for index in 0..molecule.atoms.len() {
        let atom = &molecule.atoms[index];
        let mut features = if atom.is_hydrogen() {
            AtomFeatures::default()
        } else {
            small_molecule_features(molecule, index)
        };
        let template = atom
            .residue
            .and_then(|r| templates::template_flags(&molecule.residues[r], &atom.name));
        if let (Some(flags), false) = (template, atom.is_hydrogen()) {
            features.donor = flags & DONOR != 0;
            features.acceptor = flags & ACCEPTOR != 0;
            features.positive = flags & POSITIVE != 0;
            features.negative = flags & NEGATIVE != 0;
        }
        features.aromatic = atom.aromatic;
        features.halogen = atom.element.is_halogen();
        features.metal = atom.element.is_metal();
        assigned.push(features);
    }

    for index in 0..molecule.atoms.len() {
        if molecule.atoms[index].is_hydrogen() {
            assigned[index].donor_hydrogen = molecule.neighbors(index).any(|n| {
                assigned[n].donor
                    && matches!(molecule.atoms[n].element.atomic_number(), 7 | 8 | 16)
            });
        }
    }

    for (atom, features) in molecule.atoms.iter_mut().zip(assigned) {
        atom.features = features;
    }
}
