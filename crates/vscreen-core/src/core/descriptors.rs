//! Whole-molecule descriptors used by rule filters and the `describe` command.
//!
//! All descriptors are computed from the perceived molecule, so implicit
//! hydrogens, aromatic flags and ring membership must already be set.

use crate::core::crippen;
use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::perception::{aromaticity, rings};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown descriptor: '{0}'")]
pub struct UnknownDescriptorError(pub String);

/// A named numeric property of a molecule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Descriptor {
    MolecularWeight,
    LogP,
    HydrogenBondDonors,
    HydrogenBondAcceptors,
    RotatableBonds,
    Tpsa,
    HeavyAtoms,
    Rings,
    AromaticRings,
    Charge,
}

impl Descriptor {
    pub const ALL: [Descriptor; 10] = [
        Self::MolecularWeight,
        Self::LogP,
        Self::HydrogenBondDonors,
        Self::HydrogenBondAcceptors,
        Self::RotatableBonds,
        Self::Tpsa,
        Self::HeavyAtoms,
        Self::Rings,
        Self::AromaticRings,
        Self::Charge,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::MolecularWeight => "mw",
            Self::LogP => "logp",
            Self::HydrogenBondDonors => "hbd",
            Self::HydrogenBondAcceptors => "hba",
            Self::RotatableBonds => "rotors",
            Self::Tpsa => "tpsa",
            Self::HeavyAtoms => "heavy_atoms",
            Self::Rings => "rings",
            Self::AromaticRings => "aromatic_rings",
            Self::Charge => "charge",
        }
    }

    pub fn compute(self, molecule: &Molecule) -> f64 {
        match self {
            Self::MolecularWeight => molecular_weight(molecule),
            Self::LogP => logp(molecule),
            Self::HydrogenBondDonors => hbd(molecule) as f64,
            Self::HydrogenBondAcceptors => hba(molecule) as f64,
            Self::RotatableBonds => rotatable_bonds(molecule).len() as f64,
            Self::Tpsa => tpsa(molecule),
            Self::HeavyAtoms => heavy_atoms(molecule) as f64,
            Self::Rings => rings::cyclomatic_number(molecule) as f64,
            Self::AromaticRings => aromaticity::aromatic_ring_count(molecule) as f64,
            Self::Charge => charge(molecule) as f64,
        }
    }
}

impl FromStr for Descriptor {
    type Err = UnknownDescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        let descriptor = match key.as_str() {
            "mw" | "molwt" => Self::MolecularWeight,
            "logp" => Self::LogP,
            "hbd" => Self::HydrogenBondDonors,
            "hba" => Self::HydrogenBondAcceptors,
            "rotors" | "rotatable_bonds" => Self::RotatableBonds,
            "tpsa" => Self::Tpsa,
            "heavy_atoms" => Self::HeavyAtoms,
            "rings" => Self::Rings,
            "aromatic_rings" => Self::AromaticRings,
            "charge" => Self::Charge,
            _ => return Err(UnknownDescriptorError(s.trim().to_string())),
        };
        Ok(descriptor)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Average molecular weight in g/mol, implicit hydrogens included.
pub fn molecular_weight(molecule: &Molecule) -> f64 {
    molecule
        .atoms
        .iter()
        .map(|a| a.element.mass() + a.implicit_hydrogens as f64 * Element::H.mass())
        .sum()
}

pub fn heavy_atoms(molecule: &Molecule) -> usize {
    molecule.atoms.iter().filter(|a| !a.is_hydrogen()).count()
}

/// Net formal charge.
pub fn charge(molecule: &Molecule) -> i32 {
    molecule.atoms.iter().map(|a| a.formal_charge as i32).sum()
}

fn is_n_or_o(element: Element) -> bool {
    element == Element::N || element == Element::O
}

/// Lipinski donors: nitrogen and oxygen atoms carrying at least one hydrogen.
pub fn hbd(molecule: &Molecule) -> usize {
    (0..molecule.atoms.len())
        .filter(|&i| is_n_or_o(molecule.atoms[i].element) && molecule.hydrogen_count(i) > 0)
        .count()
}

/// Lipinski acceptors: every nitrogen and oxygen atom.
pub fn hba(molecule: &Molecule) -> usize {
    molecule
        .atoms
        .iter()
        .filter(|a| is_n_or_o(a.element))
        .count()
}

fn has_bond_of_order(molecule: &Molecule, atom: usize, order: BondOrder) -> bool {
    molecule
        .bonds_of(atom)
        .iter()
        .any(|&(_, b)| molecule.bonds[b].order == order)
}

fn is_carbonyl_carbon(molecule: &Molecule, atom: usize) -> bool {
    molecule.atoms[atom].element == Element::C
        && molecule.bonds_of(atom).iter().any(|&(n, b)| {
            molecule.bonds[b].order == BondOrder::Double
                && matches!(molecule.atoms[n].element.atomic_number(), 8 | 16)
        })
}

fn is_amide_bond(molecule: &Molecule, a: usize, b: usize) -> bool {
    let is_n = |i: usize| molecule.atoms[i].element == Element::N;
    (is_n(a) && is_carbonyl_carbon(molecule, b)) || (is_n(b) && is_carbonyl_carbon(molecule, a))
}

/// Indices of rotatable bonds.
///
/// A bond is rotatable when it is a non-ring, non-aromatic single bond
/// between two atoms that each have another heavy neighbour. Amide C-N
/// bonds and bonds next to a triple bond are rigid.
pub fn rotatable_bonds(molecule: &Molecule) -> Vec<usize> {
    molecule
        .bonds
        .iter()
        .enumerate()
        .filter(|(_, bond)| {
            bond.order == BondOrder::Single && !bond.aromatic && !bond.in_ring
        })
        .filter(|(_, bond)| {
            let (a, b) = (bond.atom1, bond.atom2);
            if molecule.atoms[a].is_hydrogen() || molecule.atoms[b].is_hydrogen() {
                return false;
            }
            molecule.heavy_degree(a) >= 2
                && molecule.heavy_degree(b) >= 2
                && !has_bond_of_order(molecule, a, BondOrder::Triple)
                && !has_bond_of_order(molecule, b, BondOrder::Triple)
                && !is_amide_bond(molecule, a, b)
        })
        .map(|(index, _)| index)
        .collect()
}

/// Topological polar surface area (Ertl et al. 2000), nitrogen and oxygen contributions.
pub fn tpsa(molecule: &Molecule) -> f64 {
    (0..molecule.atoms.len())
        .map(|i| tpsa_contribution(molecule, i))
        .sum()
}

struct BondProfile {
    heavy: usize,
    hydrogens: usize,
    doubles: usize,
    triples: usize,
    aromatic: usize,
}

fn bond_profile(molecule: &Molecule, atom: usize) -> BondProfile {
    let mut profile = BondProfile {
        heavy: molecule.heavy_degree(atom),
        hydrogens: molecule.hydrogen_count(atom),
        doubles: 0,
        triples: 0,
        aromatic: 0,
    };
    for &(_, b) in molecule.bonds_of(atom) {
        let bond = &molecule.bonds[b];
        if bond.aromatic {
            profile.aromatic += 1;
            continue;
        }
        match bond.order {
            BondOrder::Double => profile.doubles += 1,
            BondOrder::Triple => profile.triples += 1,
            _ => {}
        }
    }
    profile
}

fn tpsa_contribution(molecule: &Molecule, atom: usize) -> f64 {
    let a = &molecule.atoms[atom];
    let p = bond_profile(molecule, atom);
    let charge = a.formal_charge;

    match a.element.atomic_number() {
        7 if a.aromatic => match (charge, p.hydrogens, p.heavy) {
            (0, 0, 2) => 12.89,
            (0, 0, 3) if p.aromatic == 2 => 4.93,
            (0, 0, 3) => 4.41,
            (0, 1, _) => 15.79,
            (1, 0, _) => 4.10,
            (1, 1, _) => 14.14,
            _ => 0.0,
        },
        7 => match (charge, p.hydrogens, p.heavy) {
            (0, 0, 3) if p.doubles == 1 => 11.68,
            (0, 0, 3) => 3.24,
            (0, 0, 2) if p.doubles == 1 && p.triples == 0 => 12.36,
            (0, 0, 2) if p.triples == 1 => 13.60,
            (0, 0, 2) => 12.36,
            (0, 0, 1) if p.triples == 1 => 23.79,
            (0, 1, 2) => 12.03,
            (0, 1, 1) if p.doubles == 1 => 23.85,
            (0, 2, 1) => 26.02,
            (0, h, _) if h >= 3 => 26.02,
            (1, 0, 4) => 0.0,
            (1, 0, 3) => 3.01,
            (1, 0, 2) => 4.36,
            (1, 1, 3) => 4.44,
            (1, 1, 2) => 13.97,
            (1, 2, 2) => 16.61,
            (1, 2, 1) => 25.59,
            (1, 3, _) => 27.64,
            (0, 1, _) => 12.03,
            _ => 3.24,
        },
        8 if a.aromatic => 13.14,
        8 => match (charge, p.hydrogens, p.heavy) {
            (-1, _, _) => 23.06,
            (0, 0, 1) if p.doubles == 1 => 17.07,
            (0, 0, 2) if molecule.rings.iter().any(|r| r.len() == 3 && r.contains(&atom)) => 12.53,
            (0, 0, 2) => 9.23,
            (0, h, _) if h >= 1 => 20.23,
            _ => 17.07,
        },
        _ => 0.0,
    }
}

/// Octanol/water partition coefficient (Wildman-Crippen).
pub fn logp(molecule: &Molecule) -> f64 {
    crippen::logp(molecule)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    fn build(elements: &[Element], bonds: &[(usize, usize, BondOrder)]) -> Molecule {
        let mut mol = Molecule::new("test");
        for (i, &element) in elements.iter().enumerate() {
            mol.add_atom(Atom::new(element, Point3::new(i as f64 * 1.5, 0.0, 0.0)));
        }
        for &(a, b, order) in bonds {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        mol
    }

    fn ethanol() -> Molecule {
        use BondOrder::Single;
        build(&[Element::C, Element::C, Element::O], &[(0, 1, Single), (1, 2, Single)])
    }

    fn benzene() -> Molecule {
        use BondOrder::{Double, Single};
        build(
            &[Element::C; 6],
            &[
                (0, 1, Double),
                (1, 2, Single),
                (2, 3, Double),
                (3, 4, Single),
                (4, 5, Double),
                (5, 0, Single),
            ],
        )
    }

    #[test]
    fn ethanol_descriptors() {
        let mol = ethanol();
        assert!((molecular_weight(&mol) - 46.069).abs() < 1e-3);
        assert_eq!(hbd(&mol), 1);
        assert_eq!(hba(&mol), 1);
        assert_eq!(heavy_atoms(&mol), 3);
        assert!(rotatable_bonds(&mol).is_empty());
        assert!((tpsa(&mol) - 20.23).abs() < 1e-9);
    }

    #[test]
    fn benzene_is_one_aromatic_ring() {
        let mol = benzene();
        assert_eq!(Descriptor::Rings.compute(&mol), 1.0);
        assert_eq!(Descriptor::AromaticRings.compute(&mol), 1.0);
        assert!((logp(&mol) - 1.6866).abs() < 1e-6);
        assert_eq!(tpsa(&mol), 0.0);
    }

    #[test]
    fn amide_bond_is_not_rotatable() {
        use BondOrder::{Double, Single};
        // N-methylpropanamide: CCC(=O)NC
        let mol = build(
            &[Element::C, Element::C, Element::C, Element::O, Element::N, Element::C],
            &[
                (0, 1, Single),
                (1, 2, Single),
                (2, 3, Double),
                (2, 4, Single),
                (4, 5, Single),
            ],
        );
        assert_eq!(rotatable_bonds(&mol), vec![1]);
        assert!((tpsa(&mol) - (17.07 + 12.03)).abs() < 1e-9);
    }

    #[test]
    fn bonds_next_to_triple_bonds_are_rigid() {
        use BondOrder::{Single, Triple};
        // CCC#CC
        let mol = build(
            &[Element::C; 5],
            &[(0, 1, Single), (1, 2, Single), (2, 3, Triple), (3, 4, Single)],
        );
        assert!(rotatable_bonds(&mol).is_empty());
    }

    #[test]
    fn charge_sums_formal_charges() {
        use BondOrder::{Double, Single};
        let mut mol = Molecule::new("acetate");
        let c1 = mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        let c2 = mol.add_atom(Atom::new(Element::C, Point3::new(1.5, 0.0, 0.0)));
        let o1 = mol.add_atom(Atom::new(Element::O, Point3::new(2.2, 1.1, 0.0)));
        let o2 = mol.add_atom(Atom::new(Element::O, Point3::new(2.2, -1.1, 0.0)).with_charge(-1));
        mol.add_bond(c1, c2, Single).unwrap();
        mol.add_bond(c2, o1, Double).unwrap();
        mol.add_bond(c2, o2, Single).unwrap();
        mol.perceive();
        assert_eq!(charge(&mol), -1);
        assert_eq!(hbd(&mol), 0);
        assert!((tpsa(&mol) - (17.07 + 23.06)).abs() < 1e-9);
    }

    #[test]
    fn parses_descriptor_names() {
        assert_eq!("MW".parse::<Descriptor>().unwrap(), Descriptor::MolecularWeight);
        assert_eq!(" rotors ".parse::<Descriptor>().unwrap(), Descriptor::RotatableBonds);
        assert_eq!(
            "volume".parse::<Descriptor>(),
            Err(UnknownDescriptorError("volume".to_string()))
        );
        for descriptor in Descriptor::ALL {
            assert_eq!(descriptor.name().parse::<Descriptor>().unwrap(), descriptor);
        }
    }
}
