use super::atom::Atom;
use super::residue::Residue;
use super::topology::{Bond, BondOrder};
use crate::core::perception;
use indexmap::IndexMap;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoleculeError {
    #[error("Atom index {index} is out of range (molecule has {len} atoms)")]
    AtomOutOfRange { index: usize, len: usize },
    #[error("Cannot bond atom {0} to itself")]
    SelfBond(usize),
    #[error("Position count {given} does not match atom count {expected}")]
    PositionCountMismatch { given: usize, expected: usize },
}

/// A molecule read from a structure file: atoms, bonds, optional residues and annotations.
///
/// Annotations (`data`) keep their insertion order so that they can be
/// written back to SDF data items and CSV columns in a stable order.
/// Derived properties (rings, aromaticity, implicit hydrogens, atom
/// features and partial charges) are filled in by [`Molecule::perceive`].
#[derive(Debug, Clone, Default)]
pub struct Molecule {
    pub(crate) title: String,
    pub(crate) atoms: Vec<Atom>,
    pub(crate) bonds: Vec<Bond>,
    pub(crate) residues: Vec<Residue>,
    /// Per-atom list of `(neighbor_index, bond_index)` pairs.
    pub(crate) adjacency: Vec<Vec<(usize, usize)>>,
    /// Smallest rings through every ring bond, as atom index cycles.
    pub(crate) rings: Vec<Vec<usize>>,
    pub(crate) data: IndexMap<String, String>,
    pub(crate) protein: bool,
    /// Whether bond orders come from the file (SDF, MOL2) rather than from distance perception.
    pub(crate) bond_orders_known: bool,
    pub(crate) charges_from_file: bool,
}

impl Molecule {
    /// Creates an empty molecule with the given title.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            bond_orders_known: true,
            ..Default::default()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn rings(&self) -> &[Vec<usize>] {
        &self.rings
    }

    /// Named annotations attached to the molecule (SDF data items, scores).
    pub fn data(&self) -> &IndexMap<String, String> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.data
    }

    pub fn is_protein(&self) -> bool {
        self.protein
    }

    pub fn set_protein(&mut self, protein: bool) {
        self.protein = protein;
    }

    pub fn bond_orders_known(&self) -> bool {
        self.bond_orders_known
    }

    /// Appends an atom and returns its index.
    pub fn add_atom(&mut self, mut atom: Atom) -> usize {
        let index = self.atoms.len();
        if atom.serial == 0 {
            atom.serial = index + 1;
        }
        if let Some(residue) = atom.residue.and_then(|r| self.residues.get_mut(r)) {
            residue.atoms.push(index);
        } else {
            atom.residue = None;
        }
        self.atoms.push(atom);
        self.adjacency.push(Vec::new());
        index
    }

    /// Starts a new residue; atoms added afterwards may reference the returned index.
    pub fn add_residue(&mut self, name: &str, number: isize, chain: char) -> usize {
        self.residues.push(Residue::new(name, number, chain));
        self.residues.len() - 1
    }

    /// Adds a bond between two existing atoms and returns its index.
    ///
    /// A bond that already exists is not duplicated; its index is returned
    /// and its order is left unchanged.
    pub fn add_bond(
        &mut self,
        atom1: usize,
        atom2: usize,
        order: BondOrder,
    ) -> Result<usize, MoleculeError> {
        let len = self.atoms.len();
        for index in [atom1, atom2] {
            if index >= len {
                return Err(MoleculeError::AtomOutOfRange { index, len });
            }
        }
        if atom1 == atom2 {
            return Err(MoleculeError::SelfBond(atom1));
        }
        if let Some(existing) = self.bond_index(atom1, atom2) {
            return Ok(existing);
        }
        let bond_index = self.bonds.len();
        self.bonds.push(Bond::new(atom1, atom2, order));
        self.adjacency[atom1].push((atom2, bond_index));
        self.adjacency[atom2].push((atom1, bond_index));
        Ok(bond_index)
    }

    /// Returns `(neighbor_index, bond_index)` pairs for an atom.
    pub fn bonds_of(&self, atom: usize) -> &[(usize, usize)] {
        self.adjacency.get(atom).map_or(&[], |v| v.as_slice())
    }

    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = usize> + '_ {
        self.bonds_of(atom).iter().map(|&(n, _)| n)
    }

    pub fn degree(&self, atom: usize) -> usize {
        self.bonds_of(atom).len()
    }

    pub fn heavy_degree(&self, atom: usize) -> usize {
        self.neighbors(atom)
            .filter(|&n| !self.atoms[n].is_hydrogen())
            .count()
    }

    /// Total number of hydrogens on an atom: explicit neighbours plus implicit ones.
    pub fn hydrogen_count(&self, atom: usize) -> usize {
        let explicit = self
            .neighbors(atom)
            .filter(|&n| self.atoms[n].is_hydrogen())
            .count();
        explicit + self.atoms.get(atom).map_or(0, |a| a.implicit_hydrogens as usize)
    }

    pub fn bond_index(&self, atom1: usize, atom2: usize) -> Option<usize> {
        self.bonds_of(atom1)
            .iter()
            .find(|&&(n, _)| n == atom2)
            .map(|&(_, b)| b)
    }

    pub fn bond_between(&self, atom1: usize, atom2: usize) -> Option<&Bond> {
        self.bond_index(atom1, atom2).map(|b| &self.bonds[b])
    }

    /// Sum of bond valences (aromatic bonds count 1.5) over all explicit bonds of an atom.
    pub fn explicit_valence(&self, atom: usize) -> f64 {
        self.bonds_of(atom)
            .iter()
            .map(|&(_, b)| self.bonds[b].order.valence())
            .sum()
    }

    pub fn is_ring_atom(&self, atom: usize) -> bool {
        self.bonds_of(atom).iter().any(|&(_, b)| self.bonds[b].in_ring)
    }

    pub fn heavy_atom_indices(&self) -> Vec<usize> {
        (0..self.atoms.len())
            .filter(|&i| !self.atoms[i].is_hydrogen())
            .collect()
    }

    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Replaces all atomic coordinates, keeping the topology.
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<(), MoleculeError> {
        if positions.len() != self.atoms.len() {
            return Err(MoleculeError::PositionCountMismatch {
                given: positions.len(),
                expected: self.atoms.len(),
            });
        }
        for (atom, position) in self.atoms.iter_mut().zip(positions) {
            atom.position = *position;
        }
        Ok(())
    }

    /// Geometric centre of all atoms, or `None` for an empty molecule.
    pub fn centroid(&self) -> Option<Point3<f64>> {
        if self.atoms.is_empty() {
            return None;
        }
        let sum = self
            .atoms
            .iter()
            .fold(nalgebra::Vector3::zeros(), |acc, a| acc + a.position.coords);
        Some(Point3::from(sum / self.atoms.len() as f64))
    }

    /// Computes rings, aromaticity, implicit hydrogens, atom features and partial charges.
    pub fn perceive(&mut self) {
        perception::perceive(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::element::Element;

    fn ethanol() -> Molecule {
        let mut mol = Molecule::new("ethanol");
        let c1 = mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        let c2 = mol.add_atom(Atom::new(Element::C, Point3::new(1.5, 0.0, 0.0)));
        let o = mol.add_atom(Atom::new(Element::O, Point3::new(2.0, 1.4, 0.0)));
        mol.add_bond(c1, c2, BondOrder::Single).unwrap();
        mol.add_bond(c2, o, BondOrder::Single).unwrap();
        mol
    }

    #[test]
    fn add_atom_assigns_sequential_serials() {
        let mol = ethanol();
        let serials: Vec<_> = mol.atoms().iter().map(|a| a.serial).collect();
        assert_eq!(serials, vec![1, 2, 3]);
    }

    #[test]
    fn add_bond_rejects_invalid_indices_and_self_bonds() {
        let mut mol = ethanol();
        assert_eq!(
            mol.add_bond(0, 9, BondOrder::Single),
            Err(MoleculeError::AtomOutOfRange { index: 9, len: 3 })
        );
        assert_eq!(
            mol.add_bond(1, 1, BondOrder::Single),
            Err(MoleculeError::SelfBond(1))
        );
    }

    #[test]
    fn add_bond_does_not_duplicate_existing_bonds() {
        let mut mol = ethanol();
        let first = mol.bond_index(0, 1).unwrap();
        assert_eq!(mol.add_bond(1, 0, BondOrder::Double).unwrap(), first);
        assert_eq!(mol.bonds().len(), 2);
        assert_eq!(mol.bonds()[first].order, BondOrder::Single);
    }

    #[test]
    fn neighbors_and_degree_follow_bonds() {
        let mol = ethanol();
        assert_eq!(mol.neighbors(1).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(mol.degree(0), 1);
        assert_eq!(mol.explicit_valence(1), 2.0);
        assert!(mol.bond_between(0, 2).is_none());
    }

    #[test]
    fn residues_collect_their_atoms() {
        let mut mol = Molecule::new("peptide");
        let res = mol.add_residue("GLY", 1, 'A');
        let mut atom = Atom::new(Element::N, Point3::origin()).with_name("N");
        atom.residue = Some(res);
        let idx = mol.add_atom(atom);
        assert_eq!(mol.residues()[res].atoms, vec![idx]);
    }

    #[test]
    fn set_positions_checks_length() {
        let mut mol = ethanol();
        let err = mol.set_positions(&[Point3::origin()]).unwrap_err();
        assert_eq!(
            err,
            MoleculeError::PositionCountMismatch {
                given: 1,
                expected: 3
            }
        );
        let shifted: Vec<_> = mol
            .positions()
            .iter()
            .map(|p| p + nalgebra::Vector3::new(1.0, 0.0, 0.0))
            .collect();
        mol.set_positions(&shifted).unwrap();
        assert_eq!(mol.atoms()[0].position, Point3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn centroid_is_mean_position() {
        let mol = ethanol();
        let c = mol.centroid().unwrap();
        assert!((c.x - 3.5 / 3.0).abs() < 1e-12);
        assert!(Molecule::new("empty").centroid().is_none());
    }
}
