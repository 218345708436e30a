use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use kiddo::{KdTree, SquaredEuclidean};

/// Slack added to the sum of covalent radii when deciding whether two atoms are bonded.
const BOND_TOLERANCE: f64 = 0.45;
/// Pairs closer than this are overlapping atoms (alternate locations), not bonds.
const MIN_BOND_LENGTH: f64 = 0.4;

/// Adds single bonds between atoms whose distance fits their covalent radii.
///
/// Used for formats without bond records (PDB, PDBQT). Existing bonds are
/// kept. Metals are left unbonded so that coordination shows up as an
/// interaction rather than as topology, and each hydrogen keeps only its
/// closest partner.
pub fn connect_by_distance(molecule: &mut Molecule) {
    let positions: Vec<[f64; 3]> = molecule
        .atoms
        .iter()
        .map(|a| [a.position.x, a.position.y, a.position.z])
        .collect();
    if positions.len() < 2 {
        return;
    }
    let max_radius = molecule
        .atoms
        .iter()
        .map(|a| a.element.covalent_radius())
        .fold(0.0, f64::max);
    let kdtree: KdTree<f64, 3> = (&positions).into();

    let mut candidates: Vec<(usize, usize, f64)> = Vec::new();
    for (i, atom) in molecule.atoms.iter().enumerate() {
        if atom.element.is_metal() || atom.element.covalent_radius() == 0.0 {
            continue;
        }
        let reach = atom.element.covalent_radius() + max_radius + BOND_TOLERANCE;
        for neighbour in kdtree.within_unsorted::<SquaredEuclidean>(&positions[i], reach * reach) {
            let j = neighbour.item as usize;
            if j <= i {
                continue;
            }
            let other = &molecule.atoms[j];
            if other.element.is_metal() || (atom.is_hydrogen() && other.is_hydrogen()) {
                continue;
            }
            let distance = neighbour.distance.sqrt();
            let limit = atom.element.covalent_radius() + other.element.covalent_radius() + BOND_TOLERANCE;
            if distance > MIN_BOND_LENGTH && distance <= limit {
                candidates.push((i, j, distance));
            }
        }
    }
    candidates.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut hydrogen_bonded = vec![false; molecule.atoms.len()];
    for (i, j) in molecule.bonds.iter().map(|b| (b.atom1, b.atom2)) {
        hydrogen_bonded[i] |= molecule.atoms[i].is_hydrogen();
        hydrogen_bonded[j] |= molecule.atoms[j].is_hydrogen();
    }
    for (i, j, _) in candidates {
        let hydrogen_taken = |k: usize| molecule.atoms[k].is_hydrogen() && hydrogen_bonded[k];
        if hydrogen_taken(i) || hydrogen_taken(j) {
            continue;
        }
        if molecule.add_bond(i, j, BondOrder::Single).is_ok() {
            hydrogen_bonded[i] = true;
            hydrogen_bonded[j] = true;
        }
    }
    molecule.bond_orders_known = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use nalgebra::Point3;

    #[test]
    fn water_gets_two_oh_bonds_and_no_hh_bond() {
        let mut mol = Molecule::new("water");
        mol.add_atom(Atom::new(Element::O, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::H, Point3::new(0.96, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::H, Point3::new(-0.24, 0.93, 0.0)));
        connect_by_distance(&mut mol);
        assert_eq!(mol.bonds().len(), 2);
        assert!(mol.bond_between(1, 2).is_none());
        assert!(!mol.bond_orders_known());
    }

    #[test]
    fn distant_atoms_and_metals_stay_unbonded() {
        let mut mol = Molecule::new("pair");
        mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::C, Point3::new(3.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(
            Element::from_atomic_number(30),
            Point3::new(0.0, 1.9, 0.0),
        ));
        connect_by_distance(&mut mol);
        assert!(mol.bonds().is_empty());
    }

    #[test]
    fn hydrogen_keeps_only_its_closest_partner() {
        let mut mol = Molecule::new("crowded");
        mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::H, Point3::new(1.0, 0.0, 0.0)));
        mol.add_atom(Atom::new(Element::C, Point3::new(2.2, 0.0, 0.0)));
        connect_by_distance(&mut mol);
        assert!(mol.bond_between(0, 1).is_some());
        assert!(mol.bond_between(1, 2).is_none());
    }
}
