use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use crate::core::utils::geometry::Plane;
use nalgebra::Point3;

const MIN_AROMATIC_RING: usize = 5;
const MAX_AROMATIC_RING: usize = 7;
/// Largest out-of-plane deviation (Angstrom) tolerated for geometric aromaticity.
const PLANARITY_TOLERANCE: f64 = 0.12;

/// Flags aromatic atoms and bonds.
///
/// Aromatic flags present in the input are kept. With bond orders known the
/// Hückel 4n+2 rule is applied ring by ring, repeating until no new ring is
/// found so that rings fused to an aromatic neighbour are resolved. Without
/// bond orders (PDB, PDBQT) planar five- and six-membered rings of C, N, O
/// and S atoms with at most three connections are taken as aromatic.
pub fn perceive_aromaticity(molecule: &mut Molecule) {
    let candidates: Vec<Vec<usize>> = molecule
        .rings
        .iter()
        .filter(|r| (MIN_AROMATIC_RING..=MAX_AROMATIC_RING).contains(&r.len()))
        .cloned()
        .collect();

    for ring in &candidates {
        if ring_bonds(molecule, ring).all(|b| molecule.bonds[b].aromatic) {
            mark_aromatic(molecule, ring);
        }
    }

    if molecule.bond_orders_known {
        loop {
            let mut changed = false;
            for ring in &candidates {
                if is_marked(molecule, ring) {
                    continue;
                }
                if pi_electrons(molecule, ring).is_some_and(|e| e % 4 == 2) {
                    mark_aromatic(molecule, ring);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }
    } else {
        for ring in &candidates {
            if ring.len() <= 6 && !is_marked(molecule, ring) && is_planar_ring(molecule, ring) {
                mark_aromatic(molecule, ring);
            }
        }
    }
}

/// Number of aromatic rings among the smallest rings.
pub fn aromatic_ring_count(molecule: &Molecule) -> usize {
    molecule
        .rings
        .iter()
        .filter(|ring| ring_bonds(molecule, ring).all(|b| molecule.bonds[b].aromatic))
        .count()
}

fn ring_bonds<'a>(molecule: &'a Molecule, ring: &'a [usize]) -> impl Iterator<Item = usize> + 'a {
    (0..ring.len()).filter_map(move |i| molecule.bond_index(ring[i], ring[(i + 1) % ring.len()]))
}

fn is_marked(molecule: &Molecule, ring: &[usize]) -> bool {
    ring_bonds(molecule, ring).all(|b| molecule.bonds[b].aromatic)
}

fn mark_aromatic(molecule: &mut Molecule, ring: &[usize]) {
    let bonds: Vec<usize> = ring_bonds(molecule, ring).collect();
    for b in bonds {
        molecule.bonds[b].aromatic = true;
    }
    for &a in ring {
        molecule.atoms[a].aromatic = true;
    }
}

/// Pi electrons a ring atom contributes, or `None` when the atom breaks conjugation.
fn atom_pi_electrons(molecule: &Molecule, ring: &[usize], atom: usize) -> Option<u32> {
    let data = &molecule.atoms[atom];
    let mut in_ring_double = false;
    let mut exocyclic: Option<(usize, usize)> = None;
    for &(next, bond) in molecule.bonds_of(atom) {
        let b = &molecule.bonds[bond];
        let multiple = matches!(b.order, BondOrder::Double | BondOrder::Aromatic);
        if !multiple {
            continue;
        }
        if ring.contains(&next) {
            in_ring_double = true;
        } else {
            exocyclic = Some((next, bond));
        }
    }
    if in_ring_double {
        return Some(1);
    }
    if let Some((partner, bond)) = exocyclic {
        if molecule.bonds[bond].aromatic {
            return Some(1);
        }
        let partner = molecule.atoms[partner].element;
        return if partner == Element::C { None } else { Some(0) };
    }
    match (data.element.atomic_number(), data.formal_charge) {
        (7, 0) | (15, 0) if molecule.degree(atom) + data.implicit_hydrogens as usize <= 3 => {
            Some(2)
        }
        (7, -1) | (8, 0) | (16, 0) | (34, 0) | (6, -1) => Some(2),
        (6, 1) | (5, 0) => Some(0),
        _ => None,
    }
}

fn pi_electrons(molecule: &Molecule, ring: &[usize]) -> Option<u32> {
    ring.iter()
        .map(|&a| atom_pi_electrons(molecule, ring, a))
        .sum()
}

fn is_planar_ring(molecule: &Molecule, ring: &[usize]) -> bool {
    let allowed = ring.iter().all(|&a| {
        let atom = &molecule.atoms[a];
        matches!(atom.element.atomic_number(), 6 | 7 | 8 | 16) && molecule.heavy_degree(a) <= 3
    });
    if !allowed {
        return false;
    }
    let points: Vec<Point3<f64>> = ring.iter().map(|&a| molecule.atoms[a].position).collect();
    Plane::fit(&points)
        .is_some_and(|plane| points.iter().all(|p| plane.distance_to(p) <= PLANARITY_TOLERANCE))
}
