use crate::core::models::molecule::Molecule;
use std::collections::{HashSet, VecDeque};

/// Marks ring bonds and records the smallest ring through each of them.
///
/// Ring bonds are the non-bridges of the bond graph (found with an
/// iterative Tarjan walk so large proteins do not exhaust the stack). For
/// every ring bond the shortest alternative path between its endpoints
/// closes the smallest ring containing it; duplicate rings are dropped.
pub fn perceive_rings(molecule: &mut Molecule) {
    let bridges = find_bridges(molecule);
    let mut seen: HashSet<Vec<usize>> = HashSet::new();
    let mut rings = Vec::new();

    for bond_index in 0..molecule.bonds.len() {
        let in_ring = !bridges.contains(&bond_index);
        molecule.bonds[bond_index].in_ring = in_ring;
        if !in_ring {
            continue;
        }
        let bond = molecule.bonds[bond_index];
        if let Some(ring) = shortest_cycle_through(molecule, bond.atom1, bond.atom2, bond_index) {
            let mut key = ring.clone();
            key.sort_unstable();
            if seen.insert(key) {
                rings.push(ring);
            }
        }
    }
    rings.sort_by_key(|r| r.len());
    molecule.rings = rings;
}

/// Number of independent cycles (edges - nodes + connected components).
pub fn cyclomatic_number(molecule: &Molecule) -> usize {
    let n = molecule.atoms.len();
    let mut component = vec![usize::MAX; n];
    let mut components = 0;
    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        components += 1;
        let mut stack = vec![start];
        component[start] = start;
        while let Some(atom) = stack.pop() {
            for next in molecule.neighbors(atom) {
                if component[next] == usize::MAX {
                    component[next] = start;
                    stack.push(next);
                }
            }
        }
    }
    (molecule.bonds.len() + components).saturating_sub(n)
}

fn find_bridges(molecule: &Molecule) -> HashSet<usize> {
    let n = molecule.atoms.len();
    let mut discovery = vec![0usize; n];
    let mut low = vec![0usize; n];
    let mut visited = vec![false; n];
    let mut bridges = HashSet::new();
    let mut timer = 1;

    for root in 0..n {
        if visited[root] {
            continue;
        }
        // Frames: (atom, bond used to enter it, next adjacency position).
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        visited[root] = true;
        discovery[root] = timer;
        low[root] = timer;
        timer += 1;

        while let Some(frame) = stack.last_mut() {
            let (atom, parent_bond, cursor) = *frame;
            if let Some(&(next, bond)) = molecule.bonds_of(atom).get(cursor) {
                frame.2 += 1;
                if Some(bond) == parent_bond {
                    continue;
                }
                if visited[next] {
                    low[atom] = low[atom].min(discovery[next]);
                } else {
                    visited[next] = true;
                    discovery[next] = timer;
                    low[next] = timer;
                    timer += 1;
                    stack.push((next, Some(bond), 0));
                }
            } else {
                stack.pop();
                if let (Some(bond), Some(&(parent, _, _))) = (parent_bond, stack.last()) {
                    low[parent] = low[parent].min(low[atom]);
                    if low[atom] > discovery[parent] {
                        bridges.insert(bond);
                    }
                }
            }
        }
    }
    bridges
}

fn shortest_cycle_through(
    molecule: &Molecule,
    from: usize,
    to: usize,
    excluded_bond: usize,
) -> Option<Vec<usize>> {
    let mut previous = vec![usize::MAX; molecule.atoms.len()];
    let mut queue = VecDeque::from([from]);
    previous[from] = from;

    while let Some(atom) = queue.pop_front() {
        if atom == to {
            let mut path = vec![to];
            let mut current = to;
            while current != from {
                current = previous[current];
                path.push(current);
            }
            path.reverse();
            return Some(path);
        }
        for &(next, bond) in molecule.bonds_of(atom) {
            if bond == excluded_bond || previous[next] != usize::MAX {
                continue;
            }
            previous[next] = atom;
            queue.push_back(next);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;
    use nalgebra::Point3;

    fn chain_molecule(n: usize, closures: &[(usize, usize)]) -> Molecule {
        let mut mol = Molecule::new("rings");
        for i in 0..n {
            mol.add_atom(Atom::new(Element::C, Point3::new(i as f64, 0.0, 0.0)));
        }
        for i in 1..n {
            mol.add_bond(i - 1, i, BondOrder::Single).unwrap();
        }
        for &(a, b) in closures {
            mol.add_bond(a, b, BondOrder::Single).unwrap();
        }
        mol
    }

    #[test]
    fn acyclic_chain_has_no_rings() {
        let mut mol = chain_molecule(5, &[]);
        perceive_rings(&mut mol);
        assert!(mol.rings().is_empty());
        assert!(mol.bonds().iter().all(|b| !b.in_ring));
        assert_eq!(cyclomatic_number(&mol), 0);
    }

    #[test]
    fn cyclohexane_with_tail_marks_only_ring_bonds() {
        // Atoms 0..6 form the ring; atom 6 hangs off atom 5.
        let mut mol = chain_molecule(7, &[(0, 5)]);
        perceive_rings(&mut mol);
        assert_eq!(mol.rings().len(), 1);
        assert_eq!(mol.rings()[0].len(), 6);
        let tail = mol.bond_index(5, 6).unwrap();
        assert!(!mol.bonds()[tail].in_ring);
        assert!(mol.is_ring_atom(0));
        assert!(!mol.is_ring_atom(6));
    }

    #[test]
    fn fused_bicycle_yields_two_smallest_rings() {
        // Decalin-like: ring A = 0..5, ring B shares bond 0-5 via atoms 6..9.
        let mut mol = chain_molecule(10, &[(0, 5), (0, 9)]);
        // Chain bond 5-6 already exists; 6..9 continue the chain back to 0.
        perceive_rings(&mut mol);
        let sizes: Vec<usize> = mol.rings().iter().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![6, 6]);
        assert_eq!(cyclomatic_number(&mol), 2);
    }
}
