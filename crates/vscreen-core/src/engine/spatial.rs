use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Upper bound on the number of partial mappings visited by the symmetry search.
const MAX_SEARCH_STEPS: usize = 1_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RmsdError {
    #[error("Heavy atom counts differ: reference has {reference}, pose has {pose}")]
    AtomCountMismatch { reference: usize, pose: usize },
    #[error("Molecules have no heavy atoms")]
    Empty,
    #[error("Unknown RMSD method: '{0}' (expected direct or min_symmetry)")]
    UnknownMethod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RmsdMethod {
    /// Atoms are paired by index.
    #[default]
    Direct,
    /// Minimum over the symmetry-equivalent atom pairings of the reference.
    MinSymmetry,
}

impl FromStr for RmsdMethod {
    type Err = RmsdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "none" => Ok(Self::Direct),
            "min_symmetry" | "symmetry" => Ok(Self::MinSymmetry),
            _ => Err(RmsdError::UnknownMethod(s.to_string())),
        }
    }
}

/// Heavy-atom RMSD between two conformers of the same molecule, without superposition.
pub fn rmsd(reference: &Molecule, pose: &Molecule, method: RmsdMethod) -> Result<f64, RmsdError> {
    let reference_atoms = reference.heavy_atom_indices();
    let pose_atoms = pose.heavy_atom_indices();
    if reference_atoms.len() != pose_atoms.len() {
        return Err(RmsdError::AtomCountMismatch {
            reference: reference_atoms.len(),
            pose: pose_atoms.len(),
        });
    }
    if reference_atoms.is_empty() {
        return Err(RmsdError::Empty);
    }
    let n = reference_atoms.len() as f64;
    let reference_positions: Vec<Point3<f64>> = reference_atoms
        .iter()
        .map(|&i| reference.atoms()[i].position)
        .collect();
    let pose_positions: Vec<Point3<f64>> =
        pose_atoms.iter().map(|&i| pose.atoms()[i].position).collect();

    let direct: f64 = reference_positions
        .iter()
        .zip(&pose_positions)
        .map(|(a, b)| nalgebra::distance_squared(a, b))
        .sum();
    let squared = match method {
        RmsdMethod::Direct => direct,
        RmsdMethod::MinSymmetry => {
            let graph = HeavyGraph::new(reference, &reference_atoms);
            let mut search = SymmetrySearch {
                graph: &graph,
                reference: &reference_positions,
                pose: &pose_positions,
                mapping: vec![usize::MAX; graph.len()],
                used: vec![false; graph.len()],
                // The identity pairing is always a valid automorphism.
                best: direct,
                steps: 0,
            };
            search.extend(0, 0.0);
            if search.steps >= MAX_SEARCH_STEPS {
                debug!(
                    steps = search.steps,
                    "Symmetry search capped; RMSD may be an upper bound"
                );
            }
            search.best
        }
    };
    Ok((squared / n).sqrt())
}

/// The heavy-atom graph of a molecule with atoms renumbered `0..n`.
struct HeavyGraph {
    elements: Vec<u8>,
    adjacency: Vec<Vec<usize>>,
    /// Search order: breadth-first so each atom after the first has a mapped neighbour.
    order: Vec<usize>,
}

impl HeavyGraph {
    fn new(molecule: &Molecule, heavy: &[usize]) -> Self {
        let mut local = vec![usize::MAX; molecule.atoms().len()];
        for (k, &i) in heavy.iter().enumerate() {
            local[i] = k;
        }
        let adjacency: Vec<Vec<usize>> = heavy
            .iter()
            .map(|&i| {
                molecule
                    .neighbors(i)
                    .filter_map(|n| (local[n] != usize::MAX).then_some(local[n]))
                    .collect()
            })
            .collect();
        let elements = heavy
            .iter()
            .map(|&i| molecule.atoms()[i].element.atomic_number())
            .collect();

        let mut order = Vec::with_capacity(heavy.len());
        let mut seen = vec![false; heavy.len()];
        for start in 0..heavy.len() {
            if seen[start] {
                continue;
            }
            seen[start] = true;
            let mut queue = std::collections::VecDeque::from([start]);
            while let Some(atom) = queue.pop_front() {
                order.push(atom);
                for &n in &adjacency[atom] {
                    if !seen[n] {
                        seen[n] = true;
                        queue.push_back(n);
                    }
                }
            }
        }
        Self {
            elements,
            adjacency,
            order,
        }
    }

    fn len(&self) -> usize {
        self.elements.len()
    }

    fn bonded(&self, a: usize, b: usize) -> bool {
        self.adjacency[a].contains(&b)
    }
}

struct SymmetrySearch<'a> {
    graph: &'a HeavyGraph,
    reference: &'a [Point3<f64>],
    pose: &'a [Point3<f64>],
    mapping: Vec<usize>,
    used: Vec<bool>,
    best: f64,
    steps: usize,
}

impl SymmetrySearch<'_> {
    /// Branch and bound over automorphisms; `partial` is the squared deviation so far.
    fn extend(&mut self, depth: usize, partial: f64) {
        if self.steps >= MAX_SEARCH_STEPS || partial >= self.best {
            return;
        }
        self.steps += 1;
        if depth == self.graph.len() {
            self.best = partial;
            return;
        }
        let atom = self.graph.order[depth];
        for candidate in 0..self.graph.len() {
            if self.used[candidate] || !self.compatible(atom, candidate, depth) {
                continue;
            }
            let cost = nalgebra::distance_squared(&self.reference[atom], &self.pose[candidate]);
            self.mapping[atom] = candidate;
            self.used[candidate] = true;
            self.extend(depth + 1, partial + cost);
            self.used[candidate] = false;
            self.mapping[atom] = usize::MAX;
        }
    }

    fn compatible(&self, atom: usize, candidate: usize, depth: usize) -> bool {
        let graph = self.graph;
        if graph.elements[atom] != graph.elements[candidate]
            || graph.adjacency[atom].len() != graph.adjacency[candidate].len()
        {
            return false;
        }
        graph.order[..depth].iter().all(|&mapped| {
            graph.bonded(atom, mapped) == graph.bonded(candidate, self.mapping[mapped])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::BondOrder;

    /// Isopropanol-like C(C)(C)O: the two methyls are interchangeable.
    fn branched(positions: [[f64; 3]; 4]) -> Molecule {
        let mut mol = Molecule::new("branched");
        for (element, p) in [Element::C, Element::C, Element::C, Element::O].into_iter().zip(positions) {
            mol.add_atom(Atom::new(element, Point3::new(p[0], p[1], p[2])));
        }
        for k in 1..4 {
            mol.add_bond(0, k, BondOrder::Single).unwrap();
        }
        mol.perceive();
        mol
    }

    const REFERENCE: [[f64; 3]; 4] = [
        [0.0, 0.0, 0.0],
        [1.5, 0.0, 0.0],
        [-0.75, 1.3, 0.0],
        [-0.75, -1.3, 0.0],
    ];

    #[test]
    fn identical_conformers_have_zero_rmsd() {
        let mol = branched(REFERENCE);
        for method in [RmsdMethod::Direct, RmsdMethod::MinSymmetry] {
            assert_eq!(rmsd(&mol, &mol, method).unwrap(), 0.0);
        }
    }

    #[test]
    fn swapped_equivalent_atoms_are_forgiven_by_symmetry() {
        let reference = branched(REFERENCE);
        let swapped = branched([REFERENCE[0], REFERENCE[2], REFERENCE[1], REFERENCE[3]]);
        let direct = rmsd(&reference, &swapped, RmsdMethod::Direct).unwrap();
        assert!(direct > 1.0);
        let symmetric = rmsd(&reference, &swapped, RmsdMethod::MinSymmetry).unwrap();
        assert!(symmetric.abs() < 1e-12);
    }

    #[test]
    fn oxygen_is_not_interchangeable_with_carbon() {
        let reference = branched(REFERENCE);
        let swapped = branched([REFERENCE[0], REFERENCE[3], REFERENCE[2], REFERENCE[1]]);
        let symmetric = rmsd(&reference, &swapped, RmsdMethod::MinSymmetry).unwrap();
        assert!(symmetric > 1.0);
    }

    #[test]
    fn hydrogens_are_ignored_and_counts_must_match() {
        let reference = branched(REFERENCE);
        let mut with_h = reference.clone();
        let h = with_h.add_atom(Atom::new(Element::H, Point3::new(9.0, 9.0, 9.0)));
        with_h.add_bond(3, h, BondOrder::Single).unwrap();
        assert_eq!(rmsd(&reference, &with_h, RmsdMethod::Direct).unwrap(), 0.0);

        let mut bigger = reference.clone();
        bigger.add_atom(Atom::new(Element::C, Point3::origin()));
        assert_eq!(
            rmsd(&reference, &bigger, RmsdMethod::Direct),
            Err(RmsdError::AtomCountMismatch { reference: 4, pose: 5 })
        );
        let empty = Molecule::new("empty");
        assert_eq!(rmsd(&empty, &empty, RmsdMethod::Direct), Err(RmsdError::Empty));
    }

    #[test]
    fn method_names() {
        assert_eq!("min_symmetry".parse::<RmsdMethod>().unwrap(), RmsdMethod::MinSymmetry);
        assert_eq!("Direct".parse::<RmsdMethod>().unwrap(), RmsdMethod::Direct);
        assert!("kabsch".parse::<RmsdMethod>().is_err());
    }
}
