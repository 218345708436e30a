use super::{AtomPrimitive, BondPrimitive, Expr, Smarts};
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::{Bond, BondOrder};
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Matching plan entry for one pattern atom: the bonds back to atoms placed earlier.
struct Step {
    /// Earlier pattern atoms bonded to this one, with the pattern bond index.
    back_edges: Vec<(usize, usize)>,
}

fn plan(smarts: &Smarts) -> Vec<Step> {
    let mut steps: Vec<Step> = (0..smarts.atoms.len())
        .map(|_| Step {
            back_edges: Vec::new(),
        })
        .collect();
    for (index, bond) in smarts.bonds.iter().enumerate() {
        let (early, late) = if bond.atom1 < bond.atom2 {
            (bond.atom1, bond.atom2)
        } else {
            (bond.atom2, bond.atom1)
        };
        steps[late].back_edges.push((early, index));
    }
    steps
}

fn atom_matches(molecule: &Molecule, index: usize, primitive: &AtomPrimitive) -> bool {
    let atom = &molecule.atoms[index];
    let rings_containing = || molecule.rings.iter().filter(|r| r.contains(&index));
    match *primitive {
        AtomPrimitive::Any => true,
        AtomPrimitive::Aromatic => atom.aromatic,
        AtomPrimitive::Aliphatic => !atom.aromatic,
        AtomPrimitive::Element { number, aromatic } => {
            atom.element.atomic_number() == number && atom.aromatic == aromatic
        }
        AtomPrimitive::AtomicNumber(number) => atom.element.atomic_number() == number,
        AtomPrimitive::HydrogenCount(n) => molecule.hydrogen_count(index) == n as usize,
        AtomPrimitive::Degree(n) => molecule.heavy_degree(index) == n as usize,
        AtomPrimitive::Connectivity(n) => {
            molecule.heavy_degree(index) + molecule.hydrogen_count(index) == n as usize
        }
        AtomPrimitive::RingMembership(None) => molecule.is_ring_atom(index),
        AtomPrimitive::RingMembership(Some(n)) => rings_containing().count() == n as usize,
        AtomPrimitive::RingSize(None) => molecule.is_ring_atom(index),
        AtomPrimitive::RingSize(Some(n)) => rings_containing().any(|r| r.len() == n as usize),
        AtomPrimitive::RingConnectivity(expected) => {
            let ring_bonds = molecule
                .bonds_of(index)
                .iter()
                .filter(|&&(_, b)| molecule.bonds[b].in_ring)
                .count();
            match expected {
                Some(n) => ring_bonds == n as usize,
                None => ring_bonds > 0,
            }
        }
        AtomPrimitive::Charge(charge) => atom.formal_charge == charge,
    }
}

fn bond_matches(bond: &Bond, primitive: &BondPrimitive) -> bool {
    let aromatic = bond.aromatic || bond.order == BondOrder::Aromatic;
    match primitive {
        BondPrimitive::Implicit => aromatic || bond.order == BondOrder::Single,
        BondPrimitive::Single => !aromatic && bond.order == BondOrder::Single,
        BondPrimitive::Double => !aromatic && bond.order == BondOrder::Double,
        BondPrimitive::Triple => bond.order == BondOrder::Triple,
        BondPrimitive::Aromatic => aromatic,
        BondPrimitive::Any => true,
        BondPrimitive::Ring => bond.in_ring,
    }
}

/// Whether a pattern atom asks for a hydrogen atom itself (`[H]`, `[#1]`).
fn targets_hydrogen(expr: &Expr<AtomPrimitive>) -> bool {
    matches!(
        expr,
        Expr::Primitive(AtomPrimitive::AtomicNumber(1))
            | Expr::Primitive(AtomPrimitive::Element { number: 1, .. })
    )
}

struct Search<'a> {
    smarts: &'a Smarts,
    molecule: &'a Molecule,
    steps: Vec<Step>,
    mapping: Vec<usize>,
    used: Vec<bool>,
}

impl<'a> Search<'a> {
    fn new(smarts: &'a Smarts, molecule: &'a Molecule) -> Self {
        Self {
            smarts,
            molecule,
            steps: plan(smarts),
            mapping: Vec::with_capacity(smarts.atoms.len()),
            used: vec![false; molecule.atoms.len()],
        }
    }

    fn candidate_ok(&self, depth: usize, candidate: usize) -> bool {
        if self.used[candidate] {
            return false;
        }
        let expr = &self.smarts.atoms[depth];
        if self.molecule.atoms[candidate].is_hydrogen() != targets_hydrogen(expr) {
            return false;
        }
        if !expr.evaluate(&|p| atom_matches(self.molecule, candidate, p)) {
            return false;
        }
        self.steps[depth].back_edges.iter().all(|&(earlier, pattern_bond)| {
            let target = self.mapping[earlier];
            self.molecule.bond_between(candidate, target).is_some_and(|bond| {
                self.smarts.bonds[pattern_bond]
                    .expr
                    .evaluate(&|p| bond_matches(bond, p))
            })
        })
    }

    fn candidates(&self, depth: usize) -> Vec<usize> {
        match self.steps[depth].back_edges.first() {
            Some(&(earlier, _)) => self.molecule.neighbors(self.mapping[earlier]).collect(),
            None => (0..self.molecule.atoms.len()).collect(),
        }
    }

    fn run(&mut self, visit: &mut impl FnMut(&[usize]) -> ControlFlow<()>) -> ControlFlow<()> {
        let depth = self.mapping.len();
        if depth == self.smarts.atoms.len() {
            return visit(&self.mapping);
        }
        for candidate in self.candidates(depth) {
            if !self.candidate_ok(depth, candidate) {
                continue;
            }
            self.mapping.push(candidate);
            self.used[candidate] = true;
            let flow = self.run(visit);
            self.used[candidate] = false;
            self.mapping.pop();
            flow?;
        }
        ControlFlow::Continue(())
    }
}

impl Smarts {
    /// Returns `true` if the pattern occurs anywhere in the molecule.
    pub fn matches(&self, molecule: &Molecule) -> bool {
        let mut found = false;
        let _ = Search::new(self, molecule).run(&mut |_| {
            found = true;
            ControlFlow::Break(())
        });
        found
    }

    /// Every mapping of pattern atoms onto molecule atom indices, in search order.
    pub fn find_all(&self, molecule: &Molecule) -> Vec<Vec<usize>> {
        let mut mappings = Vec::new();
        let _ = Search::new(self, molecule).run(&mut |mapping| {
            mappings.push(mapping.to_vec());
            ControlFlow::Continue(())
        });
        mappings
    }

    /// Number of matches with distinct atom sets.
    pub fn count_matches(&self, molecule: &Molecule) -> usize {
        let mut unique: HashSet<Vec<usize>> = HashSet::new();
        let _ = Search::new(self, molecule).run(&mut |mapping| {
            let mut key = mapping.to_vec();
            key.sort_unstable();
            unique.insert(key);
            ControlFlow::Continue(())
        });
        unique.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::io::format::{Format, MoleculeReader};
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::molecule::Molecule;
    use crate::core::models::topology::BondOrder;
    use crate::core::smarts::Smarts;
    use nalgebra::Point3;
    use std::io::Cursor;

    fn build(elements: &[Element], bonds: &[(usize, usize, BondOrder)]) -> Molecule {
        let mut mol = Molecule::new("test");
        for (i, &element) in elements.iter().enumerate() {
            mol.add_atom(Atom::new(element, Point3::new(i as f64, 0.0, 0.0)));
        }
        for &(a, b, order) in bonds {
            mol.add_bond(a, b, order).unwrap();
        }
        mol.perceive();
        mol
    }

    /// Phenol with a Kekulé ring: atoms 0-5 ring carbons, 6 oxygen.
    fn phenol() -> Molecule {
        use BondOrder::{Double, Single};
        let mut elements = vec![Element::C; 6];
        elements.push(Element::O);
        build(
            &elements,
            &[
                (0, 1, Double),
                (1, 2, Single),
                (2, 3, Double),
                (3, 4, Single),
                (4, 5, Double),
                (5, 0, Single),
                (0, 6, Single),
            ],
        )
    }

    fn acetone() -> Molecule {
        use BondOrder::{Double, Single};
        build(
            &[Element::C, Element::C, Element::O, Element::C],
            &[(0, 1, Single), (1, 2, Double), (1, 3, Single)],
        )
    }

    fn smarts(pattern: &str) -> Smarts {
        pattern.parse().unwrap()
    }

    #[test]
    fn aromatic_and_aliphatic_symbols_are_distinguished() {
        let mol = phenol();
        assert!(smarts("c1ccccc1").matches(&mol));
        assert!(!smarts("C1CCCCC1").matches(&mol));
        assert!(smarts("c[OH]").matches(&mol));
        assert!(!smarts("C[OH]").matches(&mol));
        assert!(smarts("a").matches(&mol));
    }

    #[test]
    fn kekule_bonds_in_aromatic_rings_match_aromatic_queries_only() {
        let mol = phenol();
        assert!(smarts("c:c").matches(&mol));
        assert!(!smarts("c=c").matches(&mol));
        assert!(smarts("c-,:c").matches(&mol));
    }

    #[test]
    fn hydrogen_counts_degree_and_connectivity() {
        let mol = acetone();
        assert_eq!(smarts("[CH3]").count_matches(&mol), 2);
        assert_eq!(smarts("[CD3]").count_matches(&mol), 1);
        assert_eq!(smarts("[CX4]").count_matches(&mol), 2);
        assert!(smarts("[CH3]C(=O)[CH3]").matches(&mol));
        assert!(!smarts("[CH2]").matches(&mol));
    }

    #[test]
    fn ring_primitives_and_ring_bonds() {
        let mol = phenol();
        assert_eq!(smarts("[R]").count_matches(&mol), 6);
        assert_eq!(smarts("[R0]").count_matches(&mol), 1);
        assert_eq!(smarts("[r6]").count_matches(&mol), 6);
        assert!(smarts("c!@O").matches(&mol));
        assert!(!smarts("c@O").matches(&mol));
    }

    #[test]
    fn negation_and_or_lists() {
        let mol = phenol();
        assert_eq!(smarts("[!#6]").count_matches(&mol), 1);
        assert_eq!(smarts("[#8,#7]").count_matches(&mol), 1);
        assert_eq!(smarts("[!#6;!#1]").count_matches(&mol), 1);
        assert_eq!(smarts("[c;H1]").count_matches(&mol), 5);
    }

    #[test]
    fn count_matches_deduplicates_symmetric_mappings() {
        let mol = phenol();
        let ring = smarts("c1ccccc1");
        assert_eq!(ring.find_all(&mol).len(), 12);
        assert_eq!(ring.count_matches(&mol), 1);
        assert_eq!(smarts("cc").count_matches(&mol), 6);
    }

    #[test]
    fn charges_and_disconnected_fragments() {
        let text = "\
betaine


  6  5  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 N   0  3  0  0  0  0  0  0  0  0  0  0
    1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    2.2000    1.2000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    3.4000    1.2000    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
    1.6000    2.4000    0.0000 O   0  5  0  0  0  0  0  0  0  0  0  0
   -1.5000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  2  3  1  0
  3  4  2  0
  3  5  1  0
  1  6  1  0
M  END
$$$$
";
        let mol = MoleculeReader::new(Format::Sdf, Cursor::new(text))
            .next()
            .unwrap()
            .unwrap();
        assert!(smarts("[N+]").matches(&mol));
        assert!(smarts("C(=O)[O-]").matches(&mol));
        assert!(smarts("[N+].[O-]").matches(&mol));
        assert!(!smarts("[N-]").matches(&mol));
    }

    #[test]
    fn hydrogen_atoms_match_only_explicit_hydrogen_queries() {
        let mut mol = Molecule::new("water");
        let o = mol.add_atom(Atom::new(Element::O, Point3::origin()));
        let h1 = mol.add_atom(Atom::new(Element::H, Point3::new(0.96, 0.0, 0.0)));
        let h2 = mol.add_atom(Atom::new(Element::H, Point3::new(-0.24, 0.93, 0.0)));
        mol.add_bond(o, h1, BondOrder::Single).unwrap();
        mol.add_bond(o, h2, BondOrder::Single).unwrap();
        mol.perceive();
        assert_eq!(smarts("*").count_matches(&mol), 1);
        assert_eq!(smarts("[OH2]").count_matches(&mol), 1);
        assert_eq!(smarts("[#1]").count_matches(&mol), 2);
        assert_eq!(smarts("O[H]").count_matches(&mol), 2);
    }
}
