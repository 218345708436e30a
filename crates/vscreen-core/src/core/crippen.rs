//! Wildman-Crippen atom typing and logP contributions.
//!
//! Every heavy atom is assigned one of the published atom classes (C1-C27,
//! N1-N14, O1-O12, halogens, sulfur and phosphorus) by its element,
//! aromaticity, hydrogen count and neighbourhood. Hydrogens, whether listed
//! in the file or implicit, are typed by the heavy atom they sit on.
//! Classes are tested in the published order and the first match wins.

use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;
use phf::{Map, phf_map};

static CONTRIBUTIONS: Map<&'static str, f64> = phf_map! {
    "C1" => 0.1441, "C2" => 0.0, "C3" => -0.2035, "C4" => -0.2051,
    "C5" => -0.2783, "C6" => 0.1551, "C7" => 0.0017, "C8" => 0.08452,
    "C9" => -0.1444, "C10" => -0.0516, "C11" => 0.1193, "C12" => -0.0967,
    "C13" => -0.5443, "C14" => 0.0, "C15" => 0.2450, "C16" => 0.1980,
    "C17" => 0.0, "C18" => 0.1581, "C19" => 0.2955, "C20" => 0.2713,
    "C21" => 0.1360, "C22" => 0.4619, "C23" => 0.5437, "C24" => 0.1893,
    "C25" => -0.8186, "C26" => 0.2640, "C27" => 0.2148, "CS" => 0.08129,
    "H1" => 0.1230, "H2" => -0.2677, "H3" => 0.2142, "H4" => 0.2980, "HS" => 0.1125,
    "N1" => -1.0190, "N2" => -0.7096, "N3" => -1.0270, "N4" => -0.5188,
    "N5" => 0.08387, "N6" => -0.3187, "N7" => -0.4458, "N8" => 0.1836,
    "N9" => 0.01508, "N10" => -1.950, "N11" => -0.3239, "N12" => -1.119,
    "N13" => -0.3396, "N14" => 0.2887, "NS" => -0.4806,
    "O1" => 0.1552, "O2" => -0.2893, "O3" => -0.0684, "O4" => -0.4195,
    "O5" => 0.0335, "O6" => -0.3339, "O7" => -1.189, "O8" => 0.1788,
    "O9" => -0.1526, "O10" => 0.1129, "O11" => 0.4833, "O12" => -1.326, "OS" => -0.1188,
    "F" => 0.4202, "Cl" => 0.6895, "Br" => 0.8456, "I" => 0.8857, "Hal" => -2.996,
    "P" => 0.8612, "S1" => 0.6482, "S2" => -0.0024, "S3" => 0.6237,
    "Me" => 0.0,
};

/// Contribution of an atom class, zero for unknown labels.
pub fn contribution(class: &str) -> f64 {
    CONTRIBUTIONS.get(class).copied().unwrap_or(0.0)
}

/// A bonded heavy neighbour as the typing rules see it.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    index: usize,
    element: Element,
    aromatic: bool,
    order: BondOrder,
    bond_aromatic: bool,
}

impl Neighbor {
    fn number(&self) -> u8 {
        self.element.atomic_number()
    }

    /// Uppercase SMARTS atom: aliphatic, not hydrogen.
    fn is_aliphatic(&self) -> bool {
        !self.aromatic
    }

    fn is_aliphatic_carbon(&self) -> bool {
        !self.aromatic && self.element == Element::C
    }

    /// `[N,O,P,S,F,Cl,Br,I]` in its aliphatic form.
    fn is_common_heteroatom(&self) -> bool {
        !self.aromatic && matches!(self.number(), 7 | 8 | 15 | 16 | 9 | 17 | 35 | 53)
    }

    fn is_single(&self) -> bool {
        self.order == BondOrder::Single && !self.bond_aromatic
    }

    fn is_double(&self) -> bool {
        self.order == BondOrder::Double && !self.bond_aromatic
    }

    fn is_triple(&self) -> bool {
        self.order == BondOrder::Triple && !self.bond_aromatic
    }
}

fn heavy_neighbors(molecule: &Molecule, atom: usize) -> Vec<Neighbor> {
    molecule
        .bonds_of(atom)
        .iter()
        .filter(|&&(n, _)| !molecule.atoms[n].is_hydrogen())
        .map(|&(n, b)| Neighbor {
            index: n,
            element: molecule.atoms[n].element,
            aromatic: molecule.atoms[n].aromatic,
            order: molecule.bonds[b].order,
            bond_aromatic: molecule.bonds[b].aromatic,
        })
        .collect()
}

/// Total connections: explicit bonds plus implicit hydrogens.
fn connections(molecule: &Molecule, atom: usize) -> usize {
    molecule.degree(atom) + molecule.atoms[atom].implicit_hydrogens as usize
}

/// Atom class of a heavy atom.
pub fn heavy_atom_class(molecule: &Molecule, atom: usize) -> &'static str {
    let data = &molecule.atoms[atom];
    let hydrogens = molecule.hydrogen_count(atom);
    let heavy = heavy_neighbors(molecule, atom);
    match data.element.atomic_number() {
        6 if data.aromatic => aromatic_carbon(hydrogens, &heavy),
        6 => aliphatic_carbon(hydrogens, connections(molecule, atom), &heavy),
        7 => nitrogen(data.aromatic, data.formal_charge, hydrogens, &heavy),
        8 => oxygen(molecule, data.aromatic, data.formal_charge, hydrogens, &heavy),
        9 | 17 | 35 | 53 if data.formal_charge < 0 => "Hal",
        9 => "F",
        17 => "Cl",
        35 => "Br",
        53 => "I",
        15 => "P",
        16 if data.aromatic => "S3",
        16 if data.formal_charge != 0 => "S2",
        16 => "S1",
        _ => "Me",
    }
}

fn aliphatic_carbon(hydrogens: usize, connections: usize, heavy: &[Neighbor]) -> &'static str {
    let carbons = heavy.iter().filter(|n| n.is_aliphatic_carbon()).count();
    let all_aliphatic = heavy.iter().all(Neighbor::is_aliphatic);
    let hetero = heavy.iter().any(Neighbor::is_common_heteroatom);
    let any_aromatic = heavy.iter().any(|n| n.aromatic);
    let sp3 = connections == 4;

    let c1 = hydrogens == 4
        || (hydrogens == 3 && carbons == 1)
        || (hydrogens == 2 && carbons == 2 && heavy.len() == 2);
    if c1 {
        return "C1";
    }
    if (hydrogens == 1 && carbons == 3) || (hydrogens == 0 && carbons == 4) {
        return "C2";
    }
    if hetero && all_aliphatic {
        if (hydrogens == 3) || (hydrogens == 2 && sp3) {
            return "C3";
        }
        if hydrogens <= 1 && sp3 {
            return "C4";
        }
    }
    if heavy
        .iter()
        .any(|n| n.is_double() && n.is_aliphatic() && n.element != Element::C)
    {
        return "C5";
    }
    let double_carbon = heavy.iter().any(|n| n.is_double() && n.is_aliphatic_carbon());
    let doubles_to_carbon = heavy
        .iter()
        .filter(|n| n.is_double() && n.is_aliphatic_carbon())
        .count();
    if double_carbon && (all_aliphatic || doubles_to_carbon == 2) {
        return "C6";
    }
    if connections == 2 && heavy.iter().any(|n| n.is_triple() && n.is_aliphatic()) {
        return "C7";
    }
    if sp3 && any_aromatic {
        return match hydrogens {
            3 if heavy.iter().any(|n| n.element == Element::C) => "C8",
            3 => "C9",
            2 => "C10",
            1 => "C11",
            _ => "C12",
        };
    }
    let double_aromatic_carbon = heavy
        .iter()
        .any(|n| n.is_double() && n.aromatic && n.element == Element::C);
    if (double_carbon && any_aromatic) || double_aromatic_carbon {
        return "C26";
    }
    if sp3
        && heavy.iter().any(|n| {
            n.is_aliphatic() && !matches!(n.number(), 6 | 7 | 8 | 15 | 16 | 9 | 17 | 35 | 53)
        })
    {
        return "C27";
    }
    "CS"
}

fn aromatic_carbon(hydrogens: usize, heavy: &[Neighbor]) -> &'static str {
    if hydrogens == 0
        && heavy.iter().any(|n| {
            n.is_single()
                && n.is_aliphatic()
                && !matches!(n.number(), 6 | 7 | 8 | 16 | 9 | 17 | 35 | 53)
        })
    {
        return "C13";
    }
    for (number, class) in [(9, "C14"), (17, "C15"), (35, "C16"), (53, "C17")] {
        if heavy.iter().any(|n| n.number() == number) {
            return class;
        }
    }
    if hydrogens == 1 {
        return "C18";
    }
    let ring_bonds = heavy.iter().filter(|n| n.bond_aromatic).count();
    if ring_bonds >= 3 {
        return "C19";
    }
    if ring_bonds == 2 {
        if let Some(sub) = heavy.iter().find(|n| !n.bond_aromatic) {
            if sub.is_single() {
                if sub.aromatic {
                    return "C20";
                }
                match sub.number() {
                    6 => return "C21",
                    7 => return "C22",
                    8 => return "C23",
                    16 => return "C24",
                    _ => {}
                }
            } else if sub.is_double() && sub.is_aliphatic() && matches!(sub.number(), 6 | 7 | 8) {
                return "C25";
            }
        }
    }
    "CS"
}

fn nitrogen(aromatic: bool, charge: i8, hydrogens: usize, heavy: &[Neighbor]) -> &'static str {
    if aromatic {
        return match charge {
            0 => "N11",
            c if c > 0 => "N12",
            _ => "NS",
        };
    }
    if charge > 0 {
        if hydrogens > 0 {
            return "N10";
        }
        let azide = heavy
            .iter()
            .any(|n| n.is_double() && n.element == Element::N);
        if heavy.iter().any(Neighbor::is_triple) || azide {
            return "N14";
        }
        return "N13";
    }
    if charge < 0 {
        return "N14";
    }
    if heavy.iter().any(|n| n.is_triple() && n.is_aliphatic()) {
        return "N9";
    }
    let aromatic_neighbors = heavy.iter().filter(|n| n.aromatic).count();
    let all_single = heavy.iter().all(|n| !n.is_double() && !n.is_triple());
    if !all_single {
        return "NS";
    }
    match (hydrogens, heavy.len(), aromatic_neighbors) {
        (2, 1, 0) => "N1",
        (1, 2, 0) => "N2",
        (2, 1, _) => "N3",
        (1, 2, 1) => "N4",
        (1, 2, _) => "N5",
        (0, 3, 0) => "N6",
        (0, 3, 1) => "N7",
        (0, 3, _) => "N8",
        _ => "NS",
    }
}

fn oxygen(
    molecule: &Molecule,
    aromatic: bool,
    charge: i8,
    hydrogens: usize,
    heavy: &[Neighbor],
) -> &'static str {
    if aromatic {
        return "O1";
    }
    if charge == 0 && hydrogens > 0 {
        return "O2";
    }
    if charge == 0 && heavy.len() == 2 {
        return if heavy.iter().all(Neighbor::is_aliphatic) {
            "O3"
        } else {
            "O4"
        };
    }
    let [partner] = heavy else {
        return "OS";
    };
    if charge < 0 {
        return match partner.number() {
            7 => "O5",
            16 => "O6",
            6 if is_carbonyl(molecule, partner.index) => "O12",
            _ => "O7",
        };
    }
    if !partner.is_double() {
        return "OS";
    }
    match partner.number() {
        7 | 8 => "O5",
        15 | 16 => "O6",
        6 if partner.aromatic => "O8",
        6 => carbonyl_oxygen(molecule, partner.index),
        _ => "OS",
    }
}

fn is_carbonyl(molecule: &Molecule, carbon: usize) -> bool {
    heavy_neighbors(molecule, carbon)
        .iter()
        .any(|n| n.is_double() && n.element == Element::O)
}

/// O9 (aliphatic carbonyl), O10 (aromatic carbonyl) or O11 (carbonyl between heteroatoms).
fn carbonyl_oxygen(molecule: &Molecule, carbon: usize) -> &'static str {
    let hydrogens = molecule.hydrogen_count(carbon);
    let others: Vec<Neighbor> = heavy_neighbors(molecule, carbon)
        .into_iter()
        .filter(|n| !(n.is_double() && n.element == Element::O))
        .collect();
    let double_oxygens = heavy_neighbors(molecule, carbon)
        .iter()
        .filter(|n| n.is_double() && n.element == Element::O)
        .count();

    if hydrogens == 2 || double_oxygens == 2 {
        return "O9";
    }
    if hydrogens == 1 {
        return match others.first() {
            Some(n) if n.aromatic && n.element == Element::C => "O10",
            Some(n) if n.is_aliphatic() && matches!(n.number(), 6 | 7 | 8) => "O9",
            _ => "OS",
        };
    }
    let [first, second] = others.as_slice() else {
        return "OS";
    };
    let pair = [first, second];
    let has_aliphatic_carbon = pair.iter().any(|n| n.is_aliphatic_carbon());
    if has_aliphatic_carbon && pair.iter().all(|n| n.is_aliphatic()) {
        return "O9";
    }
    let has_carbon = pair.iter().any(|n| n.element == Element::C);
    let has_aromatic_carbon = pair.iter().any(|n| n.aromatic && n.element == Element::C);
    let any_aromatic = pair.iter().any(|n| n.aromatic);
    let any_aliphatic = pair.iter().any(|n| n.is_aliphatic());
    if (has_carbon && any_aromatic && (any_aliphatic || pair.iter().all(|n| n.aromatic)))
        || (has_aromatic_carbon && any_aliphatic)
    {
        return "O10";
    }
    if pair.iter().all(|n| n.element != Element::C) {
        return "O11";
    }
    "OS"
}

/// Class of the hydrogens attached to a heavy atom.
pub fn hydrogen_class(molecule: &Molecule, heavy: usize) -> &'static str {
    match molecule.atoms[heavy].element.atomic_number() {
        6 => "H1",
        7 => "H3",
        8 => {
            let partners = heavy_neighbors(molecule, heavy);
            let Some(partner) = partners.first() else {
                return "H2";
            };
            match partner.number() {
                7 => "H3",
                6 if partner.aromatic || connections(molecule, partner.index) == 4 => "H2",
                6 if heavy_neighbors(molecule, partner.index)
                    .iter()
                    .any(|n| n.is_double() && matches!(n.number(), 6 | 7 | 8 | 16)) =>
                {
                    "H4"
                }
                6 => "HS",
                8 | 16 => "H4",
                _ => "H2",
            }
        }
        _ => "H2",
    }
}

/// Octanol/water partition coefficient as the sum of atom contributions.
pub fn logp(molecule: &Molecule) -> f64 {
    let mut total = 0.0;
    for (index, atom) in molecule.atoms.iter().enumerate() {
        if atom.is_hydrogen() {
            total += molecule
                .neighbors(index)
                .find(|&n| !molecule.atoms[n].is_hydrogen())
                .map_or(contribution("HS"), |n| {
                    contribution(hydrogen_class(molecule, n))
                });
            continue;
        }
        total += contribution(heavy_atom_class(molecule, index));
        total += atom.implicit_hydrogens as f64 * contribution(hydrogen_class(molecule, index));
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::topology::BondOrder::{Double, Single, Triple};
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

    fn ring6(elements: [Element; 6]) -> Molecule {
        build(
            &elements,
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

    fn assert_logp(mol: &Molecule, expected: f64) {
        let value = logp(mol);
        assert!((value - expected).abs() < 1e-3, "logP {value:.4}, expected {expected}");
    }

    // CC(=O)Oc1ccccc1C(=O)O
    fn aspirin() -> Molecule {
        const C: Element = Element::C;
        const O: Element = Element::O;
        build(
            &[C, C, O, O, C, C, C, C, C, C, C, O, O],
            &[
                (0, 1, Single),
                (1, 2, Double),
                (1, 3, Single),
                (3, 4, Single),
                (4, 5, Double),
                (5, 6, Single),
                (6, 7, Double),
                (7, 8, Single),
                (8, 9, Double),
                (9, 4, Single),
                (9, 10, Single),
                (10, 11, Double),
                (10, 12, Single),
            ],
        )
    }

    // Cn1c(=O)c2c(ncn2C)n(C)c1=O
    fn caffeine() -> Molecule {
        const C: Element = Element::C;
        const N: Element = Element::N;
        const O: Element = Element::O;
        build(
            &[C, N, C, O, C, C, N, C, N, C, N, C, C, O],
            &[
                (0, 1, Single),
                (1, 2, Single),
                (2, 3, Double),
                (2, 4, Single),
                (4, 5, Double),
                (5, 6, Single),
                (6, 7, Double),
                (7, 8, Single),
                (8, 4, Single),
                (8, 9, Single),
                (5, 10, Single),
                (10, 11, Single),
                (10, 12, Single),
                (12, 1, Single),
                (12, 13, Double),
            ],
        )
    }

    #[test]
    fn aspirin_matches_reference_logp() {
        let mol = aspirin();
        assert_eq!(heavy_atom_class(&mol, 3), "O4");
        assert_eq!(heavy_atom_class(&mol, 2), "O9");
        assert_eq!(heavy_atom_class(&mol, 11), "O10");
        assert_eq!(hydrogen_class(&mol, 12), "H4");
        assert_logp(&mol, 1.3101);
    }

    #[test]
    fn caffeine_matches_reference_logp() {
        let mol = caffeine();
        assert_eq!(heavy_atom_class(&mol, 0), "C9");
        assert_eq!(heavy_atom_class(&mol, 2), "C25");
        assert_eq!(heavy_atom_class(&mol, 4), "C19");
        assert_eq!(heavy_atom_class(&mol, 6), "N11");
        assert_logp(&mol, -1.0293);
    }

    #[test]
    fn small_reference_molecules() {
        const C: Element = Element::C;
        const N: Element = Element::N;
        const O: Element = Element::O;
        assert_logp(&ring6([C; 6]), 1.6866);
        assert_logp(&ring6([N, C, C, C, C, C]), 1.0816);
        assert_logp(&build(&[C, C, O], &[(0, 1, Single), (1, 2, Single)]), -0.0014);

        let hexane = build(&[C; 6], &(0..5).map(|i| (i, i + 1, Single)).collect::<Vec<_>>());
        assert_logp(&hexane, 2.5866);
    }

    #[test]
    fn substituted_benzenes() {
        const C: Element = Element::C;
        const N: Element = Element::N;
        // Aniline and benzonitrile: ring atoms 0-5, substituent from atom 0.
        let mut bonds = vec![
            (0, 1, Double),
            (1, 2, Single),
            (2, 3, Double),
            (3, 4, Single),
            (4, 5, Double),
            (5, 0, Single),
        ];
        bonds.push((0, 6, Single));
        let aniline = build(&[C, C, C, C, C, C, N], &bonds);
        assert_eq!(heavy_atom_class(&aniline, 6), "N3");
        assert_eq!(hydrogen_class(&aniline, 6), "H3");
        assert_logp(&aniline, 1.2688);

        bonds.push((6, 7, Triple));
        let benzonitrile = build(&[C, C, C, C, C, C, C, N], &bonds);
        assert_eq!(heavy_atom_class(&benzonitrile, 6), "C7");
        assert_eq!(heavy_atom_class(&benzonitrile, 7), "N9");
        assert_logp(&benzonitrile, 1.5583);
    }

    #[test]
    fn explicit_hydrogens_do_not_change_the_value() {
        let implicit = build(&[Element::C, Element::O], &[(0, 1, Single)]);
        let mut explicit = Molecule::new("methanol");
        let c = explicit.add_atom(Atom::new(Element::C, Point3::origin()));
        let o = explicit.add_atom(Atom::new(Element::O, Point3::new(1.4, 0.0, 0.0)));
        explicit.add_bond(c, o, Single).unwrap();
        for i in 0..3 {
            let h = explicit.add_atom(Atom::new(Element::H, Point3::new(-0.5, i as f64, 0.5)));
            explicit.add_bond(c, h, Single).unwrap();
        }
        let h = explicit.add_atom(Atom::new(Element::H, Point3::new(1.8, 0.9, 0.0)));
        explicit.add_bond(o, h, Single).unwrap();
        explicit.perceive();
        assert!((logp(&implicit) - logp(&explicit)).abs() < 1e-9);
    }
}
