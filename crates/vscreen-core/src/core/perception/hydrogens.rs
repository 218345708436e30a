use crate::core::models::element::Element;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::BondOrder;

/// Valence used when filling implicit hydrogens.
///
/// Aromatic bonds count as single bonds plus one shared pi bond per atom, so
/// a benzene carbon has valence 3 and a ring-fusion carbon valence 4. Chalcogens
/// donate a lone pair to the ring instead of a pi bond.
fn hydrogen_valence(molecule: &Molecule, atom: usize) -> u8 {
    let mut valence = 0u8;
    let mut aromatic = false;
    for &(_, bond) in molecule.bonds_of(atom) {
        match molecule.bonds[bond].order {
            BondOrder::Aromatic => {
                valence += 1;
                aromatic = true;
            }
            order => valence += order as u8,
        }
    }
    let element = molecule.atoms[atom].element;
    if aromatic && !matches!(element.atomic_number(), 8 | 16 | 34) {
        valence += 1;
    }
    valence
}

/// Fills `implicit_hydrogens` from the smallest default valence that fits the explicit bonds.
///
/// Only meaningful for formats that carry bond orders; atoms outside the
/// organic subset, and atoms already saturated, get zero.
pub fn assign_implicit_hydrogens(molecule: &mut Molecule) {
    for index in 0..molecule.atoms.len() {
        let atom = &molecule.atoms[index];
        if atom.element == Element::H || atom.element == Element::DUMMY {
            molecule.atoms[index].implicit_hydrogens = 0;
            continue;
        }
        let valence = hydrogen_valence(molecule, index);
        let implicit = atom
            .element
            .default_valences(atom.formal_charge)
            .iter()
            .find(|&&v| v >= valence)
            .map_or(0, |&v| v - valence);
        molecule.atoms[index].implicit_hydrogens = implicit;
    }
}
