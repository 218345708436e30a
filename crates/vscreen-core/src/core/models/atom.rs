use super::element::Element;
use nalgebra::Point3;

/// Pharmacophoric and chemical flags of an atom, filled in by perception.
///
/// The set mirrors the per-atom feature table used by interaction
/// fingerprints and pharmacophore-aware shape descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AtomFeatures {
    /// Heavy atom carrying at least one hydrogen that can be donated (N, O).
    pub donor: bool,
    /// Hydrogen attached to a donor atom.
    pub donor_hydrogen: bool,
    /// Atom with a lone pair available for a hydrogen bond.
    pub acceptor: bool,
    /// Carbon bonded only to carbons and hydrogens.
    pub hydrophobe: bool,
    pub aromatic: bool,
    pub halogen: bool,
    /// Positively ionizable or formally positive.
    pub positive: bool,
    /// Negatively ionizable or formally negative.
    pub negative: bool,
    pub metal: bool,
}

/// Represents an atom of a molecule together with its perceived properties.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The chemical element.
    pub element: Element,
    /// The atom name as read from the file (e.g., "CA", "C12").
    pub name: String,
    /// The serial number from the source file, or the 1-based index when absent.
    pub serial: usize,
    /// The 3D coordinates of the atom in Angstroms.
    pub position: Point3<f64>,
    /// The formal charge in elementary charge units.
    pub formal_charge: i8,
    /// The partial atomic charge (read from the file or computed by Gasteiger).
    pub partial_charge: f64,
    /// Aromatic flag (from the input file or from aromaticity perception).
    pub aromatic: bool,
    /// Hydrogens implied by valence but not present as explicit atoms.
    pub implicit_hydrogens: u8,
    /// Index into the owning molecule's residue list.
    pub residue: Option<usize>,
    /// Perceived pharmacophoric features.
    pub features: AtomFeatures,
}

impl Atom {
    /// Creates a new `Atom` with default values for most fields.
    ///
    /// # Arguments
    ///
    /// * `element` - The chemical element.
    /// * `position` - The 3D coordinates of the atom.
    pub fn new(element: Element, position: Point3<f64>) -> Self {
        Self {
            element,
            name: element.symbol().to_string(),
            serial: 0,
            position,
            formal_charge: 0,
            partial_charge: 0.0,
            aromatic: false,
            implicit_hydrogens: 0,
            residue: None,
            features: AtomFeatures::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_charge(mut self, formal_charge: i8) -> Self {
        self.formal_charge = formal_charge;
        self
    }

    pub fn is_hydrogen(&self) -> bool {
        self.element.is_hydrogen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_atom_has_expected_default_fields() {
        let atom = Atom::new(Element::C, Point3::new(1.0, 2.0, 3.0));

        assert_eq!(atom.name, "C");
        assert_eq!(atom.position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(atom.formal_charge, 0);
        assert_eq!(atom.partial_charge, 0.0);
        assert_eq!(atom.implicit_hydrogens, 0);
        assert!(atom.residue.is_none());
        assert_eq!(atom.features, AtomFeatures::default());
    }

    #[test]
    fn builder_helpers_override_name_and_charge() {
        let atom = Atom::new(Element::N, Point3::origin())
            .with_name("NZ")
            .with_charge(1);
        assert_eq!(atom.name, "NZ");
        assert_eq!(atom.formal_charge, 1);
        assert!(!atom.is_hydrogen());
    }
}
