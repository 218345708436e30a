//! Derives chemical properties that structure files leave implicit.
//!
//! Perception runs in a fixed order because later steps consume the results
//! of earlier ones: ring membership feeds aromaticity, aromaticity and
//! hydrogen counts feed the pharmacophoric atom features, and everything
//! feeds the Gasteiger charge model.
//!
//! - [`rings`] - smallest rings through every ring bond
//! - [`hydrogens`] - implicit hydrogen counts from default valences
//! - [`aromaticity`] - Hückel aromaticity, or ring planarity when bond orders are unknown
//! - [`features`] - donor/acceptor/hydrophobe/charge flags per atom
//! - [`templates`] - residue templates for protein atoms
//! - [`charges`] - Gasteiger-Marsili partial charges
//! - [`bonds`] - distance-based connectivity for formats without bond records

use crate::core::models::molecule::Molecule;

pub mod aromaticity;
pub mod bonds;
pub mod charges;
pub mod features;
pub mod hydrogens;
pub mod rings;
pub mod templates;

/// Runs every perception step on a molecule in dependency order.
pub fn perceive(molecule: &mut Molecule) {
    rings::perceive_rings(molecule);
    if molecule.bond_orders_known {
        hydrogens::assign_implicit_hydrogens(molecule);
    }
    aromaticity::perceive_aromaticity(molecule);
    features::assign_features(molecule);
    if !molecule.charges_from_file {
        charges::assign_gasteiger_charges(molecule);
    }
}
