//! # Core Models Module
//!
//! This module contains the data structures used to represent molecules read
//! from structure files, from small-molecule ligands to whole receptors.
//!
//! ## Overview
//!
//! A [`molecule::Molecule`] owns its atoms, bonds and residues, keeps an
//! adjacency list for graph algorithms, and carries an ordered map of string
//! annotations (SDF data items, docking scores). Properties that files leave
//! implicit are filled in by [`crate::core::perception`].
//!
//! ## Key Components
//!
//! - [`element`] - Element table with masses, covalent radii and default valences
//! - [`atom`] - Atom coordinates, charges and perceived pharmacophoric features
//! - [`topology`] - Bond orders and bond flags
//! - [`residue`] - Residue records and amino acid classification
//! - [`molecule`] - The molecule graph with annotations
//!
//! ## Usage
//!
//! ```ignore
//! use vscreen::core::models::{atom::Atom, element::Element, molecule::Molecule};
//! use vscreen::core::models::topology::BondOrder;
//!
//! let mut mol = Molecule::new("methanol");
//! let c = mol.add_atom(Atom::new(Element::C, Point3::new(0.0, 0.0, 0.0)));
//! let o = mol.add_atom(Atom::new(Element::O, Point3::new(1.43, 0.0, 0.0)));
//! mol.add_bond(c, o, BondOrder::Single)?;
//! mol.perceive();
//! ```

pub mod atom;
pub mod element;
pub mod molecule;
pub mod residue;
pub mod topology;
