//! Provides input/output functionality for molecular file formats.
//!
//! Readers are record oriented so that ligand libraries can be streamed one
//! molecule at a time. [`format::Format`] picks the codec from a name or file
//! extension and [`format::MoleculeReader`] wraps it in a lazy iterator that
//! also runs perception on every molecule.

pub mod format;
pub mod mol2;
pub mod pdb;
pub mod pdbqt;
pub mod sdf;
pub mod table;
pub mod traits;
