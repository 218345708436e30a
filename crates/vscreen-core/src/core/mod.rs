//! # Core Module
//!
//! This module provides the stateless chemistry that the screening stages are
//! built on.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds, residues and annotated molecules
//! - **File I/O** ([`io`]) - Streaming SDF, MOL2, PDB and PDBQT readers and writers, CSV tables
//! - **Perception** ([`perception`]) - Rings, aromaticity, hydrogens, atom features and charges
//! - **Descriptors** ([`descriptors`], [`crippen`]) - Molecular weight, logP, H-bond counts and friends
//! - **Substructure Search** ([`smarts`]) - A SMARTS subset with a backtracking matcher
//! - **Structural Alerts** ([`alerts`]) - Named SMARTS catalogs such as PAINS
//! - **Geometry** ([`utils`]) - Centroids and plane fitting
//!
//! Nothing in this module holds state between calls, so every function can be
//! used from the worker threads of the pipeline without synchronization.

pub mod alerts;
pub mod crippen;
pub mod descriptors;
pub mod io;
pub mod models;
pub mod perception;
pub mod smarts;
pub mod utils;
