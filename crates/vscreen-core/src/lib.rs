//! # vscreen Core Library
//!
//! A library for structure-based and ligand-based virtual screening of
//! small-molecule libraries.
//!
//! ## Architectural Philosophy
//!
//! The library is split into three layers with a strict dependency direction.
//!
//! - **[`core`]: The Foundation.** Stateless molecule models, file codecs,
//!   chemical perception, descriptors and SMARTS substructure search.
//!
//! - **[`engine`]: The Logic Core.** Per-molecule stage functions (filters,
//!   shape and interaction fingerprints, the AutoDock Vina driver) and the
//!   chunked parallel map that runs them over lazy streams.
//!
//! - **[`workflows`]: The Public API.** The [`workflows::virtual_screening::VirtualScreening`]
//!   pipeline, which chains loading, filtering, similarity, scoring and docking
//!   stages and writes the surviving molecules.

pub mod core;
pub mod engine;
pub mod workflows;
