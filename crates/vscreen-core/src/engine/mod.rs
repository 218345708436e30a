//! # Engine Module
//!
//! The stage implementations behind the screening pipeline.
//!
//! ## Overview
//!
//! Every pipeline operation is a per-molecule function run over a lazy
//! stream in chunks. This module provides those functions and the machinery
//! that runs them: rule filters, shape and interaction-fingerprint
//! similarity, the AutoDock Vina driver, and the chunked parallel map.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - pipeline and docking parameter builders
//! - **Error Handling** ([`error`]) - the single error type carried through streams
//! - **Progress Monitoring** ([`progress`]) - callbacks for stage and chunk events
//! - **Parallel Dispatch** ([`parallel`]) - worker pool and the chunked stream adaptor
//! - **Filters** ([`filters`]) - `ro5`, `ro3`, `pains` and descriptor expressions
//! - **Similarity** ([`similarity`], [`shape`], [`interactions`]) - USR family and IFP/SIFP
//! - **Docking** ([`vina`]) - scoring and docking through the Vina executable
//! - **Spatial** ([`spatial`]) - symmetry-aware RMSD between poses

pub mod config;
pub mod error;
pub mod filters;
pub mod interactions;
pub mod parallel;
pub mod progress;
pub mod shape;
pub mod similarity;
pub mod spatial;
pub mod vina;
