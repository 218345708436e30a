//! # Workflows Module
//!
//! High-level entry points that chain the engine stages into a screening run.
//!
//! ## Overview
//!
//! A workflow owns the worker pool, the progress reporter and the lazy
//! molecule stream. Stages are queued by method calls and nothing is read or
//! computed until the results are fetched or written.
//!
//! ## Architecture
//!
//! - **Virtual Screening** ([`virtual_screening`]) - Loading ligand libraries,
//!   Vina scoring and docking, rule filters, similarity searches and output.

pub mod virtual_screening;
