//! ABI- and target-layout-related types shared across the `tidec` compiler.
//!
//! This crate has no dependency on `tidec_lir`: it describes sizes, alignments,
//! and target data layouts in terms of primitive integers and bytes, so that
//! both the LIR crate and the alignment-rewriting pass can depend on it without
//! a cycle.

pub mod layout;
pub mod size_and_align;
pub mod target;
