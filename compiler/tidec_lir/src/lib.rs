//! The Low-level Intermediate Representation (LIR) of the `tidec` compiler.
//!
//! This crate defines two coexisting IRs:
//! - [`syntax`]/[`lir`]/[`basic_blocks`]: the basic-block-oriented CFG IR a
//!   function body is lowered into, consumed by the rest of the compiler
//!   backend.
//! - [`expr`]: a tree-shaped expression/statement IR for a single vectorized
//!   kernel region, consumed and produced by `tidec_align`.

// tidy-alphabetical-start
pub mod basic_blocks;
pub mod expr;
pub mod layout_ctx;
pub mod lir;
pub mod syntax;
// tidy-alphabetical-end
