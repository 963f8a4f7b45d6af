//! The load-alignment-rewriting pass.
//!
//! Given a [`tidec_lir::expr::Stmt`] tree and a target description, rewrites
//! every vector `Load` so that it satisfies the alignment its enclosing loop
//! requires — widening and shuffling misaligned dense loads, deinterleaving
//! misaligned stride-2 loads, and leaving everything else untouched. See
//! [`rewrite_loads`] for the entry point.

// tidy-alphabetical-start
pub mod context;
pub mod error;
pub mod modulus;
pub mod oracle;
pub mod rewrite;
pub mod shuffle;
pub mod target_policy;
pub mod traversal;
// tidy-alphabetical-end

use tidec_abi::target::LirTarget;
use tidec_lir::expr::Stmt;

pub use error::AlignError;

/// Rewrites `stmt` so that every vector load it contains satisfies the
/// alignment required by its enclosing loop on `target`, synthesizing
/// widened-load-plus-shuffle sequences where a load isn't already aligned.
///
/// Returns [`AlignError::UnrecognizedHvxMode`] if a loop is tagged for the
/// wide-vector DSP without a recognized vector-width mode.
pub fn rewrite_loads(stmt: Stmt, target: &LirTarget) -> Result<Stmt, AlignError> {
    traversal::rewrite_stmt(stmt, target)
}
