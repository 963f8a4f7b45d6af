//! Decides whether a load's address is known to satisfy a required alignment.
//!
//! Combines two independently-tracked facts: the known alignment of the
//! buffer's base address (from [`crate::context::AlignmentContext`], seeded by
//! a `Param`/`Image` handle's declared host alignment), and the modular
//! divisibility of the byte offset contributed by the index expression (from
//! [`crate::modulus`]). The sum of a multiple of `A` and a multiple of `B` is
//! only guaranteed to be a multiple of `gcd(A, B)`, so the two are combined
//! that way rather than added.

use tidec_lir::expr::Expr;

use crate::modulus::{reduce_expr_modulo, ModulusScope};

/// The largest power of two this pass ever needs to query or prove; bounding
/// the search keeps `largest_known_alignment` a small fixed number of checks
/// regardless of how large a modulus summary's sentinel is.
const MAX_QUERIED_ALIGNMENT: u32 = 1 << 16;

/// The largest power-of-two byte alignment provably satisfied by `index *
/// elem_bytes`, the byte offset an index expression contributes to a load's
/// address, under `scope`.
fn largest_known_index_alignment(index: &Expr, elem_bytes: u32, scope: &ModulusScope) -> u32 {
    let mut candidate = MAX_QUERIED_ALIGNMENT;
    while candidate > 1 {
        let byte_modulus = candidate as i64;
        if byte_modulus % elem_bytes as i64 == 0 {
            let elem_modulus = byte_modulus / elem_bytes as i64;
            if reduce_expr_modulo(index, elem_modulus, scope) == Some(0) {
                return candidate;
            }
        }
        candidate /= 2;
    }
    1
}

/// The largest power-of-two byte alignment provably satisfied by a load of
/// `elem_bytes`-wide elements at `index`, given the buffer's own known base
/// alignment `buffer_alignment` (from a `Param`/`Image` handle, or `1` for an
/// internal buffer with no declared alignment).
pub fn largest_known_alignment(
    index: &Expr,
    elem_bytes: u32,
    buffer_alignment: u32,
    scope: &ModulusScope,
) -> u32 {
    let index_term = largest_known_index_alignment(index, elem_bytes, scope);
    gcd_pow2(index_term, buffer_alignment.max(1))
}

/// The largest power-of-two byte alignment provably satisfied by a scalar
/// expression's value, treated as a byte offset in its own right (as opposed
/// to an index scaled by an element width). Used to derive the known
/// alignment a `Let`-bound name contributes to the context.
pub fn scalar_known_alignment(value: &Expr, scope: &ModulusScope) -> u32 {
    largest_known_index_alignment(value, 1, scope)
}

/// Whether a load at `index` into a buffer known to be aligned to
/// `buffer_alignment` bytes is known to satisfy `required_alignment`.
pub fn is_aligned(
    index: &Expr,
    elem_bytes: u32,
    buffer_alignment: u32,
    required_alignment: u32,
    scope: &ModulusScope,
) -> bool {
    largest_known_alignment(index, elem_bytes, buffer_alignment, scope) >= required_alignment
}

fn gcd_pow2(a: u32, b: u32) -> u32 {
    a.min(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modulus::ModulusRemainder;

    #[test]
    fn literal_index_is_exactly_known() {
        let scope = ModulusScope::new();
        let idx = Expr::IntImm(32);
        assert!(is_aligned(&idx, 1, 1, 32, &scope));
        assert!(!is_aligned(&idx, 1, 1, 64, &scope));
    }

    #[test]
    fn unknown_var_index_is_unaligned() {
        let scope = ModulusScope::new();
        let idx = Expr::Var("x".to_string());
        assert!(!is_aligned(&idx, 1, 1, 16, &scope));
    }

    #[test]
    fn buffer_alignment_caps_the_result() {
        let mut scope = ModulusScope::new();
        scope.push(
            "x",
            ModulusRemainder {
                modulus: 1024,
                remainder: 0,
            },
        );
        let idx = Expr::Var("x".to_string());
        // index alone proves up to 1024-byte alignment, but the buffer is only
        // known to be 16-byte aligned, so the combined result is capped there.
        assert_eq!(largest_known_alignment(&idx, 1, 16, &scope), 16);
    }
}
