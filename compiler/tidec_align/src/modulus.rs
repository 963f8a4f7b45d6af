//! Symbolic modular-arithmetic summaries: for an expression `e`, a conservative
//! `(modulus, remainder)` pair such that `e % modulus == remainder` for every
//! possible value of `e`'s free variables.
//!
//! This is a local, minimal-but-correct stand-in for the full frontend
//! simplifier/modulus-remainder analysis a complete compiler would supply
//! (constant folding, range analysis, etc.); it only implements enough
//! arithmetic reasoning to drive the alignment oracle in [`crate::oracle`].

use std::collections::HashMap;

use tidec_lir::expr::Expr;

/// `modulus >= 1` always holds. `(1, 0)` means "no information": every integer
/// is `0 mod 1`, so it carries no alignment guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModulusRemainder {
    pub modulus: i64,
    pub remainder: i64,
}

/// A sentinel modulus large enough that no alignment query this pass ever
/// makes (vector byte widths, at most a few hundred) can exceed it. An exact
/// literal constant `c` is summarized as `(EXACT_MODULUS, c % EXACT_MODULUS)`,
/// which is equivalent to "known exactly" without violating `modulus >= 1`.
pub const EXACT_MODULUS: i64 = 1 << 32;

impl ModulusRemainder {
    /// The "no information" summary.
    pub fn unknown() -> Self {
        ModulusRemainder {
            modulus: 1,
            remainder: 0,
        }
    }

    /// The summary for an exact literal constant.
    pub fn exact(value: i64) -> Self {
        ModulusRemainder {
            modulus: EXACT_MODULUS,
            remainder: value.rem_euclid(EXACT_MODULUS),
        }
    }

    /// Whether this summary proves `value % divisor == 0`.
    pub fn proves_divisible_by(&self, divisor: i64) -> bool {
        debug_assert!(divisor >= 1);
        self.modulus % divisor == 0 && self.remainder % divisor == 0
    }
}

/// A lexical scope mapping a variable name to the modular summary of the
/// value it is bound to. Distinct from `context::AlignmentContext`: this one
/// tracks arithmetic divisibility, the other tracks "required vs. known" byte
/// alignment derived from it.
#[derive(Clone, Debug, Default)]
pub struct ModulusScope {
    bindings: HashMap<String, ModulusRemainder>,
}

impl ModulusScope {
    pub fn new() -> Self {
        ModulusScope::default()
    }

    pub fn push(&mut self, name: impl Into<String>, summary: ModulusRemainder) {
        self.bindings.insert(name.into(), summary);
    }

    pub fn pop(&mut self, name: &str) {
        self.bindings.remove(name);
    }

    fn get(&self, name: &str) -> ModulusRemainder {
        self.bindings
            .get(name)
            .copied()
            .unwrap_or_else(ModulusRemainder::unknown)
    }
}

/// Combines the summaries of `a + b`. The sum is divisible by any common
/// divisor of both moduli, with a remainder consistent on both sides.
fn add(a: ModulusRemainder, b: ModulusRemainder) -> ModulusRemainder {
    let m = gcd(a.modulus, b.modulus);
    ModulusRemainder {
        modulus: m,
        remainder: (a.remainder + b.remainder).rem_euclid(m),
    }
}

fn sub(a: ModulusRemainder, b: ModulusRemainder) -> ModulusRemainder {
    let m = gcd(a.modulus, b.modulus);
    ModulusRemainder {
        modulus: m,
        remainder: (a.remainder - b.remainder).rem_euclid(m),
    }
}

/// Combines the summaries of `a * b`. The product's modulus is the product of
/// the two moduli (a conservative but sound bound), unless one side is exactly
/// known, in which case the modulus scales directly.
fn mul(a: ModulusRemainder, b: ModulusRemainder) -> ModulusRemainder {
    if a.modulus == EXACT_MODULUS && b.modulus == EXACT_MODULUS {
        return ModulusRemainder::exact(a.remainder * b.remainder);
    }
    if a.modulus == EXACT_MODULUS {
        let m = (b.modulus.saturating_mul(a.remainder.unsigned_abs() as i64)).max(1);
        return ModulusRemainder {
            modulus: m,
            remainder: (a.remainder * b.remainder).rem_euclid(m),
        };
    }
    if b.modulus == EXACT_MODULUS {
        return mul(b, a);
    }
    let m = a.modulus.saturating_mul(b.modulus).max(1);
    ModulusRemainder {
        modulus: m,
        remainder: (a.remainder * b.remainder).rem_euclid(m),
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a.max(1)
}

/// Computes the modular summary of `expr` under `scope`.
pub fn analyze(expr: &Expr, scope: &ModulusScope) -> ModulusRemainder {
    match expr {
        Expr::IntImm(v) => ModulusRemainder::exact(*v),
        Expr::Var(name) => scope.get(name),
        Expr::Add(a, b) => add(analyze(a, scope), analyze(b, scope)),
        Expr::Sub(a, b) => sub(analyze(a, scope), analyze(b, scope)),
        Expr::Mul(a, b) => mul(analyze(a, scope), analyze(b, scope)),
        // Ramp's base is what matters for alignment of lane 0; the stride is a
        // property of the vector shape, not a divisibility fact about a scalar.
        Expr::Ramp { base, .. } => analyze(base, scope),
        Expr::Let { name, value, body } => {
            let mut inner = scope.clone();
            inner.push(name.clone(), analyze(value, scope));
            analyze(body, &inner)
        }
        // Loads and intrinsic calls carry no arithmetic divisibility information here.
        Expr::Load { .. } | Expr::Call { .. } => ModulusRemainder::unknown(),
    }
}

/// Reduces `expr` modulo `modulus`, returning the known remainder if `expr`'s
/// summary proves it, or `None` if the modulus analysis can't determine it.
pub fn reduce_expr_modulo(expr: &Expr, modulus: i64, scope: &ModulusScope) -> Option<i64> {
    debug_assert!(modulus >= 1);
    let summary = analyze(expr, scope);
    if summary.modulus % modulus == 0 {
        Some(summary.remainder.rem_euclid(modulus))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_is_exact() {
        let scope = ModulusScope::new();
        assert_eq!(reduce_expr_modulo(&Expr::IntImm(16), 16, &scope), Some(0));
        assert_eq!(reduce_expr_modulo(&Expr::IntImm(18), 16, &scope), Some(2));
    }

    #[test]
    fn unknown_var_proves_nothing() {
        let scope = ModulusScope::new();
        assert_eq!(
            reduce_expr_modulo(&Expr::Var("x".to_string()), 16, &scope),
            None
        );
    }

    #[test]
    fn sum_of_known_multiples_is_known() {
        let mut scope = ModulusScope::new();
        scope.push(
            "x",
            ModulusRemainder {
                modulus: 16,
                remainder: 0,
            },
        );
        let e = Expr::Add(
            Box::new(Expr::Var("x".to_string())),
            Box::new(Expr::IntImm(32)),
        );
        assert_eq!(reduce_expr_modulo(&e, 16, &scope), Some(0));
    }

    #[test]
    fn let_binding_is_scoped() {
        let scope = ModulusScope::new();
        let e = Expr::Let {
            name: "x".to_string(),
            value: Box::new(Expr::IntImm(48)),
            body: Box::new(Expr::Var("x".to_string())),
        };
        assert_eq!(reduce_expr_modulo(&e, 16, &scope), Some(0));
        // the binding must not leak outside the Let
        assert_eq!(reduce_expr_modulo(&Expr::Var("x".to_string()), 16, &scope), None);
    }
}
