//! The traversal driver: walks a [`Stmt`]/[`Expr`] tree in a single post-order
//! pass, threading an [`AlignmentContext`] and a [`ModulusScope`] through the
//! recursion and handing every `Load` node to [`crate::rewrite::rewrite_load`].
//!
//! Ordering is post-order — children are rewritten before their parent is
//! inspected — with one exception: a `Load` rewritten into a synthesized
//! `ShuffleVector`/`ConcatVectors`/`Load` tree is recursively re-entered, since
//! those synthesized nodes were never visited by the surrounding recursion.
//! This terminates because a synthesized `Load` is built already aligned, so
//! re-entering it can rewrite it at most once more before `rewrite_load` finds
//! nothing left to do.

use tidec_abi::target::LirTarget;
use tidec_lir::expr::{Expr, Stmt};
use tracing::instrument;

use crate::context::AlignmentContext;
use crate::error::AlignError;
use crate::modulus::{self, ModulusScope};
use crate::oracle;
use crate::rewrite;
use crate::target_policy;

/// Rewrites every load in `stmt` to satisfy each enclosing loop's required
/// alignment, given `target`'s host vector width and device-mode policy.
#[instrument(skip(stmt, target))]
pub fn rewrite_stmt(stmt: Stmt, target: &LirTarget) -> Result<Stmt, AlignError> {
    let mut ctx = AlignmentContext::new(target_policy::host_required_alignment(target));
    let mut mscope = ModulusScope::new();
    rewrite_stmt_inner(stmt, target, &mut ctx, &mut mscope)
}

fn rewrite_stmt_inner(
    stmt: Stmt,
    target: &LirTarget,
    ctx: &mut AlignmentContext,
    mscope: &mut ModulusScope,
) -> Result<Stmt, AlignError> {
    match stmt {
        Stmt::LetStmt { name, value, body } => {
            let value = rewrite_expr(value, ctx, mscope);
            let alignment = oracle::scalar_known_alignment(&value, mscope);
            let summary = modulus::analyze(&value, mscope);

            ctx.push_binding(name.clone(), alignment);
            mscope.push(name.clone(), summary);
            let body = rewrite_stmt_inner(*body, target, ctx, mscope);
            ctx.pop_binding(&name);
            mscope.pop(&name);

            Ok(Stmt::LetStmt {
                name,
                value,
                body: Box::new(body?),
            })
        }
        Stmt::For {
            var,
            min,
            extent,
            device_api,
            body,
        } => {
            let min = rewrite_expr(min, ctx, mscope);
            let extent = rewrite_expr(extent, ctx, mscope);
            let required_alignment = target_policy::required_alignment_for(target, &var, device_api)?;

            let previous = ctx.enter_loop(required_alignment);
            let body = rewrite_stmt_inner(*body, target, ctx, mscope);
            ctx.exit_loop(previous);

            Ok(Stmt::For {
                var,
                min,
                extent,
                device_api,
                body: Box::new(body?),
            })
        }
        Stmt::Store {
            buffer,
            index,
            value,
        } => Ok(Stmt::Store {
            buffer,
            index: rewrite_expr(index, ctx, mscope),
            value: rewrite_expr(value, ctx, mscope),
        }),
        Stmt::Evaluate(expr) => Ok(Stmt::Evaluate(rewrite_expr(expr, ctx, mscope))),
        Stmt::Block(stmts) => {
            let mut rewritten = Vec::with_capacity(stmts.len());
            for s in stmts {
                rewritten.push(rewrite_stmt_inner(s, target, ctx, mscope)?);
            }
            Ok(Stmt::Block(rewritten))
        }
    }
}

fn rewrite_expr(expr: Expr, ctx: &mut AlignmentContext, mscope: &mut ModulusScope) -> Expr {
    match expr {
        Expr::IntImm(_) | Expr::Var(_) => expr,
        Expr::Add(a, b) => Expr::Add(
            Box::new(rewrite_expr(*a, ctx, mscope)),
            Box::new(rewrite_expr(*b, ctx, mscope)),
        ),
        Expr::Sub(a, b) => Expr::Sub(
            Box::new(rewrite_expr(*a, ctx, mscope)),
            Box::new(rewrite_expr(*b, ctx, mscope)),
        ),
        Expr::Mul(a, b) => Expr::Mul(
            Box::new(rewrite_expr(*a, ctx, mscope)),
            Box::new(rewrite_expr(*b, ctx, mscope)),
        ),
        Expr::Ramp {
            ty,
            base,
            stride,
            lanes,
        } => Expr::Ramp {
            ty,
            base: Box::new(rewrite_expr(*base, ctx, mscope)),
            stride: Box::new(rewrite_expr(*stride, ctx, mscope)),
            lanes,
        },
        Expr::Call { ty, intrinsic, args } => Expr::Call {
            ty,
            intrinsic,
            args: args
                .into_iter()
                .map(|a| rewrite_expr(a, ctx, mscope))
                .collect(),
        },
        Expr::Let { name, value, body } => {
            let value = rewrite_expr(*value, ctx, mscope);
            let alignment = oracle::scalar_known_alignment(&value, mscope);
            let summary = modulus::analyze(&value, mscope);

            ctx.push_binding(name.clone(), alignment);
            mscope.push(name.clone(), summary);
            let body = rewrite_expr(*body, ctx, mscope);
            ctx.pop_binding(&name);
            mscope.pop(&name);

            Expr::Let {
                name,
                value: Box::new(value),
                body: Box::new(body),
            }
        }
        Expr::Load {
            ty,
            buffer,
            index,
            image,
            param,
        } => {
            let index = rewrite_expr(*index, ctx, mscope);
            let candidate = rewrite::rewrite_load(ty, &buffer, &index, image, param, ctx, mscope);
            match &candidate {
                // rewrite_load left the node as a plain Load: either nothing
                // needed rewriting, or it's an unsupported shape. Either way
                // its index was already rewritten above; don't re-enter it.
                Expr::Load { .. } => candidate,
                // A synthesized shuffle/concat/load tree: re-enter it so any
                // nested `Load`/`Call` it contains is visited once more.
                _ => rewrite_expr(candidate, ctx, mscope),
            }
        }
    }
}
