//! Synthesizes the `ConcatVectors`/`ShuffleVector` intrinsic calls the load
//! rewriter in [`crate::rewrite`] uses to realize a misaligned load out of
//! aligned ones.

use tidec_lir::expr::{Expr, ExprTy, ImageHandle, Intrinsic, ParamHandle};

/// Builds a dense load of `lanes` elements starting at `base_index`, carrying
/// the same buffer identity (and `image`/`param` handle, if any) as the load
/// it's widening.
pub fn dense_load(
    elem_ty: ExprTy,
    buffer: &str,
    base_index: Expr,
    lanes: u32,
    image: Option<ImageHandle>,
    param: Option<ParamHandle>,
) -> Expr {
    let ty = elem_ty.with_lanes(lanes);
    let ramp = Expr::ramp(elem_ty.elem, base_index, Expr::IntImm(1), lanes);
    Expr::Load {
        ty,
        buffer: buffer.to_string(),
        index: Box::new(ramp),
        image,
        param,
    }
}

/// `ConcatVectors(parts)`, typed with the sum of `parts`' lane counts.
pub fn concat(parts: Vec<Expr>, elem_ty: ExprTy) -> Expr {
    let lanes = parts.iter().map(|p| p.lanes()).sum();
    Expr::Call {
        ty: elem_ty.with_lanes(lanes),
        intrinsic: Intrinsic::ConcatVectors,
        args: parts,
    }
}

/// `ShuffleVector(source, lane_indices...)`, selecting `lane_indices.len()`
/// lanes out of `source`.
pub fn shuffle(source: Expr, lane_indices: &[i64], elem_ty: ExprTy) -> Expr {
    let mut args = Vec::with_capacity(lane_indices.len() + 1);
    args.push(source);
    args.extend(lane_indices.iter().map(|&i| Expr::IntImm(i)));
    Expr::Call {
        ty: elem_ty.with_lanes(lane_indices.len() as u32),
        intrinsic: Intrinsic::ShuffleVector,
        args,
    }
}

/// Lane indices selecting a contiguous run `[offset, offset + lanes)` out of a
/// wider source vector — the shuffle a dense unit-stride realignment needs.
pub fn contiguous_lane_indices(offset: i64, lanes: u32) -> Vec<i64> {
    (0..lanes as i64).map(|i| offset + i).collect()
}

/// Lane indices deinterleaving a `2*lanes`-wide concatenation of two
/// contiguous tiles back into the `lanes` even-position elements of a
/// stride-2 load: the first half picks `2i` out of the low tile, the second
/// half picks `2i + b_shift` out of the (possibly lane-shifted) high tile.
pub fn stride2_deinterleave_indices(lanes: u32, b_shift: i64) -> Vec<i64> {
    let half = lanes as i64 / 2;
    (0..lanes as i64)
        .map(|i| if i < half { 2 * i } else { 2 * i + b_shift })
        .collect()
}
