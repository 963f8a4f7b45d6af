//! The tree-shaped expression/statement IR consumed and produced by the
//! load-alignment-rewriting pass (`tidec_align`).
//!
//! This is deliberately a separate sub-language from [`crate::syntax`]'s
//! basic-block-oriented `Statement`/`Terminator`: the latter models a compiled
//! function's control-flow graph, while this module models the body of a single
//! vectorized kernel region as a nested tree, the way a loop nest with lexically
//! scoped lets reads in a source language. A `For` over a device API (see
//! [`DeviceApi`]) nests one of these trees; nothing outside this pass rewrites it.

use tidec_abi::size_and_align::Align;

/// The scalar element type carried by an [`ExprTy`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElemTy {
    Int8,
    Int16,
    Int32,
    Int64,
}

impl ElemTy {
    /// The width of one element, in bytes.
    pub fn bytes(self) -> u32 {
        match self {
            ElemTy::Int8 => 1,
            ElemTy::Int16 => 2,
            ElemTy::Int32 => 4,
            ElemTy::Int64 => 8,
        }
    }
}

/// The type of an [`Expr`]: a scalar element type plus a lane count.
///
/// `lanes == 1` means scalar; `lanes > 1` means vector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExprTy {
    pub elem: ElemTy,
    pub lanes: u32,
}

impl ExprTy {
    pub fn scalar(elem: ElemTy) -> Self {
        ExprTy { elem, lanes: 1 }
    }

    pub fn vector(elem: ElemTy, lanes: u32) -> Self {
        ExprTy { elem, lanes }
    }

    pub fn is_vector(self) -> bool {
        self.lanes > 1
    }

    pub fn with_lanes(self, lanes: u32) -> Self {
        ExprTy { lanes, ..self }
    }
}

/// Marker for an external image handle: when a [`Expr::Load`] carries one, the
/// buffer's base address is opaque to this pass and not known to satisfy any
/// particular alignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageHandle;

/// A user-declared host alignment (in bytes) for a buffer passed in as a parameter.
///
/// Stored as `tidec_abi::size_and_align::Align` rather than a bare `u32`:
/// the oracle's `gcd`-via-`min` shortcut (`tidec_align::oracle::gcd_pow2`) is
/// only sound when both operands are powers of two, so this is validated once
/// at construction rather than trusted at every call site.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamHandle {
    host_alignment: Align,
}

impl ParamHandle {
    /// Panics if `host_alignment_bytes` is not a power of two (or zero).
    pub fn new(host_alignment_bytes: u32) -> Self {
        ParamHandle {
            host_alignment: Align::from_bytes(host_alignment_bytes as u64)
                .expect("param host alignment must be a power of two"),
        }
    }

    pub fn host_alignment_bytes(self) -> u32 {
        self.host_alignment.bytes() as u32
    }
}

/// The pure intrinsics this pass synthesizes (and the only `Call` tags it inspects).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intrinsic {
    /// Lane-wise concatenation of its (vector) arguments.
    ConcatVectors,
    /// `args[0]` is the source vector; `args[1..]` are `Expr::IntImm` lane indices.
    ShuffleVector,
}

/// An expression node.
///
/// Only `Ramp`, `Load`, `Call`, and `Let` are specially inspected by the
/// alignment-rewriting pass; every other variant is passed through via generic
/// recursion into its children (see `tidec_align::traversal`).
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal integer constant (scalar).
    IntImm(i64),
    /// A reference to a let-bound or loop-bound name (scalar, unless noted otherwise).
    Var(String),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    /// `base + i*stride` for `i` in `[0, lanes)`.
    Ramp {
        ty: ExprTy,
        base: Box<Expr>,
        stride: Box<Expr>,
        lanes: u32,
    },
    Load {
        ty: ExprTy,
        buffer: String,
        index: Box<Expr>,
        image: Option<ImageHandle>,
        param: Option<ParamHandle>,
    },
    Call {
        ty: ExprTy,
        intrinsic: Intrinsic,
        args: Vec<Expr>,
    },
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
    },
}

impl Expr {
    /// Builds `Ramp(base, stride, lanes)` with `ty` derived from `elem`.
    pub fn ramp(elem: ElemTy, base: Expr, stride: Expr, lanes: u32) -> Expr {
        Expr::Ramp {
            ty: ExprTy::vector(elem, lanes),
            base: Box::new(base),
            stride: Box::new(stride),
            lanes,
        }
    }

    /// Builds an internal-buffer dense load: `Load(ty, buffer, index, None, None)`.
    pub fn load(ty: ExprTy, buffer: impl Into<String>, index: Expr) -> Expr {
        Expr::Load {
            ty,
            buffer: buffer.into(),
            index: Box::new(index),
            image: None,
            param: None,
        }
    }

    pub fn with_param(mut self, param: ParamHandle) -> Expr {
        if let Expr::Load { param: p, .. } = &mut self {
            *p = Some(param);
        }
        self
    }

    pub fn with_image(mut self, image: ImageHandle) -> Expr {
        if let Expr::Load { image: i, .. } = &mut self {
            *i = Some(image);
        }
        self
    }

    /// The type of this expression, if it carries one directly (vector-shaped
    /// or cached on construction). Scalar leaves without a cached type (`Var`,
    /// arithmetic on scalars) are not resolvable without a symbol table, and
    /// this pass never needs their type — only `Ramp`, `Load`, and `Call` lanes
    /// matter for the rewrite.
    pub fn ty(&self) -> Option<ExprTy> {
        match self {
            Expr::Ramp { ty, .. } | Expr::Load { ty, .. } | Expr::Call { ty, .. } => Some(*ty),
            Expr::Let { body, .. } => body.ty(),
            _ => None,
        }
    }

    /// The lane count of this expression, treating untyped leaves as scalar.
    pub fn lanes(&self) -> u32 {
        self.ty().map(|t| t.lanes).unwrap_or(1)
    }
}

/// The device API a [`Stmt::For`] loop is tagged with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceApi {
    /// Ordinary host execution; the Target Policy's required alignment is unaffected.
    Host,
    /// The wide-vector DSP. `Some(mode)` selects the vector width; `None` means
    /// the loop was tagged for the DSP without a recognized width mode, which is
    /// an internal invariant violation (see `tidec_align::error::AlignError`).
    Hvx(Option<HvxMode>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HvxMode {
    Hvx64,
    Hvx128,
}

/// A statement node.
#[derive(Clone, Debug, PartialEq)]
pub enum Stmt {
    LetStmt {
        name: String,
        value: Expr,
        body: Box<Stmt>,
    },
    For {
        var: String,
        min: Expr,
        extent: Expr,
        device_api: DeviceApi,
        body: Box<Stmt>,
    },
    /// Stores `value` to `buffer[index]`; the only place an `Expr` tree's
    /// value is actually observed for semantic-preservation purposes.
    Store {
        buffer: String,
        index: Expr,
        value: Expr,
    },
    /// Evaluates an expression purely for any loads/side effects it contains.
    Evaluate(Expr),
    Block(Vec<Stmt>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_ty_tracks_lanes() {
        let r = Expr::ramp(ElemTy::Int8, Expr::IntImm(0), Expr::IntImm(1), 16);
        assert_eq!(r.lanes(), 16);
        assert_eq!(r.ty().unwrap().elem, ElemTy::Int8);
    }

    #[test]
    fn load_defaults_to_internal() {
        let l = Expr::load(
            ExprTy::vector(ElemTy::Int8, 16),
            "buf",
            Expr::ramp(ElemTy::Int8, Expr::IntImm(0), Expr::IntImm(1), 16),
        );
        match l {
            Expr::Load { image, param, .. } => {
                assert!(image.is_none());
                assert!(param.is_none());
            }
            _ => panic!("expected Load"),
        }
    }
}
