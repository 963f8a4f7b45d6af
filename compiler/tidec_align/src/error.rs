//! Errors reported by the load-alignment-rewriting pass.

use tidec_lir::expr::DeviceApi;

/// An error reported by [`crate::rewrite_loads`].
///
/// Unlike most of the ambient compiler, this pass treats its single invariant
/// violation as a recoverable `Result::Err` rather than a panic, since it is
/// reached from a `For` loop's device tag that a prior, unrelated pass could
/// plausibly get wrong — see the module docs on [`crate::target_policy`].
#[derive(Debug)]
pub enum AlignError {
    /// A `For` loop was tagged for the wide-vector DSP without a recognized
    /// vector-width mode (`DeviceApi::Hvx(None)`).
    UnrecognizedHvxMode { loop_var: String, device_api: DeviceApi },
}

impl std::fmt::Display for AlignError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignError::UnrecognizedHvxMode { loop_var, device_api } => write!(
                f,
                "loop `{}` is tagged for the wide-vector DSP but carries no recognized vector-width mode: {:?}",
                loop_var, device_api
            ),
        }
    }
}

impl std::error::Error for AlignError {}
