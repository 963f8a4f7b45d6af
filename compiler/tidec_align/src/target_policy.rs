//! Maps a target and a `For` loop's device API to the required alignment, in
//! bytes, a vector load in that loop's body must satisfy.

use tidec_abi::target::{LirTarget, TargetFeature};
use tidec_lir::expr::{DeviceApi, HvxMode};

use crate::error::AlignError;

/// The required alignment, in bytes, for ordinary host execution: the
/// target's natural vector register width.
pub fn host_required_alignment(target: &LirTarget) -> u32 {
    target.natural_vector_bytes()
}

/// The required alignment, in bytes, for a `For` loop tagged with `device_api`.
///
/// Entering a wide-vector DSP loop overrides the host's required alignment
/// with the DSP's vector width, but only when `target` actually declares the
/// matching feature flag (`TargetFeature::Hvx64`/`Hvx128`) — a loop tagged for
/// a width the target hasn't enabled is just as unrecognized as one with no
/// mode at all, so both are the same error.
pub fn required_alignment_for(
    target: &LirTarget,
    loop_var: &str,
    device_api: DeviceApi,
) -> Result<u32, AlignError> {
    match device_api {
        DeviceApi::Host => Ok(host_required_alignment(target)),
        DeviceApi::Hvx(Some(HvxMode::Hvx64)) if target.has_feature(TargetFeature::Hvx64) => {
            Ok(64)
        }
        DeviceApi::Hvx(Some(HvxMode::Hvx128)) if target.has_feature(TargetFeature::Hvx128) => {
            Ok(128)
        }
        DeviceApi::Hvx(_) => Err(AlignError::UnrecognizedHvxMode {
            loop_var: loop_var.to_string(),
            device_api,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tidec_abi::target::{BackendKind, TargetFeatures};

    fn hvx_target(hvx_64: bool, hvx_128: bool) -> LirTarget {
        let mut target = LirTarget::new(BackendKind::Llvm);
        target.features = TargetFeatures { hvx_64, hvx_128 };
        target
    }

    #[test]
    fn host_uses_natural_vector_width() {
        let target = LirTarget::new(BackendKind::Llvm);
        assert_eq!(host_required_alignment(&target), 16);
        assert_eq!(
            required_alignment_for(&target, "i", DeviceApi::Host).unwrap(),
            16
        );
    }

    #[test]
    fn hvx_modes_override_required_alignment_when_the_feature_is_enabled() {
        let target = hvx_target(true, true);
        assert_eq!(
            required_alignment_for(&target, "i", DeviceApi::Hvx(Some(HvxMode::Hvx64))).unwrap(),
            64
        );
        assert_eq!(
            required_alignment_for(&target, "i", DeviceApi::Hvx(Some(HvxMode::Hvx128))).unwrap(),
            128
        );
    }

    #[test]
    fn hvx_mode_without_the_matching_feature_flag_is_an_error() {
        // Hvx64 requested, but only hvx_128 is enabled on this target.
        let target = hvx_target(false, true);
        let err =
            required_alignment_for(&target, "i", DeviceApi::Hvx(Some(HvxMode::Hvx64))).unwrap_err();
        match err {
            AlignError::UnrecognizedHvxMode { loop_var, .. } => assert_eq!(loop_var, "i"),
        }
    }

    #[test]
    fn hvx_without_mode_is_an_error() {
        let target = hvx_target(true, true);
        let err = required_alignment_for(&target, "i", DeviceApi::Hvx(None)).unwrap_err();
        match err {
            AlignError::UnrecognizedHvxMode { loop_var, .. } => assert_eq!(loop_var, "i"),
        }
    }
}
