//! Maps `Box<dyn Error>` from trait boundaries to typed `PowderError`.
//!
//! The traits in `powder_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum, with
//! an optional feature-gated path for `powder_hardware::HwError` downcasting.

use crate::error::PowderError;

/// Map a trait-boundary error to a typed `PowderError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> PowderError {
    #[cfg(feature = "hardware-errors")]
    {
        use powder_hardware::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => PowderError::Timeout,
                HwError::Unavailable(m) => PowderError::Unavailable(m.clone()),
                HwError::Storage(m) => PowderError::Storage(m.clone()),
                other => PowderError::HardwareFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        PowderError::Timeout
    } else {
        PowderError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_errors_fall_back_to_message() {
        let e = std::io::Error::other("bus stuck");
        assert_eq!(map_hw_error(&e), PowderError::Hardware("bus stuck".into()));
        let t = std::io::Error::other("read Timeout");
        assert_eq!(map_hw_error(&t), PowderError::Timeout);
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_are_downcast() {
        use powder_hardware::HwError;
        let boxed: Box<dyn std::error::Error + Send + Sync> =
            Box::new(HwError::Storage("full".into()));
        assert_eq!(
            map_hw_error(boxed.as_ref()),
            PowderError::Storage("full".into())
        );
    }
}
