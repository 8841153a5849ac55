/// Distance below the speed limit that safety mode caps the output at.
pub const SAFETY_MARGIN: f64 = 10.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SafetyMode {
    pub enabled: bool,
}

impl SafetyMode {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Highest speed allowed while enabled.
    pub fn ceiling(speed_limit: f64) -> f64 {
        speed_limit - SAFETY_MARGIN
    }
}

/// Apply the mode-dependent bound to a computed speed.
///
/// Enabled: only an upper bound of `speed_limit - SAFETY_MARGIN`, the result may still be negative.
/// Disabled: only a lower bound of zero, the result may exceed `speed_limit`.
pub fn clamp(speed_limit: f64, mode: SafetyMode, base: f64) -> f64 {
    if mode.enabled {
        base.min(SafetyMode::ceiling(speed_limit))
    } else {
        base.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_caps_below_limit() {
        let on = SafetyMode::new(true);
        assert_eq!(clamp(60.0, on, 70.0), 50.0);
        assert_eq!(clamp(60.0, on, 42.0), 42.0);
    }

    #[test]
    fn enabled_has_no_lower_bound() {
        assert_eq!(clamp(60.0, SafetyMode::new(true), -7.5), -7.5);
    }

    #[test]
    fn disabled_floors_at_zero_only() {
        let off = SafetyMode::default();
        assert_eq!(clamp(60.0, off, -3.0), 0.0);
        assert_eq!(clamp(60.0, off, 75.0), 75.0);
    }
}
