use std::fmt;
use std::str::FromStr;

use log::{debug, warn};
use safety::SafetyMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_SPEED_LIMIT: f64 = 60.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdjustError {
    #[error("invalid road condition '{0}', expected one of: clear, wet, icy")]
    InvalidInput(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadCondition {
    Clear,
    Wet,
    Icy,
}

impl RoadCondition {
    pub const ALL: [RoadCondition; 3] = [RoadCondition::Clear, RoadCondition::Wet, RoadCondition::Icy];

    /// Multiplier applied to the speed limit.
    pub fn weather_factor(self) -> f64 {
        match self {
            RoadCondition::Clear => 1.0,
            RoadCondition::Wet => 0.85,
            RoadCondition::Icy => 0.6,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoadCondition::Clear => "clear",
            RoadCondition::Wet => "wet",
            RoadCondition::Icy => "icy",
        }
    }
}

impl fmt::Display for RoadCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match on the lowercase names. No trimming.
impl FromStr for RoadCondition {
    type Err = AdjustError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "clear" => Ok(RoadCondition::Clear),
            "wet" => Ok(RoadCondition::Wet),
            "icy" => Ok(RoadCondition::Icy),
            other => Err(AdjustError::InvalidInput(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdjusterConfig {
    /// Upper bound the target speed is derived from. Expected to be positive, not validated.
    pub speed_limit: f64,
}

impl Default for AdjusterConfig {
    fn default() -> Self {
        Self {
            speed_limit: DEFAULT_SPEED_LIMIT,
        }
    }
}

/// Speed reduction for a traffic density reading.
/// 50 already counts as dense traffic; above 80 the penalty doubles.
pub fn traffic_penalty(traffic_density: i32) -> f64 {
    if traffic_density >= 50 {
        if traffic_density > 80 {
            20.0
        } else {
            10.0
        }
    } else {
        0.0
    }
}

/// Signed change applied for the road grade: uphill subtracts the angle, downhill adds its magnitude.
pub fn slope_adjustment(slope_angle: i32) -> f64 {
    let angle = f64::from(slope_angle);
    if slope_angle > 0 {
        -angle
    } else if slope_angle < 0 {
        angle.abs()
    } else {
        0.0
    }
}

/// Round to two decimals, ties to even.
///
/// Rounds the exact binary value of `x`, not the inexact `x * 100`.
pub fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

#[derive(Clone, Debug)]
pub struct SpeedAdjuster {
    cfg: AdjusterConfig,
    safety: SafetyMode,
    current_speed: f64,
    weather_factor: f64,
}

impl Default for SpeedAdjuster {
    fn default() -> Self {
        Self::from_config(&AdjusterConfig::default())
    }
}

impl SpeedAdjuster {
    pub fn new(speed_limit: f64) -> Self {
        Self::from_config(&AdjusterConfig { speed_limit })
    }

    pub fn from_config(cfg: &AdjusterConfig) -> Self {
        Self {
            cfg: *cfg,
            safety: SafetyMode::default(),
            current_speed: 0.0,
            weather_factor: 1.0,
        }
    }

    pub fn set_safety_mode(&mut self, enabled: bool) {
        self.safety = SafetyMode::new(enabled);
    }

    pub fn safety_mode(&self) -> bool {
        self.safety.enabled
    }

    pub fn speed_limit(&self) -> f64 {
        self.cfg.speed_limit
    }

    /// Unrounded result of the last successful update.
    pub fn current_speed(&self) -> f64 {
        self.current_speed
    }

    /// Multiplier chosen by the last successful update.
    pub fn weather_factor(&self) -> f64 {
        self.weather_factor
    }

    /// Compute the target speed from raw inputs.
    ///
    /// The road condition is parsed before anything is touched, so a rejected
    /// input leaves `current_speed` and `weather_factor` as they were.
    pub fn update(
        &mut self,
        road_condition: &str,
        traffic_density: i32,
        slope_angle: i32,
    ) -> Result<f64, AdjustError> {
        let road = road_condition.parse::<RoadCondition>().map_err(|e| {
            warn!("rejected update: {e}");
            e
        })?;
        Ok(self.update_condition(road, traffic_density, slope_angle))
    }

    /// Typed form of [`SpeedAdjuster::update`]. Returns the speed rounded to two decimals.
    pub fn update_condition(
        &mut self,
        road: RoadCondition,
        traffic_density: i32,
        slope_angle: i32,
    ) -> f64 {
        self.weather_factor = road.weather_factor();

        let mut base = self.cfg.speed_limit * self.weather_factor;
        base -= traffic_penalty(traffic_density);
        base += slope_adjustment(slope_angle);

        let speed = safety::clamp(self.cfg.speed_limit, self.safety, base);
        debug!(
            "road={road} traffic={traffic_density} slope={slope_angle} safety={} factor={} pre_clamp={base} speed={speed}",
            self.safety.enabled, self.weather_factor
        );

        self.current_speed = speed;
        round2(self.current_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_exact_lowercase_names() {
        assert_eq!("clear".parse::<RoadCondition>(), Ok(RoadCondition::Clear));
        assert_eq!("wet".parse::<RoadCondition>(), Ok(RoadCondition::Wet));
        assert_eq!("icy".parse::<RoadCondition>(), Ok(RoadCondition::Icy));
        for bad in ["Clear", "WET", " icy", "snowy", ""] {
            assert_eq!(
                bad.parse::<RoadCondition>(),
                Err(AdjustError::InvalidInput(bad.to_string()))
            );
        }
    }

    #[test]
    fn display_matches_parse() {
        for road in RoadCondition::ALL {
            assert_eq!(road.to_string().parse::<RoadCondition>(), Ok(road));
        }
    }

    #[test]
    fn traffic_boundaries() {
        assert_eq!(traffic_penalty(49), 0.0);
        assert_eq!(traffic_penalty(50), 10.0);
        assert_eq!(traffic_penalty(80), 10.0);
        assert_eq!(traffic_penalty(81), 20.0);
        assert_eq!(traffic_penalty(-5), 0.0);
        assert_eq!(traffic_penalty(250), 20.0);
    }

    #[test]
    fn slope_sign() {
        assert_eq!(slope_adjustment(0), 0.0);
        assert_eq!(slope_adjustment(5), -5.0);
        assert_eq!(slope_adjustment(-10), 10.0);
        assert_eq!(slope_adjustment(i32::MIN), 2147483648.0);
    }

    #[test]
    fn rounds_ties_to_even() {
        assert_eq!(round2(45.0), 45.0);
        assert_eq!(round2(12.345678), 12.35);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
    }

    #[test]
    fn rounds_stored_value_not_scaled_product() {
        assert_eq!(round2(3.5949999999999998), 3.59);
        assert_eq!(round2(25.585), 25.59);
        assert_eq!(round2(26.095), 26.09);
        assert_eq!(round2(44.265), 44.27);
        assert_eq!(round2(-18.0), -18.0);
    }

    #[test]
    fn new_adjuster_starts_idle() {
        let a = SpeedAdjuster::default();
        assert_eq!(a.speed_limit(), 60.0);
        assert_eq!(a.current_speed(), 0.0);
        assert_eq!(a.weather_factor(), 1.0);
        assert!(!a.safety_mode());
    }

    #[test]
    fn update_records_state() {
        let mut a = SpeedAdjuster::new(60.0);
        assert_eq!(a.update("icy", 90, 0), Ok(16.0));
        assert_eq!(a.weather_factor(), 0.6);
        assert!((a.current_speed() - 16.0).abs() < 1e-9);
    }

    #[test]
    fn invalid_road_leaves_state_alone() {
        let mut a = SpeedAdjuster::new(60.0);
        a.update("wet", 30, 0).unwrap();
        let (speed, factor) = (a.current_speed(), a.weather_factor());

        let err = a.update("foggy", 10, 3).unwrap_err();
        assert_eq!(err, AdjustError::InvalidInput("foggy".into()));
        assert_eq!(a.current_speed(), speed);
        assert_eq!(a.weather_factor(), factor);
    }

    #[test]
    fn safety_toggle_has_no_restrictions() {
        let mut a = SpeedAdjuster::default();
        a.set_safety_mode(true);
        a.set_safety_mode(true);
        assert!(a.safety_mode());
        a.set_safety_mode(false);
        assert!(!a.safety_mode());
    }

    #[test]
    fn config_reads_from_json() {
        let cfg: AdjusterConfig = serde_json::from_str(r#"{"speed_limit": 80.0}"#).unwrap();
        assert_eq!(SpeedAdjuster::from_config(&cfg).speed_limit(), 80.0);

        let empty: AdjusterConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, AdjusterConfig::default());
    }
}
