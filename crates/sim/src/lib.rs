use controller::RoadCondition;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

pub const TRAFFIC_RANGE: (i32, i32) = (0, 100);
pub const SLOPE_RANGE: (i32, i32) = (-10, 10);

#[derive(Clone, Copy, Debug)]
pub struct DriveParams {
    pub road: RoadCondition,
    pub traffic_start: f64,
    pub traffic_std: f64,
    pub slope_start: f64,
    pub slope_std: f64,
    /// Chance per step that the road condition changes.
    pub road_change_p: f64,
}

impl Default for DriveParams {
    fn default() -> Self {
        Self {
            road: RoadCondition::Clear,
            traffic_start: 30.0,
            traffic_std: 4.0,
            slope_start: 0.0,
            slope_std: 0.8,
            road_change_p: 0.02,
        }
    }
}

/// One set of inputs for the speed adjuster.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub road: RoadCondition,
    pub traffic_density: i32,
    pub slope_angle: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    Commute,
    Storm,
    Mountain,
    RushHour,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [
        Scenario::Commute,
        Scenario::Storm,
        Scenario::Mountain,
        Scenario::RushHour,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Scenario::Commute => "Commute (clear, light traffic)",
            Scenario::Storm => "Storm (wet/icy switching)",
            Scenario::Mountain => "Mountain (steep grades)",
            Scenario::RushHour => "Rush hour (dense traffic)",
        }
    }

    pub fn params(self) -> DriveParams {
        let base = DriveParams::default();
        match self {
            Scenario::Commute => base,
            Scenario::Storm => DriveParams {
                road: RoadCondition::Wet,
                road_change_p: 0.15,
                ..base
            },
            Scenario::Mountain => DriveParams {
                slope_std: 2.5,
                traffic_start: 15.0,
                ..base
            },
            Scenario::RushHour => DriveParams {
                traffic_start: 70.0,
                traffic_std: 6.0,
                ..base
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct Drive {
    pub params: DriveParams,
    road: RoadCondition,
    traffic: f64,
    slope: f64,
    traffic_noise: Normal<f64>,
    slope_noise: Normal<f64>,
    rng: StdRng,
    step_count: u64,
}

impl Drive {
    /// Negative or non-finite noise levels are treated as zero.
    pub fn new(params: DriveParams, seed: u64) -> Self {
        Self {
            road: params.road,
            traffic: params.traffic_start,
            slope: params.slope_start,
            traffic_noise: noise(params.traffic_std),
            slope_noise: noise(params.slope_std),
            rng: StdRng::seed_from_u64(seed),
            step_count: 0,
            params,
        }
    }

    pub fn from_scenario(scenario: Scenario, seed: u64) -> Self {
        Self::new(scenario.params(), seed)
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advance one step: random walk on traffic and slope, occasional road change.
    pub fn next_sample(&mut self) -> Environment {
        self.step_count += 1;

        self.traffic = (self.traffic + self.traffic_noise.sample(&mut self.rng))
            .clamp(TRAFFIC_RANGE.0 as f64, TRAFFIC_RANGE.1 as f64);
        self.slope = (self.slope + self.slope_noise.sample(&mut self.rng))
            .clamp(SLOPE_RANGE.0 as f64, SLOPE_RANGE.1 as f64);

        if self.params.road_change_p > 0.0 && self.rng.gen_bool(self.params.road_change_p.min(1.0)) {
            let next = RoadCondition::ALL[self.rng.gen_range(0..RoadCondition::ALL.len())];
            if next != self.road {
                debug!("step {}: road {} -> {}", self.step_count, self.road, next);
            }
            self.road = next;
        }

        Environment {
            road: self.road,
            traffic_density: self.traffic.round() as i32,
            slope_angle: self.slope.round() as i32,
        }
    }

    pub fn take(&mut self, n: usize) -> Vec<Environment> {
        (0..n).map(|_| self.next_sample()).collect()
    }
}

fn noise(std_dev: f64) -> Normal<f64> {
    let sd = if std_dev.is_finite() && std_dev > 0.0 { std_dev } else { 0.0 };
    Normal::new(0.0, sd).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_drive() {
        let a = Drive::from_scenario(Scenario::Storm, 7).take(200);
        let b = Drive::from_scenario(Scenario::Storm, 7).take(200);
        assert_eq!(a, b);
    }

    #[test]
    fn samples_stay_in_range() {
        let mut d = Drive::from_scenario(Scenario::Mountain, 99);
        for env in d.take(1000) {
            assert!((0..=100).contains(&env.traffic_density));
            assert!((-10..=10).contains(&env.slope_angle));
        }
        assert_eq!(d.step_count(), 1000);
    }

    #[test]
    fn zero_noise_holds_inputs() {
        let params = DriveParams {
            road: RoadCondition::Icy,
            traffic_start: 55.0,
            traffic_std: 0.0,
            slope_start: -3.0,
            slope_std: 0.0,
            road_change_p: 0.0,
        };
        let mut d = Drive::new(params, 1);
        for env in d.take(20) {
            assert_eq!(
                env,
                Environment {
                    road: RoadCondition::Icy,
                    traffic_density: 55,
                    slope_angle: -3
                }
            );
        }
    }

    #[test]
    fn environment_json_row() {
        let env = Environment {
            road: RoadCondition::Wet,
            traffic_density: 64,
            slope_angle: -2,
        };
        let json = serde_json::to_value(env).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"road": "wet", "traffic_density": 64, "slope_angle": -2})
        );
        let back: Environment = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }
}
