use controller::{AdjusterConfig, RoadCondition, SpeedAdjuster};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use serde::Deserialize;
use sim::{Drive, Environment, Scenario};
use std::fs;

#[derive(Clone, Debug)]
struct Sample {
    step: f64,
    road: RoadCondition,
    traffic: f64,
    slope: f64,
    speed: f64,
}

/// Row format written by `speed-adjuster drive`.
#[derive(Debug, Deserialize)]
struct CliLine {
    step: u64,
    #[serde(flatten)]
    env: Environment,
    speed: f64,
}

struct App {
    // Shared settings
    speed_limit: f64,
    safety: bool,

    // Single update panel
    road: RoadCondition,
    traffic: i32,
    slope: i32,

    // Drive
    scenario: Scenario,
    seed: u64,
    max_steps: u64,
    running: bool,
    drive: Drive,
    drive_adjuster: SpeedAdjuster,

    samples: Vec<Sample>,

    // Replay
    replay_loaded: bool,
    replay_path: String,
    last_error: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        let scenario = Scenario::Commute;
        let seed = 12345;
        let speed_limit = AdjusterConfig::default().speed_limit;

        Self {
            speed_limit,
            safety: false,

            road: RoadCondition::Clear,
            traffic: 20,
            slope: 0,

            scenario,
            seed,
            max_steps: 300,
            running: false,
            drive: Drive::from_scenario(scenario, seed),
            drive_adjuster: SpeedAdjuster::new(speed_limit),

            samples: Vec::new(),

            replay_loaded: false,
            replay_path: "out/drive.jsonl".to_string(),
            last_error: None,
        }
    }
}

impl App {
    fn live_speed(&self) -> f64 {
        let mut adjuster = SpeedAdjuster::new(self.speed_limit);
        adjuster.set_safety_mode(self.safety);
        adjuster.update_condition(self.road, self.traffic, self.slope)
    }

    fn reset_drive(&mut self) {
        self.running = false;
        self.replay_loaded = false;
        self.last_error = None;
        self.drive = Drive::from_scenario(self.scenario, self.seed);
        self.drive_adjuster = SpeedAdjuster::new(self.speed_limit);
        self.samples.clear();
    }

    fn step_drive(&mut self) {
        if self.drive.step_count() >= self.max_steps {
            self.running = false;
            return;
        }

        // Safety may be toggled mid-drive
        self.drive_adjuster.set_safety_mode(self.safety);

        let env = self.drive.next_sample();
        let speed =
            self.drive_adjuster
                .update_condition(env.road, env.traffic_density, env.slope_angle);

        self.samples.push(Sample {
            step: self.drive.step_count() as f64,
            road: env.road,
            traffic: env.traffic_density as f64,
            slope: env.slope_angle as f64,
            speed,
        });
    }

    /// Limit the running drive was started with, spanning the plotted steps.
    fn limit_line(&self) -> Option<[[f64; 2]; 2]> {
        let last = self.samples.last()?;
        if self.replay_loaded || last.step <= 0.0 {
            return None;
        }
        let limit = self.drive_adjuster.speed_limit();
        Some([[0.0, limit], [last.step, limit]])
    }

    fn load_jsonl(&mut self, path: &str) {
        self.last_error = None;

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                self.last_error = Some(format!("Failed to read {path}: {e}"));
                return;
            }
        };

        let mut loaded = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let row: CliLine = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    self.last_error = Some(format!("JSON parse error at line {}: {}", i + 1, e));
                    return;
                }
            };

            loaded.push(Sample {
                step: row.step as f64,
                road: row.env.road,
                traffic: row.env.traffic_density as f64,
                slope: row.env.slope_angle as f64,
                speed: row.speed,
            });
        }

        if loaded.is_empty() {
            self.last_error = Some(format!("No samples found in {path}"));
            return;
        }

        self.running = false;
        self.replay_loaded = true;
        self.samples = loaded;
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mode_txt = if self.replay_loaded { "REPLAY" } else { "LIVE" };

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Speed Adjuster");
                ui.separator();
                ui.label(format!("MODE: {mode_txt}"));
                ui.separator();

                let (label, color) = if self.safety {
                    ("SAFETY: ON", egui::Color32::YELLOW)
                } else {
                    ("SAFETY: OFF", egui::Color32::GREEN)
                };
                ui.colored_label(color, label);
            });
        });

        egui::SidePanel::left("left")
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Adjuster");
                ui.add(egui::Slider::new(&mut self.speed_limit, 10.0..=130.0).text("speed limit"));
                ui.checkbox(&mut self.safety, "safety mode");

                ui.separator();
                ui.label("Single update");
                egui::ComboBox::from_id_salt("road")
                    .selected_text(self.road.as_str())
                    .show_ui(ui, |ui| {
                        for r in RoadCondition::ALL {
                            ui.selectable_value(&mut self.road, r, r.as_str());
                        }
                    });
                ui.add(egui::Slider::new(&mut self.traffic, 0..=100).text("traffic density"));
                ui.add(egui::Slider::new(&mut self.slope, -10..=10).text("slope angle"));
                ui.strong(format!("target speed = {:.2}", self.live_speed()));

                ui.separator();
                ui.label("Drive");

                let mut scenario_new = self.scenario;
                egui::ComboBox::from_id_salt("scenario")
                    .selected_text(self.scenario.label())
                    .show_ui(ui, |ui| {
                        for s in Scenario::ALL {
                            ui.selectable_value(&mut scenario_new, s, s.label());
                        }
                    });
                if scenario_new != self.scenario {
                    self.scenario = scenario_new;
                    self.reset_drive();
                }

                ui.add(egui::Slider::new(&mut self.max_steps, 50..=2000).text("steps"));
                ui.add(egui::DragValue::new(&mut self.seed).prefix("seed: "));

                ui.horizontal(|ui| {
                    if ui.button("Reset").clicked() {
                        self.reset_drive();
                    }

                    let run_label = if self.running { "Pause" } else { "Run" };
                    if ui.button(run_label).clicked() {
                        if !self.running && (self.replay_loaded || self.samples.is_empty()) {
                            self.reset_drive();
                        }
                        self.running = !self.running;
                    }

                    if ui
                        .add_enabled(!self.replay_loaded, egui::Button::new("Step"))
                        .clicked()
                    {
                        self.step_drive();
                    }
                });

                ui.separator();
                ui.label("Replay (JSONL)");
                ui.horizontal(|ui| {
                    ui.label("path:");
                    ui.text_edit_singleline(&mut self.replay_path);
                });
                if ui.button("Load").clicked() {
                    let p = self.replay_path.clone();
                    self.load_jsonl(&p);
                }

                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, err);
                }

                ui.separator();
                ui.small("Tip: speed-adjuster drive --scenario storm > out/drive.jsonl");
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.running && !self.replay_loaded {
                for _ in 0..5 {
                    if !self.running {
                        break;
                    }
                    self.step_drive();
                }
                ctx.request_repaint();
            }

            let Some(last) = self.samples.last().cloned() else {
                ui.label("No data yet. Run a drive or Load a REPLAY file.");
                return;
            };

            let speed_points: PlotPoints = self.samples.iter().map(|s| [s.step, s.speed]).collect();
            let traffic_points: PlotPoints =
                self.samples.iter().map(|s| [s.step, s.traffic]).collect();
            let slope_points: PlotPoints = self.samples.iter().map(|s| [s.step, s.slope]).collect();
            let factor_points: PlotPoints = self
                .samples
                .iter()
                .map(|s| [s.step, s.road.weather_factor() * 100.0])
                .collect();

            ui.heading("Traces");
            Plot::new("speed_plot").height(240.0).show(ui, |plot_ui| {
                plot_ui.line(Line::new(speed_points).name("Speed"));

                if let Some(limit) = self.limit_line() {
                    let limit: PlotPoints = limit.to_vec().into();
                    plot_ui.line(Line::new(limit).name("Speed limit"));
                }
            });

            Plot::new("input_plot").height(180.0).show(ui, |plot_ui| {
                plot_ui.line(Line::new(traffic_points).name("Traffic density"));
                plot_ui.line(Line::new(slope_points).name("Slope angle"));
                plot_ui.line(Line::new(factor_points).name("Weather factor (%)"));
            });

            ui.separator();
            ui.label(format!(
                "step={}  road={}  traffic={}  slope={}  speed={:.2}",
                last.step, last.road, last.traffic, last.slope, last.speed
            ));
        });
    }
}

fn main() -> eframe::Result<()> {
    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Speed Adjuster",
        native_options,
        Box::new(|_cc| Ok(Box::new(App::default()))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_line_follows_running_drive() {
        let mut app = App::default();
        app.step_drive();
        app.step_drive();

        // Slider moved mid-drive; the drive keeps its limit until reset
        app.speed_limit = 90.0;
        app.step_drive();
        assert_eq!(app.limit_line(), Some([[0.0, 60.0], [3.0, 60.0]]));

        app.reset_drive();
        assert_eq!(app.limit_line(), None);
        app.step_drive();
        assert_eq!(app.limit_line(), Some([[0.0, 90.0], [1.0, 90.0]]));
    }
}
