use egui::Color32;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

use imu_calibrate::config::PlotConfig;
use imu_calibrate::types::{AttitudeEstimate, Sample};
use imu_calibrate::utils::sample_rate_hz;

/// 格式化数字为固定宽度的标签
fn format_fixed_width_label(value: f64) -> String {
    let abs_value = value.abs();
    if abs_value >= 10000.0 {
        format!("{:>8.1e}", value)
    } else if abs_value >= 100.0 {
        format!("{:>8.0}", value)
    } else if abs_value >= 10.0 {
        format!("{:>8.1}", value)
    } else {
        format!("{:>8.2}", value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColorRole {
    Acc,
    Gyro,
    Roll,
    Pitch,
}

/// Which upstream Kalman column a graph mirrors, for the local overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Overlay {
    None,
    Roll,
    Pitch,
}

struct Graph {
    title: &'static str,
    value: fn(&Sample) -> f64,
    role: ColorRole,
    overlay: Overlay,
}

const fn graph(title: &'static str, value: fn(&Sample) -> f64, role: ColorRole) -> Option<Graph> {
    Some(Graph { title, value, role, overlay: Overlay::None })
}

/// 4x4 网格，与原标定工具的布局一致；None 为空白格
const GRID: [[Option<Graph>; 4]; 4] = [
    [
        graph("Acc X", |s| s.acc.x as f64, ColorRole::Acc),
        graph("Gyro X", |s| s.gyro.x as f64, ColorRole::Gyro),
        graph("Raw Roll", |s| s.raw.roll, ColorRole::Roll),
        graph("Raw Pitch", |s| s.raw.pitch, ColorRole::Pitch),
    ],
    [
        graph("Acc Y", |s| s.acc.y as f64, ColorRole::Acc),
        graph("Gyro Y", |s| s.gyro.y as f64, ColorRole::Gyro),
        Some(Graph { title: "Kalman Roll", value: |s| s.kalman.roll, role: ColorRole::Roll, overlay: Overlay::Roll }),
        Some(Graph { title: "Kalman Pitch", value: |s| s.kalman.pitch, role: ColorRole::Pitch, overlay: Overlay::Pitch }),
    ],
    [
        graph("Acc Z", |s| s.acc.z as f64, ColorRole::Acc),
        graph("Gyro Z", |s| s.gyro.z as f64, ColorRole::Gyro),
        graph("Comp Roll", |s| s.comp.roll, ColorRole::Roll),
        graph("Comp Pitch", |s| s.comp.pitch, ColorRole::Pitch),
    ],
    [
        None,
        None,
        graph("Gyro Roll", |s| s.gyro_filter.roll, ColorRole::Roll),
        graph("Gyro Pitch", |s| s.gyro_filter.pitch, ColorRole::Pitch),
    ],
];

fn color(rgb: [u8; 3]) -> Color32 {
    Color32::from_rgb(rgb[0], rgb[1], rgb[2])
}

/// Time series grid drawn from one ring snapshot per frame
#[derive(Debug, Default)]
pub struct GraphGrid {
    samples: Vec<Sample>,
    estimates: Vec<AttitudeEstimate>,
    /// Seconds per device time unit
    time_scale: f64,
}

impl GraphGrid {
    pub fn new(time_scale: f64) -> Self {
        Self {
            samples: Vec::new(),
            estimates: Vec::new(),
            time_scale,
        }
    }

    /// 替换为最新快照（最旧的在前）
    pub fn update(&mut self, samples: Vec<Sample>, estimates: Vec<AttitudeEstimate>) {
        self.samples = samples;
        self.estimates = estimates;
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    /// 按窗口内设备时间估算采样率
    pub fn sample_rate(&self) -> Option<f64> {
        let first = self.samples.first()?;
        let last = self.samples.last()?;
        sample_rate_hz(first.time, last.time, self.samples.len())
    }

    fn seconds_since_start(&self, time: i64) -> f64 {
        let start = self.samples.first().map(|s| s.time).unwrap_or(time);
        (time - start) as f64 * self.time_scale
    }

    pub fn ui(&self, ui: &mut egui::Ui, config: &PlotConfig) {
        if self.samples.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label("No samples yet. Connect to a device or start the simulator.");
            });
            return;
        }

        let spacing = ui.spacing().item_spacing.x;
        let cell_width = ((ui.available_width() - 3.0 * spacing) / 4.0).max(50.0);

        egui::ScrollArea::vertical().show(ui, |ui| {
            egui::Grid::new("graph_grid")
                .num_columns(4)
                .spacing([spacing, spacing])
                .show(ui, |ui| {
                    for row in GRID.iter() {
                        for cell in row.iter() {
                            match cell {
                                Some(graph) => self.plot_graph(ui, graph, cell_width, config),
                                None => {
                                    ui.allocate_space(egui::vec2(cell_width, config.plot_height));
                                }
                            }
                        }
                        ui.end_row();
                    }
                });
        });
    }

    fn plot_graph(&self, ui: &mut egui::Ui, graph: &Graph, width: f32, config: &PlotConfig) {
        let points: Vec<[f64; 2]> = self
            .samples
            .iter()
            .map(|s| [self.seconds_since_start(s.time), (graph.value)(s)])
            .collect();

        let local: Option<Vec<[f64; 2]>> = match graph.overlay {
            _ if !config.show_local_kalman => None,
            Overlay::None => None,
            Overlay::Roll => Some(self.estimate_points(|e| e.estimate.roll)),
            Overlay::Pitch => Some(self.estimate_points(|e| e.estimate.pitch)),
        };

        // 计算动态Y轴范围
        let (y_min, y_max) = points
            .iter()
            .chain(local.iter().flatten())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), p| {
                (min.min(p[1]), max.max(p[1]))
            });

        ui.vertical(|ui| {
            ui.label(format!(
                "{} min:{} max:{}",
                graph.title,
                format_fixed_width_label(y_min),
                format_fixed_width_label(y_max)
            ));

            let range = (y_max - y_min).max(0.1);
            let x_max = points.last().map(|p| p[0]).unwrap_or(0.0).max(1e-3);
            let line_color = color(match graph.role {
                ColorRole::Acc => config.colors.acc,
                ColorRole::Gyro => config.colors.gyro,
                ColorRole::Roll => config.colors.roll,
                ColorRole::Pitch => config.colors.pitch,
            });

            Plot::new(graph.title)
                .width(width)
                .height(config.plot_height)
                .show_x(false)
                .show_y(false)
                .allow_drag(false)
                .allow_zoom(false)
                .allow_scroll(false)
                .show(ui, |plot_ui| {
                    plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                        [0.0, y_min - range * 0.05],
                        [x_max, y_max + range * 0.05],
                    ));
                    plot_ui.line(
                        Line::new(graph.title, PlotPoints::from(points))
                            .color(line_color)
                            .width(1.0),
                    );
                    if let Some(local) = local {
                        plot_ui.line(
                            Line::new("local", PlotPoints::from(local))
                                .color(color(config.colors.local_kalman))
                                .width(1.0),
                        );
                    }
                });
        });
    }

    fn estimate_points(&self, value: fn(&AttitudeEstimate) -> f64) -> Vec<[f64; 2]> {
        self.estimates
            .iter()
            .map(|e| [self.seconds_since_start(e.time), value(e)])
            .collect()
    }
}
