use eframe::egui;
use imu_calibrate::utils::format_uptime;

use crate::app::app_core::CalibrateApp;
use crate::app::handlers::ConnectionHandler;
use crate::app::state::{ConnectionStatus, SourceKind};

enum Action {
    Connect(SourceKind),
    Disconnect,
    RefreshPorts,
}

pub fn render_status_bar(app: &mut CalibrateApp, ctx: &egui::Context) {
    let mut action = None;

    egui::TopBottomPanel::top("status_bar")
        .min_height(40.0)
        .show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.label("Status:");

                let status_color = match &app.state.status {
                    ConnectionStatus::Connected(_) => egui::Color32::from_rgb(0, 150, 0), // 绿色
                    ConnectionStatus::Connecting(_) => egui::Color32::from_rgb(255, 165, 0), // 橙色
                    ConnectionStatus::Disconnected | ConnectionStatus::Failed(_) => {
                        egui::Color32::from_rgb(150, 0, 0) // 红色
                    }
                };
                ui.colored_label(status_color, app.state.status.label());

                ui.separator();

                if app.state.status.is_active() {
                    if ui.button("⏹ Disconnect").clicked() {
                        action = Some(Action::Disconnect);
                    }

                    let pause_button_text = if app.state.paused { "▶ Resume" } else { "⏸ Pause" };
                    if ui.button(pause_button_text).clicked() {
                        app.state.paused = !app.state.paused;
                    }
                } else {
                    render_port_selector(app, ui, &mut action);
                }

                ui.separator();

                // 显示采样率信息
                match app.state.graphs.sample_rate() {
                    Some(rate) => ui.label(format!("Sample Rate: {:.1} Hz", rate)),
                    None => ui.label("Sample Rate: --"),
                };

                ui.separator();
                ui.label(format!(
                    "Window: {}/{}",
                    app.state.data.samples.len(),
                    app.state.data.samples.capacity()
                ));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let tuning_button_text = if app.show_tuning_panel {
                        "🎛 Hide Tuning"
                    } else {
                        "🎛 Show Tuning"
                    };
                    if ui.button(tuning_button_text).clicked() {
                        app.show_tuning_panel = !app.show_tuning_panel;
                    }
                });
            });
            ui.add_space(5.0);
        });

    match action {
        Some(Action::Connect(kind)) => ConnectionHandler::connect(app, kind),
        Some(Action::Disconnect) => ConnectionHandler::disconnect(app),
        Some(Action::RefreshPorts) => ConnectionHandler::refresh_ports(app),
        None => {}
    }
}

fn render_port_selector(app: &mut CalibrateApp, ui: &mut egui::Ui, action: &mut Option<Action>) {
    let ports = app.state.available_ports.clone();
    let serial = &mut app.config.get_config_mut().serial;

    ui.label("Port:");
    egui::ComboBox::from_id_salt("serial_port")
        .selected_text(serial.port.clone())
        .width(140.0)
        .show_ui(ui, |ui| {
            for port in ports {
                ui.selectable_value(&mut serial.port, port.clone(), port);
            }
        });
    if ui.button("🔄").on_hover_text("Rescan serial ports").clicked() {
        *action = Some(Action::RefreshPorts);
    }

    ui.label("Baud:");
    egui::ComboBox::from_id_salt("baud_rate")
        .selected_text(serial.baud_rate.to_string())
        .width(80.0)
        .show_ui(ui, |ui| {
            for baud in [9600, 19200, 38400, 57600, 115200] {
                ui.selectable_value(&mut serial.baud_rate, baud, baud.to_string());
            }
        });

    if ui.button("🔌 Connect").clicked() {
        *action = Some(Action::Connect(SourceKind::Serial));
    }
    if ui.button("🧪 Simulate").clicked() {
        *action = Some(Action::Connect(SourceKind::Simulator));
    }
}

pub fn render_bottom_status_bar(app: &mut CalibrateApp, ctx: &egui::Context) {
    egui::TopBottomPanel::bottom("bottom_status_bar")
        .min_height(25.0)
        .show(ctx, |ui| {
            ui.add_space(3.0);
            ui.horizontal(|ui| {
                let stats = app.state.live_stats();
                ui.label(format!(
                    "Decoded: {}  Malformed: {}  Empty: {}",
                    stats.decoded, stats.malformed, stats.empty
                ));
                ui.separator();
                ui.label(format!("Dropped: {:.1}%", stats.drop_ratio() * 100.0));
                ui.separator();

                // 设备运行时间
                if let Some(latest) = app.state.graphs.latest() {
                    ui.label(format!("Device time: {}", format_uptime(latest.time)));
                    ui.separator();
                }

                if let Some(finished) = &app.state.last_finished {
                    ui.label(format!("Last run: {} lines", finished.total()));
                    ui.separator();
                }

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if !app.state.config_status.is_empty() {
                        ui.colored_label(egui::Color32::from_rgb(0, 100, 200), &app.state.config_status);
                    }
                });
            });
            ui.add_space(3.0);
        });
}
