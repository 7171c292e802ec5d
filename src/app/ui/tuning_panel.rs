use eframe::egui;
use log::{info, warn};

use imu_calibrate::config::KalmanTuning;

use crate::app::app_core::CalibrateApp;
use crate::app::handlers::ConnectionHandler;

/// Kalman 参数调节面板，修改后立即下发给采集线程
pub fn render_tuning_panel(app: &mut CalibrateApp, ctx: &egui::Context) {
    if !app.show_tuning_panel {
        return;
    }

    let mut changed = false;
    let mut save_clicked = false;
    let mut reset_clicked = false;

    egui::SidePanel::right("tuning_panel")
        .resizable(false)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Kalman Tuning");
            ui.add_space(5.0);

            let kalman = &mut app.config.get_config_mut().kalman;
            changed |= tuning_sliders(ui, "Roll", &mut kalman.roll);
            ui.separator();
            changed |= tuning_sliders(ui, "Pitch", &mut kalman.pitch);

            ui.add_space(10.0);
            ui.horizontal(|ui| {
                reset_clicked = ui.button("↺ Defaults").clicked();
                save_clicked = ui.button("💾 Save config").clicked();
            });
        });

    if reset_clicked {
        app.config.get_config_mut().kalman = Default::default();
        changed = true;
    }

    if changed {
        ConnectionHandler::send_tuning(app);
    }

    if save_clicked {
        app.state.config_status = match app.config.save() {
            Ok(()) => {
                info!("Configuration saved");
                "Configuration saved".to_string()
            }
            Err(e) => {
                warn!("Failed to save configuration: {}", e);
                format!("Save failed: {}", e)
            }
        };
    }
}

fn tuning_sliders(ui: &mut egui::Ui, axis: &str, tuning: &mut KalmanTuning) -> bool {
    ui.label(axis);
    let mut changed = false;
    // 噪声项必须为正
    changed |= ui
        .add(egui::Slider::new(&mut tuning.q_angle, 1e-5..=1.0).logarithmic(true).text("Q angle"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut tuning.q_bias, 1e-5..=1.0).logarithmic(true).text("Q bias"))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut tuning.r_measure, 1e-4..=10.0).logarithmic(true).text("R measure"))
        .changed();
    changed
}
