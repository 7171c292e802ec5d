use eframe::egui;
use crate::app::app_core::CalibrateApp;

pub fn render_main_panel(app: &mut CalibrateApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        // 控制面板
        ui.horizontal(|ui| {
            // 快捷键说明
            ui.label("Hotkey:");
            ui.colored_label(egui::Color32::from_rgb(0, 150, 0), "SPACE");
            ui.label("Pause plots");
            ui.colored_label(egui::Color32::from_rgb(0, 150, 0), "S");
            ui.label("Start simulator");

            ui.separator();
            ui.checkbox(
                &mut app.config.get_config_mut().plot.show_local_kalman,
                "Overlay local Kalman",
            );

            if let Some(latest) = app.state.graphs.latest() {
                ui.separator();
                ui.label(format!(
                    "Kalman roll {:>8.3}  pitch {:>8.3}",
                    latest.kalman.roll, latest.kalman.pitch
                ));
            }
        });

        ui.separator();

        let plot_config = app.config.get_config().plot.clone();
        app.state.graphs.ui(ui, &plot_config);
    });
}
