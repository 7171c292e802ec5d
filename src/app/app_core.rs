use std::time::Duration;
use eframe::{egui, Frame};
use log::info;

use imu_calibrate::config::ConfigManager;

use super::handlers::ConnectionHandler;
use super::state::{AppState, SourceKind};

pub struct CalibrateApp {
    // 统一的状态管理
    pub state: AppState,

    // 配置管理
    pub config: ConfigManager,

    pub show_tuning_panel: bool,
}

impl CalibrateApp {
    pub fn new(config: ConfigManager) -> Self {
        let state = AppState::new(config.get_config());

        let mut app = CalibrateApp {
            state,
            config,
            show_tuning_panel: true,
        };
        ConnectionHandler::refresh_ports(&mut app);

        info!("应用启动，等待连接串口或启动模拟器...");
        app
    }

    fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        // 空格暂停/恢复画面
        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            self.state.paused = !self.state.paused;
        }
        // S 键启动模拟器
        if ctx.input(|i| i.key_pressed(egui::Key::S)) && !self.state.status.is_active() {
            ConnectionHandler::connect(self, SourceKind::Simulator);
        }
    }
}

impl eframe::App for CalibrateApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut Frame) {
        // 设置明亮模式主题
        ctx.set_visuals(egui::Visuals::light());

        // 先处理采集线程事件，再取快照绘制
        ConnectionHandler::handle_events(self);
        self.state.refresh_graphs();

        crate::app::ui::render_status_bar(self, ctx);
        crate::app::ui::render_bottom_status_bar(self, ctx);
        crate::app::ui::render_tuning_panel(self, ctx);
        crate::app::ui::render_main_panel(self, ctx);

        self.handle_keyboard_input(ctx);

        let interval = self.config.get_config().plot.repaint_interval_ms;
        ctx.request_repaint_after(Duration::from_millis(interval));
    }
}

impl Drop for CalibrateApp {
    fn drop(&mut self) {
        ConnectionHandler::disconnect(self);
    }
}
