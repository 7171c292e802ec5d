mod app;
mod plotter;

use std::env;

use eframe::egui;
use log::{error, info};

use imu_calibrate::config::ConfigManager;
use imu_calibrate::logger;

const DEFAULT_CONFIG_PATH: &str = "imu_calibrate.toml";

fn main() {
    logger::init_logger();
    info!("Application starting");

    let config_path = env::var("IMU_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
    let mut config = match ConfigManager::load_or_default(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    // 环境变量（含 .env）优先于配置文件
    config.get_config_mut().apply_env_overrides();
    if let Err(e) = config.get_config().validate() {
        error!("Invalid configuration after environment overrides: {}", e);
        std::process::exit(1);
    }

    let window = config.get_config().window.clone();
    let options = eframe::NativeOptions {
        vsync: window.vsync,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred, // 硬件加速优先模式
        renderer: eframe::Renderer::Glow, // 使用Glow渲染器获得更好性能
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([window.width, window.height])
            .with_resizable(window.resizable),
        ..Default::default()
    };

    // 采集线程在 CalibrateApp 释放时停止
    if let Err(e) = eframe::run_native(
        &window.title,
        options,
        Box::new(|_cc| Ok(Box::new(app::CalibrateApp::new(config)))),
    ) {
        error!("GUI failed: {}", e);
        std::process::exit(1);
    }

    info!("GUI closed");
}
