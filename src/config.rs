use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kalman::{DEFAULT_Q_ANGLE, DEFAULT_Q_BIAS, DEFAULT_R_MEASURE};

/// 应用配置管理模块
/// 集中管理所有配置项，提供默认值和配置验证

/// 主配置结构
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub window: WindowConfig,
    pub serial: SerialConfig,
    pub ring: RingConfig,
    pub kalman: KalmanConfig,
    pub gyro: GyroConfig,
    pub plot: PlotConfig,
    pub channels: ChannelConfig,
}

/// 窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub resizable: bool,
    pub vsync: bool,
}

/// 串口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

/// 滑动窗口配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub capacity: usize,
}

/// Kalman tuning for one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KalmanTuning {
    pub q_angle: f32,
    pub q_bias: f32,
    pub r_measure: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KalmanConfig {
    pub roll: KalmanTuning,
    pub pitch: KalmanTuning,
}

/// 陀螺仪换算配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GyroConfig {
    /// Raw counts per deg/s
    pub sensitivity: f64,
    /// Seconds per unit of the line's time column
    pub time_scale_seconds: f64,
}

/// 绘图配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub repaint_interval_ms: u64,
    pub plot_height: f32,
    pub show_local_kalman: bool,
    pub colors: PlotColors,
}

/// 绘图颜色配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotColors {
    pub acc: [u8; 3],
    pub gyro: [u8; 3],
    pub roll: [u8; 3],
    pub pitch: [u8; 3],
    pub local_kalman: [u8; 3],
}

/// 通道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub event_channel_capacity: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 800.0,
            title: "Calibrate IMU".to_string(),
            resizable: true,
            vsync: true,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout_ms: 100,
        }
    }
}

impl Default for RingConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl Default for KalmanTuning {
    fn default() -> Self {
        Self {
            q_angle: DEFAULT_Q_ANGLE,
            q_bias: DEFAULT_Q_BIAS,
            r_measure: DEFAULT_R_MEASURE,
        }
    }
}

impl Default for GyroConfig {
    fn default() -> Self {
        Self {
            sensitivity: 110.0,
            time_scale_seconds: 0.001,
        }
    }
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            repaint_interval_ms: 1000,
            plot_height: 120.0,
            show_local_kalman: true,
            colors: PlotColors::default(),
        }
    }
}

impl Default for PlotColors {
    fn default() -> Self {
        Self {
            acc: [200, 0, 0],           // 红色
            gyro: [0, 0, 200],          // 蓝色
            roll: [0, 140, 0],          // 绿色
            pitch: [128, 0, 128],       // 紫色
            local_kalman: [255, 140, 0], // 橙色
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 64,
        }
    }
}

impl KalmanTuning {
    fn validate(&self, axis: &str) -> Result<(), ConfigError> {
        for (name, value) in [
            ("q_angle", self.q_angle),
            ("q_bias", self.q_bias),
            ("r_measure", self.r_measure),
        ] {
            // r_measure 为 0 时滤波器会出现除零，这里统一要求正数
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "kalman.{}.{} must be a positive number, got {}",
                    axis, name, value
                )));
            }
        }
        Ok(())
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        let config: AppConfig = toml::from_str(&content).map_err(ConfigError::ParseError)?;

        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width <= 0.0 || self.window.height <= 0.0 {
            return Err(ConfigError::ValidationError("Window dimensions must be positive".to_string()));
        }

        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::ValidationError("Serial port must not be empty".to_string()));
        }

        if self.serial.baud_rate == 0 {
            return Err(ConfigError::ValidationError("Baud rate must be positive".to_string()));
        }

        if self.ring.capacity == 0 {
            return Err(ConfigError::ValidationError("Ring capacity must be positive".to_string()));
        }

        if !(self.gyro.sensitivity > 0.0) || !(self.gyro.time_scale_seconds > 0.0) {
            return Err(ConfigError::ValidationError(
                "Gyro sensitivity and time scale must be positive".to_string(),
            ));
        }

        self.kalman.roll.validate("roll")?;
        self.kalman.pitch.validate("pitch")?;

        if self.plot.repaint_interval_ms == 0 {
            return Err(ConfigError::ValidationError("Repaint interval must be positive".to_string()));
        }

        if self.channels.event_channel_capacity == 0 {
            return Err(ConfigError::ValidationError("Event channel capacity must be positive".to_string()));
        }

        Ok(())
    }

    /// 用环境变量覆盖串口设置（支持 .env 文件）
    pub fn apply_env_overrides(&mut self) {
        dotenv::dotenv().ok();

        if let Ok(port) = std::env::var("IMU_SERIAL_PORT") {
            self.serial.port = port;
        }
        if let Ok(baud) = std::env::var("IMU_BAUD_RATE") {
            match baud.parse::<u32>() {
                Ok(baud) => self.serial.baud_rate = baud,
                Err(e) => log::warn!("Ignoring IMU_BAUD_RATE={:?}: {}", baud, e),
            }
        }
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_path: None,
        }
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = AppConfig::load_from_file(&path)?;
        Ok(Self {
            config,
            config_path: Some(path.as_ref().to_path_buf()),
        })
    }

    /// 文件不存在时使用默认配置，文件存在但无效时报错
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            log::info!("No config at {}, using defaults", path.as_ref().display());
            Ok(Self {
                config: AppConfig::default(),
                config_path: Some(path.as_ref().to_path_buf()),
            })
        }
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 获取可变配置
    pub fn get_config_mut(&mut self) -> &mut AppConfig {
        &mut self.config
    }

    /// 保存配置
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.config_path {
            self.config.validate()?;
            self.config.save_to_file(path)?;
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ring.capacity, 100);
        assert_eq!(config.kalman.roll, KalmanTuning { q_angle: 0.001, q_bias: 0.003, r_measure: 0.03 });
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn saves_and_loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imu.toml");

        let mut config = AppConfig::default();
        config.ring.capacity = 250;
        config.kalman.pitch.r_measure = 0.5;
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let config: AppConfig = toml::from_str("[ring]\ncapacity = 10\n").unwrap();
        assert_eq!(config.ring.capacity, 10);
        assert_eq!(config.serial, SerialConfig::default());
        assert_eq!(config.kalman.roll, KalmanTuning::default());
    }

    #[test]
    fn rejects_zero_capacity_and_zero_r_measure() {
        let mut config = AppConfig::default();
        config.ring.capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.kalman.roll.r_measure = 0.0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("kalman.roll.r_measure"), "{}", err);

        let mut config = AppConfig::default();
        config.gyro.sensitivity = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_or_default_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConfigManager::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(manager.get_config(), &AppConfig::default());
    }

    #[test]
    fn invalid_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[ring]\ncapacity = \"many\"\n").unwrap();
        assert!(matches!(AppConfig::load_from_file(&path), Err(ConfigError::ParseError(_))));
    }
}
