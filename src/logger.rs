use chrono::Local;
use env_logger::Builder;
use log::Level;
use std::io::Write;

/// 初始化日志：默认 info 级别，可通过 RUST_LOG 覆盖
/// 例如 RUST_LOG=imu_calibrate=debug 会打印每一个解码后的样本
pub fn init_logger() {
    init_logger_with_default("info");
}

pub fn init_logger_with_default(default_filter: &str) {
    let result = Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let time = Local::now().format("%H:%M:%S%.3f");
            writeln!(
                buf,
                "{} {}{:<5}\x1b[0m [{}:{}] {}",
                time,
                level_color(record.level()),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args(),
            )
        })
        .try_init();

    // 重复初始化（例如测试中）不是错误
    if let Err(e) = result {
        log::debug!("Logger already initialised: {}", e);
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m\x1b[1m", // 红色
        Level::Warn => "\x1b[33m\x1b[1m",  // 黄色
        Level::Info => "\x1b[32m\x1b[1m",  // 绿色
        Level::Debug => "\x1b[36m\x1b[1m", // 青色
        Level::Trace => "\x1b[90m\x1b[1m", // 灰色
    }
}
