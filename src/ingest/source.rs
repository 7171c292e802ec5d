use std::io::{self, BufRead, BufReader};
use std::time::Duration;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::config::{GyroConfig, SerialConfig};
use crate::protocol::encode;
use crate::types::{FilterSample, Sample, SensorSample};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("end of stream")]
    EndOfStream,
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

/// Anything that hands out complete telemetry lines.
///
/// `Ok(None)` means nothing arrived this tick and the caller should ask
/// again; end of input is reported as `SourceError::EndOfStream`.
pub trait LineSource: Send {
    fn next_line(&mut self) -> Result<Option<String>, SourceError>;

    /// Human readable name for logs and the status bar
    fn describe(&self) -> String;
}

/// Lines from any buffered reader: log replays, stdin, pipes.
pub struct ReaderLineSource<R> {
    reader: R,
    name: String,
    buffer: Vec<u8>,
}

impl<R: BufRead + Send> ReaderLineSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
            buffer: Vec::new(),
        }
    }
}

impl<R: BufRead + Send> LineSource for ReaderLineSource<R> {
    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) if self.buffer.is_empty() => Err(SourceError::EndOfStream),
            Ok(_) => {
                // 非 UTF-8 字节交给解码器判为坏行，不中断读取
                let line = String::from_utf8_lossy(&self.buffer)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                self.buffer.clear();
                Ok(Some(line))
            }
            // 串口读超时：已读到的半行留在缓冲区，下次接着读
            Err(e) if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

pub type SerialLineSource = ReaderLineSource<BufReader<Box<dyn serialport::SerialPort>>>;

/// Opens the configured serial port as a line source.
///
/// A read timeout surfaces as `Ok(None)`, so the ingest loop stays
/// responsive to shutdown while the device is quiet.
pub fn open_serial(config: &SerialConfig) -> Result<SerialLineSource, SourceError> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(config.timeout_ms))
        .open()?;
    info!("Opened serial port {} at {} baud", config.port, config.baud_rate);
    Ok(ReaderLineSource::new(
        BufReader::new(port),
        format!("{} @ {}", config.port, config.baud_rate),
    ))
}

/// Port names reported by the OS, for the connect dialog.
pub fn available_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(e) => {
            log::warn!("Failed to enumerate serial ports: {}", e);
            Vec::new()
        }
    }
}

/// Synthetic IMU swinging on both axes, printed in the firmware's line format.
///
/// Every `malformed_every`-th line is cut short, to exercise the drop path.
pub struct SimulatedLineSource {
    rng: StdRng,
    gyro: GyroConfig,
    time: i64,
    step_ms: i64,
    remaining: Option<usize>,
    malformed_every: Option<usize>,
    emitted: usize,
    gyro_angle: (f64, f64),
    comp_angle: (f64, f64),
    bias_counts: i32,
    paced: bool,
}

impl SimulatedLineSource {
    pub fn new(seed: u64, gyro: GyroConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            gyro,
            time: 0,
            step_ms: 10,
            remaining: None,
            malformed_every: None,
            emitted: 0,
            gyro_angle: (0.0, 0.0),
            comp_angle: (0.0, 0.0),
            bias_counts: 25,
            paced: false,
        }
    }

    /// Ends the stream after `lines` lines
    pub fn with_limit(mut self, lines: usize) -> Self {
        self.remaining = Some(lines);
        self
    }

    pub fn with_malformed_every(mut self, every: usize) -> Self {
        self.malformed_every = Some(every.max(1));
        self
    }

    pub fn with_step_ms(mut self, step_ms: i64) -> Self {
        self.step_ms = step_ms.max(1);
        self
    }

    /// Sleeps one step per line so the stream runs at device speed
    pub fn paced(mut self) -> Self {
        self.paced = true;
        self
    }

    fn next_sample(&mut self) -> Sample {
        self.time += self.step_ms;
        let t = self.time as f64 * self.gyro.time_scale_seconds;
        let dt = self.step_ms as f64 * self.gyro.time_scale_seconds;

        let roll = 25.0 * (0.8 * t).sin();
        let pitch = 15.0 * (0.5 * t).cos();
        let roll_rate = 25.0 * 0.8 * (0.8 * t).cos();
        let pitch_rate = -15.0 * 0.5 * (0.5 * t).sin();

        let noisy_roll = roll + self.rng.random_range(-1.0..1.0);
        let noisy_pitch = pitch + self.rng.random_range(-1.0..1.0);

        // 与固件符号约定一致：pitch 对应 gyro.x，roll 对应 -gyro.y
        let gx = (pitch_rate * self.gyro.sensitivity).round() as i32 + self.bias_counts;
        let gy = (-roll_rate * self.gyro.sensitivity).round() as i32 + self.bias_counts;
        let gz = self.rng.random_range(-30..30);

        let rate_x = gx as f64 / self.gyro.sensitivity;
        let rate_y = gy as f64 / self.gyro.sensitivity;
        // 纯积分会随零偏漂移，限制在 ±180° 以内，避免超出 8 字符列宽
        self.gyro_angle.0 = wrap_degrees(self.gyro_angle.0 - rate_y * dt);
        self.gyro_angle.1 = wrap_degrees(self.gyro_angle.1 + rate_x * dt);
        self.comp_angle.0 = 0.98 * (self.comp_angle.0 - rate_y * dt) + 0.02 * noisy_roll;
        self.comp_angle.1 = 0.98 * (self.comp_angle.1 + rate_x * dt) + 0.02 * noisy_pitch;

        let g = 16384.0;
        let acc = SensorSample::new(
            (g * noisy_roll.to_radians().sin()) as i32,
            (g * noisy_pitch.to_radians().sin()) as i32,
            (g * noisy_roll.to_radians().cos() * noisy_pitch.to_radians().cos()) as i32,
        );

        Sample {
            time: self.time,
            acc,
            gyro: SensorSample::new(gx, gy, gz),
            raw: FilterSample::new(noisy_roll, noisy_pitch),
            kalman: FilterSample::new(roll, pitch),
            comp: FilterSample::new(self.comp_angle.0, self.comp_angle.1),
            gyro_filter: FilterSample::new(self.gyro_angle.0, self.gyro_angle.1),
        }
    }
}

fn wrap_degrees(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

impl LineSource for SimulatedLineSource {
    fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SourceError::EndOfStream);
            }
            *remaining -= 1;
        }
        self.emitted += 1;
        if self.paced {
            std::thread::sleep(Duration::from_millis(self.step_ms as u64));
        }

        let sample = self.next_sample();
        let mut line = encode(&sample)
            .map_err(|e| SourceError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        if let Some(every) = self.malformed_every {
            if self.emitted % every == 0 {
                line.truncate(line.len() / 2);
            }
        }
        Ok(Some(line))
    }

    fn describe(&self) -> String {
        "simulator".to_string()
    }
}
