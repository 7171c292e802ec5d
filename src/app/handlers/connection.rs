use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use imu_calibrate::ingest::{self, IngestPipeline, LineSource, SimulatedLineSource};
use imu_calibrate::types::IngestEvent;

use crate::app::app_core::CalibrateApp;
use crate::app::state::{ConnectionStatus, IngestSession, SharedData, SourceKind};

pub struct ConnectionHandler;

impl ConnectionHandler {
    pub fn refresh_ports(app: &mut CalibrateApp) {
        app.state.available_ports = ingest::available_ports();
        for port in &app.state.available_ports {
            info!("Available port: {}", port);
        }
    }

    pub fn connect(app: &mut CalibrateApp, kind: SourceKind) {
        if app.state.session.is_some() {
            Self::disconnect(app);
        }

        let config = app.config.get_config().clone();
        let source: Box<dyn LineSource> = match kind {
            SourceKind::Serial => match ingest::open_serial(&config.serial) {
                Ok(source) => Box::new(source),
                Err(e) => {
                    warn!("Failed to open {}: {}", config.serial.port, e);
                    app.state.status = ConnectionStatus::Failed(e.to_string());
                    return;
                }
            },
            SourceKind::Simulator => {
                let seed = chrono::Local::now().timestamp_millis() as u64;
                Box::new(SimulatedLineSource::new(seed, config.gyro.clone()).paced())
            }
        };

        // 每次连接使用新的窗口和计数器
        let (tuning_sender, tuning_receiver) = crossbeam_channel::unbounded();
        let pipeline = IngestPipeline::new(&config).with_tuning_updates(tuning_receiver);
        app.state.data = SharedData {
            samples: pipeline.samples(),
            estimates: pipeline.estimates(),
            stats: pipeline.stats(),
        };

        let shutdown = Arc::new(AtomicBool::new(false));
        let name = source.describe();
        match ingest::spawn_ingest(
            pipeline,
            source,
            Arc::clone(&shutdown),
            app.state.event_sender.clone(),
        ) {
            Ok(handle) => {
                app.state.session = Some(IngestSession {
                    shutdown,
                    handle: Some(handle),
                    tuning_sender,
                });
                app.state.status = ConnectionStatus::Connecting(name);
                app.state.last_finished = None;
            }
            Err(e) => {
                warn!("Failed to start ingest thread: {}", e);
                app.state.status = ConnectionStatus::Failed(e.to_string());
            }
        }
    }

    pub fn disconnect(app: &mut CalibrateApp) {
        let Some(mut session) = app.state.session.take() else {
            return;
        };
        session.shutdown.store(true, Ordering::Relaxed);
        // 串口读超时很短，线程会很快退出
        if let Some(handle) = session.handle.take() {
            if handle.join().is_err() {
                warn!("Ingest thread panicked");
            }
        }
        Self::handle_events(app);
        app.state.status = ConnectionStatus::Disconnected;
        info!("Disconnected");
    }

    /// Drains status events from the ingest thread.
    pub fn handle_events(app: &mut CalibrateApp) {
        while let Ok(event) = app.state.event_receiver.try_recv() {
            match event {
                IngestEvent::Connected(name) => {
                    app.state.status = ConnectionStatus::Connected(name);
                }
                IngestEvent::Finished(stats) => {
                    app.state.last_finished = Some(stats);
                    app.state.status = ConnectionStatus::Disconnected;
                    Self::release_finished_session(app);
                }
                IngestEvent::Failed(reason) => {
                    app.state.status = ConnectionStatus::Failed(reason);
                    Self::release_finished_session(app);
                }
            }
        }
    }

    fn release_finished_session(app: &mut CalibrateApp) {
        if let Some(mut session) = app.state.session.take() {
            if let Some(handle) = session.handle.take() {
                let _ = handle.join();
            }
        }
    }

    /// Pushes the current Kalman tuning to the running ingest thread.
    pub fn send_tuning(app: &mut CalibrateApp) {
        if let Some(session) = &app.state.session {
            let tuning = app.config.get_config().kalman.clone();
            if let Err(e) = session.tuning_sender.send(tuning) {
                warn!("Ingest thread is gone, tuning not applied: {}", e);
            }
        }
    }
}
