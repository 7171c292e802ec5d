use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use imu_calibrate::config::{AppConfig, KalmanConfig};
use imu_calibrate::ring::SampleRing;
use imu_calibrate::types::{AttitudeEstimate, IngestEvent, IngestStats, SharedStats};

use crate::plotter::GraphGrid;

/// 应用状态管理模块

/// Where lines come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Serial,
    Simulator,
}

/// 连接状态
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting(String),
    Connected(String),
    Failed(String),
}

impl ConnectionStatus {
    pub fn label(&self) -> String {
        match self {
            ConnectionStatus::Disconnected => "Disconnected".to_string(),
            ConnectionStatus::Connecting(name) => format!("Connecting to {}", name),
            ConnectionStatus::Connected(name) => format!("Connected: {}", name),
            ConnectionStatus::Failed(reason) => format!("Failed: {}", reason),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ConnectionStatus::Connecting(_) | ConnectionStatus::Connected(_))
    }
}

/// 采集线程句柄，断开时一起释放
pub struct IngestSession {
    pub shutdown: Arc<AtomicBool>,
    pub handle: Option<JoinHandle<()>>,
    pub tuning_sender: Sender<KalmanConfig>,
}

/// Ring handles shared with the ingest thread
pub struct SharedData {
    pub samples: Arc<SampleRing>,
    pub estimates: Arc<SampleRing<AttitudeEstimate>>,
    pub stats: Arc<SharedStats>,
}

impl SharedData {
    pub fn empty(capacity: usize) -> Self {
        Self {
            samples: Arc::new(SampleRing::new(capacity)),
            estimates: Arc::new(SampleRing::new(capacity)),
            stats: Arc::new(SharedStats::new()),
        }
    }
}

/// 统一的应用状态管理
pub struct AppState {
    pub status: ConnectionStatus,
    pub session: Option<IngestSession>,
    pub data: SharedData,
    pub event_sender: Sender<IngestEvent>,
    pub event_receiver: Receiver<IngestEvent>,
    pub last_finished: Option<IngestStats>,
    pub available_ports: Vec<String>,
    pub graphs: GraphGrid,
    pub paused: bool,
    pub config_status: String,
}

impl AppState {
    pub fn new(config: &AppConfig) -> Self {
        let (event_sender, event_receiver) =
            crossbeam_channel::bounded(config.channels.event_channel_capacity);

        Self {
            status: ConnectionStatus::Disconnected,
            session: None,
            data: SharedData::empty(config.ring.capacity),
            event_sender,
            event_receiver,
            last_finished: None,
            available_ports: Vec::new(),
            graphs: GraphGrid::new(config.gyro.time_scale_seconds),
            paused: false,
            config_status: String::new(),
        }
    }

    pub fn live_stats(&self) -> IngestStats {
        self.data.stats.snapshot()
    }

    /// 暂停时保留上一帧画面，不再读取新快照
    pub fn refresh_graphs(&mut self) {
        if self.paused {
            return;
        }
        self.graphs
            .update(self.data.samples.snapshot(), self.data.estimates.snapshot());
    }
}
