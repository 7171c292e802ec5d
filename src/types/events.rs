use super::IngestStats;

/// Status messages from the ingest thread to the GUI
#[derive(Debug, Clone, PartialEq)]
pub enum IngestEvent {
    /// Source opened; carries a human readable description such as the port name
    Connected(String),
    /// Source reported end of stream, or the loop was asked to stop
    Finished(IngestStats),
    /// Source failed with an I/O error
    Failed(String),
}

impl IngestEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, IngestEvent::Connected(_))
    }
}
