use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use super::source::{LineSource, SourceError};
use crate::config::{AppConfig, KalmanConfig};
use crate::kalman::AttitudeKalman;
use crate::protocol::{decode, DecodeError};
use crate::ring::SampleRing;
use crate::types::{AttitudeEstimate, IngestEvent, IngestStats, Sample, SharedStats};

/// Decode → local Kalman → ring.
///
/// Owned by the single ingest thread; readers only touch the shared rings
/// and counters.
pub struct IngestPipeline {
    samples: Arc<SampleRing>,
    estimates: Arc<SampleRing<AttitudeEstimate>>,
    attitude: AttitudeKalman,
    stats: Arc<SharedStats>,
    tuning_updates: Option<Receiver<KalmanConfig>>,
}

impl IngestPipeline {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            samples: Arc::new(SampleRing::new(config.ring.capacity)),
            estimates: Arc::new(SampleRing::new(config.ring.capacity)),
            attitude: AttitudeKalman::new(
                &config.kalman.roll,
                &config.kalman.pitch,
                config.gyro.clone(),
            ),
            stats: Arc::new(SharedStats::new()),
            tuning_updates: None,
        }
    }

    /// Re-reads Kalman tuning from `updates` before each line
    pub fn with_tuning_updates(mut self, updates: Receiver<KalmanConfig>) -> Self {
        self.tuning_updates = Some(updates);
        self
    }

    pub fn samples(&self) -> Arc<SampleRing> {
        Arc::clone(&self.samples)
    }

    pub fn estimates(&self) -> Arc<SampleRing<AttitudeEstimate>> {
        Arc::clone(&self.estimates)
    }

    pub fn stats(&self) -> Arc<SharedStats> {
        Arc::clone(&self.stats)
    }

    /// Decodes one raw line and, on success, appends it to the ring.
    ///
    /// Malformed lines are counted and logged, then returned to the caller;
    /// nothing is appended for them.
    pub fn push_line(&mut self, raw: &str) -> Result<Sample, DecodeError> {
        self.apply_tuning_updates();

        match decode(raw) {
            Ok(sample) => {
                debug!("{}", sample);
                let estimate = self.attitude.update(&sample);
                self.samples.append(sample);
                self.estimates.append(estimate);
                self.stats.record_decoded();
                Ok(sample)
            }
            Err(DecodeError::Empty) => {
                self.stats.record_empty();
                Err(DecodeError::Empty)
            }
            Err(e) => {
                warn!("Dropping line: {} ({:?})", e, raw);
                self.stats.record_malformed();
                Err(e)
            }
        }
    }

    fn apply_tuning_updates(&mut self) {
        let Some(updates) = &self.tuning_updates else {
            return;
        };
        // 只保留最新的一组参数
        if let Some(tuning) = updates.try_iter().last() {
            info!(
                "Kalman retuned: roll {:?}, pitch {:?}",
                tuning.roll, tuning.pitch
            );
            self.attitude.retune(&tuning.roll, &tuning.pitch);
        }
    }

    /// Pulls lines until the source ends or `shutdown` is raised.
    ///
    /// Decode failures never stop the loop; only source errors do.
    pub fn run<S: LineSource + ?Sized>(
        &mut self,
        source: &mut S,
        shutdown: &AtomicBool,
    ) -> Result<IngestStats, SourceError> {
        while !shutdown.load(Ordering::Relaxed) {
            match source.next_line() {
                Ok(Some(line)) => {
                    let _ = self.push_line(&line);
                }
                Ok(None) => continue,
                Err(SourceError::EndOfStream) => {
                    info!("{} reached end of stream", source.describe());
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(self.stats.snapshot())
    }
}

/// Runs `pipeline` over `source` on a dedicated thread and reports progress on `events`.
pub fn spawn_ingest(
    mut pipeline: IngestPipeline,
    mut source: Box<dyn LineSource>,
    shutdown: Arc<AtomicBool>,
    events: Sender<IngestEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("imu-ingest".to_string())
        .spawn(move || {
            let name = source.describe();
            info!("Ingest started on {}", name);
            notify(&events, IngestEvent::Connected(name.clone()));

            let event = match pipeline.run(source.as_mut(), &shutdown) {
                Ok(stats) => {
                    info!(
                        "Ingest on {} finished: {} decoded, {} malformed, {} empty",
                        name, stats.decoded, stats.malformed, stats.empty
                    );
                    IngestEvent::Finished(stats)
                }
                Err(e) => {
                    error!("Ingest on {} failed: {}", name, e);
                    IngestEvent::Failed(e.to_string())
                }
            };
            notify(&events, event);
        })
}

fn notify(events: &Sender<IngestEvent>, event: IngestEvent) {
    // 界面已关闭时通道断开，忽略即可
    if let Err(e) = events.try_send(event) {
        debug!("Ingest event not delivered: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode, Malformed};
    use crate::types::{FilterSample, SensorSample};
    use std::collections::VecDeque;
    use std::io;

    struct ScriptedSource {
        steps: VecDeque<Result<Option<String>, SourceError>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Result<Option<String>, SourceError>>) -> Self {
            Self { steps: steps.into() }
        }
    }

    impl LineSource for ScriptedSource {
        fn next_line(&mut self) -> Result<Option<String>, SourceError> {
            self.steps.pop_front().unwrap_or(Err(SourceError::EndOfStream))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn line_at(time: i64) -> String {
        encode(&Sample {
            time,
            raw: FilterSample::new(1.0, -1.0),
            ..Default::default()
        })
        .unwrap()
    }

    fn small_config(capacity: usize) -> AppConfig {
        let mut config = AppConfig::default();
        config.ring.capacity = capacity;
        config
    }

    #[test]
    fn push_line_appends_decoded_sample() {
        let mut pipeline = IngestPipeline::new(&AppConfig::default());
        let expected = Sample {
            time: 1234567890,
            acc: SensorSample::new(100, -200, 300),
            gyro: SensorSample::new(10, -20, 30),
            raw: FilterSample::new(1.5, -2.5),
            kalman: FilterSample::new(1.4, -2.4),
            comp: FilterSample::new(1.45, -2.45),
            gyro_filter: FilterSample::new(1.3, -2.3),
        };

        let sample = pipeline.push_line(&encode(&expected).unwrap()).unwrap();
        assert_eq!(sample, expected);
        assert_eq!(pipeline.samples().snapshot(), vec![expected]);
        assert_eq!(pipeline.estimates().len(), 1);
        assert_eq!(pipeline.stats().snapshot().decoded, 1);
    }

    #[test]
    fn bad_lines_leave_ring_untouched() {
        let mut pipeline = IngestPipeline::new(&AppConfig::default());

        assert_eq!(pipeline.push_line(""), Err(DecodeError::Empty));
        assert!(matches!(
            pipeline.push_line("T: 12"),
            Err(DecodeError::Malformed(Malformed::TooShort { .. }))
        ));

        assert!(pipeline.samples().is_empty());
        assert!(pipeline.estimates().is_empty());
        assert_eq!(
            pipeline.stats().snapshot(),
            IngestStats { decoded: 0, empty: 1, malformed: 1 }
        );
    }

    #[test]
    fn run_skips_bad_lines_and_stops_at_end_of_stream() {
        let mut pipeline = IngestPipeline::new(&small_config(10));
        let mut source = ScriptedSource::new(vec![
            Ok(Some(line_at(10))),
            Ok(None),
            Ok(Some("garbage".to_string())),
            Ok(Some(String::new())),
            Ok(Some(line_at(20))),
            Err(SourceError::EndOfStream),
            Ok(Some(line_at(30))),
        ]);

        let stats = pipeline.run(&mut source, &AtomicBool::new(false)).unwrap();
        assert_eq!(stats, IngestStats { decoded: 2, empty: 1, malformed: 1 });

        let times: Vec<i64> = pipeline.samples().snapshot().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![10, 20]);
    }

    #[test]
    fn run_propagates_io_errors() {
        let mut pipeline = IngestPipeline::new(&AppConfig::default());
        let mut source = ScriptedSource::new(vec![
            Ok(Some(line_at(1))),
            Err(SourceError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"))),
        ]);

        let err = pipeline.run(&mut source, &AtomicBool::new(false)).unwrap_err();
        assert!(matches!(err, SourceError::Io(_)));
        assert_eq!(pipeline.samples().len(), 1);
    }

    #[test]
    fn run_honours_shutdown_flag() {
        let mut pipeline = IngestPipeline::new(&AppConfig::default());
        let mut source = ScriptedSource::new(vec![Ok(Some(line_at(1)))]);

        let stats = pipeline.run(&mut source, &AtomicBool::new(true)).unwrap();
        assert_eq!(stats.total(), 0);
        assert!(pipeline.samples().is_empty());
    }

    #[test]
    fn ring_keeps_only_latest_window() {
        let mut pipeline = IngestPipeline::new(&small_config(3));
        for t in 1..=5 {
            pipeline.push_line(&line_at(t * 10)).unwrap();
        }
        let times: Vec<i64> = pipeline.samples().snapshot().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![30, 40, 50]);
        let estimate_times: Vec<i64> = pipeline.estimates().snapshot().iter().map(|e| e.time).collect();
        assert_eq!(estimate_times, times);
    }

    #[test]
    fn tuning_updates_apply_latest() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut pipeline = IngestPipeline::new(&AppConfig::default()).with_tuning_updates(rx);

        let mut first = KalmanConfig::default();
        first.roll.r_measure = 1.0;
        let mut second = KalmanConfig::default();
        second.roll.r_measure = 2.0;
        second.pitch.q_bias = 0.5;
        tx.send(first).unwrap();
        tx.send(second).unwrap();

        pipeline.push_line(&line_at(1)).unwrap();
        assert_eq!(pipeline.attitude.roll().r_measure(), 2.0);
        assert_eq!(pipeline.attitude.pitch().q_bias(), 0.5);
    }

    #[test]
    fn spawned_ingest_reports_events() {
        let pipeline = IngestPipeline::new(&AppConfig::default());
        let samples = pipeline.samples();
        let (tx, rx) = crossbeam_channel::bounded(4);
        let source = ScriptedSource::new(vec![Ok(Some(line_at(5))), Ok(Some(line_at(6)))]);

        let handle = spawn_ingest(
            pipeline,
            Box::new(source),
            Arc::new(AtomicBool::new(false)),
            tx,
        )
        .unwrap();
        handle.join().unwrap();

        assert_eq!(rx.recv().unwrap(), IngestEvent::Connected("scripted".to_string()));
        assert_eq!(
            rx.recv().unwrap(),
            IngestEvent::Finished(IngestStats { decoded: 2, empty: 0, malformed: 0 })
        );
        assert_eq!(samples.len(), 2);
    }
}
