// src/engine.rs
use crate::drivers::{AcquisitionError, AcquisitionPipeline, SampleSource};
use crate::psth::PsthProcessor;
use crate::recorder;
use crate::types::*;
use log::{debug, info, warn};
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Commands drained per loop turn before the next batch is pulled
const MAX_COMMANDS_PER_TURN: usize = 10;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

enum Flow {
    Continue,
    Shutdown,
}

/// Runs the acquisition loop on its own thread. Commands are applied only
/// between batches, so a batch is always ingested under one configuration.
/// The processor is handed back through the join handle on shutdown.
pub fn spawn_thread<S>(
    mut pipeline: AcquisitionPipeline<S>,
    tx: Sender<EngineMessage>,
    rx_cmd: Receiver<ControlCommand>,
    poll_interval: Duration,
) -> JoinHandle<PsthProcessor>
where
    S: SampleSource + Send + 'static,
{
    thread::spawn(move || {
        info!("acquisition thread started");
        tx.send(EngineMessage::Log("engine ready".to_owned())).ok();
        let mut source_done = false;
        loop {
            // 1. commands
            let mut drained = 0;
            while drained < MAX_COMMANDS_PER_TURN {
                let cmd = if source_done {
                    // nothing left to pump, block until told what to do
                    match rx_cmd.recv() {
                        Ok(cmd) => cmd,
                        Err(_) => return shutdown(pipeline),
                    }
                } else {
                    match rx_cmd.try_recv() {
                        Ok(cmd) => cmd,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Disconnected) => return shutdown(pipeline),
                    }
                };
                if let Flow::Shutdown = apply_command(pipeline.processor_mut(), cmd, &tx) {
                    return shutdown(pipeline);
                }
                drained += 1;
            }
            if source_done {
                continue;
            }
            // 2. data
            match pipeline.pump_once() {
                Ok(Some(report)) => {
                    if let Some(event) = report.event {
                        tx.send(EngineMessage::Session(event)).ok();
                    }
                }
                Ok(None) => thread::sleep(poll_interval),
                Err(AcquisitionError::SourceExhausted) => {
                    let batches = pipeline.batches_processed();
                    info!("sample source exhausted after {} batches", batches);
                    tx.send(EngineMessage::SourceFinished).ok();
                    source_done = true;
                }
                Err(e) => {
                    warn!("dropping batch: {}", e);
                    tx.send(EngineMessage::SourceError(e.to_string())).ok();
                    thread::sleep(poll_interval);
                }
            }
        }
    })
}

fn apply_command(
    processor: &mut PsthProcessor,
    cmd: ControlCommand,
    tx: &Sender<EngineMessage>,
) -> Flow {
    debug!("command: {:?}", cmd);
    match cmd {
        ControlCommand::Configure(config) => {
            if let Err(e) = processor.configure(config) {
                tx.send(EngineMessage::ConfigRejected(e)).ok();
            }
        }
        ControlCommand::SetChannel(channel) => processor.set_channel(channel),
        ControlCommand::Clear => processor.clear(),
        ControlCommand::TriggerStart => processor.trigger_start(),
        ControlCommand::TriggerStop => processor.trigger_stop(),
        ControlCommand::StartRecording(trials) => processor.start_recording(trials),
        ControlCommand::RequestSnapshot => {
            let snapshot = EngineSnapshot {
                raw_trace: processor.raw_trace(),
                histogram: processor.histogram(),
                session: processor.session().clone(),
            };
            tx.send(EngineMessage::Snapshot(snapshot)).ok();
        }
        ControlCommand::SaveHistogram(path) => {
            match recorder::save_histogram(&path, &processor.histogram()) {
                Ok(()) => {
                    tx.send(EngineMessage::Saved(path)).ok();
                }
                Err(e) => {
                    warn!("could not save histogram to {}: {}", path.display(), e);
                    let reason = e.to_string();
                    tx.send(EngineMessage::SaveFailed { path, reason }).ok();
                }
            }
        }
        ControlCommand::Shutdown => return Flow::Shutdown,
    }
    Flow::Continue
}

fn shutdown<S: SampleSource>(pipeline: AcquisitionPipeline<S>) -> PsthProcessor {
    info!("acquisition thread stopping");
    pipeline.into_processor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::{make_batch, ManualSource, SimulatedSource};
    use crate::psth::{Configuration, SessionEvent};
    use std::sync::mpsc::channel;

    fn config() -> Configuration {
        Configuration {
            trial_length: 10,
            bin_width: 5,
            spike_threshold: 100.0,
            ..Configuration::default()
        }
    }

    fn wait_for(
        rx: &Receiver<EngineMessage>,
        pred: impl Fn(&EngineMessage) -> bool,
    ) -> EngineMessage {
        loop {
            let msg = rx
                .recv_timeout(Duration::from_secs(5))
                .expect("engine went quiet");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[test]
    fn commands_apply_between_batches_until_shutdown() {
        let mut samples = vec![0.0; 10];
        samples[2] = 500.0;
        let source = ManualSource::new(vec![make_batch(1000.0, vec![samples.clone()]); 3]);
        let processor = PsthProcessor::new(config()).unwrap();
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        // queued before the thread starts, so it lands ahead of the first batch
        tx_cmd.send(ControlCommand::StartRecording(2)).unwrap();
        let pipeline = AcquisitionPipeline::new(source, processor);
        let handle = spawn_thread(pipeline, tx, rx_cmd, Duration::from_millis(1));
        let msg = wait_for(&rx, |m| {
            matches!(m, EngineMessage::Session(SessionEvent::SessionStopped { .. }))
        });
        assert!(matches!(
            msg,
            EngineMessage::Session(SessionEvent::SessionStopped { trials_completed: 2 })
        ));
        tx_cmd.send(ControlCommand::Shutdown).unwrap();
        let processor = handle.join().unwrap();
        // the third batch arrives after the stop and is not accumulated
        assert_eq!(processor.histogram_state().spike_counts().unwrap(), &[2, 0]);
        assert!(!processor.session().active);
    }

    #[test]
    fn rejected_configuration_is_reported() {
        let processor = PsthProcessor::new(config()).unwrap();
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(
            AcquisitionPipeline::new(ManualSource::new(Vec::new()), processor),
            tx,
            rx_cmd,
            Duration::from_millis(1),
        );
        let bad = Configuration {
            trial_length: 0,
            ..config()
        };
        tx_cmd.send(ControlCommand::Configure(bad)).unwrap();
        let msg = wait_for(&rx, |m| matches!(m, EngineMessage::ConfigRejected(_)));
        assert!(matches!(msg, EngineMessage::ConfigRejected(_)));
        drop(tx_cmd);
        let processor = handle.join().unwrap();
        assert_eq!(processor.config().trial_length, 10);
    }

    #[test]
    fn exhausted_source_still_serves_snapshots() {
        let source = SimulatedSource::new(1, 1000.0, 50, 1000, 7).with_batch_limit(4);
        let processor = PsthProcessor::new(Configuration::default()).unwrap();
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let pipeline = AcquisitionPipeline::new(source, processor);
        let handle = spawn_thread(pipeline, tx, rx_cmd, Duration::from_millis(1));
        wait_for(&rx, |m| matches!(m, EngineMessage::SourceFinished));
        tx_cmd.send(ControlCommand::RequestSnapshot).unwrap();
        let msg = wait_for(&rx, |m| matches!(m, EngineMessage::Snapshot(_)));
        let EngineMessage::Snapshot(snapshot) = msg else { unreachable!() };
        assert_eq!(snapshot.raw_trace.len(), 1000);
        assert_eq!(snapshot.histogram.len(), 50);
        // never triggered, so nothing was accumulated
        assert!(!snapshot.session.active);
        assert_eq!(snapshot.session.sample_clock, 200);
        assert!(snapshot.histogram.values.iter().all(|&v| v == 0.0));
        tx_cmd.send(ControlCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    fn idle_worker() -> (
        Sender<ControlCommand>,
        Receiver<EngineMessage>,
        JoinHandle<PsthProcessor>,
    ) {
        let processor = PsthProcessor::new(config()).unwrap();
        let pipeline = AcquisitionPipeline::new(ManualSource::new(Vec::new()), processor);
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        let handle = spawn_thread(pipeline, tx, rx_cmd, Duration::from_millis(1));
        (tx_cmd, rx, handle)
    }

    #[test]
    fn save_writes_the_histogram_and_reports_the_path() {
        let path = std::env::temp_dir().join(format!("psth_engine_{}.tsv", std::process::id()));
        let (tx_cmd, rx, handle) = idle_worker();
        tx_cmd.send(ControlCommand::SaveHistogram(path.clone())).unwrap();
        let msg = wait_for(&rx, |m| {
            matches!(m, EngineMessage::Saved(_) | EngineMessage::SaveFailed { .. })
        });
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(matches!(msg, EngineMessage::Saved(ref saved) if *saved == path));
        // trial of 10 in bins of 5
        assert_eq!(text, "0\t0\n5\t0\n");
        tx_cmd.send(ControlCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }

    #[test]
    fn save_to_a_missing_directory_is_reported() {
        let path = std::env::temp_dir()
            .join(format!("psth_missing_{}", std::process::id()))
            .join("out.tsv");
        let (tx_cmd, rx, handle) = idle_worker();
        tx_cmd.send(ControlCommand::SaveHistogram(path.clone())).unwrap();
        let msg = wait_for(&rx, |m| {
            matches!(m, EngineMessage::Saved(_) | EngineMessage::SaveFailed { .. })
        });
        match msg {
            EngineMessage::SaveFailed { path: failed, reason } => {
                assert_eq!(failed, path);
                assert!(!reason.is_empty());
            }
            other => panic!("expected a save failure, got {:?}", other),
        }
        // the worker keeps running after a failed save
        tx_cmd.send(ControlCommand::RequestSnapshot).unwrap();
        wait_for(&rx, |m| matches!(m, EngineMessage::Snapshot(_)));
        tx_cmd.send(ControlCommand::Shutdown).unwrap();
        handle.join().unwrap();
    }
}
