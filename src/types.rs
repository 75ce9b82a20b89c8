// src/types.rs
use std::path::PathBuf;

use crate::psth::{
    Configuration, ConfigurationError, HistogramSnapshot, SessionEvent, SessionState,
};

// Commands sent to the acquisition thread
#[derive(Clone, Debug)]
pub enum ControlCommand {
    Configure(Configuration),
    SetChannel(usize),
    Clear,
    TriggerStart,
    TriggerStop,
    StartRecording(u32),
    RequestSnapshot,
    SaveHistogram(PathBuf),
    Shutdown,
}

// Messages from the acquisition thread back to the front-end
#[derive(Clone, Debug)]
pub enum EngineMessage {
    Log(String),
    ConfigRejected(ConfigurationError),
    Session(SessionEvent),
    Snapshot(EngineSnapshot),
    Saved(PathBuf),
    SaveFailed { path: PathBuf, reason: String },
    SourceError(String),
    SourceFinished,
}

// What a display would redraw from
#[derive(Clone, Debug)]
pub struct EngineSnapshot {
    pub raw_trace: Vec<f64>,
    pub histogram: HistogramSnapshot,
    pub session: SessionState,
}
