use serde::{Deserialize, Serialize};

/// Where the tempo (and, for `External`, the step grid itself) comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockSource {
    /// Follow the host's BPM. Falls back to the internal BPM when the host
    /// doesn't report one, and is treated as `Internal` when running standalone.
    Daw,
    #[default]
    Internal,
    /// Incoming 24 PPQN MIDI clock drives the lanes.
    External,
}

impl ClockSource {
    const ALL: [ClockSource; 3] = [ClockSource::Daw, ClockSource::Internal, ClockSource::External];

    pub fn from_index(idx: usize) -> Option<ClockSource> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(&self) -> usize {
        match self {
            ClockSource::Daw => 0,
            ClockSource::Internal => 1,
            ClockSource::External => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClockSource::Daw => "DAW",
            ClockSource::Internal => "Internal",
            ClockSource::External => "External",
        }
    }
}

/// Per-block transport info handed in by whoever drives the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HostTransport {
    pub is_playing: bool,
    /// Host tempo, if the host reports one.
    pub bpm: Option<f64>,
}

impl HostTransport {
    pub fn playing() -> Self {
        Self { is_playing: true, bpm: None }
    }

    pub fn stopped() -> Self {
        Self::default()
    }
}
