pub mod config;
pub mod lane;
pub mod midi;
pub mod scale;
pub mod transport;

pub use config::{ConfigError, EngineConfig};
pub use lane::{ArpMode, ArpRate, LaneConfig, NoteSource, NoteSourceKind};
pub use midi::{ClockMessage, ClockMessageKind, MidiEvent, MidiEventKind};
pub use transport::{ClockSource, HostTransport};

/// Number of lanes. Fixed at construction, never grows or shrinks.
pub const NUM_LANES: usize = 6;

/// Upper bound for a Euclidean pattern. Pattern storage is reserved at this
/// size so regeneration never allocates on the audio thread.
pub const MAX_STEPS: usize = 64;

/// Maximum number of notes a user can pick for the arpeggiator of one lane.
pub const MAX_SELECTED_NOTES: usize = 4;

/// Fallback pitch (middle C) used when a note source cannot be resolved.
pub const DEFAULT_PITCH: u8 = 60;

// MIDI clock standard
pub const CLOCK_TICKS_PER_BEAT: f64 = 24.0;
