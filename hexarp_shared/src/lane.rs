use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PITCH, MAX_STEPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoteSourceKind {
    #[default]
    Single,
    Scale,
    Chord,
}

/// A lane's pitch-generation mode.
///
/// * `Single`: `value` is the MIDI pitch itself, `octave` is ignored.
/// * `Scale` / `Chord`: `value` indexes the catalog in [`crate::scale`] and the
///   intervals are transposed by `(octave + 1) * 12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSource {
    pub kind: NoteSourceKind,
    pub value: i32,
    #[serde(default = "default_octave")]
    pub octave: i32,
}

fn default_octave() -> i32 {
    4
}

impl Default for NoteSource {
    fn default() -> Self {
        Self::single(DEFAULT_PITCH)
    }
}

impl NoteSource {
    pub fn single(pitch: u8) -> Self {
        Self { kind: NoteSourceKind::Single, value: pitch as i32, octave: default_octave() }
    }

    pub fn scale(index: usize, octave: i32) -> Self {
        Self { kind: NoteSourceKind::Scale, value: index as i32, octave }
    }

    pub fn chord(index: usize, octave: i32) -> Self {
        Self { kind: NoteSourceKind::Chord, value: index as i32, octave }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArpMode {
    #[default]
    Up,
    Down,
    UpDown,
    Random,
}

impl ArpMode {
    const ALL: [ArpMode; 4] = [ArpMode::Up, ArpMode::Down, ArpMode::UpDown, ArpMode::Random];

    pub fn from_index(idx: usize) -> Option<ArpMode> {
        Self::ALL.get(idx).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArpMode::Up => "UP",
            ArpMode::Down => "DOWN",
            ArpMode::UpDown => "UP_DOWN",
            ArpMode::Random => "RANDOM",
        }
    }
}

/// Note value of one arpeggiator step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArpRate {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
    EighthTriplet,
    SixteenthDotted,
}

impl ArpRate {
    const ALL: [ArpRate; 8] = [
        ArpRate::Whole,
        ArpRate::Half,
        ArpRate::Quarter,
        ArpRate::Eighth,
        ArpRate::Sixteenth,
        ArpRate::ThirtySecond,
        ArpRate::EighthTriplet,
        ArpRate::SixteenthDotted,
    ];

    pub fn from_index(idx: usize) -> Option<ArpRate> {
        Self::ALL.get(idx).copied()
    }

    /// Length of one arp step measured in sequencer steps (sixteenth notes).
    pub fn multiplier(&self) -> f64 {
        match self {
            ArpRate::Whole => 16.0,
            ArpRate::Half => 8.0,
            ArpRate::Quarter => 4.0,
            ArpRate::Eighth => 2.0,
            ArpRate::Sixteenth => 1.0,
            ArpRate::ThirtySecond => 0.5,
            ArpRate::EighthTriplet => 4.0 / 3.0,
            ArpRate::SixteenthDotted => 1.5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ArpRate::Whole => "1/1",
            ArpRate::Half => "1/2",
            ArpRate::Quarter => "1/4",
            ArpRate::Eighth => "1/8",
            ArpRate::Sixteenth => "1/16",
            ArpRate::ThirtySecond => "1/32",
            ArpRate::EighthTriplet => "1/8T",
            ArpRate::SixteenthDotted => "1/16D",
        }
    }
}

/// Full per-lane configuration as written by the control layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub active: bool,
    pub mute: bool,
    pub solo: bool,
    pub note_source: NoteSource,
    pub steps: i32,
    pub pulses: i32,
    /// 0.0 = straight, 1.0 = odd steps delayed by half a step.
    pub swing: f32,
    /// Per-step offsets in fractions of a step, each in [-0.5, 0.5].
    pub microtiming: Vec<f32>,
    pub velocity: u8,
    /// Gate length as a fraction of one step, in [0, 1].
    pub note_length: f32,
    pub arp_active: bool,
    pub arp_mode: ArpMode,
    pub arp_rate: ArpRate,
    /// 1..=16
    pub midi_channel: u8,
    pub midi_port: Option<u32>,
    /// Pitches picked for the arpeggiator (at most four are kept).
    pub arp_selection: Vec<u8>,
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            active: true,
            mute: false,
            solo: false,
            note_source: NoteSource::default(),
            steps: 16,
            pulses: 4,
            swing: 0.0,
            microtiming: Vec::new(),
            velocity: 100,
            note_length: 0.5,
            arp_active: false,
            arp_mode: ArpMode::Up,
            arp_rate: ArpRate::Quarter,
            midi_channel: 1,
            midi_port: None,
            arp_selection: Vec::new(),
        }
    }
}

impl LaneConfig {
    /// Clamp every field into its documented range. Never fails.
    pub fn sanitized(mut self) -> Self {
        self.steps = self.steps.clamp(1, MAX_STEPS as i32);
        self.pulses = self.pulses.clamp(0, self.steps);
        self.swing = clamp_unit(self.swing, 0.0, 1.0);
        self.microtiming.truncate(MAX_STEPS);
        for m in self.microtiming.iter_mut() {
            *m = clamp_unit(*m, -0.5, 0.5);
        }
        self.velocity = self.velocity.min(127);
        self.note_length = clamp_unit(self.note_length, 0.0, 1.0);
        self.midi_channel = self.midi_channel.clamp(1, 16);
        self
    }
}

/// Clamp, mapping NaN to the lower bound.
pub fn clamp_unit(v: f32, lo: f32, hi: f32) -> f32 {
    if v.is_nan() {
        lo
    } else {
        v.clamp(lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_range_fields() {
        let cfg = LaneConfig {
            steps: 0,
            pulses: 9,
            swing: 3.0,
            microtiming: vec![0.9, -0.9, f32::NAN],
            velocity: 200,
            note_length: -1.0,
            midi_channel: 0,
            ..LaneConfig::default()
        }
        .sanitized();

        assert_eq!(cfg.steps, 1);
        assert_eq!(cfg.pulses, 1);
        assert_eq!(cfg.swing, 1.0);
        assert_eq!(cfg.microtiming, vec![0.5, -0.5, -0.5]);
        assert_eq!(cfg.velocity, 127);
        assert_eq!(cfg.note_length, 0.0);
        assert_eq!(cfg.midi_channel, 1);
    }

    #[test]
    fn arp_rate_multipliers() {
        assert_eq!(ArpRate::Sixteenth.multiplier(), 1.0);
        assert_eq!(ArpRate::Quarter.multiplier(), 4.0);
        assert_eq!(ArpRate::from_index(6), Some(ArpRate::EighthTriplet));
        assert_eq!(ArpMode::from_index(2), Some(ArpMode::UpDown));
        assert_eq!(ArpMode::from_index(4), None);
    }
}
