use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOn { pitch: u8, velocity: u8 },
    NoteOff { pitch: u8 },
}

/// A note event produced by the engine, timestamped inside the current block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub sample_offset: u32,
    pub lane: usize,
    /// Destination port id, `None` = host stream only.
    pub port: Option<u32>,
    /// 1..=16
    pub channel: u8,
    pub kind: MidiEventKind,
}

impl MidiEvent {
    pub fn pitch(&self) -> u8 {
        match self.kind {
            MidiEventKind::NoteOn { pitch, .. } | MidiEventKind::NoteOff { pitch } => pitch,
        }
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self.kind, MidiEventKind::NoteOn { .. })
    }

    /// Raw three-byte channel voice message.
    pub fn to_bytes(&self) -> [u8; 3] {
        let ch = self.channel.clamp(1, 16) - 1;
        match self.kind {
            MidiEventKind::NoteOn { pitch, velocity } => [0x90 | ch, pitch & 0x7F, velocity & 0x7F],
            MidiEventKind::NoteOff { pitch } => [0x80 | ch, pitch & 0x7F, 0],
        }
    }
}

/// System real-time messages relevant to external sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockMessageKind {
    Tick,
    Start,
    Continue,
    Stop,
}

impl ClockMessageKind {
    /// Parse a single status byte. Anything that is not sync-related is ignored.
    pub fn from_status(status: u8) -> Option<ClockMessageKind> {
        match status {
            0xF8 => Some(ClockMessageKind::Tick),
            0xFA => Some(ClockMessageKind::Start),
            0xFB => Some(ClockMessageKind::Continue),
            0xFC => Some(ClockMessageKind::Stop),
            _ => None,
        }
    }

    pub fn status(&self) -> u8 {
        match self {
            ClockMessageKind::Tick => 0xF8,
            ClockMessageKind::Start => 0xFA,
            ClockMessageKind::Continue => 0xFB,
            ClockMessageKind::Stop => 0xFC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockMessage {
    pub sample_offset: u32,
    pub kind: ClockMessageKind,
}

impl ClockMessage {
    pub fn new(sample_offset: u32, kind: ClockMessageKind) -> Self {
        Self { sample_offset, kind }
    }
}
