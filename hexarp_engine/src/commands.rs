use hexarp_shared::ArpMode;

use crate::lane::Microtiming;

/// Control thread -> audio thread. Plain `Copy` data only, so nothing is
/// allocated or freed when the audio thread drains the queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCommand {
    Play,
    Stop,
    SetSampleRate(f64),
    ReseedRandom(u64),

    SetActive { lane: usize, active: bool },
    SetMute { lane: usize, muted: bool },
    SetSolo { lane: usize, solo: bool },
    SetPattern { lane: usize, steps: i32, pulses: i32 },
    SetSwing { lane: usize, amount: f32 },
    SetMicrotiming { lane: usize, table: Microtiming },
    SetVelocity { lane: usize, velocity: u8 },
    SetNoteLength { lane: usize, fraction: f32 },

    SetArpActive { lane: usize, active: bool },
    SetArpMode { lane: usize, mode: ArpMode },
    // Multiplier of one step
    SetArpRate { lane: usize, rate: f64 },

    SetMidiRoute { lane: usize, channel: u8, port: Option<u32> },
    ResetLane { lane: usize },
}

impl EngineCommand {
    /// Lane the command targets, if any.
    pub fn lane(&self) -> Option<usize> {
        match *self {
            EngineCommand::Play
            | EngineCommand::Stop
            | EngineCommand::SetSampleRate(_)
            | EngineCommand::ReseedRandom(_) => None,
            EngineCommand::SetActive { lane, .. }
            | EngineCommand::SetMute { lane, .. }
            | EngineCommand::SetSolo { lane, .. }
            | EngineCommand::SetPattern { lane, .. }
            | EngineCommand::SetSwing { lane, .. }
            | EngineCommand::SetMicrotiming { lane, .. }
            | EngineCommand::SetVelocity { lane, .. }
            | EngineCommand::SetNoteLength { lane, .. }
            | EngineCommand::SetArpActive { lane, .. }
            | EngineCommand::SetArpMode { lane, .. }
            | EngineCommand::SetArpRate { lane, .. }
            | EngineCommand::SetMidiRoute { lane, .. }
            | EngineCommand::ResetLane { lane } => Some(lane),
        }
    }
}
