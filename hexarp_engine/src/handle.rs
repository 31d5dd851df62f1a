use std::sync::Arc;

use crossbeam_channel::{Sender, TrySendError};
use hexarp_shared::{ArpMode, ClockSource, LaneConfig, NoteSource, NUM_LANES};

use crate::commands::EngineCommand;
use crate::engine::EngineShared;
use crate::lane::{LaneShared, Microtiming, NoteSnapshot};
use crate::notes::NoteSetResolver;

/// Pattern cursor and arp index of a lane as of its last trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveStep {
    pub cursor: usize,
    pub arp_index: usize,
}

/// Control-thread side of an [`crate::Engine`]. Cheap to clone; never blocks
/// the audio thread. Out-of-range lanes are logged and ignored.
#[derive(Clone)]
pub struct EngineHandle {
    command_tx: Sender<EngineCommand>,
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    pub(crate) fn new(command_tx: Sender<EngineCommand>, shared: Arc<EngineShared>) -> Self {
        Self { command_tx, shared }
    }

    pub fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }

    /// Queue a command for the next block. Returns false if it was dropped.
    pub fn send(&self, cmd: EngineCommand) -> bool {
        if let Some(lane) = cmd.lane() {
            if self.lane(lane).is_none() {
                return false;
            }
        }
        match self.command_tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(cmd)) => {
                log::warn!("[Engine] Command queue full, dropping {:?}", cmd);
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("[Engine] Engine is gone, command ignored");
                false
            }
        }
    }

    fn lane(&self, lane: usize) -> Option<&LaneShared> {
        let shared = self.shared.lanes.get(lane).map(|l| l.as_ref());
        if shared.is_none() {
            log::warn!("[Engine] Lane {} out of range (0..{}), ignored", lane, NUM_LANES);
        }
        shared
    }

    // --- Transport / clock ---

    pub fn play(&self) {
        self.send(EngineCommand::Play);
    }

    pub fn stop(&self) {
        self.send(EngineCommand::Stop);
    }

    pub fn is_playing(&self) -> bool {
        self.shared.is_playing()
    }

    pub fn position(&self) -> u64 {
        self.shared.position()
    }

    pub fn set_bpm(&self, bpm: f64) {
        if !(bpm.is_finite() && bpm > 0.0) {
            log::warn!("[Engine] Ignoring bpm {}", bpm);
            return;
        }
        self.shared.clock.set_bpm(bpm);
    }

    pub fn bpm(&self) -> f64 {
        self.shared.clock.bpm()
    }

    pub fn set_clock_source(&self, source: ClockSource) {
        self.shared.clock.set_source(source);
    }

    pub fn clock_source(&self) -> ClockSource {
        self.shared.clock.source()
    }

    pub fn set_standalone(&self, standalone: bool) {
        self.shared.clock.set_standalone(standalone);
    }

    pub fn set_sample_rate(&self, sample_rate: f64) {
        self.send(EngineCommand::SetSampleRate(sample_rate));
    }

    pub fn reseed(&self, seed: u64) {
        self.send(EngineCommand::ReseedRandom(seed));
    }

    // --- Lane configuration ---

    pub fn set_active(&self, lane: usize, active: bool) {
        self.send(EngineCommand::SetActive { lane, active });
    }

    pub fn set_mute(&self, lane: usize, muted: bool) {
        self.send(EngineCommand::SetMute { lane, muted });
    }

    pub fn set_solo(&self, lane: usize, solo: bool) {
        self.send(EngineCommand::SetSolo { lane, solo });
    }

    pub fn set_pattern(&self, lane: usize, steps: i32, pulses: i32) {
        self.send(EngineCommand::SetPattern { lane, steps, pulses });
    }

    pub fn set_swing(&self, lane: usize, amount: f32) {
        self.send(EngineCommand::SetSwing { lane, amount });
    }

    pub fn set_microtiming(&self, lane: usize, offsets: &[f32]) {
        self.send(EngineCommand::SetMicrotiming { lane, table: Microtiming::from_slice(offsets) });
    }

    pub fn set_velocity(&self, lane: usize, velocity: u8) {
        self.send(EngineCommand::SetVelocity { lane, velocity });
    }

    pub fn set_note_length(&self, lane: usize, fraction: f32) {
        self.send(EngineCommand::SetNoteLength { lane, fraction });
    }

    pub fn set_arp_active(&self, lane: usize, active: bool) {
        self.send(EngineCommand::SetArpActive { lane, active });
    }

    pub fn set_arp_mode(&self, lane: usize, mode: ArpMode) {
        self.send(EngineCommand::SetArpMode { lane, mode });
    }

    /// `rate` is in steps per arp step (see `ArpRate::multiplier`).
    pub fn set_arp_rate(&self, lane: usize, rate: f64) {
        self.send(EngineCommand::SetArpRate { lane, rate });
    }

    pub fn set_midi_route(&self, lane: usize, channel: u8, port: Option<u32>) {
        self.send(EngineCommand::SetMidiRoute { lane, channel, port });
    }

    pub fn reset_lane(&self, lane: usize) {
        self.send(EngineCommand::ResetLane { lane });
    }

    /// Push a whole lane configuration at runtime.
    pub fn apply_lane_config(&self, lane: usize, cfg: &LaneConfig) {
        if self.lane(lane).is_none() {
            return;
        }
        let cfg = cfg.clone().sanitized();
        self.set_active(lane, cfg.active);
        self.set_mute(lane, cfg.mute);
        self.set_solo(lane, cfg.solo);
        self.set_pattern(lane, cfg.steps, cfg.pulses);
        self.set_swing(lane, cfg.swing);
        self.set_microtiming(lane, &cfg.microtiming);
        self.set_velocity(lane, cfg.velocity);
        self.set_note_length(lane, cfg.note_length);
        self.set_arp_active(lane, cfg.arp_active);
        self.set_arp_mode(lane, cfg.arp_mode);
        self.set_arp_rate(lane, cfg.arp_rate.multiplier());
        self.set_midi_route(lane, cfg.midi_channel, cfg.midi_port);
        self.set_note_source(lane, &cfg.note_source);
        self.select_arp_notes(lane, &cfg.arp_selection);
    }

    // --- Note sets ---

    /// Resolve the source here and publish the new input set. The current
    /// selection is kept and re-filtered; the "notes seen" set starts over,
    /// here and again on the audio thread once it picks up the new set.
    pub fn set_note_source(&self, lane: usize, source: &NoteSource) {
        let Some(shared) = self.lane(lane) else {
            return;
        };
        let input = NoteSetResolver::resolve(source);
        shared.seen.clear();
        shared.notes.rcu(|current| {
            NoteSnapshot::new(input.clone(), &current.selected).with_source_epoch(current.source_epoch.wrapping_add(1))
        });
    }

    /// Pick up to four pitches for the arpeggiator. An empty slice means "all".
    pub fn select_arp_notes(&self, lane: usize, pitches: &[u8]) {
        let Some(shared) = self.lane(lane) else {
            return;
        };
        shared.notes.rcu(|current| {
            NoteSnapshot::new(current.input.clone(), pitches).with_source_epoch(current.source_epoch)
        });
    }

    pub fn note_snapshot(&self, lane: usize) -> Option<Arc<NoteSnapshot>> {
        self.lane(lane).map(|s| s.notes.load_full())
    }

    pub fn available_notes(&self, lane: usize) -> Vec<u8> {
        self.lane(lane).map(|s| s.notes.load().input.clone()).unwrap_or_default()
    }

    pub fn selected_notes(&self, lane: usize) -> Vec<u8> {
        self.lane(lane).map(|s| s.notes.load().selected.clone()).unwrap_or_default()
    }

    pub fn arp_notes(&self, lane: usize) -> Vec<u8> {
        self.lane(lane).map(|s| s.notes.load().arp.clone()).unwrap_or_default()
    }

    pub fn notes_seen(&self, lane: usize) -> Vec<u8> {
        self.lane(lane).map(|s| s.seen.to_vec()).unwrap_or_default()
    }

    pub fn live_step(&self, lane: usize) -> Option<LiveStep> {
        self.lane(lane).map(|s| LiveStep {
            cursor: s.live_cursor(),
            arp_index: s.live_arp_index(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Engine;
    use hexarp_shared::{EngineConfig, NoteSource};

    #[test]
    fn selection_survives_source_change() {
        let (_engine, handle) = Engine::new(&EngineConfig::default());
        handle.set_note_source(0, &NoteSource::scale(0, 4));
        handle.select_arp_notes(0, &[67, 60]);
        assert_eq!(handle.arp_notes(0), vec![60, 67]);

        // whole tone from C has no G
        handle.set_note_source(0, &NoteSource::scale(17, 4));
        assert_eq!(handle.selected_notes(0), vec![67, 60]);
        assert_eq!(handle.arp_notes(0), vec![60]);
    }

    #[test]
    fn empty_selection_means_all() {
        let (_engine, handle) = Engine::new(&EngineConfig::default());
        handle.set_note_source(2, &NoteSource::chord(0, 4));
        handle.select_arp_notes(2, &[]);
        assert_eq!(handle.arp_notes(2), handle.available_notes(2));
        assert_eq!(handle.available_notes(2), vec![60, 64, 67]);
    }

    #[test]
    fn out_of_range_lane_is_ignored() {
        let (_engine, handle) = Engine::new(&EngineConfig::default());
        handle.set_note_source(6, &NoteSource::single(10));
        handle.select_arp_notes(99, &[1]);
        assert!(handle.available_notes(6).is_empty());
        assert!(handle.live_step(6).is_none());
        assert!(!handle.send(crate::EngineCommand::SetMute { lane: 6, muted: true }));
    }
}
