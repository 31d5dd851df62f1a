use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use hexarp_shared::{ArpMode, LaneConfig, MAX_SELECTED_NOTES, MAX_STEPS};

use crate::arpeggiator::Arpeggiator;
use crate::clock::TICKS_PER_STEP;
use crate::notes::NoteSetResolver;
use crate::rhythm::RhythmPattern;

/// Immutable view of a lane's pitches. Built on the control thread, published
/// through `ArcSwap`, read by the audio thread without locking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteSnapshot {
    /// Resolved from the lane's note source.
    pub input: Vec<u8>,
    /// User pick for the arpeggiator, at most `MAX_SELECTED_NOTES`.
    pub selected: Vec<u8>,
    /// `selected` filtered against `input` in input order, or all of `input`
    /// when nothing is selected.
    pub arp: Vec<u8>,
    /// Bumped whenever `input` comes from a new note source.
    pub source_epoch: u64,
}

impl NoteSnapshot {
    pub fn new(input: Vec<u8>, selected: &[u8]) -> Self {
        let mut picked: Vec<u8> = Vec::with_capacity(MAX_SELECTED_NOTES);
        for &p in selected {
            if picked.len() == MAX_SELECTED_NOTES {
                break;
            }
            if p <= 127 && !picked.contains(&p) {
                picked.push(p);
            }
        }

        let arp = if picked.is_empty() {
            input.clone()
        } else {
            input.iter().copied().filter(|p| picked.contains(p)).collect()
        };

        Self { input, selected: picked, arp, source_epoch: 0 }
    }

    pub fn with_source_epoch(mut self, epoch: u64) -> Self {
        self.source_epoch = epoch;
        self
    }
}

/// 128-bit set of MIDI pitches, lock-free insert and snapshot.
#[derive(Debug, Default)]
pub struct NoteMask {
    low: AtomicU64,  // 0-63
    high: AtomicU64, // 64-127
}

impl NoteMask {
    pub fn insert(&self, pitch: u8) {
        match pitch {
            0..=63 => {
                self.low.fetch_or(1u64 << pitch, Ordering::Relaxed);
            }
            64..=127 => {
                self.high.fetch_or(1u64 << (pitch - 64), Ordering::Relaxed);
            }
            _ => {}
        }
    }

    pub fn clear(&self) {
        self.low.store(0, Ordering::Relaxed);
        self.high.store(0, Ordering::Relaxed);
    }

    pub fn bits(&self) -> u128 {
        let low = self.low.load(Ordering::Relaxed) as u128;
        let high = self.high.load(Ordering::Relaxed) as u128;
        (high << 64) | low
    }

    pub fn contains(&self, pitch: u8) -> bool {
        pitch <= 127 && self.bits() & (1u128 << pitch) != 0
    }

    /// Ascending list of the pitches in the set.
    pub fn to_vec(&self) -> Vec<u8> {
        let bits = self.bits();
        (0u8..=127).filter(|&p| bits & (1u128 << p) != 0).collect()
    }
}

/// Part of a lane visible to both threads.
pub struct LaneShared {
    pub notes: ArcSwap<NoteSnapshot>,
    pub seen: NoteMask,
    live_cursor: AtomicUsize,
    live_arp_index: AtomicUsize,
}

impl Default for LaneShared {
    fn default() -> Self {
        Self {
            notes: ArcSwap::from_pointee(NoteSnapshot::new(vec![hexarp_shared::DEFAULT_PITCH], &[])),
            seen: NoteMask::default(),
            live_cursor: AtomicUsize::new(0),
            live_arp_index: AtomicUsize::new(0),
        }
    }
}

impl LaneShared {
    pub fn live_cursor(&self) -> usize {
        self.live_cursor.load(Ordering::Relaxed)
    }

    pub fn live_arp_index(&self) -> usize {
        self.live_arp_index.load(Ordering::Relaxed)
    }
}

/// Microtiming table stored inline so it can travel through the command
/// channel and be swapped in without touching the allocator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Microtiming {
    offsets: [f32; MAX_STEPS],
    len: usize,
}

impl Default for Microtiming {
    fn default() -> Self {
        Self { offsets: [0.0; MAX_STEPS], len: 0 }
    }
}

impl Microtiming {
    /// Offsets are fractions of a step, clamped to [-0.5, 0.5].
    pub fn from_slice(offsets: &[f32]) -> Self {
        let mut table = Self::default();
        for (dst, &src) in table.offsets.iter_mut().zip(offsets) {
            *dst = hexarp_shared::lane::clamp_unit(src, -0.5, 0.5);
        }
        table.len = offsets.len().min(MAX_STEPS);
        table
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.offsets[..self.len]
    }

    /// Non-empty tables follow the pattern length: padded with zeros or cut.
    pub fn fit_to(&mut self, steps: usize) {
        if self.len == 0 {
            return;
        }
        let steps = steps.min(MAX_STEPS);
        for slot in self.offsets.iter_mut().take(steps).skip(self.len) {
            *slot = 0.0;
        }
        self.len = steps;
    }

    pub fn offset_for(&self, step_counter: i64) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.offsets[step_counter.rem_euclid(self.len as i64) as usize] as f64
    }
}

/// Plain-data part of the lane configuration, applied on the audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaneSettings {
    pub active: bool,
    pub mute: bool,
    pub solo: bool,
    pub swing: f32,
    pub velocity: u8,
    pub note_length: f32,
    pub arp_active: bool,
    pub midi_channel: u8,
    pub midi_port: Option<u32>,
}

impl From<&LaneConfig> for LaneSettings {
    fn from(cfg: &LaneConfig) -> Self {
        Self {
            active: cfg.active,
            mute: cfg.mute,
            solo: cfg.solo,
            swing: cfg.swing,
            velocity: cfg.velocity,
            note_length: cfg.note_length,
            arp_active: cfg.arp_active,
            midi_channel: cfg.midi_channel,
            midi_port: cfg.midi_port,
        }
    }
}

impl Default for LaneSettings {
    fn default() -> Self {
        Self::from(&LaneConfig::default())
    }
}

/// What a triggered step plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepNotes<'a> {
    Rest,
    Chord(&'a [u8]),
    Single(u8),
}

impl<'a> StepNotes<'a> {
    pub fn for_each(self, mut f: impl FnMut(u8)) {
        match self {
            StepNotes::Rest => {}
            StepNotes::Chord(notes) => notes.iter().copied().for_each(&mut f),
            StepNotes::Single(p) => f(p),
        }
    }
}

/// Delay until the next trigger of a lane, in whole samples.
///
/// Odd steps are pushed back by `swing` half-steps; the microtiming table (if
/// any) adds its per-step fraction of a step.
pub fn next_step_interval(samples_per_step: f64, step_counter: i64, swing: f32, micro: &Microtiming) -> i64 {
    let swing_offset = if step_counter.rem_euclid(2) == 1 {
        samples_per_step * 0.5 * swing as f64
    } else {
        0.0
    };
    let micro_offset = micro.offset_for(step_counter) * samples_per_step;
    ((samples_per_step + swing_offset + micro_offset).round() as i64).max(1)
}

/// One of the six lanes, audio-thread side.
pub struct Lane {
    pub index: usize,
    pub settings: LaneSettings,
    pattern: RhythmPattern,
    arp: Arpeggiator,
    microtiming: Microtiming,
    next_step_sample: i64,
    step_counter: i64,
    /// External clock tick count at which the next step is due.
    next_step_tick: u64,
    /// Source epoch the "notes seen" mask belongs to.
    seen_epoch: u64,
    shared: Arc<LaneShared>,
}

impl Lane {
    pub fn new(index: usize, shared: Arc<LaneShared>, rng_seed: u64) -> Self {
        let seed = rng_seed.wrapping_add(index as u64);
        Self {
            index,
            settings: LaneSettings::default(),
            pattern: RhythmPattern::default(),
            arp: Arpeggiator::new(ArpMode::Up, 0, LaneConfig::default().arp_rate.multiplier()).with_seed(seed),
            microtiming: Microtiming::default(),
            next_step_sample: 0,
            step_counter: 0,
            next_step_tick: TICKS_PER_STEP,
            seen_epoch: 0,
            shared,
        }
    }

    /// Apply a full configuration (startup path). Note source and selection
    /// are published to the shared snapshot.
    pub fn configure(&mut self, cfg: &LaneConfig) {
        let cfg = cfg.clone().sanitized();
        self.settings = LaneSettings::from(&cfg);
        self.set_pattern(cfg.steps, cfg.pulses);
        self.set_microtiming(Microtiming::from_slice(&cfg.microtiming));
        self.arp.set_mode(cfg.arp_mode);
        self.arp.set_rate(cfg.arp_rate.multiplier());

        let input = NoteSetResolver::resolve(&cfg.note_source);
        let epoch = self.shared.notes.load().source_epoch.wrapping_add(1);
        self.shared.notes.store(Arc::new(NoteSnapshot::new(input, &cfg.arp_selection).with_source_epoch(epoch)));
        self.shared.seen.clear();
        self.seen_epoch = epoch;
    }

    pub fn shared(&self) -> &Arc<LaneShared> {
        &self.shared
    }

    pub fn pattern(&self) -> &RhythmPattern {
        &self.pattern
    }

    pub fn arp(&self) -> &Arpeggiator {
        &self.arp
    }

    pub fn arp_mut(&mut self) -> &mut Arpeggiator {
        &mut self.arp
    }

    pub fn microtiming(&self) -> &Microtiming {
        &self.microtiming
    }

    pub fn next_step_sample(&self) -> i64 {
        self.next_step_sample
    }

    pub fn step_counter(&self) -> i64 {
        self.step_counter
    }

    pub fn set_pattern(&mut self, steps: i32, pulses: i32) {
        self.pattern.set_pattern(steps, pulses);
        self.microtiming.fit_to(self.pattern.steps());
    }

    pub fn set_microtiming(&mut self, mut table: Microtiming) {
        table.fit_to(self.pattern.steps());
        self.microtiming = table;
    }

    /// Back to the top of the pattern with the next trigger at sample `at`,
    /// or one step of external clock after tick count `tick`.
    pub fn reset_run_state(&mut self, at: i64, tick: u64) {
        self.pattern.reset();
        self.arp.reset();
        self.next_step_sample = at;
        self.next_step_tick = tick + TICKS_PER_STEP;
        self.step_counter = 0;
        self.publish_live();
    }

    /// Never leave the next trigger behind sample `at` or tick count `tick`.
    pub fn realign(&mut self, at: i64, tick: u64) {
        self.next_step_sample = self.next_step_sample.max(at);
        self.next_step_tick = self.next_step_tick.max(tick);
    }

    /// Called once per block with the snapshot the block will use. Keeps the
    /// arpeggiator's range in line with it, and starts the "notes seen" mask
    /// over when the note source changed, dropping pitches the previous block
    /// may have added from the old source.
    pub fn sync_snapshot(&mut self, notes: &NoteSnapshot) {
        let count = notes.arp.len();
        if self.arp.note_count() != count {
            self.arp.set_note_count(count);
        }
        if notes.source_epoch != self.seen_epoch {
            self.shared.seen.clear();
            self.seen_epoch = notes.source_epoch;
        }
    }

    /// Audible unless muted, or silenced because another lane is soloed.
    /// A silenced lane keeps sequencing.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        !self.settings.mute && (!any_solo || self.settings.solo)
    }

    /// One sample of arp time.
    pub fn advance_arp(&mut self, samples_per_step: f64) -> bool {
        let samples_per_arp_step = (samples_per_step * self.arp.rate()).max(crate::clock::MIN_SAMPLES_PER_STEP);
        self.arp.advance(1.0, samples_per_arp_step)
    }

    pub fn is_due(&self, global_sample: i64) -> bool {
        global_sample >= self.next_step_sample
    }

    pub fn next_step_tick(&self) -> u64 {
        self.next_step_tick
    }

    /// True once the external clock has counted up to the next step.
    /// Consumes that step.
    pub fn take_external_step(&mut self, ticks: u64) -> bool {
        if ticks >= self.next_step_tick {
            self.next_step_tick += TICKS_PER_STEP;
            true
        } else {
            false
        }
    }

    /// Consume the next pattern step and pick the pitches to play.
    pub fn trigger<'a>(&mut self, notes: &'a NoteSnapshot) -> StepNotes<'a> {
        if !self.pattern.next_step() {
            return StepNotes::Rest;
        }

        if !self.settings.arp_active {
            return if notes.input.is_empty() { StepNotes::Rest } else { StepNotes::Chord(&notes.input) };
        }

        if !notes.arp.is_empty() {
            StepNotes::Single(notes.arp[self.arp.index() % notes.arp.len()])
        } else if let Some(&first) = notes.input.first() {
            StepNotes::Single(first)
        } else {
            StepNotes::Rest
        }
    }

    /// Move the grid-driven trigger point forward by one (swung) step.
    pub fn schedule_next(&mut self, samples_per_step: f64) {
        self.next_step_sample +=
            next_step_interval(samples_per_step, self.step_counter, self.settings.swing, &self.microtiming);
        self.step_counter += 1;
    }

    /// Externally clocked lanes only count steps.
    pub fn count_step(&mut self) {
        self.step_counter += 1;
    }

    pub fn publish_live(&self) {
        self.shared.live_cursor.store(self.pattern.cursor(), Ordering::Relaxed);
        self.shared.live_arp_index.store(self.arp.index(), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexarp_shared::NoteSource;

    fn lane() -> Lane {
        Lane::new(0, Arc::new(LaneShared::default()), 1)
    }

    #[test]
    fn selection_is_intersection_in_input_order() {
        let input = vec![60, 62, 64, 65, 67];
        let snap = NoteSnapshot::new(input.clone(), &[67, 60, 64]);
        assert_eq!(snap.arp, vec![60, 64, 67]);
        assert_eq!(snap.selected, vec![67, 60, 64]);

        let snap = NoteSnapshot::new(input.clone(), &[]);
        assert_eq!(snap.arp, input);
    }

    #[test]
    fn selection_is_capped_and_deduplicated() {
        let snap = NoteSnapshot::new(vec![1, 2, 3, 4, 5, 6], &[6, 6, 5, 4, 3, 2, 1]);
        assert_eq!(snap.selected, vec![6, 5, 4, 3]);
        assert_eq!(snap.arp, vec![3, 4, 5, 6]);
    }

    #[test]
    fn selection_outside_input_yields_empty_arp() {
        let snap = NoteSnapshot::new(vec![60, 64], &[61]);
        assert!(snap.arp.is_empty());
    }

    #[test]
    fn note_mask_spans_both_halves() {
        let mask = NoteMask::default();
        for p in [0, 63, 64, 127, 60] {
            mask.insert(p);
        }
        mask.insert(200);
        assert_eq!(mask.to_vec(), vec![0, 60, 63, 64, 127]);
        assert!(mask.contains(127));
        assert!(!mask.contains(1));
        mask.clear();
        assert_eq!(mask.bits(), 0);
    }

    #[test]
    fn swing_delays_odd_steps_only() {
        let none = Microtiming::default();
        assert_eq!(next_step_interval(6000.0, 0, 1.0, &none), 6000);
        assert_eq!(next_step_interval(6000.0, 1, 1.0, &none), 9000);
        assert_eq!(next_step_interval(6000.0, 3, 0.5, &none), 7500);
    }

    #[test]
    fn microtiming_cycles_by_step_counter() {
        let table = Microtiming::from_slice(&[0.25, -0.25, 2.0]);
        assert_eq!(table.as_slice(), &[0.25, -0.25, 0.5]);
        assert_eq!(next_step_interval(1000.0, 0, 0.0, &table), 1250);
        assert_eq!(next_step_interval(1000.0, 1, 0.0, &table), 750);
        assert_eq!(next_step_interval(1000.0, 5, 0.0, &table), 1500);
    }

    #[test]
    fn interval_never_collapses() {
        let table = Microtiming::from_slice(&[-0.5]);
        assert_eq!(next_step_interval(1.0, 0, 0.0, &table), 1);
    }

    #[test]
    fn microtiming_follows_pattern_length() {
        let mut l = lane();
        l.set_microtiming(Microtiming::from_slice(&[0.1, 0.2]));
        assert_eq!(l.microtiming().len(), 16);
        assert_eq!(l.microtiming().as_slice()[1], 0.2);
        assert_eq!(l.microtiming().as_slice()[2], 0.0);

        l.set_pattern(3, 1);
        assert_eq!(l.microtiming().len(), 3);

        l.set_microtiming(Microtiming::default());
        l.set_pattern(8, 1);
        assert!(l.microtiming().is_empty());
    }

    #[test]
    fn trigger_without_arp_plays_whole_input() {
        let mut l = lane();
        l.set_pattern(1, 1);
        let snap = NoteSnapshot::new(vec![48, 52, 55], &[]);
        assert_eq!(l.trigger(&snap), StepNotes::Chord(&[48, 52, 55]));
    }

    #[test]
    fn trigger_with_arp_uses_index() {
        let mut l = lane();
        l.configure(&LaneConfig {
            steps: 1,
            pulses: 1,
            arp_active: true,
            note_source: NoteSource::chord(0, 4),
            ..LaneConfig::default()
        });
        let snap = l.shared().notes.load_full();
        l.sync_snapshot(&snap);
        assert_eq!(l.trigger(&snap), StepNotes::Single(60));

        let sps = 10.0;
        let per_arp_step = (sps * l.arp().rate()) as usize;
        for _ in 0..per_arp_step {
            l.advance_arp(sps);
        }
        assert_eq!(l.arp().index(), 1);
        assert_eq!(l.trigger(&snap), StepNotes::Single(64));
    }

    #[test]
    fn arp_falls_back_to_first_input_note() {
        let mut l = lane();
        l.settings.arp_active = true;
        l.set_pattern(1, 1);
        let snap = NoteSnapshot::new(vec![50, 53], &[99]);
        assert_eq!(l.trigger(&snap), StepNotes::Single(50));

        let empty = NoteSnapshot::default();
        assert_eq!(l.trigger(&empty), StepNotes::Rest);
    }

    #[test]
    fn rest_step_still_consumes_pattern() {
        let mut l = lane();
        let snap = NoteSnapshot::new(vec![60], &[]);
        assert_eq!(l.trigger(&snap), StepNotes::Rest);
        assert_eq!(l.pattern().cursor(), 1);
    }

    #[test]
    fn solo_and_mute_rules() {
        let mut l = lane();
        assert!(l.is_audible(false));
        assert!(!l.is_audible(true));
        l.settings.solo = true;
        assert!(l.is_audible(true));
        l.settings.mute = true;
        assert!(!l.is_audible(true));
    }
}
