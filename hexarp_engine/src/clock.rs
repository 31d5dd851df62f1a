use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use hexarp_shared::{ClockSource, CLOCK_TICKS_PER_BEAT};

/// Denominators never go below this many samples.
pub const MIN_SAMPLES_PER_STEP: f64 = 1.0;

/// Sequencer steps (sixteenths) per beat.
const STEPS_PER_BEAT: f64 = 4.0;

/// 24 PPQN clock ticks per sixteenth, whatever the tempo.
pub const TICKS_PER_STEP: u64 = 6;

// Weight of the newest tick interval when following an external clock
const TICK_SMOOTHING: f64 = 0.2;

/// Clock settings written by the control thread, read by the audio thread.
/// Single writer, many readers, all lock-free.
pub struct ClockSettings {
    bpm_bits: AtomicU64,
    source: AtomicU8,
    standalone: AtomicBool,
}

impl ClockSettings {
    pub fn new(bpm: f64, source: ClockSource, standalone: bool) -> Self {
        Self {
            bpm_bits: AtomicU64::new(sanitize_bpm(bpm, 120.0).to_bits()),
            source: AtomicU8::new(source.index() as u8),
            standalone: AtomicBool::new(standalone),
        }
    }

    pub fn bpm(&self) -> f64 {
        f64::from_bits(self.bpm_bits.load(Ordering::Relaxed))
    }

    /// Ignored unless positive and finite.
    pub fn set_bpm(&self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm_bits.store(bpm.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn source(&self) -> ClockSource {
        ClockSource::from_index(self.source.load(Ordering::Relaxed) as usize).unwrap_or_default()
    }

    pub fn set_source(&self, source: ClockSource) {
        self.source.store(source.index() as u8, Ordering::Relaxed);
    }

    pub fn standalone(&self) -> bool {
        self.standalone.load(Ordering::Relaxed)
    }

    pub fn set_standalone(&self, standalone: bool) {
        self.standalone.store(standalone, Ordering::Relaxed);
    }

    /// The source actually in effect. Standalone has no host to follow.
    pub fn effective_source(&self) -> ClockSource {
        match self.source() {
            ClockSource::Daw if self.standalone() => ClockSource::Internal,
            other => other,
        }
    }
}

fn sanitize_bpm(bpm: f64, fallback: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        fallback
    }
}

/// Authoritative musical clock of the engine (audio thread side).
pub struct Clock {
    settings: Arc<ClockSettings>,
    sample_rate: f64,
    /// Tempo in effect for the current block.
    bpm: f64,
    sample_phase: f64,

    // External sync
    ext_ticks: u64,
    last_tick_sample: Option<u64>,
    tick_interval: Option<f64>,
}

impl Clock {
    pub fn new(settings: Arc<ClockSettings>, sample_rate: f64) -> Self {
        let bpm = settings.bpm();
        let mut clock = Self {
            settings,
            sample_rate: 44100.0,
            bpm,
            sample_phase: 0.0,
            ext_ticks: 0,
            last_tick_sample: None,
            tick_interval: None,
        };
        clock.prepare(sample_rate);
        clock
    }

    pub fn settings(&self) -> &Arc<ClockSettings> {
        &self.settings
    }

    /// Set the sample rate and restart all accumulators.
    pub fn prepare(&mut self, sample_rate: f64) {
        if sample_rate.is_finite() && sample_rate > 0.0 {
            self.sample_rate = sample_rate;
        }
        self.reset();
    }

    pub fn reset(&mut self) {
        self.pause();
        self.ext_ticks = 0;
    }

    /// Transport stopped: the step grid restarts, counted ticks are kept for
    /// a later Continue.
    pub fn pause(&mut self) {
        self.sample_phase = 0.0;
        self.last_tick_sample = None;
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn source(&self) -> ClockSource {
        self.settings.effective_source()
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Latch the tempo for the coming block.
    pub fn begin_block(&mut self, host_bpm: Option<f64>) {
        let internal = self.settings.bpm();
        self.bpm = match self.source() {
            ClockSource::Internal => internal,
            ClockSource::Daw => host_bpm.map_or(internal, |b| sanitize_bpm(b, internal)),
            ClockSource::External => match self.tick_interval {
                Some(interval) => {
                    let samples_per_beat = interval * CLOCK_TICKS_PER_BEAT;
                    sanitize_bpm(60.0 * self.sample_rate / samples_per_beat, internal)
                }
                None => internal,
            },
        };
    }

    pub fn samples_per_beat(&self) -> f64 {
        (60.0 / self.bpm) * self.sample_rate
    }

    /// One step is one sixteenth note.
    pub fn samples_per_step(&self) -> f64 {
        (self.samples_per_beat() / STEPS_PER_BEAT).max(MIN_SAMPLES_PER_STEP)
    }

    pub fn samples_per_arp_step(&self, rate: f64) -> f64 {
        (self.samples_per_step() * rate).max(MIN_SAMPLES_PER_STEP)
    }

    pub fn sample_phase(&self) -> f64 {
        self.sample_phase
    }

    /// Free-running step grid. Returns true when a step boundary was crossed.
    pub fn advance(&mut self, num_samples: usize) -> bool {
        self.sample_phase += num_samples as f64;
        let sps = self.samples_per_step();
        if self.sample_phase >= sps {
            self.sample_phase -= sps;
            return true;
        }
        false
    }

    /// Measure the spacing of a 24 PPQN tick received at absolute sample
    /// position `at`. Only the tempo follows from this, not the step grid.
    pub fn process_external_tick(&mut self, at: u64) {
        if self.source() != ClockSource::External {
            return;
        }

        if let Some(last) = self.last_tick_sample {
            let interval = at.saturating_sub(last) as f64;
            if interval > 0.0 {
                self.tick_interval = Some(match self.tick_interval {
                    Some(prev) => prev + (interval - prev) * TICK_SMOOTHING,
                    None => interval,
                });
            }
        }
        self.last_tick_sample = Some(at);
    }

    /// Count `ticks` ticks of external clock.
    pub fn process_external_clock(&mut self, ticks: usize) {
        if self.source() != ClockSource::External {
            return;
        }
        self.ext_ticks += ticks as u64;
    }

    /// Ticks counted since the last reset. Lanes step every `TICKS_PER_STEP`.
    pub fn external_ticks(&self) -> u64 {
        self.ext_ticks
    }

    /// The counted ticks expressed in samples at the current tempo.
    pub fn external_accumulator(&self) -> f64 {
        self.ext_ticks as f64 * self.samples_per_beat() / CLOCK_TICKS_PER_BEAT
    }

    /// Measured external tick interval, if at least two ticks arrived.
    pub fn tick_interval(&self) -> Option<f64> {
        self.tick_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(bpm: f64, source: ClockSource) -> Clock {
        Clock::new(Arc::new(ClockSettings::new(bpm, source, false)), 48000.0)
    }

    #[test]
    fn sixteenth_at_120() {
        let mut c = clock(120.0, ClockSource::Internal);
        c.begin_block(None);
        assert_eq!(c.samples_per_step(), 6000.0);
        assert_eq!(c.samples_per_arp_step(4.0), 24000.0);
    }

    #[test]
    fn advance_signals_boundaries_and_keeps_remainder() {
        let mut c = clock(120.0, ClockSource::Internal);
        c.begin_block(None);
        assert!(!c.advance(5999));
        assert!(c.advance(2));
        assert_eq!(c.sample_phase(), 1.0);
        c.reset();
        assert_eq!(c.sample_phase(), 0.0);
    }

    #[test]
    fn daw_source_follows_host_unless_standalone() {
        let mut c = clock(120.0, ClockSource::Daw);
        c.begin_block(Some(60.0));
        assert_eq!(c.bpm(), 60.0);
        c.begin_block(None);
        assert_eq!(c.bpm(), 120.0);

        c.settings().set_standalone(true);
        c.begin_block(Some(60.0));
        assert_eq!(c.bpm(), 120.0);
        assert_eq!(c.source(), ClockSource::Internal);
    }

    #[test]
    fn bad_bpm_is_ignored() {
        let c = clock(120.0, ClockSource::Internal);
        c.settings().set_bpm(0.0);
        c.settings().set_bpm(f64::NAN);
        assert_eq!(c.settings().bpm(), 120.0);
    }

    #[test]
    fn external_ticks_only_count_when_external() {
        let mut c = clock(120.0, ClockSource::Internal);
        c.begin_block(None);
        c.process_external_tick(0);
        c.process_external_tick(1000);
        assert_eq!(c.tick_interval(), None);
        c.process_external_clock(24);
        assert_eq!(c.external_ticks(), 0);

        c.settings().set_source(ClockSource::External);
        c.begin_block(None);
        c.process_external_clock(TICKS_PER_STEP as usize);
        // 6 ticks = one sixteenth
        assert_eq!(c.external_ticks(), 6);
        assert_eq!(c.external_accumulator(), c.samples_per_step());
    }

    #[test]
    fn pause_keeps_ticks_and_reset_drops_them() {
        let mut c = clock(120.0, ClockSource::External);
        c.process_external_clock(8);
        c.advance(100);
        c.pause();
        assert_eq!(c.sample_phase(), 0.0);
        assert_eq!(c.external_ticks(), 8);
        c.reset();
        assert_eq!(c.external_ticks(), 0);
    }

    #[test]
    fn external_tempo_is_derived_from_tick_spacing() {
        let mut c = clock(120.0, ClockSource::External);
        // 90 bpm at 48k: 32000 samples per beat, 24 ticks
        let interval = 32000u64 / 24;
        for i in 0..48u64 {
            c.process_external_tick(i * interval);
        }
        c.begin_block(None);
        assert!((c.bpm() - 90.0).abs() < 0.1, "bpm = {}", c.bpm());
    }
}
