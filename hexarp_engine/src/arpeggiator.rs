use hexarp_shared::ArpMode;

/// Per-lane arpeggiator, advanced by elapsed samples.
///
/// Only walks an index; the lane maps it onto its current note snapshot.
pub struct Arpeggiator {
    mode: ArpMode,
    note_count: usize,
    rate: f64,
    step_index: usize,
    direction_up: bool,
    /// Samples accumulated toward the next transition.
    phase: f64,
    rng: fastrand::Rng,
}

impl Default for Arpeggiator {
    fn default() -> Self {
        Self::new(ArpMode::Up, 0, 1.0)
    }
}

impl Arpeggiator {
    pub fn new(mode: ArpMode, note_count: usize, rate: f64) -> Self {
        Self {
            mode,
            note_count,
            rate: if rate.is_finite() && rate > 0.0 { rate } else { 1.0 },
            step_index: 0,
            direction_up: true,
            phase: 0.0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic Random mode.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    pub fn set_mode(&mut self, mode: ArpMode) {
        self.mode = mode;
        self.reset();
    }

    pub fn set_note_count(&mut self, note_count: usize) {
        self.note_count = note_count;
        self.reset();
    }

    /// Non-positive or non-finite multipliers are ignored.
    pub fn set_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 {
            self.rate = rate;
        }
    }

    pub fn mode(&self) -> ArpMode {
        self.mode
    }

    pub fn note_count(&self) -> usize {
        self.note_count
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn index(&self) -> usize {
        self.step_index
    }

    pub fn direction_up(&self) -> bool {
        self.direction_up
    }

    /// Accumulate `elapsed` samples; once a full arp step has built up, consume
    /// one step's worth (the remainder is kept, no drift) and make exactly one
    /// transition. Returns whether a transition happened.
    pub fn advance(&mut self, elapsed: f64, samples_per_step: f64) -> bool {
        if self.note_count == 0 {
            return false;
        }

        self.phase += elapsed.max(0.0);
        if self.phase < samples_per_step {
            return false;
        }
        self.phase -= samples_per_step;

        let n = self.note_count;
        match self.mode {
            ArpMode::Up => {
                self.step_index = (self.step_index + 1) % n;
            }
            ArpMode::Down => {
                self.step_index = (self.step_index + n - 1) % n;
            }
            ArpMode::UpDown => {
                // Turnaround checks run after the move, so each endpoint is
                // visited once per sweep.
                if self.direction_up {
                    self.step_index += 1;
                    if self.step_index + 1 >= n {
                        self.direction_up = false;
                    }
                } else {
                    self.step_index = self.step_index.saturating_sub(1);
                    if self.step_index == 0 {
                        self.direction_up = true;
                    }
                }
                // n == 1 would otherwise walk off the end
                self.step_index = self.step_index.min(n - 1);
            }
            ArpMode::Random => {
                self.step_index = self.rng.usize(0..n);
            }
        }
        true
    }

    pub fn reset(&mut self) {
        self.step_index = 0;
        self.direction_up = true;
        self.phase = 0.0;
    }
}
