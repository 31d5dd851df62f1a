use hexarp_shared::MAX_STEPS;

/// Euclidean-style step pattern.
///
/// Pulses are spread with an integer bucket accumulator, so the first onset
/// lands where the bucket first overflows (index 3 for 16/4), not on index 0.
#[derive(Debug, Clone)]
pub struct RhythmPattern {
    steps: usize,
    pulses: usize,
    pattern: Vec<bool>,
    cursor: usize,
}

impl Default for RhythmPattern {
    fn default() -> Self {
        Self::new(16, 4)
    }
}

impl RhythmPattern {
    pub fn new(steps: i32, pulses: i32) -> Self {
        let mut p = Self {
            steps: 1,
            pulses: 0,
            // Reserved once, regeneration reuses it
            pattern: Vec::with_capacity(MAX_STEPS),
            cursor: 0,
        };
        p.set_pattern(steps, pulses);
        p
    }

    /// Reconfigure and regenerate. Steps are clamped to `1..=MAX_STEPS`,
    /// pulses to `0..=steps`. The cursor restarts at 0.
    pub fn set_pattern(&mut self, steps: i32, pulses: i32) {
        let steps = steps.clamp(1, MAX_STEPS as i32);
        self.steps = steps as usize;
        self.pulses = pulses.clamp(0, steps) as usize;
        self.generate();
        self.cursor = 0;
    }

    fn generate(&mut self) {
        self.pattern.clear();
        let mut bucket = 0;
        for _ in 0..self.steps {
            bucket += self.pulses;
            if bucket >= self.steps {
                bucket -= self.steps;
                self.pattern.push(true);
            } else {
                self.pattern.push(false);
            }
        }
    }

    /// Value at the cursor, then advance the cursor.
    pub fn next_step(&mut self) -> bool {
        if self.pattern.is_empty() {
            return false;
        }
        let hit = self.pattern[self.cursor];
        self.cursor = (self.cursor + 1) % self.steps;
        hit
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn pattern(&self) -> &[bool] {
        &self.pattern
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn pulses(&self) -> usize {
        self.pulses
    }

    /// Index the next `next_step` call will read.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}
