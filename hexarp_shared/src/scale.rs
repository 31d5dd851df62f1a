use serde::{Deserialize, Serialize};

/// Scale catalog. A lane's `NoteSource::Scale` value indexes into `ScaleType::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleType {
    // Basic
    Major,
    Minor,
    Chromatic,

    // Major Modes
    Dorian,
    Phrygian,
    Lydian,
    Mixolydian,
    Locrian,

    // Harmonic/Melodic
    HarmonicMinor,
    MelodicMinor,
    PhrygianDominant,
    LydianDominant,

    // Pentatonic/Blues
    MajorPentatonic,
    MinorPentatonic,
    Blues,
    MajorBlues,
    Hexatonic,

    // Symmetric
    WholeTone,
    DiminishedWholeHalf,
    DiminishedHalfWhole,

    // Exotic
    HungarianMinor,
    Hirajoshi,
    InSen,

    // Bebop
    BebopDominant,
    BebopMajor,
}

impl Default for ScaleType {
    fn default() -> Self {
        Self::Major
    }
}

impl ScaleType {
    /// Constant array of all scales for O(1) index lookup (no heap allocation).
    pub const ALL: [ScaleType; 25] = [
        ScaleType::Major,
        ScaleType::Minor,
        ScaleType::Chromatic,
        ScaleType::Dorian,
        ScaleType::Phrygian,
        ScaleType::Lydian,
        ScaleType::Mixolydian,
        ScaleType::Locrian,
        ScaleType::HarmonicMinor,
        ScaleType::MelodicMinor,
        ScaleType::PhrygianDominant,
        ScaleType::LydianDominant,
        ScaleType::MajorPentatonic,
        ScaleType::MinorPentatonic,
        ScaleType::Blues,
        ScaleType::MajorBlues,
        ScaleType::Hexatonic,
        ScaleType::WholeTone,
        ScaleType::DiminishedWholeHalf,
        ScaleType::DiminishedHalfWhole,
        ScaleType::HungarianMinor,
        ScaleType::Hirajoshi,
        ScaleType::InSen,
        ScaleType::BebopDominant,
        ScaleType::BebopMajor,
    ];

    pub fn from_index(idx: usize) -> Option<ScaleType> {
        Self::ALL.get(idx).copied()
    }

    /// Semitone offsets from the root. The octave is included for the
    /// seven-note modes so an arpeggio over the scale resolves upward.
    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ScaleType::Major => &[0, 2, 4, 5, 7, 9, 11, 12],
            ScaleType::Minor => &[0, 2, 3, 5, 7, 8, 10, 12],
            ScaleType::Chromatic => &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11],

            ScaleType::Dorian => &[0, 2, 3, 5, 7, 9, 10, 12],
            ScaleType::Phrygian => &[0, 1, 3, 5, 7, 8, 10, 12],
            ScaleType::Lydian => &[0, 2, 4, 6, 7, 9, 11, 12],
            ScaleType::Mixolydian => &[0, 2, 4, 5, 7, 9, 10, 12],
            ScaleType::Locrian => &[0, 1, 3, 5, 6, 8, 10, 12],

            ScaleType::HarmonicMinor => &[0, 2, 3, 5, 7, 8, 11, 12],
            ScaleType::MelodicMinor => &[0, 2, 3, 5, 7, 9, 11, 12],
            ScaleType::PhrygianDominant => &[0, 1, 4, 5, 7, 8, 10, 12],
            ScaleType::LydianDominant => &[0, 2, 4, 6, 7, 9, 10, 12],

            ScaleType::MajorPentatonic => &[0, 2, 4, 7, 9],
            ScaleType::MinorPentatonic => &[0, 3, 5, 7, 10],
            ScaleType::Blues => &[0, 3, 5, 6, 7, 10],
            ScaleType::MajorBlues => &[0, 2, 3, 4, 7, 9],
            ScaleType::Hexatonic => &[0, 2, 4, 5, 7, 9],

            ScaleType::WholeTone => &[0, 2, 4, 6, 8, 10],
            ScaleType::DiminishedWholeHalf => &[0, 2, 3, 5, 6, 8, 9, 11],
            ScaleType::DiminishedHalfWhole => &[0, 1, 3, 4, 6, 7, 9, 10],

            ScaleType::HungarianMinor => &[0, 2, 3, 6, 7, 8, 11],
            ScaleType::Hirajoshi => &[0, 2, 3, 7, 8],
            ScaleType::InSen => &[0, 1, 5, 7, 10],

            ScaleType::BebopDominant => &[0, 2, 4, 5, 7, 9, 10, 11],
            ScaleType::BebopMajor => &[0, 2, 4, 5, 7, 8, 9, 11],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScaleType::Major => "Major",
            ScaleType::Minor => "Minor",
            ScaleType::Chromatic => "Chromatic",
            ScaleType::Dorian => "Dorian",
            ScaleType::Phrygian => "Phrygian",
            ScaleType::Lydian => "Lydian",
            ScaleType::Mixolydian => "Mixolydian",
            ScaleType::Locrian => "Locrian",
            ScaleType::HarmonicMinor => "Harmonic Minor",
            ScaleType::MelodicMinor => "Melodic Minor",
            ScaleType::PhrygianDominant => "Phrygian Dominant",
            ScaleType::LydianDominant => "Lydian Dominant",
            ScaleType::MajorPentatonic => "Penta Major",
            ScaleType::MinorPentatonic => "Penta Minor",
            ScaleType::Blues => "Blues",
            ScaleType::MajorBlues => "Major Blues",
            ScaleType::Hexatonic => "Hexatonic",
            ScaleType::WholeTone => "Whole Tone",
            ScaleType::DiminishedWholeHalf => "Diminished W-H",
            ScaleType::DiminishedHalfWhole => "Diminished H-W",
            ScaleType::HungarianMinor => "Hungarian Minor",
            ScaleType::Hirajoshi => "Hirajoshi",
            ScaleType::InSen => "In Sen",
            ScaleType::BebopDominant => "Bebop Dominant",
            ScaleType::BebopMajor => "Bebop Major",
        }
    }

    pub fn iter() -> impl Iterator<Item = ScaleType> {
        Self::ALL.into_iter()
    }
}

/// Chord catalog. A lane's `NoteSource::Chord` value indexes into `ChordType::ALL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChordType {
    Major,
    Minor,
    Diminished,
    Augmented,
    Sus2,
    Sus4,
    Maj7,
    Min7,
    Dom7,
    Dim7,
    HalfDim7,
    FirstInversion,
    SecondInversion,
    Major9,
    Minor9,
    Dom9,
}

impl Default for ChordType {
    fn default() -> Self {
        Self::Major
    }
}

impl ChordType {
    pub const ALL: [ChordType; 16] = [
        ChordType::Major, ChordType::Minor, ChordType::Diminished, ChordType::Augmented,
        ChordType::Sus2, ChordType::Sus4, ChordType::Maj7, ChordType::Min7,
        ChordType::Dom7, ChordType::Dim7, ChordType::HalfDim7, ChordType::FirstInversion,
        ChordType::SecondInversion, ChordType::Major9, ChordType::Minor9, ChordType::Dom9,
    ];

    /// O(1) lookup by index, RT-safe, zero allocation.
    pub fn from_index(idx: usize) -> Option<ChordType> {
        Self::ALL.get(idx).copied()
    }

    pub fn intervals(&self) -> &'static [u8] {
        match self {
            ChordType::Major => &[0, 4, 7],
            ChordType::Minor => &[0, 3, 7],
            ChordType::Diminished => &[0, 3, 6],
            ChordType::Augmented => &[0, 4, 8],
            ChordType::Sus2 => &[0, 2, 7],
            ChordType::Sus4 => &[0, 5, 7],
            ChordType::Maj7 => &[0, 4, 7, 11],
            ChordType::Min7 => &[0, 3, 7, 10],
            ChordType::Dom7 => &[0, 4, 7, 10],
            ChordType::Dim7 => &[0, 3, 6, 9],
            ChordType::HalfDim7 => &[0, 3, 6, 10],
            ChordType::FirstInversion => &[4, 7, 12],
            ChordType::SecondInversion => &[7, 12, 16],
            ChordType::Major9 => &[0, 4, 7, 11, 14],
            ChordType::Minor9 => &[0, 3, 7, 10, 14],
            ChordType::Dom9 => &[0, 4, 7, 10, 14],
        }
    }

    pub fn iter() -> impl Iterator<Item = ChordType> {
        Self::ALL.into_iter()
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChordType::Major => "Maj",
            ChordType::Minor => "Min",
            ChordType::Diminished => "Dim",
            ChordType::Augmented => "Aug",
            ChordType::Sus2 => "Sus2",
            ChordType::Sus4 => "Sus4",
            ChordType::Maj7 => "Maj7",
            ChordType::Min7 => "Min7",
            ChordType::Dom7 => "Dom7",
            ChordType::Dim7 => "Dim7",
            ChordType::HalfDim7 => "m7b5",
            ChordType::FirstInversion => "1st Inv",
            ChordType::SecondInversion => "2nd Inv",
            ChordType::Major9 => "Maj9",
            ChordType::Minor9 => "Min9",
            ChordType::Dom9 => "Dom9",
        }
    }
}
