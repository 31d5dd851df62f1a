use hexarp_shared::scale::{ChordType, ScaleType};
use hexarp_shared::{NoteSource, NoteSourceKind, DEFAULT_PITCH};

/// Maps a lane's note source to the ordered pitches fed to the lane.
pub struct NoteSetResolver;

impl NoteSetResolver {
    pub fn resolve(source: &NoteSource) -> Vec<u8> {
        match source.kind {
            NoteSourceKind::Single => match u8::try_from(source.value) {
                Ok(pitch) if pitch <= 127 => vec![pitch],
                _ => vec![DEFAULT_PITCH],
            },
            NoteSourceKind::Scale => {
                let scale = usize::try_from(source.value).ok().and_then(ScaleType::from_index);
                match scale {
                    Some(s) => Self::transpose(s.intervals(), source.octave),
                    None => vec![DEFAULT_PITCH],
                }
            }
            NoteSourceKind::Chord => {
                let chord = usize::try_from(source.value).ok().and_then(ChordType::from_index);
                match chord {
                    Some(c) => Self::transpose(c.intervals(), source.octave),
                    None => vec![DEFAULT_PITCH],
                }
            }
        }
    }

    /// Octave 4 puts the root on middle C (60). Pitches outside 0..=127 are dropped.
    fn transpose(intervals: &[u8], octave: i32) -> Vec<u8> {
        let base = (octave.saturating_add(1)).saturating_mul(12);
        let notes: Vec<u8> = intervals
            .iter()
            .filter_map(|&iv| u8::try_from(base.saturating_add(iv as i32)).ok())
            .filter(|&p| p <= 127)
            .collect();

        if notes.is_empty() {
            vec![DEFAULT_PITCH]
        } else {
            notes
        }
    }
}
