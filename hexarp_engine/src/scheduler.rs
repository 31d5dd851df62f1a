use hexarp_shared::{MidiEvent, MidiEventKind, NUM_LANES};

use crate::lane::{Lane, NoteSnapshot};

// Room for every pitch of every lane before the list has to grow
const PENDING_CAPACITY: usize = NUM_LANES * 128;

/// A note-on waiting for its note-off, possibly several blocks away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingNoteOff {
    pub lane: usize,
    pub port: Option<u32>,
    pub channel: u8,
    pub pitch: u8,
    /// Samples left before the note-off is due.
    pub remaining: i64,
}

/// Per-sample inputs shared by all lanes.
#[derive(Debug, Clone, Copy)]
pub struct SampleContext {
    pub offset: u32,
    pub global_sample: i64,
    pub samples_per_step: f64,
    /// Ticks counted by the external clock. When set, lanes step on tick
    /// counts instead of the sample grid.
    pub external_ticks: Option<u64>,
    pub any_solo: bool,
}

/// Turns lane triggers into sample-stamped note-ons and keeps note-offs alive
/// across block boundaries.
pub struct EventScheduler {
    pending: Vec<PendingNoteOff>,
}

impl Default for EventScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventScheduler {
    pub fn new() -> Self {
        Self {
            pending: Vec::with_capacity(PENDING_CAPACITY),
        }
    }

    pub fn pending(&self) -> &[PendingNoteOff] {
        &self.pending
    }

    /// One sample of the whole engine: due note-offs first, then every active
    /// lane gets its arp tick and, when due, its trigger.
    pub fn process_sample(
        &mut self,
        ctx: &SampleContext,
        lanes: &mut [Lane],
        notes: &[&NoteSnapshot],
        out: &mut Vec<MidiEvent>,
    ) {
        self.tick(ctx.offset, out);

        for (lane, &snapshot) in lanes.iter_mut().zip(notes) {
            if !lane.settings.active {
                continue;
            }

            lane.advance_arp(ctx.samples_per_step);

            let due = match ctx.external_ticks {
                Some(ticks) => lane.take_external_step(ticks),
                None => lane.is_due(ctx.global_sample),
            };
            if !due {
                continue;
            }

            let audible = lane.is_audible(ctx.any_solo);
            let settings = lane.settings;
            let length = gate_samples(ctx.samples_per_step, settings.note_length);
            let index = lane.index;

            let step = lane.trigger(snapshot);
            step.for_each(|pitch| {
                lane.shared().seen.insert(pitch);
                if audible {
                    self.note_on(
                        ctx.offset,
                        PendingNoteOff {
                            lane: index,
                            port: settings.midi_port,
                            channel: settings.midi_channel,
                            pitch,
                            remaining: length,
                        },
                        settings.velocity,
                        out,
                    );
                }
            });

            if ctx.external_ticks.is_some() {
                lane.count_step();
            } else {
                lane.schedule_next(ctx.samples_per_step);
            }
            lane.publish_live();
        }
    }

    /// Count every pending note down by one sample and emit those that ran out.
    pub fn tick(&mut self, offset: u32, out: &mut Vec<MidiEvent>) {
        self.pending.retain_mut(|note| {
            note.remaining -= 1;
            if note.remaining <= 0 {
                out.push(note_off(offset, note));
                false
            } else {
                true
            }
        });
    }

    /// Emit a note-on and queue its note-off. A note still sounding on the same
    /// port, channel and pitch is cut first so the off of the old note cannot
    /// end the new one.
    pub fn note_on(&mut self, offset: u32, note: PendingNoteOff, velocity: u8, out: &mut Vec<MidiEvent>) {
        self.pending.retain(|held| {
            let same = held.port == note.port && held.channel == note.channel && held.pitch == note.pitch;
            if same {
                out.push(note_off(offset, held));
            }
            !same
        });

        out.push(MidiEvent {
            sample_offset: offset,
            lane: note.lane,
            port: note.port,
            channel: note.channel,
            kind: MidiEventKind::NoteOn { pitch: note.pitch, velocity },
        });
        self.pending.push(PendingNoteOff { remaining: note.remaining.max(1), ..note });
    }

    /// Emit every pending note-off at `offset` and clear the queue.
    pub fn flush(&mut self, offset: u32, out: &mut Vec<MidiEvent>) {
        out.extend(self.pending.drain(..).map(|note| note_off(offset, &note)));
    }
}

fn note_off(offset: u32, note: &PendingNoteOff) -> MidiEvent {
    MidiEvent {
        sample_offset: offset,
        lane: note.lane,
        port: note.port,
        channel: note.channel,
        kind: MidiEventKind::NoteOff { pitch: note.pitch },
    }
}

/// Gate length in samples, never shorter than one sample.
pub fn gate_samples(samples_per_step: f64, note_length: f32) -> i64 {
    ((samples_per_step * note_length as f64).ceil() as i64).max(1)
}
