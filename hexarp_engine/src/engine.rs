use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::Guard;
use crossbeam_channel::{bounded, Receiver};
use hexarp_shared::{
    ClockMessage, ClockMessageKind, ClockSource, EngineConfig, HostTransport, MidiEvent, NUM_LANES,
};

use crate::clock::{Clock, ClockSettings};
use crate::commands::EngineCommand;
use crate::handle::EngineHandle;
use crate::lane::{Lane, LaneShared, NoteSnapshot};
use crate::scheduler::{EventScheduler, SampleContext};
use crate::transport::{TransportEdge, TransportState};

/// Bounded so a stalled audio thread cannot make the control side grow memory.
pub const COMMAND_QUEUE_CAPACITY: usize = 1024;

/// State published by the engine and read by any number of control threads.
pub struct EngineShared {
    pub clock: Arc<ClockSettings>,
    pub lanes: [Arc<LaneShared>; NUM_LANES],
    is_playing: AtomicBool,
    position: AtomicU64,
}

impl EngineShared {
    fn new(clock: Arc<ClockSettings>) -> Self {
        Self {
            clock,
            lanes: std::array::from_fn(|_| Arc::new(LaneShared::default())),
            is_playing: AtomicBool::new(false),
            position: AtomicU64::new(0),
        }
    }

    /// Once this reads false, every note-off flushed by the stop has already
    /// been handed to the caller of `process_block` or `stop`.
    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::Acquire)
    }

    /// Samples since the transport last started.
    pub fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }
}

/// Real-time side: owns the six lanes and renders one block at a time.
/// Nothing in `process_block` blocks, allocates (beyond `out` growing) or fails.
pub struct Engine {
    lanes: Vec<Lane>,
    clock: Clock,
    scheduler: EventScheduler,
    transport: TransportState,
    shared: Arc<EngineShared>,
    command_rx: Receiver<EngineCommand>,
    /// Samples since the transport started. Drives the step grid.
    global_sample: i64,
    /// Free-running sample counter, used to time external clock ticks.
    sample_clock: u64,
}

impl Engine {
    /// Build an engine from a startup configuration. Lane settings are
    /// sanitized; lanes missing from the config take defaults.
    pub fn new(config: &EngineConfig) -> (Engine, EngineHandle) {
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_CAPACITY);
        let settings = Arc::new(ClockSettings::new(config.bpm, config.clock_source, config.standalone));
        let shared = Arc::new(EngineShared::new(settings.clone()));

        let lanes = (0..NUM_LANES)
            .map(|i| {
                let mut lane = Lane::new(i, shared.lanes[i].clone(), config.rng_seed);
                lane.configure(&config.lane(i));
                lane
            })
            .collect();

        log::info!(
            "[Engine] Created: {} Hz, {} bpm, clock {}",
            config.sample_rate,
            config.bpm,
            config.clock_source.name()
        );

        let engine = Engine {
            lanes,
            clock: Clock::new(settings, config.sample_rate),
            scheduler: EventScheduler::new(),
            transport: TransportState::default(),
            shared: shared.clone(),
            command_rx,
            global_sample: 0,
            sample_clock: 0,
        };
        (engine, EngineHandle::new(command_tx, shared))
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn scheduler(&self) -> &EventScheduler {
        &self.scheduler
    }

    pub fn is_playing(&self) -> bool {
        self.transport.is_playing
    }

    pub fn global_sample(&self) -> i64 {
        self.global_sample
    }

    /// Render `num_samples` samples. Events are appended to `out` in offset
    /// order; `clock_in` must be sorted by offset and is only read when the
    /// clock source is External.
    pub fn process_block(
        &mut self,
        num_samples: usize,
        host: &HostTransport,
        clock_in: &[ClockMessage],
        out: &mut Vec<MidiEvent>,
    ) {
        self.drain_commands();
        self.clock.begin_block(host.bpm);

        let external = self.clock.source() == ClockSource::External;
        let wants = self.transport.wants_play(self.clock.source(), host);
        self.apply_edge(wants, 0, out);

        let guards: [Guard<Arc<NoteSnapshot>>; NUM_LANES] =
            std::array::from_fn(|i| self.shared.lanes[i].notes.load());
        let notes: [&NoteSnapshot; NUM_LANES] = std::array::from_fn(|i| &**guards[i]);
        for (lane, snapshot) in self.lanes.iter_mut().zip(notes.iter()) {
            lane.sync_snapshot(snapshot);
        }

        let any_solo = self.lanes.iter().any(|l| l.settings.active && l.settings.solo);
        let samples_per_step = self.clock.samples_per_step();
        let mut messages = clock_in.iter().peekable();

        for i in 0..num_samples {
            let offset = i as u32;
            if external {
                while let Some(msg) = messages.next_if(|m| m.sample_offset as usize <= i) {
                    self.handle_clock_message(msg.kind, offset, out);
                }
            }

            if self.transport.is_playing {
                let ctx = SampleContext {
                    offset,
                    global_sample: self.global_sample,
                    samples_per_step,
                    external_ticks: external.then(|| self.clock.external_ticks()),
                    any_solo,
                };
                self.scheduler.process_sample(&ctx, &mut self.lanes, &notes, out);
                self.clock.advance(1);
                self.global_sample += 1;
            }
            self.sample_clock += 1;
        }

        // Stragglers stamped past the end of the block
        if external {
            let last = num_samples.saturating_sub(1) as u32;
            for msg in messages {
                self.handle_clock_message(msg.kind, last, out);
            }
        }

        self.shared.is_playing.store(self.transport.is_playing, Ordering::Release);
        self.shared.position.store(self.global_sample.max(0) as u64, Ordering::Relaxed);
    }

    /// Stop now and release every held note at offset 0. Safe to call twice.
    pub fn stop(&mut self, out: &mut Vec<MidiEvent>) {
        if self.transport.halt() {
            self.scheduler.flush(0, out);
            self.clock.pause();
        }
        self.shared.is_playing.store(false, Ordering::Release);
    }

    fn apply_edge(&mut self, playing: bool, offset: u32, out: &mut Vec<MidiEvent>) {
        match self.transport.update(playing) {
            TransportEdge::Started => self.restart(),
            TransportEdge::Stopped => {
                self.scheduler.flush(offset, out);
                self.clock.pause();
            }
            TransportEdge::None => {}
        }
    }

    /// Top of the song: every lane back to step 0.
    fn restart(&mut self) {
        self.global_sample = 0;
        self.clock.reset();
        for lane in self.lanes.iter_mut() {
            lane.reset_run_state(0, 0);
        }
    }

    fn handle_clock_message(&mut self, kind: ClockMessageKind, offset: u32, out: &mut Vec<MidiEvent>) {
        match kind {
            ClockMessageKind::Tick => {
                self.clock.process_external_tick(self.sample_clock);
                if self.transport.is_playing {
                    self.clock.process_external_clock(1);
                }
            }
            ClockMessageKind::Start => {
                // Restarts the song even when already running
                self.transport.external_running = true;
                self.transport.update(true);
                self.restart();
            }
            ClockMessageKind::Continue => {
                self.transport.external_running = true;
                self.transport.update(true);
            }
            ClockMessageKind::Stop => {
                self.transport.external_running = false;
                self.apply_edge(false, offset, out);
            }
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.command_rx.try_recv() {
            self.apply_command(cmd);
        }
    }

    fn apply_command(&mut self, cmd: EngineCommand) {
        let global_sample = self.global_sample;
        let ticks = self.clock.external_ticks();
        match cmd {
            EngineCommand::Play => self.transport.play_requested = true,
            EngineCommand::Stop => self.transport.play_requested = false,
            EngineCommand::SetSampleRate(sample_rate) => self.clock.prepare(sample_rate),
            EngineCommand::ReseedRandom(seed) => {
                for lane in self.lanes.iter_mut() {
                    let lane_seed = seed.wrapping_add(lane.index as u64);
                    lane.arp_mut().reseed(lane_seed);
                }
            }
            _ => {
                let Some(lane) = cmd.lane().and_then(|i| self.lanes.get_mut(i)) else {
                    return;
                };
                match cmd {
                    EngineCommand::SetActive { active, .. } => {
                        if active && !lane.settings.active {
                            // Skip the steps missed while inactive
                            lane.realign(global_sample, ticks);
                        }
                        lane.settings.active = active;
                    }
                    EngineCommand::SetMute { muted, .. } => lane.settings.mute = muted,
                    EngineCommand::SetSolo { solo, .. } => lane.settings.solo = solo,
                    EngineCommand::SetPattern { steps, pulses, .. } => lane.set_pattern(steps, pulses),
                    EngineCommand::SetSwing { amount, .. } => {
                        lane.settings.swing = hexarp_shared::lane::clamp_unit(amount, 0.0, 1.0)
                    }
                    EngineCommand::SetMicrotiming { table, .. } => lane.set_microtiming(table),
                    EngineCommand::SetVelocity { velocity, .. } => lane.settings.velocity = velocity.min(127),
                    EngineCommand::SetNoteLength { fraction, .. } => {
                        lane.settings.note_length = hexarp_shared::lane::clamp_unit(fraction, 0.0, 1.0)
                    }
                    EngineCommand::SetArpActive { active, .. } => lane.settings.arp_active = active,
                    EngineCommand::SetArpMode { mode, .. } => lane.arp_mut().set_mode(mode),
                    EngineCommand::SetArpRate { rate, .. } => lane.arp_mut().set_rate(rate),
                    EngineCommand::SetMidiRoute { channel, port, .. } => {
                        lane.settings.midi_channel = channel.clamp(1, 16);
                        lane.settings.midi_port = port;
                    }
                    EngineCommand::ResetLane { .. } => lane.reset_run_state(global_sample, ticks),
                    EngineCommand::Play
                    | EngineCommand::Stop
                    | EngineCommand::SetSampleRate(_)
                    | EngineCommand::ReseedRandom(_) => {}
                }
            }
        }
    }
}
