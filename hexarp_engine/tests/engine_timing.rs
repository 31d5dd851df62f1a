use hexarp_engine::{Engine, EngineHandle};
use hexarp_shared::{
    ArpMode, ArpRate, EngineConfig, HostTransport, LaneConfig, MidiEvent, MidiEventKind, NoteSource, NUM_LANES,
};

const SR: f64 = 48000.0;
// 120 bpm at 48 kHz
const SPS: u64 = 6000;

/// Event with its position counted from the first rendered sample.
#[derive(Debug, Clone, Copy, PartialEq)]
struct At {
    sample: u64,
    lane: usize,
    kind: MidiEventKind,
}

fn engine_with(lanes: Vec<LaneConfig>) -> (Engine, EngineHandle) {
    let mut lanes = lanes;
    while lanes.len() < NUM_LANES {
        lanes.push(LaneConfig { active: false, ..LaneConfig::default() });
    }
    Engine::new(&EngineConfig { sample_rate: SR, bpm: 120.0, lanes, ..EngineConfig::default() })
}

fn render(engine: &mut Engine, block_sizes: impl IntoIterator<Item = usize>, host: HostTransport) -> Vec<At> {
    let mut all = Vec::new();
    let mut events: Vec<MidiEvent> = Vec::new();
    let mut start = 0u64;
    for size in block_sizes {
        events.clear();
        engine.process_block(size, &host, &[], &mut events);
        all.extend(events.iter().map(|e| At { sample: start + e.sample_offset as u64, lane: e.lane, kind: e.kind }));
        start += size as u64;
    }
    all
}

fn note_ons(events: &[At]) -> Vec<(u64, u8)> {
    events
        .iter()
        .filter_map(|e| match e.kind {
            MidiEventKind::NoteOn { pitch, .. } => Some((e.sample, pitch)),
            MidiEventKind::NoteOff { .. } => None,
        })
        .collect()
}

#[test]
fn single_note_lands_on_fourth_step() {
    let (mut engine, _handle) = engine_with(vec![LaneConfig::default()]);
    let events = render(&mut engine, [4 * SPS as usize], HostTransport::playing());

    println!("[Test] events: {:?}", events);
    assert_eq!(
        events,
        vec![
            At { sample: 3 * SPS, lane: 0, kind: MidiEventKind::NoteOn { pitch: 60, velocity: 100 } },
            At { sample: 3 * SPS + SPS / 2, lane: 0, kind: MidiEventKind::NoteOff { pitch: 60 } },
        ]
    );
}

#[test]
fn host_tempo_is_followed() {
    let (mut engine, handle) = engine_with(vec![LaneConfig::default()]);
    handle.set_clock_source(hexarp_shared::ClockSource::Daw);
    let host = HostTransport { is_playing: true, bpm: Some(60.0) };
    let events = render(&mut engine, [48000], host);
    assert_eq!(note_ons(&events), vec![(3 * 2 * SPS, 60)]);
}

#[test]
fn swing_delays_every_other_step() {
    let (mut engine, _handle) = engine_with(vec![LaneConfig {
        steps: 4,
        pulses: 4,
        swing: 1.0,
        note_length: 0.1,
        ..LaneConfig::default()
    }]);
    let events = render(&mut engine, [40000], HostTransport::playing());
    let times: Vec<u64> = note_ons(&events).iter().map(|&(t, _)| t).collect();
    assert_eq!(times, vec![0, 6000, 15000, 21000, 30000, 36000]);
}

#[test]
fn note_off_carries_across_blocks() {
    let (mut engine, _handle) = engine_with(vec![LaneConfig { note_length: 1.0, ..LaneConfig::default() }]);
    let events = render(&mut engine, [18001, 6000], HostTransport::playing());
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].sample, 24000);
    assert_eq!(events[1].kind, MidiEventKind::NoteOff { pitch: 60 });
}

#[test]
fn block_size_does_not_change_timing() {
    let lanes = vec![
        LaneConfig {
            steps: 7,
            pulses: 3,
            swing: 0.6,
            microtiming: vec![0.1, -0.2, 0.0, 0.35],
            note_source: NoteSource::scale(0, 4),
            arp_active: true,
            arp_mode: ArpMode::UpDown,
            arp_rate: ArpRate::Sixteenth,
            ..LaneConfig::default()
        },
        LaneConfig {
            steps: 5,
            pulses: 2,
            note_source: NoteSource::chord(1, 3),
            note_length: 0.9,
            midi_channel: 3,
            ..LaneConfig::default()
        },
        LaneConfig {
            steps: 12,
            pulses: 7,
            arp_active: true,
            arp_mode: ArpMode::Random,
            arp_rate: ArpRate::EighthTriplet,
            note_source: NoteSource::scale(13, 3),
            ..LaneConfig::default()
        },
    ];
    let total = 4 * 48000;

    let (mut reference, _h1) = engine_with(lanes.clone());
    let expected = render(&mut reference, std::iter::repeat(total / 8).take(8), HostTransport::playing());

    let (mut small, _h2) = engine_with(lanes.clone());
    let sizes: Vec<usize> = std::iter::repeat(37).take(total / 37).chain([total % 37]).collect();
    let actual = render(&mut small, sizes, HostTransport::playing());

    let (mut ragged, _h3) = engine_with(lanes);
    let mut sizes = Vec::new();
    let mut left = total;
    let mut rng = fastrand::Rng::with_seed(3);
    while left > 0 {
        let n = rng.usize(1..=2000).min(left);
        sizes.push(n);
        left -= n;
    }
    let uneven = render(&mut ragged, sizes, HostTransport::playing());

    assert!(!expected.is_empty());
    assert_eq!(expected, actual);
    assert_eq!(expected, uneven);
}

#[test]
fn stop_flushes_and_stays_silent_until_restart() {
    let (mut engine, handle) = engine_with(vec![LaneConfig::default()]);
    let events = render(&mut engine, [18001], HostTransport::playing());
    assert_eq!(note_ons(&events), vec![(18000, 60)]);

    let flushed = render(&mut engine, [512], HostTransport::stopped());
    assert_eq!(flushed, vec![At { sample: 0, lane: 0, kind: MidiEventKind::NoteOff { pitch: 60 } }]);
    assert!(!handle.is_playing());

    let silent = render(&mut engine, [48000, 48000], HostTransport::stopped());
    assert!(silent.is_empty());

    // Restart from the top of the pattern
    let again = render(&mut engine, [24000], HostTransport::playing());
    assert_eq!(note_ons(&again), vec![(18000, 60)]);
}

#[test]
fn play_button_drives_internal_clock() {
    let (mut engine, handle) = engine_with(vec![LaneConfig { steps: 1, pulses: 1, ..LaneConfig::default() }]);
    assert!(render(&mut engine, [1000], HostTransport::stopped()).is_empty());

    handle.play();
    let events = render(&mut engine, [1000], HostTransport::stopped());
    assert_eq!(note_ons(&events), vec![(0, 60)]);
    assert!(handle.is_playing());

    handle.stop();
    let events = render(&mut engine, [10], HostTransport::stopped());
    assert_eq!(events, vec![At { sample: 0, lane: 0, kind: MidiEventKind::NoteOff { pitch: 60 } }]);
}

#[test]
fn arp_walks_the_selection() {
    let (mut engine, handle) = engine_with(vec![LaneConfig {
        steps: 4,
        pulses: 4,
        arp_active: true,
        arp_rate: ArpRate::Sixteenth,
        note_source: NoteSource::chord(0, 4),
        ..LaneConfig::default()
    }]);
    handle.select_arp_notes(0, &[67, 60]);
    assert_eq!(handle.arp_notes(0), vec![60, 67]);

    let events = render(&mut engine, [24000], HostTransport::playing());
    assert_eq!(note_ons(&events), vec![(0, 60), (6000, 67), (12000, 60), (18000, 67)]);
    assert_eq!(handle.notes_seen(0), vec![60, 67]);

    let live = handle.live_step(0).unwrap();
    assert_eq!(live.cursor, 0);
}

#[test]
fn new_note_source_clears_seen_notes() {
    let (mut engine, handle) = engine_with(vec![LaneConfig { steps: 1, pulses: 1, ..LaneConfig::default() }]);
    render(&mut engine, [100], HostTransport::playing());
    assert_eq!(handle.notes_seen(0), vec![60]);

    handle.set_note_source(0, &NoteSource::single(72));
    assert!(handle.notes_seen(0).is_empty());
    // A block still holding the old set can land a late insert after the clear
    engine.lanes()[0].shared().seen.insert(60);

    // Numbering restarts per render call: the step at sample 6000 is offset 5900 here
    let events = render(&mut engine, [6000], HostTransport::playing());
    assert_eq!(note_ons(&events), vec![(5900, 72)]);
    assert_eq!(handle.notes_seen(0), vec![72]);
}

#[test]
fn arp_selection_keeps_seen_notes() {
    let (mut engine, handle) = engine_with(vec![LaneConfig { steps: 1, pulses: 1, ..LaneConfig::default() }]);
    render(&mut engine, [100], HostTransport::playing());
    handle.select_arp_notes(0, &[60]);
    render(&mut engine, [100], HostTransport::playing());
    assert_eq!(handle.notes_seen(0), vec![60]);
}

#[test]
fn solo_silences_other_lanes_but_keeps_them_running() {
    let lane = LaneConfig { steps: 1, pulses: 1, note_length: 0.1, ..LaneConfig::default() };
    let (mut engine, handle) = engine_with(vec![lane.clone(), LaneConfig { solo: true, midi_channel: 2, ..lane }]);

    let events = render(&mut engine, [12000], HostTransport::playing());
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.lane == 1));

    handle.set_solo(1, false);
    handle.set_mute(1, true);
    let events = render(&mut engine, [12000], HostTransport::playing());
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.lane == 0));
    // Lane 1 kept its grid while silent
    assert_eq!(engine.lanes()[1].step_counter(), engine.lanes()[0].step_counter());
}

#[test]
fn inactive_lane_resumes_on_the_current_sample() {
    let lane = LaneConfig { steps: 1, pulses: 1, ..LaneConfig::default() };
    let (mut engine, handle) = engine_with(vec![lane.clone(), LaneConfig { active: false, ..lane }]);
    render(&mut engine, [30000], HostTransport::playing());

    handle.set_active(1, true);
    let events = render(&mut engine, [1], HostTransport::playing());
    let lane1: Vec<_> = events.iter().filter(|e| e.lane == 1).collect();
    // One trigger, not a burst of missed steps
    assert_eq!(lane1.len(), 1);
    assert_eq!(engine.lanes()[1].next_step_sample(), 30000 + SPS as i64);
}
