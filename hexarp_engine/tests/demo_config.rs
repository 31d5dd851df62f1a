use hexarp_engine::Engine;
use hexarp_shared::{EngineConfig, HostTransport};

#[test]
fn demo_config_renders() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/lanes.json");
    let config = EngineConfig::load(path).expect("demo config should parse");
    assert_eq!(config.lanes.len(), 6);
    assert!(!config.lane(5).active);

    let (mut engine, handle) = Engine::new(&config);
    assert_eq!(handle.selected_notes(3), vec![60, 63, 67, 70]);

    let mut events = Vec::new();
    for _ in 0..200 {
        engine.process_block(480, &HostTransport::playing(), &[], &mut events);
    }
    engine.stop(&mut events);

    println!("[Test] demo rendered {} events", events.len());
    assert!(events.iter().all(|e| e.lane < 5));
    let ons = events.iter().filter(|e| e.is_note_on()).count();
    assert_eq!(ons, events.len() - ons);
}
