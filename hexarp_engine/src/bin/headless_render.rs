use hexarp_engine::Engine;
use hexarp_shared::{EngineConfig, HostTransport, MidiEventKind};

const DEFAULT_BLOCKS: usize = 64;
const DEFAULT_BLOCK_SIZE: usize = 512;

// Usage: headless_render [config.json] [blocks] [block_size]
fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => EngineConfig::load(path)?,
        None => {
            log::info!("[Headless] No config given, using defaults");
            EngineConfig::default()
        }
    };
    let blocks = match args.get(1) {
        Some(n) => n.parse()?,
        None => DEFAULT_BLOCKS,
    };
    let block_size = match args.get(2) {
        Some(n) => n.parse()?,
        None => DEFAULT_BLOCK_SIZE,
    };

    let (mut engine, handle) = Engine::new(&config);
    handle.play();

    println!("[Headless] Rendering {} blocks of {} samples at {} Hz", blocks, block_size, config.sample_rate);

    let transport = HostTransport::stopped();
    let mut events = Vec::with_capacity(256);
    let mut total = 0usize;
    for block in 0..blocks {
        events.clear();
        engine.process_block(block_size, &transport, &[], &mut events);
        for event in &events {
            let at = (block * block_size) as u64 + event.sample_offset as u64;
            let port = event.port.map_or_else(|| "-".to_string(), |p| p.to_string());
            match event.kind {
                MidiEventKind::NoteOn { pitch, velocity } => println!(
                    "{:>10} lane {} port {} ch {:>2} ON  {:>3} vel {}",
                    at, event.lane, port, event.channel, pitch, velocity
                ),
                MidiEventKind::NoteOff { pitch } => println!(
                    "{:>10} lane {} port {} ch {:>2} OFF {:>3}",
                    at, event.lane, port, event.channel, pitch
                ),
            }
        }
        total += events.len();
    }

    events.clear();
    engine.stop(&mut events);
    total += events.len();

    println!("[Headless] Done. {} events ({} flushed on stop)", total, events.len());
    Ok(())
}
