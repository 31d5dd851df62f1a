use std::thread;
use std::time::Duration;

use hexarp_engine::StandaloneRunner;
use hexarp_shared::EngineConfig;

// Usage: hexarp_standalone [config.json] [seconds]
fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match args.first() {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let seconds: u64 = match args.get(1) {
        Some(s) => s.parse()?,
        None => 5,
    };

    let runner = StandaloneRunner::start(&config, |timed| {
        let [status, data1, data2] = timed.event.to_bytes();
        println!("{:>10} lane {} {:02X} {:02X} {:02X}", timed.frame, timed.event.lane, status, data1, data2);
    })?;

    println!("[Standalone] Playing for {} seconds...", seconds);
    runner.handle().play();
    thread::sleep(Duration::from_secs(seconds));

    runner.stop();
    println!("[Standalone] Done.");
    Ok(())
}
