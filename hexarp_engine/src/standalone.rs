use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hexarp_shared::{EngineConfig, HostTransport, MidiEvent};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::engine::Engine;
use crate::handle::EngineHandle;

const EVENT_QUEUE_CAPACITY: usize = 4096;
const BLOCK_SIZE: u32 = 512;
/// Longest `stop` waits for the stream to flush and the sink to catch up.
const STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// An engine event with its absolute frame position on the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub frame: u64,
    pub event: MidiEvent,
}

/// Event counts shared by the stream callback and the forwarding thread.
#[derive(Debug, Default)]
struct EventCounters {
    pushed: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

/// Stream-callback side: renders blocks and pushes stamped events.
struct BlockRenderer {
    engine: Engine,
    producer: HeapProd<TimedEvent>,
    events: Vec<MidiEvent>,
    frame: u64,
    counters: Arc<EventCounters>,
}

impl BlockRenderer {
    fn new(engine: Engine, producer: HeapProd<TimedEvent>, counters: Arc<EventCounters>) -> Self {
        Self {
            engine,
            producer,
            events: Vec::with_capacity(EVENT_QUEUE_CAPACITY),
            frame: 0,
            counters,
        }
    }

    fn render(&mut self, frames: usize) {
        self.events.clear();
        self.engine.process_block(frames, &HostTransport::stopped(), &[], &mut self.events);
        for event in self.events.drain(..) {
            let timed = TimedEvent { frame: self.frame + event.sample_offset as u64, event };
            if self.producer.try_push(timed).is_ok() {
                self.counters.pushed.fetch_add(1, Ordering::Release);
            } else {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.frame += frames as u64;
    }
}

fn spawn_forwarder<F>(
    mut consumer: HeapCons<TimedEvent>,
    mut sink: F,
    running: Arc<AtomicBool>,
    counters: Arc<EventCounters>,
) -> std::io::Result<JoinHandle<()>>
where
    F: FnMut(TimedEvent) + Send + 'static,
{
    thread::Builder::new().name("hexarp-forward".into()).spawn(move || {
        let mut drain = |consumer: &mut HeapCons<TimedEvent>| {
            while let Some(timed) = consumer.try_pop() {
                sink(timed);
                counters.forwarded.fetch_add(1, Ordering::Release);
            }
        };
        while running.load(Ordering::Acquire) {
            drain(&mut consumer);
            thread::sleep(Duration::from_millis(1));
        }
        drain(&mut consumer);
    })
}

/// Ask the engine to stop, then wait until the stop has been rendered and
/// every event it flushed has reached the sink. False on timeout.
fn stop_and_drain(handle: &EngineHandle, counters: &EventCounters, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    handle.stop();
    while handle.is_playing() {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    let target = counters.pushed.load(Ordering::Acquire);
    while counters.forwarded.load(Ordering::Acquire) < target {
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(1));
    }
    true
}

/// Runs an engine without a plugin host: a cpal output stream provides the
/// sample clock, and events are handed to `sink` on a separate thread.
pub struct StandaloneRunner {
    _stream: cpal::Stream,
    handle: EngineHandle,
    running: Arc<AtomicBool>,
    counters: Arc<EventCounters>,
    forwarder: Option<JoinHandle<()>>,
    pub sample_rate: u32,
}

impl StandaloneRunner {
    pub fn start<F>(config: &EngineConfig, sink: F) -> Result<Self, anyhow::Error>
    where
        F: FnMut(TimedEvent) + Send + 'static,
    {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(anyhow::anyhow!("No output device available"))?;
        let supported = device.default_output_config()?;

        let sample_rate = supported.sample_rate();
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();

        let mut stream_config: cpal::StreamConfig = supported.into();
        stream_config.buffer_size = cpal::BufferSize::Fixed(BLOCK_SIZE);
        log::info!("[Standalone] Using Config: {:?}", stream_config);

        let mut engine_config = config.clone();
        engine_config.sample_rate = sample_rate as f64;
        engine_config.standalone = true;
        let (engine, handle) = Engine::new(&engine_config);

        let (producer, consumer) = HeapRb::<TimedEvent>::new(EVENT_QUEUE_CAPACITY).split();
        let counters = Arc::new(EventCounters::default());
        let mut renderer = BlockRenderer::new(engine, producer, counters.clone());

        let err_fn = |err: cpal::StreamError| {
            let s = err.to_string();
            if !s.contains("underrun") && !s.contains("overrun") {
                log::error!("[Standalone] Stream error: {}", s);
            }
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // MIDI only, the audio itself stays silent
                    data.fill(0.0);
                    renderer.render(data.len() / channels.max(1));
                },
                err_fn,
                None,
            )?,
            _ => return Err(anyhow::anyhow!("Unsupported sample format")),
        };

        stream.play()?;

        let running = Arc::new(AtomicBool::new(true));
        let forwarder = spawn_forwarder(consumer, sink, running.clone(), counters.clone())?;

        log::info!("[Standalone] Running at {} Hz, {} channels", sample_rate, channels);

        Ok(Self {
            _stream: stream,
            handle,
            running,
            counters,
            forwarder: Some(forwarder),
            sample_rate,
        })
    }

    pub fn handle(&self) -> &EngineHandle {
        &self.handle
    }

    /// Stop the transport and return once every held note has been released
    /// through the sink. Safe to call more than once.
    pub fn stop(&self) {
        if !stop_and_drain(&self.handle, &self.counters, STOP_TIMEOUT) {
            log::warn!("[Standalone] Stream did not flush within {:?}", STOP_TIMEOUT);
        }
    }

    /// Events lost because the forwarding thread fell behind.
    pub fn dropped_events(&self) -> u64 {
        self.counters.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for StandaloneRunner {
    fn drop(&mut self) {
        self.stop();
        self.running.store(false, Ordering::Release);
        if let Some(forwarder) = self.forwarder.take() {
            if forwarder.join().is_err() {
                log::warn!("[Standalone] Forwarding thread panicked");
            }
        }
        let dropped = self.dropped_events();
        if dropped > 0 {
            log::warn!("[Standalone] {} events dropped", dropped);
        }
    }
}
