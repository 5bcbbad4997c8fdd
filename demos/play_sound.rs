//! Play a sound from the built-in catalog on the default output device
//!
//! Run with: cargo run --example play_sound --features cpal_sink -- white-noise 0.7 30
//!
//! Arguments are a sound id, a volume and a duration in seconds. File sounds
//! are looked up under `./public`. Set `RUST_LOG=drift=debug` to watch the
//! engine work.

use std::thread::sleep;
use std::time::{Duration, Instant};

use drift::nodes::CpalOutput;
use drift::{AudioEngine, EngineConfig, EngineEvent, SoundCatalog};
use tracing_subscriber::EnvFilter;

/// Frames rendered ahead of the device
const FRAMES_AHEAD: u64 = 2048;

fn main() -> drift::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let id = args.next().unwrap_or_else(|| "deep-sleep".into());
    let volume: f32 = args.next().and_then(|v| v.parse().ok()).unwrap_or(0.7);
    let secs: f64 = args.next().and_then(|v| v.parse().ok()).unwrap_or(30.0);

    let catalog = SoundCatalog::builtin();
    let Some(sound) = catalog.get(&id) else {
        eprintln!("Unknown sound '{id}'. Available sounds:");
        for category in catalog.categories() {
            eprintln!("  {category}");
            for sound in catalog.by_category(category) {
                eprintln!("    {:<18} {}", sound.id, sound.name);
            }
        }
        return Ok(());
    };

    let sample_rate = CpalOutput::default_sample_rate().unwrap_or(48_000);
    let config = EngineConfig::default()
        .with_sample_rate(sample_rate)
        .with_asset_root("public");

    let mut engine = AudioEngine::new(config);
    engine.initialize()?;
    let events = engine.events();
    let consumer = engine.take_output().expect("fresh engine has an output");
    let output = CpalOutput::open_default(consumer)?;

    println!("Using: {} @ {}Hz", output.name(), output.sample_rate());
    println!("Playing '{}' at volume {volume} for {secs}s", sound.name);

    engine.play_sound(sound, volume)?;
    if !engine.wait_for_loads(Duration::from_secs(10)) {
        eprintln!("Still loading after 10s, playing whatever is ready");
    }

    let mut frames_rendered = 0u64;
    let start = Instant::now();
    let mut stopping = false;

    loop {
        let elapsed = start.elapsed().as_secs_f64();
        if !stopping && elapsed >= secs {
            println!("Fading out...");
            engine.stop_sound(&id);
            stopping = true;
        }
        if elapsed >= secs + 1.0 {
            break;
        }

        let frames_played = (elapsed * sample_rate as f64) as u64;
        if frames_rendered < frames_played + FRAMES_AHEAD {
            engine.process_block();
            frames_rendered += 64;
        } else {
            sleep(Duration::from_micros(500));
        }

        for event in events.try_iter() {
            match event {
                EngineEvent::LoadFailed { id, reason } => eprintln!("Could not load '{id}': {reason}"),
                other => println!("{other:?}"),
            }
        }

        if output.check_underrun() {
            eprintln!("Output underrun");
        }
    }

    engine.dispose();
    Ok(())
}
