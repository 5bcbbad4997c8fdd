use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_graph::Buffer;
use drift::catalog::recipes;
use drift::nodes::{Gain, Oscillator};
use drift::param::ParamEvent;
use drift::{AudioContext, AudioEngine, AudioNode, EngineConfig, FrequencySignalGenerator, ProcessContext, SignalOutput, SoundCatalog};

fn process_context(frame: u64) -> ProcessContext {
    ProcessContext {
        sample_rate: 48000,
        buffer_size: Buffer::LEN,
        frame,
    }
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Oscillator.process()", |b| {
        let mut osc = Oscillator::new(440.0);
        let mut output = [Buffer::default()];
        let mut frame = 0;
        osc.process(&process_context(0), [drift::nodes::OscillatorMessage::Start(0.0)].into_iter(), &[], &mut output);

        b.iter(|| {
            frame += Buffer::LEN as u64;
            osc.process(&process_context(frame), std::iter::empty(), &[], &mut output);
            black_box(&output);
        })
    });

    c.bench_function("Gain.process() with dense automation", |b| {
        let mut gain = Gain::new(0.0);
        let mut output = [Buffer::default(), Buffer::default()];
        let pulses: Vec<ParamEvent> = (0..36_000)
            .flat_map(|k| {
                let at = k as f64 * 0.1;
                [
                    ParamEvent::SetValue { value: 0.5, time: at },
                    ParamEvent::SetValue { value: 0.0, time: at + 0.05 },
                ]
            })
            .collect();
        let schedule = drift::nodes::GainMessage::Automate(drift::ParamOp::Schedule(pulses));
        gain.process(&process_context(0), [schedule].into_iter(), &[], &mut output);
        let mut frame = 0;

        b.iter(|| {
            frame += Buffer::LEN as u64;
            gain.process(&process_context(frame), std::iter::empty(), &[], &mut output);
            black_box(&output);
        })
    });

    c.bench_function("deep-sleep generator block", |b| {
        let mut ctx = AudioContext::new(48000);
        let mut generator = FrequencySignalGenerator::new(&mut ctx);
        generator.initialize(&mut ctx, recipes::deep_sleep());
        ctx.connect(generator.output(), ctx.destination());
        let _ = generator.start(&mut ctx);
        let mut output = ctx.take_output();

        b.iter(|| {
            ctx.render_block();
            if let Some(out) = output.as_mut() {
                while out.pop().is_ok() {}
            }
        })
    });

    c.bench_function("engine block with three sounds", |b| {
        let mut engine = AudioEngine::new(EngineConfig::default().with_seed(1));
        let catalog = SoundCatalog::builtin();
        for id in ["deep-sleep", "white-noise", "cosmic-ambience"] {
            if let Some(sound) = catalog.get(id) {
                let _ = engine.play_sound(sound, 0.5);
            }
        }
        let mut output = engine.take_output();

        b.iter(|| {
            engine.process_block();
            if let Some(out) = output.as_mut() {
                while out.pop().is_ok() {}
            }
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
