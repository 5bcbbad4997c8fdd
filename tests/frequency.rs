use drift::catalog::recipes;
use drift::{AudioContext, EngineError, FrequencySignalGenerator, SignalOutput};

#[test]
fn start_requires_initialize() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    assert!(!generator.is_initialized());
    assert!(matches!(generator.start(&mut ctx), Err(EngineError::InvalidState { .. })));
}

#[test]
fn initialize_builds_layers_in_config_order() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    let config = recipes::deep_sleep();
    generator.initialize(&mut ctx, config.clone());

    assert_eq!(generator.carrier_layers().len(), 5);
    assert_eq!(generator.isochronic_layers().len(), 2);
    for (layer, expected) in generator.carrier_layers().iter().zip(&config.carrier_layers) {
        assert_eq!(layer.config(), expected);
    }
    assert_eq!(ctx.input_count(generator.output()), 7);
}

#[test]
fn reinitialize_replaces_every_layer() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    generator.initialize(&mut ctx, recipes::deep_sleep());
    generator.initialize(&mut ctx, recipes::theta_subtle());

    assert_eq!(generator.carrier_layers().len(), 2);
    assert_eq!(generator.isochronic_layers().len(), 1);
    assert_eq!(ctx.input_count(generator.output()), 3);
    // master + 2 carriers (5 nodes each) + isochronic (2 nodes) + destination
    assert_eq!(ctx.node_count(), 14);
}

#[test]
fn layer_volumes_follow_index_and_ignore_out_of_range() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    let original = recipes::deep_sleep();
    generator.initialize(&mut ctx, original.clone());
    generator.start(&mut ctx).unwrap();
    ctx.render(0.2);

    generator.set_carrier_layer_volume(&mut ctx, 1, 0.2);
    generator.set_isochronic_layer_volume(&mut ctx, 0, 0.05);
    generator.set_carrier_layer_volume(&mut ctx, 42, 1.0);
    generator.set_isochronic_layer_volume(&mut ctx, 42, 1.0);

    let now = ctx.current_time();
    assert_eq!(generator.carrier_layers()[1].gains_at(now), (0.2, 0.2));
    assert_eq!(generator.carrier_layers()[0].gains_at(now), (0.85, 0.85));
    let live = generator.config().unwrap();
    assert_eq!(live.carrier_layers[1].volume, 0.2);
    assert_eq!(live.isochronic_layers[0].volume, 0.05);
    assert_eq!(live.carrier_layers.len(), 5);

    generator.reset_to_defaults(&mut ctx, &original);
    assert_eq!(generator.config(), Some(&original));
    assert_eq!(generator.carrier_layers()[1].gains_at(now), (0.70, 0.70));
}

#[test]
fn stop_fades_every_layer_and_dispose_clears_the_graph() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    generator.initialize(&mut ctx, recipes::alpha_relax());
    ctx.connect(generator.output(), ctx.destination());
    generator.start(&mut ctx).unwrap();
    assert!(generator.is_playing());
    ctx.render(0.5);

    let now = ctx.current_time();
    generator.stop(&mut ctx);
    assert!(!generator.is_playing());
    for layer in generator.carrier_layers() {
        assert_eq!(layer.gains_at(now + 0.05), (0.0, 0.0));
    }
    for layer in generator.isochronic_layers() {
        assert_eq!(layer.gain_at(now + 0.05), 0.0);
    }

    generator.dispose(&mut ctx);
    assert!(!generator.is_initialized());
    assert_eq!(ctx.node_count(), 1);
    assert_eq!(ctx.input_count(ctx.destination()), 0);
}

#[test]
fn master_volume_scales_all_layers() {
    let mut ctx = AudioContext::new(8000);
    let mut generator = FrequencySignalGenerator::new(&mut ctx);
    generator.initialize(&mut ctx, recipes::schumann());
    generator.start(&mut ctx).unwrap();

    let mut out = ctx.take_output().unwrap();
    ctx.connect(generator.output(), ctx.destination());
    generator.set_volume(&mut ctx, 0.0);
    ctx.render(0.5);

    while let Ok(sample) = out.pop() {
        assert_eq!(sample, 0.0);
    }
}
