use std::sync::Arc;

use approx::assert_abs_diff_eq;
use drift::nodes::{AudioBuffer, ChannelRoute};
use drift::{AudioContext, ContextState, EngineConfig, EngineError};
use rtrb::Consumer;

const RATE: u32 = 8000;

/// Render `secs` block by block, draining the output as it goes.
fn render_collect(ctx: &mut AudioContext, out: &mut Consumer<f32>, secs: f64) -> (Vec<f32>, Vec<f32>) {
    let blocks = (secs * RATE as f64 / 64.0).ceil() as usize;
    let (mut left, mut right) = (Vec::new(), Vec::new());
    for _ in 0..blocks {
        ctx.render_block();
        while let (Ok(l), Ok(r)) = (out.pop(), out.pop()) {
            left.push(l);
            right.push(r);
        }
    }
    (left, right)
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

#[test]
fn clock_advances_one_block_at_a_time() {
    let mut ctx = AudioContext::new(RATE);
    assert_eq!(ctx.current_time(), 0.0);

    assert!(ctx.render_block());
    assert_abs_diff_eq!(ctx.current_time(), 64.0 / RATE as f64);

    let blocks = ctx.render(1.0);
    assert_eq!(blocks, 125);
    assert_abs_diff_eq!(ctx.current_time(), 1.0 + 64.0 / RATE as f64, epsilon = 1e-9);
}

#[test]
fn suspended_context_does_not_render() {
    let config = EngineConfig::default().with_sample_rate(RATE).suspended();
    let mut ctx = AudioContext::from_config(&config).unwrap();
    assert_eq!(ctx.state(), ContextState::Suspended);

    assert!(!ctx.render_block());
    assert_eq!(ctx.render(1.0), 0);
    assert_eq!(ctx.current_time(), 0.0);

    ctx.resume().unwrap();
    assert!(ctx.render_block());
    assert_eq!(ctx.take_state_changes(), vec![ContextState::Running]);
}

#[test]
fn closed_context_cannot_resume() {
    let mut ctx = AudioContext::new(RATE);
    ctx.close();
    assert!(matches!(ctx.resume(), Err(EngineError::ContextClosed)));
    assert!(!ctx.render_block());
}

#[test]
fn invalid_config_is_rejected() {
    let config = EngineConfig::default().with_sample_rate(0);
    assert!(matches!(AudioContext::from_config(&config), Err(EngineError::Config(_))));
}

#[test]
fn oscillator_through_gain_reaches_output() {
    let mut ctx = AudioContext::new(RATE);
    let mut out = ctx.take_output().unwrap();
    assert!(ctx.take_output().is_none());

    let mut osc = ctx.create_oscillator(200.0);
    let gain = ctx.create_gain(0.5);
    ctx.connect(osc.id(), gain.id());
    ctx.connect(gain.id(), ctx.destination());
    osc.start(0.0);

    let (left, right) = render_collect(&mut ctx, &mut out, 0.5);
    assert_eq!(left.len(), 4032);
    assert_abs_diff_eq!(peak(&left), 0.5, epsilon = 0.01);
    assert_eq!(left, right);
}

#[test]
fn oscillator_is_silent_before_start_and_after_stop() {
    let mut ctx = AudioContext::new(RATE);
    let mut out = ctx.take_output().unwrap();

    let mut osc = ctx.create_oscillator(200.0);
    ctx.connect(osc.id(), ctx.destination());
    osc.start(0.25);
    osc.stop(0.5);

    let (left, _) = render_collect(&mut ctx, &mut out, 1.0);
    assert_eq!(peak(&left[..1990]), 0.0);
    assert!(peak(&left[2000..3990]) > 0.9);
    assert_eq!(peak(&left[4000..]), 0.0);
}

#[test]
fn routed_gains_split_the_stereo_field() {
    let mut ctx = AudioContext::new(RATE);
    let mut out = ctx.take_output().unwrap();

    let mut osc = ctx.create_oscillator(100.0);
    let left = ctx.create_routed_gain(0.8, ChannelRoute::Left);
    let merger = ctx.create_merger();
    ctx.connect(osc.id(), left.id());
    ctx.connect(left.id(), merger.id());
    ctx.connect(merger.id(), ctx.destination());
    osc.start(0.0);

    let (l, r) = render_collect(&mut ctx, &mut out, 0.25);
    assert_abs_diff_eq!(peak(&l), 0.8, epsilon = 0.01);
    assert_eq!(peak(&r), 0.0);
}

#[test]
fn gain_ramp_is_sample_accurate() {
    let mut ctx = AudioContext::new(RATE);
    let mut out = ctx.take_output().unwrap();

    let buffer = Arc::new(AudioBuffer::from_mono(RATE, vec![1.0; 64]));
    let mut source = ctx.create_buffer_source(buffer, true);
    let mut gain = ctx.create_gain(0.0);
    gain.set_value_at_time(0.0, 0.0);
    gain.linear_ramp_to_value_at_time(1.0, 1.0);
    ctx.connect(source.id(), gain.id());
    ctx.connect(gain.id(), ctx.destination());
    source.start(0.0).unwrap();

    let (left, _) = render_collect(&mut ctx, &mut out, 1.0);
    assert_abs_diff_eq!(left[0], 0.0);
    assert_abs_diff_eq!(left[2000], 0.25, epsilon = 1e-4);
    assert_abs_diff_eq!(left[6000], 0.75, epsilon = 1e-4);
    assert_abs_diff_eq!(gain.value_at(0.5), 0.5, epsilon = 1e-6);
}

#[test]
fn one_shot_buffer_source_ends() {
    let mut ctx = AudioContext::new(RATE);
    let mut out = ctx.take_output().unwrap();

    let buffer = Arc::new(AudioBuffer::from_mono(RATE, vec![0.5; 100]));
    let mut source = ctx.create_buffer_source(buffer, false);
    ctx.connect(source.id(), ctx.destination());
    source.start(0.0).unwrap();

    let (left, _) = render_collect(&mut ctx, &mut out, 0.1);
    assert!(source.has_ended());
    assert_eq!(left[99], 0.5);
    assert_eq!(left[100], 0.0);

    assert!(source.stop(0.2).is_err());
}

#[test]
fn buffer_source_start_and_stop_are_one_shot() {
    let mut ctx = AudioContext::new(RATE);
    let buffer = Arc::new(AudioBuffer::from_mono(RATE, vec![0.5; 100]));
    let mut source = ctx.create_buffer_source(buffer, true);

    let err = source.stop(0.0).unwrap_err();
    assert!(err.is_teardown_race());

    source.start(0.0).unwrap();
    let err = source.start(0.0).unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
    assert!(!err.is_teardown_race());
    source.stop(0.05).unwrap();
    assert!(matches!(source.stop(0.1), Err(EngineError::NotPlaying)));

    ctx.connect(source.id(), ctx.destination());
    ctx.render(0.1);
    assert!(source.has_ended());
}

#[test]
fn disconnect_and_remove_are_idempotent() {
    let mut ctx = AudioContext::new(RATE);
    let osc = ctx.create_oscillator(100.0);
    let gain = ctx.create_gain(1.0);
    ctx.connect(osc.id(), gain.id());
    ctx.connect(gain.id(), ctx.destination());
    assert_eq!(ctx.input_count(ctx.destination()), 1);
    assert_eq!(ctx.node_count(), 3);

    ctx.disconnect(gain.id());
    ctx.disconnect(gain.id());
    assert_eq!(ctx.input_count(ctx.destination()), 0);
    assert_eq!(ctx.input_count(gain.id()), 1);

    ctx.remove(osc.id());
    ctx.remove(osc.id());
    assert!(!ctx.contains(osc.id()));
    assert_eq!(ctx.input_count(gain.id()), 0);

    // connecting a removed node is ignored
    ctx.connect(osc.id(), gain.id());
    assert_eq!(ctx.input_count(gain.id()), 0);

    ctx.remove(ctx.destination());
    assert!(ctx.contains(ctx.destination()));
}
