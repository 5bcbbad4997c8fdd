use approx::assert_abs_diff_eq;
use drift::{AudioContext, CarrierLayer, CarrierLayerConfig, IsochronicLayer, IsochronicLayerConfig, SignalOutput};
use rtrb::Consumer;

fn drain(out: &mut Consumer<f32>, left: &mut Vec<f32>, right: &mut Vec<f32>) {
    while let (Ok(l), Ok(r)) = (out.pop(), out.pop()) {
        left.push(l);
        right.push(r);
    }
}

fn zero_crossings(samples: &[f32]) -> usize {
    samples
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count()
}

fn iso_config() -> IsochronicLayerConfig {
    IsochronicLayerConfig {
        frequency: 150.0,
        pulse_rate: 4.0,
        duty_cycle: 0.5,
        volume: 0.4,
    }
}

#[test]
fn carrier_fades_in_over_fifty_milliseconds() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = CarrierLayer::new(&mut ctx, CarrierLayerConfig::binaural(200.0, 10.0, 0.5));
    ctx.connect(layer.output(), ctx.destination());

    layer.start(&mut ctx).unwrap();
    assert!(layer.is_playing());
    assert_eq!(layer.gains_at(0.0), (0.0, 0.0));
    let (l, r) = layer.gains_at(0.025);
    assert_abs_diff_eq!(l, 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(r, 0.25, epsilon = 1e-6);
    assert_eq!(layer.gains_at(0.05), (0.5, 0.5));
}

#[test]
fn carrier_plays_each_frequency_in_its_own_ear() {
    let mut ctx = AudioContext::new(8000);
    let mut out = ctx.take_output().unwrap();
    let mut layer = CarrierLayer::new(&mut ctx, CarrierLayerConfig::binaural(200.0, 10.0, 0.5));
    ctx.connect(layer.output(), ctx.destination());
    layer.start(&mut ctx).unwrap();

    let (mut left, mut right) = (Vec::new(), Vec::new());
    for _ in 0..250 {
        ctx.render_block();
        drain(&mut out, &mut left, &mut right);
    }

    // one second of steady state after the fade
    let left = &left[800..8800];
    let right = &right[800..8800];
    assert!((zero_crossings(left) as i64 - 400).abs() <= 4);
    assert!((zero_crossings(right) as i64 - 420).abs() <= 4);

    let peak = left.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    assert_abs_diff_eq!(peak, 0.5, epsilon = 0.01);
}

#[test]
fn carrier_stop_fades_out_and_cannot_restart() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = CarrierLayer::new(&mut ctx, CarrierLayerConfig::binaural(200.0, 10.0, 0.5));
    ctx.connect(layer.output(), ctx.destination());
    layer.start(&mut ctx).unwrap();
    ctx.render(0.5);

    let now = ctx.current_time();
    layer.stop(&mut ctx);
    assert!(!layer.is_playing());
    assert_eq!(layer.gains_at(now), (0.5, 0.5));
    assert_eq!(layer.gains_at(now + 0.05), (0.0, 0.0));

    // oscillators are one-shot
    layer.start(&mut ctx).unwrap();
    assert!(!layer.is_playing());

    let nodes = ctx.node_count();
    layer.dispose(&mut ctx);
    assert_eq!(ctx.node_count(), nodes - 5);
    assert_eq!(ctx.input_count(ctx.destination()), 0);
}

#[test]
fn carrier_volume_only_applies_while_playing() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = CarrierLayer::new(&mut ctx, CarrierLayerConfig::binaural(200.0, 10.0, 0.5));

    layer.set_volume(&mut ctx, 0.9);
    assert_eq!(layer.config().volume, 0.9);
    assert_eq!(layer.gains_at(1.0), (0.0, 0.0));

    layer.start(&mut ctx).unwrap();
    assert_eq!(layer.gains_at(1.0), (0.9, 0.9));

    ctx.render(0.5);
    layer.set_volume(&mut ctx, 0.3);
    assert_eq!(layer.gains_at(ctx.current_time()), (0.3, 0.3));
}

#[test]
fn isochronic_pulses_follow_duty_cycle() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = IsochronicLayer::new(&mut ctx, iso_config());
    layer.start(&mut ctx).unwrap();

    // ramp towards volume * duty while the oscillator settles
    assert_abs_diff_eq!(layer.gain_at(0.025), 0.1, epsilon = 1e-6);

    // pulses start at 0.05 with a 0.25 s period, on for half of it
    for k in [0usize, 1, 7, 100] {
        let at = 0.05 + k as f64 * 0.25;
        assert_abs_diff_eq!(layer.gain_at(at + 0.01), 0.4);
        assert_abs_diff_eq!(layer.gain_at(at + 0.2), 0.0);
    }
}

#[test]
fn isochronic_schedule_is_rearmed_past_the_first_hour() {
    // a coarse sample rate keeps an hour of rendering cheap
    let mut ctx = AudioContext::new(640);
    let mut layer = IsochronicLayer::new(&mut ctx, iso_config());
    ctx.connect(layer.output(), ctx.destination());
    layer.start(&mut ctx).unwrap();

    let first = layer.scheduled_until().unwrap();
    assert_abs_diff_eq!(first, 3600.05, epsilon = 1e-6);

    while ctx.current_time() < 3545.0 {
        ctx.render(1.0);
        layer.tick(&mut ctx);
    }

    let rearmed = layer.scheduled_until().unwrap();
    assert!(rearmed > first + 3000.0);

    // the pulse train continues seamlessly into the second hour
    let at = 0.05 + 14800.0 * 0.25;
    assert!(at > first);
    assert_abs_diff_eq!(layer.gain_at(at + 0.01), 0.4);
    assert_abs_diff_eq!(layer.gain_at(at + 0.2), 0.0);
}

#[test]
fn isochronic_pulse_rate_is_held_below_nyquist() {
    let mut ctx = AudioContext::new(200);
    let config = IsochronicLayerConfig {
        pulse_rate: 1.0e6,
        ..iso_config()
    };
    let mut layer = IsochronicLayer::new(&mut ctx, config);
    assert_eq!(layer.config().pulse_rate, 100.0);

    layer.start(&mut ctx).unwrap();
    let until = layer.scheduled_until().unwrap();
    assert!((3600.0..3600.1).contains(&until), "scheduled until {until}");
}

#[test]
fn isochronic_volume_change_reschedules_from_now() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = IsochronicLayer::new(&mut ctx, iso_config());
    layer.start(&mut ctx).unwrap();
    ctx.render(1.0);

    let now = ctx.current_time();
    layer.set_volume(&mut ctx, 0.8);
    assert_eq!(layer.config().volume, 0.8);
    assert_abs_diff_eq!(layer.gain_at(now + 0.01), 0.8);
    assert_abs_diff_eq!(layer.gain_at(now + 0.2), 0.0);
    assert_abs_diff_eq!(layer.scheduled_until().unwrap(), now + 3600.0, epsilon = 1e-6);
}

#[test]
fn isochronic_stop_disarms_the_schedule() {
    let mut ctx = AudioContext::new(8000);
    let mut layer = IsochronicLayer::new(&mut ctx, iso_config());
    ctx.connect(layer.output(), ctx.destination());
    layer.start(&mut ctx).unwrap();
    ctx.render(0.3);

    let now = ctx.current_time();
    layer.stop(&mut ctx);
    assert!(layer.scheduled_until().is_none());
    assert_eq!(layer.gain_at(now + 0.05), 0.0);
    assert_eq!(layer.gain_at(now + 10.0), 0.0);

    layer.dispose(&mut ctx);
    assert_eq!(ctx.node_count(), 1);
}
