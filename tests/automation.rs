use approx::assert_abs_diff_eq;
use drift::{Automation, ParamEvent, ParamOp};

#[test]
fn default_holds_until_first_event() {
    let mut a = Automation::new(0.3);
    assert_abs_diff_eq!(a.value_at(0.0), 0.3);

    a.set_value_at_time(0.8, 1.0);
    assert_abs_diff_eq!(a.value_at(0.99), 0.3);
    assert_abs_diff_eq!(a.value_at(1.0), 0.8);
    assert_abs_diff_eq!(a.value_at(50.0), 0.8);
}

#[test]
fn linear_ramp_interpolates_from_previous_event() {
    let mut a = Automation::new(0.0);
    a.set_value_at_time(0.0, 1.0);
    a.linear_ramp_to_value_at_time(1.0, 3.0);

    assert_abs_diff_eq!(a.value_at(1.0), 0.0);
    assert_abs_diff_eq!(a.value_at(2.0), 0.5, epsilon = 1e-6);
    assert_abs_diff_eq!(a.value_at(2.5), 0.75, epsilon = 1e-6);
    assert_abs_diff_eq!(a.value_at(3.0), 1.0);
    assert_abs_diff_eq!(a.value_at(10.0), 1.0);
}

#[test]
fn ramp_without_anchor_starts_from_default_at_zero() {
    let mut a = Automation::new(1.0);
    a.linear_ramp_to_value_at_time(0.0, 2.0);
    assert_abs_diff_eq!(a.value_at(1.0), 0.5, epsilon = 1e-6);
}

#[test]
fn out_of_order_events_are_sorted() {
    let mut a = Automation::new(0.0);
    a.set_value_at_time(0.5, 2.0);
    a.set_value_at_time(0.25, 1.0);

    let times: Vec<f64> = a.events().map(ParamEvent::time).collect();
    assert_eq!(times, vec![1.0, 2.0]);
    assert_abs_diff_eq!(a.value_at(1.5), 0.25);
}

#[test]
fn cancel_scheduled_values_drops_later_events() {
    let mut a = Automation::new(0.0);
    a.set_value_at_time(1.0, 1.0);
    a.set_value_at_time(2.0, 2.0);
    a.set_value_at_time(3.0, 3.0);

    a.cancel_scheduled_values(2.0);
    assert_eq!(a.len(), 1);
    assert_abs_diff_eq!(a.value_at(5.0), 1.0);
}

#[test]
fn cancel_and_hold_freezes_a_ramp_in_flight() {
    let mut a = Automation::new(0.0);
    a.set_value_at_time(0.0, 0.0);
    a.linear_ramp_to_value_at_time(1.0, 4.0);

    let held = a.cancel_and_hold(1.0);
    assert_abs_diff_eq!(held, 0.25, epsilon = 1e-6);
    assert_abs_diff_eq!(a.value_at(0.5), 0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(a.value_at(3.0), 0.25, epsilon = 1e-6);

    a.linear_ramp_to_value_at_time(0.0, 2.0);
    assert_abs_diff_eq!(a.value_at(1.5), 0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(a.value_at(2.0), 0.0);
}

#[test]
fn render_matches_value_at() {
    let mut a = Automation::new(0.0);
    a.apply(ParamOp::Schedule(vec![
        ParamEvent::SetValue { value: 0.2, time: 0.0 },
        ParamEvent::LinearRamp { value: 1.0, end_time: 0.01 },
        ParamEvent::SetValue { value: 0.0, time: 0.02 },
    ]));

    let step = 1.0 / 1000.0;
    let mut out = [0.0f32; 32];
    a.render(0.0, step, &mut out);

    for (i, v) in out.iter().enumerate() {
        assert_abs_diff_eq!(*v, a.value_at(i as f64 * step), epsilon = 1e-6);
    }
}

#[test]
fn prune_keeps_the_current_value() {
    let mut a = Automation::new(0.0);
    for k in 0..10 {
        a.set_value_at_time(k as f32, k as f64);
    }
    a.linear_ramp_to_value_at_time(20.0, 20.0);

    a.prune(5.5);
    assert_eq!(a.len(), 6);
    assert_abs_diff_eq!(a.value_at(5.5), 5.0);
    assert_abs_diff_eq!(a.value_at(14.5), 14.5, epsilon = 1e-4);
}
