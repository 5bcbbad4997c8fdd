//! Parameter automation on the audio clock.
//!
//! An [`Automation`] is a time-ordered list of [`ParamEvent`]s, evaluated the
//! way Web Audio evaluates an `AudioParam`: a `SetValue` holds its value from
//! its time onward, and a `LinearRamp` interpolates from the previous event's
//! value and time to its own value at its end time.
//!
//! Nodes own one `Automation` per automatable parameter and receive edits as
//! [`ParamOp`] messages. The control side keeps an identical copy in an
//! [`AudioParam`] so it can read "current value" without touching the render
//! thread.

use std::collections::VecDeque;

use tracing::warn;

use crate::context::Handle;

/// A single point on a parameter timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamEvent {
    /// Jump to `value` at `time`
    SetValue { value: f32, time: f64 },
    /// Linearly approach `value`, arriving at `end_time`
    LinearRamp { value: f32, end_time: f64 },
}

impl ParamEvent {
    #[inline]
    pub fn time(&self) -> f64 {
        match *self {
            ParamEvent::SetValue { time, .. } => time,
            ParamEvent::LinearRamp { end_time, .. } => end_time,
        }
    }

    #[inline]
    pub fn value(&self) -> f32 {
        match *self {
            ParamEvent::SetValue { value, .. } | ParamEvent::LinearRamp { value, .. } => value,
        }
    }
}

/// An edit to a parameter timeline.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamOp {
    SetValueAtTime { value: f32, time: f64 },
    LinearRampToValueAtTime { value: f32, end_time: f64 },
    /// Drop every event at or after `time`
    CancelScheduledValues { time: f64 },
    /// Freeze the value the timeline has at `time`, truncating any ramp in flight
    CancelAndHold { time: f64 },
    /// Insert a batch of pre-computed events
    Schedule(Vec<ParamEvent>),
}

/// A parameter timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Automation {
    default: f32,
    events: VecDeque<ParamEvent>,
}

impl Automation {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            events: VecDeque::new(),
        }
    }

    /// Value before the first event
    pub fn default_value(&self) -> f32 {
        self.default
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &ParamEvent> {
        self.events.iter()
    }

    /// Time of the last scheduled event, if any
    pub fn last_event_time(&self) -> Option<f64> {
        self.events.back().map(ParamEvent::time)
    }

    pub fn apply(&mut self, op: ParamOp) {
        match op {
            ParamOp::SetValueAtTime { value, time } => self.set_value_at_time(value, time),
            ParamOp::LinearRampToValueAtTime { value, end_time } => {
                self.linear_ramp_to_value_at_time(value, end_time)
            }
            ParamOp::CancelScheduledValues { time } => self.cancel_scheduled_values(time),
            ParamOp::CancelAndHold { time } => {
                self.cancel_and_hold(time);
            }
            ParamOp::Schedule(events) => self.extend(events),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent::SetValue { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(ParamEvent::LinearRamp { value, end_time });
    }

    pub fn cancel_scheduled_values(&mut self, time: f64) {
        let keep = self.events.partition_point(|e| e.time() < time);
        self.events.truncate(keep);
    }

    /// Returns the held value.
    pub fn cancel_and_hold(&mut self, time: f64) -> f32 {
        let held = self.value_at(time);
        let keep = self.events.partition_point(|e| e.time() <= time);
        let truncated_ramp = matches!(self.events.get(keep), Some(ParamEvent::LinearRamp { .. }));
        self.events.truncate(keep);

        if truncated_ramp {
            self.events.push_back(ParamEvent::LinearRamp { value: held, end_time: time });
        } else {
            self.events.push_back(ParamEvent::SetValue { value: held, time });
        }
        held
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = ParamEvent>) {
        for event in events {
            self.insert(event);
        }
    }

    // Events at equal times keep insertion order
    fn insert(&mut self, event: ParamEvent) {
        let time = event.time();
        match self.events.back() {
            Some(last) if last.time() > time => {
                let at = self.events.partition_point(|e| e.time() <= time);
                self.events.insert(at, event);
            }
            _ => self.events.push_back(event),
        }
    }

    /// Value of the timeline at `time`.
    pub fn value_at(&self, time: f64) -> f32 {
        let next = self.events.partition_point(|e| e.time() <= time);
        self.value_with_next(next, time)
    }

    #[inline]
    fn value_with_next(&self, next: usize, time: f64) -> f32 {
        let previous = next.checked_sub(1).map(|i| self.events[i]);

        if let Some(ParamEvent::LinearRamp { value, end_time }) = self.events.get(next) {
            let (start_time, start_value) = previous
                .map(|p| (p.time(), p.value()))
                .unwrap_or((0.0, self.default));
            let span = end_time - start_time;
            if span <= 0.0 {
                return *value;
            }
            let progress = ((time - start_time) / span).clamp(0.0, 1.0) as f32;
            return start_value + (value - start_value) * progress;
        }

        previous.map(|p| p.value()).unwrap_or(self.default)
    }

    /// Fill `out` with values sampled at `start`, `start + step`, ...
    pub fn render(&self, start: f64, step: f64, out: &mut [f32]) {
        if self.events.is_empty() {
            out.iter_mut().for_each(|v| *v = self.default);
            return;
        }

        let mut next = self.events.partition_point(|e| e.time() <= start);
        for (i, slot) in out.iter_mut().enumerate() {
            let time = start + i as f64 * step;
            while next < self.events.len() && self.events[next].time() <= time {
                next += 1;
            }
            *slot = self.value_with_next(next, time);
        }
    }

    /// Forget events that can no longer affect values at or after `time`.
    pub fn prune(&mut self, time: f64) {
        while self.events.len() >= 2 && self.events[1].time() <= time {
            self.events.pop_front();
        }
    }
}

/// Control-side view of a node parameter.
///
/// Every op is applied to a local shadow timeline and forwarded to the node,
/// so both sides evaluate the same automation.
pub struct AudioParam<M: Send + 'static> {
    shadow: Automation,
    wrap: fn(ParamOp) -> M,
}

impl<M: Send + 'static> AudioParam<M> {
    pub fn new(default: f32, wrap: fn(ParamOp) -> M) -> Self {
        Self {
            shadow: Automation::new(default),
            wrap,
        }
    }

    pub fn apply(&mut self, handle: &mut Handle<M>, op: ParamOp) {
        self.shadow.apply(op.clone());
        if handle.send((self.wrap)(op)).is_err() {
            warn!(node = ?handle.id(), "parameter queue full, automation event dropped");
        }
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.shadow.value_at(time)
    }

    pub fn prune(&mut self, time: f64) {
        self.shadow.prune(time);
    }

    pub fn automation(&self) -> &Automation {
        &self.shadow
    }
}
