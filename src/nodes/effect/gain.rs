//! Automatable gain stage

use dasp_graph::{Buffer, Input};

use crate::context::Handle;
use crate::node::{AudioNode, NodeId, ProcessContext};
use crate::nodes::sum_stereo;
use crate::param::{AudioParam, Automation, ParamEvent, ParamOp};

/// Messages to control a [`Gain`]
#[derive(Clone, Debug)]
pub enum GainMessage {
    Automate(ParamOp),
}

/// Where a gain stage places its signal in the stereo field.
///
/// `Left`/`Right` take the mono downmix of the input and write it to one side
/// only, which is how a binaural pair is merged into a single stereo signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelRoute {
    #[default]
    Both,
    Left,
    Right,
}

/// A gain (volume) stage.
///
/// Sums every input (mono inputs are copied to both channels), then scales by
/// the gain timeline evaluated per sample. Output is always stereo.
pub struct Gain {
    gain: Automation,
    route: ChannelRoute,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self {
            gain: Automation::new(gain),
            route: ChannelRoute::Both,
        }
    }

    pub fn routed(mut self, route: ChannelRoute) -> Self {
        self.route = route;
        self
    }
}

impl AudioNode for Gain {
    type Message = GainMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = GainMessage>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                GainMessage::Automate(op) => self.gain.apply(op),
            }
        }

        if outputs.len() < 2 {
            return;
        }

        let t0 = ctx.time();
        self.gain.prune(t0);
        let mut gains = [0.0f32; Buffer::LEN];
        self.gain.render(t0, ctx.sample_period(), &mut gains);

        let (left, right) = outputs.split_at_mut(1);
        let (left, right) = (&mut left[0], &mut right[0]);
        sum_stereo(inputs, left, right);

        for i in 0..Buffer::LEN {
            let g = gains[i];
            match self.route {
                ChannelRoute::Both => {
                    left[i] *= g;
                    right[i] *= g;
                }
                ChannelRoute::Left => {
                    left[i] = (left[i] + right[i]) * 0.5 * g;
                    right[i] = 0.0;
                }
                ChannelRoute::Right => {
                    right[i] = (left[i] + right[i]) * 0.5 * g;
                    left[i] = 0.0;
                }
            }
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { usize::MAX }

    #[inline]
    fn num_outputs(&self) -> usize { 2 }
}

/// Control-side handle for a [`Gain`].
///
/// Mirrors the Web Audio `AudioParam` scheduling calls. Every call is applied
/// to a local shadow so [`value_at`](Self::value_at) answers without asking
/// the audio thread.
pub struct GainHandle {
    handle: Handle<GainMessage>,
    gain: AudioParam<GainMessage>,
}

impl GainHandle {
    pub(crate) fn new(handle: Handle<GainMessage>, gain: f32) -> Self {
        Self {
            handle,
            gain: AudioParam::new(gain, GainMessage::Automate),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.gain.apply(&mut self.handle, ParamOp::SetValueAtTime { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.gain
            .apply(&mut self.handle, ParamOp::LinearRampToValueAtTime { value, end_time });
    }

    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.gain.apply(&mut self.handle, ParamOp::CancelScheduledValues { time });
    }

    /// Freeze the gain at `time`, dropping later automation. Returns the held value.
    pub fn cancel_and_hold(&mut self, time: f64) -> f32 {
        self.gain.apply(&mut self.handle, ParamOp::CancelAndHold { time });
        self.gain.value_at(time)
    }

    /// Cancel pending automation and jump to `value` at `time`.
    pub fn set_now(&mut self, value: f32, time: f64) {
        self.cancel_scheduled_values(time);
        self.set_value_at_time(value, time);
    }

    /// Hold the current value at `time` and ramp to zero over `fade` seconds.
    pub fn fade_out(&mut self, time: f64, fade: f64) {
        self.cancel_and_hold(time);
        self.linear_ramp_to_value_at_time(0.0, time + fade);
    }

    pub fn schedule(&mut self, events: Vec<ParamEvent>) {
        if events.is_empty() {
            return;
        }
        self.gain.apply(&mut self.handle, ParamOp::Schedule(events));
    }

    pub fn value_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }

    /// Time of the last scheduled gain event
    pub fn last_event_time(&self) -> Option<f64> {
        self.gain.automation().last_event_time()
    }

    pub fn prune(&mut self, time: f64) {
        self.gain.prune(time);
    }
}
