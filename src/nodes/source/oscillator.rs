//! Sine oscillator with automatable frequency

use dasp_graph::{Buffer, Input};

use crate::context::Handle;
use crate::node::{AudioNode, NodeId, ProcessContext};
use crate::param::{AudioParam, Automation, ParamOp};

/// Messages to control an [`Oscillator`]
#[derive(Clone, Debug)]
pub enum OscillatorMessage {
    Frequency(ParamOp),
    /// Begin producing output at the given audio-clock time
    Start(f64),
    /// Fall silent at the given audio-clock time
    Stop(f64),
}

/// A sine oscillator (mono source).
///
/// Silent until its start time and again from its stop time on. Frequency
/// follows an [`Automation`] evaluated per sample, so ramps glide smoothly.
pub struct Oscillator {
    frequency: Automation,
    phase: f64,
    start_at: Option<f64>,
    stop_at: Option<f64>,
}

impl Oscillator {
    pub fn new(frequency: f32) -> Self {
        Self {
            frequency: Automation::new(frequency),
            phase: 0.0,
            start_at: None,
            stop_at: None,
        }
    }

    #[inline]
    fn is_sounding(&self, time: f64) -> bool {
        let started = self.start_at.is_some_and(|t| t <= time);
        let stopped = self.stop_at.is_some_and(|t| t <= time);
        started && !stopped
    }
}

impl AudioNode for Oscillator {
    type Message = OscillatorMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = OscillatorMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                OscillatorMessage::Frequency(op) => self.frequency.apply(op),
                OscillatorMessage::Start(t) => self.start_at = Some(t),
                OscillatorMessage::Stop(t) => self.stop_at = Some(t),
            }
        }

        let Some((first, rest)) = outputs.split_first_mut() else {
            return;
        };

        let t0 = ctx.time();
        let dt = ctx.sample_period();
        self.frequency.prune(t0);

        let mut freqs = [0.0f32; Buffer::LEN];
        self.frequency.render(t0, dt, &mut freqs);

        for (i, sample) in first.iter_mut().enumerate() {
            if !self.is_sounding(ctx.time_of(i)) {
                *sample = 0.0;
                continue;
            }

            *sample = (self.phase * core::f64::consts::TAU).sin() as f32;
            self.phase += freqs[i].max(0.0) as f64 * dt;
            self.phase -= self.phase.floor();
        }

        for buffer in rest.iter_mut() {
            buffer.copy_from_slice(first);
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 1 }
}

/// Control-side handle for an [`Oscillator`] in an [`AudioContext`](crate::AudioContext).
pub struct OscillatorHandle {
    handle: Handle<OscillatorMessage>,
    frequency: AudioParam<OscillatorMessage>,
}

impl OscillatorHandle {
    pub(crate) fn new(handle: Handle<OscillatorMessage>, frequency: f32) -> Self {
        Self {
            handle,
            frequency: AudioParam::new(frequency, OscillatorMessage::Frequency),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub fn start(&mut self, time: f64) {
        self.handle.send_or_warn(OscillatorMessage::Start(time));
    }

    pub fn stop(&mut self, time: f64) {
        self.handle.send_or_warn(OscillatorMessage::Stop(time));
    }

    pub fn frequency_at(&self, time: f64) -> f32 {
        self.frequency.value_at(time)
    }

    pub fn ramp_frequency_to(&mut self, value: f32, end_time: f64) {
        self.frequency
            .apply(&mut self.handle, ParamOp::LinearRampToValueAtTime { value, end_time });
    }

    /// Freeze the frequency at `time`, dropping later automation. Returns the held value.
    pub fn hold_frequency(&mut self, time: f64) -> f32 {
        self.frequency.apply(&mut self.handle, ParamOp::CancelAndHold { time });
        self.frequency.value_at(time)
    }

    pub fn prune(&mut self, time: f64) {
        self.frequency.prune(time);
    }
}
