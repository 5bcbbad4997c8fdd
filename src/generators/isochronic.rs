//! Isochronic pulse layer

use tracing::{trace, warn};

use crate::context::AudioContext;
use crate::error::Result;
use crate::generators::{SignalOutput, LAYER_FADE, STOP_MARGIN};
use crate::node::NodeId;
use crate::nodes::{GainHandle, OscillatorHandle};
use crate::param::ParamEvent;
use crate::sound::IsochronicLayerConfig;

/// How far ahead pulses are scheduled, in seconds
pub const PULSE_LOOKAHEAD: f64 = 3600.0;

/// Re-arm once fewer than this many seconds of pulses remain scheduled
pub const REARM_MARGIN: f64 = 60.0;

/// One sine tone gated on and off at `pulse_rate`.
///
/// Pulses are hard gain set-points computed ahead of time for
/// [`PULSE_LOOKAHEAD`] seconds. [`tick`](SignalOutput::tick) extends the
/// schedule from its cursor before it runs out.
pub struct IsochronicLayer {
    config: IsochronicLayerConfig,
    osc: Option<OscillatorHandle>,
    gain: GainHandle,
    spent: Option<NodeId>,
    /// End of the scheduled pulse train; `None` when nothing is armed
    cursor: Option<f64>,
    playing: bool,
}

impl IsochronicLayer {
    /// Pulse rates above Nyquist are clamped to it.
    pub fn new(ctx: &mut AudioContext, mut config: IsochronicLayerConfig) -> Self {
        let nyquist = ctx.sample_rate() as f32 / 2.0;
        if config.pulse_rate > nyquist {
            warn!(pulse_rate = config.pulse_rate, nyquist, "isochronic pulse rate clamped");
            config.pulse_rate = nyquist;
        }

        let osc = ctx.create_oscillator(config.frequency);
        let gain = ctx.create_gain(0.0);
        ctx.connect(osc.id(), gain.id());

        Self {
            config,
            osc: Some(osc),
            gain,
            spent: None,
            cursor: None,
            playing: false,
        }
    }

    pub fn config(&self) -> &IsochronicLayerConfig {
        &self.config
    }

    pub fn gain_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }

    /// Where the scheduled pulse train currently ends
    pub fn scheduled_until(&self) -> Option<f64> {
        self.cursor
    }

    fn schedule_pulses(&mut self, from: f64) {
        let period = 1.0 / self.config.pulse_rate as f64;
        let on = period * self.config.duty_cycle as f64;
        let volume = self.config.volume;

        let count = (PULSE_LOOKAHEAD / period).ceil() as usize;
        let mut events = Vec::with_capacity(count * 2);
        for k in 0..count {
            let at = from + k as f64 * period;
            events.push(ParamEvent::SetValue { value: volume, time: at });
            events.push(ParamEvent::SetValue { value: 0.0, time: at + on });
        }

        self.gain.schedule(events);
        self.cursor = Some(from + count as f64 * period);
        trace!(from, until = ?self.cursor, "isochronic pulses scheduled");
    }
}

impl SignalOutput for IsochronicLayer {
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        let Some(osc) = self.osc.as_mut() else {
            trace!("isochronic layer already stopped, start ignored");
            return Ok(());
        };

        let now = ctx.current_time();
        let pulses_from = now + LAYER_FADE;
        osc.start(now);

        let center = self.config.volume * self.config.duty_cycle;
        self.gain.cancel_scheduled_values(now);
        self.gain.set_value_at_time(0.0, now);
        self.gain.linear_ramp_to_value_at_time(center, pulses_from);

        self.playing = true;
        self.schedule_pulses(pulses_from);
        Ok(())
    }

    fn stop(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }

        self.cursor = None;
        let now = ctx.current_time();
        self.gain.fade_out(now, LAYER_FADE);

        if let Some(mut osc) = self.osc.take() {
            osc.stop(now + LAYER_FADE + STOP_MARGIN);
            self.spent = Some(osc.id());
        }
        self.playing = false;
    }

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32) {
        self.config.volume = volume;
        if !self.playing {
            return;
        }
        let now = ctx.current_time();
        self.gain.cancel_and_hold(now);
        self.schedule_pulses(now);
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.stop(ctx);
        if let Some(osc) = self.osc.take() {
            self.spent = Some(osc.id());
        }
        if let Some(id) = self.spent.take() {
            ctx.remove(id);
        }
        ctx.remove(self.gain.id());
    }

    fn output(&self) -> NodeId {
        self.gain.id()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn tick(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }
        let now = ctx.current_time();
        self.gain.prune(now);
        if let Some(cursor) = self.cursor {
            if cursor - now < REARM_MARGIN {
                self.schedule_pulses(cursor);
            }
        }
    }
}
