//! Binaural carrier layer

use tracing::trace;

use crate::context::{AudioContext, Handle};
use crate::error::Result;
use crate::generators::{SignalOutput, LAYER_FADE, STOP_MARGIN};
use crate::node::NodeId;
use crate::nodes::{ChannelRoute, GainHandle, OscillatorHandle};
use crate::sound::CarrierLayerConfig;

/// Two sine tones, one per ear, merged into a stereo signal.
///
/// ```text
/// osc(left)  -> gain(left side)  \
///                                  merger -> output
/// osc(right) -> gain(right side) /
/// ```
///
/// The oscillators are one-shot: after `stop` the layer cannot be restarted
/// and must be recreated.
pub struct CarrierLayer {
    config: CarrierLayerConfig,
    left_osc: Option<OscillatorHandle>,
    right_osc: Option<OscillatorHandle>,
    left_gain: GainHandle,
    right_gain: GainHandle,
    merger: Handle<()>,
    /// Stopped oscillators still in the graph until dispose
    spent: Vec<NodeId>,
    playing: bool,
}

impl CarrierLayer {
    pub fn new(ctx: &mut AudioContext, config: CarrierLayerConfig) -> Self {
        let left_osc = ctx.create_oscillator(config.left_freq);
        let right_osc = ctx.create_oscillator(config.right_freq);
        let left_gain = ctx.create_routed_gain(0.0, ChannelRoute::Left);
        let right_gain = ctx.create_routed_gain(0.0, ChannelRoute::Right);
        let merger = ctx.create_merger();

        ctx.connect(left_osc.id(), left_gain.id());
        ctx.connect(right_osc.id(), right_gain.id());
        ctx.connect(left_gain.id(), merger.id());
        ctx.connect(right_gain.id(), merger.id());

        Self {
            config,
            left_osc: Some(left_osc),
            right_osc: Some(right_osc),
            left_gain,
            right_gain,
            merger,
            spent: Vec::new(),
            playing: false,
        }
    }

    pub fn config(&self) -> &CarrierLayerConfig {
        &self.config
    }

    /// Current gain of each ear, read from the scheduled automation
    pub fn gains_at(&self, time: f64) -> (f32, f32) {
        (self.left_gain.value_at(time), self.right_gain.value_at(time))
    }
}

impl SignalOutput for CarrierLayer {
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        let (Some(left_osc), Some(right_osc)) = (self.left_osc.as_mut(), self.right_osc.as_mut()) else {
            trace!("carrier layer already stopped, start ignored");
            return Ok(());
        };

        let now = ctx.current_time();
        left_osc.start(now);
        right_osc.start(now);

        for gain in [&mut self.left_gain, &mut self.right_gain] {
            gain.cancel_scheduled_values(now);
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(self.config.volume, now + LAYER_FADE);
        }

        self.playing = true;
        Ok(())
    }

    fn stop(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }

        let now = ctx.current_time();
        self.left_gain.fade_out(now, LAYER_FADE);
        self.right_gain.fade_out(now, LAYER_FADE);

        for mut osc in self.left_osc.take().into_iter().chain(self.right_osc.take()) {
            osc.stop(now + LAYER_FADE + STOP_MARGIN);
            self.spent.push(osc.id());
        }

        self.playing = false;
    }

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32) {
        self.config.volume = volume;
        if !self.playing {
            return;
        }
        let now = ctx.current_time();
        self.left_gain.set_now(volume, now);
        self.right_gain.set_now(volume, now);
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.stop(ctx);
        // Never-started oscillators are released too
        for osc in self.left_osc.take().into_iter().chain(self.right_osc.take()) {
            self.spent.push(osc.id());
        }
        for id in self.spent.drain(..) {
            ctx.remove(id);
        }
        ctx.remove(self.left_gain.id());
        ctx.remove(self.right_gain.id());
        ctx.remove(self.merger.id());
    }

    fn output(&self) -> NodeId {
        self.merger.id()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}
