//! Looped white noise

use std::sync::Arc;

use rand::Rng;
use tracing::{trace, warn};

use crate::context::AudioContext;
use crate::error::Result;
use crate::generators::{SignalOutput, LAYER_FADE, STOP_MARGIN};
use crate::node::NodeId;
use crate::nodes::{AudioBuffer, BufferSourceHandle, GainHandle};

/// Frames in the precomputed noise buffer
pub const NOISE_BUFFER_FRAMES: usize = 4096;

/// Stereo white noise from a short precomputed buffer, looped.
///
/// The output gain stage exists from construction, so the generator can be
/// wired into a graph before it starts.
pub struct WhiteNoiseGenerator {
    buffer: Arc<AudioBuffer>,
    source: Option<BufferSourceHandle>,
    gain: GainHandle,
    spent: Vec<NodeId>,
    playing: bool,
}

impl WhiteNoiseGenerator {
    pub fn new<R: Rng>(ctx: &mut AudioContext, rng: &mut R) -> Self {
        let buffer = Arc::new(noise_buffer(ctx.sample_rate(), rng));
        let gain = ctx.create_gain(0.0);

        Self {
            buffer,
            source: None,
            gain,
            spent: Vec::new(),
            playing: false,
        }
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn gain_at(&self, time: f64) -> f32 {
        self.gain.value_at(time)
    }
}

fn noise_buffer<R: Rng>(sample_rate: u32, rng: &mut R) -> AudioBuffer {
    let mut channel = || -> Vec<f32> {
        (0..NOISE_BUFFER_FRAMES)
            .map(|_| rng.gen_range(-1.0f32..=1.0))
            .collect()
    };
    let left = channel();
    let right = channel();
    AudioBuffer::new(sample_rate, left, right)
}

impl SignalOutput for WhiteNoiseGenerator {
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()> {
        if self.playing {
            return Ok(());
        }

        let now = ctx.current_time();
        let mut source = ctx.create_buffer_source(Arc::clone(&self.buffer), true);
        ctx.connect(source.id(), self.gain.id());
        source.start(now)?;

        self.gain.set_value_at_time(0.0, now);
        self.gain.linear_ramp_to_value_at_time(1.0, now + LAYER_FADE);

        self.source = Some(source);
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }

        let now = ctx.current_time();
        self.gain.fade_out(now, LAYER_FADE);

        if let Some(mut source) = self.source.take() {
            match source.stop(now + LAYER_FADE + STOP_MARGIN) {
                Err(e) if e.is_teardown_race() => trace!("noise source already stopped"),
                Err(e) => warn!(error = %e, "could not stop noise source"),
                Ok(()) => {}
            }
            self.spent.push(source.id());
        }
        self.playing = false;
    }

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32) {
        if !self.playing {
            return;
        }
        self.gain.set_now(volume, ctx.current_time());
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.stop(ctx);
        ctx.disconnect(self.gain.id());
        for id in self.spent.drain(..) {
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
}
