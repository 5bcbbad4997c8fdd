//! Generative cosmic ambience

use rand::rngs::StdRng;
use rand::Rng;
use tracing::{debug, trace};

use crate::context::{AudioContext, Handle};
use crate::error::Result;
use crate::generators::{SignalOutput, WhiteNoiseGenerator};
use crate::node::NodeId;
use crate::nodes::{ChannelRoute, GainHandle, OscillatorHandle};

/// A named tonal preset the ambience drifts between.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CosmicState {
    pub name: &'static str,
    pub base_freq: f32,
    pub beat_freq: f32,
    pub harmonics: [f32; 3],
    pub volume: f32,
}

pub const COSMIC_STATES: [CosmicState; 6] = [
    CosmicState { name: "Deep Space", base_freq: 40.0, beat_freq: 2.0, harmonics: [80.0, 120.0, 160.0], volume: 0.7 },
    CosmicState { name: "Nebula Drift", base_freq: 55.0, beat_freq: 3.5, harmonics: [110.0, 165.0, 220.0], volume: 0.65 },
    CosmicState { name: "Stellar Wind", base_freq: 65.0, beat_freq: 4.5, harmonics: [130.0, 195.0, 260.0], volume: 0.7 },
    CosmicState { name: "Cosmic Resonance", base_freq: 50.0, beat_freq: 7.83, harmonics: [100.0, 150.0, 200.0], volume: 0.68 },
    CosmicState { name: "Void Echo", base_freq: 35.0, beat_freq: 2.5, harmonics: [70.0, 105.0, 140.0], volume: 0.72 },
    CosmicState { name: "Quantum Drift", base_freq: 60.0, beat_freq: 5.0, harmonics: [120.0, 180.0, 240.0], volume: 0.66 },
];

pub const FADE_IN: f64 = 2.0;
pub const TRANSITION: f64 = 8.0;
pub const FADE_OUT: f64 = 2.0;
/// Delay between `stop` and releasing the voices
pub const RELEASE_AFTER: f64 = 2.1;

const BINAURAL_FADE_IN_LEVEL: f32 = 0.6;
const TRANSITION_DELAY: (f64, f64) = (15.0, 30.0);
const SWELL_DELAY: (f64, f64) = (8.0, 20.0);
const SWELL_FADE: (f64, f64) = (3.0, 7.0);
const SWELL_LEVEL: (f32, f32) = (0.15, 0.25);
const SWELL_THRESHOLD: f32 = 0.1;

/// Level of harmonic `i`
#[inline]
fn harmonic_level(i: usize) -> f32 {
    0.15 - i as f32 * 0.03
}

struct Voices {
    left_osc: OscillatorHandle,
    right_osc: OscillatorHandle,
    left_gain: GainHandle,
    right_gain: GainHandle,
    merger: Handle<()>,
    harmonics: Vec<(OscillatorHandle, GainHandle)>,
    noise: WhiteNoiseGenerator,
    noise_gain: GainHandle,
}

impl Voices {
    fn build(ctx: &mut AudioContext, master: NodeId, rng: &mut StdRng) -> Self {
        let initial = &COSMIC_STATES[0];

        let left_osc = ctx.create_oscillator(initial.base_freq);
        let right_osc = ctx.create_oscillator(initial.base_freq + initial.beat_freq);
        let left_gain = ctx.create_routed_gain(0.0, ChannelRoute::Left);
        let right_gain = ctx.create_routed_gain(0.0, ChannelRoute::Right);
        let merger = ctx.create_merger();
        ctx.connect(left_osc.id(), left_gain.id());
        ctx.connect(right_osc.id(), right_gain.id());
        ctx.connect(left_gain.id(), merger.id());
        ctx.connect(right_gain.id(), merger.id());
        ctx.connect(merger.id(), master);

        let harmonics = initial
            .harmonics
            .iter()
            .map(|&freq| {
                let osc = ctx.create_oscillator(freq);
                let gain = ctx.create_gain(0.0);
                ctx.connect(osc.id(), gain.id());
                ctx.connect(gain.id(), master);
                (osc, gain)
            })
            .collect();

        let noise = WhiteNoiseGenerator::new(ctx, rng);
        let noise_gain = ctx.create_gain(0.0);
        ctx.connect(noise.output(), noise_gain.id());
        ctx.connect(noise_gain.id(), master);

        Self {
            left_osc,
            right_osc,
            left_gain,
            right_gain,
            merger,
            harmonics,
            noise,
            noise_gain,
        }
    }

    fn gains_mut(&mut self) -> impl Iterator<Item = &mut GainHandle> {
        [&mut self.left_gain, &mut self.right_gain, &mut self.noise_gain]
            .into_iter()
            .chain(self.harmonics.iter_mut().map(|(_, gain)| gain))
    }

    fn prune(&mut self, time: f64) {
        self.left_osc.prune(time);
        self.right_osc.prune(time);
        for (osc, _) in self.harmonics.iter_mut() {
            osc.prune(time);
        }
        for gain in self.gains_mut() {
            gain.prune(time);
        }
    }

    fn release(mut self, ctx: &mut AudioContext) {
        self.noise.dispose(ctx);
        let mut nodes = vec![
            self.left_osc.id(),
            self.right_osc.id(),
            self.left_gain.id(),
            self.right_gain.id(),
            self.merger.id(),
            self.noise_gain.id(),
        ];
        for (osc, gain) in &self.harmonics {
            nodes.push(osc.id());
            nodes.push(gain.id());
        }
        for id in nodes {
            ctx.remove(id);
        }
    }
}

/// A self-evolving ambience: a binaural pair, three harmonic tones and
/// intermittent noise swells, drifting between [`COSMIC_STATES`].
///
/// The drift is driven from [`tick`](SignalOutput::tick): preset transitions
/// and noise swells are deadlines on the audio clock, cleared by `stop`.
pub struct CosmicAmbienceGenerator {
    master: GainHandle,
    voices: Option<Voices>,
    rng: StdRng,
    current: Option<usize>,
    next_transition: Option<f64>,
    next_swell: Option<f64>,
    release_at: Option<f64>,
    playing: bool,
}

impl CosmicAmbienceGenerator {
    pub fn new(ctx: &mut AudioContext, rng: StdRng) -> Self {
        Self {
            master: ctx.create_gain(1.0),
            voices: None,
            rng,
            current: None,
            next_transition: None,
            next_swell: None,
            release_at: None,
            playing: false,
        }
    }

    /// The preset most recently transitioned to
    pub fn current_state(&self) -> Option<&'static CosmicState> {
        self.current.map(|i| &COSMIC_STATES[i])
    }

    pub fn current_state_index(&self) -> Option<usize> {
        self.current
    }

    /// Scheduled left and right binaural frequencies at `time`
    pub fn binaural_frequencies_at(&self, time: f64) -> Option<(f32, f32)> {
        self.voices
            .as_ref()
            .map(|v| (v.left_osc.frequency_at(time), v.right_osc.frequency_at(time)))
    }

    pub fn binaural_gain_at(&self, time: f64) -> Option<f32> {
        self.voices.as_ref().map(|v| v.left_gain.value_at(time))
    }

    pub fn harmonic_gains_at(&self, time: f64) -> Vec<f32> {
        self.voices
            .as_ref()
            .map(|v| v.harmonics.iter().map(|(_, g)| g.value_at(time)).collect())
            .unwrap_or_default()
    }

    pub fn noise_gain_at(&self, time: f64) -> Option<f32> {
        self.voices.as_ref().map(|v| v.noise_gain.value_at(time))
    }

    pub fn volume_at(&self, time: f64) -> f32 {
        self.master.value_at(time)
    }

    pub fn next_transition_at(&self) -> Option<f64> {
        self.next_transition
    }

    pub fn next_swell_at(&self) -> Option<f64> {
        self.next_swell
    }

    /// True while stopped voices are still fading out
    pub fn is_releasing(&self) -> bool {
        self.release_at.is_some()
    }

    fn transition_to(&mut self, index: usize, start: f64) {
        let Some(voices) = self.voices.as_mut() else {
            return;
        };
        let state = &COSMIC_STATES[index];
        let end = start + TRANSITION;

        voices.left_osc.hold_frequency(start);
        voices.left_osc.ramp_frequency_to(state.base_freq, end);
        voices.right_osc.hold_frequency(start);
        voices.right_osc.ramp_frequency_to(state.base_freq + state.beat_freq, end);

        for (i, (osc, gain)) in voices.harmonics.iter_mut().enumerate() {
            osc.hold_frequency(start);
            osc.ramp_frequency_to(state.harmonics[i], end);
            gain.cancel_and_hold(start);
            gain.linear_ramp_to_value_at_time(harmonic_level(i), end);
        }

        for gain in [&mut voices.left_gain, &mut voices.right_gain] {
            gain.cancel_and_hold(start);
            gain.linear_ramp_to_value_at_time(state.volume, end);
        }

        self.current = Some(index);
        debug!(state = state.name, start, end, "cosmic transition");
    }

    /// A preset other than the current one, uniformly
    fn pick_next_state(&mut self) -> usize {
        let Some(current) = self.current else {
            return self.rng.gen_range(0..COSMIC_STATES.len());
        };
        let pick = self.rng.gen_range(0..COSMIC_STATES.len() - 1);
        if pick >= current {
            pick + 1
        } else {
            pick
        }
    }

    fn swell(&mut self, now: f64) {
        let fade = self.rng.gen_range(SWELL_FADE.0..SWELL_FADE.1);
        let level = self.rng.gen_range(SWELL_LEVEL.0..SWELL_LEVEL.1);
        let Some(voices) = self.voices.as_mut() else {
            return;
        };

        let current = voices.noise_gain.cancel_and_hold(now);
        let target = if current < SWELL_THRESHOLD { level } else { 0.0 };
        voices.noise_gain.linear_ramp_to_value_at_time(target, now + fade);
        trace!(from = current, to = target, fade, "noise swell");
    }

    fn delay(&mut self, range: (f64, f64)) -> f64 {
        self.rng.gen_range(range.0..range.1)
    }

    fn release_voices(&mut self, ctx: &mut AudioContext) {
        self.release_at = None;
        if let Some(voices) = self.voices.take() {
            voices.release(ctx);
            trace!("cosmic voices released");
        }
    }
}

impl SignalOutput for CosmicAmbienceGenerator {
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()> {
        if self.playing {
            return Ok(());
        }
        // A previous run still fading out is cut short
        self.release_voices(ctx);

        let now = ctx.current_time();
        let mut voices = Voices::build(ctx, self.master.id(), &mut self.rng);

        voices.left_osc.start(now);
        voices.right_osc.start(now);
        for (osc, _) in voices.harmonics.iter_mut() {
            osc.start(now);
        }
        voices.noise.start(ctx)?;

        for gain in [&mut voices.left_gain, &mut voices.right_gain] {
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(BINAURAL_FADE_IN_LEVEL, now + FADE_IN);
        }
        for (i, (_, gain)) in voices.harmonics.iter_mut().enumerate() {
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(harmonic_level(i), now + FADE_IN);
        }

        self.voices = Some(voices);
        self.playing = true;
        self.transition_to(0, now + FADE_IN);
        self.next_transition = Some(now + self.delay(TRANSITION_DELAY));
        self.next_swell = Some(now + self.delay(SWELL_DELAY));
        Ok(())
    }

    fn stop(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }

        self.next_transition = None;
        self.next_swell = None;
        self.playing = false;

        let now = ctx.current_time();
        if let Some(voices) = self.voices.as_mut() {
            for gain in voices.gains_mut() {
                gain.fade_out(now, FADE_OUT);
            }
        }
        self.release_at = Some(now + RELEASE_AFTER);
        debug!(release_at = now + RELEASE_AFTER, "cosmic ambience stopping");
    }

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32) {
        self.master.set_now(volume, ctx.current_time());
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.stop(ctx);
        self.release_voices(ctx);
        ctx.disconnect(self.master.id());
        ctx.remove(self.master.id());
    }

    fn output(&self) -> NodeId {
        self.master.id()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn tick(&mut self, ctx: &mut AudioContext) {
        let now = ctx.current_time();

        if self.release_at.is_some_and(|t| now >= t) {
            self.release_voices(ctx);
            return;
        }
        if !self.playing {
            return;
        }

        if self.next_transition.is_some_and(|t| now >= t) {
            let next = self.pick_next_state();
            self.transition_to(next, now);
            self.next_transition = Some(now + self.delay(TRANSITION_DELAY));
        }

        if self.next_swell.is_some_and(|t| now >= t) {
            self.swell(now);
            self.next_swell = Some(now + self.delay(SWELL_DELAY));
        }

        self.master.prune(now);
        if let Some(voices) = self.voices.as_mut() {
            voices.prune(now);
        }
    }
}
