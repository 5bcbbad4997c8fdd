//! Per-sound registry entries

use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::context::AudioContext;
use crate::generators::{CosmicAmbienceGenerator, FrequencySignalGenerator, SignalOutput, WhiteNoiseGenerator};
use crate::node::NodeId;
use crate::nodes::{BufferSourceHandle, GainHandle};
use crate::sound::SoundConfig;

/// Everything the engine built for one playing sound.
///
/// Which fields are populated depends on the sound's kind:
///
/// ```text
/// file / noise / cosmic ─> audio_gain ─┐
///                                       ├─> sound_master (layered kinds only) ─> master
/// frequency generator ─> frequency_gain ┘
/// ```
pub(crate) struct AudioSource {
    pub sound: SoundConfig,
    pub instance: String,
    pub seq: u64,
    pub generation: u64,
    pub volume: f32,
    /// A file fetch is in flight; nothing is built yet
    pub loading: bool,

    pub file: Option<BufferSourceHandle>,
    pub frequency: Option<FrequencySignalGenerator>,
    pub noise: Option<WhiteNoiseGenerator>,
    pub cosmic: Option<CosmicAmbienceGenerator>,

    pub audio_gain: Option<GainHandle>,
    pub frequency_gain: Option<GainHandle>,
    pub sound_master: Option<GainHandle>,
}

impl AudioSource {
    pub fn new(sound: SoundConfig, instance: String, seq: u64, generation: u64, volume: f32) -> Self {
        Self {
            sound,
            instance,
            seq,
            generation,
            volume,
            loading: false,
            file: None,
            frequency: None,
            noise: None,
            cosmic: None,
            audio_gain: None,
            frequency_gain: None,
            sound_master: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.sound.id
    }

    pub fn tick(&mut self, ctx: &mut AudioContext) {
        let now = ctx.current_time();
        if let Some(generator) = self.frequency.as_mut() {
            generator.tick(ctx);
        }
        if let Some(generator) = self.cosmic.as_mut() {
            generator.tick(ctx);
        }
        for gain in [&mut self.audio_gain, &mut self.frequency_gain, &mut self.sound_master]
            .into_iter()
            .flatten()
        {
            gain.prune(now);
        }
    }

    /// True once a file source has played to its end on its own
    pub fn file_ended(&self) -> bool {
        self.file.as_ref().is_some_and(|f| f.has_ended())
    }

    /// Stop everything and remove what can go right away.
    ///
    /// The frequency layer is still fading when this returns; its generator,
    /// gain and the per-sound master come back as a [`Teardown`] for later.
    /// It falls due after `settle` seconds on the audio clock or on the wall
    /// clock, whichever comes first, so a suspended context still lets go.
    pub fn stop(mut self, ctx: &mut AudioContext, settle: f64) -> Option<Teardown> {
        let now = ctx.current_time();

        let frequency = self.frequency.take().map(|mut generator| {
            generator.stop(ctx);
            generator
        });

        if let Some(mut noise) = self.noise.take() {
            noise.stop(ctx);
            noise.dispose(ctx);
        }
        if let Some(mut cosmic) = self.cosmic.take() {
            cosmic.stop(ctx);
            cosmic.dispose(ctx);
        }
        if let Some(mut file) = self.file.take() {
            match file.stop(now) {
                Err(e) if e.is_teardown_race() => trace!(id = self.id(), "file source already stopped"),
                Err(e) => warn!(id = self.id(), error = %e, "could not stop file source"),
                Ok(()) => {}
            }
            ctx.disconnect(file.id());
            ctx.remove(file.id());
        }
        if let Some(gain) = self.audio_gain.take() {
            ctx.disconnect(gain.id());
            ctx.remove(gain.id());
        }

        let mut nodes = Vec::new();
        nodes.extend(self.frequency_gain.take().map(|g| g.id()));
        nodes.extend(self.sound_master.take().map(|g| g.id()));

        if frequency.is_none() {
            for node in nodes {
                ctx.disconnect(node);
                ctx.remove(node);
            }
            debug!(id = self.id(), "sound torn down");
            return None;
        }

        Some(Teardown {
            id: self.sound.id,
            due: now + settle,
            deadline: Instant::now() + Duration::from_secs_f64(settle.max(0.0)),
            generator: frequency,
            nodes,
        })
    }
}

/// Work left over from a stop, due once the frequency fades have finished.
pub(crate) struct Teardown {
    pub id: String,
    pub due: f64,
    deadline: Instant,
    generator: Option<FrequencySignalGenerator>,
    nodes: Vec<NodeId>,
}

impl Teardown {
    /// `now` is the audio clock
    pub fn is_due(&self, now: f64) -> bool {
        self.due <= now || Instant::now() >= self.deadline
    }

    pub fn complete(mut self, ctx: &mut AudioContext) {
        if let Some(mut generator) = self.generator.take() {
            generator.dispose(ctx);
        }
        for node in self.nodes.drain(..) {
            ctx.disconnect(node);
            ctx.remove(node);
        }
        debug!(id = %self.id, "deferred teardown complete");
    }
}

/// A snapshot of one gain stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GainStage {
    pub node: NodeId,
    pub value: f32,
}

/// Introspection of a registered sound, for UIs and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceInfo {
    pub instance: String,
    pub volume: f32,
    pub loading: bool,
    pub has_file: bool,
    pub has_frequency: bool,
    pub has_noise: bool,
    pub has_cosmic: bool,
    /// File, noise or cosmic stage
    pub primary_gain: Option<GainStage>,
    pub frequency_gain: Option<GainStage>,
    pub sound_master: Option<GainStage>,
}

impl SourceInfo {
    pub(crate) fn of(source: &AudioSource, now: f64) -> Self {
        let stage = |gain: &Option<GainHandle>| {
            gain.as_ref().map(|g| GainStage {
                node: g.id(),
                value: g.value_at(now),
            })
        };
        Self {
            instance: source.instance.clone(),
            volume: source.volume,
            loading: source.loading,
            has_file: source.file.is_some(),
            has_frequency: source.frequency.is_some(),
            has_noise: source.noise.is_some(),
            has_cosmic: source.cosmic.is_some(),
            primary_gain: stage(&source.audio_gain),
            frequency_gain: stage(&source.frequency_gain),
            sound_master: stage(&source.sound_master),
        }
    }
}
