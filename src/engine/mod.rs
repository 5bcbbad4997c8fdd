//! The sound engine: one output context, many concurrently playing sounds.
//!
//! Each sound gets its own small graph that ends at a shared master gain:
//!
//! ```text
//! sound graphs ─> master gain ─> destination
//! keepalive oscillator ─> silent gain ─> destination
//! ```
//!
//! The engine is driven from the control side. Rendering (either by a
//! hardware sink pulling from [`AudioEngine::take_output`], or offline through
//! [`AudioEngine::render`]) advances the audio clock, and [`AudioEngine::tick`]
//! runs every deadline that has come due on that clock: deferred teardowns,
//! pulse re-arming, ambience transitions and finished file loads.

mod source;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use hashbrown::HashMap;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtrb::Consumer;
use tracing::{debug, info, trace, warn};

use crate::config::EngineConfig;
use crate::context::{AudioContext, ContextState};
use crate::decode::{load_audio, AssetLoader, FsLoader};
use crate::error::{EngineError, Result};
use crate::generators::{CosmicAmbienceGenerator, FrequencySignalGenerator, SignalOutput, WhiteNoiseGenerator};
use crate::node::NodeId;
use crate::nodes::{AudioBuffer, GainHandle, OscillatorHandle};
use crate::sound::{FrequencySignalConfig, SoundConfig, SoundKind};

use self::source::{AudioSource, Teardown};
pub use self::source::{GainStage, SourceInfo};

/// Level of a frequency layer relative to the sound it sits under
pub const FREQUENCY_LAYER_RATIO: f32 = 0.25;
/// Time a stopped frequency layer is given to fade before it is disposed
pub const FREQUENCY_SETTLE: f64 = 0.150;
/// Fade-in of a file that plays over a frequency layer
pub const FILE_FADE_IN: f64 = 0.1;

/// Notifications about things that happen outside a direct call.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    /// A sound's graph is built and audible. File sounds report this once decoded.
    SoundStarted { id: String, instance: String },
    /// A file sound played to its end on its own and was unregistered
    SoundEnded { id: String },
    /// A file sound could not be fetched or decoded and was unregistered
    LoadFailed { id: String, reason: String },
    /// The context was found suspended while sounds were active and was resumed
    ContextResumed,
}

struct LoadResult {
    id: String,
    generation: u64,
    result: Result<AudioBuffer>,
}

/// State that only exists between `initialize` and `dispose`
struct Runtime {
    ctx: AudioContext,
    master: GainHandle,
    keepalive: OscillatorHandle,
    keepalive_gain: NodeId,
    last_liveness_check: Instant,
}

/// Plays any number of [`SoundConfig`]s at once, each addressed by its id.
///
/// ```
/// use drift::{AudioEngine, EngineConfig, SoundCatalog};
///
/// let mut engine = AudioEngine::new(EngineConfig::default().with_sample_rate(8000).with_seed(7));
/// engine.initialize().unwrap();
///
/// let catalog = SoundCatalog::builtin();
/// let noise = catalog.get("white-noise").unwrap();
/// engine.play_sound(noise, 0.7).unwrap();
/// engine.render(0.5);
/// assert!(engine.is_sound_playing("white-noise"));
///
/// engine.stop_sound("white-noise");
/// engine.render(0.5);
/// assert!(engine.get_active_sounds().is_empty());
/// ```
pub struct AudioEngine {
    config: EngineConfig,
    loader: Arc<dyn AssetLoader>,
    runtime: Option<Runtime>,
    output: Option<Consumer<f32>>,

    sources: HashMap<String, AudioSource>,
    draining: Vec<Teardown>,
    generations: HashMap<String, u64>,
    next_seq: u64,

    load_tx: Sender<LoadResult>,
    load_rx: Receiver<LoadResult>,
    pending_loads: usize,

    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,

    rng: StdRng,
}

impl AudioEngine {
    /// An engine that resolves file URLs against `config.asset_root`.
    pub fn new(config: EngineConfig) -> Self {
        let loader = Arc::new(FsLoader::new(config.asset_root.clone()));
        Self::with_loader(config, loader)
    }

    pub fn with_loader(config: EngineConfig, loader: Arc<dyn AssetLoader>) -> Self {
        let (load_tx, load_rx) = crossbeam_channel::unbounded();
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            config,
            loader,
            runtime: None,
            output: None,
            sources: HashMap::new(),
            draining: Vec::new(),
            generations: HashMap::new(),
            next_seq: 0,
            load_tx,
            load_rx,
            pending_loads: 0,
            events_tx,
            events_rx,
            rng,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create the output context, master gain and keepalive.
    ///
    /// Calling it again only makes sure the context is running.
    pub fn initialize(&mut self) -> Result<()> {
        if self.runtime.is_some() {
            return self.ensure_context_running();
        }

        let mut ctx = AudioContext::from_config(&self.config)?;
        if ctx.state() == ContextState::Suspended {
            ctx.resume()?;
        }

        let master = ctx.create_gain(1.0);
        let destination = ctx.destination();
        ctx.connect(master.id(), destination);

        // An inaudible tone keeps hosts from idling the output while nothing plays.
        let mut keepalive = ctx.create_oscillator(self.config.keepalive_frequency);
        let keepalive_gain = ctx.create_gain(0.0);
        ctx.connect(keepalive.id(), keepalive_gain.id());
        ctx.connect(keepalive_gain.id(), destination);
        keepalive.start(ctx.current_time());

        self.output = ctx.take_output();
        info!(sample_rate = ctx.sample_rate(), "audio engine initialized");

        self.runtime = Some(Runtime {
            ctx,
            master,
            keepalive,
            keepalive_gain: keepalive_gain.id(),
            last_liveness_check: Instant::now(),
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    /// Take the interleaved stereo output stream. Only the first call after
    /// `initialize` returns it.
    pub fn take_output(&mut self) -> Option<Consumer<f32>> {
        self.output.take()
    }

    /// Receiver for [`EngineEvent`]s. Clones share one queue, so each event is seen once.
    pub fn events(&self) -> Receiver<EngineEvent> {
        self.events_rx.clone()
    }

    pub fn context(&self) -> Option<&AudioContext> {
        self.runtime.as_ref().map(|rt| &rt.ctx)
    }

    pub fn context_mut(&mut self) -> Option<&mut AudioContext> {
        self.runtime.as_mut().map(|rt| &mut rt.ctx)
    }

    /// Audio-clock time, zero before `initialize`
    pub fn current_time(&self) -> f64 {
        self.context().map_or(0.0, AudioContext::current_time)
    }

    pub fn master_node(&self) -> Option<NodeId> {
        self.runtime.as_ref().map(|rt| rt.master.id())
    }

    pub fn master_volume(&self) -> Option<f32> {
        let rt = self.runtime.as_ref()?;
        Some(rt.master.value_at(rt.ctx.current_time()))
    }

    /// Start `sound` at `volume`, replacing any instance already playing under its id.
    ///
    /// Returns the id of the new instance. File sounds return immediately and
    /// become audible once decoded; a failed load unregisters the sound and
    /// reports [`EngineEvent::LoadFailed`].
    pub fn play_sound(&mut self, sound: &SoundConfig, volume: f32) -> Result<String> {
        self.initialize()?;

        let id = sound.id.clone();
        if self.sources.contains_key(&id) {
            self.stop_sound(&id);
        }
        self.flush_teardowns_for(&id);

        let generation = self.bump_generation(&id);
        let seq = self.next_seq;
        self.next_seq += 1;
        let instance = format!("{id}-{seq}");
        let mut source = AudioSource::new(sound.clone(), instance.clone(), seq, generation, volume);

        let runtime = self.runtime.as_mut().ok_or(EngineError::InvalidState {
            reason: "engine is not initialized",
        })?;
        let ctx = &mut runtime.ctx;
        let master = runtime.master.id();

        if let Some(url) = sound.kind.audio_url() {
            source.loading = true;
            self.pending_loads += 1;
            spawn_load(
                self.loader.clone(),
                self.load_tx.clone(),
                id.clone(),
                generation,
                url.to_owned(),
                ctx.sample_rate(),
            );
            debug!(%id, %url, "loading audio file");
        } else if let Err(e) = build_generated(ctx, master, &mut self.rng, &mut source) {
            warn!(%id, error = %e, "failed to start sound");
            if let Some(teardown) = source.stop(ctx, 0.0) {
                teardown.complete(ctx);
            }
            return Err(e);
        }

        let loading = source.loading;
        self.sources.insert(id.clone(), source);
        if !loading {
            info!(%id, %instance, volume, "sound started");
            self.emit(EngineEvent::SoundStarted {
                id,
                instance: instance.clone(),
            });
        }
        Ok(instance)
    }

    /// Stop and unregister a sound. Unknown ids are ignored.
    ///
    /// Noise, ambience and file stages are removed at once. A frequency layer
    /// fades out and is disposed [`FREQUENCY_SETTLE`] seconds later, together
    /// with its gain and the per-sound master. The wall clock counts too, so a
    /// suspended context does not hold the graph.
    pub fn stop_sound(&mut self, id: &str) {
        let Some(source) = self.sources.remove(id) else {
            trace!(id, "stop for a sound that is not playing");
            return;
        };
        self.bump_generation(id);
        if source.loading {
            trace!(id, "load in flight will be discarded");
        }

        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        if let Some(teardown) = source.stop(&mut runtime.ctx, FREQUENCY_SETTLE) {
            self.draining.push(teardown);
        }
        info!(id, "sound stopped");
    }

    pub fn stop_all(&mut self) {
        let ids: Vec<String> = self.sources.keys().cloned().collect();
        for id in ids {
            self.stop_sound(&id);
        }
    }

    /// Set a sound's volume, keeping frequency layers at [`FREQUENCY_LAYER_RATIO`]
    /// of the primary signal. Unknown ids are ignored.
    pub fn set_sound_volume(&mut self, id: &str, volume: f32) {
        let Some(source) = self.sources.get_mut(id) else {
            return;
        };
        source.volume = volume;
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let ctx = &mut runtime.ctx;
        let now = ctx.current_time();

        let primary = source.audio_gain.is_some() || source.noise.is_some();
        match (primary, source.frequency_gain.as_mut()) {
            (true, Some(frequency_gain)) => {
                if let Some(gain) = source.audio_gain.as_mut() {
                    gain.set_now(volume, now);
                }
                frequency_gain.set_now(volume * FREQUENCY_LAYER_RATIO, now);
            }
            (true, None) => {
                if let Some(gain) = source.audio_gain.as_mut() {
                    gain.set_now(volume, now);
                }
            }
            (false, Some(frequency_gain)) => frequency_gain.set_now(volume, now),
            (false, None) => {}
        }

        if let Some(cosmic) = source.cosmic.as_mut() {
            cosmic.set_volume(ctx, volume);
        }
        debug!(id, volume, "sound volume set");
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        if let Some(rt) = self.runtime.as_mut() {
            let now = rt.ctx.current_time();
            rt.master.set_now(volume, now);
        }
    }

    /// Out-of-range layers and sounds without a frequency layer are ignored.
    pub fn set_carrier_layer_volume(&mut self, id: &str, index: usize, volume: f32) {
        if let Some((ctx, generator)) = self.generator_mut(id) {
            generator.set_carrier_layer_volume(ctx, index, volume);
        }
    }

    /// Out-of-range layers and sounds without a frequency layer are ignored.
    pub fn set_isochronic_layer_volume(&mut self, id: &str, index: usize, volume: f32) {
        if let Some((ctx, generator)) = self.generator_mut(id) {
            generator.set_isochronic_layer_volume(ctx, index, volume);
        }
    }

    /// Restore every layer volume of a sound's frequency layer to `original`.
    pub fn reset_frequency_layers_to_defaults(&mut self, id: &str, original: &FrequencySignalConfig) {
        if let Some((ctx, generator)) = self.generator_mut(id) {
            generator.reset_to_defaults(ctx, original);
        }
    }

    fn generator_mut(&mut self, id: &str) -> Option<(&mut AudioContext, &mut FrequencySignalGenerator)> {
        let runtime = self.runtime.as_mut()?;
        let generator = self.sources.get_mut(id)?.frequency.as_mut()?;
        Some((&mut runtime.ctx, generator))
    }

    pub fn is_sound_playing(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    /// Ids of every registered sound, oldest first
    pub fn get_active_sounds(&self) -> Vec<String> {
        self.sources
            .values()
            .sorted_by_key(|s| s.seq)
            .map(|s| s.id().to_owned())
            .collect()
    }

    pub fn get_frequency_generator(&self, id: &str) -> Option<&FrequencySignalGenerator> {
        self.sources.get(id)?.frequency.as_ref()
    }

    pub fn get_cosmic_generator(&self, id: &str) -> Option<&CosmicAmbienceGenerator> {
        self.sources.get(id)?.cosmic.as_ref()
    }

    /// Current layout and gain levels of a registered sound
    pub fn source_info(&self, id: &str) -> Option<SourceInfo> {
        let source = self.sources.get(id)?;
        Some(SourceInfo::of(source, self.current_time()))
    }

    /// Stop everything and release the context. The engine can be initialized again.
    pub fn dispose(&mut self) {
        self.stop_all();
        let Some(mut rt) = self.runtime.take() else {
            return;
        };
        for teardown in self.draining.drain(..) {
            teardown.complete(&mut rt.ctx);
        }

        let now = rt.ctx.current_time();
        rt.keepalive.stop(now);
        for node in [rt.keepalive.id(), rt.keepalive_gain, rt.master.id()] {
            rt.ctx.disconnect(node);
            rt.ctx.remove(node);
        }
        rt.ctx.close();
        self.output = None;
        info!("audio engine disposed");
    }

    /// Run everything that has come due on the audio clock.
    ///
    /// Cheap to call often. [`render`](Self::render) calls it after every block.
    pub fn tick(&mut self) {
        if self.runtime.is_none() {
            return;
        }
        self.watch_state();
        self.check_liveness();
        self.poll_loads();

        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let ctx = &mut runtime.ctx;
        for source in self.sources.values_mut() {
            source.tick(ctx);
        }
        runtime.master.prune(ctx.current_time());

        let ended: Vec<String> = self
            .sources
            .values()
            .filter(|s| s.file_ended())
            .map(|s| s.id().to_owned())
            .collect();
        for id in ended {
            debug!(%id, "file sound ended");
            self.stop_sound(&id);
            self.emit(EngineEvent::SoundEnded { id });
        }

        self.complete_due_teardowns();
    }

    /// Render one block and tick. Returns false if the context did not render.
    pub fn process_block(&mut self) -> bool {
        let rendered = match self.runtime.as_mut() {
            Some(rt) => rt.ctx.render_block(),
            None => return false,
        };
        self.tick();
        rendered
    }

    /// Render `secs` seconds of audio offline, ticking after every block.
    ///
    /// Returns the number of blocks rendered.
    pub fn render(&mut self, secs: f64) -> u64 {
        let sample_rate = self.config.sample_rate as f64;
        let blocks = (secs * sample_rate / dasp_graph::Buffer::LEN as f64).ceil() as u64;
        (0..blocks).filter(|_| self.process_block()).count() as u64
    }

    /// Block until every in-flight file load has been applied or `timeout` passes.
    ///
    /// Returns true when nothing is left loading.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending_loads > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.load_rx.recv_timeout(remaining) {
                Ok(load) => self.apply_load(load),
                Err(_) => return false,
            }
        }
        true
    }

    /// Call when the host comes back to the foreground.
    pub fn notify_foreground(&mut self) {
        if self.sources.is_empty() {
            return;
        }
        self.resume_if_suspended();
    }

    /// Resume the context if the host suspended it.
    pub fn ensure_context_running(&mut self) -> Result<()> {
        let Some(rt) = self.runtime.as_mut() else {
            return Err(EngineError::InvalidState {
                reason: "engine is not initialized",
            });
        };
        if rt.ctx.state() == ContextState::Suspended {
            rt.ctx.resume()?;
            self.emit(EngineEvent::ContextResumed);
        }
        Ok(())
    }

    fn watch_state(&mut self) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        let suspended = rt
            .ctx
            .take_state_changes()
            .into_iter()
            .any(|s| s == ContextState::Suspended);
        if suspended && !self.sources.is_empty() {
            debug!("context suspended with active sounds");
            self.resume_if_suspended();
        }
    }

    fn check_liveness(&mut self) {
        let interval = Duration::from_millis(self.config.liveness_check_interval_ms);
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        if rt.last_liveness_check.elapsed() < interval {
            return;
        }
        rt.last_liveness_check = Instant::now();
        if !self.sources.is_empty() {
            self.resume_if_suspended();
        }
    }

    fn resume_if_suspended(&mut self) {
        let Some(rt) = self.runtime.as_mut() else {
            return;
        };
        if rt.ctx.state() != ContextState::Suspended {
            return;
        }
        match rt.ctx.resume() {
            Ok(()) => {
                info!("resumed suspended context");
                rt.ctx.take_state_changes();
                self.emit(EngineEvent::ContextResumed);
            }
            Err(e) => warn!(error = %e, "could not resume context"),
        }
    }

    fn poll_loads(&mut self) {
        while let Ok(load) = self.load_rx.try_recv() {
            self.apply_load(load);
        }
    }

    fn apply_load(&mut self, load: LoadResult) {
        self.pending_loads = self.pending_loads.saturating_sub(1);
        let LoadResult { id, generation, result } = load;

        let current = self
            .sources
            .get(&id)
            .is_some_and(|s| s.loading && s.generation == generation);
        if !current {
            trace!(%id, generation, "discarding stale load");
            return;
        }

        let buffer = match result {
            Ok(buffer) => Arc::new(buffer),
            Err(e) => {
                warn!(%id, error = %e, "failed to load sound");
                self.sources.remove(&id);
                self.emit(EngineEvent::LoadFailed {
                    id,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let (Some(runtime), Some(source)) = (self.runtime.as_mut(), self.sources.get_mut(&id)) else {
            return;
        };
        match build_file_graph(&mut runtime.ctx, runtime.master.id(), source, buffer) {
            Ok(()) => {
                info!(%id, instance = %source.instance, "file sound started");
                let instance = source.instance.clone();
                self.emit(EngineEvent::SoundStarted { id, instance });
            }
            Err(e) => {
                warn!(%id, error = %e, "failed to start file sound");
                if let Some(source) = self.sources.remove(&id) {
                    if let Some(teardown) = source.stop(&mut runtime.ctx, 0.0) {
                        teardown.complete(&mut runtime.ctx);
                    }
                }
                self.emit(EngineEvent::LoadFailed {
                    id,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn complete_due_teardowns(&mut self) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let now = runtime.ctx.current_time();
        let (due, waiting): (Vec<_>, Vec<_>) = self.draining.drain(..).partition(|t| t.is_due(now));
        self.draining = waiting;
        for teardown in due {
            teardown.complete(&mut runtime.ctx);
        }
    }

    /// Finish any teardown still pending for `id` right now.
    fn flush_teardowns_for(&mut self, id: &str) {
        let Some(runtime) = self.runtime.as_mut() else {
            return;
        };
        let (flush, keep): (Vec<_>, Vec<_>) = self.draining.drain(..).partition(|t| t.id == id);
        self.draining = keep;
        for teardown in flush {
            teardown.complete(&mut runtime.ctx);
        }
    }

    fn bump_generation(&mut self, id: &str) -> u64 {
        let generation = self.generations.entry_ref(id).or_insert(0);
        *generation += 1;
        *generation
    }

    fn emit(&self, event: EngineEvent) {
        // The engine holds a receiver, so the channel never disconnects.
        let _ = self.events_tx.send(event);
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn spawn_load(
    loader: Arc<dyn AssetLoader>,
    tx: Sender<LoadResult>,
    id: String,
    generation: u64,
    url: String,
    sample_rate: u32,
) {
    thread::spawn(move || {
        let result = load_audio(loader.as_ref(), &url, sample_rate);
        if tx.send(LoadResult { id, generation, result }).is_err() {
            trace!(%url, "engine gone before load finished");
        }
    });
}

/// A frequency generator behind its own gain stage, connected to `to`.
fn build_frequency_layer(
    ctx: &mut AudioContext,
    to: NodeId,
    config: &FrequencySignalConfig,
    level: f32,
) -> (FrequencySignalGenerator, GainHandle) {
    let mut generator = FrequencySignalGenerator::new(ctx);
    generator.initialize(ctx, config.clone());
    let gain = ctx.create_gain(level);
    ctx.connect(generator.output(), gain.id());
    ctx.connect(gain.id(), to);
    (generator, gain)
}

fn start_layers(ctx: &mut AudioContext, source: &mut AudioSource) -> Result<()> {
    if let Some(noise) = source.noise.as_mut() {
        noise.start(ctx)?;
    }
    if let Some(generator) = source.frequency.as_mut() {
        generator.start(ctx)?;
    }
    Ok(())
}

/// Build and start the graph of a sound that needs no file.
fn build_generated(ctx: &mut AudioContext, master: NodeId, rng: &mut StdRng, source: &mut AudioSource) -> Result<()> {
    let volume = source.volume;
    match source.sound.kind.clone() {
        SoundKind::Frequency { config } => {
            let (generator, gain) = build_frequency_layer(ctx, master, &config, volume);
            source.frequency = Some(generator);
            source.frequency_gain = Some(gain);
        }
        SoundKind::Noise => {
            let noise = WhiteNoiseGenerator::new(ctx, rng);
            let gain = ctx.create_gain(volume);
            ctx.connect(noise.output(), gain.id());
            ctx.connect(gain.id(), master);
            source.noise = Some(noise);
            source.audio_gain = Some(gain);
        }
        SoundKind::NoiseWithFrequency { config } => {
            let sound_master = ctx.create_gain(1.0);
            ctx.connect(sound_master.id(), master);

            let noise = WhiteNoiseGenerator::new(ctx, rng);
            let gain = ctx.create_gain(volume);
            ctx.connect(noise.output(), gain.id());
            ctx.connect(gain.id(), sound_master.id());

            let (generator, frequency_gain) =
                build_frequency_layer(ctx, sound_master.id(), &config, volume * FREQUENCY_LAYER_RATIO);

            source.sound_master = Some(sound_master);
            source.noise = Some(noise);
            source.audio_gain = Some(gain);
            source.frequency = Some(generator);
            source.frequency_gain = Some(frequency_gain);
        }
        SoundKind::CosmicAmbience => {
            let mut cosmic = CosmicAmbienceGenerator::new(ctx, StdRng::seed_from_u64(rng.gen()));
            let gain = ctx.create_gain(volume);
            ctx.connect(cosmic.output(), gain.id());
            ctx.connect(gain.id(), master);
            cosmic.start(ctx)?;
            source.cosmic = Some(cosmic);
            source.audio_gain = Some(gain);
        }
        SoundKind::FileLoop { .. } | SoundKind::FileWithFrequency { .. } => {
            return Err(EngineError::InvalidState {
                reason: "file sounds are built once decoded",
            })
        }
    }
    start_layers(ctx, source)
}

/// Build the graph of a decoded file sound.
fn build_file_graph(
    ctx: &mut AudioContext,
    master: NodeId,
    source: &mut AudioSource,
    buffer: Arc<AudioBuffer>,
) -> Result<()> {
    let now = ctx.current_time();
    let volume = source.volume;
    source.loading = false;

    match source.sound.kind.clone() {
        SoundKind::FileLoop { .. } => {
            let gain = ctx.create_gain(volume);
            ctx.connect(gain.id(), master);
            let mut file = ctx.create_buffer_source(buffer, true);
            ctx.connect(file.id(), gain.id());
            source.audio_gain = Some(gain);
            file.start(now)?;
            source.file = Some(file);
        }
        SoundKind::FileWithFrequency { config, .. } => {
            let sound_master = ctx.create_gain(1.0);
            ctx.connect(sound_master.id(), master);

            let mut gain = ctx.create_gain(0.0);
            gain.set_value_at_time(0.0, now);
            gain.linear_ramp_to_value_at_time(volume, now + FILE_FADE_IN);
            ctx.connect(gain.id(), sound_master.id());

            let mut file = ctx.create_buffer_source(buffer, true);
            ctx.connect(file.id(), gain.id());

            let (generator, frequency_gain) =
                build_frequency_layer(ctx, sound_master.id(), &config, volume * FREQUENCY_LAYER_RATIO);

            source.sound_master = Some(sound_master);
            source.audio_gain = Some(gain);
            source.frequency = Some(generator);
            source.frequency_gain = Some(frequency_gain);
            file.start(now)?;
            source.file = Some(file);
            start_layers(ctx, source)?;
        }
        _ => {
            return Err(EngineError::InvalidState {
                reason: "decoded audio for a sound without a file",
            })
        }
    }
    Ok(())
}
