//! Multi-layer frequency instrument

use tracing::debug;

use crate::context::AudioContext;
use crate::error::{EngineError, Result};
use crate::generators::{CarrierLayer, IsochronicLayer, SignalOutput};
use crate::node::NodeId;
use crate::nodes::GainHandle;
use crate::sound::FrequencySignalConfig;

/// An ordered set of [`CarrierLayer`]s and [`IsochronicLayer`]s behind one
/// master gain.
///
/// Layer indices follow the order of the config passed to
/// [`initialize`](Self::initialize) and stay fixed until the next initialize.
pub struct FrequencySignalGenerator {
    master: GainHandle,
    config: Option<FrequencySignalConfig>,
    carriers: Vec<CarrierLayer>,
    isochronics: Vec<IsochronicLayer>,
    playing: bool,
}

impl FrequencySignalGenerator {
    pub fn new(ctx: &mut AudioContext) -> Self {
        Self {
            master: ctx.create_gain(1.0),
            config: None,
            carriers: Vec::new(),
            isochronics: Vec::new(),
            playing: false,
        }
    }

    /// Replace every layer with the ones described by `config`.
    pub fn initialize(&mut self, ctx: &mut AudioContext, config: FrequencySignalConfig) {
        self.dispose_layers(ctx);

        let master = self.master.id();
        self.carriers = config
            .carrier_layers
            .iter()
            .map(|layer| {
                let layer = CarrierLayer::new(ctx, layer.clone());
                ctx.connect(layer.output(), master);
                layer
            })
            .collect();
        self.isochronics = config
            .isochronic_layers
            .iter()
            .map(|layer| {
                let layer = IsochronicLayer::new(ctx, layer.clone());
                ctx.connect(layer.output(), master);
                layer
            })
            .collect();

        debug!(
            name = %config.name,
            carriers = self.carriers.len(),
            isochronics = self.isochronics.len(),
            "frequency generator initialized"
        );
        self.config = Some(config);
    }

    pub fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// The live configuration, including any per-layer volume changes
    pub fn config(&self) -> Option<&FrequencySignalConfig> {
        self.config.as_ref()
    }

    pub fn carrier_layers(&self) -> &[CarrierLayer] {
        &self.carriers
    }

    pub fn isochronic_layers(&self) -> &[IsochronicLayer] {
        &self.isochronics
    }

    /// Out-of-range indices are ignored.
    pub fn set_carrier_layer_volume(&mut self, ctx: &mut AudioContext, index: usize, volume: f32) {
        let Some(layer) = self.carriers.get_mut(index) else {
            return;
        };
        layer.set_volume(ctx, volume);
        if let Some(entry) = self.config.as_mut().and_then(|c| c.carrier_layers.get_mut(index)) {
            entry.volume = volume;
        }
    }

    /// Out-of-range indices are ignored.
    pub fn set_isochronic_layer_volume(&mut self, ctx: &mut AudioContext, index: usize, volume: f32) {
        let Some(layer) = self.isochronics.get_mut(index) else {
            return;
        };
        layer.set_volume(ctx, volume);
        if let Some(entry) = self.config.as_mut().and_then(|c| c.isochronic_layers.get_mut(index)) {
            entry.volume = volume;
        }
    }

    /// Restore each layer's volume from `original`, matched by index.
    pub fn reset_to_defaults(&mut self, ctx: &mut AudioContext, original: &FrequencySignalConfig) {
        if self.config.is_none() {
            return;
        }
        for (index, layer) in original.carrier_layers.iter().enumerate() {
            self.set_carrier_layer_volume(ctx, index, layer.volume);
        }
        for (index, layer) in original.isochronic_layers.iter().enumerate() {
            self.set_isochronic_layer_volume(ctx, index, layer.volume);
        }
    }

    fn dispose_layers(&mut self, ctx: &mut AudioContext) {
        for mut layer in self.carriers.drain(..) {
            layer.dispose(ctx);
        }
        for mut layer in self.isochronics.drain(..) {
            layer.dispose(ctx);
        }
    }
}

impl SignalOutput for FrequencySignalGenerator {
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()> {
        if self.config.is_none() {
            return Err(EngineError::InvalidState {
                reason: "frequency generator must be initialized before starting",
            });
        }
        if self.playing {
            return Ok(());
        }

        for layer in self.carriers.iter_mut() {
            layer.start(ctx)?;
        }
        for layer in self.isochronics.iter_mut() {
            layer.start(ctx)?;
        }
        self.playing = true;
        Ok(())
    }

    fn stop(&mut self, ctx: &mut AudioContext) {
        if !self.playing {
            return;
        }
        for layer in self.carriers.iter_mut() {
            layer.stop(ctx);
        }
        for layer in self.isochronics.iter_mut() {
            layer.stop(ctx);
        }
        self.playing = false;
    }

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32) {
        self.master.set_now(volume, ctx.current_time());
    }

    fn dispose(&mut self, ctx: &mut AudioContext) {
        self.stop(ctx);
        self.dispose_layers(ctx);
        ctx.disconnect(self.master.id());
        ctx.remove(self.master.id());
        self.config = None;
    }

    fn output(&self) -> NodeId {
        self.master.id()
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn tick(&mut self, ctx: &mut AudioContext) {
        for layer in self.isochronics.iter_mut() {
            layer.tick(ctx);
        }
    }
}
