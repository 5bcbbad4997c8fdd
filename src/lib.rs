//! Drift - a layered ambient sound engine
//!
//! Plays sleep and relaxation soundscapes built from a handful of signal
//! types, any number of them at once:
//!
//! - binaural carrier pairs and isochronic pulse trains ([`FrequencySignalGenerator`])
//! - generated white noise ([`WhiteNoiseGenerator`])
//! - a slowly drifting generative ambience ([`CosmicAmbienceGenerator`])
//! - looped audio files, optionally over a frequency layer
//!
//! Everything runs on a message-passing node graph with a sample-accurate
//! audio clock ([`AudioContext`]). Parameters are automated the Web Audio way:
//! values and linear ramps scheduled at absolute clock times.
//!
//! The [`AudioEngine`] is the entry point for applications:
//!
//! ```
//! use drift::{AudioEngine, EngineConfig, SoundCatalog};
//!
//! let mut engine = AudioEngine::new(EngineConfig::default().with_sample_rate(8000));
//! let catalog = SoundCatalog::builtin();
//! engine.play_sound(catalog.get("deep-sleep").unwrap(), 0.8).unwrap();
//! engine.render(1.0);
//! assert_eq!(engine.get_active_sounds(), vec!["deep-sleep".to_string()]);
//! ```

pub mod catalog;
pub mod config;
pub mod context;
pub mod decode;
pub mod engine;
pub mod error;
pub mod generators;
mod graph;
pub mod node;
pub mod nodes;
pub mod param;
pub mod sound;

pub use catalog::SoundCatalog;
pub use config::EngineConfig;
pub use context::{AudioContext, ContextState, Handle};
pub use decode::{AssetLoader, FsLoader, MemoryLoader};
pub use engine::{AudioEngine, EngineEvent, GainStage, SourceInfo, FREQUENCY_LAYER_RATIO};
pub use error::{EngineError, Result};
pub use generators::{
    CarrierLayer, CosmicAmbienceGenerator, CosmicState, FrequencySignalGenerator, IsochronicLayer, SignalOutput,
    WhiteNoiseGenerator, COSMIC_STATES,
};
pub use node::{AudioNode, NodeId, ProcessContext};
pub use param::{Automation, ParamEvent, ParamOp};
pub use sound::{
    CarrierLayerConfig, Category, FrequencySignalConfig, IsochronicLayerConfig, SoundConfig, SoundDescriptor,
    SoundKind,
};
