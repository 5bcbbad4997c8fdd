//! Signal generators.
//!
//! Each generator owns a small sub-graph inside an [`AudioContext`] and
//! exposes one output node for the caller to connect. All of them follow the
//! same lifecycle: construct (nodes are created and wired), [`start`],
//! [`stop`] (fades out on the audio clock), [`dispose`] (removes the nodes).
//!
//! [`start`]: SignalOutput::start
//! [`stop`]: SignalOutput::stop
//! [`dispose`]: SignalOutput::dispose

mod carrier;
mod cosmic;
mod frequency;
mod isochronic;
mod noise;

pub use carrier::CarrierLayer;
pub use cosmic::{CosmicAmbienceGenerator, CosmicState, COSMIC_STATES};
pub use frequency::FrequencySignalGenerator;
pub use isochronic::IsochronicLayer;
pub use noise::WhiteNoiseGenerator;

use crate::context::AudioContext;
use crate::error::Result;
use crate::node::NodeId;

/// Fade-in and fade-out length of the short-lived layers, in seconds
pub const LAYER_FADE: f64 = 0.05;

/// Extra time after a fade before a source is halted
pub const STOP_MARGIN: f64 = 0.01;

/// Anything producing a connectable audio output.
pub trait SignalOutput {
    /// Begin producing sound. Starting an already playing generator does nothing.
    fn start(&mut self, ctx: &mut AudioContext) -> Result<()>;

    /// Fade out and schedule the sources to halt. Stopping twice does nothing.
    fn stop(&mut self, ctx: &mut AudioContext);

    fn set_volume(&mut self, ctx: &mut AudioContext, volume: f32);

    /// Stop, then remove every node this generator created.
    fn dispose(&mut self, ctx: &mut AudioContext);

    /// The node to connect downstream
    fn output(&self) -> NodeId;

    fn is_playing(&self) -> bool;

    /// Periodic host tick for self-rescheduling work.
    fn tick(&mut self, _ctx: &mut AudioContext) {}
}
