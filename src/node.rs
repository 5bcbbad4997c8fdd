//! Core node trait and context types.

use dasp_graph::{Buffer, Input};

/// Information available during audio processing.
///
/// Passed to every [`AudioNode::process`] call. Besides the graph's sample rate
/// and block size it carries the frame index of the block's first sample, so
/// nodes can evaluate parameter automation on the audio clock.
#[derive(Clone, Copy, Debug)]
pub struct ProcessContext {
    /// Sample rate of the graph in Hz (e.g., 44100, 48000)
    pub sample_rate: u32,
    /// Number of samples per buffer (always 64, the dasp_graph block size)
    pub buffer_size: usize,
    /// Frame index of the first sample in this block
    pub frame: u64,
}

impl ProcessContext {
    /// Audio-clock time of the first sample in this block, in seconds.
    #[inline]
    pub fn time(&self) -> f64 {
        self.frame as f64 / self.sample_rate as f64
    }

    /// Duration of one sample, in seconds.
    #[inline]
    pub fn sample_period(&self) -> f64 {
        1.0 / self.sample_rate as f64
    }

    /// Audio-clock time of sample `i` within this block.
    #[inline]
    pub fn time_of(&self, i: usize) -> f64 {
        (self.frame + i as u64) as f64 / self.sample_rate as f64
    }
}

/// Unique identifier for a node within a graph.
///
/// Ids are never reused, so a stale id simply stops resolving once its node is removed.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct NodeId(pub(crate) u32);

/// The core trait for audio processing nodes.
///
/// Nodes can be:
/// - **Sources**: Generate audio (0 inputs, 1+ outputs) - oscillators, buffer players
/// - **Effects**: Process audio (1+ inputs, 1+ outputs) - gain stages, mergers
/// - **Sinks**: Consume audio (1+ inputs, 0 outputs) - the context destination
///
/// # Message-Based Parameters
///
/// Instead of shared mutable state, nodes receive parameter updates via messages,
/// drained at the start of each block. Parameter changes that must land at a
/// precise moment are messages carrying audio-clock timestamps (see
/// [`ParamOp`](crate::param::ParamOp)), so delivery latency never shifts them.
pub trait AudioNode: Send + 'static {
    /// Message type for parameter updates.
    ///
    /// Use a custom enum for nodes with parameters, or `()` for nodes without.
    type Message: Send + 'static;

    /// Process one block of audio.
    ///
    /// 1. Drain and handle all pending messages
    /// 2. Read from `inputs` (if any)
    /// 3. Write to `outputs`
    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    );

    /// Number of audio input channels (0 for sources).
    fn num_inputs(&self) -> usize { 0 }

    /// Number of audio output channels.
    fn num_outputs(&self) -> usize { 1 }
}
