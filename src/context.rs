//! The output context: graph, audio clock and lifecycle state

use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;

use rtrb::{Consumer, RingBuffer};
use tracing::{debug, trace, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::AudioGraph;
use crate::node::{AudioNode, NodeId};
use crate::nodes::{
    AudioBuffer, BufferSource, BufferSourceHandle, ChannelMerger, ChannelRoute, Destination, Gain, GainHandle,
    Oscillator, OscillatorHandle,
};

/// A handle for sending messages to a node in an [`AudioContext`].
///
/// Messages are buffered in a lock-free ring buffer and processed at the start
/// of each audio block. If the buffer is full, [`Handle::send`] returns `Err(msg)`
/// with the message that couldn't be sent.
pub struct Handle<M: Send + 'static> {
    pub(crate) node_id: NodeId,
    pub(crate) sender: rtrb::Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

impl<M: Send + 'static> Handle<M> {
    #[inline]
    pub fn id(&self) -> NodeId {
        self.node_id
    }

    /// Send a message to the node.
    ///
    /// The message will be processed at the start of the next audio block.
    pub fn send(&mut self, msg: M) -> std::result::Result<(), M> {
        self.sender.push(msg).map_err(|rtrb::PushError::Full(m)| m)
    }

    pub(crate) fn send_or_warn(&mut self, msg: M) {
        if self.send(msg).is_err() {
            warn!(node = ?self.node_id, "message queue full, message dropped");
        }
    }
}

/// Lifecycle state of an [`AudioContext`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextState {
    Running,
    Suspended,
    Closed,
}

/// The output context.
///
/// Owns the node graph and the audio clock. Time only advances when blocks are
/// rendered, and blocks are only rendered while the context is running, the
/// way a browser `AudioContext` stops its clock when suspended.
///
/// ```
/// use drift::AudioContext;
///
/// let mut ctx = AudioContext::new(8000);
/// let mut osc = ctx.create_oscillator(440.0);
/// let gain = ctx.create_gain(0.5);
/// ctx.connect(osc.id(), gain.id());
/// ctx.connect(gain.id(), ctx.destination());
///
/// osc.start(0.0);
/// ctx.render(0.5);
/// assert!(ctx.current_time() >= 0.5);
/// ```
pub struct AudioContext {
    graph: AudioGraph,
    queue_size: usize,
    state: ContextState,
    state_changes: VecDeque<ContextState>,
    destination: NodeId,
    output: Option<Consumer<f32>>,
}

impl AudioContext {
    /// A running context with default buffer sizes.
    pub fn new(sample_rate: u32) -> Self {
        let config = EngineConfig::default();
        Self::build(sample_rate, config.output_buffer_frames, config.message_queue_size)
    }

    /// Build a context from an engine configuration.
    ///
    /// Fails with [`EngineError::Config`] when the configuration is invalid.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut ctx = Self::build(config.sample_rate, config.output_buffer_frames, config.message_queue_size);
        if config.start_suspended {
            ctx.state = ContextState::Suspended;
        }
        Ok(ctx)
    }

    fn build(sample_rate: u32, output_buffer_frames: usize, queue_size: usize) -> Self {
        let mut graph = AudioGraph::new(sample_rate);
        let (producer, consumer) = RingBuffer::<f32>::new(output_buffer_frames * 2);
        let destination = graph.add_with_queue_size(Destination::new(producer), 1).id;
        graph.set_terminal(destination);

        Self {
            graph,
            queue_size,
            state: ContextState::Running,
            state_changes: VecDeque::new(),
            destination,
            output: Some(consumer),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.graph.sample_rate()
    }

    /// Audio-clock time in seconds
    pub fn current_time(&self) -> f64 {
        self.graph.frames() as f64 / self.graph.sample_rate() as f64
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn destination(&self) -> NodeId {
        self.destination
    }

    /// Take the interleaved stereo output stream. Only the first call returns it.
    pub fn take_output(&mut self) -> Option<Consumer<f32>> {
        self.output.take()
    }

    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            ContextState::Closed => Err(EngineError::ContextClosed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                self.set_state(ContextState::Running);
                Ok(())
            }
        }
    }

    /// Suspend rendering, as a host does when it backgrounds the page.
    pub fn suspend(&mut self) -> Result<()> {
        match self.state {
            ContextState::Closed => Err(EngineError::ContextClosed),
            ContextState::Suspended => Ok(()),
            ContextState::Running => {
                self.set_state(ContextState::Suspended);
                Ok(())
            }
        }
    }

    pub fn close(&mut self) {
        if self.state != ContextState::Closed {
            self.set_state(ContextState::Closed);
        }
    }

    fn set_state(&mut self, state: ContextState) {
        debug!(from = ?self.state, to = ?state, "context state change");
        self.state = state;
        self.state_changes.push_back(state);
    }

    /// Drain the state changes observed since the last call.
    pub fn take_state_changes(&mut self) -> Vec<ContextState> {
        self.state_changes.drain(..).collect()
    }

    /// Add a node to the graph, returning a handle for connections and messages.
    pub fn add<N: AudioNode>(&mut self, node: N) -> Handle<N::Message> {
        let handle = self.graph.add_with_queue_size(node, self.queue_size);
        Handle {
            node_id: handle.id,
            sender: handle.sender,
            _marker: PhantomData,
        }
    }

    pub fn create_oscillator(&mut self, frequency: f32) -> OscillatorHandle {
        let handle = self.add(Oscillator::new(frequency));
        OscillatorHandle::new(handle, frequency)
    }

    pub fn create_gain(&mut self, gain: f32) -> GainHandle {
        let handle = self.add(Gain::new(gain));
        GainHandle::new(handle, gain)
    }

    /// A gain stage that writes only to the given side of the stereo field.
    pub fn create_routed_gain(&mut self, gain: f32, route: ChannelRoute) -> GainHandle {
        let handle = self.add(Gain::new(gain).routed(route));
        GainHandle::new(handle, gain)
    }

    pub fn create_merger(&mut self) -> Handle<()> {
        self.add(ChannelMerger::new())
    }

    pub fn create_buffer_source(&mut self, buffer: Arc<AudioBuffer>, looping: bool) -> BufferSourceHandle {
        let source = BufferSource::new(buffer).looping(looping);
        let ended = source.ended_flag();
        let handle = self.add(source);
        BufferSourceHandle::new(handle, ended)
    }

    /// Connect output of `from` to input of `to`.
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        if !self.graph.connect(from, to) {
            warn!(?from, ?to, "connect on a removed node ignored");
        }
    }

    /// Remove every outgoing connection of `node`. Disconnecting twice is harmless.
    pub fn disconnect(&mut self, node: NodeId) {
        let removed = self.graph.disconnect(node);
        if removed == 0 {
            trace!(?node, "disconnect with no outgoing connections");
        }
    }

    /// Drop a node and all its connections. Removing twice is harmless.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.destination {
            warn!("refusing to remove the context destination");
            return;
        }
        if !self.graph.remove(node) {
            trace!(?node, "node already removed");
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.graph.contains(node)
    }

    /// Number of live connections feeding into `node`
    pub fn input_count(&self, node: NodeId) -> usize {
        self.graph.input_count(node)
    }

    /// Number of nodes in the graph, destination included
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Render one 64-frame block. Returns false (and leaves the clock alone)
    /// unless the context is running.
    pub fn render_block(&mut self) -> bool {
        if self.state != ContextState::Running {
            return false;
        }
        self.graph.process();
        true
    }

    /// Render at least `secs` seconds of audio. Returns the number of blocks rendered.
    pub fn render(&mut self, secs: f64) -> u64 {
        let blocks = (secs * self.sample_rate() as f64 / dasp_graph::Buffer::LEN as f64).ceil() as u64;
        let mut rendered = 0;
        for _ in 0..blocks {
            if !self.render_block() {
                break;
            }
            rendered += 1;
        }
        rendered
    }
}
