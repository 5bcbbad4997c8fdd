//! Audio graph - owns nodes and message queues

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dasp_graph::{Buffer, Input, NodeData, Processor};
use hashbrown::HashMap;
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::node::{AudioNode, NodeId, ProcessContext};

/// Internal handle to send messages to a node in an AudioGraph
pub(crate) struct NodeHandle<M: Send + 'static> {
    pub(crate) id: NodeId,
    pub(crate) sender: Producer<M>,
    pub(crate) _marker: PhantomData<M>,
}

// Type-erased wrapper so we can store heterogeneous nodes
trait ErasedNode: Send {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]);
}

struct NodeWrapper<N: AudioNode> {
    node: N,
    receiver: Consumer<N::Message>,
}

impl<N: AudioNode> ErasedNode for NodeWrapper<N> {
    fn process_erased(&mut self, ctx: &ProcessContext, inputs: &[Input], outputs: &mut [Buffer]) {
        // Split borrow to avoid conflict between receiver and node
        let receiver = &mut self.receiver;
        let node = &mut self.node;

        let messages = std::iter::from_fn(|| receiver.pop().ok());
        node.process(ctx, messages, inputs, outputs);
    }
}

// Adapter for dasp_graph
struct DaspAdapter {
    node: Box<dyn ErasedNode>,
    sample_rate: u32,
    clock: Arc<AtomicU64>,
}

impl dasp_graph::Node for DaspAdapter {
    fn process(&mut self, inputs: &[Input], outputs: &mut [Buffer]) {
        let ctx = ProcessContext {
            sample_rate: self.sample_rate,
            buffer_size: Buffer::LEN,
            frame: self.clock.load(Ordering::Relaxed),
        };
        self.node.process_erased(&ctx, inputs, outputs);
    }
}

type InnerGraph = StableGraph<NodeData<DaspAdapter>, ()>;

/// An audio processing graph at a fixed sample rate.
///
/// Backed by a stable graph so removing one node never invalidates the
/// indices of the others.
pub(crate) struct AudioGraph {
    graph: InnerGraph,
    processor: Processor<InnerGraph>,
    sample_rate: u32,
    /// Frame index of the next block; shared with every node adapter
    clock: Arc<AtomicU64>,

    node_indices: HashMap<NodeId, NodeIndex>,
    next_node_id: u32,

    terminal: Option<NodeIndex>,
}

impl AudioGraph {
    /// Create a new graph with the given sample rate
    pub fn new(sample_rate: u32) -> Self {
        Self {
            graph: InnerGraph::with_capacity(64, 64),
            processor: Processor::with_capacity(64),
            sample_rate,
            clock: Arc::new(AtomicU64::new(0)),
            node_indices: HashMap::new(),
            next_node_id: 0,
            terminal: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.clock.load(Ordering::Relaxed)
    }

    /// Add a node with a custom message queue size
    pub fn add_with_queue_size<N: AudioNode>(&mut self, node: N, queue_size: usize) -> NodeHandle<N::Message> {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;

        let (producer, consumer) = RingBuffer::new(queue_size);

        let num_outputs = node.num_outputs();
        let wrapper = NodeWrapper { node, receiver: consumer };
        let adapter = DaspAdapter {
            node: Box::new(wrapper),
            sample_rate: self.sample_rate,
            clock: Arc::clone(&self.clock),
        };

        let node_data = match num_outputs {
            1 => NodeData::new1(adapter),
            2 => NodeData::new2(adapter),
            // 0 outputs = sink, but dasp_graph still needs a buffer for inputs
            _ => NodeData::new1(adapter),
        };

        let idx = self.graph.add_node(node_data);
        self.node_indices.insert(id, idx);

        NodeHandle {
            id,
            sender: producer,
            _marker: PhantomData,
        }
    }

    /// Connect output of `from` to input of `to`.
    ///
    /// Returns false when either node no longer exists.
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> bool {
        match (self.node_indices.get(&from), self.node_indices.get(&to)) {
            (Some(&from_idx), Some(&to_idx)) => {
                self.graph.add_edge(from_idx, to_idx, ());
                true
            }
            _ => false,
        }
    }

    /// Remove every outgoing connection of `node`, returning how many were removed.
    pub fn disconnect(&mut self, node: NodeId) -> usize {
        let Some(&idx) = self.node_indices.get(&node) else {
            return 0;
        };

        let targets: Vec<NodeIndex> = self.graph.neighbors_directed(idx, Direction::Outgoing).collect();
        let mut removed = 0;
        for target in targets {
            while let Some(edge) = self.graph.find_edge(idx, target) {
                self.graph.remove_edge(edge);
                removed += 1;
            }
        }
        removed
    }

    /// Remove a node and all of its connections. Returns false if it was already gone.
    pub fn remove(&mut self, node: NodeId) -> bool {
        match self.node_indices.remove(&node) {
            Some(idx) => {
                if self.terminal == Some(idx) {
                    self.terminal = None;
                }
                self.graph.remove_node(idx).is_some()
            }
            None => false,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.node_indices.contains_key(&node)
    }

    /// Number of connections feeding into `node`
    pub fn input_count(&self, node: NodeId) -> usize {
        self.node_indices
            .get(&node)
            .map(|&idx| self.graph.neighbors_directed(idx, Direction::Incoming).count())
            .unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        self.node_indices.len()
    }

    /// Set which node to process to (typically a sink)
    pub fn set_terminal(&mut self, node: NodeId) {
        self.terminal = self.node_indices.get(&node).copied();
    }

    /// Process one block of audio through the graph and advance the clock
    pub fn process(&mut self) {
        if let Some(terminal) = self.terminal {
            self.processor.process(&mut self.graph, terminal);
        }
        self.clock.fetch_add(Buffer::LEN as u64, Ordering::Relaxed);
    }
}
