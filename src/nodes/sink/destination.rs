//! Context destination - interleaves the final mix into a ring buffer

use dasp_graph::{Buffer, Input};
use rtrb::Producer;

use crate::node::{AudioNode, ProcessContext};
use crate::nodes::sum_stereo;

/// The terminal node of every [`AudioContext`](crate::AudioContext).
///
/// Sums its inputs to stereo and pushes interleaved `[L, R, L, R, ...]`
/// samples to an rtrb producer. Whoever holds the consumer plays them: a
/// [`CpalOutput`](super::CpalOutput), a file writer, or a test.
pub struct Destination {
    producer: Producer<f32>,
    left: Buffer,
    right: Buffer,
}

impl Destination {
    pub fn new(producer: Producer<f32>) -> Self {
        Self {
            producer,
            left: Buffer::SILENT,
            right: Buffer::SILENT,
        }
    }

    /// Returns how many sample slots are available
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }
}

impl AudioNode for Destination {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = ()>,
        inputs: &[Input],
        _outputs: &mut [Buffer],
    ) {
        let samples_needed = Buffer::LEN * 2;

        // Skip if buffer is full
        if self.producer.slots() < samples_needed {
            return;
        }

        sum_stereo(inputs, &mut self.left, &mut self.right);

        for i in 0..Buffer::LEN {
            let _ = self.producer.push(self.left[i]);
            let _ = self.producer.push(self.right[i]);
        }
    }

    #[inline]
    fn num_inputs(&self) -> usize { usize::MAX }

    #[inline]
    fn num_outputs(&self) -> usize { 0 }
}
