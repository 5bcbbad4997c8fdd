//! Channel merger - sums inputs into one stereo signal

use dasp_graph::{Buffer, Input};

use crate::node::{AudioNode, ProcessContext};
use crate::nodes::sum_stereo;

/// Sums any number of inputs into a stereo output.
///
/// Channel placement is decided upstream by each input's [`ChannelRoute`](super::ChannelRoute).
#[derive(Default)]
pub struct ChannelMerger;

impl ChannelMerger {
    pub fn new() -> Self {
        Self
    }
}

impl AudioNode for ChannelMerger {
    type Message = ();

    fn process(
        &mut self,
        _ctx: &ProcessContext,
        _messages: impl Iterator<Item = Self::Message>,
        inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        if outputs.len() < 2 {
            return;
        }
        let (left, right) = outputs.split_at_mut(1);
        sum_stereo(inputs, &mut left[0], &mut right[0]);
    }

    fn num_inputs(&self) -> usize {
        // Accept any number of inputs
        usize::MAX
    }

    fn num_outputs(&self) -> usize { 2 }
}
