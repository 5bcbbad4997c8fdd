//! Built-in audio nodes.
//!
//! Nodes are organized into three categories:
//!
//! ## Sources ([`source`])
//!
//! Generate audio with no audio inputs:
//! - [`Oscillator`] - Sine oscillator with automatable frequency and scheduled start/stop
//! - [`BufferSource`] - Play a decoded [`AudioBuffer`] once or looped
//!
//! ## Effects ([`effect`])
//!
//! Process audio (inputs → outputs):
//! - [`Gain`] - Automatable gain with optional left/right routing
//! - [`ChannelMerger`] - Sum inputs into one stereo signal
//!
//! ## Sinks ([`sink`])
//!
//! Consume audio with no audio outputs:
//! - [`Destination`] - Interleave the final mix into a ring buffer
//! - [`CpalOutput`] - Play that ring buffer on a system device (requires `cpal_sink` feature)
//!
//! Each node with parameters comes with a control-side handle
//! ([`OscillatorHandle`], [`BufferSourceHandle`], [`GainHandle`]) returned by
//! the matching [`AudioContext`](crate::AudioContext) constructor.

pub mod source;
pub mod effect;
pub mod sink;

pub use source::{AudioBuffer, BufferSource, BufferSourceHandle, BufferSourceMessage, Oscillator, OscillatorHandle, OscillatorMessage};
pub use effect::{ChannelMerger, ChannelRoute, Gain, GainHandle, GainMessage};
pub use sink::Destination;

#[cfg(feature = "cpal_sink")]
pub use sink::CpalOutput;

use dasp_graph::Input;

/// Sum every input into a stereo pair, upmixing mono inputs to both sides.
pub(crate) fn sum_stereo(inputs: &[Input], left: &mut [f32], right: &mut [f32]) {
    left.iter_mut().for_each(|s| *s = 0.0);
    right.iter_mut().for_each(|s| *s = 0.0);

    for input in inputs {
        let buffers = input.buffers();
        let Some(first) = buffers.first() else {
            continue;
        };
        let second = buffers.get(1).unwrap_or(first);

        for (out, s) in left.iter_mut().zip(first.iter()) {
            *out += *s;
        }
        for (out, s) in right.iter_mut().zip(second.iter()) {
            *out += *s;
        }
    }
}
