//! Stereo buffer playback

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dasp_graph::{Buffer, Input};

use crate::context::Handle;
use crate::error::{EngineError, Result};
use crate::node::{AudioNode, NodeId, ProcessContext};

/// Decoded planar stereo audio at a known sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl AudioBuffer {
    /// Build from two channels. The longer channel is truncated to the shorter one.
    pub fn new(sample_rate: u32, mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        Self { sample_rate, left, right }
    }

    pub fn from_mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        let right = samples.clone();
        Self::new(sample_rate, samples, right)
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Length in frames
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }
}

#[derive(Clone, Copy, Debug)]
pub enum BufferSourceMessage {
    Start(f64),
    Stop(f64),
}

/// Plays an [`AudioBuffer`] once or in a loop.
///
/// The buffer must already be at the graph's sample rate. Once playback stops,
/// either by reaching the end of a one-shot buffer or at the scheduled stop
/// time, the shared `ended` flag is raised.
pub struct BufferSource {
    buffer: Arc<AudioBuffer>,
    looping: bool,
    position: usize,
    start_at: Option<f64>,
    stop_at: Option<f64>,
    ended: Arc<AtomicBool>,
}

impl BufferSource {
    pub fn new(buffer: Arc<AudioBuffer>) -> Self {
        Self {
            buffer,
            looping: false,
            position: 0,
            start_at: None,
            stop_at: None,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub(crate) fn ended_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.ended)
    }

    fn finish(&mut self) {
        self.ended.store(true, Ordering::Release);
    }
}

impl AudioNode for BufferSource {
    type Message = BufferSourceMessage;

    fn process(
        &mut self,
        ctx: &ProcessContext,
        messages: impl Iterator<Item = BufferSourceMessage>,
        _inputs: &[Input],
        outputs: &mut [Buffer],
    ) {
        for msg in messages {
            match msg {
                BufferSourceMessage::Start(t) => self.start_at = Some(t),
                BufferSourceMessage::Stop(t) => self.stop_at = Some(t),
            }
        }

        for buffer in outputs.iter_mut() {
            buffer.iter_mut().for_each(|s| *s = 0.0);
        }
        if outputs.len() < 2 || self.ended.load(Ordering::Acquire) {
            return;
        }
        let Some(start_at) = self.start_at else {
            return;
        };

        let (left_out, right_out) = outputs.split_at_mut(1);
        let (left_out, right_out) = (&mut left_out[0], &mut right_out[0]);
        let frames = self.buffer.len();

        for i in 0..Buffer::LEN {
            let time = ctx.time_of(i);
            if time < start_at {
                continue;
            }
            if self.stop_at.is_some_and(|t| t <= time) {
                self.finish();
                return;
            }
            if self.position >= frames {
                if self.looping && frames > 0 {
                    self.position = 0;
                } else {
                    self.finish();
                    return;
                }
            }

            left_out[i] = self.buffer.left[self.position];
            right_out[i] = self.buffer.right[self.position];
            self.position += 1;
        }
    }

    #[inline]
    fn num_outputs(&self) -> usize { 2 }
}

/// Control-side handle for a [`BufferSource`].
///
/// Start and stop are one-shot, as with Web Audio buffer sources.
pub struct BufferSourceHandle {
    handle: Handle<BufferSourceMessage>,
    ended: Arc<AtomicBool>,
    started: bool,
    stopped: bool,
}

impl BufferSourceHandle {
    pub(crate) fn new(handle: Handle<BufferSourceMessage>, ended: Arc<AtomicBool>) -> Self {
        Self {
            handle,
            ended,
            started: false,
            stopped: false,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.handle.id()
    }

    pub fn start(&mut self, time: f64) -> Result<()> {
        if self.started {
            return Err(EngineError::InvalidState {
                reason: "buffer source already started",
            });
        }
        self.started = true;
        self.handle.send_or_warn(BufferSourceMessage::Start(time));
        Ok(())
    }

    pub fn stop(&mut self, time: f64) -> Result<()> {
        if !self.started || self.stopped || self.has_ended() {
            return Err(EngineError::NotPlaying);
        }
        self.stopped = true;
        self.handle.send_or_warn(BufferSourceMessage::Stop(time));
        Ok(())
    }

    /// True once playback has finished on the audio side
    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::Acquire)
    }
}
