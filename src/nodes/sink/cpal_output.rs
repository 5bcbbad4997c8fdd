//! CPAL audio output for a context's destination ring buffer

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SupportedStreamConfig};
use rtrb::Consumer;
use tracing::{error, info};

use crate::error::{EngineError, Result};

/// Plays interleaved stereo samples from a [`Destination`](super::Destination)
/// on a CPAL device.
///
/// The CPAL stream runs on its own thread and lives until this value is dropped.
pub struct CpalOutput {
    name: String,
    sample_rate: u32,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl CpalOutput {
    /// Sample rate of the default output device, if there is one.
    pub fn default_sample_rate() -> Option<u32> {
        let device = cpal::default_host().default_output_device()?;
        let config = device.default_output_config().ok()?;
        Some(config.sample_rate().0)
    }

    /// Start playing `consumer` on the default output device.
    pub fn open_default(consumer: Consumer<f32>) -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| EngineError::ContextUnavailable {
                reason: "no default output device".into(),
            })?;
        let config = device
            .default_output_config()
            .map_err(|e| EngineError::ContextUnavailable { reason: e.to_string() })?;
        Self::open(device, config, consumer)
    }

    pub fn open(device: cpal::Device, config: SupportedStreamConfig, consumer: Consumer<f32>) -> Result<Self> {
        let name = device.name().unwrap_or_else(|_| "Unknown".into());
        let sample_format = config.sample_format();
        let stream_config = config.config();
        let sample_rate = stream_config.sample_rate.0;

        let samples_consumed = Arc::new(AtomicUsize::new(0));
        let had_underrun = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);

        let consumed = Arc::clone(&samples_consumed);
        let underrun = Arc::clone(&had_underrun);
        let stop = Arc::clone(&shutdown);

        // Streams are not Send on every platform, so the stream is built and
        // kept on its own thread.
        let thread = std::thread::spawn(move || {
            let stream = build_stream(&device, sample_format, &stream_config, consumer, consumed, underrun)
                .map_err(|e| e.to_string())
                .and_then(|stream| stream.play().map(|_| stream).map_err(|e| e.to_string()));

            match stream {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    while !stop.load(Ordering::Acquire) {
                        std::thread::park();
                    }
                    drop(stream);
                }
                Err(reason) => {
                    let _ = ready_tx.send(Err(reason));
                }
            }
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(reason)) => return Err(EngineError::ContextUnavailable { reason }),
            Err(_) => {
                return Err(EngineError::ContextUnavailable {
                    reason: "output thread exited before the stream started".into(),
                })
            }
        }

        info!(device = %name, sample_rate, "output stream started");

        Ok(Self {
            name,
            sample_rate,
            samples_consumed,
            had_underrun,
            shutdown,
            thread: Some(thread),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns how many samples have been played
    #[inline]
    pub fn samples_consumed(&self) -> usize {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.had_underrun.swap(false, Ordering::Relaxed)
    }
}

impl Drop for CpalOutput {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: SampleFormat,
    stream_config: &cpal::StreamConfig,
    mut consumer: Consumer<f32>,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
) -> std::result::Result<cpal::Stream, cpal::BuildStreamError> {
    let channels = stream_config.channels as usize;

    // The destination always produces stereo frames; map them onto the device layout.
    let mut next_frame = move |underrun: &mut bool| -> (f32, f32) {
        if consumer.slots() < 2 {
            *underrun = true;
            return (0.0, 0.0);
        }
        let l = consumer.pop().unwrap_or(0.0);
        let r = consumer.pop().unwrap_or(0.0);
        (l, r)
    };

    macro_rules! output_stream {
        ($t:ty, $convert:expr) => {
            device.build_output_stream(
                stream_config,
                move |data: &mut [$t], _| {
                    let mut underrun = false;
                    for frame in data.chunks_mut(channels.max(1)) {
                        let (l, r) = next_frame(&mut underrun);
                        for (ch, sample) in frame.iter_mut().enumerate() {
                            let s = match ch {
                                0 if channels == 1 => (l + r) * 0.5,
                                0 => l,
                                1 => r,
                                _ => 0.0,
                            };
                            *sample = $convert(s);
                        }
                    }
                    if underrun {
                        had_underrun.store(true, Ordering::Relaxed);
                    }
                    samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
                },
                |err| error!("CPAL stream error: {:?}", err),
                None,
            )
        };
    }

    match sample_format {
        SampleFormat::F32 => output_stream!(f32, |s: f32| s),
        SampleFormat::I16 => output_stream!(i16, |s: f32| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16),
        SampleFormat::U16 => {
            output_stream!(u16, |s: f32| ((s.clamp(-1.0, 1.0) + 1.0) * 0.5 * u16::MAX as f32) as u16)
        }
        _ => Err(cpal::BuildStreamError::StreamConfigNotSupported),
    }
}
