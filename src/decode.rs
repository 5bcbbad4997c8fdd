//! Fetching and decoding audio files

use std::io::Cursor;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

use crate::error::{EngineError, Result};
use crate::nodes::AudioBuffer;

/// Resolves a sound's URL to the raw bytes of an encoded audio file.
pub trait AssetLoader: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Loads URLs like `/sounds/rain.mp3` relative to a root directory.
#[derive(Clone, Debug)]
pub struct FsLoader {
    root: PathBuf,
}

impl FsLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, url: &str) -> PathBuf {
        self.root.join(url.trim_start_matches('/'))
    }
}

impl AssetLoader for FsLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let path = self.resolve(url);
        trace!(path = %path.display(), "reading audio asset");
        std::fs::read(&path).map_err(|source| EngineError::Fetch {
            url: url.to_owned(),
            source,
        })
    }
}

/// Serves assets from memory, keyed by URL.
#[derive(Clone, Debug, Default)]
pub struct MemoryLoader {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.insert(url, bytes);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.assets.insert(url.into(), bytes);
    }
}

impl AssetLoader for MemoryLoader {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.assets.get(url).cloned().ok_or_else(|| EngineError::Fetch {
            url: url.to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such asset"),
        })
    }
}

/// Fetch and decode `url`, resampled to `sample_rate`.
pub fn load_audio(loader: &dyn AssetLoader, url: &str, sample_rate: u32) -> Result<AudioBuffer> {
    let bytes = loader.fetch(url)?;
    decode_audio(url, bytes, sample_rate)
}

/// Decode an encoded file (mp3, ogg/vorbis, flac, wav) to stereo at `sample_rate`.
///
/// Mono files are duplicated to both channels; channels past the second are dropped.
pub fn decode_audio(url: &str, bytes: Vec<u8>, sample_rate: u32) -> Result<AudioBuffer> {
    let decode_err = |reason: String| EngineError::Decode {
        url: url.to_owned(),
        reason,
    };

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = Path::new(url).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_err(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| decode_err("no audio track".into()))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let source_rate = codec_params.sample_rate.unwrap_or(44_100);

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(e.to_string()))?;

    let mut left = Vec::new();
    let mut right = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_err(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(reason)) => {
                trace!(reason, "skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(decode_err(e.to_string())),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        for frame in sample_buf.samples().chunks_exact(channels) {
            left.push(frame[0]);
            right.push(frame[if channels > 1 { 1 } else { 0 }]);
        }
    }

    if left.is_empty() {
        return Err(EngineError::EmptyAudio { url: url.to_owned() });
    }

    let (left, right) = if source_rate == sample_rate {
        (left, right)
    } else {
        (
            resample_linear(&left, source_rate, sample_rate),
            resample_linear(&right, source_rate, sample_rate),
        )
    };

    debug!(url, frames = left.len(), source_rate, sample_rate, "decoded audio");
    Ok(AudioBuffer::new(sample_rate, left, right))
}

/// Linear-interpolation resampling of one channel.
pub fn resample_linear(input: &[f32], src_rate: u32, dst_rate: u32) -> Vec<f32> {
    if src_rate == dst_rate || input.is_empty() {
        return input.to_vec();
    }
    let frames = input.len();
    let duration = frames as f64 / src_rate as f64;
    let out_frames = ((duration * dst_rate as f64).round() as usize).max(1);

    (0..out_frames)
        .map(|i| {
            let pos = i as f64 * src_rate as f64 / dst_rate as f64;
            let idx = (pos.floor() as usize).min(frames - 1);
            let frac = pos - idx as f64;
            let next = if idx + 1 < frames { idx + 1 } else { idx };
            ((1.0 - frac) * input[idx] as f64 + frac * input[next] as f64) as f32
        })
        .collect()
}
