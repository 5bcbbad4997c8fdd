use std::io::Cursor;

use approx::assert_abs_diff_eq;
use drift::decode::{decode_audio, load_audio, resample_linear};
use drift::{AssetLoader, EngineError, FsLoader, MemoryLoader};

fn wav(channels: u16, rate: u32, frames: usize, sample: impl Fn(usize, u16) -> f32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            for ch in 0..channels {
                writer.write_sample(sample(i, ch)).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

#[test]
fn stereo_wav_keeps_its_channels() {
    let bytes = wav(2, 8000, 1000, |_, ch| if ch == 0 { 0.25 } else { -0.5 });
    let buffer = decode_audio("/sounds/stereo.wav", bytes, 8000).unwrap();

    assert_eq!(buffer.sample_rate(), 8000);
    assert_eq!(buffer.len(), 1000);
    assert_abs_diff_eq!(buffer.duration_secs(), 0.125);
    assert!(buffer.left().iter().all(|&s| s == 0.25));
    assert!(buffer.right().iter().all(|&s| s == -0.5));
}

#[test]
fn mono_wav_is_copied_to_both_channels() {
    let bytes = wav(1, 8000, 800, |i, _| i as f32 / 800.0);
    let buffer = decode_audio("/sounds/mono.wav", bytes, 8000).unwrap();
    assert_eq!(buffer.left(), buffer.right());
    assert_abs_diff_eq!(buffer.left()[400], 0.5);
}

#[test]
fn decoding_resamples_to_the_context_rate() {
    let bytes = wav(1, 16000, 16000, |_, _| 0.1);
    let buffer = decode_audio("/sounds/fast.wav", bytes, 8000).unwrap();
    assert_eq!(buffer.sample_rate(), 8000);
    assert_eq!(buffer.len(), 8000);
    assert_abs_diff_eq!(buffer.left()[1234], 0.1);
}

#[test]
fn garbage_and_empty_files_are_errors() {
    assert!(matches!(
        decode_audio("/sounds/junk.mp3", vec![0x42; 128], 8000),
        Err(EngineError::Decode { .. })
    ));

    let empty = wav(1, 8000, 0, |_, _| 0.0);
    assert!(matches!(
        decode_audio("/sounds/empty.wav", empty, 8000),
        Err(EngineError::EmptyAudio { .. } | EngineError::Decode { .. })
    ));
}

#[test]
fn linear_resampling_interpolates() {
    let up = resample_linear(&[0.0, 1.0, 0.0], 1, 2);
    assert_eq!(up.len(), 6);
    assert_abs_diff_eq!(up[1], 0.5);
    assert_abs_diff_eq!(up[2], 1.0);
    assert_abs_diff_eq!(up[3], 0.5);

    let same = resample_linear(&[0.3, 0.4], 44100, 44100);
    assert_eq!(same, vec![0.3, 0.4]);
}

#[test]
fn fs_loader_resolves_site_urls_under_its_root() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sounds")).unwrap();
    let bytes = wav(1, 8000, 80, |_, _| 0.2);
    std::fs::write(dir.path().join("sounds/tone.wav"), &bytes).unwrap();

    let loader = FsLoader::new(dir.path());
    assert_eq!(loader.resolve("/sounds/tone.wav"), dir.path().join("sounds/tone.wav"));
    assert_eq!(loader.fetch("/sounds/tone.wav").unwrap(), bytes);

    let buffer = load_audio(&loader, "/sounds/tone.wav", 8000).unwrap();
    assert_eq!(buffer.len(), 80);

    assert!(matches!(loader.fetch("/sounds/nope.wav"), Err(EngineError::Fetch { .. })));
}

#[test]
fn memory_loader_serves_registered_assets() {
    let mut loader = MemoryLoader::new();
    loader.insert("/a.wav", vec![1, 2, 3]);
    assert_eq!(loader.fetch("/a.wav").unwrap(), vec![1, 2, 3]);
    assert!(matches!(loader.fetch("/b.wav"), Err(EngineError::Fetch { .. })));
}
