//! The sound catalog and its built-in frequency recipes.

use std::f32::consts::PI;
use std::path::Path;

use itertools::Itertools;

use crate::error::{EngineError, Result};
use crate::sound::{
    CarrierLayerConfig, Category, FrequencySignalConfig, IsochronicLayerConfig, SoundConfig, SoundDescriptor,
    SoundKind,
};

/// Built-in frequency recipes.
pub mod recipes {
    use super::*;

    fn carrier(left: f32, beat: f32, volume: f32, phase: f32) -> CarrierLayerConfig {
        CarrierLayerConfig::binaural(left, beat, volume).with_phase_offset(phase)
    }

    fn iso(frequency: f32, pulse_rate: f32, duty_cycle: f32, volume: f32) -> IsochronicLayerConfig {
        IsochronicLayerConfig {
            frequency,
            pulse_rate,
            duty_cycle,
            volume,
        }
    }

    fn recipe(
        name: &str,
        description: &str,
        beat: f32,
        carriers: Vec<CarrierLayerConfig>,
        isochronics: Vec<IsochronicLayerConfig>,
    ) -> FrequencySignalConfig {
        FrequencySignalConfig {
            name: name.into(),
            description: description.into(),
            target_beat_freq: beat,
            carrier_layers: carriers,
            isochronic_layers: isochronics,
        }
    }

    /// Delta, 2 Hz
    pub fn deep_sleep() -> FrequencySignalConfig {
        recipe(
            "Deep Sleep",
            "Delta waves for deep restorative sleep",
            2.0,
            vec![
                carrier(100.0, 2.0, 0.85, 0.0),
                carrier(150.0, 2.0, 0.70, PI / 4.0),
                carrier(200.0, 2.0, 0.60, PI / 2.0),
                carrier(250.0, 2.0, 0.55, PI / 3.0),
                carrier(300.0, 2.0, 0.50, PI),
            ],
            vec![iso(2.0, 2.0, 0.5, 0.30), iso(4.0, 2.0, 0.4, 0.20)],
        )
    }

    /// Theta, 5 Hz
    pub fn theta_sleep() -> FrequencySignalConfig {
        recipe(
            "Theta Sleep",
            "Theta waves for light sleep and deep relaxation",
            5.0,
            vec![
                carrier(100.0, 5.0, 0.88, 0.0),
                carrier(150.0, 5.0, 0.72, PI / 5.0),
                carrier(200.0, 5.0, 0.68, 2.0 * PI / 5.0),
                carrier(250.0, 5.0, 0.62, 3.0 * PI / 5.0),
                carrier(300.0, 5.0, 0.58, 4.0 * PI / 5.0),
            ],
            vec![iso(5.0, 5.0, 0.5, 0.28), iso(10.0, 5.0, 0.45, 0.18)],
        )
    }

    /// Alpha, 10 Hz
    pub fn alpha_relax() -> FrequencySignalConfig {
        recipe(
            "Alpha Relaxation",
            "Alpha waves for calm relaxation",
            10.0,
            vec![
                carrier(100.0, 10.0, 0.85, 0.0),
                carrier(200.0, 10.0, 0.70, PI / 6.0),
                carrier(300.0, 10.0, 0.60, PI / 3.0),
            ],
            vec![iso(10.0, 10.0, 0.5, 0.25)],
        )
    }

    /// 7.83 Hz
    pub fn schumann() -> FrequencySignalConfig {
        recipe(
            "Schumann Resonance",
            "Earth's natural frequency for grounding and balance",
            7.83,
            vec![
                carrier(100.0, 7.83, 0.80, 0.0),
                carrier(200.0, 7.83, 0.65, PI / 4.0),
                carrier(300.0, 7.83, 0.50, PI / 2.0),
                carrier(150.0, 7.83, 0.60, PI / 6.0),
            ],
            vec![iso(7.83, 7.83, 0.5, 0.30)],
        )
    }

    pub fn lullaby() -> FrequencySignalConfig {
        recipe(
            "Dreamy Lullaby",
            "Soft lullaby tones with embedded sleep frequencies",
            4.5,
            vec![
                carrier(180.0, 4.5, 0.75, 0.0),
                carrier(220.0, 4.5, 0.65, PI / 4.0),
                carrier(260.0, 4.5, 0.55, PI / 2.0),
            ],
            vec![iso(4.5, 4.5, 0.45, 0.20), iso(9.0, 4.5, 0.40, 0.15)],
        )
    }

    pub fn seamless_lullaby() -> FrequencySignalConfig {
        recipe(
            "Seamless Lullaby",
            "Gentle theta waves for seamless looping and deep relaxation",
            4.0,
            vec![
                carrier(200.0, 4.0, 0.60, 0.0),
                carrier(240.0, 4.0, 0.50, PI / 3.0),
                carrier(280.0, 4.0, 0.45, 2.0 * PI / 3.0),
            ],
            vec![iso(4.0, 4.0, 0.40, 0.18), iso(8.0, 4.0, 0.35, 0.12)],
        )
    }

    pub fn delta_subtle() -> FrequencySignalConfig {
        recipe(
            "Delta Enhancement",
            "Subtle delta waves for deep sleep enhancement",
            2.0,
            vec![carrier(100.0, 2.0, 0.60, 0.0), carrier(150.0, 2.0, 0.50, PI / 4.0)],
            vec![iso(2.0, 2.0, 0.5, 0.20)],
        )
    }

    pub fn theta_subtle() -> FrequencySignalConfig {
        recipe(
            "Theta Enhancement",
            "Subtle theta waves for relaxation enhancement",
            4.5,
            vec![carrier(100.0, 4.5, 0.65, 0.0), carrier(150.0, 4.5, 0.55, PI / 4.0)],
            vec![iso(4.5, 4.5, 0.45, 0.18)],
        )
    }

    pub fn theta_light() -> FrequencySignalConfig {
        recipe(
            "Theta Light Enhancement",
            "Subtle theta waves for light sleep enhancement",
            5.0,
            vec![carrier(100.0, 5.0, 0.65, 0.0), carrier(150.0, 5.0, 0.55, PI / 5.0)],
            vec![iso(5.0, 5.0, 0.5, 0.18)],
        )
    }

    pub fn alpha_subtle() -> FrequencySignalConfig {
        recipe(
            "Alpha Enhancement",
            "Subtle alpha waves for calm enhancement",
            10.0,
            vec![carrier(100.0, 10.0, 0.60, 0.0), carrier(200.0, 10.0, 0.50, PI / 6.0)],
            vec![iso(10.0, 10.0, 0.5, 0.15)],
        )
    }
}

/// An ordered collection of sounds, looked up by id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SoundCatalog {
    sounds: Vec<SoundConfig>,
}

impl SoundCatalog {
    pub fn new(sounds: Vec<SoundConfig>) -> Self {
        Self { sounds }
    }

    /// The sixteen sounds shipped with the application.
    pub fn builtin() -> Self {
        use recipes::*;
        use Category::*;

        let file = |url: &str, config: FrequencySignalConfig| SoundKind::FileWithFrequency {
            url: url.into(),
            config,
        };

        let entry = |id: &str, name: &str, category, description: &str, kind, animation: &str, color: &str| {
            SoundConfig::new(id, name, category, kind)
                .with_description(description)
                .with_animation(animation)
                .with_color(color)
        };

        Self::new(vec![
            entry("deep-sleep", "Deep Sleep Waves", DeepSleep,
                "Delta brainwaves for deep, restorative sleep",
                SoundKind::Frequency { config: deep_sleep() }, "stars", "#6366f1"),
            entry("schumann", "Schumann Resonance", DeepSleep,
                "Earth's natural frequency for grounding and deep sleep",
                SoundKind::Frequency { config: schumann() }, "spiral", "#10b981"),
            entry("airplane-cabin", "Airplane Cabin", DeepSleep,
                "Soothing white noise of an airplane cabin with deep sleep frequencies",
                file("/sounds/drift-airplane-cabin.mp3", delta_subtle()), "clouds", "#64748b"),
            entry("thunderstorm", "Distant Thunderstorm", DeepSleep,
                "Distant rumbling thunder with gentle rain and deep sleep frequencies",
                file("/sounds/drift-thunder.mp3", delta_subtle()), "storm", "#1e293b"),
            entry("theta-sleep", "Theta Sleep", LightSleep,
                "Theta waves for light sleep and meditation",
                SoundKind::Frequency { config: theta_sleep() }, "waves", "#8b5cf6"),
            entry("dreamy-lullaby", "Dreamy Lullaby", LightSleep,
                "Gentle lullaby with embedded sleep frequencies",
                SoundKind::Frequency { config: lullaby() }, "clouds", "#ec4899"),
            entry("soft-lullaby", "Soft Lullaby", LightSleep,
                "Soothing lullaby with seamless looping and gentle sleep frequencies",
                file("/sounds/drift-lul1.mp3", seamless_lullaby()), "clouds", "#f472b6"),
            entry("ocean-waves", "Ocean Waves", LightSleep,
                "Gentle ocean waves on the shore with light sleep frequencies",
                file("/sounds/drift-ocean-waves.mp3", theta_light()), "waves", "#06b6d4"),
            entry("white-noise", "White Noise", LightSleep,
                "Gentle white noise for masking distractions with sleep frequencies",
                SoundKind::NoiseWithFrequency { config: theta_subtle() }, "static", "#6b7280"),
            entry("alpha-relax", "Alpha Relaxation", Relaxation,
                "Calm alpha waves for peaceful relaxation",
                SoundKind::Frequency { config: alpha_relax() }, "aurora", "#3b82f6"),
            entry("crackling-fire", "Crackling Fire", Relaxation,
                "Cozy fireplace sounds with relaxation frequencies",
                file("/sounds/drift-fireplace.mp3", theta_subtle()), "fire", "#f59e0b"),
            entry("rain-forest", "Rain Forest", Nature,
                "Peaceful rain falling in a forest with relaxation frequencies",
                file("/sounds/drift-rain-in-forest.mp3", theta_subtle()), "rain", "#10b981"),
            entry("mountain-stream", "Mountain Stream", Nature,
                "Flowing water over smooth stones with relaxation frequencies",
                file("/sounds/dryft-water-mountain.mp3", theta_subtle()), "water", "#3b82f6"),
            entry("zen-garden", "Zen Garden", Ambient,
                "Tranquil zen garden ambiance with calm frequencies",
                file("/sounds/dryft-gardens.mp3", alpha_subtle()), "spiral", "#14b8a6"),
            entry("singing-bowls", "Singing Bowls", Ambient,
                "Resonant Tibetan singing bowls with meditation frequencies",
                file("/sounds/dryft-singing-bowls.mp3", theta_light()), "ripples", "#f97316"),
            entry("cosmic-ambience", "Cosmic Ambience", Ambient,
                "Evolving cosmic journey through deep space tones with subtle white noise",
                SoundKind::CosmicAmbience, "stars", "#8b5cf6"),
        ])
    }

    /// Parse a JSON array of sound descriptors.
    ///
    /// Descriptors with neither an audio file nor a frequency recipe (and no
    /// reserved id) are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let descriptors: Vec<SoundDescriptor> = serde_json::from_str(json)?;
        let sounds = descriptors
            .into_iter()
            .map(|d| {
                let id = d.id.clone();
                d.into_config().ok_or(EngineError::NothingToPlay(id))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(sounds))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize back to descriptor form.
    pub fn to_json(&self) -> Result<String> {
        let descriptors: Vec<SoundDescriptor> = self.sounds.iter().map(SoundDescriptor::from).collect();
        Ok(serde_json::to_string_pretty(&descriptors)?)
    }

    pub fn get(&self, id: &str) -> Option<&SoundConfig> {
        self.sounds.iter().find(|s| s.id == id)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &SoundConfig> {
        self.sounds.iter().filter(move |s| s.category == category)
    }

    /// Categories in use, in first-appearance order
    pub fn categories(&self) -> Vec<Category> {
        self.sounds.iter().map(|s| s.category).unique().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SoundConfig> {
        self.sounds.iter()
    }

    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}
