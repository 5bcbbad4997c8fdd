//! Sound descriptions: frequency recipes and catalog entries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One binaural pair. `right_freq - left_freq` is expected to equal `beat_freq`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierLayerConfig {
    pub left_freq: f32,
    pub right_freq: f32,
    pub beat_freq: f32,
    pub volume: f32,
    /// Reserved; playback does not use it
    #[serde(default)]
    pub phase_offset: f32,
}

impl CarrierLayerConfig {
    /// A pair centred on `left_freq` with the right ear offset by `beat_freq`
    pub fn binaural(left_freq: f32, beat_freq: f32, volume: f32) -> Self {
        Self {
            left_freq,
            right_freq: left_freq + beat_freq,
            beat_freq,
            volume,
            phase_offset: 0.0,
        }
    }

    pub fn with_phase_offset(mut self, phase_offset: f32) -> Self {
        self.phase_offset = phase_offset;
        self
    }
}

/// One gated tone. `duty_cycle` is the audible fraction of each pulse period, in (0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IsochronicLayerConfig {
    pub frequency: f32,
    pub pulse_rate: f32,
    pub duty_cycle: f32,
    pub volume: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencySignalConfig {
    pub name: String,
    pub description: String,
    pub target_beat_freq: f32,
    #[serde(default)]
    pub carrier_layers: Vec<CarrierLayerConfig>,
    #[serde(default)]
    pub isochronic_layers: Vec<IsochronicLayerConfig>,
}

impl FrequencySignalConfig {
    pub fn layer_count(&self) -> usize {
        self.carrier_layers.len() + self.isochronic_layers.len()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    DeepSleep,
    LightSleep,
    Relaxation,
    Nature,
    Ambient,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::DeepSleep,
        Category::LightSleep,
        Category::Relaxation,
        Category::Nature,
        Category::Ambient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DeepSleep => "deep-sleep",
            Category::LightSleep => "light-sleep",
            Category::Relaxation => "relaxation",
            Category::Nature => "nature",
            Category::Ambient => "ambient",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sound is made of. Selects the graph the engine builds for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SoundKind {
    /// A decoded audio file, looped
    FileLoop { url: String },
    /// Carrier and isochronic layers only
    Frequency { config: FrequencySignalConfig },
    /// Generated white noise
    Noise,
    /// White noise with a frequency layer underneath
    NoiseWithFrequency { config: FrequencySignalConfig },
    /// An audio file with a frequency layer underneath
    FileWithFrequency { url: String, config: FrequencySignalConfig },
    /// The generative cosmic ambience
    CosmicAmbience,
}

impl SoundKind {
    pub fn frequency_config(&self) -> Option<&FrequencySignalConfig> {
        match self {
            SoundKind::Frequency { config }
            | SoundKind::NoiseWithFrequency { config }
            | SoundKind::FileWithFrequency { config, .. } => Some(config),
            _ => None,
        }
    }

    pub fn audio_url(&self) -> Option<&str> {
        match self {
            SoundKind::FileLoop { url } | SoundKind::FileWithFrequency { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Whether the primary signal plays together with a frequency layer
    pub fn is_layered(&self) -> bool {
        matches!(self, SoundKind::NoiseWithFrequency { .. } | SoundKind::FileWithFrequency { .. })
    }
}

/// A playable sound.
///
/// `id` is the registry key: starting a sound stops any instance already
/// playing under the same id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundConfig {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub kind: SoundKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SoundConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: Category, kind: SoundKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            kind,
            icon: None,
            animation: None,
            color: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_animation(mut self, animation: impl Into<String>) -> Self {
        self.animation = Some(animation.into());
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Id that selects the generative ambience in descriptor form
pub const COSMIC_AMBIENCE_ID: &str = "cosmic-ambience";
/// Id that selects generated white noise in descriptor form
pub const WHITE_NOISE_ID: &str = "white-noise";

/// The optional-field form of a sound used by catalog files:
/// `audioUrl` and `frequencyConfig` are both optional and two reserved ids
/// pick the generated sounds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundDescriptor {
    pub id: String,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_config: Option<FrequencySignalConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SoundDescriptor {
    /// Classify by the reserved ids first, then by which fields are present.
    ///
    /// Returns `None` for a descriptor with nothing to play.
    pub fn kind(&self) -> Option<SoundKind> {
        let kind = match (self.id.as_str(), self.audio_url.clone(), self.frequency_config.clone()) {
            (COSMIC_AMBIENCE_ID, _, _) => SoundKind::CosmicAmbience,
            (WHITE_NOISE_ID, _, Some(config)) => SoundKind::NoiseWithFrequency { config },
            (WHITE_NOISE_ID, _, None) => SoundKind::Noise,
            (_, Some(url), Some(config)) => SoundKind::FileWithFrequency { url, config },
            (_, None, Some(config)) => SoundKind::Frequency { config },
            (_, Some(url), None) => SoundKind::FileLoop { url },
            (_, None, None) => return None,
        };
        Some(kind)
    }

    pub fn into_config(self) -> Option<SoundConfig> {
        let kind = self.kind()?;
        Some(SoundConfig {
            id: self.id,
            name: self.name,
            category: self.category,
            description: self.description,
            kind,
            icon: self.icon,
            animation: self.animation,
            color: self.color,
        })
    }
}

impl From<&SoundConfig> for SoundDescriptor {
    fn from(sound: &SoundConfig) -> Self {
        Self {
            id: sound.id.clone(),
            name: sound.name.clone(),
            category: sound.category,
            description: sound.description.clone(),
            icon: sound.icon.clone(),
            frequency_config: sound.kind.frequency_config().cloned(),
            audio_url: sound.kind.audio_url().map(str::to_owned),
            animation: sound.animation.clone(),
            color: sound.color.clone(),
        }
    }
}
