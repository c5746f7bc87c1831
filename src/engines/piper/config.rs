use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::model::PiperError;

/// Phoneme emitted between every other phoneme.
pub const PAD: &str = "_";
/// Beginning-of-sentence phoneme.
pub const BOS: &str = "^";
/// End-of-sentence phoneme.
pub const EOS: &str = "$";

/// Sample rate used when the voice config does not declare one.
pub const DEFAULT_SAMPLE_RATE: u32 = 22050;

/// A Piper voice config, as shipped next to the model (`<voice>.onnx.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub espeak: EspeakVoice,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default = "default_num_speakers")]
    pub num_speakers: u32,
    #[serde(default)]
    pub speaker_id_map: HashMap<String, i64>,
    pub phoneme_id_map: HashMap<String, Vec<i64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspeakVoice {
    #[serde(default = "default_voice")]
    pub voice: String,
}

impl Default for EspeakVoice {
    fn default() -> Self {
        Self {
            voice: default_voice(),
        }
    }
}

/// Default synthesis scales baked into the voice.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InferenceConfig {
    #[serde(default = "default_noise_scale")]
    pub noise_scale: f32,
    #[serde(default = "default_length_scale")]
    pub length_scale: f32,
    #[serde(default = "default_noise_w")]
    pub noise_w: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            noise_scale: default_noise_scale(),
            length_scale: default_length_scale(),
            noise_w: default_noise_w(),
        }
    }
}

/// The conventional config location for a model: `<model>.json`.
pub fn sidecar_path(model: &Path) -> PathBuf {
    let mut config = model.as_os_str().to_owned();
    config.push(".json");
    PathBuf::from(config)
}

fn default_num_speakers() -> u32 {
    1
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_voice() -> String {
    "en-us".to_string()
}

fn default_noise_scale() -> f32 {
    0.667
}

fn default_length_scale() -> f32 {
    1.0
}

fn default_noise_w() -> f32 {
    0.8
}

impl VoiceConfig {
    /// Load a voice config from a JSON file.
    pub fn load(config_path: &Path) -> Result<Self, PiperError> {
        let content = std::fs::read_to_string(config_path)?;
        Self::from_json(&content)
    }

    /// Parse a voice config from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, PiperError> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| PiperError::Config(format!("Failed to parse JSON: {e}")))?;

        for marker in [PAD, BOS, EOS] {
            if !config.phoneme_id_map.contains_key(marker) {
                return Err(PiperError::Config(format!(
                    "phoneme_id_map is missing the {marker:?} marker"
                )));
            }
        }

        Ok(config)
    }

    pub fn sample_rate(&self) -> u32 {
        self.audio.sample_rate
    }

    pub fn is_multi_speaker(&self) -> bool {
        self.num_speakers > 1
    }

    /// Look up a speaker id by name.
    pub fn speaker_id(&self, name: &str) -> Option<i64> {
        self.speaker_id_map.get(name).copied()
    }

    /// Convert a phoneme string into model input ids.
    ///
    /// Each Unicode scalar is one phoneme. Ids are laid out as
    /// `BOS PAD (phoneme PAD)* EOS`.
    pub fn phonemes_to_ids(&self, phonemes: &str) -> Vec<i64> {
        let pad = self.marker_ids(PAD);
        let mut ids = Vec::with_capacity(phonemes.len() * 2 + 3);

        ids.extend_from_slice(self.marker_ids(BOS));
        ids.extend_from_slice(pad);

        let mut buf = [0u8; 4];
        for ch in phonemes.chars() {
            match self.phoneme_id_map.get(ch.encode_utf8(&mut buf) as &str) {
                Some(phoneme_ids) => {
                    ids.extend_from_slice(phoneme_ids);
                    ids.extend_from_slice(pad);
                }
                None => log::debug!("Skipping phoneme {ch:?} missing from phoneme_id_map"),
            }
        }

        ids.extend_from_slice(self.marker_ids(EOS));
        ids
    }

    fn marker_ids(&self, marker: &str) -> &[i64] {
        self.phoneme_id_map
            .get(marker)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "phoneme_id_map": {
            "_": [0], "^": [1], "$": [2], " ": [3],
            "h": [20], "ə": [59], "l": [24], "o": [27], "ʊ": [100], ",": [8]
        }
    }"#;

    #[test]
    fn applies_piper_defaults() {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.sample_rate(), 22050);
        assert_eq!(config.espeak.voice, "en-us");
        assert_eq!(config.num_speakers, 1);
        assert!(!config.is_multi_speaker());
        assert!((config.inference.noise_scale - 0.667).abs() < 1e-6);
        assert!((config.inference.length_scale - 1.0).abs() < 1e-6);
        assert!((config.inference.noise_w - 0.8).abs() < 1e-6);
    }

    #[test]
    fn reads_declared_sections() {
        let json = r#"{
            "audio": { "sample_rate": 16000, "quality": "low" },
            "espeak": { "voice": "de" },
            "inference": { "noise_scale": 0.5, "length_scale": 1, "noise_w": 0.6 },
            "num_speakers": 3,
            "speaker_id_map": { "anna": 0, "bernd": 2 },
            "phoneme_id_map": { "_": [0], "^": [1], "$": [2] },
            "piper_version": "1.0.0"
        }"#;
        let config = VoiceConfig::from_json(json).unwrap();
        assert_eq!(config.sample_rate(), 16000);
        assert_eq!(config.espeak.voice, "de");
        assert!((config.inference.length_scale - 1.0).abs() < 1e-6);
        assert!(config.is_multi_speaker());
        assert_eq!(config.speaker_id("bernd"), Some(2));
        assert_eq!(config.speaker_id("nobody"), None);
    }

    #[test]
    fn intersperses_pad_between_phonemes() {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        let ids = config.phonemes_to_ids("həl");
        assert_eq!(ids, vec![1, 0, 20, 0, 59, 0, 24, 0, 2]);
    }

    #[test]
    fn unknown_phonemes_are_skipped() {
        let config = VoiceConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.phonemes_to_ids("h#o"), vec![1, 0, 20, 0, 27, 0, 2]);
        assert_eq!(config.phonemes_to_ids(""), vec![1, 0, 2]);
    }

    #[test]
    fn rejects_map_without_markers() {
        let err = VoiceConfig::from_json(r#"{ "phoneme_id_map": { "a": [5] } }"#).unwrap_err();
        assert!(matches!(err, PiperError::Config(_)));
    }

    #[test]
    fn sidecar_appends_json() {
        assert_eq!(
            sidecar_path(Path::new("/v/en_US-amy-low.onnx")),
            PathBuf::from("/v/en_US-amy-low.onnx.json")
        );
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            VoiceConfig::from_json("{ not json"),
            Err(PiperError::Config(_))
        ));
    }
}
