//! One-call text-to-speech into a PCM16 waveform resource.
//!
//! [`tts`] is the whole pipeline a host script binding needs: it creates a
//! Piper synthesizer from a [`VoicePaths`], synthesizes every sentence,
//! converts the accumulated float audio to 16-bit PCM and frees the
//! synthesizer again before returning.

use std::path::PathBuf;
use std::time::Instant;

use derive_builder::Builder;

use crate::engines::piper::config::sidecar_path;
use crate::engines::piper::{PiperEngine, PiperError};
use crate::WaveResource;

/// Environment variable naming the `.onnx` voice model.
pub const ENV_MODEL: &str = "PIPER_MODEL";
/// Environment variable naming the voice config JSON.
pub const ENV_CONFIG: &str = "PIPER_CONFIG";
/// Environment variable naming the espeak-ng data directory.
pub const ENV_ESPEAK_DATA: &str = "PIPER_ESPEAK_DATA";

/// Filesystem locations of a Piper voice.
///
/// ```rust
/// use piper_speech::speech::VoicePathsBuilder;
///
/// let paths = VoicePathsBuilder::default()
///     .model("voices/fr_FR-siwis-medium.onnx")
///     .espeak_data("/opt/piper/espeak-ng-data")
///     .build()?;
/// assert_eq!(
///     paths.config,
///     std::path::PathBuf::from("voices/fr_FR-siwis-medium.onnx.json")
/// );
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into))]
pub struct VoicePaths {
    /// The `.onnx` model file.
    pub model: PathBuf,
    /// The voice config; defaults to `<model>.json`.
    #[builder(default = "self.default_config()?")]
    pub config: PathBuf,
    /// espeak-ng data directory; `None` uses the system installation.
    #[builder(default, setter(into, strip_option))]
    pub espeak_data: Option<PathBuf>,
}

impl VoicePathsBuilder {
    fn default_config(&self) -> Result<PathBuf, String> {
        self.model
            .as_deref()
            .map(sidecar_path)
            .ok_or_else(|| "model path is required".to_string())
    }
}

impl From<VoicePathsBuilderError> for PiperError {
    fn from(err: VoicePathsBuilderError) -> Self {
        PiperError::Paths(err.to_string())
    }
}

impl VoicePaths {
    /// Paths for a model with its config beside it and system espeak-ng data.
    pub fn for_model(model: impl Into<PathBuf>) -> Self {
        let model = model.into();
        Self {
            config: sidecar_path(&model),
            model,
            espeak_data: None,
        }
    }

    /// Read paths from `PIPER_MODEL`, `PIPER_CONFIG` and `PIPER_ESPEAK_DATA`.
    pub fn from_env() -> Result<Self, PiperError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PiperError> {
        let model = lookup(ENV_MODEL)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| PiperError::Paths(format!("{ENV_MODEL} is not set")))?;

        let mut builder = VoicePathsBuilder::default();
        builder.model(model);
        if let Some(config) = lookup(ENV_CONFIG).filter(|v| !v.is_empty()) {
            builder.config(config);
        }
        if let Some(data) = lookup(ENV_ESPEAK_DATA).filter(|v| !v.is_empty()) {
            builder.espeak_data(data);
        }
        Ok(builder.build()?)
    }
}

/// Synthesize `text` with the voice at `paths` into a mono PCM16 resource.
///
/// `speed` is passed to the voice as its length scale, so values above 1.0
/// stretch the speech. `speaker_id` selects a speaker on multi-speaker voices
/// and is ignored otherwise. The synthesizer lives only for this call.
pub fn tts(
    paths: &VoicePaths,
    text: &str,
    speed: f32,
    speaker_id: i64,
) -> Result<WaveResource, PiperError> {
    let mut engine = PiperEngine::with_espeak(None, paths.espeak_data.clone());
    engine.load_voice(&paths.model, &paths.config, None)?;

    let mut options = engine.default_options()?;
    options.length_scale = speed;
    options.speaker_id = Some(speaker_id);

    let sample_rate = engine.sample_rate()?;
    let start = Instant::now();

    let mut samples = Vec::new();
    for chunk in engine.synthesize_start(text, Some(options))? {
        samples.extend_from_slice(&chunk?.samples);
    }

    let wave = WaveResource::from_samples(&samples, sample_rate);
    log::info!(
        "Synthesized {:.2}s of audio in {:.2?}",
        wave.duration_secs(),
        start.elapsed()
    );

    Ok(wave)
}

/// A text-to-speech node bound to one voice.
///
/// Holds only paths; every [`TextToSpeech::tts`] call creates and frees its
/// own synthesizer.
#[derive(Debug, Clone)]
pub struct TextToSpeech {
    paths: VoicePaths,
}

impl TextToSpeech {
    pub fn new(paths: VoicePaths) -> Self {
        Self { paths }
    }

    pub fn from_env() -> Result<Self, PiperError> {
        VoicePaths::from_env().map(Self::new)
    }

    pub fn paths(&self) -> &VoicePaths {
        &self.paths
    }

    pub fn tts(&self, text: &str, speed: f32, speaker_id: i64) -> Result<WaveResource, PiperError> {
        tts(&self.paths, text, speed, speaker_id)
    }
}
