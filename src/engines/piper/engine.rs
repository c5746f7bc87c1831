use std::path::{Path, PathBuf};

use crate::{SynthesisEngine, SynthesisResult};

use super::config::{sidecar_path, InferenceConfig, VoiceConfig};
use super::model::{PiperError, PiperModel, Scales};
use super::phonemizer::{phonemize, EspeakConfig};

/// Parameters for configuring Piper model loading.
#[derive(Debug, Clone, Default)]
pub struct PiperModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Voice config location. `None` looks for `<model>.json`, then
    /// `config.json` next to the model.
    pub config_path: Option<PathBuf>,
}

/// Parameters for configuring a Piper synthesis request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiperSynthesisOptions {
    /// Speaker for multi-speaker voices. Ignored by single-speaker voices.
    pub speaker_id: Option<i64>,
    /// Duration multiplier: above 1.0 is slower speech, below is faster.
    pub length_scale: f32,
    /// Generator noise.
    pub noise_scale: f32,
    /// Phoneme width noise.
    pub noise_w: f32,
}

impl Default for PiperSynthesisOptions {
    fn default() -> Self {
        Self::from_inference(&InferenceConfig::default())
    }
}

impl PiperSynthesisOptions {
    fn from_inference(inference: &InferenceConfig) -> Self {
        Self {
            speaker_id: None,
            length_scale: inference.length_scale,
            noise_scale: inference.noise_scale,
            noise_w: inference.noise_w,
        }
    }

    fn validate(&self) -> Result<(), PiperError> {
        for (name, value) in [
            ("length_scale", self.length_scale),
            ("noise_scale", self.noise_scale),
            ("noise_w", self.noise_w),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PiperError::InvalidOptions(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.length_scale == 0.0 {
            return Err(PiperError::InvalidOptions(
                "length_scale must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    fn scales(&self) -> Scales {
        Scales {
            noise_scale: self.noise_scale,
            length_scale: self.length_scale,
            noise_w: self.noise_w,
        }
    }
}

/// One sentence of synthesized audio.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// IPA phonemes the chunk was synthesized from
    pub phonemes: String,
}

/// Iterator over per-sentence audio, produced by [`PiperEngine::synthesize_start`].
///
/// Each call to `next` runs the model on one sentence. The iterator is done
/// once every sentence has been synthesized.
pub struct SynthesisStream<'a> {
    model: &'a mut PiperModel,
    sentences: std::vec::IntoIter<String>,
    scales: Scales,
    speaker_id: Option<i64>,
}

impl SynthesisStream<'_> {
    /// Number of sentences not yet synthesized.
    pub fn remaining(&self) -> usize {
        self.sentences.len()
    }
}

impl Iterator for SynthesisStream<'_> {
    type Item = Result<AudioChunk, PiperError>;

    fn next(&mut self) -> Option<Self::Item> {
        let phonemes = self.sentences.next()?;
        let ids = self.model.config().phonemes_to_ids(&phonemes);
        log::debug!("Synthesizing {} phoneme ids: {phonemes}", ids.len());

        let sample_rate = self.model.config().sample_rate();
        Some(
            self.model
                .synthesize_ids(&ids, self.scales, self.speaker_id)
                .map(|samples| AudioChunk {
                    samples,
                    sample_rate,
                    phonemes,
                }),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.sentences.size_hint()
    }
}

/// Piper text-to-speech engine.
///
/// Runs a Piper VITS voice exported to ONNX. Requires espeak-ng for
/// phonemization.
///
/// ```rust,no_run
/// use piper_speech::{SynthesisEngine, engines::piper::PiperEngine};
/// use std::path::PathBuf;
///
/// let mut engine = PiperEngine::new();
/// engine.load_model(&PathBuf::from("voices/en_US-lessac-medium.onnx"))?;
/// let result = engine.synthesize("Hello, world!", None)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct PiperEngine {
    model: Option<PiperModel>,
    model_path: Option<PathBuf>,
    espeak: EspeakConfig,
}

impl Default for PiperEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PiperEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self::with_espeak(None, None)
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    ///
    /// Either path can be `None` to fall back to the system default.
    pub fn with_espeak(bin_path: Option<PathBuf>, data_path: Option<PathBuf>) -> Self {
        Self {
            model: None,
            model_path: None,
            espeak: EspeakConfig {
                bin_path,
                data_path,
            },
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    /// The loaded voice config.
    pub fn voice_config(&self) -> Option<&VoiceConfig> {
        self.model.as_ref().map(PiperModel::config)
    }

    /// Sample rate of the loaded voice.
    pub fn sample_rate(&self) -> Result<u32, PiperError> {
        self.voice_config()
            .map(VoiceConfig::sample_rate)
            .ok_or(PiperError::ModelNotLoaded)
    }

    /// Load the `.onnx` graph and voice config at the given paths.
    pub fn load_voice(
        &mut self,
        onnx_path: &Path,
        config_path: &Path,
        num_threads: Option<usize>,
    ) -> Result<(), PiperError> {
        let model = PiperModel::load(onnx_path, config_path, num_threads)?;
        self.model = Some(model);
        self.model_path = Some(onnx_path.to_path_buf());
        Ok(())
    }

    /// Synthesis options taken from the loaded voice's `inference` section.
    pub fn default_options(&self) -> Result<PiperSynthesisOptions, PiperError> {
        self.voice_config()
            .map(|config| PiperSynthesisOptions::from_inference(&config.inference))
            .ok_or(PiperError::ModelNotLoaded)
    }

    /// Phonemize `text` and return a stream yielding one audio chunk per sentence.
    pub fn synthesize_start(
        &mut self,
        text: &str,
        options: Option<PiperSynthesisOptions>,
    ) -> Result<SynthesisStream<'_>, PiperError> {
        let options = match options {
            Some(options) => options,
            None => self.default_options()?,
        };
        options.validate()?;
        let model = self.model.as_mut().ok_or(PiperError::ModelNotLoaded)?;
        let speaker_id = resolve_speaker(model.config(), options.speaker_id)?;

        let sentences = phonemize(text, &model.config().espeak.voice, &self.espeak)?;
        if sentences.is_empty() {
            log::warn!("No phonemes produced for text: {text:?}");
        }

        Ok(SynthesisStream {
            model,
            sentences: sentences.into_iter(),
            scales: options.scales(),
            speaker_id,
        })
    }
}

impl Drop for PiperEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for PiperEngine {
    type SynthesisParams = PiperSynthesisOptions;
    type ModelParams = PiperModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let onnx_path = find_onnx_file(model_path)?;
        let config_path = match params.config_path {
            Some(path) => path,
            None => find_config_file(&onnx_path)?,
        };

        self.load_voice(&onnx_path, &config_path, params.num_threads)?;
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
        self.model_path = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let sample_rate = self.sample_rate()?;

        let mut samples = Vec::new();
        for chunk in self.synthesize_start(text, params)? {
            samples.extend_from_slice(&chunk?.samples);
        }

        Ok(SynthesisResult {
            samples,
            sample_rate,
        })
    }
}

/// Validate a requested speaker against the voice.
///
/// Single-speaker voices take no speaker id; one passed anyway is dropped.
fn resolve_speaker(
    config: &VoiceConfig,
    speaker_id: Option<i64>,
) -> Result<Option<i64>, PiperError> {
    if !config.is_multi_speaker() {
        if let Some(id) = speaker_id.filter(|&id| id != 0) {
            log::debug!("Ignoring speaker id {id} for single-speaker voice");
        }
        return Ok(None);
    }

    let id = speaker_id.unwrap_or(0);
    if id < 0 || id >= config.num_speakers as i64 {
        return Err(PiperError::SpeakerOutOfRange {
            id,
            num_speakers: config.num_speakers,
        });
    }
    Ok(Some(id))
}

/// Resolve the `.onnx` file: the path itself, or the first `.onnx` in a directory.
fn find_onnx_file(model_path: &Path) -> Result<PathBuf, PiperError> {
    if model_path.is_file() {
        return Ok(model_path.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(model_path)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            candidates.push(path);
        }
    }
    candidates.sort();

    match candidates.into_iter().next() {
        Some(path) => {
            log::info!("Using ONNX file: {}", path.display());
            Ok(path)
        }
        None => Err(PiperError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No .onnx file found in {}", model_path.display()),
        ))),
    }
}

/// Locate the voice config for an `.onnx` file: `<model>.onnx.json`, then `config.json`.
fn find_config_file(onnx_path: &Path) -> Result<PathBuf, PiperError> {
    let sidecar = sidecar_path(onnx_path);
    if sidecar.is_file() {
        return Ok(sidecar);
    }

    let fallback = onnx_path
        .parent()
        .map(|dir| dir.join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"));
    if fallback.is_file() {
        log::warn!(
            "{} not found, using {}",
            sidecar.display(),
            fallback.display()
        );
        return Ok(fallback);
    }

    Err(PiperError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Voice config not found at {}", sidecar.display()),
    )))
}
