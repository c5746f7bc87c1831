use std::path::Path;

use ndarray::{arr1, Array2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::config::VoiceConfig;

#[derive(thiserror::Error, Debug)]
pub enum PiperError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid voice config: {0}")]
    Config(String),
    #[error("Speaker id {id} out of range; voice has {num_speakers} speakers")]
    SpeakerOutOfRange { id: i64, num_speakers: u32 },
    #[error("Invalid synthesis options: {0}")]
    InvalidOptions(String),
    #[error("Invalid voice paths: {0}")]
    Paths(String),
}

/// Noise, length and noise-width scales fed to the `scales` input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scales {
    pub noise_scale: f32,
    pub length_scale: f32,
    pub noise_w: f32,
}

/// Internal Piper ONNX model state.
pub struct PiperModel {
    session: Session,
    config: VoiceConfig,
    /// True if the graph takes a `sid` (speaker id) input
    has_sid_input: bool,
}

impl PiperModel {
    /// Load a Piper voice: the `.onnx` graph and its JSON config.
    pub fn load(
        onnx_path: &Path,
        config_path: &Path,
        num_threads: Option<usize>,
    ) -> Result<Self, PiperError> {
        log::info!("Loading Piper voice config from {}", config_path.display());
        let config = VoiceConfig::load(config_path)?;

        log::info!("Loading Piper model from {}", onnx_path.display());
        let session = init_session(onnx_path, num_threads)?;
        let has_sid_input = session.inputs().iter().any(|input| input.name() == "sid");

        log::info!(
            "Detected: sample_rate={}, speakers={}, sid_input={}",
            config.sample_rate(),
            config.num_speakers,
            has_sid_input
        );

        Ok(Self {
            session,
            config,
            has_sid_input,
        })
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Run ONNX inference on one sentence worth of phoneme ids.
    pub fn synthesize_ids(
        &mut self,
        ids: &[i64],
        scales: Scales,
        speaker_id: Option<i64>,
    ) -> Result<Vec<f32>, PiperError> {
        let ids_arr = Array2::from_shape_vec((1, ids.len()), ids.to_vec())?;
        let lengths_arr = arr1(&[ids.len() as i64]);
        let scales_arr = arr1(&[scales.noise_scale, scales.length_scale, scales.noise_w]);

        let output = if self.has_sid_input {
            let sid_arr = arr1(&[speaker_id.unwrap_or(0)]);
            let inputs = inputs![
                "input" => TensorRef::from_array_view(ids_arr.view())?,
                "input_lengths" => TensorRef::from_array_view(lengths_arr.view())?,
                "scales" => TensorRef::from_array_view(scales_arr.view())?,
                "sid" => TensorRef::from_array_view(sid_arr.view())?,
            ];
            self.session.run(inputs)?
        } else {
            let inputs = inputs![
                "input" => TensorRef::from_array_view(ids_arr.view())?,
                "input_lengths" => TensorRef::from_array_view(lengths_arr.view())?,
                "scales" => TensorRef::from_array_view(scales_arr.view())?,
            ];
            self.session.run(inputs)?
        };

        // Output shape is [1, 1, 1, samples]; flatten it.
        let first_output = output
            .iter()
            .next()
            .ok_or_else(|| PiperError::Ort(ort::Error::new("No output from model")))?;
        let waveform = first_output.1.try_extract_array::<f32>()?;

        Ok(waveform.iter().copied().collect())
    }
}

/// Initialize an ONNX session on the CPU provider at Level3 optimization.
fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, PiperError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers(providers)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}
