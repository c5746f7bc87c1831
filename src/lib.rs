//! # piper-speech
//!
//! A Rust library that turns text into ready-to-play 16-bit PCM waveform
//! resources using Piper voices.
//!
//! ## Features
//!
//! - **Piper TTS**: VITS voices exported to ONNX, phonemized with espeak-ng
//! - **Waveform resources**: float audio converted to mono PCM16 with clamping
//! - **One-call orchestration**: [`speech::tts`] loads, synthesizes, converts and frees
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! piper-speech = { version = "2026.10", features = ["piper"] }
//! ```
//!
//! ```ignore
//! use piper_speech::speech::{tts, VoicePaths};
//!
//! let paths = VoicePaths::for_model("voices/en_US-lessac-medium.onnx");
//! let wave = tts(&paths, "Hello, world!", 1.0, 0)?;
//! wave.write_wav(std::path::Path::new("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engines;
pub mod pcm;
pub mod resource;
#[cfg(feature = "piper")]
pub mod speech;

use std::path::Path;

pub use resource::{WaveFormat, WaveResource};

/// The result of a synthesis (text-to-speech) operation.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug, Clone, Default)]
pub struct SynthesisResult {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (22050 for most Piper voices)
    pub sample_rate: u32,
}

impl SynthesisResult {
    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Convert the float audio into a mono PCM16 waveform resource.
    pub fn to_wave_resource(&self) -> WaveResource {
        WaveResource::from_samples(&self.samples, self.sample_rate)
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// This trait defines the standard operations that all synthesis engines must support.
/// Each engine may have different parameter types for model loading and inference configuration.
pub trait SynthesisEngine {
    /// Parameters for configuring inference behavior (speaker, speed, etc.)
    type SynthesisParams;
    /// Parameters for configuring model loading (threads, config path, etc.)
    type ModelParams: Default;

    /// Load a model from the specified path using default parameters.
    fn load_model(&mut self, model_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.load_model_with_params(model_path, Self::ModelParams::default())
    }

    /// Load a model from the specified path with custom parameters.
    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>>;

    /// Unload the currently loaded model and free associated resources.
    fn unload_model(&mut self);

    /// Synthesize speech from the given text.
    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `SynthesisResult::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        wav_path: &Path,
        params: Option<Self::SynthesisParams>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.synthesize(text, params)?.write_wav(wav_path)
    }

    /// Synthesize speech and convert it into a PCM16 waveform resource.
    fn synthesize_to_resource(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<WaveResource, Box<dyn std::error::Error>> {
        Ok(self.synthesize(text, params)?.to_wave_resource())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_converts_to_mono_pcm16() {
        let result = SynthesisResult {
            samples: vec![0.0, 2.0, -2.0],
            sample_rate: 22050,
        };
        let wave = result.to_wave_resource();
        assert_eq!(wave.mix_rate, 22050);
        assert!(!wave.stereo);
        assert_eq!(wave.samples().collect::<Vec<_>>(), vec![0, 32767, -32767]);
    }

    #[test]
    fn duration_of_empty_result_is_zero() {
        assert_eq!(SynthesisResult::default().duration_secs(), 0.0);
    }
}
