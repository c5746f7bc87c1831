//! Piper text-to-speech engine implementation.
//!
//! This module runs Piper voices: VITS models exported to ONNX together with
//! a JSON voice config. Text is phonemized with espeak-ng, one sentence at a
//! time, and each sentence is synthesized into a chunk of mono float audio.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system, or bundled and pointed at
//! via [`PiperEngine::with_espeak`]:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Voice Layout
//!
//! ```text
//! voices/
//! ├── en_US-lessac-medium.onnx        # VITS graph
//! └── en_US-lessac-medium.onnx.json   # voice config (sample rate, phoneme ids, speakers)
//! ```
//!
//! Voices: <https://huggingface.co/rhasspy/piper-voices>
//!
//! # Examples
//!
//! ## Sentence by sentence
//!
//! ```rust,no_run
//! use piper_speech::{SynthesisEngine, engines::piper::PiperEngine};
//! use std::path::PathBuf;
//!
//! let mut engine = PiperEngine::new();
//! engine.load_model(&PathBuf::from("voices/en_US-lessac-medium.onnx"))?;
//!
//! let mut options = engine.default_options()?;
//! options.length_scale = 1.2;
//!
//! for chunk in engine.synthesize_start("First sentence. Second one!", Some(options))? {
//!     let chunk = chunk?;
//!     println!("{} samples for {:?}", chunk.samples.len(), chunk.phonemes);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Multi-speaker voice
//!
//! ```rust,no_run
//! use piper_speech::{SynthesisEngine, engines::piper::{PiperEngine, PiperSynthesisOptions}};
//! use std::path::PathBuf;
//!
//! let mut engine = PiperEngine::new();
//! engine.load_model(&PathBuf::from("voices/en_US-libritts-high.onnx"))?;
//!
//! let params = PiperSynthesisOptions {
//!     speaker_id: Some(12),
//!     ..engine.default_options()?
//! };
//! engine.synthesize_to_file("Hello there.", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod engine;
pub mod model;
pub mod phonemizer;

pub use config::VoiceConfig;
pub use engine::{AudioChunk, PiperEngine, PiperModelParams, PiperSynthesisOptions, SynthesisStream};
pub use model::PiperError;
pub use phonemizer::EspeakConfig;
