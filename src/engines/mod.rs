//! Speech synthesis engines.
//!
//! This module contains implementations of text-to-speech engines.
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `piper` - Piper TTS (ONNX format, espeak-ng required)

#[cfg(feature = "piper")]
pub mod piper;
