use std::io::{Seek, Write};
use std::path::Path;

use crate::pcm;

/// Sample encoding of a [`WaveResource`]'s byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WaveFormat {
    /// Signed 16-bit little-endian PCM.
    Pcm16,
}

impl WaveFormat {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            WaveFormat::Pcm16 => 16,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bits_per_sample() as usize / 8
    }
}

/// A byte-buffer-backed audio resource, ready to hand to a game engine or
/// audio host.
///
/// Mirrors the fields a host waveform resource exposes: raw sample bytes, the
/// sample format, the mix (sample) rate and whether the data is interleaved
/// stereo.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveResource {
    pub data: Vec<u8>,
    pub format: WaveFormat,
    pub mix_rate: u32,
    pub stereo: bool,
}

impl WaveResource {
    /// Build a mono PCM16 resource from float samples.
    pub fn from_samples(samples: &[f32], sample_rate: u32) -> Self {
        Self {
            data: pcm::encode_pcm16(samples),
            format: WaveFormat::Pcm16,
            mix_rate: sample_rate,
            stereo: false,
        }
    }

    /// An empty mono PCM16 resource.
    pub fn empty(sample_rate: u32) -> Self {
        Self::from_samples(&[], sample_rate)
    }

    pub fn channels(&self) -> u16 {
        if self.stereo {
            2
        } else {
            1
        }
    }

    /// Number of frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.data.len() / (self.format.bytes_per_sample() * self.channels() as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.mix_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.mix_rate as f64
    }

    /// Decode the byte buffer into interleaved 16-bit samples.
    pub fn samples(&self) -> impl Iterator<Item = i16> + '_ {
        self.data
            .chunks_exact(pcm::PCM16_BYTES_PER_SAMPLE)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
    }

    fn wav_spec(&self) -> hound::WavSpec {
        hound::WavSpec {
            channels: self.channels(),
            sample_rate: self.mix_rate,
            bits_per_sample: self.format.bits_per_sample(),
            sample_format: hound::SampleFormat::Int,
        }
    }

    /// Write the resource to a 16-bit integer WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let writer = hound::WavWriter::create(path, self.wav_spec())?;
        self.write_samples(writer)
    }

    /// Write the resource as WAV into any seekable writer.
    pub fn write_wav_to<W: Write + Seek>(&self, out: W) -> Result<(), hound::Error> {
        let writer = hound::WavWriter::new(out, self.wav_spec())?;
        self.write_samples(writer)
    }

    fn write_samples<W: Write + Seek>(
        &self,
        mut writer: hound::WavWriter<W>,
    ) -> Result<(), hound::Error> {
        for sample in self.samples() {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }
}
