use std::path::PathBuf;
use std::time::Instant;

use piper_speech::speech::{TextToSpeech, VoicePaths};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let paths = match args.next() {
        Some(model) => VoicePaths::for_model(model),
        None => VoicePaths::from_env()?,
    };
    let text = args.next().unwrap_or_else(|| {
        "Hello! This is Piper, a fast local text to speech system. \
         Every sentence is synthesized on its own and stitched together."
            .to_string()
    });

    let node = TextToSpeech::new(paths);

    let synth_start = Instant::now();
    let wave = node.tts(&text, 1.0, 0)?;
    let synth_dur = synth_start.elapsed();

    let speedup = wave.duration_secs() / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s of {}-bit audio at {}Hz in {:.2?} ({:.1}x real-time)",
        wave.duration_secs(),
        wave.format.bits_per_sample(),
        wave.mix_rate,
        synth_dur,
        speedup
    );

    let out = PathBuf::from("output.wav");
    wave.write_wav(&out)?;
    println!("Saved to {}", out.display());
    Ok(())
}
