use std::borrow::Cow;
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::model::PiperError;

/// Location of the espeak-ng binary and its voice data.
///
/// Either field may be `None` to use the system default.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    /// Either the `espeak-ng-data` directory itself or the directory that contains it.
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let bin = self
            .bin_path
            .as_deref()
            .unwrap_or_else(|| Path::new("espeak-ng"));
        let mut cmd = Command::new(bin);
        if let Some(root) = self.data_root() {
            cmd.arg("--path").arg(root);
        }
        cmd
    }

    /// espeak-ng's `--path` wants the parent of `espeak-ng-data`.
    fn data_root(&self) -> Option<&Path> {
        let data = self.data_path.as_deref()?;
        if data.file_name() == Some(OsStr::new("espeak-ng-data")) {
            match data.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => Some(parent),
                _ => Some(Path::new(".")),
            }
        } else {
            Some(data)
        }
    }
}

/// Convert text into one IPA phoneme string per sentence via espeak-ng.
///
/// Punctuation is kept in the phoneme string so the voice can shape prosody
/// around it. Sentences end at `.`, `!`, `?` and line breaks. Returns an empty
/// list for text without any speakable content.
pub fn phonemize(
    text: &str,
    voice: &str,
    espeak: &EspeakConfig,
) -> Result<Vec<String>, PiperError> {
    let sentences = split_sentences(split_text_parts(text));
    if sentences.is_empty() {
        return Ok(Vec::new());
    }

    let text_segments: Vec<&str> = sentences
        .iter()
        .flatten()
        .filter_map(|part| match part {
            TextPart::Text(segment) => Some(segment.as_str()),
            TextPart::Punct(_) => None,
        })
        .collect();

    let segment_ipa = if text_segments.is_empty() {
        Vec::new()
    } else {
        phonemize_segments_batch(&text_segments, voice, espeak)?
    };

    Ok(assemble_sentences(&sentences, &segment_ipa))
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        let ch_len = ch.len_utf8();
        if let Some(punct) = map_boundary_punctuation(ch) {
            if !is_numeric_connector_between_digits(text, idx, ch_len, ch) {
                flush_text_part(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
            continue;
        }

        current.push(ch);
    }

    flush_text_part(&mut parts, &mut current);
    parts
}

fn flush_text_part(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        parts.push(TextPart::Text(trimmed.to_string()));
    }
    current.clear();
}

fn map_boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn is_numeric_connector_between_digits(text: &str, idx: usize, ch_len: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }

    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch_len..].chars().next();

    matches!(
        (prev, next),
        (Some(left), Some(right)) if left.is_ascii_digit() && right.is_ascii_digit()
    )
}

fn ends_sentence(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Group parts into sentences, dropping sentences that carry no text.
fn split_sentences(parts: Vec<TextPart>) -> Vec<Vec<TextPart>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for part in parts {
        let boundary = matches!(part, TextPart::Punct(ch) if ends_sentence(ch));
        current.push(part);
        if boundary {
            push_sentence(&mut sentences, std::mem::take(&mut current));
        }
    }
    push_sentence(&mut sentences, current);

    sentences
}

fn push_sentence(sentences: &mut Vec<Vec<TextPart>>, sentence: Vec<TextPart>) {
    if sentence.iter().any(|p| matches!(p, TextPart::Text(_))) {
        sentences.push(sentence);
    }
}

/// Stitch per-segment IPA back together with the punctuation around it.
///
/// `segment_ipa` holds one entry per text part, in order across all sentences.
fn assemble_sentences(sentences: &[Vec<TextPart>], segment_ipa: &[String]) -> Vec<String> {
    let mut segment_index = 0usize;
    let mut out = Vec::with_capacity(sentences.len());

    for sentence in sentences {
        let mut phonemes = String::new();
        for (i, part) in sentence.iter().enumerate() {
            match part {
                TextPart::Text(_) => {
                    if let Some(ipa) = segment_ipa.get(segment_index) {
                        phonemes.push_str(ipa);
                    }
                    segment_index += 1;
                }
                TextPart::Punct(ch) => {
                    phonemes.push(*ch);
                    if matches!(sentence.get(i + 1), Some(TextPart::Text(_))) {
                        phonemes.push(' ');
                    }
                }
            }
        }

        let phonemes = phonemes.trim();
        if !phonemes.is_empty() {
            out.push(phonemes.to_string());
        }
    }

    out
}

fn phonemize_segments_batch(
    segments: &[&str],
    voice: &str,
    espeak: &EspeakConfig,
) -> Result<Vec<String>, PiperError> {
    let batched_input = segments.join("\n");
    let output = run_espeak(&batched_input, voice, espeak)?;
    let lines: Vec<&str> = output.lines().collect();

    // espeak-ng should emit one line per input line for stdin mode.
    if lines.len() != segments.len() {
        log::debug!(
            "espeak-ng returned {} lines for {} segments, phonemizing one at a time",
            lines.len(),
            segments.len()
        );
        return segments
            .iter()
            .map(|segment| Ok(clean_ipa(&run_espeak(segment, voice, espeak)?)))
            .collect();
    }

    Ok(lines.iter().map(|line| clean_ipa(line)).collect())
}

fn run_espeak(input: &str, voice: &str, espeak: &EspeakConfig) -> Result<String, PiperError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", voice])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                PiperError::EspeakNotFound
            } else {
                PiperError::Io(e)
            }
        })?;

    // Without a final line terminator espeak-ng can drop the last token.
    let stdin_payload = canonicalize_espeak_stdin_payload(input);
    let payload = stdin_payload.as_bytes();
    let stdin = child.stdin.take();

    // espeak-ng writes output while still reading input, so stdin is fed from
    // its own thread while this one drains stdout and stderr.
    let (written, output) = std::thread::scope(|scope| {
        let writer = scope.spawn(move || match stdin {
            Some(mut stdin) => stdin.write_all(payload),
            None => Ok(()),
        });
        let output = child.wait_with_output();
        (writer.join(), output)
    });

    let output = output.map_err(PiperError::Io)?;
    let written = written
        .map_err(|_| PiperError::PhonemizerFailed("espeak-ng stdin writer panicked".to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PiperError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {stderr}",
            output.status.code()
        )));
    }

    match written {
        Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => return Err(PiperError::Io(e)),
        _ => {}
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn canonicalize_espeak_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Join espeak-ng output lines into one phoneme run, dropping pause markers.
fn clean_ipa(ipa: &str) -> String {
    ipa.lines()
        .map(|line| line.trim().replace('_', ""))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    fn espeak_available() -> bool {
        Command::new("espeak-ng").arg("--version").output().is_ok()
    }

    #[test]
    fn splits_text_and_punctuation_parts() {
        let parts = split_text_parts("Hello, world. Testing!");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Hello".to_string()),
                TextPart::Punct(','),
                TextPart::Text("world".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("Testing".to_string()),
                TextPart::Punct('!'),
            ]
        );
    }

    #[test]
    fn keeps_decimal_and_thousands_separators_inside_text() {
        let parts = split_text_parts("Version 2.0 reached 1,000 users.");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Version 2.0 reached 1,000 users".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn line_breaks_end_sentences() {
        let sentences = split_sentences(split_text_parts("first line\nsecond line"));
        assert_eq!(sentences.len(), 2);
        assert_eq!(
            sentences[0],
            vec![TextPart::Text("first line".to_string()), TextPart::Punct('.')]
        );
        assert_eq!(sentences[1], vec![TextPart::Text("second line".to_string())]);
    }

    #[test]
    fn sentences_keep_inner_punctuation() {
        let sentences = split_sentences(split_text_parts("Hi, there! Bye?"));
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[0].len(), 4);
        assert_eq!(sentences[1].len(), 2);
    }

    #[test]
    fn punctuation_only_text_has_no_sentences() {
        assert!(split_sentences(split_text_parts("... !? ,")).is_empty());
        assert!(split_sentences(split_text_parts("   ")).is_empty());
    }

    #[test]
    fn assembles_phonemes_with_punctuation() {
        let sentences = split_sentences(split_text_parts("Hello, world. Bye!"));
        let ipa = vec![
            "həlˈoʊ".to_string(),
            "wˈɜːld".to_string(),
            "bˈaɪ".to_string(),
        ];
        assert_eq!(
            assemble_sentences(&sentences, &ipa),
            vec!["həlˈoʊ, wˈɜːld.".to_string(), "bˈaɪ!".to_string()]
        );
    }

    #[test]
    fn espeak_path_points_at_data_parent() {
        let cfg = EspeakConfig {
            bin_path: None,
            data_path: Some(PathBuf::from("/opt/piper/espeak-ng-data")),
        };
        assert_eq!(cfg.data_root(), Some(Path::new("/opt/piper")));

        let cfg = EspeakConfig {
            bin_path: None,
            data_path: Some(PathBuf::from("/usr/share")),
        };
        assert_eq!(cfg.data_root(), Some(Path::new("/usr/share")));

        assert_eq!(EspeakConfig::default().data_root(), None);
    }

    #[test]
    fn clean_ipa_drops_pauses_and_joins_lines() {
        assert_eq!(clean_ipa("  həlˈoʊ_ \n wˈɜːld\n\n"), "həlˈoʊ wˈɜːld");
    }

    #[test]
    fn appends_trailing_newline_for_espeak_stdin() {
        assert_eq!(canonicalize_espeak_stdin_payload("America"), "America\n");
        assert_eq!(canonicalize_espeak_stdin_payload("America\n"), "America\n");
    }

    #[test]
    fn missing_binary_is_reported() {
        let cfg = EspeakConfig {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        assert!(matches!(
            phonemize("hello", "en-us", &cfg),
            Err(PiperError::EspeakNotFound)
        ));
    }

    #[test]
    fn blank_text_never_spawns_espeak() {
        let cfg = EspeakConfig {
            bin_path: Some(PathBuf::from("/nonexistent/espeak-ng")),
            data_path: None,
        };
        assert_eq!(phonemize("   \n\t", "en-us", &cfg).unwrap(), Vec::<String>::new());
        assert_eq!(phonemize("", "en-us", &cfg).unwrap(), Vec::<String>::new());
    }

    /// Writes an executable stand-in for espeak-ng that echoes stdin.
    #[cfg(unix)]
    fn echo_espeak(dir: &Path) -> PathBuf {
        use std::fs::{self, File};
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join("espeak-ng");
        {
            let mut file = File::create(&script).unwrap();
            file.write_all(b"#!/bin/sh\nexec cat\n").unwrap();
            file.sync_all().unwrap();
        }
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    #[test]
    fn large_input_does_not_stall_on_full_pipes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EspeakConfig {
            bin_path: Some(echo_espeak(dir.path())),
            data_path: None,
        };

        // ~580 KB each way, far beyond any pipe buffer.
        let text = "abcdefghij klmnopqrstuvwxyz. ".repeat(20_000);
        let sentences = phonemize(&text, "en-us", &cfg).expect("echo phonemizer should succeed");
        assert_eq!(sentences.len(), 20_000);
        assert_eq!(sentences[0], "abcdefghij klmnopqrstuvwxyz.");
        assert_eq!(sentences[19_999], "abcdefghij klmnopqrstuvwxyz.");
    }

    #[cfg(unix)]
    #[test]
    fn echo_phonemizer_keeps_sentence_punctuation() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EspeakConfig {
            bin_path: Some(echo_espeak(dir.path())),
            data_path: None,
        };
        assert_eq!(
            phonemize("hello, there. bye!", "en-us", &cfg).unwrap(),
            vec!["hello, there.".to_string(), "bye!".to_string()]
        );
    }

    #[test]
    fn phonemizes_one_string_per_sentence() {
        if !espeak_available() {
            return;
        }

        let sentences = phonemize("Hello there. How are you?", "en-us", &EspeakConfig::default())
            .expect("phonemize should succeed");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].ends_with('.'));
        assert!(sentences[1].ends_with('?'));
    }
}
