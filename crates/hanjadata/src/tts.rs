//! Generates reading audio with either Google Chirp 3 or Resemble AI.
//!
//! One mp3 per (reading, voice). Files already on disk are skipped so the
//! loop can resume after a partial run.

use crate::net::FixedDelay;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use eyre::{bail, WrapErr};
use hanjadata_core::records::{EnrichedRecord, ReadingGroup};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

const GOOGLE_API_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";
const RESEMBLE_API_URL: &str = "https://f.cluster.resemble.ai/synthesize";

/// A voice to render each reading with. For Google `id` is the voice name,
/// for Resemble it is the voice UUID.
#[derive(Debug, Clone, Copy)]
pub struct Voice {
    pub id: &'static str,
    pub gender: &'static str,
    pub suffix: &'static str,
}

const GOOGLE_VOICES: &[Voice] = &[
    Voice {
        id: "ja-JP-Chirp-3-A",
        gender: "FEMALE",
        suffix: "female",
    },
    Voice {
        id: "ja-JP-Chirp-3-B",
        gender: "MALE",
        suffix: "male",
    },
];

const RESEMBLE_VOICES: &[Voice] = &[Voice {
    id: "55592656",
    gender: "FEMALE",
    suffix: "female",
}];

pub enum TtsProvider {
    Google { api_key: String },
    Resemble { api_key: String },
}

impl TtsProvider {
    /// Selects the provider from `TTS_PROVIDER` (defaults to `google`) and
    /// reads its API key from the environment.
    pub fn from_env() -> eyre::Result<Self> {
        let provider = std::env::var("TTS_PROVIDER").unwrap_or_else(|_| "google".to_string());
        match provider.as_str() {
            "google" => {
                let api_key = std::env::var("GOOGLE_TTS_API_KEY")
                    .wrap_err("GOOGLE_TTS_API_KEY is not set")?;
                Ok(Self::Google { api_key })
            }
            "resemble" => {
                let api_key =
                    std::env::var("RESEMBLE_API_KEY").wrap_err("RESEMBLE_API_KEY is not set")?;
                Ok(Self::Resemble { api_key })
            }
            other => bail!("Unsupported TTS provider '{other}'"),
        }
    }

    pub fn voices(&self) -> &'static [Voice] {
        match self {
            Self::Google { .. } => GOOGLE_VOICES,
            Self::Resemble { .. } => RESEMBLE_VOICES,
        }
    }

    /// Synthesizes `text` and returns the mp3 bytes.
    pub fn synthesize(
        &self,
        client: &reqwest::blocking::Client,
        text: &str,
        voice: &Voice,
    ) -> eyre::Result<Vec<u8>> {
        match self {
            Self::Google { api_key } => synthesize_google(client, api_key, text, voice),
            Self::Resemble { api_key } => synthesize_resemble(client, api_key, text, voice),
        }
    }
}

#[derive(Debug, Serialize)]
struct GoogleRequest<'a> {
    input: GoogleInput<'a>,
    voice: GoogleVoice<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: GoogleAudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct GoogleInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GoogleVoice<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
    #[serde(rename = "ssmlGender")]
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
struct GoogleAudioConfig<'a> {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

fn synthesize_google(
    client: &reqwest::blocking::Client,
    api_key: &str,
    text: &str,
    voice: &Voice,
) -> eyre::Result<Vec<u8>> {
    let request = GoogleRequest {
        input: GoogleInput { text },
        voice: GoogleVoice {
            language_code: "ja-JP",
            name: voice.id,
            ssml_gender: voice.gender,
        },
        audio_config: GoogleAudioConfig {
            audio_encoding: "MP3",
        },
    };
    let response = client
        .post(format!("{GOOGLE_API_URL}?key={api_key}"))
        .json(&request)
        .send()
        .wrap_err("Failed to call the Google TTS API")?;
    if !response.status().is_success() {
        bail!("Google TTS returned {}", response.status());
    }
    let response: GoogleResponse = response
        .json()
        .wrap_err("Failed to parse the Google TTS response")?;
    BASE64
        .decode(response.audio_content)
        .wrap_err("Google TTS returned invalid base64 audio")
}

#[derive(Debug, Serialize)]
struct ResembleRequest<'a> {
    voice_uuid: &'a str,
    data: &'a str,
    output_format: &'a str,
    sample_rate: u32,
}

#[derive(Debug, Deserialize)]
struct ResembleResponse {
    success: bool,
    #[serde(default)]
    audio_content: String,
    #[serde(default)]
    issues: Option<serde_json::Value>,
}

fn synthesize_resemble(
    client: &reqwest::blocking::Client,
    api_key: &str,
    text: &str,
    voice: &Voice,
) -> eyre::Result<Vec<u8>> {
    let request = ResembleRequest {
        voice_uuid: voice.id,
        data: text,
        output_format: "mp3",
        sample_rate: 48000,
    };
    let response: ResembleResponse = client
        .post(RESEMBLE_API_URL)
        .header("Authorization", api_key)
        .json(&request)
        .send()
        .wrap_err("Failed to call the Resemble API")?
        .json()
        .wrap_err("Failed to parse the Resemble response")?;
    if !response.success || response.audio_content.is_empty() {
        bail!(
            "Resemble synthesis failed: {}",
            response
                .issues
                .map(|issues| issues.to_string())
                .unwrap_or_else(|| "unknown error".to_string())
        );
    }
    BASE64
        .decode(response.audio_content)
        .wrap_err("Resemble returned invalid base64 audio")
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct TtsStats {
    pub generated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Renders audio for every onyomi and kunyomi reading of every record into
/// `dir` as `<id>_<kanji>_<type>_<kana>_<suffix>.mp3`.
pub fn generate_audio(
    provider: &TtsProvider,
    client: &reqwest::blocking::Client,
    records: &[EnrichedRecord],
    dir: &Path,
    limiter: &mut FixedDelay,
) -> eyre::Result<TtsStats> {
    fs::create_dir_all(dir).wrap_err_with(|| format!("Failed to create {}", dir.display()))?;

    let mut stats = TtsStats::default();
    for record in records {
        process_group(provider, client, record, &record.onyomi, "onyomi", dir, limiter, &mut stats)?;
        process_group(provider, client, record, &record.kunyomi, "kunyomi", dir, limiter, &mut stats)?;
    }
    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
fn process_group(
    provider: &TtsProvider,
    client: &reqwest::blocking::Client,
    record: &EnrichedRecord,
    group: &ReadingGroup,
    reading_type: &str,
    dir: &Path,
    limiter: &mut FixedDelay,
    stats: &mut TtsStats,
) -> eyre::Result<()> {
    for reading in &group.readings {
        let kana = reading.kana.trim();
        let cleaned = clean_kana_text(kana);
        if cleaned.is_empty() {
            continue;
        }
        let file_kana = sanitize_file_name(kana);

        for voice in provider.voices() {
            let file_name = format!(
                "{}_{}_{reading_type}_{file_kana}_{}.mp3",
                record.id, record.kanji, voice.suffix
            );
            let target = dir.join(&file_name);
            if target.exists() {
                stats.skipped += 1;
                continue;
            }

            limiter.pause();
            match provider.synthesize(client, &cleaned, voice) {
                Ok(audio) => {
                    fs::write(&target, audio)
                        .wrap_err_with(|| format!("Failed to write {}", target.display()))?;
                    tracing::info!("generated {file_name}");
                    stats.generated += 1;
                }
                Err(error) => {
                    tracing::warn!("failed to generate {file_name}: {error:#}");
                    stats.failed += 1;
                }
            }
        }
    }
    Ok(())
}

/// Replaces characters that are unsafe in file names with underscores and
/// collapses whitespace runs into a single underscore.
pub fn sanitize_file_name(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
        } else {
            in_whitespace = false;
            if matches!(c, '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>') {
                out.push('_');
            } else {
                out.push(c);
            }
        }
    }
    out
}

/// Strips punctuation and whitespace from kana before sending it to TTS, so
/// annotations like `あわ(れ)` are read as plain kana.
pub fn clean_kana_text(text: &str) -> String {
    const PUNCTUATION: &str = "!@#$%^&*()_+-=[]{};':\"\\|,.<>/?~`";
    text.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !PUNCTUATION.contains(*c))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sanitizes_unsafe_file_name_characters() {
        assert_eq!(sanitize_file_name("あ/わ:れ"), "あ_わ_れ");
        assert_eq!(sanitize_file_name("ア  イ"), "ア_イ");
        assert_eq!(sanitize_file_name("アイ"), "アイ");
    }

    #[test]
    fn cleans_kana_for_synthesis() {
        assert_eq!(clean_kana_text("あわ(れ)"), "あわれ");
        assert_eq!(clean_kana_text(" アイ "), "アイ");
        assert_eq!(clean_kana_text("かな・しい"), "かな・しい");
    }
}
