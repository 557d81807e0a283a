//! Text-to-speech rendering and audio file management.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;

const DEFAULT_OPENAI_BASE: &str = "https://api.openai.com/v1";
const TTS_MODEL: &str = "tts-1-hd";
const WORDS_PER_MINUTE: f64 = 150.0;

/// Narration voice, one per episode kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Nova,
    Alloy,
    Echo,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Nova => "nova",
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
        }
    }
}

/// A rendered mp3 on disk plus the metadata stored on the episode row
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub audio_url: String,
    pub file_path: String,
    pub file_size_bytes: i64,
    pub duration_seconds: i32,
}

/// Converts a script into mp3 bytes.
#[allow(async_fn_in_trait)]
pub trait SpeechEngine {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>>;
}

pub struct OpenAiSpeechEngine {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiSpeechEngine {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self::with_base_url(http, api_key, DEFAULT_OPENAI_BASE.to_string())
    }

    pub fn with_base_url(http: reqwest::Client, api_key: String, base_url: String) -> Self {
        Self {
            http,
            api_key,
            base_url,
        }
    }
}

impl SpeechEngine for OpenAiSpeechEngine {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<Vec<u8>> {
        let url = format!("{}/audio/speech", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": TTS_MODEL,
                "input": text,
                "voice": voice.as_str(),
                "response_format": "mp3",
            }))
            .send()
            .await
            .context("Speech synthesis request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Speech synthesis failed: {} - {}", status, body);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read synthesized audio")?;

        Ok(bytes.to_vec())
    }
}

/// Renders scripts to disk and produces the public URL for the file.
pub struct AudioRenderer<S> {
    engine: S,
    audio_dir: PathBuf,
    base_url: String,
}

impl<S: SpeechEngine> AudioRenderer<S> {
    pub fn new(engine: S, audio_dir: PathBuf, base_url: String) -> Self {
        Self {
            engine,
            audio_dir,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Synthesize `script` and write it as `<file_stem>.mp3`.
    pub async fn render(
        &self,
        script: &str,
        voice: Voice,
        file_stem: &str,
    ) -> Result<AudioArtifact> {
        let bytes = self.engine.synthesize(script, voice).await?;

        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .with_context(|| format!("Could not create audio dir {:?}", self.audio_dir))?;

        let file_name = format!("{}.mp3", file_stem);
        let path = self.audio_dir.join(&file_name);
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("Could not write audio file {:?}", path))?;

        Ok(AudioArtifact {
            audio_url: format!("{}/{}", self.base_url, file_name),
            file_path: path.to_string_lossy().into_owned(),
            file_size_bytes: bytes.len() as i64,
            duration_seconds: estimate_duration_seconds(script),
        })
    }
}

/// Spoken duration estimate from word count at a typical narration pace.
pub fn estimate_duration_seconds(script: &str) -> i32 {
    let words = script.split_whitespace().count();
    (words as f64 / WORDS_PER_MINUTE * 60.0) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEngine {
        bytes: Vec<u8>,
    }

    impl SpeechEngine for FixedEngine {
        async fn synthesize(&self, _text: &str, _voice: Voice) -> Result<Vec<u8>> {
            Ok(self.bytes.clone())
        }
    }

    struct BrokenEngine;

    impl SpeechEngine for BrokenEngine {
        async fn synthesize(&self, _text: &str, _voice: Voice) -> Result<Vec<u8>> {
            anyhow::bail!("synthesis unavailable")
        }
    }

    #[test]
    fn duration_estimate_scales_with_word_count() {
        assert_eq!(estimate_duration_seconds(""), 0);
        // 150 words is one minute of narration
        let minute = vec!["word"; 150].join(" ");
        assert_eq!(estimate_duration_seconds(&minute), 60);
        let half = vec!["word"; 75].join(" ");
        assert_eq!(estimate_duration_seconds(&half), 30);
    }

    #[tokio::test]
    async fn render_writes_file_and_reports_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = AudioRenderer::new(
            FixedEngine {
                bytes: vec![0u8; 2048],
            },
            dir.path().to_path_buf(),
            "http://localhost:8000/audio/".to_string(),
        );

        let script = vec!["hello"; 300].join(" ");
        let artifact = renderer
            .render(&script, Voice::Alloy, "daily_u1_2025-06-02")
            .await
            .unwrap();

        assert_eq!(artifact.file_size_bytes, 2048);
        assert_eq!(artifact.duration_seconds, 120);
        assert_eq!(
            artifact.audio_url,
            "http://localhost:8000/audio/daily_u1_2025-06-02.mp3"
        );
        assert!(std::path::Path::new(&artifact.file_path).exists());
    }

    #[tokio::test]
    async fn render_propagates_synthesis_failure() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = AudioRenderer::new(
            BrokenEngine,
            dir.path().to_path_buf(),
            "http://localhost:8000/audio".to_string(),
        );

        let err = renderer
            .render("anything", Voice::Nova, "welcome_u1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("synthesis unavailable"));
    }

    #[test]
    fn voice_names_match_api_values() {
        assert_eq!(Voice::Nova.as_str(), "nova");
        assert_eq!(Voice::Alloy.as_str(), "alloy");
        assert_eq!(Voice::Echo.as_str(), "echo");
    }
}
