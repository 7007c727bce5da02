//! VOICEVOX-style speech synthesis backend client.
//!
//! The backend exposes a two-step protocol: `POST /audio_query` builds a
//! synthesis query from text, the caller patches tuning fields into the
//! query JSON, and `POST /synthesis` renders it to WAV bytes.

use crate::config::SpeechConfig;
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use tracing::debug;

/// Opaque async speech synthesis.
///
/// Rejection is a normal, expected outcome (backend offline); callers log
/// and move on rather than propagating the failure.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to WAV bytes.
    async fn synthesize(&self, text: &str, speaker_id: u32, speed_scale: f32) -> Result<Vec<u8>>;
}

/// HTTP client for a VOICEVOX-compatible synthesis engine.
pub struct VoicevoxClient {
    http: reqwest::Client,
    base_url: String,
}

impl VoicevoxClient {
    /// Create a client for the configured backend endpoint.
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for VoicevoxClient {
    async fn synthesize(&self, text: &str, speaker_id: u32, speed_scale: f32) -> Result<Vec<u8>> {
        debug!(speaker_id, "requesting audio query for \"{text}\"");
        let speaker = speaker_id.to_string();

        let mut query: serde_json::Value = self
            .http
            .post(format!("{}/audio_query", self.base_url))
            .query(&[("text", text), ("speaker", speaker.as_str())])
            .send()
            .await
            .map_err(|e| EngineError::Tts(format!("audio query request failed: {e}")))?
            .error_for_status()
            .map_err(|e| EngineError::Tts(format!("audio query rejected: {e}")))?
            .json()
            .await
            .map_err(|e| EngineError::Tts(format!("audio query is not JSON: {e}")))?;

        if let Some(fields) = query.as_object_mut() {
            fields.insert(
                "speedScale".to_owned(),
                serde_json::Value::from(f64::from(speed_scale)),
            );
        }

        let audio = self
            .http
            .post(format!("{}/synthesis", self.base_url))
            .query(&[("speaker", speaker.as_str())])
            .json(&query)
            .send()
            .await
            .map_err(|e| EngineError::Tts(format!("synthesis request failed: {e}")))?
            .error_for_status()
            .map_err(|e| EngineError::Tts(format!("synthesis rejected: {e}")))?
            .bytes()
            .await
            .map_err(|e| EngineError::Tts(format!("cannot read synthesis body: {e}")))?;

        debug!(bytes = audio.len(), "synthesis complete");
        Ok(audio.to_vec())
    }
}
