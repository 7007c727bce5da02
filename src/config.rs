//! Configuration types for the notification engine.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the notification engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minutes before an occurrence at which the lead warning fires.
    pub lead_minutes: i64,
    /// Grace window in milliseconds.
    ///
    /// A tick that runs up to this long after an occurrence still fires the
    /// start alert; an occurrence older than this is considered missed and
    /// silently suppressed. Tunable because acceptable drift after system
    /// sleep/resume varies by deployment.
    pub cooldown_ms: i64,
    /// Seconds between evaluation passes.
    ///
    /// Boundary alignment and lead/start firing assume the minute grid:
    /// a pass fires boundary transitions only when its wall-clock second
    /// is 0. Keep this at 60 unless passes are driven manually through
    /// [`NotificationClock::run_pass`].
    ///
    /// [`NotificationClock::run_pass`]: crate::schedule::NotificationClock::run_pass
    pub tick_interval_secs: u64,
    /// Speech synthesis settings.
    pub speech: SpeechConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lead_minutes: 5,
            cooldown_ms: 90_000,
            tick_interval_secs: 60,
            speech: SpeechConfig::default(),
        }
    }
}

/// Speech synthesis backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the synthesis HTTP backend.
    pub base_url: String,
    /// Voice/speaker identifier passed to the backend.
    pub speaker_id: u32,
    /// Playback speed scale (1.0 = normal).
    pub speed_scale: f32,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:50021".to_owned(),
            speaker_id: 0,
            speed_scale: 1.0,
        }
    }
}
