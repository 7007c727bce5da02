//! Koyomi: recurring schedule notification engine for a desktop assistant.
//!
//! Computes the next real-world occurrence of one-off and weekly-recurring
//! schedules, fires exactly two notifications per occurrence (a lead
//! warning and a start alert) exactly once each, survives process restarts
//! and clock drift without duplicate or missed firings, and serializes
//! speech playback so overlapping alerts never interleave audio.
//!
//! # Architecture
//!
//! Independent pieces wired together by the host application:
//! - **Occurrence resolution**: next concrete fire time per schedule
//! - **State tracking**: per-occurrence idempotency via a date key
//! - **Notification clock**: minute-aligned evaluation passes
//! - **Playback queue**: FIFO, single-consumer synthesize-then-play
//! - **Store**: bulk load/save of the schedule set behind a trait
//!
//! Data flows one way: clock tick → resolve occurrence → reconcile state →
//! fire (notify + enqueue speech) → drain queue serially → persist.

pub mod config;
pub mod error;
pub mod import;
pub mod notify;
pub mod schedule;
pub mod speech;

pub use config::{EngineConfig, SpeechConfig};
pub use error::{EngineError, Result};
pub use notify::{LogNotifier, Notifier};
pub use schedule::{
    JsonFileStore, MemoryStore, NotificationClock, NotifyStage, Occurrence, Repeat, Schedule,
    ScheduleBook, ScheduleStore, StoreEvent, TickEntry,
};
pub use speech::{
    AudioPlayer, PlaybackQueue, SpeechRequest, SpeechSynthesizer, VoicevoxClient, WavPlayer,
};
