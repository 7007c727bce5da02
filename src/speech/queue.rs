//! Serialized speech playback queue.
//!
//! A FIFO of synthesis jobs with exactly one consumer. The consumer pops
//! the head, synthesizes, and plays the result to completion before
//! touching the next job; mutual exclusion of audio and strict ordering
//! come from the drain-one-then-loop structure, not from a lock. A failed
//! job is logged and skipped; the queue never stalls on one bad entry.

use crate::speech::playback::AudioPlayer;
use crate::speech::voicevox::SpeechSynthesizer;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One speech job.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to synthesize.
    pub text: String,
    /// Backend voice identifier.
    pub speaker_id: u32,
    /// Playback speed scale.
    pub speed_scale: f32,
}

/// Handle for enqueuing speech jobs. Cloneable; the consumer task owns the
/// receiving end and exits when every handle is dropped.
#[derive(Clone)]
pub struct PlaybackQueue {
    tx: mpsc::UnboundedSender<SpeechRequest>,
}

impl PlaybackQueue {
    /// Spawn the single consumer task and return the enqueue handle.
    pub fn spawn(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        player: Arc<dyn AudioPlayer>,
    ) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<SpeechRequest>();

        let handle = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                debug!(speaker_id = job.speaker_id, "synthesizing \"{}\"", job.text);
                let audio = match synthesizer
                    .synthesize(&job.text, job.speaker_id, job.speed_scale)
                    .await
                {
                    Ok(audio) => audio,
                    Err(e) => {
                        warn!("speech synthesis failed, skipping job: {e}");
                        continue;
                    }
                };

                if let Err(e) = player.play(&audio).await {
                    warn!("audio playback failed: {e}");
                }
            }
            debug!("playback queue drained and closed");
        });

        (Self { tx }, handle)
    }

    /// Append a job. Starts draining immediately when the consumer is idle.
    pub fn enqueue(&self, request: SpeechRequest) {
        if self.tx.send(request).is_err() {
            warn!("playback queue consumer is gone, dropping speech job");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::error::{EngineError, Result};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the interleaving of synthesis and playback calls.
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_texts: Vec<String>,
    }

    impl Recorder {
        fn new(fail_texts: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                log: Mutex::new(Vec::new()),
                fail_texts: fail_texts.iter().map(|s| (*s).to_owned()).collect(),
            })
        }

        fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for Recorder {
        async fn synthesize(&self, text: &str, _: u32, _: f32) -> Result<Vec<u8>> {
            self.log.lock().unwrap().push(format!("synth:{text}"));
            if self.fail_texts.iter().any(|t| t == text) {
                return Err(EngineError::Tts("backend offline".into()));
            }
            Ok(text.as_bytes().to_vec())
        }
    }

    #[async_trait]
    impl AudioPlayer for Recorder {
        async fn play(&self, wav: &[u8]) -> Result<()> {
            let text = String::from_utf8_lossy(wav).into_owned();
            // Yield before recording completion so an out-of-order consumer
            // would interleave and fail the ordering assertions.
            tokio::task::yield_now().await;
            self.log.lock().unwrap().push(format!("play:{text}"));
            Ok(())
        }
    }

    fn request(text: &str) -> SpeechRequest {
        SpeechRequest {
            text: text.to_owned(),
            speaker_id: 0,
            speed_scale: 1.0,
        }
    }

    #[tokio::test]
    async fn jobs_drain_in_strict_fifo_order() {
        let recorder = Recorder::new(&[]);
        let (queue, handle) = PlaybackQueue::spawn(
            Arc::clone(&recorder) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&recorder) as Arc<dyn AudioPlayer>,
        );

        queue.enqueue(request("A"));
        queue.enqueue(request("B"));
        queue.enqueue(request("C"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(
            recorder.entries(),
            ["synth:A", "play:A", "synth:B", "play:B", "synth:C", "play:C"]
        );
    }

    #[tokio::test]
    async fn playback_of_a_completes_before_b_is_synthesized() {
        let recorder = Recorder::new(&[]);
        let (queue, handle) = PlaybackQueue::spawn(
            Arc::clone(&recorder) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&recorder) as Arc<dyn AudioPlayer>,
        );

        queue.enqueue(request("A"));
        queue.enqueue(request("B"));
        drop(queue);
        handle.await.unwrap();

        let entries = recorder.entries();
        let play_a = entries.iter().position(|e| e == "play:A").unwrap();
        let synth_b = entries.iter().position(|e| e == "synth:B").unwrap();
        assert!(play_a < synth_b);
    }

    #[tokio::test]
    async fn synthesis_failure_skips_to_next_job() {
        let recorder = Recorder::new(&["A"]);
        let (queue, handle) = PlaybackQueue::spawn(
            Arc::clone(&recorder) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&recorder) as Arc<dyn AudioPlayer>,
        );

        queue.enqueue(request("A"));
        queue.enqueue(request("B"));
        drop(queue);
        handle.await.unwrap();

        assert_eq!(recorder.entries(), ["synth:A", "synth:B", "play:B"]);
    }

    #[tokio::test]
    async fn enqueue_after_consumer_exit_is_swallowed() {
        let recorder = Recorder::new(&[]);
        let (queue, handle) = PlaybackQueue::spawn(
            Arc::clone(&recorder) as Arc<dyn SpeechSynthesizer>,
            Arc::clone(&recorder) as Arc<dyn AudioPlayer>,
        );
        handle.abort();
        let _ = handle.await;
        queue.enqueue(request("late"));
    }
}
