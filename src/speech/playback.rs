//! WAV playback to system speakers via cpal.

use crate::error::{EngineError, Result};
use async_trait::async_trait;
use cpal::StreamConfig;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use tracing::error;

/// Plays one synthesized clip to completion. Exactly one clip is ever in
/// flight; the playback queue awaits completion before the next job.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play WAV bytes to completion.
    async fn play(&self, wav: &[u8]) -> Result<()>;
}

/// Default output-device player: hound-decoded WAV through a cpal stream.
#[derive(Debug, Default)]
pub struct WavPlayer;

impl WavPlayer {
    /// Create a player using the system default output device.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioPlayer for WavPlayer {
    async fn play(&self, wav: &[u8]) -> Result<()> {
        let wav = wav.to_vec();
        tokio::task::spawn_blocking(move || play_blocking(&wav))
            .await
            .map_err(|e| EngineError::Audio(format!("playback task failed: {e}")))?
    }
}

/// Decode WAV bytes to mono f32 samples and their sample rate.
pub fn decode_wav(wav: &[u8]) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(wav))
        .map_err(|e| EngineError::Audio(format!("cannot parse WAV: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| EngineError::Audio(format!("cannot decode WAV samples: {e}")))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| EngineError::Audio(format!("cannot decode WAV samples: {e}")))?
        }
    };

    let mono = if spec.channels > 1 {
        let channels = spec.channels as usize;
        samples
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    } else {
        samples
    };

    Ok((mono, spec.sample_rate))
}

struct PlaybackBuffer {
    samples: Vec<f32>,
    position: usize,
    finished: bool,
}

fn play_blocking(wav: &[u8]) -> Result<()> {
    let (samples, sample_rate) = decode_wav(wav)?;
    if samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| EngineError::Audio("no default output device".into()))?;

    let stream_config = StreamConfig {
        channels: 1,
        sample_rate,
        buffer_size: cpal::BufferSize::Default,
    };

    let buffer = Arc::new(Mutex::new(PlaybackBuffer {
        samples,
        position: 0,
        finished: false,
    }));
    let buffer_clone = Arc::clone(&buffer);

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                let mut buf = match buffer_clone.lock() {
                    Ok(b) => b,
                    Err(_) => return,
                };

                for sample in data.iter_mut() {
                    if buf.position < buf.samples.len() {
                        *sample = buf.samples[buf.position];
                        buf.position += 1;
                    } else {
                        *sample = 0.0;
                        buf.finished = true;
                    }
                }
            },
            move |err| {
                error!("audio output stream error: {err}");
            },
            None,
        )
        .map_err(|e| EngineError::Audio(format!("failed to build output stream: {e}")))?;

    stream
        .play()
        .map_err(|e| EngineError::Audio(format!("failed to start output stream: {e}")))?;

    // Wait for playback to finish
    loop {
        std::thread::sleep(std::time::Duration::from_millis(10));
        let buf = buffer
            .lock()
            .map_err(|e| EngineError::Audio(format!("playback buffer lock poisoned: {e}")))?;
        if buf.finished {
            break;
        }
    }

    drop(stream);
    Ok(())
}
