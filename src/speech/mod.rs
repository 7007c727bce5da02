//! Speech synthesis and serialized playback.
//!
//! The synthesis backend is an opaque HTTP service that may reject (being
//! offline is a normal outcome); playback is a blocking drain of decoded
//! WAV audio. Both sit behind traits so the queue can be exercised without
//! a backend or an audio device.

mod playback;
mod queue;
mod voicevox;

pub use playback::{AudioPlayer, WavPlayer, decode_wav};
pub use queue::{PlaybackQueue, SpeechRequest};
pub use voicevox::{SpeechSynthesizer, VoicevoxClient};
