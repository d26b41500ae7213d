mod loader;
mod pcm;
mod wav;

use crate::error::{Result, RigSoundError};
pub use loader::SoundLoader;
pub use wav::{WavDecoder, decode_wav, decode_wav_bytes};
use std::sync::Arc;
use std::time::Duration;

/// Canonical decoded sound, ready for upload to a playback buffer.
///
/// # Data Format
/// Samples are **INTERLEAVED** little-endian PCM bytes: unsigned 8-bit or signed 16-bit,
/// whatever the source encoding was. See [`AudioDataInner`] for the layout.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    inner: Arc<AudioDataInner>,
}

/// Internal decoded audio storage.
///
/// Stereo frames are laid out `[L0, R0, L1, R1, ...]`, each sample being
/// `bits_per_sample / 8` bytes. `samples.len()` is always a whole number of frames.
#[derive(Debug)]
pub(crate) struct AudioDataInner {
    pub samples: Vec<u8>,
    /// 1 = mono, 2 = stereo
    pub channels: u16,
    /// Sample rate in Hz, taken verbatim from the format chunk
    pub sample_rate: u32,
    /// 8 or 16
    pub bits_per_sample: u16,
    pub total_frames: usize,
}

impl DecodedAudio {
    pub(crate) fn new(
        mut samples: Vec<u8>,
        channels: u16,
        sample_rate: u32,
        bits_per_sample: u16,
    ) -> Result<Self> {
        if !matches!(channels, 1 | 2) {
            return Err(RigSoundError::UnsupportedFormat(format!(
                "{} channels (expected 1 or 2)",
                channels
            )));
        }
        if !matches!(bits_per_sample, 8 | 16) {
            return Err(RigSoundError::UnsupportedFormat(format!(
                "{}-bit samples after normalization (expected 8 or 16)",
                bits_per_sample
            )));
        }

        let block_align = channels as usize * (bits_per_sample as usize / 8);
        let whole = samples.len() - samples.len() % block_align;
        if whole != samples.len() {
            log::debug!(
                "Dropping {} trailing bytes of a partial frame",
                samples.len() - whole
            );
            samples.truncate(whole);
        }

        let total_frames = samples.len() / block_align;
        Ok(Self {
            inner: Arc::new(AudioDataInner {
                samples,
                channels,
                sample_rate,
                bits_per_sample,
                total_frames,
            }),
        })
    }

    /// Decode a WAV file from disk.
    pub fn from_path(path: &str) -> Result<Self> {
        WavDecoder.load(path)
    }

    /// Decode using a custom loader.
    pub fn from_path_with_loader<L: SoundLoader + ?Sized>(path: &str, loader: &L) -> Result<Self> {
        loader.load(path)
    }

    pub fn samples(&self) -> &[u8] {
        &self.inner.samples
    }

    pub fn channels(&self) -> u16 {
        self.inner.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.inner.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.inner.bits_per_sample
    }

    /// Bytes per frame
    pub fn block_align(&self) -> usize {
        self.inner.channels as usize * (self.inner.bits_per_sample as usize / 8)
    }

    pub fn total_frames(&self) -> usize {
        self.inner.total_frames
    }

    pub fn duration(&self) -> Duration {
        if self.inner.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.inner.total_frames as f64 / self.inner.sample_rate as f64)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.samples.len()
    }
}
