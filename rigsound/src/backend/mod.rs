//! Playback backends.
//!
//! The core never talks to a sound device directly. It drives an [`AudioBackend`], which owns
//! device buffers and voices and is chosen once when the [`AudioSystem`](crate::AudioSystem)
//! is initialized:
//!
//! - [`CpalBackend`]: streams the software mixer to the default output device
//! - [`SoftwareBackend`]: in-process mixer, rendered on demand
//! - [`NullBackend`]: no device; every operation is a no-op or reports `DeviceUnavailable`

mod cpal_device;
mod null;
mod resampler;
mod software;

pub use cpal_device::CpalBackend;
pub use null::NullBackend;
pub use resampler::AudioResampler;
pub use software::SoftwareBackend;

use crate::config::Attenuation;
use crate::error::Result;
use crate::math::Vec3;

/// Handle to a device buffer holding one uploaded sound.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BufferHandle({})", self.0)
    }
}

/// Handle to a physical playback slot.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VoiceHandle(pub(crate) u32);

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VoiceHandle({})", self.0)
    }
}

/// Sample layout of an uploaded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    Mono8,
    Mono16,
    Stereo8,
    Stereo16,
}

impl BufferFormat {
    /// Maps a channel count and bit depth to a buffer layout, if one exists.
    pub fn from_layout(channels: u16, bits_per_sample: u16) -> Option<Self> {
        match (channels, bits_per_sample) {
            (1, 8) => Some(Self::Mono8),
            (1, 16) => Some(Self::Mono16),
            (2, 8) => Some(Self::Stereo8),
            (2, 16) => Some(Self::Stereo16),
            _ => None,
        }
    }

    pub fn channels(&self) -> u16 {
        match self {
            Self::Mono8 | Self::Mono16 => 1,
            Self::Stereo8 | Self::Stereo16 => 2,
        }
    }

    pub fn bits_per_sample(&self) -> u16 {
        match self {
            Self::Mono8 | Self::Stereo8 => 8,
            Self::Mono16 | Self::Stereo16 => 16,
        }
    }

    /// Bytes per frame
    pub fn block_align(&self) -> usize {
        self.channels() as usize * self.bits_per_sample() as usize / 8
    }
}

/// Observed transport state of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Created or reconfigured, never started since
    #[default]
    Initial,
    Playing,
    Stopped,
}

/// Global distance model applied to positional voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceModel {
    /// No distance attenuation
    None,
    /// Inverse distance, clamped between reference and max distance
    #[default]
    InverseClamped,
}

/// Everything a voice is configured with before it is started.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub buffer: BufferHandle,
    pub position: Vec3,
    pub velocity: Vec3,
    pub gain: f32,
    pub pitch: f32,
    pub looping: bool,
    /// Position is interpreted relative to the listener instead of in world space
    pub relative: bool,
    pub attenuation: Attenuation,
}

impl VoiceParams {
    /// Positional one-shot in world space.
    pub fn spatial(buffer: BufferHandle, position: Vec3, gain: f32, attenuation: Attenuation) -> Self {
        Self {
            buffer,
            position,
            velocity: Vec3::ZERO,
            gain,
            pitch: 1.0,
            looping: false,
            relative: false,
            attenuation,
        }
    }

    /// One-shot pinned to the listener, unaffected by listener movement.
    pub fn non_spatial(buffer: BufferHandle, gain: f32) -> Self {
        Self {
            buffer,
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            gain,
            pitch: 1.0,
            looping: false,
            relative: true,
            attenuation: Attenuation::default(),
        }
    }

    pub fn is_spatial(&self) -> bool {
        !self.relative
    }
}

/// Device binding driven by the sound cache, channel manager and listener.
///
/// Buffer creation is split in two steps ([`create_buffer`](Self::create_buffer) then
/// [`upload_buffer`](Self::upload_buffer)) so a caller can release a half-created buffer when
/// the upload is rejected.
pub trait AudioBackend {
    /// Short backend name for logs
    fn name(&self) -> &str;

    /// Returns false when no device stands behind this backend.
    fn is_available(&self) -> bool;

    fn set_distance_model(&mut self, model: DistanceModel);

    fn set_listener_gain(&mut self, gain: f32);

    /// Applies listener position and orientation. `forward` and `up` are unit vectors.
    fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3);

    fn create_buffer(&mut self) -> Result<BufferHandle>;

    /// Fills a buffer with PCM bytes laid out as `format`.
    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        format: BufferFormat,
        data: &[u8],
        sample_rate: u32,
    ) -> Result<()>;

    fn delete_buffer(&mut self, buffer: BufferHandle);

    fn create_voice(&mut self) -> Result<VoiceHandle>;

    fn delete_voice(&mut self, voice: VoiceHandle);

    /// Attaches a buffer and sets every playback parameter. The voice must not be playing.
    fn configure_voice(&mut self, voice: VoiceHandle, params: &VoiceParams) -> Result<()>;

    fn play_voice(&mut self, voice: VoiceHandle);

    /// Stops a voice. Stopping an idle voice is a no-op.
    fn stop_voice(&mut self, voice: VoiceHandle);

    fn voice_state(&self, voice: VoiceHandle) -> PlayState;

    /// Releases the device. The backend is unusable afterwards.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_format_mapping() {
        assert_eq!(BufferFormat::from_layout(1, 8), Some(BufferFormat::Mono8));
        assert_eq!(BufferFormat::from_layout(1, 16), Some(BufferFormat::Mono16));
        assert_eq!(BufferFormat::from_layout(2, 8), Some(BufferFormat::Stereo8));
        assert_eq!(BufferFormat::from_layout(2, 16), Some(BufferFormat::Stereo16));
        assert_eq!(BufferFormat::from_layout(2, 24), None);
        assert_eq!(BufferFormat::from_layout(6, 16), None);
        assert_eq!(BufferFormat::Stereo16.block_align(), 4);
    }

    #[test]
    fn test_voice_params_presets() {
        let buffer = BufferHandle(7);
        let spatial = VoiceParams::spatial(buffer, Vec3::new(1.0, 2.0, 3.0), 0.5, Attenuation::default());
        assert!(spatial.is_spatial());
        assert_eq!(spatial.velocity, Vec3::ZERO);
        assert_eq!(spatial.pitch, 1.0);
        assert!(!spatial.looping);
        assert_eq!(spatial.attenuation.reference_distance, 2.0);
        assert_eq!(spatial.attenuation.max_distance, 50.0);

        let ui = VoiceParams::non_spatial(buffer, 0.8);
        assert!(!ui.is_spatial());
        assert_eq!(ui.position, Vec3::ZERO);
        assert_eq!(ui.velocity, Vec3::ZERO);
    }
}
