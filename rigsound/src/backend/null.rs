use crate::backend::{
    AudioBackend, BufferFormat, BufferHandle, DistanceModel, PlayState, VoiceHandle, VoiceParams,
};
use crate::error::{Result, RigSoundError};
use crate::math::Vec3;

/// Backend used when no audio device could be opened.
///
/// Creation calls fail with `DeviceUnavailable`; everything else does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

impl NullBackend {
    fn unavailable<T>(what: &str) -> Result<T> {
        Err(RigSoundError::DeviceUnavailable(format!(
            "cannot {} without an audio device",
            what
        )))
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &str {
        "null"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn set_distance_model(&mut self, _model: DistanceModel) {}

    fn set_listener_gain(&mut self, _gain: f32) {}

    fn set_listener(&mut self, _position: Vec3, _forward: Vec3, _up: Vec3) {}

    fn create_buffer(&mut self) -> Result<BufferHandle> {
        Self::unavailable("create a buffer")
    }

    fn upload_buffer(
        &mut self,
        _buffer: BufferHandle,
        _format: BufferFormat,
        _data: &[u8],
        _sample_rate: u32,
    ) -> Result<()> {
        Self::unavailable("upload a buffer")
    }

    fn delete_buffer(&mut self, _buffer: BufferHandle) {}

    fn create_voice(&mut self) -> Result<VoiceHandle> {
        Self::unavailable("create a voice")
    }

    fn delete_voice(&mut self, _voice: VoiceHandle) {}

    fn configure_voice(&mut self, _voice: VoiceHandle, _params: &VoiceParams) -> Result<()> {
        Self::unavailable("configure a voice")
    }

    fn play_voice(&mut self, _voice: VoiceHandle) {}

    fn stop_voice(&mut self, _voice: VoiceHandle) {}

    fn voice_state(&self, _voice: VoiceHandle) -> PlayState {
        PlayState::Stopped
    }

    fn close(&mut self) {}
}
