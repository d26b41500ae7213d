//! Event types for rigsound

use crate::backend::VoiceHandle;

/// Events held for [`poll_events`](crate::AudioSystem::poll_events) before new ones are dropped.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// A path was decoded and uploaded for the first time.
    SoundLoaded { path: String },
    /// A path failed to decode or upload and will not be retried.
    SoundFailed { path: String, error: String },
    /// A non-looping voice played its buffer to the end.
    VoiceFinished { voice: VoiceHandle },
    /// The output stream reported an error.
    StreamError { error: String },
}

impl AudioEvent {
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::SoundLoaded { path } | Self::SoundFailed { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::SoundFailed { .. } | Self::StreamError { .. })
    }
}
