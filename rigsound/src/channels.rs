//! Voice allocation: three reserved role voices plus a growing pool of anonymous ones.

use crate::backend::{AudioBackend, BufferHandle, PlayState, VoiceHandle, VoiceParams};
use crate::config::Attenuation;
use crate::error::Result;
use crate::math::Vec3;

/// Named channel with a dedicated voice. At most one sound plays per role; a new request
/// replaces whatever the role was playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Interface clicks, non-positional
    Ui,
    /// Footsteps and other movement
    Step,
    /// Scene interactions (assemble/disassemble)
    Action,
}

impl ChannelRole {
    pub const ALL: [ChannelRole; 3] = [Self::Ui, Self::Step, Self::Action];

    fn index(self) -> usize {
        match self {
            Self::Ui => 0,
            Self::Step => 1,
            Self::Action => 2,
        }
    }
}

impl std::fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ui => "ui",
            Self::Step => "step",
            Self::Action => "action",
        };
        f.write_str(name)
    }
}

/// First voice in `voices` that is not currently playing.
pub fn first_idle(voices: &[VoiceHandle], backend: &dyn AudioBackend) -> Option<VoiceHandle> {
    voices
        .iter()
        .copied()
        .find(|voice| backend.voice_state(*voice) != PlayState::Playing)
}

/// Owns every voice and maps playback requests onto them.
///
/// Reserved voices belong to their role only: anonymous one-shots are served from the pool,
/// which grows by one voice whenever all pool voices are busy and never shrinks.
pub struct ChannelManager {
    reserved: [Option<VoiceHandle>; 3],
    pool: Vec<VoiceHandle>,
    attenuation: Attenuation,
}

impl ChannelManager {
    pub fn new(attenuation: Attenuation) -> Self {
        Self {
            reserved: [None; 3],
            pool: Vec::new(),
            attenuation,
        }
    }

    /// Creates the UI, STEP and ACTION voices. On failure, whatever was created is deleted.
    pub fn create_reserved(&mut self, backend: &mut dyn AudioBackend) -> Result<()> {
        for role in ChannelRole::ALL {
            if self.reserved[role.index()].is_some() {
                continue;
            }
            match backend.create_voice() {
                Ok(voice) => {
                    log::debug!("Reserved {} for the {} channel", voice, role);
                    self.reserved[role.index()] = Some(voice);
                }
                Err(e) => {
                    self.release_all(backend);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    pub fn reserved_voice(&self, role: ChannelRole) -> Option<VoiceHandle> {
        self.reserved[role.index()]
    }

    /// Starts `buffer` on the role's voice, or on a pool voice when `role` is `None`.
    ///
    /// Spatial voices sit at `position` in world space and fall off with distance.
    /// Non-spatial voices are pinned to the listener and ignore `position`.
    ///
    /// Returns the voice used, or `None` when no voice could be obtained or configured.
    pub fn play(
        &mut self,
        backend: &mut dyn AudioBackend,
        role: Option<ChannelRole>,
        buffer: BufferHandle,
        position: Vec3,
        gain: f32,
        spatial: bool,
    ) -> Option<VoiceHandle> {
        let voice = match role {
            Some(role) => self.reserved_voice(role)?,
            None => self.acquire_pool_voice(backend)?,
        };

        let params = if spatial {
            VoiceParams::spatial(buffer, position, gain, self.attenuation)
        } else {
            VoiceParams::non_spatial(buffer, gain)
        };

        // Newest request wins on a role voice
        backend.stop_voice(voice);
        if let Err(e) = backend.configure_voice(voice, &params) {
            log::warn!("Could not configure {}: {}", voice, e);
            return None;
        }
        backend.play_voice(voice);
        Some(voice)
    }

    /// Reuses the first idle pool voice, or grows the pool by one.
    fn acquire_pool_voice(&mut self, backend: &mut dyn AudioBackend) -> Option<VoiceHandle> {
        if let Some(voice) = first_idle(&self.pool, backend) {
            return Some(voice);
        }

        match backend.create_voice() {
            Ok(voice) => {
                log::debug!("Pool grew to {} voices", self.pool.len() + 1);
                self.pool.push(voice);
                Some(voice)
            }
            Err(e) => {
                log::warn!("No voice available for a one-shot: {}", e);
                None
            }
        }
    }

    pub fn stop(&self, role: ChannelRole, backend: &mut dyn AudioBackend) {
        if let Some(voice) = self.reserved_voice(role) {
            backend.stop_voice(voice);
        }
    }

    pub fn stop_all(&self, backend: &mut dyn AudioBackend) {
        for voice in self.voices() {
            backend.stop_voice(voice);
        }
    }

    /// Stops and deletes every voice, reserved ones included.
    pub fn release_all(&mut self, backend: &mut dyn AudioBackend) {
        for voice in self.voices() {
            backend.stop_voice(voice);
            backend.delete_voice(voice);
        }
        self.reserved = [None; 3];
        self.pool.clear();
    }

    /// Reserved voices followed by pool voices.
    pub fn voices(&self) -> Vec<VoiceHandle> {
        self.reserved
            .iter()
            .flatten()
            .copied()
            .chain(self.pool.iter().copied())
            .collect()
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn voice_count(&self) -> usize {
        self.reserved.iter().flatten().count() + self.pool.len()
    }

    pub fn is_playing(&self, role: ChannelRole, backend: &dyn AudioBackend) -> bool {
        self.reserved_voice(role)
            .is_some_and(|voice| backend.voice_state(voice) == PlayState::Playing)
    }

    pub fn playing_count(&self, backend: &dyn AudioBackend) -> usize {
        self.voices()
            .into_iter()
            .filter(|voice| backend.voice_state(*voice) == PlayState::Playing)
            .count()
    }
}
