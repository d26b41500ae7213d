use crate::audio_data::DecodedAudio;
use crate::error::Result;

/// Trait for turning a sound path into canonical PCM.
///
/// The [`SoundCache`](crate::cache::SoundCache) calls this at most once per distinct path.
/// rigsound ships [`WavDecoder`](crate::audio_data::WavDecoder); other loaders can be
/// plugged in through [`AudioSystem::with_loader`](crate::AudioSystem::with_loader).
///
/// # Example
///
/// ```ignore
/// use rigsound::audio_data::{DecodedAudio, SoundLoader};
/// use rigsound::error::Result;
///
/// struct PackLoader;
///
/// impl SoundLoader for PackLoader {
///     fn load(&self, path: &str) -> Result<DecodedAudio> {
///         // look `path` up in an asset pack and decode it
///         todo!()
///     }
/// }
/// ```
pub trait SoundLoader {
    /// Loads and decodes the sound at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `RigSoundError` if the file cannot be read or decoded. The cache treats any
    /// error as permanent for that path.
    fn load(&self, path: &str) -> Result<DecodedAudio>;
}
