//! # rigsound
//!
//! Positional sound effects for the desktop rig viewer: a WAV decoder, a path-keyed sound
//! cache, three reserved playback channels plus a growing pool of one-shot voices, and a
//! listener that follows the camera.
//!
//! ## Quick start
//!
//! ```no_run
//! use rigsound::{AudioDesc, AudioSystem, ChannelRole, Vec3};
//!
//! let mut audio = AudioSystem::new(AudioDesc::default());
//! if let Err(e) = audio.init() {
//!     eprintln!("running without sound: {e}");
//! }
//! audio.preload_defaults();
//!
//! // Once per frame, from the camera
//! audio.update_listener(Vec3::new(0.0, 1.6, 4.0), Vec3::NEG_Z, Vec3::Y);
//!
//! audio.play_ui("data/sfx/ui_click.wav", 1.0);
//! audio.play3d(
//!     "data/sfx/disassemble.wav",
//!     Vec3::new(0.5, 0.8, 0.0),
//!     1.0,
//!     Some(ChannelRole::Action),
//! );
//!
//! for event in audio.poll_events() {
//!     println!("{event:?}");
//! }
//! ```
//!
//! Without an output device every playback call is a no-op, so callers never need to check.

pub mod audio_data;
pub mod backend;
pub mod cache;
pub mod channels;
pub mod config;
pub mod error;
pub mod events;
pub mod listener;
pub mod math;
pub mod system;

#[cfg(test)]
mod test_support;

pub use audio_data::{DecodedAudio, SoundLoader, WavDecoder};
pub use backend::{
    AudioBackend, BufferHandle, CpalBackend, NullBackend, SoftwareBackend, VoiceHandle,
};
pub use cache::SoundCache;
pub use channels::{ChannelManager, ChannelRole};
pub use config::{Attenuation, AudioDesc};
pub use error::{Result, RigSoundError};
pub use events::AudioEvent;
pub use listener::ListenerState;
pub use math::Vec3;
pub use system::AudioSystem;
