use crate::audio_data::SoundLoader;
use crate::backend::{AudioBackend, CpalBackend, DistanceModel, NullBackend};
use crate::cache::SoundCache;
use crate::channels::{ChannelManager, ChannelRole};
use crate::config::AudioDesc;
use crate::error::{Result, RigSoundError};
use crate::events::{AudioEvent, EVENT_QUEUE_CAPACITY};
use crate::listener::ListenerState;
use crate::math::Vec3;
use crossbeam_channel::{Receiver, Sender, bounded};

/// Positional sound effects for the scene.
///
/// `AudioSystem` is the single entry point of rigsound. It is owned by the frame loop and owns
/// everything else: the backend, the sound cache, the voices and the listener.
///
/// # Lifecycle
///
/// - [`init`](Self::init) opens the output device. Until it succeeds every playback call is a
///   silent no-op, so an application without audio hardware keeps running.
/// - [`update_listener`](Self::update_listener) is called once per frame from the camera.
/// - [`shutdown`](Self::shutdown) releases every voice and buffer. It also runs on drop.
///
/// The playback API never returns errors. Failed loads are logged, remembered and reported
/// through [`poll_events`](Self::poll_events).
pub struct AudioSystem {
    desc: AudioDesc,
    backend: Box<dyn AudioBackend>,
    cache: SoundCache,
    channels: ChannelManager,
    listener: ListenerState,
    initialized: bool,
    event_sender: Sender<AudioEvent>,
    event_receiver: Receiver<AudioEvent>,
}

impl AudioSystem {
    /// Creates an uninitialized system that decodes sounds from disk.
    pub fn new(desc: AudioDesc) -> Self {
        let (event_sender, event_receiver) = bounded(EVENT_QUEUE_CAPACITY);
        let cache = SoundCache::default().with_events(event_sender.clone());
        let channels = ChannelManager::new(desc.attenuation);
        Self {
            desc,
            backend: Box::new(NullBackend),
            cache,
            channels,
            listener: ListenerState::default(),
            initialized: false,
            event_sender,
            event_receiver,
        }
    }

    /// Replaces the loader the cache decodes sounds with.
    pub fn with_loader(mut self, loader: Box<dyn SoundLoader>) -> Self {
        self.cache.set_loader(loader);
        self
    }

    pub fn desc(&self) -> &AudioDesc {
        &self.desc
    }

    /// Opens the default output device and prepares the reserved voices.
    ///
    /// Calling this on an initialized system does nothing.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let backend = match CpalBackend::open(&self.desc, Some(self.event_sender.clone())) {
            Ok(backend) => backend,
            Err(e) => {
                log::warn!("Audio disabled: {}", e);
                return Err(e);
            }
        };
        self.init_with_backend(Box::new(backend))
    }

    /// Like [`init`](Self::init) but drives the given backend instead of opening a device.
    pub fn init_with_backend(&mut self, mut backend: Box<dyn AudioBackend>) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        if !backend.is_available() {
            return Err(RigSoundError::DeviceUnavailable(format!(
                "{} backend is not available",
                backend.name()
            )));
        }

        backend.set_distance_model(DistanceModel::InverseClamped);
        backend.set_listener_gain(self.desc.listener_gain);

        if let Err(e) = self.channels.create_reserved(backend.as_mut()) {
            log::warn!("Audio disabled, could not reserve voices: {}", e);
            backend.close();
            return Err(e);
        }

        self.listener.apply(backend.as_mut());
        log::info!("Audio system initialized on the {} backend", backend.name());

        self.backend = backend;
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Stops and deletes every voice and buffer and closes the backend.
    ///
    /// Failed paths are forgotten. The system can be initialized again afterwards.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }

        self.channels.release_all(self.backend.as_mut());
        self.cache.clear(self.backend.as_mut());
        self.backend.close();
        self.backend = Box::new(NullBackend);
        self.initialized = false;
        log::info!("Audio system shut down");
    }

    /// Loads the given sounds now instead of on first use.
    ///
    /// Returns how many are ready to play.
    pub fn preload<I, S>(&mut self, paths: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !self.initialized {
            return 0;
        }
        self.cache.preload(paths, self.backend.as_mut())
    }

    /// Loads the sounds listed in the configuration.
    pub fn preload_defaults(&mut self) -> usize {
        let paths = self.desc.preload.clone();
        self.preload(paths)
    }

    /// Moves the listener. Call once per frame before positional playback.
    pub fn update_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.listener.update(position, forward, up);
        if self.initialized {
            self.listener.apply(self.backend.as_mut());
        }
    }

    pub fn listener(&self) -> &ListenerState {
        &self.listener
    }

    /// Plays `path` at `position` in world space.
    ///
    /// With a role the role's previous sound is cut off; without one the sound gets a pool voice.
    pub fn play3d(&mut self, path: &str, position: Vec3, gain: f32, role: Option<ChannelRole>) {
        self.play(path, position, gain, role, true);
    }

    /// Fire-and-forget positional sound that does not interrupt anything.
    pub fn play_oneshot(&mut self, path: &str, position: Vec3, gain: f32) {
        self.play(path, position, gain, None, true);
    }

    /// Interface sound, heard at the same level wherever the listener is.
    pub fn play_ui(&mut self, path: &str, gain: f32) {
        self.play(path, Vec3::ZERO, gain, Some(ChannelRole::Ui), false);
    }

    /// Footstep at the listener's last position.
    pub fn play_step(&mut self, path: &str, gain: f32) {
        let position = self.listener.position();
        self.play(path, position, gain, Some(ChannelRole::Step), true);
    }

    fn play(
        &mut self,
        path: &str,
        position: Vec3,
        gain: f32,
        role: Option<ChannelRole>,
        spatial: bool,
    ) {
        if !self.initialized {
            return;
        }

        let Some(buffer) = self.cache.resolve(path, self.backend.as_mut()) else {
            return;
        };

        if let Some(voice) =
            self.channels
                .play(self.backend.as_mut(), role, buffer, position, gain, spatial)
        {
            log::debug!("Playing {} on {}", path, voice);
        }
    }

    pub fn stop(&mut self, role: ChannelRole) {
        if self.initialized {
            self.channels.stop(role, self.backend.as_mut());
        }
    }

    pub fn stop_all(&mut self) {
        if self.initialized {
            self.channels.stop_all(self.backend.as_mut());
        }
    }

    pub fn is_playing(&self, role: ChannelRole) -> bool {
        self.initialized && self.channels.is_playing(role, self.backend.as_ref())
    }

    /// Voices currently playing, reserved and pooled.
    pub fn playing_count(&self) -> usize {
        if !self.initialized {
            return 0;
        }
        self.channels.playing_count(self.backend.as_ref())
    }

    pub fn voice_count(&self) -> usize {
        self.channels.voice_count()
    }

    pub fn pool_len(&self) -> usize {
        self.channels.pool_len()
    }

    pub fn cache(&self) -> &SoundCache {
        &self.cache
    }

    /// Drains the events reported since the last call.
    ///
    /// At most [`EVENT_QUEUE_CAPACITY`] are kept; later ones are dropped until the queue is
    /// drained.
    pub fn poll_events(&self) -> Vec<AudioEvent> {
        self.event_receiver.try_iter().collect()
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Drop for AudioSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}
