//! Path-keyed cache of uploaded sounds.

use crate::audio_data::{SoundLoader, WavDecoder};
use crate::backend::{AudioBackend, BufferFormat, BufferHandle};
use crate::error::{Result, RigSoundError};
use crate::events::AudioEvent;
use crossbeam_channel::Sender;
use std::collections::{HashMap, HashSet};

/// Memoizes decoded, uploaded sounds by path and remembers paths that failed.
///
/// Each distinct path is decoded and uploaded at most once. A path that fails, either while
/// decoding or while uploading, is never attempted again until [`clear`](Self::clear).
/// Paths are used verbatim as keys: no normalization, case-sensitive.
pub struct SoundCache {
    loader: Box<dyn SoundLoader>,
    loaded: HashMap<String, BufferHandle>,
    failed: HashSet<String>,
    events: Option<Sender<AudioEvent>>,
}

impl Default for SoundCache {
    fn default() -> Self {
        Self::new(Box::new(WavDecoder))
    }
}

impl SoundCache {
    pub fn new(loader: Box<dyn SoundLoader>) -> Self {
        Self {
            loader,
            loaded: HashMap::new(),
            failed: HashSet::new(),
            events: None,
        }
    }

    /// Report loads and failures on `events`.
    pub fn with_events(mut self, events: Sender<AudioEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn set_loader(&mut self, loader: Box<dyn SoundLoader>) {
        self.loader = loader;
    }

    /// Returns the buffer for `path`, loading and uploading it on first use.
    ///
    /// Returns `None` if the path failed now or at any earlier attempt.
    pub fn resolve(&mut self, path: &str, backend: &mut dyn AudioBackend) -> Option<BufferHandle> {
        if self.failed.contains(path) {
            return None;
        }

        if let Some(buffer) = self.loaded.get(path) {
            return Some(*buffer);
        }

        match self.load_and_upload(path, backend) {
            Ok(buffer) => {
                log::debug!("Loaded sound {} into {}", path, buffer);
                self.loaded.insert(path.to_string(), buffer);
                self.emit(AudioEvent::SoundLoaded {
                    path: path.to_string(),
                });
                Some(buffer)
            }
            Err(e) => {
                log::warn!("Failed to load sound {}: {}", path, e);
                self.failed.insert(path.to_string());
                self.emit(AudioEvent::SoundFailed {
                    path: path.to_string(),
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn load_and_upload(&self, path: &str, backend: &mut dyn AudioBackend) -> Result<BufferHandle> {
        let audio = self.loader.load(path)?;

        let format = BufferFormat::from_layout(audio.channels(), audio.bits_per_sample())
            .ok_or_else(|| {
                RigSoundError::UnsupportedFormat(format!(
                    "no buffer layout for {} ch at {} bits",
                    audio.channels(),
                    audio.bits_per_sample()
                ))
            })?;

        let buffer = backend.create_buffer()?;
        if let Err(e) = backend.upload_buffer(buffer, format, audio.samples(), audio.sample_rate())
        {
            backend.delete_buffer(buffer);
            return Err(e);
        }

        Ok(buffer)
    }

    /// Resolves every path up front. Returns how many are usable.
    pub fn preload<I, S>(&mut self, paths: I, backend: &mut dyn AudioBackend) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ready = 0;
        for path in paths {
            if self.resolve(path.as_ref(), backend).is_some() {
                ready += 1;
            }
        }
        ready
    }

    pub fn get(&self, path: &str) -> Option<BufferHandle> {
        self.loaded.get(path).copied()
    }

    pub fn is_loaded(&self, path: &str) -> bool {
        self.loaded.contains_key(path)
    }

    pub fn is_failed(&self, path: &str) -> bool {
        self.failed.contains(path)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Deletes every buffer and forgets both loaded and failed paths.
    pub fn clear(&mut self, backend: &mut dyn AudioBackend) {
        for (path, buffer) in self.loaded.drain() {
            log::debug!("Releasing {} ({})", buffer, path);
            backend.delete_buffer(buffer);
        }
        self.failed.clear();
    }

    fn emit(&self, event: AudioEvent) {
        if let Some(events) = &self.events {
            let _ = events.try_send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{NullBackend, SoftwareBackend};
    use crate::test_support::{CountingLoader, init_logger, pcm16_wav};

    fn cache_with(loader: &CountingLoader) -> SoundCache {
        SoundCache::new(Box::new(loader.clone()))
    }

    #[test]
    fn test_same_path_decoded_once() {
        init_logger();
        let loader = CountingLoader::new().with_file("click.wav", pcm16_wav(1, 8000, &[1, 2, 3]));
        let mut cache = cache_with(&loader);
        let mixer = SoftwareBackend::new(8000, 2);
        let mut backend = mixer.clone();

        let first = cache.resolve("click.wav", &mut backend).unwrap();
        let second = cache.resolve("click.wav", &mut backend).unwrap();

        assert_eq!(first, second);
        assert_eq!(loader.calls("click.wav"), 1);
        assert_eq!(mixer.buffer_count(), 1);
        assert!(cache.is_loaded("click.wav"));
    }

    #[test]
    fn test_failed_path_never_retried() {
        let loader = CountingLoader::new();
        let mut cache = cache_with(&loader);
        let mut backend = SoftwareBackend::new(8000, 2);

        assert!(cache.resolve("missing.wav", &mut backend).is_none());
        assert!(cache.resolve("missing.wav", &mut backend).is_none());

        assert_eq!(loader.calls("missing.wav"), 1);
        assert!(cache.is_failed("missing.wav"));
        assert_eq!(cache.failed_count(), 1);
    }

    #[test]
    fn test_paths_are_case_sensitive() {
        let loader = CountingLoader::new().with_file("Step.wav", pcm16_wav(1, 8000, &[0; 4]));
        let mut cache = cache_with(&loader);
        let mut backend = SoftwareBackend::new(8000, 2);

        assert!(cache.resolve("Step.wav", &mut backend).is_some());
        assert!(cache.resolve("step.wav", &mut backend).is_none());
        assert_eq!(loader.total_calls(), 2);
    }

    #[test]
    fn test_upload_failure_releases_buffer_and_blacklists() {
        // A sample rate of 0 decodes fine but the mixer refuses it
        let loader = CountingLoader::new().with_file("zero.wav", pcm16_wav(1, 0, &[1, 2]));
        let mut cache = cache_with(&loader);
        let mixer = SoftwareBackend::new(8000, 2);
        let mut backend = mixer.clone();

        assert!(cache.resolve("zero.wav", &mut backend).is_none());
        assert_eq!(mixer.buffer_count(), 0);
        assert!(cache.is_failed("zero.wav"));

        assert!(cache.resolve("zero.wav", &mut backend).is_none());
        assert_eq!(loader.calls("zero.wav"), 1);
    }

    #[test]
    fn test_device_unavailable_marks_failed() {
        let loader = CountingLoader::new().with_file("a.wav", pcm16_wav(1, 8000, &[0; 2]));
        let mut cache = cache_with(&loader);
        let mut backend = NullBackend;

        assert!(cache.resolve("a.wav", &mut backend).is_none());
        assert!(cache.is_failed("a.wav"));
    }

    #[test]
    fn test_preload_and_clear() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let loader = CountingLoader::new()
            .with_file("a.wav", pcm16_wav(1, 8000, &[0; 2]))
            .with_file("b.wav", pcm16_wav(2, 8000, &[0; 4]));
        let mut cache = cache_with(&loader).with_events(tx);
        let mixer = SoftwareBackend::new(8000, 2);
        let mut backend = mixer.clone();

        let ready = cache.preload(["a.wav", "b.wav", "c.wav"], &mut backend);
        assert_eq!(ready, 2);
        assert_eq!(cache.loaded_count(), 2);
        assert_eq!(cache.failed_count(), 1);

        let events: Vec<AudioEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert_eq!(events.iter().filter(|e| e.is_error()).count(), 1);

        cache.clear(&mut backend);
        assert_eq!(cache.loaded_count(), 0);
        assert_eq!(cache.failed_count(), 0);
        assert_eq!(mixer.buffer_count(), 0);

        // Forgotten failures are attempted again after a clear
        assert!(cache.resolve("c.wav", &mut backend).is_none());
        assert_eq!(loader.calls("c.wav"), 2);
    }
}
