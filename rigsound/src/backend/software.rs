//! In-process mixer backend.
//!
//! Buffers are converted to interleaved `f32` at the output rate on upload. Voices carry a
//! fractional frame cursor and are summed into the output in [`SoftwareBackend::render`],
//! with inverse-distance-clamped attenuation and constant-power panning relative to the
//! listener. Mono buffers are positioned; stereo buffers play as-is.

use crate::backend::{
    AudioBackend, AudioResampler, BufferFormat, BufferHandle, DistanceModel, PlayState,
    VoiceHandle, VoiceParams,
};
use crate::error::{Result, RigSoundError};
use crate::events::AudioEvent;
use crate::math::{DEFAULT_FORWARD, DEFAULT_UP, MIN_DIRECTION_LENGTH, Vec3, normalize_or};
use crossbeam_channel::Sender;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Interleaved `f32` frames at the mixer's output rate
#[derive(Debug)]
struct MixBuffer {
    samples: Vec<f32>,
    channels: u16,
    frame_count: usize,
}

impl MixBuffer {
    fn frame(&self, idx: usize) -> (f32, f32) {
        if self.channels == 2 {
            (self.samples[idx * 2], self.samples[idx * 2 + 1])
        } else {
            let s = self.samples[idx];
            (s, s)
        }
    }
}

#[derive(Debug, Default)]
struct MixVoice {
    params: Option<VoiceParams>,
    data: Option<Arc<MixBuffer>>,
    cursor: f64,
    state: PlayState,
}

#[derive(Debug, Clone, Copy)]
struct ListenerFrame {
    position: Vec3,
    forward: Vec3,
    up: Vec3,
}

impl ListenerFrame {
    fn right(&self) -> Vec3 {
        normalize_or(self.forward.cross(self.up), Vec3::X)
    }

    /// Expresses a world-space offset in listener space (x right, y up, -z forward).
    fn to_listener_space(&self, offset: Vec3) -> Vec3 {
        Vec3::new(
            offset.dot(self.right()),
            offset.dot(self.up),
            -offset.dot(self.forward),
        )
    }
}

struct MixerState {
    output_rate: u32,
    output_channels: u16,
    buffers: HashMap<BufferHandle, Option<Arc<MixBuffer>>>,
    voices: HashMap<VoiceHandle, MixVoice>,
    listener: ListenerFrame,
    listener_gain: f32,
    distance_model: DistanceModel,
    max_voices: Option<usize>,
    next_id: u32,
    closed: bool,
    events: Option<Sender<AudioEvent>>,
    // Reused across callbacks
    gain_scratch: Vec<(VoiceHandle, f32, f32)>,
    finished_scratch: Vec<VoiceHandle>,
}

impl MixerState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Left/right gain for a voice given the current listener.
    fn voice_gains(&self, params: &VoiceParams, buffer_channels: u16) -> (f32, f32) {
        let base = params.gain.max(0.0) * self.listener_gain.max(0.0);
        if buffer_channels == 2 {
            return (base, base);
        }

        let local = if params.relative {
            params.position
        } else {
            self.listener
                .to_listener_space(params.position - self.listener.position)
        };
        let distance = local.length();

        let attenuation = match self.distance_model {
            DistanceModel::None => 1.0,
            DistanceModel::InverseClamped => params.attenuation.gain_at(distance),
        };

        if distance <= MIN_DIRECTION_LENGTH {
            return (base * attenuation, base * attenuation);
        }

        let pan = (local.x / distance).clamp(-1.0, 1.0);
        let angle = (pan + 1.0) * std::f32::consts::FRAC_PI_4;
        let left = (angle.cos() * std::f32::consts::SQRT_2).min(1.0);
        let right = (angle.sin() * std::f32::consts::SQRT_2).min(1.0);
        (base * attenuation * left, base * attenuation * right)
    }

    fn mix(&mut self, out: &mut [f32]) {
        out.fill(0.0);

        let channels = self.output_channels.max(1) as usize;
        let frames = out.len() / channels;

        let mut gains = std::mem::take(&mut self.gain_scratch);
        gains.clear();
        gains.extend(
            self.voices
                .iter()
                .filter(|(_, v)| v.state == PlayState::Playing)
                .filter_map(|(handle, v)| {
                    let params = v.params.as_ref()?;
                    let data = v.data.as_ref()?;
                    let (l, r) = self.voice_gains(params, data.channels);
                    Some((*handle, l, r))
                }),
        );

        let mut finished = std::mem::take(&mut self.finished_scratch);
        finished.clear();

        for &(handle, left_gain, right_gain) in &gains {
            let Some(voice) = self.voices.get_mut(&handle) else {
                continue;
            };
            let (Some(params), Some(data)) = (voice.params.as_ref(), voice.data.clone()) else {
                continue;
            };
            let looping = params.looping;
            let step = f64::from(params.pitch.clamp(0.01, 8.0));

            for frame in 0..frames {
                let mut idx = voice.cursor as usize;
                if idx >= data.frame_count {
                    if looping && data.frame_count > 0 {
                        voice.cursor %= data.frame_count as f64;
                        idx = voice.cursor as usize;
                    } else {
                        break;
                    }
                }

                let (l, r) = data.frame(idx);
                let l = l * left_gain;
                let r = r * right_gain;
                if channels == 1 {
                    out[frame] += (l + r) * 0.5;
                } else {
                    out[frame * channels] += l;
                    out[frame * channels + 1] += r;
                }

                voice.cursor += step;
            }

            if !looping && voice.cursor as usize >= data.frame_count {
                voice.state = PlayState::Stopped;
                finished.push(handle);
            }
        }

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        for &voice in &finished {
            log::debug!("{} finished", voice);
            if let Some(events) = &self.events {
                let _ = events.try_send(AudioEvent::VoiceFinished { voice });
            }
        }

        self.gain_scratch = gains;
        self.finished_scratch = finished;
    }
}

/// Software mixer shared between the control thread and whoever pulls samples out of it.
///
/// Cloning is cheap and yields another handle to the same mixer.
#[derive(Clone)]
pub struct SoftwareBackend {
    state: Arc<Mutex<MixerState>>,
}

impl SoftwareBackend {
    /// Create a mixer producing `output_channels` interleaved channels at `output_rate`.
    pub fn new(output_rate: u32, output_channels: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MixerState {
                output_rate,
                output_channels,
                buffers: HashMap::new(),
                voices: HashMap::new(),
                listener: ListenerFrame {
                    position: Vec3::ZERO,
                    forward: DEFAULT_FORWARD,
                    up: DEFAULT_UP,
                },
                listener_gain: 1.0,
                distance_model: DistanceModel::default(),
                max_voices: None,
                next_id: 0,
                closed: false,
                events: None,
                gain_scratch: Vec::new(),
                finished_scratch: Vec::new(),
            })),
        }
    }

    /// Report finished voices on `events`.
    pub fn with_events(self, events: Sender<AudioEvent>) -> Self {
        self.lock().events = Some(events);
        self
    }

    /// Cap the number of voices, emulating a device with a fixed number of sources.
    pub fn with_voice_limit(self, max_voices: usize) -> Self {
        self.lock().max_voices = Some(max_voices);
        self
    }

    fn lock(&self) -> MutexGuard<'_, MixerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn output_rate(&self) -> u32 {
        self.lock().output_rate
    }

    pub fn output_channels(&self) -> u16 {
        self.lock().output_channels
    }

    /// Mixes every playing voice into `out` (interleaved, output channel count), advancing
    /// their cursors.
    pub fn render(&self, out: &mut [f32]) {
        self.lock().mix(out);
    }

    /// Like [`render`](Self::render) but writes silence instead of waiting for the lock.
    pub fn try_render(&self, out: &mut [f32]) -> bool {
        match self.state.try_lock() {
            Ok(mut state) => {
                state.mix(out);
                true
            }
            Err(_) => {
                out.fill(0.0);
                false
            }
        }
    }

    pub fn voice_count(&self) -> usize {
        self.lock().voices.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.lock().buffers.len()
    }

    pub fn playing_voice_count(&self) -> usize {
        self.lock()
            .voices
            .values()
            .filter(|v| v.state == PlayState::Playing)
            .count()
    }

    /// Parameters the voice was last configured with.
    pub fn voice_params(&self, voice: VoiceHandle) -> Option<VoiceParams> {
        self.lock().voices.get(&voice)?.params.clone()
    }

    pub fn distance_model(&self) -> DistanceModel {
        self.lock().distance_model
    }

    /// Listener position, forward and up as last applied.
    pub fn listener(&self) -> (Vec3, Vec3, Vec3) {
        let state = self.lock();
        (
            state.listener.position,
            state.listener.forward,
            state.listener.up,
        )
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

fn pcm_to_f32(format: BufferFormat, data: &[u8]) -> Vec<f32> {
    match format.bits_per_sample() {
        8 => data.iter().map(|&b| (f32::from(b) - 128.0) / 128.0).collect(),
        _ => data
            .chunks_exact(2)
            .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
            .collect(),
    }
}

impl AudioBackend for SoftwareBackend {
    fn name(&self) -> &str {
        "software"
    }

    fn is_available(&self) -> bool {
        !self.lock().closed
    }

    fn set_distance_model(&mut self, model: DistanceModel) {
        self.lock().distance_model = model;
    }

    fn set_listener_gain(&mut self, gain: f32) {
        self.lock().listener_gain = gain;
    }

    fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.lock().listener = ListenerFrame {
            position,
            forward,
            up,
        };
    }

    fn create_buffer(&mut self) -> Result<BufferHandle> {
        let mut state = self.lock();
        if state.closed {
            return Err(RigSoundError::DeviceError("mixer is closed".to_string()));
        }
        let handle = BufferHandle(state.next_id());
        state.buffers.insert(handle, None);
        Ok(handle)
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        format: BufferFormat,
        data: &[u8],
        sample_rate: u32,
    ) -> Result<()> {
        let output_rate = self.lock().output_rate;

        if !self.lock().buffers.contains_key(&buffer) {
            return Err(RigSoundError::DeviceError(format!("unknown {}", buffer)));
        }
        if sample_rate == 0 {
            return Err(RigSoundError::DeviceError(format!(
                "{} has a sample rate of 0",
                buffer
            )));
        }
        if data.len() % format.block_align() != 0 {
            return Err(RigSoundError::DeviceError(format!(
                "{} bytes is not a whole number of {:?} frames",
                data.len(),
                format
            )));
        }

        // Convert outside the lock so a render never waits on a resample
        let mut samples = pcm_to_f32(format, data);
        if sample_rate != output_rate {
            let resampler = AudioResampler::new(sample_rate, output_rate, format.channels(), None)?;
            samples = resampler.resample_interleaved(&samples)?;
        }

        let channels = format.channels();
        let frame_count = samples.len() / channels as usize;
        log::debug!(
            "Uploaded {} ({:?}, {} Hz -> {} Hz, {} frames)",
            buffer,
            format,
            sample_rate,
            output_rate,
            frame_count
        );

        self.lock().buffers.insert(
            buffer,
            Some(Arc::new(MixBuffer {
                samples,
                channels,
                frame_count,
            })),
        );
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let mut state = self.lock();
        state.buffers.remove(&buffer);
        // Nothing may keep playing a deleted buffer
        for voice in state.voices.values_mut() {
            if voice.params.as_ref().is_some_and(|p| p.buffer == buffer) {
                voice.params = None;
                voice.data = None;
                voice.state = PlayState::Stopped;
            }
        }
    }

    fn create_voice(&mut self) -> Result<VoiceHandle> {
        let mut state = self.lock();
        if state.closed {
            return Err(RigSoundError::DeviceError("mixer is closed".to_string()));
        }
        if let Some(max) = state.max_voices {
            if state.voices.len() >= max {
                return Err(RigSoundError::DeviceError(format!(
                    "voice limit of {} reached",
                    max
                )));
            }
        }
        let handle = VoiceHandle(state.next_id());
        state.voices.insert(handle, MixVoice::default());
        Ok(handle)
    }

    fn delete_voice(&mut self, voice: VoiceHandle) {
        self.lock().voices.remove(&voice);
    }

    fn configure_voice(&mut self, voice: VoiceHandle, params: &VoiceParams) -> Result<()> {
        let mut state = self.lock();
        let data = match state.buffers.get(&params.buffer) {
            Some(Some(data)) => data.clone(),
            Some(None) => {
                return Err(RigSoundError::DeviceError(format!(
                    "{} has no data",
                    params.buffer
                )));
            }
            None => {
                return Err(RigSoundError::DeviceError(format!(
                    "unknown {}",
                    params.buffer
                )));
            }
        };

        let slot = state
            .voices
            .get_mut(&voice)
            .ok_or_else(|| RigSoundError::DeviceError(format!("unknown {}", voice)))?;
        slot.params = Some(params.clone());
        slot.data = Some(data);
        slot.cursor = 0.0;
        slot.state = PlayState::Initial;
        Ok(())
    }

    fn play_voice(&mut self, voice: VoiceHandle) {
        let mut state = self.lock();
        if let Some(slot) = state.voices.get_mut(&voice) {
            slot.cursor = 0.0;
            slot.state = match &slot.data {
                Some(data) if data.frame_count > 0 => PlayState::Playing,
                _ => PlayState::Stopped,
            };
        }
    }

    fn stop_voice(&mut self, voice: VoiceHandle) {
        let mut state = self.lock();
        if let Some(slot) = state.voices.get_mut(&voice) {
            slot.state = PlayState::Stopped;
        }
    }

    fn voice_state(&self, voice: VoiceHandle) -> PlayState {
        self.lock()
            .voices
            .get(&voice)
            .map_or(PlayState::Stopped, |v| v.state)
    }

    fn close(&mut self) {
        let mut state = self.lock();
        state.voices.clear();
        state.buffers.clear();
        state.closed = true;
    }
}
