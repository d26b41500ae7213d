use crate::backend::{
    AudioBackend, BufferFormat, BufferHandle, DistanceModel, PlayState, SoftwareBackend,
    VoiceHandle, VoiceParams,
};
use crate::config::AudioDesc;
use crate::error::{Result, RigSoundError};
use crate::events::AudioEvent;
use crate::math::Vec3;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use crossbeam_channel::Sender;

/// Backend that plays the software mixer through the default `cpal` output device.
///
/// Mixing happens on the device callback thread. The callback never blocks: if the control
/// side holds the mixer at that moment, the block is filled with silence.
pub struct CpalBackend {
    mixer: SoftwareBackend,
    stream: Option<cpal::Stream>,
    device_name: String,
}

impl CpalBackend {
    /// Opens the default output device, builds a stream for it and starts it.
    ///
    /// Each step short-circuits on failure; anything acquired so far is dropped before the
    /// error is returned.
    pub fn open(desc: &AudioDesc, events: Option<Sender<AudioEvent>>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            RigSoundError::DeviceUnavailable("No default output device available".into())
        })?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        let default_config = device.default_output_config().map_err(|e| {
            RigSoundError::DeviceUnavailable(format!("Failed to get default config: {}", e))
        })?;

        let wanted = cpal::SampleRate(desc.sample_rate);
        let supports_wanted = device
            .supported_output_configs()
            .map(|mut configs| {
                configs.any(|c| {
                    c.channels() == desc.channels
                        && c.sample_format() == default_config.sample_format()
                        && c.min_sample_rate() <= wanted
                        && c.max_sample_rate() >= wanted
                })
            })
            .unwrap_or(false);

        let config = if supports_wanted {
            cpal::StreamConfig {
                channels: desc.channels,
                sample_rate: wanted,
                buffer_size: cpal::BufferSize::Fixed(desc.block_size as u32),
            }
        } else {
            log::warn!(
                "{} does not support {} ch @ {} Hz, using its default {} ch @ {} Hz",
                device_name,
                desc.channels,
                desc.sample_rate,
                default_config.channels(),
                default_config.sample_rate().0
            );
            default_config.config()
        };

        let mut mixer = SoftwareBackend::new(config.sample_rate.0, config.channels);
        if let Some(events) = &events {
            mixer = mixer.with_events(events.clone());
        }

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, &mixer, events)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, &mixer, events)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, &mixer, events)?,
            other => {
                return Err(RigSoundError::DeviceUnavailable(format!(
                    "Unsupported sample format {:?}",
                    other
                )));
            }
        };

        stream.play().map_err(|e| {
            RigSoundError::DeviceUnavailable(format!("Failed to start stream: {}", e))
        })?;

        log::info!(
            "Opened audio device {} ({} ch @ {} Hz, {:?})",
            device_name,
            config.channels,
            config.sample_rate.0,
            default_config.sample_format()
        );

        Ok(Self {
            mixer,
            stream: Some(stream),
            device_name,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Another handle to the mixer feeding the stream.
    pub fn mixer(&self) -> SoftwareBackend {
        self.mixer.clone()
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mixer: &SoftwareBackend,
    events: Option<Sender<AudioEvent>>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let mixer = mixer.clone();
    let mut scratch: Vec<f32> = Vec::new();

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                if scratch.len() != data.len() {
                    scratch.resize(data.len(), 0.0);
                }
                mixer.try_render(&mut scratch);
                for (out, sample) in data.iter_mut().zip(&scratch) {
                    *out = T::from_sample(*sample);
                }
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
                if let Some(events) = &events {
                    let _ = events.try_send(AudioEvent::StreamError {
                        error: err.to_string(),
                    });
                }
            },
            None,
        )
        .map_err(|e| RigSoundError::DeviceUnavailable(format!("Failed to build stream: {}", e)))
}

impl AudioBackend for CpalBackend {
    fn name(&self) -> &str {
        "cpal"
    }

    fn is_available(&self) -> bool {
        self.stream.is_some()
    }

    fn set_distance_model(&mut self, model: DistanceModel) {
        self.mixer.set_distance_model(model);
    }

    fn set_listener_gain(&mut self, gain: f32) {
        self.mixer.set_listener_gain(gain);
    }

    fn set_listener(&mut self, position: Vec3, forward: Vec3, up: Vec3) {
        self.mixer.set_listener(position, forward, up);
    }

    fn create_buffer(&mut self) -> Result<BufferHandle> {
        self.mixer.create_buffer()
    }

    fn upload_buffer(
        &mut self,
        buffer: BufferHandle,
        format: BufferFormat,
        data: &[u8],
        sample_rate: u32,
    ) -> Result<()> {
        self.mixer.upload_buffer(buffer, format, data, sample_rate)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.mixer.delete_buffer(buffer);
    }

    fn create_voice(&mut self) -> Result<VoiceHandle> {
        self.mixer.create_voice()
    }

    fn delete_voice(&mut self, voice: VoiceHandle) {
        self.mixer.delete_voice(voice);
    }

    fn configure_voice(&mut self, voice: VoiceHandle, params: &VoiceParams) -> Result<()> {
        self.mixer.configure_voice(voice, params)
    }

    fn play_voice(&mut self, voice: VoiceHandle) {
        self.mixer.play_voice(voice);
    }

    fn stop_voice(&mut self, voice: VoiceHandle) {
        self.mixer.stop_voice(voice);
    }

    fn voice_state(&self, voice: VoiceHandle) -> PlayState {
        self.mixer.voice_state(voice)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            log::info!("Closing audio device {}", self.device_name);
            drop(stream);
        }
        self.mixer.close();
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        self.close();
    }
}
