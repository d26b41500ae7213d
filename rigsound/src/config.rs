//! Configuration for rigsound

/// Effects preloaded by [`AudioSystem::preload_defaults`](crate::AudioSystem::preload_defaults).
pub const DEFAULT_PRELOAD: [&str; 5] = [
    "data/sfx/ui_click.wav",
    "data/sfx/enter.wav",
    "data/sfx/disassemble.wav",
    "data/sfx/assemble.wav",
    "data/sfx/step.wav",
];

/// Distance falloff applied to positional voices.
///
/// Gain follows the inverse-distance-clamped curve:
/// `reference / (reference + rolloff * (clamp(d, reference, max) - reference))`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Distance at which a source plays at its full gain
    pub reference_distance: f32,
    /// Distance beyond which no further attenuation happens
    pub max_distance: f32,
    /// Steepness of the falloff (0.0 disables attenuation)
    pub rolloff_factor: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            reference_distance: 2.0,
            max_distance: 50.0,
            rolloff_factor: 1.0,
        }
    }
}

impl Attenuation {
    /// Gain factor in `[0, 1]` for a source `distance` units away from the listener.
    pub fn gain_at(&self, distance: f32) -> f32 {
        if self.reference_distance <= 0.0 {
            return 1.0;
        }

        let max = self.max_distance.max(self.reference_distance);
        let d = distance.clamp(self.reference_distance, max);
        let denom = self.reference_distance + self.rolloff_factor * (d - self.reference_distance);
        if denom <= 0.0 {
            return 1.0;
        }

        (self.reference_distance / denom).clamp(0.0, 1.0)
    }
}

/// Configuration descriptor for an [`AudioSystem`](crate::AudioSystem)
#[derive(Debug, Clone)]
pub struct AudioDesc {
    /// Output sample rate requested from the device
    pub sample_rate: u32,
    /// Number of output channels (typically 2 for stereo)
    pub channels: u16,
    /// Frames per device callback
    pub block_size: usize,
    /// Falloff for positional voices
    pub attenuation: Attenuation,
    /// Global listener gain
    pub listener_gain: f32,
    /// Paths loaded by `preload_defaults`
    pub preload: Vec<String>,
}

impl Default for AudioDesc {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            block_size: 512,
            attenuation: Attenuation::default(),
            listener_gain: 1.0,
            preload: DEFAULT_PRELOAD.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl AudioDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn attenuation(mut self, attenuation: Attenuation) -> Self {
        self.attenuation = attenuation;
        self
    }

    pub fn listener_gain(mut self, gain: f32) -> Self {
        self.listener_gain = gain;
        self
    }

    pub fn preload<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preload = paths.into_iter().map(Into::into).collect();
        self
    }
}
