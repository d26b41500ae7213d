use crate::error::{Result, RigSoundError};
use rubato::{FftFixedIn, Resampler};

/// Offline sample-rate converter for uploaded buffers.
///
/// Buffers are converted once at upload so the mixer can step one source frame per output
/// frame.
pub struct AudioResampler {
    source_sample_rate: u32,
    target_sample_rate: u32,
    channels: u16,
    chunk_size: usize,
}

impl AudioResampler {
    pub fn new(
        source_sample_rate: u32,
        target_sample_rate: u32,
        channels: u16,
        chunk_size: Option<usize>,
    ) -> Result<Self> {
        if source_sample_rate == 0 || target_sample_rate == 0 {
            return Err(RigSoundError::DeviceError(
                "Sample rates must be greater than 0".to_string(),
            ));
        }

        if channels == 0 {
            return Err(RigSoundError::DeviceError(
                "Channel count must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            source_sample_rate,
            target_sample_rate,
            channels,
            chunk_size: chunk_size.unwrap_or(1024),
        })
    }

    /// Resamples interleaved frames, returning interleaved frames at the target rate.
    pub fn resample_interleaved(&self, interleaved: &[f32]) -> Result<Vec<f32>> {
        if self.source_sample_rate == self.target_sample_rate || interleaved.is_empty() {
            return Ok(interleaved.to_vec());
        }

        let channels = self.channels as usize;
        let frames = interleaved.len() / channels;

        // Split into channels
        let planar: Vec<Vec<f32>> = (0..channels)
            .map(|ch| {
                interleaved
                    .chunks_exact(channels)
                    .map(|frame| frame[ch])
                    .collect()
            })
            .collect();

        let mut resampler = FftFixedIn::<f32>::new(
            self.source_sample_rate as usize,
            self.target_sample_rate as usize,
            self.chunk_size,
            2, // sub_chunks
            channels,
        )
        .map_err(|e| RigSoundError::DeviceError(format!("Failed to create resampler: {}", e)))?;

        let expected = (frames as f64 * self.resample_ratio()).round() as usize;
        let delay = resampler.output_delay();

        let mut output: Vec<Vec<f32>> = vec![Vec::new(); channels];
        let mut input_index = 0;

        // Keep feeding silence past the end until the delayed tail has come out
        while output[0].len() < delay + expected {
            let needed = resampler.input_frames_next();
            let take = frames.saturating_sub(input_index).min(needed);

            let chunk: Vec<Vec<f32>> = planar
                .iter()
                .map(|channel| {
                    let mut c = vec![0.0f32; needed];
                    c[..take].copy_from_slice(&channel[input_index..input_index + take]);
                    c
                })
                .collect();

            let waves_out = resampler
                .process(&chunk, None)
                .map_err(|e| RigSoundError::DeviceError(format!("Resampling error: {}", e)))?;

            for (out, wave) in output.iter_mut().zip(waves_out) {
                out.extend_from_slice(&wave);
            }

            input_index += take;
        }

        // Interleave the resampled channels
        let mut interleaved_out = Vec::with_capacity(expected * channels);
        for frame_idx in delay..delay + expected {
            for channel in &output {
                interleaved_out.push(channel[frame_idx]);
            }
        }

        Ok(interleaved_out)
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn resample_ratio(&self) -> f64 {
        self.target_sample_rate as f64 / self.source_sample_rate as f64
    }
}
