//! Shared fixtures for unit tests: in-memory WAV files and an instrumented loader.

use crate::audio_data::{DecodedAudio, SoundLoader, decode_wav_bytes};
use crate::error::{Result, RigSoundError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Builds RIFF/WAVE byte streams chunk by chunk.
pub struct WavBuilder {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    fmt_extra: Vec<u8>,
    extra_chunks: Vec<([u8; 4], Vec<u8>)>,
    data: Option<Vec<u8>>,
    data_first: bool,
}

impl WavBuilder {
    pub fn new(format_tag: u16, channels: u16, sample_rate: u32, bits_per_sample: u16) -> Self {
        Self {
            format_tag,
            channels,
            sample_rate,
            bits_per_sample,
            fmt_extra: Vec::new(),
            extra_chunks: Vec::new(),
            data: Some(Vec::new()),
            data_first: false,
        }
    }

    pub fn data(mut self, data: &[u8]) -> Self {
        self.data = Some(data.to_vec());
        self
    }

    pub fn no_data(mut self) -> Self {
        self.data = None;
        self
    }

    /// Adds an unrelated chunk between `fmt ` and `data`.
    pub fn chunk(mut self, id: &[u8; 4], body: &[u8]) -> Self {
        self.extra_chunks.push((*id, body.to_vec()));
        self
    }

    pub fn fmt_extra(mut self, extra: &[u8]) -> Self {
        self.fmt_extra = extra.to_vec();
        self
    }

    pub fn data_first(mut self) -> Self {
        self.data_first = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let block_align = self.channels * (self.bits_per_sample / 8);
        let byte_rate = self.sample_rate * u32::from(block_align);

        let mut fmt = Vec::new();
        fmt.extend_from_slice(&self.format_tag.to_le_bytes());
        fmt.extend_from_slice(&self.channels.to_le_bytes());
        fmt.extend_from_slice(&self.sample_rate.to_le_bytes());
        fmt.extend_from_slice(&byte_rate.to_le_bytes());
        fmt.extend_from_slice(&block_align.to_le_bytes());
        fmt.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        fmt.extend_from_slice(&self.fmt_extra);

        let mut body = Vec::new();
        body.extend_from_slice(b"WAVE");
        if self.data_first {
            if let Some(data) = &self.data {
                write_chunk(&mut body, b"data", data);
            }
            write_chunk(&mut body, b"fmt ", &fmt);
            for (id, chunk) in &self.extra_chunks {
                write_chunk(&mut body, id, chunk);
            }
        } else {
            write_chunk(&mut body, b"fmt ", &fmt);
            for (id, chunk) in &self.extra_chunks {
                write_chunk(&mut body, id, chunk);
            }
            if let Some(data) = &self.data {
                write_chunk(&mut body, b"data", data);
            }
        }

        let mut out = Vec::with_capacity(body.len() + 8);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }
}

fn write_chunk(out: &mut Vec<u8>, id: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(id);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    if body.len() % 2 == 1 {
        out.push(0);
    }
}

/// 16-bit integer PCM WAV holding `samples` (interleaved when `channels == 2`).
pub fn pcm16_wav(channels: u16, sample_rate: u32, samples: &[i16]) -> Vec<u8> {
    let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    WavBuilder::new(1, channels, sample_rate, 16).data(&data).build()
}

/// Loader serving WAV bytes from memory and counting every load attempt per path.
#[derive(Clone, Default)]
pub struct CountingLoader {
    files: Rc<RefCell<HashMap<String, Vec<u8>>>>,
    calls: Rc<RefCell<HashMap<String, usize>>>,
}

impl CountingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: Vec<u8>) -> Self {
        self.files.borrow_mut().insert(path.to_string(), bytes);
        self
    }

    pub fn calls(&self, path: &str) -> usize {
        self.calls.borrow().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.borrow().values().sum()
    }
}

impl SoundLoader for CountingLoader {
    fn load(&self, path: &str) -> Result<DecodedAudio> {
        *self.calls.borrow_mut().entry(path.to_string()).or_default() += 1;
        let files = self.files.borrow();
        let bytes = files.get(path).ok_or_else(|| {
            RigSoundError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                path.to_string(),
            ))
        })?;
        decode_wav_bytes(bytes)
    }
}
