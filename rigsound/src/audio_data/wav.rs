//! RIFF/WAVE decoding.
//!
//! Only the `fmt ` and `data` chunks are interpreted; everything else is skipped by size,
//! honoring the pad byte that follows odd-sized chunks.

use crate::audio_data::pcm::{self, WAVE_FORMAT_IEEE_FLOAT, WAVE_FORMAT_PCM};
use crate::audio_data::{DecodedAudio, SoundLoader};
use crate::error::{Result, RigSoundError};
use std::fs::File;
use std::io::{self, BufReader, Read};

/// Size of the fields every `fmt ` chunk carries
const FMT_CHUNK_MIN_SIZE: u32 = 16;

/// Decoder for `.wav` files on disk.
///
/// Accepts mono/stereo integer PCM (8, 16, 24, 32-bit) and 32-bit IEEE float, and yields
/// 8-bit or 16-bit PCM.
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl SoundLoader for WavDecoder {
    fn load(&self, path: &str) -> Result<DecodedAudio> {
        let file = File::open(path)?;
        decode_wav(BufReader::new(file))
    }
}

#[derive(Debug, Clone, Copy)]
struct FormatChunk {
    format_tag: u16,
    channels: u16,
    sample_rate: u32,
    #[allow(dead_code)] // parsed, not validated
    byte_rate: u32,
    #[allow(dead_code)] // parsed, not validated
    block_align: u16,
    bits_per_sample: u16,
}

impl FormatChunk {
    fn parse(b: &[u8; FMT_CHUNK_MIN_SIZE as usize]) -> Self {
        Self {
            format_tag: u16::from_le_bytes([b[0], b[1]]),
            channels: u16::from_le_bytes([b[2], b[3]]),
            sample_rate: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            byte_rate: u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
            block_align: u16::from_le_bytes([b[12], b[13]]),
            bits_per_sample: u16::from_le_bytes([b[14], b[15]]),
        }
    }

    fn validate(&self) -> Result<()> {
        if !matches!(self.channels, 1 | 2) {
            return Err(RigSoundError::UnsupportedFormat(format!(
                "{} channels",
                self.channels
            )));
        }
        if !matches!(self.format_tag, WAVE_FORMAT_PCM | WAVE_FORMAT_IEEE_FLOAT) {
            return Err(RigSoundError::UnsupportedFormat(format!(
                "format tag {}",
                self.format_tag
            )));
        }
        if !matches!(self.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(RigSoundError::UnsupportedFormat(format!(
                "{} bits per sample",
                self.bits_per_sample
            )));
        }
        Ok(())
    }
}

struct ChunkHeader {
    id: [u8; 4],
    size: u32,
}

/// Decode a WAV stream from a byte slice.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<DecodedAudio> {
    decode_wav(bytes)
}

/// Decode a WAV stream.
///
/// The reader is consumed only as far as needed: scanning stops as soon as both the `fmt ` and
/// `data` chunks have been read.
pub fn decode_wav<R: Read>(mut reader: R) -> Result<DecodedAudio> {
    read_riff_header(&mut reader)?;

    let mut format: Option<FormatChunk> = None;
    let mut raw: Option<Vec<u8>> = None;

    while format.is_none() || raw.is_none() {
        let Some(header) = read_chunk_header(&mut reader)? else {
            break;
        };

        match &header.id {
            b"fmt " => {
                if header.size < FMT_CHUNK_MIN_SIZE {
                    return Err(RigSoundError::MalformedContainer(format!(
                        "fmt chunk of {} bytes is shorter than {}",
                        header.size, FMT_CHUNK_MIN_SIZE
                    )));
                }
                let mut fields = [0u8; FMT_CHUNK_MIN_SIZE as usize];
                if !read_exact_or_eof(&mut reader, &mut fields)? {
                    return Err(RigSoundError::MissingChunk(
                        "stream ended inside the fmt chunk".to_string(),
                    ));
                }
                // Extensible headers carry extra fields we don't need
                skip(&mut reader, u64::from(header.size - FMT_CHUNK_MIN_SIZE))?;
                format = Some(FormatChunk::parse(&fields));
            }
            b"data" => {
                let mut payload = Vec::new();
                reader
                    .by_ref()
                    .take(u64::from(header.size))
                    .read_to_end(&mut payload)?;
                if payload.len() < header.size as usize {
                    return Err(RigSoundError::MissingChunk(format!(
                        "data chunk declares {} bytes but only {} remain",
                        header.size,
                        payload.len()
                    )));
                }
                raw = Some(payload);
            }
            other => {
                log::debug!(
                    "Skipping WAV chunk {:?} ({} bytes)",
                    String::from_utf8_lossy(other),
                    header.size
                );
                skip(&mut reader, u64::from(header.size))?;
            }
        }

        if header.size % 2 == 1 {
            skip(&mut reader, 1)?;
        }
    }

    let format = format.ok_or_else(|| {
        RigSoundError::MissingChunk("stream ended before the fmt chunk".to_string())
    })?;
    let raw = raw.ok_or_else(|| {
        RigSoundError::MissingChunk("stream ended before the data chunk".to_string())
    })?;

    format.validate()?;

    let (samples, bits_per_sample) = pcm::normalize(format.format_tag, format.bits_per_sample, raw)?;
    DecodedAudio::new(samples, format.channels, format.sample_rate, bits_per_sample)
}

fn read_riff_header<R: Read>(reader: &mut R) -> Result<()> {
    let mut header = [0u8; 12];
    if !read_exact_or_eof(reader, &mut header)? {
        return Err(RigSoundError::MalformedContainer(
            "stream too short for a RIFF header".to_string(),
        ));
    }
    if &header[0..4] != b"RIFF" {
        return Err(RigSoundError::MalformedContainer(
            "missing RIFF tag".to_string(),
        ));
    }
    // header[4..8] is the RIFF size, which is not trusted
    if &header[8..12] != b"WAVE" {
        return Err(RigSoundError::MalformedContainer(
            "missing WAVE tag".to_string(),
        ));
    }
    Ok(())
}

/// Reads the next chunk header, or `None` once the stream has ended.
fn read_chunk_header<R: Read>(reader: &mut R) -> Result<Option<ChunkHeader>> {
    let mut b = [0u8; 8];
    if !read_exact_or_eof(reader, &mut b)? {
        return Ok(None);
    }
    Ok(Some(ChunkHeader {
        id: [b[0], b[1], b[2], b[3]],
        size: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
    }))
}

/// `read_exact` that reports a short stream as `false` instead of an error.
fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Discards up to `n` bytes. Running out of input is not an error here; the next header read
/// notices it.
fn skip<R: Read>(reader: &mut R, n: u64) -> Result<u64> {
    Ok(io::copy(&mut reader.by_ref().take(n), &mut io::sink())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{WavBuilder, pcm16_wav};
    use std::io::Write;

    #[test]
    fn test_pcm8_mono_passthrough() {
        let data: Vec<u8> = (0..=255u8).collect();
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 1, 11025, 8).data(&data).build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.bits_per_sample(), 8);
        assert_eq!(audio.sample_rate(), 11025);
        assert_eq!(audio.samples(), data.as_slice());
    }

    #[test]
    fn test_pcm16_stereo_passthrough() {
        let frames: Vec<i16> = vec![0, -1, 1000, -1000, i16::MAX, i16::MIN];
        let bytes = pcm16_wav(2, 44100, &frames);

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.bits_per_sample(), 16);
        assert_eq!(audio.total_frames(), 3);
        let expected: Vec<u8> = frames.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(audio.samples(), expected.as_slice());
    }

    #[test]
    fn test_pcm8_stereo_passthrough() {
        let data = [0u8, 255, 128, 127, 1, 254];
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 2, 22050, 8).data(&data).build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.bits_per_sample(), 8);
        assert_eq!(audio.sample_rate(), 22050);
        assert_eq!(audio.total_frames(), 3);
        assert_eq!(audio.samples(), &data);
    }

    #[test]
    fn test_pcm16_mono_passthrough() {
        let samples: Vec<i16> = vec![i16::MIN, -256, 0, 255, i16::MAX];
        let bytes = pcm16_wav(1, 16000, &samples);

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.bits_per_sample(), 16);
        assert_eq!(audio.sample_rate(), 16000);
        assert_eq!(audio.total_frames(), samples.len());
        let expected: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(audio.samples(), expected.as_slice());
    }

    #[test]
    fn test_float32_sine_converts_to_pcm16() {
        let sine: Vec<f32> = (0..256)
            .map(|i| (i as f32 / 256.0 * std::f32::consts::TAU).sin() * 1.2)
            .collect();
        let data: Vec<u8> = sine.iter().flat_map(|f| f.to_le_bytes()).collect();
        let bytes = WavBuilder::new(WAVE_FORMAT_IEEE_FLOAT, 1, 48000, 32)
            .data(&data)
            .build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.bits_per_sample(), 16);
        assert_eq!(audio.total_frames(), sine.len());

        for (chunk, s) in audio.samples().chunks_exact(2).zip(&sine) {
            let got = i16::from_le_bytes([chunk[0], chunk[1]]) as i32;
            let want = (s.clamp(-1.0, 1.0) * 32767.0).round() as i32;
            assert!((got - want).abs() <= 1, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_int24_extremes() {
        let data = [0xff, 0xff, 0x7f, 0x00, 0x00, 0x80];
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 1, 96000, 24).data(&data).build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.bits_per_sample(), 16);
        assert_eq!(audio.samples(), &[0xff, 0x7f, 0x00, 0x80]);
    }

    #[test]
    fn test_truncated_data_chunk() {
        let mut bytes = pcm16_wav(1, 22050, &[1, 2, 3, 4]);
        bytes.truncate(bytes.len() - 3);

        let err = decode_wav_bytes(&bytes).unwrap_err();
        assert!(matches!(err, RigSoundError::MissingChunk(_)), "{:?}", err);
    }

    #[test]
    fn test_bad_container_tags() {
        let mut bytes = pcm16_wav(1, 22050, &[0; 4]);
        bytes[0..4].copy_from_slice(b"RIFX");
        assert!(matches!(
            decode_wav_bytes(&bytes),
            Err(RigSoundError::MalformedContainer(_))
        ));

        let mut bytes = pcm16_wav(1, 22050, &[0; 4]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            decode_wav_bytes(&bytes),
            Err(RigSoundError::MalformedContainer(_))
        ));

        assert!(matches!(
            decode_wav_bytes(b"RIFF\x04\x00"),
            Err(RigSoundError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_missing_data_chunk() {
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 1, 8000, 8).no_data().build();
        assert!(matches!(
            decode_wav_bytes(&bytes),
            Err(RigSoundError::MissingChunk(_))
        ));
    }

    #[test]
    fn test_odd_sized_chunk_is_padded() {
        // A 3-byte LIST chunk followed by its pad byte must not desync the scan
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 1, 8000, 8)
            .chunk(b"LIST", &[1, 2, 3])
            .data(&[10, 20, 30])
            .build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.samples(), &[10, 20, 30]);
    }

    #[test]
    fn test_data_before_fmt_and_extended_fmt() {
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 2, 8000, 8)
            .data_first()
            .fmt_extra(&[0, 0])
            .data(&[1, 2, 3, 4])
            .build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.samples(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_odd_data_chunk_before_fmt() {
        // The pad byte after the 3-byte data chunk sits between it and the fmt header
        let bytes = WavBuilder::new(WAVE_FORMAT_PCM, 1, 8000, 8)
            .data_first()
            .data(&[7, 8, 9])
            .chunk(b"LIST", &[0; 4])
            .build();

        let audio = decode_wav_bytes(&bytes).unwrap();
        assert_eq!(audio.channels(), 1);
        assert_eq!(audio.sample_rate(), 8000);
        assert_eq!(audio.samples(), &[7, 8, 9]);
    }

    #[test]
    fn test_unsupported_formats() {
        let cases = [
            WavBuilder::new(WAVE_FORMAT_PCM, 3, 8000, 16),
            WavBuilder::new(WAVE_FORMAT_PCM, 1, 8000, 12),
            WavBuilder::new(2, 1, 8000, 16),
            WavBuilder::new(WAVE_FORMAT_IEEE_FLOAT, 1, 8000, 16),
        ];
        for builder in cases {
            let bytes = builder.data(&[0; 12]).build();
            assert!(matches!(
                decode_wav_bytes(&bytes),
                Err(RigSoundError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_short_fmt_chunk_rejected() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(b"WAVE");
        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(&[1, 0, 1, 0]);

        assert!(matches!(
            decode_wav_bytes(&bytes),
            Err(RigSoundError::MalformedContainer(_))
        ));
    }

    #[test]
    fn test_load_from_path() {
        let bytes = pcm16_wav(1, 16000, &[5, -5, 7]);
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap();
        let audio = DecodedAudio::from_path(path).unwrap();
        assert_eq!(audio.total_frames(), 3);
        assert_eq!(audio.sample_rate(), 16000);
    }

    #[test]
    fn test_load_missing_file() {
        let err = WavDecoder.load("definitely/not/here.wav").unwrap_err();
        assert!(matches!(err, RigSoundError::Io(_)));
    }
}
