/// Track decoding with symphonia
use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{EditorError, Result};

/// Fully decoded PCM, interleaved f32 frames.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl DecodedTrack {
    pub fn from_interleaved(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
        }
    }

    /// Mono silence of the given length
    pub fn silence(seconds: f64, sample_rate: u32) -> Self {
        let frames = (seconds * sample_rate as f64).round().max(0.0) as usize;
        Self::from_interleaved(vec![0.0; frames], 1, sample_rate)
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn frame(&self, index: usize) -> Option<&[f32]> {
        let start = index.checked_mul(self.channels)?;
        self.samples.get(start..start + self.channels)
    }
}

fn decode_error(err: SymphoniaError) -> EditorError {
    EditorError::Decode(err.to_string())
}

/// Decode a whole audio file held in memory.
///
/// `extension` is only a probing hint; the container is sniffed from the bytes.
pub fn decode_track(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedTrack> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(decode_error)?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
        .ok_or_else(|| EditorError::Decode("no audio track".to_string()))?
        .clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(decode_error)?;

    let mut samples: Vec<f32> = Vec::new();
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(0);
    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(0);

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(decode_error(e)),
        };
        if packet.track_id() != track.id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(msg, "skipping corrupt packet");
                continue;
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(e) => return Err(decode_error(e)),
        };

        let spec = *decoded.spec();
        channels = spec.channels.count();
        sample_rate = spec.rate;

        let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buf.samples());
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(EditorError::Decode("no audio frames".to_string()));
    }

    let track = DecodedTrack::from_interleaved(samples, channels, sample_rate);
    debug!(
        channels,
        sample_rate,
        duration = track.duration(),
        "track decoded"
    );
    Ok(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16-bit PCM mono WAV with a quiet ramp
    fn wav_bytes(sample_rate: u32, frames: u32) -> Vec<u8> {
        let data_len = frames * 2;
        let mut out = Vec::with_capacity(44 + data_len as usize);
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVE");
        out.extend_from_slice(b"fmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // PCM
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..frames {
            let s = ((i % 64) as i16 - 32) * 16;
            out.extend_from_slice(&s.to_le_bytes());
        }
        out
    }

    #[test]
    fn test_decode_wav() {
        let track = decode_track(wav_bytes(8000, 8000), Some("wav")).unwrap();
        assert_eq!(track.channels(), 1);
        assert_eq!(track.sample_rate(), 8000);
        assert!((track.duration() - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_decode_without_hint() {
        let track = decode_track(wav_bytes(8000, 4000), None).unwrap();
        assert!((track.duration() - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_decode_garbage_fails() {
        let err = decode_track(vec![0x42; 512], Some("mp3")).unwrap_err();
        assert!(matches!(err, EditorError::Decode(_)));
    }

    #[test]
    fn test_decode_empty_fails() {
        assert!(matches!(
            decode_track(Vec::new(), None),
            Err(EditorError::Decode(_))
        ));
    }

    #[test]
    fn test_track_frames() {
        let track = DecodedTrack::from_interleaved(vec![0.1, 0.2, 0.3, 0.4], 2, 2);
        assert_eq!(track.frames(), 2);
        assert_eq!(track.frame(1), Some(&[0.3, 0.4][..]));
        assert_eq!(track.frame(2), None);
        assert_eq!(track.duration(), 1.0);
    }
}
