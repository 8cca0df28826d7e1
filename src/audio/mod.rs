/// Audio output using cpal
/// The device's rendered-frame count doubles as the playback clock
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::clock::AudioBackend;
use crate::error::{EditorError, Result};

mod decode;

pub use decode::{decode_track, DecodedTrack};

/// What the output callback is currently reading from
#[derive(Debug, Default)]
struct Transport {
    track: Option<Arc<DecodedTrack>>,
    // Position in source frames; fractional when rates differ
    cursor: f64,
    playing: bool,
}

/// Frame count as of the most recent callback
#[derive(Debug, Default)]
struct DeviceClock {
    // Frames handed to the device before the latest buffer
    frames: u64,
    // Length of the latest buffer in frames
    period: u64,
    stamp: Option<Instant>,
}

impl DeviceClock {
    fn tick(&mut self, buffer_frames: u64, at: Instant) {
        self.frames += self.period;
        self.period = buffer_frames;
        self.stamp = Some(at);
    }
}

pub struct AudioOutput {
    _stream: Option<cpal::Stream>,
    transport: Arc<Mutex<Transport>>,
    device_clock: Arc<Mutex<DeviceClock>>,
    sample_rate: u32,
    created: Instant,
}

impl AudioOutput {
    pub fn new() -> Result<Self> {
        let transport = Arc::new(Mutex::new(Transport::default()));
        let device_clock = Arc::new(Mutex::new(DeviceClock::default()));

        let (stream, sample_rate) =
            Self::setup_audio_stream(Arc::clone(&transport), Arc::clone(&device_clock))?;
        info!(sample_rate, "audio output ready");

        Ok(Self {
            _stream: Some(stream),
            transport,
            device_clock,
            sample_rate,
            created: Instant::now(),
        })
    }

    fn setup_audio_stream(
        transport: Arc<Mutex<Transport>>,
        device_clock: Arc<Mutex<DeviceClock>>,
    ) -> Result<(cpal::Stream, u32)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| EditorError::Audio("no output device".to_string()))?;
        let config = device
            .default_output_config()
            .map_err(|e| EditorError::Audio(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if let Ok(mut clock) = device_clock.lock() {
                        clock.tick((data.len() / channels) as u64, Instant::now());
                    }
                    match transport.lock() {
                        Ok(mut transport) => render(&mut transport, data, channels, sample_rate),
                        Err(_) => data.iter_mut().for_each(|s| *s = 0.0),
                    }
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            ),
            other => {
                return Err(EditorError::Audio(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        }
        .map_err(|e| EditorError::Audio(e.to_string()))?;

        stream
            .play()
            .map_err(|e| EditorError::Audio(e.to_string()))?;
        Ok((stream, sample_rate))
    }

    pub fn has_device(&self) -> bool {
        self._stream.is_some()
    }
}

impl Default for AudioOutput {
    /// Falls back to a silent output timed by the wall clock
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            warn!(error = %e, "no audio output, using wall clock");
            Self {
                _stream: None,
                transport: Arc::new(Mutex::new(Transport::default())),
                device_clock: Arc::new(Mutex::new(DeviceClock::default())),
                sample_rate: 0,
                created: Instant::now(),
            }
        })
    }
}

impl AudioBackend for AudioOutput {
    fn now(&self) -> f64 {
        if self._stream.is_none() || self.sample_rate == 0 {
            return self.created.elapsed().as_secs_f64();
        }
        match self.device_clock.lock() {
            Ok(clock) => match clock.stamp {
                Some(stamp) => interpolate(
                    clock.frames,
                    clock.period,
                    self.sample_rate,
                    stamp.elapsed(),
                ),
                None => 0.0,
            },
            Err(_) => 0.0,
        }
    }

    fn play_from(&mut self, track: Arc<DecodedTrack>, offset: f64) {
        if let Ok(mut transport) = self.transport.lock() {
            transport.cursor = offset.max(0.0) * track.sample_rate() as f64;
            transport.track = Some(track);
            transport.playing = true;
        }
    }

    fn halt(&mut self) {
        if let Ok(mut transport) = self.transport.lock() {
            transport.playing = false;
        }
    }
}

/// Device time between callbacks: the frames already handed over, plus the
/// wall time since the last callback, capped at that buffer's length
fn interpolate(frames: u64, period: u64, sample_rate: u32, since_callback: Duration) -> f64 {
    let rate = sample_rate.max(1) as f64;
    let within = since_callback.as_secs_f64().min(period as f64 / rate);
    frames as f64 / rate + within
}

/// Fill one interleaved device buffer from the transport
fn render(transport: &mut Transport, data: &mut [f32], channels: usize, device_rate: u32) {
    let channels = channels.max(1);
    let track = match (&transport.track, transport.playing) {
        (Some(track), true) => Arc::clone(track),
        _ => {
            data.iter_mut().for_each(|s| *s = 0.0);
            return;
        }
    };

    let step = track.sample_rate() as f64 / device_rate.max(1) as f64;
    let src_channels = track.channels();

    for out in data.chunks_mut(channels) {
        match track.frame(transport.cursor as usize) {
            Some(frame) if transport.playing => {
                for (i, sample) in out.iter_mut().enumerate() {
                    *sample = frame[i.min(src_channels - 1)];
                }
                transport.cursor += step;
            }
            _ => {
                transport.playing = false;
                out.iter_mut().for_each(|s| *s = 0.0);
            }
        }
    }
}
