use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use ringbuf::{
    traits::{Consumer, Observer, Producer, Split},
    HeapCons, HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;

/// Audio capture capability
///
/// `start` acquires the microphone and begins buffering; `stop` releases it
/// and returns the captured samples as 16 kHz mono f32. Exactly one capture
/// may be in progress at a time; the controller enforces that.
#[cfg_attr(test, mockall::automock)]
pub trait AudioCapture: Send {
    /// Begin buffering microphone input
    ///
    /// # Errors
    /// Returns error if the microphone cannot be activated (device busy,
    /// permission revoked mid-flight)
    fn start(&mut self) -> Result<()>;

    /// Stop buffering and return captured samples (16 kHz mono)
    ///
    /// # Errors
    /// Returns error if the stream cannot be paused
    fn stop(&mut self) -> Result<Vec<f32>>;
}

/// Stream lifecycle seam, kept separate from cpal for unit testing
trait StreamControl: Send {
    fn play(&self) -> Result<()>;
    fn pause(&self) -> Result<()>;
}

struct CpalStreamControl {
    stream: cpal::Stream,
}

impl StreamControl for CpalStreamControl {
    fn play(&self) -> Result<()> {
        self.stream.play().context("failed to resume audio stream")
    }

    fn pause(&self) -> Result<()> {
        self.stream.pause().context("failed to pause audio stream")
    }
}

// SAFETY: all access to the stream handle is serialized by the mutex the
// controller wraps the capture in; play/pause are never invoked concurrently
// and the handle is dropped on the owning runtime.
#[allow(unsafe_code)]
unsafe impl Send for CpalStreamControl {}

/// Microphone capture backed by cpal
///
/// The input stream runs for the lifetime of the instance but stays paused
/// between recordings, so the microphone is only hot while a session is
/// `Recording`. Samples land in a lock-free ring buffer from the stream
/// callback and are drained, downmixed, and resampled on stop.
pub struct CpalCapture {
    #[allow(dead_code)] // Kept alive to prevent stream drop
    stream_control: Option<Box<dyn StreamControl>>,
    ring_buffer_consumer: HeapCons<f32>,
    is_recording: Arc<AtomicBool>,
    device_sample_rate: u32,
    device_channels: u16,
    target_sample_rate: u32,
}

impl CpalCapture {
    /// Open the default input device and build a paused stream
    ///
    /// # Errors
    /// Returns error if no input device is available or stream creation fails
    pub fn new(config: &AudioConfig) -> Result<Self> {
        info!("initializing audio capture");

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("no input device available")?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_owned());
        info!("using input device: {}", device_name);

        let supported_config = device
            .default_input_config()
            .context("failed to get default input config")?;

        let device_sample_rate = supported_config.sample_rate();
        let device_channels = supported_config.channels();

        info!(
            "device config: {} Hz, {} channels",
            device_sample_rate, device_channels
        );

        // Sized for the longest recording we buffer so no samples are dropped
        let ring_buffer_capacity =
            (device_sample_rate as usize) * (device_channels as usize) * config.buffer_secs;
        let ring_buffer = HeapRb::<f32>::new(ring_buffer_capacity);
        let (mut producer, ring_buffer_consumer) = ring_buffer.split();

        let is_recording = Arc::new(AtomicBool::new(false));
        let is_recording_callback = Arc::clone(&is_recording);

        let stream_config = supported_config.into();
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if is_recording_callback.load(Ordering::Relaxed) {
                        let pushed = producer.push_slice(data);
                        if pushed < data.len() {
                            warn!("ring buffer full, dropped {} samples", data.len() - pushed);
                        }
                    }
                },
                move |err| {
                    warn!("audio stream error: {}", err);
                },
                None,
            )
            .context("failed to build input stream")?;

        let stream_control = CpalStreamControl { stream };

        // Start then immediately pause: microphone stays cold until start()
        stream_control.play()?;
        stream_control.pause()?;
        info!("audio stream initialized (paused)");

        Ok(Self {
            stream_control: Some(Box::new(stream_control)),
            ring_buffer_consumer,
            is_recording,
            device_sample_rate,
            device_channels,
            target_sample_rate: config.sample_rate,
        })
    }

    fn to_target_rate_mono(&self, samples: &[f32]) -> Vec<f32> {
        let mono = if self.device_channels == 1 {
            samples.to_vec()
        } else {
            let channels = f64::from(self.device_channels);
            samples
                .chunks(self.device_channels as usize)
                .map(|frame| {
                    let sum: f64 = frame.iter().map(|&s| f64::from(s)).sum();
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        (sum / channels) as f32
                    }
                })
                .collect()
        };

        if self.device_sample_rate == self.target_sample_rate {
            return mono;
        }

        // Linear interpolation resampling; precision is sufficient for speech
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        {
            let ratio = f64::from(self.device_sample_rate) / f64::from(self.target_sample_rate);
            let output_len = ((mono.len() as f64) / ratio).ceil() as usize;

            let mut resampled = Vec::with_capacity(output_len);
            for i in 0..output_len {
                let src = (i as f64) * ratio;
                let lo = src.floor() as usize;
                let hi = (lo + 1).min(mono.len().saturating_sub(1));
                let fract = src - src.floor();

                let sample = if lo < mono.len() {
                    let s1 = f64::from(mono[lo]);
                    let s2 = f64::from(mono[hi]);
                    s1.mul_add(1.0 - fract, s2 * fract) as f32
                } else {
                    0.0_f32
                };
                resampled.push(sample);
            }

            debug!(
                device_rate = self.device_sample_rate,
                target_rate = self.target_sample_rate,
                input_samples = mono.len(),
                output_samples = resampled.len(),
                "resampled capture"
            );

            resampled
        }
    }
}

impl AudioCapture for CpalCapture {
    fn start(&mut self) -> Result<()> {
        debug!("starting capture");

        self.ring_buffer_consumer.clear();

        // Flag goes up before the stream resumes to avoid losing the first frames
        self.is_recording.store(true, Ordering::Relaxed);

        if let Some(stream_control) = &self.stream_control {
            stream_control.play()?;
        }

        info!("capture started");
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<f32>> {
        debug!("stopping capture");

        self.is_recording.store(false, Ordering::Relaxed);

        if let Some(stream_control) = &self.stream_control {
            stream_control.pause()?;
        }

        let mut samples = Vec::with_capacity(self.ring_buffer_consumer.occupied_len());
        while let Some(sample) = self.ring_buffer_consumer.try_pop() {
            samples.push(sample);
        }

        let converted = self.to_target_rate_mono(&samples);
        info!(
            raw_samples = samples.len(),
            samples = converted.len(),
            "capture stopped"
        );

        Ok(converted)
    }
}
