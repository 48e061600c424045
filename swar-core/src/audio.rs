//! # Audio Capture Module
//!
//! This module handles microphone capture using CPAL (Cross-Platform Audio
//! Library) and exposes it to the detector through the [`AudioSource`] trait.
//!
//! Capture is split in two halves:
//! - [`CaptureStream`] owns the CPAL stream and must stay on the thread that
//!   opened it. It starts and pauses listening.
//! - [`MicrophoneSource`] is a cheap, cloneable view of the most recent
//!   samples that can be handed to the detection thread.
//!
//! ## Features
//! - Automatic audio device selection
//! - Mono f32 capture near 44.1 kHz, downmixing multi-channel devices
//! - A rolling window of the latest samples for time-domain analysis

use crate::util;
use anyhow::{Context, Result, anyhow};
use cpal::SupportedStreamConfigRange;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{error, info};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Default number of samples in a time-domain frame.
pub const BUFFER_SIZE: usize = 2048;

/// Sample rate reported when the device has not told us one.
pub const FALLBACK_SAMPLE_RATE: u32 = 44_100;

/// The audio side of the detector: where frames and volume come from.
pub trait AudioSource {
    /// The latest time-domain frame, values in [-1, 1].
    fn time_domain_data(&self) -> Vec<f32>;

    /// RMS of the latest frame; 0 when not listening.
    fn volume(&self) -> f32 {
        util::rms(&self.time_domain_data())
    }

    fn sample_rate(&self) -> u32;
}

/// Rolling window of the most recent samples.
#[derive(Debug)]
struct SampleWindow {
    samples: VecDeque<f32>,
    capacity: usize,
}

impl SampleWindow {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::from(vec![0.0; capacity]),
            capacity,
        }
    }

    fn push(&mut self, sample: f32) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    fn clear(&mut self) {
        self.samples.iter_mut().for_each(|s| *s = 0.0);
    }
}

fn lock(window: &Mutex<SampleWindow>) -> MutexGuard<'_, SampleWindow> {
    window.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A thread-safe view of the microphone's latest samples.
#[derive(Debug, Clone)]
pub struct MicrophoneSource {
    window: Arc<Mutex<SampleWindow>>,
    listening: Arc<AtomicBool>,
    sample_rate: u32,
    frame_size: usize,
}

impl MicrophoneSource {
    fn new(frame_size: usize, sample_rate: u32) -> Self {
        Self {
            window: Arc::new(Mutex::new(SampleWindow::new(frame_size))),
            listening: Arc::new(AtomicBool::new(false)),
            sample_rate,
            frame_size,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Appends interleaved samples, averaging `channels` into one.
    fn push_interleaved(&self, data: &[f32], channels: usize) {
        let mut window = lock(&self.window);
        for frame in data.chunks(channels.max(1)) {
            window.push(frame.iter().sum::<f32>() / frame.len() as f32);
        }
    }
}

impl AudioSource for MicrophoneSource {
    fn time_domain_data(&self) -> Vec<f32> {
        if !self.is_listening() {
            return vec![0.0; self.frame_size];
        }
        lock(&self.window).samples.iter().copied().collect()
    }

    fn volume(&self) -> f32 {
        if !self.is_listening() {
            return 0.0;
        }
        util::rms(lock(&self.window).samples.make_contiguous())
    }

    fn sample_rate(&self) -> u32 {
        if self.sample_rate == 0 {
            FALLBACK_SAMPLE_RATE
        } else {
            self.sample_rate
        }
    }
}

/// Owner of the CPAL input stream.
///
/// Dropping it releases the microphone.
pub struct CaptureStream {
    stream: cpal::Stream,
    source: MicrophoneSource,
}

impl CaptureStream {
    /// Opens the default input device and starts listening.
    ///
    /// This function:
    /// 1. Selects the default audio input device
    /// 2. Picks an f32 configuration as close to 44.1 kHz as the device allows
    /// 3. Streams every callback into the shared sample window
    ///
    /// # Arguments
    /// * `frame_size` - Number of samples kept for time-domain analysis
    ///
    /// # Returns
    /// * `Ok(stream)` - Running capture stream
    /// * `Err(e)` - No device, no usable format, or the stream failed to start
    pub fn open_default(frame_size: usize) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No microphone found. Please connect a microphone and try again."))?;

        info!(
            "[AUDIO] Using audio input device: {}",
            device.name().unwrap_or_else(|_| "<unnamed>".to_string())
        );

        let configs = device
            .supported_input_configs()
            .context("Failed to query input configurations")?
            .collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, FALLBACK_SAMPLE_RATE)
            .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

        let rate = FALLBACK_SAMPLE_RATE.clamp(
            supported_config.min_sample_rate().0,
            supported_config.max_sample_rate().0,
        );
        let config = supported_config.with_sample_rate(cpal::SampleRate(rate));
        let channels = config.channels() as usize;
        let config: cpal::StreamConfig = config.into();

        info!("[AUDIO] Selected sample rate: {} Hz, {} channel(s)", rate, channels);

        let source = MicrophoneSource::new(frame_size, rate);
        let writer = source.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    writer.push_interleaved(data, channels);
                },
                |err| error!("[AUDIO] An error occurred on the audio stream: {}", err),
                None,
            )
            .context("Failed to build the input stream")?;

        let capture = Self { stream, source };
        capture.start_listening()?;
        Ok(capture)
    }

    /// Resumes the stream; frames and volume become live again.
    pub fn start_listening(&self) -> Result<()> {
        self.stream.play().context("Failed to start the input stream")?;
        self.source.listening.store(true, Ordering::Release);
        info!("[AUDIO] Listening started");
        Ok(())
    }

    /// Pauses the stream; the source reports silence until resumed.
    pub fn stop_listening(&self) -> Result<()> {
        self.source.listening.store(false, Ordering::Release);
        lock(&self.source.window).clear();
        self.stream.pause().context("Failed to pause the input stream")?;
        info!("[AUDIO] Listening stopped");
        Ok(())
    }

    /// A handle on the captured samples for the detection thread.
    pub fn source(&self) -> MicrophoneSource {
        self.source.clone()
    }
}

/// Finds the best supported audio configuration for the target sample rate.
///
/// Only f32 formats are considered. Mono is preferred, then the range
/// closest to `target_rate`.
///
/// # Arguments
/// * `configs` - List of supported audio configurations from the device
/// * `target_rate` - Desired sample rate in Hz
///
/// # Returns
/// * `Some(config)` - Best matching configuration
/// * `None` - No suitable configuration found
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let covers = c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0;
            let distance = if covers {
                0
            } else {
                let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
                let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
                min_diff.min(max_diff)
            };
            (c.channels() != 1, distance)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_latest_samples() {
        let mut window = SampleWindow::new(4);
        for s in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            window.push(s);
        }
        assert_eq!(window.samples.iter().copied().collect::<Vec<_>>(), vec![3.0, 4.0, 5.0, 6.0]);
        window.clear();
        assert!(window.samples.iter().all(|&s| s == 0.0));
        assert_eq!(window.samples.len(), 4);
    }

    #[test]
    fn paused_source_reports_silence() {
        let source = MicrophoneSource::new(8, 48_000);
        source.push_interleaved(&[0.5; 8], 1);
        assert_eq!(source.volume(), 0.0);
        assert_eq!(source.time_domain_data(), vec![0.0; 8]);
        assert_eq!(source.sample_rate(), 48_000);
    }

    #[test]
    fn live_source_downmixes_channels() {
        let source = MicrophoneSource::new(4, 0);
        source.listening.store(true, Ordering::Release);
        source.push_interleaved(&[1.0, 0.0, 0.5, 0.5, -1.0, 0.0, 0.2, 0.2], 2);
        assert_eq!(source.time_domain_data(), vec![0.5, 0.5, -0.5, 0.2]);
        assert!(source.volume() > 0.0);
        assert_eq!(source.sample_rate(), FALLBACK_SAMPLE_RATE);
    }
}
