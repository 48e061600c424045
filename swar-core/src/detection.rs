//! # Detection Loop Module
//!
//! Drives the periodic pitch detection cycle: pull a frame and its volume
//! from an [`AudioSource`], gate silence, estimate and smooth the pitch,
//! then place it on the Sargam grid.
//!
//! ## Architecture
//! - [`PitchDetector`] holds the per-session state and runs one cycle at a
//!   time through [`PitchDetector::cycle`].
//! - [`DetectionLoop::start`] moves a detector onto a dedicated thread that
//!   runs one cycle per tick and publishes events on a crossbeam channel.
//! - [`DetectionHandle`] is the control side: tonic and gate changes are
//!   applied between cycles, and stopping joins the thread.
//!
//! Events are delivered in cycle order, at most one per cycle.

use crate::audio::AudioSource;
use crate::config::SadhanaConfig;
use crate::pitch::PitchEstimator;
use crate::shruti::{SwarName, Variant};
use crate::target::{self, TargetComparison};
use crate::tuning::{self, AccuracyTier, Direction, SwarReading};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, info, warn};
use serde::Serialize;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Lowest frequency accepted from the estimator, exclusive.
pub const MIN_VOCAL_HZ: f64 = 50.0;
/// Highest frequency accepted from the estimator, exclusive.
pub const MAX_VOCAL_HZ: f64 = 2000.0;

/// Everything known about one detected pitch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PitchRecord {
    /// Smoothed frequency in Hz.
    pub frequency: f64,
    pub frequency_formatted: String,
    pub swar: SwarName,
    pub hindi: &'static str,
    pub variant: Variant,
    pub full_name: &'static str,
    pub semitone: u8,
    pub octave: i32,
    pub cents: i32,
    pub accuracy: AccuracyTier,
    pub direction: Direction,
    pub volume: f32,
    /// Milliseconds since the UNIX epoch.
    pub timestamp: u64,
}

impl PitchRecord {
    fn new(frequency: f64, tonic: f64, volume: f32) -> Self {
        let reading = tuning::classify(frequency, tonic);
        let degree = reading.degree();
        Self {
            frequency,
            frequency_formatted: tuning::format_frequency(frequency),
            swar: degree.swar,
            hindi: degree.hindi,
            variant: degree.variant,
            full_name: degree.full_name,
            semitone: reading.semitone,
            octave: reading.octave,
            cents: reading.cents,
            accuracy: reading.accuracy,
            direction: reading.direction,
            volume,
            timestamp: now_millis(),
        }
    }

    pub fn reading(&self) -> SwarReading {
        SwarReading {
            semitone: self.semitone,
            octave: self.octave,
            cents: self.cents,
            accuracy: self.accuracy,
            direction: self.direction,
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Outcome of a cycle that produced something to show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "pitch", rename_all = "lowercase")]
pub enum DetectionEvent {
    Pitch(PitchRecord),
    Silence,
}

/// Observer interface for detection events.
pub trait DetectionListener {
    fn on_pitch_detected(&mut self, record: &PitchRecord);

    fn on_silence(&mut self) {}
}

/// Delivers one event to a listener.
pub fn dispatch<L: DetectionListener + ?Sized>(event: &DetectionEvent, listener: &mut L) {
    match event {
        DetectionEvent::Pitch(record) => listener.on_pitch_detected(record),
        DetectionEvent::Silence => listener.on_silence(),
    }
}

/// Per-session detection state.
#[derive(Debug, Clone)]
pub struct PitchDetector {
    tonic: f64,
    min_volume: f32,
    smoothing_factor: f64,
    smoothed_frequency: Option<f64>,
    last_pitch: Option<PitchRecord>,
}

impl PitchDetector {
    pub fn new(config: &SadhanaConfig) -> Self {
        Self {
            tonic: config.sa_frequency,
            min_volume: config.min_volume.clamp(0.0, 1.0) as f32,
            smoothing_factor: config.smoothing_factor.clamp(0.0, 1.0),
            smoothed_frequency: None,
            last_pitch: None,
        }
    }

    pub fn tonic(&self) -> f64 {
        self.tonic
    }

    /// Changes Sa; non-positive frequencies are ignored.
    pub fn set_tonic(&mut self, frequency: f64) {
        if frequency.is_finite() && frequency > 0.0 {
            self.tonic = frequency;
        } else {
            warn!("[DETECT] Ignoring invalid Sa frequency {}", frequency);
        }
    }

    /// Sets the smoothing factor, clamped into [0, 1].
    pub fn set_smoothing_factor(&mut self, factor: f64) {
        self.smoothing_factor = factor.clamp(0.0, 1.0);
    }

    /// Sets the silence gate, clamped into [0, 1].
    pub fn set_min_volume(&mut self, volume: f32) {
        self.min_volume = volume.clamp(0.0, 1.0);
    }

    pub fn smoothed_frequency(&self) -> Option<f64> {
        self.smoothed_frequency
    }

    pub fn last_pitch(&self) -> Option<&PitchRecord> {
        self.last_pitch.as_ref()
    }

    /// Forgets the smoothing history and the last pitch.
    pub fn reset(&mut self) {
        self.smoothed_frequency = None;
        self.last_pitch = None;
    }

    /// Octave-agnostic comparison of the last detected pitch with a target.
    pub fn compare_last_to_target(&self, target_frequency: f64) -> TargetComparison {
        match &self.last_pitch {
            Some(record) => target::compare_to_target(record.frequency, target_frequency),
            None => TargetComparison::NO_MATCH,
        }
    }

    /// Runs a single detection cycle.
    ///
    /// Returns `Silence` when the volume is under the gate, `Pitch` for an
    /// accepted estimate, and `None` when the estimator found nothing usable.
    pub fn cycle<S, E>(&mut self, source: &S, estimator: &mut E) -> Option<DetectionEvent>
    where
        S: AudioSource + ?Sized,
        E: PitchEstimator + ?Sized,
    {
        let volume = source.volume();
        if volume < self.min_volume {
            self.reset();
            return Some(DetectionEvent::Silence);
        }

        let samples = source.time_domain_data();
        let estimate = estimator
            .estimate(&samples, source.sample_rate())
            .map(f64::from)
            .filter(|&f| f > MIN_VOCAL_HZ && f < MAX_VOCAL_HZ)?;

        let smoothed = match self.smoothed_frequency {
            Some(previous) => self.smoothing_factor * estimate + (1.0 - self.smoothing_factor) * previous,
            None => estimate,
        };
        self.smoothed_frequency = Some(smoothed);

        let record = PitchRecord::new(smoothed, self.tonic, volume);
        self.last_pitch = Some(record.clone());
        Some(DetectionEvent::Pitch(record))
    }
}

/// Messages from the control side to the detection thread.
#[derive(Debug, Clone, Copy)]
enum Control {
    SetTonic(f64),
    SetSmoothingFactor(f64),
    SetMinVolume(f32),
    Stop,
}

/// Spawns detection threads.
pub struct DetectionLoop;

impl DetectionLoop {
    /// Starts running `detector` once per `interval` on a dedicated thread.
    ///
    /// The thread owns the detector, the source and the estimator until
    /// [`DetectionHandle::stop`] hands the detector back.
    pub fn start<S, E>(
        detector: PitchDetector,
        source: S,
        estimator: E,
        interval: Duration,
    ) -> DetectionHandle
    where
        S: AudioSource + Send + 'static,
        E: PitchEstimator + Send + 'static,
    {
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let (control_tx, control_rx) = crossbeam_channel::unbounded();
        let interval = interval.max(Duration::from_millis(1));

        let thread = thread::spawn(move || {
            run(detector, source, estimator, interval, event_tx, control_rx)
        });
        info!("[DETECT] Detection started ({} ms cadence)", interval.as_millis());

        DetectionHandle {
            events: event_rx,
            control: control_tx,
            thread: Some(thread),
        }
    }
}

fn run<S, E>(
    mut detector: PitchDetector,
    source: S,
    mut estimator: E,
    interval: Duration,
    events: Sender<DetectionEvent>,
    control: Receiver<Control>,
) -> PitchDetector
where
    S: AudioSource,
    E: PitchEstimator,
{
    let ticker = crossbeam_channel::tick(interval);
    'cycles: loop {
        crossbeam_channel::select! {
            recv(ticker) -> _ => {
                // Apply pending control messages before the cycle body.
                loop {
                    match control.try_recv() {
                        Ok(Control::Stop) | Err(TryRecvError::Disconnected) => break 'cycles,
                        Ok(message) => apply(&mut detector, message),
                        Err(TryRecvError::Empty) => break,
                    }
                }
                if let Some(event) = detector.cycle(&source, &mut estimator) {
                    if events.send(event).is_err() {
                        debug!("[DETECT] Event receiver dropped");
                        break 'cycles;
                    }
                }
            },
            recv(control) -> message => match message {
                Ok(Control::Stop) | Err(_) => break 'cycles,
                Ok(message) => apply(&mut detector, message),
            },
        }
    }
    detector.reset();
    debug!("[DETECT] Detection thread finished");
    detector
}

fn apply(detector: &mut PitchDetector, message: Control) {
    match message {
        Control::SetTonic(frequency) => detector.set_tonic(frequency),
        Control::SetSmoothingFactor(factor) => detector.set_smoothing_factor(factor),
        Control::SetMinVolume(volume) => detector.set_min_volume(volume),
        Control::Stop => {}
    }
}

/// Control side of a running detection loop.
///
/// Dropping the handle stops the loop.
pub struct DetectionHandle {
    events: Receiver<DetectionEvent>,
    control: Sender<Control>,
    thread: Option<JoinHandle<PitchDetector>>,
}

impl DetectionHandle {
    /// Events in cycle order.
    pub fn events(&self) -> &Receiver<DetectionEvent> {
        &self.events
    }

    pub fn set_tonic(&self, frequency: f64) {
        self.send(Control::SetTonic(frequency));
    }

    pub fn set_smoothing_factor(&self, factor: f64) {
        self.send(Control::SetSmoothingFactor(factor));
    }

    pub fn set_min_volume(&self, volume: f32) {
        self.send(Control::SetMinVolume(volume));
    }

    fn send(&self, message: Control) {
        if self.control.send(message).is_err() {
            warn!("[DETECT] Detection thread is gone, dropping {:?}", message);
        }
    }

    /// Stops the loop and returns the detector with its smoothing reset.
    ///
    /// No cycle runs after this returns.
    pub fn stop(mut self) -> Option<PitchDetector> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Option<PitchDetector> {
        let thread = self.thread.take()?;
        let _ = self.control.send(Control::Stop);
        match thread.join() {
            Ok(detector) => {
                info!("[DETECT] Detection stopped");
                Some(detector)
            }
            Err(_) => {
                warn!("[DETECT] Detection thread panicked");
                None
            }
        }
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
