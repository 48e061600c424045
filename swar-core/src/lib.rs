// swar-core/src/lib.rs

//! The core logic for the Sargam vocal trainer.
//! This crate maps sung frequencies onto the twelve swar degrees around a
//! movable Sa, grades their accuracy, holds the raga catalog and runs the
//! detection loop. It is completely headless and contains no UI code.

pub mod audio;
pub mod config;
pub mod detection;
pub mod exercise;
pub mod fft;
pub mod pitch;
pub mod raga;
pub mod shruti;
pub mod target;
pub mod tuning;
pub mod util;

pub use config::SadhanaConfig;
pub use detection::{DetectionEvent, DetectionHandle, DetectionListener, DetectionLoop, PitchDetector, PitchRecord};
pub use target::{TargetComparison, compare_to_target};
pub use tuning::{AccuracyTier, Direction, SwarReading};
