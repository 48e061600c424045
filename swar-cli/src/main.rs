//! # Swar Sadhana - Sargam Vocal Trainer
//!
//! Terminal front end for the Sargam trainer. It opens the microphone,
//! runs the detection loop from `swar-core` and shows which swar is being
//! sung, how far it is from pure, and which way to correct. It also drives
//! note-matching exercises and answers raga catalog queries.
//!
//! ## Architecture
//! - **Main Thread**: owns the CPAL capture stream and renders events
//! - **Detection Thread**: runs one detection cycle per tick
//! - **Communication**: crossbeam channels carry events in cycle order

mod ui;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use swar_core::audio::CaptureStream;
use swar_core::config::{self, SA_PRESETS};
use swar_core::exercise::{ExerciseKind, ExerciseSession, TargetNote};
use swar_core::pitch::YinEstimator;
use swar_core::shruti::{self, Variant};
use swar_core::{
    DetectionEvent, DetectionHandle, DetectionLoop, PitchDetector, SadhanaConfig, detection, raga,
    tuning,
};
use ui::main_display::{self, TerminalDisplay};

/// How long a completed exercise note stays on screen before the next one.
const NEXT_TARGET_DELAY: Duration = Duration::from_millis(1200);

/// How often the main thread wakes up to check for Ctrl-C.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn parse_sa_arg(value: &str) -> Result<f64, String> {
    config::parse_sa(value).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(name = "swar", version, about = "Sargam pitch trainer for Indian classical vocal practice")]
struct CliArgs {
    /// Path to a TOML configuration file.
    #[clap(long)]
    config: Option<PathBuf>,

    /// Sa as a frequency in Hz or a preset name such as C3 or G4.
    #[clap(long, value_parser = parse_sa_arg)]
    sa: Option<f64>,

    /// Minimum input volume (RMS) for a frame to be analysed.
    #[clap(long)]
    min_volume: Option<f64>,

    /// Weight of the newest frequency when smoothing, in (0, 1].
    #[clap(long)]
    smoothing: Option<f64>,

    /// YIN threshold of the pitch estimator.
    #[clap(long)]
    threshold: Option<f64>,

    /// Refine each estimate against the FFT spectrum.
    #[clap(long)]
    refine: bool,

    /// Log filter, e.g. "info" or "swar_core=debug".
    #[clap(long)]
    log_level: Option<String>,

    /// Print newline-delimited JSON instead of text.
    #[clap(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the swar being sung, optionally against a fixed target swar.
    Listen {
        /// Target as NAME[:VARIANT], e.g. "Pa", "re:komal", "Ma:tivra".
        #[clap(long)]
        target: Option<String>,
    },
    /// Hold randomly chosen notes in tune: "swar-matching" or a raga id.
    Exercise {
        kind: String,
        /// Stop after this many completed notes.
        #[clap(long)]
        rounds: Option<u32>,
    },
    /// List ragas, optionally only those for a time of day.
    Ragas {
        #[clap(long)]
        time: Option<String>,
    },
    /// Describe a raga.
    Raga { id: String },
    /// Aaroh and avroh of a raga with frequencies on the current Sa.
    Scale { id: String },
    /// The characteristic phrase of a raga.
    Pakad { id: String },
    /// Common alankars laid over a raga.
    Alankars { id: String },
    /// Named Sa presets.
    Presets,
}

impl CliArgs {
    /// File config (or defaults) with command line overrides, validated.
    fn resolve_config(&self) -> Result<SadhanaConfig> {
        let mut config = match &self.config {
            Some(path) => SadhanaConfig::load(path)?,
            None => SadhanaConfig::default(),
        };
        if let Some(sa) = self.sa {
            config.sa_frequency = sa;
        }
        if let Some(volume) = self.min_volume {
            config.min_volume = volume;
        }
        if let Some(smoothing) = self.smoothing {
            config.smoothing_factor = smoothing;
        }
        if let Some(threshold) = self.threshold {
            config.estimator_threshold = threshold;
        }
        if let Some(level) = &self.log_level {
            config.log_level = Some(level.clone());
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = args.resolve_config()?;

    let filter = config.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match &args.command {
        Command::Listen { target } => {
            let target = target
                .as_deref()
                .map(|t| parse_target(t, config.sa_frequency))
                .transpose()?;
            listen(&config, &args, target)
        }
        Command::Exercise { kind, rounds } => exercise(&config, &args, ExerciseKind::parse(kind), *rounds),
        Command::Ragas { time } => {
            let ragas: Vec<_> = match time {
                Some(keyword) => raga::by_time_of_day(keyword),
                None => raga::list_all().iter().collect(),
            };
            if args.json {
                for raga in ragas {
                    print_json(raga)?;
                }
            } else {
                for raga in ragas {
                    println!("{}", main_display::raga_summary(raga));
                }
            }
            Ok(())
        }
        Command::Raga { id } => {
            let raga = find_raga(id)?;
            let pakad = raga::pakad_display(id);
            if args.json {
                print_json(&serde_json::json!({ "raga": raga, "pakad": pakad }))
            } else {
                print!("{}", main_display::raga_details(raga, pakad.as_ref()));
                Ok(())
            }
        }
        Command::Scale { id } => {
            let scale = raga::generate_scale(id, config.sa_frequency)
                .ok_or_else(|| unknown_raga(id))?;
            if args.json {
                print_json(&scale)
            } else {
                print!("{}", main_display::scale_table(&scale));
                Ok(())
            }
        }
        Command::Pakad { id } => {
            let pakad = raga::pakad_display(id).ok_or_else(|| unknown_raga(id))?;
            if args.json {
                print_json(&pakad)
            } else {
                println!("{}\n{}", pakad.hindi, pakad.roman);
                Ok(())
            }
        }
        Command::Alankars { id } => {
            let raga = find_raga(id)?;
            for alankar in &raga::COMMON_ALANKARS {
                let semitones = raga::apply_alankar(alankar, raga);
                if args.json {
                    print_json(&serde_json::json!({
                        "id": alankar.id,
                        "name": alankar.name,
                        "semitones": semitones,
                    }))?;
                } else {
                    let labels: Vec<_> = semitones.iter().map(|&s| shruti::degree(s).hindi).collect();
                    println!("{:<14} {:<28} {}", alankar.name, alankar.description, labels.join(" "));
                }
            }
            Ok(())
        }
        Command::Presets => {
            for preset in &SA_PRESETS {
                if args.json {
                    print_json(preset)?;
                } else {
                    println!("{:<4} {:>7.2} Hz  {}", preset.name, preset.frequency, preset.label);
                }
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

fn unknown_raga(id: &str) -> anyhow::Error {
    let known: Vec<_> = raga::list_all().iter().map(|r| r.id).collect();
    anyhow!("Unknown raga {:?}; known ragas: {}", id, known.join(", "))
}

fn find_raga(id: &str) -> Result<&'static raga::Raga> {
    raga::get(id).ok_or_else(|| unknown_raga(id))
}

/// Parses `NAME[:VARIANT]` into a target on the given Sa.
fn parse_target(text: &str, tonic: f64) -> Result<TargetNote> {
    let (name, variant) = match text.split_once(':') {
        Some((name, variant)) => (
            name,
            Variant::parse(variant).ok_or_else(|| anyhow!("Unknown variant {:?}", variant))?,
        ),
        None => (text, Variant::Shuddha),
    };
    let Some(degree) = shruti::find_by_name(name, variant) else {
        let names: Vec<_> = shruti::SwarName::ALL.iter().map(|s| s.as_str()).collect();
        bail!(
            "There is no {} {:?}; swar names are {} (komal Re Ga Da Ni, tivra Ma)",
            variant,
            name,
            names.join(", ")
        );
    };
    Ok(TargetNote {
        semitone: degree.semitone as i32,
        frequency: tuning::frequency_for_degree(name, variant, 0, tonic),
        degree,
    })
}

/// An open microphone plus a running detection loop.
struct PracticeSession {
    capture: CaptureStream,
    detection: DetectionHandle,
}

impl PracticeSession {
    fn open(config: &SadhanaConfig, refine: bool) -> Result<Self> {
        let capture = CaptureStream::open_default(config.frame_size)
            .context("Failed to access microphone")?;
        let estimator = YinEstimator::new(config.estimator_threshold as f32).with_refinement(refine);
        let detection = DetectionLoop::start(
            PitchDetector::new(config),
            capture.source(),
            estimator,
            config.tick_interval(),
        );
        Ok(Self { capture, detection })
    }

    fn events(&self) -> &crossbeam_channel::Receiver<DetectionEvent> {
        self.detection.events()
    }

    fn close(self) {
        let Self { capture, detection } = self;
        detection.stop();
        if let Err(e) = capture.stop_listening() {
            warn!("[MAIN] {:#}", e);
        }
    }
}

fn install_interrupt_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .context("Failed to install the Ctrl-C handler")?;
    Ok(running)
}

/// Waits for the next event, waking up regularly to honour Ctrl-C.
fn next_event(session: &PracticeSession, running: &AtomicBool) -> Option<DetectionEvent> {
    while running.load(Ordering::SeqCst) {
        match session.events().recv_timeout(POLL_INTERVAL) {
            Ok(event) => return Some(event),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("[MAIN] Detection thread ended unexpectedly");
                return None;
            }
        }
    }
    None
}

fn listen(config: &SadhanaConfig, args: &CliArgs, target: Option<TargetNote>) -> Result<()> {
    let running = install_interrupt_flag()?;
    let session = PracticeSession::open(config, args.refine)?;
    info!("[MAIN] Listening with Sa = {:.2} Hz, press Ctrl-C to stop", config.sa_frequency);

    let mut display = TerminalDisplay { target };
    while let Some(event) = next_event(&session, &running) {
        if args.json {
            let comparison = match (&event, &display.target) {
                (DetectionEvent::Pitch(record), Some(target)) => {
                    Some(swar_core::compare_to_target(record.frequency, target.frequency))
                }
                _ => None,
            };
            print_json(&serde_json::json!({ "detection": event, "comparison": comparison }))?;
        } else {
            detection::dispatch(&event, &mut display);
        }
    }

    session.close();
    if !args.json {
        println!();
    }
    Ok(())
}

fn exercise(
    config: &SadhanaConfig,
    args: &CliArgs,
    kind: ExerciseKind,
    rounds: Option<u32>,
) -> Result<()> {
    if let ExerciseKind::Raga(id) = &kind {
        let raga = find_raga(id)?;
        if let Some(pakad) = raga::pakad_display(id) {
            info!("[MAIN] {} pakad: {} ({})", raga.name, pakad.hindi, pakad.roman);
        }
    }

    let mut rng = rand::rng();
    let mut exercise = ExerciseSession::new(kind, config.sa_frequency, config.required_match());
    announce(exercise.next_target(&mut rng), args.json)?;

    let running = install_interrupt_flag()?;
    let session = PracticeSession::open(config, args.refine)?;
    let mut completed_at: Option<Instant> = None;

    while let Some(event) = next_event(&session, &running) {
        let now = Instant::now();
        if completed_at.is_some_and(|at| now.duration_since(at) >= NEXT_TARGET_DELAY) {
            completed_at = None;
            announce(exercise.next_target(&mut rng), args.json)?;
        }

        let DetectionEvent::Pitch(record) = event else {
            if !args.json {
                main_display::show_status(&main_display::silence_line());
            }
            continue;
        };
        let feedback = exercise.on_pitch(&record, now);

        if args.json {
            print_json(&serde_json::json!({ "pitch": record, "feedback": feedback }))?;
        } else if let Some(target) = exercise.target() {
            main_display::show_status(&main_display::exercise_line(&record, &feedback, target));
        }

        if feedback.just_completed {
            completed_at = Some(now);
            if !args.json {
                println!("\n✓ {}", main_display::stats_line(&exercise.stats()));
            }
            if rounds.is_some_and(|r| exercise.stats().correct_count >= r) {
                break;
            }
        }
    }

    session.close();
    let stats = exercise.stats();
    if args.json {
        print_json(&serde_json::json!({ "stats": stats }))?;
    } else {
        println!("\n{}", main_display::stats_line(&stats));
    }
    Ok(())
}

fn announce(target: Option<&TargetNote>, json: bool) -> Result<()> {
    let target = target.ok_or_else(|| anyhow!("This exercise has no notes to practise"))?;
    if json {
        print_json(&serde_json::json!({ "target": target }))
    } else {
        println!(
            "\nSing {} ({}, {})",
            target.degree.hindi,
            target.degree.full_name,
            tuning::format_frequency(target.frequency)
        );
        Ok(())
    }
}
