//! # UI Module
//!
//! Terminal rendering for the Sargam trainer.

pub mod cent_meter;
pub mod main_display;
