//! CampCare Voice - voice-command capture and dispatch
//!
//! Records a bounded microphone window, submits the capture to a remote
//! transcription service, and maps the transcript onto a fixed catalog of
//! application destinations through an injected navigation capability.

/// Microphone capture and payload encoding
pub mod audio;
/// Phrase catalog and command resolution
pub mod commands;
/// Configuration management
pub mod config;
/// Recording/transcription/dispatch lifecycle
pub mod controller;
/// Error taxonomy
pub mod error;
/// Navigation capability seam
pub mod navigation;
/// Microphone permission capability
pub mod permissions;
/// Spoken feedback capability
pub mod speech;
/// Logging setup
pub mod telemetry;
/// Remote transcription client
pub mod transcription;
