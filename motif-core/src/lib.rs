//! # motif-core
//!
//! Melody processing and playback coordination for Motif. Turns loosely-timed
//! recordings into clean note sequences, encodes them for an external synthesis
//! engine, and drives one-shot and looping playback gated on the engine's
//! completion notifications. Independent of any UI.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use motif_core::config::Config;
//! use motif_core::completion::CompletionListener;
//! use motif_core::player::SequencePlayer;
//! use motif_core::playlist::{build_sequential, Session};
//! use motif_core::transport::OscTransport;
//!
//! let config = Config::load();
//! let transport = Arc::new(OscTransport::connect(config.engine_addr(), config.osc_addresses())?);
//! let (listener, completions) = CompletionListener::spawn(config.completion_settings())?;
//!
//! let mut player = SequencePlayer::new(transport, config.sequence_options());
//! player.start(build_sequential(&session))?;
//!
//! // Host event loop: feed completions back in, poll the optional watchdog
//! // for event in completions.try_iter() { player.handle_completion(&event); }
//! // player.poll_watchdog(Instant::now());
//! ```
//!
//! ## Module Overview
//!
//! - [`quantize`] — grid / equal-spacing quantization, overlap removal, chord
//!   grouping, velocity normalization, and the `process_recording` pipeline
//! - [`codec`] — melody ⇄ engine wire payload
//! - [`playlist`] — `Session` + `Selection`, sequential and simultaneous builders
//! - [`player`] — `SequencePlayer` (completion-gated) and `MultiChannelPlayer` (looping)
//! - [`transport`] — `EngineTransport` trait, OSC implementation, recording test transport
//! - [`completion`] — UDP listener for engine completion notifications
//! - [`recording`] — typed note-event bus and the recorder built on it
//! - [`transform`] — transposition (chromatic and diatonic), inversion, augmentation
//! - [`validate`] — key / cadence / range / rhythm checks
//! - [`config`] — TOML configuration loading (embedded defaults + user override)

pub mod codec;
pub mod completion;
pub mod config;
pub mod player;
pub mod playlist;
pub mod quantize;
pub mod recording;
pub mod transform;
pub mod transport;
pub mod validate;
