//! # clipsync-cli: clipboard sync host
//!
//! Keeps one sync session open against a desktop peer and exposes it as
//! a line-oriented command loop on stdin.
//!
//! ## Modes
//!
//! - **Interactive** (default): read commands from stdin, print events.
//! - **Bootstrap**: `--gen-config` prints a default config TOML.

pub mod config;
pub mod host;
