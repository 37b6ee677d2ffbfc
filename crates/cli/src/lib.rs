// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # relq - Command-line driver
//!
//! Library half of the `relq` binary: configuration loading and the pass
//! pipeline, kept out of `main` so they can be tested directly.

pub mod config;
pub mod pipeline;

pub use config::{ConfigError, OutputMode, PassConfig, RelqConfig};
pub use pipeline::{fresh_allocator, render, run_passes};
