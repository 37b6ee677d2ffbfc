// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # relq - Text rendering
//!
//! Two formatters over the same [`TextWriter`]:
//!
//! - [`DebugFormatter`]: every node kind, never fails, for logs and tests
//! - [`SqlFormatter`]: finished command trees only, fails on anything
//!   without a SQL form
//!
//! Both name aliases `t0`, `t1`, ... in declaration order, so two trees
//! that differ only in their alias ids render identically.

pub mod debug;
pub mod error;
mod literal;
pub mod options;
pub mod sql;
pub mod text;
pub mod writer;

pub use debug::{DebugFormatter, format_debug};
pub use error::{FormatError, FormatResult};
pub use options::FormatOptions;
pub use sql::{SqlFormatter, format_sql};
pub use text::DebugText;
pub use writer::TextWriter;
