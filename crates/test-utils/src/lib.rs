// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for relq
//!
//! This crate provides common testing components including:
//! - A fixture builder producing query trees over a small customers/orders mapping
//! - Node-level assertions (identity, kind, column references, constants)

pub mod assertions;
pub mod fixtures;

// Re-exports for convenience
pub use assertions::TreeAssertions;
pub use fixtures::{QueryBuilder, Source, customer_columns, order_columns};
