// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections.

pub mod database;
pub mod engine;
pub mod logging;

pub use database::{DatabaseConfig, DatabaseConfigLayer, DEFAULT_DATABASE_URL};
pub use engine::{EngineConfig, EngineConfigLayer};
pub use logging::{LogFormat, LogLevel, LoggingConfig, LoggingConfigLayer};
