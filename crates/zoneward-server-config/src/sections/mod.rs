// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a resolved runtime struct and a partial
//! `*ConfigLayer` used while merging sources.

mod codes;
mod database;
mod directory;
mod logging;

pub use codes::{CodesConfig, CodesConfigLayer};
pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use directory::{DirectoryConfig, DirectoryConfigLayer};
pub use logging::{LogFormat, LoggingConfig, LoggingConfigLayer};
