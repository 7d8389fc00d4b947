// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

mod expired_code_cleanup;

pub use expired_code_cleanup::{ExpiredCodeCleanupJob, EXPIRED_CODE_CLEANUP_JOB_ID};
