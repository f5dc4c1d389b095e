// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::{ActAsError, ApiError};

/// Fallback wait when a 429 carries no usable Retry-After header.
pub(crate) const DEFAULT_RETRY_AFTER_SECS: u32 = 60;

/// Parse numeric Retry-After header (seconds).
pub(crate) fn parse_retry_after_seconds(headers: &HeaderMap) -> Option<u32> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u32>().ok())
}

/// Construct a standardized server error.
pub(crate) fn server_error(status: u16, message: impl Into<String>) -> ActAsError {
    ActAsError::Api(ApiError::ServerError {
        status,
        message: message.into(),
    })
}
