// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Configuration module for act-as
//!
//! Handles loading settings and environment overrides.

pub mod settings;

pub use settings::*;
