// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Install locations of the running interpreter. Discovered once per process
/// by the host and handed in; the encoder never probes for it.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeInfo {
    /// Version reported for the standard library entry, e.g. `3.12.1`.
    pub version: String,
    /// Standard library directories (pure and platform specific).
    pub stdlib_paths: Vec<String>,
    /// Generic install directory for third-party code.
    pub platlib_paths: Vec<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub program_name: Option<String>,
    pub runtime: RuntimeInfo,
}

impl EncoderConfig {
    pub const UNKNOWN_PROGRAM: &'static str = "<unknown program>";

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("failed to parse the encoder configuration")
    }

    pub fn with_program_name(mut self, program_name: impl Into<String>) -> Self {
        self.program_name = Some(program_name.into());
        self
    }

    pub fn with_runtime(mut self, runtime: RuntimeInfo) -> Self {
        self.runtime = runtime;
        self
    }

    /// The program name for the profile's mapping, never empty.
    pub fn program_name(&self) -> &str {
        match self.program_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => Self::UNKNOWN_PROGRAM,
        }
    }
}
