// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::events::EventKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to aggregate {kind} events")]
    Aggregation {
        kind: EventKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Failed to build profile")]
    BuildFailed(#[from] anyhow::Error),

    #[error("Invalid location id {id} found during serialization, there are {len} locations")]
    InvalidLocationId { id: u64, len: usize },
}
