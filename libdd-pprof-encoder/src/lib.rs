// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Encodes the events of a sampling profiler into pprof profiles, together
//! with the list of packages the profiled code belongs to.

pub mod collections;
pub mod config;
pub mod errors;
pub mod events;
pub mod exporter;
pub mod internal;
pub mod packages;
pub mod pprof;
pub mod profile;

pub use config::{EncoderConfig, RuntimeInfo};
pub use errors::ExportError;
pub use exporter::{EncodedProfile, Export, PprofExporter};
pub use packages::{Distribution, InstalledPackages, Package, PackageKind, PackageResolver};
