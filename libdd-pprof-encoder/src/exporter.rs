// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::EncoderConfig;
use crate::errors::ExportError;
use crate::events::{EventKind, RecordedEvents};
use crate::packages::{resolve_packages, Package, PackageResolver};
use crate::pprof;
use crate::profile::ProfileBuilder;
use anyhow::Context;
use std::io::Write;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// Turns the events of one profiling window into a profile and the list of
/// packages its code came from.
pub struct PprofExporter<R> {
    config: EncoderConfig,
    resolver: R,
}

impl<R: PackageResolver> PprofExporter<R> {
    pub fn new(config: EncoderConfig, resolver: R) -> Self {
        Self { config, resolver }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Builds the profile for the window `[start_time_ns, end_time_ns]`, both
    /// in nanoseconds since the Unix epoch. Every call starts from fresh
    /// tables, so ids are only stable within one export.
    pub fn export(
        &self,
        events: &RecordedEvents,
        start_time_ns: i64,
        end_time_ns: i64,
    ) -> Result<Export, ExportError> {
        let mut builder = ProfileBuilder::try_new()?;
        for kind in EventKind::ALL {
            let result = match kind {
                EventKind::StackSample => builder.add_events(&events.stack_samples),
                EventKind::LockAcquire => builder.add_events(&events.lock_acquires),
                EventKind::LockRelease => builder.add_events(&events.lock_releases),
                EventKind::StackException => builder.add_events(&events.stack_exceptions),
                EventKind::Allocation => builder.add_events(&events.allocations),
                EventKind::Heap => builder.add_events(&events.heap),
            };
            result.map_err(|source| ExportError::Aggregation { kind, source })?;
        }

        let profile = builder
            .build(start_time_ns, end_time_ns, self.config.program_name())
            .map_err(|err| match err.downcast::<ExportError>() {
                Ok(err) => err,
                Err(err) => ExportError::BuildFailed(err),
            })?;
        let packages = resolve_packages(&profile, &self.resolver, &self.config.runtime);

        debug!(
            samples = profile.samples.len(),
            locations = profile.locations.len(),
            functions = profile.functions.len(),
            strings = profile.string_table.len(),
            packages = packages.len(),
            duration_nanos = profile.duration_nanos,
            period = profile.period,
            "Exported profile"
        );

        Ok(Export {
            profile,
            packages,
            start_time_ns,
            end_time_ns,
        })
    }
}

/// The result of one export.
#[derive(Clone, Debug, PartialEq)]
pub struct Export {
    pub profile: pprof::Profile,
    pub packages: Vec<Package>,
    pub start_time_ns: i64,
    pub end_time_ns: i64,
}

pub struct EncodedProfile {
    pub start: SystemTime,
    pub end: SystemTime,
    pub buffer: Vec<u8>,
}

impl Export {
    /// Uncompressed protobuf bytes of the profile.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        use prost::Message;
        self.profile.encode_to_vec()
    }

    /// The profile as an lz4 frame, which is what the intake expects.
    pub fn serialize_into_compressed_pprof(&self) -> anyhow::Result<EncodedProfile> {
        use prost::Message;

        const INITIAL_PPROF_BUFFER_SIZE: usize = 32 * 1024;

        let encoded = self.profile.encode_to_vec();
        let mut compressor =
            lz4_flex::frame::FrameEncoder::new(Vec::with_capacity(INITIAL_PPROF_BUFFER_SIZE));
        compressor
            .write_all(&encoded)
            .context("failed to compress the profile")?;
        let buffer = compressor
            .finish()
            .context("failed to finish the lz4 frame")?;

        Ok(EncodedProfile {
            start: nanos_to_system_time(self.start_time_ns),
            end: nanos_to_system_time(self.end_time_ns),
            buffer,
        })
    }

    pub fn packages_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(&self.packages).context("failed to serialize packages")
    }
}

fn nanos_to_system_time(nanos: i64) -> SystemTime {
    let offset = Duration::from_nanos(nanos.unsigned_abs());
    if nanos >= 0 {
        SystemTime::UNIX_EPOCH + offset
    } else {
        SystemTime::UNIX_EPOCH - offset
    }
}
