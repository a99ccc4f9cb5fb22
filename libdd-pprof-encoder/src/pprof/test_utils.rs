// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers for inspecting encoded profiles in tests.

#![allow(clippy::panic)]

use super::{Profile, Sample};
use crate::internal::SampleType;
use anyhow::Context;

pub fn deserialize_compressed_pprof(encoded: &[u8]) -> anyhow::Result<Profile> {
    use prost::Message;
    use std::io::Read;

    let mut decoder = lz4_flex::frame::FrameDecoder::new(encoded);
    let mut buf = Vec::new();
    decoder
        .read_to_end(&mut buf)
        .context("failed to decompress the lz4 frame")?;
    let profile = Profile::decode(buf.as_slice())?;
    Ok(profile)
}

pub fn roundtrip_to_pprof(export: &crate::exporter::Export) -> anyhow::Result<Profile> {
    let encoded = export.serialize_into_compressed_pprof()?;
    deserialize_compressed_pprof(&encoded.buffer)
}

pub fn sorted_samples(profile: &Profile) -> Vec<Sample> {
    let mut samples = profile.samples.clone();
    samples.sort_unstable();
    samples
}

/// Decodes the profile's sample types back into the schema they came from.
pub fn sample_type_schema(profile: &Profile) -> anyhow::Result<Vec<SampleType>> {
    profile
        .sample_types
        .iter()
        .map(|vt| {
            let r#type = profile.string(vt.r#type).context("sample type not interned")?;
            let unit = profile.string(vt.unit).context("sample unit not interned")?;
            SampleType::try_from((r#type, unit))
        })
        .collect()
}

#[track_caller]
pub fn string_table_fetch(profile: &Profile, id: i64) -> &str {
    profile
        .string(id)
        .unwrap_or_else(|| panic!("String {id} not found"))
}

/// The sample's labels as `(key, value)` strings, in emitted order.
#[track_caller]
pub fn sample_labels<'a>(profile: &'a Profile, sample: &Sample) -> Vec<(&'a str, &'a str)> {
    sample
        .labels
        .iter()
        .map(|label| {
            (
                string_table_fetch(profile, label.key),
                string_table_fetch(profile, label.str),
            )
        })
        .collect()
}

/// The function names of the sample's stack, leaf first.
#[track_caller]
pub fn sample_function_names<'a>(profile: &'a Profile, sample: &Sample) -> Vec<&'a str> {
    sample
        .location_ids
        .iter()
        .map(|id| {
            let location = profile
                .locations
                .iter()
                .find(|location| location.id == *id)
                .unwrap_or_else(|| panic!("Location {id} not found"));
            let function_id = location.lines[0].function_id;
            let function = profile
                .functions
                .iter()
                .find(|function| function.id == function_id)
                .unwrap_or_else(|| panic!("Function {function_id} not found"));
            string_table_fetch(profile, function.name)
        })
        .collect()
}
