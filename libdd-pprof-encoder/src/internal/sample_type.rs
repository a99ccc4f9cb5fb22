// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// The sample types of an event profile. The discriminants are the offsets
/// into a sample's values, so the declaration order is the wire order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(usize)]
pub enum SampleType {
    CpuSamples,
    CpuTime,
    WallTime,
    ExceptionSamples,
    LockAcquire,
    LockAcquireWait,
    LockRelease,
    LockReleaseHold,
    AllocSamples,
    AllocSpace,
    HeapSpace,
}

impl SampleType {
    /// The fixed schema, in wire order.
    pub const SCHEMA: [SampleType; 11] = [
        SampleType::CpuSamples,
        SampleType::CpuTime,
        SampleType::WallTime,
        SampleType::ExceptionSamples,
        SampleType::LockAcquire,
        SampleType::LockAcquireWait,
        SampleType::LockRelease,
        SampleType::LockReleaseHold,
        SampleType::AllocSamples,
        SampleType::AllocSpace,
        SampleType::HeapSpace,
    ];

    #[inline]
    pub const fn offset(self) -> usize {
        self as usize
    }

    /// The `(type, unit)` pair emitted in the profile's sample types.
    pub const fn value_type(self) -> (&'static str, &'static str) {
        match self {
            SampleType::CpuSamples => ("cpu-samples", "count"),
            SampleType::CpuTime => ("cpu-time", "nanoseconds"),
            SampleType::WallTime => ("wall-time", "nanoseconds"),
            SampleType::ExceptionSamples => ("exception-samples", "count"),
            SampleType::LockAcquire => ("lock-acquire", "count"),
            SampleType::LockAcquireWait => ("lock-acquire-wait", "nanoseconds"),
            SampleType::LockRelease => ("lock-release", "count"),
            SampleType::LockReleaseHold => ("lock-release-hold", "nanoseconds"),
            SampleType::AllocSamples => ("alloc-samples", "count"),
            SampleType::AllocSpace => ("alloc-space", "bytes"),
            SampleType::HeapSpace => ("heap-space", "bytes"),
        }
    }
}

impl TryFrom<(&str, &str)> for SampleType {
    type Error = anyhow::Error;

    fn try_from(vt: (&str, &str)) -> Result<Self, Self::Error> {
        SampleType::SCHEMA
            .into_iter()
            .find(|sample_type| sample_type.value_type() == vt)
            .ok_or_else(|| anyhow::anyhow!("Unknown sample type: ({}, {})", vt.0, vt.1))
    }
}

/// One value per [SampleType], defaulting to zero.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Values([i64; SampleType::SCHEMA.len()]);

impl Values {
    #[inline]
    pub fn get(&self, sample_type: SampleType) -> i64 {
        self.0[sample_type.offset()]
    }

    #[inline]
    pub fn add(&mut self, sample_type: SampleType, value: i64) {
        let slot = &mut self.0[sample_type.offset()];
        *slot = slot.saturating_add(value);
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}
