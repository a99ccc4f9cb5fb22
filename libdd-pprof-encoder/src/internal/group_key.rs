// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::events::*;
use std::borrow::Cow;

/// Events with identical resolved stacks and identical label tuples share a
/// key and are aggregated into one sample.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct GroupKey {
    /// The leaf is at locations[0].
    locations: Box<[LocationId]>,
    labels: Box<[Label]>,
}

impl GroupKey {
    pub fn new(locations: Box<[LocationId]>, labels: Box<[Label]>) -> Self {
        Self { locations, labels }
    }

    pub fn locations(&self) -> &[LocationId] {
        &self.locations
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }
}

/// Collects the ordered label tuple of one event, interning as it goes.
pub struct LabelTuple<'a> {
    strings: &'a mut StringTable,
    labels: Vec<Label>,
}

impl<'a> LabelTuple<'a> {
    /// The widest tuple, stack samples and lock events, has 10 labels.
    const MAX_LABELS: usize = 10;

    pub fn new(strings: &'a mut StringTable) -> Self {
        Self {
            strings,
            labels: Vec::with_capacity(Self::MAX_LABELS),
        }
    }

    /// Pushes a string label; an absent value becomes the empty string.
    pub fn push_str(
        &mut self,
        key: StringId,
        value: Option<&str>,
    ) -> Result<(), string_table::Error> {
        let value = self.strings.try_intern(value.unwrap_or_default())?;
        self.labels.push(Label::str(key, value));
        Ok(())
    }

    /// Pushes a numeric identifier as its decimal string.
    pub fn push_id(
        &mut self,
        key: StringId,
        value: Option<u64>,
    ) -> Result<(), string_table::Error> {
        let value = value.map(|id| id.to_string());
        self.push_str(key, value.as_deref())
    }

    pub fn finish(self) -> Box<[Label]> {
        self.labels.into_boxed_slice()
    }
}

/// The name to report for a thread, synthesized when the collector had none.
pub fn thread_name(thread: &ThreadInfo) -> Cow<'_, str> {
    match (&thread.name, thread.id) {
        (Some(name), _) => Cow::Borrowed(name.as_str()),
        (None, Some(id)) => Cow::Owned(format!("Anonymous Thread {id}")),
        (None, None) => Cow::Borrowed("Anonymous Thread ?"),
    }
}

/// Per-kind behavior of the shared "resolve stack, build labels, accumulate"
/// pipeline.
pub trait GroupedEvent {
    const KIND: EventKind;

    fn stack(&self) -> &CapturedStack;

    /// Pushes this kind's fixed, ordered label tuple.
    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error>;

    fn observation(&self) -> Observation;

    /// Sampling percentage used for batch-level correction, if this kind is
    /// corrected at all.
    fn sampling_pct(&self) -> Option<f64> {
        None
    }

    /// Sampling period contributing to the profile's average period.
    fn sampling_period(&self) -> Option<i64> {
        None
    }
}

pub fn build_group_key<E: GroupedEvent>(
    event: &E,
    keys: &LabelKeys,
    strings: &mut StringTable,
    locations: &mut LocationTable,
) -> anyhow::Result<GroupKey> {
    let stack = locations.resolve_stack(strings, event.stack())?;
    let mut labels = LabelTuple::new(strings);
    event.push_labels(keys, &mut labels)?;
    Ok(GroupKey::new(stack, labels.finish()))
}

fn push_task_and_trace(
    keys: &LabelKeys,
    labels: &mut LabelTuple<'_>,
    task: &TaskInfo,
    trace: &TraceContext,
) -> Result<(), string_table::Error> {
    labels.push_id(keys.task_id, task.id)?;
    labels.push_str(keys.task_name, task.name.as_deref())?;
    push_trace(keys, labels, trace)
}

fn push_trace(
    keys: &LabelKeys,
    labels: &mut LabelTuple<'_>,
    trace: &TraceContext,
) -> Result<(), string_table::Error> {
    labels.push_id(keys.local_root_span_id, trace.local_root_span_id)?;
    labels.push_id(keys.span_id, trace.span_id)?;
    labels.push_str(keys.trace_endpoint, trace.endpoint())?;
    labels.push_str(keys.trace_type, trace.trace_type.as_deref())
}

fn push_thread(
    keys: &LabelKeys,
    labels: &mut LabelTuple<'_>,
    thread: &ThreadInfo,
) -> Result<(), string_table::Error> {
    labels.push_id(keys.thread_id, thread.id)?;
    labels.push_id(keys.thread_native_id, thread.native_id)?;
    let name = thread_name(thread);
    labels.push_str(keys.thread_name, Some(&*name))
}

impl GroupedEvent for StackSampleEvent {
    const KIND: EventKind = EventKind::StackSample;

    fn stack(&self) -> &CapturedStack {
        &self.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_thread(keys, labels, &self.thread)?;
        push_task_and_trace(keys, labels, &self.task, &self.trace)?;
        labels.push_str(keys.class_name, self.stack.class_name())
    }

    fn observation(&self) -> Observation {
        Observation::StackSample {
            cpu_time_ns: self.cpu_time_ns,
            wall_time_ns: self.wall_time_ns,
        }
    }

    fn sampling_period(&self) -> Option<i64> {
        Some(self.sampling_period)
    }
}

/// Lock events carry no native thread id.
fn push_lock_labels(
    lock: &LockEvent,
    keys: &LabelKeys,
    labels: &mut LabelTuple<'_>,
) -> Result<(), string_table::Error> {
    labels.push_str(keys.lock_name, lock.lock_name.as_deref())?;
    labels.push_id(keys.thread_id, lock.thread.id)?;
    let name = thread_name(&lock.thread);
    labels.push_str(keys.thread_name, Some(&*name))?;
    push_task_and_trace(keys, labels, &lock.task, &lock.trace)?;
    labels.push_str(keys.class_name, lock.stack.class_name())
}

impl GroupedEvent for LockAcquireEvent {
    const KIND: EventKind = EventKind::LockAcquire;

    fn stack(&self) -> &CapturedStack {
        &self.lock.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_lock_labels(&self.lock, keys, labels)
    }

    fn observation(&self) -> Observation {
        Observation::LockAcquire {
            wait_time_ns: self.wait_time_ns,
        }
    }

    fn sampling_pct(&self) -> Option<f64> {
        Some(self.lock.sampling_pct)
    }
}

impl GroupedEvent for LockReleaseEvent {
    const KIND: EventKind = EventKind::LockRelease;

    fn stack(&self) -> &CapturedStack {
        &self.lock.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_lock_labels(&self.lock, keys, labels)
    }

    fn observation(&self) -> Observation {
        Observation::LockRelease {
            locked_for_ns: self.locked_for_ns,
        }
    }

    fn sampling_pct(&self) -> Option<f64> {
        Some(self.lock.sampling_pct)
    }
}

impl GroupedEvent for StackExceptionEvent {
    const KIND: EventKind = EventKind::StackException;

    fn stack(&self) -> &CapturedStack {
        &self.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_thread(keys, labels, &self.thread)?;
        push_trace(keys, labels, &self.trace)?;
        labels.push_str(keys.exception_type, Some(self.exception_type.as_str()))
    }

    fn observation(&self) -> Observation {
        Observation::StackException
    }
}

impl GroupedEvent for AllocationEvent {
    const KIND: EventKind = EventKind::Allocation;

    fn stack(&self) -> &CapturedStack {
        &self.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_thread(keys, labels, &self.thread)
    }

    fn observation(&self) -> Observation {
        Observation::Allocation {
            size: self.size,
            capture_pct: self.capture_pct,
            nevents: self.nevents,
        }
    }
}

impl GroupedEvent for HeapEvent {
    const KIND: EventKind = EventKind::Heap;

    fn stack(&self) -> &CapturedStack {
        &self.stack
    }

    fn push_labels(
        &self,
        keys: &LabelKeys,
        labels: &mut LabelTuple<'_>,
    ) -> Result<(), string_table::Error> {
        push_thread(keys, labels, &self.thread)
    }

    fn observation(&self) -> Observation {
        Observation::Heap { size: self.size }
    }
}
