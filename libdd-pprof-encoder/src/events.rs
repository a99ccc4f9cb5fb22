// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Events recorded during one profiling window, as handed over by the
//! collectors. Nothing here is interned yet; see [crate::profile] for that.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Span type of traces whose resource is safe to expose as an endpoint.
pub const WEB_SPAN_TYPE: &str = "web";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    StackSample,
    LockAcquire,
    LockRelease,
    StackException,
    Allocation,
    Heap,
}

impl EventKind {
    /// All kinds, in the order the exporter processes them.
    pub const ALL: [EventKind; 6] = [
        EventKind::StackSample,
        EventKind::LockAcquire,
        EventKind::LockRelease,
        EventKind::StackException,
        EventKind::Allocation,
        EventKind::Heap,
    ];
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::StackSample => "stack sample",
            EventKind::LockAcquire => "lock acquire",
            EventKind::LockRelease => "lock release",
            EventKind::StackException => "stack exception",
            EventKind::Allocation => "allocation",
            EventKind::Heap => "heap",
        };
        fmt::Display::fmt(name, f)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Frame {
    pub filename: String,
    pub line: i64,
    pub function_name: String,
    #[serde(default)]
    pub class_name: Option<String>,
}

impl Frame {
    pub fn new(filename: impl Into<String>, line: i64, function_name: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            line,
            function_name: function_name.into(),
            class_name: None,
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }
}

/// A captured call stack. The collector may stop capturing before reaching
/// the bottom of the stack; `nframes` is the depth it saw, which can exceed
/// `frames.len()`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapturedStack {
    /// Innermost frame first.
    pub frames: Vec<Frame>,
    pub nframes: usize,
}

impl CapturedStack {
    /// A stack where every frame was captured.
    pub fn new(frames: Vec<Frame>) -> Self {
        let nframes = frames.len();
        Self { frames, nframes }
    }

    pub fn truncated(frames: Vec<Frame>, nframes: usize) -> Self {
        Self { frames, nframes }
    }

    /// Number of frames the collector saw but did not capture.
    pub fn omitted(&self) -> usize {
        self.nframes.saturating_sub(self.frames.len())
    }

    /// Class name of the innermost captured frame, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.frames.first().and_then(|frame| frame.class_name.as_deref())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadInfo {
    pub id: Option<u64>,
    pub native_id: Option<u64>,
    pub name: Option<String>,
}

impl ThreadInfo {
    pub fn new(id: u64, native_id: u64, name: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            native_id: Some(native_id),
            name: Some(name.into()),
        }
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskInfo {
    pub id: Option<u64>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceContext {
    pub local_root_span_id: Option<u64>,
    pub span_id: Option<u64>,
    pub trace_type: Option<String>,
    /// Resource of the root span, e.g. `GET /users/{id}`.
    pub trace_resource: Option<String>,
}

impl TraceContext {
    /// The resource, but only for web traces. Resources of other trace types
    /// may embed identifiers that must not end up in a profile.
    pub fn endpoint(&self) -> Option<&str> {
        match self.trace_type.as_deref() {
            Some(WEB_SPAN_TYPE) => self.trace_resource.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackSampleEvent {
    pub thread: ThreadInfo,
    pub task: TaskInfo,
    pub trace: TraceContext,
    pub stack: CapturedStack,
    pub cpu_time_ns: i64,
    pub wall_time_ns: i64,
    /// Interval the sampler was configured with when taking this sample.
    pub sampling_period: i64,
}

/// Fields shared by lock acquire and lock release events.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockEvent {
    pub lock_name: Option<String>,
    pub thread: ThreadInfo,
    pub task: TaskInfo,
    pub trace: TraceContext,
    pub stack: CapturedStack,
    /// Percentage of lock operations the collector captured, in `0..=100`.
    pub sampling_pct: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockAcquireEvent {
    #[serde(flatten)]
    pub lock: LockEvent,
    #[serde(default)]
    pub wait_time_ns: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LockReleaseEvent {
    #[serde(flatten)]
    pub lock: LockEvent,
    #[serde(default)]
    pub locked_for_ns: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackExceptionEvent {
    pub thread: ThreadInfo,
    pub trace: TraceContext,
    pub stack: CapturedStack,
    /// Fully qualified name of the exception type, e.g. `builtins.KeyError`.
    pub exception_type: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationEvent {
    pub thread: ThreadInfo,
    pub stack: CapturedStack,
    /// Bytes allocated by the captured allocation.
    pub size: u64,
    /// Percentage of allocations the collector captured, in `0..=100`.
    pub capture_pct: f64,
    /// Allocations that happened since the previous captured one.
    pub nevents: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapEvent {
    pub thread: ThreadInfo,
    pub stack: CapturedStack,
    /// Live bytes this heap sample stands for.
    pub size: u64,
}

/// All the events of one profiling window, by kind.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordedEvents {
    pub stack_samples: Vec<StackSampleEvent>,
    pub lock_acquires: Vec<LockAcquireEvent>,
    pub lock_releases: Vec<LockReleaseEvent>,
    pub stack_exceptions: Vec<StackExceptionEvent>,
    pub allocations: Vec<AllocationEvent>,
    pub heap: Vec<HeapEvent>,
}

impl RecordedEvents {
    pub fn len(&self, kind: EventKind) -> usize {
        match kind {
            EventKind::StackSample => self.stack_samples.len(),
            EventKind::LockAcquire => self.lock_acquires.len(),
            EventKind::LockRelease => self.lock_releases.len(),
            EventKind::StackException => self.stack_exceptions.len(),
            EventKind::Allocation => self.allocations.len(),
            EventKind::Heap => self.heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        EventKind::ALL.iter().all(|kind| self.len(*kind) == 0)
    }
}
