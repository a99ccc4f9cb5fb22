// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// A string label. Every label this encoder emits carries a string value;
/// absent values are the empty string, never a missing label.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Label {
    key: StringId,
    str: StringId,
}

impl Label {
    pub fn str(key: StringId, str: StringId) -> Self {
        Self { key, str }
    }

    pub fn get_key(&self) -> StringId {
        self.key
    }

    pub fn get_value(&self) -> StringId {
        self.str
    }
}

impl From<Label> for pprof::Label {
    fn from(l: Label) -> Self {
        Self::from(&l)
    }
}

impl From<&Label> for pprof::Label {
    fn from(l: &Label) -> pprof::Label {
        pprof::Label {
            key: l.key.to_raw_id(),
            str: l.str.to_raw_id(),
            num: 0,
            num_unit: 0,
        }
    }
}

/// The interned label keys, resolved once per profile.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LabelKeys {
    pub thread_id: StringId,
    pub thread_native_id: StringId,
    pub thread_name: StringId,
    pub task_id: StringId,
    pub task_name: StringId,
    pub local_root_span_id: StringId,
    pub span_id: StringId,
    pub trace_endpoint: StringId,
    pub trace_type: StringId,
    pub class_name: StringId,
    pub lock_name: StringId,
    pub exception_type: StringId,
}

impl LabelKeys {
    pub fn try_new(strings: &mut StringTable) -> Result<Self, string_table::Error> {
        Ok(Self {
            thread_id: strings.try_intern("thread id")?,
            thread_native_id: strings.try_intern("thread native id")?,
            thread_name: strings.try_intern("thread name")?,
            task_id: strings.try_intern("task id")?,
            task_name: strings.try_intern("task name")?,
            local_root_span_id: strings.try_intern("local root span id")?,
            span_id: strings.try_intern("span id")?,
            trace_endpoint: strings.try_intern("trace endpoint")?,
            trace_type: strings.try_intern("trace type")?,
            class_name: strings.try_intern("class name")?,
            lock_name: strings.try_intern("lock name")?,
            exception_type: strings.try_intern("exception type")?,
        })
    }
}
