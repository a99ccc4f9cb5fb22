// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;

/// Represents a [pprof::Location] with some space-saving changes:
///  - The id is not stored on the struct. It's stored in the container that holds the struct.
///  - ids for linked objects use 32-bit numbers instead of 64 bit ones.
///  - there is always exactly 1 Line per Location, so it is inlined into the struct.
///  - there are no mappings or addresses for interpreted code.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub function_id: FunctionId,
    pub line: i64,
}

impl Item for Location {
    type Id = LocationId;
}

impl Location {
    pub fn to_pprof(self, id: LocationId) -> pprof::Location {
        pprof::Location {
            id: id.to_raw_id(),
            mapping_id: 0,
            address: 0,
            lines: vec![pprof::Line {
                function_id: self.function_id.to_raw_id(),
                line: self.line,
            }],
            is_folded: false,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct LocationId(NonZeroU32);

impl Id for LocationId {
    type RawId = u64;

    fn from_offset(offset: usize) -> Self {
        #[allow(clippy::expect_used)]
        Self(small_non_zero_pprof_id(offset).expect("LocationId to fit into a u32"))
    }

    fn to_raw_id(self) -> Self::RawId {
        self.0.get().into()
    }
}
