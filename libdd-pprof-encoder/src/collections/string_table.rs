// Copyright 2024-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{FxIndexSet, Id};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("out of memory")]
    OutOfMemory,
    #[error("storage full")]
    StorageFull,
}

impl From<indexmap::TryReserveError> for Error {
    fn from(_: indexmap::TryReserveError) -> Error {
        Error::OutOfMemory
    }
}

/// An index into the string table. The empty string is always [StringId::ZERO].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StringId(u32);

impl StringId {
    pub const ZERO: StringId = StringId(0);

    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Id for StringId {
    type RawId = i64;

    fn from_offset(offset: usize) -> Self {
        #[allow(clippy::expect_used)]
        Self(offset.try_into().expect("StringId to fit into a u32"))
    }

    fn to_raw_id(self) -> Self::RawId {
        self.0.into()
    }
}

/// Holds unique strings and provides [StringId]s that correspond to the order
/// that the strings were inserted.
///
/// There is deliberately no way to remove or reorder strings. The table is
/// turned into the pprof string table by value with [StringTable::into_vec],
/// so no string can be interned after its ids were handed to the output.
pub struct StringTable {
    strings: FxIndexSet<Box<str>>,
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl StringTable {
    /// Creates a new string table, which initially holds the empty string and
    /// no others.
    pub fn new() -> Self {
        let mut strings = FxIndexSet::default();
        // A single stack sample already needs the schema strings, the label
        // keys, and a file and function name per frame.
        strings.reserve(64);
        strings.insert(Box::from(""));
        Self { strings }
    }

    /// Returns the number of strings currently held in the string table.
    #[inline]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Adds the string to the string table if it isn't present already, and
    /// returns a [StringId] that corresponds to the order that this string
    /// was originally inserted.
    pub fn try_intern(&mut self, str: &str) -> Result<StringId, Error> {
        if let Some(offset) = self.strings.get_index_of(str) {
            return Ok(StringId::from_offset(offset));
        }

        let offset = self.strings.len();
        if u32::try_from(offset).is_err() {
            return Err(Error::StorageFull);
        }
        self.strings.try_reserve(1)?;
        self.strings.insert(Box::from(str));
        Ok(StringId::from_offset(offset))
    }

    pub fn get(&self, id: StringId) -> Option<&str> {
        self.strings.get_index(id.0 as usize).map(AsRef::as_ref)
    }

    /// Consumes the table, returning the strings in id order.
    pub fn into_vec(self) -> Vec<String> {
        self.strings.into_iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_is_zero() {
        let mut table = StringTable::new();
        assert_eq!(1, table.len());
        assert_eq!(StringId::ZERO, table.try_intern("").unwrap());
        assert_eq!(Some(""), table.get(StringId::ZERO));
    }

    #[test]
    fn interning_is_idempotent() {
        let mut table = StringTable::new();
        let cases: &[_] = &[
            (StringId::ZERO, ""),
            (StringId(1), "local root span id"),
            (StringId(2), "span id"),
            (StringId(3), "trace endpoint"),
            (StringId(4), "cpu-time"),
            (StringId(5), "nanoseconds"),
            (StringId(6), "/srv/app/views.py"),
            (StringId(7), "handle_request"),
        ];

        for (offset, str) in cases.iter() {
            let actual_offset = table.try_intern(str).unwrap();
            assert_eq!(*offset, actual_offset);
        }
        assert_eq!(cases.len(), table.len());

        // re-interning never hands out a new id
        for (offset, str) in cases.iter() {
            assert_eq!(*offset, table.try_intern(str).unwrap());
        }
        assert_eq!(cases.len(), table.len());

        let strings = table.into_vec();
        let expected: Vec<_> = cases.iter().map(|(_, str)| str.to_string()).collect();
        assert_eq!(expected, strings);
    }
}
