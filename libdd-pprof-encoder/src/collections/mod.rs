// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod string_table;

use anyhow::Context;
use std::hash::{BuildHasherDefault, Hash};
use std::num::NonZeroU32;

pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, BuildHasherDefault<rustc_hash::FxHasher>>;
pub type FxIndexSet<K> = indexmap::IndexSet<K, BuildHasherDefault<rustc_hash::FxHasher>>;

pub use string_table::{StringId, StringTable};

pub trait Id: Copy + Eq + Hash {
    type RawId;

    /// Convert from a usize offset into an Id.
    /// # Panics
    /// Panic if the usize cannot be represented in the Id. Callers go
    /// through [Dedup::checked_dedup], which validates the offset first.
    fn from_offset(offset: usize) -> Self;

    fn to_raw_id(self) -> Self::RawId;
}

pub trait Item: Eq + Hash {
    /// The Id associated with this Item, e.g. Function -> FunctionId.
    type Id: Id;
}

/// Creates a non-zero, 32-bit unsigned id from the offset. It's guaranteed to
/// be the offset + 1, with guards to not overflow the size of u32.
///
/// pprof reserves id 0 for "no item", so the first function or location in a
/// table gets id 1.
#[inline]
pub fn small_non_zero_pprof_id(offset: usize) -> Option<NonZeroU32> {
    let small: u32 = offset.try_into().ok()?;
    NonZeroU32::new(small.checked_add(1)?)
}

pub trait Dedup<T: Item> {
    /// Deduplicate the Item, and check if the generated Id is valid.
    fn checked_dedup(&mut self, item: T) -> anyhow::Result<<T as Item>::Id>;
}

impl<T: Item> Dedup<T> for FxIndexSet<T> {
    fn checked_dedup(&mut self, item: T) -> anyhow::Result<<T as Item>::Id> {
        let (id, _) = self.insert_full(item);

        anyhow::ensure!(
            id < self.len(),
            "out of bounds id generated {:?}, len was {:?}",
            id,
            self.len()
        );
        small_non_zero_pprof_id(id).with_context(|| format!("invalid id generated {id:?}"))?;

        Ok(<T as Item>::Id::from_offset(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_non_zero_pprof_id() {
        assert_eq!(NonZeroU32::new(1), small_non_zero_pprof_id(0));
        assert_eq!(NonZeroU32::new(2), small_non_zero_pprof_id(1));
        assert_eq!(
            NonZeroU32::new(u32::MAX),
            small_non_zero_pprof_id((u32::MAX - 1) as usize)
        );

        assert_eq!(None, small_non_zero_pprof_id(u32::MAX as usize));
        assert_eq!(None, small_non_zero_pprof_id(usize::MAX));
    }
}
