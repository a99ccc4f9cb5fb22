// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::events::{CapturedStack, Frame};

/// Deduplicated functions and locations, ids assigned in first-seen order
/// starting at 1.
#[derive(Default)]
pub struct LocationTable {
    functions: FxIndexSet<Function>,
    locations: FxIndexSet<Location>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve_function(
        &mut self,
        strings: &mut StringTable,
        filename: &str,
        function_name: &str,
    ) -> anyhow::Result<FunctionId> {
        let filename = strings.try_intern(filename)?;
        let name = strings.try_intern(function_name)?;
        self.functions.checked_dedup(Function { name, filename })
    }

    pub fn resolve_location(
        &mut self,
        strings: &mut StringTable,
        filename: &str,
        line: i64,
        function_name: &str,
    ) -> anyhow::Result<LocationId> {
        let function_id = self.resolve_function(strings, filename, function_name)?;
        self.locations.checked_dedup(Location { function_id, line })
    }

    /// Resolves every captured frame, keeping the collector's order, and
    /// appends a synthetic `<N frames omitted>` location when the collector
    /// saw more frames than it captured.
    pub fn resolve_stack(
        &mut self,
        strings: &mut StringTable,
        stack: &CapturedStack,
    ) -> anyhow::Result<Box<[LocationId]>> {
        let omitted = stack.omitted();
        let mut locations = Vec::with_capacity(stack.frames.len() + usize::from(omitted > 0));
        for Frame {
            filename,
            line,
            function_name,
            ..
        } in stack.frames.iter()
        {
            locations.push(self.resolve_location(strings, filename, *line, function_name)?);
        }

        if omitted > 0 {
            let plural = if omitted > 1 { "s" } else { "" };
            let description = format!("<{omitted} frame{plural} omitted>");
            locations.push(self.resolve_location(strings, "", 0, &description)?);
        }
        Ok(locations.into_boxed_slice())
    }

    pub fn functions_len(&self) -> usize {
        self.functions.len()
    }

    pub fn locations_len(&self) -> usize {
        self.locations.len()
    }

    /// Consumes the table, returning the pprof locations and functions, both
    /// in id order.
    pub fn into_pprof(self) -> (Vec<pprof::Location>, Vec<pprof::Function>) {
        let locations = self
            .locations
            .into_iter()
            .enumerate()
            .map(|(offset, location)| location.to_pprof(LocationId::from_offset(offset)))
            .collect();
        let functions = self
            .functions
            .into_iter()
            .enumerate()
            .map(|(offset, function)| function.to_pprof(FunctionId::from_offset(offset)))
            .collect();
        (locations, functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<Frame> {
        vec![
            Frame::new("/srv/app/db.py", 40, "query"),
            Frame::new("/srv/app/views.py", 12, "index"),
            Frame::new("/srv/app/main.py", 3, "<module>"),
        ]
    }

    #[test]
    fn ids_are_dense_and_stable() {
        let mut strings = StringTable::new();
        let mut table = LocationTable::new();

        let a = table.resolve_location(&mut strings, "a.py", 1, "f").unwrap();
        let b = table.resolve_location(&mut strings, "a.py", 2, "f").unwrap();
        let c = table.resolve_location(&mut strings, "b.py", 1, "f").unwrap();
        assert_eq!(1, a.to_raw_id());
        assert_eq!(2, b.to_raw_id());
        assert_eq!(3, c.to_raw_id());

        // Same function, different lines.
        assert_eq!(2, table.functions_len());
        assert_eq!(a, table.resolve_location(&mut strings, "a.py", 1, "f").unwrap());
        assert_eq!(3, table.locations_len());
    }

    #[test]
    fn resolve_stack_preserves_order() {
        let mut strings = StringTable::new();
        let mut table = LocationTable::new();
        let stack = CapturedStack::new(frames());

        let ids = table.resolve_stack(&mut strings, &stack).unwrap();
        let raw: Vec<_> = ids.iter().map(|id| id.to_raw_id()).collect();
        assert_eq!(vec![1, 2, 3], raw);

        let again = table.resolve_stack(&mut strings, &stack).unwrap();
        assert_eq!(ids, again);
        assert_eq!(3, table.locations_len());
    }

    #[test]
    fn truncated_stack_gets_omitted_marker() {
        let mut strings = StringTable::new();
        let mut table = LocationTable::new();

        let stack = CapturedStack::truncated(frames(), 5);
        let ids = table.resolve_stack(&mut strings, &stack).unwrap();
        assert_eq!(4, ids.len());

        let one_missing = CapturedStack::truncated(frames(), 4);
        let ids = table.resolve_stack(&mut strings, &one_missing).unwrap();
        assert_eq!(4, ids.len());

        let (locations, functions) = table.into_pprof();
        let strings = strings.into_vec();
        let names: Vec<_> = functions
            .iter()
            .map(|function| strings[function.name as usize].as_str())
            .collect();
        assert!(names.contains(&"<2 frames omitted>"));
        assert!(names.contains(&"<1 frame omitted>"));

        let marker = locations
            .iter()
            .find(|location| {
                let function = &functions[location.lines[0].function_id as usize - 1];
                strings[function.name as usize] == "<2 frames omitted>"
            })
            .unwrap();
        assert_eq!(0, marker.lines[0].line);
        let function = &functions[marker.lines[0].function_id as usize - 1];
        assert_eq!("", strings[function.filename as usize]);
    }

    #[test]
    fn declared_depth_below_captured_is_a_noop() {
        let mut strings = StringTable::new();
        let mut table = LocationTable::new();

        let stack = CapturedStack::truncated(frames(), 2);
        let ids = table.resolve_stack(&mut strings, &stack).unwrap();
        assert_eq!(3, ids.len());
        assert_eq!(3, table.locations_len());
    }

    #[test]
    fn into_pprof_assigns_ids_in_insertion_order() {
        let mut strings = StringTable::new();
        let mut table = LocationTable::new();
        table
            .resolve_stack(&mut strings, &CapturedStack::new(frames()))
            .unwrap();

        let (locations, functions) = table.into_pprof();
        for (index, location) in locations.iter().enumerate() {
            assert_eq!((index + 1) as u64, location.id);
            assert_eq!(1, location.lines.len());
        }
        for (index, function) in functions.iter().enumerate() {
            assert_eq!((index + 1) as u64, function.id);
        }
        assert_eq!(40, locations[0].lines[0].line);
    }
}
