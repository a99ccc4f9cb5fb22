// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::collections::*;
use crate::errors::ExportError;
use crate::internal::*;
use crate::pprof;
use tracing::{trace, warn};

/// Builds one pprof profile out of the event batches of one window.
///
/// All tables are owned by the builder and only grow while batches are added.
/// [ProfileBuilder::build] consumes the builder, so nothing can be interned
/// once the string table has been handed to the profile.
pub struct ProfileBuilder {
    strings: StringTable,
    locations: LocationTable,
    label_keys: LabelKeys,
    aggregator: Aggregator,
    sample_types: Box<[pprof::ValueType]>,
    period_type: pprof::ValueType,
    period_sum: i64,
    period_count: u64,
}

impl ProfileBuilder {
    pub fn try_new() -> anyhow::Result<Self> {
        let mut strings = StringTable::new();

        let mut value_type = |(r#type, unit): (&str, &str)| -> anyhow::Result<pprof::ValueType> {
            Ok(pprof::ValueType {
                r#type: strings.try_intern(r#type)?.to_raw_id(),
                unit: strings.try_intern(unit)?.to_raw_id(),
            })
        };
        let sample_types: Box<[pprof::ValueType]> = SampleType::SCHEMA
            .into_iter()
            .map(|sample_type| value_type(sample_type.value_type()))
            .collect::<anyhow::Result<_>>()?;
        let period_type = value_type(("time", "nanoseconds"))?;
        let label_keys = LabelKeys::try_new(&mut strings)?;

        Ok(Self {
            strings,
            locations: LocationTable::new(),
            label_keys,
            aggregator: Aggregator::new(),
            sample_types,
            period_type,
            period_sum: 0,
            period_count: 0,
        })
    }

    /// Groups one batch of same-kind events and folds it into the profile.
    /// Correction factors are computed over the whole batch.
    pub fn add_events<E: GroupedEvent>(&mut self, events: &[E]) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let ratio = SamplingRatio::average(events.iter().filter_map(GroupedEvent::sampling_pct));
        let mut batch: FxIndexMap<GroupKey, Accumulator> = FxIndexMap::default();
        for event in events {
            let key = build_group_key(
                event,
                &self.label_keys,
                &mut self.strings,
                &mut self.locations,
            )?;
            batch
                .entry(key)
                .or_insert_with(|| Accumulator::new(E::KIND))
                .add(event.observation())?;

            if let Some(period) = event.sampling_period() {
                self.period_sum = self.period_sum.saturating_add(period);
                self.period_count += 1;
            }
        }

        trace!(
            kind = %E::KIND,
            events = events.len(),
            groups = batch.len(),
            ratio = ratio.map(SamplingRatio::get),
            "Aggregated event batch"
        );
        self.aggregator.merge(batch, ratio)
    }

    /// Average sampling period of the stack samples seen so far, `None` when
    /// there were none.
    pub fn average_period(&self) -> Option<i64> {
        let count = i64::try_from(self.period_count).ok().filter(|c| *c > 0)?;
        Some(self.period_sum / count)
    }

    pub fn samples_len(&self) -> usize {
        self.aggregator.len()
    }

    pub fn interned_strings_count(&self) -> usize {
        self.strings.len()
    }

    /// Assembles the profile. `start_time_ns` is nanoseconds since the Unix
    /// epoch and the duration is `end_time_ns - start_time_ns`, negative when
    /// the clock went backwards during the window.
    pub fn build(
        mut self,
        start_time_ns: i64,
        end_time_ns: i64,
        program_name: &str,
    ) -> anyhow::Result<pprof::Profile> {
        let duration_nanos = end_time_ns.saturating_sub(start_time_ns);
        if duration_nanos < 0 {
            warn!(start_time_ns, end_time_ns, duration_nanos, "Profile ends before it starts");
        }

        let program = self.strings.try_intern(program_name)?;
        let period = self.average_period();
        let locations_len = self.locations.locations_len();

        let mut samples = Vec::new();
        samples.try_reserve_exact(self.aggregator.len())?;
        for (key, values) in self.aggregator.into_samples() {
            let location_ids: Vec<u64> = key.locations().iter().map(|id| id.to_raw_id()).collect();
            check_location_ids_are_valid(&location_ids, locations_len)?;
            samples.push(pprof::Sample {
                location_ids,
                values: values.as_slice().to_vec(),
                labels: key.labels().iter().map(pprof::Label::from).collect(),
            });
        }

        let (locations, functions) = self.locations.into_pprof();
        Ok(pprof::Profile {
            sample_types: self.sample_types.into_vec(),
            samples,
            mappings: vec![pprof::Mapping {
                id: 1,
                filename: program.to_raw_id(),
                ..Default::default()
            }],
            locations,
            functions,
            string_table: self.strings.into_vec(),
            time_nanos: start_time_ns,
            duration_nanos,
            period_type: Some(self.period_type),
            period: period.unwrap_or(0),
            ..Default::default()
        })
    }
}

/// Location ids start from 1, so valid ids are in `1..=len`.
fn check_location_ids_are_valid(location_ids: &[u64], len: usize) -> Result<(), ExportError> {
    let max = u64::try_from(len).unwrap_or(u64::MAX);
    match location_ids.iter().find(|id| **id == 0 || **id > max) {
        Some(id) => Err(ExportError::InvalidLocationId { id: *id, len }),
        None => Ok(()),
    }
}
