// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::*;
use crate::events::EventKind;
use tracing::warn;

/// What a single event contributes to its group, before any correction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Observation {
    StackSample { cpu_time_ns: i64, wall_time_ns: i64 },
    LockAcquire { wait_time_ns: i64 },
    LockRelease { locked_for_ns: i64 },
    StackException,
    Allocation { size: u64, capture_pct: f64, nevents: u64 },
    Heap { size: u64 },
}

impl Observation {
    pub fn kind(&self) -> EventKind {
        match self {
            Observation::StackSample { .. } => EventKind::StackSample,
            Observation::LockAcquire { .. } => EventKind::LockAcquire,
            Observation::LockRelease { .. } => EventKind::LockRelease,
            Observation::StackException => EventKind::StackException,
            Observation::Allocation { .. } => EventKind::Allocation,
            Observation::Heap { .. } => EventKind::Heap,
        }
    }
}

/// Average fraction of candidate events a collector captured over one batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SamplingRatio(f64);

impl SamplingRatio {
    /// Averages sampling percentages (`0..=100`) into a ratio. Returns `None`
    /// for an empty batch, or when the average is not positive, in which case
    /// no correction is applied.
    pub fn average(percentages: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (sum, count) = percentages
            .into_iter()
            .fold((0.0_f64, 0_u64), |(sum, count), pct| (sum + pct, count + 1));
        if count == 0 {
            return None;
        }
        let ratio = sum / (count as f64 * 100.0);
        if ratio > 0.0 && ratio.is_finite() {
            Some(Self(ratio))
        } else {
            warn!(ratio, events = count, "Ignoring non-positive sampling ratio");
            None
        }
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Scales a sampled total back up to an estimated true total, truncating
    /// toward zero.
    #[inline]
    fn upscale(self, total: i64) -> i64 {
        (total as f64 / self.0) as i64
    }
}

/// Running totals for one group within one batch of same-kind events.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Accumulator {
    StackSample {
        samples: i64,
        cpu_time_ns: i64,
        wall_time_ns: i64,
    },
    LockAcquire {
        acquires: i64,
        wait_time_ns: i64,
    },
    LockRelease {
        releases: i64,
        locked_for_ns: i64,
    },
    StackException {
        samples: i64,
    },
    Allocation {
        samples: f64,
        space: f64,
    },
    Heap {
        space: i64,
    },
}

impl Accumulator {
    pub fn new(kind: EventKind) -> Self {
        match kind {
            EventKind::StackSample => Accumulator::StackSample {
                samples: 0,
                cpu_time_ns: 0,
                wall_time_ns: 0,
            },
            EventKind::LockAcquire => Accumulator::LockAcquire {
                acquires: 0,
                wait_time_ns: 0,
            },
            EventKind::LockRelease => Accumulator::LockRelease {
                releases: 0,
                locked_for_ns: 0,
            },
            EventKind::StackException => Accumulator::StackException { samples: 0 },
            EventKind::Allocation => Accumulator::Allocation {
                samples: 0.0,
                space: 0.0,
            },
            EventKind::Heap => Accumulator::Heap { space: 0 },
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Accumulator::StackSample { .. } => EventKind::StackSample,
            Accumulator::LockAcquire { .. } => EventKind::LockAcquire,
            Accumulator::LockRelease { .. } => EventKind::LockRelease,
            Accumulator::StackException { .. } => EventKind::StackException,
            Accumulator::Allocation { .. } => EventKind::Allocation,
            Accumulator::Heap { .. } => EventKind::Heap,
        }
    }

    pub fn add(&mut self, observation: Observation) -> anyhow::Result<()> {
        match (self, observation) {
            (
                Accumulator::StackSample {
                    samples,
                    cpu_time_ns,
                    wall_time_ns,
                },
                Observation::StackSample {
                    cpu_time_ns: cpu,
                    wall_time_ns: wall,
                },
            ) => {
                *samples += 1;
                *cpu_time_ns = cpu_time_ns.saturating_add(cpu);
                *wall_time_ns = wall_time_ns.saturating_add(wall);
            }
            (
                Accumulator::LockAcquire {
                    acquires,
                    wait_time_ns,
                },
                Observation::LockAcquire { wait_time_ns: wait },
            ) => {
                *acquires += 1;
                *wait_time_ns = wait_time_ns.saturating_add(wait);
            }
            (
                Accumulator::LockRelease {
                    releases,
                    locked_for_ns,
                },
                Observation::LockRelease {
                    locked_for_ns: held,
                },
            ) => {
                *releases += 1;
                *locked_for_ns = locked_for_ns.saturating_add(held);
            }
            (Accumulator::StackException { samples }, Observation::StackException) => {
                *samples += 1;
            }
            (
                Accumulator::Allocation { samples, space },
                Observation::Allocation {
                    size,
                    capture_pct,
                    nevents,
                },
            ) => {
                *samples += nevents as f64 * (capture_pct / 100.0);
                if capture_pct > 0.0 {
                    *space += size as f64 / capture_pct * 100.0;
                } else {
                    warn!(size, capture_pct, "Allocation event without a capture percentage");
                }
            }
            (Accumulator::Heap { space }, Observation::Heap { size }) => {
                let size = i64::try_from(size).unwrap_or(i64::MAX);
                *space = space.saturating_add(size);
            }
            (accumulator, observation) => anyhow::bail!(
                "cannot add a {} observation to a {} group",
                observation.kind(),
                accumulator.kind()
            ),
        }
        Ok(())
    }

    /// Applies the kind's correction and adds the result to `values`.
    pub fn finish(self, ratio: Option<SamplingRatio>, values: &mut Values) {
        let upscale = |total: i64| ratio.map_or(total, |ratio| ratio.upscale(total));
        match self {
            Accumulator::StackSample {
                samples,
                cpu_time_ns,
                wall_time_ns,
            } => {
                values.add(SampleType::CpuSamples, samples);
                values.add(SampleType::CpuTime, cpu_time_ns);
                values.add(SampleType::WallTime, wall_time_ns);
            }
            Accumulator::LockAcquire {
                acquires,
                wait_time_ns,
            } => {
                values.add(SampleType::LockAcquire, acquires);
                values.add(SampleType::LockAcquireWait, upscale(wait_time_ns));
            }
            Accumulator::LockRelease {
                releases,
                locked_for_ns,
            } => {
                values.add(SampleType::LockRelease, releases);
                values.add(SampleType::LockReleaseHold, upscale(locked_for_ns));
            }
            Accumulator::StackException { samples } => {
                values.add(SampleType::ExceptionSamples, samples);
            }
            Accumulator::Allocation { samples, space } => {
                // Summed first, rounded once per group.
                values.add(SampleType::AllocSamples, samples.round_ties_even() as i64);
                values.add(SampleType::AllocSpace, space.round_ties_even() as i64);
            }
            Accumulator::Heap { space } => {
                values.add(SampleType::HeapSpace, space);
            }
        }
    }
}

/// Accumulated values per group key, in first-seen order.
#[derive(Default)]
pub struct Aggregator {
    samples: FxIndexMap<GroupKey, Values>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one batch of same-kind groups into the aggregation. Groups of
    /// different kinds may share a key (e.g. allocation and heap samples of
    /// the same thread and stack); their metrics land in the same values.
    pub fn merge(
        &mut self,
        batch: FxIndexMap<GroupKey, Accumulator>,
        ratio: Option<SamplingRatio>,
    ) -> anyhow::Result<()> {
        self.samples.try_reserve(batch.len())?;
        for (key, accumulator) in batch {
            let values = self.samples.entry(key).or_default();
            accumulator.finish(ratio, values);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn into_samples(self) -> impl Iterator<Item = (GroupKey, Values)> {
        self.samples.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finish(accumulator: Accumulator, ratio: Option<SamplingRatio>) -> Values {
        let mut values = Values::default();
        accumulator.finish(ratio, &mut values);
        values
    }

    #[test]
    fn stack_samples_sum() {
        let mut acc = Accumulator::new(EventKind::StackSample);
        acc.add(Observation::StackSample {
            cpu_time_ns: 10,
            wall_time_ns: 5,
        })
        .unwrap();
        acc.add(Observation::StackSample {
            cpu_time_ns: 7,
            wall_time_ns: 3,
        })
        .unwrap();

        let values = finish(acc, None);
        assert_eq!(2, values.get(SampleType::CpuSamples));
        assert_eq!(17, values.get(SampleType::CpuTime));
        assert_eq!(8, values.get(SampleType::WallTime));
        assert_eq!(27, values.as_slice().iter().sum::<i64>());
    }

    #[test]
    fn sampling_ratio_average() {
        let ratio = SamplingRatio::average([50.0, 50.0]).unwrap();
        assert_eq!(0.5, ratio.get());

        let ratio = SamplingRatio::average([100.0, 50.0]).unwrap();
        assert_eq!(0.75, ratio.get());

        assert_eq!(None, SamplingRatio::average([]));
        assert_eq!(None, SamplingRatio::average([0.0, 0.0]));
    }

    #[test]
    fn lock_acquire_wait_is_upscaled() {
        let mut acc = Accumulator::new(EventKind::LockAcquire);
        acc.add(Observation::LockAcquire { wait_time_ns: 100 }).unwrap();
        acc.add(Observation::LockAcquire { wait_time_ns: 200 }).unwrap();

        let values = finish(acc, SamplingRatio::average([50.0, 50.0]));
        assert_eq!(2, values.get(SampleType::LockAcquire));
        assert_eq!(600, values.get(SampleType::LockAcquireWait));

        // Without a ratio, the raw total is kept.
        let values = finish(acc, None);
        assert_eq!(300, values.get(SampleType::LockAcquireWait));
    }

    #[test]
    fn lock_release_hold_is_truncated() {
        let mut acc = Accumulator::new(EventKind::LockRelease);
        acc.add(Observation::LockRelease { locked_for_ns: 100 }).unwrap();

        // 100 / 0.3 = 333.33..
        let values = finish(acc, SamplingRatio::average([30.0]));
        assert_eq!(1, values.get(SampleType::LockRelease));
        assert_eq!(333, values.get(SampleType::LockReleaseHold));
    }

    #[test]
    fn allocations_are_rounded_once() {
        let mut acc = Accumulator::new(EventKind::Allocation);
        acc.add(Observation::Allocation {
            size: 1000,
            capture_pct: 10.0,
            nevents: 1,
        })
        .unwrap();
        let values = finish(acc, None);
        assert_eq!(10000, values.get(SampleType::AllocSpace));
        assert_eq!(0, values.get(SampleType::AllocSamples));

        // 0.4 + 0.4 rounds to 1 only when summed first.
        let mut acc = Accumulator::new(EventKind::Allocation);
        for _ in 0..2 {
            acc.add(Observation::Allocation {
                size: 10,
                capture_pct: 40.0,
                nevents: 1,
            })
            .unwrap();
        }
        let values = finish(acc, None);
        assert_eq!(1, values.get(SampleType::AllocSamples));
        assert_eq!(50, values.get(SampleType::AllocSpace));
    }

    #[test]
    fn allocation_without_capture_pct_adds_no_space() {
        let mut acc = Accumulator::new(EventKind::Allocation);
        acc.add(Observation::Allocation {
            size: 1000,
            capture_pct: 0.0,
            nevents: 4,
        })
        .unwrap();
        let values = finish(acc, None);
        assert_eq!(0, values.get(SampleType::AllocSpace));
        assert_eq!(0, values.get(SampleType::AllocSamples));
    }

    #[test]
    fn heap_space_is_not_scaled() {
        let mut acc = Accumulator::new(EventKind::Heap);
        acc.add(Observation::Heap { size: 512 }).unwrap();
        acc.add(Observation::Heap { size: 256 }).unwrap();
        let values = finish(acc, SamplingRatio::average([10.0]));
        assert_eq!(768, values.get(SampleType::HeapSpace));
    }

    #[test]
    fn mismatched_observation_is_an_error() {
        let mut acc = Accumulator::new(EventKind::Heap);
        let err = acc.add(Observation::StackException).unwrap_err();
        assert!(err.to_string().contains("stack exception"));
    }

    #[test]
    fn kinds_sharing_a_key_merge_into_one_sample() {
        let key = GroupKey::new(Box::new([]), Box::new([]));
        let mut aggregator = Aggregator::new();

        let mut alloc = Accumulator::new(EventKind::Allocation);
        alloc
            .add(Observation::Allocation {
                size: 100,
                capture_pct: 100.0,
                nevents: 1,
            })
            .unwrap();
        let mut batch = FxIndexMap::default();
        batch.insert(key.clone(), alloc);
        aggregator.merge(batch, None).unwrap();

        let mut heap = Accumulator::new(EventKind::Heap);
        heap.add(Observation::Heap { size: 64 }).unwrap();
        let mut batch = FxIndexMap::default();
        batch.insert(key, heap);
        aggregator.merge(batch, None).unwrap();

        assert_eq!(1, aggregator.len());
        let (_, values) = aggregator.into_samples().next().unwrap();
        assert_eq!(1, values.get(SampleType::AllocSamples));
        assert_eq!(100, values.get(SampleType::AllocSpace));
        assert_eq!(64, values.get(SampleType::HeapSpace));
    }
}
