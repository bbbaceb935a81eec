// Counter-delta tracking: turns consecutive cumulative counter readings into rates.
// One tracker per keyspace: disk devices and network interfaces.

use std::collections::HashMap;
use std::time::Instant;

const BYTES_PER_KIB: f64 = 1024.0;
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Output unit for computed rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    BytesPerSec,
    KibibytesPerSec,
    MebibytesPerSec,
}

impl RateUnit {
    fn divisor(self) -> f64 {
        match self {
            RateUnit::BytesPerSec => 1.0,
            RateUnit::KibibytesPerSec => BYTES_PER_KIB,
            RateUnit::MebibytesPerSec => BYTES_PER_MIB,
        }
    }
}

/// Last good cumulative reading for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CounterSample {
    pub cumulative_in: u64,
    pub cumulative_out: u64,
    pub observed_at: Instant,
}

/// Per-interval rate derived from two samples. `(0, 0)` when there is no usable baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rate {
    pub rate_in: f64,
    pub rate_out: f64,
}

impl Rate {
    pub const ZERO: Rate = Rate {
        rate_in: 0.0,
        rate_out: 0.0,
    };
}

#[derive(Debug)]
pub struct RateTracker {
    unit: RateUnit,
    last: HashMap<String, CounterSample>,
}

impl RateTracker {
    pub fn new(unit: RateUnit) -> Self {
        Self {
            unit,
            last: HashMap::new(),
        }
    }

    /// Records a reading for `entity_id` and returns the rate since the previous one.
    ///
    /// The stored baseline is always replaced by this reading, including when no
    /// rate could be computed (first sighting, non-positive elapsed, counter reset).
    pub fn observe(
        &mut self,
        entity_id: &str,
        cumulative_in: u64,
        cumulative_out: u64,
        now: Instant,
    ) -> Rate {
        let current = CounterSample {
            cumulative_in,
            cumulative_out,
            observed_at: now,
        };
        let rate = match self.last.get(entity_id) {
            Some(prev) => self.rate_between(prev, &current),
            None => Rate::ZERO,
        };
        match self.last.get_mut(entity_id) {
            Some(slot) => *slot = current,
            None => {
                self.last.insert(entity_id.to_string(), current);
            }
        }
        rate
    }

    fn rate_between(&self, prev: &CounterSample, current: &CounterSample) -> Rate {
        let elapsed = match current.observed_at.checked_duration_since(prev.observed_at) {
            Some(d) => d.as_secs_f64(),
            None => return Rate::ZERO,
        };
        if elapsed <= 0.0 {
            return Rate::ZERO;
        }
        if current.cumulative_in < prev.cumulative_in || current.cumulative_out < prev.cumulative_out
        {
            tracing::debug!(
                prev_in = prev.cumulative_in,
                prev_out = prev.cumulative_out,
                cur_in = current.cumulative_in,
                cur_out = current.cumulative_out,
                "counter reset; rebasing"
            );
            return Rate::ZERO;
        }
        let divisor = elapsed * self.unit.divisor();
        Rate {
            rate_in: (current.cumulative_in - prev.cumulative_in) as f64 / divisor,
            rate_out: (current.cumulative_out - prev.cumulative_out) as f64 / divisor,
        }
    }

    pub fn last_sample(&self, entity_id: &str) -> Option<&CounterSample> {
        self.last.get(entity_id)
    }

    /// Drops the baseline so the next reading for `entity_id` counts as a first sighting.
    pub fn forget(&mut self, entity_id: &str) -> bool {
        self.last.remove(entity_id).is_some()
    }

    /// Forgets every entity not named in `present`. Call only with the full set from a
    /// successful read. Returns how many baselines were dropped.
    pub fn forget_missing(&mut self, present: &[&str]) -> usize {
        let gone: Vec<String> = self
            .last
            .keys()
            .filter(|id| !present.contains(&id.as_str()))
            .cloned()
            .collect();
        gone.iter().filter(|id| self.forget(id)).count()
    }

    pub fn len(&self) -> usize {
        self.last.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }

    pub fn unit(&self) -> RateUnit {
        self.unit
    }
}
