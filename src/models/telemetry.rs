use indexmap::IndexMap;
use std::collections::VecDeque;

/// Channel name -> current reading. Replaced wholesale on every update.
pub type TelemetrySnapshot = IndexMap<String, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: String,
    pub value: f64,
}

/// Time-ordered readings for one series, bounded by `capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySeries {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl HistorySeries {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn push(&mut self, time: impl Into<String>, value: f64) {
        self.samples.push_back(Sample {
            time: time.into(),
            value,
        });
    }

    pub fn pop_oldest(&mut self) -> Option<Sample> {
        self.samples.pop_front()
    }

    pub fn is_over_capacity(&self) -> bool {
        self.samples.len() > self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// (min, max) over the series, `None` when empty.
    pub fn range(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |acc, s| match acc {
            None => Some((s.value, s.value)),
            Some((lo, hi)) => Some((lo.min(s.value), hi.max(s.value))),
        })
    }
}
