use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// Named, timestamp-ordered collection of ticks (batch-mode data).
///
/// Ticks inserted with [`Series::add`] are kept sorted ascending by timestamp. Equal
/// timestamps are allowed and keep their arrival order.
///
/// A series produced by a driver ([`crate::ProcessorExt::batch`],
/// [`crate::Streaming::collect`]) holds ticks in emission order instead, which is timestamp
/// order unless the processor emits older ticks late (a bucketing stage behind a
/// pass-through, or flushed buckets of different widths).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    ticks: Vec<Tick>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ticks: Vec::new(),
        }
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            ticks: Vec::with_capacity(capacity),
        }
    }

    pub fn from_ticks(name: impl Into<String>, mut ticks: Vec<Tick>) -> Self {
        // Stable: duplicates keep their input order.
        ticks.sort_by_key(|t| t.timestamp);
        Self {
            name: name.into(),
            ticks,
        }
    }

    /// Inserts `tick` after every tick with a timestamp <= its own.
    pub fn add(&mut self, tick: Tick) {
        match self.ticks.last() {
            Some(last) if last.timestamp > tick.timestamp => {
                let at = self.ticks.partition_point(|t| t.timestamp <= tick.timestamp);
                self.ticks.insert(at, tick);
            }
            _ => self.ticks.push(tick),
        }
    }

    /// Appends in emission order, without re-sorting.
    pub(crate) fn push(&mut self, tick: Tick) {
        self.ticks.push(tick);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&Tick> {
        self.ticks.get(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Tick> {
        self.ticks.iter()
    }

    pub fn as_slice(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    /// Half-open `[start, end)` copy; out-of-range bounds are clamped.
    pub fn slice(&self, start: usize, end: usize) -> Series {
        let end = end.min(self.ticks.len());
        let start = start.min(end);
        Series {
            name: self.name.clone(),
            ticks: self.ticks[start..end].to_vec(),
        }
    }

    /// First `n` ticks.
    pub fn head(&self, n: usize) -> Series {
        self.slice(0, n)
    }

    /// Last `n` ticks.
    pub fn tail(&self, n: usize) -> Series {
        let len = self.ticks.len();
        self.slice(len.saturating_sub(n), len)
    }

    pub fn timestamps(&self) -> Vec<i64> {
        self.ticks.iter().map(|t| t.timestamp).collect()
    }

    /// Column of `field`, skipping ticks that lack it.
    pub fn values(&self, field: &str) -> Vec<f64> {
        self.ticks.iter().filter_map(|t| t.field(field)).collect()
    }

    // ===== column statistics =====
    //
    // Ticks without the field are skipped. `sum` of nothing is 0.0; the others return
    // `None` when no tick carries the field.

    pub fn sum(&self, field: &str) -> f64 {
        self.ticks.iter().filter_map(|t| t.field(field)).sum()
    }

    pub fn mean(&self, field: &str) -> Option<f64> {
        let (n, sum) = self
            .ticks
            .iter()
            .filter_map(|t| t.field(field))
            .fold((0usize, 0.0), |(n, s), v| (n + 1, s + v));
        if n == 0 {
            None
        } else {
            Some(sum / n as f64)
        }
    }

    pub fn min(&self, field: &str) -> Option<f64> {
        self.ticks
            .iter()
            .filter_map(|t| t.field(field))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.min(v))))
    }

    pub fn max(&self, field: &str) -> Option<f64> {
        self.ticks
            .iter()
            .filter_map(|t| t.field(field))
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |m| m.max(v))))
    }

    pub fn first(&self, field: &str) -> Option<f64> {
        self.ticks.iter().find_map(|t| t.field(field))
    }

    pub fn last(&self, field: &str) -> Option<f64> {
        self.ticks.iter().rev().find_map(|t| t.field(field))
    }

    /// Population standard deviation.
    pub fn std_dev(&self, field: &str) -> Option<f64> {
        let mean = self.mean(field)?;
        let (n, sq) = self
            .ticks
            .iter()
            .filter_map(|t| t.field(field))
            .fold((0usize, 0.0), |(n, s), v| (n + 1, s + (v - mean) * (v - mean)));
        Some((sq / n as f64).sqrt())
    }
}

impl IntoIterator for Series {
    type Item = Tick;
    type IntoIter = std::vec::IntoIter<Tick>;

    fn into_iter(self) -> Self::IntoIter {
        self.ticks.into_iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Tick;
    type IntoIter = std::slice::Iter<'a, Tick>;

    fn into_iter(self) -> Self::IntoIter {
        self.ticks.iter()
    }
}

impl Extend<Tick> for Series {
    fn extend<I: IntoIterator<Item = Tick>>(&mut self, iter: I) {
        for t in iter {
            self.add(t);
        }
    }
}

impl FromIterator<Tick> for Series {
    fn from_iter<I: IntoIterator<Item = Tick>>(iter: I) -> Self {
        Series::from_ticks(String::new(), iter.into_iter().collect())
    }
}
