use core::fmt;

/// Fixed-capacity ring of `f64` (overwrite-oldest when full) with an O(1) running sum.
///
/// While the window holds a non-finite value the sum is recomputed on every push, so it
/// recovers once that value is evicted.
///
/// Backs the sliding window of [`crate::ProcessorState`]. A zero-capacity window holds
/// nothing: every push is immediately evicted.
#[derive(Clone)]
pub struct RingWindow {
    capacity: usize,
    len: usize,
    head: usize, // next write index
    sum: f64,
    data: Vec<f64>,
}

impl fmt::Debug for RingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingWindow")
            .field("capacity", &self.capacity)
            .field("len", &self.len)
            .field("sum", &self.sum)
            .finish_non_exhaustive()
    }
}

impl RingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            len: 0,
            head: 0,
            sum: 0.0,
            data: vec![0.0; capacity],
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Index (in `data`) of the oldest element.
    #[inline]
    fn start(&self) -> usize {
        (self.head + self.capacity - self.len) % self.capacity
    }

    /// Pushes `v`, returning the value it displaced when the window was already full.
    #[inline]
    pub fn push(&mut self, v: f64) -> Option<f64> {
        if self.capacity == 0 {
            return Some(v);
        }
        let evicted = if self.len == self.capacity {
            let old = self.data[self.head];
            self.sum -= old;
            Some(old)
        } else {
            self.len += 1;
            None
        };
        self.data[self.head] = v;
        self.sum += v;
        self.head = (self.head + 1) % self.capacity;
        // A NaN/inf that has left the window must not linger in the running sum.
        if !self.sum.is_finite() {
            self.sum = self.iter().sum();
        }
        evicted
    }

    /// Element by index from oldest (0 = oldest).
    #[inline]
    pub fn get(&self, i: usize) -> Option<f64> {
        if i >= self.len {
            return None;
        }
        Some(self.data[(self.start() + i) % self.capacity])
    }

    /// Element by index from newest (0 = newest).
    #[inline]
    pub fn get_from_end(&self, i: usize) -> Option<f64> {
        if i >= self.len {
            return None;
        }
        self.get(self.len - 1 - i)
    }

    #[inline]
    pub fn first(&self) -> Option<f64> {
        self.get(0)
    }

    #[inline]
    pub fn last(&self) -> Option<f64> {
        self.get_from_end(0)
    }

    #[inline]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// `None` on an empty window.
    #[inline]
    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            None
        } else {
            Some(self.sum / self.len as f64)
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.head = 0;
        self.sum = 0.0;
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.len).filter_map(move |i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}
