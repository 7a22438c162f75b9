use crate::circular::RingWindow;
use std::collections::HashMap;

/// Mutable state a [`super::Transform`] threads across calls.
///
/// Holds a bounded window of recent values, a small keyed scratch area for running
/// accumulators (last EMA, current bucket, ...), and a visit counter. One value is owned
/// by exactly one driver at a time; it is rebuilt from the transform's initializer on
/// every reset.
#[derive(Debug, Clone)]
pub struct ProcessorState {
    window: RingWindow,
    aux: HashMap<&'static str, f64>,
    visits: u64,
}

impl ProcessorState {
    pub fn new(window_capacity: usize) -> Self {
        Self {
            window: RingWindow::new(window_capacity),
            aux: HashMap::new(),
            visits: 0,
        }
    }

    /// State for transforms that keep no window.
    pub fn stateless() -> Self {
        Self::new(0)
    }

    /// Appends to the window, returning the evicted value when it was already full.
    #[inline]
    pub fn push(&mut self, v: f64) -> Option<f64> {
        self.window.push(v)
    }

    #[inline]
    pub fn window(&self) -> &RingWindow {
        &self.window
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn window_sum(&self) -> f64 {
        self.window.sum()
    }

    #[inline]
    pub fn window_mean(&self) -> Option<f64> {
        self.window.mean()
    }

    #[inline]
    pub fn aux(&self, key: &str) -> Option<f64> {
        self.aux.get(key).copied()
    }

    #[inline]
    pub fn set_aux(&mut self, key: &'static str, v: f64) {
        self.aux.insert(key, v);
    }

    pub fn take_aux(&mut self, key: &str) -> Option<f64> {
        self.aux.remove(key)
    }

    /// Bumps the visit counter and returns the new count.
    #[inline]
    pub fn visit(&mut self) -> u64 {
        self.visits += 1;
        self.visits
    }

    #[inline]
    pub fn visits(&self) -> u64 {
        self.visits
    }
}

#[cfg(test)]
mod tests {
    use super::ProcessorState;

    #[test]
    fn window_aux_and_visits() {
        let mut st = ProcessorState::new(2);
        assert_eq!(st.push(1.0), None);
        assert_eq!(st.push(2.0), None);
        assert_eq!(st.push(3.0), Some(1.0));
        assert!(st.is_full());
        assert_eq!(st.window_sum(), 5.0);
        assert_eq!(st.window_mean(), Some(2.5));

        st.set_aux("ema", 4.0);
        assert_eq!(st.aux("ema"), Some(4.0));
        assert_eq!(st.take_aux("ema"), Some(4.0));
        assert_eq!(st.aux("ema"), None);

        assert_eq!(st.visit(), 1);
        assert_eq!(st.visit(), 2);
        assert_eq!(st.visits(), 2);
    }
}
