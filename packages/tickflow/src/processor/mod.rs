//! The processor contract: one stateful transformation, three ways to drive it.
//!
//! - [`Processor::process`] advances the held state by one tick.
//! - [`ProcessorExt::batch`] resets, then runs a whole [`Series`] synchronously.
//! - [`ProcessorExt::stream`] resets, then hands the processor to a single tokio task that
//!   pumps a bounded channel until the input closes or the cancellation token fires.
//!
//! `batch` and `stream` live on a blanket extension trait so no implementor can skip the
//! reset that starts every run.

mod state;
mod stream;

pub use state::ProcessorState;
pub use stream::{feed, Streaming};

use crate::config::StreamConfig;
use crate::error::Result;
use crate::series::Series;
use crate::tick::Tick;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A stateful, composable transformation step.
///
/// Callers must not drive one instance from two contexts at once; the stream driver takes
/// ownership for exactly that reason.
pub trait Processor: Send {
    fn name(&self) -> &str;

    /// Advances the held state by one tick.
    ///
    /// Returns the empty tick while history is insufficient. A required input field that
    /// is absent is an error, scoped with this processor's name.
    fn process(&mut self, tick: Tick) -> Result<Tick>;

    /// Replaces the held state with a freshly initialized one.
    fn reset(&mut self);

    /// Emits whatever the processor buffers once its input is exhausted.
    ///
    /// Called after the last tick of a batch and when a stream's upstream closes (never on
    /// cancellation). Most processors buffer nothing.
    fn flush(&mut self) -> Result<Vec<Tick>> {
        Ok(Vec::new())
    }
}

impl<P: Processor + ?Sized> Processor for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&mut self, tick: Tick) -> Result<Tick> {
        (**self).process(tick)
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn flush(&mut self) -> Result<Vec<Tick>> {
        (**self).flush()
    }
}

/// Batch and stream drivers, available on every [`Processor`].
pub trait ProcessorExt: Processor {
    /// Resets, then feeds every tick of `series` in order, keeping non-empty results.
    ///
    /// Results stay in emission order, the order a stream delivers them.
    fn batch(&mut self, series: &Series) -> Result<Series>;

    /// Resets, then moves `self` into one worker task with the default output capacity.
    ///
    /// Must be called from within a tokio runtime.
    fn stream(self, cancel: CancellationToken, input: mpsc::Receiver<Tick>) -> Streaming<Self>
    where
        Self: Sized + 'static;

    /// Like [`ProcessorExt::stream`] with an explicit configuration.
    fn stream_with(
        self,
        config: &StreamConfig,
        cancel: CancellationToken,
        input: mpsc::Receiver<Tick>,
    ) -> Result<Streaming<Self>>
    where
        Self: Sized + 'static;
}

impl<P: Processor + ?Sized> ProcessorExt for P {
    fn batch(&mut self, series: &Series) -> Result<Series> {
        self.reset();
        let mut out = Series::with_capacity(self.name(), series.len());
        for tick in series {
            let result = self.process(tick.clone())?;
            if !result.is_empty() {
                out.push(result);
            }
        }
        for tick in self.flush()? {
            if !tick.is_empty() {
                out.push(tick);
            }
        }
        Ok(out)
    }

    fn stream(self, cancel: CancellationToken, input: mpsc::Receiver<Tick>) -> Streaming<Self>
    where
        Self: Sized + 'static,
    {
        stream::spawn(self, StreamConfig::default().capacity, cancel, input)
    }

    fn stream_with(
        self,
        config: &StreamConfig,
        cancel: CancellationToken,
        input: mpsc::Receiver<Tick>,
    ) -> Result<Streaming<Self>>
    where
        Self: Sized + 'static,
    {
        config.validate()?;
        Ok(stream::spawn(self, config.capacity, cancel, input))
    }
}

/// A transformation written with its state made explicit: `(tick, state) -> tick'`.
///
/// The transform itself is immutable configuration; everything that changes between
/// calls lives in the [`ProcessorState`] it is handed. Wrap it in a [`Stage`] to get a
/// [`Processor`].
pub trait Transform: Send {
    /// Fresh state for a new run.
    fn init_state(&self) -> ProcessorState;

    fn apply(&self, tick: Tick, state: &mut ProcessorState) -> Result<Tick>;

    /// Flush-on-close hook; see [`Processor::flush`].
    fn finish(&self, _state: &mut ProcessorState) -> Result<Vec<Tick>> {
        Ok(Vec::new())
    }

    fn into_stage(self, name: impl Into<String>) -> Stage<Self>
    where
        Self: Sized,
    {
        Stage::new(name, self)
    }
}

/// Owns a [`Transform`] together with its one live [`ProcessorState`].
#[derive(Debug, Clone)]
pub struct Stage<T: Transform> {
    name: String,
    transform: T,
    state: ProcessorState,
}

impl<T: Transform> Stage<T> {
    pub fn new(name: impl Into<String>, transform: T) -> Self {
        let state = transform.init_state();
        Self {
            name: name.into(),
            transform,
            state,
        }
    }

    pub fn transform(&self) -> &T {
        &self.transform
    }

    pub fn state(&self) -> &ProcessorState {
        &self.state
    }
}

impl<T: Transform> Processor for Stage<T> {
    fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn process(&mut self, tick: Tick) -> Result<Tick> {
        self.state.visit();
        self.transform
            .apply(tick, &mut self.state)
            .map_err(|e| e.within(&self.name))
    }

    fn reset(&mut self) {
        self.state = self.transform.init_state();
    }

    fn flush(&mut self) -> Result<Vec<Tick>> {
        self.transform
            .finish(&mut self.state)
            .map_err(|e| e.within(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineError;

    /// Running total of `x`; emits once two values have been seen.
    #[derive(Debug)]
    struct RunningTotal;

    impl Transform for RunningTotal {
        fn init_state(&self) -> ProcessorState {
            ProcessorState::stateless()
        }

        fn apply(&self, mut tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
            let x = tick.get_field("x")?;
            let total = state.aux("total").unwrap_or(0.0) + x;
            state.set_aux("total", total);
            if state.visits() < 2 {
                return Ok(Tick::empty());
            }
            tick.set_field("total", total);
            Ok(tick)
        }

        fn finish(&self, state: &mut ProcessorState) -> Result<Vec<Tick>> {
            let total = state.aux("total").unwrap_or(0.0);
            Ok(vec![Tick::new(i64::MAX, 0).with_field("final", total)])
        }
    }

    fn xs(values: &[f64]) -> Series {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Tick::new(i as i64, 0).with_field("x", *v))
            .collect()
    }

    #[test]
    fn process_threads_state_and_counts_visits() {
        let mut st = RunningTotal.into_stage("total");
        assert!(st.process(Tick::new(0, 0).with_field("x", 1.0)).unwrap().is_empty());
        let out = st.process(Tick::new(1, 0).with_field("x", 2.0)).unwrap();
        assert_eq!(out.field("total"), Some(3.0));
        assert_eq!(out.field("x"), Some(2.0));
        assert_eq!(st.state().visits(), 2);
    }

    #[test]
    fn batch_resets_before_running_and_flushes_after() {
        let mut st = RunningTotal.into_stage("total");
        // Leave stale state behind.
        st.process(Tick::new(0, 0).with_field("x", 100.0)).unwrap();

        let out = st.batch(&xs(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out.name, "total");
        assert_eq!(out.values("total"), vec![3.0, 6.0]);
        assert_eq!(out.values("final"), vec![6.0]);

        let again = st.batch(&xs(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(again, out);
    }

    /// Stamps each tick with the negated input timestamp.
    #[derive(Debug)]
    struct Mirror;

    impl Transform for Mirror {
        fn init_state(&self) -> ProcessorState {
            ProcessorState::stateless()
        }

        fn apply(&self, mut tick: Tick, _state: &mut ProcessorState) -> Result<Tick> {
            tick.timestamp = -tick.timestamp;
            Ok(tick)
        }
    }

    #[test]
    fn batch_keeps_emission_order() {
        let out = Mirror.into_stage("mirror").batch(&xs(&[1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out.timestamps(), vec![0, -1, -2]);
        assert_eq!(out.values("x"), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn missing_field_is_scoped_with_stage_name() {
        let mut st = RunningTotal.into_stage("total");
        let err = st.process(Tick::new(0, 0).with_field("y", 1.0)).unwrap_err();
        match err {
            EngineError::MissingField { stage, field } => {
                assert_eq!(stage, "total");
                assert_eq!(field, "x");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(st.batch(&xs(&[1.0])).is_ok());
    }

    #[test]
    fn boxed_processors_drive_the_same_way() {
        let mut boxed: Box<dyn Processor> = Box::new(RunningTotal.into_stage("boxed"));
        let out = boxed.batch(&xs(&[1.0, 1.0])).unwrap();
        assert_eq!(out.values("total"), vec![2.0]);
        assert_eq!(boxed.name(), "boxed");
    }
}
