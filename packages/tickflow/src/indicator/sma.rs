use super::{check_period, DEFAULT_INPUT};
use crate::error::Result;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// Simple moving average over a fixed sliding window.
///
/// Emits nothing for the first `period - 1` inputs; from the `period`-th on, the mean of
/// the last `period` values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sma {
    period: usize,
    input: String,
    output: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self> {
        check_period("sma", period)?;
        Ok(Self {
            period,
            input: DEFAULT_INPUT.to_string(),
            output: "sma".to_string(),
        })
    }

    pub fn input(mut self, field: impl Into<String>) -> Self {
        self.input = field.into();
        self
    }

    pub fn output(mut self, field: impl Into<String>) -> Self {
        self.output = field.into();
        self
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Transform for Sma {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::new(self.period)
    }

    fn apply(&self, mut tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
        let v = tick.get_field(&self.input)?;
        state.push(v);
        match state.window_mean() {
            Some(mean) if state.is_full() => {
                tick.set_field(self.output.clone(), mean);
                Ok(tick)
            }
            _ => Ok(Tick::empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Sma;
    use crate::processor::{Processor, Transform};
    use crate::Tick;

    #[test]
    fn sma_window_boundary() {
        let mut sma = Sma::new(3).unwrap().into_stage("sma3");
        let out: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0, 5.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let t = Tick::new(i as i64, 0).with_field("close", *v);
                sma.process(t).unwrap().field("sma")
            })
            .collect();
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn period_one_echoes_input() {
        let mut sma = Sma::new(1).unwrap().output("s1").into_stage("s1");
        let out = sma.process(Tick::new(0, 0).with_field("close", 7.5)).unwrap();
        assert_eq!(out.field("s1"), Some(7.5));
    }

    #[test]
    fn nan_input_ages_out_of_the_window() {
        let mut sma = Sma::new(2).unwrap().into_stage("sma2");
        let out: Vec<Option<f64>> = [f64::NAN, 1.0, 1.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let t = Tick::new(i as i64, 0).with_field("close", *v);
                sma.process(t).unwrap().field("sma")
            })
            .collect();
        assert_eq!(out[0], None);
        assert!(out[1].is_some_and(f64::is_nan));
        assert_eq!(&out[2..], &[Some(1.0), Some(1.0)]);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(Sma::new(0).is_err());
    }
}
