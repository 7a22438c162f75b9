use super::{check_period, DEFAULT_INPUT};
use crate::error::Result;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// Population standard deviation over a fixed sliding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StdDev {
    period: usize,
    input: String,
    output: String,
}

impl StdDev {
    pub fn new(period: usize) -> Result<Self> {
        check_period("stddev", period)?;
        Ok(Self {
            period,
            input: DEFAULT_INPUT.to_string(),
            output: "stddev".to_string(),
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
}

impl Transform for StdDev {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::new(self.period)
    }

    fn apply(&self, mut tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
        let v = tick.get_field(&self.input)?;
        state.push(v);
        if !state.is_full() {
            return Ok(Tick::empty());
        }
        let window = state.window();
        let n = window.len() as f64;
        let mean = window.iter().sum::<f64>() / n;
        let var = window.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;
        tick.set_field(self.output.clone(), var.max(0.0).sqrt());
        Ok(tick)
    }
}
