use super::{check_period, DEFAULT_INPUT};
use crate::error::Result;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

const LAST: &str = "ema";

/// Exponential moving average, `alpha = 2 / (period + 1)`.
///
/// Seeded with the first value, so it emits on every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ema {
    period: usize,
    alpha: f64,
    input: String,
    output: String,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self> {
        check_period("ema", period)?;
        Ok(Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            input: DEFAULT_INPUT.to_string(),
            output: "ema".to_string(),
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

impl Transform for Ema {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::stateless()
    }

    fn apply(&self, mut tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
        let price = tick.get_field(&self.input)?;
        let ema = match state.aux(LAST) {
            Some(prev) => prev + self.alpha * (price - prev),
            None => price,
        };
        state.set_aux(LAST, ema);
        tick.set_field(self.output.clone(), ema);
        Ok(tick)
    }
}
