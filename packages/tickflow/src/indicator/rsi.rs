use super::{check_period, DEFAULT_INPUT};
use crate::error::Result;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

const PREV: &str = "prev";
const DIFFS: &str = "diffs";
const SUM_GAIN: &str = "sum_gain";
const SUM_LOSS: &str = "sum_loss";
const AVG_GAIN: &str = "avg_gain";
const AVG_LOSS: &str = "avg_loss";

/// Relative strength index with Wilder smoothing.
///
/// The first value appears once `period` price changes have been seen (`period + 1`
/// ticks), seeded from the plain average gain/loss; later values smooth with
/// `(prev * (period - 1) + x) / period`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsi {
    period: usize,
    input: String,
    output: String,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self> {
        check_period("rsi", period)?;
        Ok(Self {
            period,
            input: DEFAULT_INPUT.to_string(),
            output: "rsi".to_string(),
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

    fn rsi_from(avg_gain: f64, avg_loss: f64) -> f64 {
        if avg_gain == 0.0 && avg_loss == 0.0 {
            return 50.0;
        }
        if avg_loss == 0.0 {
            return 100.0;
        }
        let rs = avg_gain / avg_loss;
        100.0 - (100.0 / (1.0 + rs))
    }
}

impl Transform for Rsi {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::stateless()
    }

    fn apply(&self, mut tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
        let close = tick.get_field(&self.input)?;
        let Some(prev) = state.aux(PREV) else {
            state.set_aux(PREV, close);
            return Ok(Tick::empty());
        };
        state.set_aux(PREV, close);

        let change = close - prev;
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        let n = self.period as f64;
        let diffs = state.aux(DIFFS).unwrap_or(0.0) + 1.0;
        state.set_aux(DIFFS, diffs);

        let (ag, al) = if diffs <= n {
            let sg = state.aux(SUM_GAIN).unwrap_or(0.0) + gain;
            let sl = state.aux(SUM_LOSS).unwrap_or(0.0) + loss;
            state.set_aux(SUM_GAIN, sg);
            state.set_aux(SUM_LOSS, sl);
            if diffs < n {
                return Ok(Tick::empty());
            }
            (sg / n, sl / n)
        } else {
            let pg = state.aux(AVG_GAIN).unwrap_or(0.0);
            let pl = state.aux(AVG_LOSS).unwrap_or(0.0);
            ((pg * (n - 1.0) + gain) / n, (pl * (n - 1.0) + loss) / n)
        };
        state.set_aux(AVG_GAIN, ag);
        state.set_aux(AVG_LOSS, al);

        tick.set_field(self.output.clone(), Self::rsi_from(ag, al));
        Ok(tick)
    }
}
