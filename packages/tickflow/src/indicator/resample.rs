use super::DEFAULT_INPUT;
use crate::error::Result;
use crate::period::Period;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

const OPEN_TIME: &str = "open_time";
const OPEN: &str = "open";
const HIGH: &str = "high";
const LOW: &str = "low";
const CLOSE: &str = "close";
const VOLUME: &str = "volume";
const COUNT: &str = "count";

/// Buckets ticks into fixed-width candles.
///
/// A tick's timestamp is floored to its bucket start. While ticks stay in one bucket the
/// candle accumulates and nothing is emitted; the first tick of a later bucket closes it
/// and emits a tick stamped `(open_time, period)` with `open/high/low/close/count` (and
/// `volume` when a volume field is configured). Flush emits the in-progress candle.
///
/// Input must be in non-decreasing timestamp order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resample {
    period: Period,
    input: String,
    volume: Option<String>,
}

impl Resample {
    pub fn new(period: Period) -> Self {
        Self {
            period,
            input: DEFAULT_INPUT.to_string(),
            volume: None,
        }
    }

    pub fn input(mut self, field: impl Into<String>) -> Self {
        self.input = field.into();
        self
    }

    /// Sums this field into the candle's `volume`.
    pub fn volume(mut self, field: impl Into<String>) -> Self {
        self.volume = Some(field.into());
        self
    }

    fn open_candle(&self, state: &mut ProcessorState, open_time: i64, price: f64, vol: f64) {
        state.set_aux(OPEN_TIME, open_time as f64);
        state.set_aux(OPEN, price);
        state.set_aux(HIGH, price);
        state.set_aux(LOW, price);
        state.set_aux(CLOSE, price);
        state.set_aux(VOLUME, vol);
        state.set_aux(COUNT, 1.0);
    }

    fn merge(&self, state: &mut ProcessorState, price: f64, vol: f64) {
        let high = state.aux(HIGH).map_or(price, |h| h.max(price));
        let low = state.aux(LOW).map_or(price, |l| l.min(price));
        state.set_aux(HIGH, high);
        state.set_aux(LOW, low);
        state.set_aux(CLOSE, price);
        state.set_aux(VOLUME, state.aux(VOLUME).unwrap_or(0.0) + vol);
        state.set_aux(COUNT, state.aux(COUNT).unwrap_or(0.0) + 1.0);
    }

    /// Takes the in-progress candle out of `state`.
    fn close_candle(&self, state: &mut ProcessorState) -> Option<Tick> {
        let open_time = state.take_aux(OPEN_TIME)? as i64;
        let mut candle = Tick::new(open_time, self.period.as_ms());
        for key in [OPEN, HIGH, LOW, CLOSE, COUNT] {
            if let Some(v) = state.take_aux(key) {
                candle.set_field(key, v);
            }
        }
        let volume = state.take_aux(VOLUME);
        if self.volume.is_some() {
            candle.set_field(VOLUME, volume.unwrap_or(0.0));
        }
        Some(candle)
    }
}

impl Transform for Resample {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::stateless()
    }

    fn apply(&self, tick: Tick, state: &mut ProcessorState) -> Result<Tick> {
        let price = tick.get_field(&self.input)?;
        let vol = match &self.volume {
            Some(field) => tick.get_field(field)?,
            None => 0.0,
        };
        let open_time = self.period.bucket_start(tick.timestamp);

        match state.aux(OPEN_TIME) {
            None => {
                self.open_candle(state, open_time, price, vol);
                Ok(Tick::empty())
            }
            Some(cur) if cur as i64 == open_time => {
                self.merge(state, price, vol);
                Ok(Tick::empty())
            }
            Some(_) => {
                let closed = self.close_candle(state).unwrap_or_default();
                self.open_candle(state, open_time, price, vol);
                Ok(closed)
            }
        }
    }

    fn finish(&self, state: &mut ProcessorState) -> Result<Vec<Tick>> {
        Ok(self.close_candle(state).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::Resample;
    use crate::period::Period;
    use crate::processor::{ProcessorExt, Transform};
    use crate::{Series, Tick};

    fn trade(ts: i64, price: f64, qty: f64) -> Tick {
        Tick::new(ts, 0).with_field("price", price).with_field("qty", qty)
    }

    #[test]
    fn closes_on_bucket_switch_and_flushes_last() {
        let pms = 15 * 60_000;
        let series = Series::from_ticks(
            "trades",
            vec![
                trade(0, 1.0, 1.0),
                trade(1, 3.0, 2.0),
                trade(2, 0.5, 0.5),
                trade(pms, 10.0, 1.0),
                trade(pms + 5, 9.5, 1.0),
            ],
        );
        let mut stage = Resample::new(Period::parse("15m").unwrap())
            .input("price")
            .volume("qty")
            .into_stage("15m");
        let out = stage.batch(&series).unwrap();
        assert_eq!(out.timestamps(), vec![0, pms]);

        let first = out.get(0).unwrap();
        assert_eq!(first.duration, pms);
        assert_eq!(first.field("open"), Some(1.0));
        assert_eq!(first.field("high"), Some(3.0));
        assert_eq!(first.field("low"), Some(0.5));
        assert_eq!(first.field("close"), Some(0.5));
        assert_eq!(first.field("count"), Some(3.0));
        assert!((first.field("volume").unwrap() - 3.5).abs() < 1e-12);

        // Flushed candle.
        let last = out.get(1).unwrap();
        assert_eq!(last.field("close"), Some(9.5));
        assert_eq!(last.field("count"), Some(2.0));
    }

    #[test]
    fn no_volume_field_unless_configured() {
        let series = Series::from_ticks("t", vec![trade(0, 1.0, 1.0)]);
        let out = Resample::new(Period::from_ms(1_000).unwrap())
            .input("price")
            .into_stage("1s")
            .batch(&series)
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(!out.get(0).unwrap().has_field("volume"));
    }
}
