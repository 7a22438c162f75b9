//! Representative processors: each is one instance of the [`crate::Transform`] contract.
//!
//! Window discipline: SMA and StdDev use a fixed sliding window (nothing until N values,
//! then the last N with the oldest dropped). EMA seeds with the first value and emits on
//! every tick, so composites built from it (MACD) never short-circuit on warm-up.

mod arith;
mod ema;
mod macd;
mod resample;
mod rsi;
mod sma;
mod stddev;

pub use arith::{ArithOp, BinaryOp, MapField};
pub use ema::Ema;
pub use macd::{macd, MacdParams};
pub use resample::Resample;
pub use rsi::Rsi;
pub use sma::Sma;
pub use stddev::StdDev;

use crate::error::{EngineError, Result};

pub(crate) const DEFAULT_INPUT: &str = "close";

pub(crate) fn check_period(kind: &str, period: usize) -> Result<()> {
    if period == 0 {
        return Err(EngineError::InvalidConfig(format!(
            "{kind}: period must be > 0"
        )));
    }
    Ok(())
}
