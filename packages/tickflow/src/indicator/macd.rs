use super::{BinaryOp, Ema, DEFAULT_INPUT};
use crate::error::{EngineError, Result};
use crate::pipeline::Pipeline;
use crate::processor::Transform;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub input: String,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
            input: DEFAULT_INPUT.to_string(),
        }
    }
}

/// MACD as a composite pipeline:
///
/// `ema_fast, ema_slow -> macd = ema_fast - ema_slow -> macd_signal = ema(macd) -> macd_hist`.
///
/// Every stage writes onto the same tick, so the output carries all five fields.
pub fn macd(name: impl Into<String>, params: &MacdParams) -> Result<Pipeline> {
    if params.fast >= params.slow {
        return Err(EngineError::InvalidConfig(format!(
            "macd: fast period ({}) must be < slow period ({})",
            params.fast, params.slow
        )));
    }
    let input = params.input.as_str();
    Ok(Pipeline::builder(name)
        .stage(
            Ema::new(params.fast)?
                .input(input)
                .output("ema_fast")
                .into_stage("ema_fast"),
        )
        .stage(
            Ema::new(params.slow)?
                .input(input)
                .output("ema_slow")
                .into_stage("ema_slow"),
        )
        .stage(BinaryOp::sub("ema_fast", "ema_slow", "macd").into_stage("macd"))
        .stage(
            Ema::new(params.signal)?
                .input("macd")
                .output("macd_signal")
                .into_stage("signal"),
        )
        .stage(BinaryOp::sub("macd", "macd_signal", "macd_hist").into_stage("hist"))
        .build())
}
