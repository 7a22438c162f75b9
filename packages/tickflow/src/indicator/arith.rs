use crate::error::Result;
use crate::processor::{ProcessorState, Transform};
use crate::tick::Tick;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    #[inline]
    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }
    }
}

/// `output = left <op> right`, both read from the same tick. Stateless.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BinaryOp {
    pub left: String,
    pub right: String,
    pub output: String,
    pub op: ArithOp,
}

impl BinaryOp {
    pub fn new(
        op: ArithOp,
        left: impl Into<String>,
        right: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            output: output.into(),
            op,
        }
    }

    pub fn sub(left: impl Into<String>, right: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(ArithOp::Sub, left, right, output)
    }
}

impl Transform for BinaryOp {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::stateless()
    }

    fn apply(&self, mut tick: Tick, _state: &mut ProcessorState) -> Result<Tick> {
        let a = tick.get_field(&self.left)?;
        let b = tick.get_field(&self.right)?;
        tick.set_field(self.output.clone(), self.op.apply(a, b));
        Ok(tick)
    }
}

/// Stateless `output = f(input)`.
#[derive(Clone)]
pub struct MapField {
    input: String,
    output: String,
    f: Arc<dyn Fn(f64) -> f64 + Send + Sync>,
}

impl fmt::Debug for MapField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapField")
            .field("input", &self.input)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl MapField {
    pub fn new<F>(input: impl Into<String>, output: impl Into<String>, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync + 'static,
    {
        Self {
            input: input.into(),
            output: output.into(),
            f: Arc::new(f),
        }
    }
}

impl Transform for MapField {
    fn init_state(&self) -> ProcessorState {
        ProcessorState::stateless()
    }

    fn apply(&self, mut tick: Tick, _state: &mut ProcessorState) -> Result<Tick> {
        let v = tick.get_field(&self.input)?;
        tick.set_field(self.output.clone(), (self.f)(v));
        Ok(tick)
    }
}
