//! Tick-stream processing engine: composable stateful processors over time-series ticks.
//!
//! A [`Processor`] runs one transformation either over a finished [`Series`] (batch) or as a
//! tokio task between bounded channels (stream), with identical output for identical input.
//! [`Pipeline`], [`Parallel`] and [`Conditional`] compose processors into larger ones, and a
//! [`Registry`] builds them from serde configs.

pub mod circular;
pub mod combinator;
pub mod config;
pub mod error;
pub mod indicator;
pub mod period;
pub mod pipeline;
pub mod processor;
pub mod registry;
pub mod series;
pub mod tick;

pub use circular::RingWindow;
pub use combinator::{CmpOp, Conditional, FieldPredicate, Parallel};
pub use config::{PipelineConfig, StageConfig, StreamConfig};
pub use error::{EngineError, Result};
pub use period::Period;
pub use pipeline::{Pipeline, PipelineBuilder};
pub use processor::{feed, Processor, ProcessorExt, ProcessorState, Stage, Streaming, Transform};
pub use registry::Registry;
pub use series::Series;
pub use tick::Tick;
