//! Processor factories keyed by kind.
//!
//! A [`Registry`] is an ordinary value: build one, register what you need, and hand it to
//! whatever turns configs into processors. Nothing is global.

use crate::combinator::{Conditional, FieldPredicate, Parallel};
use crate::config::{PipelineConfig, StageConfig};
use crate::error::{EngineError, Result};
use crate::indicator::{macd, BinaryOp, Ema, MacdParams, Resample, Rsi, Sma, StdDev};
use crate::period::Period;
use crate::pipeline::Pipeline;
use crate::processor::{Processor, ProcessorExt, Streaming, Transform};
use crate::tick::Tick;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Builds one processor from its stage config. Receives the registry so nested kinds can
/// build their children.
pub type Factory =
    Box<dyn Fn(&Registry, &StageConfig) -> Result<Box<dyn Processor>> + Send + Sync>;

#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every processor kind this crate ships.
    pub fn with_builtins() -> Self {
        let mut reg = Self::new();
        reg.register("sma", |_, cfg| {
            let p: WindowParams = cfg.params()?;
            let mut sma = Sma::new(p.period)?;
            if let Some(input) = p.input {
                sma = sma.input(input);
            }
            if let Some(output) = p.output {
                sma = sma.output(output);
            }
            Ok(Box::new(sma.into_stage(cfg.stage_name())))
        });
        reg.register("ema", |_, cfg| {
            let p: WindowParams = cfg.params()?;
            let mut ema = Ema::new(p.period)?;
            if let Some(input) = p.input {
                ema = ema.input(input);
            }
            if let Some(output) = p.output {
                ema = ema.output(output);
            }
            Ok(Box::new(ema.into_stage(cfg.stage_name())))
        });
        reg.register("stddev", |_, cfg| {
            let p: WindowParams = cfg.params()?;
            let mut sd = StdDev::new(p.period)?;
            if let Some(input) = p.input {
                sd = sd.input(input);
            }
            if let Some(output) = p.output {
                sd = sd.output(output);
            }
            Ok(Box::new(sd.into_stage(cfg.stage_name())))
        });
        reg.register("rsi", |_, cfg| {
            let p: WindowParams = cfg.params()?;
            let mut rsi = Rsi::new(p.period)?;
            if let Some(input) = p.input {
                rsi = rsi.input(input);
            }
            if let Some(output) = p.output {
                rsi = rsi.output(output);
            }
            Ok(Box::new(rsi.into_stage(cfg.stage_name())))
        });
        reg.register("binary", |_, cfg| {
            let op: BinaryOp = cfg.params()?;
            Ok(Box::new(op.into_stage(cfg.stage_name())))
        });
        reg.register("resample", |_, cfg| {
            let p: ResampleParams = cfg.params()?;
            let mut rs = Resample::new(p.period);
            if let Some(input) = p.input {
                rs = rs.input(input);
            }
            if let Some(volume) = p.volume {
                rs = rs.volume(volume);
            }
            Ok(Box::new(rs.into_stage(cfg.stage_name())))
        });
        reg.register("macd", |_, cfg| {
            let p: MacdParams = cfg.params()?;
            Ok(Box::new(macd(cfg.stage_name(), &p)?))
        });
        reg.register("pipeline", |reg, cfg| {
            let p: PipelineParams = cfg.params()?;
            Ok(Box::new(reg.build_stages(cfg.stage_name(), &p.stages)?))
        });
        reg.register("parallel", |reg, cfg| {
            let p: ParallelParams = cfg.params()?;
            if p.branches.is_empty() {
                return Err(EngineError::InvalidConfig(format!(
                    "stage `{}`: parallel needs at least one branch",
                    cfg.stage_name()
                )));
            }
            let members = p
                .branches
                .iter()
                .map(|b| reg.build_stage(b))
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(Parallel::new(cfg.stage_name(), members)))
        });
        reg.register("conditional", |reg, cfg| {
            let p: ConditionalParams = cfg.params()?;
            let inner = reg.build_stage(&p.then)?;
            let when = p.when;
            Ok(Box::new(Conditional::boxed(
                cfg.stage_name(),
                move |t| when.matches(t),
                inner,
            )))
        });
        reg
    }

    /// Adds or replaces the factory for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn(&Registry, &StageConfig) -> Result<Box<dyn Processor>> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    pub fn build_stage(&self, cfg: &StageConfig) -> Result<Box<dyn Processor>> {
        let factory = self
            .factories
            .get(&cfg.kind)
            .ok_or_else(|| EngineError::UnknownProcessor(cfg.kind.clone()))?;
        let stage = factory(self, cfg)?;
        tracing::debug!(kind = %cfg.kind, stage = %stage.name(), "built stage");
        Ok(stage)
    }

    pub fn build_pipeline(&self, cfg: &PipelineConfig) -> Result<Pipeline> {
        self.build_stages(&cfg.name, &cfg.stages)
    }

    /// Builds the pipeline and streams it with the definition's own [`crate::StreamConfig`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn stream_pipeline(
        &self,
        cfg: &PipelineConfig,
        cancel: CancellationToken,
        input: mpsc::Receiver<Tick>,
    ) -> Result<Streaming<Pipeline>> {
        self.build_pipeline(cfg)?.stream_with(&cfg.stream, cancel, input)
    }

    fn build_stages(&self, name: &str, stages: &[StageConfig]) -> Result<Pipeline> {
        let mut builder = Pipeline::builder(name);
        for stage in stages {
            builder = builder.boxed(self.build_stage(stage)?);
        }
        Ok(builder.build())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WindowParams {
    period: usize,
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResampleParams {
    period: Period,
    #[serde(default)]
    input: Option<String>,
    #[serde(default)]
    volume: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PipelineParams {
    stages: Vec<StageConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParallelParams {
    branches: Vec<StageConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionalParams {
    when: FieldPredicate,
    then: StageConfig,
}
