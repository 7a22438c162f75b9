use crate::error::Result;
use crate::processor::Processor;
use crate::tick::Tick;

/// Ordered chain of processors driven as one.
///
/// A tick threads through every stage in order; the first empty result stops it, so later
/// stages never see that input. Stages may read fields an earlier stage wrote on the same
/// tick. The pipeline has no state of its own.
pub struct Pipeline {
    name: String,
    stages: Vec<Box<dyn Processor>>,
}

impl core::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    pub fn builder(name: impl Into<String>) -> PipelineBuilder {
        PipelineBuilder {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Threads `tick` through `stages[from..]`.
    fn run_from(&mut self, from: usize, tick: Tick) -> Result<Tick> {
        let mut cur = tick;
        for stage in &mut self.stages[from..] {
            cur = stage.process(cur)?;
            if cur.is_empty() {
                break;
            }
        }
        Ok(cur)
    }
}

impl Processor for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, tick: Tick) -> Result<Tick> {
        self.run_from(0, tick).map_err(|e| e.within(&self.name))
    }

    fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Each stage's flushed ticks run through the stages after it before the next stage is
    /// flushed.
    fn flush(&mut self) -> Result<Vec<Tick>> {
        let mut out = Vec::new();
        for i in 0..self.stages.len() {
            let flushed = self.stages[i].flush().map_err(|e| e.within(&self.name))?;
            for tick in flushed {
                let tick = self
                    .run_from(i + 1, tick)
                    .map_err(|e| e.within(&self.name))?;
                if !tick.is_empty() {
                    out.push(tick);
                }
            }
        }
        Ok(out)
    }
}

/// Append-only builder; stage order is fixed once built.
pub struct PipelineBuilder {
    name: String,
    stages: Vec<Box<dyn Processor>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Processor + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn boxed(mut self, stage: Box<dyn Processor>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Pipeline {
        Pipeline {
            name: self.name,
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Pipeline;
    use crate::indicator::{BinaryOp, Sma};
    use crate::processor::{Processor, ProcessorExt, Transform};
    use crate::{EngineError, Series, Tick};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts calls and passes the tick through.
    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    impl Processor for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn process(&mut self, tick: Tick) -> crate::Result<Tick> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(tick)
        }

        fn reset(&mut self) {}
    }

    fn closes(values: &[f64]) -> Series {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Tick::new(i as i64, 0).with_field("close", *v))
            .collect()
    }

    #[test]
    fn empty_stage_short_circuits_the_rest() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut p = Pipeline::builder("p")
            .stage(Sma::new(3).unwrap().into_stage("sma3"))
            .stage(Counting {
                calls: calls.clone(),
            })
            .build();

        let out = p.batch(&closes(&[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
        assert_eq!(out.values("sma"), vec![2.0, 3.0, 4.0]);
        // Only the three inputs that made it past the SMA warm-up.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn later_stage_reads_earlier_fields() {
        let mut p = Pipeline::builder("spread")
            .stage(Sma::new(2).unwrap().output("sma2").into_stage("sma2"))
            .stage(BinaryOp::sub("close", "sma2", "dev").into_stage("dev"))
            .build();
        let out = p.batch(&closes(&[1.0, 3.0, 8.0])).unwrap();
        assert_eq!(out.values("dev"), vec![1.0, 2.5]);
        assert_eq!(p.stage_names(), vec!["sma2", "dev"]);
    }

    #[test]
    fn reset_cascades_and_is_idempotent() {
        let mut p = Pipeline::builder("p")
            .stage(Sma::new(2).unwrap().into_stage("sma2"))
            .build();
        p.process(Tick::new(0, 0).with_field("close", 100.0)).unwrap();
        p.reset();
        p.reset();
        assert!(p.process(Tick::new(1, 0).with_field("close", 1.0)).unwrap().is_empty());
        let out = p.process(Tick::new(2, 0).with_field("close", 3.0)).unwrap();
        assert_eq!(out.field("sma"), Some(2.0));
    }

    #[test]
    fn errors_name_pipeline_and_stage() {
        let mut p = Pipeline::builder("trend")
            .stage(Sma::new(2).unwrap().input("price").into_stage("sma2"))
            .build();
        match p.batch(&closes(&[1.0])) {
            Err(EngineError::MissingField { stage, field }) => {
                assert_eq!(stage, "trend/sma2");
                assert_eq!(field, "price");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn empty_pipeline_passes_through() {
        let mut p = Pipeline::builder("noop").build();
        assert!(p.is_empty());
        let t = Tick::new(1, 0).with_field("close", 1.0);
        assert_eq!(p.process(t.clone()).unwrap(), t);
    }
}
