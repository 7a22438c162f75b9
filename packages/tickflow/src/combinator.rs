//! Fan-out/merge and predicate-gated composition, built only from [`Processor`].

use crate::error::Result;
use crate::processor::Processor;
use crate::tick::Tick;
use serde::{Deserialize, Serialize};

/// Runs every member against its own clone of the input and merges the results.
///
/// The merge starts from a clone of the input and overlays each non-empty member result in
/// member order, so on a field-name collision the last member wins. If every member
/// returns empty, so does the parallel.
pub struct Parallel {
    name: String,
    members: Vec<Box<dyn Processor>>,
}

impl core::fmt::Debug for Parallel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let members: Vec<&str> = self.members.iter().map(|m| m.name()).collect();
        f.debug_struct("Parallel")
            .field("name", &self.name)
            .field("members", &members)
            .finish()
    }
}

impl Parallel {
    pub fn new(name: impl Into<String>, members: Vec<Box<dyn Processor>>) -> Self {
        Self {
            name: name.into(),
            members,
        }
    }

    pub fn builder(name: impl Into<String>) -> ParallelBuilder {
        ParallelBuilder {
            inner: Parallel::new(name, Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Processor for Parallel {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, tick: Tick) -> Result<Tick> {
        let mut merged = tick.clone();
        let mut any = false;
        for member in &mut self.members {
            let out = member
                .process(tick.clone())
                .map_err(|e| e.within(&self.name))?;
            if !out.is_empty() {
                merged.merge_from(&out);
                any = true;
            }
        }
        Ok(if any { merged } else { Tick::empty() })
    }

    fn reset(&mut self) {
        for member in &mut self.members {
            member.reset();
        }
    }

    /// Member flushes, concatenated in member order.
    fn flush(&mut self) -> Result<Vec<Tick>> {
        let mut out = Vec::new();
        for member in &mut self.members {
            out.extend(member.flush().map_err(|e| e.within(&self.name))?);
        }
        Ok(out)
    }
}

pub struct ParallelBuilder {
    inner: Parallel,
}

impl ParallelBuilder {
    pub fn member(mut self, member: impl Processor + 'static) -> Self {
        self.inner.members.push(Box::new(member));
        self
    }

    pub fn build(self) -> Parallel {
        self.inner
    }
}

/// Predicate-gated delegation: matching ticks go to the inner processor, others pass
/// through unchanged (skip, not abort).
///
/// The inner processor's state only advances on matching ticks.
pub struct Conditional {
    name: String,
    predicate: Box<dyn Fn(&Tick) -> bool + Send + Sync>,
    inner: Box<dyn Processor>,
}

impl core::fmt::Debug for Conditional {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Conditional")
            .field("name", &self.name)
            .field("inner", &self.inner.name())
            .finish_non_exhaustive()
    }
}

impl Conditional {
    pub fn new<F>(name: impl Into<String>, predicate: F, inner: impl Processor + 'static) -> Self
    where
        F: Fn(&Tick) -> bool + Send + Sync + 'static,
    {
        Self::boxed(name, predicate, Box::new(inner))
    }

    pub fn boxed<F>(name: impl Into<String>, predicate: F, inner: Box<dyn Processor>) -> Self
    where
        F: Fn(&Tick) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            inner,
        }
    }
}

impl Processor for Conditional {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, tick: Tick) -> Result<Tick> {
        if (self.predicate)(&tick) {
            self.inner.process(tick).map_err(|e| e.within(&self.name))
        } else {
            Ok(tick)
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn flush(&mut self) -> Result<Vec<Tick>> {
        self.inner.flush().map_err(|e| e.within(&self.name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// `field <op> value`, the predicate form config-built conditionals use.
///
/// A tick without the field, or a NaN on either side, does not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldPredicate {
    pub field: String,
    pub op: CmpOp,
    pub value: f64,
}

impl FieldPredicate {
    pub fn new(field: impl Into<String>, op: CmpOp, value: f64) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn matches(&self, tick: &Tick) -> bool {
        let Some(lv) = tick.field(&self.field) else {
            return false;
        };
        if lv.is_nan() || self.value.is_nan() {
            return false;
        }
        match self.op {
            CmpOp::Lt => lv < self.value,
            CmpOp::Le => lv <= self.value,
            CmpOp::Gt => lv > self.value,
            CmpOp::Ge => lv >= self.value,
            CmpOp::Eq => lv == self.value,
            CmpOp::Ne => lv != self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicator::{MapField, Sma};
    use crate::processor::{ProcessorExt, Transform};
    use crate::{EngineError, Pipeline, Series};

    fn set(field: &'static str, v: f64) -> impl Processor {
        MapField::new("close", field, move |_| v).into_stage(field)
    }

    fn tick(close: f64) -> Tick {
        Tick::new(0, 0).with_field("close", close)
    }

    #[test]
    fn last_member_wins_on_collision() {
        let mut p = Parallel::builder("fan")
            .member(
                Pipeline::builder("a")
                    .stage(set("x", 1.0))
                    .stage(set("only_a", 7.0))
                    .build(),
            )
            .member(Pipeline::builder("b").stage(set("x", 2.0)).build())
            .build();
        let out = p.process(tick(10.0)).unwrap();
        assert_eq!(out.field("x"), Some(2.0));
        assert_eq!(out.field("only_a"), Some(7.0));
        assert_eq!(out.field("close"), Some(10.0));
    }

    #[test]
    fn members_do_not_see_each_other() {
        // `b` would fail if it saw `a`'s write to close.
        let mut p = Parallel::builder("fan")
            .member(MapField::new("close", "close", |v| v * 100.0).into_stage("a"))
            .member(MapField::new("close", "seen", |v| v).into_stage("b"))
            .build();
        let out = p.process(tick(3.0)).unwrap();
        assert_eq!(out.field("seen"), Some(3.0));
        assert_eq!(out.field("close"), Some(300.0));
    }

    #[test]
    fn all_empty_is_empty_and_partial_is_merged() {
        let mut p = Parallel::builder("fan")
            .member(Sma::new(2).unwrap().output("sma2").into_stage("sma2"))
            .member(Sma::new(3).unwrap().output("sma3").into_stage("sma3"))
            .build();
        let series: Series = [1.0, 2.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, v)| Tick::new(i as i64, 0).with_field("close", *v))
            .collect();
        let out = p.batch(&series).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(0).unwrap().field("sma2"), Some(1.5));
        assert!(!out.get(0).unwrap().has_field("sma3"));
        assert_eq!(out.get(1).unwrap().field("sma3"), Some(2.0));
    }

    #[test]
    fn conditional_skips_or_delegates() {
        let mut never = Conditional::new("never", |_| false, set("x", 1.0));
        let input = tick(5.0);
        assert_eq!(never.process(input.clone()).unwrap(), input);

        let mut always = Conditional::new("always", |_| true, set("x", 1.0));
        let mut direct = set("x", 1.0);
        assert_eq!(
            always.process(input.clone()).unwrap(),
            direct.process(input).unwrap()
        );
    }

    #[test]
    fn conditional_pass_through_is_not_empty() {
        // The inner SMA would return empty during warm-up; a failed predicate never does.
        let mut c = Conditional::new(
            "big",
            |t: &Tick| t.field("close").is_some_and(|v| v > 100.0),
            Sma::new(5).unwrap().into_stage("sma5"),
        );
        assert!(!c.process(tick(1.0)).unwrap().is_empty());
        assert!(c.process(tick(101.0)).unwrap().is_empty());
    }

    #[test]
    fn conditional_errors_are_scoped() {
        let mut c = Conditional::new(
            "gate",
            |_| true,
            Sma::new(2).unwrap().input("price").into_stage("sma"),
        );
        match c.process(tick(1.0)) {
            Err(EngineError::MissingField { stage, .. }) => assert_eq!(stage, "gate/sma"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn field_predicate() {
        let p = FieldPredicate::new("close", CmpOp::Ge, 10.0);
        assert!(p.matches(&tick(10.0)));
        assert!(!p.matches(&tick(9.0)));
        assert!(!p.matches(&tick(f64::NAN)));
        assert!(!p.matches(&Tick::new(0, 0).with_field("open", 50.0)));
        let parsed: FieldPredicate =
            serde_json::from_str(r#"{"field":"rsi","op":"lt","value":30}"#).unwrap();
        assert_eq!(parsed.op, CmpOp::Lt);
    }
}
