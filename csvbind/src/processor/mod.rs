//! Pipeline steps and their composition.
//!
//! A [`Pipeline`] is an ordered list of [`Step`]s. Each step receives the
//! output of the previous one; the first step to reject a value stops the
//! pipeline with a [`Violation`].
//!
//! - [`conversion`] - Text rewriting steps (trim, pad, replace...)
//! - [`constraint`] - Value checks (presence, ranges, patterns...)
//! - [`format`] - Formatters plus the parse and print steps

pub mod constraint;
pub mod conversion;
pub mod format;

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::directive::KindId;
use crate::models::CellValue;

/// Message variables reported by a step.
pub type Variables = BTreeMap<String, Value>;

/// Position of the cell being processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowContext {
    /// Physical line in the input, 1-based.
    pub line: usize,
    /// Data row number, 1-based, header excluded.
    pub row: usize,
    /// Column number, 1-based.
    pub column: usize,
}

impl RowContext {
    pub fn new(line: usize, row: usize) -> Self {
        Self { line, row, column: 0 }
    }

    pub fn at_column(self, column: usize) -> Self {
        Self { column, ..self }
    }
}

/// Rejection of a value by a step.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: KindId,
    pub rejected: CellValue,
    /// Message template override carried by the rejecting directive.
    pub message: Option<String>,
    pub variables: Variables,
}

impl Violation {
    pub fn new(kind: KindId, rejected: CellValue) -> Self {
        Self {
            kind,
            rejected,
            message: None,
            variables: Variables::new(),
        }
    }

    pub fn with_var(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.variables.insert(name.to_string(), value.into());
        self
    }

    pub fn with_vars(mut self, variables: Variables) -> Self {
        self.variables.extend(variables);
        self
    }
}

/// One stage of a column pipeline.
///
/// Steps are shared between threads and must not hold per-call state.
pub trait Step: fmt::Debug + Send + Sync {
    fn kind(&self) -> &KindId;

    fn process(&self, value: CellValue, ctx: &RowContext) -> Result<CellValue, Violation>;

    /// Short human-readable form used by `describe`.
    fn describe(&self) -> String {
        self.kind().short_name().to_string()
    }
}

pub type StepRef = Arc<dyn Step>;

/// Applies a directive's message template to violations of the wrapped step.
#[derive(Debug)]
pub struct WithMessage {
    inner: StepRef,
    template: String,
}

impl WithMessage {
    pub fn wrap(inner: StepRef, template: Option<&str>) -> StepRef {
        match template {
            Some(t) => Arc::new(Self {
                inner,
                template: t.to_string(),
            }),
            None => inner,
        }
    }
}

impl Step for WithMessage {
    fn kind(&self) -> &KindId {
        self.inner.kind()
    }

    fn process(&self, value: CellValue, ctx: &RowContext) -> Result<CellValue, Violation> {
        self.inner.process(value, ctx).map_err(|mut v| {
            v.message.get_or_insert_with(|| self.template.clone());
            v
        })
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

/// Ordered chain of steps for one column and one direction.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<StepRef>,
}

impl Pipeline {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<StepRef>) -> Self {
        Self { steps }
    }

    /// Place a step in front of the existing chain.
    pub fn with_front(mut self, step: StepRef) -> Self {
        self.steps.insert(0, step);
        self
    }

    pub fn execute(&self, value: CellValue, ctx: &RowContext) -> Result<CellValue, Violation> {
        self.steps
            .iter()
            .try_fold(value, |current, step| step.process(current, ctx))
    }

    pub fn steps(&self) -> &[StepRef] {
        &self.steps
    }

    pub fn kinds(&self) -> Vec<&KindId> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    pub fn describe(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.describe()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Append(KindId, &'static str);

    impl Step for Append {
        fn kind(&self) -> &KindId {
            &self.0
        }

        fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
            Ok(CellValue::Text(format!("{}{}", value, self.1)))
        }
    }

    #[derive(Debug)]
    struct Reject(KindId);

    impl Step for Reject {
        fn kind(&self) -> &KindId {
            &self.0
        }

        fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
            Err(Violation::new(self.0.clone(), value))
        }
    }

    #[test]
    fn test_steps_run_front_to_back() {
        let pipeline = Pipeline::empty()
            .with_front(Arc::new(Append(KindId::new("t::B"), "b")))
            .with_front(Arc::new(Append(KindId::new("t::A"), "a")));
        let out = pipeline
            .execute(CellValue::Text(String::new()), &RowContext::default())
            .unwrap();
        assert_eq!(out, CellValue::Text("ab".into()));
        assert_eq!(pipeline.describe(), vec!["A", "B"]);
    }

    #[test]
    fn test_rejection_stops_pipeline() {
        let steps: Vec<StepRef> = vec![
            Arc::new(Append(KindId::new("t::A"), "a")),
            WithMessage::wrap(Arc::new(Reject(KindId::new("t::R"))), Some("custom")),
            Arc::new(Append(KindId::new("t::B"), "b")),
        ];
        let pipeline = Pipeline::from_steps(steps);
        let err = pipeline
            .execute(CellValue::Text("x".into()), &RowContext::default())
            .unwrap_err();
        assert_eq!(err.rejected, CellValue::Text("xa".into()));
        assert_eq!(err.message.as_deref(), Some("custom"));
        assert_eq!(pipeline.describe(), vec!["A", "R", "B"]);
    }
}
