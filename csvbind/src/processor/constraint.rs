//! Value checks.
//!
//! A constraint either passes its input through unchanged or rejects it.
//! Only [`Constraint::Require`] looks at null values; every other check
//! accepts null.

use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

use super::format::TextFormatter;
use super::{RowContext, Step, Variables, Violation};
use crate::directive::{kinds, Directive, KindId};
use crate::error::ConfigError;
use crate::models::CellValue;

/// A parsed bound together with the text it was declared as.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: CellValue,
    pub text: String,
}

#[derive(Debug, Clone)]
pub enum Constraint {
    Require {
        consider_empty: bool,
        consider_blank: bool,
    },
    Equals {
        values: Vec<CellValue>,
    },
    Pattern {
        regex: Regex,
        source: String,
    },
    Length {
        min: Option<usize>,
        max: Option<usize>,
    },
    LengthExact {
        length: usize,
    },
    Range {
        min: Option<Bound>,
        max: Option<Bound>,
        inclusive: bool,
    },
    WordForbid {
        words: Vec<String>,
    },
    WordRequire {
        words: Vec<String>,
    },
}

fn parse_bound(
    d: &Directive,
    name: &str,
    formatter: &dyn TextFormatter,
) -> Result<Bound, ConfigError> {
    let text = d.scalar_text_attr(name)?;
    let value = formatter
        .parse(&text)
        .map_err(|e| d.invalid(name, format!("'{}': {}", text, e)))?;
    Ok(Bound { value, text })
}

impl Constraint {
    /// Implicit presence check for required fields without a `Require` directive.
    pub fn required() -> Self {
        Constraint::Require {
            consider_empty: true,
            consider_blank: false,
        }
    }

    /// Build the constraint for a normalized directive.
    ///
    /// Bounds and candidate values are parsed with the column's formatter,
    /// so a `NumberRange` on a date-formatted column is rejected here.
    pub fn from_directive(
        d: &Directive,
        formatter: &dyn TextFormatter,
    ) -> Result<Self, ConfigError> {
        let kind = d.kind();
        let constraint = if *kind == kinds::REQUIRE {
            Constraint::Require {
                consider_empty: d.bool_attr("consider_empty")?,
                consider_blank: d.bool_attr("consider_blank")?,
            }
        } else if *kind == kinds::EQUALS {
            let values = d
                .list_attr("values")?
                .iter()
                .map(|text| {
                    formatter
                        .parse(text)
                        .map_err(|e| d.invalid("values", format!("'{}': {}", text, e)))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Constraint::Equals { values }
        } else if *kind == kinds::PATTERN {
            let source = d.text_attr("regex")?.to_string();
            let regex = Regex::new(&format!("^(?:{})$", source))
                .map_err(|e| d.invalid("regex", e.to_string()))?;
            Constraint::Pattern { regex, source }
        } else if *kind == kinds::LENGTH_MIN {
            Constraint::Length {
                min: Some(d.size_attr("min")?),
                max: None,
            }
        } else if *kind == kinds::LENGTH_MAX {
            Constraint::Length {
                min: None,
                max: Some(d.size_attr("max")?),
            }
        } else if *kind == kinds::LENGTH_BETWEEN {
            let (min, max) = (d.size_attr("min")?, d.size_attr("max")?);
            if min > max {
                return Err(d.invalid("min", format!("{} is greater than max {}", min, max)));
            }
            Constraint::Length {
                min: Some(min),
                max: Some(max),
            }
        } else if *kind == kinds::LENGTH_EXACT {
            Constraint::LengthExact {
                length: d.size_attr("length")?,
            }
        } else if *kind == kinds::NUMBER_MIN || *kind == kinds::DATE_TIME_MIN {
            Constraint::Range {
                min: Some(parse_bound(d, "min", formatter)?),
                max: None,
                inclusive: d.bool_attr("inclusive")?,
            }
        } else if *kind == kinds::NUMBER_MAX || *kind == kinds::DATE_TIME_MAX {
            Constraint::Range {
                min: None,
                max: Some(parse_bound(d, "max", formatter)?),
                inclusive: d.bool_attr("inclusive")?,
            }
        } else if *kind == kinds::NUMBER_RANGE || *kind == kinds::DATE_TIME_RANGE {
            let min = parse_bound(d, "min", formatter)?;
            let max = parse_bound(d, "max", formatter)?;
            if min.value.compare(&max.value) == Some(Ordering::Greater) {
                return Err(d.invalid(
                    "min",
                    format!("{} is greater than max {}", min.text, max.text),
                ));
            }
            Constraint::Range {
                min: Some(min),
                max: Some(max),
                inclusive: d.bool_attr("inclusive")?,
            }
        } else if *kind == kinds::WORD_FORBID {
            Constraint::WordForbid {
                words: d.list_attr("words")?,
            }
        } else if *kind == kinds::WORD_REQUIRE {
            Constraint::WordRequire {
                words: d.list_attr("words")?,
            }
        } else {
            return Err(ConfigError::UnregisteredKind(kind.clone()));
        };
        Ok(constraint)
    }

    /// Check a value, returning the message variables on rejection.
    pub fn check(&self, value: &CellValue) -> Result<(), Variables> {
        if let Constraint::Require {
            consider_empty,
            consider_blank,
        } = self
        {
            let missing = match value {
                CellValue::Null => true,
                CellValue::Text(s) => {
                    (*consider_empty && s.is_empty()) || (*consider_blank && s.trim().is_empty())
                }
                _ => false,
            };
            if !missing {
                return Ok(());
            }
            let mut vars = Variables::new();
            vars.insert("consider_empty".to_string(), (*consider_empty).into());
            vars.insert("consider_blank".to_string(), (*consider_blank).into());
            return Err(vars);
        }

        if value.is_null() {
            return Ok(());
        }

        let mut vars = Variables::new();
        let passed = match self {
            Constraint::Require { .. } => true,
            Constraint::Equals { values } => {
                let shown: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                vars.insert("values".into(), Value::from(shown.join(", ")));
                values
                    .iter()
                    .any(|v| v == value || v.compare(value) == Some(Ordering::Equal))
            }
            Constraint::Pattern { regex, source } => {
                vars.insert("regex".into(), Value::from(source.clone()));
                regex.is_match(&value.to_string())
            }
            Constraint::Length { min, max } => {
                let length = value.char_len().unwrap_or(0);
                vars.insert("length".into(), Value::from(length));
                if let Some(min) = min {
                    vars.insert("min".into(), Value::from(*min));
                }
                if let Some(max) = max {
                    vars.insert("max".into(), Value::from(*max));
                }
                min.map_or(true, |m| length >= m) && max.map_or(true, |m| length <= m)
            }
            Constraint::LengthExact { length } => {
                let actual = value.char_len().unwrap_or(0);
                vars.insert("length".into(), Value::from(actual));
                vars.insert("expected".into(), Value::from(*length));
                actual == *length
            }
            Constraint::Range {
                min,
                max,
                inclusive,
            } => {
                vars.insert("inclusive".into(), Value::from(*inclusive));
                let above = min.as_ref().map_or(true, |b| {
                    vars.insert("min".into(), Value::from(b.text.clone()));
                    match value.compare(&b.value) {
                        Some(Ordering::Greater) => true,
                        Some(Ordering::Equal) => *inclusive,
                        _ => false,
                    }
                });
                let below = max.as_ref().map_or(true, |b| {
                    vars.insert("max".into(), Value::from(b.text.clone()));
                    match value.compare(&b.value) {
                        Some(Ordering::Less) => true,
                        Some(Ordering::Equal) => *inclusive,
                        _ => false,
                    }
                });
                above && below
            }
            Constraint::WordForbid { words } => {
                let text = value.to_string();
                let found: Vec<&str> = words
                    .iter()
                    .filter(|w| text.contains(w.as_str()))
                    .map(String::as_str)
                    .collect();
                vars.insert("words".into(), Value::from(found.join(", ")));
                found.is_empty()
            }
            Constraint::WordRequire { words } => {
                let text = value.to_string();
                let missing: Vec<&str> = words
                    .iter()
                    .filter(|w| !text.contains(w.as_str()))
                    .map(String::as_str)
                    .collect();
                vars.insert("words".into(), Value::from(missing.join(", ")));
                missing.is_empty()
            }
        };

        if passed {
            Ok(())
        } else {
            Err(vars)
        }
    }
}

/// Pipeline step running one [`Constraint`].
#[derive(Debug)]
pub struct ConstraintStep {
    kind: KindId,
    constraint: Constraint,
}

impl ConstraintStep {
    pub fn new(kind: KindId, constraint: Constraint) -> Self {
        Self { kind, constraint }
    }

    pub fn from_directive(
        d: &Directive,
        formatter: &dyn TextFormatter,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(d.kind().clone(), Constraint::from_directive(d, formatter)?))
    }

    /// Presence check used when a required field declares no `Require` directive.
    pub fn implicit_require() -> Self {
        Self::new(kinds::REQUIRE, Constraint::required())
    }
}

impl Step for ConstraintStep {
    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
        match self.constraint.check(&value) {
            Ok(()) => Ok(value),
            Err(vars) => Err(Violation::new(self.kind.clone(), value).with_vars(vars)),
        }
    }

    fn describe(&self) -> String {
        match &self.constraint {
            Constraint::Range { min, max, inclusive } => {
                let min = min.as_ref().map(|b| b.text.as_str()).unwrap_or("");
                let max = max.as_ref().map(|b| b.text.as_str()).unwrap_or("");
                let op = if *inclusive { "..=" } else { ".." };
                format!("{}({}{}{})", self.kind.short_name(), min, op, max)
            }
            Constraint::Pattern { source, .. } => format!("Pattern({})", source),
            _ => self.kind.short_name().to_string(),
        }
    }
}
