//! Identity of directives and the selectors attached to them.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Fully qualified directive kind name, e.g. `csvbind::constraint::NumberRange`.
///
/// Kind names take part in ordering: directives with the same `order` are
/// sorted by the lexicographic order of this name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KindId(Cow<'static, str>);

impl KindId {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment (`NumberRange` for `csvbind::constraint::NumberRange`).
    pub fn short_name(&self) -> &str {
        self.0.rsplit("::").next().unwrap_or(&self.0)
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for KindId {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

/// Direction a pipeline is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildCase {
    /// Text to typed value.
    Read,
    /// Typed value to text.
    Write,
}

impl fmt::Display for BuildCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildCase::Read => f.write_str("read"),
            BuildCase::Write => f.write_str("write"),
        }
    }
}

/// Validation group tag.
///
/// A directive without groups belongs to the default group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Group(Cow<'static, str>);

impl Group {
    pub const DEFAULT: Group = Group(Cow::Borrowed("default"));

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_default(&self) -> bool {
        self.0 == "default"
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for Group {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for Group {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

/// What a directive kind contributes to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Required-ness check, hoisted to the outermost read step.
    Presence,
    /// Text rewriting.
    Conversion,
    /// Value check that never changes the value.
    Constraint,
    /// Formatter configuration, contributes no step.
    Format,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Presence => "presence",
            Category::Conversion => "conversion",
            Category::Constraint => "constraint",
            Category::Format => "format",
        };
        f.write_str(name)
    }
}
