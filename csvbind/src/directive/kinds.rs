//! Built-in directive kinds.
//!
//! Each kind has a constant [`KindId`] and a constructor returning a
//! [`Directive`] with its required attributes set. Optional attributes are
//! filled from the catalog when a model is built.

use serde_json::Value;

use super::catalog::{AttrSpec, AttrType, KindSpec};
use super::kind::{BuildCase, Category, KindId};
use super::node::{CompositeDefinition, CompositeDirective, Directive};
use crate::models::{CsvEnum, ValueType};

// =============================================================================
// Kind Identifiers
// =============================================================================

pub const REQUIRE: KindId = KindId::from_static("csvbind::constraint::Require");

pub const TRIM: KindId = KindId::from_static("csvbind::conversion::Trim");
pub const UPPER: KindId = KindId::from_static("csvbind::conversion::Upper");
pub const LOWER: KindId = KindId::from_static("csvbind::conversion::Lower");
pub const REGEX_REPLACE: KindId = KindId::from_static("csvbind::conversion::RegexReplace");
pub const WORD_REPLACE: KindId = KindId::from_static("csvbind::conversion::WordReplace");
pub const LEFT_PAD: KindId = KindId::from_static("csvbind::conversion::LeftPad");
pub const RIGHT_PAD: KindId = KindId::from_static("csvbind::conversion::RightPad");
pub const MULTI_PAD: KindId = KindId::from_static("csvbind::conversion::MultiPad");
pub const ONE_SIDE_TRIM: KindId = KindId::from_static("csvbind::conversion::OneSideTrim");
pub const TRUNCATE: KindId = KindId::from_static("csvbind::conversion::Truncate");
pub const NULL_CONVERT: KindId = KindId::from_static("csvbind::conversion::NullConvert");
pub const FIXED_SIZE: KindId = KindId::from_static("csvbind::conversion::FixedSize");

pub const EQUALS: KindId = KindId::from_static("csvbind::constraint::Equals");
pub const PATTERN: KindId = KindId::from_static("csvbind::constraint::Pattern");
pub const LENGTH_MIN: KindId = KindId::from_static("csvbind::constraint::LengthMin");
pub const LENGTH_MAX: KindId = KindId::from_static("csvbind::constraint::LengthMax");
pub const LENGTH_BETWEEN: KindId = KindId::from_static("csvbind::constraint::LengthBetween");
pub const LENGTH_EXACT: KindId = KindId::from_static("csvbind::constraint::LengthExact");
pub const NUMBER_MIN: KindId = KindId::from_static("csvbind::constraint::NumberMin");
pub const NUMBER_MAX: KindId = KindId::from_static("csvbind::constraint::NumberMax");
pub const NUMBER_RANGE: KindId = KindId::from_static("csvbind::constraint::NumberRange");
pub const DATE_TIME_MIN: KindId = KindId::from_static("csvbind::constraint::DateTimeMin");
pub const DATE_TIME_MAX: KindId = KindId::from_static("csvbind::constraint::DateTimeMax");
pub const DATE_TIME_RANGE: KindId = KindId::from_static("csvbind::constraint::DateTimeRange");
pub const WORD_FORBID: KindId = KindId::from_static("csvbind::constraint::WordForbid");
pub const WORD_REQUIRE: KindId = KindId::from_static("csvbind::constraint::WordRequire");
/// Checked across rows by readers and writers; builds no step.
pub const UNIQUE: KindId = KindId::from_static("csvbind::constraint::Unique");

pub const BOOLEAN_FORMAT: KindId = KindId::from_static("csvbind::format::BooleanFormat");
pub const NUMBER_FORMAT: KindId = KindId::from_static("csvbind::format::NumberFormat");
pub const DATE_TIME_FORMAT: KindId = KindId::from_static("csvbind::format::DateTimeFormat");
pub const ENUM_FORMAT: KindId = KindId::from_static("csvbind::format::EnumFormat");

// Steps added by the assembler rather than declared by users.
pub const DEFAULT_VALUE: KindId = KindId::from_static("csvbind::conversion::DefaultValue");
pub const PARSE: KindId = KindId::from_static("csvbind::format::Parse");
pub const PRINT: KindId = KindId::from_static("csvbind::format::Print");
pub const BIND: KindId = KindId::from_static("csvbind::format::Bind");

// =============================================================================
// Constructors
// =============================================================================

fn list<I, S>(items: I) -> Value
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
}

pub fn require() -> Directive {
    Directive::new(REQUIRE)
}

pub fn trim() -> Directive {
    Directive::new(TRIM)
}

pub fn upper() -> Directive {
    Directive::new(UPPER)
}

pub fn lower() -> Directive {
    Directive::new(LOWER)
}

pub fn regex_replace(regex: &str, replacement: &str) -> Directive {
    Directive::new(REGEX_REPLACE)
        .with_attr("regex", regex)
        .with_attr("replacement", replacement)
}

pub fn word_replace<I, S>(pairs: I) -> Directive
where
    I: IntoIterator<Item = (S, S)>,
    S: Into<String>,
{
    let (words, replacements): (Vec<String>, Vec<String>) =
        pairs.into_iter().map(|(w, r)| (w.into(), r.into())).unzip();
    Directive::new(WORD_REPLACE)
        .with_attr("words", list(words))
        .with_attr("replacements", list(replacements))
}

pub fn left_pad(size: usize) -> Directive {
    Directive::new(LEFT_PAD).with_attr("size", size)
}

pub fn right_pad(size: usize) -> Directive {
    Directive::new(RIGHT_PAD).with_attr("size", size)
}

pub fn multi_pad(size: usize) -> Directive {
    Directive::new(MULTI_PAD).with_attr("size", size)
}

pub fn one_side_trim() -> Directive {
    Directive::new(ONE_SIDE_TRIM)
}

pub fn truncate(max_size: usize) -> Directive {
    Directive::new(TRUNCATE).with_attr("max_size", max_size)
}

pub fn null_convert<I, S>(tokens: I) -> Directive
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Directive::new(NULL_CONVERT).with_attr("tokens", list(tokens))
}

pub fn fixed_size(size: usize) -> CompositeDirective {
    CompositeDirective::new(FIXED_SIZE).with_attr("size", size)
}

pub fn equals<I, S>(values: I) -> Directive
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Directive::new(EQUALS).with_attr("values", list(values))
}

pub fn pattern(regex: &str) -> Directive {
    Directive::new(PATTERN).with_attr("regex", regex)
}

pub fn length_min(min: usize) -> Directive {
    Directive::new(LENGTH_MIN).with_attr("min", min)
}

pub fn length_max(max: usize) -> Directive {
    Directive::new(LENGTH_MAX).with_attr("max", max)
}

pub fn length_between(min: usize, max: usize) -> Directive {
    Directive::new(LENGTH_BETWEEN)
        .with_attr("min", min)
        .with_attr("max", max)
}

pub fn length_exact(length: usize) -> Directive {
    Directive::new(LENGTH_EXACT).with_attr("length", length)
}

pub fn number_min(min: impl Into<Value>) -> Directive {
    Directive::new(NUMBER_MIN).with_attr("min", min)
}

pub fn number_max(max: impl Into<Value>) -> Directive {
    Directive::new(NUMBER_MAX).with_attr("max", max)
}

pub fn number_range(min: impl Into<Value>, max: impl Into<Value>) -> Directive {
    Directive::new(NUMBER_RANGE)
        .with_attr("min", min)
        .with_attr("max", max)
}

pub fn date_time_min(min: &str) -> Directive {
    Directive::new(DATE_TIME_MIN).with_attr("min", min)
}

pub fn date_time_max(max: &str) -> Directive {
    Directive::new(DATE_TIME_MAX).with_attr("max", max)
}

pub fn date_time_range(min: &str, max: &str) -> Directive {
    Directive::new(DATE_TIME_RANGE)
        .with_attr("min", min)
        .with_attr("max", max)
}

pub fn word_forbid<I, S>(words: I) -> Directive
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Directive::new(WORD_FORBID).with_attr("words", list(words))
}

pub fn word_require<I, S>(words: I) -> Directive
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Directive::new(WORD_REQUIRE).with_attr("words", list(words))
}

pub fn unique() -> Directive {
    Directive::new(UNIQUE)
}

pub fn boolean_format() -> Directive {
    Directive::new(BOOLEAN_FORMAT)
}

pub fn number_format() -> Directive {
    Directive::new(NUMBER_FORMAT)
}

pub fn date_time_format(pattern: &str) -> Directive {
    Directive::new(DATE_TIME_FORMAT).with_attr("pattern", pattern)
}

pub fn enum_format<I, S>(values: I) -> Directive
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Directive::new(ENUM_FORMAT).with_attr("values", list(values))
}

/// Enum format listing the variants of `E`, written by label.
pub fn enum_of<E: CsvEnum>() -> Directive {
    enum_format(E::variants().iter().map(|v| v.name()))
        .with_attr("labels", list(E::variants().iter().map(|v| v.label())))
}

// =============================================================================
// Catalog Entries
// =============================================================================

const TEXT: &[ValueType] = &[ValueType::Text];
const NUMBERS: &[ValueType] = &[ValueType::Integer, ValueType::Decimal];
const TEMPORAL: &[ValueType] = &[ValueType::Date, ValueType::DateTime, ValueType::Time];

fn conversion(kind: KindId, description: &str) -> KindSpec {
    KindSpec::new(kind, Category::Conversion)
        .for_types(TEXT)
        .describe(description)
}

fn constraint(kind: KindId, types: &[ValueType], description: &str) -> KindSpec {
    KindSpec::new(kind, Category::Constraint)
        .for_types(types)
        .describe(description)
}

fn inclusive() -> AttrSpec {
    AttrSpec::with_default("inclusive", AttrType::Bool, true)
}

pub(crate) fn builtin_specs() -> Vec<KindSpec> {
    use AttrType::*;

    vec![
        KindSpec::new(REQUIRE, Category::Presence)
            .attr(AttrSpec::with_default("consider_empty", Bool, true))
            .attr(AttrSpec::with_default("consider_blank", Bool, false))
            .describe("Reject missing values"),
        conversion(TRIM, "Remove surrounding whitespace"),
        conversion(UPPER, "Convert to uppercase"),
        conversion(LOWER, "Convert to lowercase"),
        conversion(REGEX_REPLACE, "Regex replacement")
            .attr(AttrSpec::required("regex", Text))
            .attr(AttrSpec::required("replacement", Text))
            .attr(AttrSpec::with_default("partial", Bool, false)),
        conversion(WORD_REPLACE, "Replace listed words")
            .attr(AttrSpec::required("words", TextList))
            .attr(AttrSpec::required("replacements", TextList)),
        conversion(LEFT_PAD, "Pad on the left up to a size")
            .attr(AttrSpec::required("size", Integer))
            .attr(AttrSpec::with_default("pad_char", Char, " ")),
        conversion(RIGHT_PAD, "Pad on the right up to a size")
            .attr(AttrSpec::required("size", Integer))
            .attr(AttrSpec::with_default("pad_char", Char, " ")),
        conversion(MULTI_PAD, "Pad or chop to an exact size")
            .attr(AttrSpec::required("size", Integer))
            .attr(AttrSpec::with_default("pad_char", Char, " "))
            .attr(AttrSpec::with_default("right_align", Bool, false))
            .attr(AttrSpec::with_default("chopped", Bool, false)),
        conversion(ONE_SIDE_TRIM, "Strip a padding character from one side")
            .attr(AttrSpec::with_default("trim_char", Char, " "))
            .attr(AttrSpec::with_default("left_align", Bool, false)),
        conversion(TRUNCATE, "Cut text to a maximum size")
            .attr(AttrSpec::required("max_size", Integer))
            .attr(AttrSpec::with_default("suffix", Text, "")),
        conversion(NULL_CONVERT, "Treat listed tokens as null")
            .attr(AttrSpec::required("tokens", TextList))
            .attr(AttrSpec::with_default("ignore_case", Bool, false)),
        constraint(EQUALS, &[], "Value must be one of a list")
            .attr(AttrSpec::required("values", TextList)),
        constraint(PATTERN, TEXT, "Value must match a regex")
            .attr(AttrSpec::required("regex", Text)),
        constraint(LENGTH_MIN, TEXT, "Minimum length")
            .attr(AttrSpec::required("min", Integer)),
        constraint(LENGTH_MAX, TEXT, "Maximum length")
            .attr(AttrSpec::required("max", Integer)),
        constraint(LENGTH_BETWEEN, TEXT, "Length within bounds")
            .attr(AttrSpec::required("min", Integer))
            .attr(AttrSpec::required("max", Integer)),
        constraint(LENGTH_EXACT, TEXT, "Exact length")
            .attr(AttrSpec::required("length", Integer)),
        constraint(NUMBER_MIN, NUMBERS, "Lower numeric bound")
            .attr(AttrSpec::required("min", Scalar))
            .attr(inclusive()),
        constraint(NUMBER_MAX, NUMBERS, "Upper numeric bound")
            .attr(AttrSpec::required("max", Scalar))
            .attr(inclusive()),
        constraint(NUMBER_RANGE, NUMBERS, "Numeric bounds")
            .attr(AttrSpec::required("min", Scalar))
            .attr(AttrSpec::required("max", Scalar))
            .attr(inclusive()),
        constraint(DATE_TIME_MIN, TEMPORAL, "Earliest date or time")
            .attr(AttrSpec::required("min", Text))
            .attr(inclusive()),
        constraint(DATE_TIME_MAX, TEMPORAL, "Latest date or time")
            .attr(AttrSpec::required("max", Text))
            .attr(inclusive()),
        constraint(DATE_TIME_RANGE, TEMPORAL, "Date or time bounds")
            .attr(AttrSpec::required("min", Text))
            .attr(AttrSpec::required("max", Text))
            .attr(inclusive()),
        constraint(WORD_FORBID, TEXT, "Value must not contain listed words")
            .attr(AttrSpec::required("words", TextList)),
        constraint(WORD_REQUIRE, TEXT, "Value must contain every listed word")
            .attr(AttrSpec::required("words", TextList)),
        constraint(UNIQUE, &[], "Value must not repeat across rows"),
        KindSpec::new(BOOLEAN_FORMAT, Category::Format)
            .for_types(&[ValueType::Boolean])
            .attr(AttrSpec::with_default(
                "read_true",
                TextList,
                list(["true", "1", "yes", "on", "y", "t"]),
            ))
            .attr(AttrSpec::with_default(
                "read_false",
                TextList,
                list(["false", "0", "no", "off", "n", "f"]),
            ))
            .attr(AttrSpec::with_default("write_true", Text, "true"))
            .attr(AttrSpec::with_default("write_false", Text, "false"))
            .attr(AttrSpec::with_default("ignore_case", Bool, false))
            .attr(AttrSpec::with_default("fail_to_false", Bool, false))
            .describe("Boolean tokens"),
        KindSpec::new(NUMBER_FORMAT, Category::Format)
            .for_types(NUMBERS)
            .attr(AttrSpec::with_default("lenient", Bool, false))
            .attr(AttrSpec::optional("precision", Integer))
            .describe("Number parsing and printing"),
        KindSpec::new(DATE_TIME_FORMAT, Category::Format)
            .for_types(TEMPORAL)
            .attr(AttrSpec::required("pattern", Text))
            .describe("strftime pattern for dates and times"),
        KindSpec::new(ENUM_FORMAT, Category::Format)
            .for_types(&[ValueType::Enum])
            .attr(AttrSpec::required("values", TextList))
            .attr(AttrSpec::optional("labels", TextList))
            .attr(AttrSpec::with_default("ignore_case", Bool, false))
            .describe("Closed list of tokens"),
    ]
}

pub(crate) fn builtin_composites() -> Vec<CompositeDefinition> {
    vec![fixed_size_definition()]
}

/// Fixed-width column: padded on write, trimmed on read.
fn fixed_size_definition() -> CompositeDefinition {
    let pad = multi_pad(0).with_order(1000).on(BuildCase::Write);
    let trim = one_side_trim().on(BuildCase::Read);

    CompositeDefinition::new(FIXED_SIZE)
        .describe("Fixed-width column: pad on write, trim on read")
        .attribute(AttrSpec::required("size", AttrType::Integer))
        .attribute(AttrSpec::with_default("pad_char", AttrType::Char, " "))
        .attribute(AttrSpec::with_default("right_align", AttrType::Bool, false))
        .attribute(AttrSpec::with_default("chopped", AttrType::Bool, false))
        .component(pad)
        .component(trim)
        .link("size", 0, "size")
        .link("pad_char", 0, "pad_char")
        .link("chopped", 0, "chopped")
        .link("right_align", 0, "right_align")
        .link("pad_char", 1, "trim_char")
        .link("right_align", 1, "left_align")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_kind_names_are_unique() {
        let specs = builtin_specs();
        let names: BTreeSet<_> = specs.iter().map(|s| s.kind.clone()).collect();
        assert_eq!(names.len(), specs.len());
    }

    #[test]
    fn test_fixed_size_links_point_at_components() {
        let def = fixed_size_definition();
        for link in &def.overrides {
            assert!(link.component < def.components.len());
        }
    }

    #[test]
    fn test_word_replace_pairs() {
        let d = word_replace([("a", "b"), ("c", "d")]);
        assert_eq!(d.list_attr("words").unwrap(), vec!["a", "c"]);
        assert_eq!(d.list_attr("replacements").unwrap(), vec!["b", "d"]);
    }
}
