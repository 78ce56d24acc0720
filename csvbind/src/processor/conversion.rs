//! Text conversions.
//!
//! Conversions rewrite text values and pass every other value through
//! untouched. They never reject a value.

use regex::Regex;
use std::collections::HashSet;

use super::{RowContext, Step, Violation};
use crate::directive::{kinds, BuildCase, Directive, KindId};
use crate::error::ConfigError;
use crate::models::CellValue;

/// All built-in conversions, configured from a directive's attributes.
#[derive(Debug, Clone)]
pub enum Conversion {
    /// Remove leading and trailing whitespace
    Trim,

    /// Convert to uppercase
    Upper,

    /// Convert to lowercase
    Lower,

    /// Replace regex matches; without `partial` the whole text must match
    RegexReplace {
        regex: Regex,
        full: Option<Regex>,
        replacement: String,
    },

    /// Replace whole occurrences of listed words, longest first
    WordReplace { pairs: Vec<(String, String)> },

    /// Pad at start up to `size` characters
    LeftPad { size: usize, pad: char },

    /// Pad at end up to `size` characters
    RightPad { size: usize, pad: char },

    /// Pad to exactly `size` characters, optionally chopping longer text
    MultiPad(PadLayout),

    /// Strip a padding character from one side
    OneSideTrim { trim_char: char, left_align: bool },

    /// Keep at most `max_size` characters, then append `suffix`
    Truncate { max_size: usize, suffix: String },

    /// Listed tokens become null
    NullConvert {
        tokens: HashSet<String>,
        ignore_case: bool,
    },
}

impl Conversion {
    /// Build the conversion for a normalized directive.
    pub fn from_directive(d: &Directive) -> Result<Self, ConfigError> {
        let kind = d.kind();
        let conversion = if *kind == kinds::TRIM {
            Conversion::Trim
        } else if *kind == kinds::UPPER {
            Conversion::Upper
        } else if *kind == kinds::LOWER {
            Conversion::Lower
        } else if *kind == kinds::REGEX_REPLACE {
            let pattern = d.text_attr("regex")?;
            let regex = Regex::new(pattern).map_err(|e| d.invalid("regex", e.to_string()))?;
            let full = if d.bool_attr("partial")? {
                None
            } else {
                let anchored = format!("^(?:{})$", pattern);
                Some(Regex::new(&anchored).map_err(|e| d.invalid("regex", e.to_string()))?)
            };
            Conversion::RegexReplace {
                regex,
                full,
                replacement: d.text_attr("replacement")?.to_string(),
            }
        } else if *kind == kinds::WORD_REPLACE {
            let words = d.list_attr("words")?;
            let replacements = d.list_attr("replacements")?;
            if words.len() != replacements.len() {
                return Err(d.invalid(
                    "replacements",
                    format!("{} words but {} replacements", words.len(), replacements.len()),
                ));
            }
            let mut pairs: Vec<(String, String)> = words.into_iter().zip(replacements).collect();
            pairs.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
            Conversion::WordReplace { pairs }
        } else if *kind == kinds::LEFT_PAD || *kind == kinds::RIGHT_PAD {
            let size = positive_size(d, "size")?;
            let pad = d.char_attr("pad_char")?;
            if *kind == kinds::LEFT_PAD {
                Conversion::LeftPad { size, pad }
            } else {
                Conversion::RightPad { size, pad }
            }
        } else if *kind == kinds::MULTI_PAD {
            Conversion::MultiPad(PadLayout::from_directive(d)?)
        } else if *kind == kinds::ONE_SIDE_TRIM {
            Conversion::OneSideTrim {
                trim_char: d.char_attr("trim_char")?,
                left_align: d.bool_attr("left_align")?,
            }
        } else if *kind == kinds::TRUNCATE {
            Conversion::Truncate {
                max_size: positive_size(d, "max_size")?,
                suffix: d.text_attr("suffix")?.to_string(),
            }
        } else if *kind == kinds::NULL_CONVERT {
            let ignore_case = d.bool_attr("ignore_case")?;
            let tokens = d.list_attr("tokens")?;
            if tokens.is_empty() {
                return Err(d.invalid("tokens", "should not be empty"));
            }
            let tokens = tokens
                .into_iter()
                .map(|t| if ignore_case { t.to_lowercase() } else { t })
                .collect();
            Conversion::NullConvert { tokens, ignore_case }
        } else {
            return Err(ConfigError::UnregisteredKind(kind.clone()));
        };
        Ok(conversion)
    }

    /// Apply this conversion to a value.
    pub fn apply(&self, value: CellValue) -> CellValue {
        match (self, value) {
            (Conversion::MultiPad(_), CellValue::Null) => self.apply_text(""),
            (_, CellValue::Text(text)) => self.apply_text(&text),
            (_, other) => other,
        }
    }

    fn apply_text(&self, text: &str) -> CellValue {
        match self {
            Conversion::Trim => CellValue::Text(text.trim().to_string()),
            Conversion::Upper => CellValue::Text(text.to_uppercase()),
            Conversion::Lower => CellValue::Text(text.to_lowercase()),
            Conversion::RegexReplace {
                regex,
                full,
                replacement,
            } => Self::apply_regex_replace(text, regex, full.as_ref(), replacement),
            Conversion::WordReplace { pairs } => Self::apply_word_replace(text, pairs),
            Conversion::LeftPad { size, pad } => {
                CellValue::Text(Self::pad(text, *size, *pad, true))
            }
            Conversion::RightPad { size, pad } => {
                CellValue::Text(Self::pad(text, *size, *pad, false))
            }
            Conversion::MultiPad(layout) => CellValue::Text(layout.apply(text)),
            Conversion::OneSideTrim {
                trim_char,
                left_align,
            } => Self::apply_one_side_trim(text, *trim_char, *left_align),
            Conversion::Truncate { max_size, suffix } => {
                Self::apply_truncate(text, *max_size, suffix)
            }
            Conversion::NullConvert {
                tokens,
                ignore_case,
            } => {
                let key = if *ignore_case {
                    text.to_lowercase()
                } else {
                    text.to_string()
                };
                if tokens.contains(&key) {
                    CellValue::Null
                } else {
                    CellValue::Text(text.to_string())
                }
            }
        }
    }

    fn apply_regex_replace(
        text: &str,
        regex: &Regex,
        full: Option<&Regex>,
        replacement: &str,
    ) -> CellValue {
        let matched = match full {
            Some(anchored) => anchored.is_match(text),
            None => regex.is_match(text),
        };
        if matched {
            CellValue::Text(regex.replace_all(text, replacement).to_string())
        } else {
            CellValue::Text(text.to_string())
        }
    }

    fn apply_word_replace(text: &str, pairs: &[(String, String)]) -> CellValue {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        'outer: while !rest.is_empty() {
            for (word, replacement) in pairs {
                if !word.is_empty() && rest.starts_with(word.as_str()) {
                    out.push_str(replacement);
                    rest = &rest[word.len()..];
                    continue 'outer;
                }
            }
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
        CellValue::Text(out)
    }

    fn pad(text: &str, size: usize, pad: char, at_start: bool) -> String {
        let len = text.chars().count();
        if len >= size {
            return text.to_string();
        }
        let padding: String = std::iter::repeat(pad).take(size - len).collect();
        if at_start {
            format!("{}{}", padding, text)
        } else {
            format!("{}{}", text, padding)
        }
    }

    fn apply_one_side_trim(text: &str, trim_char: char, left_align: bool) -> CellValue {
        let trimmed = if left_align {
            text.trim_start_matches(trim_char)
        } else {
            text.trim_end_matches(trim_char)
        };
        CellValue::Text(trimmed.to_string())
    }

    fn apply_truncate(text: &str, max_size: usize, suffix: &str) -> CellValue {
        if text.chars().count() <= max_size {
            return CellValue::Text(text.to_string());
        }
        let mut cut: String = text.chars().take(max_size).collect();
        cut.push_str(suffix);
        CellValue::Text(cut)
    }
}

/// Fixed-width layout of one column.
///
/// Right-aligned text is padded and chopped on the left, left-aligned text on
/// the right, so chopping always keeps the side the text is aligned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadLayout {
    pub size: usize,
    pub pad: char,
    pub right_align: bool,
    pub chopped: bool,
}

impl PadLayout {
    /// Left-aligned space padding without chopping.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            pad: ' ',
            right_align: false,
            chopped: false,
        }
    }

    pub fn pad_char(mut self, pad: char) -> Self {
        self.pad = pad;
        self
    }

    pub fn right_aligned(mut self) -> Self {
        self.right_align = true;
        self
    }

    pub fn chopped(mut self) -> Self {
        self.chopped = true;
        self
    }

    /// Layout of a normalized `MultiPad` directive.
    pub fn from_directive(d: &Directive) -> Result<Self, ConfigError> {
        Ok(Self {
            size: positive_size(d, "size")?,
            pad: d.char_attr("pad_char")?,
            right_align: d.bool_attr("right_align")?,
            chopped: d.bool_attr("chopped")?,
        })
    }

    pub fn apply(&self, text: &str) -> String {
        let len = text.chars().count();
        if len > self.size {
            if !self.chopped {
                return text.to_string();
            }
            return if self.right_align {
                text.chars().skip(len - self.size).collect()
            } else {
                text.chars().take(self.size).collect()
            };
        }
        Conversion::pad(text, self.size, self.pad, self.right_align)
    }
}

fn positive_size(d: &Directive, name: &str) -> Result<usize, ConfigError> {
    let size = d.size_attr(name)?;
    if size == 0 {
        return Err(d.invalid(name, "should be > 0"));
    }
    Ok(size)
}

/// Pipeline step running one [`Conversion`].
#[derive(Debug)]
pub struct ConversionStep {
    kind: KindId,
    conversion: Conversion,
}

impl ConversionStep {
    pub fn new(kind: KindId, conversion: Conversion) -> Self {
        Self { kind, conversion }
    }

    pub fn from_directive(d: &Directive) -> Result<Self, ConfigError> {
        Ok(Self::new(d.kind().clone(), Conversion::from_directive(d)?))
    }
}

impl Step for ConversionStep {
    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
        Ok(self.conversion.apply(value))
    }

    fn describe(&self) -> String {
        match &self.conversion {
            Conversion::MultiPad(layout) => format!(
                "MultiPad(size={}, pad='{}', right_align={}, chopped={})",
                layout.size, layout.pad, layout.right_align, layout.chopped
            ),
            Conversion::OneSideTrim { trim_char, left_align } => {
                format!("OneSideTrim(char='{}', left_align={})", trim_char, left_align)
            }
            _ => self.kind.short_name().to_string(),
        }
    }
}

/// Substitutes a configured value for missing input.
///
/// On read, null and empty text are replaced; on write only null is.
#[derive(Debug)]
pub struct DefaultStep {
    kind: KindId,
    case: BuildCase,
    replacement: CellValue,
}

impl DefaultStep {
    pub fn new(case: BuildCase, replacement: CellValue) -> Self {
        Self {
            kind: kinds::DEFAULT_VALUE,
            case,
            replacement,
        }
    }
}

impl Step for DefaultStep {
    fn kind(&self) -> &KindId {
        &self.kind
    }

    fn process(&self, value: CellValue, _ctx: &RowContext) -> Result<CellValue, Violation> {
        let missing = match (&value, self.case) {
            (CellValue::Null, _) => true,
            (CellValue::Text(s), BuildCase::Read) => s.is_empty(),
            _ => false,
        };
        Ok(if missing { self.replacement.clone() } else { value })
    }

    fn describe(&self) -> String {
        format!("DefaultValue({})", self.replacement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveCatalog;
    use serde_json::json;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn conversion(d: Directive) -> Conversion {
        let d = DirectiveCatalog::standard().normalize(&d).unwrap();
        Conversion::from_directive(&d).unwrap()
    }

    #[test]
    fn test_trim_and_case() {
        assert_eq!(conversion(kinds::trim()).apply(text("  hi  ")), text("hi"));
        assert_eq!(conversion(kinds::upper()).apply(text("ab")), text("AB"));
        assert_eq!(conversion(kinds::lower()).apply(CellValue::Integer(3)), CellValue::Integer(3));
    }

    #[test]
    fn test_multi_pad() {
        let pad = conversion(kinds::multi_pad(5).with_attr("pad_char", "_"));
        assert_eq!(pad.apply(text("AB")), text("AB___"));
        assert_eq!(pad.apply(CellValue::Null), text("_____"));

        let right = conversion(
            kinds::multi_pad(4)
                .with_attr("pad_char", "0")
                .with_attr("right_align", true),
        );
        assert_eq!(right.apply(text("12")), text("0012"));

        let chop = conversion(kinds::multi_pad(3).with_attr("chopped", true));
        assert_eq!(chop.apply(text("ABCDE")), text("ABC"));

        let chop_right = conversion(
            kinds::multi_pad(3)
                .with_attr("pad_char", "0")
                .with_attr("right_align", true)
                .with_attr("chopped", true),
        );
        assert_eq!(chop_right.apply(text("12345")), text("345"));
        assert_eq!(chop_right.apply(text("7")), text("007"));

        let keep = conversion(kinds::multi_pad(3));
        assert_eq!(keep.apply(text("ABCDE")), text("ABCDE"));
    }

    #[test]
    fn test_one_side_trim() {
        let right = conversion(kinds::one_side_trim().with_attr("trim_char", "_"));
        assert_eq!(right.apply(text("__AB__")), text("__AB"));
        let left = conversion(
            kinds::one_side_trim()
                .with_attr("trim_char", "0")
                .with_attr("left_align", true),
        );
        assert_eq!(left.apply(text("0012")), text("12"));
        assert_eq!(left.apply(text("000")), text(""));
    }

    #[test]
    fn test_regex_replace_full_and_partial() {
        let full = conversion(kinds::regex_replace("(\\d{3})-(\\d{4})", "$1$2"));
        assert_eq!(full.apply(text("123-4567")), text("1234567"));
        assert_eq!(full.apply(text("tel 123-4567")), text("tel 123-4567"));

        let partial = conversion(kinds::regex_replace("-", "").with_attr("partial", true));
        assert_eq!(partial.apply(text("a-b-c")), text("abc"));
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let d = DirectiveCatalog::standard()
            .normalize(&kinds::regex_replace("(", ""))
            .unwrap();
        assert!(matches!(
            Conversion::from_directive(&d),
            Err(ConfigError::InvalidAttribute { .. })
        ));
    }

    #[test]
    fn test_word_replace_prefers_longest() {
        let c = conversion(kinds::word_replace([("St", "Street"), ("St.", "Saint")]));
        assert_eq!(c.apply(text("St. John St")), text("Saint John Street"));
    }

    #[test]
    fn test_truncate_and_null_convert() {
        let t = conversion(kinds::truncate(3).with_attr("suffix", "…"));
        assert_eq!(t.apply(text("abcdef")), text("abc…"));
        assert_eq!(t.apply(text("ab")), text("ab"));

        let n = conversion(kinds::null_convert(["N/A", "-"]).with_attr("ignore_case", json!(true)));
        assert_eq!(n.apply(text("n/a")), CellValue::Null);
        assert_eq!(n.apply(text("x")), text("x"));
    }

    #[test]
    fn test_default_step() {
        let ctx = RowContext::default();
        let read = DefaultStep::new(BuildCase::Read, text("none"));
        assert_eq!(read.process(text(""), &ctx).unwrap(), text("none"));
        assert_eq!(read.process(text("x"), &ctx).unwrap(), text("x"));

        let write = DefaultStep::new(BuildCase::Write, CellValue::Integer(0));
        assert_eq!(write.process(CellValue::Null, &ctx).unwrap(), CellValue::Integer(0));
    }
}
