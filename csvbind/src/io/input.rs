//! Raw input handling: encoding and delimiter detection.

use std::path::Path;

use crate::error::CsvError;

/// Candidate delimiters, in order of preference on ties.
const DELIMITERS: [char; 4] = [',', ';', '\t', '|'];

/// Decoded input with what was detected about it.
#[derive(Debug, Clone)]
pub struct InputText {
    pub content: String,
    pub encoding: String,
    pub delimiter: char,
}

impl InputText {
    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> u8 {
        delimiter_byte(self.delimiter)
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let charset = chardet::detect(bytes).0;

    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" | "utf-8-sig" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes with the named encoding. A leading BOM is dropped.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Result<String, CsvError> {
    let label = match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-15".to_string(),
        other => other.to_string(),
    };
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
        .ok_or_else(|| CsvError::Encoding(format!("unsupported encoding '{}'", encoding)))?;

    let (decoded, _, had_errors) = encoding.decode(bytes);
    if had_errors && encoding == encoding_rs::UTF_8 {
        return Err(CsvError::Encoding("input is not valid UTF-8".to_string()));
    }
    Ok(decoded.into_owned())
}

/// Pick the delimiter occurring most often in the first line.
///
/// Falls back to a comma when none occurs.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best = DELIMITERS[0];
    let mut best_count = 0;
    for sep in DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best = sep;
        }
    }
    best
}

/// Parse a delimiter given on the command line (`,`, `;`, `tab`, `\t`...).
pub fn parse_delimiter(text: &str) -> Result<char, CsvError> {
    match text {
        "tab" | "\\t" | "\t" => Ok('\t'),
        _ => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii() => Ok(c),
                _ => Err(CsvError::Encoding(format!("invalid delimiter '{}'", text))),
            }
        }
    }
}

pub(crate) fn delimiter_byte(delimiter: char) -> u8 {
    u8::try_from(delimiter).unwrap_or(b',')
}

/// Decode bytes, detecting encoding and delimiter.
pub fn decode_auto(bytes: &[u8]) -> Result<InputText, CsvError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    Ok(InputText {
        content,
        encoding,
        delimiter,
    })
}

/// Read a file, detecting encoding and delimiter.
pub fn read_file_auto<P: AsRef<Path>>(path: P) -> Result<InputText, CsvError> {
    let bytes = std::fs::read(path.as_ref())?;
    decode_auto(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("single"), ',');
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        assert_eq!(decode_content(bytes, "iso-8859-1").unwrap(), "Société");
    }

    #[test]
    fn test_utf8_bom_dropped() {
        let bytes = b"\xEF\xBB\xBFid;name\n1;x";
        let input = decode_auto(bytes).unwrap();
        assert!(input.content.starts_with("id;"));
        assert_eq!(input.delimiter_byte(), b';');
    }

    #[test]
    fn test_unknown_encoding() {
        assert!(matches!(decode_content(b"x", "klingon"), Err(CsvError::Encoding(_))));
    }

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("tab").unwrap(), '\t');
        assert_eq!(parse_delimiter(";").unwrap(), ';');
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn test_read_file_auto() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a|b\n1|2\n").unwrap();
        let input = read_file_auto(&path).unwrap();
        assert_eq!(input.delimiter, '|');
        assert_eq!(input.encoding, "utf-8");
    }
}
