use std::collections::HashMap;
use std::path::Path;

use crate::error::AnalysisError;

/// Key/value table parsed from a `.properties`-style file.
///
/// Supports the usual syntax: `#`/`!` comments, `=`, `:` or whitespace as the
/// key separator, backslash line continuations and `\t \n \r \f \uXXXX`
/// escapes. Values are trimmed on both sides. A repeated key keeps its last
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    entries: HashMap<String, String>,
}

impl Properties {
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        let mut lines = split_lines(content).into_iter();

        while let Some(raw) = lines.next() {
            let first = trim_leading(raw);
            if first.is_empty() || first.starts_with('#') || first.starts_with('!') {
                continue;
            }

            let mut logical = first.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(trim_leading(next)),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            entries.insert(unescape(key), unescape(value).trim().to_string());
        }

        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read and parse a properties file.
///
/// The file is read in one go so the handle is released before parsing.
/// Content that is not valid UTF-8 is decoded as ISO-8859-1, the traditional
/// encoding of properties files.
pub fn load(path: &Path) -> Result<Properties, AnalysisError> {
    let bytes = std::fs::read(path).map_err(|source| AnalysisError::SidecarRead {
        path: path.to_path_buf(),
        source,
    })?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    Ok(Properties::parse(&content))
}

/// Split on `\n`, `\r\n` and a lone `\r`, the three line terminators of the
/// properties format.
fn split_lines(content: &str) -> Vec<&str> {
    let bytes = content.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                lines.push(&content[start..i]);
                i += 1;
                start = i;
            }
            b'\r' => {
                lines.push(&content[start..i]);
                i += 1;
                if bytes.get(i) == Some(&b'\n') {
                    i += 1;
                }
                start = i;
            }
            _ => i += 1,
        }
    }
    if start < bytes.len() {
        lines.push(&content[start..]);
    }

    lines
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

fn trim_leading(line: &str) -> &str {
    line.trim_start_matches(is_blank)
}

/// An odd number of trailing backslashes means the last one escapes the newline.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    let mut separator = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            key_end = i;
            separator = Some(c);
            break;
        }
    }

    let key = &line[..key_end];
    let value = match separator {
        None => "",
        Some(c) if is_blank(c) => {
            let rest = trim_leading(&line[key_end..]);
            let rest = rest
                .strip_prefix('=')
                .or_else(|| rest.strip_prefix(':'))
                .unwrap_or(rest);
            trim_leading(rest)
        }
        Some(c) => trim_leading(&line[key_end + c.len_utf8()..]),
    };

    (key, value)
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut units: Vec<u16> = Vec::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&'u') {
            let mut lookahead = chars.clone();
            lookahead.next();
            let hex: String = lookahead.by_ref().take(4).collect();
            if hex.len() == 4 {
                if let Ok(unit) = u16::from_str_radix(&hex, 16) {
                    units.push(unit);
                    chars = lookahead;
                    continue;
                }
            }
        }

        flush_utf16(&mut units, &mut out);

        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some(other) => out.push(other),
            None => {}
        }
    }

    flush_utf16(&mut units, &mut out);
    out
}

fn flush_utf16(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_simple_pairs() {
        let props = Properties::parse("VENDOR=haxx\nPRODUCT=curl\nVERSION=7.20.1\n");
        assert_eq!(props.len(), 3);
        assert_eq!(props.get("VENDOR"), Some("haxx"));
        assert_eq!(props.get("PRODUCT"), Some("curl"));
        assert_eq!(props.get("VERSION"), Some("7.20.1"));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let content = "# header\n\n   ! bang comment\nVENDOR=haxx\n\t\n";
        let props = Properties::parse(content);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get("VENDOR"), Some("haxx"));
    }

    #[test]
    fn test_alternative_separators() {
        let props = Properties::parse("a:1\nb 2\nc = 3\nd : 4\ne\n");
        assert_eq!(props.get("a"), Some("1"));
        assert_eq!(props.get("b"), Some("2"));
        assert_eq!(props.get("c"), Some("3"));
        assert_eq!(props.get("d"), Some("4"));
        assert_eq!(props.get("e"), Some(""));
    }

    #[test]
    fn test_values_trimmed() {
        let props = Properties::parse("  VERSION =   7.20.1   \r\nPRODUCT=curl\t\n");
        assert_eq!(props.get("VERSION"), Some("7.20.1"));
        assert_eq!(props.get("PRODUCT"), Some("curl"));
    }

    #[test]
    fn test_value_keeps_separators_after_first() {
        let props = Properties::parse("url=http://example.com/a=b\n");
        assert_eq!(props.get("url"), Some("http://example.com/a=b"));
    }

    #[test]
    fn test_line_continuation() {
        let props = Properties::parse("PRODUCT=lib\\\n    foo\nVENDOR=acme\n");
        assert_eq!(props.get("PRODUCT"), Some("libfoo"));
        assert_eq!(props.get("VENDOR"), Some("acme"));
    }

    #[test]
    fn test_escaped_backslash_is_not_continuation() {
        let props = Properties::parse("path=C:\\\\libs\\\\\nnext=1\n");
        assert_eq!(props.get("path"), Some("C:\\libs\\"));
        assert_eq!(props.get("next"), Some("1"));
    }

    #[test]
    fn test_escapes() {
        let props = Properties::parse("my\\ key=a\\tb\nname=caf\\u00e9\nemoji=\\uD83D\\uDE00\n");
        assert_eq!(props.get("my key"), Some("a\tb"));
        assert_eq!(props.get("name"), Some("café"));
        assert_eq!(props.get("emoji"), Some("😀"));
    }

    #[test]
    fn test_cr_line_endings() {
        let props = Properties::parse("VENDOR=haxx\rPRODUCT=curl\rVERSION=7.20.1\r");
        assert_eq!(props.len(), 3);
        assert_eq!(props.get("VENDOR"), Some("haxx"));
        assert_eq!(props.get("PRODUCT"), Some("curl"));
        assert_eq!(props.get("VERSION"), Some("7.20.1"));
    }

    #[test]
    fn test_mixed_line_endings_with_continuation() {
        let props = Properties::parse("PRODUCT=lib\\\r\n  foo\rVENDOR=acme\nVERSION=2\r\n");
        assert_eq!(props.get("PRODUCT"), Some("libfoo"));
        assert_eq!(props.get("VENDOR"), Some("acme"));
        assert_eq!(props.get("VERSION"), Some("2"));
    }

    #[test]
    fn test_last_duplicate_wins() {
        let props = Properties::parse("VERSION=1.0\nVERSION=2.0\n");
        assert_eq!(props.get("VERSION"), Some("2.0"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let props = Properties::parse("vendor=haxx\n");
        assert_eq!(props.get("VENDOR"), None);
        assert_eq!(props.get("vendor"), Some("haxx"));
    }

    #[test]
    fn test_load_from_file() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, "VENDOR=haxx").unwrap();
        writeln!(f, "PRODUCT=curl").unwrap();

        let props = load(f.path()).unwrap();
        assert_eq!(props.get("VENDOR"), Some("haxx"));
        assert_eq!(props.get("PRODUCT"), Some("curl"));
    }

    #[test]
    fn test_load_latin1_fallback() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"VENDOR=caf\xe9\n").unwrap();

        let props = load(f.path()).unwrap();
        assert_eq!(props.get("VENDOR"), Some("café"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.dependencyproperties");

        let err = load(&missing).unwrap_err();
        assert_eq!(err.path(), missing.as_path());
        assert!(err.to_string().contains("absent.dependencyproperties"));
    }
}
