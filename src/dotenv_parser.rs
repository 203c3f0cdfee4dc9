//! Parser for `.env` files.
//!
//! The format is deliberately small:
//!
//! ```text
//! # comment
//! DATABASE_URL=postgres://localhost/app
//! GREETING="hello world"
//! NAME = 'quoted'
//! ```
//!
//! Each line is handled on its own. Blank lines and lines whose first
//! non-space character is `#` are skipped. Anything else is split on the
//! first `=`; lines without one are ignored rather than reported. Key and
//! value are trimmed, and one matching pair of single or double quotes is
//! stripped from the value. Later assignments to the same key win.
//!
//! There is no escape processing, no multi-line values and no variable
//! interpolation.

use std::collections::HashMap;
use tracing::trace;

/// Variables parsed from a dotenv file.
pub type Variables = HashMap<String, String>;

/// Turns the lines of a dotenv file into variables.
///
/// Implemented by [`DotenvParser`] and by any
/// `Fn(&[String]) -> Variables` closure, so tests and hosts can swap the
/// parsing step without touching the loader.
pub trait EnvParser: Send + Sync {
    /// Parses already-split lines into a variable map.
    fn parse(&self, lines: &[String]) -> Variables;
}

impl<F> EnvParser for F
where
    F: Fn(&[String]) -> Variables + Send + Sync,
{
    fn parse(&self, lines: &[String]) -> Variables {
        self(lines)
    }
}

/// The default dotenv parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct DotenvParser;

impl EnvParser for DotenvParser {
    fn parse(&self, lines: &[String]) -> Variables {
        parse(lines)
    }
}

/// Parses a sequence of lines into variables.
///
/// # Example
/// ```
/// use dotspice::dotenv_parser::parse;
///
/// let vars = parse(["# settings", "", "A=1", "B=\"two words\"", "A=3", "broken"]);
/// assert_eq!(vars.len(), 2);
/// assert_eq!(vars["A"], "3");
/// assert_eq!(vars["B"], "two words");
/// ```
pub fn parse<I, S>(lines: I) -> Variables
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut variables = Variables::new();
    for line in lines {
        if let Some((key, value)) = parse_line(line.as_ref()) {
            trace!("[Dotenv] Loaded variable: {}=***", key);
            variables.insert(key.to_string(), value.to_string());
        }
    }
    variables
}

/// Parses a single line, returning the key and unquoted value.
///
/// Returns `None` for blank lines, comments, lines without `=` and lines
/// whose key is empty.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }

    Some((key, strip_quotes(value.trim())))
}

/// Strips one layer of matching single or double quotes.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}
