//! Front matter scanning for documentation files.
//!
//! A document opens with a block delimited by `---` lines:
//!
//! ```text
//! ---
//! name: Getting Started
//! link: quickstart
//! sort: 2
//! date: 2014-05-01 10:00
//! ---
//!
//! Body text.
//! ```
//!
//! The opening delimiter must appear within the first [`OPEN_WINDOW`] lines
//! and the block must close within [`MAX_METADATA_LINES`] lines of it.

use std::io::BufRead;

use chrono::NaiveDateTime;

/// Lines searched for the opening delimiter.
pub const OPEN_WINDOW: usize = 4;

/// Lines allowed between the opening and closing delimiters.
pub const MAX_METADATA_LINES: usize = 20;

const DELIMITER: &str = "---";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Metadata parsed from a front matter block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// Document represents its enclosing directory.
    pub root: bool,
    /// Display name.
    pub name: String,
    /// Publication date.
    pub date: Option<NaiveDateTime>,
    /// Explicit link, if any.
    pub link: Option<String>,
    /// Sibling sort key.
    pub sort: i64,
}

/// Outcome of scanning a file.
#[derive(Debug, PartialEq, Eq)]
pub enum Scan {
    /// No opening delimiter near the top of the file.
    NoMetadata,
    /// A closed metadata block.
    Parsed {
        /// Parsed metadata.
        meta: FrontMatter,
        /// A non-blank line follows the closing delimiter.
        has_body: bool,
    },
}

/// Front matter scanning error.
#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    /// Closing delimiter missing.
    #[error("front matter is not closed by `---`")]
    Unterminated,
    /// `date` value does not match `YYYY-MM-DD HH:MM`.
    #[error("invalid date `{value}`: {source}")]
    InvalidDate {
        /// Raw value.
        value: String,
        /// Parse failure.
        #[source]
        source: chrono::ParseError,
    },
    /// Read failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Clone, Copy)]
enum State {
    SeekingOpen,
    ReadingMetadata,
}

/// Scan the front matter at the top of `reader`.
///
/// Lines are decoded lossily so binary files next to documents scan as
/// [`Scan::NoMetadata`] instead of failing.
pub fn scan<R: BufRead>(mut reader: R) -> Result<Scan, FrontMatterError> {
    let mut state = State::SeekingOpen;
    let mut meta = FrontMatter::default();
    let mut line_no = 0;
    let mut since_open = 0;
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return match state {
                State::SeekingOpen => Ok(Scan::NoMetadata),
                State::ReadingMetadata => Err(FrontMatterError::Unterminated),
            };
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();

        match state {
            State::SeekingOpen => {
                if line == DELIMITER {
                    state = State::ReadingMetadata;
                } else {
                    line_no += 1;
                    if line_no >= OPEN_WINDOW {
                        return Ok(Scan::NoMetadata);
                    }
                }
            }
            State::ReadingMetadata => {
                if line == DELIMITER {
                    let has_body = skip_blank_lines(&mut reader)?;
                    return Ok(Scan::Parsed { meta, has_body });
                }
                since_open += 1;
                if since_open > MAX_METADATA_LINES {
                    return Err(FrontMatterError::Unterminated);
                }
                apply_field(&mut meta, line)?;
            }
        }
    }
}

fn apply_field(meta: &mut FrontMatter, line: &str) -> Result<(), FrontMatterError> {
    let Some((key, value)) = line.split_once(':') else {
        return Ok(());
    };
    let value = value.trim();

    match key.trim() {
        "root" => meta.root = parse_bool(value),
        "name" => value.clone_into(&mut meta.name),
        "date" => {
            let date = NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|source| {
                FrontMatterError::InvalidDate {
                    value: value.to_owned(),
                    source,
                }
            })?;
            meta.date = Some(date);
        }
        "link" => meta.link = Some(value.to_owned()),
        "sort" => meta.sort = value.parse().unwrap_or(0),
        _ => {}
    }
    Ok(())
}

/// Boolean forms accepted for `root`; anything else is false.
fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "true" | "TRUE" | "True")
}

/// Consume blank lines; true when a non-blank line follows.
fn skip_blank_lines<R: BufRead>(reader: &mut R) -> Result<bool, FrontMatterError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(false);
        }
        if !buf.trim_ascii().is_empty() {
            return Ok(true);
        }
    }
}

/// Locate the document body after the front matter block.
///
/// Returns the text following the closing delimiter with the leading blank
/// lines removed, or `None` when the file has no closed block or nothing
/// follows it.
#[must_use]
pub fn extract_body(source: &str) -> Option<&str> {
    let mut delimiters = 0;
    let mut offset = 0;

    for line in source.split_inclusive('\n') {
        offset += line.len();
        if line.trim() == DELIMITER {
            delimiters += 1;
            if delimiters == 2 {
                break;
            }
        }
    }
    if delimiters < 2 {
        return None;
    }

    let rest = &source[offset..];
    let start = rest
        .split_inclusive('\n')
        .take_while(|line| line.trim().is_empty())
        .map(str::len)
        .sum::<usize>();
    let body = &rest[start..];

    if body.trim().is_empty() { None } else { Some(body) }
}
