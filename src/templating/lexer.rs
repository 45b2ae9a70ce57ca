//! Delimiter-level lexer for template source.
//!
//! Splits raw template text into text runs, `{{ }}` output expressions,
//! `{% %}` tags and `{# #}` comments. Quoted strings inside output and tag
//! delimiters may contain closing markers. `{% raw %}` sections are passed
//! through as plain text.

use regex::Regex;
use std::sync::LazyLock;

static ENDRAW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%[-+]?\s*endraw\s*[-+]?%\}").expect("endraw pattern is valid")
});

/// One delimiter-level piece of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text {
        text: &'a str,
        line: usize,
    },
    /// `{{ ... }}` with whitespace-control markers stripped.
    Output {
        body: &'a str,
        line: usize,
    },
    /// `{% ... %}` with whitespace-control markers stripped.
    Tag {
        body: &'a str,
        line: usize,
    },
    /// `{# ... #}` with whitespace-control markers stripped.
    Comment {
        body: &'a str,
        line: usize,
    },
}

/// Lexing failure, located by 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub line: usize,
    pub message: String,
}

#[derive(Clone, Copy)]
enum Kind {
    Output,
    Tag,
    Comment,
}

impl Kind {
    fn from_marker(byte: u8) -> Option<Self> {
        match byte {
            b'{' => Some(Self::Output),
            b'%' => Some(Self::Tag),
            b'#' => Some(Self::Comment),
            _ => None,
        }
    }

    fn closing(self) -> &'static str {
        match self {
            Self::Output => "}}",
            Self::Tag => "%}",
            Self::Comment => "#}",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Output => "expression '{{'",
            Self::Tag => "tag '{%'",
            Self::Comment => "comment '{#'",
        }
    }
}

/// Split `source` into segments.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Segment<'_>>, LexError> {
    let bytes = source.as_bytes();
    let mut segments = Vec::new();
    let mut pos = 0;
    let mut line = 1;

    while pos < source.len() {
        let Some((open, kind)) = find_opening(bytes, pos) else {
            segments.push(Segment::Text {
                text: &source[pos..],
                line,
            });
            break;
        };

        if open > pos {
            let text = &source[pos..open];
            segments.push(Segment::Text {
                text,
                line,
            });
            line += count_newlines(text);
        }

        let body_start = open + 2;
        let close = match kind {
            Kind::Comment => source[body_start..].find("#}").map(|i| body_start + i),
            Kind::Output | Kind::Tag => find_closing(source, body_start, kind.closing(), line)?,
        }
        .ok_or_else(|| LexError {
            line,
            message: format!("unterminated {}", kind.describe()),
        })?;

        let body = strip_whitespace_control(&source[body_start..close]);
        let segment_line = line;
        line += count_newlines(&source[open..close + 2]);
        pos = close + 2;

        match kind {
            Kind::Output => segments.push(Segment::Output {
                body,
                line: segment_line,
            }),
            Kind::Comment => segments.push(Segment::Comment {
                body,
                line: segment_line,
            }),
            Kind::Tag if body == "raw" => {
                let Some(end) = ENDRAW.find_at(source, pos) else {
                    return Err(LexError {
                        line: segment_line,
                        message: "unclosed 'raw' tag".to_string(),
                    });
                };
                let text = &source[pos..end.start()];
                if !text.is_empty() {
                    segments.push(Segment::Text {
                        text,
                        line,
                    });
                }
                line += count_newlines(&source[pos..end.end()]);
                pos = end.end();
            }
            Kind::Tag => segments.push(Segment::Tag {
                body,
                line: segment_line,
            }),
        }
    }

    Ok(segments)
}

fn find_opening(bytes: &[u8], from: usize) -> Option<(usize, Kind)> {
    (from..bytes.len().saturating_sub(1)).find_map(|i| {
        if bytes[i] == b'{' {
            Kind::from_marker(bytes[i + 1]).map(|kind| (i, kind))
        } else {
            None
        }
    })
}

/// Find `closing` after `from`, skipping over quoted strings and nested
/// `{ }` literals.
fn find_closing(
    source: &str,
    from: usize,
    closing: &str,
    line: usize,
) -> Result<Option<usize>, LexError> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut braces = 0usize;

    for (offset, ch) in source[from..].char_indices() {
        let at = from + offset;
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                } else if braces > 0 && ch == '}' {
                    braces -= 1;
                } else if source[at..].starts_with(closing) {
                    return Ok(Some(at));
                } else if ch == '{' {
                    braces += 1;
                }
            }
        }
    }

    if quote.is_some() {
        return Err(LexError {
            line,
            message: "unterminated string literal".to_string(),
        });
    }
    Ok(None)
}

fn strip_whitespace_control(body: &str) -> &str {
    let body = body.strip_prefix(['-', '+']).unwrap_or(body);
    let body = body.strip_suffix(['-', '+']).unwrap_or(body);
    body.trim()
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}
