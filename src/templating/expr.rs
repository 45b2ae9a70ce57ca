//! Expression tokenizer and variable-reference scanner.
//!
//! Expressions are never evaluated. The scanner only answers which bare names
//! an expression reads, whether each read is protected by a fallback
//! (`default` filter, `or`) or by a condition (inline `if` test), and whether
//! the expression calls `super()`.

use std::collections::HashSet;

use super::Guard;

/// Words that are syntax, never variables.
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "in", "is", "if", "else", "true", "false", "none", "True", "False",
    "None", "recursive", "as", "import", "with", "without", "context", "ignore", "missing",
];

/// Names provided by the template runtime rather than by the caller.
const BUILTINS: &[&str] = &[
    "loop", "super", "self", "caller", "varargs", "kwargs", "range", "dict", "lipsum", "cycler",
    "joiner", "namespace",
];

/// Filters whose result replaces an undefined input.
const DEFAULT_FILTERS: &[&str] = &["default", "d"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    Str,
    Number,
    Op,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl Token<'_> {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }

    /// String literal contents without quotes.
    pub fn unquoted(&self) -> &str {
        if self.kind == TokenKind::Str && self.text.len() >= 2 {
            &self.text[1..self.text.len() - 1]
        } else {
            self.text
        }
    }
}

/// One variable read found in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Occurrence {
    pub name: String,
    pub guard: Guard,
}

/// Result of scanning one expression.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ExprScan {
    pub occurrences: Vec<Occurrence>,
    pub calls_super: bool,
}

/// Split an expression into tokens.
pub(crate) fn tokenize(expr: &str) -> Result<Vec<Token<'_>>, String> {
    const MULTI_OPS: &[&str] = &["==", "!=", "<=", ">=", "//", "**"];

    let bytes = expr.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        let first = expr[i..].chars().next().unwrap_or('?');
        let kind = if first.is_alphabetic() || first == '_' {
            i += expr[i..]
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(expr.len() - i);
            TokenKind::Ident
        } else if c.is_ascii_digit() {
            while i < bytes.len()
                && (bytes[i].is_ascii_digit() || bytes[i] == b'_' || bytes[i] == b'.')
            {
                // `1..2` is not a number; stop before a second dot-led segment
                if bytes[i] == b'.' && !bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
                    break;
                }
                i += 1;
            }
            i += exponent_len(&bytes[i..]);
            TokenKind::Number
        } else if c == b'"' || c == b'\'' {
            i += 1;
            let mut closed = false;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b if b == c => {
                        i += 1;
                        closed = true;
                        break;
                    }
                    _ => i += 1,
                }
            }
            if !closed {
                return Err("unterminated string literal".to_string());
            }
            TokenKind::Str
        } else if let Some(op) = MULTI_OPS.iter().find(|op| expr[i..].starts_with(**op)) {
            i += op.len();
            TokenKind::Op
        } else if b"()[]{}.,:|~+-*/%<>=!".contains(&c) {
            i += 1;
            TokenKind::Op
        } else {
            return Err(format!("unexpected character '{first}' in expression"));
        };

        let end = i.min(bytes.len());
        tokens.push(Token {
            kind,
            text: &expr[start..end],
            start,
            end,
        });
    }

    Ok(tokens)
}

/// Length of a `e[+-]digits` exponent at the start of `rest`, or 0.
fn exponent_len(rest: &[u8]) -> usize {
    if !matches!(rest.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let sign = usize::from(matches!(rest.get(1), Some(b'+' | b'-')));
    let digits = rest[1 + sign..].iter().take_while(|b| b.is_ascii_digit() || **b == b'_').count();
    if rest.get(1 + sign).is_some_and(u8::is_ascii_digit) {
        1 + sign + digits
    } else {
        0
    }
}

/// Index one past the bracket that closes the opener at `open`.
///
/// Returns `tokens.len()` when the bracket is never closed.
pub(crate) fn skip_group(tokens: &[Token<'_>], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if token.kind != TokenKind::Op {
            continue;
        }
        match token.text {
            "(" | "[" | "{" => depth += 1,
            ")" | "]" | "}" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

/// Check that brackets pair up.
pub(crate) fn check_balanced(tokens: &[Token<'_>]) -> Result<(), String> {
    let mut stack = Vec::new();
    for token in tokens.iter().filter(|t| t.kind == TokenKind::Op) {
        match token.text {
            "(" => stack.push(")"),
            "[" => stack.push("]"),
            "{" => stack.push("}"),
            close @ (")" | "]" | "}") => {
                if stack.pop() != Some(close) {
                    return Err(format!("unbalanced '{close}' in expression"));
                }
            }
            _ => {}
        }
    }
    match stack.last() {
        Some(close) => Err(format!("missing '{close}' in expression")),
        None => Ok(()),
    }
}

/// Split tokens on a top-level separator (outside brackets).
pub(crate) fn split_top_level<'t, 'a>(
    tokens: &'t [Token<'a>],
    is_separator: impl Fn(&Token<'a>) -> bool,
) -> Vec<&'t [Token<'a>]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::Op {
            match token.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        if depth == 0 && is_separator(token) {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts
}

/// Position of the first top-level token matching `pred`.
pub(crate) fn find_top_level(
    tokens: &[Token<'_>],
    pred: impl Fn(&Token<'_>) -> bool,
) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        if depth == 0 && pred(token) {
            return Some(i);
        }
        if token.kind == TokenKind::Op {
            match token.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
    }
    None
}

/// Scan tokens for variable reads.
///
/// * `source` - the expression text the tokens were cut from
/// * `scoped` - names bound by an enclosing loop, macro or `with`
/// * `all_conditional` - every read sits in an `if`/`elif` test
/// * `leading_filter` - the first identifier is a filter name (`{% filter %}`)
pub(crate) fn scan(
    source: &str,
    tokens: &[Token<'_>],
    scoped: &HashSet<String>,
    all_conditional: bool,
    leading_filter: bool,
) -> ExprScan {
    let conditional = inline_if_guards(tokens);
    let mut result = ExprScan::default();

    for (i, token) in tokens.iter().enumerate() {
        if token.kind != TokenKind::Ident || KEYWORDS.contains(&token.text) {
            continue;
        }

        let prev = i.checked_sub(1).map(|p| &tokens[p]);
        let next = tokens.get(i + 1);

        if token.text == "super" && next.is_some_and(|n| n.is_op("(")) {
            result.calls_super = true;
            continue;
        }
        if (leading_filter && i == 0)
            || prev.is_some_and(|p| p.is_op(".") || p.is_op("|"))
            || is_test_name(tokens, i)
            || next.is_some_and(|n| n.is_op("="))
            || BUILTINS.contains(&token.text)
            || scoped.contains(token.text)
        {
            continue;
        }

        let guard = match fallback_after(source, tokens, i) {
            Some(description) => Guard::Default(description),
            None if all_conditional || conditional[i] => Guard::Conditional,
            None => Guard::Bare,
        };

        result.occurrences.push(Occurrence {
            name: token.text.to_string(),
            guard,
        });
    }

    result
}

/// Whether the identifier at `i` follows `is` or `is not`.
fn is_test_name(tokens: &[Token<'_>], i: usize) -> bool {
    match i {
        0 => false,
        1 => tokens[0].is_word("is"),
        _ => {
            tokens[i - 1].is_word("is")
                || (tokens[i - 1].is_word("not") && tokens[i - 2].is_word("is"))
        }
    }
}

/// Mark reads guarded by an inline if (`VALUE if TEST else OTHER`).
///
/// Every token of TEST is guarded. A read in VALUE is guarded only when
/// TEST mentions the same name. OTHER is never guarded.
fn inline_if_guards(tokens: &[Token<'_>]) -> Vec<bool> {
    let mut mask = vec![false; tokens.len()];

    for (i, token) in tokens.iter().enumerate() {
        if !token.is_word("if") || i == 0 {
            continue;
        }

        let test_end = test_end(tokens, i);
        let mut tested = HashSet::new();
        for j in i + 1..test_end {
            mask[j] = true;
            if tokens[j].kind == TokenKind::Ident && !KEYWORDS.contains(&tokens[j].text) {
                tested.insert(tokens[j].text);
            }
        }

        for j in (value_start(tokens, i)..i).filter(|&j| tested.contains(tokens[j].text)) {
            if tokens[j].kind == TokenKind::Ident {
                mask[j] = true;
            }
        }
    }

    mask
}

/// End (exclusive) of the test following the inline `if` at `at`.
fn test_end(tokens: &[Token<'_>], at: usize) -> usize {
    let mut depth = 0usize;
    for (j, t) in tokens.iter().enumerate().skip(at + 1) {
        if t.kind == TokenKind::Op {
            match t.text {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" if depth == 0 => return j,
                ")" | "]" | "}" => depth -= 1,
                "," if depth == 0 => return j,
                _ => {}
            }
        }
        if depth == 0 && t.is_word("else") {
            return j;
        }
    }
    tokens.len()
}

/// Start of the value operand preceding the inline `if` at `at`.
fn value_start(tokens: &[Token<'_>], at: usize) -> usize {
    let mut depth = 0usize;
    for j in (0..at).rev() {
        let t = &tokens[j];
        if t.kind == TokenKind::Op {
            match t.text {
                ")" | "]" | "}" => depth += 1,
                "(" | "[" | "{" if depth == 0 => return j + 1,
                "(" | "[" | "{" => depth -= 1,
                "," if depth == 0 => return j + 1,
                _ => {}
            }
        }
        if depth == 0 && t.is_word("else") {
            return j + 1;
        }
    }
    0
}

/// Description of the fallback protecting the read at `i`, if any.
///
/// Looks past the read's attribute/subscript/call chain for a `default`
/// filter anywhere in the filter chain, or a directly following `or`.
fn fallback_after(source: &str, tokens: &[Token<'_>], i: usize) -> Option<String> {
    let mut j = i + 1;
    loop {
        match tokens.get(j) {
            Some(t) if t.is_op(".") && tokens.get(j + 1).is_some_and(|n| n.kind == TokenKind::Ident) => {
                j += 2;
            }
            Some(t) if t.is_op("(") || t.is_op("[") => j = skip_group(tokens, j),
            _ => break,
        }
    }

    if tokens.get(j).is_some_and(|t| t.is_word("or")) {
        let operand = tokens.get(j + 1)?;
        let end = match tokens.get(j + 2) {
            Some(t) if t.is_op("(") || t.is_op("[") => tokens[skip_group(tokens, j + 2) - 1].end,
            _ => operand.end,
        };
        return Some(describe(source, operand, end));
    }

    while tokens.get(j).is_some_and(|t| t.is_op("|")) {
        let filter = tokens.get(j + 1).filter(|t| t.kind == TokenKind::Ident)?;
        j += 2;
        let args = if tokens.get(j).is_some_and(|t| t.is_op("(")) {
            let close = skip_group(tokens, j);
            let inner = &tokens[j + 1..close.saturating_sub(1).max(j + 1)];
            j = close;
            Some(inner)
        } else {
            None
        };

        if DEFAULT_FILTERS.contains(&filter.text) {
            let first_arg = args
                .and_then(|inner| split_top_level(inner, |t| t.is_op(",")).into_iter().next())
                .filter(|arg| !arg.is_empty());
            return Some(match first_arg {
                Some(arg) => describe(source, &arg[0], arg[arg.len() - 1].end),
                None => String::new(),
            });
        }
    }

    None
}

fn describe(source: &str, first: &Token<'_>, end: usize) -> String {
    if first.kind == TokenKind::Str && first.end == end {
        first.unquoted().to_string()
    } else {
        source[first.start..end].trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_str(expr: &str) -> ExprScan {
        let tokens = tokenize(expr).unwrap();
        scan(expr, &tokens, &HashSet::new(), false, false)
    }

    fn names(scan: &ExprScan) -> Vec<(&str, &Guard)> {
        scan.occurrences.iter().map(|o| (o.name.as_str(), &o.guard)).collect()
    }

    #[test]
    fn test_tokenize_operators_and_strings() {
        let tokens = tokenize(r#"a.b == "x y" | upper"#).unwrap();
        let texts: Vec<_> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["a", ".", "b", "==", "\"x y\"", "|", "upper"]);
        assert_eq!(tokens[4].unquoted(), "x y");
    }

    #[test]
    fn test_tokenize_rejects_bad_input() {
        assert!(tokenize("'open").is_err());
        assert!(tokenize("a @ b").is_err());
    }

    #[test]
    fn test_attributes_filters_and_tests_are_not_variables() {
        let result = scan_str("user.name | title if user is defined else 'anon'");
        assert_eq!(
            names(&result),
            vec![("user", &Guard::Conditional), ("user", &Guard::Conditional)]
        );
    }

    #[test]
    fn test_inline_if_guards_only_test_and_value() {
        let result = scan_str("a ~ (b if a else c)");
        assert_eq!(
            names(&result),
            vec![
                ("a", &Guard::Bare),
                ("b", &Guard::Bare),
                ("a", &Guard::Conditional),
                ("c", &Guard::Bare),
            ]
        );

        let result = scan_str("name ~ '!' if name else other ~ name");
        assert_eq!(
            names(&result),
            vec![
                ("name", &Guard::Conditional),
                ("name", &Guard::Conditional),
                ("other", &Guard::Bare),
                ("name", &Guard::Bare),
            ]
        );
    }

    #[test]
    fn test_numbers_with_exponents() {
        let texts: Vec<_> = tokenize("1.5e3 + 2E-4 + 7e").unwrap().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["1.5e3", "+", "2E-4", "+", "7", "e"]);

        let result = scan_str("1.5e3 * x.0");
        assert_eq!(names(&result), vec![("x", &Guard::Bare)]);
    }

    #[test]
    fn test_unicode_identifiers() {
        let result = scan_str("café ~ größe | default('m')");
        assert_eq!(
            names(&result),
            vec![("café", &Guard::Bare), ("größe", &Guard::Default("m".to_string()))]
        );
    }

    #[test]
    fn test_default_filter_description() {
        let result = scan_str(r#"author | default("Unknown")"#);
        assert_eq!(names(&result), vec![("author", &Guard::Default("Unknown".to_string()))]);

        let result = scan_str("count | int | d(fallback_count)");
        assert_eq!(
            names(&result),
            vec![
                ("count", &Guard::Default("fallback_count".to_string())),
                ("fallback_count", &Guard::Bare),
            ]
        );
    }

    #[test]
    fn test_default_filter_without_argument() {
        let result = scan_str("suffix | default");
        assert_eq!(names(&result), vec![("suffix", &Guard::Default(String::new()))]);
    }

    #[test]
    fn test_or_fallback() {
        let result = scan_str("title or 'Untitled'");
        assert_eq!(names(&result), vec![("title", &Guard::Default("Untitled".to_string()))]);
    }

    #[test]
    fn test_kwargs_builtins_and_super() {
        let result = scan_str("super() ~ render(item, size=width) ~ loop.index ~ range(3)");
        assert!(result.calls_super);
        assert_eq!(
            names(&result),
            vec![("render", &Guard::Bare), ("item", &Guard::Bare), ("width", &Guard::Bare)]
        );
    }

    #[test]
    fn test_scoped_names_are_skipped() {
        let tokens = tokenize("item.name ~ prefix").unwrap();
        let scoped: HashSet<String> = ["item".to_string()].into_iter().collect();
        let result = scan("item.name ~ prefix", &tokens, &scoped, false, false);
        assert_eq!(names(&result), vec![("prefix", &Guard::Bare)]);
    }

    #[test]
    fn test_split_and_find_top_level() {
        let tokens = tokenize("a, f(b, c), d").unwrap();
        let parts = split_top_level(&tokens, |t| t.is_op(","));
        assert_eq!(parts.len(), 3);
        assert_eq!(find_top_level(&tokens, |t| t.is_word("d")), Some(9));
    }

    #[test]
    fn test_check_balanced() {
        assert!(check_balanced(&tokenize("f(a[1], {'k': v})").unwrap()).is_ok());
        assert!(check_balanced(&tokenize("f(a").unwrap()).is_err());
        assert!(check_balanced(&tokenize("a)").unwrap()).is_err());
    }
}
