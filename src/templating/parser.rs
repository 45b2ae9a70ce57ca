//! Tag-level parser that turns lexer segments into structural [`Node`]s.
//!
//! The parser tracks open structures (blocks, conditionals, loops, macros)
//! on a stack. The stack decides three things for every variable read:
//! whether a loop/macro/`with` binding hides it, whether an enclosing `if`
//! tests the same name, and which block a `super()` call belongs to.

use std::collections::HashSet;

use super::expr::{self, Token, TokenKind};
use super::lexer::{self, Segment};
use super::{ExtendsTarget, Guard, Node};

/// Parse failure before template attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyntaxError {
    pub line: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<lexer::LexError> for SyntaxError {
    fn from(err: lexer::LexError) -> Self {
        Self {
            line: err.line,
            message: err.message,
        }
    }
}

#[derive(Debug)]
enum FrameKind {
    /// Index of the `BlockDef` node in `nodes`.
    Block {
        name: String,
        node: usize,
    },
    If {
        guards: HashSet<String>,
        in_else: bool,
    },
    For,
    Macro,
    Call,
    Filter,
    SetBlock {
        names: Vec<String>,
    },
    With,
    Autoescape,
}

impl FrameKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Block { .. } => "block",
            Self::If { .. } => "if",
            Self::For => "for",
            Self::Macro => "macro",
            Self::Call => "call",
            Self::Filter => "filter",
            Self::SetBlock { .. } => "set",
            Self::With => "with",
            Self::Autoescape => "autoescape",
        }
    }

    /// Frames whose `set` assignments stay local to the frame body.
    fn scopes_assignments(&self) -> bool {
        matches!(self, Self::For | Self::Macro | Self::Call | Self::With)
    }
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    line: usize,
    /// Names bound inside this frame (loop targets, macro parameters, ...).
    scoped: Vec<String>,
}

pub(crate) struct Parser {
    nodes: Vec<Node>,
    stack: Vec<Frame>,
    block_names: HashSet<String>,
    /// Line and node index of the first `extends`.
    extends: Option<(usize, usize)>,
    /// Whether any `extends` sits inside an open structure.
    extends_nested: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            stack: Vec::new(),
            block_names: HashSet::new(),
            extends: None,
            extends_nested: false,
        }
    }

    pub fn parse(mut self, source: &str) -> Result<Vec<Node>, SyntaxError> {
        for segment in lexer::tokenize(source)? {
            match segment {
                Segment::Text {
                    text,
                    line,
                } => self.nodes.push(Node::Text {
                    len: text.len(),
                    line,
                }),
                Segment::Output {
                    body,
                    line,
                } => self.output(body, line)?,
                Segment::Tag {
                    body,
                    line,
                } => self.tag(body, line)?,
                Segment::Comment {
                    ..
                } => {}
            }
        }

        if let Some(frame) = self.stack.last() {
            return Err(SyntaxError::new(
                frame.line,
                format!("unclosed '{}' tag", frame.kind.tag()),
            ));
        }
        Ok(self.nodes)
    }

    fn output(&mut self, body: &str, line: usize) -> Result<(), SyntaxError> {
        if body.is_empty() {
            return Err(SyntaxError::new(line, "empty expression"));
        }
        let tokens = tokens_of(body, line)?;
        self.scan(body, &tokens, line, false, false)
    }

    fn tag(&mut self, body: &str, line: usize) -> Result<(), SyntaxError> {
        let name_end = body.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_')).unwrap_or(body.len());
        let (name, rest) = body.split_at(name_end);
        let rest = rest.trim();

        match name {
            "" => Err(SyntaxError::new(line, "empty tag")),
            "extends" => self.extends(rest, line),
            "block" => self.block(rest, line),
            "endblock" => self.endblock(rest, line),
            "if" => self.open_if(rest, line),
            "elif" => self.elif(rest, line),
            "else" => self.else_branch(line),
            "for" => self.open_for(rest, line),
            "set" => self.set(rest, line),
            "macro" => self.open_macro(rest, line),
            "call" => self.open_call(rest, line),
            "filter" => {
                let tokens = tokens_of(rest, line)?;
                if tokens.first().is_none_or(|t| t.kind != TokenKind::Ident) {
                    return Err(SyntaxError::new(line, "filter tag requires a filter name"));
                }
                self.scan(rest, &tokens, line, false, true)?;
                self.push(FrameKind::Filter, line, Vec::new());
                Ok(())
            }
            "with" => self.open_with(rest, line),
            "autoescape" => {
                let tokens = tokens_of(rest, line)?;
                self.scan(rest, &tokens, line, false, false)?;
                self.push(FrameKind::Autoescape, line, Vec::new());
                Ok(())
            }
            "include" => {
                let tokens = tokens_of(rest, line)?;
                let end = strip_include_modifiers(&tokens);
                if end == 0 {
                    return Err(SyntaxError::new(line, "include requires a template name"));
                }
                self.scan(rest, &tokens[..end], line, false, false)
            }
            "import" => self.import(rest, line),
            "from" => self.from_import(rest, line),
            "endif" | "endfor" | "endmacro" | "endcall" | "endfilter" | "endset" | "endwith"
            | "endautoescape" => self.close(name, line),
            "endraw" => Err(SyntaxError::new(line, "'endraw' without matching 'raw'")),
            other => Err(SyntaxError::new(line, format!("unknown tag '{other}'"))),
        }
    }

    fn extends(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let enclosing = self.stack.last().map(|frame| frame.kind.tag());
        let tokens = tokens_of(rest, line)?;
        if tokens.is_empty() {
            return Err(SyntaxError::new(line, "extends requires a template name"));
        }

        if let Some((first, node)) = self.extends {
            if enclosing.is_none() && !self.extends_nested {
                return Err(SyntaxError::new(
                    line,
                    format!("template extends more than once (first at line {first})"),
                ));
            }
            // Alternative parents: the target depends on runtime state
            if let Some(Node::Extends {
                target,
                ..
            }) = self.nodes.get_mut(node)
            {
                let previous = match target {
                    ExtendsTarget::Literal(name) => format!("\"{name}\""),
                    ExtendsTarget::Dynamic(expression) => expression.clone(),
                };
                *target = ExtendsTarget::Dynamic(format!("{previous} | {rest}"));
            }
            self.extends_nested |= enclosing.is_some();
            return Ok(());
        }

        let target = match (tokens.as_slice(), enclosing) {
            ([only], None) if only.kind == TokenKind::Str => {
                ExtendsTarget::Literal(only.unquoted().to_string())
            }
            (_, Some(tag)) => ExtendsTarget::Dynamic(format!("{rest} (inside '{tag}')")),
            (_, None) => ExtendsTarget::Dynamic(rest.to_string()),
        };
        self.extends = Some((line, self.nodes.len()));
        self.extends_nested = enclosing.is_some();
        self.nodes.push(Node::Extends {
            target,
            line,
        });
        Ok(())
    }

    fn block(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let name = match tokens.split_first() {
            Some((first, modifiers))
                if first.kind == TokenKind::Ident
                    && modifiers.iter().all(|m| m.is_word("scoped") || m.is_word("required")) =>
            {
                first.text.to_string()
            }
            _ => return Err(SyntaxError::new(line, format!("invalid block declaration '{rest}'"))),
        };
        if !self.block_names.insert(name.clone()) {
            return Err(SyntaxError::new(line, format!("block '{name}' defined twice")));
        }

        let enclosing = self.stack.iter().rev().find_map(|f| match &f.kind {
            FrameKind::Block {
                name, ..
            } => Some(name.clone()),
            _ => None,
        });
        let node = self.nodes.len();
        self.nodes.push(Node::BlockDef {
            name: name.clone(),
            calls_super: false,
            enclosing,
            line,
        });
        self.push(
            FrameKind::Block {
                name,
                node,
            },
            line,
            Vec::new(),
        );
        Ok(())
    }

    fn endblock(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        match self.stack.pop() {
            Some(Frame {
                kind: FrameKind::Block {
                    name, ..
                },
                ..
            }) => {
                if !rest.is_empty() && rest != name {
                    return Err(SyntaxError::new(
                        line,
                        format!("endblock '{rest}' does not match block '{name}'"),
                    ));
                }
                Ok(())
            }
            Some(frame) => Err(SyntaxError::new(
                line,
                format!("'endblock' closes '{}' opened at line {}", frame.kind.tag(), frame.line),
            )),
            None => Err(SyntaxError::new(line, "'endblock' without matching 'block'")),
        }
    }

    fn open_if(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let guards = self.condition(rest, line)?;
        self.push(
            FrameKind::If {
                guards,
                in_else: false,
            },
            line,
            Vec::new(),
        );
        Ok(())
    }

    fn elif(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        match self.stack.last() {
            Some(Frame {
                kind: FrameKind::If {
                    in_else: false, ..
                },
                ..
            }) => {}
            _ => return Err(SyntaxError::new(line, "'elif' outside of an 'if'")),
        }
        let new_guards = self.condition(rest, line)?;
        if let Some(Frame {
            kind: FrameKind::If {
                guards, ..
            },
            ..
        }) = self.stack.last_mut()
        {
            *guards = new_guards;
        }
        Ok(())
    }

    fn else_branch(&mut self, line: usize) -> Result<(), SyntaxError> {
        match self.stack.last_mut() {
            Some(Frame {
                kind: FrameKind::If {
                    guards,
                    in_else,
                },
                ..
            }) if !*in_else => {
                guards.clear();
                *in_else = true;
                Ok(())
            }
            Some(Frame {
                kind: FrameKind::For,
                ..
            }) => Ok(()),
            _ => Err(SyntaxError::new(line, "'else' outside of an 'if' or 'for'")),
        }
    }

    /// Scan an `if`/`elif` test; every read in it is conditional.
    fn condition(&mut self, rest: &str, line: usize) -> Result<HashSet<String>, SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        if tokens.is_empty() {
            return Err(SyntaxError::new(line, "condition expected"));
        }
        let before = self.nodes.len();
        self.scan(rest, &tokens, line, true, false)?;
        Ok(self.nodes[before..]
            .iter()
            .filter_map(|node| match node {
                Node::VariableRef {
                    name, ..
                } => Some(name.clone()),
                _ => None,
            })
            .collect())
    }

    fn open_for(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let Some(in_pos) = expr::find_top_level(&tokens, |t| t.is_word("in")) else {
            return Err(SyntaxError::new(line, "for loop requires 'in'"));
        };
        let targets = target_names(&tokens[..in_pos])
            .ok_or_else(|| SyntaxError::new(line, "invalid for loop target"))?;

        let mut iterable = &tokens[in_pos + 1..];
        if iterable.last().is_some_and(|t| t.is_word("recursive")) {
            iterable = &iterable[..iterable.len() - 1];
        }
        let filter_pos = expr::find_top_level(iterable, |t| t.is_word("if"));
        let (iterable, filter) = match filter_pos {
            Some(pos) => (&iterable[..pos], Some(&iterable[pos + 1..])),
            None => (iterable, None),
        };
        if iterable.is_empty() {
            return Err(SyntaxError::new(line, "for loop requires an iterable"));
        }

        self.scan(rest, iterable, line, false, false)?;
        self.push(FrameKind::For, line, targets);
        if let Some(filter) = filter {
            self.scan(rest, filter, line, true, false)?;
        }
        Ok(())
    }

    fn set(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        match expr::find_top_level(&tokens, |t| t.is_op("=")) {
            Some(eq) => {
                if eq + 1 == tokens.len() {
                    return Err(SyntaxError::new(line, "set requires a value"));
                }
                let targets = &tokens[..eq];
                self.scan(rest, &tokens[eq + 1..], line, false, false)?;

                // `ns.attr = value` mutates a namespace; it binds nothing new
                if targets.iter().any(|t| t.is_op(".")) {
                    return Ok(());
                }
                let names = target_names(targets)
                    .ok_or_else(|| SyntaxError::new(line, "invalid set target"))?;
                self.assign(names, line);
                Ok(())
            }
            None => {
                let pipe = tokens.iter().position(|t| t.is_op("|")).unwrap_or(tokens.len());
                let names = target_names(&tokens[..pipe])
                    .ok_or_else(|| SyntaxError::new(line, "invalid set target"))?;
                if pipe < tokens.len() {
                    let filters = &tokens[pipe..];
                    self.scan(rest, filters, line, false, false)?;
                }
                self.push(
                    FrameKind::SetBlock {
                        names,
                    },
                    line,
                    Vec::new(),
                );
                Ok(())
            }
        }
    }

    fn open_macro(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let (name, params) = match tokens.split_first() {
            Some((name, params)) if name.kind == TokenKind::Ident => (name.text.to_string(), params),
            _ => return Err(SyntaxError::new(line, "macro requires a name")),
        };
        let params = self.parameters(rest, params, line)?;
        self.assign(vec![name], line);
        self.push(FrameKind::Macro, line, params);
        Ok(())
    }

    fn open_call(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let (params, invocation) = if tokens.first().is_some_and(|t| t.is_op("(")) {
            let close = expr::skip_group(&tokens, 0);
            (self.parameters(rest, &tokens[..close], line)?, &tokens[close..])
        } else {
            (Vec::new(), &tokens[..])
        };
        if invocation.is_empty() {
            return Err(SyntaxError::new(line, "call requires a macro invocation"));
        }
        self.scan(rest, invocation, line, false, false)?;
        self.push(FrameKind::Call, line, params);
        Ok(())
    }

    /// Parse `(a, b=expr, ...)`, scanning default expressions.
    fn parameters(
        &mut self,
        source: &str,
        tokens: &[Token<'_>],
        line: usize,
    ) -> Result<Vec<String>, SyntaxError> {
        let inner = match tokens {
            [open, inner @ .., close] if open.is_op("(") && close.is_op(")") => inner,
            _ => return Err(SyntaxError::new(line, "expected parameter list")),
        };
        let mut names = Vec::new();
        for param in expr::split_top_level(inner, |t| t.is_op(",")) {
            match param {
                [] => {}
                [name] if name.kind == TokenKind::Ident => names.push(name.text.to_string()),
                [name, eq, default @ ..]
                    if name.kind == TokenKind::Ident && eq.is_op("=") && !default.is_empty() =>
                {
                    self.scan(source, default, line, false, false)?;
                    names.push(name.text.to_string());
                }
                _ => return Err(SyntaxError::new(line, "invalid parameter")),
            }
        }
        Ok(names)
    }

    fn open_with(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let mut names = Vec::new();
        if !tokens.is_empty() {
            for binding in expr::split_top_level(&tokens, |t| t.is_op(",")) {
                match binding {
                    [name, eq, value @ ..]
                        if name.kind == TokenKind::Ident && eq.is_op("=") && !value.is_empty() =>
                    {
                        self.scan(rest, value, line, false, false)?;
                        names.push(name.text.to_string());
                    }
                    _ => return Err(SyntaxError::new(line, "invalid with binding")),
                }
            }
        }
        self.push(FrameKind::With, line, names);
        Ok(())
    }

    fn import(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let end = strip_include_modifiers(&tokens);
        match &tokens[..end] {
            [template @ .., as_kw, alias]
                if !template.is_empty() && as_kw.is_word("as") && alias.kind == TokenKind::Ident =>
            {
                self.scan(rest, template, line, false, false)?;
                self.assign(vec![alias.text.to_string()], line);
                Ok(())
            }
            _ => Err(SyntaxError::new(line, "import requires 'as <name>'")),
        }
    }

    fn from_import(&mut self, rest: &str, line: usize) -> Result<(), SyntaxError> {
        let tokens = tokens_of(rest, line)?;
        let end = strip_include_modifiers(&tokens);
        let tokens = &tokens[..end];
        let Some(import_pos) = expr::find_top_level(tokens, |t| t.is_word("import")) else {
            return Err(SyntaxError::new(line, "from requires 'import'"));
        };
        if import_pos == 0 {
            return Err(SyntaxError::new(line, "from requires a template name"));
        }
        self.scan(rest, &tokens[..import_pos], line, false, false)?;

        let mut names = Vec::new();
        for item in expr::split_top_level(&tokens[import_pos + 1..], |t| t.is_op(",")) {
            match item {
                [name] if name.kind == TokenKind::Ident => names.push(name.text.to_string()),
                [name, as_kw, alias]
                    if name.kind == TokenKind::Ident
                        && as_kw.is_word("as")
                        && alias.kind == TokenKind::Ident =>
                {
                    names.push(alias.text.to_string());
                }
                _ => return Err(SyntaxError::new(line, "invalid import list")),
            }
        }
        if names.is_empty() {
            return Err(SyntaxError::new(line, "from requires at least one imported name"));
        }
        self.assign(names, line);
        Ok(())
    }

    fn close(&mut self, end_tag: &str, line: usize) -> Result<(), SyntaxError> {
        let expected = &end_tag[3..];
        let Some(frame) = self.stack.pop() else {
            return Err(SyntaxError::new(line, format!("'{end_tag}' without matching '{expected}'")));
        };
        if frame.kind.tag() != expected {
            return Err(SyntaxError::new(
                line,
                format!("'{end_tag}' closes '{}' opened at line {}", frame.kind.tag(), frame.line),
            ));
        }
        if let FrameKind::SetBlock {
            names,
        } = frame.kind
        {
            self.assign(names, line);
        }
        Ok(())
    }

    /// Bind names: scoped to the innermost loop/macro/call/with, otherwise a
    /// template-level local assignment.
    fn assign(&mut self, names: Vec<String>, line: usize) {
        if let Some(frame) = self.stack.iter_mut().rev().find(|f| f.kind.scopes_assignments()) {
            frame.scoped.extend(names);
            return;
        }
        for name in names {
            self.nodes.push(Node::LocalAssign {
                name,
                line,
            });
        }
    }

    fn push(&mut self, kind: FrameKind, line: usize, scoped: Vec<String>) {
        self.stack.push(Frame {
            kind,
            line,
            scoped,
        });
    }

    /// Scan an expression and record its reads against the current stack.
    fn scan(
        &mut self,
        source: &str,
        tokens: &[Token<'_>],
        line: usize,
        all_conditional: bool,
        leading_filter: bool,
    ) -> Result<(), SyntaxError> {
        let scoped: HashSet<String> =
            self.stack.iter().flat_map(|f| f.scoped.iter().cloned()).collect();
        let result = expr::scan(source, tokens, &scoped, all_conditional, leading_filter);

        if result.calls_super {
            let block = self.stack.iter().rev().find_map(|f| match f.kind {
                FrameKind::Block {
                    node, ..
                } => Some(node),
                _ => None,
            });
            match block.map(|node| &mut self.nodes[node]) {
                Some(Node::BlockDef {
                    calls_super, ..
                }) => *calls_super = true,
                _ => return Err(SyntaxError::new(line, "super() used outside of a block")),
            }
        }

        for occurrence in result.occurrences {
            let guard = match occurrence.guard {
                Guard::Bare if self.guarded_by_enclosing_if(&occurrence.name) => Guard::Conditional,
                guard => guard,
            };
            self.nodes.push(Node::VariableRef {
                name: occurrence.name,
                guard,
                line,
            });
        }
        Ok(())
    }

    fn guarded_by_enclosing_if(&self, name: &str) -> bool {
        self.stack.iter().any(|frame| match &frame.kind {
            FrameKind::If {
                guards,
                in_else,
            } => !in_else && guards.contains(name),
            _ => false,
        })
    }
}

fn tokens_of(text: &str, line: usize) -> Result<Vec<Token<'_>>, SyntaxError> {
    let tokens = expr::tokenize(text).map_err(|message| SyntaxError::new(line, message))?;
    expr::check_balanced(&tokens).map_err(|message| SyntaxError::new(line, message))?;
    Ok(tokens)
}

/// Names in a `a, b, c` assignment target list.
fn target_names(tokens: &[Token<'_>]) -> Option<Vec<String>> {
    let tokens = match tokens {
        [open, inner @ .., close] if open.is_op("(") && close.is_op(")") => inner,
        _ => tokens,
    };
    let mut names = Vec::new();
    for part in expr::split_top_level(tokens, |t| t.is_op(",")) {
        match part {
            [name] if name.kind == TokenKind::Ident => names.push(name.text.to_string()),
            _ => return None,
        }
    }
    Some(names)
}

/// Length of `tokens` without trailing `ignore missing` / `with(out) context`.
fn strip_include_modifiers(tokens: &[Token<'_>]) -> usize {
    let mut end = tokens.len();
    loop {
        match &tokens[..end] {
            [.., a, b] if (a.is_word("with") || a.is_word("without")) && b.is_word("context") => {
                end -= 2;
            }
            [.., a, b] if a.is_word("ignore") && b.is_word("missing") => end -= 2,
            _ => return end,
        }
    }
}
