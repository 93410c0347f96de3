//! Brace- and environment-aware tokenizer.
//!
//! The scanner turns LaTeX source into a flat stream of [`Token`]s without
//! building a tree. All brace and bracket depth counting in this crate
//! happens here.

use paperscope_core::{DEFAULT_MAX_DEPTH, ParseError, Span};

/// One argument of a command or environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// `[...]` rather than `{...}`.
    pub optional: bool,
    /// Text between the delimiters with comments removed.
    pub text: String,
    /// The closing delimiter was missing; the argument runs to end of input.
    pub unterminated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `\name` together with the arguments that belong to it. Control
    /// symbols such as `\\` use the symbol as their name.
    Command { name: String, args: Vec<Argument> },
    /// `\begin{name}` plus its arguments. `\[` and `$$` open a
    /// `displaymath` environment.
    EnvironmentBegin { name: String, args: Vec<Argument> },
    EnvironmentEnd { name: String },
    /// Plain text. Escaped characters (`\%`), bare groups and inline math
    /// are kept verbatim; comments are removed.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn command_name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Command { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_command(&self, name: &str) -> bool {
        self.command_name() == Some(name)
    }

    pub fn args(&self) -> &[Argument] {
        match &self.kind {
            TokenKind::Command { args, .. } | TokenKind::EnvironmentBegin { args, .. } => args,
            _ => &[],
        }
    }

    /// The `n`-th required (braced) argument.
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.args()
            .iter()
            .filter(|a| !a.optional)
            .nth(n)
            .map(|a| a.text.as_str())
    }

    pub fn last_arg(&self) -> Option<&str> {
        self.args()
            .iter()
            .rev()
            .find(|a| !a.optional)
            .map(|a| a.text.as_str())
    }

    pub fn optional_arg(&self) -> Option<&str> {
        self.args()
            .iter()
            .find(|a| a.optional)
            .map(|a| a.text.as_str())
    }

    pub fn has_unterminated_arg(&self) -> bool {
        self.args().iter().any(|a| a.unterminated)
    }

    /// Text token holding nothing but whitespace.
    pub fn is_blank(&self) -> bool {
        matches!(&self.kind, TokenKind::Text(text) if text.trim().is_empty())
    }
}

/// Environments whose body is taken verbatim instead of being tokenized.
const RAW_ENVIRONMENTS: &[&str] = &["verbatim", "verbatim*", "Verbatim", "lstlisting", "minted", "comment"];

/// Math environments never take arguments, so `\begin{equation}[a,b]` keeps
/// its bracket.
const MATH_ENVIRONMENTS: &[&str] = &[
    "equation", "equation*", "align", "align*", "gather", "gather*", "multline", "multline*",
    "eqnarray", "eqnarray*", "flalign", "flalign*", "displaymath", "math",
];

pub(crate) fn is_math_environment(name: &str) -> bool {
    MATH_ENVIRONMENTS.contains(&name) || name.starts_with("alignat")
}

/// Optional and required argument counts of commands whose arguments may be
/// separated from the name by whitespace. Other commands only take braced
/// arguments that directly follow the name.
fn command_arity(name: &str) -> Option<(usize, usize)> {
    let arity = match name.trim_end_matches('*') {
        "part" | "chapter" | "section" | "subsection" | "subsubsection" | "paragraph"
        | "subparagraph" => (1, 1),
        "title" | "author" | "caption" | "bibitem" | "includegraphics" | "footnote"
        | "usepackage" | "documentclass" | "color" | "affiliation" | "affil" => (1, 1),
        "cite" | "citep" | "citet" | "citealp" | "citealt" | "citeauthor" | "citeyear"
        | "parencite" | "textcite" | "autocite" | "footcite" | "nocite" => (2, 1),
        "date" | "thanks" | "abstract" | "label" | "ref" | "eqref" | "pageref" | "autoref"
        | "cref" | "Cref" | "nameref" | "input" | "include" | "bibliography"
        | "bibliographystyle" | "epsfig" | "psfig" | "emph" | "textbf" | "textit" | "texttt"
        | "textsc" | "textsl" | "textrm" | "textsf" | "textup" | "underline" | "url"
        | "email" | "institute" | "keywords" | "vspace" | "hspace" | "mbox" | "text" => (0, 1),
        "href" | "frac" | "dfrac" | "tfrac" => (0, 2),
        "textcolor" => (1, 2),
        "newcommand" | "renewcommand" | "providecommand" => (2, 2),
        "multicolumn" => (0, 3),
        "multirow" => (1, 3),
        "item" => (1, 0),
        _ => return None,
    };
    Some(arity)
}

fn environment_arity(name: &str) -> (usize, usize) {
    match name {
        "tabular" | "array" | "longtable" | "supertabular" => (1, 1),
        "tabular*" | "tabularx" | "tabulary" => (1, 2),
        "thebibliography" | "multicols" | "minted" => (0, 1),
        "wrapfigure" => (1, 2),
        "minipage" => (3, 1),
        "subfigure" | "subtable" => (1, 1),
        n if is_math_environment(n) && !n.starts_with("alignat") => (0, 0),
        n if n.starts_with("alignat") => (0, 1),
        _ => (1, 0),
    }
}

/// Lazy token stream over LaTeX source.
///
/// Each scanner owns only its cursor; scanning the same text twice yields the
/// same tokens.
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    max_depth: usize,
    /// Bare `{` groups open in running text.
    group_depth: usize,
    in_dollar_display: bool,
    /// Set after `\begin{verbatim}`-like tokens.
    raw_env: Option<String>,
    pending: Option<Token>,
    failed: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            max_depth: DEFAULT_MAX_DEPTH,
            group_depth: 0,
            in_dollar_display: false,
            raw_env: None,
            pending: None,
            failed: false,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn bytes(&self) -> &'a [u8] {
        self.input.as_bytes()
    }

    fn peek_at(&self, pos: usize) -> Option<u8> {
        self.bytes().get(pos).copied()
    }

    fn span(&self, start: usize) -> Span {
        Span::new(start, self.pos)
    }

    fn too_deep(&self, depth: usize) -> ParseError {
        ParseError::NestingTooDeep {
            depth,
            limit: self.max_depth,
            offset: self.pos,
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, ParseError> {
        loop {
            if let Some(token) = self.pending.take() {
                return Ok(Some(token));
            }
            if let Some(env) = self.raw_env.take() {
                if let Some(token) = self.scan_raw(&env) {
                    return Ok(Some(token));
                }
                continue;
            }
            if self.pos >= self.input.len() {
                return Ok(None);
            }

            let start = self.pos;
            match (self.peek_at(self.pos), self.peek_at(self.pos + 1)) {
                (Some(b'\\'), Some(c)) if c.is_ascii_alphabetic() => {
                    return self.scan_control_word().map(Some);
                }
                (Some(b'\\'), Some(b'\\')) => {
                    self.pos += 2;
                    if self.peek_at(self.pos) == Some(b'*') {
                        self.pos += 1;
                    }
                    let mut args = Vec::new();
                    if self.peek_at(self.pos) == Some(b'[') {
                        args.push(self.read_group(true)?);
                    }
                    return Ok(Some(Token {
                        kind: TokenKind::Command {
                            name: "\\".to_string(),
                            args,
                        },
                        span: self.span(start),
                    }));
                }
                (Some(b'\\'), Some(b'[')) => {
                    self.pos += 2;
                    return Ok(Some(display_begin(self.span(start))));
                }
                (Some(b'\\'), Some(b']')) => {
                    self.pos += 2;
                    return Ok(Some(display_end(self.span(start))));
                }
                (Some(b'$'), Some(b'$')) => {
                    self.pos += 2;
                    self.in_dollar_display = !self.in_dollar_display;
                    let span = self.span(start);
                    return Ok(Some(if self.in_dollar_display {
                        display_begin(span)
                    } else {
                        display_end(span)
                    }));
                }
                _ => {
                    if let Some(token) = self.scan_text()? {
                        return Ok(Some(token));
                    }
                }
            }
        }
    }

    fn scan_control_word(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.pos += 1;
        while self.peek_at(self.pos).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        if self.peek_at(self.pos) == Some(b'*') {
            self.pos += 1;
        }
        let name = &self.input[start + 1..self.pos];

        match name {
            "begin" => self.scan_begin(start),
            "end" => self.scan_end(start),
            "verb" | "verb*" => Ok(self.scan_verb(start)),
            _ => {
                let args = match command_arity(name) {
                    Some((optional, required)) => self.read_args(optional, required)?,
                    None => self.read_adjacent_groups()?,
                };
                Ok(Token {
                    kind: TokenKind::Command {
                        name: name.to_string(),
                        args,
                    },
                    span: self.span(start),
                })
            }
        }
    }

    fn scan_begin(&mut self, start: usize) -> Result<Token, ParseError> {
        self.skip_inline_space();
        if self.peek_at(self.pos) != Some(b'{') {
            return Ok(Token {
                kind: TokenKind::Command {
                    name: "begin".to_string(),
                    args: Vec::new(),
                },
                span: self.span(start),
            });
        }
        let name = self.read_group(false)?.text.trim().to_string();
        let (optional, required) = environment_arity(&name);
        let args = self.read_args(optional, required)?;
        if RAW_ENVIRONMENTS.contains(&name.as_str()) {
            self.raw_env = Some(name.clone());
        }
        Ok(Token {
            kind: TokenKind::EnvironmentBegin { name, args },
            span: self.span(start),
        })
    }

    fn scan_end(&mut self, start: usize) -> Result<Token, ParseError> {
        self.skip_inline_space();
        if self.peek_at(self.pos) != Some(b'{') {
            return Ok(Token {
                kind: TokenKind::Command {
                    name: "end".to_string(),
                    args: Vec::new(),
                },
                span: self.span(start),
            });
        }
        let name = self.read_group(false)?.text.trim().to_string();
        Ok(Token {
            kind: TokenKind::EnvironmentEnd { name },
            span: self.span(start),
        })
    }

    /// `\verb|text|`: the first character after the name is the delimiter.
    fn scan_verb(&mut self, start: usize) -> Token {
        let rest = &self.input[self.pos..];
        let mut args = Vec::new();
        if let Some(delim) = rest.chars().next() {
            let body_start = self.pos + delim.len_utf8();
            let body = &self.input[body_start..];
            let end = body.find([delim, '\n']).unwrap_or(body.len());
            let terminated = body[end..].starts_with(delim);
            args.push(Argument {
                optional: false,
                text: body[..end].to_string(),
                unterminated: !terminated,
            });
            self.pos = body_start + end + if terminated { delim.len_utf8() } else { 0 };
        }
        Token {
            kind: TokenKind::Command {
                name: "verb".to_string(),
                args,
            },
            span: self.span(start),
        }
    }

    /// Body of a raw environment up to its `\end`, which is queued.
    fn scan_raw(&mut self, env: &str) -> Option<Token> {
        let start = self.pos;
        let end_tag = format!("\\end{{{env}}}");
        let rest = &self.input[self.pos..];
        match rest.find(&end_tag) {
            Some(offset) => {
                self.pos += offset;
                let text = Token {
                    kind: TokenKind::Text(rest[..offset].to_string()),
                    span: self.span(start),
                };
                let end_start = self.pos;
                self.pos += end_tag.len();
                self.pending = Some(Token {
                    kind: TokenKind::EnvironmentEnd {
                        name: env.to_string(),
                    },
                    span: self.span(end_start),
                });
                Some(text).filter(|_| offset > 0).or_else(|| self.pending.take())
            }
            None => {
                self.pos = self.input.len();
                Some(Token {
                    kind: TokenKind::Text(rest.to_string()),
                    span: self.span(start),
                })
                .filter(|_| !rest.is_empty())
            }
        }
    }

    fn scan_text(&mut self) -> Result<Option<Token>, ParseError> {
        let start = self.pos;
        let bytes = self.bytes();
        let mut text = String::new();
        let mut run_start = self.pos;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'%' => {
                    text.push_str(&self.input[run_start..self.pos]);
                    self.skip_comment();
                    run_start = self.pos;
                }
                b'\\' => match self.peek_at(self.pos + 1) {
                    Some(c) if c.is_ascii_alphabetic() => break,
                    Some(b'\\' | b'[' | b']') => break,
                    Some(b'(') => {
                        self.pos = self.find_math_close(self.pos + 2, "\\)");
                    }
                    Some(_) => self.pos += 1 + self.char_len_at(self.pos + 1),
                    None => self.pos += 1,
                },
                b'$' if self.peek_at(self.pos + 1) == Some(b'$') => break,
                b'$' if self.in_dollar_display => self.pos += 1,
                b'$' => {
                    self.pos = self.find_math_close(self.pos + 1, "$");
                }
                b'{' => {
                    self.group_depth += 1;
                    if self.group_depth > self.max_depth {
                        return Err(self.too_deep(self.group_depth));
                    }
                    self.pos += 1;
                }
                b'}' => {
                    self.group_depth = self.group_depth.saturating_sub(1);
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        text.push_str(&self.input[run_start..self.pos]);

        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(Token {
            kind: TokenKind::Text(text),
            span: self.span(start),
        }))
    }

    /// Position just past the closing math delimiter searched from `from`.
    /// Math never spans a paragraph break; without a closer only the opening
    /// delimiter is consumed.
    fn find_math_close(&self, from: usize, close: &str) -> usize {
        let bytes = self.bytes();
        let mut i = from;
        while i < bytes.len() {
            if bytes[i..].starts_with(close.as_bytes()) {
                return i + close.len();
            }
            match bytes[i] {
                b'\\' => i += 1 + self.char_len_at(i + 1),
                b'\n' if is_paragraph_break(&self.input[i + 1..]) => break,
                _ => i += 1,
            }
        }
        from
    }

    fn char_len_at(&self, pos: usize) -> usize {
        self.input
            .get(pos..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8)
    }

    /// Skip a `%` comment, leaving the cursor on the newline.
    fn skip_comment(&mut self) {
        let rest = &self.input[self.pos..];
        self.pos += rest.find('\n').unwrap_or(rest.len());
    }

    /// Skip spaces, tabs and at most one newline.
    fn skip_inline_space(&mut self) {
        let mut newlines = 0;
        while let Some(c) = self.peek_at(self.pos) {
            match c {
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'\n' if newlines == 0 => {
                    newlines += 1;
                    self.pos += 1;
                }
                _ => break,
            }
        }
    }

    fn read_args(&mut self, optional: usize, required: usize) -> Result<Vec<Argument>, ParseError> {
        let mut args = Vec::new();
        let mut optional_left = optional;
        let mut required_left = required;

        while optional_left > 0 || required_left > 0 {
            let save = self.pos;
            self.skip_inline_space();
            match self.peek_at(self.pos) {
                Some(b'[') if optional_left > 0 => {
                    args.push(self.read_group(true)?);
                    optional_left -= 1;
                }
                Some(b'{') if required_left > 0 => {
                    args.push(self.read_group(false)?);
                    required_left -= 1;
                    optional_left = 0;
                }
                _ => {
                    self.pos = save;
                    break;
                }
            }
        }
        Ok(args)
    }

    fn read_adjacent_groups(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut args = Vec::new();
        while self.peek_at(self.pos) == Some(b'{') {
            args.push(self.read_group(false)?);
        }
        Ok(args)
    }

    /// Read a `{...}` or `[...]` group starting at the cursor, counting
    /// nested braces (and brackets, for optional arguments).
    fn read_group(&mut self, optional: bool) -> Result<Argument, ParseError> {
        let bytes = self.bytes();
        self.pos += 1;
        let mut text = String::new();
        let mut run_start = self.pos;
        let mut braces = 0usize;
        let mut brackets = 0usize;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\\' => {
                    self.pos += 1 + self.char_len_at(self.pos + 1);
                    continue;
                }
                b'%' => {
                    text.push_str(&self.input[run_start..self.pos]);
                    self.skip_comment();
                    run_start = self.pos;
                    continue;
                }
                b'{' => {
                    braces += 1;
                    let depth = self.group_depth + braces + 1;
                    if depth > self.max_depth {
                        return Err(self.too_deep(depth));
                    }
                }
                b'}' if braces > 0 => braces -= 1,
                b'}' => {
                    text.push_str(&self.input[run_start..self.pos]);
                    if optional {
                        // Stray closer inside `[...]`: stop without consuming it.
                        return Ok(Argument {
                            optional,
                            text,
                            unterminated: true,
                        });
                    }
                    self.pos += 1;
                    return Ok(Argument {
                        optional,
                        text,
                        unterminated: false,
                    });
                }
                b'[' if optional && braces == 0 => brackets += 1,
                b']' if optional && braces == 0 => {
                    if brackets == 0 {
                        text.push_str(&self.input[run_start..self.pos]);
                        self.pos += 1;
                        return Ok(Argument {
                            optional,
                            text,
                            unterminated: false,
                        });
                    }
                    brackets -= 1;
                }
                _ => {}
            }
            self.pos += 1;
        }

        text.push_str(&self.input[run_start..self.pos]);
        Ok(Argument {
            optional,
            text,
            unterminated: true,
        })
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

fn display_begin(span: Span) -> Token {
    Token {
        kind: TokenKind::EnvironmentBegin {
            name: "displaymath".to_string(),
            args: Vec::new(),
        },
        span,
    }
}

fn display_end(span: Span) -> Token {
    Token {
        kind: TokenKind::EnvironmentEnd {
            name: "displaymath".to_string(),
        },
        span,
    }
}

fn is_paragraph_break(rest: &str) -> bool {
    let line_end = rest.find('\n');
    match line_end {
        Some(end) => rest[..end].trim().is_empty(),
        None => false,
    }
}

/// Scan all of `input` into tokens.
pub fn tokenize(input: &str, max_depth: usize) -> Result<Vec<Token>, ParseError> {
    Scanner::new(input).with_max_depth(max_depth).collect()
}

/// Remove `%` comments, keeping escaped `\%` and the line breaks.
pub fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push(c);
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '%' => {
                while chars.peek().is_some_and(|&n| n != '\n') {
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Separator recognized by [`split_top_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    /// `\\`, the row break of tabular environments.
    RowBreak,
    /// An unescaped character such as `&` or `,`.
    Char(char),
}

/// Split `text` on `sep` wherever it occurs outside braces. Escaped
/// characters never separate.
pub fn split_top_level(text: &str, sep: Separator) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut part_start = 0;
    let mut iter = text.char_indices().peekable();

    while let Some((i, c)) = iter.next() {
        match c {
            '\\' => {
                if let Some(&(_, next)) = iter.peek() {
                    iter.next();
                    if next == '\\' && sep == Separator::RowBreak && depth == 0 {
                        parts.push(&text[part_start..i]);
                        part_start = i + 2;
                    }
                }
            }
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            c if sep == Separator::Char(c) && depth == 0 => {
                parts.push(&text[part_start..i]);
                part_start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&text[part_start..]);
    parts
}
