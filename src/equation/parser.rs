use crate::equation::lexer::{tokenize, Token, TokenKind};
use crate::equation::node::{BigOpKind, EquationNode};
use crate::equation::symbols;

/// Upper bound on the nesting limit, whatever the caller asks for.
pub const MAX_DEPTH_LIMIT: usize = 256;

/// How a sequence of atoms ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SequenceEnd {
    /// The closing brace of the enclosing group was consumed.
    Closed,
    Eof,
}

/// Recursive-descent LaTeX parser with a hard nesting limit.
///
/// Never fails: whatever cannot be mapped becomes an `Unsupported` leaf holding the
/// source text it came from.
pub struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str, max_depth: usize) -> Self {
        Self {
            src,
            tokens: tokenize(src),
            pos: 0,
            max_depth: max_depth.clamp(1, MAX_DEPTH_LIMIT),
        }
    }

    pub fn parse(mut self) -> EquationNode {
        let (children, _) = self.parse_sequence(0, false);
        EquationNode::from_sequence(children)
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset just past the last consumed token.
    fn offset(&self) -> usize {
        match self.pos {
            0 => 0,
            p => self.tokens[p - 1].end,
        }
    }

    fn source_from(&self, start: usize) -> String {
        self.src[start..self.offset().max(start)].to_string()
    }

    /// Consumes everything left and returns it verbatim.
    fn take_rest(&mut self, start: usize) -> EquationNode {
        self.pos = self.tokens.len();
        EquationNode::unsupported(&self.src[start..])
    }

    fn parse_sequence(&mut self, depth: usize, in_group: bool) -> (Vec<EquationNode>, SequenceEnd) {
        let mut children = Vec::new();
        loop {
            match self.peek() {
                None => return (children, SequenceEnd::Eof),
                Some(TokenKind::RBrace) if in_group => {
                    self.advance();
                    return (children, SequenceEnd::Closed);
                }
                Some(TokenKind::RBrace) => {
                    // Stray closing brace: keep what parsed so far, wrap the remainder.
                    let start = self.tokens[self.pos].start;
                    children.push(self.take_rest(start));
                    return (children, SequenceEnd::Eof);
                }
                Some(_) => {
                    if let Some(node) = self.parse_scripted(depth) {
                        children.push(node);
                    }
                }
            }
        }
    }

    /// An atom followed by any sub/superscripts.
    fn parse_scripted(&mut self, depth: usize) -> Option<EquationNode> {
        let base = match self.peek() {
            Some(TokenKind::Sub | TokenKind::Sup) => EquationNode::empty(),
            _ => self.parse_atom(depth)?,
        };
        let (sub, sup) = self.parse_scripts(depth);
        if sub.is_none() && sup.is_none() {
            Some(base)
        } else {
            Some(EquationNode::super_sub(base, sup, sub))
        }
    }

    /// At most one `_` and one `^`, in either order.
    fn parse_scripts(&mut self, depth: usize) -> (Option<EquationNode>, Option<EquationNode>) {
        let mut sub = None;
        let mut sup = None;
        loop {
            let slot = match self.peek() {
                Some(TokenKind::Sub) if sub.is_none() => &mut sub,
                Some(TokenKind::Sup) if sup.is_none() => &mut sup,
                _ => break,
            };
            let marker = self.advance().map(|t| t.start).unwrap_or(0);
            let arg = self.parse_argument(depth + 1).unwrap_or_else(|| {
                EquationNode::unsupported(&self.src[marker..self.offset().max(marker)])
            });
            *slot = Some(arg);
        }
        (sub, sup)
    }

    /// A command argument or script: a braced group or a single atom.
    fn parse_argument(&mut self, depth: usize) -> Option<EquationNode> {
        match self.peek() {
            None | Some(TokenKind::RBrace | TokenKind::Sub | TokenKind::Sup) => return None,
            _ => {}
        }
        if depth >= self.max_depth {
            return Some(self.capture_argument());
        }
        if let Some(TokenKind::Number(n)) = self.peek() {
            if n.chars().count() > 1 {
                return Some(self.split_number());
            }
        }
        match self.peek() {
            Some(TokenKind::LBrace) => Some(self.parse_group(depth)),
            _ => Some(self.parse_atom(depth).unwrap_or_else(EquationNode::empty)),
        }
    }

    /// `\frac12` takes one digit per argument.
    fn split_number(&mut self) -> EquationNode {
        let token = &mut self.tokens[self.pos];
        let TokenKind::Number(number) = &token.kind else {
            return EquationNode::empty();
        };
        let mut chars = number.chars();
        let first = chars.next().map(String::from).unwrap_or_default();
        let rest: String = chars.collect();
        token.kind = TokenKind::Number(rest);
        token.start += first.len();
        EquationNode::literal(first)
    }

    fn parse_group(&mut self, depth: usize) -> EquationNode {
        let Some(open) = self.advance() else {
            return EquationNode::empty();
        };
        if depth >= self.max_depth {
            self.skip_to_matching_brace();
            return EquationNode::unsupported(self.source_from(open.start));
        }
        let (children, end) = self.parse_sequence(depth + 1, true);
        match end {
            SequenceEnd::Closed => EquationNode::from_sequence(children),
            SequenceEnd::Eof => EquationNode::unsupported(&self.src[open.start..]),
        }
    }

    /// Captures the next argument verbatim without interpreting it.
    fn capture_argument(&mut self) -> EquationNode {
        let start = self.tokens[self.pos].start;
        if matches!(self.peek(), Some(TokenKind::LBrace)) {
            self.advance();
            self.skip_to_matching_brace();
        } else {
            self.advance();
        }
        EquationNode::unsupported(self.source_from(start))
    }

    /// Assumes the opening brace was consumed; stops after its partner or at the end.
    fn skip_to_matching_brace(&mut self) -> bool {
        let mut level = 1usize;
        while let Some(token) = self.advance() {
            match token.kind {
                TokenKind::LBrace => level += 1,
                TokenKind::RBrace => {
                    level -= 1;
                    if level == 0 {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }

    fn parse_atom(&mut self, depth: usize) -> Option<EquationNode> {
        match self.peek()? {
            TokenKind::LBrace => Some(self.parse_group(depth)),
            TokenKind::RBrace | TokenKind::Sub | TokenKind::Sup => None,
            _ => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Number(n) => Some(EquationNode::literal(n)),
                    TokenKind::Char('&') => Some(EquationNode::unsupported("&")),
                    TokenKind::Char('$' | '~') => None,
                    TokenKind::Char(c) => Some(EquationNode::literal(c.to_string())),
                    TokenKind::Command(name) => self.parse_command(&name, token.start, depth),
                    TokenKind::LBrace | TokenKind::RBrace | TokenKind::Sub | TokenKind::Sup => None,
                }
            }
        }
    }

    fn parse_command(&mut self, name: &str, start: usize, depth: usize) -> Option<EquationNode> {
        if let Some(kind) = BigOpKind::from_command(name) {
            let (lower, upper) = self.parse_scripts(depth);
            let body = self.parse_body(depth + 1);
            return Some(EquationNode::big_operator(kind, lower, upper, body));
        }
        if let Some(symbol) = symbols::lookup_symbol(name) {
            return Some(EquationNode::literal(symbol));
        }
        if let Some(c) = symbols::escaped_char(name) {
            return Some(EquationNode::literal(c.to_string()));
        }
        if symbols::is_function_name(name) {
            return Some(EquationNode::literal(name));
        }
        if symbols::is_dropped(name) {
            return None;
        }
        match name {
            "frac" | "dfrac" | "tfrac" | "cfrac" => {
                let num = self.parse_argument(depth + 1);
                let den = num.as_ref().and_then(|_| self.parse_argument(depth + 1));
                match (num, den) {
                    (Some(num), Some(den)) => Some(EquationNode::fraction(num, den)),
                    _ => Some(EquationNode::unsupported(self.source_from(start))),
                }
            }
            "|" => Some(EquationNode::literal("‖")),
            "begin" => Some(self.capture_environment(start)),
            "" => Some(EquationNode::unsupported("\\")),
            n if symbols::is_delimiter_sizer(n) => self.parse_delimiter(),
            n if symbols::is_text_wrapper(n) => Some(self.parse_text(start)),
            n if symbols::is_style_wrapper(n) => self.parse_argument(depth + 1),
            _ => Some(self.capture_unknown(start)),
        }
    }

    /// The delimiter after `\left`, `\big` and the like. Only a single delimiter
    /// token is taken; `.` is the empty delimiter, and anything that is not a
    /// delimiter is left for the caller.
    fn parse_delimiter(&mut self) -> Option<EquationNode> {
        let symbol = match self.peek()? {
            TokenKind::Char('.') => None,
            TokenKind::Char(c) => Some(c.to_string()),
            TokenKind::Command(name) => Some(delimiter_command(name)?),
            _ => return None,
        };
        self.advance();
        symbol.map(EquationNode::literal)
    }

    /// Body of a big operator: the next scripted atom, skipping content-free commands.
    fn parse_body(&mut self, depth: usize) -> EquationNode {
        loop {
            match self.peek() {
                None | Some(TokenKind::RBrace) => return EquationNode::empty(),
                Some(_) if depth >= self.max_depth => return self.capture_argument(),
                Some(_) => {
                    if let Some(node) = self.parse_scripted(depth) {
                        return node;
                    }
                }
            }
        }
    }

    /// `\text{...}`: the braced content is taken as-is.
    fn parse_text(&mut self, start: usize) -> EquationNode {
        if !matches!(self.peek(), Some(TokenKind::LBrace)) {
            return EquationNode::unsupported(self.source_from(start));
        }
        let Some(open) = self.advance() else {
            return EquationNode::empty();
        };
        if !self.skip_to_matching_brace() {
            return EquationNode::unsupported(&self.src[start..]);
        }
        let close_start = self.tokens[self.pos - 1].start;
        EquationNode::literal(&self.src[open.end..close_start])
    }

    /// `\begin{env} ... \end{env}` kept whole.
    fn capture_environment(&mut self, start: usize) -> EquationNode {
        let env = match self.peek() {
            Some(TokenKind::LBrace) => {
                let open_end = self.tokens[self.pos].end;
                self.advance();
                if !self.skip_to_matching_brace() {
                    return self.take_rest(start);
                }
                let close_start = self.tokens[self.pos - 1].start;
                self.src[open_end..close_start].trim().to_string()
            }
            _ => return EquationNode::unsupported(self.source_from(start)),
        };

        let mut nesting = 0usize;
        while let Some(token) = self.advance() {
            match &token.kind {
                TokenKind::Command(c) if c == "begin" => nesting += 1,
                TokenKind::Command(c) if c == "end" => {
                    if nesting > 0 {
                        nesting -= 1;
                        continue;
                    }
                    if matches!(self.peek(), Some(TokenKind::LBrace)) {
                        let open_end = self.tokens[self.pos].end;
                        self.advance();
                        if self.skip_to_matching_brace() {
                            let close_start = self.tokens[self.pos - 1].start;
                            if self.src[open_end..close_start].trim() == env {
                                return EquationNode::unsupported(self.source_from(start));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        EquationNode::unsupported(&self.src[start..])
    }

    /// An unknown command together with its braced and bracketed arguments.
    fn capture_unknown(&mut self, start: usize) -> EquationNode {
        loop {
            match self.peek() {
                Some(TokenKind::LBrace) => {
                    self.advance();
                    if !self.skip_to_matching_brace() {
                        return EquationNode::unsupported(&self.src[start..]);
                    }
                }
                Some(TokenKind::Char('[')) => {
                    let close = self.tokens[self.pos..]
                        .iter()
                        .position(|t| t.kind == TokenKind::Char(']'));
                    match close {
                        Some(offset) => self.pos += offset + 1,
                        None => break,
                    }
                }
                _ => break,
            }
        }
        EquationNode::unsupported(self.source_from(start))
    }
}

fn delimiter_command(name: &str) -> Option<String> {
    if name == "|" {
        return Some("‖".to_string());
    }
    symbols::lookup_symbol(name)
        .map(str::to_string)
        .or_else(|| symbols::escaped_char(name).map(String::from))
}
