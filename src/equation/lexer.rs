#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `\name` or a control symbol such as `\{`. Empty for a trailing backslash.
    Command(String),
    LBrace,
    RBrace,
    Sub,
    Sup,
    Number(String),
    Char(char),
}

/// A token and its byte span in the source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

pub fn tokenize(src: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        let kind = match c {
            c if c.is_whitespace() => continue,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '_' => TokenKind::Sub,
            '^' => TokenKind::Sup,
            '\\' => match chars.peek().copied() {
                Some((_, next)) if next.is_ascii_alphabetic() => {
                    let mut name = String::new();
                    while let Some(&(_, ch)) = chars.peek() {
                        if !ch.is_ascii_alphabetic() {
                            break;
                        }
                        name.push(ch);
                        chars.next();
                    }
                    TokenKind::Command(name)
                }
                Some((_, next)) => {
                    chars.next();
                    TokenKind::Command(next.to_string())
                }
                None => TokenKind::Command(String::new()),
            },
            c if c.is_ascii_digit() => {
                let mut number = c.to_string();
                loop {
                    match chars.peek().copied() {
                        Some((_, d)) if d.is_ascii_digit() => {
                            number.push(d);
                            chars.next();
                        }
                        Some((dot_at, '.')) => {
                            let after = src[dot_at + 1..].chars().next();
                            if !after.is_some_and(|ch| ch.is_ascii_digit()) {
                                break;
                            }
                            number.push('.');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                TokenKind::Number(number)
            }
            other => TokenKind::Char(other),
        };
        let end = chars.peek().map_or(src.len(), |&(idx, _)| idx);
        tokens.push(Token { kind, start, end });
    }

    tokens
}

/// True when `text` lexes as exactly one number token.
pub fn is_number(text: &str) -> bool {
    match tokenize(text).as_slice() {
        [Token {
            kind: TokenKind::Number(n),
            ..
        }] => n == text,
        _ => false,
    }
}
