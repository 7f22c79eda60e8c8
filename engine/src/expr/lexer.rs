//! Tokenizer for embedded expressions

use oplog_shared::{OplogError, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `#name` or `#@reserved`, without the leading `#`
    Variable(String),
    /// Bare identifier: property names after `.`, and `true`/`false`/`null`
    Identifier(String),
    Integer(i64),
    Decimal(f64),
    Str(String),
    Dot,
    LeftBracket,
    RightBracket,
    LeftParen,
    RightParen,
    Plus,
    Not,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0;

    let err = |message: String| OplogError::expression(source, message);

    while pos < chars.len() {
        let c = chars[pos];
        match c {
            c if c.is_whitespace() => pos += 1,
            '#' => {
                pos += 1;
                let start = pos;
                if pos < chars.len() && chars[pos] == '@' {
                    pos += 1;
                }
                if pos >= chars.len() || !is_ident_start(chars[pos]) {
                    return Err(err(format!("expected variable name at offset {}", start)));
                }
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                tokens.push(Token::Variable(chars[start..pos].iter().collect()));
            }
            c if is_ident_start(c) => {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                tokens.push(Token::Identifier(chars[start..pos].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                let start = pos;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
                let is_decimal = pos + 1 < chars.len()
                    && chars[pos] == '.'
                    && chars[pos + 1].is_ascii_digit();
                if is_decimal {
                    pos += 1;
                    while pos < chars.len() && chars[pos].is_ascii_digit() {
                        pos += 1;
                    }
                    let text: String = chars[start..pos].iter().collect();
                    let value = text
                        .parse::<f64>()
                        .map_err(|e| err(format!("invalid number `{}`: {}", text, e)))?;
                    tokens.push(Token::Decimal(value));
                } else {
                    let text: String = chars[start..pos].iter().collect();
                    let value = text
                        .parse::<i64>()
                        .map_err(|e| err(format!("invalid number `{}`: {}", text, e)))?;
                    tokens.push(Token::Integer(value));
                }
            }
            '\'' | '"' => {
                let quote = c;
                pos += 1;
                let mut text = String::new();
                loop {
                    match chars.get(pos) {
                        None => return Err(err("unterminated string literal".to_string())),
                        Some('\\') if pos + 1 < chars.len() => {
                            text.push(chars[pos + 1]);
                            pos += 2;
                        }
                        Some(&ch) if ch == quote => {
                            pos += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            pos += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            '.' => {
                tokens.push(Token::Dot);
                pos += 1;
            }
            '[' => {
                tokens.push(Token::LeftBracket);
                pos += 1;
            }
            ']' => {
                tokens.push(Token::RightBracket);
                pos += 1;
            }
            '(' => {
                tokens.push(Token::LeftParen);
                pos += 1;
            }
            ')' => {
                tokens.push(Token::RightParen);
                pos += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                pos += 1;
            }
            _ => {
                let next = chars.get(pos + 1).copied();
                let (token, width) = match (c, next) {
                    ('=', Some('=')) => (Token::Equal, 2),
                    ('!', Some('=')) => (Token::NotEqual, 2),
                    ('!', _) => (Token::Not, 1),
                    ('<', Some('=')) => (Token::LessThanOrEqual, 2),
                    ('<', _) => (Token::LessThan, 1),
                    ('>', Some('=')) => (Token::GreaterThanOrEqual, 2),
                    ('>', _) => (Token::GreaterThan, 1),
                    ('&', Some('&')) => (Token::And, 2),
                    ('|', Some('|')) => (Token::Or, 2),
                    _ => {
                        return Err(err(format!(
                            "unexpected character `{}` at offset {}",
                            c, pos
                        )))
                    }
                };
                tokens.push(token);
                pos += width;
            }
        }
    }

    Ok(tokens)
}
