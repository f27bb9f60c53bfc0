//! Deck script parser.
//!
//! ```text
//! # comment            // comment
//! shape 3 left = 10, top = 20
//! slide 1 shape g1 text = "Quarterly results"; sync
//! require shape 4
//! delete shape 7
//! ```
//!
//! Statements end at `;` or a newline. `slide N` is optional and defaults to
//! the unit's own slide.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::dispatch::DispatchError;
use crate::document::{ShapeEdit, TextAlign};

/// A parsed statement together with the line it started on.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub line: usize,
    pub kind: StatementKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Set {
        slide: Option<usize>,
        shape: String,
        edits: Vec<ShapeEdit>,
    },
    Delete {
        slide: Option<usize>,
        shape: String,
    },
    Require {
        slide: Option<usize>,
        shape: String,
    },
    Sync,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),
    Equals,
    Comma,
    Semicolon,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("`{w}`"),
            Token::Str(s) => format!("string {s:?}"),
            Token::Equals => "`=`".into(),
            Token::Comma => "`,`".into(),
            Token::Semicolon => "`;`".into(),
        }
    }
}

fn token_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r##"^\s*(?:(?P<comment>#|//)|"(?P<str>(?:[^"\\]|\\.)*)"|(?P<punct>[=,;])|(?P<word>[^\s=,;"#/]+))"##,
        )
        .expect("token pattern compiles")
    })
}

fn error(line: usize, message: impl Into<String>) -> DispatchError {
    DispatchError::Script {
        line,
        message: message.into(),
    }
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn classify(caps: &Captures<'_>) -> Option<Token> {
    if let Some(s) = caps.name("str") {
        return Some(Token::Str(unescape(s.as_str())));
    }
    if let Some(p) = caps.name("punct") {
        return Some(match p.as_str() {
            "=" => Token::Equals,
            "," => Token::Comma,
            _ => Token::Semicolon,
        });
    }
    caps.name("word").map(|w| Token::Word(w.as_str().to_string()))
}

fn tokenize_line(text: &str, line: usize) -> Result<Vec<Token>, DispatchError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    loop {
        if rest.trim().is_empty() {
            return Ok(tokens);
        }
        let Some(caps) = token_pattern().captures(rest) else {
            let trimmed = rest.trim_start();
            return Err(if trimmed.starts_with('"') {
                error(line, "unterminated string literal")
            } else {
                let found = trimmed.chars().next().unwrap_or(' ');
                error(line, format!("unexpected character `{found}`"))
            });
        };
        if caps.name("comment").is_some() {
            return Ok(tokens);
        }
        if let Some(token) = classify(&caps) {
            tokens.push(token);
        }
        rest = &rest[caps.get(0).map_or(rest.len(), |m| m.end())..];
    }
}

/// Parse a whole fragment. Nothing is executed if any statement is malformed.
pub fn parse(body: &str) -> Result<Vec<Statement>, DispatchError> {
    let mut statements = Vec::new();
    for (index, text) in body.lines().enumerate() {
        let line = index + 1;
        let tokens = tokenize_line(text, line)?;
        for group in tokens.split(|t| *t == Token::Semicolon) {
            if group.is_empty() {
                continue;
            }
            let kind = Cursor::new(group, line).statement()?;
            statements.push(Statement { line, kind });
        }
    }
    if statements.is_empty() {
        return Err(error(1, "no statements"));
    }
    Ok(statements)
}

struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
}

impl<'a> Cursor<'a> {
    fn new(tokens: &'a [Token], line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'a Token, DispatchError> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| error(self.line, "unexpected end of statement"))?;
        self.pos += 1;
        Ok(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(w)) if w.eq_ignore_ascii_case(keyword))
    }

    fn keyword(&mut self, keyword: &str) -> Result<(), DispatchError> {
        match self.next()? {
            Token::Word(w) if w.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(error(
                self.line,
                format!("expected `{keyword}`, found {}", other.describe()),
            )),
        }
    }

    fn finish(&self) -> Result<(), DispatchError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(error(
                self.line,
                format!("unexpected {} after statement", token.describe()),
            )),
        }
    }

    fn statement(mut self) -> Result<StatementKind, DispatchError> {
        let kind = if self.peek_keyword("sync") {
            self.pos += 1;
            StatementKind::Sync
        } else if self.peek_keyword("delete") {
            self.pos += 1;
            let (slide, shape) = self.target()?;
            StatementKind::Delete { slide, shape }
        } else if self.peek_keyword("require") {
            self.pos += 1;
            let (slide, shape) = self.target()?;
            StatementKind::Require { slide, shape }
        } else {
            let (slide, shape) = self.target()?;
            let mut edits = vec![self.assignment()?];
            while self.peek() == Some(&Token::Comma) {
                self.pos += 1;
                edits.push(self.assignment()?);
            }
            StatementKind::Set {
                slide,
                shape,
                edits,
            }
        };
        self.finish()?;
        Ok(kind)
    }

    /// `[slide N] shape <id>`
    fn target(&mut self) -> Result<(Option<usize>, String), DispatchError> {
        let slide = if self.peek_keyword("slide") {
            self.pos += 1;
            Some(self.index()?)
        } else {
            None
        };
        self.keyword("shape")?;
        let shape = match self.next()? {
            Token::Word(w) | Token::Str(w) => w.clone(),
            other => {
                return Err(error(
                    self.line,
                    format!("expected a shape id, found {}", other.describe()),
                ))
            }
        };
        Ok((slide, shape))
    }

    fn index(&mut self) -> Result<usize, DispatchError> {
        match self.next()? {
            Token::Word(w) => w
                .parse()
                .map_err(|_| error(self.line, format!("`{w}` is not a slide index"))),
            other => Err(error(
                self.line,
                format!("expected a slide index, found {}", other.describe()),
            )),
        }
    }

    fn assignment(&mut self) -> Result<ShapeEdit, DispatchError> {
        let property = match self.next()? {
            Token::Word(w) => w.to_ascii_lowercase(),
            other => {
                return Err(error(
                    self.line,
                    format!("expected a property name, found {}", other.describe()),
                ))
            }
        };
        match self.next()? {
            Token::Equals => {}
            other => {
                return Err(error(
                    self.line,
                    format!("expected `=` after `{property}`, found {}", other.describe()),
                ))
            }
        }
        let value = self.next()?;
        let line = self.line;

        let number = || -> Result<f64, DispatchError> {
            match value {
                Token::Word(w) => w
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .ok_or_else(|| error(line, format!("`{property}` needs a number, got `{w}`"))),
                other => Err(error(
                    line,
                    format!("`{property}` needs a number, got {}", other.describe()),
                )),
            }
        };
        let string = || -> Result<String, DispatchError> {
            match value {
                Token::Word(s) | Token::Str(s) => Ok(s.clone()),
                other => Err(error(
                    line,
                    format!("`{property}` needs a string, got {}", other.describe()),
                )),
            }
        };
        let boolean = || -> Result<bool, DispatchError> {
            match value {
                Token::Word(w) if w.eq_ignore_ascii_case("true") => Ok(true),
                Token::Word(w) if w.eq_ignore_ascii_case("false") => Ok(false),
                other => Err(error(
                    line,
                    format!("`{property}` needs true or false, got {}", other.describe()),
                )),
            }
        };

        let edit = match property.as_str() {
            "left" => ShapeEdit::Left(number()?),
            "top" => ShapeEdit::Top(number()?),
            "width" => ShapeEdit::Width(number()?),
            "height" => ShapeEdit::Height(number()?),
            "font_size" => ShapeEdit::FontSize(number()?),
            "name" => ShapeEdit::Name(string()?),
            "text" => ShapeEdit::Text(string()?),
            "alt_text" => ShapeEdit::AltText(string()?),
            "font_name" => ShapeEdit::FontName(string()?),
            "bold" => ShapeEdit::Bold(boolean()?),
            "italic" => ShapeEdit::Italic(boolean()?),
            "text_align" => {
                ShapeEdit::TextAlign(TextAlign::from_str(&string()?).map_err(|e| error(line, e))?)
            }
            other => return Err(error(line, format!("unknown property `{other}`"))),
        };
        Ok(edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(body: &str) -> Vec<StatementKind> {
        parse(body).unwrap().into_iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_assignment_list() {
        assert_eq!(
            kinds("shape 3 left = 10, top = -2.5, bold = true"),
            vec![StatementKind::Set {
                slide: None,
                shape: "3".into(),
                edits: vec![
                    ShapeEdit::Left(10.0),
                    ShapeEdit::Top(-2.5),
                    ShapeEdit::Bold(true)
                ],
            }]
        );
    }

    #[test]
    fn test_separators_and_comments() {
        let body = "# move the title\nslide 1 shape t1 text = \"Hi; there\"; sync // flush\n\n require shape 4";
        let statements = parse(body).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[0].kind,
            StatementKind::Set {
                slide: Some(1),
                shape: "t1".into(),
                edits: vec![ShapeEdit::Text("Hi; there".into())],
            }
        );
        assert_eq!(statements[0].line, 2);
        assert_eq!(statements[1].kind, StatementKind::Sync);
        assert_eq!(
            statements[2],
            Statement {
                line: 4,
                kind: StatementKind::Require {
                    slide: None,
                    shape: "4".into()
                }
            }
        );
    }

    #[test]
    fn test_hash_and_slash_inside_strings_are_literal() {
        assert_eq!(
            kinds("shape 1 text = \"#1 item\", name = \"a/b\" # trailing\nshape 2 left = 4// note"),
            vec![
                StatementKind::Set {
                    slide: None,
                    shape: "1".into(),
                    edits: vec![
                        ShapeEdit::Text("#1 item".into()),
                        ShapeEdit::Name("a/b".into())
                    ],
                },
                StatementKind::Set {
                    slide: None,
                    shape: "2".into(),
                    edits: vec![ShapeEdit::Left(4.0)],
                },
            ]
        );
    }

    #[test]
    fn test_delete_and_text_align() {
        assert_eq!(
            kinds("DELETE slide 2 shape 9\nshape 1 text_align = center"),
            vec![
                StatementKind::Delete {
                    slide: Some(2),
                    shape: "9".into()
                },
                StatementKind::Set {
                    slide: None,
                    shape: "1".into(),
                    edits: vec![ShapeEdit::TextAlign(TextAlign::Center)],
                },
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"shape 1 text = "say \"hi\"\nbye""#),
            vec![StatementKind::Set {
                slide: None,
                shape: "1".into(),
                edits: vec![ShapeEdit::Text("say \"hi\"\nbye".into())],
            }]
        );
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let cases = [
            ("shape 1 left = 1\nshape 2 colour = red", 2, "unknown property"),
            ("sync\n\nshape 1 width = wide", 3, "needs a number"),
            ("shape 1 text = \"open", 1, "unterminated"),
            ("shape 1 left 4", 1, "expected `=`"),
            ("slide x shape 1 left = 1", 1, "not a slide index"),
            ("sync now", 1, "after statement"),
            ("shape 1 bold = yes", 1, "true or false"),
            ("shape 1 text_align = sideways", 1, "unknown text alignment"),
            ("shape 1 left = 1 / 2", 1, "unexpected character"),
        ];
        for (body, line, needle) in cases {
            match parse(body) {
                Err(DispatchError::Script { line: l, message }) => {
                    assert_eq!(l, line, "{body}");
                    assert!(message.contains(needle), "{body}: {message}");
                }
                other => panic!("expected script error for {body:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_comment_only_fragment_is_rejected() {
        assert!(matches!(
            parse("# nothing to do\n// really"),
            Err(DispatchError::Script { .. })
        ));
    }
}
