//! Tokenizer for directive markers and variables.

use std::sync::LazyLock;

use regex::Regex;

use super::error::BlockKind;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"<(?P<tag>OPEN|CLOSE|LOOPOPEN|LOOPCLOSE):(?P<key>[A-Za-z0-9_.\-]+)>|\{(?P<var>[A-Za-z0-9_\-]+(?:\.[A-Za-z0-9_\-]+)*)\}",
    )
    .unwrap()
});

/// What a token means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind<'s> {
    Text(&'s str),
    Variable(&'s str),
    Open { kind: BlockKind, key: &'s str },
    Close { kind: BlockKind, key: &'s str },
}

/// A token and its byte offset in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'s> {
    pub kind: TokenKind<'s>,
    pub offset: usize,
    pub len: usize,
}

/// Split `source` into literal text and marker tokens.
///
/// Anything that is not a well-formed marker is text, so the lexer never fails.
pub fn tokenize(source: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut cursor = 0;

    for caps in MARKER.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > cursor {
            tokens.push(Token {
                kind: TokenKind::Text(&source[cursor..whole.start()]),
                offset: cursor,
                len: whole.start() - cursor,
            });
        }

        let kind = if let Some(var) = caps.name("var") {
            TokenKind::Variable(var.as_str())
        } else {
            let key = caps.name("key").map_or("", |m| m.as_str());
            match caps.name("tag").map(|m| m.as_str()) {
                Some("OPEN") => TokenKind::Open {
                    kind: BlockKind::If,
                    key,
                },
                Some("CLOSE") => TokenKind::Close {
                    kind: BlockKind::If,
                    key,
                },
                Some("LOOPOPEN") => TokenKind::Open {
                    kind: BlockKind::Loop,
                    key,
                },
                _ => TokenKind::Close {
                    kind: BlockKind::Loop,
                    key,
                },
            }
        };
        tokens.push(Token {
            kind,
            offset: whole.start(),
            len: whole.len(),
        });
        cursor = whole.end();
    }

    if cursor < source.len() {
        tokens.push(Token {
            kind: TokenKind::Text(&source[cursor..]),
            offset: cursor,
            len: source.len() - cursor,
        });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_markers_from_text() {
        let tokens = tokenize("a<OPEN:x>{y.z}<CLOSE:x>b");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Text("a"),
                TokenKind::Open {
                    kind: BlockKind::If,
                    key: "x",
                },
                TokenKind::Variable("y.z"),
                TokenKind::Close {
                    kind: BlockKind::If,
                    key: "x",
                },
                TokenKind::Text("b"),
            ]
        );
        assert_eq!(tokens[2].offset, 9);
    }

    #[test]
    fn malformed_markers_are_text() {
        let tokens = tokenize("{not a var} <OPEN:> [b]{/b}");
        assert!(tokens.iter().all(|t| matches!(t.kind, TokenKind::Text(_))));
    }

    #[test]
    fn loop_markers() {
        let tokens = tokenize("<LOOPOPEN:files><LOOPCLOSE:files>");
        assert_eq!(
            tokens[0].kind,
            TokenKind::Open {
                kind: BlockKind::Loop,
                key: "files",
            }
        );
        assert_eq!(
            tokens[1].kind,
            TokenKind::Close {
                kind: BlockKind::Loop,
                key: "files",
            }
        );
    }
}
