//! Recursive-descent parser over backend reply tokens.
//!
//! Accepted shapes: a bare brace group (anonymous aggregate), a flat list of
//! `name = value` nodes (the `info locals` shape), or a single node. Values
//! nest without bound. The parser owns the recovery logic for output that a
//! backend truncated mid-structure.

use super::lexer::{Lexer, Token, TokenKind};
use super::VariableNode;
use std::collections::VecDeque;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unexpected `{found}` at offset {at}")]
    UnexpectedToken { found: String, at: usize },
}

/// Result of parsing a single reply.
pub struct ParseOutcome {
    pub root: VariableNode,
    /// True if the input ended inside an open group and closes were
    /// synthesized.
    pub recovered: bool,
    /// How many closes were synthesized during recovery.
    pub synthesized_closes: usize,
}

/// Result of parsing a flat node list (one `info args`/`info locals`
/// section).
pub struct ListOutcome {
    pub nodes: Vec<VariableNode>,
    pub recovered: bool,
}

struct GroupContent {
    children: Vec<VariableNode>,
    /// Placeholder text when the group body was a "no content" marker.
    placeholder: Option<String>,
}

pub struct ReplyParser<'a> {
    lexer: Lexer<'a>,
    buf: VecDeque<Token<'a>>,
    recovered: bool,
    synthesized_closes: usize,
    error_emitted: bool,
}

impl<'a> ReplyParser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            buf: VecDeque::new(),
            recovered: false,
            synthesized_closes: 0,
            error_emitted: false,
        }
    }

    /// Parse a complete single-expression reply. `name` names the root when
    /// the reply is a bare aggregate or a multi-node list.
    pub fn parse_reply(mut self, name: &str) -> Result<ParseOutcome, ParseError> {
        let root = if self.peek(0).kind == TokenKind::GroupOpen {
            let content = self.parse_group()?;
            node_from_group(name, content)
        } else {
            let mut nodes = self.parse_top_list()?;
            match nodes.len() {
                0 => return Err(ParseError::Empty),
                1 => nodes.swap_remove(0),
                _ => VariableNode::with_children(name, nodes),
            }
        };
        let trailing = self.peek(0);
        if trailing.kind != TokenKind::End {
            return Err(unexpected(&trailing));
        }
        if self.recovered {
            log::warn!(
                "truncated reply, {closes} close(s) synthesized",
                closes = self.synthesized_closes
            );
        }
        Ok(ParseOutcome {
            root,
            recovered: self.recovered,
            synthesized_closes: self.synthesized_closes,
        })
    }

    /// Parse a flat `name = value` list.
    pub fn parse_node_list(mut self) -> Result<ListOutcome, ParseError> {
        let nodes = self.parse_top_list()?;
        if self.recovered {
            log::warn!(
                "truncated list reply, {closes} close(s) synthesized",
                closes = self.synthesized_closes
            );
        }
        Ok(ListOutcome {
            nodes,
            recovered: self.recovered,
        })
    }

    fn peek(&mut self, n: usize) -> Token<'a> {
        while self.buf.len() <= n {
            let tok = self.lexer.next_token();
            self.buf.push_back(tok);
        }
        self.buf[n]
    }

    fn bump(&mut self) -> Token<'a> {
        self.peek(0);
        self.buf.pop_front().unwrap_or(Token {
            kind: TokenKind::End,
            text: "",
            start: self.lexer.source().len(),
        })
    }

    fn parse_top_list(&mut self) -> Result<Vec<VariableNode>, ParseError> {
        let mut nodes = vec![];
        loop {
            match self.peek(0).kind {
                TokenKind::End => break,
                TokenKind::Comma => {
                    self.bump();
                }
                _ => nodes.push(self.parse_top_node()?),
            }
        }
        Ok(nodes)
    }

    fn parse_top_node(&mut self) -> Result<VariableNode, ParseError> {
        if self.peek(0).kind == TokenKind::Static {
            self.bump();
        }
        let tok = self.peek(0);
        match tok.kind {
            TokenKind::Ident | TokenKind::AngleLabel => {
                let name = self.bump();
                if self.peek(0).kind == TokenKind::Eq {
                    self.bump();
                    self.parse_value(name.text)
                } else {
                    // a name alone is a node with an elided value
                    Ok(VariableNode::new(name.text))
                }
            }
            _ => Err(unexpected(&tok)),
        }
    }

    fn parse_value(&mut self, name: &str) -> Result<VariableNode, ParseError> {
        if self.peek(0).kind == TokenKind::GroupOpen {
            let content = self.parse_group()?;
            return Ok(node_from_group(name, content));
        }
        self.parse_leaf(name)
    }

    fn parse_group(&mut self) -> Result<GroupContent, ParseError> {
        let open = self.bump();
        debug_assert_eq!(open.kind, TokenKind::GroupOpen);

        let mut children: Vec<VariableNode> = vec![];
        let mut placeholder = None;
        let mut has_named_member = false;
        loop {
            let tok = self.peek(0);
            match tok.kind {
                TokenKind::GroupClose => {
                    self.bump();
                    break;
                }
                TokenKind::End => {
                    // The backend stopped emitting mid-structure. Synthesize
                    // the close; the deepest open group gets its last child
                    // invalidated and a single error child appended.
                    self.recovered = true;
                    self.synthesized_closes += 1;
                    if !self.error_emitted {
                        self.error_emitted = true;
                        if let Some(last) = children.last_mut() {
                            last.valid = false;
                        }
                        children.push(VariableNode::error_node());
                    }
                    break;
                }
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::Ellipsis => {
                    self.bump();
                    children.push(VariableNode::elided());
                }
                TokenKind::NoDataFields
                    if children.is_empty()
                        && matches!(
                            self.peek(1).kind,
                            TokenKind::GroupClose | TokenKind::End
                        ) =>
                {
                    let marker = self.bump();
                    placeholder = Some(marker.text.to_string());
                }
                TokenKind::Static => {
                    self.bump();
                    has_named_member = true;
                    children.push(self.parse_member()?);
                }
                TokenKind::Ident | TokenKind::AngleLabel
                    if self.peek(1).kind == TokenKind::Eq =>
                {
                    has_named_member = true;
                    children.push(self.parse_member()?);
                }
                TokenKind::BracketEq => {
                    // indexed array entry, printed index kept as the name
                    let name = self.bump();
                    children.push(self.parse_value(name.text)?);
                }
                TokenKind::GroupOpen => {
                    // unlabelled nested aggregate; named below
                    children.push(self.parse_value("")?);
                }
                kind if starts_value(kind) => {
                    children.push(self.parse_leaf("")?);
                }
                _ => return Err(unexpected(&tok)),
            }
        }
        // Unlabelled elements of an all-unlabelled group are array elements,
        // numbered in appearance order. Next to named members they are
        // anonymous aggregate members instead and stay nameless.
        if !has_named_member {
            let mut index = 0usize;
            for child in children.iter_mut() {
                if child.name.is_empty() {
                    child.name = format!("[{index}]");
                    index += 1;
                }
            }
        }
        Ok(GroupContent {
            children,
            placeholder,
        })
    }

    fn parse_member(&mut self) -> Result<VariableNode, ParseError> {
        let name = self.bump();
        if !matches!(name.kind, TokenKind::Ident | TokenKind::AngleLabel) {
            return Err(unexpected(&name));
        }
        let eq = self.bump();
        if eq.kind != TokenKind::Eq {
            return Err(unexpected(&eq));
        }
        self.parse_value(name.text)
    }

    /// Scan one leaf value: the source span from its first to last value
    /// token. Cast prefixes, reference addresses, char/string annotations,
    /// repeat runs and trailing `<...>` aliases all fold into the raw text.
    fn parse_leaf(&mut self, name: &str) -> Result<VariableNode, ParseError> {
        let first = self.peek(0);
        if !starts_value(first.kind) {
            // `name =` with nothing behind it (value elided or truncated)
            if matches!(
                first.kind,
                TokenKind::End | TokenKind::Comma | TokenKind::GroupClose
            ) {
                return Ok(VariableNode::new(name));
            }
            return Err(unexpected(&first));
        }

        let mut tokens: Vec<Token<'a>> = vec![];
        loop {
            let tok = self.peek(0);
            let continues = match tok.kind {
                TokenKind::Int
                | TokenKind::Hex
                | TokenKind::Float
                | TokenKind::CharLit
                | TokenKind::StrLit
                | TokenKind::ParenExpr
                | TokenKind::RefAddr
                | TokenKind::Colon
                | TokenKind::Repeats
                | TokenKind::AngleLabel
                | TokenKind::EmptySummary
                | TokenKind::NoDataFields => true,
                // an identifier followed by `=` is the next member's name
                TokenKind::Ident => self.peek(1).kind != TokenKind::Eq,
                _ => false,
            };
            if !continues {
                break;
            }
            tokens.push(self.bump());
        }

        let src = self.lexer.source();
        let raw = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => &src[first.start..last.end()],
            _ => "",
        };
        Ok(VariableNode::leaf(name, raw, detect_pointer(&tokens)))
    }
}

fn node_from_group(name: &str, content: GroupContent) -> VariableNode {
    match content.placeholder {
        Some(text) if content.children.is_empty() => VariableNode::leaf(name, text, false),
        _ => VariableNode::with_children(name, content.children),
    }
}

fn starts_value(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Int
            | TokenKind::Hex
            | TokenKind::Float
            | TokenKind::CharLit
            | TokenKind::StrLit
            | TokenKind::Ident
            | TokenKind::ParenExpr
            | TokenKind::RefAddr
            | TokenKind::EmptySummary
            | TokenKind::NoDataFields
            | TokenKind::AngleLabel
    )
}

/// A leaf looks like a non-null pointer when it starts with a nonzero hex
/// address, optionally behind a `(... *)` cast.
fn detect_pointer(tokens: &[Token]) -> bool {
    let mut it = tokens.iter();
    let Some(first) = it.next() else {
        return false;
    };
    match first.kind {
        TokenKind::Hex => nonzero_hex(first.text),
        TokenKind::ParenExpr => {
            let cast = first.text.trim_end_matches(')').trim_end();
            cast.ends_with('*')
                && matches!(it.next(), Some(tok) if tok.kind == TokenKind::Hex && nonzero_hex(tok.text))
        }
        _ => false,
    }
}

fn nonzero_hex(text: &str) -> bool {
    text.trim_start_matches("0x")
        .trim_start_matches("0X")
        .bytes()
        .any(|b| b != b'0')
}

fn unexpected(tok: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        found: if tok.kind == TokenKind::End {
            "<end of input>".to_string()
        } else {
            tok.text.to_string()
        },
        at: tok.start,
    }
}
