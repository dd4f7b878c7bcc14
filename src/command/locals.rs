//! Combined frame-variables refresh.
//!
//! One request yields the argument section and the locals section, separated
//! by a fixed delimiter the backend adapter guarantees (`-----` wrapped in
//! newlines). This module splits and sanitizes the two sections; the session
//! reconciles them against the existing top-level child list.

use crate::variable::parser::{ListOutcome, ParseError, ReplyParser};

/// Separator between the arguments and locals sections of a bulk reply.
pub const SECTION_DELIMITER: &str = "-----";

/// A pending combined arguments+locals request.
#[derive(Debug)]
pub struct BulkLocalsQuery {
    command: String,
    seq: u64,
}

impl BulkLocalsQuery {
    pub(crate) fn new(command: impl ToString, seq: u64) -> Self {
        Self {
            command: command.to_string(),
            seq,
        }
    }

    /// The backend command text to send.
    pub fn command_text(&self) -> &str {
        &self.command
    }

    /// Supersede stamp; hand it back with the reply.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

/// Split a bulk reply at the section delimiter. `None` when the delimiter is
/// missing, which callers treat as "no locals available".
pub fn split_sections(reply: &str) -> Option<(String, String)> {
    let delimiter = format!("\n{SECTION_DELIMITER}\n");
    let at = reply.find(&delimiter)?;
    let arguments = clean_section(&reply[..at]);
    let locals = clean_section(&reply[at + delimiter.len()..]);
    Some((arguments, locals))
}

/// Strip control characters that would confuse the lexer: carriage returns,
/// and the line wrap some backends insert right after an aggregate brace.
pub(crate) fn clean_section(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\r' => {}
            '\n' if matches!(out.chars().last(), Some('{' | '}')) => {}
            _ => out.push(c),
        }
    }
    out
}

/// Parse one section into its top-level nodes. Backend phrases meaning "this
/// section is empty" produce an empty list.
pub(crate) fn parse_section(text: &str) -> Result<ListOutcome, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed == "No arguments." || trimmed == "No locals." {
        return Ok(ListOutcome {
            nodes: vec![],
            recovered: false,
        });
    }
    ReplyParser::new(trimmed).parse_node_list()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_sections() {
        let reply = "argc = 1\nargv = 0x7fff0008\n-----\ni = 2\ndone = false";
        let (arguments, locals) = split_sections(reply).expect("delimiter present");
        assert!(arguments.contains("argc"));
        assert!(locals.contains("done"));
        assert!(!locals.contains(SECTION_DELIMITER));
    }

    #[test]
    fn test_missing_delimiter_is_none() {
        assert!(split_sections("argc = 1\nargv = 0x7fff0008").is_none());
    }

    #[test]
    fn test_empty_sections() {
        let (arguments, locals) = split_sections("No arguments.\n-----\nNo locals.")
            .expect("delimiter present");
        assert!(parse_section(&arguments).unwrap().nodes.is_empty());
        assert!(parse_section(&locals).unwrap().nodes.is_empty());
    }

    #[test]
    fn test_clean_section() {
        struct TestCase {
            input: &'static str,
            expect: &'static str,
        }
        let test_cases = [
            TestCase {
                input: "s = {\na = 1}",
                expect: "s = {a = 1}",
            },
            TestCase {
                input: "s = {a = 1}\nb = 2",
                expect: "s = {a = 1}b = 2",
            },
            TestCase {
                input: "a = 1\r\nb = 2",
                expect: "a = 1\nb = 2",
            },
        ];
        for tc in test_cases {
            assert_eq!(clean_section(tc.input), tc.expect, "input: {:?}", tc.input);
        }
    }

    #[test]
    fn test_parse_section_nodes() {
        let out = parse_section("i = 2\ns = {a = 1}\n").unwrap();
        let names: Vec<&str> = out.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["i", "s"]);
    }
}
