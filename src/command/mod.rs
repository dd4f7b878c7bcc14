//! Asynchronous units of work against the debugger backend.
//!
//! A command is created for a target node, handed to the backend I/O
//! collaborator, and completed exactly once with either the reply text or a
//! failure message. Completion produces a closed set of outcome variants;
//! applying an outcome to the tree is the session's job, so a completion
//! whose target died in the meantime simply has nowhere to land.

pub mod locals;

use crate::variable::parser::ReplyParser;
use crate::variable::VariableNode;
use uuid::Uuid;

/// What a command asks of the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Refresh the node's own value.
    Value,
    /// Fetch pointee content for an expanded pointer; the node's own value
    /// stays untouched.
    Deref,
}

/// Weak designation of a command's target: the node id plus the session's
/// supersede stamp. An outcome whose stamp is stale, or whose node is gone,
/// is silently absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub node: Uuid,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandState {
    Created,
    Sent,
}

/// A single pending `print <expression>` request.
#[derive(Debug)]
pub struct QueryCommand {
    target: NodeRef,
    kind: QueryKind,
    display_name: String,
    command: String,
    state: CommandState,
}

impl QueryCommand {
    pub(crate) fn new(
        target: NodeRef,
        kind: QueryKind,
        display_name: impl ToString,
        command: impl ToString,
    ) -> Self {
        Self {
            target,
            kind,
            display_name: display_name.to_string(),
            command: command.to_string(),
            state: CommandState::Created,
        }
    }

    /// The backend command text to send.
    pub fn command_text(&self) -> &str {
        &self.command
    }

    pub fn target(&self) -> NodeRef {
        self.target
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn mark_sent(&mut self) {
        self.state = CommandState::Sent;
    }

    pub fn is_sent(&self) -> bool {
        self.state == CommandState::Sent
    }

    /// Terminal transition: the backend answered. Parses the reply; a reply
    /// the grammar does not accept degrades to an opaque leaf value.
    pub fn complete(self, reply: &str) -> CommandOutcome {
        match ReplyParser::new(reply).parse_reply(&self.display_name) {
            Ok(outcome) => {
                let mut tree = outcome.root;
                // single-expression replies arrive under a `$N` value-history
                // name; the tree is delivered under the target's name
                tree.name = self.display_name;
                CommandOutcome::Updated {
                    target: self.target,
                    kind: self.kind,
                    tree,
                    recovered: outcome.recovered,
                }
            }
            Err(err) => {
                log::debug!(
                    "reply for `{name}` not parseable ({err}), kept as opaque text",
                    name = self.display_name
                );
                CommandOutcome::Opaque {
                    target: self.target,
                    kind: self.kind,
                    text: reply.trim().to_string(),
                }
            }
        }
    }

    /// Terminal transition: the backend reported an evaluation error.
    pub fn fail(self, message: impl ToString) -> CommandOutcome {
        CommandOutcome::Failed {
            target: self.target,
            message: message.to_string(),
        }
    }
}

/// The one terminal notification of a command.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The reply parsed into a tree.
    Updated {
        target: NodeRef,
        kind: QueryKind,
        tree: VariableNode,
        recovered: bool,
    },
    /// The reply did not match the grammar; the whole text becomes the
    /// node's value and the pointer flag is cleared.
    Opaque {
        target: NodeRef,
        kind: QueryKind,
        text: String,
    },
    /// The backend failed to evaluate; the message becomes the node's value,
    /// the node turns invalid and loses its pointer flag.
    Failed { target: NodeRef, message: String },
}

impl CommandOutcome {
    pub fn target(&self) -> NodeRef {
        match self {
            CommandOutcome::Updated { target, .. }
            | CommandOutcome::Opaque { target, .. }
            | CommandOutcome::Failed { target, .. } => *target,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn command() -> QueryCommand {
        QueryCommand::new(
            NodeRef {
                node: Uuid::new_v4(),
                seq: 1,
            },
            QueryKind::Value,
            "x",
            "print x",
        )
    }

    #[test]
    fn test_successful_reply_is_parsed_and_renamed() {
        let cmd = command();
        let target = cmd.target();
        match cmd.complete("$3 = {a = 1, b = 2}") {
            CommandOutcome::Updated {
                target: t,
                tree,
                recovered,
                ..
            } => {
                assert_eq!(t, target);
                assert_eq!(tree.name, "x");
                assert_eq!(tree.children.len(), 2);
                assert!(!recovered);
            }
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn test_truncated_reply_is_recovered() {
        match command().complete("$1 = {a = {b = 1") {
            CommandOutcome::Updated { recovered, .. } => assert!(recovered),
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[test]
    fn test_unparseable_reply_degrades_to_opaque_text() {
        match command().complete("No symbol table is loaded.") {
            CommandOutcome::Opaque { text, .. } => {
                assert_eq!(text, "No symbol table is loaded.");
            }
            other => panic!("expected Opaque, got {other:?}"),
        }
    }

    #[test]
    fn test_failure_carries_raw_message() {
        match command().fail("No symbol \"zz\" in current context.") {
            CommandOutcome::Failed { message, .. } => {
                assert_eq!(message, "No symbol \"zz\" in current context.");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn test_sent_state() {
        let mut cmd = command();
        assert!(!cmd.is_sent());
        cmd.mark_sent();
        assert!(cmd.is_sent());
    }
}
