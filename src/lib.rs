//! Variable-tree engine for debugger frontends.
//!
//! Turns a debugger backend's textual reply to a `print <expression>` (or a
//! combined `info args`/`info locals`) request into a structured tree of
//! variables, and incrementally reconciles repeated queries against a
//! previously built tree so that UI state (selection, expansion) survives
//! across stop events.
//!
//! The crate is single-threaded and event-driven: commands are created here,
//! transported by the host's backend I/O, and their completions applied back
//! through [`session::VariableSession`]. Truncated or malformed backend
//! output degrades into flagged placeholder nodes or opaque leaf values,
//! never into a failure of the host.

pub mod backend;
pub mod command;
pub mod session;
pub mod variable;

pub use backend::{BackendAdapter, GdbAdapter};
pub use command::locals::BulkLocalsQuery;
pub use command::{CommandOutcome, NodeRef, QueryCommand, QueryKind};
pub use session::{ApplyReport, VariableSession};
pub use variable::render::ValueFormat;
pub use variable::{CSyntax, PathSyntax, VariableNode};
