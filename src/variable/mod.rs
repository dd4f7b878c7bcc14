//! Variable tree entities and path computation.

use crate::variable::render::ValueFormat;
use uuid::Uuid;

pub mod lexer;
pub mod parser;
pub mod reconcile;
pub mod render;

/// Display name of the synthetic child appended at a truncation point.
pub const ERROR_NODE_NAME: &str = "<error>";
/// Value of the synthetic child appended at a truncation point.
pub const ERROR_NODE_VALUE: &str = "value truncated";
/// Display name of the synthetic child marking an elided repeated run.
pub const ELIDED_NODE_NAME: &str = "...";

/// A single entry of a variable tree.
///
/// Created by the reply parser or by the reconciler (structural placeholders
/// and error nodes), destroyed with its parent or when the reconciler replaces
/// a subtree. A node exclusively owns its children; child order mirrors the
/// backend's field/array order and is significant.
#[derive(Debug, Clone)]
pub struct VariableNode {
    id: Uuid,
    /// Display name. May be synthetic: an array-index label `[3]`, `...` for
    /// an elided run, or an `<...>` compiler-internal label.
    pub name: String,
    /// The backend's literal text for a leaf value, empty for aggregates.
    pub(crate) value: String,
    /// Parsed text cached before the first display-base conversion.
    pub(crate) original_value: Option<String>,
    pub(crate) format: ValueFormat,
    /// False while a refresh is outstanding or after a failed evaluation.
    pub valid: bool,
    /// True when the last refresh changed the value.
    pub changed: bool,
    /// True if the value looks like a non-null pointer; gates lazy child
    /// fetching.
    pub pointer: bool,
    pub children: Vec<VariableNode>,
}

impl VariableNode {
    /// A valueless node (argument with an elided value, fresh watch root).
    pub fn new(name: impl ToString) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            value: String::default(),
            original_value: None,
            format: ValueFormat::default(),
            valid: true,
            changed: false,
            pointer: false,
            children: vec![],
        }
    }

    pub fn leaf(name: impl ToString, value: impl ToString, pointer: bool) -> Self {
        Self {
            value: value.to_string(),
            pointer,
            ..Self::new(name)
        }
    }

    pub fn with_children(name: impl ToString, children: Vec<VariableNode>) -> Self {
        Self {
            children,
            ..Self::new(name)
        }
    }

    /// The invalid placeholder flagging a truncation point.
    pub(crate) fn error_node() -> Self {
        Self {
            valid: false,
            ..Self::leaf(ERROR_NODE_NAME, ERROR_NODE_VALUE, false)
        }
    }

    /// The synthetic `...` child marking an elided repeated-element run.
    pub(crate) fn elided() -> Self {
        Self::new(ELIDED_NODE_NAME)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current display text of a leaf value (with any base conversion
    /// applied). Empty for aggregates.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The value as originally parsed, regardless of display-base overrides.
    pub fn raw_value(&self) -> &str {
        self.original_value.as_deref().unwrap_or(&self.value)
    }

    pub fn find(&self, id: Uuid) -> Option<&VariableNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut VariableNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// Backend expression for the node `id`, derived by walking ownership
    /// from this root. Anonymous aggregate members and `<...>`-labelled nodes
    /// contribute nothing to the expression.
    pub fn path_of(&self, id: Uuid, syntax: &dyn PathSyntax) -> Option<String> {
        if self.id == id {
            return Some(self.name.clone());
        }
        self.path_of_inner(id, syntax, &self.name, self.pointer)
    }

    fn path_of_inner(
        &self,
        id: Uuid,
        syntax: &dyn PathSyntax,
        base: &str,
        base_is_pointer: bool,
    ) -> Option<String> {
        for child in &self.children {
            let (child_path, child_ptr) = if transparent_in_path(&child.name) {
                (base.to_string(), base_is_pointer)
            } else {
                (syntax.member(base, base_is_pointer, &child.name), child.pointer)
            };
            if child.id == id {
                return Some(child_path);
            }
            if let Some(found) = child.path_of_inner(id, syntax, &child_path, child_ptr) {
                return Some(found);
            }
        }
        None
    }
}

/// True for nodes that are skipped when an expression path is derived:
/// anonymous aggregate members and compiler-internal `<...>` labels.
fn transparent_in_path(name: &str) -> bool {
    name.is_empty() || name.starts_with('<')
}

/// Expression syntax of the debugged language, selected once per session.
pub trait PathSyntax {
    /// Expression accessing the member `child_name` through `parent_path`.
    fn member(&self, parent_path: &str, parent_is_pointer: bool, child_name: &str) -> String;

    /// Expression dereferencing `path`.
    fn deref(&self, path: &str) -> String;
}

/// C-family syntax: `.`/`->` member access, `[i]` indexing, `*` dereference.
#[derive(Debug, Default, Clone, Copy)]
pub struct CSyntax;

impl PathSyntax for CSyntax {
    fn member(&self, parent_path: &str, parent_is_pointer: bool, child_name: &str) -> String {
        if child_name.starts_with('[') {
            return format!("{parent_path}{child_name}");
        }
        // a dereferencing path needs parens before member access
        let base = if parent_path.starts_with('*') {
            format!("({parent_path})")
        } else {
            parent_path.to_string()
        };
        let sep = if parent_is_pointer { "->" } else { "." };
        format!("{base}{sep}{child_name}")
    }

    fn deref(&self, path: &str) -> String {
        format!("*{path}")
    }
}
