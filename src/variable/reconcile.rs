//! Merging a freshly parsed tree into a long-lived one.
//!
//! The merge strategy is chosen from structural shape alone: same child names
//! in the same order means a pairwise recursive merge that keeps every
//! surviving node's identity (and with it the UI's selection and expansion
//! state); any other shape replaces the child list wholesale.

use super::VariableNode;
use itertools::Itertools;
use uuid::Uuid;

/// What a reconciliation pass did to the tree.
#[derive(Debug, Default)]
pub struct UpdateReport {
    /// Nodes whose value differs from the previous stop.
    pub changed: Vec<Uuid>,
    /// Expanded pointers whose pointee content must be re-fetched.
    pub refetch: Vec<Uuid>,
    /// True when any child list was truncated, stolen or extended.
    pub structure_changed: bool,
}

impl VariableNode {
    /// True iff both nodes have equal child counts and identical child names
    /// in order. Values and flags are not compared; this is the sole merge
    /// criterion.
    pub fn same_elements(&self, other: &VariableNode) -> bool {
        self.children.len() == other.children.len()
            && self
                .children
                .iter()
                .zip(&other.children)
                .all(|(a, b)| a.name == b.name)
    }

    /// Merge `fresh` into `self`.
    pub fn update_from(&mut self, fresh: VariableNode, report: &mut UpdateReport) {
        let previous = self.raw_value().to_string();
        let same_shape = self.same_elements(&fresh);
        let VariableNode {
            valid: fresh_valid,
            value: new_value,
            pointer: fresh_pointer,
            children: fresh_children,
            ..
        } = fresh;

        self.valid = fresh_valid;
        self.changed = !previous.is_empty() && new_value != previous;
        if self.changed {
            report.changed.push(self.id);
        }
        self.set_value(new_value);

        if fresh_children.is_empty() {
            self.pointer = fresh_pointer;
            if !self.children.is_empty() {
                if self.pointer {
                    // previously expanded pointee: keep the expansion state
                    // and ask for its content again
                    report.refetch.push(self.id);
                } else {
                    // an aggregate collapsed into a scalar
                    self.children.clear();
                    report.structure_changed = true;
                }
            }
        } else if same_shape {
            for (existing, incoming) in self.children.iter_mut().zip(fresh_children) {
                existing.update_from(incoming, report);
            }
        } else {
            log::debug!(
                "shape change at `{name}`: [{fresh_names}]",
                name = self.name,
                fresh_names = fresh_children.iter().map(|c| c.name.as_str()).join(", ")
            );
            self.children = fresh_children;
            report.structure_changed = true;
        }
    }

    /// Merge only `fresh`'s children into `self`, leaving the node's own
    /// value untouched. Used when pointee content arrives for an expanded
    /// pointer.
    pub fn update_children_from(&mut self, fresh: VariableNode, report: &mut UpdateReport) {
        if self.same_elements(&fresh) {
            for (existing, incoming) in self.children.iter_mut().zip(fresh.children) {
                existing.update_from(incoming, report);
            }
        } else {
            self.children = fresh.children;
            report.structure_changed = true;
        }
    }
}
