//! Long-lived owner of the variable trees.
//!
//! One session per debugging session: it owns the frame's top-level nodes
//! plus one root per watch expression, issues refresh commands, and applies
//! their outcomes. Everything runs on the caller's thread; the only
//! suspension point (awaiting the backend reply) belongs to the I/O
//! collaborator that transports [`QueryCommand`]s.

use crate::backend::BackendAdapter;
use crate::command::locals::{self, BulkLocalsQuery};
use crate::command::{CommandOutcome, NodeRef, QueryCommand, QueryKind};
use crate::variable::reconcile::UpdateReport;
use crate::variable::render::ValueFormat;
use crate::variable::{PathSyntax, VariableNode};
use indexmap::IndexMap;
use std::collections::HashMap;
use uuid::Uuid;

/// What applying one completion did to the tree.
#[derive(Debug, Default)]
pub struct ApplyReport {
    /// Nodes whose value differs from the previous stop.
    pub changed: Vec<Uuid>,
    /// Nodes that need an individual follow-up query (expanded pointees,
    /// reference values).
    pub refetch: Vec<Uuid>,
    pub structure_changed: bool,
    /// True when the completion had nowhere to land (superseded command or
    /// destroyed node) and the tree was left untouched.
    pub absorbed: bool,
}

impl ApplyReport {
    fn absorbed() -> Self {
        Self {
            absorbed: true,
            ..Self::default()
        }
    }
}

impl From<UpdateReport> for ApplyReport {
    fn from(report: UpdateReport) -> Self {
        Self {
            changed: report.changed,
            refetch: report.refetch,
            structure_changed: report.structure_changed,
            absorbed: false,
        }
    }
}

pub struct VariableSession {
    adapter: Box<dyn BackendAdapter>,
    syntax: Box<dyn PathSyntax>,
    /// Top-level nodes of the selected stack frame, arguments first.
    frame: Vec<VariableNode>,
    /// One root per watch expression, in display order.
    watches: IndexMap<String, VariableNode>,
    /// Latest outstanding stamp per target node; an older completion for the
    /// same node is superseded and silently absorbed.
    pending: HashMap<Uuid, u64>,
    pending_frame: Option<u64>,
    next_seq: u64,
}

impl VariableSession {
    pub fn new(adapter: Box<dyn BackendAdapter>, syntax: Box<dyn PathSyntax>) -> Self {
        Self {
            adapter,
            syntax,
            frame: vec![],
            watches: IndexMap::new(),
            pending: HashMap::new(),
            pending_frame: None,
            next_seq: 0,
        }
    }

    /// One-time backend setup commands (output format normalization and the
    /// combined frame-variables command).
    pub fn init_commands(&self) -> Vec<String> {
        self.adapter.init_commands()
    }

    pub fn frame(&self) -> &[VariableNode] {
        &self.frame
    }

    pub fn watches(&self) -> impl Iterator<Item = &VariableNode> {
        self.watches.values()
    }

    /// Register a watch root for `expr`. The node is invalid until its first
    /// refresh completes.
    pub fn add_watch(&mut self, expr: &str) -> Uuid {
        let mut node = VariableNode::new(expr);
        node.valid = false;
        let id = node.id();
        self.watches.insert(expr.to_string(), node);
        id
    }

    /// Drop a watch root. Any in-flight completion for a node underneath it
    /// becomes a no-op.
    pub fn remove_watch(&mut self, expr: &str) -> bool {
        self.watches.shift_remove(expr).is_some()
    }

    /// Drop the frame trees (frame switch, debuggee exit).
    pub fn clear_frame(&mut self) {
        self.frame.clear();
    }

    pub fn find(&self, id: Uuid) -> Option<&VariableNode> {
        self.frame
            .iter()
            .find_map(|n| n.find(id))
            .or_else(|| self.watches.values().find_map(|n| n.find(id)))
    }

    fn find_mut(&mut self, id: Uuid) -> Option<&mut VariableNode> {
        let in_frame = self.frame.iter().any(|n| n.find(id).is_some());
        if in_frame {
            return self.frame.iter_mut().find_map(|n| n.find_mut(id));
        }
        self.watches.values_mut().find_map(|n| n.find_mut(id))
    }

    /// Backend expression designating node `id`.
    pub fn path_of(&self, id: Uuid) -> Option<String> {
        self.frame
            .iter()
            .find_map(|n| n.path_of(id, self.syntax.as_ref()))
            .or_else(|| {
                self.watches
                    .values()
                    .find_map(|n| n.path_of(id, self.syntax.as_ref()))
            })
    }

    /// Issue a value refresh for node `id`. Supersedes any outstanding
    /// command for the same node; only the latest result is ever applied.
    pub fn refresh(&mut self, id: Uuid) -> Option<QueryCommand> {
        let path = self.path_of(id)?;
        let seq = self.stamp(id);
        let node = self.find_mut(id)?;
        node.valid = false;
        let name = node.name.clone();
        Some(QueryCommand::new(
            NodeRef { node: id, seq },
            QueryKind::Value,
            name,
            self.adapter.print_command(&path),
        ))
    }

    /// Issue a pointee fetch for the pointer node `id` (lazy expansion, or
    /// re-fetch after the pointer moved).
    pub fn expand(&mut self, id: Uuid) -> Option<QueryCommand> {
        let path = self.path_of(id)?;
        let node = self.find(id)?;
        if !node.pointer {
            return None;
        }
        let name = node.name.clone();
        let seq = self.stamp(id);
        let deref = self.syntax.deref(&path);
        Some(QueryCommand::new(
            NodeRef { node: id, seq },
            QueryKind::Deref,
            name,
            self.adapter.print_command(&deref),
        ))
    }

    /// Issue the combined arguments+locals refresh for the selected frame.
    pub fn refresh_frame(&mut self) -> BulkLocalsQuery {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.pending_frame = Some(seq);
        for node in &mut self.frame {
            node.valid = false;
        }
        BulkLocalsQuery::new(self.adapter.frame_vars_command(), seq)
    }

    /// Apply a single-expression completion. Superseded completions and
    /// completions whose node no longer exists are absorbed without touching
    /// the tree.
    pub fn apply(&mut self, outcome: CommandOutcome) -> ApplyReport {
        let target = outcome.target();
        if self.pending.get(&target.node) != Some(&target.seq) {
            log::debug!("superseded completion for {id} dropped", id = target.node);
            return ApplyReport::absorbed();
        }
        self.pending.remove(&target.node);
        let Some(node) = self.find_mut(target.node) else {
            log::debug!("completion for destroyed node {id} dropped", id = target.node);
            return ApplyReport::absorbed();
        };

        let mut report = UpdateReport::default();
        match outcome {
            CommandOutcome::Updated {
                kind: QueryKind::Value,
                tree,
                ..
            } => node.update_from(tree, &mut report),
            CommandOutcome::Updated {
                kind: QueryKind::Deref,
                tree,
                ..
            } => node.update_children_from(tree, &mut report),
            CommandOutcome::Opaque {
                kind: QueryKind::Value,
                text,
                ..
            } => {
                let fresh = VariableNode::leaf(node.name.clone(), text, false);
                node.update_from(fresh, &mut report);
            }
            CommandOutcome::Opaque {
                kind: QueryKind::Deref,
                ..
            } => {
                // pointee content unavailable; the pointer node itself is
                // left as-is
                log::warn!("pointee reply for `{name}` not parseable", name = node.name);
            }
            CommandOutcome::Failed { message, .. } => {
                let mut fresh = VariableNode::leaf(node.name.clone(), message, false);
                fresh.valid = false;
                node.update_from(fresh, &mut report);
            }
        }
        report.into()
    }

    /// Apply a bulk frame reply: split sections, reconcile the top-level
    /// list by longest common name prefix, reuse surviving nodes.
    pub fn apply_frame(&mut self, seq: u64, reply: &str) -> ApplyReport {
        if self.pending_frame != Some(seq) {
            return ApplyReport::absorbed();
        }
        self.pending_frame = None;

        let Some((arguments, local_vars)) = locals::split_sections(reply) else {
            log::warn!("bulk reply without section delimiter, treating as no locals");
            let had_nodes = !self.frame.is_empty();
            self.frame.clear();
            return ApplyReport {
                structure_changed: had_nodes,
                ..ApplyReport::default()
            };
        };

        let mut fresh: Vec<VariableNode> = vec![];
        for section in [arguments, local_vars] {
            match locals::parse_section(&section) {
                Ok(out) => fresh.extend(out.nodes),
                Err(err) => log::warn!("frame section not parseable: {err}"),
            }
        }

        let mut report = UpdateReport::default();
        // First name mismatch truncates the remembered suffix; everything
        // past the new list's end is out of scope.
        let mismatch = self
            .frame
            .iter()
            .zip(&fresh)
            .position(|(existing, incoming)| existing.name != incoming.name);
        let keep = mismatch.unwrap_or(usize::MAX).min(fresh.len());
        if keep < self.frame.len() {
            self.frame.truncate(keep);
            report.structure_changed = true;
        }

        for (index, incoming) in fresh.into_iter().enumerate() {
            if index < self.frame.len() {
                self.frame[index].update_from(incoming, &mut report);
            } else {
                report.structure_changed = true;
                self.frame.push(incoming);
            }
            let node = &self.frame[index];
            // reference values carry only an address here; their referent
            // must be queried individually
            if node.children.is_empty() && node.raw_value().contains("@0x") {
                report.refetch.push(node.id());
            }
        }
        report.into()
    }

    /// Change the display base of a leaf value without re-querying.
    pub fn set_format(&mut self, id: Uuid, format: ValueFormat) -> bool {
        match self.find_mut(id) {
            Some(node) => {
                node.set_format(format);
                true
            }
            None => false,
        }
    }

    fn stamp(&mut self, id: Uuid) -> u64 {
        self.next_seq += 1;
        self.pending.insert(id, self.next_seq);
        self.next_seq
    }
}
