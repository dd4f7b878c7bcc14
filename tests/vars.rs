//! End-to-end flows through the public API: command round trips, stop-event
//! reconciliation, truncation recovery and display formatting, driven the
//! way a frontend drives the engine.

use vartree::{
    CSyntax, CommandOutcome, GdbAdapter, ValueFormat, VariableNode, VariableSession,
};

fn session() -> VariableSession {
    VariableSession::new(Box::new(GdbAdapter), Box::new(CSyntax))
}

fn names(nodes: &[VariableNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.name.as_str()).collect()
}

#[test]
fn test_single_step_keeps_ui_state_of_unchanged_structure() {
    let mut session = session();
    let id = session.add_watch("s");

    let cmd = session.refresh(id).expect("watch refresh");
    assert_eq!(cmd.command_text(), "print s");
    session.apply(cmd.complete("$1 = {count = 2, items = {4, 5}, tag = 7 '\\a'}"));

    let (items_id, second_item_id) = {
        let s = session.find(id).expect("root");
        assert_eq!(names(&s.children), vec!["count", "items", "tag"]);
        let items = &s.children[1];
        (items.id(), items.children[1].id())
    };

    // next stop: one array element changed, structure identical
    let cmd = session.refresh(id).expect("re-refresh");
    let report = session.apply(cmd.complete("$2 = {count = 2, items = {4, 9}, tag = 7 '\\a'}"));

    assert_eq!(report.changed, vec![second_item_id]);
    assert!(!report.structure_changed);
    let s = session.find(id).expect("root");
    assert_eq!(s.children[1].id(), items_id, "aggregate node survives");
    let item = &s.children[1].children[1];
    assert_eq!(item.id(), second_item_id, "element node survives");
    assert_eq!(item.value(), "9");
    assert!(item.changed);
}

#[test]
fn test_structure_change_rebuilds_subtree() {
    let mut session = session();
    let id = session.add_watch("v");
    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.complete("$1 = {1, 2, 3}"));
    let old_ids: Vec<_> = session
        .find(id)
        .expect("root")
        .children
        .iter()
        .map(|c| c.id())
        .collect();

    // the vector grew: element names no longer line up pairwise
    let cmd = session.refresh(id).expect("refresh");
    let report = session.apply(cmd.complete("$2 = {1, 2, 3, 4}"));
    assert!(report.structure_changed);
    let children = &session.find(id).expect("root").children;
    assert_eq!(names(children), vec!["[0]", "[1]", "[2]", "[3]"]);
    for child in children {
        assert!(!old_ids.contains(&child.id()), "steal replaces every child");
    }
}

#[test]
fn test_truncated_backend_output_is_flagged_not_fatal() {
    let mut session = session();
    let id = session.add_watch("x");
    let cmd = session.refresh(id).expect("refresh");

    let report = session.apply(cmd.complete("$1 = {a = 1, b = {c = 2"));
    assert!(!report.absorbed);

    let x = session.find(id).expect("root");
    let a = &x.children[0];
    assert!(a.valid);
    let b = &x.children[1];
    assert_eq!(b.children.len(), 2);
    assert!(!b.children[0].valid, "last child before the cut is stale");
    assert_eq!(b.children[1].name, "<error>");
    assert!(!b.children[1].valid);
}

#[test]
fn test_pointer_expansion_and_path_derivation() {
    let mut session = session();
    let id = session.add_watch("list");
    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.complete("$1 = (struct node *) 0x804b318"));

    let cmd = session.expand(id).expect("pointer expands lazily");
    assert_eq!(cmd.command_text(), "print *list");
    session.apply(cmd.complete("$2 = {payload = 42, next = 0x804b400}"));

    let next_id = {
        let list = session.find(id).expect("root");
        assert_eq!(list.value(), "(struct node *) 0x804b318");
        list.children[1].id()
    };
    assert_eq!(session.path_of(next_id).as_deref(), Some("list->next"));

    // the pointee's own pointer member expands one level further
    let cmd = session.expand(next_id).expect("nested pointer");
    assert_eq!(cmd.command_text(), "print *list->next");
    session.apply(cmd.complete("$3 = {payload = 7, next = 0x0}"));
    let list = session.find(id).expect("root");
    let nested = &list.children[1].children[0];
    assert_eq!(nested.value(), "7");
}

#[test]
fn test_frame_refresh_reconciles_by_name_prefix() {
    let mut session = session();
    let bulk = session.refresh_frame();
    assert_eq!(bulk.command_text(), "frame-vars");
    session.apply_frame(
        bulk.seq(),
        "argc = 1\nargv = 0x7fffe8d8\n-----\ni = 0\nbuf = {104 'h', 105 'i'}",
    );
    let before: Vec<_> = session.frame().iter().map(|n| n.id()).collect();
    assert_eq!(names(session.frame()), vec!["argc", "argv", "i", "buf"]);

    // deeper in the function: `i` advanced, `buf` left scope, `sum` appeared
    let bulk = session.refresh_frame();
    let report = session.apply_frame(
        bulk.seq(),
        "argc = 1\nargv = 0x7fffe8d8\n-----\ni = 4\nsum = 10",
    );
    assert!(report.structure_changed);
    assert_eq!(names(session.frame()), vec!["argc", "argv", "i", "sum"]);
    assert_eq!(session.frame()[2].id(), before[2], "prefix nodes are reused");
    assert_eq!(session.frame()[2].value(), "4");
    assert!(session.frame()[2].changed);
}

#[test]
fn test_evaluation_error_and_recovery() {
    let mut session = session();
    let id = session.add_watch("maybe");
    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.fail("No symbol \"maybe\" in current context."));
    {
        let node = session.find(id).expect("node");
        assert!(!node.valid);
        assert_eq!(node.value(), "No symbol \"maybe\" in current context.");
    }

    // the symbol comes into scope later
    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.complete("$1 = 3"));
    let node = session.find(id).expect("node");
    assert!(node.valid);
    assert_eq!(node.value(), "3");
}

#[test]
fn test_display_base_override_survives_stepping() {
    let mut session = session();
    let id = session.add_watch("c");
    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.complete("$1 = 99 'c'"));

    assert!(session.set_format(id, ValueFormat::Hex));
    assert_eq!(session.find(id).expect("node").value(), "0x00000063");

    let cmd = session.refresh(id).expect("refresh");
    session.apply(cmd.complete("$2 = 100 'd'"));
    assert_eq!(session.find(id).expect("node").value(), "0x00000064");

    session.set_format(id, ValueFormat::Auto);
    assert_eq!(session.find(id).expect("node").value(), "100 'd'");
}

#[test]
fn test_late_completion_after_watch_removal_is_ignored() {
    let mut session = session();
    let id = session.add_watch("gone");
    let cmd = session.refresh(id).expect("refresh");
    session.remove_watch("gone");

    let outcome: CommandOutcome = cmd.complete("$1 = 5");
    let report = session.apply(outcome);
    assert!(report.absorbed);
    assert!(session.find(id).is_none());
}
