//! Longer action sequences through the editor
//!
//! This tests:
//! - Move + remove chains with undo
//! - Undo/redo round trips
//! - Transactions
//! - Selection upkeep across history

use std::sync::Arc;
use vellum_core::{Color, Document, NodeId, NodeKind, NodePatch, NodeTree, Parent, Style};
use vellum_editor::{Action, Editor, EditorConfig, HistoryStep, TemplateRegistry};

fn editor() -> Editor {
    Editor::new(
        Document::with_page("Page 1"),
        Arc::new(TemplateRegistry::with_builtins()),
        EditorConfig::default(),
    )
}

fn insert(editor: &mut Editor, parent: Parent, kind: NodeKind) -> NodeId {
    editor
        .dispatch(Action::InsertNode {
            page: None,
            parent,
            tree: NodeTree::new(kind),
            index: None,
        })
        .unwrap();
    editor.last_outcome().created[0]
}

fn children(editor: &Editor, parent: Parent) -> Vec<NodeId> {
    editor
        .document()
        .active_page()
        .unwrap()
        .graph
        .children_of(parent)
        .unwrap()
        .to_vec()
}

#[test]
fn test_move_then_remove_sequence() {
    let mut editor = editor();
    let root = insert(&mut editor, Parent::Root, NodeKind::container(300.0, 300.0));
    let child1 = insert(&mut editor, Parent::Node(root), NodeKind::container(100.0, 100.0));
    let child2 = insert(&mut editor, Parent::Node(root), NodeKind::container(100.0, 100.0));

    // Move child2 into child1
    editor
        .dispatch(Action::MoveNode {
            node: child2,
            parent: Parent::Node(child1),
            index: Some(0),
        })
        .unwrap();
    assert_eq!(children(&editor, Parent::Node(child1)), vec![child2]);

    // Removing child1 takes child2 with it
    editor.dispatch(Action::RemoveNode { node: child1 }).unwrap();
    assert!(editor.document().find_node(child1).is_none());
    assert!(editor.document().find_node(child2).is_none());

    // Undo remove restores both
    editor.undo();
    assert!(editor.document().find_node(child1).is_some());
    assert!(editor.document().find_node(child2).is_some());

    // Undo move puts child2 back under root
    editor.undo();
    assert_eq!(children(&editor, Parent::Node(root)), vec![child1, child2]);
}

#[test]
fn test_multiple_updates_with_undo_redo() {
    let mut editor = editor();
    let node = insert(&mut editor, Parent::Root, NodeKind::rectangle(10.0, 10.0));

    for i in 1..=5 {
        editor
            .dispatch(Action::UpdateNode {
                node,
                patch: NodePatch {
                    name: Some(format!("v{}", i)),
                    ..NodePatch::default()
                },
            })
            .unwrap();
    }
    let name = |e: &Editor| e.document().find_node(node).map(|(_, n)| n.name.clone());
    assert_eq!(editor.history().undo_levels(), 6);

    // Undo all updates
    for _ in 0..5 {
        assert_eq!(editor.undo(), HistoryStep::Undone("update_node".into()));
    }
    assert_eq!(name(&editor).as_deref(), Some("rectangle"));
    assert_eq!(editor.history().redo_levels(), 5);

    // Redo all
    for _ in 0..5 {
        assert_eq!(editor.redo(), HistoryStep::Redone("update_node".into()));
    }
    assert_eq!(name(&editor).as_deref(), Some("v5"));
    assert_eq!(editor.redo(), HistoryStep::NothingToRedo);

    // Undo 3, dispatch new (clears redo)
    for _ in 0..3 {
        editor.undo();
    }
    assert_eq!(editor.history().redo_levels(), 3);
    editor
        .dispatch(Action::UpdateNode {
            node,
            patch: NodePatch {
                name: Some("new branch".into()),
                ..NodePatch::default()
            },
        })
        .unwrap();
    assert_eq!(editor.history().redo_levels(), 0);
    assert_eq!(name(&editor).as_deref(), Some("new branch"));
}

#[test]
fn test_undo_then_redo_restores_state() {
    let mut editor = editor();
    let frame = insert(&mut editor, Parent::Root, NodeKind::container(50.0, 50.0));
    insert(&mut editor, Parent::Node(frame), NodeKind::ellipse(5.0, 5.0));
    let before = editor.state().clone();

    editor.undo();
    assert_ne!(editor.state(), &before);
    editor.redo();

    assert_eq!(editor.state(), &before);
}

#[test]
fn test_transaction_groups_style_updates() {
    let mut editor = editor();
    let node = insert(&mut editor, Parent::Root, NodeKind::rectangle(10.0, 10.0));

    editor.begin_transaction("Update theme").unwrap();
    for (i, level) in [0.2, 0.4, 0.6, 0.8].into_iter().enumerate() {
        editor
            .dispatch(Action::UpdateNode {
                node,
                patch: NodePatch {
                    style: Some(Style::filled(Color::gray(level)).with_opacity(0.5 + i as f64 * 0.1)),
                    ..NodePatch::default()
                },
            })
            .unwrap();
    }
    assert!(editor.end_transaction());

    // One step for four updates
    assert_eq!(editor.history().undo_levels(), 2);
    assert_eq!(editor.history().undo_label(), Some("Update theme"));

    editor.undo();
    let (_, reverted) = editor.document().find_node(node).unwrap();
    assert_eq!(reverted.style, Style::default());
}

#[test]
fn test_cancelled_transaction_rolls_back() {
    let mut editor = editor();
    editor.begin_transaction("scratch").unwrap();
    insert(&mut editor, Parent::Root, NodeKind::rectangle(1.0, 1.0));
    insert(&mut editor, Parent::Root, NodeKind::rectangle(1.0, 1.0));
    assert_eq!(editor.document().node_count(), 2);

    assert!(editor.cancel_transaction());
    assert_eq!(editor.document().node_count(), 0);
    assert!(!editor.history().can_undo());
}

#[test]
fn test_selection_follows_history() {
    let mut editor = editor();
    let a = insert(&mut editor, Parent::Root, NodeKind::rectangle(1.0, 1.0));
    let b = insert(&mut editor, Parent::Root, NodeKind::rectangle(1.0, 1.0));
    editor.dispatch(Action::Select { nodes: vec![a, b] }).unwrap();

    editor.dispatch(Action::RemoveNode { node: a }).unwrap();
    assert_eq!(editor.document().selection().iter().copied().collect::<Vec<_>>(), vec![b]);

    editor.undo();
    assert_eq!(editor.document().selection().len(), 2);
}

#[test]
fn test_insert_at_index_and_reorder_pages() {
    let mut editor = editor();
    let first = editor.document().active_page_id().unwrap();
    let a = insert(&mut editor, Parent::Root, NodeKind::rectangle(1.0, 1.0));
    editor
        .dispatch(Action::InsertNode {
            page: None,
            parent: Parent::Root,
            tree: NodeTree::new(NodeKind::ellipse(1.0, 1.0)),
            index: Some(0),
        })
        .unwrap();
    let b = editor.last_outcome().created[0];
    assert_eq!(children(&editor, Parent::Root), vec![b, a]);

    editor.dispatch(Action::AddPage { name: "Second".into() }).unwrap();
    let second = editor.last_outcome().pages[0];
    editor
        .dispatch(Action::ReorderPage {
            page: second,
            after: None,
        })
        .unwrap();
    let order: Vec<_> = editor.document().pages_in_order().iter().map(|p| p.id).collect();
    assert_eq!(order, vec![second, first]);

    editor.dispatch(Action::SetActivePage { page: second }).unwrap();
    assert!(editor.document().selection().is_empty());
}

#[test]
fn test_ids_not_reused_after_undo() {
    let mut editor = editor();
    let first = insert(&mut editor, Parent::Root, NodeKind::rectangle(10.0, 10.0));
    editor.undo();
    assert!(editor.document().find_node(first).is_none());

    let second = insert(&mut editor, Parent::Root, NodeKind::rectangle(10.0, 10.0));
    assert_ne!(first, second);

    // Still fresh after loading a document whose counters lag behind
    editor
        .dispatch(Action::LoadDocument {
            document: Document::with_page("Fresh"),
        })
        .unwrap();
    let third = insert(&mut editor, Parent::Root, NodeKind::rectangle(10.0, 10.0));
    assert!(third > second);
}
