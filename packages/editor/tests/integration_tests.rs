//! Integration tests for editor crate

use serde_json::json;
use std::sync::Arc;
use vellum_core::{Document, NodeKind, NodeTree, Parent};
use vellum_editor::{Action, Editor, EditorConfig, EditorError, FnTemplate, HistoryStep, TemplateRegistry};

fn editor() -> Editor {
    Editor::new(
        Document::with_page("Page 1"),
        Arc::new(TemplateRegistry::with_builtins()),
        EditorConfig::default(),
    )
}

#[test]
fn test_document_lifecycle() {
    let mut editor = editor();
    assert_eq!(editor.state().revision, 0);

    let state = editor
        .dispatch(Action::InsertTemplate {
            page: None,
            parent: Parent::Root,
            tag: "card".into(),
            props: json!({ "title": "Welcome" }),
            index: None,
        })
        .unwrap();

    assert_eq!(state.revision, 1);
    assert_eq!(state.document.node_count(), 3);
    assert_eq!(state.document.selection().len(), 1);
}

#[test]
fn test_actions_arrive_as_json() {
    let mut editor = editor();
    let page = editor.document().active_page_id().unwrap();

    let actions: Vec<Action> = serde_json::from_value(json!([
        { "type": "add_page", "payload": { "name": "Second" } },
        { "type": "rename_page", "payload": { "page": page.0, "name": "Cover" } },
        { "type": "insert_template", "payload": { "tag": "badge", "props": { "label": "Draft" } } }
    ]))
    .unwrap();

    for action in actions {
        editor.dispatch(action).unwrap();
    }

    let document = editor.document();
    assert_eq!(document.page_count(), 2);
    assert_eq!(document.page(page).map(|p| p.name.as_str()), Some("Cover"));
    assert_eq!(document.node_count(), 3);
    assert_eq!(editor.history().undo_levels(), 3);
}

#[test]
fn test_failed_action_changes_nothing() {
    let mut editor = editor();
    editor
        .dispatch(Action::InsertNode {
            page: None,
            parent: Parent::Root,
            tree: NodeTree::new(NodeKind::rectangle(10.0, 10.0)),
            index: None,
        })
        .unwrap();
    let before = editor.state().clone();

    let err = editor
        .dispatch(Action::InsertTemplate {
            page: None,
            parent: Parent::Root,
            tag: "missing".into(),
            props: json!({}),
            index: None,
        })
        .unwrap_err();

    assert!(matches!(err, EditorError::UnknownTemplate(tag) if tag == "missing"));
    assert_eq!(editor.state(), &before);
    assert_eq!(editor.history().undo_levels(), 1);
}

#[test]
fn test_registering_a_tag_twice_uses_second() {
    let registry = Arc::new(TemplateRegistry::new());
    registry.register(FnTemplate::new("tile", |_: &serde_json::Value| {
        Ok(NodeTree::new(NodeKind::rectangle(1.0, 1.0)))
    }));
    registry.register(FnTemplate::new("tile", |_: &serde_json::Value| {
        Ok(NodeTree::new(NodeKind::ellipse(2.0, 2.0)))
    }));

    let mut editor = Editor::new(Document::with_page("Page"), registry, EditorConfig::default());
    editor
        .dispatch(Action::InsertTemplate {
            page: None,
            parent: Parent::Root,
            tag: "tile".into(),
            props: serde_json::Value::Null,
            index: None,
        })
        .unwrap();

    let created = editor.last_outcome().created[0];
    let (_, node) = editor.document().find_node(created).unwrap();
    assert_eq!(node.kind, NodeKind::ellipse(2.0, 2.0));
}

#[test]
fn test_history_limit_from_config() {
    let config = EditorConfig {
        history_limit: 3,
        ..EditorConfig::default()
    };
    let mut editor = Editor::new(Document::with_page("Page"), Arc::new(TemplateRegistry::new()), config);

    for i in 0..5 {
        editor
            .dispatch(Action::AddPage {
                name: format!("Page {}", i),
            })
            .unwrap();
    }

    assert_eq!(editor.history().undo_levels(), 3);
    for _ in 0..3 {
        assert!(matches!(editor.undo(), HistoryStep::Undone(_)));
    }
    assert_eq!(editor.undo(), HistoryStep::NothingToUndo);
    assert_eq!(editor.document().page_count(), 3);
}

#[test]
fn test_editor_state_serialization() {
    let mut editor = editor();
    editor
        .dispatch(Action::InsertTemplate {
            page: None,
            parent: Parent::Root,
            tag: "badge".into(),
            props: json!({}),
            index: None,
        })
        .unwrap();

    let json = serde_json::to_string(editor.state()).unwrap();
    let back: vellum_editor::EditorState = serde_json::from_str(&json).unwrap();

    assert_eq!(&back, editor.state());
}
