//! End-to-end editing scenarios over the default plugin set.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::{Value, json};
use vellum_core::config::PluginsConfig;
use vellum_core::resources::{POST_UNDO_HANDLERS, StepHandler};
use vellum_core::{
    Config, Editor, EditorEvent, EditorState, EventBus, EventHandler, KeyPress, Plugin,
    PluginDescriptor, PluginError, PluginResult, Resources, normalize,
};
use vellum_dom::{NodeId, Point, Selection, Step};
use vellum_plugin::Catalog;

fn default_editor(html: &str) -> Editor {
    let descriptors = Catalog::from_config(&PluginsConfig::default()).unwrap();
    Editor::new(&descriptors, Config::default(), html).unwrap()
}

/// First text node under the `index`th top-level block.
fn text_in(editor: &Editor, index: usize) -> NodeId {
    let doc = editor.document();
    let block = doc.children(doc.root())[index];
    doc.descendants(block)
        .into_iter()
        .find(|&node| doc.is_text(node))
        .unwrap()
}

fn cursor(editor: &Editor) -> Option<Selection> {
    editor.selection_data().unwrap().document_selection
}

#[test]
fn test_history_round_trip() {
    let mut editor = default_editor("<p>ab</p>");
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 1).unwrap();

    editor.state_mut().document.insert_text(text, 1, "X").unwrap();
    editor.set_cursor(text, 2).unwrap();
    editor.add_step().unwrap();
    assert_eq!(editor.content(), "<p>aXb</p>");

    editor.undo().unwrap();
    assert_eq!(editor.content(), "<p>ab</p>");
    assert_eq!(cursor(&editor), Some(Selection::collapsed(Point::new(text, 1))));

    editor.redo().unwrap();
    assert_eq!(editor.content(), "<p>aXb</p>");
    assert_eq!(cursor(&editor), Some(Selection::collapsed(Point::new(text, 2))));
}

#[test]
fn test_new_commit_invalidates_redo() {
    let mut editor = default_editor("<p>ab</p>");
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 2).unwrap();

    editor.state_mut().document.insert_text(text, 2, "c").unwrap();
    editor.add_step().unwrap();
    editor.undo().unwrap();
    let history = editor.history().unwrap();
    assert!(history.can_redo());

    editor.state_mut().document.insert_text(text, 2, "d").unwrap();
    editor.add_step().unwrap();
    assert!(!history.can_redo());
    assert_eq!(editor.redo().unwrap(), None);
    assert_eq!(editor.content(), "<p>abd</p>");
}

#[test]
fn test_normalization_is_idempotent() {
    let mut editor = default_editor("<p>a<b></b><i></i></p><p>\u{feff}x</p>");
    assert_eq!(
        editor.content(),
        "<p>a<b>\u{feff}</b><i>\u{feff}</i></p><p>x</p>"
    );

    let state = editor.state_mut();
    let root = state.document.root();
    normalize(state, root);
    assert!(!state.document.has_pending_records());
}

#[test]
fn test_cursor_survives_marker_removal() {
    let mut editor = default_editor("<p>a<b></b></p>");
    let doc = editor.document();
    let p = doc.first_child(doc.root()).unwrap();
    let b = doc.children(p)[1];
    let marker = doc.first_child(b).unwrap();
    editor.set_cursor(marker, 1).unwrap();

    // Typing after the marker makes it redundant
    editor.state_mut().document.insert_text(marker, 1, "z").unwrap();
    editor.set_cursor(marker, 2).unwrap();
    editor.add_step().unwrap();

    assert_eq!(editor.content(), "<p>a<b>z</b></p>");
    assert_eq!(cursor(&editor), Some(Selection::collapsed(Point::new(marker, 1))));

    editor.undo().unwrap();
    assert_eq!(editor.content(), "<p>a<b>\u{feff}</b></p>");
}

#[test]
fn test_align_center_and_undo() {
    let mut editor = default_editor("<p>Hello</p>");
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 2).unwrap();

    editor.exec_command("align_center", &Value::Null).unwrap();
    assert_eq!(
        editor.content(),
        r#"<p style="text-align: center;">Hello</p>"#
    );

    editor.undo().unwrap();
    assert_eq!(editor.content(), "<p>Hello</p>");
    assert_eq!(cursor(&editor), Some(Selection::collapsed(Point::new(text, 2))));
}

#[test]
fn test_shortcut_runs_alignment() {
    let mut editor = default_editor("<p>Hello</p>");
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 0).unwrap();

    let press = KeyPress::parse("ctrl+shift+r").unwrap();
    assert!(editor.handle_key(&press).unwrap());
    assert_eq!(
        editor.content(),
        r#"<p style="text-align: right;">Hello</p>"#
    );

    let undo = KeyPress::parse("ctrl+z").unwrap();
    assert!(editor.handle_key(&undo).unwrap());
    assert_eq!(editor.content(), "<p>Hello</p>");
}

struct Broken;

impl Plugin for Broken {
    fn resources(&self) -> Resources {
        let fail: StepHandler = Rc::new(|_: &mut EditorState, _: &Step| -> PluginResult<()> {
            Err(PluginError::Failed("broken on purpose".to_string()))
        });
        let panic: StepHandler = Rc::new(|_: &mut EditorState, _: &Step| -> PluginResult<()> {
            panic!("broken harder")
        });
        Resources::new()
            .add(POST_UNDO_HANDLERS, fail)
            .add(POST_UNDO_HANDLERS, panic)
    }
}

struct Counting {
    calls: Rc<Cell<u32>>,
}

impl Plugin for Counting {
    fn resources(&self) -> Resources {
        let calls = Rc::clone(&self.calls);
        let count: StepHandler = Rc::new(move |_: &mut EditorState, _: &Step| -> PluginResult<()> {
            calls.set(calls.get() + 1);
            Ok(())
        });
        Resources::new().add(POST_UNDO_HANDLERS, count)
    }
}

#[test]
fn test_failing_post_undo_handler_is_isolated() {
    let calls = Rc::new(Cell::new(0));
    let counted = Rc::clone(&calls);
    let mut descriptors = Catalog::from_config(&PluginsConfig::default()).unwrap();
    descriptors.push(PluginDescriptor::new("broken", |_| {
        Ok(Box::new(Broken) as Box<dyn Plugin>)
    }));
    descriptors.push(PluginDescriptor::new("counting", move |_| {
        Ok(Box::new(Counting {
            calls: Rc::clone(&counted),
        }) as Box<dyn Plugin>)
    }));
    let mut editor = Editor::new(&descriptors, Config::default(), "<p>Hello</p>").unwrap();
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 5).unwrap();

    editor.exec_command("align_justify", &Value::Null).unwrap();
    editor.undo().unwrap();

    assert_eq!(calls.get(), 1);
    assert_eq!(editor.content(), "<p>Hello</p>");
    assert!(editor.history().unwrap().can_redo());
}

#[test]
fn test_save_cleaning_differs_from_export() {
    let mut editor = default_editor("<h1><br></h1><p>a<b></b></p>");
    let doc = editor.document();
    let h1 = doc.first_child(doc.root()).unwrap();
    editor.set_cursor(h1, 0).unwrap();

    assert_eq!(
        editor.content(),
        "<h1 placeholder=\"Heading 1\"><br></h1><p>a<b>\u{feff}</b></p>"
    );
    assert_eq!(
        editor.export_content().unwrap(),
        "<h1><br></h1><p>a<b>\u{feff}</b></p>"
    );
    assert_eq!(
        editor.content_for_save().unwrap(),
        "<h1><br></h1><p>a<b></b></p>"
    );
    // Exporting leaves the live document alone
    assert!(editor.content().contains("placeholder"));
}

#[test]
fn test_emoji_then_replace() {
    let mut editor = default_editor("<p>hi there</p>");
    let text = text_in(&editor, 0);
    editor.set_cursor(text, 2).unwrap();

    editor
        .exec_command("insert_emoji", &json!({"emoji": "🙂"}))
        .unwrap();
    assert_eq!(editor.content(), "<p>hi🙂 there</p>");

    editor
        .exec_command("replace_all", &json!({"search": "there", "replace": "you"}))
        .unwrap();
    assert_eq!(editor.content(), "<p>hi🙂 you</p>");

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.content(), "<p>hi there</p>");
}

#[tokio::test]
async fn test_events_reach_subscribers() {
    let bus = EventBus::new();
    let mut events = EventHandler::new(bus.subscribe());
    let descriptors = Catalog::from_config(&PluginsConfig {
        preset: "core".into(),
        ..PluginsConfig::default()
    })
    .unwrap();
    let mut editor = Editor::with_events(&descriptors, Config::default(), "<p>a</p>", bus).unwrap();

    assert_eq!(
        events.next().await,
        Some(EditorEvent::PluginsActivated(vec![
            "selection".to_string(),
            "history".to_string()
        ]))
    );

    let text = text_in(&editor, 0);
    editor.set_cursor(text, 1).unwrap();
    assert_eq!(events.next().await, Some(EditorEvent::SelectionChanged));

    editor.state_mut().document.insert_text(text, 1, "b").unwrap();
    let step = editor.add_step().unwrap().unwrap();
    assert_eq!(events.next().await, Some(EditorEvent::StepAdded(step)));

    editor.destroy();
    assert_eq!(events.next().await, Some(EditorEvent::Destroyed));
}
