//! Emoji insertion.

use std::rc::Rc;

use serde::Deserialize;
use serde_json::json;
use vellum_core::resources::{POWERBOX_ITEMS, PowerboxItem, USER_COMMANDS, UserCommand};
use vellum_core::{
    EditorState, HistoryApi, HistoryPlugin, Plugin, PluginDescriptor, PluginError, PluginResult,
    Resources, SelectionApi, SelectionPlugin, params,
};
use vellum_dom::{Point, VOID_TAGS};

#[derive(Deserialize)]
struct InsertEmoji {
    emoji: String,
}

/// Plugin for the `insert_emoji` command.
pub struct EmojiPlugin {
    selection: Rc<dyn SelectionApi>,
    history: Rc<dyn HistoryApi>,
}

impl EmojiPlugin {
    pub const ID: &'static str = "emoji";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            Ok(Box::new(EmojiPlugin {
                selection: ctx.dependency::<dyn SelectionApi>()?,
                history: ctx.dependency::<dyn HistoryApi>()?,
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
        .depends_on(HistoryPlugin::ID)
    }
}

/// Inserts `emoji` at the start of the selection and puts the cursor after it.
fn insert(
    selection: &dyn SelectionApi,
    history: &dyn HistoryApi,
    state: &mut EditorState,
    emoji: &str,
) -> PluginResult<()> {
    if emoji.trim().is_empty() {
        return Err(PluginError::InvalidParams("empty emoji".to_string()));
    }
    let width = emoji.chars().count();
    let mut at = selection.get_selection_data(state).editable_selection.start;

    let doc = &mut state.document;
    if doc.tag(at.node).is_some_and(|tag| VOID_TAGS.contains(&tag)) {
        // Inside a <br> or <img>: insert next to it instead
        let parent = doc.parent(at.node).unwrap_or(doc.root());
        let index = doc.index_in_parent(at.node).unwrap_or(0);
        at = Point::new(parent, index);
    }

    let cursor = if doc.is_text(at.node) {
        doc.insert_text(at.node, at.offset, emoji)?;
        Point::new(at.node, at.offset + width)
    } else {
        let text = doc.create_text(emoji);
        doc.insert_child(at.node, at.offset, text)?;
        Point::new(text, width)
    };

    selection.set_cursor(state, cursor.node, cursor.offset)?;
    history.add_step(state);
    Ok(())
}

impl Plugin for EmojiPlugin {
    fn resources(&self) -> Resources {
        let selection = Rc::clone(&self.selection);
        let history = Rc::clone(&self.history);
        let command = UserCommand::new("insert_emoji", "Emoji", move |state, value| {
            let InsertEmoji { emoji } = params(value)?;
            insert(&*selection, &*history, state, &emoji)
        })
        .with_description("Add an emoji")
        .with_icon("fa-smile-o");

        Resources::new().add(USER_COMMANDS, command).add(
            POWERBOX_ITEMS,
            PowerboxItem::new("insert_emoji", "Emoji", "Widgets")
                .with_description("Add an emoji")
                .with_keywords(["emoji", "smiley", "face"])
                .with_params(json!({ "emoji": "\u{1f642}" })),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_core::{Config, Editor};
    use vellum_dom::Selection;

    fn editor(html: &str) -> Editor {
        let descriptors = vec![
            SelectionPlugin::descriptor(),
            HistoryPlugin::descriptor(),
            EmojiPlugin::descriptor(),
        ];
        Editor::new(&descriptors, Config::default(), html).unwrap()
    }

    #[test]
    fn test_insert_in_text() {
        let mut editor = editor("<p>Hi</p>");
        let doc = editor.document();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        editor.set_cursor(text, 2).unwrap();

        editor
            .exec_command("insert_emoji", &json!({"emoji": "\u{1f600}"}))
            .unwrap();
        assert_eq!(editor.content(), "<p>Hi\u{1f600}</p>");
        assert_eq!(
            editor.selection_data().unwrap().document_selection,
            Some(Selection::collapsed(Point::new(text, 3)))
        );

        editor.undo().unwrap();
        assert_eq!(editor.content(), "<p>Hi</p>");
        assert_eq!(
            editor.selection_data().unwrap().document_selection,
            Some(Selection::collapsed(Point::new(text, 2)))
        );
    }

    #[test]
    fn test_insert_in_empty_block() {
        let mut editor = editor("<p><br></p>");
        let doc = editor.document();
        let p = doc.first_child(doc.root()).unwrap();
        editor.set_cursor(p, 0).unwrap();

        editor
            .exec_command("insert_emoji", &json!({"emoji": "\u{2764}"}))
            .unwrap();
        assert_eq!(editor.content(), "<p>\u{2764}<br></p>");
    }

    #[test]
    fn test_blank_emoji_is_rejected() {
        let mut editor = editor("<p>Hi</p>");
        assert!(editor.exec_command("insert_emoji", &json!({"emoji": " "})).is_err());
        assert!(editor.exec_command("insert_emoji", &json!({})).is_err());
        assert_eq!(editor.content(), "<p>Hi</p>");
    }
}
