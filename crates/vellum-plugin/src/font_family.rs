//! Font family of blocks.
//!
//! The offered families come from the `font_families` option; anything
//! else is rejected so the stored content only ever names fonts the host
//! knows how to render.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use vellum_core::resources::{
    POST_REDO_HANDLERS, POST_UNDO_HANDLERS, SELECTION_CHANGE_HANDLERS, SelectionChangeHandler,
    StepHandler, TOOLBAR_GROUPS, TOOLBAR_ITEMS, ToolbarGroup, ToolbarItem, USER_COMMANDS,
    UserCommand,
};
use vellum_core::{
    EditorState, HistoryApi, HistoryPlugin, Plugin, PluginDescriptor, PluginError, PluginResult,
    Resources, SelectionApi, SelectionData, SelectionPlugin, params,
};
use vellum_dom::{NodeId, Step};

/// Families offered when the `font_families` option is not set.
pub const DEFAULT_FONT_FAMILIES: &[&str] = &[
    "Arial",
    "Courier New",
    "Georgia",
    "Times New Roman",
    "Verdana",
];

#[derive(Deserialize)]
struct SetFontFamily {
    /// `None` removes the font family
    #[serde(default)]
    family: Option<String>,
}

#[derive(Clone)]
struct Fonts {
    selection: Rc<dyn SelectionApi>,
    history: Rc<dyn HistoryApi>,
    families: Rc<Vec<String>>,
    current: Rc<RefCell<Option<String>>>,
}

impl Fonts {
    fn family_of(state: &EditorState, block: NodeId) -> Option<String> {
        let doc = &state.document;
        doc.ancestors_inclusive(block)
            .find_map(|node| doc.style(node, "font-family"))
    }

    fn refresh(&self, state: &EditorState) {
        let mut families = self
            .selection
            .targeted_blocks(state)
            .into_iter()
            .map(|block| Self::family_of(state, block));
        let current = match families.next() {
            Some(first) if families.all(|f| f == first) => first,
            _ => None,
        };
        *self.current.borrow_mut() = current;
    }

    fn apply(&self, state: &mut EditorState, family: Option<&str>) -> PluginResult<()> {
        if let Some(family) = family {
            if !self.families.iter().any(|f| f == family) {
                return Err(PluginError::InvalidParams(format!(
                    "unknown font family {family:?}"
                )));
            }
        }

        let root = state.document.root();
        for block in self.selection.targeted_blocks(state) {
            if block != root && state.document.is_editable(block) {
                state.document.set_style(block, "font-family", family)?;
            }
        }
        self.history.add_step(state);
        self.refresh(state);
        Ok(())
    }
}

/// Plugin for the `set_font_family` command.
pub struct FontFamilyPlugin {
    fonts: Fonts,
}

impl FontFamilyPlugin {
    pub const ID: &'static str = "font_family";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            let families = ctx
                .option::<Vec<String>>("font_families")
                .unwrap_or_else(|| DEFAULT_FONT_FAMILIES.iter().map(|f| f.to_string()).collect());
            Ok(Box::new(FontFamilyPlugin {
                fonts: Fonts {
                    selection: ctx.dependency::<dyn SelectionApi>()?,
                    history: ctx.dependency::<dyn HistoryApi>()?,
                    families: Rc::new(families),
                    current: Rc::new(RefCell::new(None)),
                },
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
        .depends_on(HistoryPlugin::ID)
    }

    /// The cached font family of the selection.
    pub fn current(&self) -> Option<String> {
        self.fonts.current.borrow().clone()
    }
}

impl Plugin for FontFamilyPlugin {
    fn resources(&self) -> Resources {
        let fonts = self.fonts.clone();
        let command = UserCommand::new("set_font_family", "Font family", move |state, value| {
            let SetFontFamily { family } = params(value)?;
            fonts.apply(state, family.as_deref().filter(|f| !f.is_empty()))
        })
        .with_icon("fa-font");

        let items = self.fonts.families.iter().map(|family| {
            let current = Rc::clone(&self.fonts.current);
            let name = family.clone();
            ToolbarItem::new(
                format!("font_family_{}", family.to_lowercase().replace(' ', "_")),
                "font",
                "set_font_family",
                family.clone(),
            )
            .with_params(serde_json::json!({ "family": family }))
            .active_when(move |_| current.borrow().as_deref() == Some(name.as_str()))
        });
        let items: Vec<ToolbarItem> = items.collect();

        let on_select = self.fonts.clone();
        let on_selection_change: SelectionChangeHandler =
            Rc::new(move |state: &mut EditorState, _: &SelectionData| -> PluginResult<()> {
                on_select.refresh(state);
                Ok(())
            });
        let on_history = self.fonts.clone();
        let after_history: StepHandler =
            Rc::new(move |state: &mut EditorState, _: &Step| -> PluginResult<()> {
                on_history.refresh(state);
                Ok(())
            });

        Resources::new()
            .add(USER_COMMANDS, command)
            .add_with_sequence(TOOLBAR_GROUPS, 20, ToolbarGroup::new("font", "Font"))
            .extend(TOOLBAR_ITEMS, items)
            .add(SELECTION_CHANGE_HANDLERS, on_selection_change)
            .add(POST_UNDO_HANDLERS, after_history.clone())
            .add(POST_REDO_HANDLERS, after_history)
    }

    fn destroy(&mut self, _state: &mut EditorState) {
        self.fonts.current.borrow_mut().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vellum_core::{Config, CoreError, Editor};

    fn editor(config: Config) -> Editor {
        let descriptors = vec![
            SelectionPlugin::descriptor(),
            HistoryPlugin::descriptor(),
            FontFamilyPlugin::descriptor(),
        ];
        let mut editor = Editor::new(&descriptors, config, "<p>Hello</p>").unwrap();
        let doc = editor.document();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        editor.set_cursor(text, 2).unwrap();
        editor
    }

    #[test]
    fn test_set_and_clear_family() {
        let mut editor = editor(Config::default());
        editor
            .exec_command("set_font_family", &json!({"family": "Georgia"}))
            .unwrap();
        assert_eq!(editor.content(), r#"<p style="font-family: Georgia;">Hello</p>"#);

        let items = editor.state().resource(TOOLBAR_ITEMS);
        let active: Vec<&str> = items
            .iter()
            .filter(|i| i.is_active(editor.state()))
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(active, vec!["Georgia"]);

        editor.exec_command("set_font_family", &json!({})).unwrap();
        assert_eq!(editor.content(), "<p>Hello</p>");
        assert_eq!(editor.history().unwrap().undo_count(), 2);
    }

    #[test]
    fn test_families_come_from_options() {
        let mut config = Config::default();
        config.set_option("font_families", vec!["Inter", "Fira Sans"]);
        let mut editor = editor(config);

        let titles: Vec<String> = editor
            .state()
            .resource(TOOLBAR_ITEMS)
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["Inter", "Fira Sans"]);

        let result = editor.exec_command("set_font_family", &json!({"family": "Arial"}));
        assert!(matches!(
            result,
            Err(CoreError::Plugin(PluginError::InvalidParams(_)))
        ));
        assert_eq!(editor.content(), "<p>Hello</p>");
    }
}
