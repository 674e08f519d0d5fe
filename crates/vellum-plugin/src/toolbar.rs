//! Toolbar assembly.
//!
//! Groups and items are contributed by whichever plugins are active. The
//! toolbar resolves them against the current state: items whose command is
//! missing are dropped, items pointing at an unknown group are dropped with
//! a warning, and groups left without buttons are not shown.

use std::rc::Rc;

use vellum_core::resources::{TOOLBAR_GROUPS, TOOLBAR_ITEMS, ToolbarGroup, ToolbarItem};
use vellum_core::{
    Capabilities, Capability, EditorState, Plugin, PluginDescriptor, Resources, find_command,
};

/// A resolved toolbar button.
#[derive(Debug, Clone)]
pub struct ToolbarButton {
    pub item: ToolbarItem,
    /// The button reflects the current selection
    pub is_active: bool,
    /// The command may run now
    pub is_available: bool,
}

/// A group with its buttons.
#[derive(Debug, Clone)]
pub struct ToolbarSection {
    pub group: ToolbarGroup,
    pub buttons: Vec<ToolbarButton>,
}

/// Toolbar operations offered to dependent plugins and hosts.
pub trait ToolbarApi {
    /// The sections to display, in group order.
    fn sections(&self, state: &EditorState) -> Vec<ToolbarSection>;
}

impl Capability for dyn ToolbarApi {
    const NAME: &'static str = "toolbar";
}

#[derive(Clone, Copy, Default)]
struct Toolbar;

impl ToolbarApi for Toolbar {
    fn sections(&self, state: &EditorState) -> Vec<ToolbarSection> {
        let mut sections: Vec<ToolbarSection> = state
            .resource(TOOLBAR_GROUPS)
            .into_iter()
            .map(|group| ToolbarSection {
                group,
                buttons: Vec::new(),
            })
            .collect();

        for item in state.resource(TOOLBAR_ITEMS) {
            let Some(command) = find_command(state, &item.command_id) else {
                tracing::trace!(item = %item.id, command = %item.command_id, "toolbar item without command");
                continue;
            };
            let Some(section) = sections.iter_mut().find(|s| s.group.id == item.group_id) else {
                tracing::warn!(item = %item.id, group = %item.group_id, "toolbar item in unknown group");
                continue;
            };
            section.buttons.push(ToolbarButton {
                is_active: item.is_active(state),
                is_available: command.is_available(state),
                item,
            });
        }

        sections.retain(|s| !s.buttons.is_empty());
        sections
    }
}

/// Plugin exposing the toolbar as `dyn ToolbarApi`.
pub struct ToolbarPlugin;

impl ToolbarPlugin {
    pub const ID: &'static str = "toolbar";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |_| Ok(Box::new(ToolbarPlugin) as Box<dyn Plugin>))
            .shares::<dyn ToolbarApi>()
    }
}

impl Plugin for ToolbarPlugin {
    fn resources(&self) -> Resources {
        // Undo and redo come from the history plugin; without it they drop out
        Resources::new()
            .add_with_sequence(TOOLBAR_GROUPS, 10, ToolbarGroup::new("history", "History"))
            .add(
                TOOLBAR_ITEMS,
                ToolbarItem::new("undo", "history", "undo", "Undo").with_icon("fa-undo"),
            )
            .add(
                TOOLBAR_ITEMS,
                ToolbarItem::new("redo", "history", "redo", "Redo").with_icon("fa-repeat"),
            )
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::new().provide::<dyn ToolbarApi>(Rc::new(Toolbar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignPlugin;
    use vellum_core::resources::{USER_COMMANDS, UserCommand};
    use vellum_core::{Config, Editor, HistoryPlugin, SelectionPlugin};

    fn ids(sections: &[ToolbarSection]) -> Vec<(&str, Vec<&str>)> {
        sections
            .iter()
            .map(|s| {
                (
                    s.group.id.as_str(),
                    s.buttons.iter().map(|b| b.item.id.as_str()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn test_sections_in_group_order() {
        let descriptors = vec![
            SelectionPlugin::descriptor(),
            HistoryPlugin::descriptor(),
            AlignPlugin::descriptor(),
            ToolbarPlugin::descriptor(),
        ];
        let mut editor = Editor::new(&descriptors, Config::default(), "<p>a</p>").unwrap();
        let doc = editor.document();
        let text = doc.first_child(doc.first_child(doc.root()).unwrap()).unwrap();
        editor.set_cursor(text, 0).unwrap();

        let toolbar = editor.capability::<dyn ToolbarApi>().unwrap();
        let sections = toolbar.sections(editor.state());
        assert_eq!(
            ids(&sections),
            vec![
                ("history", vec!["undo", "redo"]),
                (
                    "alignment",
                    vec!["align_left", "align_center", "align_right", "align_justify"]
                ),
            ]
        );
        let undo = &sections[0].buttons[0];
        assert!(!undo.is_available);
        assert!(sections[1].buttons[0].is_active);
    }

    struct Stray;

    impl Plugin for Stray {
        fn resources(&self) -> Resources {
            Resources::new()
                .add(USER_COMMANDS, UserCommand::new("bold", "Bold", |_, _| Ok(())))
                .add(
                    TOOLBAR_ITEMS,
                    ToolbarItem::new("bold", "decoration", "bold", "Bold"),
                )
        }
    }

    #[test]
    fn test_orphans_are_dropped() {
        let descriptors = vec![
            ToolbarPlugin::descriptor(),
            PluginDescriptor::new("stray", |_| Ok(Box::new(Stray) as Box<dyn Plugin>)),
        ];
        let editor = Editor::new(&descriptors, Config::default(), "").unwrap();
        let toolbar = editor.capability::<dyn ToolbarApi>().unwrap();
        // No history plugin and no "decoration" group
        assert!(toolbar.sections(editor.state()).is_empty());
    }
}
