//! The `/` command palette.
//!
//! Items are contributed under `powerbox_items`; the palette only lists
//! those whose command exists and is available, and ranks them against the
//! typed query.

use std::rc::Rc;

use vellum_core::resources::{POWERBOX_ITEMS, PowerboxItem};
use vellum_core::{
    Capabilities, Capability, CoreResult, EditorState, Plugin, PluginDescriptor, exec_command,
    find_command,
};

/// Palette operations offered to dependent plugins and hosts.
pub trait PowerboxApi {
    /// Every item that can run now, in registry order.
    fn items(&self, state: &EditorState) -> Vec<PowerboxItem>;

    /// Items matching `query`, best match first.
    fn search(&self, state: &EditorState, query: &str) -> Vec<PowerboxItem>;

    /// Runs the item's command with its parameters.
    fn apply(&self, state: &mut EditorState, item: &PowerboxItem) -> CoreResult<()>;
}

impl Capability for dyn PowerboxApi {
    const NAME: &'static str = "powerbox";
}

/// Returns true if the chars of `needle` appear in order in `haystack`.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut rest = haystack.chars();
    needle.chars().all(|c| rest.any(|h| h == c))
}

/// Lower is better; `None` means no match.
fn score(item: &PowerboxItem, query: &str) -> Option<u8> {
    let title = item.title.to_lowercase();
    if title.starts_with(query) {
        return Some(0);
    }
    if title.split_whitespace().any(|word| word.starts_with(query)) {
        return Some(1);
    }
    if title.contains(query) {
        return Some(2);
    }
    if item
        .keywords
        .iter()
        .any(|k| k.to_lowercase().contains(query))
    {
        return Some(3);
    }
    if item.category.to_lowercase().contains(query) {
        return Some(4);
    }
    is_subsequence(query, &title).then_some(5)
}

#[derive(Clone, Copy, Default)]
struct Powerbox;

impl PowerboxApi for Powerbox {
    fn items(&self, state: &EditorState) -> Vec<PowerboxItem> {
        state
            .resource(POWERBOX_ITEMS)
            .into_iter()
            .filter(|item| {
                find_command(state, &item.command_id).is_some_and(|c| c.is_available(state))
            })
            .collect()
    }

    fn search(&self, state: &EditorState, query: &str) -> Vec<PowerboxItem> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.items(state);
        }
        let mut ranked: Vec<(u8, PowerboxItem)> = self
            .items(state)
            .into_iter()
            .filter_map(|item| score(&item, &query).map(|s| (s, item)))
            .collect();
        // Stable: equal scores keep registry order
        ranked.sort_by_key(|(s, _)| *s);
        ranked.into_iter().map(|(_, item)| item).collect()
    }

    fn apply(&self, state: &mut EditorState, item: &PowerboxItem) -> CoreResult<()> {
        tracing::debug!(command = %item.command_id, title = %item.title, "powerbox item applied");
        exec_command(state, &item.command_id, &item.params)
    }
}

/// Plugin exposing the palette as `dyn PowerboxApi`.
pub struct PowerboxPlugin;

impl PowerboxPlugin {
    pub const ID: &'static str = "powerbox";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |_| Ok(Box::new(PowerboxPlugin) as Box<dyn Plugin>))
            .shares::<dyn PowerboxApi>()
    }
}

impl Plugin for PowerboxPlugin {
    fn capabilities(&self) -> Capabilities {
        Capabilities::new().provide::<dyn PowerboxApi>(Rc::new(Powerbox))
    }
}
