//! Find and replace across the document.

use std::rc::Rc;

use serde::Deserialize;
use vellum_core::resources::{USER_COMMANDS, UserCommand};
use vellum_core::{
    EditorState, HistoryApi, HistoryPlugin, Plugin, PluginDescriptor, PluginError, PluginResult,
    Resources, SelectionApi, SelectionPlugin, params, preserving_selection,
};
use vellum_dom::NodeId;

#[derive(Deserialize)]
struct ReplaceAll {
    search: String,
    #[serde(default)]
    replace: String,
    #[serde(default)]
    ignore_case: bool,
}

/// Char indices where `needle` starts in `haystack`, left to right, without overlap.
fn find_all(haystack: &[char], needle: &[char], ignore_case: bool) -> Vec<usize> {
    let same = |a: char, b: char| {
        if ignore_case {
            a.to_lowercase().eq(b.to_lowercase())
        } else {
            a == b
        }
    };
    let mut found = Vec::new();
    let mut i = 0;
    while !needle.is_empty() && i + needle.len() <= haystack.len() {
        if haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(&a, &b)| same(a, b))
        {
            found.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    found
}

/// Where `offset` lands once every match in `starts` is replaced.
///
/// Offsets inside a match move to the end of its replacement.
fn remap_offset(offset: usize, starts: &[usize], old_len: usize, new_len: usize) -> usize {
    let mut before = 0;
    for &start in starts {
        if offset >= start + old_len {
            before += 1;
        } else if offset > start {
            return start - before * old_len + before * new_len + new_len;
        } else {
            break;
        }
    }
    offset - before * old_len + before * new_len
}

/// Replaces every match in the editable text of the document.
///
/// Returns the number of replacements.
fn replace_all(
    selection: &dyn SelectionApi,
    history: &dyn HistoryApi,
    state: &mut EditorState,
    args: &ReplaceAll,
) -> PluginResult<usize> {
    if args.search.is_empty() {
        return Err(PluginError::InvalidParams("empty search string".to_string()));
    }
    let needle: Vec<char> = args.search.chars().collect();
    let replacement: Vec<char> = args.replace.chars().collect();

    let doc = &state.document;
    let texts: Vec<NodeId> = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&node| doc.is_text(node) && doc.is_editable(node))
        .collect();

    let count = preserving_selection(selection, state, |state, cursors| {
        let mut count = 0;
        for node in texts {
            let chars: Vec<char> = state.document.text(node).unwrap_or_default().chars().collect();
            let starts = find_all(&chars, &needle, args.ignore_case);
            if starts.is_empty() {
                continue;
            }

            let mut replaced = String::with_capacity(chars.len());
            let mut cursor = 0;
            for &start in &starts {
                replaced.extend(&chars[cursor..start]);
                replaced.extend(&replacement);
                cursor = start + needle.len();
            }
            replaced.extend(&chars[cursor..]);
            state.document.set_text(node, &replaced)?;

            cursors.update(|point| {
                if point.node == node {
                    point.offset = remap_offset(point.offset, &starts, needle.len(), replacement.len());
                }
            });
            count += starts.len();
        }
        Ok(count)
    })?;

    if count > 0 {
        history.add_step(state);
    }
    tracing::debug!(search = %args.search, count, "replace all");
    Ok(count)
}

/// Plugin for the `replace_all` command.
pub struct ReplacePlugin {
    selection: Rc<dyn SelectionApi>,
    history: Rc<dyn HistoryApi>,
}

impl ReplacePlugin {
    pub const ID: &'static str = "replace";

    pub fn descriptor() -> PluginDescriptor {
        PluginDescriptor::new(Self::ID, |ctx| {
            Ok(Box::new(ReplacePlugin {
                selection: ctx.dependency::<dyn SelectionApi>()?,
                history: ctx.dependency::<dyn HistoryApi>()?,
            }) as Box<dyn Plugin>)
        })
        .depends_on(SelectionPlugin::ID)
        .depends_on(HistoryPlugin::ID)
    }
}

impl Plugin for ReplacePlugin {
    fn resources(&self) -> Resources {
        let selection = Rc::clone(&self.selection);
        let history = Rc::clone(&self.history);
        Resources::new().add(
            USER_COMMANDS,
            UserCommand::new("replace_all", "Replace all", move |state, value| {
                let args: ReplaceAll = params(value)?;
                replace_all(&*selection, &*history, state, &args).map(|_| ())
            })
            .with_description("Replace every occurrence of a text")
            .with_icon("fa-exchange"),
        )
    }
}
