//! The resource registry: typed extension points shared by all plugins.
//!
//! ## Learning: Type Erasure with `Any`
//!
//! Every extension point carries a different contribution type (command
//! descriptors, normalization handlers, predicates...). The registry stores
//! all of them in one map by erasing the type to `Rc<dyn Any>`, and the
//! typed [`ResourceKey<T>`] recovers it with `downcast_ref::<T>()`. Callers
//! never see `Any`: contributing and reading are both generic over `T`.
//!
//! ## Ordering
//!
//! Contributions are kept in registration order, which is plugin activation
//! order. Reading a key sorts them by sequence with a stable sort, so equal
//! sequences keep activation order.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::plugin::PluginResult;
use crate::state::EditorState;

/// Sequence used when a contribution does not ask for one.
pub const DEFAULT_SEQUENCE: i32 = 10;

/// A named extension point whose contributions have type `T`.
pub struct ResourceKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ResourceKey<T> {
    /// Declares a key.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// The key's name.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for ResourceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ResourceKey<T> {}

impl<T> std::fmt::Debug for ResourceKey<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResourceKey({})", self.name)
    }
}

/// A lazily evaluated contribution.
type Thunk<T> = Rc<dyn Fn(&EditorState) -> Vec<T>>;

#[derive(Clone)]
enum Contribution {
    /// Holds a `T`
    Value(Rc<dyn Any>),
    /// Holds a `Thunk<T>`
    Dynamic(Rc<dyn Any>),
}

#[derive(Clone)]
struct Entry {
    plugin: String,
    sequence: i32,
    contribution: Contribution,
}

/// The contributions of one plugin, built up before registration.
#[derive(Clone, Default)]
pub struct Resources {
    entries: Vec<(&'static str, i32, Contribution)>,
}

impl Resources {
    /// Creates an empty contribution set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contributes `value` under `key` with the default sequence.
    pub fn add<T: 'static>(self, key: ResourceKey<T>, value: T) -> Self {
        self.add_with_sequence(key, DEFAULT_SEQUENCE, value)
    }

    /// Contributes `value` under `key` with an explicit sequence.
    pub fn add_with_sequence<T: 'static>(
        mut self,
        key: ResourceKey<T>,
        sequence: i32,
        value: T,
    ) -> Self {
        self.entries
            .push((key.name, sequence, Contribution::Value(Rc::new(value))));
        self
    }

    /// Contributes every value of `values` under `key`.
    pub fn extend<T: 'static>(self, key: ResourceKey<T>, values: impl IntoIterator<Item = T>) -> Self {
        values.into_iter().fold(self, |acc, value| acc.add(key, value))
    }

    /// Contributes a thunk re-evaluated on every read of `key`.
    pub fn add_dynamic<T: 'static>(
        self,
        key: ResourceKey<T>,
        thunk: impl Fn(&EditorState) -> Vec<T> + 'static,
    ) -> Self {
        self.add_dynamic_with_sequence(key, DEFAULT_SEQUENCE, thunk)
    }

    /// Contributes a thunk with an explicit sequence. All values it
    /// yields share that sequence.
    pub fn add_dynamic_with_sequence<T: 'static>(
        mut self,
        key: ResourceKey<T>,
        sequence: i32,
        thunk: impl Fn(&EditorState) -> Vec<T> + 'static,
    ) -> Self {
        let thunk: Thunk<T> = Rc::new(thunk);
        self.entries
            .push((key.name, sequence, Contribution::Dynamic(Rc::new(thunk))));
        self
    }

    /// Number of contributions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is contributed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A contribution together with the plugin that made it.
#[derive(Debug, Clone)]
pub struct Contributed<T> {
    pub plugin: String,
    pub value: T,
}

/// Per-editor table of contributions.
#[derive(Default)]
pub struct ResourceRegistry {
    entries: HashMap<&'static str, Vec<Entry>>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `plugin`'s contributions. Never overwrites.
    pub fn register(&mut self, plugin: &str, resources: Resources) {
        for (key, sequence, contribution) in resources.entries {
            self.entries.entry(key).or_default().push(Entry {
                plugin: plugin.to_string(),
                sequence,
                contribution,
            });
        }
    }

    /// Removes everything `plugin` contributed. Returns how many entries went.
    pub fn unregister(&mut self, plugin: &str) -> usize {
        let mut removed = 0;
        for entries in self.entries.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.plugin != plugin);
            removed += before - entries.len();
        }
        self.entries.retain(|_, entries| !entries.is_empty());
        removed
    }

    /// Drops every contribution.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Names of keys that have at least one contribution.
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.entries.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// Returns the ordered contributions under `key`.
    pub fn get<T: Clone + 'static>(&self, key: ResourceKey<T>, state: &EditorState) -> Vec<T> {
        self.contributions(key, state)
            .into_iter()
            .map(|c| c.value)
            .collect()
    }

    /// Like [`Self::get`], keeping track of the contributing plugin.
    pub fn contributions<T: Clone + 'static>(
        &self,
        key: ResourceKey<T>,
        state: &EditorState,
    ) -> Vec<Contributed<T>> {
        let Some(entries) = self.entries.get(key.name) else {
            return Vec::new();
        };
        let mut ordered: Vec<&Entry> = entries.iter().collect();
        ordered.sort_by_key(|e| e.sequence);

        let mut out = Vec::new();
        for entry in ordered {
            match &entry.contribution {
                Contribution::Value(value) => match value.downcast_ref::<T>() {
                    Some(value) => out.push(Contributed {
                        plugin: entry.plugin.clone(),
                        value: value.clone(),
                    }),
                    None => mismatch(key.name, &entry.plugin),
                },
                Contribution::Dynamic(thunk) => match thunk.downcast_ref::<Thunk<T>>() {
                    Some(thunk) => out.extend(thunk(state).into_iter().map(|value| Contributed {
                        plugin: entry.plugin.clone(),
                        value,
                    })),
                    None => mismatch(key.name, &entry.plugin),
                },
            }
        }
        out
    }
}

fn mismatch(key: &str, plugin: &str) {
    tracing::warn!(resource = key, plugin, "contribution has the wrong type, skipped");
}

/// Runs one handler, containing its failure.
///
/// Errors are logged as warnings and panics as errors; neither escapes.
/// Returns true if the handler succeeded.
pub fn isolate(resource: &str, plugin: &str, handler: impl FnOnce() -> PluginResult<()>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(handler)) {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            tracing::warn!(resource, plugin, %err, "handler failed");
            false
        }
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(resource, plugin, %message, "handler panicked");
            false
        }
    }
}

/// Calls every contribution under `key`, isolating each one.
///
/// The list is fetched once up front; handlers get the state mutably.
pub fn dispatch<T, F>(state: &mut EditorState, key: ResourceKey<T>, mut call: F)
where
    T: Clone + 'static,
    F: FnMut(&T, &mut EditorState) -> PluginResult<()>,
{
    let handlers = state.resources().contributions(key, state);
    tracing::trace!(resource = key.name(), count = handlers.len(), "dispatching");
    for Contributed { plugin, value } in handlers {
        isolate(key.name(), &plugin, || call(&value, state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginError;
    use std::cell::RefCell;

    const LETTERS: ResourceKey<&'static str> = ResourceKey::new("letters");
    const NUMBERS: ResourceKey<i32> = ResourceKey::new("numbers");

    #[test]
    fn test_activation_order() {
        let state = EditorState::for_tests("");
        let mut registry = ResourceRegistry::new();
        registry.register("p1", Resources::new().add(LETTERS, "a"));
        registry.register("p2", Resources::new().add(LETTERS, "b"));
        assert_eq!(registry.get(LETTERS, &state), vec!["a", "b"]);
    }

    #[test]
    fn test_sequence_override() {
        let state = EditorState::for_tests("");
        let mut registry = ResourceRegistry::new();
        registry.register("p1", Resources::new().add(LETTERS, "a"));
        registry.register("p2", Resources::new().add_with_sequence(LETTERS, 5, "b"));
        registry.register("p3", Resources::new().add_with_sequence(LETTERS, 5, "c"));
        assert_eq!(registry.get(LETTERS, &state), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_dynamic_contribution_is_reevaluated() {
        let state = EditorState::for_tests("<p>a</p>");
        let calls = Rc::new(RefCell::new(0));
        let counter = calls.clone();
        let mut registry = ResourceRegistry::new();
        registry.register(
            "p1",
            Resources::new().add_dynamic(NUMBERS, move |state| {
                *counter.borrow_mut() += 1;
                vec![state.document.children(state.document.root()).len() as i32]
            }),
        );
        assert_eq!(registry.get(NUMBERS, &state), vec![1]);
        assert_eq!(registry.get(NUMBERS, &state), vec![1]);
        assert_eq!(*calls.borrow(), 2);
    }

    #[test]
    fn test_dynamic_contribution_with_sequence() {
        let state = EditorState::for_tests("");
        let mut registry = ResourceRegistry::new();
        registry.register("p1", Resources::new().add_with_sequence(NUMBERS, 20, 1));
        registry.register(
            "p2",
            Resources::new().add_dynamic_with_sequence(NUMBERS, 5, |_| vec![2, 3]),
        );
        registry.register("p3", Resources::new().add_dynamic(NUMBERS, |_| vec![4]));
        assert_eq!(registry.get(NUMBERS, &state), vec![2, 3, 4, 1]);
    }

    #[test]
    fn test_unregister_only_removes_own_entries() {
        let state = EditorState::for_tests("");
        let mut registry = ResourceRegistry::new();
        registry.register("p1", Resources::new().add(LETTERS, "a").add(NUMBERS, 1));
        registry.register("p2", Resources::new().add(LETTERS, "b"));
        assert_eq!(registry.unregister("p1"), 2);
        assert_eq!(registry.get(LETTERS, &state), vec!["b"]);
        assert!(registry.get(NUMBERS, &state).is_empty());
        assert_eq!(registry.keys(), vec!["letters"]);
    }

    #[test]
    fn test_type_mismatch_is_skipped() {
        let state = EditorState::for_tests("");
        let wrong: ResourceKey<String> = ResourceKey::new("letters");
        let mut registry = ResourceRegistry::new();
        registry.register("p1", Resources::new().add(LETTERS, "a"));
        registry.register("p2", Resources::new().add(wrong, "b".to_string()));
        assert_eq!(registry.get(LETTERS, &state), vec!["a"]);
    }

    #[test]
    fn test_isolate_contains_errors_and_panics() {
        assert!(isolate("k", "p", || Ok(())));
        assert!(!isolate("k", "p", || Err(PluginError::Failed("boom".into()))));
        assert!(!isolate("k", "p", || panic!("boom")));
    }
}
