//! The plugin contract and the dependency resolver.
//!
//! ## Lifecycle
//!
//! ```text
//! descriptors ──resolve_order──▶ activation order
//!     for each, in order: factory(ctx) ─▶ check shared caps ─▶ register resources
//!     for each, in order: setup(state)
//!     ...editing...
//!     for each, reversed: destroy(state) ─▶ unregister resources
//! ```
//!
//! Any failure before editing starts tears down what was already built and
//! returns the error, so a host never ends up with half an editor.
//!
//! ## Learning: Capabilities as Trait Objects
//!
//! A plugin exposes operations to its dependents as a trait object
//! (`Rc<dyn HistoryApi>`). The [`Capability`] marker trait is implemented
//! on the `dyn Trait` type itself, giving each one a static name. That
//! name is what a descriptor declares in its `shared` list and what
//! [`Dependencies::get`] looks up, while the value is recovered from
//! `Rc<dyn Any>` with a typed downcast.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use vellum_dom::DomError;

use crate::config::Config;
use crate::registry::{Resources, isolate};
use crate::state::EditorState;

/// Result type for plugin operations
pub type PluginResult<T> = Result<T, PluginError>;

/// Plugin system errors.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin {0} is configured more than once")]
    DuplicatePlugin(String),

    #[error("Plugin {plugin} depends on {dependency}, which is not configured")]
    MissingDependency { plugin: String, dependency: String },

    #[error("Plugin dependency cycle: {0}")]
    DependencyCycle(String),

    #[error("Plugin {plugin} needs the {capability} capability from one of its dependencies")]
    MissingCapability {
        plugin: String,
        capability: &'static str,
    },

    #[error("Plugin {plugin} exposes {capability} without declaring it as shared")]
    UndeclaredCapability {
        plugin: String,
        capability: &'static str,
    },

    #[error("Setup of plugin {plugin} failed: {message}")]
    Setup { plugin: String, message: String },

    #[error("Invalid command parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Failed(String),

    #[error("Document error: {0}")]
    Dom(#[from] DomError),
}

/// A named set of operations one plugin offers its dependents.
///
/// Implemented on trait object types: `impl Capability for dyn MyApi`.
pub trait Capability: 'static {
    const NAME: &'static str;
}

/// The capabilities a plugin instance exposes.
#[derive(Clone, Default)]
pub struct Capabilities {
    entries: Vec<(&'static str, Rc<dyn Any>)>,
}

impl Capabilities {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a capability handle.
    pub fn provide<C: Capability + ?Sized>(mut self, handle: Rc<C>) -> Self {
        self.entries.push((C::NAME, Rc::new(handle)));
        self
    }

    /// Looks a capability up by type.
    pub fn get<C: Capability + ?Sized>(&self) -> Option<Rc<C>> {
        self.entries
            .iter()
            .find(|(name, _)| *name == C::NAME)
            .and_then(|(_, handle)| handle.downcast_ref::<Rc<C>>())
            .cloned()
    }

    /// Names of the exposed capabilities.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }
}

/// What a plugin can reach of its declared dependencies.
#[derive(Clone)]
pub struct Dependencies {
    plugin: String,
    provided: Vec<(String, Capabilities)>,
}

impl Dependencies {
    /// Returns the capability `C` shared by one of the declared dependencies.
    pub fn get<C: Capability + ?Sized>(&self) -> PluginResult<Rc<C>> {
        self.provided
            .iter()
            .find_map(|(_, caps)| caps.get::<C>())
            .ok_or_else(|| PluginError::MissingCapability {
                plugin: self.plugin.clone(),
                capability: C::NAME,
            })
    }

    /// Ids of the dependencies, in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.provided.iter().map(|(id, _)| id.as_str())
    }
}

/// Passed to a plugin factory.
pub struct PluginContext {
    id: String,
    dependencies: Dependencies,
    config: Rc<Config>,
}

impl PluginContext {
    /// The id the plugin is being constructed under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The plugin's dependencies.
    pub fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Shorthand for `dependencies().get::<C>()`.
    pub fn dependency<C: Capability + ?Sized>(&self) -> PluginResult<Rc<C>> {
        self.dependencies.get::<C>()
    }

    /// The editor configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reads one entry of the configuration's `[options]` table.
    pub fn option<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.option(key)
    }
}

/// A feature plugin.
///
/// ## Learning: Default Trait Methods
///
/// Most plugins only contribute resources, so every method has a default
/// and an implementation overrides just what it needs.
pub trait Plugin {
    /// Contributions merged into the registry right after construction.
    fn resources(&self) -> Resources {
        Resources::new()
    }

    /// Capabilities offered to dependents.
    fn capabilities(&self) -> Capabilities {
        Capabilities::new()
    }

    /// Runs once every plugin is constructed and registered.
    fn setup(&mut self, _state: &mut EditorState) -> PluginResult<()> {
        Ok(())
    }

    /// Runs on teardown, before the plugin's resources are unregistered.
    fn destroy(&mut self, _state: &mut EditorState) {}
}

type Factory = Rc<dyn Fn(&PluginContext) -> PluginResult<Box<dyn Plugin>>>;

/// How to build one plugin.
#[derive(Clone)]
pub struct PluginDescriptor {
    /// Unique id
    pub id: String,
    /// Ids this plugin depends on, in order
    pub dependencies: Vec<String>,
    /// Capability names this plugin is allowed to expose
    pub shared: Vec<&'static str>,
    factory: Factory,
}

impl PluginDescriptor {
    /// Creates a descriptor without dependencies or shared capabilities.
    pub fn new(
        id: impl Into<String>,
        factory: impl Fn(&PluginContext) -> PluginResult<Box<dyn Plugin>> + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            dependencies: Vec::new(),
            shared: Vec::new(),
            factory: Rc::new(factory),
        }
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.dependencies.push(id.into());
        self
    }

    /// Declares that the plugin shares capability `C`.
    pub fn shares<C: Capability + ?Sized>(mut self) -> Self {
        self.shared.push(C::NAME);
        self
    }
}

impl std::fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Computes the activation order of `descriptors` as indices into it.
///
/// Depth-first: a plugin's dependencies come first, in their declared
/// order, and otherwise the configured order is kept.
pub fn resolve_order(descriptors: &[PluginDescriptor]) -> PluginResult<Vec<usize>> {
    let mut by_id = HashMap::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.iter().enumerate() {
        if by_id.insert(descriptor.id.as_str(), index).is_some() {
            return Err(PluginError::DuplicatePlugin(descriptor.id.clone()));
        }
    }

    let mut marks = vec![None; descriptors.len()];
    let mut path = Vec::new();
    let mut order = Vec::with_capacity(descriptors.len());
    for index in 0..descriptors.len() {
        visit(index, descriptors, &by_id, &mut marks, &mut path, &mut order)?;
    }
    Ok(order)
}

fn visit<'a>(
    index: usize,
    descriptors: &'a [PluginDescriptor],
    by_id: &HashMap<&'a str, usize>,
    marks: &mut [Option<Mark>],
    path: &mut Vec<&'a str>,
    order: &mut Vec<usize>,
) -> PluginResult<()> {
    let descriptor = &descriptors[index];
    match marks[index] {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = path
                .iter()
                .position(|&id| id == descriptor.id)
                .unwrap_or(0);
            let mut cycle: Vec<&str> = path[start..].to_vec();
            cycle.push(&descriptor.id);
            return Err(PluginError::DependencyCycle(cycle.join(" -> ")));
        }
        None => {}
    }

    marks[index] = Some(Mark::Visiting);
    path.push(&descriptor.id);
    for dependency in &descriptor.dependencies {
        let Some(&dep_index) = by_id.get(dependency.as_str()) else {
            return Err(PluginError::MissingDependency {
                plugin: descriptor.id.clone(),
                dependency: dependency.clone(),
            });
        };
        visit(dep_index, descriptors, by_id, marks, path, order)?;
    }
    path.pop();
    marks[index] = Some(Mark::Done);
    order.push(index);
    Ok(())
}

struct ActivePlugin {
    id: String,
    plugin: Box<dyn Plugin>,
    capabilities: Capabilities,
}

/// The live plugins of one editor, in activation order.
pub struct PluginHost {
    active: Vec<ActivePlugin>,
    torn_down: bool,
}

impl PluginHost {
    /// Resolves, constructs, registers and sets up every plugin.
    pub fn activate(
        descriptors: &[PluginDescriptor],
        state: &mut EditorState,
    ) -> PluginResult<Self> {
        let order = resolve_order(descriptors)?;
        let mut host = Self {
            active: Vec::with_capacity(order.len()),
            torn_down: false,
        };

        for index in order {
            if let Err(err) = host.construct(&descriptors[index], state) {
                tracing::warn!(plugin = %descriptors[index].id, %err, "plugin construction failed");
                host.teardown(state);
                return Err(err);
            }
        }

        for position in 0..host.active.len() {
            let active = &mut host.active[position];
            if let Err(err) = active.plugin.setup(state) {
                let err = PluginError::Setup {
                    plugin: active.id.clone(),
                    message: err.to_string(),
                };
                tracing::warn!(%err, "plugin setup failed");
                host.teardown(state);
                return Err(err);
            }
        }

        tracing::debug!(plugins = ?host.ids(), "plugins activated");
        Ok(host)
    }

    fn construct(
        &mut self,
        descriptor: &PluginDescriptor,
        state: &mut EditorState,
    ) -> PluginResult<()> {
        let provided = descriptor
            .dependencies
            .iter()
            .filter_map(|dep| {
                self.active
                    .iter()
                    .find(|a| &a.id == dep)
                    .map(|a| (dep.clone(), a.capabilities.clone()))
            })
            .collect();
        let ctx = PluginContext {
            id: descriptor.id.clone(),
            dependencies: Dependencies {
                plugin: descriptor.id.clone(),
                provided,
            },
            config: state.config_handle(),
        };

        let plugin = (descriptor.factory)(&ctx)?;
        let capabilities = plugin.capabilities();
        if let Some(capability) = capabilities
            .names()
            .find(|name| !descriptor.shared.contains(name))
        {
            return Err(PluginError::UndeclaredCapability {
                plugin: descriptor.id.clone(),
                capability,
            });
        }

        let resources = plugin.resources();
        tracing::debug!(plugin = %descriptor.id, contributions = resources.len(), "plugin constructed");
        state.resources_mut().register(&descriptor.id, resources);
        self.active.push(ActivePlugin {
            id: descriptor.id.clone(),
            plugin,
            capabilities,
        });
        Ok(())
    }

    /// Destroys every plugin in reverse activation order.
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn teardown(&mut self, state: &mut EditorState) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        while let Some(mut active) = self.active.pop() {
            isolate("destroy", &active.id, || {
                active.plugin.destroy(state);
                Ok(())
            });
            state.resources_mut().unregister(&active.id);
            tracing::debug!(plugin = %active.id, "plugin destroyed");
        }
        state.resources_mut().clear();
    }

    /// Returns true once [`Self::teardown`] has run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Ids of the live plugins, in activation order.
    pub fn ids(&self) -> Vec<&str> {
        self.active.iter().map(|a| a.id.as_str()).collect()
    }

    /// Finds capability `C` on any live plugin.
    pub fn capability<C: Capability + ?Sized>(&self) -> Option<Rc<C>> {
        self.active.iter().find_map(|a| a.capabilities.get::<C>())
    }
}
