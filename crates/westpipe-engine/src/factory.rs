//! Module construction from type tags.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Document, MODULE_TYPE_KEY};
use crate::error::ModuleError;
use crate::module::{Module, RenderSink, RenderTarget};
use crate::modules::{BarChart, LineChart, Odometry};
use crate::registry::ModuleRegistry;

type Constructor = Box<dyn Fn(RenderTarget) -> Box<dyn Module> + Send + Sync>;

/// Maps case-insensitive type tags to module constructors.
#[derive(Default)]
pub struct ModuleFactory {
    constructors: HashMap<String, Constructor>,
}

/// Result of building modules from a configuration document.
pub struct BuildOutcome {
    pub registry: ModuleRegistry,
    /// Modules that were not created, by id, in document order.
    pub failures: Vec<(String, ModuleError)>,
}

impl ModuleFactory {
    /// A factory with no module types.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory with the built-in `linechart`, `barchart` and `odometry` types.
    pub fn with_builtin() -> Self {
        let mut factory = Self::new();
        factory.register(LineChart::TAG, |target| Box::new(LineChart::new(target)));
        factory.register(BarChart::TAG, |target| Box::new(BarChart::new(target)));
        factory.register(Odometry::TAG, |target| Box::new(Odometry::new(target)));
        factory
    }

    /// Add or replace a module type.
    pub fn register<F>(&mut self, tag: &str, constructor: F) -> &mut Self
    where
        F: Fn(RenderTarget) -> Box<dyn Module> + Send + Sync + 'static,
    {
        self.constructors
            .insert(tag.to_ascii_lowercase(), Box::new(constructor));
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.constructors.contains_key(&tag.to_ascii_lowercase())
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Create an uninitialized module. Unknown tags yield `None`.
    pub fn create(&self, tag: &str, target: RenderTarget) -> Option<Box<dyn Module>> {
        self.constructors
            .get(&tag.to_ascii_lowercase())
            .map(|constructor| constructor(target))
    }

    /// Create, initialize and register every module in `document`.
    ///
    /// Each entry succeeds or fails on its own. Entries without a known type
    /// stay unregistered; a module whose `initialize` fails is still
    /// registered with whatever configuration it read, and the failure is
    /// reported alongside.
    pub fn build(&self, document: Document, sink: &Arc<dyn RenderSink>) -> BuildOutcome {
        let mut registry = ModuleRegistry::new();
        let mut failures = Vec::new();

        for id in document.malformed() {
            warn!(module_id = %id, "module entry is not an object");
            failures.push((id.clone(), ModuleError::NotAnObject));
        }

        for (id, config) in document.into_entries() {
            let created = match config.get(MODULE_TYPE_KEY) {
                Some(Value::String(tag)) => {
                    let target = RenderTarget::new(id.clone(), Arc::clone(sink));
                    self.create(tag, target)
                        .ok_or_else(|| ModuleError::UnknownType(tag.clone()))
                }
                _ => Err(ModuleError::MissingType),
            };

            let mut module = match created {
                Ok(module) => module,
                Err(err) => {
                    warn!(module_id = %id, error = %err, "module not created");
                    failures.push((id, err));
                    continue;
                }
            };

            match module.initialize(&id, &config) {
                Ok(()) => {
                    debug!(module_id = %id, module_type = module.type_tag(), "module created");
                }
                Err(err) => {
                    warn!(
                        module_id = %id,
                        module_type = module.type_tag(),
                        error = %err,
                        "module initialization failed"
                    );
                    failures.push((id.clone(), err));
                }
            }
            registry.register(id, module);
        }

        BuildOutcome { registry, failures }
    }
}

impl fmt::Debug for ModuleFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleFactory")
            .field("tags", &self.tags())
            .finish()
    }
}
