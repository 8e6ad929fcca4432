use std::collections::HashMap;
use std::fmt;

use crate::module::Module;

/// Live modules keyed by id.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: HashMap<String, Box<dyn Module>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a module. A module already registered under `id` is replaced
    /// and returned.
    pub fn register(
        &mut self,
        id: impl Into<String>,
        module: Box<dyn Module>,
    ) -> Option<Box<dyn Module>> {
        self.modules.insert(id.into(), module)
    }

    pub fn get(&self, id: &str) -> Option<&dyn Module> {
        self.modules.get(id).map(|module| module.as_ref())
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut (dyn Module + 'static)> {
        self.modules.get_mut(id).map(|module| module.as_mut())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn clear(&mut self) {
        self.modules.clear();
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.ids().into_iter().filter_map(|id| {
                self.modules
                    .get(id)
                    .map(|module| (id, module.type_tag()))
            }))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::RenderTarget;
    use crate::modules::{LineChart, Odometry};

    #[test]
    fn newer_registration_replaces_older() {
        let mut registry = ModuleRegistry::new();
        assert!(registry
            .register("m", Box::new(LineChart::new(RenderTarget::detached("m"))))
            .is_none());

        let replaced = registry
            .register("m", Box::new(Odometry::new(RenderTarget::detached("m"))))
            .expect("first module should be returned");
        assert_eq!(replaced.type_tag(), "linechart");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("m").unwrap().type_tag(), "odometry");
    }

    #[test]
    fn debug_lists_ids_and_types() {
        let mut registry = ModuleRegistry::new();
        registry.register("b", Box::new(Odometry::new(RenderTarget::detached("b"))));
        registry.register("a", Box::new(LineChart::new(RenderTarget::detached("a"))));
        assert_eq!(
            format!("{registry:?}"),
            r#"{"a": "linechart", "b": "odometry"}"#
        );
        registry.clear();
        assert!(registry.is_empty());
    }
}
