//! Named layout registry

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use gridworld_core::{GridError, Result};

use crate::grid::{GridConfig, GridWorld};
use crate::layouts;

type LayoutConstructor = Box<dyn Fn() -> GridConfig + Send + Sync>;

lazy_static::lazy_static! {
    static ref REGISTRY: Arc<Mutex<LayoutRegistry>> =
        Arc::new(Mutex::new(LayoutRegistry::with_builtins()));
}

/// Named grid layouts
pub struct LayoutRegistry {
    layouts: HashMap<String, LayoutConstructor>,
}

impl LayoutRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            layouts: HashMap::new(),
        }
    }

    /// Registry holding `classic`, `terminal`, `shifting` and `jump`
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("classic", layouts::classic);
        registry.register("terminal", layouts::terminal);
        registry.register("shifting", layouts::shifting);
        registry.register("jump", layouts::jump);
        registry
    }

    /// Register a layout, replacing any layout with the same name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> GridConfig + Send + Sync + 'static,
    {
        self.layouts.insert(name.into(), Box::new(constructor));
    }

    /// Configuration of a named layout
    pub fn config(&self, name: &str) -> Result<GridConfig> {
        self.layouts
            .get(name)
            .map(|constructor| constructor())
            .ok_or_else(|| GridError::config(format!("unknown layout: {name}")))
    }

    /// Build a grid from a named layout
    pub fn make(&self, name: &str) -> Result<GridWorld> {
        GridWorld::new(self.config(name)?)
    }

    /// Registered layout names, sorted
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.layouts.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

fn registry() -> MutexGuard<'static, LayoutRegistry> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Register a layout globally
pub fn register_layout<F>(name: impl Into<String>, constructor: F)
where
    F: Fn() -> GridConfig + Send + Sync + 'static,
{
    registry().register(name, constructor);
}

/// Configuration of a globally registered layout
pub fn layout_config(name: &str) -> Result<GridConfig> {
    registry().config(name)
}

/// Build a grid from a globally registered layout
pub fn make_grid(name: &str) -> Result<GridWorld> {
    registry().make(name)
}

/// All globally registered layout names
#[must_use]
pub fn list_layouts() -> Vec<String> {
    registry().list()
}
