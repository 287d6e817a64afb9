//! Registry, validation and persistence coordination for named views.
//!
//! A built view is immutable and safe for concurrent readers; the
//! registry is the only shared mutable state here and is guarded by a
//! read-write lock so validation-then-insert is atomic with respect to
//! other registrations on the same datasource.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::error::{EntityTypeViolation, Result, VantageError};
use crate::persist::ViewPersistence;
use crate::table::{FastHasher, Table};
use crate::view::View;

// ------------- Datasource -------------
/// A named collection of tables. Consumed at the boundary only; the
/// manager never looks inside a datasource's schema derivation.
pub trait Datasource: Send + Sync {
    fn name(&self) -> &str;
    fn tables(&self) -> Vec<Arc<dyn Table>>;
    fn table(&self, name: &str) -> Result<Arc<dyn Table>>;
    fn has_table(&self, name: &str) -> bool {
        self.table(name).is_ok()
    }
}

// ------------- ViewManager -------------
type Registry = HashMap<String, HashMap<String, Arc<View>, FastHasher>, FastHasher>;

pub struct ViewManager {
    persistence: Arc<dyn ViewPersistence>,
    registry: RwLock<Registry>,
}
impl ViewManager {
    pub fn new(persistence: Arc<dyn ViewPersistence>) -> Self {
        Self {
            persistence,
            registry: RwLock::new(Registry::default()),
        }
    }
    /// Load previously persisted views for the datasource's name and
    /// install them, then hand back a decorator exposing the views
    /// alongside the datasource's own tables.
    pub fn decorate(
        self: &Arc<Self>,
        datasource: Arc<dyn Datasource>,
    ) -> Result<Arc<ViewAwareDatasource>> {
        let views = self.persistence.read_views(datasource.name())?;
        {
            let mut registry = self
                .registry
                .write()
                .map_err(|e| VantageError::Lock(e.to_string()))?;
            let kept = registry.entry(datasource.name().to_owned()).or_default();
            for view in views {
                kept.insert(view.name().to_owned(), view);
            }
        }
        info!(datasource = datasource.name(), "decorated datasource");
        Ok(Arc::new(ViewAwareDatasource {
            inner: datasource,
            manager: Arc::clone(self),
        }))
    }
    /// Validate, persist and register a view. Replaces any earlier view
    /// of the same name. Validation failures and persistence failures
    /// leave the registry untouched.
    pub fn add_view(&self, datasource: &str, view: Arc<View>, comment: Option<&str>) -> Result<()> {
        let expected = view.entity_type().to_owned();
        let mut violations = Vec::new();
        for source in view.variable_value_sources() {
            let variable = source.variable();
            if variable.entity_type() != expected {
                violations.push(EntityTypeViolation {
                    variable: variable.name().to_owned(),
                    entity_type: variable.entity_type().to_owned(),
                });
            }
        }
        if !violations.is_empty() {
            return Err(VantageError::IncompatibleEntityType {
                view: view.name().to_owned(),
                expected,
                violations,
            });
        }
        // persist first, insert second, both under the write lock: the
        // in-memory registry never diverges from the persisted set
        let mut registry = self
            .registry
            .write()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        self.persistence.write_view(datasource, &view, comment)?;
        let name = view.name().to_owned();
        registry
            .entry(datasource.to_owned())
            .or_default()
            .insert(name.clone(), view);
        info!(datasource, view = %name, "registered view");
        Ok(())
    }
    pub fn view(&self, datasource: &str, name: &str) -> Result<Arc<View>> {
        let registry = self
            .registry
            .read()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        registry
            .get(datasource)
            .and_then(|kept| kept.get(name))
            .cloned()
            .ok_or_else(|| VantageError::NoSuchTable {
                datasource: datasource.to_owned(),
                table: name.to_owned(),
            })
    }
    /// Registered views of a datasource, ordered by name.
    pub fn views(&self, datasource: &str) -> Result<Vec<Arc<View>>> {
        let registry = self
            .registry
            .read()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        let mut views: Vec<Arc<View>> = registry
            .get(datasource)
            .map(|kept| kept.values().cloned().collect())
            .unwrap_or_default();
        views.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(views)
    }
    pub fn has_view(&self, datasource: &str, name: &str) -> bool {
        self.view(datasource, name).is_ok()
    }
    /// Remove one view; other views and the wrapped table are untouched.
    pub fn remove_view(&self, datasource: &str, name: &str) -> Result<()> {
        let mut registry = self
            .registry
            .write()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        self.persistence.remove_view(datasource, name)?;
        if let Some(kept) = registry.get_mut(datasource) {
            kept.remove(name);
        }
        info!(datasource, view = name, "removed view");
        Ok(())
    }
}

// ------------- ViewAwareDatasource -------------
/// Decorator over a datasource whose table listing is extended by the
/// views registered for it. Views shadow same-named wrapped tables.
pub struct ViewAwareDatasource {
    inner: Arc<dyn Datasource>,
    manager: Arc<ViewManager>,
}
impl ViewAwareDatasource {
    pub fn wrapped(&self) -> &Arc<dyn Datasource> {
        &self.inner
    }
}
impl Datasource for ViewAwareDatasource {
    fn name(&self) -> &str {
        self.inner.name()
    }
    fn tables(&self) -> Vec<Arc<dyn Table>> {
        let mut tables = self.inner.tables();
        if let Ok(views) = self.manager.views(self.name()) {
            for view in views {
                tables.retain(|t| t.name() != view.name());
                tables.push(view);
            }
        }
        tables
    }
    fn table(&self, name: &str) -> Result<Arc<dyn Table>> {
        match self.manager.view(self.name(), name) {
            Ok(view) => Ok(view),
            Err(VantageError::NoSuchTable { .. }) => self.inner.table(name),
            Err(e) => Err(e),
        }
    }
}
