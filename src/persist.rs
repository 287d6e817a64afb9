//! Persistence for view definitions. The [`ViewPersistence`] port is all
//! the [`crate::manager::ViewManager`] depends on; this module also ships
//! the two provided strategies: a process-local in-memory store and a
//! durable SQLite-backed definition store.
//!
//! Views hold live clause objects, so the durable strategy persists their
//! *definitions* and reconstructs views on read through two small SPIs:
//! [`TableResolver`] (wrapped-table lookup) and [`ClauseResolver`]
//! (definition to clause object).

// used for persistence
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clause::{AllClause, FilterClause, ListClause, ProjectClause, NameProjectClause, ValueSourceSet};
use crate::error::{Result, VantageError};
use crate::table::Table;
use crate::view::View;

// ------------- ViewDefinition -------------
/// The structural, serializable form of a view: its name, the name of the
/// wrapped table, and one JSON definition per clause.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewDefinition {
    pub name: String,
    pub table: String,
    pub filter: serde_json::Value,
    pub project: serde_json::Value,
    pub list: serde_json::Value,
}

// ------------- ViewPersistence -------------
/// The persistence port. Writes replace any earlier view of the same name
/// within the datasource.
pub trait ViewPersistence: Send + Sync {
    fn read_views(&self, datasource: &str) -> Result<Vec<Arc<View>>>;
    fn write_view(&self, datasource: &str, view: &Arc<View>, comment: Option<&str>) -> Result<()>;
    fn remove_view(&self, datasource: &str, name: &str) -> Result<()>;
}

// ------------- MemoryViewPersistence -------------
/// Keeps live views per datasource. Suited for tests and for processes
/// that do not need view definitions to survive a restart.
pub struct MemoryViewPersistence {
    views: Mutex<HashMap<String, Vec<Arc<View>>>>,
}
impl MemoryViewPersistence {
    pub fn new() -> Self {
        Self {
            views: Mutex::new(HashMap::new()),
        }
    }
}
impl Default for MemoryViewPersistence {
    fn default() -> Self {
        Self::new()
    }
}
impl ViewPersistence for MemoryViewPersistence {
    fn read_views(&self, datasource: &str) -> Result<Vec<Arc<View>>> {
        let views = self
            .views
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        Ok(views.get(datasource).cloned().unwrap_or_default())
    }
    fn write_view(&self, datasource: &str, view: &Arc<View>, _comment: Option<&str>) -> Result<()> {
        let mut views = self
            .views
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        let kept = views.entry(datasource.to_owned()).or_default();
        match kept.iter().position(|v| v.name() == view.name()) {
            Some(i) => kept[i] = Arc::clone(view),
            None => kept.push(Arc::clone(view)),
        }
        Ok(())
    }
    fn remove_view(&self, datasource: &str, name: &str) -> Result<()> {
        let mut views = self
            .views
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        if let Some(kept) = views.get_mut(datasource) {
            kept.retain(|v| v.name() != name);
        }
        Ok(())
    }
}

// ------------- Resolvers -------------
/// Looks a wrapped table up by name when a persisted view is rebuilt.
pub trait TableResolver: Send + Sync {
    fn resolve(&self, datasource: &str, table: &str) -> Result<Arc<dyn Table>>;
}

/// Turns persisted clause definitions back into clause objects. External
/// clause kinds (scripted expressions and the like) come with their own
/// resolver; [`BasicClauseResolver`] covers the in-crate durable clauses.
pub trait ClauseResolver: Send + Sync {
    fn filter(&self, definition: &serde_json::Value) -> Result<Arc<dyn FilterClause>>;
    fn project(&self, definition: &serde_json::Value) -> Result<Arc<dyn ProjectClause>>;
    fn list(&self, definition: &serde_json::Value) -> Result<Arc<dyn ListClause>>;
}

fn clause_kind(definition: &serde_json::Value) -> Result<&str> {
    definition
        .get("kind")
        .and_then(|k| k.as_str())
        .ok_or_else(|| VantageError::Definition(format!("clause definition without kind: {definition}")))
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BasicClauseResolver;
impl ClauseResolver for BasicClauseResolver {
    fn filter(&self, definition: &serde_json::Value) -> Result<Arc<dyn FilterClause>> {
        match clause_kind(definition)? {
            "all" => Ok(Arc::new(AllClause)),
            kind => Err(VantageError::Definition(format!(
                "unknown filter clause kind '{kind}'"
            ))),
        }
    }
    fn project(&self, definition: &serde_json::Value) -> Result<Arc<dyn ProjectClause>> {
        match clause_kind(definition)? {
            "all" => Ok(Arc::new(AllClause)),
            "names" => {
                let clause: NameProjectClause = serde_json::from_value(definition.clone())?;
                Ok(Arc::new(clause))
            }
            kind => Err(VantageError::Definition(format!(
                "unknown project clause kind '{kind}'"
            ))),
        }
    }
    fn list(&self, definition: &serde_json::Value) -> Result<Arc<dyn ListClause>> {
        match clause_kind(definition)? {
            "none" => Ok(Arc::new(ValueSourceSet::empty())),
            kind => Err(VantageError::Definition(format!(
                "unknown list clause kind '{kind}'"
            ))),
        }
    }
}

// ------------- SqliteViewPersistence -------------
/// Durable view definition store.
pub struct SqliteViewPersistence {
    conn: Mutex<Connection>,
    tables: Arc<dyn TableResolver>,
    clauses: Arc<dyn ClauseResolver>,
}
impl SqliteViewPersistence {
    pub fn new(
        connection: Connection,
        tables: Arc<dyn TableResolver>,
        clauses: Arc<dyn ClauseResolver>,
    ) -> Result<Self> {
        connection.execute_batch(
            "
            create table if not exists ViewDefinition (
                Datasource text not null,
                Name text not null,
                Definition text not null,
                Comment text null,
                constraint unique_View primary key (
                    Datasource,
                    Name
                )
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(connection),
            tables,
            clauses,
        })
    }
}
impl ViewPersistence for SqliteViewPersistence {
    fn read_views(&self, datasource: &str) -> Result<Vec<Arc<View>>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        let mut all_views = conn.prepare_cached(
            "
            select Definition
                from ViewDefinition
                where Datasource = ?
                order by Name
            ",
        )?;
        let definitions = all_views
            .query_map(params![datasource], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut views = Vec::with_capacity(definitions.len());
        for text in definitions {
            let definition: ViewDefinition = serde_json::from_str(&text)?;
            let wrapped = self.tables.resolve(datasource, &definition.table)?;
            let view = View::build(definition.name.clone(), wrapped)
                .filter(self.clauses.filter(&definition.filter)?)
                .project(self.clauses.project(&definition.project)?)
                .list(self.clauses.list(&definition.list)?)
                .build();
            debug!(datasource, view = %definition.name, "restored view definition");
            views.push(view);
        }
        Ok(views)
    }
    fn write_view(&self, datasource: &str, view: &Arc<View>, comment: Option<&str>) -> Result<()> {
        let definition = serde_json::to_string(&view.definition()?)?;
        let conn = self
            .conn
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        let mut add_view = conn.prepare_cached(
            "
            insert or replace into ViewDefinition (
                Datasource,
                Name,
                Definition,
                Comment
            ) values (?, ?, ?, ?)
            ",
        )?;
        add_view.execute(params![datasource, view.name(), definition, comment])?;
        debug!(datasource, view = view.name(), "persisted view definition");
        Ok(())
    }
    fn remove_view(&self, datasource: &str, name: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VantageError::Lock(e.to_string()))?;
        let mut remove_view = conn.prepare_cached(
            "
            delete from ViewDefinition
                where Datasource = ?
                and Name = ?
            ",
        )?;
        remove_view.execute(params![datasource, name])?;
        debug!(datasource, view = name, "removed view definition");
        Ok(())
    }
}
