use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasherDefault;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use seahash::SeaHasher;

use crate::clause::VariableValueSource;
use crate::error::{Result, VantageError};
use crate::value::Value;
use crate::variable::Variable;

// we use a fast hasher for all maps keyed by entities or names
pub type FastHasher = BuildHasherDefault<SeaHasher>;

// ------------- VariableEntity -------------
/// The unit of observation: an identifier within an entity type.
/// Value equality by (type, identifier).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct VariableEntity {
    entity_type: String,
    identifier: String,
}
impl VariableEntity {
    pub fn new(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}
impl fmt::Display for VariableEntity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.identifier)
    }
}

// ------------- Timestamps -------------
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Timestamps {
    pub created: Option<NaiveDateTime>,
    pub last_update: Option<NaiveDateTime>,
}
impl Timestamps {
    pub fn new(created: Option<NaiveDateTime>, last_update: Option<NaiveDateTime>) -> Self {
        Self { created, last_update }
    }
    pub fn now() -> Self {
        let now = Utc::now().naive_utc();
        Self {
            created: Some(now),
            last_update: Some(now),
        }
    }
}

// ------------- ValueSet -------------
/// A handle binding one entity to one table, used to fetch values lazily.
/// Never a materialized row. A handle produced by a view keeps the wrapped
/// table's handle as its parent so value retrieval can be delegated in the
/// scope the resolved source was defined against.
#[derive(Clone, Debug)]
pub struct ValueSet {
    table: String,
    entity: VariableEntity,
    parent: Option<Box<ValueSet>>,
}
impl ValueSet {
    pub fn new(table: impl Into<String>, entity: VariableEntity) -> Self {
        Self {
            table: table.into(),
            entity,
            parent: None,
        }
    }
    /// Rebind a wrapped table's handle to the wrapping view.
    pub fn wrap(table: impl Into<String>, parent: ValueSet) -> Self {
        Self {
            table: table.into(),
            entity: parent.entity.clone(),
            parent: Some(Box::new(parent)),
        }
    }
    /// The name of the table this handle belongs to. For a handle obtained
    /// from a view this is the view's name, never the wrapped table's.
    pub fn table_name(&self) -> &str {
        &self.table
    }
    pub fn entity(&self) -> &VariableEntity {
        &self.entity
    }
    pub fn parent(&self) -> Option<&ValueSet> {
        self.parent.as_deref()
    }
    /// The handle in the wrapped table's scope, or this handle itself when
    /// it was not produced by a view.
    pub fn unwrapped(&self) -> &ValueSet {
        self.parent.as_deref().unwrap_or(self)
    }
}
impl fmt::Display for ValueSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}]", self.table, self.entity)
    }
}

// ------------- Table -------------
/// The contract every data table satisfies, base tables and views alike.
/// Views implement it too, which is what lets views wrap views uniformly.
///
/// `value_sets` is a restartable lazy enumeration: each call starts afresh
/// and the caller may stop pulling at any point.
pub trait Table: Send + Sync {
    fn name(&self) -> &str;
    fn entity_type(&self) -> &str;
    fn timestamps(&self) -> Timestamps;
    fn has_value_set(&self, entity: &VariableEntity) -> bool;
    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet>;
    fn value_sets(&self) -> Box<dyn Iterator<Item = ValueSet> + '_>;
    fn variables(&self) -> Vec<Variable>;
    fn variable(&self, name: &str) -> Result<Variable>;
    fn variable_value_source(&self, name: &str) -> Result<Arc<dyn VariableValueSource>>;
    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value>;
}

// ------------- StaticTable -------------
type Rows = HashMap<VariableEntity, HashMap<String, Value, FastHasher>, FastHasher>;

/// A simple in-memory base table. Rows are kept in insertion order for
/// deterministic enumeration; cells missing from a row read as the null
/// of the variable's type.
pub struct StaticTable {
    name: String,
    entity_type: String,
    variables: Vec<Variable>,
    rows: Arc<Rows>,
    order: Vec<VariableEntity>,
    timestamps: Timestamps,
}
impl fmt::Debug for StaticTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "StaticTable({})", self.name)
    }
}
impl StaticTable {
    pub fn build(name: impl Into<String>, entity_type: impl Into<String>) -> StaticTableBuilder {
        StaticTableBuilder {
            name: name.into(),
            entity_type: entity_type.into(),
            variables: Vec::new(),
            rows: Rows::default(),
            order: Vec::new(),
        }
    }
}
impl Table for StaticTable {
    fn name(&self) -> &str {
        &self.name
    }
    fn entity_type(&self) -> &str {
        &self.entity_type
    }
    fn timestamps(&self) -> Timestamps {
        self.timestamps
    }
    fn has_value_set(&self, entity: &VariableEntity) -> bool {
        self.rows.contains_key(entity)
    }
    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet> {
        if !self.rows.contains_key(entity) {
            return Err(VantageError::NoSuchValueSet {
                table: self.name.clone(),
                entity: entity.clone(),
            });
        }
        Ok(ValueSet::new(self.name.clone(), entity.clone()))
    }
    fn value_sets(&self) -> Box<dyn Iterator<Item = ValueSet> + '_> {
        Box::new(
            self.order
                .iter()
                .map(|entity| ValueSet::new(self.name.clone(), entity.clone())),
        )
    }
    fn variables(&self) -> Vec<Variable> {
        self.variables.clone()
    }
    fn variable(&self, name: &str) -> Result<Variable> {
        self.variables
            .iter()
            .find(|v| v.name() == name)
            .cloned()
            .ok_or_else(|| VantageError::NoSuchVariable {
                table: self.name.clone(),
                variable: name.to_owned(),
            })
    }
    fn variable_value_source(&self, name: &str) -> Result<Arc<dyn VariableValueSource>> {
        let variable = self.variable(name)?;
        Ok(Arc::new(StaticValueSource {
            table: self.name.clone(),
            variable,
            rows: Arc::clone(&self.rows),
        }))
    }
    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value> {
        // an unknown variable must fail even when the cell would be null
        let variable = self.variable(variable.name())?;
        let row = self
            .rows
            .get(value_set.entity())
            .ok_or_else(|| VantageError::NoSuchValueSet {
                table: self.name.clone(),
                entity: value_set.entity().clone(),
            })?;
        Ok(row
            .get(variable.name())
            .cloned()
            .unwrap_or(variable.value_type().null()))
    }
}

/// Detached per-variable accessor over the table's shared row storage.
struct StaticValueSource {
    table: String,
    variable: Variable,
    rows: Arc<Rows>,
}
impl VariableValueSource for StaticValueSource {
    fn variable(&self) -> &Variable {
        &self.variable
    }
    fn value(&self, value_set: &ValueSet) -> Result<Value> {
        let row = self
            .rows
            .get(value_set.entity())
            .ok_or_else(|| VantageError::NoSuchValueSet {
                table: self.table.clone(),
                entity: value_set.entity().clone(),
            })?;
        Ok(row
            .get(self.variable.name())
            .cloned()
            .unwrap_or(self.variable.value_type().null()))
    }
}

// ------------- StaticTableBuilder -------------
pub struct StaticTableBuilder {
    name: String,
    entity_type: String,
    variables: Vec<Variable>,
    rows: Rows,
    order: Vec<VariableEntity>,
}
impl StaticTableBuilder {
    pub fn add_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }
    /// Values are given by variable name; unnamed cells read as null.
    pub fn add_row(
        mut self,
        identifier: impl Into<String>,
        values: Vec<(&str, Value)>,
    ) -> Self {
        let entity = VariableEntity::new(self.entity_type.clone(), identifier);
        let mut row = HashMap::default();
        for (name, value) in values {
            row.insert(name.to_owned(), value);
        }
        if self.rows.insert(entity.clone(), row).is_none() {
            self.order.push(entity);
        }
        self
    }
    /// Fails with one aggregated report naming every duplicated variable.
    pub fn build(self) -> Result<Arc<StaticTable>> {
        let mut seen = Vec::new();
        let mut duplicated = Vec::new();
        for variable in &self.variables {
            if seen.contains(&variable.name()) {
                if !duplicated.contains(&variable.name().to_owned()) {
                    duplicated.push(variable.name().to_owned());
                }
            } else {
                seen.push(variable.name());
            }
        }
        if !duplicated.is_empty() {
            return Err(VantageError::DuplicateVariableNames {
                table: self.name,
                names: duplicated,
            });
        }
        Ok(Arc::new(StaticTable {
            name: self.name,
            entity_type: self.entity_type,
            variables: self.variables,
            rows: Arc::new(self.rows),
            order: self.order,
            timestamps: Timestamps::now(),
        }))
    }
}
