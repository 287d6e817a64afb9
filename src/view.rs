//! The view composite: wraps exactly one table, applies the attached
//! clause policies, and itself satisfies the [`Table`] contract so that
//! views can wrap views.
//!
//! A built view is immutable and owns no entities or values of its own;
//! all variability is delegated to the wrapped table and the clauses.

use std::sync::Arc;

use crate::clause::{
    AllClause, FilterClause, ListClause, ProjectClause, ValueSourceSet, VariableValueSource,
};
use crate::error::{Result, VantageError};
use crate::persist::ViewDefinition;
use crate::table::{Table, Timestamps, ValueSet, VariableEntity};
use crate::value::Value;
use crate::variable::Variable;

// ------------- View -------------
pub struct View {
    name: String,
    wrapped: Arc<dyn Table>,
    filter: Arc<dyn FilterClause>,
    project: Arc<dyn ProjectClause>,
    list: Arc<dyn ListClause>,
}
impl View {
    /// Start composing a view over `wrapped`. Clauses left unattached
    /// default to accept-all policies.
    pub fn build(name: impl Into<String>, wrapped: Arc<dyn Table>) -> ViewBuilder {
        ViewBuilder {
            name: name.into(),
            wrapped,
            filter: None,
            project: None,
            list: None,
        }
    }
    pub fn wrapped(&self) -> &Arc<dyn Table> {
        &self.wrapped
    }
    /// Every variable value source the view exposes: list-clause sources
    /// first, then one source per wrapped variable that passes the
    /// project clause and is not shadowed by a list entry. Registration
    /// validation runs over exactly this merge.
    pub fn variable_value_sources(&self) -> Vec<Arc<dyn VariableValueSource>> {
        let mut sources = self.list.sources();
        for variable in self.wrapped.variables() {
            if !self.project.selects(&variable) {
                continue;
            }
            if sources.iter().any(|s| s.name() == variable.name()) {
                continue;
            }
            if let Ok(source) = self.wrapped.variable_value_source(variable.name()) {
                sources.push(source);
            }
        }
        sources
    }
    /// Structural serialization for the definition store. Fails when an
    /// attached clause has no durable definition.
    pub fn definition(&self) -> Result<ViewDefinition> {
        let clause = |kind: &str, def: Option<serde_json::Value>| {
            def.ok_or_else(|| {
                VantageError::Definition(format!(
                    "{} clause of view '{}' has no durable definition",
                    kind, self.name
                ))
            })
        };
        Ok(ViewDefinition {
            name: self.name.clone(),
            table: self.wrapped.name().to_owned(),
            filter: clause("filter", self.filter.definition())?,
            project: clause("project", self.project.definition())?,
            list: clause("list", self.list.definition())?,
        })
    }
    fn no_such_value_set(&self, entity: &VariableEntity) -> VantageError {
        VantageError::NoSuchValueSet {
            table: self.name.clone(),
            entity: entity.clone(),
        }
    }
    fn no_such_variable(&self, name: &str) -> VantageError {
        VantageError::NoSuchVariable {
            table: self.name.clone(),
            variable: name.to_owned(),
        }
    }
}
impl Table for View {
    fn name(&self) -> &str {
        &self.name
    }
    fn entity_type(&self) -> &str {
        self.wrapped.entity_type()
    }
    fn timestamps(&self) -> Timestamps {
        self.wrapped.timestamps()
    }
    fn has_value_set(&self, entity: &VariableEntity) -> bool {
        self.wrapped.has_value_set(entity)
            && match self.wrapped.value_set(entity) {
                Ok(value_set) => self.filter.accepts(&value_set),
                Err(_) => false,
            }
    }
    fn value_set(&self, entity: &VariableEntity) -> Result<ValueSet> {
        let inner = self
            .wrapped
            .value_set(entity)
            .map_err(|_| self.no_such_value_set(entity))?;
        if !self.filter.accepts(&inner) {
            return Err(self.no_such_value_set(entity));
        }
        Ok(ValueSet::wrap(self.name.clone(), inner))
    }
    fn value_sets(&self) -> Box<dyn Iterator<Item = ValueSet> + '_> {
        // a pure pull-through filter stream; nothing is materialized and
        // the caller may stop early
        Box::new(
            self.wrapped
                .value_sets()
                .filter(|vs| self.filter.accepts(vs))
                .map(|vs| ValueSet::wrap(self.name.clone(), vs)),
        )
    }
    fn variables(&self) -> Vec<Variable> {
        self.variable_value_sources()
            .iter()
            .map(|s| s.variable().clone())
            .collect()
    }
    fn variable(&self, name: &str) -> Result<Variable> {
        if let Some(source) = self.list.source(name) {
            return Ok(source.variable().clone());
        }
        let variable = self
            .wrapped
            .variable(name)
            .map_err(|_| self.no_such_variable(name))?;
        if !self.project.selects(&variable) {
            return Err(self.no_such_variable(name));
        }
        Ok(variable)
    }
    fn variable_value_source(&self, name: &str) -> Result<Arc<dyn VariableValueSource>> {
        if let Some(source) = self.list.source(name) {
            return Ok(source);
        }
        let variable = self
            .wrapped
            .variable(name)
            .map_err(|_| self.no_such_variable(name))?;
        if !self.project.selects(&variable) {
            return Err(self.no_such_variable(name));
        }
        self.wrapped
            .variable_value_source(name)
            .map_err(|_| self.no_such_variable(name))
    }
    fn value(&self, variable: &Variable, value_set: &ValueSet) -> Result<Value> {
        // sources were defined against the wrapped table's scope
        let inner = value_set.unwrapped();
        if !self.filter.accepts(inner) {
            return Err(self.no_such_value_set(inner.entity()));
        }
        // list entries are authoritative, regardless of the project clause
        match self.list.source(variable.name()) {
            Some(source) => source.value(inner),
            None => {
                if !self.project.selects(variable) {
                    return Err(self.no_such_variable(variable.name()));
                }
                self.wrapped.value(variable, inner)
            }
        }
    }
}

// ------------- ViewBuilder -------------
pub struct ViewBuilder {
    name: String,
    wrapped: Arc<dyn Table>,
    filter: Option<Arc<dyn FilterClause>>,
    project: Option<Arc<dyn ProjectClause>>,
    list: Option<Arc<dyn ListClause>>,
}
impl ViewBuilder {
    pub fn filter(mut self, clause: Arc<dyn FilterClause>) -> Self {
        self.filter = Some(clause);
        self
    }
    pub fn project(mut self, clause: Arc<dyn ProjectClause>) -> Self {
        self.project = Some(clause);
        self
    }
    pub fn list(mut self, clause: Arc<dyn ListClause>) -> Self {
        self.list = Some(clause);
        self
    }
    pub fn build(self) -> Arc<View> {
        Arc::new(View {
            name: self.name,
            wrapped: self.wrapped,
            filter: self.filter.unwrap_or_else(|| Arc::new(AllClause)),
            project: self.project.unwrap_or_else(|| Arc::new(AllClause)),
            list: self.list.unwrap_or_else(|| Arc::new(ValueSourceSet::empty())),
        })
    }
}
