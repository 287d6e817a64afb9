//! Pluggable policies attached to a view: a filter clause decides which
//! entities are visible, a project clause decides which wrapped variables
//! are exposed, and a list clause supplies explicit variable value
//! sources for computed or substituted variables.
//!
//! Implementations outside this crate (a scripting-expression engine, for
//! example) plug in through these same traits. A clause that can describe
//! itself as JSON is durable and survives the view definition store; one
//! that cannot simply returns `None` from `definition`.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, VantageError};
use crate::table::ValueSet;
use crate::value::Value;
use crate::variable::Variable;

// ------------- Clause traits -------------
/// Where-policy: accept or reject an entity's value set.
///
/// Must be side-effect-free and deterministic per entity; it is evaluated
/// lazily, one value set at a time, never against a whole table at once.
pub trait FilterClause: Send + Sync {
    fn accepts(&self, value_set: &ValueSet) -> bool;
    fn definition(&self) -> Option<serde_json::Value> {
        None
    }
}

impl fmt::Debug for dyn FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.definition() {
            Some(definition) => write!(f, "FilterClause({definition})"),
            None => write!(f, "FilterClause"),
        }
    }
}

/// Select-policy: accept or reject a wrapped variable. A rejected
/// variable behaves as absent on the view.
pub trait ProjectClause: Send + Sync {
    fn selects(&self, variable: &Variable) -> bool;
    fn definition(&self) -> Option<serde_json::Value> {
        None
    }
}

/// List-policy: an ordered collection of named variable value sources,
/// either synthesizing variables the wrapped table does not have or
/// replacing the semantics of ones it does. List entries shadow
/// same-named wrapped variables.
pub trait ListClause: Send + Sync {
    fn sources(&self) -> Vec<Arc<dyn VariableValueSource>>;
    fn source(&self, name: &str) -> Option<Arc<dyn VariableValueSource>> {
        self.sources().into_iter().find(|s| s.name() == name)
    }
    fn definition(&self) -> Option<serde_json::Value> {
        None
    }
}

impl fmt::Debug for dyn ListClause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.definition() {
            Some(definition) => write!(f, "ListClause({definition})"),
            None => write!(f, "ListClause"),
        }
    }
}

// ------------- VariableValueSource -------------
/// A fully-formed variable paired with the computation of its value for
/// a given value set.
pub trait VariableValueSource: Send + Sync {
    fn variable(&self) -> &Variable;
    fn value(&self, value_set: &ValueSet) -> Result<Value>;
    fn name(&self) -> &str {
        self.variable().name()
    }
}

/// A computed variable: a variable plus a closure deriving its value.
pub struct DerivedValueSource {
    variable: Variable,
    derive: Box<dyn Fn(&ValueSet) -> Value + Send + Sync>,
}
impl DerivedValueSource {
    pub fn new(
        variable: Variable,
        derive: impl Fn(&ValueSet) -> Value + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            variable,
            derive: Box::new(derive),
        })
    }
}
impl VariableValueSource for DerivedValueSource {
    fn variable(&self) -> &Variable {
        &self.variable
    }
    fn value(&self, value_set: &ValueSet) -> Result<Value> {
        Ok((self.derive)(value_set))
    }
}
impl fmt::Debug for DerivedValueSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DerivedValueSource({})", self.variable)
    }
}

// ------------- AllClause -------------
/// The default policy: everything passes. Selected at build time when no
/// clause was attached, so call sites never check for absence.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllClause;
impl FilterClause for AllClause {
    fn accepts(&self, _value_set: &ValueSet) -> bool {
        true
    }
    fn definition(&self) -> Option<serde_json::Value> {
        Some(json!({ "kind": "all" }))
    }
}
impl ProjectClause for AllClause {
    fn selects(&self, _variable: &Variable) -> bool {
        true
    }
    fn definition(&self) -> Option<serde_json::Value> {
        Some(json!({ "kind": "all" }))
    }
}

// ------------- Closure adapters -------------
pub struct FilterFn<F>(pub F);
impl<F> FilterClause for FilterFn<F>
where
    F: Fn(&ValueSet) -> bool + Send + Sync,
{
    fn accepts(&self, value_set: &ValueSet) -> bool {
        (self.0)(value_set)
    }
}

pub struct ProjectFn<F>(pub F);
impl<F> ProjectClause for ProjectFn<F>
where
    F: Fn(&Variable) -> bool + Send + Sync,
{
    fn selects(&self, variable: &Variable) -> bool {
        (self.0)(variable)
    }
}

// ------------- NameProjectClause -------------
/// Selects exactly the named variables. Durable: its definition is the
/// name list itself.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NameProjectClause {
    names: Vec<String>,
}
impl NameProjectClause {
    pub fn new(names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
}
impl ProjectClause for NameProjectClause {
    fn selects(&self, variable: &Variable) -> bool {
        self.names.iter().any(|n| n == variable.name())
    }
    fn definition(&self) -> Option<serde_json::Value> {
        Some(json!({ "kind": "names", "names": self.names }))
    }
}

// ------------- ValueSourceSet -------------
/// The standard list clause: an ordered, name-unique set of variable
/// value sources. Construction validates the whole list and reports every
/// duplicated name in one error rather than failing on the first.
pub struct ValueSourceSet {
    sources: Vec<Arc<dyn VariableValueSource>>,
}
impl ValueSourceSet {
    pub fn empty() -> Self {
        Self { sources: Vec::new() }
    }
    pub fn new(owner: &str, sources: Vec<Arc<dyn VariableValueSource>>) -> Result<Self> {
        let mut seen: Vec<&str> = Vec::new();
        let mut duplicated: Vec<String> = Vec::new();
        for source in &sources {
            let name = source.name();
            if seen.contains(&name) {
                if !duplicated.iter().any(|d| d == name) {
                    duplicated.push(name.to_owned());
                }
            } else {
                seen.push(name);
            }
        }
        if !duplicated.is_empty() {
            return Err(VantageError::DuplicateVariableNames {
                table: owner.to_owned(),
                names: duplicated,
            });
        }
        Ok(Self { sources })
    }
    pub fn len(&self) -> usize {
        self.sources.len()
    }
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
impl fmt::Debug for ValueSourceSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.sources.iter().map(|s| s.name())).finish()
    }
}
impl ListClause for ValueSourceSet {
    fn sources(&self) -> Vec<Arc<dyn VariableValueSource>> {
        self.sources.clone()
    }
    fn source(&self, name: &str) -> Option<Arc<dyn VariableValueSource>> {
        self.sources.iter().find(|s| s.name() == name).cloned()
    }
    fn definition(&self) -> Option<serde_json::Value> {
        // computed sources carry closures and are not durable; only the
        // empty set round-trips through the definition store
        if self.sources.is_empty() {
            Some(json!({ "kind": "none" }))
        } else {
            None
        }
    }
}
