use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

// ------------- Category -------------
/// One admissible discrete label of a categorical variable.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Category {
    name: String,
    attributes: BTreeMap<String, String>,
}
impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}
impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ------------- Variable -------------
/// Named, typed metadata describing one measured attribute of an entity
/// type. Immutable once built; within a table a variable is uniquely
/// identified by its name, so equality, ordering and hashing all go by
/// name alone.
#[derive(Clone, Eq, Debug, Serialize, Deserialize)]
pub struct Variable {
    name: String,
    value_type: ValueType,
    entity_type: String,
    categories: Vec<Category>,
    attributes: BTreeMap<String, String>,
}
impl Variable {
    pub fn build(
        name: impl Into<String>,
        value_type: ValueType,
        entity_type: impl Into<String>,
    ) -> VariableBuilder {
        VariableBuilder {
            variable: Variable {
                name: name.into(),
                value_type,
                entity_type: entity_type.into(),
                categories: Vec::new(),
                attributes: BTreeMap::new(),
            },
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name() == name)
    }
    pub fn is_categorical(&self) -> bool {
        !self.categories.is_empty()
    }
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
impl Ord for Variable {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}
impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Hash for Variable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}::<{}>", self.name, self.value_type)
    }
}

// ------------- VariableBuilder -------------
pub struct VariableBuilder {
    variable: Variable,
}
impl VariableBuilder {
    /// Categories form an ordered, name-unique set: re-adding a name
    /// replaces the earlier category in place.
    pub fn add_category(mut self, category: Category) -> Self {
        match self
            .variable
            .categories
            .iter()
            .position(|c| c.name() == category.name())
        {
            Some(i) => self.variable.categories[i] = category,
            None => self.variable.categories.push(category),
        }
        self
    }
    pub fn add_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variable.attributes.insert(key.into(), value.into());
        self
    }
    pub fn build(self) -> Variable {
        self.variable
    }
}
