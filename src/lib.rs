//! Vantage: read-only view composition over heterogeneous tabular datasets.
//!
//! Vantage centers on the *view* concept: a derived, read-only table that
//! wraps exactly one base table and composes three independently pluggable
//! policies on top of it, without copying or mutating the underlying data:
//! * A [`clause::FilterClause`] decides which entities are visible.
//! * A [`clause::ProjectClause`] decides which wrapped variables are exposed.
//! * A [`clause::ListClause`] supplies explicit variable value sources for
//!   computed variables, or substitutes the semantics of existing ones.
//!
//! Every table, base table or view alike, satisfies the same [`table::Table`]
//! contract (entity enumeration, per-entity value sets, variable lookup,
//! lazy bulk enumeration), which is what lets views wrap views uniformly.
//!
//! ## Modules
//! * [`value`] - Typed, immutable scalar/sequence values and their types.
//! * [`variable`] - Variables with categories and attributes.
//! * [`table`] - Entities, value-set handles, the table contract, and a
//!   simple in-memory base table.
//! * [`clause`] - The pluggable clause policies and value sources.
//! * [`view`] - The view composite and its builder.
//! * [`manager`] - The per-datasource view registry with validation.
//! * [`persist`] - The view definition store (in-memory and SQLite).
//! * [`error`] - The crate-wide error type.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use vantage::clause::FilterFn;
//! use vantage::table::{StaticTable, Table, ValueSet};
//! use vantage::value::{Value, ValueType};
//! use vantage::variable::Variable;
//! use vantage::view::View;
//!
//! let table = StaticTable::build("census", "participant")
//!     .add_variable(Variable::build("age", ValueType::Integer, "participant").build())
//!     .add_row("id1", vec![("age", Value::Integer(34))])
//!     .add_row("id2", vec![("age", Value::Integer(16))])
//!     .build()
//!     .unwrap();
//! let age = table.variable("age").unwrap();
//! let inner = table.clone();
//! let adults = View::build("adults", table)
//!     .filter(Arc::new(FilterFn(move |vs: &ValueSet| {
//!         matches!(inner.value(&age, vs), Ok(Value::Integer(n)) if n >= 18)
//!     })))
//!     .build();
//! assert_eq!(adults.value_sets().count(), 1);
//! ```
//!
//! ## Registration & Persistence
//! The [`manager::ViewManager`] owns the set of named views per datasource,
//! validates entity-type compatibility at registration time, and keeps the
//! registry in lock-step with a [`persist::ViewPersistence`] store. Views
//! built from durable clauses survive restarts through the SQLite-backed
//! definition store.

pub mod clause;
pub mod error;
pub mod manager;
pub mod persist;
pub mod table;
pub mod value;
pub mod variable;
pub mod view;
