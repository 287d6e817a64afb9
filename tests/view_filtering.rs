use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use vantage::clause::{FilterClause, FilterFn};
use vantage::error::VantageError;
use vantage::table::{StaticTable, Table, ValueSet, VariableEntity};
use vantage::value::{Value, ValueType};
use vantage::variable::Variable;
use vantage::view::View;

fn census() -> Arc<StaticTable> {
    StaticTable::build("census", "participant")
        .add_variable(Variable::build("name", ValueType::Text, "participant").build())
        .add_variable(Variable::build("age", ValueType::Integer, "participant").build())
        .add_row(
            "id1",
            vec![
                ("name", Value::Text("Alice".into())),
                ("age", Value::Integer(34)),
            ],
        )
        .add_row(
            "id2",
            vec![
                ("name", Value::Text("Bob".into())),
                ("age", Value::Integer(16)),
            ],
        )
        .build()
        .expect("table")
}

fn entity(id: &str) -> VariableEntity {
    VariableEntity::new("participant", id)
}

fn only_id1() -> Arc<dyn FilterClause> {
    Arc::new(FilterFn(|vs: &ValueSet| vs.entity().identifier() == "id1"))
}

#[test]
fn default_filter_accepts_everything() {
    let view = View::build("view", census()).build();
    assert!(view.has_value_set(&entity("id1")));
    assert!(view.has_value_set(&entity("id2")));
    assert!(!view.has_value_set(&entity("id3")));
    assert_eq!(view.value_sets().count(), 2);
}

#[test]
fn excluding_filter_hides_the_entity() {
    let view = View::build("view", census()).filter(only_id1()).build();
    assert!(view.has_value_set(&entity("id1")));
    assert!(!view.has_value_set(&entity("id2")));
    let err = view.value_set(&entity("id2")).unwrap_err();
    assert!(matches!(err, VantageError::NoSuchValueSet { .. }));
}

#[test]
fn value_set_belongs_to_the_view_not_the_wrapped_table() {
    let view = View::build("view", census()).build();
    let value_set = view.value_set(&entity("id1")).expect("value set");
    assert_eq!(value_set.table_name(), "view");
    assert_ne!(value_set.table_name(), "census");
    // the wrapped table's handle is remembered underneath
    assert_eq!(value_set.unwrapped().table_name(), "census");
}

#[test]
fn enumeration_yields_only_accepted_value_sets() {
    let view = View::build("view", census()).filter(only_id1()).build();
    let value_sets: Vec<ValueSet> = view.value_sets().collect();
    assert_eq!(value_sets.len(), 1);
    assert_eq!(value_sets[0].entity().identifier(), "id1");
    assert_eq!(value_sets[0].table_name(), "view");
}

#[test]
fn enumeration_is_lazy_and_restartable() {
    let evaluated = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evaluated);
    let view = View::build("view", census())
        .filter(Arc::new(FilterFn(move |_vs: &ValueSet| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })))
        .build();
    // pulling one element evaluates the filter once
    let first = view.value_sets().next();
    assert!(first.is_some());
    assert_eq!(evaluated.load(Ordering::SeqCst), 1);
    // a fresh call starts the enumeration over
    assert_eq!(view.value_sets().count(), 2);
    assert_eq!(evaluated.load(Ordering::SeqCst), 3);
}

#[test]
fn views_wrap_views_and_filters_compose() {
    let adults = View::build("adults", census())
        .filter(Arc::new(FilterFn(|vs: &ValueSet| {
            vs.entity().identifier() != "id2"
        })))
        .build();
    let none = View::build("none", adults.clone())
        .filter(Arc::new(FilterFn(|vs: &ValueSet| {
            vs.entity().identifier() != "id1"
        })))
        .build();
    assert_eq!(adults.value_sets().count(), 1);
    assert_eq!(none.value_sets().count(), 0);
    let value_set = adults.value_set(&entity("id1")).expect("value set");
    assert_eq!(value_set.table_name(), "adults");
    assert!(!none.has_value_set(&entity("id1")));
}

#[test]
fn filter_rejection_also_blocks_value_retrieval() {
    let table = census();
    let age = table.variable("age").expect("variable");
    let view = View::build("view", table.clone()).filter(only_id1()).build();
    let rejected = table.value_set(&entity("id2")).expect("wrapped value set");
    let err = view.value(&age, &rejected).unwrap_err();
    assert!(matches!(err, VantageError::NoSuchValueSet { .. }));
    let accepted = view.value_set(&entity("id1")).expect("value set");
    assert_eq!(view.value(&age, &accepted).expect("value"), Value::Integer(34));
}

#[test]
fn entity_type_and_timestamps_delegate_to_the_wrapped_table() {
    let table = census();
    let view = View::build("view", table.clone()).build();
    assert_eq!(view.entity_type(), "participant");
    assert_eq!(view.timestamps(), table.timestamps());
}
