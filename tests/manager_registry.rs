use std::sync::Arc;

use vantage::clause::{DerivedValueSource, FilterFn, ValueSourceSet, VariableValueSource};
use vantage::error::VantageError;
use vantage::manager::{Datasource, ViewManager};
use vantage::persist::{MemoryViewPersistence, ViewPersistence};
use vantage::table::{StaticTable, Table, ValueSet};
use vantage::value::{Value, ValueType};
use vantage::variable::Variable;
use vantage::view::View;

struct TestDatasource {
    name: String,
    tables: Vec<Arc<dyn Table>>,
}
impl Datasource for TestDatasource {
    fn name(&self) -> &str {
        &self.name
    }
    fn tables(&self) -> Vec<Arc<dyn Table>> {
        self.tables.clone()
    }
    fn table(&self, name: &str) -> vantage::error::Result<Arc<dyn Table>> {
        self.tables
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| VantageError::NoSuchTable {
                datasource: self.name.clone(),
                table: name.to_owned(),
            })
    }
}

fn census() -> Arc<StaticTable> {
    StaticTable::build("census", "participant")
        .add_variable(Variable::build("age", ValueType::Integer, "participant").build())
        .add_row("id1", vec![("age", Value::Integer(34))])
        .add_row("id2", vec![("age", Value::Integer(16))])
        .build()
        .expect("table")
}

fn manager() -> (Arc<ViewManager>, Arc<MemoryViewPersistence>) {
    let persistence = Arc::new(MemoryViewPersistence::new());
    (Arc::new(ViewManager::new(persistence.clone())), persistence)
}

fn martian_source() -> Arc<dyn VariableValueSource> {
    DerivedValueSource::new(
        Variable::build("gravity", ValueType::Decimal, "martian").build(),
        |_vs: &ValueSet| ValueType::Decimal.null(),
    )
}

#[test]
fn incompatible_entity_type_aborts_registration() {
    let (manager, persistence) = manager();
    let list = ValueSourceSet::new("view", vec![martian_source()]).expect("sources");
    let view = View::build("view", census()).list(Arc::new(list)).build();
    let err = manager.add_view("datasource", view, None).unwrap_err();
    match err {
        VantageError::IncompatibleEntityType { view, expected, violations } => {
            assert_eq!(view, "view");
            assert_eq!(expected, "participant");
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].variable, "gravity");
            assert_eq!(violations[0].entity_type, "martian");
        }
        other => panic!("unexpected error: {other}"),
    }
    // atomic check-then-insert: nothing was registered or persisted
    assert!(!manager.has_view("datasource", "view"));
    assert!(persistence.read_views("datasource").expect("read").is_empty());
}

#[test]
fn compatible_listed_sources_register_fine() {
    let (manager, _) = manager();
    let source = DerivedValueSource::new(
        Variable::build("adult", ValueType::Boolean, "participant").build(),
        |_vs: &ValueSet| Value::Boolean(true),
    );
    let list = ValueSourceSet::new("view", vec![source as Arc<dyn VariableValueSource>])
        .expect("sources");
    let view = View::build("view", census()).list(Arc::new(list)).build();
    manager.add_view("datasource", view, Some("adds a flag")).expect("registered");
    assert!(manager.has_view("datasource", "view"));
}

#[test]
fn same_name_replaces_the_registered_view() {
    let (manager, persistence) = manager();
    let table = census();
    let first = View::build("view", table.clone()).build();
    let second = View::build("view", table.clone())
        .filter(Arc::new(FilterFn(|vs: &ValueSet| {
            vs.entity().identifier() == "id1"
        })))
        .build();
    manager.add_view("datasource", first, None).expect("first");
    manager.add_view("datasource", second, None).expect("second");
    let views = manager.views("datasource").expect("views");
    assert_eq!(views.len(), 1);
    // the later registration won, in the registry and in the store
    assert_eq!(views[0].value_sets().count(), 1);
    assert_eq!(persistence.read_views("datasource").expect("read").len(), 1);
}

#[test]
fn removal_leaves_other_views_untouched() {
    let (manager, persistence) = manager();
    let table = census();
    manager
        .add_view("datasource", View::build("a", table.clone()).build(), None)
        .expect("a");
    manager
        .add_view("datasource", View::build("b", table.clone()).build(), None)
        .expect("b");
    manager.remove_view("datasource", "a").expect("removed");
    assert!(!manager.has_view("datasource", "a"));
    assert!(manager.has_view("datasource", "b"));
    assert_eq!(persistence.read_views("datasource").expect("read").len(), 1);
    // the wrapped table itself is unaffected
    assert_eq!(table.value_sets().count(), 2);
}

#[test]
fn decorate_installs_persisted_views() {
    let (manager, persistence) = manager();
    let table = census();
    let adults = View::build("adults", table.clone())
        .filter(Arc::new(FilterFn(|vs: &ValueSet| {
            vs.entity().identifier() == "id1"
        })))
        .build();
    persistence
        .write_view("datasource", &adults, None)
        .expect("written");
    let datasource = Arc::new(TestDatasource {
        name: "datasource".to_owned(),
        tables: vec![table],
    });
    let decorated = manager.decorate(datasource).expect("decorated");
    let names: Vec<String> = decorated
        .tables()
        .iter()
        .map(|t| t.name().to_owned())
        .collect();
    assert_eq!(names, vec!["census".to_owned(), "adults".to_owned()]);
    let adults = decorated.table("adults").expect("view");
    assert_eq!(adults.value_sets().count(), 1);
}

#[test]
fn views_shadow_same_named_tables() {
    let (manager, _) = manager();
    let table = census();
    let datasource = Arc::new(TestDatasource {
        name: "datasource".to_owned(),
        tables: vec![table.clone()],
    });
    let decorated = manager.decorate(datasource).expect("decorated");
    let shadow = View::build("census", table)
        .filter(Arc::new(FilterFn(|vs: &ValueSet| {
            vs.entity().identifier() == "id1"
        })))
        .build();
    manager.add_view("datasource", shadow, None).expect("registered");
    assert_eq!(decorated.tables().len(), 1);
    let census = decorated.table("census").expect("table");
    assert_eq!(census.value_sets().count(), 1);
}
